use std::sync::Arc;

use axum::{
    Json,
    extract::{Query, State},
    response::IntoResponse,
};

use crate::auth::RequireUser;
use crate::server::AppState;
use crate::server::dto::{ReportLessonsParams, ReportOptionsParams};
use crate::server::response::{ApiError, ApiResponse, StoreResultExt};
use crate::store::LessonFilter;

fn parse_filter(by: &str) -> Result<LessonFilter, ApiError> {
    LessonFilter::parse(by)
        .ok_or_else(|| ApiError::bad_request("by must be one of: student, batch, subject"))
}

/// Distinct filter values for one dimension, derived from the roster.
pub async fn report_options(
    auth: RequireUser,
    State(state): State<Arc<AppState>>,
    Query(params): Query<ReportOptionsParams>,
) -> impl IntoResponse {
    let filter = parse_filter(&params.by)?;

    let students = state
        .store
        .list_students(&auth.user.id)
        .api_err("Failed to list students")?;

    let mut values: Vec<String> = match filter {
        LessonFilter::StudentName => students.into_iter().map(|s| s.name).collect(),
        LessonFilter::Batch => students
            .into_iter()
            .map(|s| s.batch)
            .filter(|b| !b.is_empty())
            .collect(),
        LessonFilter::Subject => students.into_iter().flat_map(|s| s.subjects).collect(),
    };
    values.sort();
    values.dedup();

    Ok::<_, ApiError>(Json(ApiResponse::success(values)))
}

/// Lessons matching one filter value, date-descending.
pub async fn report_lessons(
    auth: RequireUser,
    State(state): State<Arc<AppState>>,
    Query(params): Query<ReportLessonsParams>,
) -> impl IntoResponse {
    let filter = parse_filter(&params.by)?;

    let lessons = state
        .store
        .list_lessons_by(&auth.user.id, filter, &params.value)
        .api_err("Failed to list lessons")?;

    Ok::<_, ApiError>(Json(ApiResponse::success(lessons)))
}
