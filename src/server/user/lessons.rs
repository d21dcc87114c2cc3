use std::sync::Arc;

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};

use crate::auth::RequireUser;
use crate::error::Error;
use crate::flow::{LessonDraft, LessonEdit, LessonFlow, Submission};
use crate::server::AppState;
use crate::server::dto::{
    ListLessonsParams, SubmitLessonRequest, SubmitLessonResponse, UpdateLessonRequest,
};
use crate::server::response::{ApiError, ApiResponse, StoreOptionExt, StoreResultExt};
use crate::server::validation::{
    validate_class_serial, validate_lesson_date, validate_subject_name, validate_topic,
};

const DEFAULT_LESSON_LIMIT: i32 = 20;
const MAX_LESSON_LIMIT: i32 = 100;

fn flow_err(e: Error) -> ApiError {
    match e {
        Error::NotFound => ApiError::not_found("Student not found"),
        Error::Conflict(msg) => ApiError::conflict(msg),
        Error::BadRequest(msg) => ApiError::bad_request(msg),
        _ => ApiError::internal("Failed to save lesson"),
    }
}

pub async fn list_lessons(
    auth: RequireUser,
    State(state): State<Arc<AppState>>,
    Query(params): Query<ListLessonsParams>,
) -> impl IntoResponse {
    let limit = params
        .limit
        .unwrap_or(DEFAULT_LESSON_LIMIT)
        .clamp(1, MAX_LESSON_LIMIT);

    let lessons = state
        .store
        .list_recent_lessons(&auth.user.id, limit)
        .api_err("Failed to list lessons")?;

    Ok::<_, ApiError>(Json(ApiResponse::success(lessons)))
}

/// Submits a new lesson. When the save crosses the student's payment
/// threshold and no `payment_status` accompanies it, nothing is written and
/// 409 comes back with the decision prompt; re-submitting the same draft
/// with `payment_status` set commits the lesson and the payment together.
pub async fn submit_lesson(
    auth: RequireUser,
    State(state): State<Arc<AppState>>,
    Json(req): Json<SubmitLessonRequest>,
) -> impl IntoResponse {
    validate_subject_name(&req.subject)?;
    validate_topic(&req.topic)?;
    validate_lesson_date(&req.lesson_date)?;
    if let Some(serial) = req.class_serial {
        validate_class_serial(serial)?;
    }

    let store = state.store.as_ref();
    let mut flow = LessonFlow::new(store, &auth.user.id);

    let draft = LessonDraft {
        student_id: req.student_id,
        subject: req.subject,
        topic: req.topic,
        lesson_date: req.lesson_date,
        class_serial: req.class_serial,
    };

    match flow.submit(draft).map_err(flow_err)? {
        Submission::Saved(lesson) => Ok::<_, ApiError>((
            StatusCode::CREATED,
            Json(ApiResponse::success(SubmitLessonResponse::Saved { lesson })),
        )),
        Submission::DecisionRequired(prompt) => match req.payment_status {
            Some(status) => {
                let lesson = flow.confirm(status).map_err(flow_err)?;
                Ok((
                    StatusCode::CREATED,
                    Json(ApiResponse::success(SubmitLessonResponse::Saved { lesson })),
                ))
            }
            None => Ok((
                StatusCode::CONFLICT,
                Json(ApiResponse::success(
                    SubmitLessonResponse::PaymentDecisionRequired { prompt },
                )),
            )),
        },
    }
}

pub async fn get_lesson(
    auth: RequireUser,
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> impl IntoResponse {
    let lesson = state
        .store
        .get_lesson(&auth.user.id, &id)
        .api_err("Failed to get lesson")?
        .or_not_found("Lesson not found")?;

    Ok::<_, ApiError>(Json(ApiResponse::success(lesson)))
}

/// Edits a lesson in place. Edits never consult the payment threshold.
pub async fn update_lesson(
    auth: RequireUser,
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(req): Json<UpdateLessonRequest>,
) -> impl IntoResponse {
    if let Some(subject) = &req.subject {
        validate_subject_name(subject)?;
    }
    if let Some(topic) = &req.topic {
        validate_topic(topic)?;
    }
    if let Some(lesson_date) = &req.lesson_date {
        validate_lesson_date(lesson_date)?;
    }
    if let Some(serial) = req.class_serial {
        validate_class_serial(serial)?;
    }

    let store = state.store.as_ref();

    if let Some(student_id) = &req.student_id {
        store
            .get_student(&auth.user.id, student_id)
            .api_err("Failed to get student")?
            .or_not_found("Student not found")?;
    }

    let mut flow = LessonFlow::new(store, &auth.user.id);
    let changes = LessonEdit {
        student_id: req.student_id,
        subject: req.subject,
        topic: req.topic,
        lesson_date: req.lesson_date,
        class_serial: req.class_serial,
    };

    let lesson = flow.edit(&id, changes).map_err(|e| match e {
        Error::NotFound => ApiError::not_found("Lesson not found"),
        _ => ApiError::internal("Failed to update lesson"),
    })?;

    Ok::<_, ApiError>(Json(ApiResponse::success(lesson)))
}

pub async fn delete_lesson(
    auth: RequireUser,
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> impl IntoResponse {
    let deleted = state
        .store
        .delete_lesson(&auth.user.id, &id)
        .api_err("Failed to delete lesson")?;

    if !deleted {
        return Err(ApiError::not_found("Lesson not found"));
    }

    Ok::<_, ApiError>(StatusCode::NO_CONTENT)
}
