use std::sync::Arc;

use axum::{
    Json,
    extract::{Path, Query, State},
    response::IntoResponse,
};
use chrono::Utc;

use crate::auth::RequireUser;
use crate::server::AppState;
use crate::server::dto::{ListPaymentsParams, SetPaymentRequest};
use crate::server::response::{ApiError, ApiResponse, StoreOptionExt, StoreResultExt};
use crate::server::validation::validate_month;
use crate::types::{BillingPeriod, Payment};

pub async fn list_student_payments(
    auth: RequireUser,
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> impl IntoResponse {
    let store = state.store.as_ref();

    store
        .get_student(&auth.user.id, &id)
        .api_err("Failed to get student")?
        .or_not_found("Student not found")?;

    let payments = store
        .list_student_payments(&auth.user.id, &id)
        .api_err("Failed to list payments")?;

    Ok::<_, ApiError>(Json(ApiResponse::success(payments)))
}

/// Direct correction path: records or overwrites the status for one month
/// without going through a lesson submission.
pub async fn set_payment(
    auth: RequireUser,
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(req): Json<SetPaymentRequest>,
) -> impl IntoResponse {
    validate_month(req.month)?;

    let store = state.store.as_ref();

    let student = store
        .get_student(&auth.user.id, &id)
        .api_err("Failed to get student")?
        .or_not_found("Student not found")?;

    let payment = Payment {
        student_id: student.id,
        user_id: auth.user.id.clone(),
        month: req.month,
        year: req.year,
        status: req.status,
        updated_at: Utc::now(),
    };

    store
        .upsert_payment(&payment)
        .api_err("Failed to record payment")?;

    Ok::<_, ApiError>(Json(ApiResponse::success(payment)))
}

/// Payments for one billing period across all students. Defaults to the
/// current month when no period is given.
pub async fn list_payments(
    auth: RequireUser,
    State(state): State<Arc<AppState>>,
    Query(params): Query<ListPaymentsParams>,
) -> impl IntoResponse {
    let period = match (params.month, params.year) {
        (Some(month), Some(year)) => {
            validate_month(month)?;
            BillingPeriod::new(month, year)
        }
        (None, None) => BillingPeriod::current(),
        _ => {
            return Err(ApiError::bad_request(
                "month and year must be supplied together",
            ));
        }
    };

    let payments = state
        .store
        .list_payments_for_period(&auth.user.id, period)
        .api_err("Failed to list payments")?;

    Ok::<_, ApiError>(Json(ApiResponse::success(payments)))
}
