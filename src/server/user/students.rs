use std::sync::Arc;

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use chrono::Utc;
use uuid::Uuid;

use crate::auth::RequireUser;
use crate::server::AppState;
use crate::server::dto::{CreateStudentRequest, UpdateStudentRequest};
use crate::server::response::{ApiError, ApiResponse, StoreOptionExt, StoreResultExt};
use crate::server::validation::{
    validate_batch, validate_student_name, validate_subject_name, validate_target_classes,
};
use crate::types::Student;

fn validate_subjects(subjects: &[String]) -> Result<(), ApiError> {
    for subject in subjects {
        validate_subject_name(subject)?;
    }
    Ok(())
}

pub async fn create_student(
    auth: RequireUser,
    State(state): State<Arc<AppState>>,
    Json(req): Json<CreateStudentRequest>,
) -> impl IntoResponse {
    validate_student_name(&req.name)?;
    let batch = req.batch.unwrap_or_default();
    validate_batch(&batch)?;
    validate_subjects(&req.subjects)?;
    let target_classes = req.target_classes.unwrap_or(0);
    validate_target_classes(target_classes)?;

    let now = Utc::now();
    let student = Student {
        id: Uuid::new_v4().to_string(),
        user_id: auth.user.id.clone(),
        name: req.name,
        batch,
        subjects: req.subjects,
        target_classes,
        created_at: now,
        updated_at: now,
    };

    state
        .store
        .create_student(&student)
        .api_err("Failed to create student")?;

    Ok::<_, ApiError>((StatusCode::CREATED, Json(ApiResponse::success(student))))
}

pub async fn list_students(
    auth: RequireUser,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    let students = state
        .store
        .list_students(&auth.user.id)
        .api_err("Failed to list students")?;

    Ok::<_, ApiError>(Json(ApiResponse::success(students)))
}

pub async fn get_student(
    auth: RequireUser,
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> impl IntoResponse {
    let student = state
        .store
        .get_student(&auth.user.id, &id)
        .api_err("Failed to get student")?
        .or_not_found("Student not found")?;

    Ok::<_, ApiError>(Json(ApiResponse::success(student)))
}

pub async fn update_student(
    auth: RequireUser,
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(req): Json<UpdateStudentRequest>,
) -> impl IntoResponse {
    let store = state.store.as_ref();

    let mut student = store
        .get_student(&auth.user.id, &id)
        .api_err("Failed to get student")?
        .or_not_found("Student not found")?;

    if let Some(name) = req.name {
        validate_student_name(&name)?;
        student.name = name;
    }
    if let Some(batch) = req.batch {
        validate_batch(&batch)?;
        student.batch = batch;
    }
    if let Some(subjects) = req.subjects {
        validate_subjects(&subjects)?;
        student.subjects = subjects;
    }
    if let Some(target_classes) = req.target_classes {
        validate_target_classes(target_classes)?;
        student.target_classes = target_classes;
    }
    student.updated_at = Utc::now();

    store
        .update_student(&student)
        .api_err("Failed to update student")?;

    Ok::<_, ApiError>(Json(ApiResponse::success(student)))
}

/// Deletes a student. Their payment rows go with them; lessons already
/// taught stay on the books.
pub async fn delete_student(
    auth: RequireUser,
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> impl IntoResponse {
    let deleted = state
        .store
        .delete_student(&auth.user.id, &id)
        .api_err("Failed to delete student")?;

    if !deleted {
        return Err(ApiError::not_found("Student not found"));
    }

    Ok::<_, ApiError>(StatusCode::NO_CONTENT)
}
