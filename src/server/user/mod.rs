mod lessons;
mod payments;
mod profile;
mod reports;
mod session;
mod students;
mod subjects;

use std::sync::Arc;

use axum::{
    Router,
    routing::{delete, get, patch, post, put},
};

use crate::server::AppState;

pub fn user_router() -> Router<Arc<AppState>> {
    Router::new()
        // Session
        .route("/session", get(session::get_session))
        .route("/session", delete(session::sign_out))
        // Profile
        .route("/profile", get(profile::get_profile))
        .route("/profile", patch(profile::update_profile))
        // Students
        .route("/students", get(students::list_students))
        .route("/students", post(students::create_student))
        .route("/students/{id}", get(students::get_student))
        .route("/students/{id}", patch(students::update_student))
        .route("/students/{id}", delete(students::delete_student))
        // Per-student payment history and corrections
        .route(
            "/students/{id}/payments",
            get(payments::list_student_payments),
        )
        .route("/students/{id}/payments", put(payments::set_payment))
        // Period-wide payment overview
        .route("/payments", get(payments::list_payments))
        // Subjects
        .route("/subjects", get(subjects::list_subjects))
        .route("/subjects", post(subjects::create_subject))
        .route("/subjects/{id}", delete(subjects::delete_subject))
        // Lessons
        .route("/lessons", get(lessons::list_lessons))
        .route("/lessons", post(lessons::submit_lesson))
        .route("/lessons/{id}", get(lessons::get_lesson))
        .route("/lessons/{id}", patch(lessons::update_lesson))
        .route("/lessons/{id}", delete(lessons::delete_lesson))
        // Reports
        .route("/reports/options", get(reports::report_options))
        .route("/reports/lessons", get(reports::report_lessons))
}
