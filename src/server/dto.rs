use serde::{Deserialize, Serialize};

use crate::flow::PaymentPrompt;
use crate::types::{Lesson, PaymentStatus, Token};

#[derive(Debug, Deserialize)]
pub struct CreateStudentRequest {
    pub name: String,
    #[serde(default)]
    pub batch: Option<String>,
    #[serde(default)]
    pub subjects: Vec<String>,
    #[serde(default)]
    pub target_classes: Option<i64>,
}

#[derive(Debug, Default, Deserialize)]
pub struct UpdateStudentRequest {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub batch: Option<String>,
    #[serde(default)]
    pub subjects: Option<Vec<String>>,
    #[serde(default)]
    pub target_classes: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct CreateSubjectRequest {
    pub name: String,
}

/// A lesson submission. `payment_status` is only consulted when the save
/// crosses the student's payment threshold; otherwise it is ignored.
#[derive(Debug, Deserialize)]
pub struct SubmitLessonRequest {
    pub student_id: String,
    pub subject: String,
    pub topic: String,
    pub lesson_date: String,
    #[serde(default)]
    pub class_serial: Option<i64>,
    #[serde(default)]
    pub payment_status: Option<PaymentStatus>,
}

/// Outcome of a lesson submission. `payment_decision_required` is returned
/// with 409 and carries everything needed to re-submit with a decision.
#[derive(Debug, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum SubmitLessonResponse {
    Saved { lesson: Lesson },
    PaymentDecisionRequired { prompt: PaymentPrompt },
}

#[derive(Debug, Default, Deserialize)]
pub struct UpdateLessonRequest {
    #[serde(default)]
    pub student_id: Option<String>,
    #[serde(default)]
    pub subject: Option<String>,
    #[serde(default)]
    pub topic: Option<String>,
    #[serde(default)]
    pub lesson_date: Option<String>,
    #[serde(default)]
    pub class_serial: Option<i64>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ListLessonsParams {
    #[serde(default)]
    pub limit: Option<i32>,
}

#[derive(Debug, Default, Deserialize)]
pub struct UpdateProfileRequest {
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub avatar_url: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct SetPaymentRequest {
    pub month: u32,
    pub year: i32,
    pub status: PaymentStatus,
}

#[derive(Debug, Default, Deserialize)]
pub struct ListPaymentsParams {
    #[serde(default)]
    pub month: Option<u32>,
    #[serde(default)]
    pub year: Option<i32>,
}

#[derive(Debug, Deserialize)]
pub struct ReportOptionsParams {
    pub by: String,
}

#[derive(Debug, Deserialize)]
pub struct ReportLessonsParams {
    pub by: String,
    pub value: String,
}

#[derive(Debug, Serialize)]
pub struct SessionResponse {
    pub token_id: String,
    pub token_lookup: String,
    pub is_admin: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct CreateUserRequest {
    pub email: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct CreateUserTokenRequest {
    #[serde(default)]
    pub expires_in_days: Option<i64>,
}

#[derive(Debug, Serialize)]
pub struct CreateTokenResponse {
    pub token: String,
    pub metadata: Token,
}

#[derive(Debug, Default, Deserialize)]
pub struct PaginationParams {
    #[serde(default)]
    pub cursor: Option<String>,
}
