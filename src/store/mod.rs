mod schema;
mod sqlite;

pub use sqlite::SqliteStore;

use crate::error::Result;
use crate::types::*;

/// Report filter dimension over the denormalized lesson columns.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LessonFilter {
    StudentName,
    Batch,
    Subject,
}

impl LessonFilter {
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "student" => Some(LessonFilter::StudentName),
            "batch" => Some(LessonFilter::Batch),
            "subject" => Some(LessonFilter::Subject),
            _ => None,
        }
    }

    fn column(self) -> &'static str {
        match self {
            LessonFilter::StudentName => "student_name",
            LessonFilter::Batch => "batch",
            LessonFilter::Subject => "subject",
        }
    }
}

/// Store defines the database interface. Domain operations take the owning
/// user id first and filter every query on it.
pub trait Store: Send + Sync {
    fn initialize(&self) -> Result<()>;

    // User operations
    fn create_user(&self, user: &User) -> Result<()>;
    fn get_user(&self, id: &str) -> Result<Option<User>>;
    fn get_user_by_email(&self, email: &str) -> Result<Option<User>>;
    fn list_users(&self, cursor: &str, limit: i32) -> Result<Vec<User>>;
    fn delete_user(&self, id: &str) -> Result<bool>;

    // Token operations
    fn create_token(&self, token: &Token) -> Result<()>;
    fn get_token_by_id(&self, id: &str) -> Result<Option<Token>>;
    fn get_token_by_lookup(&self, lookup: &str) -> Result<Option<Token>>;
    fn list_tokens(&self, cursor: &str, limit: i32) -> Result<Vec<Token>>;
    fn list_user_tokens(&self, user_id: &str) -> Result<Vec<Token>>;
    fn delete_token(&self, id: &str) -> Result<bool>;
    fn update_token_last_used(&self, id: &str) -> Result<()>;

    // Profile operations
    fn get_profile(&self, user_id: &str) -> Result<Option<Profile>>;
    fn upsert_profile(&self, profile: &Profile) -> Result<()>;

    // Student operations
    fn create_student(&self, student: &Student) -> Result<()>;
    fn get_student(&self, user_id: &str, id: &str) -> Result<Option<Student>>;
    fn list_students(&self, user_id: &str) -> Result<Vec<Student>>;
    fn update_student(&self, student: &Student) -> Result<()>;
    fn delete_student(&self, user_id: &str, id: &str) -> Result<bool>;

    // Lesson operations
    fn create_lesson(&self, lesson: &Lesson) -> Result<()>;
    fn get_lesson(&self, user_id: &str, id: &str) -> Result<Option<Lesson>>;
    fn list_recent_lessons(&self, user_id: &str, limit: i32) -> Result<Vec<Lesson>>;
    fn list_lessons_by(
        &self,
        user_id: &str,
        filter: LessonFilter,
        value: &str,
    ) -> Result<Vec<Lesson>>;
    fn update_lesson(&self, lesson: &Lesson) -> Result<()>;
    fn delete_lesson(&self, user_id: &str, id: &str) -> Result<bool>;

    // Subject operations
    fn create_subject(&self, subject: &Subject) -> Result<()>;
    fn get_subject(&self, user_id: &str, id: &str) -> Result<Option<Subject>>;
    fn list_subjects(&self, user_id: &str) -> Result<Vec<Subject>>;
    fn delete_subject(&self, user_id: &str, id: &str) -> Result<bool>;

    // Payment operations
    fn upsert_payment(&self, payment: &Payment) -> Result<()>;
    fn get_payment(
        &self,
        user_id: &str,
        student_id: &str,
        period: BillingPeriod,
    ) -> Result<Option<Payment>>;
    fn list_student_payments(&self, user_id: &str, student_id: &str) -> Result<Vec<Payment>>;
    fn list_payments_for_period(&self, user_id: &str, period: BillingPeriod)
    -> Result<Vec<Payment>>;

    /// Upserts the payment and inserts the lesson in a single transaction;
    /// both land or neither does.
    fn commit_lesson_with_payment(&self, payment: &Payment, lesson: &Lesson) -> Result<()>;

    // Admin token check
    fn has_admin_token(&self) -> Result<bool>;
}
