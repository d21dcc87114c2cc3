//! Lesson submission flow.
//!
//! Submitting a new lesson can cross a student's class-count target for the
//! current billing period, in which case the save is held until the caller
//! decides whether that month is paid or due. The flow is a small state
//! machine (`Idle` -> `AwaitingPaymentDecision` -> `Idle`) so the rule is
//! testable without any HTTP in the loop.

use chrono::Utc;
use serde::Serialize;
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::store::Store;
use crate::types::{BillingPeriod, Lesson, Payment, PaymentStatus, Student};

/// A new lesson before it has an identity. Student name and batch are
/// snapshotted from the student record at save time.
#[derive(Debug, Clone)]
pub struct LessonDraft {
    pub student_id: String,
    pub subject: String,
    pub topic: String,
    pub lesson_date: String,
    pub class_serial: Option<i64>,
}

/// Field changes for an in-place lesson edit. Absent fields keep their
/// current values; a student id re-snapshots name and batch.
#[derive(Debug, Clone, Default)]
pub struct LessonEdit {
    pub student_id: Option<String>,
    pub subject: Option<String>,
    pub topic: Option<String>,
    pub lesson_date: Option<String>,
    pub class_serial: Option<i64>,
}

/// What the caller needs to present the paid/due decision.
#[derive(Debug, Clone, Serialize)]
pub struct PaymentPrompt {
    pub student_id: String,
    pub student_name: String,
    pub target_classes: i64,
    pub class_serial: i64,
    pub month: u32,
    pub year: i32,
}

#[derive(Debug)]
pub enum Submission {
    Saved(Lesson),
    DecisionRequired(PaymentPrompt),
}

#[derive(Debug, Clone)]
pub enum FlowState {
    Idle,
    AwaitingPaymentDecision {
        draft: LessonDraft,
        period: BillingPeriod,
    },
}

pub struct LessonFlow<'a> {
    store: &'a dyn Store,
    user_id: String,
    state: FlowState,
}

impl<'a> LessonFlow<'a> {
    pub fn new(store: &'a dyn Store, user_id: &str) -> Self {
        Self {
            store,
            user_id: user_id.to_string(),
            state: FlowState::Idle,
        }
    }

    #[must_use]
    pub fn is_awaiting_decision(&self) -> bool {
        matches!(self.state, FlowState::AwaitingPaymentDecision { .. })
    }

    /// Submits a new lesson against the current calendar month.
    pub fn submit(&mut self, draft: LessonDraft) -> Result<Submission> {
        self.submit_at(draft, BillingPeriod::current())
    }

    /// Submits a new lesson against an explicit billing period. The period is
    /// always the submission instant's month, never the lesson's own date, so
    /// a backdated lesson still checks the current month.
    pub fn submit_at(&mut self, draft: LessonDraft, period: BillingPeriod) -> Result<Submission> {
        if self.is_awaiting_decision() {
            return Err(Error::Conflict(
                "a payment decision is already pending".to_string(),
            ));
        }

        let student = self
            .store
            .get_student(&self.user_id, &draft.student_id)?
            .ok_or(Error::NotFound)?;

        if let Some(serial) = self.crossing_serial(&student, &draft, period)? {
            let prompt = PaymentPrompt {
                student_id: student.id,
                student_name: student.name,
                target_classes: student.target_classes,
                class_serial: serial,
                month: period.month,
                year: period.year,
            };
            self.state = FlowState::AwaitingPaymentDecision { draft, period };
            return Ok(Submission::DecisionRequired(prompt));
        }

        let lesson = build_lesson(&self.user_id, &student, &draft);
        self.store.create_lesson(&lesson)?;
        Ok(Submission::Saved(lesson))
    }

    /// Resolves a held submission: the chosen status is upserted for the
    /// period captured at submit time and the lesson lands with it, in one
    /// transaction. On failure the decision stays pending.
    pub fn confirm(&mut self, status: PaymentStatus) -> Result<Lesson> {
        let FlowState::AwaitingPaymentDecision { draft, period } = &self.state else {
            return Err(Error::BadRequest(
                "no lesson submission is awaiting a payment decision".to_string(),
            ));
        };

        let student = self
            .store
            .get_student(&self.user_id, &draft.student_id)?
            .ok_or(Error::NotFound)?;

        let lesson = build_lesson(&self.user_id, &student, draft);
        let payment = Payment {
            student_id: draft.student_id.clone(),
            user_id: self.user_id.clone(),
            month: period.month,
            year: period.year,
            status,
            updated_at: Utc::now(),
        };

        self.store.commit_lesson_with_payment(&payment, &lesson)?;
        self.state = FlowState::Idle;
        Ok(lesson)
    }

    /// Discards any held submission. Nothing is written.
    pub fn cancel(&mut self) {
        self.state = FlowState::Idle;
    }

    /// Applies an in-place edit. Edits never consult the payment threshold,
    /// even when the edited serial newly crosses the target.
    pub fn edit(&mut self, lesson_id: &str, changes: LessonEdit) -> Result<Lesson> {
        let mut lesson = self
            .store
            .get_lesson(&self.user_id, lesson_id)?
            .ok_or(Error::NotFound)?;

        if let Some(student_id) = &changes.student_id {
            let student = self
                .store
                .get_student(&self.user_id, student_id)?
                .ok_or(Error::NotFound)?;
            lesson.student_name = student.name;
            lesson.batch = student.batch;
        }
        if let Some(subject) = changes.subject {
            lesson.subject = subject;
        }
        if let Some(topic) = changes.topic {
            lesson.topic = topic;
        }
        if let Some(lesson_date) = changes.lesson_date {
            lesson.lesson_date = lesson_date;
        }
        if let Some(serial) = changes.class_serial {
            lesson.class_serial = Some(serial);
        }
        lesson.updated_at = Utc::now();

        self.store.update_lesson(&lesson)?;
        Ok(lesson)
    }

    /// Returns the serial that crossed the threshold, or None when the lesson
    /// can save directly. Crossing requires a target above zero, a serial at
    /// or past it, and no paid record for the period. A recorded "due" does
    /// not suppress the prompt; only a paid month does.
    fn crossing_serial(
        &self,
        student: &Student,
        draft: &LessonDraft,
        period: BillingPeriod,
    ) -> Result<Option<i64>> {
        if student.target_classes <= 0 {
            return Ok(None);
        }
        let Some(serial) = draft.class_serial else {
            return Ok(None);
        };
        if serial < student.target_classes {
            return Ok(None);
        }

        let paid = self
            .store
            .get_payment(&self.user_id, &student.id, period)?
            .is_some_and(|p| p.status == PaymentStatus::Paid);

        if paid { Ok(None) } else { Ok(Some(serial)) }
    }
}

fn build_lesson(user_id: &str, student: &Student, draft: &LessonDraft) -> Lesson {
    let now = Utc::now();
    Lesson {
        id: Uuid::new_v4().to_string(),
        user_id: user_id.to_string(),
        student_name: student.name.clone(),
        batch: student.batch.clone(),
        subject: draft.subject.clone(),
        topic: draft.topic.clone(),
        lesson_date: draft.lesson_date.clone(),
        class_serial: draft.class_serial,
        created_at: now,
        updated_at: now,
    }
}
