mod models;
mod period;

pub use models::{Lesson, Payment, PaymentStatus, Profile, Student, Subject, Token, User};
pub use period::BillingPeriod;
