use chrono::{Datelike, Utc};
use serde::{Deserialize, Serialize};

/// Calendar month keying a payment record. Payment checks always use the
/// period of the submission instant, never the lesson's own date.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BillingPeriod {
    pub month: u32,
    pub year: i32,
}

impl BillingPeriod {
    #[must_use]
    pub fn new(month: u32, year: i32) -> Self {
        Self { month, year }
    }

    /// The period containing the current instant per the system clock.
    #[must_use]
    pub fn current() -> Self {
        let now = Utc::now();
        Self {
            month: now.month(),
            year: now.year(),
        }
    }
}

impl std::fmt::Display for BillingPeriod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.month, self.year)
    }
}
