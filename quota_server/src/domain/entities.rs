use chrono::{Days, NaiveDate};
use serde::{Deserialize, Serialize};

// Runs a guest may consume per UTC day.
pub const DAILY_LIMIT: u32 = 3;
// Result items surfaced to a guest per successful run.
pub const OPENERS_PER_RUN: usize = 2;

// What the guest asked the generator for.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GenerationKind {
    Opener,
    BioReview,
}

// Validated generation input handed to the generator port.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GenerationParams {
    pub kind: GenerationKind,
    pub profile_text: String,
    pub tone: Option<String>,
}

// Authoritative limits for one guest on one UTC day.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GuestLimits {
    pub remaining_runs_today: u32,
    pub reset_date_utc: NaiveDate,
}

impl GuestLimits {
    pub fn for_day(runs_used: u32, daily_limit: u32, today: NaiveDate) -> Self {
        Self {
            remaining_runs_today: daily_limit.saturating_sub(runs_used),
            reset_date_utc: next_reset(today),
        }
    }

    pub fn exhausted(today: NaiveDate) -> Self {
        Self {
            remaining_runs_today: 0,
            reset_date_utc: next_reset(today),
        }
    }
}

// Counters roll over at the next UTC midnight.
fn next_reset(today: NaiveDate) -> NaiveDate {
    today.checked_add_days(Days::new(1)).unwrap_or(today)
}
