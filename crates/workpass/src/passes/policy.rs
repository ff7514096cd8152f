use chrono::{Duration, NaiveDate};
use serde::Serialize;

/// Length of every STVP window and of every extension to one.
pub const STVP_EXTENSION_DAYS: i64 = 30;

/// Coarse classification of a pass relative to the evaluation date.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ExpiryState {
    Active,
    Expired,
}

impl ExpiryState {
    pub fn classify(expiry: NaiveDate, today: NaiveDate) -> Self {
        if is_eligible_for_stvp(expiry, today) {
            ExpiryState::Expired
        } else {
            ExpiryState::Active
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            ExpiryState::Active => "active",
            ExpiryState::Expired => "expired",
        }
    }
}

/// A pass qualifies for an STVP only once its expiry date is strictly in the past.
pub fn is_eligible_for_stvp(expiry: NaiveDate, today: NaiveDate) -> bool {
    expiry < today
}

/// Manual expiry edits are only allowed while the current expiry has not lapsed.
pub fn is_expiry_editable(expiry: NaiveDate, today: NaiveDate) -> bool {
    !is_eligible_for_stvp(expiry, today)
}

/// First STVP window starts no earlier than today and no earlier than the pass expiry.
pub fn stvp_window_start(expiry: NaiveDate, today: NaiveDate) -> NaiveDate {
    expiry.max(today)
}

pub fn extend_window(end: NaiveDate) -> NaiveDate {
    end + Duration::days(STVP_EXTENSION_DAYS)
}
