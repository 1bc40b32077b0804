//! Core record types
//!
//! Rows of the tracking and cycle tables as they flow into the sequencer,
//! plus the per-day rows produced by cycle expansion.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::tables::deserialize_date;

/// Opaque user identifier as it appears in the source tables
pub type UserId = String;

/// Cycle identifier, unique per user
pub type CycleId = u32;

/// One logged symptom for a user on a calendar day
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackingEvent {
    pub user_id: UserId,
    /// Cycle the event was logged in
    pub cycle_id: CycleId,
    #[serde(deserialize_with = "deserialize_date")]
    pub date: NaiveDate,
    /// Symptom code (e.g. "cramps", "happy")
    pub symptom: String,
}

impl TrackingEvent {
    pub fn new(user_id: &str, cycle_id: CycleId, date: NaiveDate, symptom: &str) -> Self {
        Self {
            user_id: user_id.to_string(),
            cycle_id,
            date,
            symptom: symptom.to_string(),
        }
    }
}

/// Compact descriptor of one menstrual cycle
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CycleRecord {
    pub user_id: UserId,
    pub cycle_id: CycleId,
    #[serde(deserialize_with = "deserialize_date")]
    pub cycle_start: NaiveDate,
    /// Total cycle length in days
    pub cycle_length: u32,
    /// Period (bleeding) length in days, counted from `cycle_start`
    pub period_length: u32,
}

/// One calendar day of an expanded cycle, keyed by (user_id, date)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CycleDay {
    pub user_id: UserId,
    pub date: NaiveDate,
    pub cycle_id: CycleId,
    /// 1-based position within the cycle
    pub day_in_cycle: u32,
    /// 1 during the period, 0 afterwards
    pub period: u8,
}
