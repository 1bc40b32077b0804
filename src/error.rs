//! Error types for cycle-flux

use chrono::NaiveDate;
use thiserror::Error;

use crate::types::{CycleId, UserId};

/// Errors that can occur while loading tables or building sequences
#[derive(Debug, Error)]
pub enum ComputeError {
    #[error("Unknown symptom code: {0}")]
    UnknownSymptom(String),

    #[error("Duplicate symptom in curated list: {0}")]
    DuplicateSymptom(String),

    #[error("User {0} has no tracking events")]
    UnknownUser(UserId),

    #[error("User {user_id} references cycle {cycle_id}, which is not in the cycle table")]
    CycleJoin { user_id: UserId, cycle_id: CycleId },

    #[error("Invalid cycle {cycle_id} for user {user_id}: {reason}")]
    InvalidCycle {
        user_id: UserId,
        cycle_id: CycleId,
        reason: String,
    },

    #[error("Cycles {first} and {second} of user {user_id} both cover {date}")]
    OverlappingCycles {
        user_id: UserId,
        date: NaiveDate,
        first: CycleId,
        second: CycleId,
    },

    #[error("Requested {requested} users but only {available} qualify")]
    InsufficientUsers { requested: usize, available: usize },

    #[error("Encoding error: {0}")]
    EncodingError(String),

    #[error("Date parse error: {0}")]
    DateParse(String),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid JSON: {0}")]
    Json(#[from] serde_json::Error),
}
