//! Cycle expansion
//!
//! Expands compact cycle descriptors into one row per calendar day, keyed by
//! (user_id, date).

use std::collections::BTreeMap;

use chrono::{Days, NaiveDate};
use log::debug;

use crate::error::ComputeError;
use crate::types::{CycleDay, CycleId, CycleRecord, UserId};

/// Cycle expander for per-day cycle tables
pub struct CycleExpander;

impl CycleExpander {
    /// Expand one cycle into `cycle_length` consecutive days.
    ///
    /// The first `period_length` days carry `period = 1`.
    pub fn expand(cycle: &CycleRecord) -> Result<Vec<CycleDay>, ComputeError> {
        validate_cycle(cycle)?;

        (0..cycle.cycle_length)
            .map(|offset| {
                let date = cycle
                    .cycle_start
                    .checked_add_days(Days::new(u64::from(offset)))
                    .ok_or_else(|| invalid(cycle, "cycle runs past the supported date range"))?;
                Ok(CycleDay {
                    user_id: cycle.user_id.clone(),
                    date,
                    cycle_id: cycle.cycle_id,
                    day_in_cycle: offset + 1,
                    period: u8::from(offset < cycle.period_length),
                })
            })
            .collect()
    }

    /// Expand a whole cycle table, ordered by (user_id, date).
    ///
    /// Fails if two cycles of the same user cover the same day.
    pub fn expand_all(cycles: &[CycleRecord]) -> Result<Vec<CycleDay>, ComputeError> {
        let mut by_key: BTreeMap<(UserId, NaiveDate), CycleDay> = BTreeMap::new();

        for cycle in cycles {
            for day in Self::expand(cycle)? {
                let key = (day.user_id.clone(), day.date);
                if let Some(existing) = by_key.get(&key) {
                    return Err(overlap(&day, existing.cycle_id));
                }
                by_key.insert(key, day);
            }
        }

        debug!(
            "Expanded {} cycles into {} cycle days",
            cycles.len(),
            by_key.len()
        );

        Ok(by_key.into_values().collect())
    }
}

/// Expand one cycle into per-day rows
pub fn expand_cycle(cycle: &CycleRecord) -> Result<Vec<CycleDay>, ComputeError> {
    CycleExpander::expand(cycle)
}

/// Expand a cycle table, rejecting overlapping cycles
pub fn expand_cycles(cycles: &[CycleRecord]) -> Result<Vec<CycleDay>, ComputeError> {
    CycleExpander::expand_all(cycles)
}

/// Check `cycle_length > 0` and `period_length <= cycle_length`
pub fn validate_cycle(cycle: &CycleRecord) -> Result<(), ComputeError> {
    if cycle.cycle_length == 0 {
        return Err(invalid(cycle, "cycle_length must be positive"));
    }
    if cycle.period_length > cycle.cycle_length {
        return Err(invalid(
            cycle,
            &format!(
                "period_length {} exceeds cycle_length {}",
                cycle.period_length, cycle.cycle_length
            ),
        ));
    }
    Ok(())
}

fn invalid(cycle: &CycleRecord, reason: &str) -> ComputeError {
    ComputeError::InvalidCycle {
        user_id: cycle.user_id.clone(),
        cycle_id: cycle.cycle_id,
        reason: reason.to_string(),
    }
}

fn overlap(day: &CycleDay, first: CycleId) -> ComputeError {
    ComputeError::OverlappingCycles {
        user_id: day.user_id.clone(),
        date: day.date,
        first,
        second: day.cycle_id,
    }
}
