//! User and batch sequencing
//!
//! Turns one user's sparse tracking events into a dense day-by-day matrix:
//! one row per day of the user's tracking span, one binary column per
//! symptom in the vocabulary, and a trailing 1-based day counter.
//!
//! Row 0 is always the user's earliest tracking date, so rows of different
//! users in a batch are not calendar-aligned.

use std::collections::HashSet;

use chrono::NaiveDate;
use log::{debug, info};
use serde::{Deserialize, Serialize};

use crate::error::ComputeError;
use crate::matrix::DayMatrix;
use crate::types::{CycleId, CycleRecord, TrackingEvent, UserId};
use crate::vocabulary::SymptomVocabulary;

/// Location of one user's rows inside a batch
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserBlock {
    pub user_id: UserId,
    /// First batch row belonging to this user
    pub start_row: usize,
    /// Number of rows (days in the user's tracking span)
    pub rows: usize,
    /// Calendar date of the user's first row
    pub first_date: NaiveDate,
}

/// Row-stacked sequences for a list of users, in the order requested
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchSequence {
    pub matrix: DayMatrix,
    pub users: Vec<UserBlock>,
}

impl BatchSequence {
    fn empty(cols: usize) -> Self {
        Self {
            matrix: DayMatrix::zeros(0, cols),
            users: Vec::new(),
        }
    }

    fn push(&mut self, user_id: &str, sequence: UserSequence) {
        self.users.push(UserBlock {
            user_id: user_id.to_string(),
            start_row: self.matrix.rows(),
            rows: sequence.matrix.rows(),
            first_date: sequence.first_date,
        });
        self.matrix.append_rows(&sequence.matrix);
    }

    /// Rows belonging to one block
    pub fn user_rows(&self, block: &UserBlock) -> impl Iterator<Item = &[f64]> {
        (block.start_row..block.start_row + block.rows).map(move |r| self.matrix.row(r))
    }
}

/// A user's day matrix together with the date its first row represents
#[derive(Debug, Clone, PartialEq)]
pub struct UserSequence {
    pub first_date: NaiveDate,
    pub matrix: DayMatrix,
}

/// Sequence one user from the full tracking and cycle tables
pub fn sequence_user(
    user_id: &str,
    tracking: &[TrackingEvent],
    cycles: &[CycleRecord],
    vocabulary: &SymptomVocabulary,
) -> Result<DayMatrix, ComputeError> {
    let events: Vec<&TrackingEvent> = tracking.iter().filter(|e| e.user_id == user_id).collect();
    let user_cycles: Vec<&CycleRecord> = cycles.iter().filter(|c| c.user_id == user_id).collect();

    sequence_user_rows(user_id, &events, &user_cycles, vocabulary).map(|s| s.matrix)
}

/// Sequence a list of users and stack their matrices in input order.
///
/// Ids are not deduplicated; the first failing user aborts the batch.
pub fn sequence_users<S: AsRef<str>>(
    user_ids: &[S],
    tracking: &[TrackingEvent],
    cycles: &[CycleRecord],
    vocabulary: &SymptomVocabulary,
) -> Result<BatchSequence, ComputeError> {
    stack_users(user_ids, vocabulary, |user_id| {
        let events: Vec<&TrackingEvent> =
            tracking.iter().filter(|e| e.user_id == user_id).collect();
        let user_cycles: Vec<&CycleRecord> =
            cycles.iter().filter(|c| c.user_id == user_id).collect();
        sequence_user_rows(user_id, &events, &user_cycles, vocabulary)
    })
}

pub(crate) fn stack_users<S, F>(
    user_ids: &[S],
    vocabulary: &SymptomVocabulary,
    mut sequence: F,
) -> Result<BatchSequence, ComputeError>
where
    S: AsRef<str>,
    F: FnMut(&str) -> Result<UserSequence, ComputeError>,
{
    let mut batch = BatchSequence::empty(vocabulary.len() + 1);

    for user_id in user_ids {
        let user_id = user_id.as_ref();
        let user_sequence = sequence(user_id)?;
        batch.push(user_id, user_sequence);
    }

    info!(
        "Sequenced {} users into {} rows",
        batch.users.len(),
        batch.matrix.rows()
    );
    Ok(batch)
}

/// Sequence one user's already-filtered events and cycles
pub(crate) fn sequence_user_rows(
    user_id: &str,
    events: &[&TrackingEvent],
    cycles: &[&CycleRecord],
    vocabulary: &SymptomVocabulary,
) -> Result<UserSequence, ComputeError> {
    let first_date = events
        .iter()
        .map(|e| e.date)
        .min()
        .ok_or_else(|| ComputeError::UnknownUser(user_id.to_string()))?;

    check_cycle_membership(user_id, events, cycles)?;

    let offsets: Vec<usize> = events.iter().map(|e| day_offset(first_date, e.date)).collect();
    // first_date is the minimum, so at least one offset is 1
    let days = offsets.iter().copied().max().unwrap_or(1);

    let day_col = vocabulary.len();
    let mut matrix = DayMatrix::zeros(days, day_col + 1);
    for row in 0..days {
        matrix.set(row, day_col, (row + 1) as f64);
    }

    for (event, offset) in events.iter().zip(offsets) {
        let col = vocabulary.index_of(&event.symptom)?;
        matrix.set(offset - 1, col, 1.0);
    }

    debug!(
        "User {}: {} events over {} days from {}",
        user_id,
        events.len(),
        days,
        first_date
    );

    Ok(UserSequence { first_date, matrix })
}

/// Every cycle id referenced by the user's events must exist in their cycle table
fn check_cycle_membership(
    user_id: &str,
    events: &[&TrackingEvent],
    cycles: &[&CycleRecord],
) -> Result<(), ComputeError> {
    let known: HashSet<CycleId> = cycles.iter().map(|c| c.cycle_id).collect();

    match events.iter().find(|e| !known.contains(&e.cycle_id)) {
        Some(event) => Err(ComputeError::CycleJoin {
            user_id: user_id.to_string(),
            cycle_id: event.cycle_id,
        }),
        None => Ok(()),
    }
}

/// 1-based absolute day offset from the user's first date
fn day_offset(first_date: NaiveDate, date: NaiveDate) -> usize {
    (date - first_date).num_days() as usize + 1
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn date(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, day).unwrap()
    }

    fn cycle(user_id: &str, cycle_id: CycleId) -> CycleRecord {
        CycleRecord {
            user_id: user_id.to_string(),
            cycle_id,
            cycle_start: date(1),
            cycle_length: 28,
            period_length: 5,
        }
    }

    fn vocab(events: &[TrackingEvent]) -> SymptomVocabulary {
        SymptomVocabulary::build(&["happy", "cramps", "sad"], events).unwrap()
    }

    fn fixture() -> (Vec<TrackingEvent>, Vec<CycleRecord>) {
        let tracking = vec![
            TrackingEvent::new("u1", 0, date(2), "happy"),
            TrackingEvent::new("u1", 0, date(2), "cramps"),
            TrackingEvent::new("u1", 0, date(5), "cramps"),
            TrackingEvent::new("u1", 0, date(5), "cramps"),
            TrackingEvent::new("u2", 4, date(10), "spotting"),
            TrackingEvent::new("u2", 4, date(11), "sad"),
            TrackingEvent::new("u1", 1, date(4), "sad"),
        ];
        let cycles = vec![cycle("u1", 0), cycle("u1", 1), cycle("u2", 4)];
        (tracking, cycles)
    }

    #[test]
    fn test_matrix_shape_and_day_column() {
        let (tracking, cycles) = fixture();
        let vocabulary = vocab(&tracking);

        let m = sequence_user("u1", &tracking, &cycles, &vocabulary).unwrap();

        // u1 spans Mar 2 .. Mar 5
        assert_eq!(m.shape(), (4, vocabulary.len() + 1));
        assert_eq!(m.column(vocabulary.len()), vec![1.0, 2.0, 3.0, 4.0]);
    }

    #[test]
    fn test_symptom_cells() {
        let (tracking, cycles) = fixture();
        let vocabulary = vocab(&tracking);
        let m = sequence_user("u1", &tracking, &cycles, &vocabulary).unwrap();

        // columns: happy, cramps, sad, spotting, day
        assert_eq!(m.row(0), &[1.0, 1.0, 0.0, 0.0, 1.0]);
        assert_eq!(m.row(1), &[0.0, 0.0, 0.0, 0.0, 2.0]);
        assert_eq!(m.row(2), &[0.0, 0.0, 1.0, 0.0, 3.0]);
        // repeated event collapses to a single 1
        assert_eq!(m.row(3), &[0.0, 1.0, 0.0, 0.0, 4.0]);
    }

    #[test]
    fn test_single_symptom_on_third_day() {
        let tracking = vec![
            TrackingEvent::new("u", 0, date(1), "happy"),
            TrackingEvent::new("u", 0, date(3), "sad"),
        ];
        let cycles = vec![cycle("u", 0)];
        let vocabulary = vocab(&tracking);

        let m = sequence_user("u", &tracking, &cycles, &vocabulary).unwrap();

        let sad = vocabulary.index_of("sad").unwrap();
        let row = m.row(2);
        for (col, value) in row.iter().enumerate() {
            let expected = if col == sad {
                1.0
            } else if col == vocabulary.len() {
                3.0
            } else {
                0.0
            };
            assert_eq!(*value, expected, "column {col}");
        }
    }

    #[test]
    fn test_sequencing_is_idempotent() {
        let (tracking, cycles) = fixture();
        let vocabulary = vocab(&tracking);
        let a = sequence_user("u2", &tracking, &cycles, &vocabulary).unwrap();
        let b = sequence_user("u2", &tracking, &cycles, &vocabulary).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_unknown_user() {
        let (tracking, cycles) = fixture();
        let vocabulary = vocab(&tracking);
        let result = sequence_user("nobody", &tracking, &cycles, &vocabulary);
        assert!(matches!(result, Err(ComputeError::UnknownUser(u)) if u == "nobody"));
    }

    #[test]
    fn test_missing_cycle() {
        let (tracking, _) = fixture();
        let vocabulary = vocab(&tracking);

        // u1 references cycles 0 and 1; only 0 is present
        let cycles = vec![cycle("u1", 0), cycle("u2", 4)];
        let result = sequence_user("u1", &tracking, &cycles, &vocabulary);
        assert!(matches!(result, Err(ComputeError::CycleJoin { cycle_id: 1, .. })));

        // a cycle with the right id but another owner does not count
        let cycles = vec![cycle("u2", 0), cycle("u2", 1)];
        let result = sequence_user("u1", &tracking, &cycles, &vocabulary);
        assert!(matches!(result, Err(ComputeError::CycleJoin { .. })));
    }

    #[test]
    fn test_symptom_outside_vocabulary() {
        let (tracking, cycles) = fixture();
        let narrow = SymptomVocabulary::build(&["happy", "cramps", "sad"], &[]).unwrap();
        let result = sequence_user("u2", &tracking, &cycles, &narrow);
        assert!(matches!(result, Err(ComputeError::UnknownSymptom(s)) if s == "spotting"));
    }

    #[test]
    fn test_batch_stacks_in_input_order() {
        let (tracking, cycles) = fixture();
        let vocabulary = vocab(&tracking);

        let u1 = sequence_user("u1", &tracking, &cycles, &vocabulary).unwrap();
        let u2 = sequence_user("u2", &tracking, &cycles, &vocabulary).unwrap();
        let batch = sequence_users(&["u2", "u1"], &tracking, &cycles, &vocabulary).unwrap();

        assert_eq!(batch.matrix.rows(), u1.rows() + u2.rows());
        assert_eq!(batch.users[0].user_id, "u2");
        assert_eq!(batch.users[0].first_date, date(10));
        assert_eq!(batch.users[1].start_row, u2.rows());

        let head: Vec<&[f64]> = batch.user_rows(&batch.users[0]).collect();
        let expected: Vec<&[f64]> = u2.iter_rows().collect();
        assert_eq!(head, expected);
        let tail: Vec<&[f64]> = batch.user_rows(&batch.users[1]).collect();
        let expected: Vec<&[f64]> = u1.iter_rows().collect();
        assert_eq!(tail, expected);
    }

    #[test]
    fn test_batch_keeps_duplicates() {
        let (tracking, cycles) = fixture();
        let vocabulary = vocab(&tracking);
        let batch = sequence_users(&["u2", "u2"], &tracking, &cycles, &vocabulary).unwrap();
        assert_eq!(batch.users.len(), 2);
        assert_eq!(batch.matrix.rows(), 4);
    }

    #[test]
    fn test_batch_fails_fast() {
        let (tracking, cycles) = fixture();
        let vocabulary = vocab(&tracking);
        let result = sequence_users(&["u1", "ghost", "u2"], &tracking, &cycles, &vocabulary);
        assert!(matches!(result, Err(ComputeError::UnknownUser(u)) if u == "ghost"));
    }

    #[test]
    fn test_empty_batch() {
        let (tracking, cycles) = fixture();
        let vocabulary = vocab(&tracking);
        let ids: [&str; 0] = [];
        let batch = sequence_users(&ids, &tracking, &cycles, &vocabulary).unwrap();
        assert_eq!(batch.matrix.shape(), (0, vocabulary.len() + 1));
        assert!(batch.users.is_empty());
    }
}
