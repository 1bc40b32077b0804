//! Pipeline orchestration
//!
//! This module provides the high-level API for cycle-flux. A [`Sequencer`]
//! owns the loaded tables and the symptom vocabulary built from them, and
//! runs sampling, sequencing and cycle expansion against that state.

use std::path::Path;

use log::info;

use crate::cycle::CycleExpander;
use crate::dataset::DataSet;
use crate::error::ComputeError;
use crate::matrix::DayMatrix;
use crate::sampler::{rng_from_seed, sample_from_counts, DEFAULT_MIN_TRACKING_COUNT};
use crate::sequencer::{sequence_user_rows, stack_users, BatchSequence, UserSequence};
use crate::types::{CycleDay, UserId};
use crate::vocabulary::{SymptomVocabulary, SYMPTOMS_OF_INTEREST};

/// Sequencing settings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SequencerConfig {
    /// Symptoms that take the first vocabulary columns, in order
    pub symptoms_of_interest: Vec<String>,
    /// Users need strictly more tracking events than this to be sampled
    pub min_tracking_count: usize,
    /// Seed for user sampling; `None` draws from OS entropy
    pub seed: Option<u64>,
}

impl Default for SequencerConfig {
    fn default() -> Self {
        Self {
            symptoms_of_interest: SYMPTOMS_OF_INTEREST.iter().map(|s| s.to_string()).collect(),
            min_tracking_count: DEFAULT_MIN_TRACKING_COUNT,
            seed: None,
        }
    }
}

impl SequencerConfig {
    pub fn with_min_tracking_count(mut self, min_tracking_count: usize) -> Self {
        self.min_tracking_count = min_tracking_count;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn with_symptoms_of_interest<S: Into<String>>(
        mut self,
        symptoms: impl IntoIterator<Item = S>,
    ) -> Self {
        self.symptoms_of_interest = symptoms.into_iter().map(Into::into).collect();
        self
    }
}

/// Tables plus the vocabulary built from them.
///
/// The vocabulary is built once in the constructor and never changes.
pub struct Sequencer {
    dataset: DataSet,
    vocabulary: SymptomVocabulary,
    config: SequencerConfig,
}

impl Sequencer {
    /// Build the vocabulary from the dataset's tracking table
    pub fn new(dataset: DataSet, config: SequencerConfig) -> Result<Self, ComputeError> {
        let vocabulary =
            SymptomVocabulary::build(config.symptoms_of_interest.as_slice(), dataset.tracking())?;
        info!(
            "Sequencer ready: {} symptoms ({} of interest)",
            vocabulary.len(),
            vocabulary.curated_len()
        );
        Ok(Self {
            dataset,
            vocabulary,
            config,
        })
    }

    /// Load tables from a data directory and build the sequencer
    pub fn from_data_dir(data_dir: &Path, config: SequencerConfig) -> Result<Self, ComputeError> {
        Self::new(DataSet::load(data_dir)?, config)
    }

    pub fn vocabulary(&self) -> &SymptomVocabulary {
        &self.vocabulary
    }

    pub fn dataset(&self) -> &DataSet {
        &self.dataset
    }

    pub fn config(&self) -> &SequencerConfig {
        &self.config
    }

    /// Day matrix for one user
    pub fn sequence_user(&self, user_id: &str) -> Result<DayMatrix, ComputeError> {
        self.user_sequence(user_id).map(|s| s.matrix)
    }

    /// Day matrix for one user, with the date of its first row
    pub fn user_sequence(&self, user_id: &str) -> Result<UserSequence, ComputeError> {
        sequence_user_rows(
            user_id,
            &self.dataset.user_events(user_id),
            &self.dataset.user_cycles(user_id),
            &self.vocabulary,
        )
    }

    /// Stacked day matrices for several users, in the given order
    pub fn sequence_users<S: AsRef<str>>(
        &self,
        user_ids: &[S],
    ) -> Result<BatchSequence, ComputeError> {
        stack_users(user_ids, &self.vocabulary, |user_id| self.user_sequence(user_id))
    }

    /// Sample `n` qualifying users using the configured threshold and seed
    pub fn sample_users(&self, n: usize) -> Result<Vec<UserId>, ComputeError> {
        let mut rng = rng_from_seed(self.config.seed);
        sample_from_counts(
            n,
            self.config.min_tracking_count,
            &self.dataset.tracking_counts(),
            &mut rng,
        )
    }

    /// Sample `n` users and sequence them
    pub fn sample_and_sequence(&self, n: usize) -> Result<BatchSequence, ComputeError> {
        let users = self.sample_users(n)?;
        self.sequence_users(users.as_slice())
    }

    /// Expand every cycle in the dataset, rejecting overlaps
    pub fn expand_cycles(&self) -> Result<Vec<CycleDay>, ComputeError> {
        CycleExpander::expand_all(self.dataset.cycles())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sequencer::sequence_user;
    use crate::types::{CycleRecord, TrackingEvent};
    use chrono::{Days, NaiveDate};
    use pretty_assertions::assert_eq;

    const SYMPTOMS: [&str; 4] = ["cramps", "happy", "headache", "spotting"];

    /// Users u0..u5; user `u{i}` logs one symptom a day for `20 + 2i` days
    fn dataset() -> DataSet {
        let start = NaiveDate::from_ymd_opt(2023, 6, 1).unwrap();
        let mut tracking = Vec::new();
        let mut cycles = Vec::new();
        for i in 0..6u32 {
            let user = format!("u{i}");
            for day in 0..(20 + 2 * i) {
                let date = start.checked_add_days(Days::new(u64::from(day))).unwrap();
                let symptom = SYMPTOMS[(day % 4) as usize];
                tracking.push(TrackingEvent::new(&user, day / 14, date, symptom));
            }
            for cycle_id in 0..3 {
                cycles.push(CycleRecord {
                    user_id: user.clone(),
                    cycle_id,
                    cycle_start: start.checked_add_days(Days::new(u64::from(cycle_id * 14))).unwrap(),
                    cycle_length: 14,
                    period_length: 3,
                });
            }
        }
        DataSet::new(tracking, cycles)
    }

    fn sequencer(config: SequencerConfig) -> Sequencer {
        Sequencer::new(dataset(), config).unwrap()
    }

    #[test]
    fn test_vocabulary_built_from_dataset() {
        let seq = sequencer(SequencerConfig::default());
        let vocab = seq.vocabulary();
        assert_eq!(vocab.curated_len(), 16);
        // cramps, happy and headache are curated; spotting is not
        assert_eq!(vocab.len(), 17);
        assert_eq!(vocab.symptom_at(16), Some("spotting"));
    }

    #[test]
    fn test_indexed_and_table_paths_agree() {
        let seq = sequencer(SequencerConfig::default());
        let data = seq.dataset();

        let indexed = seq.sequence_user("u3").unwrap();
        let scanned = sequence_user("u3", data.tracking(), data.cycles(), seq.vocabulary()).unwrap();
        assert_eq!(indexed, scanned);
        assert_eq!(indexed.rows(), 26);
    }

    #[test]
    fn test_sample_and_sequence() {
        let config = SequencerConfig::default()
            .with_min_tracking_count(23)
            .with_seed(11);
        let seq = sequencer(config);

        // u2 (24), u3 (26), u4 (28), u5 (30) qualify
        let users = seq.sample_users(3).unwrap();
        assert_eq!(users.len(), 3);
        assert_eq!(users, seq.sample_users(3).unwrap());

        let batch = seq.sample_and_sequence(3).unwrap();
        let expected_rows: usize = users.iter().map(|u| seq.sequence_user(u).unwrap().rows()).sum();
        assert_eq!(batch.matrix.rows(), expected_rows);
        assert_eq!(
            batch.users.iter().map(|b| b.user_id.clone()).collect::<Vec<_>>(),
            users
        );

        assert!(matches!(
            seq.sample_users(5),
            Err(ComputeError::InsufficientUsers { available: 4, .. })
        ));
    }

    #[test]
    fn test_custom_symptoms_of_interest() {
        let config = SequencerConfig::default().with_symptoms_of_interest(["spotting", "happy"]);
        let seq = sequencer(config);
        assert_eq!(seq.vocabulary().symptoms(), &["spotting", "happy", "cramps", "headache"]);
    }

    #[test]
    fn test_expand_cycles() {
        let seq = sequencer(SequencerConfig::default());
        let days = seq.expand_cycles().unwrap();
        assert_eq!(days.len(), 6 * 42);
        assert_eq!(days.iter().filter(|d| d.period == 1).count(), 6 * 3 * 3);
    }
}
