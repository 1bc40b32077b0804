//! Symptom vocabulary
//!
//! Maps every symptom code to a dense column index. The curated symptoms of
//! interest always occupy the first columns, in their given order; every
//! other observed code follows in lexicographic order.

use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};

use log::debug;
use serde::{Deserialize, Deserializer, Serialize};

use crate::error::ComputeError;
use crate::types::TrackingEvent;

/// Default curated list of symptoms of interest
pub const SYMPTOMS_OF_INTEREST: [&str; 16] = [
    "happy",
    "pms",
    "sad",
    "sensitive_emotion",
    "energized",
    "exhausted",
    "high_energy",
    "low_energy",
    "cramps",
    "headache",
    "ovulation_pain",
    "tender_breasts",
    "acne_skin",
    "good_skin",
    "oily_skin",
    "dry_skin",
];

/// Immutable symptom code -> column index mapping
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SymptomVocabulary {
    symptoms: Vec<String>,
    #[serde(skip)]
    codes: HashMap<String, usize>,
    curated_len: usize,
}

/// Serialized form; the lookup table is rebuilt from it
#[derive(Deserialize)]
struct VocabularyParts {
    symptoms: Vec<String>,
    curated_len: usize,
}

impl<'de> Deserialize<'de> for SymptomVocabulary {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let parts = VocabularyParts::deserialize(deserializer)?;
        Self::from_parts(parts).map_err(serde::de::Error::custom)
    }
}

impl SymptomVocabulary {
    /// Build the vocabulary from a curated list and the tracking table.
    ///
    /// Curated symptoms take indices `[0, K)` whether or not they were
    /// observed; the remaining observed symptoms follow.
    pub fn build<S: AsRef<str>>(
        curated: &[S],
        events: &[TrackingEvent],
    ) -> Result<Self, ComputeError> {
        let mut seen = HashSet::with_capacity(curated.len());
        for symptom in curated {
            if !seen.insert(symptom.as_ref()) {
                return Err(ComputeError::DuplicateSymptom(symptom.as_ref().to_string()));
            }
        }

        let others: BTreeSet<&str> = events
            .iter()
            .map(|e| e.symptom.as_str())
            .filter(|s| !seen.contains(s))
            .collect();

        let symptoms: Vec<String> = curated
            .iter()
            .map(|s| s.as_ref().to_string())
            .chain(others.into_iter().map(str::to_string))
            .collect();

        debug!(
            "Built symptom vocabulary: {} curated, {} total",
            curated.len(),
            symptoms.len()
        );

        Ok(Self::from_ordered(symptoms, curated.len()))
    }

    /// Build with the default symptoms of interest
    pub fn with_default_interest(events: &[TrackingEvent]) -> Result<Self, ComputeError> {
        Self::build(&SYMPTOMS_OF_INTEREST, events)
    }

    /// Check a stored ordering before rebuilding the lookup table
    fn from_parts(parts: VocabularyParts) -> Result<Self, ComputeError> {
        if parts.curated_len > parts.symptoms.len() {
            return Err(ComputeError::EncodingError(format!(
                "vocabulary lists {} curated symptoms but only {} symptoms",
                parts.curated_len,
                parts.symptoms.len()
            )));
        }
        let mut seen = HashSet::with_capacity(parts.symptoms.len());
        for symptom in &parts.symptoms {
            if !seen.insert(symptom.as_str()) {
                return Err(ComputeError::DuplicateSymptom(symptom.clone()));
            }
        }
        Ok(Self::from_ordered(parts.symptoms, parts.curated_len))
    }

    fn from_ordered(symptoms: Vec<String>, curated_len: usize) -> Self {
        let codes = symptoms
            .iter()
            .enumerate()
            .map(|(i, s)| (s.clone(), i))
            .collect();
        Self {
            symptoms,
            codes,
            curated_len,
        }
    }

    /// Number of symptom columns (N)
    pub fn len(&self) -> usize {
        self.symptoms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.symptoms.is_empty()
    }

    /// Number of curated symptoms of interest (K)
    pub fn curated_len(&self) -> usize {
        self.curated_len
    }

    /// Column index of a symptom code
    pub fn index_of(&self, symptom: &str) -> Result<usize, ComputeError> {
        self.codes
            .get(symptom)
            .copied()
            .ok_or_else(|| ComputeError::UnknownSymptom(symptom.to_string()))
    }

    /// Symptom code at a column index
    pub fn symptom_at(&self, index: usize) -> Option<&str> {
        self.symptoms.get(index).map(String::as_str)
    }

    /// All symptom codes in column order
    pub fn symptoms(&self) -> &[String] {
        &self.symptoms
    }

    /// Column index for each event, in event order
    pub fn annotate(&self, events: &[TrackingEvent]) -> Result<Vec<usize>, ComputeError> {
        events.iter().map(|e| self.index_of(&e.symptom)).collect()
    }

    /// Index -> symptom for the curated symptoms of interest
    pub fn interest_codes(&self) -> BTreeMap<usize, &str> {
        self.symptoms[..self.curated_len]
            .iter()
            .enumerate()
            .map(|(i, s)| (i, s.as_str()))
            .collect()
    }

    /// Parse a stored vocabulary, rejecting duplicate or missing columns
    pub fn from_json(json: &str) -> Result<Self, ComputeError> {
        Self::from_parts(serde_json::from_str(json)?)
    }

    pub fn to_json(&self) -> Result<String, ComputeError> {
        Ok(serde_json::to_string(self)?)
    }
}
