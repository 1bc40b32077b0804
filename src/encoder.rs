//! Sequence encoding
//!
//! Wraps a batch of user sequences into a self-describing JSON payload:
//! producer metadata, the column vocabulary, per-user row ranges and the
//! matrix itself as an array of rows.
//!
//! The payload is what the CLI writes for downstream model code to read.
//! It is an output envelope only; nothing in the crate loads it back.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::ComputeError;
use crate::sequencer::{BatchSequence, UserBlock};
use crate::vocabulary::SymptomVocabulary;
use crate::{FLUX_VERSION, PRODUCER_NAME};

/// Current payload format version
pub const SEQUENCE_FORMAT_VERSION: &str = "1.0.0";

/// Name of the trailing day-counter column
pub const DAY_COLUMN: &str = "day";

/// Producer metadata
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SequenceProducer {
    pub name: String,
    pub version: String,
    pub instance_id: String,
}

/// Encoded batch of user sequences
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SequencePayload {
    pub format_version: String,
    pub producer: SequenceProducer,
    pub computed_at_utc: String,
    /// Number of curated symptom columns at the front of `columns`
    pub symptoms_of_interest: usize,
    /// Column names: every symptom in index order, then the day counter
    pub columns: Vec<String>,
    pub users: Vec<UserBlock>,
    pub matrix: Vec<Vec<f64>>,
}

/// Encoder for producing sequence payloads
pub struct SequenceEncoder {
    instance_id: String,
}

impl Default for SequenceEncoder {
    fn default() -> Self {
        Self::new()
    }
}

impl SequenceEncoder {
    /// Create a new encoder with a unique instance ID
    pub fn new() -> Self {
        Self {
            instance_id: Uuid::new_v4().to_string(),
        }
    }

    /// Create an encoder with a specific instance ID
    pub fn with_instance_id(instance_id: String) -> Self {
        Self { instance_id }
    }

    pub fn encode(
        &self,
        batch: &BatchSequence,
        vocabulary: &SymptomVocabulary,
    ) -> Result<SequencePayload, ComputeError> {
        let columns: Vec<String> = vocabulary
            .symptoms()
            .iter()
            .cloned()
            .chain(std::iter::once(DAY_COLUMN.to_string()))
            .collect();

        if columns.len() != batch.matrix.cols() {
            return Err(ComputeError::EncodingError(format!(
                "batch has {} columns but the vocabulary describes {}",
                batch.matrix.cols(),
                columns.len()
            )));
        }

        Ok(SequencePayload {
            format_version: SEQUENCE_FORMAT_VERSION.to_string(),
            producer: SequenceProducer {
                name: PRODUCER_NAME.to_string(),
                version: FLUX_VERSION.to_string(),
                instance_id: self.instance_id.clone(),
            },
            computed_at_utc: Utc::now().to_rfc3339(),
            symptoms_of_interest: vocabulary.curated_len(),
            columns,
            users: batch.users.clone(),
            matrix: batch.matrix.to_nested(),
        })
    }

    /// Encode to a pretty-printed JSON string
    pub fn encode_to_json(
        &self,
        batch: &BatchSequence,
        vocabulary: &SymptomVocabulary,
    ) -> Result<String, ComputeError> {
        let payload = self.encode(batch, vocabulary)?;
        serde_json::to_string_pretty(&payload).map_err(ComputeError::Json)
    }
}
