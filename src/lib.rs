//! Cycle Flux - day-indexed sequences from symptom tracking and cycle records
//!
//! Flux turns sparse per-user symptom logs into dense, fixed-width matrices
//! suitable as model input: symptom vocabulary → user sampling → per-user
//! sequencing → batch stacking → JSON encoding. Cycle records can be
//! expanded into per-day calendar tables alongside.
//!
//! ## Modules
//!
//! - **Vocabulary**: stable symptom → column ordering, symptoms of interest first
//! - **Sequencer**: per-user day matrices and row-stacked batches
//! - **Sampler**: reproducible selection of sufficiently active users
//! - **Cycle**: per-day expansion of cycle records

pub mod cycle;
pub mod dataset;
pub mod encoder;
pub mod error;
pub mod matrix;
pub mod pipeline;
pub mod sampler;
pub mod sequencer;
pub mod tables;
pub mod types;
pub mod vocabulary;

pub use cycle::{expand_cycle, expand_cycles, CycleExpander};
pub use dataset::DataSet;
pub use encoder::{SequenceEncoder, SequencePayload};
pub use error::ComputeError;
pub use matrix::DayMatrix;
pub use pipeline::{Sequencer, SequencerConfig};
pub use sampler::sample_users;
pub use sequencer::{sequence_user, sequence_users, BatchSequence, UserBlock};
pub use types::{CycleDay, CycleId, CycleRecord, TrackingEvent, UserId};
pub use vocabulary::{SymptomVocabulary, SYMPTOMS_OF_INTEREST};

/// Flux version embedded in all encoded payloads
pub const FLUX_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Producer name for encoded payloads
pub const PRODUCER_NAME: &str = "cycle-flux";
