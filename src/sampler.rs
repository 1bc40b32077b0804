//! User sampling
//!
//! Picks a random subset of users with enough tracking activity to be worth
//! sequencing. The random source is injected so runs can be reproduced.

use std::collections::BTreeMap;

use log::debug;
use rand::seq::index;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

use crate::dataset::tracking_counts;
use crate::error::ComputeError;
use crate::types::{TrackingEvent, UserId};

/// Default minimum number of tracking events (exclusive) for a user to qualify
pub const DEFAULT_MIN_TRACKING_COUNT: usize = 20;

/// Seeded rng when a seed is given, otherwise seeded from OS entropy
pub fn rng_from_seed(seed: Option<u64>) -> ChaCha8Rng {
    match seed {
        Some(seed) => ChaCha8Rng::seed_from_u64(seed),
        None => ChaCha8Rng::from_entropy(),
    }
}

/// Draw `n` distinct users with more than `min_tracking_count` tracking events
pub fn sample_users<R: Rng + ?Sized>(
    n: usize,
    min_tracking_count: usize,
    tracking: &[TrackingEvent],
    rng: &mut R,
) -> Result<Vec<UserId>, ComputeError> {
    sample_from_counts(n, min_tracking_count, &tracking_counts(tracking), rng)
}

/// Sample from precomputed per-user counts.
///
/// Candidates are taken in ascending user id order so a seeded rng always
/// yields the same draw for the same table.
pub fn sample_from_counts<R: Rng + ?Sized>(
    n: usize,
    min_tracking_count: usize,
    counts: &BTreeMap<&str, usize>,
    rng: &mut R,
) -> Result<Vec<UserId>, ComputeError> {
    let candidates: Vec<&str> = counts
        .iter()
        .filter(|(_, &count)| count > min_tracking_count)
        .map(|(&user, _)| user)
        .collect();

    if candidates.len() < n {
        return Err(ComputeError::InsufficientUsers {
            requested: n,
            available: candidates.len(),
        });
    }

    debug!(
        "Sampling {} of {} users with more than {} events",
        n,
        candidates.len(),
        min_tracking_count
    );

    Ok(index::sample(rng, candidates.len(), n)
        .into_iter()
        .map(|i| candidates[i].to_string())
        .collect())
}
