//! In-memory tracking and cycle tables
//!
//! Holds both tables along with a per-user row index so batch sequencing
//! does not rescan the full tracking table for every user.

use std::collections::{BTreeMap, HashMap};
use std::path::Path;

use log::info;

use crate::error::ComputeError;
use crate::tables::{load_cycles, load_tracking, CYCLES_FILE, TRACKING_FILE};
use crate::types::{CycleRecord, TrackingEvent, UserId};

/// Tracking and cycle tables, indexed by user
#[derive(Debug, Clone, Default)]
pub struct DataSet {
    tracking: Vec<TrackingEvent>,
    cycles: Vec<CycleRecord>,
    events_by_user: HashMap<UserId, Vec<usize>>,
    cycles_by_user: HashMap<UserId, Vec<usize>>,
}

impl DataSet {
    pub fn new(tracking: Vec<TrackingEvent>, cycles: Vec<CycleRecord>) -> Self {
        let events_by_user = group_rows(tracking.iter().map(|e| e.user_id.as_str()));
        let cycles_by_user = group_rows(cycles.iter().map(|c| c.user_id.as_str()));
        Self {
            tracking,
            cycles,
            events_by_user,
            cycles_by_user,
        }
    }

    /// Load `tracking.csv` and `cycles.csv` from a data directory
    pub fn load(data_dir: &Path) -> Result<Self, ComputeError> {
        let tracking = load_tracking(&data_dir.join(TRACKING_FILE))?;
        let cycles = load_cycles(&data_dir.join(CYCLES_FILE))?;
        let dataset = Self::new(tracking, cycles);
        info!(
            "Loaded {} tracking events and {} cycles for {} users",
            dataset.tracking.len(),
            dataset.cycles.len(),
            dataset.events_by_user.len()
        );
        Ok(dataset)
    }

    pub fn tracking(&self) -> &[TrackingEvent] {
        &self.tracking
    }

    pub fn cycles(&self) -> &[CycleRecord] {
        &self.cycles
    }

    /// Tracking events of one user, in table order
    pub fn user_events(&self, user_id: &str) -> Vec<&TrackingEvent> {
        Self::rows(&self.events_by_user, user_id)
            .map(|i| &self.tracking[i])
            .collect()
    }

    /// Cycle records of one user, in table order
    pub fn user_cycles(&self, user_id: &str) -> Vec<&CycleRecord> {
        Self::rows(&self.cycles_by_user, user_id)
            .map(|i| &self.cycles[i])
            .collect()
    }

    /// Number of tracking events per user
    pub fn tracking_counts(&self) -> BTreeMap<&str, usize> {
        self.events_by_user
            .iter()
            .map(|(user, rows)| (user.as_str(), rows.len()))
            .collect()
    }

    fn rows<'a>(
        index: &'a HashMap<UserId, Vec<usize>>,
        user_id: &str,
    ) -> impl Iterator<Item = usize> + 'a {
        index.get(user_id).into_iter().flatten().copied()
    }
}

fn group_rows<'a>(users: impl Iterator<Item = &'a str>) -> HashMap<UserId, Vec<usize>> {
    let mut index: HashMap<UserId, Vec<usize>> = HashMap::new();
    for (row, user) in users.enumerate() {
        index.entry(user.to_string()).or_default().push(row);
    }
    index
}

/// Number of tracking events per user
pub fn tracking_counts(tracking: &[TrackingEvent]) -> BTreeMap<&str, usize> {
    let mut counts = BTreeMap::new();
    for event in tracking {
        *counts.entry(event.user_id.as_str()).or_insert(0) += 1;
    }
    counts
}
