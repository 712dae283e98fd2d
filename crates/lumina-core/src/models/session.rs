use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::models::subject::Subject;

/// Per-subject counts of completed learner turns.
///
/// Counts only ever increase; the whole mapping is persisted after every
/// increment. Subjects with no activity are absent from the map and read
/// as zero.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionCounters {
    counts: BTreeMap<Subject, u64>,
}

impl SessionCounters {
    pub fn count(&self, subject: Subject) -> u64 {
        self.counts.get(&subject).copied().unwrap_or(0)
    }

    /// Add one turn for `subject` and return the new count.
    pub fn increment(&mut self, subject: Subject) -> u64 {
        let entry = self.counts.entry(subject).or_insert(0);
        *entry += 1;
        *entry
    }

    pub fn total(&self) -> u64 {
        self.counts.values().sum()
    }

    /// Every subject with its count, including untouched subjects at zero.
    pub fn iter(&self) -> impl Iterator<Item = (Subject, u64)> + '_ {
        Subject::all().into_iter().map(|s| (s, self.count(s)))
    }
}
