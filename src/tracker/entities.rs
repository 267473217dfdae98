use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Counts recorded for one day, keyed by activity type (for example `coding` or `reading`).
pub type DayActivities = BTreeMap<String, u32>;

/// Sparse, date-indexed activity history.
///
/// # Invariants
/// - A day is present only when it has at least one activity entry.
/// - A missing day means zero activity for every type; callers must not distinguish it from a day
///   whose counts are all zero when computing statistics.
#[derive(PartialEq, Eq, Debug, Default, Serialize, Deserialize, Clone)]
#[serde(transparent)]
pub struct ActivityLog(BTreeMap<NaiveDate, DayActivities>);

impl ActivityLog {
    pub fn get(&self, date: NaiveDate) -> Option<&DayActivities> {
        self.0.get(&date)
    }

    /// Replaces the whole entry of `date`. An empty map removes the day instead.
    pub fn set(&mut self, date: NaiveDate, activities: DayActivities) {
        if activities.is_empty() {
            self.0.remove(&date);
        } else {
            self.0.insert(date, activities);
        }
    }

    pub fn remove(&mut self, date: NaiveDate) -> Option<DayActivities> {
        self.0.remove(&date)
    }

    pub fn days(&self) -> impl DoubleEndedIterator<Item = (NaiveDate, &DayActivities)> {
        self.0.iter().map(|(date, activities)| (*date, activities))
    }

    pub fn days_between(
        &self,
        from: NaiveDate,
        to: NaiveDate,
    ) -> impl DoubleEndedIterator<Item = (NaiveDate, &DayActivities)> {
        self.0
            .range(from..=to)
            .map(|(date, activities)| (*date, activities))
    }

    /// A day counts as active when at least one of its counts is strictly positive.
    pub fn is_active(&self, date: NaiveDate) -> bool {
        self.get(date)
            .is_some_and(|activities| activities.values().any(|v| *v > 0))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Drops days without entries. Used on data coming from outside, such as older files or
    /// imports, which may not uphold the invariant.
    pub fn prune(&mut self) {
        self.0.retain(|_, activities| !activities.is_empty());
    }
}

impl FromIterator<(NaiveDate, DayActivities)> for ActivityLog {
    fn from_iter<T: IntoIterator<Item = (NaiveDate, DayActivities)>>(iter: T) -> Self {
        let mut log = ActivityLog::default();
        for (date, activities) in iter {
            log.set(date, activities);
        }
        log
    }
}
