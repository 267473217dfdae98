//! Habit tracking. Counts are recorded per day and activity type in an
//! [entities::ActivityLog]; [tracker_store::TrackerStore] persists it under the `activities` key
//! and derives streaks and totals.

pub mod entities;
pub mod samples;
pub mod tracker_store;
