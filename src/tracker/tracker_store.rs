use std::{collections::BTreeMap, sync::Arc};

use chrono::{Days, Months, NaiveDate};
use tracing::{debug, error, info, warn};

use crate::{
    storage::{corrupt_key, load_json, save_json, KeyValueStore, Loaded},
    utils::{clock::Clock, time::month_start},
};

use super::{
    entities::{ActivityLog, DayActivities},
    samples::sample_activities,
};

pub const ACTIVITIES_KEY: &str = "activities";

/// Owns the activity history and answers the aggregate queries shown by the tracker.
pub struct TrackerStore<S: KeyValueStore> {
    storage: S,
    clock: Arc<dyn Clock>,
    activities: ActivityLog,
}

impl<S: KeyValueStore> TrackerStore<S> {
    pub fn new(storage: S, clock: Arc<dyn Clock>) -> Self {
        Self {
            storage,
            clock,
            activities: ActivityLog::default(),
        }
    }

    /// Replaces the in-memory history with the persisted one, seeding sample data when nothing is
    /// stored or the stored value can't be decoded.
    pub async fn load(&mut self) {
        match load_json::<ActivityLog>(&self.storage, ACTIVITIES_KEY).await {
            Ok(Loaded::Value(mut activities)) => {
                activities.prune();
                debug!("Loaded activities for {} days", activities.len());
                self.activities = activities;
            }
            Ok(Loaded::Missing) => {
                info!("No activities stored yet, seeding samples");
                self.seed().await;
            }
            Ok(Loaded::Corrupt { raw, error }) => {
                warn!("Stored activities are unreadable, seeding samples: {error}");
                if let Err(e) = self.storage.set_item(&corrupt_key(ACTIVITIES_KEY), &raw).await {
                    error!("Failed to keep unreadable activities aside {e:?}");
                }
                self.seed().await;
            }
            Err(e) => {
                error!("Failed to read activities {e:?}");
                self.activities = ActivityLog::default();
            }
        }
    }

    async fn seed(&mut self) {
        self.activities = sample_activities(self.clock.today(), &mut rand::rng());
        self.persist().await;
    }

    async fn persist(&self) {
        if let Err(e) = save_json(&self.storage, ACTIVITIES_KEY, &self.activities).await {
            error!("Failed to save activities {e:?}");
        }
    }

    pub fn all(&self) -> &ActivityLog {
        &self.activities
    }

    /// Replaces everything recorded for `date`.
    pub async fn save(&mut self, date: NaiveDate, activities: DayActivities) {
        debug!("Saving activities for {date}: {activities:?}");
        self.activities.set(date, activities);
        self.persist().await;
    }

    /// Forgets `date`. Returns `false` if nothing was recorded for it.
    pub async fn clear(&mut self, date: NaiveDate) -> bool {
        if self.activities.remove(date).is_none() {
            return false;
        }
        self.persist().await;
        true
    }

    pub fn by_date(&self, date: NaiveDate) -> Option<&DayActivities> {
        self.activities.get(date)
    }

    /// Days with a strictly positive count for `activity`.
    pub fn by_type(&self, activity: &str) -> BTreeMap<NaiveDate, u32> {
        self.activities
            .days()
            .filter_map(|(date, activities)| {
                activities
                    .get(activity)
                    .filter(|v| **v > 0)
                    .map(|v| (date, *v))
            })
            .collect()
    }

    /// Days inside one calendar month. `month_index` is 0-based (0 is January); out of range
    /// indices yield nothing.
    pub fn by_month(&self, year: i32, month_index: u32) -> BTreeMap<NaiveDate, DayActivities> {
        let Some(first) = month_start(year, month_index) else {
            return BTreeMap::new();
        };
        let Some(last) = first
            .checked_add_months(Months::new(1))
            .and_then(|v| v.pred_opt())
        else {
            return BTreeMap::new();
        };
        self.activities
            .days_between(first, last)
            .map(|(date, activities)| (date, activities.clone()))
            .collect()
    }

    /// Sum of every activity type over the whole history.
    pub fn totals_by_type(&self) -> BTreeMap<String, u64> {
        let mut totals = BTreeMap::<String, u64>::new();
        for (_, activities) in self.activities.days() {
            for (activity, count) in activities {
                *totals.entry(activity.clone()).or_default() += u64::from(*count);
            }
        }
        totals
    }

    /// Consecutive active days ending today. When today has no activity yet the count ends
    /// yesterday instead, so an unfinished day doesn't reset the streak.
    pub fn current_streak(&self) -> u32 {
        current_streak(&self.activities, self.clock.today())
    }
}

fn current_streak(activities: &ActivityLog, today: NaiveDate) -> u32 {
    let start = if activities.is_active(today) {
        Some(today)
    } else {
        today.pred_opt()
    };

    let mut streak = 0;
    let mut day = start;
    while let Some(current) = day.filter(|v| activities.is_active(*v)) {
        streak += 1;
        day = current.checked_sub_days(Days::new(1));
    }
    streak
}

#[cfg(test)]
mod tests {
    use std::{collections::BTreeMap, sync::Arc};

    use anyhow::Result;
    use chrono::{Days, NaiveDate, NaiveTime, TimeZone, Utc};
    use tempfile::tempdir;

    use crate::{
        storage::{file_store::JsonFileStore, KeyValueStore},
        tracker::entities::{ActivityLog, DayActivities},
        utils::clock::{Clock, FixedClock},
    };

    use super::{current_streak, TrackerStore, ACTIVITIES_KEY};

    fn date(year: i32, month: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(year, month, day).unwrap()
    }

    fn counts(values: &[(&str, u32)]) -> DayActivities {
        values.iter().map(|(k, v)| (k.to_string(), *v)).collect()
    }

    fn clock() -> Arc<dyn Clock> {
        Arc::new(FixedClock(
            Utc.from_utc_datetime(&date(2025, 3, 10).and_time(NaiveTime::from_hms_opt(12, 0, 0).unwrap())),
        ))
    }

    async fn empty_store(storage: Arc<JsonFileStore>) -> TrackerStore<Arc<JsonFileStore>> {
        storage.set_item(ACTIVITIES_KEY, "{}").await.unwrap();
        let mut store = TrackerStore::new(storage, clock());
        store.load().await;
        store
    }

    #[tokio::test]
    async fn test_save_then_read_and_clear() -> Result<()> {
        let dir = tempdir()?;
        let storage = Arc::new(JsonFileStore::new(dir.path().to_owned())?);
        let mut store = empty_store(storage.clone()).await;
        let day = date(2025, 3, 10);

        store.save(day, counts(&[("coding", 4)])).await;
        assert_eq!(store.by_date(day), Some(&counts(&[("coding", 4)])));

        let mut reloaded = TrackerStore::new(storage.clone(), clock());
        reloaded.load().await;
        assert_eq!(reloaded.by_date(day), Some(&counts(&[("coding", 4)])));

        assert!(store.clear(day).await);
        assert_eq!(store.by_date(day), None);
        assert!(!store.clear(day).await);
        assert_eq!(storage.get_item(ACTIVITIES_KEY).await?.as_deref(), Some("{}"));
        Ok(())
    }

    #[tokio::test]
    async fn test_save_replaces_whole_day() -> Result<()> {
        let dir = tempdir()?;
        let storage = Arc::new(JsonFileStore::new(dir.path().to_owned())?);
        let mut store = empty_store(storage).await;
        let day = date(2025, 3, 10);

        store.save(day, counts(&[("coding", 4), ("reading", 20)])).await;
        store.save(day, counts(&[("reading", 5)])).await;

        assert_eq!(store.by_date(day), Some(&counts(&[("reading", 5)])));
        Ok(())
    }

    #[tokio::test]
    async fn test_missing_activities_are_seeded() -> Result<()> {
        let dir = tempdir()?;
        let storage = Arc::new(JsonFileStore::new(dir.path().to_owned())?);

        let mut store = TrackerStore::new(storage.clone(), clock());
        store.load().await;

        assert!(!store.all().is_empty());
        assert!(store.current_streak() >= 3);
        assert!(storage.get_item(ACTIVITIES_KEY).await?.is_some());
        Ok(())
    }

    #[tokio::test]
    async fn test_corrupt_activities_are_kept_aside() -> Result<()> {
        let dir = tempdir()?;
        let storage = Arc::new(JsonFileStore::new(dir.path().to_owned())?);
        storage.set_item(ACTIVITIES_KEY, "[1, 2").await?;

        let mut store = TrackerStore::new(storage.clone(), clock());
        store.load().await;

        assert!(!store.all().is_empty());
        assert_eq!(
            storage.get_item("activities.corrupt").await?.as_deref(),
            Some("[1, 2")
        );
        Ok(())
    }

    #[tokio::test]
    async fn test_loaded_empty_days_are_pruned() -> Result<()> {
        let dir = tempdir()?;
        let storage = Arc::new(JsonFileStore::new(dir.path().to_owned())?);
        storage
            .set_item(ACTIVITIES_KEY, r#"{"2025-03-01":{},"2025-03-02":{"coding":1}}"#)
            .await?;

        let mut store = TrackerStore::new(storage, clock());
        store.load().await;

        assert_eq!(store.all().len(), 1);
        assert_eq!(store.by_date(date(2025, 3, 1)), None);
        Ok(())
    }

    #[tokio::test]
    async fn test_queries_by_type_month_and_totals() -> Result<()> {
        let dir = tempdir()?;
        let storage = Arc::new(JsonFileStore::new(dir.path().to_owned())?);
        let mut store = empty_store(storage).await;

        store.save(date(2025, 2, 28), counts(&[("coding", 1)])).await;
        store.save(date(2025, 3, 1), counts(&[("coding", 2), ("reading", 0)])).await;
        store.save(date(2025, 3, 31), counts(&[("reading", 40)])).await;
        store.save(date(2025, 4, 1), counts(&[("coding", 3)])).await;

        assert_eq!(
            store.by_type("coding"),
            BTreeMap::from([
                (date(2025, 2, 28), 1),
                (date(2025, 3, 1), 2),
                (date(2025, 4, 1), 3),
            ])
        );
        assert_eq!(store.by_type("reading"), BTreeMap::from([(date(2025, 3, 31), 40)]));

        let march = store.by_month(2025, 2);
        assert_eq!(
            march.keys().copied().collect::<Vec<_>>(),
            vec![date(2025, 3, 1), date(2025, 3, 31)]
        );
        assert!(store.by_month(2025, 12).is_empty());
        assert_eq!(store.by_month(2025, 1).len(), 1);

        assert_eq!(
            store.totals_by_type(),
            BTreeMap::from([("coding".to_string(), 6), ("reading".to_string(), 40)])
        );
        Ok(())
    }

    fn active_days(today: NaiveDate, offsets: &[u64]) -> ActivityLog {
        offsets
            .iter()
            .map(|offset| {
                (
                    today.checked_sub_days(Days::new(*offset)).unwrap(),
                    counts(&[("coding", 1)]),
                )
            })
            .collect()
    }

    #[test]
    fn test_streak_including_today() {
        let today = date(2025, 3, 10);
        let log = active_days(today, &[0, 1, 2, 3, 5]);
        assert_eq!(current_streak(&log, today), 4);
    }

    #[test]
    fn test_streak_ending_yesterday_survives_inactive_today() {
        let today = date(2025, 3, 10);
        let log = active_days(today, &[1, 2, 3]);
        assert_eq!(current_streak(&log, today), 3);
    }

    #[test]
    fn test_streak_zero_counts_do_not_qualify() {
        let today = date(2025, 3, 10);
        let mut log = active_days(today, &[0, 2]);
        log.set(date(2025, 3, 9), counts(&[("coding", 0)]));
        assert_eq!(current_streak(&log, today), 1);
        assert_eq!(current_streak(&ActivityLog::default(), today), 0);
        assert_eq!(current_streak(&active_days(today, &[2, 3]), today), 0);
    }

    #[tokio::test]
    async fn test_store_streak_uses_clock_today() -> Result<()> {
        let dir = tempdir()?;
        let storage = Arc::new(JsonFileStore::new(dir.path().to_owned())?);
        let mut store = empty_store(storage).await;
        let today = clock().today();

        for offset in 0..4 {
            store
                .save(
                    today.checked_sub_days(Days::new(offset)).unwrap(),
                    counts(&[("reading", 10)]),
                )
                .await;
        }
        assert_eq!(store.current_streak(), 4);

        store.clear(today).await;
        assert_eq!(store.current_streak(), 3);
        Ok(())
    }
}
