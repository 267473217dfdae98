use chrono::{Days, NaiveDate};
use rand::Rng;

use super::entities::{ActivityLog, DayActivities};

const SAMPLE_DAYS: u64 = 90;
const ALWAYS_ACTIVE_DAYS: u64 = 3;

/// Random but plausible activity for the 90 days up to `today`. The three most recent days always
/// carry both coding and reading so that a fresh install shows a streak.
pub fn sample_activities(today: NaiveDate, rng: &mut impl Rng) -> ActivityLog {
    let mut log = ActivityLog::default();

    for offset in 0..SAMPLE_DAYS {
        let Some(date) = today.checked_sub_days(Days::new(offset)) else {
            break;
        };

        let activities = if offset < ALWAYS_ACTIVE_DAYS {
            DayActivities::from([
                ("coding".into(), rng.random_range(3..=7)),
                ("reading".into(), rng.random_range(30..=79)),
            ])
        } else {
            // Skip some days to resemble a real history.
            if rng.random_bool(0.3) {
                continue;
            }
            let mut activities = DayActivities::new();
            if rng.random_bool(0.7) {
                activities.insert("coding".into(), rng.random_range(1..=8));
            }
            if rng.random_bool(0.6) {
                activities.insert("reading".into(), rng.random_range(1..=100));
            }
            activities
        };

        log.set(date, activities);
    }

    log
}
