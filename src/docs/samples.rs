use chrono::{DateTime, NaiveDate, Utc};

use super::entities::{Document, DocumentId};

fn day(year: i32, month: u32, day: u32) -> DateTime<Utc> {
    NaiveDate::from_ymd_opt(year, month, day)
        .and_then(|v| v.and_hms_opt(9, 0, 0))
        .map(|v| v.and_utc())
        .unwrap_or_default()
}

/// Documents written on first run, or when the stored collection can't be read.
pub fn sample_documents() -> Vec<Document> {
    vec![
        Document {
            id: DocumentId::generate(),
            title: "Getting started with devdocs".into(),
            content: "# devdocs\n\n\
                      Notes live in local storage and can be mirrored to a GitHub repository.\n\n\
                      ## Commands\n\n\
                      ```bash\n\
                      devdocs docs new --title \"My note\" --tag rust\n\
                      devdocs track set today coding=2\n\
                      devdocs export --out ~/backups\n\
                      ```\n"
                .into(),
            tags: vec!["devdocs".into(), "Guide".into()],
            created_at: day(2025, 3, 10),
            updated_at: day(2025, 3, 15),
        },
        Document {
            id: DocumentId::generate(),
            title: "Ownership cheat sheet".into(),
            content: "# Ownership\n\n\
                      - Each value has a single owner.\n\
                      - Any number of shared borrows, or exactly one mutable borrow.\n\
                      - Values are dropped when their owner goes out of scope.\n"
                .into(),
            tags: vec!["Rust".into(), "Programming".into()],
            created_at: day(2025, 3, 12),
            updated_at: day(2025, 3, 12),
        },
        Document {
            id: DocumentId::generate(),
            title: "Habit tracking".into(),
            content: "# Tracking habits\n\n\
                      Record a count per activity and day. A streak grows for every consecutive \
                      day with at least one positive count, and missing today does not break a \
                      streak that ended yesterday.\n"
                .into(),
            tags: vec!["Tracker".into(), "Guide".into()],
            created_at: day(2025, 3, 14),
            updated_at: day(2025, 3, 18),
        },
    ]
}
