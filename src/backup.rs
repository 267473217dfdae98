//! JSON backups of documents and activities.
//!
//! An export is a single file holding both collections and the export time. Importing one
//! overwrites both persisted collections and reloads the stores.

use std::{
    collections::HashSet,
    path::{Path, PathBuf},
};

use anyhow::Result;
use chrono::{DateTime, Local, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{error, info, warn};

use crate::{
    docs::{
        document_store::{DocumentStore, DOCUMENTS_KEY},
        entities::Document,
    },
    storage::{save_json, KeyValueStore},
    tracker::{
        entities::ActivityLog,
        tracker_store::{TrackerStore, ACTIVITIES_KEY},
    },
    utils::{clock::Clock, time::date_to_key},
};

const BACKUP_FILE_PREFIX: &str = "devdocs-backup-";
const INVALID_FORMAT_MESSAGE: &str =
    "Invalid data format. The file must contain documents and activities.";
const IMPORT_FAILED_MESSAGE: &str =
    "Failed to import data. Check that the file has the expected format.";
const ACTIVITIES_FAILED_MESSAGE: &str =
    "Failed to import data. Activities must map YYYY-MM-DD dates to non-negative whole counts.";

#[derive(PartialEq, Debug, Serialize, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct BackupSnapshot {
    pub documents: Vec<Document>,
    pub activities: ActivityLog,
    pub export_date: DateTime<Utc>,
}

impl BackupSnapshot {
    /// `devdocs-backup-YYYY-MM-DD.json`, dated in local time.
    pub fn file_name(&self) -> String {
        format!(
            "{BACKUP_FILE_PREFIX}{}.json",
            date_to_key(self.export_date.with_timezone(&Local).date_naive())
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportOutcome {
    pub success: bool,
    pub message: String,
}

impl ImportOutcome {
    fn failure(message: &str) -> Self {
        Self {
            success: false,
            message: message.into(),
        }
    }
}

/// Snapshot of both stores, stamped with the current time.
pub fn export_all_data<S: KeyValueStore, T: KeyValueStore>(
    documents: &DocumentStore<S>,
    tracker: &TrackerStore<T>,
    clock: &dyn Clock,
) -> BackupSnapshot {
    BackupSnapshot {
        documents: documents.all().to_vec(),
        activities: tracker.all().clone(),
        export_date: clock.time(),
    }
}

/// Writes the snapshot as pretty JSON into `out_dir` and returns the created file.
pub async fn write_backup(snapshot: &BackupSnapshot, out_dir: &Path) -> Result<PathBuf> {
    tokio::fs::create_dir_all(out_dir).await?;
    let path = out_dir.join(snapshot.file_name());
    let json = serde_json::to_string_pretty(snapshot)?;
    tokio::fs::write(&path, json).await?;
    info!(
        "Exported {} documents and {} days of activity to {path:?}",
        snapshot.documents.len(),
        snapshot.activities.len()
    );
    Ok(path)
}

/// Restores a backup produced by [export_all_data].
///
/// Nothing is written unless the whole payload decodes and document ids are unique. Both
/// persisted collections are replaced before either store reloads; if the second write fails the
/// previous documents are put back.
pub async fn import_data<K, S, T>(
    json: &str,
    storage: &K,
    documents: &mut DocumentStore<S>,
    tracker: &mut TrackerStore<T>,
) -> ImportOutcome
where
    K: KeyValueStore,
    S: KeyValueStore,
    T: KeyValueStore,
{
    let value = match serde_json::from_str::<Value>(json) {
        Ok(v) => v,
        Err(e) => {
            error!("Backup is not valid JSON {e}");
            return ImportOutcome::failure(IMPORT_FAILED_MESSAGE);
        }
    };

    let present = |key: &str| value.get(key).is_some_and(|v| !v.is_null());
    if !present(DOCUMENTS_KEY) || !present(ACTIVITIES_KEY) {
        warn!("Backup lacks documents or activities");
        return ImportOutcome::failure(INVALID_FORMAT_MESSAGE);
    }

    let imported_documents =
        match serde_json::from_value::<Vec<Document>>(value[DOCUMENTS_KEY].clone()) {
            Ok(v) => v,
            Err(e) => {
                error!("Backup documents don't decode {e}");
                return ImportOutcome::failure(IMPORT_FAILED_MESSAGE);
            }
        };
    let mut imported_activities =
        match serde_json::from_value::<ActivityLog>(value[ACTIVITIES_KEY].clone()) {
            Ok(v) => v,
            Err(e) => {
                error!("Backup activities don't decode {e}");
                return ImportOutcome::failure(ACTIVITIES_FAILED_MESSAGE);
            }
        };
    imported_activities.prune();

    let mut ids = HashSet::new();
    if let Some(document) = imported_documents.iter().find(|v| !ids.insert(&v.id)) {
        error!("Backup holds more than one document with id {}", document.id);
        return ImportOutcome::failure(IMPORT_FAILED_MESSAGE);
    }

    let previous_documents = match storage.get_item(DOCUMENTS_KEY).await {
        Ok(v) => v,
        Err(e) => {
            error!("Failed to read current documents {e:?}");
            return ImportOutcome::failure(IMPORT_FAILED_MESSAGE);
        }
    };
    if let Err(e) = save_json(storage, DOCUMENTS_KEY, &imported_documents).await {
        error!("Failed to store imported documents {e:?}");
        return ImportOutcome::failure(IMPORT_FAILED_MESSAGE);
    }
    if let Err(e) = save_json(storage, ACTIVITIES_KEY, &imported_activities).await {
        error!("Failed to store imported activities {e:?}");
        let restored = match previous_documents {
            Some(raw) => storage.set_item(DOCUMENTS_KEY, &raw).await,
            None => storage.remove_item(DOCUMENTS_KEY).await,
        };
        if let Err(e) = restored {
            error!("Failed to restore previous documents {e:?}");
        }
        return ImportOutcome::failure(IMPORT_FAILED_MESSAGE);
    }
    documents.load().await;
    tracker.load().await;

    info!("Imported {} documents", imported_documents.len());
    ImportOutcome {
        success: true,
        message: format!(
            "Import succeeded! {} documents and activity data were imported.",
            imported_documents.len()
        ),
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use anyhow::{bail, Result};
    use chrono::{NaiveDate, TimeZone, Utc};
    use tempfile::tempdir;

    use crate::{
        docs::{document_store::DocumentStore, entities::DocumentFields},
        storage::{file_store::JsonFileStore, KeyValueStore},
        tracker::{entities::DayActivities, tracker_store::TrackerStore},
        utils::clock::{Clock, FixedClock},
    };

    use super::{
        export_all_data, import_data, write_backup, BackupSnapshot, ACTIVITIES_FAILED_MESSAGE,
        IMPORT_FAILED_MESSAGE,
    };

    /// Storage whose activity writes always fail.
    struct ActivitiesUnwritable(Arc<JsonFileStore>);

    impl KeyValueStore for ActivitiesUnwritable {
        async fn get_item(&self, key: &str) -> Result<Option<String>> {
            self.0.get_item(key).await
        }

        async fn set_item(&self, key: &str, value: &str) -> Result<()> {
            if key == "activities" {
                bail!("disk full");
            }
            self.0.set_item(key, value).await
        }

        async fn remove_item(&self, key: &str) -> Result<()> {
            self.0.remove_item(key).await
        }
    }

    const DUPLICATE_IDS: &str = r#"{
        "documents": [
            {"id": "a", "title": "one", "content": "", "tags": [], "createdAt": "2025-03-01T00:00:00Z", "updatedAt": "2025-03-01T00:00:00Z"},
            {"id": "a", "title": "two", "content": "", "tags": [], "createdAt": "2025-03-02T00:00:00Z", "updatedAt": "2025-03-02T00:00:00Z"}
        ],
        "activities": {}
    }"#;

    type Stores = (
        Arc<JsonFileStore>,
        DocumentStore<Arc<JsonFileStore>>,
        TrackerStore<Arc<JsonFileStore>>,
    );

    fn clock() -> Arc<dyn Clock> {
        Arc::new(FixedClock(Utc.with_ymd_and_hms(2025, 3, 10, 12, 0, 0).unwrap()))
    }

    async fn open(dir: &std::path::Path) -> Result<Stores> {
        let storage = Arc::new(JsonFileStore::new(dir.to_owned())?);
        let mut documents = DocumentStore::new(storage.clone(), clock());
        documents.load().await;
        let mut tracker = TrackerStore::new(storage.clone(), clock());
        tracker.load().await;
        Ok((storage, documents, tracker))
    }

    #[tokio::test]
    async fn test_export_then_import_restores_both_collections() -> Result<()> {
        let source_dir = tempdir()?;
        let (_, mut documents, mut tracker) = open(source_dir.path()).await?;
        documents
            .create(DocumentFields::default().with_title("Exported"))
            .await;
        let day = NaiveDate::from_ymd_opt(2025, 3, 10).unwrap();
        tracker
            .save(day, DayActivities::from([("coding".to_string(), 4)]))
            .await;

        let snapshot = export_all_data(&documents, &tracker, clock().as_ref());
        let out_dir = tempdir()?;
        let path = write_backup(&snapshot, out_dir.path()).await?;
        assert!(path
            .file_name()
            .unwrap()
            .to_string_lossy()
            .starts_with("devdocs-backup-2025-03-1"));

        let json = tokio::fs::read_to_string(&path).await?;
        let exported: serde_json::Value = serde_json::from_str(&json)?;
        assert!(exported.get("exportDate").is_some());

        let target_dir = tempdir()?;
        let (storage, mut target_documents, mut target_tracker) = open(target_dir.path()).await?;
        let outcome = import_data(&json, &storage, &mut target_documents, &mut target_tracker).await;

        assert!(outcome.success, "{}", outcome.message);
        assert!(outcome.message.contains(&documents.all().len().to_string()));
        assert_eq!(target_documents.all(), documents.all());
        assert_eq!(target_tracker.all(), tracker.all());
        assert_eq!(
            serde_json::from_str::<BackupSnapshot>(&json)?.documents,
            documents.all()
        );
        Ok(())
    }

    #[tokio::test]
    async fn test_import_without_activities_changes_nothing() -> Result<()> {
        let dir = tempdir()?;
        let (storage, mut documents, mut tracker) = open(dir.path()).await?;
        let documents_before = storage.get_item("documents").await?;
        let activities_before = storage.get_item("activities").await?;

        let outcome = import_data(
            r#"{"documents": [], "exportDate": "2025-03-10T12:00:00Z"}"#,
            &storage,
            &mut documents,
            &mut tracker,
        )
        .await;

        assert!(!outcome.success);
        assert_eq!(storage.get_item("documents").await?, documents_before);
        assert_eq!(storage.get_item("activities").await?, activities_before);
        assert_eq!(documents.all().len(), 3);
        Ok(())
    }

    #[tokio::test]
    async fn test_import_rejects_malformed_payloads() -> Result<()> {
        let dir = tempdir()?;
        let (storage, mut documents, mut tracker) = open(dir.path()).await?;
        let documents_before = storage.get_item("documents").await?;

        for payload in [
            "not json at all",
            r#"{"documents": null, "activities": {}}"#,
            r#"{"documents": [{"id": 1}], "activities": {}}"#,
            r#"{"documents": [], "activities": {"yesterday": {"coding": 1}}}"#,
        ] {
            let outcome = import_data(payload, &storage, &mut documents, &mut tracker).await;
            assert!(!outcome.success, "{payload} should be rejected");
        }
        assert_eq!(storage.get_item("documents").await?, documents_before);
        Ok(())
    }

    #[tokio::test]
    async fn test_import_of_empty_collections_is_not_reseeded() -> Result<()> {
        let dir = tempdir()?;
        let (storage, mut documents, mut tracker) = open(dir.path()).await?;

        let outcome = import_data(
            r#"{"documents": [], "activities": {}}"#,
            &storage,
            &mut documents,
            &mut tracker,
        )
        .await;

        assert!(outcome.success);
        assert!(documents.all().is_empty());
        assert!(tracker.all().is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn test_import_rejects_repeated_document_ids() -> Result<()> {
        let dir = tempdir()?;
        let (storage, mut documents, mut tracker) = open(dir.path()).await?;
        let documents_before = storage.get_item("documents").await?;

        let outcome = import_data(DUPLICATE_IDS, &storage, &mut documents, &mut tracker).await;

        assert!(!outcome.success);
        assert_eq!(outcome.message, IMPORT_FAILED_MESSAGE);
        assert_eq!(storage.get_item("documents").await?, documents_before);
        assert_eq!(documents.all().len(), 3);
        Ok(())
    }

    #[tokio::test]
    async fn test_import_explains_fractional_counts() -> Result<()> {
        let dir = tempdir()?;
        let (storage, mut documents, mut tracker) = open(dir.path()).await?;
        let activities_before = storage.get_item("activities").await?;

        let outcome = import_data(
            r#"{"documents": [], "activities": {"2025-03-10": {"coding": 1.5}}}"#,
            &storage,
            &mut documents,
            &mut tracker,
        )
        .await;

        assert!(!outcome.success);
        assert_eq!(outcome.message, ACTIVITIES_FAILED_MESSAGE);
        assert_eq!(storage.get_item("activities").await?, activities_before);
        Ok(())
    }

    #[tokio::test]
    async fn test_failed_activities_write_restores_documents() -> Result<()> {
        let dir = tempdir()?;
        let (storage, mut documents, mut tracker) = open(dir.path()).await?;
        let documents_before = storage.get_item("documents").await?;
        let failing = ActivitiesUnwritable(storage.clone());

        let outcome = import_data(
            r#"{"documents": [], "activities": {"2025-03-10": {"coding": 2}}}"#,
            &failing,
            &mut documents,
            &mut tracker,
        )
        .await;

        assert!(!outcome.success);
        assert_eq!(storage.get_item("documents").await?, documents_before);
        assert_eq!(documents.all().len(), 3);
        Ok(())
    }
}
