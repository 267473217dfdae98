use std::sync::Arc;

use chrono::Duration;
use tracing::{debug, error, info, warn};

use crate::{
    storage::{corrupt_key, load_json, save_json, KeyValueStore, Loaded},
    utils::clock::Clock,
};

use super::{
    entities::{dedup_by_id, normalize_tags, Document, DocumentFields, DocumentId},
    samples::sample_documents,
};

pub const DOCUMENTS_KEY: &str = "documents";
pub const DEFAULT_TITLE: &str = "Untitled document";

/// Owns the document collection and writes it back to storage after every change.
///
/// Persistence problems never reach the caller: they are logged and the in-memory collection
/// stays authoritative until the next successful write.
pub struct DocumentStore<S: KeyValueStore> {
    storage: S,
    clock: Arc<dyn Clock>,
    documents: Vec<Document>,
    selected: Option<DocumentId>,
}

impl<S: KeyValueStore> DocumentStore<S> {
    pub fn new(storage: S, clock: Arc<dyn Clock>) -> Self {
        Self {
            storage,
            clock,
            documents: Vec::new(),
            selected: None,
        }
    }

    /// Replaces the in-memory collection with the persisted one. Seeds the sample documents when
    /// nothing was stored yet or when the stored value can't be decoded.
    pub async fn load(&mut self) {
        match load_json::<Vec<Document>>(&self.storage, DOCUMENTS_KEY).await {
            Ok(Loaded::Value(mut documents)) => {
                let dropped = dedup_by_id(&mut documents);
                if !dropped.is_empty() {
                    warn!("Dropped stored documents repeating an id {dropped:?}");
                }
                debug!("Loaded {} documents", documents.len());
                self.documents = documents;
            }
            Ok(Loaded::Missing) => {
                info!("No documents stored yet, seeding samples");
                self.seed().await;
            }
            Ok(Loaded::Corrupt { raw, error }) => {
                warn!("Stored documents are unreadable, seeding samples: {error}");
                if let Err(e) = self.storage.set_item(&corrupt_key(DOCUMENTS_KEY), &raw).await {
                    error!("Failed to keep unreadable documents aside {e:?}");
                }
                self.seed().await;
            }
            Err(e) => {
                // Leave the stored value alone, it may still be fine once storage recovers.
                error!("Failed to read documents {e:?}");
                self.documents.clear();
            }
        }
        if matches!(&self.selected, Some(id) if self.get(id).is_none()) {
            self.selected = None;
        }
    }

    async fn seed(&mut self) {
        self.documents = sample_documents();
        self.persist().await;
    }

    async fn persist(&self) {
        if let Err(e) = save_json(&self.storage, DOCUMENTS_KEY, &self.documents).await {
            error!("Failed to save documents {e:?}");
        }
    }

    pub fn all(&self) -> &[Document] {
        &self.documents
    }

    pub fn get(&self, id: &DocumentId) -> Option<&Document> {
        self.documents.iter().find(|v| &v.id == id)
    }

    pub fn find_by_tag<'a>(&'a self, tag: &'a str) -> impl Iterator<Item = &'a Document> + 'a {
        self.documents.iter().filter(move |v| v.has_tag(tag))
    }

    pub fn selected(&self) -> Option<&Document> {
        self.selected.as_ref().and_then(|id| self.get(id))
    }

    pub fn select(&mut self, id: Option<DocumentId>) {
        self.selected = id;
    }

    /// Adds a document, filling omitted fields with defaults, and returns its new id.
    pub async fn create(&mut self, fields: DocumentFields) -> DocumentId {
        let mut id = DocumentId::generate();
        while self.get(&id).is_some() {
            id = DocumentId::generate();
        }
        let now = self.clock.time();
        let document = Document {
            id: id.clone(),
            title: fields
                .title
                .filter(|v| !v.trim().is_empty())
                .unwrap_or_else(|| DEFAULT_TITLE.into()),
            content: fields.content.unwrap_or_default(),
            tags: normalize_tags(fields.tags.unwrap_or_default()),
            created_at: now,
            updated_at: now,
        };
        info!("Created document {id}");
        self.documents.push(document);
        self.persist().await;
        id
    }

    /// Applies `fields` to an existing document. Returns `false` when `id` is unknown.
    pub async fn update(&mut self, id: &DocumentId, fields: DocumentFields) -> bool {
        let now = self.clock.time();
        let Some(document) = self.documents.iter_mut().find(|v| &v.id == id) else {
            debug!("Update of unknown document {id}");
            return false;
        };

        if let Some(title) = fields.title {
            document.title = title;
        }
        if let Some(content) = fields.content {
            document.content = content;
        }
        if let Some(tags) = fields.tags {
            document.tags = normalize_tags(tags);
        }
        // Last-modified must move forward even if the clock didn't.
        document.updated_at = if now > document.updated_at {
            now
        } else {
            document.updated_at + Duration::milliseconds(1)
        };

        info!("Updated document {id}");
        self.persist().await;
        true
    }

    /// Removes a document, clearing the selection if it pointed at it. Returns `false` when `id`
    /// is unknown.
    pub async fn delete(&mut self, id: &DocumentId) -> bool {
        let Some(index) = self.documents.iter().position(|v| &v.id == id) else {
            debug!("Delete of unknown document {id}");
            return false;
        };
        self.documents.remove(index);
        if self.selected.as_ref() == Some(id) {
            self.selected = None;
        }
        info!("Deleted document {id}");
        self.persist().await;
        true
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use anyhow::Result;
    use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
    use tempfile::tempdir;

    use crate::{
        docs::entities::{Document, DocumentFields, DocumentId},
        storage::{file_store::JsonFileStore, KeyValueStore},
        utils::{clock::FixedClock, logging::TEST_LOGGING},
    };

    use super::{DocumentStore, DEFAULT_TITLE, DOCUMENTS_KEY};

    const TEST_START_DATE: NaiveDateTime =
        NaiveDateTime::new(NaiveDate::from_ymd_opt(2025, 3, 10).unwrap(), NaiveTime::MIN);

    fn test_time() -> DateTime<Utc> {
        TEST_START_DATE.and_utc()
    }

    async fn open_store(storage: Arc<JsonFileStore>) -> DocumentStore<Arc<JsonFileStore>> {
        let mut store = DocumentStore::new(storage, Arc::new(FixedClock(test_time())));
        store.load().await;
        store
    }

    async fn empty_store(storage: Arc<JsonFileStore>) -> DocumentStore<Arc<JsonFileStore>> {
        storage.set_item(DOCUMENTS_KEY, "[]").await.unwrap();
        open_store(storage).await
    }

    #[tokio::test]
    async fn test_first_load_seeds_and_persists_samples() -> Result<()> {
        *TEST_LOGGING;
        let dir = tempdir()?;
        let storage = Arc::new(JsonFileStore::new(dir.path().to_owned())?);

        let store = open_store(storage.clone()).await;
        assert_eq!(store.all().len(), 3);

        let stored: Vec<Document> =
            serde_json::from_str(&storage.get_item(DOCUMENTS_KEY).await?.unwrap())?;
        assert_eq!(stored, store.all());
        Ok(())
    }

    #[tokio::test]
    async fn test_corrupt_documents_are_kept_aside() -> Result<()> {
        let dir = tempdir()?;
        let storage = Arc::new(JsonFileStore::new(dir.path().to_owned())?);
        storage.set_item(DOCUMENTS_KEY, "{\"broken\":").await?;

        let store = open_store(storage.clone()).await;

        assert_eq!(store.all().len(), 3);
        assert_eq!(
            storage.get_item("documents.corrupt").await?.as_deref(),
            Some("{\"broken\":")
        );
        Ok(())
    }

    #[tokio::test]
    async fn test_create_applies_defaults_and_survives_reload() -> Result<()> {
        let dir = tempdir()?;
        let storage = Arc::new(JsonFileStore::new(dir.path().to_owned())?);
        let mut store = empty_store(storage.clone()).await;

        let plain = store.create(DocumentFields::default()).await;
        let tagged = store
            .create(
                DocumentFields::default()
                    .with_title("Borrowing")
                    .with_content("Only one mutable borrow")
                    .with_tags(["rust", "Rust", "notes"]),
            )
            .await;
        assert_ne!(plain, tagged);

        let reloaded = open_store(storage).await;
        let plain = reloaded.get(&plain).unwrap();
        assert_eq!(plain.title, DEFAULT_TITLE);
        assert_eq!(plain.content, "");
        assert!(plain.tags.is_empty());
        assert_eq!(plain.created_at, test_time());
        assert_eq!(plain.updated_at, test_time());

        let tagged = reloaded.get(&tagged).unwrap();
        assert_eq!(tagged.title, "Borrowing");
        assert_eq!(tagged.tags, vec!["rust", "notes"]);
        Ok(())
    }

    #[tokio::test]
    async fn test_update_unknown_leaves_storage_untouched() -> Result<()> {
        let dir = tempdir()?;
        let storage = Arc::new(JsonFileStore::new(dir.path().to_owned())?);
        let mut store = open_store(storage.clone()).await;
        let before = storage.get_item(DOCUMENTS_KEY).await?;

        let updated = store
            .update(
                &DocumentId::from("missing"),
                DocumentFields::default().with_title("nope"),
            )
            .await;

        assert!(!updated);
        assert_eq!(storage.get_item(DOCUMENTS_KEY).await?, before);
        Ok(())
    }

    #[tokio::test]
    async fn test_update_moves_last_modified_forward() -> Result<()> {
        let dir = tempdir()?;
        let storage = Arc::new(JsonFileStore::new(dir.path().to_owned())?);
        let mut store = empty_store(storage.clone()).await;
        let id = store.create(DocumentFields::default().with_title("Draft")).await;

        assert!(store.update(&id, DocumentFields::default().with_content("first")).await);
        let first = store.get(&id).unwrap().updated_at;
        assert!(store.update(&id, DocumentFields::default().with_content("second")).await);

        let reloaded = open_store(storage).await;
        let document = reloaded.get(&id).unwrap();
        assert_eq!(document.title, "Draft");
        assert_eq!(document.content, "second");
        assert!(first > test_time());
        assert!(document.updated_at > first);
        assert_eq!(document.created_at, test_time());
        Ok(())
    }

    #[tokio::test]
    async fn test_delete_clears_only_matching_selection() -> Result<()> {
        let dir = tempdir()?;
        let storage = Arc::new(JsonFileStore::new(dir.path().to_owned())?);
        let mut store = empty_store(storage).await;
        let first = store.create(DocumentFields::default()).await;
        let second = store.create(DocumentFields::default()).await;

        store.select(Some(first.clone()));
        assert!(store.delete(&second).await);
        assert_eq!(store.selected().map(|v| &v.id), Some(&first));

        assert!(store.delete(&first).await);
        assert!(store.selected().is_none());
        assert!(!store.delete(&first).await);
        assert!(store.all().is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn test_find_by_tag_ignores_case() -> Result<()> {
        let dir = tempdir()?;
        let storage = Arc::new(JsonFileStore::new(dir.path().to_owned())?);
        let store = open_store(storage).await;

        let titles = store.find_by_tag("guide").map(|v| v.title.as_str()).collect::<Vec<_>>();
        assert_eq!(titles, vec!["Getting started with devdocs", "Habit tracking"]);
        Ok(())
    }

    #[tokio::test]
    async fn test_load_drops_documents_repeating_an_id() -> Result<()> {
        let dir = tempdir()?;
        let storage = Arc::new(JsonFileStore::new(dir.path().to_owned())?);
        storage
            .set_item(
                DOCUMENTS_KEY,
                r#"[
                    {"id": "a", "title": "one", "content": "", "createdAt": "2025-03-01T00:00:00Z", "updatedAt": "2025-03-01T00:00:00Z"},
                    {"id": "a", "title": "two", "content": "", "createdAt": "2025-03-02T00:00:00Z", "updatedAt": "2025-03-02T00:00:00Z"}
                ]"#,
            )
            .await?;

        let mut store = open_store(storage).await;
        assert_eq!(store.all().len(), 1);
        assert_eq!(store.get(&DocumentId::from("a")).map(|v| v.title.as_str()), Some("one"));

        assert!(store.delete(&DocumentId::from("a")).await);
        assert!(store.get(&DocumentId::from("a")).is_none());
        Ok(())
    }
}
