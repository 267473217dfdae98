use std::sync::Arc;

use anyhow::Result;
use tracing::{debug, info};

use crate::{
    config::AppConfig,
    docs::document_store::DocumentStore,
    github::{
        settings::SettingsStore,
        transport::{HttpTransport, ReqwestTransport},
    },
    storage::file_store::JsonFileStore,
    tracker::tracker_store::TrackerStore,
    utils::clock::{Clock, DefaultClock},
};

pub type SharedStorage = Arc<JsonFileStore>;

/// Every store of the application, wired to one storage directory, clock and transport.
///
/// Built with [Services::open] and torn down with [Services::shutdown]. Stores write through on
/// every mutation, so shutting down only has to release them.
pub struct Services {
    pub storage: SharedStorage,
    pub clock: Arc<dyn Clock>,
    pub documents: DocumentStore<SharedStorage>,
    pub tracker: TrackerStore<SharedStorage>,
    pub settings: SettingsStore<SharedStorage>,
}

impl Services {
    pub async fn open(config: &AppConfig) -> Result<Self> {
        let transport = ReqwestTransport::new()?;
        Self::open_with(config, Arc::new(DefaultClock), Arc::new(transport)).await
    }

    pub async fn open_with(
        config: &AppConfig,
        clock: Arc<dyn Clock>,
        transport: Arc<dyn HttpTransport>,
    ) -> Result<Self> {
        let storage = Arc::new(JsonFileStore::new(config.storage_dir())?);
        debug!("Opening stores in {:?}", storage.dir());

        let mut settings = SettingsStore::new(storage.clone(), transport, config.api_host.clone());
        settings.load().await;
        let mut documents = DocumentStore::new(storage.clone(), clock.clone());
        documents.load().await;
        let mut tracker = TrackerStore::new(storage.clone(), clock.clone());
        tracker.load().await;

        Ok(Self {
            storage,
            clock,
            documents,
            tracker,
            settings,
        })
    }

    pub fn shutdown(self) {
        info!(
            "Closing stores with {} documents and {} tracked days",
            self.documents.all().len(),
            self.tracker.all().len()
        );
    }
}
