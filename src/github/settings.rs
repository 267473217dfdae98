use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, warn};

use crate::storage::{load_json, save_json, KeyValueStore, Loaded};

use super::{
    client::{GitHubClient, GitHubConfig},
    transport::HttpTransport,
};

pub const SETTINGS_KEY: &str = "github_settings";
pub const DEFAULT_BRANCH: &str = "main";
pub const DEFAULT_DOCS_FOLDER: &str = "docs";

const MISSING_FIELDS_MESSAGE: &str = "Please fill in the owner, repository and token.";
const CONNECTED_MESSAGE: &str = "Successfully connected to GitHub!";

/// Flat record persisted under [SETTINGS_KEY].
#[derive(PartialEq, Eq, Serialize, Deserialize, Clone)]
#[serde(rename_all = "camelCase", default)]
pub struct GitHubSettings {
    pub owner: String,
    pub repo: String,
    pub token: String,
    pub branch: String,
    pub docs_folder: String,
}

impl Default for GitHubSettings {
    fn default() -> Self {
        Self {
            owner: String::new(),
            repo: String::new(),
            token: String::new(),
            branch: DEFAULT_BRANCH.into(),
            docs_folder: DEFAULT_DOCS_FOLDER.into(),
        }
    }
}

impl std::fmt::Debug for GitHubSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GitHubSettings")
            .field("owner", &self.owner)
            .field("repo", &self.repo)
            .field("token", &if self.token.is_empty() { "" } else { "<redacted>" })
            .field("branch", &self.branch)
            .field("docs_folder", &self.docs_folder)
            .finish()
    }
}

impl GitHubSettings {
    /// The mirror is usable only once owner, repository and token are all set.
    pub fn is_configured(&self) -> bool {
        [&self.owner, &self.repo, &self.token]
            .iter()
            .all(|v| !v.trim().is_empty())
    }

    /// Trims every field and puts the defaults back into blank branch and folder values.
    fn normalized(self) -> Self {
        let or_default = |value: String, default: &str| {
            let value = value.trim();
            if value.is_empty() {
                default.to_string()
            } else {
                value.to_string()
            }
        };
        Self {
            owner: self.owner.trim().to_string(),
            repo: self.repo.trim().to_string(),
            token: self.token.trim().to_string(),
            branch: or_default(self.branch, DEFAULT_BRANCH),
            docs_folder: or_default(self.docs_folder, DEFAULT_DOCS_FOLDER)
                .trim_matches('/')
                .to_string(),
        }
    }

    pub fn to_config(&self, host: &str) -> GitHubConfig {
        GitHubConfig {
            host: host.to_string(),
            owner: self.owner.clone(),
            repo: self.repo.clone(),
            token: self.token.clone(),
            branch: self.branch.clone(),
        }
    }
}

/// Result of [SettingsStore::test_connection], meant to be shown to the user as is.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionReport {
    pub success: bool,
    pub message: String,
}

/// Holds the mirror credentials and the client built from them.
///
/// At most one client is cached. Any change to the settings drops it, and the next call to
/// [SettingsStore::client] builds a fresh one.
pub struct SettingsStore<S: KeyValueStore> {
    storage: S,
    transport: Arc<dyn HttpTransport>,
    api_host: String,
    settings: GitHubSettings,
    client: Option<Arc<GitHubClient>>,
}

impl<S: KeyValueStore> SettingsStore<S> {
    pub fn new(storage: S, transport: Arc<dyn HttpTransport>, api_host: impl Into<String>) -> Self {
        Self {
            storage,
            transport,
            api_host: api_host.into(),
            settings: GitHubSettings::default(),
            client: None,
        }
    }

    pub async fn load(&mut self) {
        match load_json::<GitHubSettings>(&self.storage, SETTINGS_KEY).await {
            Ok(Loaded::Value(settings)) => {
                self.settings = settings.normalized();
                debug!("Loaded settings {:?}", self.settings);
            }
            Ok(Loaded::Missing) => {
                self.settings = GitHubSettings::default();
            }
            Ok(Loaded::Corrupt { error, .. }) => {
                warn!("Stored GitHub settings are unreadable, using defaults: {error}");
                self.settings = GitHubSettings::default();
            }
            Err(e) => {
                error!("Failed to read GitHub settings {e:?}");
                self.settings = GitHubSettings::default();
            }
        }
        self.client = None;
    }

    pub fn settings(&self) -> &GitHubSettings {
        &self.settings
    }

    pub fn is_configured(&self) -> bool {
        self.settings.is_configured()
    }

    /// Replaces the settings wholesale and persists them.
    pub async fn save(&mut self, settings: GitHubSettings) {
        self.settings = settings.normalized();
        self.client = None;
        info!(
            "Saved GitHub settings for {}/{}",
            self.settings.owner, self.settings.repo
        );
        if let Err(e) = save_json(&self.storage, SETTINGS_KEY, &self.settings).await {
            error!("Failed to save GitHub settings {e:?}");
        }
    }

    pub async fn clear(&mut self) {
        self.settings = GitHubSettings::default();
        self.client = None;
        info!("Cleared GitHub settings");
        if let Err(e) = self.storage.remove_item(SETTINGS_KEY).await {
            error!("Failed to remove GitHub settings {e:?}");
        }
    }

    /// Client for the current settings, `None` while they are incomplete.
    pub fn client(&mut self) -> Option<Arc<GitHubClient>> {
        if !self.settings.is_configured() {
            return None;
        }
        let client = self.client.get_or_insert_with(|| {
            debug!("Building GitHub client");
            Arc::new(GitHubClient::new(
                self.settings.to_config(&self.api_host),
                self.transport.clone(),
            ))
        });
        Some(client.clone())
    }

    pub async fn test_connection(&self) -> ConnectionReport {
        self.test_settings(&self.settings).await
    }

    /// Lists the repository root with a throwaway client built from `settings`. The cached client
    /// is left alone.
    pub async fn test_settings(&self, settings: &GitHubSettings) -> ConnectionReport {
        if !settings.is_configured() {
            return ConnectionReport {
                success: false,
                message: MISSING_FIELDS_MESSAGE.into(),
            };
        }

        let client = GitHubClient::new(settings.to_config(&self.api_host), self.transport.clone());
        match client.list_files("").await {
            Ok(_) => ConnectionReport {
                success: true,
                message: CONNECTED_MESSAGE.into(),
            },
            Err(e) => {
                error!("Connection test failed {e:?}");
                let message = e.to_string();
                let message = if message.trim().is_empty() {
                    "unknown error".to_string()
                } else {
                    message
                };
                ConnectionReport {
                    success: false,
                    message: format!("Connection error: {message}"),
                }
            }
        }
    }
}
