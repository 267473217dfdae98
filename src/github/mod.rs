//! Optional mirror of documents in a GitHub repository, through the Contents API.
//!
//! [settings::SettingsStore] owns the credentials and hands out a cached [client::GitHubClient].
//! The client talks to the network through [transport::HttpTransport].

pub mod client;
pub mod error;
pub mod mirror;
pub mod settings;
pub mod transport;
