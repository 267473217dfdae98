//! Key-value persistence shared by every store.
//!  The basic idea is:
//!   - Each store owns a distinct key (`documents`, `activities`, `github_settings`).
//!   - Values are JSON documents written and read whole.
//!   - [file_store::JsonFileStore] keeps one file per key inside a directory.

pub mod file_store;

use std::{future::Future, ops::Deref};

use anyhow::Result;
use serde::{de::DeserializeOwned, Serialize};

/// Interface for abstracting the persisted key-value state.
pub trait KeyValueStore {
    /// Returns the raw value stored under `key`, `None` if nothing was ever written.
    fn get_item(&self, key: &str) -> impl Future<Output = Result<Option<String>>>;

    /// Replaces the value stored under `key`.
    fn set_item(&self, key: &str, value: &str) -> impl Future<Output = Result<()>>;

    /// Removes `key`. Removing an absent key is not an error.
    fn remove_item(&self, key: &str) -> impl Future<Output = Result<()>>;
}

impl<T: Deref> KeyValueStore for T
where
    T::Target: KeyValueStore,
{
    fn get_item(&self, key: &str) -> impl Future<Output = Result<Option<String>>> {
        self.deref().get_item(key)
    }

    fn set_item(&self, key: &str, value: &str) -> impl Future<Output = Result<()>> {
        self.deref().set_item(key, value)
    }

    fn remove_item(&self, key: &str) -> impl Future<Output = Result<()>> {
        self.deref().remove_item(key)
    }
}

/// Outcome of reading a JSON value back from a [KeyValueStore].
#[derive(Debug)]
pub enum Loaded<T> {
    Value(T),
    Missing,
    /// The stored text exists but doesn't decode into `T`.
    Corrupt {
        raw: String,
        error: serde_json::Error,
    },
}

/// Reads and decodes `key`. Only storage failures are returned as errors, decoding problems are
/// reported through [Loaded::Corrupt] so that callers can decide on a fallback.
pub async fn load_json<T: DeserializeOwned>(
    storage: &impl KeyValueStore,
    key: &str,
) -> Result<Loaded<T>> {
    let Some(raw) = storage.get_item(key).await? else {
        return Ok(Loaded::Missing);
    };
    Ok(match serde_json::from_str::<T>(&raw) {
        Ok(v) => Loaded::Value(v),
        Err(error) => Loaded::Corrupt { raw, error },
    })
}

pub async fn save_json<T: Serialize + ?Sized>(
    storage: &impl KeyValueStore,
    key: &str,
    value: &T,
) -> Result<()> {
    let raw = serde_json::to_string(value)?;
    storage.set_item(key, &raw).await
}

/// Key used to keep an unreadable payload around before a store falls back to defaults.
pub fn corrupt_key(key: &str) -> String {
    format!("{key}.corrupt")
}
