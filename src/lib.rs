//! Local notes and daily habit tracking.
//! Documents and activity counts live in plain JSON files under the application directory, can be
//! mirrored into a GitHub repository and exported into a single backup file.
//!

pub mod backup;
pub mod cli;
pub mod config;
pub mod docs;
pub mod github;
pub mod services;
pub mod storage;
pub mod tracker;
pub mod utils;
