//! # chatlens-core
//!
//! Core library for chatlens - read-only analytics over a local iMessage archive.
//!
//! This library provides:
//! - Read-only access to the archive (`chat.db`) and its count/body queries
//! - Count aggregation into records and nested lookups
//! - Readability scoring (Flesch-Kincaid grade level) and rankings
//! - Exponential smoothing of daily series
//! - Handle -> display name resolution against a contacts source
//! - Configuration management and logging infrastructure
//!
//! ## Architecture
//!
//! A load flows through three layers:
//! - **Archive:** the message database on disk, never written
//! - **Records:** grouped count rows and decoded message bodies
//! - **Views:** lookups, rankings and series, published together as one
//!   [`ArchiveSnapshot`] by a [`MessageStore`]
//!
//! ## Example
//!
//! ```rust,no_run
//! use chatlens_core::{Config, HandleResolver, MessageStore, RankingOptions};
//!
//! let config = Config::load().expect("failed to load config");
//! let store = MessageStore::new(RankingOptions::from(&config.analytics));
//! store.load(&config.archive_path()).expect("failed to load archive");
//!
//! let resolver = HandleResolver::new();
//! if let Some(snapshot) = store.snapshot() {
//!     for (person, totals) in snapshot.person_totals() {
//!         println!("{}: {}", resolver.resolve(&person), totals.total());
//!     }
//! }
//! ```

// Re-export commonly used items at the crate root
pub use analytics::{smooth, CountMetric, RankingOptions, ReadabilityReport};
pub use config::Config;
pub use contacts::{ContactCard, ContactsSource, HandleResolver, NameIndex};
pub use db::Archive;
pub use error::{Error, Result};
pub use store::{ArchiveSnapshot, LoadSummary, MessageStore};
pub use types::*;

// Public modules
pub mod analytics;
pub mod config;
pub mod contacts;
pub mod content;
pub mod db;
pub mod error;
pub mod logging;
pub mod store;
pub mod types;
