//! Mediacast - scheduled media posting for Instagram, Facebook and X
//!
//! Each run picks a random catalog item that is outside its per-platform
//! cooldown window, optionally gathers eligible items from one of its groups,
//! and publishes them as a single post or a carousel. Runs are meant to be
//! triggered by an external scheduler such as cron or a systemd timer.

pub mod caption;
pub mod catalog;
pub mod config;
pub mod db;
pub mod error;
pub mod grouping;
pub mod logging;
pub mod platforms;
pub mod poster;
pub mod publisher;
pub mod selection;
pub mod types;

// Re-export commonly used types
pub use catalog::{CatalogStore, MediaFilter, MemoryCatalog};
pub use config::Config;
pub use db::Database;
pub use error::{MediacastError, Result};
pub use poster::PostingJob;
pub use publisher::{PublishSettings, Publisher, RunOutcome};
pub use types::{MediaItem, MediaType, Platform, PostKind, PostMode, PublishReport};
