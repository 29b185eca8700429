//! Media catalog abstraction
//!
//! The publishing core only needs two things from the catalog: a filtered read
//! and a single-field cooldown write keyed by filename. [`crate::db::Database`]
//! is the SQLite-backed store used by the binaries; [`MemoryCatalog`] keeps
//! everything in process and backs the tests.

use async_trait::async_trait;
use std::sync::{Arc, Mutex, MutexGuard};

use crate::error::DbError;
use crate::types::{MediaItem, MediaType, Platform};

/// Predicates supported by [`CatalogStore::find`]
///
/// All set predicates must hold for an item to match.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MediaFilter {
    /// Type equality
    pub media_type: Option<MediaType>,
    /// Group membership equality
    pub group: Option<String>,
    /// Filename inequality
    pub exclude_filename: Option<String>,
}

impl MediaFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_media_type(mut self, media_type: Option<MediaType>) -> Self {
        self.media_type = media_type;
        self
    }

    pub fn in_group(mut self, group: impl Into<String>) -> Self {
        self.group = Some(group.into());
        self
    }

    pub fn excluding(mut self, filename: impl Into<String>) -> Self {
        self.exclude_filename = Some(filename.into());
        self
    }

    pub fn matches(&self, item: &MediaItem) -> bool {
        if let Some(media_type) = self.media_type {
            if item.media_type != media_type {
                return false;
            }
        }
        if let Some(group) = &self.group {
            if !item.group_list.contains(group) {
                return false;
            }
        }
        if let Some(filename) = &self.exclude_filename {
            if &item.filename == filename {
                return false;
            }
        }
        true
    }
}

/// Result of a cooldown write
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CooldownUpdate {
    Updated,
    NotFound,
}

/// Storage interface used by selection, grouping and publishing
#[async_trait]
pub trait CatalogStore: Send + Sync {
    /// Return every item matching the filter
    async fn find(&self, filter: &MediaFilter) -> Result<Vec<MediaItem>, DbError>;

    /// Set `last_<platform>_post` for one item
    ///
    /// Implementations must never move the timestamp backwards.
    async fn update_cooldown(
        &self,
        filename: &str,
        platform: Platform,
        timestamp: f64,
    ) -> Result<CooldownUpdate, DbError>;
}

/// In-process catalog
///
/// Clones share the same underlying items, so a test can hand one clone to
/// the publisher and inspect the cooldowns through another.
#[derive(Debug, Clone, Default)]
pub struct MemoryCatalog {
    items: Arc<Mutex<Vec<MediaItem>>>,
    find_calls: Arc<Mutex<usize>>,
}

impl MemoryCatalog {
    pub fn new(items: Vec<MediaItem>) -> Self {
        Self {
            items: Arc::new(Mutex::new(items)),
            find_calls: Arc::new(Mutex::new(0)),
        }
    }

    /// Look up an item by filename
    pub fn get(&self, filename: &str) -> Option<MediaItem> {
        self.lock_items()
            .iter()
            .find(|item| item.filename == filename)
            .cloned()
    }

    /// Number of `find` calls served so far
    pub fn find_call_count(&self) -> usize {
        *self.find_calls.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn lock_items(&self) -> MutexGuard<'_, Vec<MediaItem>> {
        self.items.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[async_trait]
impl CatalogStore for MemoryCatalog {
    async fn find(&self, filter: &MediaFilter) -> Result<Vec<MediaItem>, DbError> {
        *self.find_calls.lock().unwrap_or_else(|e| e.into_inner()) += 1;

        Ok(self
            .lock_items()
            .iter()
            .filter(|item| filter.matches(item))
            .cloned()
            .collect())
    }

    async fn update_cooldown(
        &self,
        filename: &str,
        platform: Platform,
        timestamp: f64,
    ) -> Result<CooldownUpdate, DbError> {
        let mut items = self.lock_items();
        match items.iter_mut().find(|item| item.filename == filename) {
            Some(item) => {
                item.set_last_post(platform, timestamp);
                Ok(CooldownUpdate::Updated)
            }
            None => Ok(CooldownUpdate::NotFound),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(filename: &str, groups: &[&str], media_type: MediaType) -> MediaItem {
        let mut item = MediaItem::new(filename, format!("https://cdn.example.com/{}", filename));
        item.media_type = media_type;
        item.group_list = groups.iter().map(|g| g.to_string()).collect();
        item
    }

    #[tokio::test]
    async fn test_filter_combines_predicates() {
        let catalog = MemoryCatalog::new(vec![
            item("a.jpg", &["dunes"], MediaType::Image),
            item("b.jpg", &["dunes", "night"], MediaType::Image),
            item("c.mp4", &["dunes"], MediaType::Video),
            item("d.jpg", &["night"], MediaType::Image),
        ]);

        let filter = MediaFilter::new()
            .with_media_type(Some(MediaType::Image))
            .in_group("dunes")
            .excluding("a.jpg");

        let found = catalog.find(&filter).await.unwrap();
        let names: Vec<&str> = found.iter().map(|i| i.filename.as_str()).collect();
        assert_eq!(names, vec!["b.jpg"]);
        assert_eq!(catalog.find_call_count(), 1);
    }

    #[tokio::test]
    async fn test_empty_filter_matches_everything() {
        let catalog = MemoryCatalog::new(vec![
            item("a.jpg", &[], MediaType::Image),
            item("c.mp4", &[], MediaType::Video),
        ]);

        let found = catalog.find(&MediaFilter::new()).await.unwrap();
        assert_eq!(found.len(), 2);
    }

    #[tokio::test]
    async fn test_update_cooldown_shared_between_clones() {
        let catalog = MemoryCatalog::new(vec![item("a.jpg", &[], MediaType::Image)]);
        let observer = catalog.clone();

        let outcome = catalog
            .update_cooldown("a.jpg", Platform::X, 1_700_000_000.0)
            .await
            .unwrap();

        assert_eq!(outcome, CooldownUpdate::Updated);
        let stored = observer.get("a.jpg").unwrap();
        assert_eq!(stored.last_x_post, 1_700_000_000.0);
        assert_eq!(stored.last_ig_post, 0.0);
    }

    #[tokio::test]
    async fn test_update_cooldown_unknown_filename() {
        let catalog = MemoryCatalog::new(vec![]);

        let outcome = catalog
            .update_cooldown("ghost.jpg", Platform::Instagram, 1.0)
            .await
            .unwrap();

        assert_eq!(outcome, CooldownUpdate::NotFound);
    }
}
