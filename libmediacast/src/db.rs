//! SQLite-backed media catalog

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use sqlx::sqlite::{SqlitePool, SqliteRow};
use sqlx::Row;
use std::path::Path;

use crate::catalog::{CatalogStore, CooldownUpdate, MediaFilter};
use crate::error::{DbError, Result};
use crate::types::{MediaItem, MediaType, Platform};

const MEDIA_COLUMNS: &str = "filename, url, name, description, media_type, project_name, \
     project_url, tag_list, group_list, caption_list, \
     last_ig_post, last_x_post, last_fb_post, last_li_post, last_tt_post";

#[derive(Clone)]
pub struct Database {
    pool: SqlitePool,
}

impl Database {
    /// Open (or create) the catalog database and run migrations
    pub async fn new(db_path: &str) -> Result<Self> {
        // Expand path and create parent directories
        let expanded_path = shellexpand::tilde(db_path).to_string();
        let path = Path::new(&expanded_path);

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(DbError::IoError)?;
        }

        // Forward slashes keep the URL valid on Windows; mode=rwc creates the file
        let db_url = format!("sqlite://{}?mode=rwc", expanded_path.replace('\\', "/"));

        let pool = SqlitePool::connect(&db_url)
            .await
            .map_err(DbError::SqlxError)?;

        sqlx::migrate!("./migrations")
            .run(&pool)
            .await
            .map_err(DbError::MigrationError)?;

        Ok(Self { pool })
    }

    /// Close the connection pool, waiting for in-flight statements
    pub async fn close(self) {
        self.pool.close().await;
    }

    /// Insert a new media item
    ///
    /// Fails if an item with the same filename already exists.
    pub async fn insert_item(&self, item: &MediaItem) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO media (filename, url, name, description, media_type, project_name,
                               project_url, tag_list, group_list, caption_list,
                               last_ig_post, last_x_post, last_fb_post, last_li_post, last_tt_post)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&item.filename)
        .bind(&item.url)
        .bind(&item.name)
        .bind(&item.description)
        .bind(item.media_type.as_str())
        .bind(&item.project_name)
        .bind(&item.project_url)
        .bind(encode_json("tag_list", &item.tag_list)?)
        .bind(encode_json("group_list", &item.group_list)?)
        .bind(encode_json("caption_list", &item.caption_list)?)
        .bind(item.last_ig_post)
        .bind(item.last_x_post)
        .bind(item.last_fb_post)
        .bind(item.last_li_post)
        .bind(item.last_tt_post)
        .execute(&self.pool)
        .await
        .map_err(DbError::SqlxError)?;

        Ok(())
    }

    /// Get a media item by filename
    pub async fn get_item(&self, filename: &str) -> Result<Option<MediaItem>> {
        let query = format!("SELECT {} FROM media WHERE filename = ?", MEDIA_COLUMNS);

        let row = sqlx::query(&query)
            .bind(filename)
            .fetch_optional(&self.pool)
            .await
            .map_err(DbError::SqlxError)?;

        Ok(row.as_ref().map(row_to_item).transpose()?)
    }
}

#[async_trait]
impl CatalogStore for Database {
    async fn find(&self, filter: &MediaFilter) -> std::result::Result<Vec<MediaItem>, DbError> {
        // Build the WHERE clause dynamically
        let mut where_clauses = vec!["1=1"];

        if filter.media_type.is_some() {
            where_clauses.push("media_type = ?");
        }
        if filter.group.is_some() {
            where_clauses.push(
                "EXISTS (SELECT 1 FROM json_each(media.group_list) WHERE json_each.value = ?)",
            );
        }
        if filter.exclude_filename.is_some() {
            where_clauses.push("filename != ?");
        }

        let query_str = format!(
            "SELECT {} FROM media WHERE {} ORDER BY filename",
            MEDIA_COLUMNS,
            where_clauses.join(" AND ")
        );

        let mut query = sqlx::query(&query_str);

        // Bind parameters in the same order as WHERE clauses
        if let Some(media_type) = filter.media_type {
            query = query.bind(media_type.as_str());
        }
        if let Some(group) = &filter.group {
            query = query.bind(group);
        }
        if let Some(filename) = &filter.exclude_filename {
            query = query.bind(filename);
        }

        let rows = query.fetch_all(&self.pool).await?;

        rows.iter().map(row_to_item).collect()
    }

    async fn update_cooldown(
        &self,
        filename: &str,
        platform: Platform,
        timestamp: f64,
    ) -> std::result::Result<CooldownUpdate, DbError> {
        let column = platform.cooldown_column();
        let query = format!(
            "UPDATE media SET {col} = MAX({col}, ?) WHERE filename = ?",
            col = column
        );

        let result = sqlx::query(&query)
            .bind(timestamp)
            .bind(filename)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            Ok(CooldownUpdate::NotFound)
        } else {
            Ok(CooldownUpdate::Updated)
        }
    }
}

fn row_to_item(row: &SqliteRow) -> std::result::Result<MediaItem, DbError> {
    let media_type: String = row.try_get("media_type")?;
    let media_type = media_type
        .parse::<MediaType>()
        .map_err(|reason| DbError::Decode {
            column: "media_type".to_string(),
            reason,
        })?;

    Ok(MediaItem {
        filename: row.try_get("filename")?,
        url: row.try_get("url")?,
        name: row.try_get("name")?,
        description: row.try_get("description")?,
        media_type,
        project_name: row.try_get("project_name")?,
        project_url: row.try_get("project_url")?,
        tag_list: decode_json(row, "tag_list")?,
        group_list: decode_json(row, "group_list")?,
        caption_list: decode_json(row, "caption_list")?,
        last_ig_post: row.try_get("last_ig_post")?,
        last_x_post: row.try_get("last_x_post")?,
        last_fb_post: row.try_get("last_fb_post")?,
        last_li_post: row.try_get("last_li_post")?,
        last_tt_post: row.try_get("last_tt_post")?,
    })
}

fn decode_json<T: DeserializeOwned>(
    row: &SqliteRow,
    column: &str,
) -> std::result::Result<T, DbError> {
    let raw: String = row.try_get(column)?;
    serde_json::from_str(&raw).map_err(|e| DbError::Decode {
        column: column.to_string(),
        reason: e.to_string(),
    })
}

fn encode_json<T: serde::Serialize>(column: &str, value: &T) -> std::result::Result<String, DbError> {
    serde_json::to_string(value).map_err(|e| DbError::Decode {
        column: column.to_string(),
        reason: e.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::MediacastError;
    use tempfile::TempDir;

    async fn setup_db() -> (Database, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let db_path = temp_dir.path().join("catalog.db");
        let db = Database::new(db_path.to_str().unwrap()).await.unwrap();
        (db, temp_dir)
    }

    fn create_test_item(filename: &str, groups: &[&str]) -> MediaItem {
        let mut item = MediaItem::new(filename, format!("https://cdn.example.com/{}", filename));
        item.name = format!("Name of {}", filename);
        item.project_name = "Dune Series".to_string();
        item.tag_list = ["glitch", "art"].iter().map(|t| t.to_string()).collect();
        item.group_list = groups.iter().map(|g| g.to_string()).collect();
        item.caption_list = vec!["First caption".to_string(), "Second caption".to_string()];
        item
    }

    #[tokio::test]
    async fn test_database_initialization_with_invalid_path() {
        #[cfg(unix)]
        let invalid_path = "/tmp/test\0invalid.db";

        #[cfg(windows)]
        let invalid_path = "C:\\invalid<>path\\test.db";

        let result = Database::new(invalid_path).await;
        match result {
            Err(MediacastError::Database(_)) => {}
            _ => panic!("Expected DbError for invalid path"),
        }
    }

    #[tokio::test]
    async fn test_insert_and_get_round_trip() {
        let (db, _temp_dir) = setup_db().await;
        let mut item = create_test_item("seed.jpg", &["dunes"]);
        item.project_url = Some("https://example.com/dunes".to_string());
        item.last_fb_post = 1_600_000_000.5;

        db.insert_item(&item).await.unwrap();

        let stored = db.get_item("seed.jpg").await.unwrap().unwrap();
        assert_eq!(stored, item);
        assert!(db.get_item("missing.jpg").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_filename_is_unique() {
        let (db, _temp_dir) = setup_db().await;
        let item = create_test_item("seed.jpg", &[]);

        db.insert_item(&item).await.unwrap();
        let result = db.insert_item(&item).await;

        assert!(matches!(result, Err(MediacastError::Database(_))));
    }

    #[tokio::test]
    async fn test_find_by_media_type() {
        let (db, _temp_dir) = setup_db().await;
        db.insert_item(&create_test_item("a.jpg", &[])).await.unwrap();
        let mut video = create_test_item("b.mp4", &[]);
        video.media_type = MediaType::Video;
        db.insert_item(&video).await.unwrap();

        let images = db
            .find(&MediaFilter::new().with_media_type(Some(MediaType::Image)))
            .await
            .unwrap();
        assert_eq!(images.len(), 1);
        assert_eq!(images[0].filename, "a.jpg");

        let everything = db.find(&MediaFilter::new()).await.unwrap();
        assert_eq!(everything.len(), 2);
    }

    #[tokio::test]
    async fn test_find_by_group_matches_whole_members_only() {
        let (db, _temp_dir) = setup_db().await;
        db.insert_item(&create_test_item("a.jpg", &["dunes"])).await.unwrap();
        db.insert_item(&create_test_item("b.jpg", &["dunes", "night"])).await.unwrap();
        db.insert_item(&create_test_item("c.jpg", &["dunes-2"])).await.unwrap();
        db.insert_item(&create_test_item("d.jpg", &[])).await.unwrap();

        let filter = MediaFilter::new().in_group("dunes").excluding("a.jpg");
        let found = db.find(&filter).await.unwrap();

        let names: Vec<&str> = found.iter().map(|i| i.filename.as_str()).collect();
        assert_eq!(names, vec!["b.jpg"]);
    }

    #[tokio::test]
    async fn test_update_cooldown_writes_only_target_platform() {
        let (db, _temp_dir) = setup_db().await;
        db.insert_item(&create_test_item("seed.jpg", &[])).await.unwrap();

        let outcome = db
            .update_cooldown("seed.jpg", Platform::Instagram, 1_700_000_000.25)
            .await
            .unwrap();
        assert_eq!(outcome, CooldownUpdate::Updated);

        let stored = db.get_item("seed.jpg").await.unwrap().unwrap();
        assert_eq!(stored.last_ig_post, 1_700_000_000.25);
        assert_eq!(stored.last_x_post, 0.0);
        assert_eq!(stored.last_fb_post, 0.0);
    }

    #[tokio::test]
    async fn test_update_cooldown_is_monotonic() {
        let (db, _temp_dir) = setup_db().await;
        db.insert_item(&create_test_item("seed.jpg", &[])).await.unwrap();

        db.update_cooldown("seed.jpg", Platform::X, 2_000.0).await.unwrap();
        db.update_cooldown("seed.jpg", Platform::X, 1_000.0).await.unwrap();

        let stored = db.get_item("seed.jpg").await.unwrap().unwrap();
        assert_eq!(stored.last_x_post, 2_000.0);
    }

    #[tokio::test]
    async fn test_update_cooldown_unknown_filename() {
        let (db, _temp_dir) = setup_db().await;

        let outcome = db
            .update_cooldown("ghost.jpg", Platform::Facebook, 1.0)
            .await
            .unwrap();

        assert_eq!(outcome, CooldownUpdate::NotFound);
    }

    #[tokio::test]
    async fn test_corrupt_json_column_is_decode_error() {
        let (db, _temp_dir) = setup_db().await;
        db.insert_item(&create_test_item("seed.jpg", &[])).await.unwrap();
        sqlx::query("UPDATE media SET tag_list = 'not json' WHERE filename = 'seed.jpg'")
            .execute(&db.pool)
            .await
            .unwrap();

        let result = db.find(&MediaFilter::new()).await;

        match result {
            Err(DbError::Decode { column, .. }) => assert_eq!(column, "tag_list"),
            other => panic!("Expected DbError::Decode, got {:?}", other.map(|v| v.len())),
        }
    }
}
