//! Platform abstraction and implementations
//!
//! Platforms come in two publishing styles:
//!
//! - [`ContainerClient`]: media is staged server-side as a *container* and
//!   published in a second call (Instagram, Facebook). Several child
//!   containers can be combined into one aggregate (carousel) container.
//! - [`UploadClient`]: media bytes are uploaded directly and the returned
//!   references are attached to a single submit call (X).
//!
//! The publishing core only sees these traits. [`mock`] provides scriptable
//! implementations for tests.
//!
//! # Examples
//!
//! ```no_run
//! use libmediacast::platforms::{instagram::InstagramClient, ContainerClient};
//!
//! # async fn example() -> Result<(), libmediacast::error::ClientError> {
//! let http = libmediacast::platforms::build_http_client(std::time::Duration::from_secs(60))?;
//! let client = InstagramClient::new(
//!     http,
//!     "https://graph.facebook.com".to_string(),
//!     "v21.0".to_string(),
//!     "17841400000000000".to_string(),
//!     "access-token".to_string(),
//! );
//!
//! let container = client
//!     .create_container("https://cdn.example.com/seed.jpg", Some("Hello"), false)
//!     .await?;
//! let post_id = client.publish(&container).await?;
//! println!("Published {}", post_id);
//! # Ok(())
//! # }
//! ```

use async_trait::async_trait;
use std::time::Duration;

use crate::error::ClientError;

pub mod facebook;
mod graph;
pub mod instagram;
pub mod oauth;
pub mod x;

// Mock clients are available for all builds (not just tests) to support integration tests
pub mod mock;

/// Create-then-publish platform capability
#[async_trait]
pub trait ContainerClient: Send + Sync {
    /// Lowercase platform identifier used in logs
    fn name(&self) -> &str;

    /// Stage one media item and return its container id
    ///
    /// `is_carousel_item` marks containers that are meant to be children of
    /// an aggregate container.
    async fn create_container(
        &self,
        media_url: &str,
        caption: Option<&str>,
        is_carousel_item: bool,
    ) -> Result<String, ClientError>;

    /// Combine child containers (in order) into one aggregate container
    async fn create_aggregate_container(
        &self,
        child_ids: &[String],
        caption: &str,
    ) -> Result<String, ClientError>;

    /// Make a container public and return the published post id
    async fn publish(&self, container_id: &str) -> Result<String, ClientError>;
}

/// Upload-then-compose platform capability
#[async_trait]
pub trait UploadClient: Send + Sync {
    /// Lowercase platform identifier used in logs
    fn name(&self) -> &str;

    /// Download the media bytes behind a catalog URL
    async fn fetch_media(&self, url: &str) -> Result<Vec<u8>, ClientError>;

    /// Upload media bytes and return an opaque media reference
    async fn upload_media(&self, bytes: &[u8]) -> Result<String, ClientError>;

    /// Create the post with its text and all media references
    async fn submit_post(&self, text: &str, media_refs: &[String]) -> Result<String, ClientError>;
}

/// A platform client of either publishing style
pub enum PlatformClient {
    Container(Box<dyn ContainerClient>),
    Upload(Box<dyn UploadClient>),
}

impl PlatformClient {
    pub fn name(&self) -> &str {
        match self {
            PlatformClient::Container(client) => client.name(),
            PlatformClient::Upload(client) => client.name(),
        }
    }
}

/// Build the shared HTTP client used by every platform implementation
pub fn build_http_client(timeout: Duration) -> Result<reqwest::Client, ClientError> {
    reqwest::Client::builder()
        .user_agent(concat!("mediacast/", env!("CARGO_PKG_VERSION")))
        .timeout(timeout)
        .build()
        .map_err(|e| ClientError::Network(format!("failed to build HTTP client: {}", e)))
}

/// Turn a non-success response into a [`ClientError`]
pub(crate) async fn error_from_response(response: reqwest::Response) -> ClientError {
    let status = response.status().as_u16();
    let body = response.text().await.unwrap_or_default();
    ClientError::from_status(status, body)
}
