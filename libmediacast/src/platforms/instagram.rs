//! Instagram Graph API client

use async_trait::async_trait;
use tracing::debug;

use super::graph::GraphApi;
use super::ContainerClient;
use crate::error::ClientError;

/// Instagram business account publishing via media containers
pub struct InstagramClient {
    api: GraphApi,
    account_id: String,
}

impl InstagramClient {
    pub fn new(
        http: reqwest::Client,
        base_url: String,
        api_version: String,
        account_id: String,
        access_token: String,
    ) -> Self {
        Self {
            api: GraphApi::new(http, base_url, api_version, access_token),
            account_id,
        }
    }
}

#[async_trait]
impl ContainerClient for InstagramClient {
    fn name(&self) -> &str {
        "instagram"
    }

    async fn create_container(
        &self,
        media_url: &str,
        caption: Option<&str>,
        is_carousel_item: bool,
    ) -> Result<String, ClientError> {
        let mut params = vec![("image_url", media_url.to_string())];
        if let Some(caption) = caption {
            params.push(("caption", caption.to_string()));
        }
        if is_carousel_item {
            params.push(("is_carousel_item", "true".to_string()));
        }

        let id = self
            .api
            .post_for_id(&format!("{}/media", self.account_id), &params)
            .await?;
        debug!("Instagram container {} created for {}", id, media_url);
        Ok(id)
    }

    async fn create_aggregate_container(
        &self,
        child_ids: &[String],
        caption: &str,
    ) -> Result<String, ClientError> {
        let params = vec![
            ("media_type", "CAROUSEL".to_string()),
            ("caption", caption.to_string()),
            ("children", child_ids.join(",")),
        ];

        self.api
            .post_for_id(&format!("{}/media", self.account_id), &params)
            .await
    }

    async fn publish(&self, container_id: &str) -> Result<String, ClientError> {
        let params = vec![("creation_id", container_id.to_string())];

        self.api
            .post_for_id(&format!("{}/media_publish", self.account_id), &params)
            .await
    }
}
