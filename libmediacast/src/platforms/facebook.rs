//! Facebook Page client
//!
//! Photos are uploaded unpublished (`published=false`), which gives the same
//! stage-then-publish shape as Instagram containers. A multi-photo post is an
//! unpublished feed story with the staged photos attached.

use async_trait::async_trait;

use super::graph::{GraphApi, GraphReply};
use super::ContainerClient;
use crate::error::ClientError;

pub struct FacebookClient {
    api: GraphApi,
    page_id: String,
}

impl FacebookClient {
    pub fn new(
        http: reqwest::Client,
        base_url: String,
        api_version: String,
        page_id: String,
        access_token: String,
    ) -> Self {
        Self {
            api: GraphApi::new(http, base_url, api_version, access_token),
            page_id,
        }
    }
}

#[async_trait]
impl ContainerClient for FacebookClient {
    fn name(&self) -> &str {
        "facebook"
    }

    async fn create_container(
        &self,
        media_url: &str,
        caption: Option<&str>,
        _is_carousel_item: bool,
    ) -> Result<String, ClientError> {
        let mut params = vec![
            ("url", media_url.to_string()),
            ("published", "false".to_string()),
        ];
        if let Some(caption) = caption {
            params.push(("caption", caption.to_string()));
        }

        self.api
            .post_for_id(&format!("{}/photos", self.page_id), &params)
            .await
    }

    async fn create_aggregate_container(
        &self,
        child_ids: &[String],
        caption: &str,
    ) -> Result<String, ClientError> {
        let keys: Vec<String> = (0..child_ids.len())
            .map(|i| format!("attached_media[{}]", i))
            .collect();

        let mut params: Vec<(&str, String)> = vec![
            ("message", caption.to_string()),
            ("published", "false".to_string()),
        ];
        for (key, id) in keys.iter().zip(child_ids) {
            params.push((key.as_str(), serde_json::json!({ "media_fbid": id }).to_string()));
        }

        self.api
            .post_for_id(&format!("{}/feed", self.page_id), &params)
            .await
    }

    async fn publish(&self, container_id: &str) -> Result<String, ClientError> {
        let params = vec![("is_published", "true".to_string())];

        // Graph answers either with the object id or a bare success flag
        match self.api.post(container_id, &params).await? {
            GraphReply::Id(id) => Ok(id),
            GraphReply::Success => Ok(container_id.to_string()),
        }
    }
}
