//! X (Twitter) client
//!
//! Media goes through the v1.1 upload endpoint as base64 form data; the post
//! itself is created with the v2 tweets endpoint. Both calls are signed with
//! OAuth 1.0a user context.

use async_trait::async_trait;
use base64::Engine;
use serde::Deserialize;
use serde_json::json;
use tracing::debug;

use super::oauth::OAuthCredentials;
use super::{error_from_response, UploadClient};
use crate::error::ClientError;

#[derive(Debug, Deserialize)]
struct UploadResponse {
    media_id_string: String,
}

#[derive(Debug, Deserialize)]
struct TweetResponse {
    data: TweetData,
}

#[derive(Debug, Deserialize)]
struct TweetData {
    id: String,
}

pub struct XClient {
    http: reqwest::Client,
    api_base_url: String,
    upload_url: String,
    credentials: OAuthCredentials,
}

impl XClient {
    pub fn new(
        http: reqwest::Client,
        api_base_url: String,
        upload_url: String,
        credentials: OAuthCredentials,
    ) -> Self {
        Self {
            http,
            api_base_url: api_base_url.trim_end_matches('/').to_string(),
            upload_url,
            credentials,
        }
    }
}

#[async_trait]
impl UploadClient for XClient {
    fn name(&self) -> &str {
        "x"
    }

    async fn fetch_media(&self, url: &str) -> Result<Vec<u8>, ClientError> {
        let response = self.http.get(url).send().await?;
        if !response.status().is_success() {
            return Err(error_from_response(response).await);
        }

        let bytes = response.bytes().await?;
        debug!("Fetched {} bytes from {}", bytes.len(), url);
        Ok(bytes.to_vec())
    }

    async fn upload_media(&self, bytes: &[u8]) -> Result<String, ClientError> {
        let media_data = base64::engine::general_purpose::STANDARD.encode(bytes);
        let form = [
            ("media_category", "tweet_image"),
            ("media_data", media_data.as_str()),
        ];

        let authorization = self
            .credentials
            .authorization_header("POST", &self.upload_url, &form)?;

        let response = self
            .http
            .post(&self.upload_url)
            .header(reqwest::header::AUTHORIZATION, authorization)
            .form(&form)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(error_from_response(response).await);
        }

        let upload: UploadResponse = response.json().await?;
        debug!("Uploaded media {}", upload.media_id_string);
        Ok(upload.media_id_string)
    }

    async fn submit_post(&self, text: &str, media_refs: &[String]) -> Result<String, ClientError> {
        let url = format!("{}/2/tweets", self.api_base_url);
        let body = if media_refs.is_empty() {
            json!({ "text": text })
        } else {
            json!({ "text": text, "media": { "media_ids": media_refs } })
        };

        let authorization = self.credentials.authorization_header("POST", &url, &[])?;

        let response = self
            .http
            .post(&url)
            .header(reqwest::header::AUTHORIZATION, authorization)
            .json(&body)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(error_from_response(response).await);
        }

        let tweet: TweetResponse = response.json().await?;
        Ok(tweet.data.id)
    }
}
