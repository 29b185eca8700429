//! Shared plumbing for the Graph API (Instagram and Facebook)

use serde::Deserialize;
use tracing::debug;

use crate::error::ClientError;

/// Graph error code for an invalid or expired access token
const INVALID_TOKEN_CODE: i64 = 190;

#[derive(Debug, Deserialize)]
struct GraphResponse {
    id: Option<String>,
    success: Option<bool>,
    error: Option<GraphErrorBody>,
}

#[derive(Debug, Deserialize)]
struct GraphErrorBody {
    message: Option<String>,
    code: Option<i64>,
}

/// What a successful Graph call returned
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum GraphReply {
    Id(String),
    Success,
}

#[derive(Debug, Clone)]
pub(crate) struct GraphApi {
    http: reqwest::Client,
    base_url: String,
    api_version: String,
    access_token: String,
}

impl GraphApi {
    pub(crate) fn new(
        http: reqwest::Client,
        base_url: String,
        api_version: String,
        access_token: String,
    ) -> Self {
        Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_version,
            access_token,
        }
    }

    /// POST to `/{version}/{path}` with query parameters
    pub(crate) async fn post(
        &self,
        path: &str,
        params: &[(&str, String)],
    ) -> Result<GraphReply, ClientError> {
        let url = format!("{}/{}/{}", self.base_url, self.api_version, path);

        let response = self
            .http
            .post(&url)
            .query(params)
            .query(&[("access_token", self.access_token.as_str())])
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;
        debug!("Graph POST {} returned {}", path, status);

        let parsed: Option<GraphResponse> = serde_json::from_str(&body).ok();

        if let Some(GraphResponse {
            error: Some(error), ..
        }) = &parsed
        {
            let message = error.message.clone().unwrap_or_else(|| body.clone());
            if error.code == Some(INVALID_TOKEN_CODE) {
                return Err(ClientError::Authentication(message));
            }
            if status.is_success() {
                return Err(ClientError::MalformedResponse(message));
            }
        }

        if !status.is_success() {
            return Err(ClientError::from_status(status.as_u16(), body));
        }

        match parsed {
            Some(GraphResponse { id: Some(id), .. }) => Ok(GraphReply::Id(id)),
            Some(GraphResponse {
                success: Some(true),
                ..
            }) => Ok(GraphReply::Success),
            _ => Err(ClientError::MalformedResponse(format!(
                "status {}: {}",
                status.as_u16(),
                body
            ))),
        }
    }

    /// POST and require an `id` in the reply
    pub(crate) async fn post_for_id(
        &self,
        path: &str,
        params: &[(&str, String)],
    ) -> Result<String, ClientError> {
        match self.post(path, params).await? {
            GraphReply::Id(id) => Ok(id),
            GraphReply::Success => Err(ClientError::MalformedResponse(format!(
                "{} returned no id",
                path
            ))),
        }
    }
}
