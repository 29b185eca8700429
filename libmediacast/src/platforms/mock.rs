//! Mock platform clients for testing
//!
//! Both mocks record every call in order and can be scripted to fail specific
//! steps. Clones share their call log and counters, so a test can keep one
//! handle while the publisher owns a boxed clone.

use async_trait::async_trait;
use std::collections::HashSet;
use std::sync::{Arc, Mutex};

use super::{ContainerClient, UploadClient};
use crate::error::ClientError;

/// A single recorded client call
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MockCall {
    CreateContainer {
        media_url: String,
        caption: Option<String>,
        is_carousel_item: bool,
    },
    CreateAggregate {
        child_ids: Vec<String>,
        caption: String,
    },
    Publish {
        container_id: String,
    },
    Fetch {
        url: String,
    },
    Upload {
        len: usize,
    },
    Submit {
        text: String,
        media_refs: Vec<String>,
    },
}

#[derive(Debug, Clone, Default)]
struct MockLog {
    calls: Arc<Mutex<Vec<MockCall>>>,
    next_id: Arc<Mutex<usize>>,
}

impl MockLog {
    fn record(&self, call: MockCall) {
        self.calls.lock().unwrap_or_else(|e| e.into_inner()).push(call);
    }

    fn next_id(&self, prefix: &str) -> String {
        let mut next = self.next_id.lock().unwrap_or_else(|e| e.into_inner());
        *next += 1;
        format!("{}-{}", prefix, next)
    }
}

/// Scriptable [`ContainerClient`]
///
/// Container ids are `container-N`, aggregate ids `aggregate-N` and published
/// post ids `post-<container id>`.
#[derive(Debug, Clone)]
pub struct MockContainerClient {
    name: String,
    failing_urls: HashSet<String>,
    fail_aggregate: bool,
    fail_publish: bool,
    error: ClientError,
    log: MockLog,
}

impl MockContainerClient {
    /// Create a mock that succeeds at every step
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            failing_urls: HashSet::new(),
            fail_aggregate: false,
            fail_publish: false,
            error: ClientError::Request {
                status: 500,
                body: "mock failure".to_string(),
            },
            log: MockLog::default(),
        }
    }

    /// Fail container creation for this media URL
    pub fn failing_url(mut self, url: &str) -> Self {
        self.failing_urls.insert(url.to_string());
        self
    }

    pub fn failing_aggregate(mut self) -> Self {
        self.fail_aggregate = true;
        self
    }

    pub fn failing_publish(mut self) -> Self {
        self.fail_publish = true;
        self
    }

    /// Error returned by every scripted failure
    pub fn with_error(mut self, error: ClientError) -> Self {
        self.error = error;
        self
    }

    /// All calls made so far, in order
    pub fn calls(&self) -> Vec<MockCall> {
        self.log.calls.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    pub fn container_calls(&self) -> usize {
        self.calls()
            .iter()
            .filter(|call| matches!(call, MockCall::CreateContainer { .. }))
            .count()
    }

    pub fn aggregate_calls(&self) -> usize {
        self.calls()
            .iter()
            .filter(|call| matches!(call, MockCall::CreateAggregate { .. }))
            .count()
    }

    pub fn publish_calls(&self) -> usize {
        self.calls()
            .iter()
            .filter(|call| matches!(call, MockCall::Publish { .. }))
            .count()
    }
}

#[async_trait]
impl ContainerClient for MockContainerClient {
    fn name(&self) -> &str {
        &self.name
    }

    async fn create_container(
        &self,
        media_url: &str,
        caption: Option<&str>,
        is_carousel_item: bool,
    ) -> Result<String, ClientError> {
        self.log.record(MockCall::CreateContainer {
            media_url: media_url.to_string(),
            caption: caption.map(str::to_string),
            is_carousel_item,
        });

        if self.failing_urls.contains(media_url) {
            return Err(self.error.clone());
        }
        Ok(self.log.next_id("container"))
    }

    async fn create_aggregate_container(
        &self,
        child_ids: &[String],
        caption: &str,
    ) -> Result<String, ClientError> {
        self.log.record(MockCall::CreateAggregate {
            child_ids: child_ids.to_vec(),
            caption: caption.to_string(),
        });

        if self.fail_aggregate {
            return Err(self.error.clone());
        }
        Ok(self.log.next_id("aggregate"))
    }

    async fn publish(&self, container_id: &str) -> Result<String, ClientError> {
        self.log.record(MockCall::Publish {
            container_id: container_id.to_string(),
        });

        if self.fail_publish {
            return Err(self.error.clone());
        }
        Ok(format!("post-{}", container_id))
    }
}

/// Scriptable [`UploadClient`]
///
/// Fetched media is the URL's bytes; media refs are `media-N`.
#[derive(Debug, Clone)]
pub struct MockUploadClient {
    name: String,
    failing_urls: HashSet<String>,
    fail_upload: bool,
    fail_submit: bool,
    error: ClientError,
    log: MockLog,
}

impl MockUploadClient {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            failing_urls: HashSet::new(),
            fail_upload: false,
            fail_submit: false,
            error: ClientError::Request {
                status: 500,
                body: "mock failure".to_string(),
            },
            log: MockLog::default(),
        }
    }

    /// Fail the download of this media URL
    pub fn failing_url(mut self, url: &str) -> Self {
        self.failing_urls.insert(url.to_string());
        self
    }

    pub fn failing_upload(mut self) -> Self {
        self.fail_upload = true;
        self
    }

    pub fn failing_submit(mut self) -> Self {
        self.fail_submit = true;
        self
    }

    pub fn with_error(mut self, error: ClientError) -> Self {
        self.error = error;
        self
    }

    pub fn calls(&self) -> Vec<MockCall> {
        self.log.calls.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    pub fn upload_calls(&self) -> usize {
        self.calls()
            .iter()
            .filter(|call| matches!(call, MockCall::Upload { .. }))
            .count()
    }

    /// Every submitted post as `(text, media_refs)`
    pub fn submitted(&self) -> Vec<(String, Vec<String>)> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                MockCall::Submit { text, media_refs } => Some((text, media_refs)),
                _ => None,
            })
            .collect()
    }
}

#[async_trait]
impl UploadClient for MockUploadClient {
    fn name(&self) -> &str {
        &self.name
    }

    async fn fetch_media(&self, url: &str) -> Result<Vec<u8>, ClientError> {
        self.log.record(MockCall::Fetch {
            url: url.to_string(),
        });

        if self.failing_urls.contains(url) {
            return Err(self.error.clone());
        }
        Ok(url.as_bytes().to_vec())
    }

    async fn upload_media(&self, bytes: &[u8]) -> Result<String, ClientError> {
        self.log.record(MockCall::Upload { len: bytes.len() });

        if self.fail_upload {
            return Err(self.error.clone());
        }
        Ok(self.log.next_id("media"))
    }

    async fn submit_post(&self, text: &str, media_refs: &[String]) -> Result<String, ClientError> {
        self.log.record(MockCall::Submit {
            text: text.to_string(),
            media_refs: media_refs.to_vec(),
        });

        if self.fail_submit {
            return Err(self.error.clone());
        }
        Ok(self.log.next_id("post"))
    }
}
