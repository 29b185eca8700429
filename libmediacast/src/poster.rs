//! Posting job wiring
//!
//! Builds the platform client, caption composer and publisher for one
//! platform from a [`Config`], so a binary only has to open the catalog and
//! call [`PostingJob::run`].

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::sync::Arc;
use tracing::info;

use crate::caption::{CaptionComposer, TemplateComposer};
use crate::catalog::CatalogStore;
use crate::config::Config;
use crate::error::{ConfigError, Result};
use crate::platforms::facebook::FacebookClient;
use crate::platforms::instagram::InstagramClient;
use crate::platforms::x::XClient;
use crate::platforms::{build_http_client, PlatformClient};
use crate::publisher::{PublishSettings, Publisher, RunOutcome};
use crate::types::Platform;

/// Create the HTTP client for a platform
///
/// # Errors
///
/// Returns a configuration error if the platform has no section in the
/// config, its credentials are missing, or it has no publishing client
/// (LinkedIn, TikTok).
pub fn create_client(config: &Config, platform: Platform) -> Result<PlatformClient> {
    let http = build_http_client(config.http_timeout()).map_err(|e| ConfigError::Invalid {
        field: "http".to_string(),
        reason: e.to_string(),
    })?;

    let missing = |section: &str| ConfigError::MissingField(format!("[{}] section", section));

    let client = match platform {
        Platform::Instagram => {
            let graph = config.instagram.as_ref().ok_or_else(|| missing("instagram"))?;
            PlatformClient::Container(Box::new(InstagramClient::new(
                http,
                graph.base_url.clone(),
                graph.api_version.clone(),
                graph.account_id.clone(),
                graph.token(platform)?,
            )))
        }
        Platform::Facebook => {
            let graph = config.facebook.as_ref().ok_or_else(|| missing("facebook"))?;
            PlatformClient::Container(Box::new(FacebookClient::new(
                http,
                graph.base_url.clone(),
                graph.api_version.clone(),
                graph.account_id.clone(),
                graph.token(platform)?,
            )))
        }
        Platform::X => {
            let x = config.x.as_ref().ok_or_else(|| missing("x"))?;
            PlatformClient::Upload(Box::new(XClient::new(
                http,
                x.api_base_url.clone(),
                x.upload_url.clone(),
                x.credentials()?,
            )))
        }
        Platform::LinkedIn | Platform::TikTok => {
            return Err(ConfigError::Invalid {
                field: "platform".to_string(),
                reason: format!("{} has no publishing client", platform),
            }
            .into())
        }
    };

    Ok(client)
}

/// Caption composer with the platform's templates
pub fn create_composer(config: &Config, platform: Platform) -> Result<Box<dyn CaptionComposer>> {
    let composer = TemplateComposer::new(&config.caption_templates(platform))?;
    Ok(Box::new(composer))
}

/// One ready-to-run posting job
pub struct PostingJob<R: Rng = StdRng> {
    client: PlatformClient,
    publisher: Publisher<R>,
}

impl PostingJob<StdRng> {
    /// Build a job with the settings from `config`
    pub fn from_config(
        config: &Config,
        platform: Platform,
        catalog: Arc<dyn CatalogStore>,
    ) -> Result<Self> {
        let settings = config.publish_settings(platform)?;
        Self::with_settings(config, settings, catalog)
    }

    /// Build a job with explicit settings, e.g. after CLI overrides
    pub fn with_settings(
        config: &Config,
        settings: PublishSettings,
        catalog: Arc<dyn CatalogStore>,
    ) -> Result<Self> {
        let platform = settings.platform;
        let client = create_client(config, platform)?;
        let composer = create_composer(config, platform)?;

        info!(
            "Posting job for {}: mode {:?}, group range {:?}, cooldown {}",
            platform,
            settings.mode,
            settings.group_range,
            humantime::format_duration(settings.cooldown)
        );

        Ok(Self::new(
            client,
            Publisher::new(catalog, composer, settings, StdRng::from_entropy()),
        ))
    }
}

impl<R: Rng> PostingJob<R> {
    pub fn new(client: PlatformClient, publisher: Publisher<R>) -> Self {
        Self { client, publisher }
    }

    pub fn platform(&self) -> Platform {
        self.publisher.settings().platform
    }

    pub fn settings(&self) -> &PublishSettings {
        self.publisher.settings()
    }

    pub async fn run(&mut self) -> RunOutcome {
        self.publisher.run(&self.client).await
    }
}
