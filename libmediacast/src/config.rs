//! Configuration management for Mediacast
//!
//! Secrets may be left out of the file and supplied through the environment
//! instead (`MEDIACAST_INSTAGRAM_TOKEN`, `MEDIACAST_X_CONSUMER_KEY`, ...).

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::caption::CaptionTemplates;
use crate::error::{ConfigError, Result};
use crate::platforms::oauth::OAuthCredentials;
use crate::publisher::PublishSettings;
use crate::types::{MediaType, Platform, PostMode};

pub const CONFIG_ENV: &str = "MEDIACAST_CONFIG";

const DEFAULT_GRAPH_URL: &str = "https://graph.facebook.com";
const DEFAULT_GRAPH_VERSION: &str = "v21.0";
const DEFAULT_X_API_URL: &str = "https://api.twitter.com";
const DEFAULT_X_UPLOAD_URL: &str = "https://upload.twitter.com/1.1/media/upload.json";

/// X accepts at most four images per post
pub const X_MAX_MEDIA: usize = 4;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub database: DatabaseConfig,
    #[serde(default)]
    pub selection: SelectionConfig,
    #[serde(default)]
    pub http: HttpConfig,
    pub instagram: Option<GraphConfig>,
    pub facebook: Option<GraphConfig>,
    pub x: Option<XConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub path: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SelectionConfig {
    /// Humantime duration, e.g. `7d` or `36h`
    #[serde(default = "default_cooldown")]
    pub cooldown: String,
    #[serde(default = "default_max_tries")]
    pub max_tries: u32,
    pub media_type: Option<MediaType>,
}

impl Default for SelectionConfig {
    fn default() -> Self {
        Self {
            cooldown: default_cooldown(),
            max_tries: default_max_tries(),
            media_type: None,
        }
    }
}

fn default_cooldown() -> String {
    "7d".to_string()
}

fn default_max_tries() -> u32 {
    crate::selection::DEFAULT_MAX_TRIES
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpConfig {
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_timeout_secs(),
        }
    }
}

fn default_timeout_secs() -> u64 {
    60
}

/// Per-platform overrides of the posting mode; unset fields keep the
/// platform defaults
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PostingConfig {
    pub mode: Option<PostMode>,
    pub carousel_chance_percent: Option<u8>,
    pub group_min: Option<usize>,
    pub group_max: Option<usize>,
}

/// Per-platform caption overrides
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CaptionsConfig {
    pub single: Option<String>,
    pub aggregate: Option<String>,
    pub max_tags: Option<usize>,
    pub default_url: Option<String>,
}

/// Instagram business account or Facebook page
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GraphConfig {
    /// Instagram user id or Facebook page id
    pub account_id: String,
    pub access_token: Option<String>,
    #[serde(default = "default_graph_url")]
    pub base_url: String,
    #[serde(default = "default_graph_version")]
    pub api_version: String,
    #[serde(default)]
    pub posting: PostingConfig,
    #[serde(default)]
    pub captions: CaptionsConfig,
}

fn default_graph_url() -> String {
    DEFAULT_GRAPH_URL.to_string()
}

fn default_graph_version() -> String {
    DEFAULT_GRAPH_VERSION.to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct XConfig {
    pub consumer_key: Option<String>,
    pub consumer_secret: Option<String>,
    pub access_token: Option<String>,
    pub access_token_secret: Option<String>,
    #[serde(default = "default_x_api_url")]
    pub api_base_url: String,
    #[serde(default = "default_x_upload_url")]
    pub upload_url: String,
    #[serde(default)]
    pub posting: PostingConfig,
    #[serde(default)]
    pub captions: CaptionsConfig,
}

fn default_x_api_url() -> String {
    DEFAULT_X_API_URL.to_string()
}

fn default_x_upload_url() -> String {
    DEFAULT_X_UPLOAD_URL.to_string()
}

/// Config value, or the environment variable when the value is absent
fn secret(value: &Option<String>, field: &str, env_var: &str) -> Result<String> {
    value
        .clone()
        .filter(|v| !v.is_empty())
        .or_else(|| std::env::var(env_var).ok().filter(|v| !v.is_empty()))
        .ok_or_else(|| ConfigError::MissingField(format!("{} (or set {})", field, env_var)).into())
}

impl GraphConfig {
    /// Access token from the file or `MEDIACAST_<PLATFORM>_TOKEN`
    pub fn token(&self, platform: Platform) -> Result<String> {
        let env_var = format!("MEDIACAST_{}_TOKEN", platform.as_str().to_uppercase());
        secret(
            &self.access_token,
            &format!("{}.access_token", platform),
            &env_var,
        )
    }
}

impl XConfig {
    pub fn credentials(&self) -> Result<OAuthCredentials> {
        Ok(OAuthCredentials {
            consumer_key: secret(
                &self.consumer_key,
                "x.consumer_key",
                "MEDIACAST_X_CONSUMER_KEY",
            )?,
            consumer_secret: secret(
                &self.consumer_secret,
                "x.consumer_secret",
                "MEDIACAST_X_CONSUMER_SECRET",
            )?,
            access_token: secret(
                &self.access_token,
                "x.access_token",
                "MEDIACAST_X_ACCESS_TOKEN",
            )?,
            access_token_secret: secret(
                &self.access_token_secret,
                "x.access_token_secret",
                "MEDIACAST_X_ACCESS_TOKEN_SECRET",
            )?,
        })
    }
}

fn invalid(field: &str, reason: impl Into<String>) -> ConfigError {
    ConfigError::Invalid {
        field: field.to_string(),
        reason: reason.into(),
    }
}

impl Config {
    /// Load configuration from the default location
    pub fn load() -> Result<Self> {
        let config_path = resolve_config_path()?;
        Self::load_from_path(&config_path)
    }

    /// Load and validate configuration from a specific path
    pub fn load_from_path(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(ConfigError::ReadError)?;
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        let config: Config = toml::from_str(content).map_err(ConfigError::ParseError)?;
        config.validate()?;
        Ok(config)
    }

    /// Create a default configuration with no platforms enabled
    pub fn default_config() -> Self {
        Self {
            database: DatabaseConfig {
                path: "~/.local/share/mediacast/catalog.db".to_string(),
            },
            selection: SelectionConfig::default(),
            http: HttpConfig::default(),
            instagram: None,
            facebook: None,
            x: None,
        }
    }

    pub fn validate(&self) -> Result<()> {
        self.cooldown()?;

        if self.selection.max_tries == 0 {
            return Err(invalid("selection.max_tries", "must be at least 1").into());
        }
        if self.http.timeout_secs == 0 {
            return Err(invalid("http.timeout_secs", "must be at least 1").into());
        }

        for platform in [Platform::Instagram, Platform::Facebook, Platform::X] {
            if self.posting(platform).is_some() {
                self.publish_settings(platform)?;
            }
        }

        Ok(())
    }

    pub fn cooldown(&self) -> Result<Duration> {
        humantime::parse_duration(&self.selection.cooldown)
            .map_err(|e| invalid("selection.cooldown", e.to_string()).into())
    }

    pub fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.http.timeout_secs)
    }

    /// Database path with `~` expanded
    pub fn database_path(&self) -> PathBuf {
        PathBuf::from(shellexpand::tilde(&self.database.path).to_string())
    }

    fn posting(&self, platform: Platform) -> Option<&PostingConfig> {
        match platform {
            Platform::Instagram => self.instagram.as_ref().map(|c| &c.posting),
            Platform::Facebook => self.facebook.as_ref().map(|c| &c.posting),
            Platform::X => self.x.as_ref().map(|c| &c.posting),
            Platform::LinkedIn | Platform::TikTok => None,
        }
    }

    fn captions(&self, platform: Platform) -> Option<&CaptionsConfig> {
        match platform {
            Platform::Instagram => self.instagram.as_ref().map(|c| &c.captions),
            Platform::Facebook => self.facebook.as_ref().map(|c| &c.captions),
            Platform::X => self.x.as_ref().map(|c| &c.captions),
            Platform::LinkedIn | Platform::TikTok => None,
        }
    }

    /// Platform defaults with this file's selection and posting overrides
    pub fn publish_settings(&self, platform: Platform) -> Result<PublishSettings> {
        let mut settings = PublishSettings::for_platform(platform);
        settings.cooldown = self.cooldown()?;
        settings.max_tries = self.selection.max_tries;
        settings.media_type = self.selection.media_type;

        let Some(posting) = self.posting(platform) else {
            return Ok(settings);
        };

        let section = platform.as_str();
        if let Some(mode) = posting.mode {
            settings.mode = mode;
        }
        if let Some(chance) = posting.carousel_chance_percent {
            if chance > 100 {
                return Err(invalid(
                    &format!("{}.posting.carousel_chance_percent", section),
                    "must be between 0 and 100",
                )
                .into());
            }
            settings.carousel_chance_percent = chance;
        }

        let min = posting.group_min.unwrap_or(*settings.group_range.start());
        let max = posting.group_max.unwrap_or(*settings.group_range.end());
        if min == 0 || min > max {
            return Err(invalid(
                &format!("{}.posting.group_min", section),
                format!("need 1 <= group_min <= group_max, got {}..={}", min, max),
            )
            .into());
        }
        if platform == Platform::X && max > X_MAX_MEDIA {
            return Err(invalid(
                "x.posting.group_max",
                format!("X allows at most {} images per post", X_MAX_MEDIA),
            )
            .into());
        }
        settings.group_range = min..=max;

        Ok(settings)
    }

    /// Built-in templates for the platform with this file's overrides
    pub fn caption_templates(&self, platform: Platform) -> CaptionTemplates {
        let mut templates = CaptionTemplates::default_for(platform);

        if let Some(captions) = self.captions(platform) {
            if let Some(single) = &captions.single {
                templates.single = single.clone();
            }
            if let Some(aggregate) = &captions.aggregate {
                templates.aggregate = aggregate.clone();
            }
            if captions.max_tags.is_some() {
                templates.max_tags = captions.max_tags;
            }
            if captions.default_url.is_some() {
                templates.default_url = captions.default_url.clone();
            }
        }

        templates
    }
}

/// Resolve the configuration file path following XDG Base Directory spec
pub fn resolve_config_path() -> Result<PathBuf> {
    if let Ok(path) = std::env::var(CONFIG_ENV) {
        return Ok(PathBuf::from(shellexpand::tilde(&path).to_string()));
    }

    let config_dir = dirs::config_dir()
        .ok_or_else(|| ConfigError::MissingField("config directory".to_string()))?;

    Ok(config_dir.join("mediacast").join("config.toml"))
}
