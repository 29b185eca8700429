//! Core types for Mediacast

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

/// Kind of media stored in the catalog
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum MediaType {
    Image,
    Video,
}

impl MediaType {
    pub fn as_str(&self) -> &'static str {
        match self {
            MediaType::Image => "image",
            MediaType::Video => "video",
        }
    }
}

impl FromStr for MediaType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "image" => Ok(MediaType::Image),
            "video" => Ok(MediaType::Video),
            _ => Err(format!("Invalid media type: '{}'. Valid options: image, video", s)),
        }
    }
}

impl fmt::Display for MediaType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Target platform of a posting job
///
/// Every platform owns exactly one cooldown timestamp on [`MediaItem`].
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    Instagram,
    Facebook,
    X,
    LinkedIn,
    TikTok,
}

impl Platform {
    pub fn as_str(&self) -> &'static str {
        match self {
            Platform::Instagram => "instagram",
            Platform::Facebook => "facebook",
            Platform::X => "x",
            Platform::LinkedIn => "linkedin",
            Platform::TikTok => "tiktok",
        }
    }

    /// Catalog column holding this platform's last post timestamp
    pub fn cooldown_column(&self) -> &'static str {
        match self {
            Platform::Instagram => "last_ig_post",
            Platform::Facebook => "last_fb_post",
            Platform::X => "last_x_post",
            Platform::LinkedIn => "last_li_post",
            Platform::TikTok => "last_tt_post",
        }
    }
}

impl FromStr for Platform {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "instagram" | "ig" => Ok(Platform::Instagram),
            "facebook" | "fb" => Ok(Platform::Facebook),
            "x" | "twitter" => Ok(Platform::X),
            "linkedin" => Ok(Platform::LinkedIn),
            "tiktok" => Ok(Platform::TikTok),
            _ => Err(format!(
                "Unknown platform: '{}'. Valid options: instagram, facebook, x",
                s
            )),
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One postable asset in the shared catalog
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MediaItem {
    /// Unique identity key
    pub filename: String,
    pub url: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub media_type: MediaType,
    #[serde(default)]
    pub project_name: String,
    #[serde(default)]
    pub project_url: Option<String>,
    #[serde(default)]
    pub tag_list: BTreeSet<String>,
    #[serde(default)]
    pub group_list: BTreeSet<String>,
    #[serde(default)]
    pub caption_list: Vec<String>,
    #[serde(default)]
    pub last_ig_post: f64,
    #[serde(default)]
    pub last_x_post: f64,
    #[serde(default)]
    pub last_fb_post: f64,
    #[serde(default)]
    pub last_li_post: f64,
    #[serde(default)]
    pub last_tt_post: f64,
}

impl MediaItem {
    /// Create an image item that has never been posted anywhere
    pub fn new(filename: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            filename: filename.into(),
            url: url.into(),
            name: String::new(),
            description: String::new(),
            media_type: MediaType::Image,
            project_name: String::new(),
            project_url: None,
            tag_list: BTreeSet::new(),
            group_list: BTreeSet::new(),
            caption_list: Vec::new(),
            last_ig_post: 0.0,
            last_x_post: 0.0,
            last_fb_post: 0.0,
            last_li_post: 0.0,
            last_tt_post: 0.0,
        }
    }

    pub fn last_post(&self, platform: Platform) -> f64 {
        match platform {
            Platform::Instagram => self.last_ig_post,
            Platform::Facebook => self.last_fb_post,
            Platform::X => self.last_x_post,
            Platform::LinkedIn => self.last_li_post,
            Platform::TikTok => self.last_tt_post,
        }
    }

    /// Record a post time, never moving the timestamp backwards
    pub fn set_last_post(&mut self, platform: Platform, timestamp: f64) {
        let slot = match platform {
            Platform::Instagram => &mut self.last_ig_post,
            Platform::Facebook => &mut self.last_fb_post,
            Platform::X => &mut self.last_x_post,
            Platform::LinkedIn => &mut self.last_li_post,
            Platform::TikTok => &mut self.last_tt_post,
        };
        *slot = slot.max(timestamp);
    }
}

/// How a job decides between a single post and a group post
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum PostMode {
    Single,
    Carousel,
    Random,
}

impl FromStr for PostMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "single" => Ok(PostMode::Single),
            "carousel" | "group" => Ok(PostMode::Carousel),
            "random" => Ok(PostMode::Random),
            _ => Err(format!(
                "Invalid post mode: '{}'. Valid options: single, carousel, random",
                s
            )),
        }
    }
}

/// Shape of a published post
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum PostKind {
    Single,
    Carousel,
}

/// Summary of a successful publish
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PublishReport {
    pub platform: Platform,
    /// Platform-specific id of the published post
    pub post_id: String,
    pub kind: PostKind,
    /// Filenames included in the post, in publish order
    pub filenames: Vec<String>,
    /// True when a planned group post fell back to a single item
    pub degraded: bool,
}

/// Current time as fractional Unix epoch seconds
pub fn now_epoch() -> f64 {
    chrono::Utc::now().timestamp_micros() as f64 / 1_000_000.0
}
