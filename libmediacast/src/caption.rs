//! Caption composition
//!
//! Captions are rendered from Handlebars templates in strict mode, so a
//! template that references a value the item does not have (for example
//! `{{caption}}` on an item with an empty caption list) fails with a
//! [`ComposeError`] instead of producing a half-empty post.
//!
//! Variables available to the single-item template:
//!
//! | name          | value                                        |
//! |---------------|----------------------------------------------|
//! | `title`       | project name                                 |
//! | `name`        | item name                                    |
//! | `description` | item description                             |
//! | `subtitle`    | `"{name} - {description}"`                   |
//! | `caption`     | one entry of `caption_list`, drawn at random |
//! | `tags`        | `#tag` list separated by spaces              |
//! | `url`         | project URL, or the configured default       |
//!
//! The aggregate template additionally gets `listing` (an enumerated
//! `"1. name - description"` line per item) and `count`; `title`, `caption`
//! and `url` come from the first item and `tags` is the deduplicated union.

use handlebars::Handlebars;
use rand::seq::SliceRandom;
use rand::RngCore;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use crate::error::{ComposeError, ConfigError};
use crate::types::{MediaItem, Platform};

const SINGLE: &str = "single";
const AGGREGATE: &str = "aggregate";

/// Builds post text from catalog items
///
/// Implementations must be pure functions of their inputs; the random source
/// is passed in explicitly.
pub trait CaptionComposer: Send + Sync {
    fn compose_single(&self, item: &MediaItem, rng: &mut dyn RngCore)
        -> Result<String, ComposeError>;

    /// Compose text for a multi-item post; `items` must not be empty
    fn compose_aggregate(
        &self,
        items: &[MediaItem],
        rng: &mut dyn RngCore,
    ) -> Result<String, ComposeError>;
}

/// Template settings for one platform
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CaptionTemplates {
    pub single: String,
    pub aggregate: String,
    /// Keep at most this many tags, chosen at random
    #[serde(default)]
    pub max_tags: Option<usize>,
    /// Used for `url` when an item has no project URL
    #[serde(default)]
    pub default_url: Option<String>,
}

impl CaptionTemplates {
    /// Built-in templates for a platform
    pub fn default_for(platform: Platform) -> Self {
        match platform {
            Platform::X => Self {
                single: "{{title}}\n{{subtitle}}\n{{#if url}}{{url}}\n{{/if}}{{tags}}".to_string(),
                aggregate: "{{title}}\n{{listing}}\n{{tags}}".to_string(),
                max_tags: Some(5),
                default_url: None,
            },
            _ => Self {
                single: "{{title}}\n\n{{subtitle}}\n\n{{caption}}\n\n{{tags}}".to_string(),
                aggregate: "{{title}}\n\n{{listing}}\n\n{{caption}}\n\n{{tags}}".to_string(),
                max_tags: None,
                default_url: None,
            },
        }
    }
}

#[derive(Serialize)]
struct SingleContext<'a> {
    title: &'a str,
    name: &'a str,
    description: &'a str,
    subtitle: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    caption: Option<&'a str>,
    tags: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    url: Option<&'a str>,
}

#[derive(Serialize)]
struct AggregateContext<'a> {
    title: &'a str,
    listing: String,
    count: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    caption: Option<&'a str>,
    tags: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    url: Option<&'a str>,
}

/// Handlebars-backed [`CaptionComposer`]
pub struct TemplateComposer {
    handlebars: Handlebars<'static>,
    max_tags: Option<usize>,
    default_url: Option<String>,
}

impl TemplateComposer {
    pub fn new(templates: &CaptionTemplates) -> Result<Self, ConfigError> {
        let mut handlebars = Handlebars::new();
        handlebars.set_strict_mode(true);
        // Captions are plain text, not HTML
        handlebars.register_escape_fn(handlebars::no_escape);

        handlebars
            .register_template_string(SINGLE, &templates.single)
            .map_err(|e| ConfigError::Invalid {
                field: "captions.single".to_string(),
                reason: e.to_string(),
            })?;
        handlebars
            .register_template_string(AGGREGATE, &templates.aggregate)
            .map_err(|e| ConfigError::Invalid {
                field: "captions.aggregate".to_string(),
                reason: e.to_string(),
            })?;

        Ok(Self {
            handlebars,
            max_tags: templates.max_tags,
            default_url: templates.default_url.clone(),
        })
    }

    fn url_for<'a>(&'a self, item: &'a MediaItem) -> Option<&'a str> {
        item.project_url
            .as_deref()
            .filter(|url| !url.is_empty())
            .or(self.default_url.as_deref())
    }

    fn format_tags<'a>(
        &self,
        tags: impl IntoIterator<Item = &'a String>,
        rng: &mut dyn RngCore,
    ) -> String {
        let mut tags: Vec<&String> = tags.into_iter().collect::<BTreeSet<_>>().into_iter().collect();

        if let Some(max) = self.max_tags {
            if tags.len() > max {
                tags.shuffle(rng);
                tags.truncate(max);
            }
        }

        tags.iter()
            .map(|tag| format!("#{}", tag))
            .collect::<Vec<_>>()
            .join(" ")
    }

    fn render<T: Serialize>(&self, template: &str, context: &T) -> Result<String, ComposeError> {
        self.handlebars
            .render(template, context)
            .map_err(|e| ComposeError::Template(e.to_string()))
    }
}

impl CaptionComposer for TemplateComposer {
    fn compose_single(
        &self,
        item: &MediaItem,
        rng: &mut dyn RngCore,
    ) -> Result<String, ComposeError> {
        let context = SingleContext {
            title: &item.project_name,
            name: &item.name,
            description: &item.description,
            subtitle: format!("{} - {}", item.name, item.description),
            caption: item.caption_list.choose(rng).map(String::as_str),
            tags: self.format_tags(&item.tag_list, rng),
            url: self.url_for(item),
        };

        self.render(SINGLE, &context)
    }

    fn compose_aggregate(
        &self,
        items: &[MediaItem],
        rng: &mut dyn RngCore,
    ) -> Result<String, ComposeError> {
        let first = items
            .first()
            .ok_or_else(|| ComposeError::MissingField("items".to_string()))?;

        let listing = items
            .iter()
            .enumerate()
            .map(|(i, item)| format!("{}. {} - {}", i + 1, item.name, item.description))
            .collect::<Vec<_>>()
            .join("\n");

        let context = AggregateContext {
            title: &first.project_name,
            listing,
            count: items.len(),
            caption: first.caption_list.choose(rng).map(String::as_str),
            tags: self.format_tags(items.iter().flat_map(|item| item.tag_list.iter()), rng),
            url: self.url_for(first),
        };

        self.render(AGGREGATE, &context)
    }
}
