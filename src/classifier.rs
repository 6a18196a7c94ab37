//! Decides which field values are human-readable text.
//!
//! The shape predicates (`is_asset_reference`, `entry_link_id`, ...) need no
//! configuration and back [`FieldValue::decode`]. [`Classifier`] carries the
//! configured skip list and URL patterns.

use crate::config::TranslateConfig;
use crate::content::model::FieldValue;
use crate::error::ConfigError;
use crate::mt::translator::MIN_TRANSLATABLE_CHARS;
use regex::Regex;
use serde_json::Value;
use std::collections::HashSet;
use std::fmt;

pub fn is_asset_reference(value: &Value) -> bool {
    let sys = &value["sys"];
    sys["type"] == "Asset" || (sys["type"] == "Link" && sys["linkType"] == "Asset")
}

pub fn entry_link_id(value: &Value) -> Option<&str> {
    let sys = &value["sys"];
    if sys["type"] == "Link" && sys["linkType"] == "Entry" {
        sys["id"].as_str()
    } else {
        None
    }
}

pub fn is_entry_link(value: &Value) -> bool {
    entry_link_id(value).is_some()
}

pub fn is_rich_document(value: &Value) -> bool {
    value["nodeType"] == "document" && value["content"].is_array()
}

/// An entry embedded inline rather than linked
pub fn is_sub_entry(value: &Value) -> bool {
    value["sys"]["contentType"].is_object()
}

/// Contains a path separator and a hyphen but no whitespace
pub fn is_possible_url(text: &str) -> bool {
    text.contains('/') && text.contains('-') && !text.chars().any(char::is_whitespace)
}

/// Verdict on a single string value
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextClass {
    Translatable,
    /// Still translatable, but worth a second look by an operator
    PossibleUrl,
    TooShort,
    AbsoluteUrl,
    RelativePath,
    AnchorLink,
}

impl TextClass {
    pub fn is_translatable(self) -> bool {
        matches!(self, TextClass::Translatable | TextClass::PossibleUrl)
    }
}

impl fmt::Display for TextClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            TextClass::Translatable => "text",
            TextClass::PossibleUrl => "possible URL",
            TextClass::TooShort => "too short",
            TextClass::AbsoluteUrl => "absolute URL",
            TextClass::RelativePath => "relative path",
            TextClass::AnchorLink => "anchor link",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone)]
pub struct Classifier {
    skip_fields: HashSet<String>,
    absolute_url: Regex,
    relative_path: Regex,
    anchor_link: Regex,
}

impl Classifier {
    pub fn new(config: &TranslateConfig) -> Result<Self, ConfigError> {
        let (absolute_url, relative_path, anchor_link) = config.compile_patterns()?;
        Ok(Self {
            skip_fields: config.skip_fields.iter().cloned().collect(),
            absolute_url,
            relative_path,
            anchor_link,
        })
    }

    pub fn is_skippable(&self, field_name: &str) -> bool {
        self.skip_fields.contains(field_name)
    }

    pub fn is_absolute_url(&self, text: &str) -> bool {
        self.absolute_url.is_match(text)
    }

    pub fn is_relative_path(&self, text: &str) -> bool {
        self.relative_path.is_match(text)
    }

    pub fn is_anchor_link(&self, text: &str) -> bool {
        self.anchor_link.is_match(text)
    }

    pub fn classify_text(&self, text: &str) -> TextClass {
        let trimmed = text.trim();
        if trimmed.chars().count() < MIN_TRANSLATABLE_CHARS {
            TextClass::TooShort
        } else if self.is_absolute_url(trimmed) {
            TextClass::AbsoluteUrl
        } else if self.is_relative_path(trimmed) {
            TextClass::RelativePath
        } else if self.is_anchor_link(trimmed) {
            TextClass::AnchorLink
        } else if is_possible_url(trimmed) {
            TextClass::PossibleUrl
        } else {
            TextClass::Translatable
        }
    }

    pub fn is_translatable_text(&self, text: &str) -> bool {
        self.classify_text(text).is_translatable()
    }

    /// Whether a field value can be handed to the translator as a whole
    ///
    /// Arrays, links and plain objects never are: their parts are visited
    /// separately by the walker.
    pub fn is_translatable_value(&self, value: &FieldValue<'_>) -> bool {
        match value {
            FieldValue::Text(text) => self.is_translatable_text(text),
            FieldValue::RichDocument(_) => true,
            FieldValue::EntryLink(_)
            | FieldValue::AssetLink
            | FieldValue::SubEntry(_)
            | FieldValue::Array(_)
            | FieldValue::Object(_)
            | FieldValue::Opaque(_) => false,
        }
    }
}
