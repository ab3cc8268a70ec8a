//! Editable content identifiers.
//!
//! A [`ContentKey`] names one editable item (an article, a course, ...) and is
//! the unit that content versions and the protected-content list refer to.

use core::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Errors that can occur when parsing content identifiers.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum ContentKeyError {
    /// The content type is not one of the known kinds.
    #[error("unknown content type: {0}")]
    UnknownType(String),
    /// The item id is empty.
    #[error("item id cannot be empty")]
    EmptyItemId,
    /// The item id is too long.
    #[error("item id must be at most {max} characters")]
    ItemIdTooLong {
        /// Maximum allowed length.
        max: usize,
    },
    /// A `type:id` pair is missing its separator.
    #[error("content key must look like type:id, got {0:?}")]
    MissingSeparator(String),
}

/// Kinds of editable content.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentType {
    Article,
    Course,
    Treatment,
    Product,
    Blog,
}

impl ContentType {
    /// All content types, in display order.
    pub const ALL: [Self; 5] = [
        Self::Article,
        Self::Course,
        Self::Treatment,
        Self::Product,
        Self::Blog,
    ];

    /// The wire name used in query strings and JSON.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Article => "article",
            Self::Course => "course",
            Self::Treatment => "treatment",
            Self::Product => "product",
            Self::Blog => "blog",
        }
    }
}

impl fmt::Display for ContentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ContentType {
    type Err = ContentKeyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let needle = s.trim();
        Self::ALL
            .into_iter()
            .find(|ty| ty.as_str().eq_ignore_ascii_case(needle))
            .ok_or_else(|| ContentKeyError::UnknownType(needle.to_owned()))
    }
}

/// A `(content type, item id)` pair.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContentKey {
    pub content_type: ContentType,
    pub item_id: String,
}

impl ContentKey {
    /// Maximum item id length.
    pub const MAX_ITEM_ID_LENGTH: usize = 200;

    /// Build a key, trimming and validating the item id.
    ///
    /// # Errors
    ///
    /// Returns an error if the item id is empty or too long.
    pub fn new(content_type: ContentType, item_id: &str) -> Result<Self, ContentKeyError> {
        let item_id = item_id.trim();

        if item_id.is_empty() {
            return Err(ContentKeyError::EmptyItemId);
        }

        if item_id.chars().count() > Self::MAX_ITEM_ID_LENGTH {
            return Err(ContentKeyError::ItemIdTooLong {
                max: Self::MAX_ITEM_ID_LENGTH,
            });
        }

        Ok(Self {
            content_type,
            item_id: item_id.to_owned(),
        })
    }

    /// Build a key from raw strings (query parameters, form fields).
    ///
    /// # Errors
    ///
    /// Returns an error if either part is invalid.
    pub fn parse_parts(content_type: &str, item_id: &str) -> Result<Self, ContentKeyError> {
        Self::new(content_type.parse()?, item_id)
    }
}

impl fmt::Display for ContentKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.content_type, self.item_id)
    }
}

/// Parses the `type:id` form used in configuration, e.g. `article:42`.
impl FromStr for ContentKey {
    type Err = ContentKeyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (ty, id) = s
            .trim()
            .split_once(':')
            .ok_or_else(|| ContentKeyError::MissingSeparator(s.to_owned()))?;
        Self::parse_parts(ty, id)
    }
}
