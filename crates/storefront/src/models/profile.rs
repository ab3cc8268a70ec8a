//! Member profile types.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use vitalis_core::{Email, UserId};

/// A member profile (domain type).
///
/// Created lazily the first time a user signs in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserProfile {
    pub id: UserId,
    pub email: Email,
    pub display_name: Option<String>,
    pub preferences: ProfilePreferences,
    pub skin_type: Option<SkinType>,
    pub skin_concerns: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Free-form member preferences, stored as JSONB.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProfilePreferences {
    /// Whether the member wants the newsletter.
    pub newsletter: bool,
    /// Catalog categories the member is interested in.
    pub interests: Vec<String>,
}

/// Skin type as chosen in the member profile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SkinType {
    Normal,
    Dry,
    Oily,
    Combination,
    Sensitive,
}

impl SkinType {
    /// All skin types, in form order.
    pub const ALL: [Self; 5] = [
        Self::Normal,
        Self::Dry,
        Self::Oily,
        Self::Combination,
        Self::Sensitive,
    ];

    /// Stored and form value.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Normal => "normal",
            Self::Dry => "dry",
            Self::Oily => "oily",
            Self::Combination => "combination",
            Self::Sensitive => "sensitive",
        }
    }

    /// Swedish label for the profile form.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Normal => "Normal",
            Self::Dry => "Torr",
            Self::Oily => "Fet",
            Self::Combination => "Kombinerad",
            Self::Sensitive => "Känslig",
        }
    }
}

impl fmt::Display for SkinType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error parsing a [`SkinType`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown skin type: {0}")]
pub struct UnknownSkinType(pub String);

impl FromStr for SkinType {
    type Err = UnknownSkinType;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|ty| ty.as_str() == s.trim())
            .ok_or_else(|| UnknownSkinType(s.to_owned()))
    }
}

/// Changes a member can make to their profile.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProfileUpdate {
    pub display_name: Option<String>,
    pub skin_type: Option<SkinType>,
    pub skin_concerns: Vec<String>,
    pub preferences: ProfilePreferences,
}
