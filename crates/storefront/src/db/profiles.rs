//! Member profile repository.

use chrono::{DateTime, Utc};
use sqlx::PgPool;
use sqlx::types::Json;
use uuid::Uuid;

use vitalis_core::{Email, UserId};

use super::RepositoryError;
use crate::models::{ProfilePreferences, ProfileUpdate, SkinType, UserProfile};

const PROFILE_COLUMNS: &str = "id, email, display_name, preferences, skin_type, skin_concerns, \
                               created_at, updated_at";

/// Raw `storefront.profile` row.
#[derive(Debug, sqlx::FromRow)]
struct ProfileRow {
    id: Uuid,
    email: String,
    display_name: Option<String>,
    preferences: Json<ProfilePreferences>,
    skin_type: Option<String>,
    skin_concerns: Vec<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<ProfileRow> for UserProfile {
    type Error = RepositoryError;

    fn try_from(row: ProfileRow) -> Result<Self, Self::Error> {
        let email = Email::parse(&row.email).map_err(|e| {
            RepositoryError::DataCorruption(format!("invalid email in database: {e}"))
        })?;
        let skin_type = row
            .skin_type
            .as_deref()
            .map(str::parse::<SkinType>)
            .transpose()
            .map_err(|e| RepositoryError::DataCorruption(e.to_string()))?;

        Ok(Self {
            id: UserId::new(row.id),
            email,
            display_name: row.display_name,
            preferences: row.preferences.0,
            skin_type,
            skin_concerns: row.skin_concerns,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

/// Repository for member profiles.
pub struct ProfileRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> ProfileRepository<'a> {
    /// Create a new profile repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Get a profile by user id.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    /// Returns `RepositoryError::DataCorruption` if the stored row is invalid.
    pub async fn get(&self, id: UserId) -> Result<Option<UserProfile>, RepositoryError> {
        let row: Option<ProfileRow> = sqlx::query_as(&format!(
            "SELECT {PROFILE_COLUMNS} FROM storefront.profile WHERE id = $1"
        ))
        .bind(id.as_uuid())
        .fetch_optional(self.pool)
        .await?;

        row.map(UserProfile::try_from).transpose()
    }

    /// Create the profile for a freshly signed-in user unless one exists,
    /// then return the stored profile.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if a query fails.
    pub async fn create_if_absent(
        &self,
        id: UserId,
        email: &Email,
    ) -> Result<UserProfile, RepositoryError> {
        sqlx::query(
            r"
            INSERT INTO storefront.profile (id, email)
            VALUES ($1, $2)
            ON CONFLICT (id) DO NOTHING
            ",
        )
        .bind(id.as_uuid())
        .bind(email.as_str())
        .execute(self.pool)
        .await?;

        self.get(id).await?.ok_or(RepositoryError::NotFound)
    }

    /// Apply a member's profile changes.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the profile does not exist.
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn update(
        &self,
        id: UserId,
        update: &ProfileUpdate,
    ) -> Result<UserProfile, RepositoryError> {
        let row: Option<ProfileRow> = sqlx::query_as(&format!(
            r"
            UPDATE storefront.profile
            SET display_name = $2,
                skin_type = $3,
                skin_concerns = $4,
                preferences = $5,
                updated_at = now()
            WHERE id = $1
            RETURNING {PROFILE_COLUMNS}
            "
        ))
        .bind(id.as_uuid())
        .bind(update.display_name.as_deref())
        .bind(update.skin_type.map(SkinType::as_str))
        .bind(&update.skin_concerns)
        .bind(Json(&update.preferences))
        .fetch_optional(self.pool)
        .await?;

        row.ok_or(RepositoryError::NotFound)
            .and_then(UserProfile::try_from)
    }
}
