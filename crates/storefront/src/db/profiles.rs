//! Profile repository for database operations.
//!
//! Profiles are keyed by the identity service's subject id. They are created
//! lazily on first sign-in and never deleted.

use chrono::{DateTime, Utc};
use sqlx::PgPool;
use tracing::instrument;

use carniceria_core::{AddressType, Email, ProfileId, ProfileRole, ProfileUpdate, UserProfile};

use super::RepositoryError;

const PROFILE_COLUMNS: &str = r"
    id, identity_id, email, display_name, phone, address, address_type, floor, buzzer,
    role, avatar_url, created_at, updated_at
";

/// Internal row type for database queries.
#[derive(Debug, sqlx::FromRow)]
struct ProfileRow {
    id: i32,
    identity_id: String,
    email: String,
    display_name: Option<String>,
    phone: Option<String>,
    address: Option<String>,
    address_type: Option<String>,
    floor: Option<String>,
    buzzer: Option<String>,
    role: ProfileRole,
    avatar_url: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<ProfileRow> for UserProfile {
    type Error = RepositoryError;

    fn try_from(row: ProfileRow) -> Result<Self, Self::Error> {
        let email = Email::parse(&row.email).map_err(|e| {
            RepositoryError::DataCorruption(format!("invalid email in database: {e}"))
        })?;
        let address_type = row
            .address_type
            .as_deref()
            .map(str::parse::<AddressType>)
            .transpose()
            .map_err(|e| RepositoryError::DataCorruption(e.to_string()))?;

        Ok(Self {
            id: ProfileId::new(row.id),
            identity_id: row.identity_id,
            email,
            display_name: row.display_name,
            phone: row.phone,
            address: row.address,
            address_type,
            floor: row.floor,
            buzzer: row.buzzer,
            role: row.role,
            avatar_url: row.avatar_url,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

/// Fields known about a shopper when their profile is first created.
#[derive(Debug, Clone)]
pub struct NewProfile<'a> {
    pub identity_id: &'a str,
    pub email: &'a Email,
    pub display_name: Option<&'a str>,
    pub avatar_url: Option<&'a str>,
}

/// Repository for profile database operations.
pub struct ProfileRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> ProfileRepository<'a> {
    /// Create a new profile repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Get a profile by its ID.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    /// Returns `RepositoryError::DataCorruption` if the stored email is invalid.
    pub async fn get_by_id(&self, id: ProfileId) -> Result<Option<UserProfile>, RepositoryError> {
        let row = sqlx::query_as::<_, ProfileRow>(&format!(
            "SELECT {PROFILE_COLUMNS} FROM shop.profile WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(self.pool)
        .await?;

        row.map(TryInto::try_into).transpose()
    }

    /// Get a profile by the identity service's subject id.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_by_identity(
        &self,
        identity_id: &str,
    ) -> Result<Option<UserProfile>, RepositoryError> {
        let row = sqlx::query_as::<_, ProfileRow>(&format!(
            "SELECT {PROFILE_COLUMNS} FROM shop.profile WHERE identity_id = $1"
        ))
        .bind(identity_id)
        .fetch_optional(self.pool)
        .await?;

        row.map(TryInto::try_into).transpose()
    }

    /// Fetch the profile for `identity_id`, creating it if this is the
    /// shopper's first visit.
    ///
    /// Concurrent first sign-ins resolve to the same row.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    #[instrument(skip(self, new), fields(identity_id = %new.identity_id))]
    pub async fn get_or_create(
        &self,
        new: &NewProfile<'_>,
    ) -> Result<UserProfile, RepositoryError> {
        let row = sqlx::query_as::<_, ProfileRow>(&format!(
            r"
            INSERT INTO shop.profile (identity_id, email, display_name, avatar_url)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (identity_id) DO UPDATE SET email = EXCLUDED.email
            RETURNING {PROFILE_COLUMNS}
            "
        ))
        .bind(new.identity_id)
        .bind(new.email.as_str())
        .bind(new.display_name)
        .bind(new.avatar_url)
        .fetch_one(self.pool)
        .await?;

        row.try_into()
    }

    /// Save the shopper-editable fields.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if no profile has this ID.
    #[instrument(skip(self, update))]
    pub async fn update(
        &self,
        id: ProfileId,
        update: &ProfileUpdate,
    ) -> Result<UserProfile, RepositoryError> {
        let row = sqlx::query_as::<_, ProfileRow>(&format!(
            r"
            UPDATE shop.profile
            SET display_name = $2, phone = $3, address = $4, address_type = $5,
                floor = $6, buzzer = $7, updated_at = NOW()
            WHERE id = $1
            RETURNING {PROFILE_COLUMNS}
            "
        ))
        .bind(id)
        .bind(&update.display_name)
        .bind(&update.phone)
        .bind(&update.address)
        .bind(update.address_type.map(AddressType::as_str))
        .bind(&update.floor)
        .bind(&update.buzzer)
        .fetch_optional(self.pool)
        .await?
        .ok_or(RepositoryError::NotFound)?;

        row.try_into()
    }

    /// Set the role of every profile registered with `email`.
    ///
    /// Returns the number of profiles changed.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if no profile uses this email.
    #[instrument(skip(self), fields(email = %email))]
    pub async fn set_role_by_email(
        &self,
        email: &Email,
        role: ProfileRole,
    ) -> Result<u64, RepositoryError> {
        let result = sqlx::query(
            r"
            UPDATE shop.profile
            SET role = $2, updated_at = NOW()
            WHERE lower(email) = lower($1)
            ",
        )
        .bind(email.as_str())
        .bind(role)
        .execute(self.pool)
        .await?;

        match result.rows_affected() {
            0 => Err(RepositoryError::NotFound),
            n => Ok(n),
        }
    }
}
