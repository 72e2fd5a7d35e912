//! `PostgreSQL` profile repository.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use qrtag_core::{AccountId, Age, Code, Email, PhotoRef, ProfileId, SocialHandle};

use super::{ConflictKind, ProfileStore, RepositoryError};
use crate::models::{NewProfile, Profile, ProfilePatch};

const PROFILE_COLUMNS: &str = "id, account_id, code, email, display_name, age, bio, \
     instagram, tiktok, twitter, photo_url, created_at, updated_at";

/// Unique constraint on `qrtag.profile.code`.
const CODE_CONSTRAINT: &str = "profile_code_key";
/// Unique constraint on `qrtag.profile.account_id`.
const ACCOUNT_CONSTRAINT: &str = "profile_account_id_key";

#[derive(sqlx::FromRow)]
struct ProfileRow {
    id: i32,
    account_id: Uuid,
    code: String,
    email: Option<String>,
    display_name: String,
    age: Option<i32>,
    bio: Option<String>,
    instagram: Option<String>,
    tiktok: Option<String>,
    twitter: Option<String>,
    photo_url: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<ProfileRow> for Profile {
    type Error = RepositoryError;

    fn try_from(row: ProfileRow) -> Result<Self, Self::Error> {
        let code = Code::parse(&row.code).map_err(|e| {
            RepositoryError::DataCorruption(format!("invalid code in database: {e}"))
        })?;
        let email = row
            .email
            .as_deref()
            .map(Email::parse)
            .transpose()
            .map_err(|e| {
                RepositoryError::DataCorruption(format!("invalid email in database: {e}"))
            })?;
        let age = row
            .age
            .map(|years| Age::try_from(i64::from(years)))
            .transpose()
            .map_err(|e| RepositoryError::DataCorruption(format!("invalid age in database: {e}")))?;

        Ok(Self {
            id: ProfileId::new(row.id),
            account_id: AccountId::from_uuid(row.account_id),
            code,
            email,
            display_name: row.display_name,
            age,
            bio: row.bio,
            instagram: row.instagram.as_deref().and_then(SocialHandle::parse_optional),
            tiktok: row.tiktok.as_deref().and_then(SocialHandle::parse_optional),
            twitter: row.twitter.as_deref().and_then(SocialHandle::parse_optional),
            photo: row.photo_url.map(PhotoRef::from_stored),
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

/// Map a unique violation to the constraint it hit.
fn map_insert_error(e: sqlx::Error) -> RepositoryError {
    if let sqlx::Error::Database(ref db_err) = e
        && db_err.is_unique_violation()
    {
        let kind = match db_err.constraint() {
            Some(CODE_CONSTRAINT) => ConflictKind::Code,
            Some(ACCOUNT_CONSTRAINT) => ConflictKind::Account,
            _ => ConflictKind::Other,
        };
        return RepositoryError::Conflict(kind);
    }
    RepositoryError::Database(e)
}

/// Profile store backed by `PostgreSQL`.
#[derive(Clone)]
pub struct PgProfileStore {
    pool: PgPool,
}

impl PgProfileStore {
    /// Create a new profile store.
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ProfileStore for PgProfileStore {
    async fn find_by_code(&self, code: &Code) -> Result<Option<Profile>, RepositoryError> {
        let row: Option<ProfileRow> = sqlx::query_as(&format!(
            "SELECT {PROFILE_COLUMNS} FROM qrtag.profile WHERE code = $1"
        ))
        .bind(code.as_str())
        .fetch_optional(&self.pool)
        .await?;

        row.map(Profile::try_from).transpose()
    }

    async fn find_by_account(
        &self,
        account: AccountId,
    ) -> Result<Option<Profile>, RepositoryError> {
        let row: Option<ProfileRow> = sqlx::query_as(&format!(
            "SELECT {PROFILE_COLUMNS} FROM qrtag.profile WHERE account_id = $1"
        ))
        .bind(account.as_uuid())
        .fetch_optional(&self.pool)
        .await?;

        row.map(Profile::try_from).transpose()
    }

    async fn insert(&self, new: NewProfile) -> Result<Profile, RepositoryError> {
        let row: ProfileRow = sqlx::query_as(&format!(
            "INSERT INTO qrtag.profile (account_id, code, email) \
             VALUES ($1, $2, $3) \
             RETURNING {PROFILE_COLUMNS}"
        ))
        .bind(new.account_id.as_uuid())
        .bind(new.code.as_str())
        .bind(new.email.as_ref().map(Email::as_str))
        .fetch_one(&self.pool)
        .await
        .map_err(map_insert_error)?;

        Profile::try_from(row)
    }

    async fn update(
        &self,
        account: AccountId,
        patch: ProfilePatch,
    ) -> Result<Profile, RepositoryError> {
        let ProfilePatch {
            display_name,
            age,
            bio,
            instagram,
            tiktok,
            twitter,
            photo,
        } = patch;

        let row: Option<ProfileRow> = sqlx::query_as(&format!(
            "UPDATE qrtag.profile SET \
                 display_name = COALESCE($2, display_name), \
                 age = CASE WHEN $3 THEN $4 ELSE age END, \
                 bio = CASE WHEN $5 THEN $6 ELSE bio END, \
                 instagram = CASE WHEN $7 THEN $8 ELSE instagram END, \
                 tiktok = CASE WHEN $9 THEN $10 ELSE tiktok END, \
                 twitter = CASE WHEN $11 THEN $12 ELSE twitter END, \
                 photo_url = COALESCE($13, photo_url), \
                 updated_at = now() \
             WHERE account_id = $1 \
             RETURNING {PROFILE_COLUMNS}"
        ))
        .bind(account.as_uuid())
        .bind(display_name)
        .bind(age.is_some())
        .bind(age.flatten().map(|a| a.years()))
        .bind(bio.is_some())
        .bind(bio.flatten())
        .bind(instagram.is_some())
        .bind(instagram.flatten().map(|h| h.as_str().to_owned()))
        .bind(tiktok.is_some())
        .bind(tiktok.flatten().map(|h| h.as_str().to_owned()))
        .bind(twitter.is_some())
        .bind(twitter.flatten().map(|h| h.as_str().to_owned()))
        .bind(photo.map(PhotoRef::into_inner))
        .fetch_optional(&self.pool)
        .await?;

        row.map_or(Err(RepositoryError::NotFound), Profile::try_from)
    }

    async fn ping(&self) -> Result<(), RepositoryError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}
