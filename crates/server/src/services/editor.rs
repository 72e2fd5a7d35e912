//! Profile editing.

use std::sync::Arc;

use bytes::Bytes;
use thiserror::Error;
use tracing::instrument;

use qrtag_core::{AccountId, Age, SocialHandle};

use super::guard::ActionGuard;
use crate::db::{ProfileStore, RepositoryError};
use crate::media::{MediaError, MediaUploadCoordinator};
use crate::models::{CurrentUser, Profile, ProfilePatch};

/// Maximum display name length in characters.
pub const MAX_DISPLAY_NAME_CHARS: usize = 100;

/// Maximum bio length in characters.
pub const MAX_BIO_CHARS: usize = 500;

/// Errors that can occur when editing a profile.
#[derive(Debug, Error)]
pub enum EditError {
    /// A field failed validation; nothing was changed.
    #[error("{0}")]
    Validation(String),

    /// The account has no profile.
    #[error("profile not found")]
    NotFound,

    /// Another edit for the same account is still running.
    #[error("another update is already in progress")]
    InProgress,

    /// The photo could not be stored; nothing was changed.
    #[error("photo upload failed: {0}")]
    UploadFailed(#[source] MediaError),

    /// The photo could not be processed.
    #[error("photo processing failed: {0}")]
    Media(#[source] MediaError),

    /// Data store failure.
    #[error(transparent)]
    Repository(RepositoryError),
}

impl From<RepositoryError> for EditError {
    fn from(e: RepositoryError) -> Self {
        match e {
            RepositoryError::NotFound => Self::NotFound,
            other => Self::Repository(other),
        }
    }
}

impl From<MediaError> for EditError {
    fn from(e: MediaError) -> Self {
        match e {
            MediaError::Empty | MediaError::InvalidImage(_) => Self::Validation(e.to_string()),
            MediaError::UploadFailed(_) => Self::UploadFailed(e),
            other => Self::Media(other),
        }
    }
}

/// Raw field edits as submitted by a client.
///
/// `None` leaves a field untouched. Text is validated and normalized by
/// [`ProfileEditor::update`].
#[derive(Debug, Clone, Default)]
pub struct ProfileForm {
    pub display_name: Option<String>,
    pub age: Option<String>,
    pub bio: Option<String>,
    pub instagram: Option<String>,
    pub tiktok: Option<String>,
    pub twitter: Option<String>,
    /// New photo upload.
    pub photo: Option<Bytes>,
}

impl ProfileForm {
    /// Validate the text fields into a patch.
    ///
    /// # Errors
    ///
    /// Returns `EditError::Validation` naming the first invalid field.
    pub fn to_patch(&self) -> Result<ProfilePatch, EditError> {
        let display_name = self
            .display_name
            .as_deref()
            .map(|raw| {
                let name = raw.trim();
                if name.is_empty() {
                    return Err(EditError::Validation("name is required".to_string()));
                }
                if name.chars().count() > MAX_DISPLAY_NAME_CHARS {
                    return Err(EditError::Validation(format!(
                        "name must be at most {MAX_DISPLAY_NAME_CHARS} characters"
                    )));
                }
                Ok(name.to_owned())
            })
            .transpose()?;

        let age = self
            .age
            .as_deref()
            .map(Age::parse_optional)
            .transpose()
            .map_err(|e| EditError::Validation(e.to_string()))?;

        let bio = self
            .bio
            .as_deref()
            .map(|raw| {
                let bio = raw.trim();
                if bio.chars().count() > MAX_BIO_CHARS {
                    return Err(EditError::Validation(format!(
                        "bio must be at most {MAX_BIO_CHARS} characters"
                    )));
                }
                Ok((!bio.is_empty()).then(|| bio.to_owned()))
            })
            .transpose()?;

        let handle = |raw: &Option<String>| raw.as_deref().map(SocialHandle::parse_optional);

        Ok(ProfilePatch {
            display_name,
            age,
            bio,
            instagram: handle(&self.instagram),
            tiktok: handle(&self.tiktok),
            twitter: handle(&self.twitter),
            photo: None,
        })
    }
}

/// Applies validated edits to bound profiles.
#[derive(Clone)]
pub struct ProfileEditor {
    profiles: Arc<dyn ProfileStore>,
    media: MediaUploadCoordinator,
    guard: ActionGuard,
}

impl ProfileEditor {
    #[must_use]
    pub fn new(profiles: Arc<dyn ProfileStore>, media: MediaUploadCoordinator) -> Self {
        Self {
            profiles,
            media,
            guard: ActionGuard::new(),
        }
    }

    /// Load the profile owned by `account`.
    ///
    /// # Errors
    ///
    /// Returns `EditError::NotFound` if the account has no profile.
    pub async fn load(&self, account: AccountId) -> Result<Profile, EditError> {
        self.profiles
            .find_by_account(account)
            .await?
            .ok_or(EditError::NotFound)
    }

    /// Apply `form` to the current user's profile.
    ///
    /// Fields are validated before anything is stored. A new photo is
    /// uploaded first and its reference is written in the same row update as
    /// the other fields, so a failed upload leaves the profile unchanged.
    ///
    /// # Errors
    ///
    /// Returns `EditError::Validation` for invalid input, `EditError::InProgress`
    /// if the account already has an update running, `EditError::NotFound` if
    /// the account has no profile, and `EditError::UploadFailed` if the photo
    /// could not be stored.
    #[instrument(skip(self, user, form), fields(account = %user.id))]
    pub async fn update(&self, user: &CurrentUser, form: ProfileForm) -> Result<Profile, EditError> {
        let mut patch = form.to_patch()?;

        let Some(_permit) = self.guard.try_acquire(user.id) else {
            tracing::warn!("Profile update rejected: another update in progress");
            return Err(EditError::InProgress);
        };

        let current = self.load(user.id).await?;

        if let Some(file) = form.photo {
            patch.photo = Some(self.media.replace_photo(user.id, file).await?);
        }

        if patch.is_empty() {
            return Ok(current);
        }

        let profile = self.profiles.update(user.id, patch).await?;
        tracing::info!(code = %profile.code, "Profile updated");
        Ok(profile)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_blank_name_is_rejected() {
        let form = ProfileForm {
            display_name: Some("   ".to_string()),
            ..ProfileForm::default()
        };
        assert!(matches!(form.to_patch(), Err(EditError::Validation(_))));
    }

    #[test]
    fn test_missing_name_is_untouched() {
        let patch = ProfileForm::default().to_patch().unwrap();
        assert!(patch.is_empty());
    }

    #[test]
    fn test_blank_optionals_clear_fields() {
        let form = ProfileForm {
            age: Some(String::new()),
            bio: Some("  ".to_string()),
            instagram: Some("@".to_string()),
            ..ProfileForm::default()
        };
        let patch = form.to_patch().unwrap();
        assert_eq!(patch.age, Some(None));
        assert_eq!(patch.bio, Some(None));
        assert_eq!(patch.instagram, Some(None));
        assert_eq!(patch.tiktok, None);
    }

    #[test]
    fn test_age_validation() {
        let form = ProfileForm {
            age: Some("-3".to_string()),
            ..ProfileForm::default()
        };
        assert!(matches!(form.to_patch(), Err(EditError::Validation(_))));

        let form = ProfileForm {
            age: Some("21".to_string()),
            ..ProfileForm::default()
        };
        assert_eq!(form.to_patch().unwrap().age.unwrap().unwrap().years(), 21);
    }

    #[test]
    fn test_length_limits() {
        let form = ProfileForm {
            bio: Some("b".repeat(MAX_BIO_CHARS + 1)),
            ..ProfileForm::default()
        };
        assert!(form.to_patch().is_err());

        let form = ProfileForm {
            display_name: Some("n".repeat(MAX_DISPLAY_NAME_CHARS + 1)),
            ..ProfileForm::default()
        };
        assert!(form.to_patch().is_err());
    }

    #[test]
    fn test_media_errors_map_to_edit_errors() {
        assert!(matches!(
            EditError::from(MediaError::Empty),
            EditError::Validation(_)
        ));
        assert!(matches!(
            EditError::from(RepositoryError::NotFound),
            EditError::NotFound
        ));
    }
}
