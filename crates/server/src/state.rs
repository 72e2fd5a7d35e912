//! Application state shared across handlers.

use std::sync::Arc;

use crate::db::ProfileStore;
use crate::media::{EncodeError, MediaSettings, MediaUploadCoordinator};
use crate::services::{AuthProvider, ClaimLedger, ProfileBinder, ProfileEditor};
use crate::storage::ObjectStore;

/// Application state shared across all handlers.
///
/// This struct is cheaply cloneable via `Arc`. Collaborators are trait
/// objects so the same router runs against `PostgreSQL` and object storage
/// in production and in-memory implementations in tests.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    auth: Arc<dyn AuthProvider>,
    profiles: Arc<dyn ProfileStore>,
    ledger: ClaimLedger,
    binder: ProfileBinder,
    editor: ProfileEditor,
}

impl AppState {
    /// Wire the services over the given collaborators.
    ///
    /// # Errors
    ///
    /// Returns an error if the media settings are invalid.
    pub fn new(
        auth: Arc<dyn AuthProvider>,
        profiles: Arc<dyn ProfileStore>,
        objects: Arc<dyn ObjectStore>,
        media: MediaSettings,
    ) -> Result<Self, EncodeError> {
        let ledger = ClaimLedger::new(Arc::clone(&profiles));
        let binder = ProfileBinder::new(Arc::clone(&auth), ledger.clone());
        let coordinator = MediaUploadCoordinator::new(objects, media)?;
        let editor = ProfileEditor::new(Arc::clone(&profiles), coordinator);

        Ok(Self {
            inner: Arc::new(AppStateInner {
                auth,
                profiles,
                ledger,
                binder,
                editor,
            }),
        })
    }

    /// Get the authentication provider.
    #[must_use]
    pub fn auth(&self) -> &dyn AuthProvider {
        self.inner.auth.as_ref()
    }

    /// Get the profile store.
    #[must_use]
    pub fn profiles(&self) -> &dyn ProfileStore {
        self.inner.profiles.as_ref()
    }

    #[must_use]
    pub fn ledger(&self) -> &ClaimLedger {
        &self.inner.ledger
    }

    #[must_use]
    pub fn binder(&self) -> &ProfileBinder {
        &self.inner.binder
    }

    #[must_use]
    pub fn editor(&self) -> &ProfileEditor {
        &self.inner.editor
    }
}
