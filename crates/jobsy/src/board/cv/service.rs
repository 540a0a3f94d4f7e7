use std::sync::Arc;

use chrono::Duration;
use serde::Serialize;

use super::policy::can_access_cv;
use crate::board::accounts::access::{ensure_profile, require_identity};
use crate::board::accounts::{AccountProfile, IdentityId, Role};
use crate::board::clock::Clock;
use crate::board::error::{BoardError, Denial, Entity, ValidationError};
use crate::board::repository::BoardRepository;
use crate::board::storage::{discard, store_confirmed, BlobStorage, DocumentKind, Upload, Visibility};
use crate::config::StorageSettings;

/// How a granted CV read is served.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum CvAccess {
    Direct { url: String },
    Signed { url: String, expires_in: i64 },
}

impl CvAccess {
    pub fn url(&self) -> &str {
        match self {
            CvAccess::Direct { url } | CvAccess::Signed { url, .. } => url,
        }
    }
}

/// Candidate CV upload, preferences and gated reads.
pub struct CvService<R> {
    repository: Arc<R>,
    storage: Arc<dyn BlobStorage>,
    clock: Arc<dyn Clock>,
    settings: StorageSettings,
}

impl<R> CvService<R>
where
    R: BoardRepository + 'static,
{
    pub fn new(
        repository: Arc<R>,
        storage: Arc<dyn BlobStorage>,
        clock: Arc<dyn Clock>,
        settings: StorageSettings,
    ) -> Self {
        Self {
            repository,
            storage,
            clock,
            settings,
        }
    }

    fn cv_visibility(&self) -> Visibility {
        if self.settings.private_cv_storage {
            Visibility::Private
        } else {
            Visibility::Public
        }
    }

    /// Stores a new CV and points the profile at it. The new blob must be
    /// confirmed before the profile changes; the old one is removed
    /// best-effort afterwards.
    pub fn upload_cv(&self, actor: IdentityId, upload: Upload) -> Result<AccountProfile, BoardError> {
        DocumentKind::Cv.validate(&upload)?;
        self.repository
            .transaction(|tx| require_identity(tx, actor))?;

        let path = format!(
            "{}/{}/{}",
            DocumentKind::Cv.folder(),
            actor,
            upload.sanitized_name()
        );
        let stored = store_confirmed(self.storage.as_ref(), &path, &upload, self.cv_visibility())?;
        let now = self.clock.now();

        let outcome = self.repository.transaction(|tx| {
            let (mut profile, _) = ensure_profile(tx, actor, Role::Candidate, now)?;
            let previous = profile.cv.replace(stored.clone());
            tx.update_profile(profile.clone())?;
            Ok::<_, BoardError>((profile, previous))
        });

        match outcome {
            Ok((profile, previous)) => {
                if let Some(previous) = previous.filter(|previous| *previous != stored) {
                    discard(self.storage.as_ref(), &previous);
                }
                tracing::info!(identity = %actor, key = %stored.key, "CV uploaded");
                Ok(profile)
            }
            Err(error) => {
                discard(self.storage.as_ref(), &stored);
                Err(error)
            }
        }
    }

    /// Clears the CV and withdraws both consents.
    pub fn remove_cv(&self, actor: IdentityId) -> Result<AccountProfile, BoardError> {
        let (profile, removed) = self.repository.transaction(|tx| {
            require_identity(tx, actor)?;
            let mut profile = tx
                .profile(actor)?
                .ok_or(BoardError::NotFound(Entity::Profile))?;
            let removed = profile.cv.take();
            profile.cv_consent = false;
            profile.cv_share_with_employers = false;
            tx.update_profile(profile.clone())?;
            Ok::<_, BoardError>((profile, removed))
        })?;

        if let Some(removed) = removed {
            discard(self.storage.as_ref(), &removed);
            tracing::info!(identity = %actor, "CV removed");
        }
        Ok(profile)
    }

    pub fn set_cv_preferences(
        &self,
        actor: IdentityId,
        consent: bool,
        share_with_employers: bool,
    ) -> Result<AccountProfile, BoardError> {
        if share_with_employers && !consent {
            return Err(ValidationError::ShareWithoutConsent.into());
        }
        self.repository.transaction(|tx| {
            require_identity(tx, actor)?;
            let mut profile = tx
                .profile(actor)?
                .ok_or(BoardError::NotFound(Entity::Profile))?;
            profile.cv_consent = consent;
            profile.cv_share_with_employers = share_with_employers;
            tx.update_profile(profile.clone())?;
            Ok(profile)
        })
    }

    /// Gated read of a candidate CV. Authorization is decided before the
    /// candidate is looked up, so a denied caller learns nothing about
    /// whether the candidate or the CV exists.
    pub fn access_cv(
        &self,
        requester: IdentityId,
        candidate: IdentityId,
    ) -> Result<CvAccess, BoardError> {
        let stored = self.repository.transaction(|tx| {
            require_identity(tx, requester)?;
            if !can_access_cv(tx, requester, candidate)? {
                tracing::warn!(%requester, %candidate, "CV access denied");
                return Err(BoardError::Forbidden(Denial::CvNotShared));
            }
            tx.profile(candidate)?
                .and_then(|profile| profile.cv)
                .ok_or(BoardError::NotFound(Entity::Cv))
        })?;

        let access = match stored.visibility {
            Visibility::Public => CvAccess::Direct {
                url: self.storage.url(&stored)?,
            },
            Visibility::Private => {
                let ttl = self.settings.signed_url_ttl_secs;
                CvAccess::Signed {
                    url: self.storage.signed_url(&stored, Duration::seconds(ttl))?,
                    expires_in: ttl,
                }
            }
        };
        tracing::debug!(%requester, %candidate, "CV access granted");
        Ok(access)
    }
}
