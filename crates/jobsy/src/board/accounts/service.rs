use std::sync::Arc;

use chrono::{DateTime, Utc};

use super::access::{
    active_employer, apply_role, ensure_profile, require_admin, require_employer, require_identity,
};
use super::credentials::CredentialHasher;
use super::domain::{
    is_valid_email, AccountProfile, AccountView, CompanyUpdate, EmployerId, EmployerRecord,
    Identity, IdentityId, RegistrationForm, Role,
};
use crate::board::clock::Clock;
use crate::board::error::{BoardError, Denial, Entity, ValidationError};
use crate::board::repository::{
    BoardRepository, BoardTransaction, ListingFilter, RepositoryError, RowScope,
};
use crate::board::session::{Session, SessionSigner};
use crate::board::storage::{discard, store_confirmed, BlobStorage, DocumentKind, Upload, Visibility};
use crate::config::AdminBootstrap;

/// Shortest password accepted at registration.
pub const MIN_PASSWORD_LEN: usize = 4;

/// Identity, profile and employer lifecycle.
pub struct AccountService<R> {
    repository: Arc<R>,
    storage: Arc<dyn BlobStorage>,
    hasher: Arc<dyn CredentialHasher>,
    clock: Arc<dyn Clock>,
    sessions: SessionSigner,
}

impl<R> AccountService<R>
where
    R: BoardRepository + 'static,
{
    pub fn new(
        repository: Arc<R>,
        storage: Arc<dyn BlobStorage>,
        hasher: Arc<dyn CredentialHasher>,
        clock: Arc<dyn Clock>,
        sessions: SessionSigner,
    ) -> Self {
        Self {
            repository,
            storage,
            hasher,
            clock,
            sessions,
        }
    }

    /// Creates the identity and its profile in one transaction. Employer
    /// sign-ups get their company record through the role cascade.
    pub fn register(&self, form: RegistrationForm) -> Result<AccountView, BoardError> {
        let email = form.email.trim().to_ascii_lowercase();
        if !is_valid_email(&email) {
            return Err(ValidationError::InvalidEmail(email).into());
        }
        if form.password.chars().count() < MIN_PASSWORD_LEN {
            return Err(ValidationError::PasswordTooShort {
                min: MIN_PASSWORD_LEN,
            }
            .into());
        }
        let role = match form.account_type.as_deref() {
            None | Some("") => Role::Candidate,
            Some(raw) => raw.parse::<Role>()?,
        };
        if role == Role::Admin {
            return Err(Denial::AdminOnly.into());
        }

        let credential_hash = self.hasher.hash(&form.password)?;
        let display_name = match form.display_name.trim() {
            "" => email.clone(),
            name => name.to_string(),
        };
        let now = self.clock.now();

        let view = self.repository.transaction(|tx| {
            if tx.identity_by_login(&email)?.is_some() {
                return Err(ValidationError::DuplicateEmail.into());
            }
            let identity = Identity {
                id: IdentityId(tx.next_id()),
                username: email.clone(),
                email: email.clone(),
                display_name,
                credential_hash,
                is_staff: false,
                is_superuser: false,
                created_at: now,
            };
            tx.insert_identity(identity.clone())
                .map_err(|err| match err {
                    RepositoryError::Conflict => BoardError::from(ValidationError::DuplicateEmail),
                    other => other.into(),
                })?;

            let (profile, _) = ensure_profile(tx, identity.id, Role::Candidate, now)?;
            let (profile, employer) = if role == Role::Candidate {
                (profile, None)
            } else {
                apply_role(tx, profile, role, now)?
            };
            Ok::<_, BoardError>(AccountView {
                identity,
                profile,
                employer,
            })
        })?;

        tracing::info!(identity = %view.identity.id, role = %view.profile.role, "account registered");
        Ok(view)
    }

    /// Verifies a login (username or email) and password.
    pub fn authenticate(&self, login: &str, password: &str) -> Result<Identity, BoardError> {
        let login = login.trim();
        let identity = self
            .repository
            .transaction(|tx| tx.identity_by_login(login))?;

        let Some(identity) = identity else {
            tracing::warn!(login, "login for unknown account");
            return Err(BoardError::Unauthenticated);
        };
        if self.hasher.verify(password, &identity.credential_hash)? {
            Ok(identity)
        } else {
            tracing::warn!(identity = %identity.id, "login with wrong password");
            Err(BoardError::Unauthenticated)
        }
    }

    /// Checks the credentials and issues a signed session token.
    pub fn login(&self, login: &str, password: &str) -> Result<Session, BoardError> {
        let identity = self.authenticate(login, password)?;
        let session = self.sessions.issue(identity.id, self.clock.now())?;
        tracing::info!(identity = %identity.id, "session issued");
        Ok(session)
    }

    /// Identity behind a session token. The identity must still exist.
    pub fn resolve_session(&self, token: &str) -> Result<IdentityId, BoardError> {
        let identity = self.sessions.verify(token, self.clock.now())?;
        self.repository
            .transaction(|tx| require_identity(tx, identity))?;
        Ok(identity)
    }

    /// Idempotent insert-or-fetch of a candidate profile for `identity`.
    pub fn ensure_account_profile(&self, identity: IdentityId) -> Result<AccountProfile, BoardError> {
        let now = self.clock.now();
        self.repository.transaction(|tx| {
            if tx.identity(identity)?.is_none() {
                return Err(BoardError::NotFound(Entity::Identity));
            }
            let (profile, created) = ensure_profile(tx, identity, Role::Candidate, now)?;
            if created {
                tracing::info!(%identity, "account profile created");
            }
            Ok(profile)
        })
    }

    /// Persists a role change, running the employer cascade in the same
    /// transaction.
    pub fn set_role(&self, identity: IdentityId, role: &str) -> Result<AccountView, BoardError> {
        let role = role.parse::<Role>()?;
        let now = self.clock.now();
        self.repository
            .transaction(|tx| change_role(tx, identity, role, now))
    }

    /// Administrator role assignment.
    pub fn assign_role(
        &self,
        actor: IdentityId,
        target: IdentityId,
        role: &str,
    ) -> Result<AccountView, BoardError> {
        let role = role.parse::<Role>()?;
        let now = self.clock.now();
        self.repository.transaction(|tx| {
            require_admin(tx, actor)?;
            change_role(tx, target, role, now)
        })
    }

    /// Assigns `role` to every target or to none of them.
    pub fn assign_role_bulk(
        &self,
        actor: IdentityId,
        targets: &[IdentityId],
        role: &str,
    ) -> Result<Vec<AccountView>, BoardError> {
        let role = role.parse::<Role>()?;
        let now = self.clock.now();
        let views = self.repository.transaction(|tx| {
            require_admin(tx, actor)?;
            targets
                .iter()
                .map(|target| change_role(tx, *target, role, now))
                .collect::<Result<Vec<_>, BoardError>>()
        })?;
        tracing::info!(%actor, %role, count = views.len(), "bulk role assignment");
        Ok(views)
    }

    /// Get-or-create of the configured administrator. The password is only
    /// applied when the identity is created; without one the step is skipped.
    pub fn bootstrap_admin(
        &self,
        settings: &AdminBootstrap,
    ) -> Result<Option<IdentityId>, BoardError> {
        let Some(password) = settings.password.as_deref() else {
            tracing::warn!(
                username = %settings.username,
                "no administrator password configured; skipping admin bootstrap"
            );
            return Ok(None);
        };

        let credential_hash = self.hasher.hash(password)?;
        let now = self.clock.now();
        let (id, created) = self.repository.transaction(|tx| {
            let (mut identity, created) = match tx.identity_by_login(&settings.username)? {
                Some(existing) => (existing, false),
                None => {
                    let identity = Identity {
                        id: IdentityId(tx.next_id()),
                        username: settings.username.clone(),
                        email: settings.email.clone(),
                        display_name: settings.username.clone(),
                        credential_hash,
                        is_staff: true,
                        is_superuser: true,
                        created_at: now,
                    };
                    tx.insert_identity(identity.clone())?;
                    (identity, true)
                }
            };
            if !identity.is_staff || !identity.is_superuser {
                identity.is_staff = true;
                identity.is_superuser = true;
                tx.update_identity(identity.clone())?;
            }

            let (profile, _) = ensure_profile(tx, identity.id, Role::Admin, now)?;
            if profile.role != Role::Admin {
                apply_role(tx, profile, Role::Admin, now)?;
            }
            Ok::<_, BoardError>((identity.id, created))
        })?;

        if created {
            tracing::info!(identity = %id, username = %settings.username, "administrator created");
        } else {
            tracing::info!(identity = %id, username = %settings.username, "administrator ensured");
        }
        Ok(Some(id))
    }

    pub fn account(&self, identity: IdentityId) -> Result<AccountView, BoardError> {
        self.repository.transaction(|tx| account_view(tx, identity))
    }

    /// Employer edit of the company fields.
    pub fn update_company(
        &self,
        actor: IdentityId,
        update: CompanyUpdate,
    ) -> Result<EmployerRecord, BoardError> {
        let website = update
            .company_website
            .as_deref()
            .map(normalize_website)
            .transpose()?;
        let now = self.clock.now();

        let record = self.repository.transaction(|tx| {
            let mut record = require_employer(tx, actor)?;
            let CompanyUpdate {
                company_name,
                company_website: _,
                company_description,
                company_size,
                industry,
                location,
            } = update;

            if let Some(name) = company_name {
                record.company_name = name.trim().to_string();
            }
            if let Some(website) = website {
                record.company_website = website;
            }
            if let Some(description) = company_description {
                record.company_description = description;
            }
            if company_size.is_some() {
                record.company_size = company_size;
            }
            if let Some(industry) = industry {
                record.industry = industry.trim().to_string();
            }
            if let Some(location) = location {
                record.location = location.trim().to_string();
            }
            record.updated_at = now;
            tx.update_employer(record.clone())?;
            Ok::<_, BoardError>(record)
        })?;

        tracing::info!(employer = %record.id, "company details updated");
        Ok(record)
    }

    /// Replaces the company logo. The old blob is removed best-effort.
    pub fn update_company_logo(
        &self,
        actor: IdentityId,
        upload: Upload,
    ) -> Result<EmployerRecord, BoardError> {
        DocumentKind::CompanyLogo.validate(&upload)?;
        let employer = self
            .repository
            .transaction(|tx| require_employer(tx, actor))?;

        let path = format!(
            "{}/{}/{}",
            DocumentKind::CompanyLogo.folder(),
            employer.id,
            upload.sanitized_name()
        );
        let stored = store_confirmed(self.storage.as_ref(), &path, &upload, Visibility::Public)?;
        let now = self.clock.now();

        let outcome = self.repository.transaction(|tx| {
            let mut record = require_employer(tx, actor)?;
            let previous = record.company_logo.replace(stored.clone());
            record.updated_at = now;
            tx.update_employer(record.clone())?;
            Ok::<_, BoardError>((record, previous))
        });

        match outcome {
            Ok((record, previous)) => {
                if let Some(previous) = previous.filter(|previous| *previous != stored) {
                    discard(self.storage.as_ref(), &previous);
                }
                tracing::info!(employer = %record.id, key = %stored.key, "company logo replaced");
                Ok(record)
            }
            Err(error) => {
                discard(self.storage.as_ref(), &stored);
                Err(error)
            }
        }
    }

    /// Replaces the profile picture of `actor`.
    pub fn update_profile_picture(
        &self,
        actor: IdentityId,
        upload: Upload,
    ) -> Result<AccountProfile, BoardError> {
        DocumentKind::ProfilePicture.validate(&upload)?;
        self.repository
            .transaction(|tx| require_identity(tx, actor))?;

        let path = format!(
            "{}/{}/{}",
            DocumentKind::ProfilePicture.folder(),
            actor,
            upload.sanitized_name()
        );
        let stored = store_confirmed(self.storage.as_ref(), &path, &upload, Visibility::Public)?;
        let now = self.clock.now();

        let outcome = self.repository.transaction(|tx| {
            let (mut profile, _) = ensure_profile(tx, actor, Role::Candidate, now)?;
            let previous = profile.profile_picture.replace(stored.clone());
            tx.update_profile(profile.clone())?;
            Ok::<_, BoardError>((profile, previous))
        });

        match outcome {
            Ok((profile, previous)) => {
                if let Some(previous) = previous.filter(|previous| *previous != stored) {
                    discard(self.storage.as_ref(), &previous);
                }
                Ok(profile)
            }
            Err(error) => {
                discard(self.storage.as_ref(), &stored);
                Err(error)
            }
        }
    }

    /// Soft-deletes the employer and its live rows of listings, stamping
    /// all of them with the same instant.
    pub fn delete_employer(
        &self,
        actor: IdentityId,
        employer: EmployerId,
    ) -> Result<EmployerRecord, BoardError> {
        let now = self.clock.now();
        let (record, cascaded) = self.repository.transaction(|tx| {
            require_admin(tx, actor)?;
            let mut record = tx
                .employer(employer, RowScope::Active)?
                .ok_or(BoardError::NotFound(Entity::Employer))?;
            record.deleted_at = Some(now);
            record.updated_at = now;
            tx.update_employer(record.clone())?;

            let listings = tx.listings(ListingFilter {
                employer: Some(employer),
                scope: RowScope::Active,
            })?;
            let cascaded = listings.len();
            for mut listing in listings {
                listing.deleted_at = Some(now);
                tx.update_listing(listing)?;
            }
            Ok::<_, BoardError>((record, cascaded))
        })?;

        tracing::info!(%employer, listings = cascaded, "employer soft-deleted");
        Ok(record)
    }

    /// Reverses [`delete_employer`](Self::delete_employer): only listings
    /// stamped with the employer's deletion instant come back.
    pub fn restore_employer(
        &self,
        actor: IdentityId,
        employer: EmployerId,
    ) -> Result<EmployerRecord, BoardError> {
        let now = self.clock.now();
        let (record, restored) = self.repository.transaction(|tx| {
            require_admin(tx, actor)?;
            let mut record = tx
                .employer(employer, RowScope::IncludeDeleted)?
                .ok_or(BoardError::NotFound(Entity::Employer))?;
            let Some(stamp) = record.deleted_at.take() else {
                return Ok((record, 0));
            };
            record.updated_at = now;
            tx.update_employer(record.clone())?;

            let listings = tx.listings(ListingFilter {
                employer: Some(employer),
                scope: RowScope::IncludeDeleted,
            })?;
            let mut restored = 0;
            for mut listing in listings {
                if listing.deleted_at == Some(stamp) {
                    listing.deleted_at = None;
                    tx.update_listing(listing)?;
                    restored += 1;
                }
            }
            Ok::<_, BoardError>((record, restored))
        })?;

        tracing::info!(%employer, listings = restored, "employer restored");
        Ok(record)
    }

    /// Whether `identity` currently acts as an employer.
    pub fn is_employer(&self, identity: IdentityId) -> Result<bool, BoardError> {
        self.repository
            .transaction(|tx| Ok::<_, BoardError>(active_employer(tx, identity)?.is_some()))
    }
}

fn change_role(
    tx: &mut dyn BoardTransaction,
    identity: IdentityId,
    role: Role,
    now: DateTime<Utc>,
) -> Result<AccountView, BoardError> {
    let identity_row = tx
        .identity(identity)?
        .ok_or(BoardError::NotFound(Entity::Identity))?;
    let (profile, _) = ensure_profile(tx, identity, Role::Candidate, now)?;
    let (profile, employer) = apply_role(tx, profile, role, now)?;
    Ok(AccountView {
        identity: identity_row,
        profile,
        employer,
    })
}

fn account_view(
    tx: &dyn BoardTransaction,
    identity: IdentityId,
) -> Result<AccountView, BoardError> {
    let identity_row = tx
        .identity(identity)?
        .ok_or(BoardError::NotFound(Entity::Identity))?;
    let profile = tx
        .profile(identity)?
        .ok_or(BoardError::NotFound(Entity::Profile))?;
    let employer = tx.employer_for_profile(identity, RowScope::IncludeDeleted)?;
    Ok(AccountView {
        identity: identity_row,
        profile,
        employer,
    })
}

/// Empty clears the website; anything else must be an absolute http(s) URL.
fn normalize_website(raw: &str) -> Result<String, ValidationError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Ok(String::new());
    }
    match url::Url::parse(trimmed) {
        Ok(parsed) if matches!(parsed.scheme(), "http" | "https") && parsed.has_host() => {
            Ok(parsed.to_string())
        }
        _ => Err(ValidationError::InvalidWebsite(trimmed.to_string())),
    }
}
