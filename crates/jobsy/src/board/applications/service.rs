use std::sync::Arc;

use chrono::Duration;

use super::domain::{
    Applicant, ApplicationId, ApplicationStatus, ApplicationView, JobApplication, NewApplication,
    RejectionReason, RejectionReasonId, ResumeLink, ReviewUpdate, SavedJob, SavedJobId,
    SavedJobView, STANDARD_REJECTION_REASONS,
};
use super::views::{application_views, saved_job_views};
use crate::board::accounts::access::{active_employer, require_employer, require_identity};
use crate::board::accounts::{EmployerRecord, IdentityId};
use crate::board::clock::Clock;
use crate::board::error::{BoardError, Denial, Entity, ValidationError};
use crate::board::listings::{JobListing, ListingId};
use crate::board::repository::{
    ApplicationFilter, BoardRepository, BoardTransaction, RepositoryError, RowScope,
};
use crate::board::storage::{
    store_confirmed, BlobStorage, DocumentKind, StorageError, StoredRef, Upload, Visibility,
};
use crate::config::StorageSettings;

/// Applications, employer review and saved jobs.
pub struct ApplicationService<R> {
    repository: Arc<R>,
    storage: Arc<dyn BlobStorage>,
    clock: Arc<dyn Clock>,
    settings: StorageSettings,
}

impl<R> ApplicationService<R>
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

    /// Stores a resume privately; the returned reference is what an
    /// application points at.
    pub fn upload_resume(&self, upload: Upload) -> Result<StoredRef, BoardError> {
        DocumentKind::Resume.validate(&upload)?;
        let path = format!(
            "{}/{}",
            DocumentKind::Resume.folder(),
            upload.sanitized_name()
        );
        let stored = store_confirmed(self.storage.as_ref(), &path, &upload, Visibility::Private)?;
        tracing::debug!(key = %stored.key, "resume stored");
        Ok(stored)
    }

    /// Creates an application, copying the job title and company so the
    /// row outlives its listing. The resume must come from [`Self::upload_resume`]
    /// and may back a single application only.
    pub fn apply(&self, new: NewApplication) -> Result<JobApplication, BoardError> {
        let NewApplication {
            listing,
            job_title,
            job_company,
            applicant,
            cover_letter,
            resume,
        } = new;

        let applicant = applicant.resolve()?;
        let cover_letter = cover_letter.trim().to_string();
        if cover_letter.is_empty() {
            return Err(ValidationError::Required("cover letter").into());
        }
        if !DocumentKind::Resume.holds(&resume, Visibility::Private) {
            tracing::warn!(key = %resume.key, "application names a non-resume blob");
            return Err(ValidationError::NotAResume(resume.key).into());
        }
        if !self.storage.exists(&resume)? {
            return Err(StorageError::Missing(resume.key).into());
        }

        let now = self.clock.now();
        let application = self.repository.transaction(|tx| {
            if let Applicant::Account { identity } = &applicant {
                require_identity(tx, *identity)?;
            }

            let (job_title, job_company) = match listing {
                Some(id) => {
                    let row = tx
                        .listing(id, RowScope::Active)?
                        .filter(|row| row.is_live(now))
                        .ok_or(BoardError::NotFound(Entity::Listing))?;
                    (row.title, row.company)
                }
                None => match (filled(job_title), filled(job_company)) {
                    (Some(title), Some(company)) => (title, company),
                    _ => return Err(ValidationError::MissingSnapshot.into()),
                },
            };

            if tx.application_with_resume(&resume.key)?.is_some() {
                return Err(ValidationError::ResumeInUse.into());
            }

            if let (Some(identity), Some(id)) = (applicant.identity(), listing) {
                let duplicate = tx
                    .applications(ApplicationFilter::Applicant(identity))?
                    .iter()
                    .any(|existing| existing.listing == Some(id));
                if duplicate {
                    return Err(ValidationError::AlreadyApplied.into());
                }
            }

            let application = JobApplication {
                id: ApplicationId(tx.next_id()),
                listing,
                job_title,
                job_company,
                applicant,
                cover_letter,
                resume,
                status: ApplicationStatus::InReview,
                is_read: false,
                rejection_reasons: Default::default(),
                feedback: String::new(),
                applied_at: now,
                updated_at: now,
            };
            tx.insert_application(application.clone())?;
            Ok::<_, BoardError>(application)
        })?;

        tracing::info!(
            application = %application.id,
            listing = ?application.listing,
            guest = application.applicant.identity().is_none(),
            "application received"
        );
        Ok(application)
    }

    /// Signed link to an application's resume, for the applicant or the
    /// employer owning the listing.
    pub fn application_resume(
        &self,
        actor: IdentityId,
        id: ApplicationId,
    ) -> Result<ResumeLink, BoardError> {
        let resume = self.repository.transaction(|tx| {
            require_identity(tx, actor)?;
            let employer = active_employer(tx, actor)?;
            let application = tx
                .application(id)?
                .ok_or(BoardError::NotFound(Entity::Application))?;
            if application.applicant.identity() != Some(actor) {
                let employer = employer.ok_or(Denial::NotEmployer)?;
                ensure_reviewer(tx, &employer, &application)?;
            }
            Ok::<_, BoardError>(application.resume)
        })?;

        let ttl = self.settings.signed_url_ttl_secs;
        let url = self.storage.signed_url(&resume, Duration::seconds(ttl))?;
        tracing::debug!(%actor, application = %id, "resume link issued");
        Ok(ResumeLink {
            url,
            expires_in: ttl,
        })
    }

    /// Employer review of an application on one of their listings.
    pub fn review(
        &self,
        actor: IdentityId,
        id: ApplicationId,
        update: ReviewUpdate,
    ) -> Result<JobApplication, BoardError> {
        let now = self.clock.now();
        let application = self.repository.transaction(|tx| {
            let employer = require_employer(tx, actor)?;
            let mut application = tx
                .application(id)?
                .ok_or(BoardError::NotFound(Entity::Application))?;
            ensure_reviewer(tx, &employer, &application)?;

            let ReviewUpdate {
                status,
                is_read,
                rejection_reasons,
                feedback,
            } = update;
            if let Some(reasons) = rejection_reasons {
                let known: Vec<RejectionReasonId> =
                    tx.rejection_reasons()?.into_iter().map(|r| r.id).collect();
                if let Some(unknown) = reasons.iter().find(|id| !known.contains(id)) {
                    return Err(ValidationError::UnknownRejectionReason(*unknown).into());
                }
                application.rejection_reasons = reasons;
            }
            if let Some(status) = status {
                application.status = status;
            }
            if let Some(is_read) = is_read {
                application.is_read = is_read;
            }
            if let Some(feedback) = feedback {
                application.feedback = feedback;
            }
            application.updated_at = now;
            tx.update_application(application.clone())?;
            Ok::<_, BoardError>(application)
        })?;

        tracing::info!(
            application = %id,
            status = application.status.label(),
            rejected = application.is_rejected(),
            "application reviewed"
        );
        Ok(application)
    }

    pub fn mark_read(
        &self,
        actor: IdentityId,
        id: ApplicationId,
    ) -> Result<JobApplication, BoardError> {
        self.review(
            actor,
            id,
            ReviewUpdate {
                is_read: Some(true),
                ..ReviewUpdate::default()
            },
        )
    }

    /// Applications to any listing of the acting employer, newest first.
    pub fn employer_applications(
        &self,
        actor: IdentityId,
    ) -> Result<Vec<ApplicationView>, BoardError> {
        self.repository.transaction(|tx| {
            let employer = require_employer(tx, actor)?;
            let applications = tx.applications(ApplicationFilter::Employer(employer.id))?;
            Ok(application_views(tx, applications)?)
        })
    }

    /// Applications to one listing owned by the acting employer.
    pub fn listing_applications(
        &self,
        actor: IdentityId,
        listing: ListingId,
    ) -> Result<Vec<ApplicationView>, BoardError> {
        self.repository.transaction(|tx| {
            let employer = require_employer(tx, actor)?;
            let row = tx
                .listing(listing, RowScope::IncludeDeleted)?
                .ok_or(BoardError::NotFound(Entity::Listing))?;
            if row.employer != employer.id {
                return Err(Denial::NotListingOwner.into());
            }
            let applications = tx.applications(ApplicationFilter::Listing(listing))?;
            Ok(application_views(tx, applications)?)
        })
    }

    pub fn my_applications(&self, actor: IdentityId) -> Result<Vec<ApplicationView>, BoardError> {
        self.repository.transaction(|tx| {
            require_identity(tx, actor)?;
            let applications = tx.applications(ApplicationFilter::Applicant(actor))?;
            Ok(application_views(tx, applications)?)
        })
    }

    /// Inserts the standard reasons that are not there yet.
    pub fn seed_rejection_reasons(&self) -> Result<Vec<RejectionReason>, BoardError> {
        let (reasons, inserted) = self.repository.transaction(|tx| {
            let mut inserted = 0usize;
            for name in STANDARD_REJECTION_REASONS {
                let reason = RejectionReason {
                    id: RejectionReasonId(tx.next_id()),
                    name: name.to_string(),
                };
                match tx.insert_rejection_reason(reason) {
                    Ok(()) => inserted += 1,
                    Err(RepositoryError::Conflict) => {}
                    Err(other) => return Err(other),
                }
            }
            Ok((tx.rejection_reasons()?, inserted))
        })?;

        if inserted > 0 {
            tracing::info!(inserted, "rejection reasons seeded");
        }
        Ok(reasons)
    }

    pub fn rejection_reasons(&self) -> Result<Vec<RejectionReason>, BoardError> {
        Ok(self
            .repository
            .transaction(|tx| tx.rejection_reasons())?)
    }

    /// Bookmarks a live listing. Saving twice returns the existing bookmark.
    pub fn save_job(&self, actor: IdentityId, listing: ListingId) -> Result<SavedJob, BoardError> {
        let now = self.clock.now();
        self.repository.transaction(|tx| {
            require_identity(tx, actor)?;
            let row = tx
                .listing(listing, RowScope::Active)?
                .filter(|row| row.is_live(now))
                .ok_or(BoardError::NotFound(Entity::Listing))?;
            let saved = SavedJob {
                id: SavedJobId(tx.next_id()),
                user: actor,
                listing: Some(listing),
                job_title: row.title,
                job_company: row.company,
                saved_at: now,
            };
            match tx.insert_saved_job(saved.clone()) {
                Ok(()) => {
                    tracing::debug!(%actor, %listing, "job saved");
                    Ok(saved)
                }
                Err(RepositoryError::Conflict) => tx
                    .saved_job(actor, listing)?
                    .ok_or(BoardError::NotFound(Entity::SavedJob)),
                Err(other) => Err(other.into()),
            }
        })
    }

    /// Removes a bookmark; returns whether one existed.
    pub fn remove_saved_job(
        &self,
        actor: IdentityId,
        listing: ListingId,
    ) -> Result<bool, BoardError> {
        self.repository.transaction(|tx| {
            require_identity(tx, actor)?;
            match tx.saved_job(actor, listing)? {
                Some(saved) => {
                    tx.remove_saved_job(saved.id)?;
                    Ok(true)
                }
                None => Ok(false),
            }
        })
    }

    pub fn saved_jobs(&self, actor: IdentityId) -> Result<Vec<SavedJobView>, BoardError> {
        let now = self.clock.now();
        self.repository.transaction(|tx| {
            require_identity(tx, actor)?;
            let saved = tx.saved_jobs(actor)?;
            Ok(saved_job_views(tx, saved, now)?)
        })
    }
}

/// The application's listing row must still exist and belong to `employer`.
fn ensure_reviewer(
    tx: &dyn BoardTransaction,
    employer: &EmployerRecord,
    application: &JobApplication,
) -> Result<(), BoardError> {
    let owner = match application.listing {
        Some(id) => tx
            .listing(id, RowScope::IncludeDeleted)?
            .map(|listing: JobListing| listing.employer),
        None => None,
    };
    if owner == Some(employer.id) {
        Ok(())
    } else {
        tracing::warn!(application = %application.id, employer = %employer.id, "review by non-owner");
        Err(Denial::NotListingOwner.into())
    }
}

fn filled(value: Option<String>) -> Option<String> {
    value
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}
