//! Persistence boundary. Services express every read and write as a unit of
//! work run through [`BoardRepository::transaction`]; the store enforces the
//! unique constraints and reports violations as [`RepositoryError::Conflict`].

use super::accounts::{AccountProfile, EmployerId, EmployerRecord, Identity, IdentityId};
use super::applications::{
    ApplicationId, JobApplication, RejectionReason, SavedJob, SavedJobId,
};
use super::listings::{JobListing, ListingId};

/// Whether soft-deleted rows take part in a read.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum RowScope {
    #[default]
    Active,
    IncludeDeleted,
}

impl RowScope {
    pub fn admits(self, deleted: bool) -> bool {
        match self {
            RowScope::Active => !deleted,
            RowScope::IncludeDeleted => true,
        }
    }
}

/// Listing selection. Results are ordered newest first.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ListingFilter {
    pub employer: Option<EmployerId>,
    pub scope: RowScope,
}

/// Application selection. Results are ordered newest first.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApplicationFilter {
    Listing(ListingId),
    Applicant(IdentityId),
    /// Applications whose listing row (soft-deleted or not) belongs to the employer.
    Employer(EmployerId),
}

/// Error enumeration for repository failures.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RepositoryError {
    #[error("record already exists")]
    Conflict,
    #[error("record not found")]
    NotFound,
    #[error("repository unavailable: {0}")]
    Unavailable(String),
}

/// Row-level operations available inside a transaction.
pub trait BoardTransaction {
    fn next_id(&mut self) -> u64;

    fn insert_identity(&mut self, identity: Identity) -> Result<(), RepositoryError>;
    fn identity(&self, id: IdentityId) -> Result<Option<Identity>, RepositoryError>;
    /// Looks an identity up by username or email.
    fn identity_by_login(&self, login: &str) -> Result<Option<Identity>, RepositoryError>;
    fn update_identity(&mut self, identity: Identity) -> Result<(), RepositoryError>;

    fn insert_profile(&mut self, profile: AccountProfile) -> Result<(), RepositoryError>;
    fn profile(&self, identity: IdentityId) -> Result<Option<AccountProfile>, RepositoryError>;
    fn update_profile(&mut self, profile: AccountProfile) -> Result<(), RepositoryError>;

    fn insert_employer(&mut self, employer: EmployerRecord) -> Result<(), RepositoryError>;
    fn employer(
        &self,
        id: EmployerId,
        scope: RowScope,
    ) -> Result<Option<EmployerRecord>, RepositoryError>;
    fn employer_for_profile(
        &self,
        profile: IdentityId,
        scope: RowScope,
    ) -> Result<Option<EmployerRecord>, RepositoryError>;
    fn update_employer(&mut self, employer: EmployerRecord) -> Result<(), RepositoryError>;

    fn insert_listing(&mut self, listing: JobListing) -> Result<(), RepositoryError>;
    fn listing(
        &self,
        id: ListingId,
        scope: RowScope,
    ) -> Result<Option<JobListing>, RepositoryError>;
    fn listings(&self, filter: ListingFilter) -> Result<Vec<JobListing>, RepositoryError>;
    fn update_listing(&mut self, listing: JobListing) -> Result<(), RepositoryError>;
    /// Removes the row and clears the reference held by applications and saved jobs.
    fn remove_listing(&mut self, id: ListingId) -> Result<(), RepositoryError>;

    fn insert_application(&mut self, application: JobApplication)
        -> Result<(), RepositoryError>;
    fn application(&self, id: ApplicationId) -> Result<Option<JobApplication>, RepositoryError>;
    fn applications(
        &self,
        filter: ApplicationFilter,
    ) -> Result<Vec<JobApplication>, RepositoryError>;
    /// The application whose resume is stored under `key`, if any.
    fn application_with_resume(&self, key: &str)
        -> Result<Option<JobApplication>, RepositoryError>;
    fn update_application(&mut self, application: JobApplication)
        -> Result<(), RepositoryError>;

    /// Unique on `(user, listing)`.
    fn insert_saved_job(&mut self, saved: SavedJob) -> Result<(), RepositoryError>;
    fn saved_job(
        &self,
        user: IdentityId,
        listing: ListingId,
    ) -> Result<Option<SavedJob>, RepositoryError>;
    fn saved_jobs(&self, user: IdentityId) -> Result<Vec<SavedJob>, RepositoryError>;
    fn remove_saved_job(&mut self, id: SavedJobId) -> Result<(), RepositoryError>;

    /// Unique on `name`.
    fn insert_rejection_reason(&mut self, reason: RejectionReason)
        -> Result<(), RepositoryError>;
    fn rejection_reasons(&self) -> Result<Vec<RejectionReason>, RepositoryError>;
}

/// Storage abstraction so the services can be exercised in isolation.
pub trait BoardRepository: Send + Sync {
    /// Runs `work` atomically: either every write it made is committed or,
    /// when it returns an error, none is.
    fn transaction<T, E, F>(&self, work: F) -> Result<T, E>
    where
        F: FnOnce(&mut dyn BoardTransaction) -> Result<T, E>,
        E: From<RepositoryError>;
}
