use std::sync::Arc;

use axum::body::{to_bytes, Body};
use axum::http::{header::AUTHORIZATION, Request, StatusCode};
use axum::response::Response;
use chrono::{DateTime, Duration, TimeZone, Utc};
use serde_json::Value;

use crate::board::accounts::{
    AccountProfile, CompanyUpdate, CredentialError, CredentialHasher, EmployerId, EmployerRecord,
    Identity, IdentityId, RegistrationForm,
};
use crate::board::applications::{
    ApplicantInput, ApplicationId, JobApplication, NewApplication, RejectionReason, SavedJob,
    SavedJobId,
};
use crate::board::clock::FixedClock;
use crate::board::listings::{JobListing, ListingDraft, ListingId};
use crate::board::memory::{MemoryBlobStorage, MemoryStore};
use crate::board::repository::{
    ApplicationFilter, BoardRepository, BoardTransaction, ListingFilter, RepositoryError, RowScope,
};
use crate::board::session::SessionSigner;
use crate::board::storage::{StoredRef, Upload};
use crate::board::{BoardDeps, JobBoard};
use crate::config::{AdminBootstrap, BoardSettings, StorageSettings};

pub(super) fn start() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 3, 1, 9, 0, 0)
        .single()
        .expect("valid time")
}

/// Reversible stand-in for the Argon2 hasher; keeps the tests fast.
#[derive(Debug, Default)]
pub(super) struct PlainHasher;

impl CredentialHasher for PlainHasher {
    fn hash(&self, password: &str) -> Result<String, CredentialError> {
        Ok(format!("plain:{password}"))
    }

    fn verify(&self, password: &str, hash: &str) -> Result<bool, CredentialError> {
        Ok(hash.strip_prefix("plain:") == Some(password))
    }
}

pub(super) struct Harness<R = MemoryStore> {
    pub board: Arc<JobBoard<R>>,
    pub store: Arc<R>,
    pub blobs: Arc<MemoryBlobStorage>,
    pub clock: Arc<FixedClock>,
}

pub(super) fn harness() -> Harness {
    harness_over(MemoryStore::new(), StorageSettings::default())
}

pub(super) fn harness_with_storage(storage: StorageSettings) -> Harness {
    harness_over(MemoryStore::new(), storage)
}

pub(super) fn harness_over<R>(store: R, storage: StorageSettings) -> Harness<R>
where
    R: BoardRepository + 'static,
{
    let store = Arc::new(store);
    let blobs = Arc::new(MemoryBlobStorage::new(
        storage.media_base_url.clone(),
        storage.signing_secret.clone(),
    ));
    let clock = Arc::new(FixedClock::new(start()));
    let board = JobBoard::new(
        BoardDeps {
            repository: Arc::clone(&store),
            storage: blobs.clone(),
            clock: clock.clone(),
            hasher: Arc::new(PlainHasher),
        },
        BoardSettings::default(),
        storage,
    );
    Harness {
        board: Arc::new(board),
        store,
        blobs,
        clock,
    }
}

pub(super) fn form(email: &str, account_type: Option<&str>) -> RegistrationForm {
    RegistrationForm {
        email: email.to_string(),
        display_name: email.split('@').next().unwrap_or(email).to_string(),
        password: "pass1234".to_string(),
        account_type: account_type.map(str::to_string),
    }
}

pub(super) fn draft(title: &str, category: &str) -> ListingDraft {
    ListingDraft {
        title: title.to_string(),
        description: format!("{title} wanted"),
        category: category.to_string(),
        location: "Tallinn".to_string(),
        salary_min: Some(2500),
        salary_max: Some(4000),
        ..ListingDraft::default()
    }
}

impl<R> Harness<R>
where
    R: BoardRepository + 'static,
{
    pub fn candidate(&self, email: &str) -> IdentityId {
        self.board
            .accounts
            .register(form(email, None))
            .expect("candidate registers")
            .identity
            .id
    }

    pub fn employer(&self, email: &str, company: &str) -> IdentityId {
        let id = self
            .board
            .accounts
            .register(form(email, Some("employer")))
            .expect("employer registers")
            .identity
            .id;
        self.board
            .accounts
            .update_company(
                id,
                CompanyUpdate {
                    company_name: Some(company.to_string()),
                    ..CompanyUpdate::default()
                },
            )
            .expect("company named");
        id
    }

    pub fn admin(&self) -> IdentityId {
        self.board
            .accounts
            .bootstrap_admin(&AdminBootstrap {
                username: "admin".to_string(),
                email: "admin@example.com".to_string(),
                password: Some("admin-pass".to_string()),
            })
            .expect("bootstrap succeeds")
            .expect("admin configured")
    }

    pub fn live_listing(&self, employer: IdentityId, admin: IdentityId, title: &str) -> JobListing {
        let listing = self
            .board
            .listings
            .submit(employer, draft(title, "Engineering"))
            .expect("listing submitted");
        self.board
            .listings
            .approve(admin, listing.id)
            .expect("listing approved")
    }

    pub fn resume(&self) -> StoredRef {
        self.board
            .applications
            .upload_resume(Upload::new("resume.pdf", b"%PDF-1.7".to_vec()))
            .expect("resume stored")
    }

    pub fn apply_as(&self, identity: IdentityId, listing: ListingId) -> JobApplication {
        self.board
            .applications
            .apply(NewApplication {
                listing: Some(listing),
                job_title: None,
                job_company: None,
                applicant: ApplicantInput::account(identity),
                cover_letter: "I would love to join.".to_string(),
                resume: self.resume(),
            })
            .expect("application accepted")
    }

    pub fn employer_records(&self, profile: IdentityId) -> usize {
        self.store
            .transaction(|tx| {
                tx.employer_for_profile(profile, RowScope::IncludeDeleted)
                    .map(|record| usize::from(record.is_some()))
            })
            .expect("store readable")
    }

    pub fn listing_row(&self, id: ListingId) -> Option<JobListing> {
        self.store
            .transaction(|tx| tx.listing(id, RowScope::IncludeDeleted))
            .expect("store readable")
    }
}

pub(super) fn get(uri: &str, identity: Option<IdentityId>) -> Request<Body> {
    with_identity(Request::get(uri), identity)
        .body(Body::empty())
        .expect("request builds")
}

pub(super) fn send_json(
    method: &str,
    uri: &str,
    identity: Option<IdentityId>,
    payload: &Value,
) -> Request<Body> {
    with_identity(Request::builder().method(method).uri(uri), identity)
        .header(axum::http::header::CONTENT_TYPE, "application/json")
        .body(Body::from(payload.to_string()))
        .expect("request builds")
}

pub(super) fn send_bytes(
    method: &str,
    uri: &str,
    identity: Option<IdentityId>,
    bytes: &[u8],
) -> Request<Body> {
    with_identity(Request::builder().method(method).uri(uri), identity)
        .body(Body::from(bytes.to_vec()))
        .expect("request builds")
}

/// `Authorization` value for `identity`, signed with the harness's default secret.
pub(super) fn bearer(identity: IdentityId) -> String {
    let signer = SessionSigner::new(
        StorageSettings::default().signing_secret,
        Duration::days(365),
    );
    let session = signer.issue(identity, start()).expect("session issued");
    format!("Bearer {}", session.token)
}

fn with_identity(
    builder: axum::http::request::Builder,
    identity: Option<IdentityId>,
) -> axum::http::request::Builder {
    match identity {
        Some(id) => builder.header(AUTHORIZATION, bearer(id)),
        None => builder,
    }
}

pub(super) async fn json_body(response: Response) -> (StatusCode, Value) {
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body readable");
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).expect("json body")
    };
    (status, value)
}

/// Store whose employer inserts fail, for exercising rollback of the
/// role cascade.
#[derive(Default)]
pub(super) struct EmployerInsertFails {
    inner: MemoryStore,
}

impl EmployerInsertFails {
    pub fn over(inner: MemoryStore) -> Self {
        Self { inner }
    }
}

impl BoardRepository for EmployerInsertFails {
    fn transaction<T, E, F>(&self, work: F) -> Result<T, E>
    where
        F: FnOnce(&mut dyn BoardTransaction) -> Result<T, E>,
        E: From<RepositoryError>,
    {
        self.inner.transaction(|tx| work(&mut FailingTx { inner: tx }))
    }
}

struct FailingTx<'a> {
    inner: &'a mut dyn BoardTransaction,
}

impl BoardTransaction for FailingTx<'_> {
    fn next_id(&mut self) -> u64 {
        self.inner.next_id()
    }
    fn insert_identity(&mut self, identity: Identity) -> Result<(), RepositoryError> {
        self.inner.insert_identity(identity)
    }
    fn identity(&self, id: IdentityId) -> Result<Option<Identity>, RepositoryError> {
        self.inner.identity(id)
    }
    fn identity_by_login(&self, login: &str) -> Result<Option<Identity>, RepositoryError> {
        self.inner.identity_by_login(login)
    }
    fn update_identity(&mut self, identity: Identity) -> Result<(), RepositoryError> {
        self.inner.update_identity(identity)
    }
    fn insert_profile(&mut self, profile: AccountProfile) -> Result<(), RepositoryError> {
        self.inner.insert_profile(profile)
    }
    fn profile(&self, identity: IdentityId) -> Result<Option<AccountProfile>, RepositoryError> {
        self.inner.profile(identity)
    }
    fn update_profile(&mut self, profile: AccountProfile) -> Result<(), RepositoryError> {
        self.inner.update_profile(profile)
    }
    fn insert_employer(&mut self, _employer: EmployerRecord) -> Result<(), RepositoryError> {
        Err(RepositoryError::Unavailable("employer table offline".to_string()))
    }
    fn employer(
        &self,
        id: EmployerId,
        scope: RowScope,
    ) -> Result<Option<EmployerRecord>, RepositoryError> {
        self.inner.employer(id, scope)
    }
    fn employer_for_profile(
        &self,
        profile: IdentityId,
        scope: RowScope,
    ) -> Result<Option<EmployerRecord>, RepositoryError> {
        self.inner.employer_for_profile(profile, scope)
    }
    fn update_employer(&mut self, employer: EmployerRecord) -> Result<(), RepositoryError> {
        self.inner.update_employer(employer)
    }
    fn insert_listing(&mut self, listing: JobListing) -> Result<(), RepositoryError> {
        self.inner.insert_listing(listing)
    }
    fn listing(
        &self,
        id: ListingId,
        scope: RowScope,
    ) -> Result<Option<JobListing>, RepositoryError> {
        self.inner.listing(id, scope)
    }
    fn listings(&self, filter: ListingFilter) -> Result<Vec<JobListing>, RepositoryError> {
        self.inner.listings(filter)
    }
    fn update_listing(&mut self, listing: JobListing) -> Result<(), RepositoryError> {
        self.inner.update_listing(listing)
    }
    fn remove_listing(&mut self, id: ListingId) -> Result<(), RepositoryError> {
        self.inner.remove_listing(id)
    }
    fn insert_application(&mut self, application: JobApplication) -> Result<(), RepositoryError> {
        self.inner.insert_application(application)
    }
    fn application(&self, id: ApplicationId) -> Result<Option<JobApplication>, RepositoryError> {
        self.inner.application(id)
    }
    fn applications(
        &self,
        filter: ApplicationFilter,
    ) -> Result<Vec<JobApplication>, RepositoryError> {
        self.inner.applications(filter)
    }
    fn application_with_resume(
        &self,
        key: &str,
    ) -> Result<Option<JobApplication>, RepositoryError> {
        self.inner.application_with_resume(key)
    }
    fn update_application(&mut self, application: JobApplication) -> Result<(), RepositoryError> {
        self.inner.update_application(application)
    }
    fn insert_saved_job(&mut self, saved: SavedJob) -> Result<(), RepositoryError> {
        self.inner.insert_saved_job(saved)
    }
    fn saved_job(
        &self,
        user: IdentityId,
        listing: ListingId,
    ) -> Result<Option<SavedJob>, RepositoryError> {
        self.inner.saved_job(user, listing)
    }
    fn saved_jobs(&self, user: IdentityId) -> Result<Vec<SavedJob>, RepositoryError> {
        self.inner.saved_jobs(user)
    }
    fn remove_saved_job(&mut self, id: SavedJobId) -> Result<(), RepositoryError> {
        self.inner.remove_saved_job(id)
    }
    fn insert_rejection_reason(&mut self, reason: RejectionReason) -> Result<(), RepositoryError> {
        self.inner.insert_rejection_reason(reason)
    }
    fn rejection_reasons(&self) -> Result<Vec<RejectionReason>, RepositoryError> {
        self.inner.rejection_reasons()
    }
}
