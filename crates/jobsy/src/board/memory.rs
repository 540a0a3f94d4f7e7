//! In-process adapters used by the API service, the demo and the tests.

use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex};

use chrono::{Duration, Utc};
use sha2::{Digest, Sha256};

use super::accounts::{AccountProfile, EmployerId, EmployerRecord, Identity, IdentityId};
use super::applications::{
    ApplicationId, JobApplication, RejectionReason, SavedJob, SavedJobId,
};
use super::listings::{JobListing, ListingId};
use super::repository::{
    ApplicationFilter, BoardRepository, BoardTransaction, ListingFilter, RepositoryError,
    RowScope,
};
use super::storage::{BlobStorage, StorageError, StoredRef, Upload, Visibility};

#[derive(Debug, Default, Clone)]
struct Tables {
    sequence: u64,
    identities: BTreeMap<IdentityId, Identity>,
    profiles: BTreeMap<IdentityId, AccountProfile>,
    employers: BTreeMap<EmployerId, EmployerRecord>,
    listings: BTreeMap<ListingId, JobListing>,
    applications: BTreeMap<ApplicationId, JobApplication>,
    saved_jobs: BTreeMap<SavedJobId, SavedJob>,
    rejection_reasons: Vec<RejectionReason>,
}

/// Transactional in-memory store. Transactions are serialized and work on a
/// staged copy of the tables that replaces the committed copy on success.
#[derive(Debug, Default, Clone)]
pub struct MemoryStore {
    tables: Arc<Mutex<Tables>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl BoardRepository for MemoryStore {
    fn transaction<T, E, F>(&self, work: F) -> Result<T, E>
    where
        F: FnOnce(&mut dyn BoardTransaction) -> Result<T, E>,
        E: From<RepositoryError>,
    {
        let mut committed = self
            .tables
            .lock()
            .map_err(|_| E::from(RepositoryError::Unavailable("store mutex poisoned".into())))?;
        let mut staged = (*committed).clone();
        let value = work(&mut staged)?;
        *committed = staged;
        Ok(value)
    }
}

fn newest_first<T, K: Ord>(mut rows: Vec<T>, key: impl Fn(&T) -> K) -> Vec<T> {
    rows.sort_by(|left, right| key(right).cmp(&key(left)));
    rows
}

impl BoardTransaction for Tables {
    fn next_id(&mut self) -> u64 {
        self.sequence += 1;
        self.sequence
    }

    fn insert_identity(&mut self, identity: Identity) -> Result<(), RepositoryError> {
        let taken = self.identities.values().any(|existing| {
            existing.id == identity.id
                || existing.username.eq_ignore_ascii_case(&identity.username)
                || existing.email.eq_ignore_ascii_case(&identity.email)
        });
        if taken {
            return Err(RepositoryError::Conflict);
        }
        self.identities.insert(identity.id, identity);
        Ok(())
    }

    fn identity(&self, id: IdentityId) -> Result<Option<Identity>, RepositoryError> {
        Ok(self.identities.get(&id).cloned())
    }

    fn identity_by_login(&self, login: &str) -> Result<Option<Identity>, RepositoryError> {
        let login = login.trim();
        Ok(self
            .identities
            .values()
            .find(|identity| identity.username.eq_ignore_ascii_case(login))
            .or_else(|| {
                self.identities
                    .values()
                    .find(|identity| identity.email.eq_ignore_ascii_case(login))
            })
            .cloned())
    }

    fn update_identity(&mut self, identity: Identity) -> Result<(), RepositoryError> {
        match self.identities.get_mut(&identity.id) {
            Some(slot) => {
                *slot = identity;
                Ok(())
            }
            None => Err(RepositoryError::NotFound),
        }
    }

    fn insert_profile(&mut self, profile: AccountProfile) -> Result<(), RepositoryError> {
        if self.profiles.contains_key(&profile.identity) {
            return Err(RepositoryError::Conflict);
        }
        self.profiles.insert(profile.identity, profile);
        Ok(())
    }

    fn profile(&self, identity: IdentityId) -> Result<Option<AccountProfile>, RepositoryError> {
        Ok(self.profiles.get(&identity).cloned())
    }

    fn update_profile(&mut self, profile: AccountProfile) -> Result<(), RepositoryError> {
        match self.profiles.get_mut(&profile.identity) {
            Some(slot) => {
                *slot = profile;
                Ok(())
            }
            None => Err(RepositoryError::NotFound),
        }
    }

    fn insert_employer(&mut self, employer: EmployerRecord) -> Result<(), RepositoryError> {
        let taken = self
            .employers
            .values()
            .any(|existing| existing.id == employer.id || existing.profile == employer.profile);
        if taken {
            return Err(RepositoryError::Conflict);
        }
        self.employers.insert(employer.id, employer);
        Ok(())
    }

    fn employer(
        &self,
        id: EmployerId,
        scope: RowScope,
    ) -> Result<Option<EmployerRecord>, RepositoryError> {
        Ok(self
            .employers
            .get(&id)
            .filter(|employer| scope.admits(employer.is_deleted()))
            .cloned())
    }

    fn employer_for_profile(
        &self,
        profile: IdentityId,
        scope: RowScope,
    ) -> Result<Option<EmployerRecord>, RepositoryError> {
        Ok(self
            .employers
            .values()
            .find(|employer| employer.profile == profile && scope.admits(employer.is_deleted()))
            .cloned())
    }

    fn update_employer(&mut self, employer: EmployerRecord) -> Result<(), RepositoryError> {
        match self.employers.get_mut(&employer.id) {
            Some(slot) => {
                *slot = employer;
                Ok(())
            }
            None => Err(RepositoryError::NotFound),
        }
    }

    fn insert_listing(&mut self, listing: JobListing) -> Result<(), RepositoryError> {
        if self.listings.contains_key(&listing.id) {
            return Err(RepositoryError::Conflict);
        }
        self.listings.insert(listing.id, listing);
        Ok(())
    }

    fn listing(
        &self,
        id: ListingId,
        scope: RowScope,
    ) -> Result<Option<JobListing>, RepositoryError> {
        Ok(self
            .listings
            .get(&id)
            .filter(|listing| scope.admits(listing.is_deleted()))
            .cloned())
    }

    fn listings(&self, filter: ListingFilter) -> Result<Vec<JobListing>, RepositoryError> {
        let rows = self
            .listings
            .values()
            .filter(|listing| filter.scope.admits(listing.is_deleted()))
            .filter(|listing| filter.employer.map_or(true, |id| listing.employer == id))
            .cloned()
            .collect();
        Ok(newest_first(rows, |listing: &JobListing| {
            (listing.posted_at, listing.id)
        }))
    }

    fn update_listing(&mut self, listing: JobListing) -> Result<(), RepositoryError> {
        match self.listings.get_mut(&listing.id) {
            Some(slot) => {
                *slot = listing;
                Ok(())
            }
            None => Err(RepositoryError::NotFound),
        }
    }

    fn remove_listing(&mut self, id: ListingId) -> Result<(), RepositoryError> {
        if self.listings.remove(&id).is_none() {
            return Err(RepositoryError::NotFound);
        }
        for application in self.applications.values_mut() {
            if application.listing == Some(id) {
                application.listing = None;
            }
        }
        for saved in self.saved_jobs.values_mut() {
            if saved.listing == Some(id) {
                saved.listing = None;
            }
        }
        Ok(())
    }

    fn insert_application(
        &mut self,
        application: JobApplication,
    ) -> Result<(), RepositoryError> {
        if self.applications.contains_key(&application.id) {
            return Err(RepositoryError::Conflict);
        }
        self.applications.insert(application.id, application);
        Ok(())
    }

    fn application(&self, id: ApplicationId) -> Result<Option<JobApplication>, RepositoryError> {
        Ok(self.applications.get(&id).cloned())
    }

    fn applications(
        &self,
        filter: ApplicationFilter,
    ) -> Result<Vec<JobApplication>, RepositoryError> {
        let rows = self
            .applications
            .values()
            .filter(|application| match filter {
                ApplicationFilter::Listing(id) => application.listing == Some(id),
                ApplicationFilter::Applicant(identity) => {
                    application.applicant.identity() == Some(identity)
                }
                ApplicationFilter::Employer(employer) => application
                    .listing
                    .and_then(|id| self.listings.get(&id))
                    .is_some_and(|listing| listing.employer == employer),
            })
            .cloned()
            .collect();
        Ok(newest_first(rows, |application: &JobApplication| {
            (application.applied_at, application.id)
        }))
    }

    fn application_with_resume(
        &self,
        key: &str,
    ) -> Result<Option<JobApplication>, RepositoryError> {
        Ok(self
            .applications
            .values()
            .find(|application| application.resume.key == key)
            .cloned())
    }

    fn update_application(
        &mut self,
        application: JobApplication,
    ) -> Result<(), RepositoryError> {
        match self.applications.get_mut(&application.id) {
            Some(slot) => {
                *slot = application;
                Ok(())
            }
            None => Err(RepositoryError::NotFound),
        }
    }

    fn insert_saved_job(&mut self, saved: SavedJob) -> Result<(), RepositoryError> {
        let taken = self.saved_jobs.values().any(|existing| {
            existing.id == saved.id
                || (existing.user == saved.user
                    && existing.listing.is_some()
                    && existing.listing == saved.listing)
        });
        if taken {
            return Err(RepositoryError::Conflict);
        }
        self.saved_jobs.insert(saved.id, saved);
        Ok(())
    }

    fn saved_job(
        &self,
        user: IdentityId,
        listing: ListingId,
    ) -> Result<Option<SavedJob>, RepositoryError> {
        Ok(self
            .saved_jobs
            .values()
            .find(|saved| saved.user == user && saved.listing == Some(listing))
            .cloned())
    }

    fn saved_jobs(&self, user: IdentityId) -> Result<Vec<SavedJob>, RepositoryError> {
        let rows = self
            .saved_jobs
            .values()
            .filter(|saved| saved.user == user)
            .cloned()
            .collect();
        Ok(newest_first(rows, |saved: &SavedJob| (saved.saved_at, saved.id)))
    }

    fn remove_saved_job(&mut self, id: SavedJobId) -> Result<(), RepositoryError> {
        self.saved_jobs
            .remove(&id)
            .map(|_| ())
            .ok_or(RepositoryError::NotFound)
    }

    fn insert_rejection_reason(
        &mut self,
        reason: RejectionReason,
    ) -> Result<(), RepositoryError> {
        let taken = self
            .rejection_reasons
            .iter()
            .any(|existing| existing.id == reason.id || existing.name == reason.name);
        if taken {
            return Err(RepositoryError::Conflict);
        }
        self.rejection_reasons.push(reason);
        Ok(())
    }

    fn rejection_reasons(&self) -> Result<Vec<RejectionReason>, RepositoryError> {
        Ok(self.rejection_reasons.clone())
    }
}

/// Blob store kept in memory. Private URLs are signed with SHA-256 over the
/// key and expiry so they can be verified without a lookup.
#[derive(Debug, Clone)]
pub struct MemoryBlobStorage {
    base_url: String,
    secret: String,
    blobs: Arc<Mutex<HashMap<String, Vec<u8>>>>,
}

impl MemoryBlobStorage {
    pub fn new(base_url: impl Into<String>, secret: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            secret: secret.into(),
            blobs: Arc::default(),
        }
    }

    pub fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self
            .blobs
            .lock()
            .map(|blobs| blobs.keys().cloned().collect())
            .unwrap_or_default();
        keys.sort();
        keys
    }

    pub fn signature(&self, key: &str, expires: i64) -> String {
        let mut hasher = Sha256::new();
        hasher.update(self.secret.as_bytes());
        hasher.update(b":");
        hasher.update(key.as_bytes());
        hasher.update(b":");
        hasher.update(expires.to_string().as_bytes());
        hex::encode(hasher.finalize())
    }

    fn locked(
        &self,
    ) -> Result<std::sync::MutexGuard<'_, HashMap<String, Vec<u8>>>, StorageError> {
        self.blobs
            .lock()
            .map_err(|_| StorageError::Unavailable("blob mutex poisoned".to_string()))
    }
}

impl Default for MemoryBlobStorage {
    fn default() -> Self {
        Self::new("/media", "jobsy-development")
    }
}

impl BlobStorage for MemoryBlobStorage {
    fn save(
        &self,
        path: &str,
        upload: &Upload,
        visibility: Visibility,
    ) -> Result<StoredRef, StorageError> {
        let mut blobs = self.locked()?;
        let base = format!("{}/{}", visibility.prefix(), path.trim_start_matches('/'));
        let mut key = base.clone();
        let mut attempt = 1;
        while blobs.contains_key(&key) {
            key = match base.rsplit_once('.') {
                Some((stem, extension)) if !stem.ends_with('/') && !extension.contains('/') => {
                    format!("{stem}_{attempt}.{extension}")
                }
                _ => format!("{base}_{attempt}"),
            };
            attempt += 1;
        }
        blobs.insert(key.clone(), upload.bytes.clone());
        Ok(StoredRef { key, visibility })
    }

    fn delete(&self, stored: &StoredRef) -> Result<(), StorageError> {
        self.locked()?.remove(&stored.key);
        Ok(())
    }

    fn exists(&self, stored: &StoredRef) -> Result<bool, StorageError> {
        Ok(self.locked()?.contains_key(&stored.key))
    }

    fn url(&self, stored: &StoredRef) -> Result<String, StorageError> {
        if stored.visibility == Visibility::Private {
            return Err(StorageError::PrivateBlob(stored.key.clone()));
        }
        Ok(format!("{}/{}", self.base_url, stored.key))
    }

    fn signed_url(&self, stored: &StoredRef, ttl: Duration) -> Result<String, StorageError> {
        if !self.exists(stored)? {
            return Err(StorageError::Missing(stored.key.clone()));
        }
        let expires = (Utc::now() + ttl).timestamp();
        let signature = self.signature(&stored.key, expires);
        Ok(format!(
            "{}/{}?expires={expires}&signature={signature}",
            self.base_url, stored.key
        ))
    }
}
