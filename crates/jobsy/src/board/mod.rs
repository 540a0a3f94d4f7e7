//! The job board: who may do what to which listing, application or CV.
//!
//! Every service runs its reads and writes through a single
//! [`BoardRepository::transaction`], so cascades such as the employer record
//! created by a role change commit together with the change or not at all.

pub mod accounts;
pub mod applications;
pub mod clock;
pub mod cv;
pub mod error;
pub mod listings;
pub mod memory;
pub mod repository;
pub mod router;
pub mod session;
pub mod storage;

#[cfg(test)]
mod tests;

use std::sync::Arc;

pub use error::{BoardError, Denial, Entity, ValidationError};
pub use router::board_router;

use self::accounts::{AccountService, CredentialHasher};
use self::applications::ApplicationService;
use self::clock::Clock;
use self::cv::CvService;
use self::listings::ListingService;
use self::repository::BoardRepository;
use self::session::SessionSigner;
use self::storage::BlobStorage;
use crate::config::{BoardSettings, StorageSettings};

/// External collaborators of the board.
pub struct BoardDeps<R> {
    pub repository: Arc<R>,
    pub storage: Arc<dyn BlobStorage>,
    pub clock: Arc<dyn Clock>,
    pub hasher: Arc<dyn CredentialHasher>,
}

/// Facade bundling the services over one repository.
pub struct JobBoard<R> {
    pub accounts: AccountService<R>,
    pub listings: ListingService<R>,
    pub applications: ApplicationService<R>,
    pub cvs: CvService<R>,
}

impl<R> JobBoard<R>
where
    R: BoardRepository + 'static,
{
    pub fn new(deps: BoardDeps<R>, board: BoardSettings, storage: StorageSettings) -> Self {
        let BoardDeps {
            repository,
            storage: blobs,
            clock,
            hasher,
        } = deps;

        let sessions = SessionSigner::new(storage.signing_secret.clone(), storage.session_ttl());

        Self {
            accounts: AccountService::new(
                Arc::clone(&repository),
                Arc::clone(&blobs),
                hasher,
                Arc::clone(&clock),
                sessions,
            ),
            listings: ListingService::new(Arc::clone(&repository), Arc::clone(&clock), board),
            applications: ApplicationService::new(
                Arc::clone(&repository),
                Arc::clone(&blobs),
                Arc::clone(&clock),
                storage.clone(),
            ),
            cvs: CvService::new(repository, blobs, clock, storage),
        }
    }
}
