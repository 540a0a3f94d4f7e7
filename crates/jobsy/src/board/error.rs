use std::fmt;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;

use super::accounts::CredentialError;
use super::applications::RejectionReasonId;
use super::repository::RepositoryError;
use super::storage::StorageError;

/// Error raised by every job board operation.
#[derive(Debug, thiserror::Error)]
pub enum BoardError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error("authentication required")]
    Unauthenticated,
    #[error("forbidden: {0}")]
    Forbidden(#[from] Denial),
    #[error("{0} not found")]
    NotFound(Entity),
    #[error(transparent)]
    Storage(#[from] StorageError),
    #[error(transparent)]
    Credential(#[from] CredentialError),
    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

impl BoardError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            BoardError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
            BoardError::Unauthenticated => StatusCode::UNAUTHORIZED,
            BoardError::Forbidden(_) => StatusCode::FORBIDDEN,
            BoardError::NotFound(_) => StatusCode::NOT_FOUND,
            BoardError::Storage(_) => StatusCode::BAD_GATEWAY,
            BoardError::Repository(RepositoryError::Conflict) => StatusCode::CONFLICT,
            BoardError::Repository(_) | BoardError::Credential(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for BoardError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let payload = json!({ "error": self.to_string() });
        (status, Json(payload)).into_response()
    }
}

/// Malformed input to a mutation. Never retried.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("unknown role '{0}'")]
    UnknownRole(String),
    #[error("{0} is required")]
    Required(&'static str),
    #[error("'{0}' is not a valid email address")]
    InvalidEmail(String),
    #[error("a user with that email already exists")]
    DuplicateEmail,
    #[error("password must be at least {min} characters long")]
    PasswordTooShort { min: usize },
    #[error("an application names either an account or a guest, not both")]
    ApplicantConflict,
    #[error("an application needs an account or guest contact details")]
    MissingApplicant,
    #[error("guest applications require both a name and an email")]
    IncompleteGuest,
    #[error("applications without a listing must carry the job title and company")]
    MissingSnapshot,
    #[error("you have already applied for this job")]
    AlreadyApplied,
    #[error("'{0}' is not an uploaded resume")]
    NotAResume(String),
    #[error("this resume is already attached to another application")]
    ResumeInUse,
    #[error("CV sharing with employers requires consent")]
    ShareWithoutConsent,
    #[error("minimum salary {min} exceeds maximum salary {max}")]
    SalaryRange { min: u32, max: u32 },
    #[error("'{file_name}' is not an accepted file type (expected {expected})")]
    UnsupportedFile {
        file_name: String,
        expected: &'static str,
    },
    #[error("file too large ({actual} bytes, limit {limit} bytes)")]
    FileTooLarge { limit: usize, actual: usize },
    #[error("'{0}' is not an absolute http(s) URL")]
    InvalidWebsite(String),
    #[error("the listing's employer is deleted; restore the employer instead")]
    EmployerDeleted,
    #[error("rejection reason {0} does not exist")]
    UnknownRejectionReason(RejectionReasonId),
}

/// Reason an authorization check failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum Denial {
    #[error("administrator privileges required")]
    AdminOnly,
    #[error("an active employer account is required")]
    NotEmployer,
    #[error("you do not own this job listing")]
    NotListingOwner,
    #[error("you don't have permission to access this CV")]
    CvNotShared,
}

/// Entity kinds named in not-found errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Entity {
    Identity,
    Profile,
    Employer,
    Listing,
    Application,
    SavedJob,
    Cv,
    Upload,
}

impl fmt::Display for Entity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Entity::Identity => "user",
            Entity::Profile => "account profile",
            Entity::Employer => "employer",
            Entity::Listing => "job listing",
            Entity::Application => "application",
            Entity::SavedJob => "saved job",
            Entity::Cv => "CV",
            Entity::Upload => "uploaded file",
        };
        f.write_str(label)
    }
}
