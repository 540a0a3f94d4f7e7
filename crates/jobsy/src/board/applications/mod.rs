//! Job applications, employer review and saved jobs.

pub mod domain;
pub mod service;
pub(crate) mod views;

pub use domain::{
    Applicant, ApplicantInput, ApplicationId, ApplicationStatus, ApplicationView, JobApplication,
    NewApplication, RejectionReason, RejectionReasonId, ResumeLink, ReviewUpdate, SavedJob,
    SavedJobId, SavedJobView, STANDARD_REJECTION_REASONS,
};
pub use service::ApplicationService;
