//! Candidate CVs and the rule deciding who may read them.

pub(crate) mod policy;
pub mod service;

pub use service::{CvAccess, CvService};
