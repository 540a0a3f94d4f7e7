//! Job listings: moderation, expiry, soft deletion and public search.

pub mod domain;
pub mod query;
pub mod service;

pub use domain::{JobListing, ListingDraft, ListingId, ListingStatus, PremiumTier};
pub use query::{ListingFacets, ListingQuery, Page};
pub use service::{EmployerDashboard, ListingDetail, ListingService};
