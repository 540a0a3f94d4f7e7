//! Job board core: account roles, listing moderation and expiry,
//! applications with snapshots, saved jobs and CV access control.

pub mod board;
pub mod config;
pub mod error;
pub mod telemetry;
