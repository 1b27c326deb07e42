//! # memcat-directory: HTTP Member Directory Gateway
//!
//! Implements [`memcat_engine::MemberDirectory`] against a REST member
//! service. The engine reads member snapshots through it and writes exactly
//! one field back: the member's category.
//!
//! ## Error Mapping
//!
//! | Directory response | Gateway error |
//! |--------------------|---------------|
//! | 404 on a write | `DirectoryError::NotFound` |
//! | other 4xx on a write | `DirectoryError::Rejected` |
//! | 5xx, transport, bad JSON | `DirectoryError::Unavailable` |
//!
//! A 404 when fetching one member means the member is unknown and is not an
//! error. Transport failures are retried with exponential backoff before
//! being reported.

pub mod client;
pub mod config;
pub mod error;
pub(crate) mod retry;
pub mod types;

pub use client::HttpMemberDirectory;
pub use config::DirectoryConfig;
pub use error::DirectoryClientError;
