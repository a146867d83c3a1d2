//! Job alert email ingestion: provider-specific extraction of job records
//! from Indeed and LinkedIn alert digests, URL canonicalization,
//! deduplicating ingestion and sanitized fixture capture.

pub mod config;
pub mod db;
pub mod email;
pub mod error;
pub mod extract;
pub mod fixtures;
pub mod ingest;
pub mod models;
pub mod parsers;
pub mod sanitize;
pub mod urls;

pub use error::ExtractError;
pub use extract::JobExtractionService;
pub use ingest::{IngestStats, IngestionService, JobStore};
pub use models::{CanonicalJob, FetchedEmail, Platform, RawJobRecord, Source};
