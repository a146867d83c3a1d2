use anyhow::Result;
use tracing::{debug, info};

use crate::models::{JobPosting, NewJobPosting, Platform, RawJobRecord};

/// Persistence seam for ingested postings. The store owns its schema and
/// uniqueness rules.
pub trait JobStore {
    fn find_by_job_key(&self, platform: Platform, job_key: &str) -> Result<Option<JobPosting>>;
    fn find_by_raw_url(&self, raw_url: &str) -> Result<Option<JobPosting>>;
    fn insert(&self, posting: NewJobPosting) -> Result<JobPosting>;
}

#[derive(Debug, Default)]
pub struct IngestStats {
    pub seen: usize,
    pub created: usize,
    pub duplicates: usize,
}

/// Turns extracted records into stored postings, skipping any the store
/// already holds.
pub struct IngestionService<'a, S: JobStore> {
    store: &'a S,
}

impl<'a, S: JobStore> IngestionService<'a, S> {
    pub fn new(store: &'a S) -> Self {
        Self { store }
    }

    /// Is this record already stored, by composite key or by exact raw URL?
    pub fn is_duplicate(&self, job: &RawJobRecord) -> Result<bool> {
        if let Some(job_key) = job.job_key() {
            if self.store.find_by_job_key(job.platform, job_key)?.is_some() {
                return Ok(true);
            }
        }

        // Links that never canonicalized still dedupe on the exact URL.
        if !job.raw_url.is_empty() && self.store.find_by_raw_url(&job.raw_url)?.is_some() {
            return Ok(true);
        }

        Ok(false)
    }

    /// Store `job` unless it is a duplicate. `Ok(None)` means "already known",
    /// which is not a failure.
    pub fn ingest(&self, job: &RawJobRecord) -> Result<Option<JobPosting>> {
        if self.is_duplicate(job)? {
            debug!(title = %job.title, raw_url = %job.raw_url, "Skipping duplicate job");
            return Ok(None);
        }
        self.store.insert(NewJobPosting::from(job)).map(Some)
    }

    pub fn ingest_all(&self, jobs: &[RawJobRecord]) -> Result<(IngestStats, Vec<JobPosting>)> {
        let mut stats = IngestStats::default();
        let mut created = Vec::new();

        for job in jobs {
            stats.seen += 1;
            match self.ingest(job)? {
                Some(posting) => {
                    stats.created += 1;
                    created.push(posting);
                }
                None => stats.duplicates += 1,
            }
        }

        info!(
            seen = stats.seen,
            created = stats.created,
            duplicates = stats.duplicates,
            "Ingestion finished"
        );
        Ok((stats, created))
    }
}
