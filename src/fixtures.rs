use anyhow::{Context, Result};
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use crate::models::{FetchedEmail, Platform, RawJobRecord};
use crate::sanitize::{PiiPatterns, redact_headers, redact_pii, strip_structure, whitelist_headers};
use crate::urls;

/// Writes sanitized snapshots of processed alerts for regression tests.
/// Only ever built in debug mode.
pub struct FixtureWriter {
    root: PathBuf,
    patterns: PiiPatterns,
}

#[derive(Serialize)]
struct FixtureResponse<'a> {
    platform: Platform,
    count: usize,
    jobs: &'a [RawJobRecord],
}

impl FixtureWriter {
    pub fn new(root: impl Into<PathBuf>, patterns: PiiPatterns) -> Self {
        Self {
            root: root.into(),
            patterns,
        }
    }

    /// `<root>/<platform>/<YYYY-MM-DD>_<uid>/`
    pub fn fixture_dir(&self, platform: Platform, email: &FetchedEmail) -> PathBuf {
        let date = email.received_at.format("%Y-%m-%d");
        self.root
            .join(platform.as_str())
            .join(format!("{}_{}", date, email.uid))
    }

    pub fn write(&self, platform: Platform, email: &FetchedEmail, jobs: &[RawJobRecord]) -> Result<PathBuf> {
        let dir = self.fixture_dir(platform, email);
        fs::create_dir_all(&dir)
            .with_context(|| format!("Failed to create fixture dir: {}", dir.display()))?;
        let uid = email.uid;

        let html = redact_pii(&strip_structure(&email.html), &self.patterns);
        write_file(&dir.join(format!("clean_{uid}.html")), &html)?;

        let headers = redact_headers(&whitelist_headers(&email.headers), &self.patterns);
        write_file(
            &dir.join(format!("net_headers_{uid}.json")),
            &serde_json::to_string_pretty(&headers)?,
        )?;

        // Keep the response consistent with the sanitized HTML it came from.
        let jobs: Vec<RawJobRecord> = jobs
            .iter()
            .cloned()
            .map(|mut job| {
                job.raw_url = urls::sanitize(&job.raw_url);
                job
            })
            .collect();
        let response = FixtureResponse {
            platform,
            count: jobs.len(),
            jobs: &jobs,
        };
        write_file(
            &dir.join(format!("response_{uid}.json")),
            &serde_json::to_string_pretty(&response)?,
        )?;

        debug!(dir = %dir.display(), "Wrote fixture");
        Ok(dir)
    }

    /// Like [`write`](Self::write), but failures are logged and dropped so
    /// they never reach extraction.
    pub fn write_best_effort(&self, platform: Platform, email: &FetchedEmail, jobs: &[RawJobRecord]) {
        if let Err(e) = self.write(platform, email, jobs) {
            warn!(uid = email.uid, error = %e, "Fixture write failed");
        }
    }

    /// Delete everything under the fixture root.
    pub fn remove_all(&self) -> Result<usize> {
        if !self.root.exists() {
            return Ok(0);
        }
        let mut removed = 0;
        for entry in fs::read_dir(&self.root)? {
            let path = entry?.path();
            if path.is_dir() {
                fs::remove_dir_all(&path)?;
            } else {
                fs::remove_file(&path)?;
            }
            removed += 1;
        }
        Ok(removed)
    }
}

fn write_file(path: &Path, contents: &str) -> Result<()> {
    fs::write(path, contents).with_context(|| format!("Failed to write {}", path.display()))
}
