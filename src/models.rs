use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    Indeed,
    LinkedIn,
}

impl Platform {
    pub fn as_str(&self) -> &'static str {
        match self {
            Platform::Indeed => "indeed",
            Platform::LinkedIn => "linkedin",
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Platform {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "indeed" => Ok(Platform::Indeed),
            "linkedin" => Ok(Platform::LinkedIn),
            other => Err(anyhow::anyhow!("Unknown platform: {}", other)),
        }
    }
}

/// One email as handed over by the fetcher. Only messages with an HTML
/// part ever become a `FetchedEmail`.
#[derive(Debug, Clone)]
pub struct FetchedEmail {
    pub uid: u32,
    pub sender: String,
    pub subject: String,
    pub received_at: DateTime<Utc>,
    pub html: String,
    pub headers: BTreeMap<String, String>,
}

/// Job key and canonical URL always travel together.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CanonicalJob {
    pub job_key: String,
    pub canonical_url: String,
}

/// Provenance of an extracted record: the email it came from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Source {
    pub uid: u32,
    pub platform: Platform,
    pub subject: String,
    pub sender: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawJobRecord {
    pub title: String,
    pub company: Option<String>,
    pub location: Option<String>,
    pub raw_url: String,
    #[serde(flatten)]
    pub canonical: Option<CanonicalJob>,
    pub rating: Option<f64>,
    pub salary: Option<String>,
    pub summary: Option<String>,
    pub easy_apply: Option<bool>,
    pub active_hiring: Option<bool>,
    pub posted_at: Option<DateTime<Utc>>,
    pub platform: Platform,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<Source>,
}

impl RawJobRecord {
    /// A record with only the mandatory fields; canonical identity is
    /// derived from `raw_url` right away.
    pub fn new(platform: Platform, title: String, raw_url: String) -> Self {
        let canonical = crate::urls::normalize(&raw_url);
        Self {
            title,
            company: None,
            location: None,
            raw_url,
            canonical,
            rating: None,
            salary: None,
            summary: None,
            easy_apply: None,
            active_hiring: None,
            posted_at: None,
            platform,
            source: None,
        }
    }

    pub fn job_key(&self) -> Option<&str> {
        self.canonical.as_ref().map(|c| c.job_key.as_str())
    }

    pub fn canonical_url(&self) -> Option<&str> {
        self.canonical.as_ref().map(|c| c.canonical_url.as_str())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobPosting {
    pub id: i64,
    pub platform: Platform,
    pub job_key: Option<String>,
    pub raw_url: Option<String>,
    pub canonical_url: Option<String>,
    pub title: String,
    pub company: Option<String>,
    pub location: Option<String>,
    pub rating: Option<f64>,
    pub salary: Option<String>,
    pub summary: Option<String>,
    pub easy_apply: Option<bool>,
    pub active_hiring: Option<bool>,
    pub posted_at: Option<DateTime<Utc>>,
    pub source_email_id: Option<String>,
    pub created_at: String,
}

/// Insert payload for a posting not yet persisted.
#[derive(Debug, Clone)]
pub struct NewJobPosting {
    pub platform: Platform,
    pub job_key: Option<String>,
    pub raw_url: Option<String>,
    pub canonical_url: Option<String>,
    pub title: String,
    pub company: Option<String>,
    pub location: Option<String>,
    pub rating: Option<f64>,
    pub salary: Option<String>,
    pub summary: Option<String>,
    pub easy_apply: Option<bool>,
    pub active_hiring: Option<bool>,
    pub posted_at: Option<DateTime<Utc>>,
    pub source_email_id: Option<String>,
}

impl From<&RawJobRecord> for NewJobPosting {
    fn from(job: &RawJobRecord) -> Self {
        Self {
            platform: job.platform,
            job_key: job.job_key().map(str::to_string),
            raw_url: Some(job.raw_url.clone()).filter(|u| !u.is_empty()),
            canonical_url: job.canonical_url().map(str::to_string),
            title: job.title.clone(),
            company: job.company.clone(),
            location: job.location.clone(),
            rating: job.rating,
            salary: job.salary.clone(),
            summary: job.summary.clone(),
            easy_apply: job.easy_apply,
            active_hiring: job.active_hiring,
            posted_at: job.posted_at,
            source_email_id: job.source.as_ref().map(|s| s.uid.to_string()),
        }
    }
}
