//! Job link canonicalization and tracking-parameter redaction.

use regex::Regex;
use std::sync::LazyLock;
use url::Url;

use crate::models::CanonicalJob;

pub const REDACTED: &str = "REDACTED";

static INDEED_JOB_KEY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\bjk=(\w+)").unwrap());
static LINKEDIN_JOB_ID: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"/jobs/view/(\d+)").unwrap());

const LINKEDIN_JOBSVIEW_REDACT_KEYS: &[&str] = &[
    "trackingId",
    "refId",
    "lipi",
    "midToken",
    "midSig",
    "trk",
    "trkEmail",
    "eid",
    "otpToken",
    "utm_source",
    "utm_medium",
    "utm_campaign",
    "utm_term",
    "utm_content",
];

const INDEED_PAGEAD_REDACT_KEYS: &[&str] = &["tmtk", "xkcb", "camk", "alid", "sid", "tk"];

const INDEED_RC_REDACT_KEYS: &[&str] = &["tk", "alid", "qd", "rd", "bb", "sid", "session", "user"];

/// Path fragments that identify a link pointing at one job posting.
const JOB_LINK_MARKERS: &[&str] = &["/rc/clk", "/pagead/clk", "/jobs/view/", "/viewjob"];

/// Derive the stable job key and canonical URL from a raw job link.
///
/// Returns `None` when the link matches no known provider pattern; callers
/// keep the raw URL only in that case.
pub fn normalize(raw_url: &str) -> Option<CanonicalJob> {
    if raw_url.contains("indeed.com") {
        if let Some(cap) = INDEED_JOB_KEY.captures(raw_url) {
            let job_key = cap[1].to_string();
            return Some(CanonicalJob {
                canonical_url: format!("https://indeed.com/viewjob?jk={}", job_key),
                job_key,
            });
        }
    }

    if raw_url.contains("linkedin.com") {
        if let Some(cap) = LINKEDIN_JOB_ID.captures(raw_url) {
            let job_key = cap[1].to_string();
            return Some(CanonicalJob {
                canonical_url: format!("https://www.linkedin.com/jobs/view/{}", job_key),
                job_key,
            });
        }
    }

    None
}

/// Which query keys must be redacted for this link, by host and path shape.
fn redact_policy(url: &Url) -> Option<&'static [&'static str]> {
    let host = url.host_str().unwrap_or_default();
    let path = url.path();

    if host.ends_with("indeed.com") {
        if path.starts_with("/rc/clk") {
            return Some(INDEED_RC_REDACT_KEYS);
        }
        if path.starts_with("/pagead/clk") {
            return Some(INDEED_PAGEAD_REDACT_KEYS);
        }
        return None;
    }

    if host.ends_with("linkedin.com") && path.contains("/jobs/view/") {
        return Some(LINKEDIN_JOBSVIEW_REDACT_KEYS);
    }

    None
}

/// Replace the values of known tracking parameters with [`REDACTED`].
///
/// Parameter order and every other key are preserved. Links without a
/// redaction policy, or that do not parse, come back unchanged.
pub fn sanitize(raw_url: &str) -> String {
    let Ok(mut url) = Url::parse(raw_url) else {
        return raw_url.to_string();
    };
    let Some(keys) = redact_policy(&url) else {
        return raw_url.to_string();
    };
    if url.query().is_none() {
        return raw_url.to_string();
    }

    let pairs: Vec<(String, String)> = url
        .query_pairs()
        .map(|(k, v)| {
            let value = if keys.contains(&k.as_ref()) {
                REDACTED.to_string()
            } else {
                v.into_owned()
            };
            (k.into_owned(), value)
        })
        .collect();

    url.query_pairs_mut().clear().extend_pairs(pairs);
    url.to_string()
}

/// True for hrefs that point at a single posting rather than navigation,
/// settings or unsubscribe pages.
pub fn is_job_link(href: &str) -> bool {
    JOB_LINK_MARKERS.iter().any(|marker| href.contains(marker))
}
