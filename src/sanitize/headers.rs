use std::collections::BTreeMap;

use super::{PiiPatterns, REDACTED};

const ALLOWED_HEADERS: &[&str] = &[
    "from",
    "subject",
    "date",
    "message-id",
    "mime-version",
    "content-type",
    // Indeed
    "preheader",
    "x-indeed-content-type",
    "x-indeed-client-app",
    "x-campaign-id",
    // LinkedIn
    "x-linkedin-class",
    "x-linkedin-template",
];

/// Keep only allow-listed headers, keyed in lower case.
pub fn whitelist_headers(raw: &BTreeMap<String, String>) -> BTreeMap<String, String> {
    raw.iter()
        .map(|(k, v)| (k.to_lowercase(), v))
        .filter(|(k, _)| ALLOWED_HEADERS.contains(&k.as_str()))
        .map(|(k, v)| (k, v.clone()))
        .collect()
}

/// Scrub the owner's name and address from header values.
pub fn redact_headers(
    headers: &BTreeMap<String, String>,
    patterns: &PiiPatterns,
) -> BTreeMap<String, String> {
    headers
        .iter()
        .map(|(k, v)| {
            let value = if k == "message-id" {
                REDACTED.to_string()
            } else {
                patterns.redact(v).into_owned()
            };
            (k.clone(), value)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Identity;

    #[test]
    fn test_whitelist_and_redact_headers() {
        let mut raw = BTreeMap::new();
        raw.insert("From".to_string(), "Indeed <alert@indeed.com>".to_string());
        raw.insert("To".to_string(), "Camille <camille@example.org>".to_string());
        raw.insert("Subject".to_string(), "Camille, 30 new Python jobs".to_string());
        raw.insert("Message-ID".to_string(), "<abc@mail.indeed.com>".to_string());
        raw.insert("X-Indeed-Client-App".to_string(), "jobalerts".to_string());
        raw.insert("Received".to_string(), "from mx.example.org".to_string());

        let patterns = PiiPatterns::from_identity(&Identity {
            first_name: Some("Camille".to_string()),
            last_name: None,
            email: Some("camille@example.org".to_string()),
        })
        .unwrap();

        let cleaned = redact_headers(&whitelist_headers(&raw), &patterns);

        assert_eq!(cleaned.len(), 4);
        assert!(!cleaned.contains_key("to"));
        assert!(!cleaned.contains_key("received"));
        assert_eq!(cleaned["from"], "Indeed <alert@indeed.com>");
        assert_eq!(cleaned["subject"], "[REDACTED], 30 new Python jobs");
        assert_eq!(cleaned["message-id"], "[REDACTED]");
        assert_eq!(cleaned["x-indeed-client-app"], "jobalerts");
    }
}
