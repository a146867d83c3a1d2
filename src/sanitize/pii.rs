use regex::Regex;
use scraper::node::Element;
use std::borrow::Cow;

use super::{Pass, REDACTED, rewrite};
use crate::config::Identity;
use crate::urls;

/// Compiled patterns for the mailbox owner's personal data.
#[derive(Debug, Clone, Default)]
pub struct PiiPatterns {
    pub name: Option<Regex>,
    pub email: Option<Regex>,
}

impl PiiPatterns {
    pub fn from_identity(identity: &Identity) -> anyhow::Result<Self> {
        Ok(Self {
            name: build_name_pattern(
                identity.first_name.as_deref(),
                identity.last_name.as_deref(),
            )?,
            email: build_email_pattern(identity.email.as_deref())?,
        })
    }

    /// Apply both patterns to `value`, whole addresses first.
    pub fn redact<'a>(&self, value: &'a str) -> Cow<'a, str> {
        let mut out = Cow::Borrowed(value);
        for re in [&self.email, &self.name].into_iter().flatten() {
            if re.is_match(&out) {
                out = Cow::Owned(re.replace_all(&out, REDACTED).into_owned());
            }
        }
        out
    }
}

fn build_name_pattern(first: Option<&str>, last: Option<&str>) -> anyhow::Result<Option<Regex>> {
    let parts: Vec<String> = [first, last]
        .into_iter()
        .flatten()
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .map(regex::escape)
        .collect();

    if parts.is_empty() {
        return Ok(None);
    }

    Ok(Some(Regex::new(&format!(r"(?i)\b(?:{})\b", parts.join("|")))?))
}

fn build_email_pattern(email: Option<&str>) -> anyhow::Result<Option<Regex>> {
    let Some(email) = email.map(str::trim).filter(|e| !e.is_empty()) else {
        return Ok(None);
    };

    let escaped = regex::escape(email);
    let encoded = regex::escape(&email.replace('@', "%40"));
    Ok(Some(Regex::new(&format!(
        r"(?i)(?:<{escaped}>|{escaped}|{encoded})"
    ))?))
}

/// Replaces one pattern in text nodes, image alt text and link targets.
struct RedactPattern<'a> {
    pattern: &'a Regex,
}

impl Pass for RedactPattern<'_> {
    fn text(&self, text: &str) -> Option<String> {
        self.pattern
            .is_match(text)
            .then(|| self.pattern.replace_all(text, REDACTED).into_owned())
    }

    fn edit_attrs(&self, element: &mut Element) {
        let is_img = element.name() == "img";
        let is_anchor = element.name() == "a";
        let alt_hit = is_img
            && element
                .attr("alt")
                .map(|alt| self.pattern.is_match(alt))
                .unwrap_or(false);

        for (name, value) in element.attrs.iter_mut() {
            let replaced = match &*name.local {
                "alt" if is_img => self.pattern.replace_all(value, REDACTED).into_owned(),
                "href" if is_anchor => self.pattern.replace_all(value, REDACTED).into_owned(),
                "src" if alt_hit => REDACTED.to_string(),
                _ => continue,
            };
            *value = replaced.into();
        }
    }
}

/// Redacts every anchor that is not a job link; job links keep only
/// non-tracking parameters.
struct RedactLinks;

impl Pass for RedactLinks {
    fn edit_attrs(&self, element: &mut Element) {
        if element.name() != "a" {
            return;
        }
        for (name, value) in element.attrs.iter_mut() {
            if &*name.local != "href" {
                continue;
            }
            let replaced = if urls::is_job_link(value) {
                urls::sanitize(value)
            } else {
                REDACTED.to_string()
            };
            *value = replaced.into();
        }
    }
}

/// Remove the owner's address and name from the document, then sweep all
/// non-job links. Passes run in that order, each on a fresh parse.
pub fn redact_pii(html: &str, patterns: &PiiPatterns) -> String {
    let mut html = Cow::Borrowed(html);

    if let Some(pattern) = &patterns.email {
        html = Cow::Owned(rewrite(&html, &RedactPattern { pattern }));
    }
    if let Some(pattern) = &patterns.name {
        html = Cow::Owned(rewrite(&html, &RedactPattern { pattern }));
    }

    rewrite(&html, &RedactLinks)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn patterns() -> PiiPatterns {
        PiiPatterns::from_identity(&Identity {
            first_name: Some("Camille".to_string()),
            last_name: Some("Durand".to_string()),
            email: Some("camille.durand@example.org".to_string()),
        })
        .unwrap()
    }

    #[test]
    fn test_name_pattern_is_word_bounded_and_case_insensitive() {
        let p = patterns();
        assert_eq!(p.redact("Bonjour CAMILLE,"), "Bonjour [REDACTED],");
        assert_eq!(p.redact("Camilleri stays"), "Camilleri stays");
    }

    #[test]
    fn test_email_pattern_matches_all_forms() {
        let p = patterns();
        assert_eq!(
            p.redact("To: <camille.durand@example.org>"),
            "To: [REDACTED]"
        );
        assert_eq!(
            p.redact("u=camille.durand%40example.org&x=1"),
            "u=[REDACTED]&x=1"
        );
    }

    #[test]
    fn test_empty_identity_has_no_patterns() {
        let p = PiiPatterns::from_identity(&Identity::default()).unwrap();
        assert!(p.name.is_none());
        assert!(p.email.is_none());
        assert_eq!(p.redact("Camille"), "Camille");
    }

    #[test]
    fn test_redact_pii_text_alt_and_links() {
        let html = r#"<html><body>
<p>Hello Camille Durand, new jobs for camille.durand@example.org</p>
<img src="https://media.example.com/avatar/123.png" alt="Photo of Camille">
<a href="https://www.indeed.com/rc/clk/dl?jk=abc123&amp;tk=secret">Data Engineer</a>
<a href="https://www.indeed.com/unsubscribe?email=camille.durand%40example.org">Unsubscribe</a>
</body></html>"#;

        let out = redact_pii(html, &patterns());

        assert!(!out.to_lowercase().contains("camille"));
        assert!(!out.contains("Durand"));
        assert!(out.contains("Hello [REDACTED] [REDACTED], new jobs for [REDACTED]</p>"));
        assert!(!out.contains("example.org"));
        assert!(out.contains(r#"alt="Photo of [REDACTED]""#));
        assert!(out.contains(r#"src="[REDACTED]""#));
        assert!(out.contains(r#"href="https://www.indeed.com/rc/clk/dl?jk=abc123&amp;tk=REDACTED""#));
        assert!(out.contains(r#"<a href="[REDACTED]">Unsubscribe</a>"#));
    }

    #[test]
    fn test_redact_pii_without_identity_still_sweeps_links() {
        let html = r#"<a href="https://www.linkedin.com/comm/jobs/alerts">Manage alerts</a>"#;
        let out = redact_pii(html, &PiiPatterns::default());
        assert!(out.contains(r#"<a href="[REDACTED]">Manage alerts</a>"#));
    }
}
