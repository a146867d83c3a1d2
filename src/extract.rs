use std::collections::HashSet;
use tracing::{debug, info};

use crate::error::ExtractError;
use crate::fixtures::FixtureWriter;
use crate::models::{FetchedEmail, RawJobRecord, Source};
use crate::parsers::{IndeedParser, LinkedInParser, Parser};

/// Matches each fetched email to a provider parser and collects the jobs.
pub struct JobExtractionService {
    parsers: Vec<Parser>,
    fixtures: Option<FixtureWriter>,
}

impl Default for JobExtractionService {
    fn default() -> Self {
        Self::new()
    }
}

impl JobExtractionService {
    pub fn new() -> Self {
        Self {
            // Priority order: the first parser that matches wins.
            parsers: vec![
                Parser::LinkedIn(LinkedInParser),
                Parser::Indeed(IndeedParser),
            ],
            fixtures: None,
        }
    }

    /// Also write a sanitized fixture for every claimed email.
    pub fn with_fixtures(mut self, writer: FixtureWriter) -> Self {
        self.fixtures = Some(writer);
        self
    }

    pub fn match_parser(&self, sender: &str, subject: &str) -> Option<&Parser> {
        self.parsers.iter().find(|p| p.matches(sender, subject))
    }

    /// Extract jobs from a batch, in email order then document order.
    ///
    /// Emails no parser claims are skipped. Only a batch that breaks the
    /// fetcher contract is an error.
    pub fn extract_jobs(&self, emails: &[FetchedEmail]) -> Result<Vec<RawJobRecord>, ExtractError> {
        validate_batch(emails)?;

        let mut jobs = Vec::new();
        let mut claimed = 0;

        for email in emails {
            let Some(parser) = self.match_parser(&email.sender, &email.subject) else {
                debug!(uid = email.uid, subject = %email.subject, "No parser for email");
                continue;
            };
            claimed += 1;

            let platform = parser.platform();
            let mut parsed = parser.parse(&email.html, email.received_at);
            for job in &mut parsed {
                job.source = Some(Source {
                    uid: email.uid,
                    platform,
                    subject: email.subject.clone(),
                    sender: email.sender.clone(),
                });
            }
            debug!(uid = email.uid, %platform, jobs = parsed.len(), "Parsed alert email");

            if let Some(writer) = &self.fixtures {
                writer.write_best_effort(platform, email, &parsed);
            }

            jobs.extend(parsed);
        }

        info!(
            emails = emails.len(),
            claimed,
            jobs = jobs.len(),
            "Extraction finished"
        );
        Ok(jobs)
    }
}

fn validate_batch(emails: &[FetchedEmail]) -> Result<(), ExtractError> {
    let mut seen = HashSet::new();
    for email in emails {
        if !seen.insert(email.uid) {
            return Err(ExtractError::InvalidBatch(format!("duplicate uid {}", email.uid)));
        }
        if email.html.trim().is_empty() {
            return Err(ExtractError::InvalidBatch(format!("email {} has no HTML body", email.uid)));
        }
    }
    Ok(())
}
