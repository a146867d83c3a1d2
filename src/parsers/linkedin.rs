use chrono::{DateTime, Utc};
use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use std::sync::LazyLock;
use tracing::debug;

use super::{SUBJECT_KEYWORDS, element_text, non_empty, sender_and_subject_match};
use crate::models::{Platform, RawJobRecord};

static JOB_CARD: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("td.pt-3[data-test-id='job-card']").unwrap());
static TITLE_LINK: LazyLock<Selector> = LazyLock::new(|| Selector::parse("a.font-bold").unwrap());
static COMPANY_LOCATION: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("p.text-system-gray-100").unwrap());
static ACTIVELY_RECRUITING: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)(Recrutement actif|Actively recruiting)").unwrap());
static EASY_APPLY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)(Candidature simplifiée|Easy Apply)").unwrap());

const SENDER_MARKERS: &[&str] = &["linkedin", "jobalerts-noreply@linkedin.com"];

const COMPANY_LOCATION_SEPARATOR: char = '·';

/// Parser for LinkedIn "job alert" digests.
#[derive(Debug, Clone, Default)]
pub struct LinkedInParser;

impl LinkedInParser {
    pub fn matches(&self, sender: &str, subject: &str) -> bool {
        sender_and_subject_match(sender, subject, SENDER_MARKERS, SUBJECT_KEYWORDS)
    }

    /// LinkedIn digests carry no posting date, so `received_at` is unused.
    pub fn parse(&self, html: &str, _received_at: DateTime<Utc>) -> Vec<RawJobRecord> {
        let document = Html::parse_document(html);
        let mut jobs = Vec::new();

        for (index, card) in document.select(&JOB_CARD).enumerate() {
            match parse_card(card) {
                Some(job) => jobs.push(job),
                None => debug!(index, "Skipping LinkedIn card without title or link"),
            }
        }

        jobs
    }
}

fn parse_card(card: ElementRef<'_>) -> Option<RawJobRecord> {
    let title_link = card.select(&TITLE_LINK).next()?;

    let raw_url = title_link
        .value()
        .attr("href")
        .map(str::trim)
        .filter(|href| !href.is_empty())?
        .to_string();
    let title = non_empty(element_text(title_link, ""))?;

    let mut job = RawJobRecord::new(Platform::LinkedIn, title, raw_url);

    if let Some(paragraph) = company_location_after(card, title_link) {
        let (company, location) = split_company_location(&element_text(paragraph, " "));
        job.company = company;
        job.location = location;
    }

    // Presence only: a missing marker means "not observed", not "false".
    job.active_hiring = card_mentions(card, &ACTIVELY_RECRUITING).then_some(true);
    job.easy_apply = card_mentions(card, &EASY_APPLY).then_some(true);

    Some(job)
}

/// The first gray-text paragraph following the title link inside the card.
fn company_location_after<'a>(card: ElementRef<'a>, title_link: ElementRef<'a>) -> Option<ElementRef<'a>> {
    let mut past_title = false;
    for node in card.descendants() {
        if node.id() == title_link.id() {
            past_title = true;
            continue;
        }
        if !past_title {
            continue;
        }
        if let Some(element) = ElementRef::wrap(node) {
            if COMPANY_LOCATION.matches(&element) {
                return Some(element);
            }
        }
    }
    None
}

/// "Company · Location", or the whole text as the company when there is no
/// separator.
fn split_company_location(text: &str) -> (Option<String>, Option<String>) {
    match text.split_once(COMPANY_LOCATION_SEPARATOR) {
        Some((company, location)) => (
            non_empty(company.trim().to_string()),
            non_empty(location.trim().to_string()),
        ),
        None => (non_empty(text.trim().to_string()), None),
    }
}

fn card_mentions(card: ElementRef<'_>, marker: &Regex) -> bool {
    card.text().any(|text| marker.is_match(text))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn card(href: Option<&str>, title: &str, company_loc: &str, extra: &str) -> String {
        let href = href.map(|h| format!(r#" href="{h}""#)).unwrap_or_default();
        format!(
            r#"<tr><td class="pt-3" data-test-id="job-card"><table role="presentation"><tr><td>
<a{href} class="font-bold text-md leading-regular text-color-text">{title}</a>
<p class="text-system-gray-100 text-xs leading-regular mt-0.5">{company_loc}</p>
{extra}
</td></tr></table></td></tr>"#
        )
    }

    fn email(cards: &[String]) -> String {
        format!("<html><body><table>{}</table></body></html>", cards.concat())
    }

    fn received() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 11, 3, 7, 0, 0).unwrap()
    }

    #[test]
    fn test_matches_sender_and_subject() {
        let parser = LinkedInParser;
        assert!(parser.matches(
            "Alertes LinkedIn Job <jobalerts-noreply@linkedin.com>",
            "« python developer » : 5 nouvelles offres"
        ));
        assert!(!parser.matches("LinkedIn <messages-noreply@linkedin.com>", "Vous avez 3 nouvelles invitations"));
        assert!(!parser.matches("Indeed <alert@indeed.com>", "python developer"));
    }

    #[test]
    fn test_company_and_location_split_on_middle_dot() {
        let html = email(&[card(
            Some("https://www.linkedin.com/comm/jobs/view/4012345678/?trackingId=abc&amp;refId=def"),
            "Backend Engineer",
            "Company · Paris",
            "",
        )]);

        let jobs = LinkedInParser.parse(&html, received());
        assert_eq!(jobs.len(), 1);
        let job = &jobs[0];
        assert_eq!(job.platform, Platform::LinkedIn);
        assert_eq!(job.title, "Backend Engineer");
        assert_eq!(job.company.as_deref(), Some("Company"));
        assert_eq!(job.location.as_deref(), Some("Paris"));
        assert_eq!(job.job_key(), Some("4012345678"));
        assert_eq!(job.canonical_url(), Some("https://www.linkedin.com/jobs/view/4012345678"));
        assert_eq!(job.posted_at, None);
    }

    #[test]
    fn test_company_only_without_separator() {
        let html = email(&[card(
            Some("https://www.linkedin.com/comm/jobs/view/1/"),
            "Data Engineer",
            "Acme Corp",
            "",
        )]);
        let job = &LinkedInParser.parse(&html, received())[0];
        assert_eq!(job.company.as_deref(), Some("Acme Corp"));
        assert_eq!(job.location, None);
    }

    #[test]
    fn test_flags_are_presence_only() {
        let html = email(&[
            card(
                Some("https://www.linkedin.com/comm/jobs/view/10/"),
                "AI Engineer",
                "Globex · Lyon",
                r#"<p class="text-system-gray-70">Recrutement actif</p><span>Candidature simplifiée</span>"#,
            ),
            card(
                Some("https://www.linkedin.com/comm/jobs/view/11/"),
                "ML Engineer",
                "Initech · Remote",
                "<p>EASY APPLY</p>",
            ),
            card(Some("https://www.linkedin.com/comm/jobs/view/12/"), "Data Analyst", "Hooli · Nantes", ""),
        ]);

        let jobs = LinkedInParser.parse(&html, received());
        assert_eq!(jobs.len(), 3);
        assert_eq!((jobs[0].active_hiring, jobs[0].easy_apply), (Some(true), Some(true)));
        assert_eq!((jobs[1].active_hiring, jobs[1].easy_apply), (None, Some(true)));
        assert_eq!((jobs[2].active_hiring, jobs[2].easy_apply), (None, None));
    }

    #[test]
    fn test_card_without_href_or_title_is_skipped() {
        let html = email(&[
            card(None, "No Link Engineer", "Acme · Paris", ""),
            card(Some("https://www.linkedin.com/comm/jobs/view/20/"), "", "Acme · Paris", ""),
            card(Some("https://www.linkedin.com/comm/jobs/view/21/"), "Python Developer", "Acme · Paris", ""),
        ]);

        let jobs = LinkedInParser.parse(&html, received());
        assert_eq!(jobs.len(), 1);
        assert_eq!(jobs[0].title, "Python Developer");
    }

    #[test]
    fn test_non_job_link_keeps_raw_url_only() {
        let html = email(&[card(
            Some("https://www.linkedin.com/comm/company/acme"),
            "Data Engineer",
            "Acme · Paris",
            "",
        )]);
        let job = &LinkedInParser.parse(&html, received())[0];
        assert_eq!(job.raw_url, "https://www.linkedin.com/comm/company/acme");
        assert!(job.canonical.is_none());
    }

    #[test]
    fn test_split_company_location() {
        assert_eq!(
            split_company_location("SandboxAQ · United States (Remote)"),
            (Some("SandboxAQ".to_string()), Some("United States (Remote)".to_string()))
        );
        assert_eq!(split_company_location(""), (None, None));
    }
}
