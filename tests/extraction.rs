use chrono::{DateTime, Duration, TimeZone, Utc};
use std::collections::BTreeMap;

use jobmail::parsers::{IndeedParser, LinkedInParser};
use jobmail::sanitize::{PiiPatterns, redact_pii, strip_structure};
use jobmail::db::Database;
use jobmail::{FetchedEmail, IngestionService, JobExtractionService, Platform};

const INDEED_ALERT: &str = include_str!("fixtures/indeed/alert_30_jobs.html");
const LINKEDIN_DIGEST: &str = include_str!("fixtures/linkedin/alert_digest.html");

fn received() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 12, 14, 23, 10, 4).unwrap()
}

fn fetched(uid: u32, sender: &str, subject: &str, html: &str) -> FetchedEmail {
    FetchedEmail {
        uid,
        sender: sender.to_string(),
        subject: subject.to_string(),
        received_at: received(),
        html: html.to_string(),
        headers: BTreeMap::new(),
    }
}

#[test]
fn indeed_alert_yields_every_block() {
    let jobs = IndeedParser.parse(INDEED_ALERT, received());

    assert_eq!(jobs.len(), 30);
    for job in &jobs {
        assert_eq!(job.platform, Platform::Indeed);
        assert!(!job.title.is_empty());
        assert!(job.company.as_deref().is_some_and(|c| !c.is_empty()));
        assert!(job.location.as_deref().is_some_and(|l| !l.is_empty()));
        assert!(job.raw_url.starts_with("http"));
        assert!(job.job_key().is_some());
    }
}

#[test]
fn indeed_alert_fields_follow_template_rows() {
    let jobs = IndeedParser.parse(INDEED_ALERT, received());

    let first = &jobs[0];
    assert_eq!(first.title, "Data Engineer H/F");
    assert_eq!(first.company.as_deref(), Some("Acme Analytics"));
    assert_eq!(first.rating, Some(3.5));
    assert_eq!(first.location.as_deref(), Some("Paris (75)"));
    assert_eq!(first.salary.as_deref(), Some("40 000 € - 50 000 € par an"));
    assert_eq!(first.easy_apply, Some(true));
    assert_eq!(first.active_hiring, Some(true));
    assert_eq!(
        first.summary.as_deref(),
        Some("Vous concevrez et maintiendrez nos pipelines de données en Python et SQL sur une stack moderne.")
    );
    assert_eq!(first.posted_at, Some(received() - Duration::days(3)));
    assert_eq!(first.job_key(), Some("5f1e2d3c4b5a0000"));
    assert_eq!(first.canonical_url(), Some("https://indeed.com/viewjob?jk=5f1e2d3c4b5a0000"));

    let second = &jobs[1];
    assert_eq!(second.company.as_deref(), Some("Globex"));
    assert_eq!(second.location.as_deref(), Some("Télétravail"));
    assert_eq!(second.rating, Some(3.6));
    assert_eq!(second.salary, None);
    assert_eq!(second.easy_apply, Some(false));
    assert_eq!(second.active_hiring, Some(false));
    // "Publié à l’instant"
    assert_eq!(second.posted_at, Some(received()));

    assert_eq!(jobs[3].posted_at, Some(received() - Duration::days(30)));

    let sixth = &jobs[5];
    assert_eq!(sixth.rating, None);
    assert_eq!(sixth.summary, None);
    assert_eq!(sixth.active_hiring, Some(true));
}

#[test]
fn posted_at_never_after_receipt() {
    for job in IndeedParser.parse(INDEED_ALERT, received()) {
        if let Some(posted_at) = job.posted_at {
            assert!(posted_at <= received(), "{} posted after receipt", job.title);
        }
    }
}

#[test]
fn linkedin_digest_cards() {
    let jobs = LinkedInParser.parse(LINKEDIN_DIGEST, received());

    // The card without a link is dropped; nav links outside cards are ignored.
    let titles: Vec<_> = jobs.iter().map(|j| j.title.as_str()).collect();
    assert_eq!(
        titles,
        vec!["Data Engineer", "Développeur Python Backend", "Machine Learning Engineer", "AI Engineer"]
    );

    assert_eq!(jobs[0].company.as_deref(), Some("Acme"));
    assert_eq!(jobs[0].location.as_deref(), Some("Paris, Île-de-France, France"));
    assert_eq!((jobs[0].active_hiring, jobs[0].easy_apply), (Some(true), Some(true)));
    assert_eq!(jobs[0].job_key(), Some("4012345678"));

    assert_eq!((jobs[1].active_hiring, jobs[1].easy_apply), (Some(true), None));

    assert_eq!(jobs[2].company.as_deref(), Some("Initech"));
    assert_eq!(jobs[2].location, None);
    assert_eq!((jobs[2].active_hiring, jobs[2].easy_apply), (None, Some(true)));

    assert_eq!(jobs[3].location.as_deref(), Some("Télétravail"));
    assert_eq!(
        jobs[3].canonical_url(),
        Some("https://www.linkedin.com/jobs/view/4012345681")
    );
}

#[test]
fn batch_keeps_email_then_document_order() {
    let service = JobExtractionService::new();
    let emails = vec![
        fetched(
            101,
            "Indeed <alert@indeed.com>",
            "30 nouveaux emplois data engineer",
            INDEED_ALERT,
        ),
        fetched(102, "news@example.com", "Weekly newsletter", "<p>nothing to see</p>"),
        // Claimed by Indeed but not an alert layout at all.
        fetched(103, "Indeed <alert@indeed.com>", "Python developer", "<html><body><p>Broken</p></body></html>"),
        fetched(
            104,
            "LinkedIn Job Alerts <jobalerts-noreply@linkedin.com>",
            "« python developer » : 5 nouvelles offres",
            LINKEDIN_DIGEST,
        ),
    ];

    let jobs = service.extract_jobs(&emails).unwrap();
    assert_eq!(jobs.len(), 34);

    let uids: Vec<u32> = jobs.iter().map(|j| j.source.as_ref().unwrap().uid).collect();
    assert!(uids[..30].iter().all(|uid| *uid == 101));
    assert!(uids[30..].iter().all(|uid| *uid == 104));

    assert_eq!(jobs[0].title, "Data Engineer H/F");
    assert_eq!(jobs[30].title, "Data Engineer");
    assert_eq!(jobs[30].source.as_ref().unwrap().platform, Platform::LinkedIn);
}

#[test]
fn unmatched_batch_is_empty() {
    let service = JobExtractionService::new();
    let emails = vec![
        fetched(1, "Indeed <alert@indeed.com>", "Votre candidature a été envoyée", INDEED_ALERT),
        fetched(2, "billing@example.com", "Data engineer invoice", LINKEDIN_DIGEST),
    ];
    assert!(service.extract_jobs(&emails).unwrap().is_empty());
}

#[test]
fn sanitized_fixture_parses_to_the_same_jobs() {
    let raw = IndeedParser.parse(INDEED_ALERT, received());

    let cleaned = redact_pii(&strip_structure(INDEED_ALERT), &PiiPatterns::default());
    assert!(!cleaned.contains("<style"));
    assert!(!cleaned.contains("rpc/log/open"));
    assert!(!cleaned.contains("unsubscribe"));
    assert!(!cleaned.contains("tk=1ie"));

    let reparsed = IndeedParser.parse(&cleaned, received());
    assert_eq!(reparsed.len(), raw.len());
    for (before, after) in raw.iter().zip(&reparsed) {
        assert_eq!(before.title, after.title);
        assert_eq!(before.canonical, after.canonical);
        assert_eq!(before.company, after.company);
        assert_eq!(before.summary, after.summary);
        assert_eq!(before.posted_at, after.posted_at);
        assert!(after.raw_url.contains("tk=REDACTED"));
    }
}

#[test]
fn sanitized_linkedin_digest_keeps_cards() {
    let cleaned = redact_pii(&strip_structure(LINKEDIN_DIGEST), &PiiPatterns::default());
    assert!(!cleaned.contains("emimp"));
    assert!(!cleaned.contains("trackingId=dGVzdA"));

    let jobs = LinkedInParser.parse(&cleaned, received());
    assert_eq!(jobs.len(), 4);
    assert_eq!(jobs[0].job_key(), Some("4012345678"));
    assert!(jobs[0].raw_url.contains("trackingId=REDACTED"));
}

#[test]
fn second_run_over_same_mail_adds_nothing() {
    let db = Database::open_in_memory().unwrap();
    let service = JobExtractionService::new();
    let emails = vec![
        fetched(201, "Indeed <alert@indeed.com>", "Data engineer : 30 nouvelles offres", INDEED_ALERT),
        fetched(202, "jobalerts-noreply@linkedin.com", "Python developer", LINKEDIN_DIGEST),
    ];

    let jobs = service.extract_jobs(&emails).unwrap();
    let (stats, created) = IngestionService::new(&db).ingest_all(&jobs).unwrap();
    assert_eq!((stats.seen, stats.created, stats.duplicates), (34, 34, 0));
    assert_eq!(created[0].source_email_id.as_deref(), Some("201"));

    let (stats, _) = IngestionService::new(&db).ingest_all(&jobs).unwrap();
    assert_eq!((stats.created, stats.duplicates), (0, 34));

    assert_eq!(db.list_postings(Some(Platform::LinkedIn)).unwrap().len(), 4);
    assert_eq!(db.list_postings(None).unwrap().len(), 34);
}
