use chrono::{DateTime, Duration, Utc};
use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use std::sync::LazyLock;
use tracing::{debug, warn};

use super::{SUBJECT_KEYWORDS, element_text, non_empty, sender_and_subject_match, table_rows};
use crate::models::{Platform, RawJobRecord};

static JOB_LINK: LazyLock<Selector> = LazyLock::new(|| Selector::parse("td.pb-24 > a").unwrap());
static TABLE: LazyLock<Selector> = LazyLock::new(|| Selector::parse("table").unwrap());
static TITLE_LINK: LazyLock<Selector> = LazyLock::new(|| Selector::parse("h2 a").unwrap());
static NESTED_ROW: LazyLock<Selector> = LazyLock::new(|| Selector::parse("table tr").unwrap());
static CELL: LazyLock<Selector> = LazyLock::new(|| Selector::parse("td").unwrap());
static STRONG: LazyLock<Selector> = LazyLock::new(|| Selector::parse("strong").unwrap());
static SALARY: LazyLock<Selector> = LazyLock::new(|| Selector::parse("table[bgcolor]").unwrap());
static EASY_APPLY_ICON: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("img[src*='Plane_primary_whitebg.png']").unwrap());
static RESPONSIVE_EMPLOYER_ICON: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("img[src*='ResponsiveEmployer_whitebg.png']").unwrap());
static POSTED_AT: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("td[style*='font-size:12px']").unwrap());
static FIRST_NUMBER: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\d+").unwrap());

const SENDER_MARKERS: &[&str] = &["indeed", "alert@indeed.com"];

const SUMMARY_MIN_CHARS: usize = 40;

const CURRENCY_SYMBOLS: &[char] = &['€', '$', '£'];
const PAY_PERIOD_MARKERS: &[&str] = &["par", "per"];
const POSTED_MARKERS: &[&str] = &["il y a", "publié", "posted", " ago"];
const POSTED_JUST_NOW: &[&str] = &["publié à l'instant", "posted just now", "just posted"];

/// Parser for Indeed "job alert" digests.
#[derive(Debug, Clone, Default)]
pub struct IndeedParser;

impl IndeedParser {
    pub fn matches(&self, sender: &str, subject: &str) -> bool {
        sender_and_subject_match(sender, subject, SENDER_MARKERS, SUBJECT_KEYWORDS)
    }

    pub fn parse(&self, html: &str, received_at: DateTime<Utc>) -> Vec<RawJobRecord> {
        let document = Html::parse_document(html);
        let mut jobs = Vec::new();

        for (index, link) in document.select(&JOB_LINK).enumerate() {
            match parse_block(link, received_at) {
                Some(job) => jobs.push(job),
                None => debug!(index, "Skipping Indeed block without a title"),
            }
        }

        jobs
    }
}

/// One job block: the anchor wraps a table whose own rows are, in order,
/// title, company (+ rating), location, then optional salary, flags,
/// summary and posting date.
fn parse_block(link: ElementRef<'_>, received_at: DateTime<Utc>) -> Option<RawJobRecord> {
    let container = link.select(&TABLE).next()?;
    let rows = table_rows(container);

    let title_link = rows.first()?.select(&TITLE_LINK).next()?;
    let title = non_empty(element_text(title_link, ""))?;
    let raw_url = title_link.value().attr("href").unwrap_or_default().trim().to_string();

    let mut job = RawJobRecord::new(Platform::Indeed, title, raw_url);

    if let Some(company_row) = rows.get(1) {
        let (company, rating) = company_and_rating(*company_row);
        job.company = company;
        job.rating = rating;
    }

    job.location = rows.get(2).and_then(|row| non_empty(element_text(*row, "")));

    job.salary = container
        .select(&SALARY)
        .next()
        .and_then(|table| non_empty(element_text(table, "")));

    job.easy_apply = Some(container.select(&EASY_APPLY_ICON).next().is_some());
    // Indeed's "responsive employer" badge plays the role of LinkedIn's
    // "actively recruiting".
    job.active_hiring = Some(container.select(&RESPONSIVE_EMPLOYER_ICON).next().is_some());

    job.summary = find_summary(&rows, &job.title);

    job.posted_at = container
        .select(&POSTED_AT)
        .next()
        .map(|cell| element_text(cell, ""))
        .filter(|text| !text.is_empty())
        .and_then(|text| parse_posted_at(&text, received_at));

    Some(job)
}

fn company_and_rating(row: ElementRef<'_>) -> (Option<String>, Option<f64>) {
    let Some(nested) = row.select(&NESTED_ROW).next() else {
        return (None, None);
    };
    let cells: Vec<ElementRef<'_>> = nested.select(&CELL).collect();

    let company = cells.first().and_then(|cell| non_empty(element_text(*cell, "")));
    let rating = cells
        .iter()
        .filter_map(|cell| cell.select(&STRONG).next())
        .filter_map(|strong| element_text(strong, "").parse::<f64>().ok())
        .last();

    (company, rating)
}

/// First row with more than 40 characters that is not the title, a salary
/// line or a "posted N days ago" line.
fn find_summary(rows: &[ElementRef<'_>], title: &str) -> Option<String> {
    rows.iter()
        .map(|row| element_text(*row, " "))
        .filter(|text| text.chars().count() > SUMMARY_MIN_CHARS)
        .find(|text| {
            let lower = text.to_lowercase();
            !(text.starts_with(title) || is_salary_line(&lower) || is_posted_line(&lower))
        })
}

fn is_salary_line(lower: &str) -> bool {
    lower.contains(CURRENCY_SYMBOLS) && PAY_PERIOD_MARKERS.iter().any(|m| lower.contains(m))
}

fn is_posted_line(lower: &str) -> bool {
    POSTED_MARKERS.iter().any(|m| lower.contains(m))
}

/// Resolve "posted N days ago" text against the email's receipt time.
pub(crate) fn parse_posted_at(text: &str, received_at: DateTime<Utc>) -> Option<DateTime<Utc>> {
    let normalized = text
        .replace('\u{a0}', " ")
        .replace('\u{2019}', "'")
        .to_lowercase();

    if POSTED_JUST_NOW.iter().any(|p| normalized.contains(p)) {
        return Some(received_at);
    }

    match FIRST_NUMBER
        .find(&normalized)
        .and_then(|m| m.as_str().parse::<i64>().ok())
    {
        Some(days) => {
            let posted_at =
                Duration::try_days(days).and_then(|d| received_at.checked_sub_signed(d));
            if posted_at.is_none() {
                warn!(text = %text, days, "Indeed posted_at is out of range");
            }
            posted_at
        }
        None => {
            warn!(text = %text, "Could not parse Indeed posted_at text");
            None
        }
    }
}
