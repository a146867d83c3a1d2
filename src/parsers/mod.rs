//! Per-provider parsers for job alert emails.
//!
//! Alert templates are nested presentation tables with no semantic markup,
//! so every selector here is tied to one version of one provider's template.

mod indeed;
mod linkedin;

pub use indeed::IndeedParser;
pub use linkedin::LinkedInParser;

use chrono::{DateTime, Utc};
use scraper::ElementRef;

use crate::models::{Platform, RawJobRecord};

/// Subject terms that mark an alert as relevant. Matched lower-cased.
pub const SUBJECT_KEYWORDS: &[&str] = &["python", "backend", "data", "engineer", "developer", "ai"];

/// The closed set of supported providers.
#[derive(Debug, Clone)]
pub enum Parser {
    Indeed(IndeedParser),
    LinkedIn(LinkedInParser),
}

impl Parser {
    pub fn platform(&self) -> Platform {
        match self {
            Parser::Indeed(_) => Platform::Indeed,
            Parser::LinkedIn(_) => Platform::LinkedIn,
        }
    }

    /// Coarse sender + subject filter; says nothing about parseability.
    pub fn matches(&self, sender: &str, subject: &str) -> bool {
        match self {
            Parser::Indeed(p) => p.matches(sender, subject),
            Parser::LinkedIn(p) => p.matches(sender, subject),
        }
    }

    /// Extract every job block from one email body, in document order.
    pub fn parse(&self, html: &str, received_at: DateTime<Utc>) -> Vec<RawJobRecord> {
        match self {
            Parser::Indeed(p) => p.parse(html, received_at),
            Parser::LinkedIn(p) => p.parse(html, received_at),
        }
    }
}

fn sender_and_subject_match(
    sender: &str,
    subject: &str,
    sender_markers: &[&str],
    keywords: &[&str],
) -> bool {
    let sender = sender.to_lowercase();
    let subject = subject.to_lowercase();

    sender_markers.iter().any(|m| sender.contains(m)) && keywords.iter().any(|kw| subject.contains(kw))
}

/// Text of an element with every text node trimmed and joined by `sep`.
fn element_text(element: ElementRef<'_>, sep: &str) -> String {
    element
        .text()
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .collect::<Vec<_>>()
        .join(sep)
}

fn non_empty(text: String) -> Option<String> {
    if text.is_empty() { None } else { Some(text) }
}

/// The `<tr>` rows belonging to `table` itself, looking through the implicit
/// `<tbody>` the HTML parser inserts, never into nested tables.
fn table_rows(table: ElementRef<'_>) -> Vec<ElementRef<'_>> {
    let mut rows = Vec::new();
    for child in table.children().filter_map(ElementRef::wrap) {
        match child.value().name() {
            "tr" => rows.push(child),
            "thead" | "tbody" | "tfoot" => rows.extend(
                child
                    .children()
                    .filter_map(ElementRef::wrap)
                    .filter(|el| el.value().name() == "tr"),
            ),
            _ => {}
        }
    }
    rows
}

#[cfg(test)]
mod tests {
    use super::*;
    use scraper::{Html, Selector};

    #[test]
    fn test_table_rows_skips_nested_tables() {
        let doc = Html::parse_fragment(
            "<table><tr><td>a<table><tr><td>inner</td></tr></table></td></tr><tr><td>b</td></tr></table>",
        );
        let table = doc.select(&Selector::parse("table").unwrap()).next().unwrap();
        let rows = table_rows(table);
        assert_eq!(rows.len(), 2);
        assert_eq!(element_text(rows[1], " "), "b");
    }

    #[test]
    fn test_element_text_trims_each_node() {
        let doc = Html::parse_fragment("<p>  Acme \n <b> 4.2 </b>  </p>");
        let p = doc.select(&Selector::parse("p").unwrap()).next().unwrap();
        assert_eq!(element_text(p, ""), "Acme4.2");
        assert_eq!(element_text(p, " "), "Acme 4.2");
    }

    #[test]
    fn test_dispatch_platforms() {
        assert_eq!(Parser::Indeed(IndeedParser).platform(), Platform::Indeed);
        assert_eq!(Parser::LinkedIn(LinkedInParser).platform(), Platform::LinkedIn);
    }
}
