//! Fixture sanitization: structural cleanup and PII redaction of alert
//! emails before they are written to disk.
//!
//! Every pass takes HTML text in and returns new HTML text. The document is
//! re-parsed for each pass, so no pass ever observes another pass's
//! half-applied edits.

mod headers;
mod pii;
mod structural;

pub use headers::{redact_headers, whitelist_headers};
pub use pii::{PiiPatterns, redact_pii};
pub use structural::strip_structure;

use scraper::node::Element;
use scraper::{Html, Node};

pub const REDACTED: &str = "[REDACTED]";

/// One rewriting pass over a parsed document.
trait Pass {
    fn drop_element(&self, _element: &Element) -> bool {
        false
    }

    fn drop_comment(&self) -> bool {
        false
    }

    /// Replacement for a text node, `None` to leave it as is.
    fn text(&self, _text: &str) -> Option<String> {
        None
    }

    fn edit_attrs(&self, _element: &mut Element) {}
}

/// Parse `html`, apply `pass` to every node and serialize the result.
fn rewrite(html: &str, pass: &dyn Pass) -> String {
    let mut document = Html::parse_document(html);
    let ids: Vec<_> = document.tree.root().descendants().map(|node| node.id()).collect();

    let mut dropped = Vec::new();
    for id in ids {
        let Some(mut node) = document.tree.get_mut(id) else {
            continue;
        };
        match node.value() {
            Node::Element(element) => {
                if pass.drop_element(element) {
                    dropped.push(id);
                } else {
                    pass.edit_attrs(element);
                }
            }
            Node::Comment(_) if pass.drop_comment() => dropped.push(id),
            Node::Text(text) => {
                if let Some(replaced) = pass.text(&text.text) {
                    text.text = replaced.into();
                }
            }
            _ => {}
        }
    }

    for id in dropped {
        if let Some(mut node) = document.tree.get_mut(id) {
            node.detach();
        }
    }

    document.html()
}
