use scraper::node::Element;

use super::{Pass, rewrite};

const DROPPED_TAGS: &[&str] = &["style", "script", "noscript", "meta"];

const PIXEL_SIZES: &[&str] = &["0", "1", "0px", "1px"];

struct StripStructure;

impl Pass for StripStructure {
    fn drop_element(&self, element: &Element) -> bool {
        let name = element.name();
        DROPPED_TAGS.contains(&name)
            || ((name == "div" || name == "span") && is_hidden(element))
            || (name == "img" && is_tracking_pixel(element))
    }

    // Outlook conditionals and every other comment go.
    fn drop_comment(&self) -> bool {
        true
    }
}

fn is_hidden(element: &Element) -> bool {
    let style: String = element
        .attr("style")
        .unwrap_or_default()
        .chars()
        .filter(|c| !c.is_whitespace())
        .collect::<String>()
        .to_lowercase();
    style.contains("display:none") || style.contains("max-height:0")
}

fn is_tracking_pixel(element: &Element) -> bool {
    ["width", "height"].iter().any(|attr| {
        element
            .attr(attr)
            .map(|v| PIXEL_SIZES.contains(&v.trim()))
            .unwrap_or(false)
    })
}

/// Drop style blocks, comments, hidden preheaders, tracking pixels, meta,
/// script and noscript tags.
pub fn strip_structure(html: &str) -> String {
    rewrite(html, &StripStructure)
}
