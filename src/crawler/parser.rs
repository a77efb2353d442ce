//! HTML parse collaborator
//!
//! Thin wrapper over `scraper` that answers the queries the extractor needs through compiled
//! selectors. A [`ParsedDocument`] is not `Send`; it is built and dropped inside synchronous code
//! and never held across an `.await`.

use scraper::{ElementRef, Html, Selector};

/// A parsed HTML document
pub struct ParsedDocument {
    html: Html,
}

impl ParsedDocument {
    /// Parses an HTML document; malformed markup is recovered, never rejected
    pub fn parse(body: &str) -> Self {
        Self {
            html: Html::parse_document(body),
        }
    }

    /// Text of the first element matching `selector` with non-empty text
    pub fn first_text(&self, selector: &Selector) -> Option<String> {
        self.html
            .select(selector)
            .map(element_text)
            .find(|text| !text.is_empty())
    }

    /// Non-empty texts of every element matching `selector`, in document order
    pub fn all_texts(&self, selector: &Selector) -> Vec<String> {
        self.html
            .select(selector)
            .map(element_text)
            .filter(|text| !text.is_empty())
            .collect()
    }

    /// `href` values of every element matching `selector`
    ///
    /// Elements carrying the `download` attribute are skipped.
    pub fn hrefs(&self, selector: &Selector) -> Vec<String> {
        self.html
            .select(selector)
            .filter(|element| element.value().attr("download").is_none())
            .filter_map(|element| element.value().attr("href"))
            .map(|href| href.trim().to_string())
            .filter(|href| !href.is_empty())
            .collect()
    }
}

/// Collects an element's text with whitespace runs collapsed
fn element_text(element: ElementRef<'_>) -> String {
    element
        .text()
        .flat_map(str::split_whitespace)
        .collect::<Vec<_>>()
        .join(" ")
}
