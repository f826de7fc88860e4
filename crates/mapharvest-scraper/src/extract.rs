//! Detail-panel extraction with per-field selector fallback.
//!
//! Each record field walks its own ordered selector chain; the first selector
//! that yields a usable value wins and the rest of the chain is skipped
//! (strict fallback, same semantics as listing discovery). The chains are a
//! data table so markup drift in a new rollout cohort only requires adding
//! an entry.
//!
//! ## What "usable" means per field
//!
//! Plain-text fields take the first *element* the chain finds, even when its
//! text turns out empty: a matched-but-empty node is markup telling us the
//! value is blank, not a reason to try a weaker selector. The reviews and
//! website chains keep walking instead, because an element without a digit
//! run (or without an absolute link) carries no value at all.

use mapharvest_core::{BusinessRecord, EngineConfig};
use regex::Regex;
use thiserror::Error;

use crate::page::PageModel;

/// Extraction failed for this listing; the traversal moves on.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ExtractError {
    /// No selector in the name chain matched, or the matched name was empty.
    /// Name is the only field whose absence is fatal to the record.
    #[error("business name not found")]
    NameNotFound,
}

/// Field-specific post-processing applied to the matched node.
enum Post {
    /// Trimmed text content.
    Text,
    /// Trimmed text with a known label prefix stripped (first occurrence).
    StripLabel(&'static str),
    /// First run of ASCII digits in the text; no digits means the element
    /// carries no value and the chain continues.
    DigitRun,
    /// `href` attribute, required to be an absolute `http(s)` URL; anything
    /// else means the chain continues.
    AbsoluteHref,
}

struct FieldSpec {
    label: &'static str,
    selectors: &'static [&'static str],
    post: Post,
    slot: fn(&mut BusinessRecord) -> &mut String,
}

fn slot_name(r: &mut BusinessRecord) -> &mut String {
    &mut r.name
}
fn slot_category(r: &mut BusinessRecord) -> &mut String {
    &mut r.category
}
fn slot_address(r: &mut BusinessRecord) -> &mut String {
    &mut r.address
}
fn slot_phone(r: &mut BusinessRecord) -> &mut String {
    &mut r.phone
}
fn slot_website(r: &mut BusinessRecord) -> &mut String {
    &mut r.website
}
fn slot_rating(r: &mut BusinessRecord) -> &mut String {
    &mut r.rating
}
fn slot_reviews(r: &mut BusinessRecord) -> &mut String {
    &mut r.reviews
}
fn slot_hours(r: &mut BusinessRecord) -> &mut String {
    &mut r.hours
}

/// Per-field selector chains, mirroring the markup variants observed across
/// rollout cohorts. Order within a chain is strongest-signal first.
const FIELD_SPECS: &[FieldSpec] = &[
    FieldSpec {
        label: "name",
        selectors: &[
            "h1.DUwDvf",
            "h1.fontHeadlineLarge",
            ".DUwDvf",
            r#"h1[jsan*="fontHeadlineLarge"]"#,
        ],
        post: Post::Text,
        slot: slot_name,
    },
    FieldSpec {
        label: "category",
        selectors: &[".DkEaL", r#"button[jsaction*="category"] .fontBodyMedium"#],
        post: Post::Text,
        slot: slot_category,
    },
    FieldSpec {
        label: "address",
        selectors: &[
            r#"button[data-item-id*="address"] .fontBodyMedium"#,
            r#"button[data-tooltip="Copy address"] .fontBodyMedium"#,
            r#"[data-item-id*="address"]"#,
        ],
        post: Post::StripLabel("Address:"),
        slot: slot_address,
    },
    FieldSpec {
        label: "phone",
        selectors: &[
            r#"button[data-item-id*="phone:tel"] .fontBodyMedium"#,
            r#"button[data-tooltip="Copy phone number"] .fontBodyMedium"#,
            r#"[data-item-id*="phone"]"#,
        ],
        post: Post::StripLabel("Phone:"),
        slot: slot_phone,
    },
    FieldSpec {
        label: "website",
        selectors: &[
            r#"a[data-item-id*="authority"]"#,
            r#"a[data-tooltip="Open website"]"#,
            r#"a[href^="http"]"#,
        ],
        post: Post::AbsoluteHref,
        slot: slot_website,
    },
    FieldSpec {
        label: "rating",
        selectors: &["div.fontDisplayLarge", ".F7nice"],
        post: Post::Text,
        slot: slot_rating,
    },
    FieldSpec {
        label: "reviews",
        selectors: &[".HHrUdb", r#"span[aria-label*="review"]"#],
        post: Post::DigitRun,
        slot: slot_reviews,
    },
    FieldSpec {
        label: "hours",
        selectors: &[r#"div[data-item-id*="oh"] .fontBodyMedium"#, r#"[aria-label*="Hours"]"#],
        post: Post::Text,
        slot: slot_hours,
    },
];

/// Reads one [`BusinessRecord`] out of the currently open detail panel.
///
/// Waits the extract settle delay for the panel to populate, then resolves
/// every field through its fallback chain. Fields whose chains match nothing
/// stay empty; a fault while reading a matched node degrades that field to
/// empty rather than propagating.
///
/// # Errors
///
/// Returns [`ExtractError::NameNotFound`] when the name chain yields nothing
/// or an empty string; this is the only fatal field.
pub async fn extract_detail<P: PageModel>(
    page: &P,
    config: &EngineConfig,
) -> Result<BusinessRecord, ExtractError> {
    tokio::time::sleep(config.extract_settle).await;

    let mut record = BusinessRecord::default();
    for spec in FIELD_SPECS {
        if let Some(value) = resolve_field(page, spec) {
            tracing::trace!(field = spec.label, %value, "field resolved");
            *(spec.slot)(&mut record) = value;
        }
    }

    if record.name.is_empty() {
        return Err(ExtractError::NameNotFound);
    }
    Ok(record)
}

/// Walks one field's selector chain and returns its post-processed value.
fn resolve_field<P: PageModel>(page: &P, spec: &FieldSpec) -> Option<String> {
    for selector in spec.selectors {
        let Some(node) = page.query(selector) else {
            continue;
        };
        match spec.post {
            // First matched element wins outright; unreadable nodes degrade
            // to empty text instead of failing the listing.
            Post::Text => {
                return Some(page.text(node).unwrap_or_default().trim().to_owned());
            }
            Post::StripLabel(label) => {
                let text = page.text(node).unwrap_or_default();
                return Some(text.replacen(label, "", 1).trim().to_owned());
            }
            Post::DigitRun => {
                if let Some(digits) =
                    page.text(node).as_deref().and_then(first_digit_run)
                {
                    return Some(digits);
                }
            }
            Post::AbsoluteHref => {
                if let Some(href) = page.attr(node, "href").filter(|h| is_absolute_url(h)) {
                    return Some(href);
                }
            }
        }
    }
    None
}

/// Extracts the first run of ASCII digits that is not a component of a
/// decimal number: `"128 reviews"` yields `"128"`, and so does
/// `"4.5 stars, 128 reviews"`, where both halves of the `4.5` rating are
/// skipped so it never masquerades as a review count.
fn first_digit_run(text: &str) -> Option<String> {
    let re = Regex::new(r"\d+").expect("valid regex");
    let bytes = text.as_bytes();

    for m in re.find_iter(text) {
        let fraction_part = m.start() >= 2
            && bytes[m.start() - 1] == b'.'
            && bytes[m.start() - 2].is_ascii_digit();
        let integer_part = m.end() + 1 < bytes.len()
            && bytes[m.end()] == b'.'
            && bytes[m.end() + 1].is_ascii_digit();
        if !fraction_part && !integer_part {
            return Some(m.as_str().to_owned());
        }
    }
    None
}

fn is_absolute_url(href: &str) -> bool {
    href.starts_with("http://") || href.starts_with("https://")
}

#[cfg(test)]
#[path = "extract_test.rs"]
mod tests;
