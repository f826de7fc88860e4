use std::collections::BTreeMap;

use mapharvest_core::EngineConfig;

use super::{extract_detail, first_digit_run, ExtractError};
use crate::page::PageModel;
use crate::scripted::{DetailNode, ListingScript, PageScript, ScriptedPage};

fn text_node(text: &str) -> DetailNode {
    DetailNode {
        text: text.to_owned(),
        ..DetailNode::default()
    }
}

fn link_node(href: &str) -> DetailNode {
    let mut attrs = BTreeMap::new();
    attrs.insert("href".to_owned(), href.to_owned());
    DetailNode {
        text: String::new(),
        attrs,
    }
}

/// Builds a page with one listing carrying `detail` and opens its panel.
fn open_panel(detail: BTreeMap<String, DetailNode>) -> ScriptedPage {
    let mut page = ScriptedPage::new(PageScript {
        listings: vec![ListingScript {
            matches: vec![r#"div[role="article"]"#.to_owned()],
            has_place_link: false,
            detail,
        }],
        ..PageScript::default()
    });
    let container = page.query(r#"div[role="article"]"#).unwrap();
    page.click(container).unwrap();
    page
}

fn cfg() -> EngineConfig {
    EngineConfig::immediate()
}

// ---------------------------------------------------------------------------
// Whole-record extraction
// ---------------------------------------------------------------------------

#[tokio::test]
async fn extracts_all_fields_through_primary_selectors() {
    let mut detail = BTreeMap::new();
    detail.insert("h1.DUwDvf".to_owned(), text_node("Blue Bottle Coffee"));
    detail.insert(".DkEaL".to_owned(), text_node("Coffee shop"));
    detail.insert(
        r#"button[data-item-id*="address"] .fontBodyMedium"#.to_owned(),
        text_node("Address: 123 Main St"),
    );
    detail.insert(
        r#"button[data-item-id*="phone:tel"] .fontBodyMedium"#.to_owned(),
        text_node("Phone: (555) 010-2030"),
    );
    detail.insert(
        r#"a[data-item-id*="authority"]"#.to_owned(),
        link_node("https://bluebottle.example"),
    );
    detail.insert("div.fontDisplayLarge".to_owned(), text_node("4.5"));
    detail.insert(".HHrUdb".to_owned(), text_node("128 reviews"));
    detail.insert(
        r#"div[data-item-id*="oh"] .fontBodyMedium"#.to_owned(),
        text_node("Open until 6 pm"),
    );

    let page = open_panel(detail);
    let record = extract_detail(&page, &cfg()).await.unwrap();

    assert_eq!(record.name, "Blue Bottle Coffee");
    assert_eq!(record.category, "Coffee shop");
    assert_eq!(record.address, "123 Main St");
    assert_eq!(record.phone, "(555) 010-2030");
    assert_eq!(record.website, "https://bluebottle.example");
    assert_eq!(record.rating, "4.5");
    assert_eq!(record.reviews, "128");
    assert_eq!(record.hours, "Open until 6 pm");
}

#[tokio::test]
async fn missing_name_fails_the_extraction() {
    let mut detail = BTreeMap::new();
    detail.insert(".DkEaL".to_owned(), text_node("Bakery"));
    let page = open_panel(detail);

    let err = extract_detail(&page, &cfg()).await.unwrap_err();
    assert_eq!(err, ExtractError::NameNotFound);
}

#[tokio::test]
async fn matched_but_empty_name_fails_the_extraction() {
    let mut detail = BTreeMap::new();
    detail.insert("h1.DUwDvf".to_owned(), text_node("   "));
    let page = open_panel(detail);

    let err = extract_detail(&page, &cfg()).await.unwrap_err();
    assert_eq!(err, ExtractError::NameNotFound);
}

#[tokio::test]
async fn other_fields_default_to_empty_when_absent() {
    let mut detail = BTreeMap::new();
    detail.insert("h1.DUwDvf".to_owned(), text_node("Name Only"));
    let page = open_panel(detail);

    let record = extract_detail(&page, &cfg()).await.unwrap();
    assert_eq!(record.name, "Name Only");
    assert_eq!(record.address, "");
    assert_eq!(record.phone, "");
    assert_eq!(record.website, "");
    assert_eq!(record.rating, "");
    assert_eq!(record.reviews, "");
    assert_eq!(record.category, "");
    assert_eq!(record.hours, "");
}

// ---------------------------------------------------------------------------
// Chain fallback order
// ---------------------------------------------------------------------------

#[tokio::test]
async fn name_falls_back_down_its_chain() {
    let mut detail = BTreeMap::new();
    detail.insert(".DUwDvf".to_owned(), text_node("Fallback Name"));
    let page = open_panel(detail);

    let record = extract_detail(&page, &cfg()).await.unwrap();
    assert_eq!(record.name, "Fallback Name");
}

#[tokio::test]
async fn first_matching_text_selector_wins_even_when_weaker_also_matches() {
    let mut detail = BTreeMap::new();
    detail.insert("h1.DUwDvf".to_owned(), text_node("Primary"));
    detail.insert(".DUwDvf".to_owned(), text_node("Secondary"));
    let page = open_panel(detail);

    let record = extract_detail(&page, &cfg()).await.unwrap();
    assert_eq!(record.name, "Primary");
}

#[tokio::test]
async fn address_falls_back_to_bare_item_id_selector() {
    let mut detail = BTreeMap::new();
    detail.insert("h1.DUwDvf".to_owned(), text_node("Somewhere"));
    detail.insert(
        r#"[data-item-id*="address"]"#.to_owned(),
        text_node("Address: 9 Side Rd"),
    );
    let page = open_panel(detail);

    let record = extract_detail(&page, &cfg()).await.unwrap();
    assert_eq!(record.address, "9 Side Rd");
}

// ---------------------------------------------------------------------------
// Field post-processing
// ---------------------------------------------------------------------------

#[tokio::test]
async fn phone_label_prefix_is_stripped() {
    let mut detail = BTreeMap::new();
    detail.insert("h1.DUwDvf".to_owned(), text_node("Callable"));
    detail.insert(
        r#"button[data-item-id*="phone:tel"] .fontBodyMedium"#.to_owned(),
        text_node("Phone: 555-0101"),
    );
    let page = open_panel(detail);

    let record = extract_detail(&page, &cfg()).await.unwrap();
    assert_eq!(record.phone, "555-0101");
}

#[tokio::test]
async fn reviews_skip_the_rating_decimal() {
    let mut detail = BTreeMap::new();
    detail.insert("h1.DUwDvf".to_owned(), text_node("Rated Place"));
    detail.insert(".HHrUdb".to_owned(), text_node("4.5 stars, 128 reviews"));
    let page = open_panel(detail);

    let record = extract_detail(&page, &cfg()).await.unwrap();
    assert_eq!(record.reviews, "128");
}

#[tokio::test]
async fn reviews_chain_continues_past_digitless_elements() {
    let mut detail = BTreeMap::new();
    detail.insert("h1.DUwDvf".to_owned(), text_node("Busy Place"));
    detail.insert(".HHrUdb".to_owned(), text_node("no count here"));
    detail.insert(
        r#"span[aria-label*="review"]"#.to_owned(),
        text_node("1024 reviews"),
    );
    let page = open_panel(detail);

    let record = extract_detail(&page, &cfg()).await.unwrap();
    assert_eq!(record.reviews, "1024");
}

#[tokio::test]
async fn unparseable_reviews_stay_empty() {
    let mut detail = BTreeMap::new();
    detail.insert("h1.DUwDvf".to_owned(), text_node("Quiet Place"));
    detail.insert(".HHrUdb".to_owned(), text_node("no reviews yet"));
    let page = open_panel(detail);

    let record = extract_detail(&page, &cfg()).await.unwrap();
    assert_eq!(record.reviews, "");
}

#[tokio::test]
async fn website_requires_an_absolute_link() {
    let mut detail = BTreeMap::new();
    detail.insert("h1.DUwDvf".to_owned(), text_node("Linked Place"));
    // First chain entry resolves to a relative link; the chain must keep
    // walking to the tooltip variant.
    detail.insert(
        r#"a[data-item-id*="authority"]"#.to_owned(),
        link_node("/maps/place/linked"),
    );
    detail.insert(
        r#"a[data-tooltip="Open website"]"#.to_owned(),
        link_node("https://linked.example/home"),
    );
    let page = open_panel(detail);

    let record = extract_detail(&page, &cfg()).await.unwrap();
    assert_eq!(record.website, "https://linked.example/home");
}

#[tokio::test]
async fn website_stays_empty_without_any_absolute_link() {
    let mut detail = BTreeMap::new();
    detail.insert("h1.DUwDvf".to_owned(), text_node("Offline Place"));
    detail.insert(
        r#"a[href^="http"]"#.to_owned(),
        link_node("javascript:void(0)"),
    );
    let page = open_panel(detail);

    let record = extract_detail(&page, &cfg()).await.unwrap();
    assert_eq!(record.website, "");
}

// ---------------------------------------------------------------------------
// first_digit_run
// ---------------------------------------------------------------------------

#[test]
fn digit_run_plain_count() {
    assert_eq!(first_digit_run("128 reviews").as_deref(), Some("128"));
}

#[test]
fn digit_run_skips_decimal_components() {
    assert_eq!(
        first_digit_run("4.5 stars, 128 reviews").as_deref(),
        Some("128")
    );
}

#[test]
fn digit_run_accepts_integer_ratings() {
    assert_eq!(first_digit_run("rated 4 stars").as_deref(), Some("4"));
}

#[test]
fn digit_run_none_for_decimal_only_text() {
    assert_eq!(first_digit_run("4.5"), None);
}

#[test]
fn digit_run_none_without_digits() {
    assert_eq!(first_digit_run("no reviews yet"), None);
}

#[test]
fn digit_run_parenthesized_count() {
    assert_eq!(first_digit_run("(2096)").as_deref(), Some("2096"));
}
