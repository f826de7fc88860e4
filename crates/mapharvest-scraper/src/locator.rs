//! Listing discovery over the rendered page.
//!
//! The page markup varies across rollout cohorts and locales, so discovery
//! walks a fixed, ordered list of query strategies and returns the first
//! strategy that yields anything. Results are never merged across strategies:
//! this is strict fallback, which keeps callers ignorant of which markup
//! variant is live.

use crate::page::{NodeId, PageModel};

/// Root container of the results feed. The session fails if this never
/// appears.
pub const FEED_SELECTOR: &str = r#"div[role="feed"]"#;

/// Ordered listing query strategies: structural role marker, container class
/// marker, direct detail-page links, interactive-pane marker. First non-empty
/// result wins.
pub const LISTING_STRATEGIES: &[&str] = &[
    r#"div[role="article"]"#,
    "div.Nv2PK",
    r#"a[href^="/maps/place"]"#,
    r#"div[jsaction*="mouseover:pane"]"#,
];

/// Preferred clickable target inside a listing container; the container
/// itself is the fallback.
pub const PLACE_LINK_SELECTOR: &str = r#"a[href^="/maps/place"]"#;

/// Back/close controls of the detail panel, in preference order. Absence of
/// both is not an error; traversal simply moves on.
pub const CLOSE_CONTROLS: &[&str] = &[
    r#"button[jsaction*="pane.back"]"#,
    r#"button[aria-label="Back"]"#,
];

/// Finds the currently visible set of listing elements.
///
/// Evaluates [`LISTING_STRATEGIES`] in order and returns the first strategy's
/// non-empty matches; an empty vec when every strategy comes up empty.
/// Synchronous, no side effects beyond reading the current render state.
#[must_use]
pub fn locate<P: PageModel + ?Sized>(page: &P) -> Vec<NodeId> {
    for strategy in LISTING_STRATEGIES {
        let nodes = page.query_all(strategy);
        if !nodes.is_empty() {
            tracing::debug!(strategy, count = nodes.len(), "listing strategy matched");
            return nodes;
        }
    }
    Vec::new()
}
