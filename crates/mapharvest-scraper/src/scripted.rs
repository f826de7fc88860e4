//! Deterministic replay implementation of [`PageModel`].
//!
//! A [`PageScript`] records one session's worth of page behavior: which
//! listings exist, which selectors each answers to, what the detail panel
//! behind each listing contains, and how many additional listings the
//! virtualized feed reveals per scroll. [`ScriptedPage`] plays the script
//! back through the `PageModel` trait, which makes it both the offline
//! driver for the CLI and the fixture harness for the engine tests.
//!
//! ## Node identity
//!
//! Handles follow the staleness rules of the trait: detail-panel nodes are
//! minted fresh each time a panel opens and never reused, so a handle kept
//! across a close (or a replacing open) stops resolving, exactly like a DOM
//! reference into a torn-down panel.

use std::collections::{BTreeMap, HashMap};
use std::path::Path;

use serde::Deserialize;
use thiserror::Error;

use crate::locator::{CLOSE_CONTROLS, FEED_SELECTOR, PLACE_LINK_SELECTOR};
use crate::page::{NodeId, PageError, PageModel};

const FEED_NODE: NodeId = NodeId::new(1);
const CLOSE_NODE: NodeId = NodeId::new(2);

/// Container node ids start here; detail node ids start far above so the two
/// ranges can never collide.
const LISTING_BASE: u64 = 100;
const DETAIL_BASE: u64 = 1_000_000;

#[derive(Debug, Error)]
pub enum ScriptError {
    #[error("failed to read page script {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse page script: {0}")]
    Parse(#[from] serde_json::Error),
}

/// One recorded page: feed shape, reveal schedule, and listings.
#[derive(Debug, Clone, Deserialize)]
pub struct PageScript {
    /// Whether the results feed root is present. `false` replays a page that
    /// never finished loading.
    #[serde(default = "default_true")]
    pub has_feed: bool,

    /// Whether the detail panel exposes a back/close control.
    #[serde(default = "default_true")]
    pub has_close_control: bool,

    /// Listings visible before any scroll. `None` means all of them.
    #[serde(default)]
    pub initially_visible: Option<usize>,

    /// Additional listings revealed by each scroll of the feed. `0` replays
    /// a feed that has reached its end.
    #[serde(default)]
    pub revealed_per_scroll: usize,

    #[serde(default)]
    pub listings: Vec<ListingScript>,
}

impl Default for PageScript {
    fn default() -> Self {
        Self {
            has_feed: true,
            has_close_control: true,
            initially_visible: None,
            revealed_per_scroll: 0,
            listings: Vec::new(),
        }
    }
}

/// One listing in the recorded result set.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ListingScript {
    /// Selectors the listing container answers to. Listing discovery matches
    /// these against its strategy table.
    pub matches: Vec<String>,

    /// Whether the container holds an inner direct detail-page link (the
    /// preferred click target).
    #[serde(default)]
    pub has_place_link: bool,

    /// Detail-panel nodes revealed when this listing is activated, keyed by
    /// the selector that finds them.
    #[serde(default)]
    pub detail: BTreeMap<String, DetailNode>,
}

/// Recorded content of one detail-panel node.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DetailNode {
    #[serde(default)]
    pub text: String,

    /// Attribute map; `href` is the one the extractor reads.
    #[serde(default)]
    pub attrs: BTreeMap<String, String>,
}

fn default_true() -> bool {
    true
}

/// Replay [`PageModel`] over a [`PageScript`].
#[derive(Debug)]
pub struct ScriptedPage {
    script: PageScript,
    visible: usize,
    open_detail: Option<usize>,
    /// Live detail-panel nodes of the currently open listing, by handle.
    detail_nodes: HashMap<NodeId, String>,
    next_detail_id: u64,
    activations: Vec<usize>,
    scrolls: usize,
}

impl ScriptedPage {
    #[must_use]
    pub fn new(script: PageScript) -> Self {
        let visible = script
            .initially_visible
            .unwrap_or(script.listings.len())
            .min(script.listings.len());
        Self {
            script,
            visible,
            open_detail: None,
            detail_nodes: HashMap::new(),
            next_detail_id: DETAIL_BASE,
            activations: Vec::new(),
            scrolls: 0,
        }
    }

    /// Parses a script from JSON text.
    ///
    /// # Errors
    ///
    /// Returns [`ScriptError::Parse`] on malformed JSON.
    pub fn from_json(json: &str) -> Result<Self, ScriptError> {
        Ok(Self::new(serde_json::from_str(json)?))
    }

    /// Loads a script from a JSON file.
    ///
    /// # Errors
    ///
    /// Returns [`ScriptError::Io`] when the file cannot be read and
    /// [`ScriptError::Parse`] on malformed JSON.
    pub fn from_file(path: &Path) -> Result<Self, ScriptError> {
        let json = std::fs::read_to_string(path).map_err(|source| ScriptError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_json(&json)
    }

    /// Listing indexes activated so far, in click order.
    #[must_use]
    pub fn activations(&self) -> &[usize] {
        &self.activations
    }

    /// Feed scrolls performed so far.
    #[must_use]
    pub fn scroll_count(&self) -> usize {
        self.scrolls
    }

    /// Listings currently revealed by the virtualized feed.
    #[must_use]
    pub fn visible_count(&self) -> usize {
        self.visible
    }

    fn container_id(index: usize) -> NodeId {
        NodeId::new(LISTING_BASE + 2 * index as u64)
    }

    fn link_id(index: usize) -> NodeId {
        NodeId::new(LISTING_BASE + 2 * index as u64 + 1)
    }

    /// Maps a handle back to a visible listing index; `None` for stale or
    /// non-listing handles.
    fn visible_listing_index(&self, node: NodeId) -> Option<usize> {
        let raw = node.raw();
        if !(LISTING_BASE..DETAIL_BASE).contains(&raw) {
            return None;
        }
        let index = usize::try_from((raw - LISTING_BASE) / 2).ok()?;
        (index < self.visible).then_some(index)
    }

    fn open_listing(&mut self, index: usize) {
        // A replacing open tears down any panel already showing, so handles
        // into the old panel go stale even when no close control exists.
        self.detail_nodes.clear();
        self.open_detail = Some(index);
        self.activations.push(index);
        let selectors: Vec<String> = self.script.listings[index].detail.keys().cloned().collect();
        for selector in selectors {
            let id = NodeId::new(self.next_detail_id);
            self.next_detail_id += 1;
            self.detail_nodes.insert(id, selector);
        }
    }

    fn close_panel(&mut self) {
        self.open_detail = None;
        self.detail_nodes.clear();
    }

    fn detail_node_for(&self, selector: &str) -> Option<NodeId> {
        self.detail_nodes
            .iter()
            .find(|(_, s)| s.as_str() == selector)
            .map(|(&id, _)| id)
    }

    fn open_detail_field(&self, node: NodeId) -> Option<&DetailNode> {
        let selector = self.detail_nodes.get(&node)?;
        let listing = &self.script.listings[self.open_detail?];
        listing.detail.get(selector)
    }
}

impl PageModel for ScriptedPage {
    fn query_all(&self, selector: &str) -> Vec<NodeId> {
        if selector == FEED_SELECTOR {
            return if self.script.has_feed {
                vec![FEED_NODE]
            } else {
                Vec::new()
            };
        }

        if CLOSE_CONTROLS.contains(&selector) {
            return if self.open_detail.is_some() && self.script.has_close_control {
                vec![CLOSE_NODE]
            } else {
                Vec::new()
            };
        }

        if let Some(node) = self.detail_node_for(selector) {
            return vec![node];
        }

        (0..self.visible)
            .filter(|&i| self.script.listings[i].matches.iter().any(|m| m == selector))
            .map(Self::container_id)
            .collect()
    }

    fn query_within(&self, node: NodeId, selector: &str) -> Option<NodeId> {
        let index = self.visible_listing_index(node)?;
        (selector == PLACE_LINK_SELECTOR && self.script.listings[index].has_place_link)
            .then(|| Self::link_id(index))
    }

    fn text(&self, node: NodeId) -> Option<String> {
        if let Some(field) = self.open_detail_field(node) {
            return Some(field.text.clone());
        }
        if node == FEED_NODE && self.script.has_feed {
            return Some(String::new());
        }
        if node == CLOSE_NODE && self.open_detail.is_some() {
            return Some(String::new());
        }
        self.visible_listing_index(node).map(|_| String::new())
    }

    fn attr(&self, node: NodeId, name: &str) -> Option<String> {
        self.open_detail_field(node)?.attrs.get(name).cloned()
    }

    fn click(&mut self, node: NodeId) -> Result<(), PageError> {
        if node == CLOSE_NODE && self.open_detail.is_some() {
            self.close_panel();
            return Ok(());
        }
        if let Some(index) = self.visible_listing_index(node) {
            self.open_listing(index);
            return Ok(());
        }
        if self.open_detail_field(node).is_some() {
            // Clicking inside the open panel is inert.
            return Ok(());
        }
        Err(PageError::Detached(node))
    }

    fn scroll_into_view(&mut self, node: NodeId) -> Result<(), PageError> {
        if self.visible_listing_index(node).is_some() {
            self.scrolls += 1;
            self.visible = (self.visible + self.script.revealed_per_scroll)
                .min(self.script.listings.len());
            return Ok(());
        }
        if node == FEED_NODE || self.open_detail_field(node).is_some() {
            return Ok(());
        }
        Err(PageError::Detached(node))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn article_listing(name: &str) -> ListingScript {
        let mut detail = BTreeMap::new();
        detail.insert(
            "h1.DUwDvf".to_owned(),
            DetailNode {
                text: name.to_owned(),
                ..DetailNode::default()
            },
        );
        ListingScript {
            matches: vec![r#"div[role="article"]"#.to_owned()],
            has_place_link: false,
            detail,
        }
    }

    #[test]
    fn batches_reveal_on_scroll() {
        let script = PageScript {
            initially_visible: Some(2),
            revealed_per_scroll: 2,
            listings: vec![
                article_listing("A"),
                article_listing("B"),
                article_listing("C"),
            ],
            ..PageScript::default()
        };
        let mut page = ScriptedPage::new(script);
        let visible = page.query_all(r#"div[role="article"]"#);
        assert_eq!(visible.len(), 2);

        page.scroll_into_view(visible[1]).unwrap();
        assert_eq!(page.query_all(r#"div[role="article"]"#).len(), 3);
        assert_eq!(page.scroll_count(), 1);
    }

    #[test]
    fn detail_handles_go_stale_after_close() {
        let mut page = ScriptedPage::new(PageScript {
            listings: vec![article_listing("Stale Cafe")],
            ..PageScript::default()
        });
        let container = page.query(r#"div[role="article"]"#).unwrap();
        page.click(container).unwrap();

        let name_node = page.query("h1.DUwDvf").unwrap();
        assert_eq!(page.text(name_node).as_deref(), Some("Stale Cafe"));

        let close = page.query(r#"button[jsaction*="pane.back"]"#).unwrap();
        page.click(close).unwrap();

        assert_eq!(page.text(name_node), None);
        assert_eq!(page.click(name_node), Err(PageError::Detached(name_node)));
    }

    #[test]
    fn replacing_open_invalidates_previous_panel() {
        let mut page = ScriptedPage::new(PageScript {
            has_close_control: false,
            listings: vec![article_listing("First"), article_listing("Second")],
            ..PageScript::default()
        });
        let containers = page.query_all(r#"div[role="article"]"#);

        page.click(containers[0]).unwrap();
        let first_name = page.query("h1.DUwDvf").unwrap();

        page.click(containers[1]).unwrap();
        assert_eq!(page.text(first_name), None);
        let second_name = page.query("h1.DUwDvf").unwrap();
        assert_eq!(page.text(second_name).as_deref(), Some("Second"));
    }

    #[test]
    fn close_control_absent_when_scripted_out() {
        let mut page = ScriptedPage::new(PageScript {
            has_close_control: false,
            listings: vec![article_listing("No Back Button")],
            ..PageScript::default()
        });
        let container = page.query(r#"div[role="article"]"#).unwrap();
        page.click(container).unwrap();
        for selector in CLOSE_CONTROLS {
            assert!(page.query(selector).is_none());
        }
    }

    #[test]
    fn inner_link_resolves_only_when_scripted() {
        let mut with_link = article_listing("Linked");
        with_link.has_place_link = true;
        let page = ScriptedPage::new(PageScript {
            listings: vec![with_link, article_listing("Unlinked")],
            ..PageScript::default()
        });
        let containers = page.query_all(r#"div[role="article"]"#);
        assert!(page.query_within(containers[0], PLACE_LINK_SELECTOR).is_some());
        assert!(page.query_within(containers[1], PLACE_LINK_SELECTOR).is_none());
    }

    #[test]
    fn from_json_applies_shape_defaults() {
        let page = ScriptedPage::from_json(
            r#"{"listings": [{"matches": ["div.Nv2PK"]}]}"#,
        )
        .unwrap();
        assert!(page.script.has_feed);
        assert!(page.script.has_close_control);
        assert_eq!(page.visible_count(), 1);
    }

    #[test]
    fn from_json_rejects_malformed_script() {
        let err = ScriptedPage::from_json("{not json").unwrap_err();
        assert!(matches!(err, ScriptError::Parse(_)));
    }
}
