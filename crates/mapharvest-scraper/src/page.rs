//! The rendered-page model the engine drives.
//!
//! The engine never talks to a browser: all interaction goes through this
//! trait, which exposes the already-rendered page as synchronous selector
//! queries plus simulated user actions. A live-browser bridge (CDP,
//! WebDriver, an extension content script) would implement it against a real
//! DOM; [`crate::scripted::ScriptedPage`] implements it against a recorded
//! session script for offline replay and tests.
//!
//! Selector strings are opaque to the engine. Implementations decide what
//! they mean; the bundled replay model matches them literally against the
//! selectors each scripted node declares.

use thiserror::Error;

/// Opaque handle to one node in the current render state.
///
/// Handles are only meaningful to the page model that issued them and go
/// stale when the node leaves the render (panel closed, listing recycled by
/// the virtualized feed). Reads on a stale handle return `None`; actions
/// return [`PageError::Detached`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(u64);

impl NodeId {
    #[must_use]
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }

    #[must_use]
    pub const fn raw(self) -> u64 {
        self.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum PageError {
    #[error("node {0:?} is detached from the rendered page")]
    Detached(NodeId),
}

/// Synchronous query-and-action surface over an already-rendered page.
///
/// Queries have no side effects beyond reading the current render state;
/// `click` and `scroll_into_view` are the only mutations and stand in for
/// simulated user input.
pub trait PageModel {
    /// All nodes currently matching `selector`, in render order.
    fn query_all(&self, selector: &str) -> Vec<NodeId>;

    /// First node currently matching `selector`.
    fn query(&self, selector: &str) -> Option<NodeId> {
        self.query_all(selector).into_iter().next()
    }

    /// First descendant of `node` matching `selector`.
    fn query_within(&self, node: NodeId, selector: &str) -> Option<NodeId>;

    /// Text content of `node`. `None` when the node is stale.
    fn text(&self, node: NodeId) -> Option<String>;

    /// Attribute value on `node`. `None` when absent or the node is stale.
    fn attr(&self, node: NodeId, name: &str) -> Option<String>;

    /// Simulates a user click on `node`.
    ///
    /// # Errors
    ///
    /// Returns [`PageError::Detached`] when the node is stale.
    fn click(&mut self, node: NodeId) -> Result<(), PageError>;

    /// Scrolls `node` into view toward the trailing edge, prompting a
    /// virtualized feed to append lazy-loaded content.
    ///
    /// # Errors
    ///
    /// Returns [`PageError::Detached`] when the node is stale.
    fn scroll_into_view(&mut self, node: NodeId) -> Result<(), PageError>;
}
