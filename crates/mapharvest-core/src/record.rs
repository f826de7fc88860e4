//! Domain types shared across the engine and its host tooling.
//!
//! ## Field conventions
//!
//! Every [`BusinessRecord`] field is a plain `String` and an empty string
//! means "not found". The rendered pages this data comes from vary across
//! rollout cohorts and locales, so any field except `name` may legitimately
//! be absent. `name` is the dedup key for a session: the engine never accepts
//! a record with an empty name, and the first record seen for a given name
//! wins for the rest of the session.

use serde::{Deserialize, Serialize};

/// One extracted business listing.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BusinessRecord {
    /// Display name of the business. Required; records without it are
    /// discarded before they reach the accumulated sequence.
    pub name: String,

    /// Street address with any `Address:` label prefix already stripped.
    #[serde(default)]
    pub address: String,

    /// Phone number with any `Phone:` label prefix already stripped.
    #[serde(default)]
    pub phone: String,

    /// Absolute `http(s)` URL, or empty when the listing has no resolvable
    /// website link.
    #[serde(default)]
    pub website: String,

    /// Star rating exactly as rendered (e.g. `"4.5"`).
    #[serde(default)]
    pub rating: String,

    /// Review count normalized to a bare digit sequence (`"128 reviews"`
    /// becomes `"128"`). Empty when no digit run could be extracted.
    #[serde(default)]
    pub reviews: String,

    /// Primary category label (e.g. `"Coffee shop"`).
    #[serde(default)]
    pub category: String,

    /// Opening-hours text exactly as rendered.
    #[serde(default)]
    pub hours: String,
}

/// Running counters for one scraping session.
///
/// Ephemeral: rebuilt from the session state for every emission and never
/// persisted. `processed` counts every open/extract/close cycle regardless of
/// outcome; `found` counts only accepted unique records.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionMetrics {
    /// Listing count from the most recent locator query. Carried on the
    /// wire as `total`, the name progress consumers key on.
    #[serde(rename = "total")]
    pub total_visible: usize,
    /// Listings whose open/extract/close cycle has completed, success or not.
    pub processed: usize,
    /// Accepted unique records.
    pub found: usize,
}
