//! Per-session state: accumulated records, counters, and control flags.
//!
//! All of this is mutated by the single traversal task only; the flags are
//! atomics so a host controller can cancel or pause from outside without any
//! locking around the record sequence itself.

use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use mapharvest_core::{BusinessRecord, SessionMetrics};
use uuid::Uuid;

/// Cooperative control flags shared between the engine task and its host.
///
/// `active` is the cancellation flag: the engine checks it at the top of the
/// outer loop and before each listing, and stops promptly when it drops.
/// `paused` is delivered on the same terms but only gates the loop when the
/// engine config asks for it.
#[derive(Debug, Default)]
pub struct SessionFlags {
    active: AtomicBool,
    paused: AtomicBool,
}

impl SessionFlags {
    pub fn activate(&self) {
        self.active.store(true, Ordering::SeqCst);
    }

    /// Requests cooperative cancellation. A blocking wait already in flight
    /// runs to completion before the engine observes it.
    pub fn cancel(&self) {
        self.active.store(false, Ordering::SeqCst);
    }

    #[must_use]
    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::SeqCst)
    }

    pub fn set_paused(&self, paused: bool) {
        self.paused.store(paused, Ordering::SeqCst);
    }

    #[must_use]
    pub fn is_paused(&self) -> bool {
        self.paused.load(Ordering::SeqCst)
    }
}

/// One scraping session from start signal to done/error/cancellation.
///
/// The record sequence is append-only for the session's lifetime: acceptance
/// never mutates or removes earlier records, and the sequence resets only
/// when the host builds a fresh session.
pub struct SessionState {
    id: Uuid,
    flags: Arc<SessionFlags>,
    records: Vec<BusinessRecord>,
    seen_names: HashSet<String>,
    metrics: SessionMetrics,
}

impl SessionState {
    #[must_use]
    pub fn new() -> Self {
        Self {
            id: Uuid::new_v4(),
            flags: Arc::new(SessionFlags::default()),
            records: Vec::new(),
            seen_names: HashSet::new(),
            metrics: SessionMetrics::default(),
        }
    }

    #[must_use]
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Shared handle to the control flags, for host controllers.
    #[must_use]
    pub fn flags(&self) -> Arc<SessionFlags> {
        Arc::clone(&self.flags)
    }

    /// Offers a record for acceptance.
    ///
    /// Accepted only when the name is non-empty and not yet seen this
    /// session; the first record for a given name wins and later duplicates
    /// are dropped silently. Returns whether the record was appended.
    pub fn accept(&mut self, record: BusinessRecord) -> bool {
        if record.name.is_empty() {
            return false;
        }
        if !self.seen_names.insert(record.name.clone()) {
            tracing::debug!(name = %record.name, "duplicate listing dropped");
            return false;
        }
        self.records.push(record);
        self.metrics.found = self.records.len();
        true
    }

    #[must_use]
    pub fn records(&self) -> &[BusinessRecord] {
        &self.records
    }

    #[must_use]
    pub fn metrics(&self) -> SessionMetrics {
        self.metrics
    }

    /// Records the listing count from the latest locator query.
    pub fn note_visible(&mut self, count: usize) {
        self.metrics.total_visible = count;
    }

    /// Counts one completed open/extract/close cycle, success or not.
    pub fn note_processed(&mut self) {
        self.metrics.processed += 1;
    }
}

impl Default for SessionState {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn named(name: &str) -> BusinessRecord {
        BusinessRecord {
            name: name.to_owned(),
            ..BusinessRecord::default()
        }
    }

    #[test]
    fn accepts_unique_names_in_order() {
        let mut session = SessionState::new();
        assert!(session.accept(named("Alpha")));
        assert!(session.accept(named("Beta")));
        let names: Vec<&str> = session.records().iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, ["Alpha", "Beta"]);
        assert_eq!(session.metrics().found, 2);
    }

    #[test]
    fn first_seen_record_wins_for_a_name() {
        let mut session = SessionState::new();
        let mut first = named("Cafe");
        first.phone = "111".to_owned();
        let mut second = named("Cafe");
        second.phone = "222".to_owned();

        assert!(session.accept(first));
        assert!(!session.accept(second));
        assert_eq!(session.records().len(), 1);
        assert_eq!(session.records()[0].phone, "111");
    }

    #[test]
    fn empty_name_is_never_accepted() {
        let mut session = SessionState::new();
        assert!(!session.accept(BusinessRecord::default()));
        assert!(session.records().is_empty());
        assert_eq!(session.metrics().found, 0);
    }

    #[test]
    fn accepted_names_are_pairwise_distinct() {
        let mut session = SessionState::new();
        for name in ["A", "B", "A", "C", "B", "C", "D"] {
            session.accept(named(name));
        }
        let mut names: Vec<&str> = session.records().iter().map(|r| r.name.as_str()).collect();
        let before = names.len();
        names.sort_unstable();
        names.dedup();
        assert_eq!(names.len(), before, "names must be pairwise distinct");
        assert_eq!(before, 4);
    }

    #[test]
    fn flags_are_shared_with_cloned_handles() {
        let session = SessionState::new();
        let handle = session.flags();
        handle.activate();
        assert!(session.flags().is_active());
        handle.cancel();
        assert!(!session.flags().is_active());
        handle.set_paused(true);
        assert!(session.flags().is_paused());
    }

    #[test]
    fn counters_track_cycles_independently_of_acceptance() {
        let mut session = SessionState::new();
        session.note_visible(7);
        session.note_processed();
        session.note_processed();
        let metrics = session.metrics();
        assert_eq!(metrics.total_visible, 7);
        assert_eq!(metrics.processed, 2);
        assert_eq!(metrics.found, 0);
    }
}
