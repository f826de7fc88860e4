//! The traversal engine: the stateful driver of one scraping session.
//!
//! ## Control flow
//!
//! ```text
//! WAITING_FOR_FEED -> ITERATING -> (SCROLLING -> ITERATING)* -> DONE
//!                          \-> ERROR          (fatal, emitted once)
//!                          \-> cancellation   (from any non-terminal state)
//! ```
//!
//! The engine blocks until the results feed root appears, then alternates
//! between iterating the currently visible listing set and scrolling to
//! reveal more. The feed is virtualized and lazily rendered, so an empty
//! locator pass or a scroll that appends nothing does not necessarily mean
//! exhaustion; two independent bounded retry budgets distinguish transient
//! render lag from true end-of-results without hanging indefinitely.
//!
//! Per-listing faults never abort the traversal: they are logged, counted as
//! processed, and the loop moves to the next listing. Only two conditions
//! end a session abnormally (see [`EngineError`]).
//!
//! The engine is strictly sequential by construction of the page's
//! single-detail-pane UI: one logical task, no concurrent panels, suspension
//! only at the named settle delays. Cancellation and pause are cooperative
//! flags observed at loop boundaries.

use std::sync::Arc;
use std::time::Instant;

use mapharvest_core::{BusinessRecord, EngineConfig};
use tokio::time::sleep;

use crate::error::EngineError;
use crate::events::{EngineEvent, EventSink};
use crate::extract::extract_detail;
use crate::locator::{locate, CLOSE_CONTROLS, FEED_SELECTOR, PLACE_LINK_SELECTOR};
use crate::page::{NodeId, PageError, PageModel};
use crate::session::{SessionFlags, SessionState};
use crate::store::{NullStore, RecordStore};

/// How a session ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionOutcome {
    /// End of results, or the scroll budget ran dry. Normal completion.
    Done,
    /// The host cleared the active flag; in-flight extraction state was
    /// abandoned without flushing.
    Cancelled,
    /// Fatal failure; an `error` event was emitted exactly once.
    Failed(EngineError),
}

/// One session's traversal driver.
///
/// Owns the page model, the session state, and the outbound seams (event
/// sink, record store). Drive it with [`TraversalEngine::run`]; control it
/// from outside through the flag handle returned by
/// [`TraversalEngine::flags`].
pub struct TraversalEngine<P, S> {
    page: P,
    config: EngineConfig,
    session: SessionState,
    sink: S,
    store: Box<dyn RecordStore + Send + Sync>,
}

impl<P: PageModel, S: EventSink> TraversalEngine<P, S> {
    #[must_use]
    pub fn new(page: P, config: EngineConfig, sink: S) -> Self {
        Self {
            page,
            config,
            session: SessionState::new(),
            sink,
            store: Box::new(NullStore),
        }
    }

    /// Replaces the record store the session mirrors into.
    #[must_use]
    pub fn with_store(mut self, store: Box<dyn RecordStore + Send + Sync>) -> Self {
        self.store = store;
        self
    }

    #[must_use]
    pub fn page(&self) -> &P {
        &self.page
    }

    #[must_use]
    pub fn session(&self) -> &SessionState {
        &self.session
    }

    /// Shared control-flag handle for cancellation and pause.
    #[must_use]
    pub fn flags(&self) -> Arc<SessionFlags> {
        self.session.flags()
    }

    /// Runs the session to completion.
    ///
    /// Fatal errors are reported through the returned outcome AND as a single
    /// `error` event; they are never auto-restarted.
    pub async fn run(&mut self) -> SessionOutcome {
        let flags = self.session.flags();
        flags.activate();
        tracing::info!(session = %self.session.id(), "scraping session started");

        let outcome = match self.drive(&flags).await {
            Ok(outcome) => outcome,
            Err(err) => {
                tracing::error!(session = %self.session.id(), error = %err, "session failed");
                self.sink.emit(EngineEvent::Error {
                    message: err.to_string(),
                });
                SessionOutcome::Failed(err)
            }
        };

        // The session is over; later control messages are no-ops.
        flags.cancel();
        let metrics = self.session.metrics();
        tracing::info!(
            session = %self.session.id(),
            found = metrics.found,
            processed = metrics.processed,
            outcome = ?outcome,
            "scraping session ended"
        );
        outcome
    }

    async fn drive(&mut self, flags: &SessionFlags) -> Result<SessionOutcome, EngineError> {
        self.wait_for_feed().await?;

        // Two independent budgets: transient "nothing visible" lag and
        // "scroll appended nothing" exhaustion are different conditions.
        // Neither counter resets mid-session.
        let mut empty_retries = 0u32;
        let mut scroll_retries = 0u32;

        loop {
            if !flags.is_active() {
                return Ok(SessionOutcome::Cancelled);
            }
            self.gate_while_paused(flags).await;
            if !flags.is_active() {
                return Ok(SessionOutcome::Cancelled);
            }

            let listings = locate(&self.page);
            self.session.note_visible(listings.len());
            self.emit_metrics();

            if listings.is_empty() {
                empty_retries += 1;
                if empty_retries > self.config.max_empty_retries {
                    return Err(EngineError::NoListings {
                        attempts: empty_retries,
                    });
                }
                tracing::debug!(attempt = empty_retries, "no listings visible; re-querying");
                sleep(self.config.no_results_delay).await;
                continue;
            }

            for &listing in &listings {
                if !flags.is_active() {
                    return Ok(SessionOutcome::Cancelled);
                }
                self.gate_while_paused(flags).await;
                if !flags.is_active() {
                    return Ok(SessionOutcome::Cancelled);
                }
                self.process_listing(listing).await;
            }

            // Reveal the next batch of the virtualized feed.
            if let Some(&last) = listings.last() {
                if let Err(err) = self.page.scroll_into_view(last) {
                    tracing::warn!(error = %err, "last listing went stale before scrolling");
                }
                sleep(self.config.scroll_settle).await;
            }

            scroll_retries += 1;
            if scroll_retries > self.config.max_scroll_retries {
                tracing::info!(
                    scrolls = scroll_retries,
                    "end of results or scroll budget exhausted"
                );
                return Ok(SessionOutcome::Done);
            }
        }
    }

    /// Bounded wait for the results feed root. Not retried once exhausted.
    async fn wait_for_feed(&mut self) -> Result<(), EngineError> {
        let started = Instant::now();
        loop {
            if self.page.query(FEED_SELECTOR).is_some() {
                return Ok(());
            }
            if started.elapsed() >= self.config.feed_wait_timeout {
                return Err(EngineError::FeedTimeout {
                    selector: FEED_SELECTOR.to_owned(),
                    timeout_ms: u64::try_from(self.config.feed_wait_timeout.as_millis())
                        .unwrap_or(u64::MAX),
                });
            }
            sleep(self.config.feed_poll_interval).await;
        }
    }

    /// Holds the loop at an iteration boundary while the pause flag is set,
    /// when the config gates on it. With gating off (the default) the flag
    /// is informational only and this returns immediately.
    async fn gate_while_paused(&self, flags: &SessionFlags) {
        if !self.config.gate_on_pause {
            return;
        }
        while flags.is_paused() && flags.is_active() {
            sleep(self.config.feed_poll_interval).await;
        }
    }

    /// One open/extract/close cycle. Every fault in here is soft: logged,
    /// counted as processed, never propagated to the outer loop.
    async fn process_listing(&mut self, listing: NodeId) {
        let opened = self.open_listing(listing).await;
        match &opened {
            Ok(()) => match extract_detail(&self.page, &self.config).await {
                Ok(record) => self.accept_record(record),
                Err(err) => {
                    tracing::warn!(node = ?listing, error = %err, "listing yielded no record");
                }
            },
            Err(err) => {
                tracing::warn!(node = ?listing, error = %err, "listing could not be opened");
            }
        }

        self.session.note_processed();
        self.emit_metrics();

        if opened.is_ok() {
            self.close_detail().await;
        }
    }

    /// Activates a listing and waits for the detail panel to begin rendering.
    async fn open_listing(&mut self, listing: NodeId) -> Result<(), PageError> {
        // Prefer the inner direct link; the container itself is the fallback.
        let target = self
            .page
            .query_within(listing, PLACE_LINK_SELECTOR)
            .unwrap_or(listing);
        self.page.click(target)?;
        sleep(self.config.click_settle).await;
        Ok(())
    }

    /// Appends an accepted record, mirrors the sequence, and pushes the full
    /// accumulated data outward. Duplicates and empty names change nothing.
    fn accept_record(&mut self, record: BusinessRecord) {
        if self.session.accept(record) {
            if let Err(err) = self.store.save_all(self.session.records()) {
                tracing::warn!(error = %err, "record store mirror failed");
            }
            self.sink.emit(EngineEvent::UpdateData {
                records: self.session.records().to_vec(),
            });
        }
    }

    /// Closes the detail panel through the first present close control.
    /// Absence of every control is not an error; the next activation simply
    /// replaces the open panel.
    async fn close_detail(&mut self) {
        for selector in CLOSE_CONTROLS {
            if let Some(control) = self.page.query(selector) {
                if let Err(err) = self.page.click(control) {
                    tracing::debug!(error = %err, "close control went stale before click");
                }
                sleep(self.config.close_settle).await;
                return;
            }
        }
    }

    fn emit_metrics(&self) {
        self.sink
            .emit(EngineEvent::UpdateMetrics(self.session.metrics()));
    }
}

#[cfg(test)]
#[path = "engine_test.rs"]
mod tests;
