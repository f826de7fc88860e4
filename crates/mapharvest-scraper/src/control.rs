//! Host-controller boundary for one engine session.
//!
//! Mirrors the message surface the engine answers to: a start signal, a
//! liveness probe, the pause/resume broadcast, and cancellation. The
//! controller drives exactly one session per engine: a start while the
//! session is active continues the already-active loop rather than beginning
//! a fresh one, and a start after completion is ignored. Re-initialization
//! (a new engine and controller) is the only way to reset the accumulated
//! sequence.

use std::sync::Arc;

use mapharvest_core::{BusinessRecord, SessionMetrics};
use tokio::sync::oneshot;
use tokio::task::JoinHandle;

use crate::engine::{SessionOutcome, TraversalEngine};
use crate::events::EventSink;
use crate::page::PageModel;
use crate::session::SessionFlags;

/// Messages a host may send.
#[derive(Debug)]
pub enum ControlMessage {
    /// Begin the session. No-op while one is already active or after it has
    /// completed.
    StartScraping,
    /// Liveness probe. Answered immediately; never touches engine state.
    Ping { reply: oneshot::Sender<&'static str> },
    /// Set the pause broadcast flag.
    Pause,
    /// Clear the pause broadcast flag.
    Resume,
    /// Request cooperative cancellation of the active session.
    Cancel,
}

/// Drives one [`TraversalEngine`] session on a background task and routes
/// control messages to it.
pub struct EngineController<P, S>
where
    P: PageModel + Send + Sync + 'static,
    S: EventSink + Send + Sync + 'static,
{
    engine: Option<TraversalEngine<P, S>>,
    flags: Arc<SessionFlags>,
    task: Option<JoinHandle<(TraversalEngine<P, S>, SessionOutcome)>>,
    started: bool,
}

impl<P, S> EngineController<P, S>
where
    P: PageModel + Send + Sync + 'static,
    S: EventSink + Send + Sync + 'static,
{
    #[must_use]
    pub fn new(engine: TraversalEngine<P, S>) -> Self {
        let flags = engine.flags();
        Self {
            engine: Some(engine),
            flags,
            task: None,
            started: false,
        }
    }

    /// Routes one control message.
    pub fn handle(&mut self, message: ControlMessage) {
        match message {
            ControlMessage::StartScraping => self.start(),
            ControlMessage::Ping { reply } => {
                let _ = reply.send("ok");
            }
            ControlMessage::Pause => self.flags.set_paused(true),
            ControlMessage::Resume => self.flags.set_paused(false),
            ControlMessage::Cancel => self.flags.cancel(),
        }
    }

    /// Begins the session on a background task.
    ///
    /// Idempotent in the only safe sense: while the session is active the
    /// call leaves the running loop undisturbed, and once the session has
    /// completed it is never restarted.
    pub fn start(&mut self) {
        if self.started {
            if self.is_running() {
                tracing::debug!("start requested while a session is active; continuing it");
            } else {
                tracing::debug!("start requested after session completion; ignoring");
            }
            return;
        }
        if let Some(mut engine) = self.engine.take() {
            self.started = true;
            self.task = Some(tokio::spawn(async move {
                let outcome = engine.run().await;
                (engine, outcome)
            }));
        }
    }

    #[must_use]
    pub fn is_running(&self) -> bool {
        self.task.as_ref().is_some_and(|task| !task.is_finished())
    }

    /// Waits for the session to end and returns its outcome.
    ///
    /// `None` when the session was never started, was already joined, or its
    /// task failed.
    pub async fn join(&mut self) -> Option<SessionOutcome> {
        let task = self.task.take()?;
        match task.await {
            Ok((engine, outcome)) => {
                self.engine = Some(engine);
                Some(outcome)
            }
            Err(err) => {
                tracing::error!(error = %err, "engine task failed");
                None
            }
        }
    }

    /// The accumulated record sequence, once the session has been joined
    /// (or before it starts). Empty while the session is in flight.
    #[must_use]
    pub fn records(&self) -> &[BusinessRecord] {
        self.engine
            .as_ref()
            .map_or(&[], |engine| engine.session().records())
    }

    /// Final counters, on the same terms as [`EngineController::records`].
    #[must_use]
    pub fn metrics(&self) -> Option<SessionMetrics> {
        self.engine.as_ref().map(|engine| engine.session().metrics())
    }
}
