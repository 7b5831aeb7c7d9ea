//! Flavor text from an external storyteller.
//!
//! The storyteller is a [`Narrator`] implementation supplied by the host
//! (typically a remote text-generation call). Calls run on a worker thread
//! under a time budget and every failure collapses into a fixed fallback
//! line, so callers always get text and the simulation never waits.

use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use crossbeam_channel::{Receiver, RecvTimeoutError, TryRecvError};

use crate::catalog::Tier;
use crate::number::BigNumber;
use crate::state::GameState;

pub const FALLBACK_NO_CREDENTIAL: &str = "O Bardo está em silêncio (API Key ausente).";
pub const FALLBACK_EMPTY: &str = "O Bardo pigarreia, mas não diz nada.";
pub const FALLBACK_FAILURE: &str = "O Bardo está muito bêbado para falar agora.";

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum NarrativeError {
    #[error("narrator credential missing")]
    MissingCredential,
    #[error("narrator returned no text")]
    EmptyResponse,
    #[error("narrator timed out after {0:?}")]
    TimedOut(Duration),
    #[error("narrator failed: {0}")]
    Failed(String),
}

impl NarrativeError {
    pub fn fallback(&self) -> &'static str {
        match self {
            NarrativeError::MissingCredential => FALLBACK_NO_CREDENTIAL,
            NarrativeError::EmptyResponse => FALLBACK_EMPTY,
            NarrativeError::TimedOut(_) | NarrativeError::Failed(_) => FALLBACK_FAILURE,
        }
    }
}

/// What the storyteller gets to see.
#[derive(Debug, Clone, PartialEq)]
pub struct NarrativeSnapshot {
    pub wheat: BigNumber,
    pub peasants: BigNumber,
    pub total_harvested: BigNumber,
}

impl NarrativeSnapshot {
    pub fn from_state(state: &GameState) -> Self {
        Self {
            wheat: state.wheat.floor(),
            peasants: *state.count(Tier::Peasant),
            total_harvested: state.lifetime(Tier::Peasant).floor(),
        }
    }
}

pub trait Narrator: Send + Sync {
    fn narrate(&self, snapshot: &NarrativeSnapshot) -> Result<String, NarrativeError>;
}

fn settle(result: Result<String, NarrativeError>) -> String {
    let result = result.and_then(|text| {
        let trimmed = text.trim();
        if trimmed.is_empty() {
            Err(NarrativeError::EmptyResponse)
        } else {
            Ok(trimmed.to_string())
        }
    });
    match result {
        Ok(text) => text,
        Err(e) => {
            log::warn!("narrative unavailable: {e}");
            e.fallback().to_string()
        }
    }
}

/// An in-flight narration that can be polled without blocking.
pub struct NarrativeRequest {
    rx: Receiver<Result<String, NarrativeError>>,
    deadline: Instant,
    budget: Duration,
    done: bool,
}

impl NarrativeRequest {
    pub fn spawn(narrator: Arc<dyn Narrator>, snapshot: NarrativeSnapshot, budget: Duration) -> Self {
        let (tx, rx) = crossbeam_channel::bounded(1);
        let spawned = thread::Builder::new()
            .name("narrator".into())
            .spawn(move || {
                // The receiver may be gone after a timeout; nothing to do then.
                let _ = tx.send(narrator.narrate(&snapshot));
            });
        // A thread that never started drops the sender, which reads as a
        // disconnect and yields the failure fallback.
        if let Err(e) = spawned {
            log::warn!("could not start narrator thread: {e}");
        }
        Self {
            rx,
            deadline: Instant::now() + budget,
            budget,
            done: false,
        }
    }

    /// Text once available, a fallback once the budget is spent, otherwise
    /// `None`. Yields `Some` at most once.
    pub fn poll(&mut self) -> Option<String> {
        if self.done {
            return None;
        }
        let outcome = match self.rx.try_recv() {
            Ok(result) => result,
            Err(TryRecvError::Disconnected) => Err(NarrativeError::Failed("narrator thread exited".into())),
            Err(TryRecvError::Empty) if Instant::now() >= self.deadline => {
                Err(NarrativeError::TimedOut(self.budget))
            }
            Err(TryRecvError::Empty) => return None,
        };
        self.done = true;
        Some(settle(outcome))
    }

    /// Block until text or fallback is available.
    pub fn wait(self) -> String {
        if self.done {
            return FALLBACK_FAILURE.to_string();
        }
        let remaining = self.deadline.saturating_duration_since(Instant::now());
        let outcome = match self.rx.recv_timeout(remaining) {
            Ok(result) => result,
            Err(RecvTimeoutError::Timeout) => Err(NarrativeError::TimedOut(self.budget)),
            Err(RecvTimeoutError::Disconnected) => {
                Err(NarrativeError::Failed("narrator thread exited".into()))
            }
        };
        settle(outcome)
    }
}

/// Narrate `state`, waiting at most `budget`.
pub fn narrate(narrator: Arc<dyn Narrator>, state: &GameState, budget: Duration) -> String {
    NarrativeRequest::spawn(narrator, NarrativeSnapshot::from_state(state), budget).wait()
}
