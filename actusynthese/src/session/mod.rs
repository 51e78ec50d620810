use std::fmt;
use tracing::{debug, info};

use crate::error::{SummaryError, EMPTY_RESPONSE_MESSAGE};
use crate::llm::SummaryResult;
use crate::topic::Topic;

pub mod controller;

pub use controller::SummaryController;

/// Tag of one submit-to-terminal aggregation lifecycle
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Generation(u64);

impl Generation {
    fn next(self) -> Self {
        Generation(self.0 + 1)
    }
}

impl fmt::Display for Generation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestStatus {
    Idle,
    Loading,
    Streaming,
    Success,
    Error,
}

/// Lifecycle state of the current request.
///
/// A result exists only while streaming or after success, an error message
/// only in the error state.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum SummaryState {
    #[default]
    Idle,
    Loading,
    Streaming(SummaryResult),
    Success(SummaryResult),
    Error(String),
}

impl SummaryState {
    pub fn status(&self) -> RequestStatus {
        match self {
            SummaryState::Idle => RequestStatus::Idle,
            SummaryState::Loading => RequestStatus::Loading,
            SummaryState::Streaming(_) => RequestStatus::Streaming,
            SummaryState::Success(_) => RequestStatus::Success,
            SummaryState::Error(_) => RequestStatus::Error,
        }
    }

    pub fn result(&self) -> Option<&SummaryResult> {
        match self {
            SummaryState::Streaming(r) | SummaryState::Success(r) => Some(r),
            _ => None,
        }
    }

    pub fn error(&self) -> Option<&str> {
        match self {
            SummaryState::Error(msg) => Some(msg),
            _ => None,
        }
    }

    pub fn is_in_flight(&self) -> bool {
        matches!(self, SummaryState::Loading | SummaryState::Streaming(_))
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, SummaryState::Success(_) | SummaryState::Error(_))
    }
}

/// Output of one aggregation, as seen by the state machine
#[derive(Debug, Clone, PartialEq)]
pub enum AggregationEvent {
    Snapshot(SummaryResult),
    Completed,
    Failed(SummaryError),
}

/// Pure request lifecycle: Idle -> Loading -> Streaming -> Success | Error.
///
/// Every `submit` and `reset` starts a new generation; events tagged with
/// any other generation are dropped by `apply`.
#[derive(Debug, Default)]
pub struct RequestMachine {
    state: SummaryState,
    generation: Generation,
    topic: Option<Topic>,
}

impl RequestMachine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> &SummaryState {
        &self.state
    }

    pub fn generation(&self) -> Generation {
        self.generation
    }

    pub fn topic(&self) -> Option<&Topic> {
        self.topic.as_ref()
    }

    /// Start a new request, superseding any in-flight one.
    pub fn submit(&mut self, topic: Topic) -> Generation {
        self.generation = self.generation.next();
        info!(generation = %self.generation, topic = %topic, "request submitted");
        self.topic = Some(topic);
        self.state = SummaryState::Loading;
        self.generation
    }

    /// Return to Idle, discarding result, error and topic.
    pub fn reset(&mut self) {
        self.generation = self.generation.next();
        self.topic = None;
        self.state = SummaryState::Idle;
        debug!(generation = %self.generation, "request reset");
    }

    /// Apply an aggregation event. Returns whether the state changed.
    pub fn apply(&mut self, generation: Generation, event: AggregationEvent) -> bool {
        if generation != self.generation {
            debug!(%generation, current = %self.generation, "dropping stale aggregation event");
            return false;
        }
        if !self.state.is_in_flight() {
            debug!(%generation, status = ?self.state.status(), "dropping event for settled request");
            return false;
        }

        self.state = match (std::mem::take(&mut self.state), event) {
            (_, AggregationEvent::Snapshot(snapshot)) => SummaryState::Streaming(snapshot),
            (SummaryState::Streaming(result), AggregationEvent::Completed) => {
                info!(%generation, sources = result.sources.len(), "request succeeded");
                SummaryState::Success(result)
            }
            (_, AggregationEvent::Completed) => {
                info!(%generation, "request completed without any snapshot");
                SummaryState::Error(EMPTY_RESPONSE_MESSAGE.to_string())
            }
            (_, AggregationEvent::Failed(e)) => {
                info!(%generation, error = %e, "request failed");
                SummaryState::Error(e.user_message())
            }
        };
        true
    }
}
