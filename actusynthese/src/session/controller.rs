use futures::StreamExt;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use super::{AggregationEvent, Generation, RequestMachine, SummaryState};
use crate::aggregator::summarize_topic;
use crate::error::{SummaryError, TopicError};
use crate::llm::SummaryProvider;
use crate::topic::Topic;

const DEFAULT_IDLE_TIMEOUT: Duration = Duration::from_secs(60);

struct Tagged {
    generation: Generation,
    event: AggregationEvent,
}

/// Owns the request state machine and drives aggregations against a provider.
///
/// Each submission runs in its own task and reports back over a channel,
/// tagged with its generation; `next_update` applies those events in order.
pub struct SummaryController {
    provider: Arc<dyn SummaryProvider>,
    machine: RequestMachine,
    events_tx: mpsc::UnboundedSender<Tagged>,
    events_rx: mpsc::UnboundedReceiver<Tagged>,
    publisher: watch::Sender<SummaryState>,
    in_flight: Option<CancellationToken>,
    idle_timeout: Option<Duration>,
}

impl SummaryController {
    pub fn new(provider: Arc<dyn SummaryProvider>) -> Self {
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let (publisher, _) = watch::channel(SummaryState::Idle);
        Self {
            provider,
            machine: RequestMachine::new(),
            events_tx,
            events_rx,
            publisher,
            in_flight: None,
            idle_timeout: Some(DEFAULT_IDLE_TIMEOUT),
        }
    }

    /// Bound the wait for each stream increment; zero disables the bound.
    pub fn with_idle_timeout(mut self, timeout: Duration) -> Self {
        self.idle_timeout = (!timeout.is_zero()).then_some(timeout);
        self
    }

    pub fn state(&self) -> &SummaryState {
        self.machine.state()
    }

    pub fn topic(&self) -> Option<&str> {
        self.machine.topic().map(Topic::as_str)
    }

    /// Read-only view of the state, updated on every transition
    pub fn subscribe(&self) -> watch::Receiver<SummaryState> {
        self.publisher.subscribe()
    }

    /// Validate `topic` and start a new request. The state is `Loading` when this returns.
    pub fn submit(&mut self, topic: &str) -> Result<Generation, TopicError> {
        let topic = Topic::parse(topic)?;

        self.cancel_in_flight();
        let generation = self.machine.submit(topic.clone());
        self.publish();

        let token = CancellationToken::new();
        self.in_flight = Some(token.clone());
        tokio::spawn(run_aggregation(
            self.provider.clone(),
            topic,
            generation,
            self.events_tx.clone(),
            token,
            self.idle_timeout,
        ));

        Ok(generation)
    }

    /// Abandon the current request and return to `Idle`.
    pub fn reset(&mut self) {
        self.cancel_in_flight();
        self.machine.reset();
        self.publish();
    }

    /// Wait for the next state change of the current request.
    /// Returns `None` when no request is in flight.
    pub async fn next_update(&mut self) -> Option<SummaryState> {
        while self.machine.state().is_in_flight() {
            let Tagged { generation, event } = self.events_rx.recv().await?;
            if self.machine.apply(generation, event) {
                if self.machine.state().is_terminal() {
                    self.in_flight = None;
                }
                self.publish();
                return Some(self.machine.state().clone());
            }
        }
        None
    }

    /// Drive the current request to a terminal state (or return at once if idle).
    pub async fn settle(&mut self) -> &SummaryState {
        while self.next_update().await.is_some() {}
        self.machine.state()
    }

    fn cancel_in_flight(&mut self) {
        if let Some(token) = self.in_flight.take() {
            debug!(generation = %self.machine.generation(), "cancelling in-flight aggregation");
            token.cancel();
        }
    }

    fn publish(&self) {
        self.publisher.send_replace(self.machine.state().clone());
    }
}

impl Drop for SummaryController {
    fn drop(&mut self) {
        self.cancel_in_flight();
    }
}

async fn run_aggregation(
    provider: Arc<dyn SummaryProvider>,
    topic: Topic,
    generation: Generation,
    tx: mpsc::UnboundedSender<Tagged>,
    token: CancellationToken,
    idle_timeout: Option<Duration>,
) {
    tokio::select! {
        _ = token.cancelled() => {
            debug!(%generation, "aggregation aborted");
        }
        _ = forward(provider.as_ref(), &topic, generation, &tx, idle_timeout) => {}
    }
}

/// Forward aggregated snapshots as tagged events until the stream ends or fails.
async fn forward(
    provider: &dyn SummaryProvider,
    topic: &Topic,
    generation: Generation,
    tx: &mpsc::UnboundedSender<Tagged>,
    idle_timeout: Option<Duration>,
) {
    let send = |event| tx.send(Tagged { generation, event }).is_ok();

    let mut snapshots = match summarize_topic(provider, topic.as_str()).await {
        Ok(snapshots) => snapshots,
        Err(e) => {
            send(AggregationEvent::Failed(e));
            return;
        }
    };

    loop {
        let next = match idle_timeout {
            Some(limit) => match tokio::time::timeout(limit, snapshots.next()).await {
                Ok(item) => item,
                Err(_) => {
                    info!(%generation, ?limit, "synthesis stream stalled");
                    Some(Err(SummaryError::Timeout(limit)))
                }
            },
            None => snapshots.next().await,
        };

        let (event, last) = match next {
            Some(Ok(snapshot)) => (AggregationEvent::Snapshot(snapshot), false),
            Some(Err(e)) => (AggregationEvent::Failed(e), true),
            None => (AggregationEvent::Completed, true),
        };
        if !send(event) || last {
            return;
        }
    }
}
