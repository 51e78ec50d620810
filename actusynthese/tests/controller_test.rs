use actusynthese::error::{QUOTA_MESSAGE, TIMEOUT_MESSAGE};
use actusynthese::llm::{ChunkStream, ProviderChunk};
use actusynthese::{
    RequestStatus, Source, SummaryController, SummaryError, SummaryProvider, SummaryState,
    TopicError,
};
use futures::channel::mpsc::{unbounded, UnboundedReceiver, UnboundedSender};
use futures::StreamExt;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

type Feed = UnboundedSender<Result<ProviderChunk, SummaryError>>;

/// Provider whose streams are fed by the test, one channel per topic
#[derive(Default)]
struct ChannelProvider {
    streams: Mutex<HashMap<String, UnboundedReceiver<Result<ProviderChunk, SummaryError>>>>,
}

impl ChannelProvider {
    fn script(&self, topic: &str) -> Feed {
        let (tx, rx) = unbounded();
        self.streams.lock().unwrap().insert(topic.to_string(), rx);
        tx
    }
}

#[async_trait::async_trait]
impl SummaryProvider for ChannelProvider {
    async fn stream_summary(&self, topic: &str) -> Result<ChunkStream, SummaryError> {
        let rx = self
            .streams
            .lock()
            .unwrap()
            .remove(topic)
            .ok_or_else(|| SummaryError::Transport(format!("no script for {}", topic)))?;
        Ok(rx.boxed())
    }
}

fn text(s: &str) -> Result<ProviderChunk, SummaryError> {
    Ok(ProviderChunk::text(s))
}

#[tokio::test]
async fn test_submit_is_loading_before_any_increment() {
    let provider = Arc::new(ChannelProvider::default());
    let _feed = provider.script("Sujet A");

    let mut controller = SummaryController::new(provider.clone());
    let view = controller.subscribe();

    controller.submit("  Sujet A ").unwrap();
    assert_eq!(controller.state(), &SummaryState::Loading);
    assert_eq!(*view.borrow(), SummaryState::Loading);
    assert_eq!(controller.topic(), Some("Sujet A"));
}

#[tokio::test]
async fn test_snapshots_apply_in_order() {
    let provider = Arc::new(ChannelProvider::default());
    let feed = provider.script("Élections au Sénégal");

    let mut controller = SummaryController::new(provider.clone());
    controller.submit("Élections au Sénégal").unwrap();

    feed.unbounded_send(text("Le ")).unwrap();
    let state = controller.next_update().await.unwrap();
    assert_eq!(state.status(), RequestStatus::Streaming);
    assert_eq!(state.result().unwrap().text, "Le ");

    feed.unbounded_send(Ok(ProviderChunk::text("scrutin a eu lieu.")
        .with_sources(vec![Source::new("RFI", "https://rfi.fr/x")])))
        .unwrap();
    drop(feed);

    let state = controller.settle().await;
    assert_eq!(state.status(), RequestStatus::Success);
    assert_eq!(state.result().unwrap().text, "Le scrutin a eu lieu.");
    assert_eq!(state.result().unwrap().sources.len(), 1);
}

#[tokio::test]
async fn test_superseded_generation_is_ignored() {
    let provider = Arc::new(ChannelProvider::default());
    let feed_a = provider.script("Sujet A");
    let feed_b = provider.script("Sujet B");

    let mut controller = SummaryController::new(provider.clone());
    controller.submit("Sujet A").unwrap();

    // Let A's aggregation queue all of its events before it is superseded
    feed_a.unbounded_send(text("A1")).unwrap();
    feed_a
        .unbounded_send(Err(SummaryError::from_provider(None, "RESOURCE_EXHAUSTED")))
        .unwrap();
    tokio::time::sleep(Duration::from_millis(50)).await;

    controller.submit("Sujet B").unwrap();
    assert_eq!(controller.state(), &SummaryState::Loading);

    feed_b.unbounded_send(text("B1")).unwrap();
    drop(feed_b);

    // A's queued snapshot and failure must not surface as B's state
    let state = controller.next_update().await.unwrap();
    assert_eq!(state.status(), RequestStatus::Streaming);
    assert_eq!(state.result().unwrap().text, "B1");

    let state = controller.settle().await;
    assert_eq!(state.status(), RequestStatus::Success);
    assert_eq!(state.result().unwrap().text, "B1");
    drop(feed_a);
}

#[tokio::test]
async fn test_reset_while_streaming() {
    let provider = Arc::new(ChannelProvider::default());
    let feed = provider.script("Sommet de la CEDEAO");

    let mut controller = SummaryController::new(provider.clone());
    let view = controller.subscribe();
    controller.submit("Sommet de la CEDEAO").unwrap();
    feed.unbounded_send(text("En cours")).unwrap();
    assert_eq!(
        controller.next_update().await.map(|s| s.status()),
        Some(RequestStatus::Streaming)
    );

    controller.reset();
    assert_eq!(controller.state(), &SummaryState::Idle);
    assert!(controller.state().result().is_none());
    assert!(controller.state().error().is_none());
    assert!(controller.topic().is_none());
    assert_eq!(*view.borrow(), SummaryState::Idle);

    let _ = feed.unbounded_send(text(" et encore"));
    drop(feed);

    assert!(controller.next_update().await.is_none());
    assert_eq!(controller.state(), &SummaryState::Idle);
}

#[tokio::test]
async fn test_failure_clears_partial_result() {
    let provider = Arc::new(ChannelProvider::default());
    let feed = provider.script("Inflation zone UEMOA");

    let mut controller = SummaryController::new(provider.clone());
    controller.submit("Inflation zone UEMOA").unwrap();
    feed.unbounded_send(text("Partiel")).unwrap();
    feed.unbounded_send(Err(SummaryError::from_provider(
        Some(400),
        "RESOURCE_EXHAUSTED: quota",
    )))
    .unwrap();

    let state = controller.settle().await;
    assert_eq!(state.error(), Some(QUOTA_MESSAGE));
    assert!(state.result().is_none());

    // retry after an error goes back through Loading
    let _retry = provider.script("Inflation zone UEMOA");
    controller.submit("Inflation zone UEMOA").unwrap();
    assert_eq!(controller.state(), &SummaryState::Loading);
}

#[tokio::test]
async fn test_stalled_stream_times_out() {
    let provider = Arc::new(ChannelProvider::default());
    let _feed = provider.script("Sujet lent");

    let mut controller = SummaryController::new(provider.clone())
        .with_idle_timeout(Duration::from_millis(50));
    controller.submit("Sujet lent").unwrap();

    assert_eq!(controller.settle().await.error(), Some(TIMEOUT_MESSAGE));
}

#[tokio::test]
async fn test_invalid_topic_leaves_state_untouched() {
    let provider = Arc::new(ChannelProvider::default());
    let mut controller = SummaryController::new(provider);

    assert_eq!(
        controller.submit(" ab "),
        Err(TopicError::TooShort { min: 3, actual: 2 })
    );
    assert_eq!(controller.submit("   "), Err(TopicError::Empty));
    assert_eq!(controller.state(), &SummaryState::Idle);
    assert!(controller.next_update().await.is_none());
}
