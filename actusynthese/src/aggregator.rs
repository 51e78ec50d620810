// Stream aggregation: provider increments -> cumulative snapshots
use futures::stream::{self, BoxStream, StreamExt};
use tracing::{debug, info, warn};

use crate::error::SummaryError;
use crate::llm::{ChunkStream, ProviderChunk, SummaryProvider, SummaryResult};
use crate::sources::normalize;

/// Cumulative snapshots of one synthesis, in arrival order
pub type SnapshotStream = BoxStream<'static, Result<SummaryResult, SummaryError>>;

struct Aggregation {
    chunks: ChunkStream,
    result: SummaryResult,
    increments: usize,
}

impl Aggregation {
    fn absorb(&mut self, chunk: ProviderChunk) {
        self.increments += 1;
        self.result.text.push_str(&chunk.text);
        if !chunk.sources.is_empty() {
            self.result.sources = normalize(&self.result.sources, &chunk.sources);
        }
    }
}

/// Fold a provider chunk stream into cumulative snapshots.
///
/// Every chunk yields one snapshot. A provider error yields a single `Err`
/// and ends the stream. A provider that completes without any text yields
/// `Err(SummaryError::EmptyResponse)`.
pub fn aggregate(chunks: ChunkStream) -> SnapshotStream {
    let start = Aggregation {
        chunks,
        result: SummaryResult::default(),
        increments: 0,
    };

    stream::unfold(Some(start), |state| async move {
        let Some(mut agg) = state else {
            return None;
        };
        match agg.chunks.next().await {
            Some(Ok(chunk)) => {
                agg.absorb(chunk);
                debug!(
                    increments = agg.increments,
                    chars = agg.result.text.len(),
                    sources = agg.result.sources.len(),
                    "snapshot"
                );
                let snapshot = agg.result.clone();
                Some((Ok(snapshot), Some(agg)))
            }
            Some(Err(e)) => {
                warn!(error = %e, increments = agg.increments, "synthesis stream failed");
                Some((Err(e), None))
            }
            None if agg.result.text.is_empty() => {
                warn!(increments = agg.increments, "synthesis stream ended without text");
                Some((Err(SummaryError::EmptyResponse), None))
            }
            None => {
                info!(
                    increments = agg.increments,
                    sources = agg.result.sources.len(),
                    "synthesis stream complete"
                );
                None
            }
        }
    })
    .boxed()
}

/// Open a synthesis for `topic` and aggregate it
pub async fn summarize_topic<P: SummaryProvider + ?Sized>(
    provider: &P,
    topic: &str,
) -> Result<SnapshotStream, SummaryError> {
    let chunks = provider.stream_summary(topic).await?;
    Ok(aggregate(chunks))
}

/// Non-streaming variant: drain the snapshots and return the final one
pub async fn generate_summary<P: SummaryProvider + ?Sized>(
    provider: &P,
    topic: &str,
) -> Result<SummaryResult, SummaryError> {
    let mut snapshots = summarize_topic(provider, topic).await?;
    let mut last = SummaryResult::default();
    while let Some(snapshot) = snapshots.next().await {
        last = snapshot?;
    }
    Ok(last)
}
