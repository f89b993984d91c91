//! Pumps the upstream token stream through the draft to the client.

use tokio::sync::mpsc;
use tracing::debug;

use super::draft::StoryDraft;
use super::events::StoryStreamEvent;
use crate::error::GenerationError;
use crate::llm::UpstreamEvent;

/// Drain the upstream receiver into the draft, forwarding each completed
/// event to the client channel. Returns once upstream signals done or its
/// channel closes; the caller then runs final validation on the draft.
///
/// A send failure means the client went away, which cancels the whole
/// generation.
pub async fn pump_upstream(
    mut upstream: mpsc::Receiver<UpstreamEvent>,
    draft: &mut StoryDraft,
    client: &mpsc::Sender<StoryStreamEvent>,
) -> Result<(), GenerationError> {
    while let Some(event) = upstream.recv().await {
        match event {
            UpstreamEvent::Delta(delta) => {
                for event in draft.feed(&delta) {
                    if client.send(event).await.is_err() {
                        debug!("client disconnected mid-stream");
                        return Err(GenerationError::Disconnected);
                    }
                }
            }
            UpstreamEvent::Done => break,
            UpstreamEvent::Error(message) => {
                return Err(GenerationError::Upstream {
                    status: 502,
                    message,
                });
            }
        }
    }
    Ok(())
}
