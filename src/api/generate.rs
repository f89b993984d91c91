// src/api/generate.rs
// Story generation over SSE.
//
// Field validation happens before the stream opens and can still fail as
// HTTP 400. Everything after that (auth, usage gate, hydration, upstream
// streaming, persistence) runs inside the stream and reports failures as a
// single `error` event, because the response headers are already committed
// to `text/event-stream`.

use std::convert::Infallible;
use std::sync::Arc;

use axum::{
    extract::rejection::JsonRejection,
    extract::State,
    http::HeaderMap,
    response::sse::{Event, KeepAlive, Sse},
    Json,
};
use futures::Stream;
use tokio::sync::mpsc;
use tokio_stream::{wrappers::ReceiverStream, StreamExt};
use tracing::{debug, error, info};
use uuid::Uuid;

use super::auth::{authenticate, bearer_token};
use super::error::ApiError;
use super::types::{GenerateStoryBody, ValidatedGeneration};
use crate::config::CONFIG;
use crate::error::GenerationError;
use crate::state::AppState;
use crate::story::draft::StoryDraft;
use crate::story::events::StoryStreamEvent;
use crate::story::pipeline::pump_upstream;
use crate::story::prompt::build_prompt;
use crate::story::request::build_request;
use crate::story::GenerationRequest;

/// `POST /api/stories/generate`
pub async fn generate_story_handler(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    body: Result<Json<GenerateStoryBody>, JsonRejection>,
) -> Result<Sse<impl Stream<Item = Result<Event, Infallible>>>, ApiError> {
    let Json(body) = body.map_err(|e| ApiError::bad_request(e.body_text()))?;
    let validated = body.validate().map_err(ApiError::bad_request)?;
    let token = bearer_token(&headers);

    let (tx, rx) = mpsc::channel::<StoryStreamEvent>(100);
    tokio::spawn(run_generation(state, token, validated, tx));

    let stream = ReceiverStream::new(rx).map(|event| {
        let payload = serde_json::to_string(&event).unwrap_or_else(|_| "{}".to_string());
        Ok(Event::default().data(payload))
    });
    Ok(Sse::new(stream).keep_alive(KeepAlive::default()))
}

/// Drive one generation to a terminal event. Owns the sending half of the
/// client channel; dropping it closes the SSE response.
async fn run_generation(
    state: Arc<AppState>,
    token: Option<String>,
    validated: ValidatedGeneration,
    tx: mpsc::Sender<StoryStreamEvent>,
) {
    match generate(&state, token.as_deref(), validated, &tx).await {
        Ok(story_id) => {
            info!(%story_id, "story generation complete");
        }
        Err(GenerationError::Disconnected) => {
            debug!("generation cancelled by client disconnect");
        }
        Err(e) => {
            error!(error = %e, "story generation failed");
            let _ = tx
                .send(StoryStreamEvent::Error {
                    message: e.user_message(),
                })
                .await;
        }
    }
}

async fn generate(
    state: &AppState,
    token: Option<&str>,
    validated: ValidatedGeneration,
    tx: &mpsc::Sender<StoryStreamEvent>,
) -> Result<Uuid, GenerationError> {
    let user_id = authenticate(&state.pool, token).await?;
    let snapshot = state
        .ledger
        .check_generation(user_id, validated.include_illustrations, validated.use_credit)
        .await?;
    let request = build_request(&state.stories, user_id, validated.input).await?;
    let prompt = build_prompt(&request);

    let params = serde_json::json!({
        "mode": request.mode,
        "genre": request.genre.name,
        "tone": request.tone.name,
        "length": request.length.name,
        "character_count": request.characters.len(),
        "include_illustrations": validated.include_illustrations,
    });
    let entry_id = state
        .costs
        .begin(
            user_id,
            &CONFIG.story_model,
            request.hero().id,
            &params,
            &prompt,
        )
        .await?;

    let result = stream_and_persist(
        state,
        user_id,
        &request,
        &prompt,
        validated.include_illustrations,
        tx,
    )
    .await;

    if let Some(message) = failure_to_record(&result) {
        if let Err(log_err) = state.costs.fail(entry_id, &message).await {
            error!(%entry_id, error = %log_err, "failed to mark cost-log entry failed");
        }
    }
    // Every ledger debit sits below this line; no error path, failed or
    // cancelled, reaches the usage counters.
    let story_id = result?;

    // Bookkeeping failures after this point never take the story away from
    // the user.
    let spent_credit = !snapshot.has_active_subscription
        && validated.use_credit
        && snapshot.story_credits > 0;
    state
        .ledger
        .settle_completion(
            user_id,
            story_id,
            validated.include_illustrations,
            spent_credit,
            snapshot.has_active_subscription,
        )
        .await;
    if let Err(e) = state.costs.complete(entry_id, story_id).await {
        error!(%entry_id, error = %e, "failed to close cost-log entry");
    }
    let _ = tx.send(StoryStreamEvent::Complete { story_id }).await;
    Ok(story_id)
}

/// The failure message for the cost log, when the outcome warrants the
/// `failed` transition. Success closes the row as `completed`; a disconnect
/// leaves it in `processing` for the stale-row sweep.
fn failure_to_record(result: &Result<Uuid, GenerationError>) -> Option<String> {
    match result {
        Ok(_) | Err(GenerationError::Disconnected) => None,
        Err(e) => Some(e.to_string()),
    }
}

/// Upstream call through final persistence. Returns the new story id; no
/// debits happen here.
async fn stream_and_persist(
    state: &AppState,
    user_id: Uuid,
    request: &GenerationRequest,
    prompt: &str,
    include_illustrations: bool,
    tx: &mpsc::Sender<StoryStreamEvent>,
) -> Result<Uuid, GenerationError> {
    let upstream = open_story_stream(&state.openai, prompt, tx).await?;

    let mut draft = StoryDraft::new();
    pump_upstream(upstream, &mut draft, tx).await?;
    debug!(raw_len = draft.raw_len(), "upstream stream finished");
    let story = draft.finish(request.story_length())?;

    // The client may have gone away between the last event and now; a
    // cancelled generation persists nothing.
    if tx.is_closed() {
        return Err(GenerationError::Disconnected);
    }
    state
        .stories
        .insert_story(user_id, &story, request, include_illustrations)
        .await
}

/// Announce acceptance, then contact the provider. `started` goes out
/// before the upstream request is issued, so the client hears back
/// immediately and a connect failure arrives as `started` then `error`.
async fn open_story_stream(
    openai: &crate::llm::OpenAiClient,
    prompt: &str,
    tx: &mpsc::Sender<StoryStreamEvent>,
) -> Result<mpsc::Receiver<crate::llm::UpstreamEvent>, GenerationError> {
    if tx.send(StoryStreamEvent::Started).await.is_err() {
        return Err(GenerationError::Disconnected);
    }
    openai.stream_story(prompt).await
}
