use chrono::Utc;
use serde::Deserialize;
use serde_json::json;
use tracing::info;
use warp::filters::BoxedFilter;
use warp::reply::Response;
use warp::{Filter, Rejection, Reply};

use super::error::{reject, ApiError};
use super::with_state;
use crate::models::{CreateConversationRequest, NewMessage, ResolvedUpdate};
use crate::state::AppState;

#[derive(Deserialize)]
struct SolutionRequest {
    #[serde(default)]
    conversation_id: String,
    log_content: String,
}

pub fn routes(state: AppState) -> BoxedFilter<(Response,)> {
    let solution = warp::path!("api" / "chat" / "solution")
        .and(warp::post())
        .and(warp::body::json::<SolutionRequest>())
        .and(with_state(state.clone()))
        .and_then(solution_for_error);

    let create = warp::path!("api" / "chat" / "conversation")
        .and(warp::post())
        .and(warp::body::json::<CreateConversationRequest>())
        .and(with_state(state.clone()))
        .and_then(create_conversation);

    let add_messages = warp::path!("api" / "chat" / "conversation" / u64 / "messages")
        .and(warp::put())
        .and(warp::body::json::<Vec<NewMessage>>())
        .and(with_state(state.clone()))
        .and_then(add_messages);

    let list_messages = warp::path!("api" / "chat" / "conversation" / u64 / "messages")
        .and(warp::get())
        .and(with_state(state.clone()))
        .and_then(list_messages);

    let conversation_log = warp::path!("api" / "chat" / "conversation" / u64 / "log")
        .and(warp::get())
        .and(with_state(state.clone()))
        .and_then(log_for_conversation);

    let preload = warp::path!("api" / "chat" / "conversation" / u64 / "preload")
        .and(warp::post())
        .and(with_state(state.clone()))
        .and_then(preload_history);

    let get_resolved = warp::path!("api" / "chat" / "log" / u64 / "resolved")
        .and(warp::get())
        .and(with_state(state.clone()))
        .and_then(resolved_for_log);

    let set_resolved = warp::path!("api" / "chat" / "log" / u64 / "resolved")
        .and(warp::patch())
        .and(warp::body::json::<ResolvedUpdate>())
        .and(with_state(state.clone()))
        .and_then(update_resolved_for_log);

    let by_log = warp::path!("api" / "chat" / "conversation" / "log" / u64)
        .and(warp::get())
        .and(with_state(state))
        .and_then(conversation_for_log);

    solution
        .or(create)
        .unify()
        .or(add_messages)
        .unify()
        .or(list_messages)
        .unify()
        .or(conversation_log)
        .unify()
        .or(preload)
        .unify()
        .or(get_resolved)
        .unify()
        .or(set_resolved)
        .unify()
        .or(by_log)
        .unify()
        .boxed()
}

/// Known errors are answered from the knowledge base; anything else is
/// drafted by the assistant within the caller's conversation.
async fn solution_for_error(request: SolutionRequest, state: AppState) -> Result<Response, Rejection> {
    let known = state
        .store
        .knowledge_by_content(&request.log_content)
        .await
        .map_err(reject)?;
    if let Some(entry) = known.into_iter().next() {
        return Ok(warp::reply::json(&json!({
            "knownError": true,
            "solution": entry.solution,
        }))
        .into_response());
    }

    let conversation_id = if request.conversation_id.is_empty() {
        format!("adhoc-{}", Utc::now().timestamp_millis())
    } else {
        request.conversation_id
    };
    let query = format!("Provide a solution for the error: {}", request.log_content);
    let answer = state
        .assistant
        .query(&conversation_id, &query)
        .await
        .map_err(reject)?;

    Ok(warp::reply::json(&json!({
        "knownError": false,
        "generatedSolution": answer,
    }))
    .into_response())
}

async fn create_conversation(
    request: CreateConversationRequest,
    state: AppState,
) -> Result<Response, Rejection> {
    let existing = state
        .store
        .conversation_for_log(request.log_id)
        .await
        .map_err(reject)?;
    if existing.is_some() {
        return Err(reject(ApiError::BadRequest(
            "A conversation for this logId already exists".into(),
        )));
    }

    let conversation = state
        .store
        .insert_conversation(request.log_id)
        .await
        .map_err(reject)?;
    info!(
        "Created conversation {} for LogId {}",
        conversation.conversation_id, conversation.log_id
    );
    for message in request.messages.unwrap_or_default() {
        state
            .store
            .insert_message(conversation.conversation_id, message)
            .await
            .map_err(reject)?;
    }
    Ok(warp::reply::json(&conversation).into_response())
}

async fn require_conversation(state: &AppState, conversation_id: u64) -> Result<(), Rejection> {
    match state.store.conversation(conversation_id).await.map_err(reject)? {
        Some(_) => Ok(()),
        None => Err(reject(ApiError::NotFound("Conversation not found".into()))),
    }
}

async fn add_messages(
    conversation_id: u64,
    messages: Vec<NewMessage>,
    state: AppState,
) -> Result<Response, Rejection> {
    require_conversation(&state, conversation_id).await?;
    let mut saved = Vec::with_capacity(messages.len());
    for message in messages {
        saved.push(
            state
                .store
                .insert_message(conversation_id, message)
                .await
                .map_err(reject)?,
        );
    }
    Ok(warp::reply::json(&saved).into_response())
}

async fn list_messages(conversation_id: u64, state: AppState) -> Result<Response, Rejection> {
    require_conversation(&state, conversation_id).await?;
    let messages = state.store.messages(conversation_id).await.map_err(reject)?;
    Ok(warp::reply::json(&messages).into_response())
}

async fn log_for_conversation(conversation_id: u64, state: AppState) -> Result<Response, Rejection> {
    let conversation = state
        .store
        .conversation(conversation_id)
        .await
        .map_err(reject)?
        .ok_or_else(|| reject(ApiError::NotFound("Conversation not found".into())))?;
    let log = state
        .store
        .log(conversation.log_id)
        .await
        .map_err(reject)?
        .ok_or_else(|| {
            reject(ApiError::NotFound(
                "Log not found for the given conversation".into(),
            ))
        })?;
    Ok(warp::reply::json(&json!({
        "LogId": log.log_id,
        "LogContent": log.log_content,
    }))
    .into_response())
}

async fn preload_history(conversation_id: u64, state: AppState) -> Result<Response, Rejection> {
    require_conversation(&state, conversation_id).await?;
    let messages: Vec<NewMessage> = state
        .store
        .messages(conversation_id)
        .await
        .map_err(reject)?
        .iter()
        .map(NewMessage::from)
        .collect();
    state
        .assistant
        .preload_history(&conversation_id.to_string(), &messages)
        .await
        .map_err(reject)?;
    Ok(warp::reply::json(&json!({
        "status": "success",
        "conversation_id": conversation_id,
        "messages": messages.len(),
    }))
    .into_response())
}

async fn resolved_for_log(log_id: u64, state: AppState) -> Result<Response, Rejection> {
    let processed = state
        .store
        .processed_log_for(log_id)
        .await
        .map_err(reject)?
        .ok_or_else(|| reject(ApiError::NotFound("Processed log not found".into())))?;
    Ok(warp::reply::json(&json!({ "resolved": processed.resolved })).into_response())
}

async fn update_resolved_for_log(
    log_id: u64,
    update: ResolvedUpdate,
    state: AppState,
) -> Result<Response, Rejection> {
    let processed = state
        .store
        .processed_log_for(log_id)
        .await
        .map_err(reject)?
        .ok_or_else(|| reject(ApiError::NotFound("Processed log not found".into())))?;
    let updated = state
        .store
        .set_resolved(processed.process_id, update.resolved)
        .await
        .map_err(reject)?
        .ok_or_else(|| reject(ApiError::NotFound("Processed log not found".into())))?;
    Ok(warp::reply::json(&json!({
        "success": true,
        "message": "Resolved status updated successfully",
        "resolved": updated.resolved,
    }))
    .into_response())
}

async fn conversation_for_log(log_id: u64, state: AppState) -> Result<Response, Rejection> {
    let conversation = state
        .store
        .conversation_for_log(log_id)
        .await
        .map_err(reject)?;
    Ok(warp::reply::json(&conversation).into_response())
}
