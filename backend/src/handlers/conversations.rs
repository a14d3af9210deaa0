use super::ApiResult;
use crate::AppState;
use axum::{
    Json,
    extract::{Path, State},
};
use shared::models::{
    Conversation, ConversationSettingsRequest, ConversationSummary, OpenConversationRequest,
    Reselect,
};
use uuid::Uuid;

pub async fn list_conversations(State(state): State<AppState>) -> ApiResult<Vec<ConversationSummary>> {
    let user = state.session.require_user().await?;
    Ok(Json(state.engine.summaries(user.id).await))
}

pub async fn unread_total(State(state): State<AppState>) -> ApiResult<usize> {
    let user = state.session.require_user().await?;
    Ok(Json(state.engine.total_unread(user.id).await))
}

pub async fn open_conversation(
    State(state): State<AppState>,
    Json(payload): Json<OpenConversationRequest>,
) -> ApiResult<Conversation> {
    let user = state.session.require_user().await?;
    let character = state.engine.character(payload.character_id).await?;
    let conversation = state.engine.find_or_create(&user, &character).await?;
    Ok(Json(conversation))
}

/// Viewing a conversation marks its replies as read.
pub async fn get_conversation(
    State(state): State<AppState>,
    Path(conversation_id): Path<Uuid>,
) -> ApiResult<Conversation> {
    let user = state.session.require_user().await?;
    state.engine.get_owned(conversation_id, user.id).await?;
    Ok(Json(state.engine.mark_read(conversation_id).await?))
}

pub async fn delete_conversation(
    State(state): State<AppState>,
    Path(conversation_id): Path<Uuid>,
) -> ApiResult<Reselect> {
    let user = state.session.require_user().await?;
    state.engine.get_owned(conversation_id, user.id).await?;
    Ok(Json(state.engine.delete(conversation_id).await?))
}

pub async fn update_settings(
    State(state): State<AppState>,
    Path(conversation_id): Path<Uuid>,
    Json(payload): Json<ConversationSettingsRequest>,
) -> ApiResult<Conversation> {
    let user = state.session.require_user().await?;
    state.engine.get_owned(conversation_id, user.id).await?;
    Ok(Json(state.engine.update_settings(conversation_id, payload).await?))
}

/// Pulls the character's current prompt into the conversation.
pub async fn sync_prompt(
    State(state): State<AppState>,
    Path(conversation_id): Path<Uuid>,
) -> ApiResult<Conversation> {
    let user = state.session.require_user().await?;
    let conversation = state.engine.get_owned(conversation_id, user.id).await?;
    let character = state.engine.character(conversation.character_id).await?;
    Ok(Json(
        state.engine.sync_system_prompt(conversation_id, &character).await?,
    ))
}
