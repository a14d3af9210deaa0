use super::{ApiError, ApiResult};
use crate::AppState;
use axum::{
    Json,
    extract::{Path, State},
    http::header,
    response::IntoResponse,
};
use shared::models::{
    BalanceAdjustment, Character, CharacterRequest, Conversation, PublicUser, Reselect,
};
use uuid::Uuid;

pub async fn list_users(State(state): State<AppState>) -> ApiResult<Vec<PublicUser>> {
    Ok(Json(state.admin.users().await?))
}

pub async fn adjust_user_balance(
    State(state): State<AppState>,
    Path(user_id): Path<Uuid>,
    Json(payload): Json<BalanceAdjustment>,
) -> ApiResult<PublicUser> {
    Ok(Json(state.admin.adjust_balance(user_id, payload).await?))
}

pub async fn create_character(
    State(state): State<AppState>,
    Json(payload): Json<CharacterRequest>,
) -> ApiResult<Character> {
    Ok(Json(state.admin.create_character(payload).await?))
}

pub async fn update_character(
    State(state): State<AppState>,
    Path(character_id): Path<Uuid>,
    Json(payload): Json<CharacterRequest>,
) -> ApiResult<Character> {
    Ok(Json(state.admin.update_character(character_id, payload).await?))
}

pub async fn delete_character(
    State(state): State<AppState>,
    Path(character_id): Path<Uuid>,
) -> ApiResult<()> {
    state.admin.delete_character(character_id).await?;
    Ok(Json(()))
}

pub async fn all_conversations(State(state): State<AppState>) -> ApiResult<Vec<Conversation>> {
    Ok(Json(state.admin.conversations().await?))
}

pub async fn remove_conversation(
    State(state): State<AppState>,
    Path(conversation_id): Path<Uuid>,
) -> ApiResult<Reselect> {
    Ok(Json(state.admin.delete_conversation(conversation_id).await?))
}

pub async fn export_conversations(
    State(state): State<AppState>,
) -> Result<impl IntoResponse, ApiError> {
    let csv = state.admin.export_csv().await?;
    Ok((
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8"),
            (
                header::CONTENT_DISPOSITION,
                "attachment; filename=\"conversations_export.csv\"",
            ),
        ],
        csv,
    ))
}
