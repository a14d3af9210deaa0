use super::ApiResult;
use crate::AppState;
use crate::engine::TurnOutcome;
use axum::{
    Json,
    extract::{Path, State},
};
use shared::models::{SendMessageRequest, TurnResponse};
use uuid::Uuid;

impl From<TurnOutcome> for TurnResponse {
    fn from(outcome: TurnOutcome) -> Self {
        match outcome {
            TurnOutcome::Replied {
                conversation,
                user,
                cost,
            } => TurnResponse::Replied {
                conversation,
                balance: user.balance,
                cost,
            },
            TurnOutcome::Failed { conversation } => TurnResponse::Failed { conversation },
            TurnOutcome::InsufficientBalance { conversation } => {
                TurnResponse::InsufficientBalance { conversation }
            }
            TurnOutcome::Discarded => TurnResponse::Discarded,
        }
    }
}

/// Sends the message and waits for the reply.
pub async fn send_message(
    State(state): State<AppState>,
    Path(conversation_id): Path<Uuid>,
    Json(payload): Json<SendMessageRequest>,
) -> ApiResult<TurnResponse> {
    let user = state.session.require_user().await?;
    let outcome = state
        .engine
        .send_message(conversation_id, &user, &payload.content, payload.attachment)
        .await?;
    Ok(Json(outcome.into()))
}
