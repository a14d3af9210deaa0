use super::ApiResult;
use crate::AppState;
use axum::{Json, extract::State};
use shared::billing::{PURCHASE_PLANS, PurchaseOffer};
use shared::models::{Preferences, PreferencesUpdate};

async fn current(state: &AppState) -> Preferences {
    Preferences {
        theme: state.slots.theme.get().await,
        muted: state.slots.muted.get().await,
    }
}

pub async fn get_preferences(State(state): State<AppState>) -> ApiResult<Preferences> {
    Ok(Json(current(&state).await))
}

pub async fn update_preferences(
    State(state): State<AppState>,
    Json(payload): Json<PreferencesUpdate>,
) -> ApiResult<Preferences> {
    if let Some(theme) = payload.theme {
        state.slots.theme.set_value(theme).await?;
    }
    if let Some(muted) = payload.muted {
        state.slots.muted.set_value(muted).await?;
    }
    Ok(Json(current(&state).await))
}

pub async fn toggle_theme(State(state): State<AppState>) -> ApiResult<Preferences> {
    state.slots.theme.update_value(|theme| *theme = theme.toggled()).await?;
    Ok(Json(current(&state).await))
}

/// Coin packs. Buying one happens over the contact channel, not here.
pub async fn list_plans(State(state): State<AppState>) -> ApiResult<PurchaseOffer> {
    Ok(Json(PurchaseOffer {
        plans: PURCHASE_PLANS.to_vec(),
        contact_url: state.contact_url.to_string(),
    }))
}
