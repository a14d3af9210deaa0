use super::ApiResult;
use crate::AppState;
use crate::session::AuthError;
use axum::{Json, extract::State};
use shared::models::{AdminElevationRequest, Credentials, PublicUser};

pub async fn signup(
    State(state): State<AppState>,
    Json(payload): Json<Credentials>,
) -> ApiResult<PublicUser> {
    let user = state.session.signup(&payload.email, &payload.password).await?;
    Ok(Json(user.public()))
}

pub async fn login(
    State(state): State<AppState>,
    Json(payload): Json<Credentials>,
) -> ApiResult<PublicUser> {
    let user = state.session.login(&payload.email, &payload.password).await?;
    Ok(Json(user.public()))
}

pub async fn logout(State(state): State<AppState>) -> ApiResult<()> {
    state.session.logout().await?;
    Ok(Json(()))
}

pub async fn me(State(state): State<AppState>) -> ApiResult<PublicUser> {
    let user = state.session.require_user().await?;
    Ok(Json(user.public()))
}

pub async fn elevate_admin(
    State(state): State<AppState>,
    Json(payload): Json<AdminElevationRequest>,
) -> ApiResult<()> {
    if !state.session.elevate_admin(&payload.passphrase) {
        return Err(AuthError::NotAdmin.into());
    }
    Ok(Json(()))
}
