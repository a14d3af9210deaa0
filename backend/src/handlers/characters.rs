use super::ApiResult;
use crate::AppState;
use axum::{
    Json,
    extract::{Path, Query, State},
};
use serde::Deserialize;
use shared::catalog::{all_tags, filter_by_tag};
use shared::models::Character;
use uuid::Uuid;

#[derive(Debug, Deserialize)]
pub struct CatalogQuery {
    pub tag: Option<String>,
}

pub async fn list_characters(
    State(state): State<AppState>,
    Query(query): Query<CatalogQuery>,
) -> ApiResult<Vec<Character>> {
    let characters = state.slots.characters.get().await;
    let filtered = filter_by_tag(&characters, query.tag.as_deref())
        .into_iter()
        .cloned()
        .collect();
    Ok(Json(filtered))
}

pub async fn get_character(
    State(state): State<AppState>,
    Path(character_id): Path<Uuid>,
) -> ApiResult<Character> {
    Ok(Json(state.engine.character(character_id).await?))
}

pub async fn list_tags(State(state): State<AppState>) -> ApiResult<Vec<String>> {
    Ok(Json(all_tags(&state.slots.characters.get().await)))
}
