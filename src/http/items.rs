//! Item routes.

use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::http::error::ApiError;
use crate::http::server::AppState;
use crate::store::Item;

#[derive(Debug, Deserialize)]
pub struct Page {
    #[serde(default)]
    pub skip: usize,
    #[serde(default = "default_limit")]
    pub limit: usize,
}

fn default_limit() -> usize {
    10
}

pub async fn list_items(State(state): State<AppState>, Query(page): Query<Page>) -> Json<Vec<Item>> {
    Json(state.items.list(page.skip, page.limit))
}

pub async fn read_item(
    State(state): State<AppState>,
    Path(item_id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    let item = state.items.get(&item_id).ok_or(ApiError::ItemNotFound)?;
    Ok(Json(json!({ "item_id": item_id, "name": item.title })))
}

pub async fn create_item(
    State(state): State<AppState>,
    Json(item): Json<Item>,
) -> Result<Json<Value>, ApiError> {
    let created = json!({ "id": item.id, "description": item.description });
    state.items.insert(item)?;
    tracing::info!(item = %created["id"], "Item created");
    Ok(Json(created))
}
