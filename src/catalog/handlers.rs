use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{delete, get},
    Json, Router,
};
use serde::Deserialize;
use serde_json::Value;
use tracing::instrument;

use crate::catalog::store::{CatalogTable, PgResourceStore, Record, ResourceStore};
use crate::catalog::wishlist;
use crate::error::{AppError, AppResult};
use crate::state::AppState;

/// One uniform set of handlers serves all catalog entities; the first path
/// segment picks the table. Static routes elsewhere (accounts, sessions,
/// password-reset, health) take precedence over the capture.
pub fn catalog_routes() -> Router<AppState> {
    Router::new()
        .route("/:resource", get(list_resources).post(create_resource))
        .route(
            "/:resource/:id",
            get(get_resource).put(update_resource).delete(delete_resource),
        )
        .route(
            "/accounts/:id/wishlist",
            get(list_wishlist).post(add_to_wishlist),
        )
        .route(
            "/accounts/:id/wishlist/:card_id",
            delete(remove_from_wishlist),
        )
}

fn store_for(state: &AppState, resource: &str) -> AppResult<PgResourceStore> {
    let table: CatalogTable = resource.parse().map_err(|_| AppError::NotFound)?;
    Ok(PgResourceStore::new(state.db.clone(), table))
}

/// Optional JSONB containment filter, e.g. `?filter={"city":"Lisbon"}`.
#[derive(Debug, Deserialize)]
struct ListParams {
    filter: Option<String>,
}

#[instrument(skip(state))]
async fn list_resources(
    State(state): State<AppState>,
    Path(resource): Path<String>,
    Query(params): Query<ListParams>,
) -> Result<Json<Vec<Record>>, AppError> {
    let store = store_for(&state, &resource)?;
    let filter = params
        .filter
        .map(|raw| {
            serde_json::from_str::<Value>(&raw)
                .map_err(|_| AppError::validation("Filter must be valid JSON."))
        })
        .transpose()?;
    Ok(Json(store.list(filter).await?))
}

#[instrument(skip(state))]
async fn get_resource(
    State(state): State<AppState>,
    Path((resource, id)): Path<(String, String)>,
) -> Result<Json<Record>, AppError> {
    let store = store_for(&state, &resource)?;
    Ok(Json(store.get(&id).await?))
}

#[instrument(skip(state, payload))]
async fn create_resource(
    State(state): State<AppState>,
    Path(resource): Path<String>,
    Json(payload): Json<Value>,
) -> Result<(StatusCode, Json<Record>), AppError> {
    let store = store_for(&state, &resource)?;
    let record = store.create(payload).await?;
    Ok((StatusCode::CREATED, Json(record)))
}

#[instrument(skip(state, patch))]
async fn update_resource(
    State(state): State<AppState>,
    Path((resource, id)): Path<(String, String)>,
    Json(patch): Json<Value>,
) -> Result<Json<Record>, AppError> {
    let store = store_for(&state, &resource)?;
    Ok(Json(store.update(&id, patch).await?))
}

#[instrument(skip(state))]
async fn delete_resource(
    State(state): State<AppState>,
    Path((resource, id)): Path<(String, String)>,
) -> Result<Json<serde_json::Value>, AppError> {
    let store = store_for(&state, &resource)?;
    store.delete(&id).await?;
    Ok(Json(serde_json::json!({ "success": true })))
}

#[derive(Debug, Deserialize)]
struct WishlistAddRequest {
    card_id: String,
}

fn parse_boundary_id(id: &str) -> AppResult<i64> {
    id.parse::<i64>()
        .map_err(|_| AppError::validation("Invalid id."))
}

#[instrument(skip(state))]
async fn list_wishlist(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<Vec<Record>>, AppError> {
    Ok(Json(wishlist::list_for_user(&state.db, id).await?))
}

#[instrument(skip(state, payload))]
async fn add_to_wishlist(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(payload): Json<WishlistAddRequest>,
) -> Result<(StatusCode, Json<serde_json::Value>), AppError> {
    let card_id = parse_boundary_id(&payload.card_id)?;
    wishlist::add(&state.db, id, card_id).await?;
    Ok((StatusCode::CREATED, Json(serde_json::json!({ "success": true }))))
}

#[instrument(skip(state))]
async fn remove_from_wishlist(
    State(state): State<AppState>,
    Path((id, card_id)): Path<(i64, i64)>,
) -> Result<Json<serde_json::Value>, AppError> {
    wishlist::remove(&state.db, id, card_id).await?;
    Ok(Json(serde_json::json!({ "success": true })))
}
