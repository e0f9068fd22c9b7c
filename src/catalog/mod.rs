use crate::state::AppState;
use axum::Router;

pub mod handlers;
pub mod store;
pub mod wishlist;

pub fn router() -> Router<AppState> {
    handlers::catalog_routes()
}
