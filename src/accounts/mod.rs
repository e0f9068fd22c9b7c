use crate::state::AppState;
use axum::Router;

pub mod authz;
mod dto;
pub mod handlers;
pub mod mailer;
pub mod password;
pub mod repo;
pub mod reset;
pub mod services;

pub fn router() -> Router<AppState> {
    handlers::account_routes()
}
