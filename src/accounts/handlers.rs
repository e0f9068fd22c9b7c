use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{delete, post, put},
    Json, Router,
};
use tracing::instrument;

use crate::accounts::dto::{
    DeleteResponse, ForgotPasswordRequest, LoginRequest, MessageResponse, PublicUser,
    ResetPasswordRequest, SignupRequest, UpdateRoleRequest,
};
use crate::accounts::services;
use crate::accounts::services::RESET_SENT_MESSAGE;
use crate::error::AppError;
use crate::state::AppState;

pub fn account_routes() -> Router<AppState> {
    Router::new()
        .route("/accounts", post(signup).get(list_accounts))
        .route("/sessions", post(login))
        .route("/password-reset/codes", post(request_reset_code))
        .route("/password-reset/confirm", post(confirm_reset))
        .route("/accounts/:id/role", put(update_role))
        .route("/accounts/:id", delete(delete_account))
}

#[instrument(skip(state, payload))]
async fn signup(
    State(state): State<AppState>,
    Json(payload): Json<SignupRequest>,
) -> Result<(StatusCode, Json<PublicUser>), AppError> {
    let user = services::signup(&state, payload).await?;
    Ok((StatusCode::CREATED, Json(user)))
}

#[instrument(skip(state, payload))]
async fn login(
    State(state): State<AppState>,
    Json(payload): Json<LoginRequest>,
) -> Result<Json<PublicUser>, AppError> {
    let user = services::login(&state, payload).await?;
    Ok(Json(user))
}

#[instrument(skip(state, payload))]
async fn request_reset_code(
    State(state): State<AppState>,
    Json(payload): Json<ForgotPasswordRequest>,
) -> Result<Json<MessageResponse>, AppError> {
    services::forgot_password(&state, payload).await?;
    // Same body whether or not the email is registered.
    Ok(Json(MessageResponse::new(RESET_SENT_MESSAGE)))
}

#[instrument(skip(state, payload))]
async fn confirm_reset(
    State(state): State<AppState>,
    Json(payload): Json<ResetPasswordRequest>,
) -> Result<Json<MessageResponse>, AppError> {
    services::reset_password(&state, payload).await?;
    Ok(Json(MessageResponse::new("Password updated.")))
}

#[instrument(skip(state))]
async fn list_accounts(
    State(state): State<AppState>,
) -> Result<Json<Vec<PublicUser>>, AppError> {
    let users = services::list_users(&state).await?;
    Ok(Json(users))
}

#[instrument(skip(state, payload))]
async fn update_role(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(payload): Json<UpdateRoleRequest>,
) -> Result<Json<PublicUser>, AppError> {
    let user = services::update_role(&state, id, payload).await?;
    Ok(Json(user))
}

#[instrument(skip(state))]
async fn delete_account(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<DeleteResponse>, AppError> {
    services::delete_user(&state, id).await?;
    Ok(Json(DeleteResponse { success: true }))
}
