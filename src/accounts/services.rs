use lazy_static::lazy_static;
use regex::Regex;
use tracing::{info, warn};

use crate::accounts::authz::AccountAction;
use crate::accounts::dto::{
    ForgotPasswordRequest, LoginRequest, PublicUser, ResetPasswordRequest, SignupRequest,
    UpdateRoleRequest,
};
use crate::accounts::mailer::{reset_email_bodies, RESET_SUBJECT};
use crate::accounts::password::{hash_password, verify_password};
use crate::accounts::repo::{User, ROOT_USER_ID};
use crate::error::{AppError, AppResult};
use crate::state::AppState;

pub const ROLES: [&str; 2] = ["user", "admin"];

/// Body returned by forgot-password whether or not the email is registered.
pub const RESET_SENT_MESSAGE: &str =
    "If this email is associated with an account, a code has been sent.";

/// One `@`, at least one dot in the domain part, no whitespace anywhere.
pub(crate) fn is_valid_email(email: &str) -> bool {
    lazy_static! {
        static ref EMAIL_RE: Regex = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap();
    }
    EMAIL_RE.is_match(email)
}

/// Trim and lower-case, applied identically at write and at lookup input.
pub(crate) fn normalize_email(raw: &str) -> String {
    raw.trim().to_lowercase()
}

fn require(value: &str, name: &str) -> AppResult<()> {
    if value.trim().is_empty() {
        return Err(AppError::validation(format!("{name} is required.")));
    }
    Ok(())
}

pub async fn signup(state: &AppState, req: SignupRequest) -> AppResult<PublicUser> {
    require(&req.username, "username")?;
    require(&req.email, "email")?;
    require(&req.password, "password")?;

    let email = normalize_email(&req.email);
    if !is_valid_email(&email) {
        warn!(email = %email, "signup with invalid email");
        return Err(AppError::validation("Invalid email address."));
    }

    if User::find_by_email(&state.db, &email).await?.is_some() {
        warn!(email = %email, "signup with already registered email");
        return Err(AppError::DuplicateEmail);
    }

    let hash = hash_password(&req.password)?;
    let user = User::create(&state.db, &req.username, &email, &hash).await?;

    info!(user_id = user.id, email = %user.email, "user registered");
    Ok(user.into())
}

pub async fn login(state: &AppState, req: LoginRequest) -> AppResult<PublicUser> {
    require(&req.username, "username")?;
    require(&req.password, "password")?;

    // Unknown username and wrong password take the same exit so the response
    // never reveals which one it was.
    let Some(user) = User::find_by_username(&state.db, &req.username).await? else {
        warn!(username = %req.username, "login with unknown username");
        return Err(AppError::InvalidCredentials);
    };

    if !verify_password(&req.password, &user.password_hash) {
        warn!(user_id = user.id, "login with wrong password");
        return Err(AppError::InvalidCredentials);
    }

    info!(user_id = user.id, "user logged in");
    Ok(user.into())
}

/// Issue a reset code and mail it. The caller's response is identical whether
/// or not the email belongs to an account; only the registered case issues a
/// code. A mail failure revokes the just-issued code so no valid code exists
/// that the user was never told about.
pub async fn forgot_password(state: &AppState, req: ForgotPasswordRequest) -> AppResult<()> {
    require(&req.email, "email")?;
    let email = normalize_email(&req.email);

    let Some(user) = User::find_by_email(&state.db, &email).await? else {
        info!("reset code requested for unknown email");
        return Ok(());
    };

    let code = state.reset_codes.issue(&email, user.id);
    let (text, html) = reset_email_bodies(&code);
    if let Err(e) = state.mailer.send(&email, RESET_SUBJECT, &text, &html).await {
        state.reset_codes.revoke(&email);
        return Err(AppError::Mail(e));
    }

    info!(user_id = user.id, "reset code issued");
    Ok(())
}

/// Consume a reset code and patch the stored password hash. All failure modes
/// (no pending code, wrong digits, expired, user gone) collapse into the one
/// generic invalid-code outcome.
pub async fn reset_password(state: &AppState, req: ResetPasswordRequest) -> AppResult<()> {
    require(&req.email, "email")?;
    require(&req.code, "code")?;
    require(&req.new_password, "newPassword")?;

    let email = normalize_email(&req.email);
    let Some(user_id) = state.reset_codes.verify_and_consume(&email, &req.code) else {
        warn!("password reset with invalid or expired code");
        return Err(AppError::InvalidResetCode);
    };

    let hash = hash_password(&req.new_password)?;
    User::update_password_hash(&state.db, user_id, &hash)
        .await
        .map_err(|e| match e {
            AppError::NotFound => AppError::InvalidResetCode,
            other => other,
        })?;

    info!(user_id, "password reset");
    Ok(())
}

pub async fn update_role(state: &AppState, id: i64, req: UpdateRoleRequest) -> AppResult<PublicUser> {
    if !ROLES.contains(&req.role.as_str()) {
        return Err(AppError::validation("Role must be 'user' or 'admin'."));
    }

    state.authz.authorize(&AccountAction::UpdateRole { target: id })?;

    let user = User::update_role(&state.db, id, &req.role).await?;
    info!(user_id = id, role = %user.role, "role updated");
    Ok(user.into())
}

pub async fn delete_user(state: &AppState, id: i64) -> AppResult<()> {
    state.authz.authorize(&AccountAction::DeleteUser { target: id })?;

    // Holds regardless of what the authorizer said.
    if id == ROOT_USER_ID {
        warn!("attempt to delete the root account");
        return Err(AppError::Forbidden("The root account cannot be deleted.".into()));
    }

    User::delete(&state.db, id).await?;
    info!(user_id = id, "user deleted");
    Ok(())
}

pub async fn list_users(state: &AppState) -> AppResult<Vec<PublicUser>> {
    let users = User::list(&state.db).await?;
    Ok(users.into_iter().map(PublicUser::from).collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn email_shape_validation() {
        assert!(is_valid_email("alice@test.com"));
        assert!(is_valid_email("a.b+c@sub.domain.tld"));
        assert!(!is_valid_email("no-at-sign.com"));
        assert!(!is_valid_email("alice@dotless"));
        assert!(!is_valid_email("alice@te st.com"));
        assert!(!is_valid_email("ali ce@test.com"));
        assert!(!is_valid_email("two@@test.com"));
        assert!(!is_valid_email(""));
    }

    #[test]
    fn email_normalization_trims_and_lowercases() {
        assert_eq!(normalize_email(" Alice@Test.com "), "alice@test.com");
        assert_eq!(normalize_email("alice@test.com"), "alice@test.com");
        assert_eq!(normalize_email("\tBOB@EXAMPLE.ORG\n"), "bob@example.org");
    }

    #[test]
    fn normalized_variants_collide() {
        // Signing up twice with these must yield one success and one conflict.
        assert_eq!(
            normalize_email("Alice@Test.com "),
            normalize_email("alice@test.com")
        );
    }

    #[test]
    fn required_fields_are_checked_after_trimming() {
        assert!(require("alice", "username").is_ok());
        assert!(require("", "username").is_err());
        assert!(require("   ", "password").is_err());
    }

    #[test]
    fn only_known_roles_pass() {
        assert!(ROLES.contains(&"user"));
        assert!(ROLES.contains(&"admin"));
        assert!(!ROLES.contains(&"superadmin"));
        assert!(!ROLES.contains(&"Admin"));
    }

    #[tokio::test]
    async fn delete_root_is_forbidden_before_any_store_call() {
        // The fake state's pool is lazy and never connects; the root check
        // must reject the delete before the store is ever reached.
        let state = AppState::fake();
        let err = delete_user(&state, ROOT_USER_ID).await.unwrap_err();
        assert!(matches!(err, AppError::Forbidden(_)));
    }
}
