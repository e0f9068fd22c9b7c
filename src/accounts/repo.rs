use serde::Serialize;
use sqlx::{FromRow, PgPool};
use time::OffsetDateTime;

use crate::error::{AppError, AppResult};

/// Reserved account that can never be deleted, regardless of caller role.
pub const ROOT_USER_ID: i64 = 1;

/// User record. Usernames are free text and deliberately NOT unique; emails
/// are stored normalized (trimmed, lower-cased) and unique.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct User {
    pub id: i64,
    pub username: String,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub role: String,
    pub created_at: OffsetDateTime,
}

impl User {
    /// Insert a new user with the default `user` role. The caller has already
    /// checked for an existing email; the unique index is the backstop for
    /// concurrent signups racing past that check.
    pub async fn create(
        db: &PgPool,
        username: &str,
        email: &str,
        password_hash: &str,
    ) -> AppResult<User> {
        let user = sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (username, email, password_hash)
            VALUES ($1, $2, $3)
            RETURNING id, username, email, password_hash, role, created_at
            "#,
        )
        .bind(username)
        .bind(email)
        .bind(password_hash)
        .fetch_one(db)
        .await
        .map_err(|e| match &e {
            sqlx::Error::Database(db_err) if db_err.code().as_deref() == Some("23505") => {
                AppError::DuplicateEmail
            }
            _ => AppError::Database(e),
        })?;
        Ok(user)
    }

    /// Case-sensitive exact match. Duplicate usernames are allowed, so this
    /// returns the oldest match on ambiguity.
    pub async fn find_by_username(db: &PgPool, username: &str) -> AppResult<Option<User>> {
        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT id, username, email, password_hash, role, created_at
            FROM users
            WHERE username = $1
            ORDER BY id
            LIMIT 1
            "#,
        )
        .bind(username)
        .fetch_optional(db)
        .await?;
        Ok(user)
    }

    /// Lookup by normalized email; the caller normalizes its input first.
    pub async fn find_by_email(db: &PgPool, email: &str) -> AppResult<Option<User>> {
        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT id, username, email, password_hash, role, created_at
            FROM users
            WHERE email = $1
            "#,
        )
        .bind(email)
        .fetch_optional(db)
        .await?;
        Ok(user)
    }

    pub async fn update_password_hash(db: &PgPool, id: i64, new_hash: &str) -> AppResult<()> {
        let result = sqlx::query("UPDATE users SET password_hash = $1 WHERE id = $2")
            .bind(new_hash)
            .bind(id)
            .execute(db)
            .await?;
        if result.rows_affected() == 0 {
            return Err(AppError::NotFound);
        }
        Ok(())
    }

    /// `role` has been validated at the service boundary already.
    pub async fn update_role(db: &PgPool, id: i64, role: &str) -> AppResult<User> {
        let user = sqlx::query_as::<_, User>(
            r#"
            UPDATE users
            SET role = $1
            WHERE id = $2
            RETURNING id, username, email, password_hash, role, created_at
            "#,
        )
        .bind(role)
        .bind(id)
        .fetch_optional(db)
        .await?
        .ok_or(AppError::NotFound)?;
        Ok(user)
    }

    /// Delete a user together with their wishlist rows in one transaction, so
    /// a crash cannot leave a wishlist entry pointing at a deleted user.
    pub async fn delete(db: &PgPool, id: i64) -> AppResult<()> {
        let mut tx = db.begin().await?;

        sqlx::query("DELETE FROM wishlists WHERE user_id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        let result = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        if result.rows_affected() == 0 {
            // Dropping the transaction rolls back the wishlist delete.
            return Err(AppError::NotFound);
        }

        tx.commit().await?;
        Ok(())
    }

    pub async fn list(db: &PgPool) -> AppResult<Vec<User>> {
        let users = sqlx::query_as::<_, User>(
            r#"
            SELECT id, username, email, password_hash, role, created_at
            FROM users
            ORDER BY id
            "#,
        )
        .fetch_all(db)
        .await?;
        Ok(users)
    }
}
