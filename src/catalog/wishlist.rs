use serde_json::Value;
use sqlx::PgPool;

use crate::catalog::store::Record;
use crate::error::{AppError, AppResult};

/// Add a property card to a user's wishlist. Idempotent: adding an existing
/// pair is a no-op. A missing user or card surfaces as NotFound via the
/// foreign keys.
pub async fn add(db: &PgPool, user_id: i64, card_id: i64) -> AppResult<()> {
    sqlx::query(
        r#"
        INSERT INTO wishlists (user_id, card_id)
        VALUES ($1, $2)
        ON CONFLICT (user_id, card_id) DO NOTHING
        "#,
    )
    .bind(user_id)
    .bind(card_id)
    .execute(db)
    .await
    .map_err(|e| match &e {
        sqlx::Error::Database(db_err) if db_err.code().as_deref() == Some("23503") => {
            AppError::NotFound
        }
        _ => AppError::Database(e),
    })?;
    Ok(())
}

pub async fn remove(db: &PgPool, user_id: i64, card_id: i64) -> AppResult<()> {
    let result = sqlx::query("DELETE FROM wishlists WHERE user_id = $1 AND card_id = $2")
        .bind(user_id)
        .bind(card_id)
        .execute(db)
        .await?;
    if result.rows_affected() == 0 {
        return Err(AppError::NotFound);
    }
    Ok(())
}

/// The property cards on a user's wishlist, newest first.
pub async fn list_for_user(db: &PgPool, user_id: i64) -> AppResult<Vec<Record>> {
    let rows: Vec<(i64, Value)> = sqlx::query_as(
        r#"
        SELECT c.id, c.data
        FROM wishlists w
        JOIN property_cards c ON c.id = w.card_id
        WHERE w.user_id = $1
        ORDER BY c.id DESC
        "#,
    )
    .bind(user_id)
    .fetch_all(db)
    .await?;
    Ok(rows
        .into_iter()
        .map(|(id, data)| Record::from_row(id, data))
        .collect())
}
