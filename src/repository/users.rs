//! Users repository for database operations

use sqlx::{Executor, PgConnection, Postgres};

use crate::{
    error::{AppError, AppResult},
    models::User,
};

pub(crate) async fn get_by_id<'e, E>(executor: E, id: i32) -> AppResult<User>
where
    E: Executor<'e, Database = Postgres>,
{
    sqlx::query_as::<_, User>(
        "SELECT id, username, first_name, last_name, email, role FROM users WHERE id = $1",
    )
    .bind(id)
    .fetch_optional(executor)
    .await?
    .ok_or_else(|| AppError::NotFound(format!("User with id {} not found", id)))
}

/// Load a user and hold a row lock on it, serializing that student's borrows
pub(crate) async fn lock_by_id(conn: &mut PgConnection, id: i32) -> AppResult<User> {
    sqlx::query_as::<_, User>(
        "SELECT id, username, first_name, last_name, email, role FROM users WHERE id = $1 FOR UPDATE",
    )
    .bind(id)
    .fetch_optional(conn)
    .await?
    .ok_or_else(|| AppError::NotFound(format!("User with id {} not found", id)))
}
