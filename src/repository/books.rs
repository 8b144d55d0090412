//! Books repository for database operations

use sqlx::{Executor, PgConnection, Pool, Postgres, QueryBuilder};

use crate::{
    error::{AppError, AppResult},
    models::{Book, BookFilter, CreateBook, PageRequest, Paginated},
};

#[derive(Clone)]
pub struct BooksRepository {
    pool: Pool<Postgres>,
}

impl BooksRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    /// Get book by ID
    pub async fn get_by_id(&self, id: i32) -> AppResult<Book> {
        get_by_id(&self.pool, id).await
    }

    /// List books with filters and pagination
    pub async fn list(&self, filter: &BookFilter, page: PageRequest) -> AppResult<Paginated<Book>> {
        let mut count = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM books");
        push_filter(&mut count, filter);
        let total: i64 = count.build_query_scalar().fetch_one(&self.pool).await?;

        let mut query =
            QueryBuilder::<Postgres>::new("SELECT id, name, total_qty, available_qty FROM books");
        push_filter(&mut query, filter);
        query
            .push(" ORDER BY name, id LIMIT ")
            .push_bind(page.limit())
            .push(" OFFSET ")
            .push_bind(page.offset());
        let books = query.build_query_as::<Book>().fetch_all(&self.pool).await?;

        Ok(Paginated::new(books, total, page))
    }

    /// Create a book with every copy available
    pub async fn create(&self, book: &CreateBook) -> AppResult<Book> {
        sqlx::query_as::<_, Book>(
            r#"
            INSERT INTO books (name, total_qty, available_qty)
            VALUES ($1, $2, $2)
            RETURNING id, name, total_qty, available_qty
            "#,
        )
        .bind(&book.name)
        .bind(book.total_qty)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| match e {
            sqlx::Error::Database(ref db) if db.is_unique_violation() => {
                AppError::Conflict(format!("A book named {} already exists", book.name))
            }
            other => AppError::Database(other),
        })
    }
}

fn push_filter(query: &mut QueryBuilder<'_, Postgres>, filter: &BookFilter) {
    query.push(" WHERE 1=1");
    if let Some(ref name) = filter.name {
        query
            .push(" AND name ILIKE ")
            .push_bind(format!("%{}%", escape_like(name)));
    }
    if let Some(available) = filter.available {
        if available {
            query.push(" AND available_qty > 0");
        } else {
            query.push(" AND available_qty = 0");
        }
    }
}

/// Escape LIKE wildcards in user input
fn escape_like(input: &str) -> String {
    input
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_")
}

pub(crate) async fn get_by_id<'e, E>(executor: E, id: i32) -> AppResult<Book>
where
    E: Executor<'e, Database = Postgres>,
{
    sqlx::query_as::<_, Book>("SELECT id, name, total_qty, available_qty FROM books WHERE id = $1")
        .bind(id)
        .fetch_optional(executor)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Book with id {} not found", id)))
}

/// Load a book and hold a row lock on it
pub(crate) async fn lock_by_id(conn: &mut PgConnection, id: i32) -> AppResult<Book> {
    sqlx::query_as::<_, Book>(
        "SELECT id, name, total_qty, available_qty FROM books WHERE id = $1 FOR UPDATE",
    )
    .bind(id)
    .fetch_optional(conn)
    .await?
    .ok_or_else(|| AppError::NotFound(format!("Book with id {} not found", id)))
}

pub(crate) async fn decrement_available(conn: &mut PgConnection, id: i32) -> AppResult<()> {
    let result = sqlx::query(
        "UPDATE books SET available_qty = available_qty - 1 WHERE id = $1 AND available_qty > 0",
    )
    .bind(id)
    .execute(conn)
    .await?;

    if result.rows_affected() == 0 {
        return Err(AppError::Conflict(format!(
            "No copy of book {} left to lend",
            id
        )));
    }
    Ok(())
}

pub(crate) async fn increment_available(conn: &mut PgConnection, id: i32) -> AppResult<()> {
    let result = sqlx::query(
        "UPDATE books SET available_qty = available_qty + 1 WHERE id = $1 AND available_qty < total_qty",
    )
    .bind(id)
    .execute(conn)
    .await?;

    if result.rows_affected() == 0 {
        return Err(AppError::Conflict(format!(
            "Every copy of book {} is already on the shelf",
            id
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_escape_like() {
        assert_eq!(escape_like("100%_done"), "100\\%\\_done");
        assert_eq!(escape_like("plain"), "plain");
    }
}
