//! Borrowed books repository for database operations

use chrono::{DateTime, Utc};
use sqlx::{PgConnection, Pool, Postgres, QueryBuilder};

use crate::{
    error::{AppError, AppResult},
    models::{BorrowedBook, BorrowedBookFilter, NewBorrowedBook, PageRequest, Paginated},
};

#[derive(Clone)]
pub struct BorrowedBooksRepository {
    pool: Pool<Postgres>,
}

impl BorrowedBooksRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    /// List borrow records, newest first
    pub async fn list(
        &self,
        filter: &BorrowedBookFilter,
        page: PageRequest,
    ) -> AppResult<Paginated<BorrowedBook>> {
        let mut count = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM borrowed_books");
        push_filter(&mut count, filter);
        let total: i64 = count.build_query_scalar().fetch_one(&self.pool).await?;

        let mut query = QueryBuilder::<Postgres>::new(
            "SELECT id, student_id, book_id, borrow_date, due_date, return_date, is_renewed FROM borrowed_books",
        );
        push_filter(&mut query, filter);
        query
            .push(" ORDER BY borrow_date DESC, id DESC LIMIT ")
            .push_bind(page.limit())
            .push(" OFFSET ")
            .push_bind(page.offset());
        let records = query
            .build_query_as::<BorrowedBook>()
            .fetch_all(&self.pool)
            .await?;

        Ok(Paginated::new(records, total, page))
    }
}

fn push_filter(query: &mut QueryBuilder<'_, Postgres>, filter: &BorrowedBookFilter) {
    query.push(" WHERE 1=1");
    if let Some(student_id) = filter.student_id {
        query.push(" AND student_id = ").push_bind(student_id);
    }
    if let Some(book_id) = filter.book_id {
        query.push(" AND book_id = ").push_bind(book_id);
    }
    if let Some(open) = filter.open {
        if open {
            query.push(" AND return_date IS NULL");
        } else {
            query.push(" AND return_date IS NOT NULL");
        }
    }
}

pub(crate) async fn open_for(
    conn: &mut PgConnection,
    student_id: i32,
    book_id: i32,
) -> AppResult<Vec<BorrowedBook>> {
    let records = sqlx::query_as::<_, BorrowedBook>(
        r#"
        SELECT id, student_id, book_id, borrow_date, due_date, return_date, is_renewed
        FROM borrowed_books
        WHERE student_id = $1 AND book_id = $2 AND return_date IS NULL
        ORDER BY borrow_date, id
        FOR UPDATE
        "#,
    )
    .bind(student_id)
    .bind(book_id)
    .fetch_all(conn)
    .await?;

    Ok(records)
}

pub(crate) async fn count_open(conn: &mut PgConnection, student_id: i32) -> AppResult<i64> {
    let count: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM borrowed_books WHERE student_id = $1 AND return_date IS NULL",
    )
    .bind(student_id)
    .fetch_one(conn)
    .await?;
    Ok(count)
}

pub(crate) async fn earliest_due_date(
    conn: &mut PgConnection,
    book_id: i32,
) -> AppResult<DateTime<Utc>> {
    let due: Option<DateTime<Utc>> = sqlx::query_scalar(
        "SELECT MIN(due_date) FROM borrowed_books WHERE book_id = $1 AND return_date IS NULL",
    )
    .bind(book_id)
    .fetch_one(conn)
    .await?;

    due.ok_or_else(|| AppError::NotFound(format!("Book {} has no open borrow records", book_id)))
}

pub(crate) async fn insert(
    conn: &mut PgConnection,
    record: &NewBorrowedBook,
) -> AppResult<BorrowedBook> {
    sqlx::query_as::<_, BorrowedBook>(
        r#"
        INSERT INTO borrowed_books (student_id, book_id, borrow_date, due_date, is_renewed)
        VALUES ($1, $2, $3, $4, $5)
        RETURNING id, student_id, book_id, borrow_date, due_date, return_date, is_renewed
        "#,
    )
    .bind(record.student_id)
    .bind(record.book_id)
    .bind(record.borrow_date)
    .bind(record.due_date)
    .bind(record.is_renewed)
    .fetch_one(conn)
    .await
    .map_err(|e| match e {
        sqlx::Error::Database(ref db) if db.is_unique_violation() => AppError::Conflict(format!(
            "Student {} already has an open record for book {}",
            record.student_id, record.book_id
        )),
        other => AppError::Database(other),
    })
}

pub(crate) async fn set_return_date(
    conn: &mut PgConnection,
    id: i32,
    at: DateTime<Utc>,
) -> AppResult<BorrowedBook> {
    sqlx::query_as::<_, BorrowedBook>(
        r#"
        UPDATE borrowed_books SET return_date = $2
        WHERE id = $1 AND return_date IS NULL
        RETURNING id, student_id, book_id, borrow_date, due_date, return_date, is_renewed
        "#,
    )
    .bind(id)
    .bind(at)
    .fetch_optional(conn)
    .await?
    .ok_or_else(|| AppError::Conflict(format!("Borrow record {} is already closed", id)))
}
