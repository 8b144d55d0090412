//! PostgreSQL storage backend

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{Pool, Postgres, Transaction};

use super::{
    books::{self, BooksRepository},
    borrowed_books::{self, BorrowedBooksRepository},
    users, Storage, StorageTx,
};
use crate::{
    error::AppResult,
    models::{
        Book, BookFilter, BorrowedBook, BorrowedBookFilter, CreateBook, NewBorrowedBook,
        PageRequest, Paginated, User,
    },
};

/// Storage backed by a PostgreSQL pool
#[derive(Clone)]
pub struct PgStorage {
    pub pool: Pool<Postgres>,
    pub books: BooksRepository,
    pub borrowed_books: BorrowedBooksRepository,
}

impl PgStorage {
    /// Create a new storage with the given database pool
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self {
            books: BooksRepository::new(pool.clone()),
            borrowed_books: BorrowedBooksRepository::new(pool.clone()),
            pool,
        }
    }
}

#[async_trait]
impl Storage for PgStorage {
    async fn begin(&self) -> AppResult<Box<dyn StorageTx>> {
        let tx = self.pool.begin().await?;
        Ok(Box::new(PgTx { tx }))
    }

    async fn ping(&self) -> AppResult<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    async fn get_book(&self, id: i32) -> AppResult<Book> {
        self.books.get_by_id(id).await
    }

    async fn list_books(
        &self,
        filter: &BookFilter,
        page: PageRequest,
    ) -> AppResult<Paginated<Book>> {
        self.books.list(filter, page).await
    }

    async fn create_book(&self, book: &CreateBook) -> AppResult<Book> {
        self.books.create(book).await
    }

    async fn list_borrowed_books(
        &self,
        filter: &BorrowedBookFilter,
        page: PageRequest,
    ) -> AppResult<Paginated<BorrowedBook>> {
        self.borrowed_books.list(filter, page).await
    }

    async fn get_user(&self, id: i32) -> AppResult<User> {
        users::get_by_id(&self.pool, id).await
    }
}

/// Read-committed transaction; locks taken with `FOR UPDATE` last until commit
pub struct PgTx {
    tx: Transaction<'static, Postgres>,
}

#[async_trait]
impl StorageTx for PgTx {
    async fn get_book(&mut self, id: i32) -> AppResult<Book> {
        books::lock_by_id(&mut self.tx, id).await
    }

    async fn decrement_available(&mut self, book_id: i32) -> AppResult<()> {
        books::decrement_available(&mut self.tx, book_id).await
    }

    async fn increment_available(&mut self, book_id: i32) -> AppResult<()> {
        books::increment_available(&mut self.tx, book_id).await
    }

    async fn find_earliest_due_date(&mut self, book_id: i32) -> AppResult<DateTime<Utc>> {
        borrowed_books::earliest_due_date(&mut self.tx, book_id).await
    }

    async fn get_user(&mut self, id: i32) -> AppResult<User> {
        users::lock_by_id(&mut self.tx, id).await
    }

    async fn open_borrows(
        &mut self,
        student_id: i32,
        book_id: i32,
    ) -> AppResult<Vec<BorrowedBook>> {
        borrowed_books::open_for(&mut self.tx, student_id, book_id).await
    }

    async fn count_open_borrows(&mut self, student_id: i32) -> AppResult<i64> {
        borrowed_books::count_open(&mut self.tx, student_id).await
    }

    async fn insert_borrow(&mut self, record: &NewBorrowedBook) -> AppResult<BorrowedBook> {
        borrowed_books::insert(&mut self.tx, record).await
    }

    async fn set_return_date(&mut self, id: i32, at: DateTime<Utc>) -> AppResult<BorrowedBook> {
        borrowed_books::set_return_date(&mut self.tx, id, at).await
    }

    async fn commit(self: Box<Self>) -> AppResult<()> {
        self.tx.commit().await?;
        Ok(())
    }
}
