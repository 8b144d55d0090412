//! Repository layer: storage traits and their backends
//!
//! Reads that need no consistency guarantees go through [`Storage`] directly.
//! Borrow and return run inside a [`StorageTx`]: rows read through it stay
//! locked until the transaction is committed or dropped, and dropping it
//! without calling [`StorageTx::commit`] discards every write.

pub mod books;
pub mod borrowed_books;
pub mod memory;
pub mod postgres;
pub mod users;

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::{
    error::AppResult,
    models::{
        Book, BookFilter, BorrowedBook, BorrowedBookFilter, CreateBook, NewBorrowedBook,
        PageRequest, Paginated, User,
    },
};

/// Shared handle to the configured backend
pub type Repository = Arc<dyn Storage>;

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Storage: Send + Sync {
    /// Open a transaction for a borrow or return
    async fn begin(&self) -> AppResult<Box<dyn StorageTx>>;

    /// Check that the backend answers
    async fn ping(&self) -> AppResult<()>;

    async fn get_book(&self, id: i32) -> AppResult<Book>;

    async fn list_books(&self, filter: &BookFilter, page: PageRequest)
        -> AppResult<Paginated<Book>>;

    /// Insert a book with every copy on the shelf
    async fn create_book(&self, book: &CreateBook) -> AppResult<Book>;

    async fn list_borrowed_books(
        &self,
        filter: &BorrowedBookFilter,
        page: PageRequest,
    ) -> AppResult<Paginated<BorrowedBook>>;

    async fn get_user(&self, id: i32) -> AppResult<User>;
}

/// Unit of work for the circulation engine
#[async_trait]
pub trait StorageTx: Send {
    /// Load a book and lock it until the transaction ends
    async fn get_book(&mut self, id: i32) -> AppResult<Book>;

    /// Take one copy off the shelf; `Conflict` when none is left
    async fn decrement_available(&mut self, book_id: i32) -> AppResult<()>;

    /// Put one copy back on the shelf; `Conflict` past the total quantity
    async fn increment_available(&mut self, book_id: i32) -> AppResult<()>;

    /// Earliest due date among the open records of a book
    async fn find_earliest_due_date(&mut self, book_id: i32) -> AppResult<DateTime<Utc>>;

    /// Load a user and lock it until the transaction ends
    async fn get_user(&mut self, id: i32) -> AppResult<User>;

    /// Open records of a student for one book, oldest first
    async fn open_borrows(&mut self, student_id: i32, book_id: i32)
        -> AppResult<Vec<BorrowedBook>>;

    /// Number of open records of a student across all books
    async fn count_open_borrows(&mut self, student_id: i32) -> AppResult<i64>;

    async fn insert_borrow(&mut self, record: &NewBorrowedBook) -> AppResult<BorrowedBook>;

    /// Close an open record; `Conflict` if it was already closed
    async fn set_return_date(&mut self, id: i32, at: DateTime<Utc>) -> AppResult<BorrowedBook>;

    async fn commit(self: Box<Self>) -> AppResult<()>;
}
