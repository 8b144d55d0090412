//! In-memory storage backend for development and tests
//!
//! A transaction takes the store-wide lock for its whole lifetime and works
//! on a copy of the state, which replaces the shared state on commit.

use std::{collections::BTreeMap, path::Path, sync::Arc};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use tokio::sync::{Mutex, OwnedMutexGuard};

use super::{Storage, StorageTx};
use crate::{
    error::{AppError, AppResult},
    models::{
        Book, BookFilter, BorrowedBook, BorrowedBookFilter, CreateBook, NewBorrowedBook,
        PageRequest, Paginated, User,
    },
};

/// Initial content of an in-memory store
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Seed {
    #[serde(default)]
    pub users: Vec<User>,
    #[serde(default)]
    pub books: Vec<Book>,
    #[serde(default)]
    pub borrowed_books: Vec<BorrowedBook>,
}

#[derive(Debug, Clone, Default)]
struct MemoryState {
    users: BTreeMap<i32, User>,
    books: BTreeMap<i32, Book>,
    borrowed_books: BTreeMap<i32, BorrowedBook>,
    next_book_id: i32,
    next_borrow_id: i32,
}

impl MemoryState {
    fn from_seed(seed: Seed) -> AppResult<Self> {
        let mut state = MemoryState::default();

        for user in seed.users {
            if state.users.insert(user.id, user.clone()).is_some() {
                return Err(AppError::Validation(format!("Duplicate user id {}", user.id)));
            }
        }

        for book in seed.books {
            if book.name.trim().is_empty() {
                return Err(AppError::Validation(format!("Book {} has an empty name", book.id)));
            }
            if book.available_qty < 0 || book.available_qty > book.total_qty {
                return Err(AppError::Validation(format!(
                    "Book {} has {} available out of {}",
                    book.id, book.available_qty, book.total_qty
                )));
            }
            if state.books.values().any(|b| b.name == book.name) {
                return Err(AppError::Validation(format!("Duplicate book name {}", book.name)));
            }
            if state.books.insert(book.id, book.clone()).is_some() {
                return Err(AppError::Validation(format!("Duplicate book id {}", book.id)));
            }
        }

        for record in seed.borrowed_books {
            if !state.books.contains_key(&record.book_id) {
                return Err(AppError::Validation(format!(
                    "Borrow record {} references unknown book {}",
                    record.id, record.book_id
                )));
            }
            if !state.users.contains_key(&record.student_id) {
                return Err(AppError::Validation(format!(
                    "Borrow record {} references unknown user {}",
                    record.id, record.student_id
                )));
            }
            if state.borrowed_books.insert(record.id, record.clone()).is_some() {
                return Err(AppError::Validation(format!("Duplicate borrow record id {}", record.id)));
            }
        }

        state.next_book_id = state.books.keys().max().copied().unwrap_or(0);
        state.next_borrow_id = state.borrowed_books.keys().max().copied().unwrap_or(0);
        Ok(state)
    }

    fn book(&self, id: i32) -> AppResult<&Book> {
        self.books
            .get(&id)
            .ok_or_else(|| AppError::NotFound(format!("Book with id {} not found", id)))
    }

    fn book_mut(&mut self, id: i32) -> AppResult<&mut Book> {
        self.books
            .get_mut(&id)
            .ok_or_else(|| AppError::NotFound(format!("Book with id {} not found", id)))
    }

    fn user(&self, id: i32) -> AppResult<&User> {
        self.users
            .get(&id)
            .ok_or_else(|| AppError::NotFound(format!("User with id {} not found", id)))
    }

    fn open_records(&self) -> impl Iterator<Item = &BorrowedBook> {
        self.borrowed_books.values().filter(|r| r.is_open())
    }
}

/// Storage keeping everything in process memory
#[derive(Clone, Default)]
pub struct MemoryStorage {
    state: Arc<Mutex<MemoryState>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_seed(seed: Seed) -> AppResult<Self> {
        Ok(Self {
            state: Arc::new(Mutex::new(MemoryState::from_seed(seed)?)),
        })
    }

    /// Build a store from a JSON seed file
    pub async fn from_seed_file(path: impl AsRef<Path>) -> AppResult<Self> {
        let path = path.as_ref();
        let content = tokio::fs::read_to_string(path).await.map_err(|e| {
            AppError::Internal(format!("Cannot read seed file {}: {}", path.display(), e))
        })?;
        let seed: Seed = serde_json::from_str(&content).map_err(|e| {
            AppError::Validation(format!("Invalid seed file {}: {}", path.display(), e))
        })?;

        tracing::info!(
            "Seeding in-memory storage with {} users, {} books, {} borrow records",
            seed.users.len(),
            seed.books.len(),
            seed.borrowed_books.len()
        );
        Self::with_seed(seed)
    }
}

#[async_trait]
impl Storage for MemoryStorage {
    async fn begin(&self) -> AppResult<Box<dyn StorageTx>> {
        let guard = self.state.clone().lock_owned().await;
        let working = guard.clone();
        Ok(Box::new(MemoryTx { guard, working }))
    }

    async fn ping(&self) -> AppResult<()> {
        Ok(())
    }

    async fn get_book(&self, id: i32) -> AppResult<Book> {
        self.state.lock().await.book(id).cloned()
    }

    async fn list_books(
        &self,
        filter: &BookFilter,
        page: PageRequest,
    ) -> AppResult<Paginated<Book>> {
        let state = self.state.lock().await;
        let mut books: Vec<Book> = state
            .books
            .values()
            .filter(|b| filter.matches(b))
            .cloned()
            .collect();
        books.sort_by(|a, b| a.name.cmp(&b.name).then(a.id.cmp(&b.id)));
        Ok(page.slice(books))
    }

    async fn create_book(&self, book: &CreateBook) -> AppResult<Book> {
        let mut state = self.state.lock().await;
        if state.books.values().any(|b| b.name == book.name) {
            return Err(AppError::Conflict(format!(
                "A book named {} already exists",
                book.name
            )));
        }

        state.next_book_id += 1;
        let created = Book {
            id: state.next_book_id,
            name: book.name.clone(),
            total_qty: book.total_qty,
            available_qty: book.total_qty,
        };
        state.books.insert(created.id, created.clone());
        Ok(created)
    }

    async fn list_borrowed_books(
        &self,
        filter: &BorrowedBookFilter,
        page: PageRequest,
    ) -> AppResult<Paginated<BorrowedBook>> {
        let state = self.state.lock().await;
        let mut records: Vec<BorrowedBook> = state
            .borrowed_books
            .values()
            .filter(|r| filter.matches(r))
            .cloned()
            .collect();
        records.sort_by(|a, b| b.borrow_date.cmp(&a.borrow_date).then(b.id.cmp(&a.id)));
        Ok(page.slice(records))
    }

    async fn get_user(&self, id: i32) -> AppResult<User> {
        self.state.lock().await.user(id).cloned()
    }
}

pub struct MemoryTx {
    guard: OwnedMutexGuard<MemoryState>,
    working: MemoryState,
}

#[async_trait]
impl StorageTx for MemoryTx {
    async fn get_book(&mut self, id: i32) -> AppResult<Book> {
        self.working.book(id).cloned()
    }

    async fn decrement_available(&mut self, book_id: i32) -> AppResult<()> {
        let book = self.working.book_mut(book_id)?;
        if book.available_qty <= 0 {
            return Err(AppError::Conflict(format!(
                "No copy of book {} left to lend",
                book_id
            )));
        }
        book.available_qty -= 1;
        Ok(())
    }

    async fn increment_available(&mut self, book_id: i32) -> AppResult<()> {
        let book = self.working.book_mut(book_id)?;
        if book.available_qty >= book.total_qty {
            return Err(AppError::Conflict(format!(
                "Every copy of book {} is already on the shelf",
                book_id
            )));
        }
        book.available_qty += 1;
        Ok(())
    }

    async fn find_earliest_due_date(&mut self, book_id: i32) -> AppResult<DateTime<Utc>> {
        self.working
            .open_records()
            .filter(|r| r.book_id == book_id)
            .map(|r| r.due_date)
            .min()
            .ok_or_else(|| {
                AppError::NotFound(format!("Book {} has no open borrow records", book_id))
            })
    }

    async fn get_user(&mut self, id: i32) -> AppResult<User> {
        self.working.user(id).cloned()
    }

    async fn open_borrows(
        &mut self,
        student_id: i32,
        book_id: i32,
    ) -> AppResult<Vec<BorrowedBook>> {
        let mut records: Vec<BorrowedBook> = self
            .working
            .open_records()
            .filter(|r| r.student_id == student_id && r.book_id == book_id)
            .cloned()
            .collect();
        records.sort_by(|a, b| a.borrow_date.cmp(&b.borrow_date).then(a.id.cmp(&b.id)));
        Ok(records)
    }

    async fn count_open_borrows(&mut self, student_id: i32) -> AppResult<i64> {
        Ok(self
            .working
            .open_records()
            .filter(|r| r.student_id == student_id)
            .count() as i64)
    }

    async fn insert_borrow(&mut self, record: &NewBorrowedBook) -> AppResult<BorrowedBook> {
        self.working.book(record.book_id)?;
        self.working.user(record.student_id)?;

        let duplicate = self.working.open_records().any(|r| {
            r.student_id == record.student_id
                && r.book_id == record.book_id
                && r.is_renewed == record.is_renewed
        });
        if duplicate {
            return Err(AppError::Conflict(format!(
                "Student {} already has an open record for book {}",
                record.student_id, record.book_id
            )));
        }

        self.working.next_borrow_id += 1;
        let created = BorrowedBook {
            id: self.working.next_borrow_id,
            student_id: record.student_id,
            book_id: record.book_id,
            borrow_date: record.borrow_date,
            due_date: record.due_date,
            return_date: None,
            is_renewed: record.is_renewed,
        };
        self.working.borrowed_books.insert(created.id, created.clone());
        Ok(created)
    }

    async fn set_return_date(&mut self, id: i32, at: DateTime<Utc>) -> AppResult<BorrowedBook> {
        let record = self
            .working
            .borrowed_books
            .get_mut(&id)
            .ok_or_else(|| AppError::NotFound(format!("Borrow record {} not found", id)))?;
        if record.return_date.is_some() {
            return Err(AppError::Conflict(format!(
                "Borrow record {} is already closed",
                id
            )));
        }
        record.return_date = Some(at);
        Ok(record.clone())
    }

    async fn commit(self: Box<Self>) -> AppResult<()> {
        let MemoryTx { mut guard, working } = *self;
        *guard = working;
        Ok(())
    }
}
