//! Circulation service: borrowing, renewing and returning books
//!
//! Every borrow or return runs in a single storage transaction. The book row
//! is locked first and the student row second, so concurrent requests for the
//! same book or the same student are serialized and a stale shelf count can
//! never lend the same copy twice.

use std::sync::Arc;

use chrono::{Duration, Utc};

use super::authorization::{self, Action, Policy};
use crate::{
    config::CirculationConfig,
    error::{AppError, AppResult},
    models::{
        borrowed_book::{BorrowedBookQuery, MyBooksQuery},
        BorrowedBook, BorrowedBookFilter, Identity, NewBorrowedBook, PageRequest, Paginated,
    },
    repository::{Repository, StorageTx},
};

#[derive(Clone)]
pub struct CirculationService {
    repository: Repository,
    policy: Arc<dyn Policy>,
    settings: CirculationConfig,
}

impl CirculationService {
    pub fn new(repository: Repository, policy: Arc<dyn Policy>, settings: CirculationConfig) -> Self {
        Self {
            repository,
            policy,
            settings,
        }
    }

    fn loan_duration(&self) -> Duration {
        Duration::days(self.settings.loan_duration_days)
    }

    /// Lend a book to a student, or renew the student's current loan of it.
    ///
    /// The checks run in a fixed order and the first failing one decides the
    /// error: already renewed, out of stock (borrows only), borrow limit, then
    /// the renewal or borrow specific checks.
    pub async fn borrow_book(
        &self,
        identity: Option<&Identity>,
        book_id: i32,
        student_id: i32,
        renew: bool,
    ) -> AppResult<BorrowedBook> {
        let librarian = authorization::require(self.policy.as_ref(), identity, Action::BorrowBook)?;
        let now = Utc::now();

        let mut tx = self.repository.begin().await?;

        let book = tx.get_book(book_id).await?;
        load_student(tx.as_mut(), student_id).await?;
        let open = tx.open_borrows(student_id, book_id).await?;

        if open.iter().any(|r| r.is_renewed) {
            tracing::debug!(book_id, student_id, "Rejected borrow: already renewed");
            return Err(AppError::AlreadyRenewed { book: book.name });
        }

        if !renew && !book.is_available() {
            let available_on = match tx.find_earliest_due_date(book_id).await {
                Ok(due) => Some(due),
                Err(AppError::NotFound(_)) => None,
                Err(e) => return Err(e),
            };
            tracing::debug!(book_id, student_id, "Rejected borrow: no copy left");
            return Err(AppError::OutOfStock {
                book: book.name,
                available_on,
            });
        }

        let held = tx.count_open_borrows(student_id).await?;
        if held >= i64::from(self.settings.max_open_borrows) {
            tracing::debug!(book_id, student_id, held, "Rejected borrow: limit reached");
            return Err(AppError::BorrowLimitReached {
                limit: self.settings.max_open_borrows,
            });
        }

        let original = open.iter().find(|r| !r.is_renewed);

        let created = if renew {
            let original = original.ok_or_else(|| AppError::NotBorrowed {
                book: book.name.clone(),
            })?;
            if original.is_overdue(now) {
                return Err(AppError::RenewalExpired {
                    book: book.name,
                    due_date: original.due_date,
                });
            }

            // The original record stays open and untouched; the shelf count
            // was already paid for by it.
            tx.insert_borrow(&NewBorrowedBook::starting_at(
                student_id,
                book_id,
                now,
                self.loan_duration(),
                true,
            ))
            .await?
        } else {
            if original.is_some() {
                return Err(AppError::AlreadyBorrowed { book: book.name });
            }

            let record = tx
                .insert_borrow(&NewBorrowedBook::starting_at(
                    student_id,
                    book_id,
                    now,
                    self.loan_duration(),
                    false,
                ))
                .await?;
            tx.decrement_available(book_id).await?;
            record
        };

        tx.commit().await?;

        tracing::info!(
            borrow_id = created.id,
            book_id,
            student_id,
            librarian_id = librarian.user_id,
            renewed = created.is_renewed,
            "Book {} lent until {}",
            book.name,
            created.due_date
        );
        Ok(created)
    }

    /// Take a book back from a student.
    ///
    /// Closes every open record the student has for the book (the loan and its
    /// renewal, if any) and puts one copy back on the shelf. Returns the
    /// original loan record.
    pub async fn return_book(
        &self,
        identity: Option<&Identity>,
        book_id: i32,
        student_id: i32,
    ) -> AppResult<BorrowedBook> {
        let librarian = authorization::require(self.policy.as_ref(), identity, Action::ReturnBook)?;
        let now = Utc::now();

        let mut tx = self.repository.begin().await?;

        let book = tx.get_book(book_id).await?;
        load_student(tx.as_mut(), student_id).await?;
        let open = tx.open_borrows(student_id, book_id).await?;

        if open.is_empty() {
            return Err(AppError::NotBorrowed { book: book.name });
        }

        let mut returned: Option<BorrowedBook> = None;
        for record in &open {
            let closed = tx.set_return_date(record.id, now).await?;
            let prefer = returned
                .as_ref()
                .map_or(true, |current| current.is_renewed && !closed.is_renewed);
            if prefer {
                returned = Some(closed);
            }
        }
        let returned = returned.ok_or_else(|| AppError::NotBorrowed {
            book: book.name.clone(),
        })?;

        tx.increment_available(book_id).await?;
        tx.commit().await?;

        tracing::info!(
            borrow_id = returned.id,
            book_id,
            student_id,
            librarian_id = librarian.user_id,
            closed_records = open.len(),
            "Book {} returned",
            book.name
        );
        Ok(returned)
    }

    /// List borrow records of every student
    pub async fn list_borrowed_books(
        &self,
        identity: Option<&Identity>,
        query: &BorrowedBookQuery,
    ) -> AppResult<Paginated<BorrowedBook>> {
        authorization::require(self.policy.as_ref(), identity, Action::ListBorrowedBooks)?;
        let page = PageRequest::new(query.page, query.per_page)?;
        self.repository
            .list_borrowed_books(&query.filter(), page)
            .await
    }

    /// List the calling student's own records, open and returned
    pub async fn my_books(
        &self,
        identity: Option<&Identity>,
        query: &MyBooksQuery,
    ) -> AppResult<Paginated<BorrowedBook>> {
        let student = authorization::require(self.policy.as_ref(), identity, Action::ListOwnBooks)?;
        let page = PageRequest::new(query.page, query.per_page)?;
        let filter = BorrowedBookFilter {
            student_id: Some(student.user_id),
            book_id: None,
            open: query.open,
        };
        self.repository.list_borrowed_books(&filter, page).await
    }
}

/// Lock the student row; users without the student role do not qualify
async fn load_student(tx: &mut dyn StorageTx, student_id: i32) -> AppResult<()> {
    let user = tx.get_user(student_id).await?;
    if !user.is_student() {
        return Err(AppError::NotFound(format!(
            "Student with id {} not found",
            student_id
        )));
    }
    Ok(())
}
