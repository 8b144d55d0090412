//! Borrowed book (borrow record) model and related types

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::{IntoParams, ToSchema};

/// One borrow or renewal of a book by a student.
///
/// A record is open while `return_date` is unset. Renewals do not extend the
/// original record: they add a second open record with `is_renewed` set, so a
/// renewed loan is represented by two open records until it is returned.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow, ToSchema)]
pub struct BorrowedBook {
    pub id: i32,
    pub student_id: i32,
    pub book_id: i32,
    pub borrow_date: DateTime<Utc>,
    pub due_date: DateTime<Utc>,
    pub return_date: Option<DateTime<Utc>>,
    pub is_renewed: bool,
}

impl BorrowedBook {
    pub fn is_open(&self) -> bool {
        self.return_date.is_none()
    }

    pub fn is_overdue(&self, now: DateTime<Utc>) -> bool {
        self.is_open() && now > self.due_date
    }
}

/// Borrow record about to be inserted
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewBorrowedBook {
    pub student_id: i32,
    pub book_id: i32,
    pub borrow_date: DateTime<Utc>,
    pub due_date: DateTime<Utc>,
    pub is_renewed: bool,
}

impl NewBorrowedBook {
    /// Record starting at `now` and due `loan_duration` later
    pub fn starting_at(
        student_id: i32,
        book_id: i32,
        now: DateTime<Utc>,
        loan_duration: Duration,
        is_renewed: bool,
    ) -> Self {
        Self {
            student_id,
            book_id,
            borrow_date: now,
            due_date: now + loan_duration,
            is_renewed,
        }
    }
}

/// Borrow record listing filters
#[derive(Debug, Clone, Default)]
pub struct BorrowedBookFilter {
    pub student_id: Option<i32>,
    pub book_id: Option<i32>,
    /// `true` for open records only, `false` for returned ones only
    pub open: Option<bool>,
}

impl BorrowedBookFilter {
    pub fn matches(&self, record: &BorrowedBook) -> bool {
        self.student_id.map_or(true, |id| record.student_id == id)
            && self.book_id.map_or(true, |id| record.book_id == id)
            && self.open.map_or(true, |open| record.is_open() == open)
    }
}

/// Borrowed books query parameters (librarian listing)
#[derive(Debug, Default, Deserialize, IntoParams, ToSchema)]
pub struct BorrowedBookQuery {
    pub student_id: Option<i32>,
    pub book_id: Option<i32>,
    pub open: Option<bool>,
    pub page: Option<i64>,
    pub per_page: Option<i64>,
}

impl BorrowedBookQuery {
    pub fn filter(&self) -> BorrowedBookFilter {
        BorrowedBookFilter {
            student_id: self.student_id,
            book_id: self.book_id,
            open: self.open,
        }
    }
}

/// Query parameters for a student's own records
#[derive(Debug, Default, Deserialize, IntoParams, ToSchema)]
pub struct MyBooksQuery {
    pub open: Option<bool>,
    pub page: Option<i64>,
    pub per_page: Option<i64>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn record(return_date: Option<DateTime<Utc>>) -> BorrowedBook {
        let borrow_date = Utc.with_ymd_and_hms(2026, 1, 1, 9, 0, 0).unwrap();
        BorrowedBook {
            id: 1,
            student_id: 7,
            book_id: 3,
            borrow_date,
            due_date: borrow_date + Duration::days(30),
            return_date,
            is_renewed: false,
        }
    }

    #[test]
    fn test_new_record_due_date() {
        let now = Utc.with_ymd_and_hms(2026, 1, 1, 9, 0, 0).unwrap();
        let new = NewBorrowedBook::starting_at(7, 3, now, Duration::days(30), false);
        assert_eq!(new.due_date, Utc.with_ymd_and_hms(2026, 1, 31, 9, 0, 0).unwrap());
    }

    #[test]
    fn test_overdue_only_while_open() {
        let late = Utc.with_ymd_and_hms(2026, 3, 1, 0, 0, 0).unwrap();
        assert!(record(None).is_overdue(late));
        assert!(!record(Some(late)).is_overdue(late));
    }

    #[test]
    fn test_filter() {
        let filter = BorrowedBookFilter {
            student_id: Some(7),
            book_id: None,
            open: Some(true),
        };
        assert!(filter.matches(&record(None)));
        assert!(!filter.matches(&record(Some(Utc::now()))));
    }
}
