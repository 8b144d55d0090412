//! Circulation endpoints

use axum::{
    extract::{Query, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::{
    error::AppResult,
    models::{
        borrowed_book::{BorrowedBookQuery, MyBooksQuery},
        pagination::BorrowedBookPage,
        BorrowedBook,
    },
    AppState,
};

use super::Caller;

/// Borrow (or renew) request
#[derive(Debug, Deserialize, ToSchema)]
pub struct BorrowBookRequest {
    /// Book ID
    pub book_id: i32,
    /// Student ID
    pub student_id: i32,
    /// Renew the student's current loan instead of lending a new copy
    pub renew: Option<bool>,
}

/// Return request
#[derive(Debug, Deserialize, ToSchema)]
pub struct ReturnBookRequest {
    /// Book ID
    pub book_id: i32,
    /// Student ID
    pub student_id: i32,
}

/// Result of a borrow or return
#[derive(Debug, Serialize, ToSchema)]
pub struct BorrowedBookPayload {
    pub borrowed_book: BorrowedBook,
    pub success: bool,
}

impl From<BorrowedBook> for BorrowedBookPayload {
    fn from(borrowed_book: BorrowedBook) -> Self {
        Self {
            borrowed_book,
            success: true,
        }
    }
}

/// Lend a book to a student, or renew a loan
#[utoipa::path(
    post,
    path = "/borrowed-books/borrow",
    tag = "borrowed-books",
    security(("bearer_auth" = [])),
    request_body = BorrowBookRequest,
    responses(
        (status = 201, description = "Borrow record created", body = BorrowedBookPayload),
        (status = 401, description = "Not authenticated", body = crate::error::ErrorResponse),
        (status = 403, description = "Caller is not a librarian", body = crate::error::ErrorResponse),
        (status = 404, description = "Book or student not found", body = crate::error::ErrorResponse),
        (status = 409, description = "Out of stock, limit reached, already renewed, not borrowed or renewal expired", body = crate::error::ErrorResponse)
    )
)]
pub async fn borrow_book(
    State(state): State<AppState>,
    caller: Caller,
    Json(request): Json<BorrowBookRequest>,
) -> AppResult<(StatusCode, Json<BorrowedBookPayload>)> {
    let record = state
        .services
        .circulation
        .borrow_book(
            caller.identity(),
            request.book_id,
            request.student_id,
            request.renew.unwrap_or(false),
        )
        .await?;

    Ok((StatusCode::CREATED, Json(record.into())))
}

/// Take a book back from a student
#[utoipa::path(
    post,
    path = "/borrowed-books/return",
    tag = "borrowed-books",
    security(("bearer_auth" = [])),
    request_body = ReturnBookRequest,
    responses(
        (status = 200, description = "Book returned", body = BorrowedBookPayload),
        (status = 401, description = "Not authenticated", body = crate::error::ErrorResponse),
        (status = 403, description = "Caller is not a librarian", body = crate::error::ErrorResponse),
        (status = 404, description = "Book or student not found", body = crate::error::ErrorResponse),
        (status = 409, description = "Student does not have this book", body = crate::error::ErrorResponse)
    )
)]
pub async fn return_book(
    State(state): State<AppState>,
    caller: Caller,
    Json(request): Json<ReturnBookRequest>,
) -> AppResult<Json<BorrowedBookPayload>> {
    let record = state
        .services
        .circulation
        .return_book(caller.identity(), request.book_id, request.student_id)
        .await?;

    Ok(Json(record.into()))
}

/// List borrow records of all students
#[utoipa::path(
    get,
    path = "/borrowed-books",
    tag = "borrowed-books",
    security(("bearer_auth" = [])),
    params(BorrowedBookQuery),
    responses(
        (status = 200, description = "Borrow records", body = BorrowedBookPage),
        (status = 403, description = "Caller is not a librarian", body = crate::error::ErrorResponse)
    )
)]
pub async fn list_borrowed_books(
    State(state): State<AppState>,
    caller: Caller,
    Query(query): Query<BorrowedBookQuery>,
) -> AppResult<Json<BorrowedBookPage>> {
    let page = state
        .services
        .circulation
        .list_borrowed_books(caller.identity(), &query)
        .await?;
    Ok(Json(page))
}

/// List the calling student's borrow records
#[utoipa::path(
    get,
    path = "/me/books",
    tag = "borrowed-books",
    security(("bearer_auth" = [])),
    params(MyBooksQuery),
    responses(
        (status = 200, description = "Caller's borrow records", body = BorrowedBookPage),
        (status = 403, description = "Caller is not a student", body = crate::error::ErrorResponse)
    )
)]
pub async fn my_books(
    State(state): State<AppState>,
    caller: Caller,
    Query(query): Query<MyBooksQuery>,
) -> AppResult<Json<BorrowedBookPage>> {
    let page = state
        .services
        .circulation
        .my_books(caller.identity(), &query)
        .await?;
    Ok(Json(page))
}
