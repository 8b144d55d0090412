//! Data models for the school library

pub mod book;
pub mod borrowed_book;
pub mod pagination;
pub mod user;

// Re-export commonly used types
pub use book::{Book, BookFilter, CreateBook};
pub use borrowed_book::{BorrowedBook, BorrowedBookFilter, NewBorrowedBook};
pub use pagination::{PageRequest, Paginated};
pub use user::{Identity, Role, User, UserClaims};
