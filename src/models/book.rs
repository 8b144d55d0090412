//! Book (catalog entry) model and related types

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::{IntoParams, ToSchema};
use validator::Validate;

/// Book with its inventory counters
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Book {
    pub id: i32,
    /// Unique title
    pub name: String,
    /// Copies owned by the library
    pub total_qty: i32,
    /// Copies currently on the shelf
    pub available_qty: i32,
}

impl Book {
    pub fn is_available(&self) -> bool {
        self.available_qty > 0
    }
}

/// Create book request
#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct CreateBook {
    #[validate(length(min = 1, max = 255, message = "Name must be 1 to 255 characters"))]
    pub name: String,
    #[validate(range(min = 0, message = "Quantity cannot be negative"))]
    pub total_qty: i32,
}

/// Book listing filters
#[derive(Debug, Clone, Default)]
pub struct BookFilter {
    /// Case-insensitive substring of the name
    pub name: Option<String>,
    /// Only books with at least one copy on the shelf
    pub available: Option<bool>,
}

impl BookFilter {
    pub fn matches(&self, book: &Book) -> bool {
        if let Some(ref name) = self.name {
            if !book.name.to_lowercase().contains(&name.to_lowercase()) {
                return false;
            }
        }
        match self.available {
            Some(true) => book.is_available(),
            Some(false) => !book.is_available(),
            None => true,
        }
    }
}

/// Book query parameters
#[derive(Debug, Default, Deserialize, IntoParams, ToSchema)]
pub struct BookQuery {
    pub name: Option<String>,
    pub available: Option<bool>,
    pub page: Option<i64>,
    pub per_page: Option<i64>,
}

impl BookQuery {
    pub fn filter(&self) -> BookFilter {
        BookFilter {
            name: self.name.clone().filter(|n| !n.trim().is_empty()),
            available: self.available,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn book(name: &str, available_qty: i32) -> Book {
        Book {
            id: 1,
            name: name.to_string(),
            total_qty: 3,
            available_qty,
        }
    }

    #[test]
    fn test_filter_by_name_ignores_case() {
        let filter = BookFilter {
            name: Some("rust".to_string()),
            available: None,
        };
        assert!(filter.matches(&book("The Rust Programming Language", 1)));
        assert!(!filter.matches(&book("Dune", 1)));
    }

    #[test]
    fn test_filter_by_availability() {
        let filter = BookFilter {
            name: None,
            available: Some(true),
        };
        assert!(filter.matches(&book("Dune", 1)));
        assert!(!filter.matches(&book("Dune", 0)));
    }

    #[test]
    fn test_blank_name_query_is_ignored() {
        let query = BookQuery {
            name: Some("  ".to_string()),
            ..Default::default()
        };
        assert!(query.filter().name.is_none());
    }
}
