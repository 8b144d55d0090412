//! Catalog management service

use std::sync::Arc;

use validator::Validate;

use super::authorization::{self, Action, Policy};
use crate::{
    error::AppResult,
    models::{book::BookQuery, Book, CreateBook, Identity, PageRequest, Paginated},
    repository::Repository,
};

#[derive(Clone)]
pub struct CatalogService {
    repository: Repository,
    policy: Arc<dyn Policy>,
}

impl CatalogService {
    pub fn new(repository: Repository, policy: Arc<dyn Policy>) -> Self {
        Self { repository, policy }
    }

    /// Get book by ID
    pub async fn get_book(&self, id: i32) -> AppResult<Book> {
        self.repository.get_book(id).await
    }

    /// List books with filters
    pub async fn list_books(&self, query: &BookQuery) -> AppResult<Paginated<Book>> {
        let page = PageRequest::new(query.page, query.per_page)?;
        self.repository.list_books(&query.filter(), page).await
    }

    /// Add a book to the catalog, every copy on the shelf
    pub async fn create_book(
        &self,
        identity: Option<&Identity>,
        mut book: CreateBook,
    ) -> AppResult<Book> {
        let identity = authorization::require(self.policy.as_ref(), identity, Action::CreateBook)?;

        book.name = book.name.trim().to_string();
        book.validate()?;

        let created = self.repository.create_book(&book).await?;
        tracing::info!(
            book_id = created.id,
            librarian_id = identity.user_id,
            "Book {} added with {} copies",
            created.name,
            created.total_qty
        );
        Ok(created)
    }
}
