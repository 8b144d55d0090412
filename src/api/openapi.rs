//! OpenAPI documentation

use axum::Router;
use utoipa::{
    openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
    Modify, OpenApi,
};
use utoipa_swagger_ui::SwaggerUi;

use crate::api::{auth, books, borrowed_books, health};

#[derive(OpenApi)]
#[openapi(
    info(
        title = "School Library API",
        version = "1.0.0",
        description = "Book circulation REST API"
    ),
    servers(
        (url = "/api/v1", description = "API v1")
    ),
    paths(
        // Health
        health::health_check,
        health::readiness_check,
        // Auth
        auth::me,
        // Books
        books::list_books,
        books::get_book,
        books::create_book,
        // Borrowed books
        borrowed_books::borrow_book,
        borrowed_books::return_book,
        borrowed_books::list_borrowed_books,
        borrowed_books::my_books,
    ),
    components(
        schemas(
            // Users
            crate::models::user::User,
            crate::models::user::Role,
            // Books
            crate::models::book::Book,
            crate::models::book::CreateBook,
            crate::models::pagination::BookPage,
            // Borrowed books
            crate::models::borrowed_book::BorrowedBook,
            crate::models::pagination::BorrowedBookPage,
            borrowed_books::BorrowBookRequest,
            borrowed_books::ReturnBookRequest,
            borrowed_books::BorrowedBookPayload,
            // Health
            health::HealthResponse,
            // Errors
            crate::error::ErrorResponse,
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "health", description = "Health check endpoints"),
        (name = "auth", description = "Caller identity"),
        (name = "books", description = "Catalog"),
        (name = "borrowed-books", description = "Borrowing, renewing and returning books")
    )
)]
pub struct ApiDoc;

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            );
        }
    }
}

/// Create the OpenAPI documentation router
pub fn create_openapi_router() -> Router {
    Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_document_lists_circulation_paths() {
        let doc = ApiDoc::openapi();
        for path in ["/borrowed-books/borrow", "/borrowed-books/return", "/me/books", "/auth/me"] {
            assert!(doc.paths.paths.contains_key(path), "missing {path}");
        }
    }
}
