//! Business logic services

pub mod books;

use std::sync::Arc;

use crate::repository::{BookStore, Repository};

/// Container for all services
#[derive(Clone)]
pub struct Services {
    pub books: books::BooksService,
}

impl Services {
    /// Create all services with the given repository
    pub fn new(repository: Repository) -> Self {
        Self::with_store(Arc::new(repository.books))
    }

    /// Create services on top of any book store
    pub fn with_store(store: Arc<dyn BookStore>) -> Self {
        Self {
            books: books::BooksService::new(store),
        }
    }
}
