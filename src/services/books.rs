//! Book records service
//!
//! Owns the catalog rules: deleted books are invisible, ISBN collisions are
//! conflicts, listing is paginated and statistics only count active books.

use std::sync::Arc;

use chrono::{NaiveDate, Utc};
use validator::Validate;

use crate::{
    error::{AppError, AppResult},
    models::book::{
        parse_published_date, Book, BookChanges, BookPage, BookQuery, BookStats, CreateBook,
        NewBook, Pagination, UpdateBook,
    },
    repository::{BookFilter, BookStore, StoreError},
};

pub const DEFAULT_PAGE: i64 = 1;
pub const DEFAULT_LIMIT: i64 = 10;

const ISBN_CONFLICT: &str = "ISBN must be unique";

fn not_found(id: i32) -> AppError {
    AppError::NotFound(format!("Book with ID {} not found", id))
}

/// Classify a store error for callers; `id` names the book in not-found messages
fn classify(err: StoreError, id: Option<i32>) -> AppError {
    match err {
        StoreError::DuplicateKey(constraint) => {
            tracing::debug!("Unique constraint {} rejected write", constraint);
            AppError::Conflict(ISBN_CONFLICT.to_string())
        }
        StoreError::NotFound => match id {
            Some(id) => not_found(id),
            None => AppError::NotFound("Book not found".to_string()),
        },
        StoreError::Database(e) => AppError::Database(e),
    }
}

fn parse_date_field(value: Option<&str>) -> AppResult<Option<NaiveDate>> {
    value
        .map(|v| {
            parse_published_date(v).ok_or_else(|| {
                AppError::Validation(format!("publishedDate '{}' is not a valid ISO 8601 date", v))
            })
        })
        .transpose()
}

#[derive(Clone)]
pub struct BooksService {
    store: Arc<dyn BookStore>,
}

impl BooksService {
    pub fn new(store: Arc<dyn BookStore>) -> Self {
        Self { store }
    }

    /// Create a book
    pub async fn create(&self, data: CreateBook) -> AppResult<Book> {
        data.validate()?;
        let published_date = parse_date_field(data.published_date.as_deref())?;

        let new_book = NewBook {
            isbn: data.isbn,
            title: data.title,
            author: data.author,
            description: data.description,
            published_date,
            pages: data.pages,
            cover_image_url: data.cover_image_url,
        };

        let book = self
            .store
            .insert(&new_book)
            .await
            .map_err(|e| classify(e, None))?;
        tracing::info!("Created book id={} isbn={}", book.id, book.isbn);
        Ok(book)
    }

    /// List active books, newest first
    pub async fn list(&self, query: BookQuery) -> AppResult<BookPage> {
        let page = query.page.unwrap_or(DEFAULT_PAGE);
        let limit = query.limit.unwrap_or(DEFAULT_LIMIT);
        if page < 1 {
            return Err(AppError::Validation("page must be at least 1".to_string()));
        }
        if limit < 1 {
            return Err(AppError::Validation("limit must be at least 1".to_string()));
        }
        let offset = (page - 1)
            .checked_mul(limit)
            .ok_or_else(|| AppError::Validation("page is out of range for this limit".to_string()))?;

        let filter = BookFilter::active()
            .with_author(query.author)
            .with_title(query.title);

        let (items, total) = tokio::try_join!(
            self.store.find_many(&filter, offset, limit),
            self.store.count(&filter),
        )
        .map_err(|e| classify(e, None))?;

        tracing::debug!("Listed {} of {} books (page {}, limit {})", items.len(), total, page, limit);
        Ok(BookPage {
            items,
            pagination: Pagination::new(total, page, limit),
        })
    }

    /// Get an active book; deleted books are reported as not found
    pub async fn get(&self, id: i32) -> AppResult<Book> {
        match self.store.find_by_id(id).await.map_err(|e| classify(e, Some(id)))? {
            Some(book) if !book.is_deleted() => Ok(book),
            _ => Err(not_found(id)),
        }
    }

    /// Update the supplied fields of an active book
    pub async fn update(&self, id: i32, data: UpdateBook) -> AppResult<Book> {
        self.get(id).await?;
        data.validate()?;
        let published_date = parse_date_field(data.published_date.as_deref())?;

        let changes = BookChanges {
            isbn: data.isbn,
            title: data.title,
            author: data.author,
            description: data.description,
            published_date,
            pages: data.pages,
            cover_image_url: data.cover_image_url,
            ..BookChanges::touch(Utc::now())
        };

        let book = self
            .store
            .update(id, &changes)
            .await
            .map_err(|e| classify(e, Some(id)))?;
        tracing::info!("Updated book id={}", id);
        Ok(book)
    }

    /// Soft-delete an active book
    pub async fn soft_delete(&self, id: i32) -> AppResult<()> {
        self.get(id).await?;

        let now = Utc::now();
        let changes = BookChanges {
            deleted_at: Some(now),
            ..BookChanges::touch(now)
        };
        self.store
            .update(id, &changes)
            .await
            .map_err(|e| classify(e, Some(id)))?;
        tracing::info!("Soft-deleted book id={}", id);
        Ok(())
    }

    /// Statistics over active books
    pub async fn stats(&self) -> AppResult<BookStats> {
        let aggregate = self
            .store
            .aggregate_stats(&BookFilter::active())
            .await
            .map_err(|e| classify(e, None))?;

        Ok(BookStats {
            total_books: aggregate.total,
            total_pages: aggregate.pages_sum.unwrap_or(0),
            top_authors: aggregate.authors,
        })
    }

    /// Readiness check against the store
    pub async fn ready(&self) -> AppResult<()> {
        self.store.ping().await.map_err(|e| classify(e, None))
    }
}
