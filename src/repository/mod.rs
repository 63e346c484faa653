//! Repository layer for database operations

pub mod books;

use async_trait::async_trait;
use sqlx::{Pool, Postgres};
use thiserror::Error;

use crate::models::book::{Book, BookAggregate, BookChanges, NewBook};

/// Postgres SQLSTATE reported on unique index violations
const PG_UNIQUE_VIOLATION: &str = "23505";

/// Storage outcomes the service layer must tell apart
#[derive(Error, Debug)]
pub enum StoreError {
    /// A unique constraint rejected the write
    #[error("duplicate key violates constraint {0}")]
    DuplicateKey(String),

    #[error("row not found")]
    NotFound,

    #[error(transparent)]
    Database(sqlx::Error),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Signals that map a database error onto a known store outcome
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Signal {
    DuplicateKey,
    NotFound,
}

/// SQLSTATE codes with a domain meaning; everything else stays opaque
const SQLSTATE_SIGNALS: &[(&str, Signal)] = &[(PG_UNIQUE_VIOLATION, Signal::DuplicateKey)];

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        let signal = match &err {
            sqlx::Error::RowNotFound => Some(Signal::NotFound),
            sqlx::Error::Database(db_err) => db_err.code().and_then(|code| {
                SQLSTATE_SIGNALS
                    .iter()
                    .find(|(sqlstate, _)| *sqlstate == code.as_ref())
                    .map(|(_, signal)| *signal)
            }),
            _ => None,
        };

        match signal {
            Some(Signal::DuplicateKey) => {
                let constraint = match &err {
                    sqlx::Error::Database(db_err) => {
                        db_err.constraint().unwrap_or("unknown").to_string()
                    }
                    _ => "unknown".to_string(),
                };
                StoreError::DuplicateKey(constraint)
            }
            Some(Signal::NotFound) => StoreError::NotFound,
            None => StoreError::Database(err),
        }
    }
}

/// Row selection shared by listing, counting and aggregation
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BookFilter {
    /// Only rows with `deleted_at IS NULL`
    pub active_only: bool,
    pub author: Option<String>,
    pub title: Option<String>,
}

impl BookFilter {
    pub fn active() -> Self {
        Self {
            active_only: true,
            ..Self::default()
        }
    }

    /// Add a case-insensitive author match; blank terms are ignored
    pub fn with_author(mut self, author: Option<String>) -> Self {
        self.author = author.filter(|a| !a.is_empty());
        self
    }

    /// Add a case-insensitive title match; blank terms are ignored
    pub fn with_title(mut self, title: Option<String>) -> Self {
        self.title = title.filter(|t| !t.is_empty());
        self
    }
}

/// Persistence access for book records.
///
/// Rows are returned whatever their `deleted_at`; hiding deleted books is the
/// service's job.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait BookStore: Send + Sync {
    async fn insert(&self, book: &NewBook) -> StoreResult<Book>;

    async fn find_by_id(&self, id: i32) -> StoreResult<Option<Book>>;

    /// Matching rows, newest first
    async fn find_many(&self, filter: &BookFilter, offset: i64, limit: i64) -> StoreResult<Vec<Book>>;

    async fn count(&self, filter: &BookFilter) -> StoreResult<i64>;

    async fn update(&self, id: i32, changes: &BookChanges) -> StoreResult<Book>;

    /// Row count, page sum and the ten most frequent authors
    async fn aggregate_stats(&self, filter: &BookFilter) -> StoreResult<BookAggregate>;

    /// Check the database answers
    async fn ping(&self) -> StoreResult<()>;
}

/// Main repository struct holding database connection pool
#[derive(Clone)]
pub struct Repository {
    pub pool: Pool<Postgres>,
    pub books: books::BooksRepository,
}

impl Repository {
    /// Create a new repository with the given database pool
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self {
            books: books::BooksRepository::new(pool.clone()),
            pool,
        }
    }

    /// Close the pool once in-flight queries have finished
    pub async fn close(&self) {
        self.pool.close().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_row_not_found_is_not_found() {
        assert!(matches!(
            StoreError::from(sqlx::Error::RowNotFound),
            StoreError::NotFound
        ));
    }

    #[test]
    fn test_other_errors_stay_opaque() {
        assert!(matches!(
            StoreError::from(sqlx::Error::PoolTimedOut),
            StoreError::Database(sqlx::Error::PoolTimedOut)
        ));
    }

    #[test]
    fn test_filter_ignores_blank_terms() {
        let filter = BookFilter::active()
            .with_author(Some(String::new()))
            .with_title(Some("Dune".to_string()));
        assert!(filter.active_only);
        assert_eq!(filter.author, None);
        assert_eq!(filter.title.as_deref(), Some("Dune"));
    }
}
