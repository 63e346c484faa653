//! Book model and request/response types

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::{IntoParams, ToSchema};
use validator::{Validate, ValidationError};

/// Book record as stored in the `books` table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Book {
    pub id: i32,
    /// ISBN-10 or ISBN-13, unique across all records (deleted included)
    pub isbn: String,
    pub title: String,
    pub author: String,
    pub description: Option<String>,
    pub published_date: Option<NaiveDate>,
    pub pages: Option<i32>,
    pub cover_image_url: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    /// Set when the book is soft-deleted
    pub deleted_at: Option<DateTime<Utc>>,
}

impl Book {
    pub fn is_deleted(&self) -> bool {
        self.deleted_at.is_some()
    }
}

/// Create book request
#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct CreateBook {
    #[validate(custom(function = "validate_isbn"))]
    pub isbn: String,
    #[validate(length(min = 1, message = "Title is required"))]
    pub title: String,
    #[validate(length(min = 1, message = "Author is required"))]
    pub author: String,
    pub description: Option<String>,
    /// ISO 8601 date (`2023-01-01`) or timestamp
    pub published_date: Option<String>,
    #[validate(range(min = 1, message = "Pages must be a positive integer"))]
    pub pages: Option<i32>,
    #[validate(url(message = "Cover image URL must be a valid URL"))]
    pub cover_image_url: Option<String>,
}

/// Update book request, every field optional.
///
/// For the nullable columns an explicit `null` clears the value while an
/// absent key leaves it untouched. A `null` published date is ignored.
#[derive(Debug, Clone, Default, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct UpdateBook {
    #[validate(custom(function = "validate_isbn"))]
    pub isbn: Option<String>,
    #[validate(length(min = 1, message = "Title must not be empty"))]
    pub title: Option<String>,
    #[validate(length(min = 1, message = "Author must not be empty"))]
    pub author: Option<String>,
    #[serde(default, with = "::serde_with::rust::double_option")]
    #[schema(value_type = Option<String>)]
    pub description: Option<Option<String>>,
    pub published_date: Option<String>,
    #[serde(default, with = "::serde_with::rust::double_option")]
    #[schema(value_type = Option<i32>)]
    #[validate(range(min = 1, message = "Pages must be a positive integer"))]
    pub pages: Option<Option<i32>>,
    #[serde(default, with = "::serde_with::rust::double_option")]
    #[schema(value_type = Option<String>)]
    #[validate(url(message = "Cover image URL must be a valid URL"))]
    pub cover_image_url: Option<Option<String>>,
}

/// Validated row to insert
#[derive(Debug, Clone, PartialEq)]
pub struct NewBook {
    pub isbn: String,
    pub title: String,
    pub author: String,
    pub description: Option<String>,
    pub published_date: Option<NaiveDate>,
    pub pages: Option<i32>,
    pub cover_image_url: Option<String>,
}

/// Column changes for an update; `None` leaves the column untouched and
/// `Some(None)` sets a nullable column to NULL. `updated_at` is always written.
#[derive(Debug, Clone, PartialEq)]
pub struct BookChanges {
    pub isbn: Option<String>,
    pub title: Option<String>,
    pub author: Option<String>,
    pub description: Option<Option<String>>,
    pub published_date: Option<NaiveDate>,
    pub pages: Option<Option<i32>>,
    pub cover_image_url: Option<Option<String>>,
    pub deleted_at: Option<DateTime<Utc>>,
    pub updated_at: DateTime<Utc>,
}

impl BookChanges {
    /// Changes that only touch `updated_at`
    pub fn touch(now: DateTime<Utc>) -> Self {
        Self {
            isbn: None,
            title: None,
            author: None,
            description: None,
            published_date: None,
            pages: None,
            cover_image_url: None,
            deleted_at: None,
            updated_at: now,
        }
    }
}

/// Book list query parameters
#[derive(Debug, Default, Deserialize, IntoParams, ToSchema)]
#[into_params(parameter_in = Query)]
pub struct BookQuery {
    /// Page number (default: 1)
    pub page: Option<i64>,
    /// Books per page (default: 10)
    pub limit: Option<i64>,
    /// Case-insensitive substring of the author
    pub author: Option<String>,
    /// Case-insensitive substring of the title
    pub title: Option<String>,
}

/// Pagination metadata of a list response
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct Pagination {
    pub total: i64,
    pub page: i64,
    pub limit: i64,
    /// Number of pages, `ceil(total / limit)`
    pub pages: i64,
}

impl Pagination {
    pub fn new(total: i64, page: i64, limit: i64) -> Self {
        let pages = total / limit + i64::from(total % limit != 0);
        Self {
            total,
            page,
            limit,
            pages,
        }
    }
}

/// Page of books
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct BookPage {
    #[serde(rename = "data")]
    pub items: Vec<Book>,
    pub pagination: Pagination,
}

/// Number of active books for one author
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow, ToSchema)]
pub struct AuthorCount {
    pub author: String,
    pub count: i64,
}

/// Aggregate statistics over active books
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct BookStats {
    pub total_books: i64,
    pub total_pages: i64,
    /// Ten most prolific authors, highest count first
    pub top_authors: Vec<AuthorCount>,
}

/// Raw aggregate computed by the store
#[derive(Debug, Clone, PartialEq)]
pub struct BookAggregate {
    pub total: i64,
    /// `None` when no row has a page count
    pub pages_sum: Option<i64>,
    pub authors: Vec<AuthorCount>,
}

/// Strip hyphens and spaces from an ISBN
pub fn normalize_isbn(isbn: &str) -> String {
    isbn.chars()
        .filter(|c| *c != '-' && *c != ' ')
        .collect()
}

/// Check an ISBN-10 or ISBN-13, including its check digit
pub fn is_valid_isbn(isbn: &str) -> bool {
    let normalized = normalize_isbn(isbn);
    let chars: Vec<char> = normalized.chars().collect();

    match chars.len() {
        10 => {
            let mut sum = 0;
            for (i, c) in chars.iter().enumerate() {
                let value = match c {
                    'X' | 'x' if i == 9 => 10,
                    c => match c.to_digit(10) {
                        Some(d) => d,
                        None => return false,
                    },
                };
                sum += value * (10 - i as u32);
            }
            sum % 11 == 0
        }
        13 => {
            let mut sum = 0;
            for (i, c) in chars.iter().enumerate() {
                let Some(d) = c.to_digit(10) else {
                    return false;
                };
                sum += if i % 2 == 0 { d } else { d * 3 };
            }
            sum % 10 == 0
        }
        _ => false,
    }
}

fn validate_isbn(isbn: &str) -> Result<(), ValidationError> {
    if is_valid_isbn(isbn) {
        Ok(())
    } else {
        let mut err = ValidationError::new("isbn");
        err.message = Some("ISBN must be a valid ISBN-10 or ISBN-13".into());
        Err(err)
    }
}

/// Parse a published date given as `YYYY-MM-DD` or as an RFC 3339 timestamp
pub fn parse_published_date(value: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .ok()
        .or_else(|| {
            DateTime::parse_from_rfc3339(value)
                .ok()
                .map(|d| d.with_timezone(&Utc).date_naive())
        })
}
