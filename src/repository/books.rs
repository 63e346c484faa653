//! Books repository

use async_trait::async_trait;
use sqlx::{Pool, Postgres, QueryBuilder};

use super::{BookFilter, BookStore, StoreError, StoreResult};
use crate::models::book::{AuthorCount, Book, BookAggregate, BookChanges, NewBook};

const BOOK_COLUMNS: &str = "id, isbn, title, author, description, published_date, pages, \
                            cover_image_url, created_at, updated_at, deleted_at";

/// Number of authors returned by the stats grouping
const TOP_AUTHORS_LIMIT: i64 = 10;

/// Escape LIKE wildcards so the term matches literally
fn like_pattern(term: &str) -> String {
    let mut escaped = String::with_capacity(term.len() + 2);
    escaped.push('%');
    for c in term.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped.push('%');
    escaped
}

/// Append `WHERE ...` for the filter; values are bound, never interpolated
fn push_filter<'a>(builder: &mut QueryBuilder<'a, Postgres>, filter: &'a BookFilter) {
    builder.push(" WHERE TRUE");
    if filter.active_only {
        builder.push(" AND deleted_at IS NULL");
    }
    if let Some(ref author) = filter.author {
        builder.push(" AND author ILIKE ").push_bind(like_pattern(author));
    }
    if let Some(ref title) = filter.title {
        builder.push(" AND title ILIKE ").push_bind(like_pattern(title));
    }
}

/// Paged select of matching rows, newest first
fn page_query<'a>(filter: &'a BookFilter, offset: i64, limit: i64) -> QueryBuilder<'a, Postgres> {
    let mut builder = QueryBuilder::new(format!("SELECT {BOOK_COLUMNS} FROM books"));
    push_filter(&mut builder, filter);
    builder
        .push(" ORDER BY created_at DESC, id DESC LIMIT ")
        .push_bind(limit)
        .push(" OFFSET ")
        .push_bind(offset);
    builder
}

/// Top authors by count; equal counts fall back to author name order
fn top_authors_query(filter: &BookFilter) -> QueryBuilder<'_, Postgres> {
    let mut builder = QueryBuilder::new("SELECT author, COUNT(*) AS count FROM books");
    push_filter(&mut builder, filter);
    builder
        .push(" GROUP BY author ORDER BY count DESC, author ASC LIMIT ")
        .push_bind(TOP_AUTHORS_LIMIT);
    builder
}

/// `UPDATE` writing `updated_at` plus the supplied columns only
fn update_query(id: i32, changes: &BookChanges) -> QueryBuilder<'_, Postgres> {
    let mut builder = QueryBuilder::new("UPDATE books SET updated_at = ");
    builder.push_bind(changes.updated_at);

    macro_rules! set_field {
        ($field:expr, $column:literal) => {
            if let Some(ref value) = $field {
                builder.push(concat!(", ", $column, " = ")).push_bind(value);
            }
        };
    }

    set_field!(changes.isbn, "isbn");
    set_field!(changes.title, "title");
    set_field!(changes.author, "author");
    // Some(None) binds NULL
    set_field!(changes.description, "description");
    set_field!(changes.published_date, "published_date");
    set_field!(changes.pages, "pages");
    set_field!(changes.cover_image_url, "cover_image_url");
    set_field!(changes.deleted_at, "deleted_at");

    builder
        .push(" WHERE id = ")
        .push_bind(id)
        .push(format!(" RETURNING {BOOK_COLUMNS}"));
    builder
}

#[derive(Clone)]
pub struct BooksRepository {
    pool: Pool<Postgres>,
}

impl BooksRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl BookStore for BooksRepository {
    async fn insert(&self, book: &NewBook) -> StoreResult<Book> {
        let row = sqlx::query_as::<_, Book>(&format!(
            r#"
            INSERT INTO books (isbn, title, author, description, published_date, pages, cover_image_url)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING {BOOK_COLUMNS}
            "#
        ))
        .bind(&book.isbn)
        .bind(&book.title)
        .bind(&book.author)
        .bind(&book.description)
        .bind(book.published_date)
        .bind(book.pages)
        .bind(&book.cover_image_url)
        .fetch_one(&self.pool)
        .await?;
        Ok(row)
    }

    async fn find_by_id(&self, id: i32) -> StoreResult<Option<Book>> {
        let row = sqlx::query_as::<_, Book>(&format!("SELECT {BOOK_COLUMNS} FROM books WHERE id = $1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row)
    }

    async fn find_many(&self, filter: &BookFilter, offset: i64, limit: i64) -> StoreResult<Vec<Book>> {
        let rows = page_query(filter, offset, limit)
            .build_query_as::<Book>()
            .fetch_all(&self.pool)
            .await?;
        Ok(rows)
    }

    async fn count(&self, filter: &BookFilter) -> StoreResult<i64> {
        let mut builder = QueryBuilder::new("SELECT COUNT(*) FROM books");
        push_filter(&mut builder, filter);

        let total: i64 = builder
            .build_query_scalar()
            .fetch_one(&self.pool)
            .await?;
        Ok(total)
    }

    async fn update(&self, id: i32, changes: &BookChanges) -> StoreResult<Book> {
        update_query(id, changes)
            .build_query_as::<Book>()
            .fetch_optional(&self.pool)
            .await?
            .ok_or(StoreError::NotFound)
    }

    async fn aggregate_stats(&self, filter: &BookFilter) -> StoreResult<BookAggregate> {
        let mut totals = QueryBuilder::new("SELECT COUNT(*), SUM(pages)::bigint FROM books");
        push_filter(&mut totals, filter);
        let (total, pages_sum): (i64, Option<i64>) = totals
            .build_query_as()
            .fetch_one(&self.pool)
            .await?;

        let authors = top_authors_query(filter)
            .build_query_as::<AuthorCount>()
            .fetch_all(&self.pool)
            .await?;

        Ok(BookAggregate {
            total,
            pages_sum,
            authors,
        })
    }

    async fn ping(&self) -> StoreResult<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::*;

    #[test]
    fn test_like_pattern_escapes_wildcards() {
        assert_eq!(like_pattern("Test Author"), "%Test Author%");
        assert_eq!(like_pattern("100%_done\\"), "%100\\%\\_done\\\\%");
    }

    #[test]
    fn test_filter_sql() {
        let filter = BookFilter::active()
            .with_author(Some("tolkien".to_string()))
            .with_title(Some("ring".to_string()));
        let mut builder = QueryBuilder::new("SELECT COUNT(*) FROM books");
        push_filter(&mut builder, &filter);
        assert_eq!(
            builder.sql(),
            "SELECT COUNT(*) FROM books WHERE TRUE AND deleted_at IS NULL \
             AND author ILIKE $1 AND title ILIKE $2"
        );
    }

    #[test]
    fn test_unfiltered_sql() {
        let filter = BookFilter::default();
        let mut builder = QueryBuilder::new("SELECT COUNT(*) FROM books");
        push_filter(&mut builder, &filter);
        assert_eq!(builder.sql(), "SELECT COUNT(*) FROM books WHERE TRUE");
    }

    #[test]
    fn test_page_query_orders_newest_first() {
        let filter = BookFilter::active();
        let builder = page_query(&filter, 20, 10);
        assert_eq!(
            builder.sql(),
            format!(
                "SELECT {BOOK_COLUMNS} FROM books WHERE TRUE AND deleted_at IS NULL \
                 ORDER BY created_at DESC, id DESC LIMIT $1 OFFSET $2"
            )
        );
    }

    #[test]
    fn test_top_authors_tie_break() {
        let filter = BookFilter::active();
        let builder = top_authors_query(&filter);
        assert_eq!(
            builder.sql(),
            "SELECT author, COUNT(*) AS count FROM books WHERE TRUE AND deleted_at IS NULL \
             GROUP BY author ORDER BY count DESC, author ASC LIMIT $1"
        );
    }

    #[test]
    fn test_update_writes_supplied_columns_only() {
        let changes = BookChanges {
            title: Some("New Title".to_string()),
            pages: Some(None),
            ..BookChanges::touch(Utc::now())
        };
        let builder = update_query(4, &changes);
        assert_eq!(
            builder.sql(),
            format!(
                "UPDATE books SET updated_at = $1, title = $2, pages = $3 \
                 WHERE id = $4 RETURNING {BOOK_COLUMNS}"
            )
        );
    }

    #[test]
    fn test_soft_delete_update_sql() {
        let now = Utc::now();
        let changes = BookChanges {
            deleted_at: Some(now),
            ..BookChanges::touch(now)
        };
        let builder = update_query(1, &changes);
        assert_eq!(
            builder.sql(),
            format!(
                "UPDATE books SET updated_at = $1, deleted_at = $2 \
                 WHERE id = $3 RETURNING {BOOK_COLUMNS}"
            )
        );
    }
}
