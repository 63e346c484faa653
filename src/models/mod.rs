//! Data models for the book records server

pub mod book;

// Re-export commonly used types
pub use book::{Book, BookPage, BookQuery, BookStats, CreateBook, UpdateBook};
