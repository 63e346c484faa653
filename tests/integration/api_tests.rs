//! API integration tests against a running server and database

use reqwest::Client;
use serde_json::{json, Value};

const BASE_URL: &str = "http://localhost:4001/api/v1";

/// Build a valid ISBN-13 unique to this run from a 978 prefix and a counter
fn unique_isbn(seed: u64) -> String {
    let body = format!("978{:09}", seed % 1_000_000_000);
    let sum: u32 = body
        .chars()
        .enumerate()
        .map(|(i, c)| {
            let d = c.to_digit(10).unwrap();
            if i % 2 == 0 { d } else { d * 3 }
        })
        .sum();
    format!("{}{}", body, (10 - sum % 10) % 10)
}

fn seed() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap()
        .as_nanos() as u64
}

async fn create_book(client: &Client, isbn: &str, author: &str) -> Value {
    let response = client
        .post(format!("{}/books", BASE_URL))
        .json(&json!({
            "isbn": isbn,
            "title": "Test Book",
            "author": author,
            "publishedDate": "2023-01-01",
            "pages": 300
        }))
        .send()
        .await
        .expect("Failed to send request");

    assert_eq!(response.status(), 201);
    response.json().await.expect("Failed to parse response")
}

#[tokio::test]
#[ignore] // Run with: cargo test -- --ignored
async fn test_health_check() {
    let client = Client::new();

    let response = client
        .get(format!("{}/health", BASE_URL))
        .send()
        .await
        .expect("Failed to send request");

    assert!(response.status().is_success());

    let body: Value = response.json().await.expect("Failed to parse response");
    assert_eq!(body["status"], "healthy");
}

#[tokio::test]
#[ignore]
async fn test_readiness_check() {
    let client = Client::new();

    let response = client
        .get(format!("{}/ready", BASE_URL))
        .send()
        .await
        .expect("Failed to send request");

    assert!(response.status().is_success());
}

#[tokio::test]
#[ignore]
async fn test_book_lifecycle() {
    let client = Client::new();
    let isbn = unique_isbn(seed());

    let created = create_book(&client, &isbn, "Lifecycle Author").await;
    let id = created["id"].as_i64().expect("No book ID");

    // Duplicate ISBN
    let response = client
        .post(format!("{}/books", BASE_URL))
        .json(&json!({ "isbn": isbn, "title": "Other", "author": "Other" }))
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status(), 409);

    // Update title
    let response = client
        .put(format!("{}/books/{}", BASE_URL, id))
        .json(&json!({ "title": "Updated Title" }))
        .send()
        .await
        .expect("Failed to send request");
    assert!(response.status().is_success());
    let updated: Value = response.json().await.expect("Failed to parse response");
    assert_eq!(updated["title"], "Updated Title");
    assert_eq!(updated["createdAt"], created["createdAt"]);
    assert_ne!(updated["updatedAt"], created["updatedAt"]);

    // Soft delete
    let response = client
        .delete(format!("{}/books/{}", BASE_URL, id))
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status(), 204);

    let response = client
        .get(format!("{}/books/{}", BASE_URL, id))
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status(), 404);

    let response = client
        .delete(format!("{}/books/{}", BASE_URL, id))
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status(), 404);

    // Deleted rows keep their ISBN
    let response = client
        .post(format!("{}/books", BASE_URL))
        .json(&json!({ "isbn": isbn, "title": "Again", "author": "Again" }))
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status(), 409);

    let response = client
        .get(format!("{}/books?author=Lifecycle%20Author&limit=100", BASE_URL))
        .send()
        .await
        .expect("Failed to send request");
    let body: Value = response.json().await.expect("Failed to parse response");
    let listed = body["data"].as_array().expect("No data array");
    assert!(listed.iter().all(|b| b["id"].as_i64() != Some(id)));
}

#[tokio::test]
#[ignore]
async fn test_list_books_filter_is_case_insensitive() {
    let client = Client::new();
    let run = seed();
    let author = format!("Filter Author {}", run);
    create_book(&client, &unique_isbn(run), &author).await;

    let response = client
        .get(format!("{}/books", BASE_URL))
        .query(&[("author", author.to_lowercase())])
        .send()
        .await
        .expect("Failed to send request");

    assert!(response.status().is_success());
    let body: Value = response.json().await.expect("Failed to parse response");
    assert_eq!(body["pagination"]["total"], 1);
    assert_eq!(body["pagination"]["pages"], 1);
    assert_eq!(body["data"][0]["author"], author.as_str());
}

#[tokio::test]
#[ignore]
async fn test_invalid_isbn_is_bad_request() {
    let client = Client::new();

    let response = client
        .post(format!("{}/books", BASE_URL))
        .json(&json!({ "isbn": "12345", "title": "Bad", "author": "Bad" }))
        .send()
        .await
        .expect("Failed to send request");

    assert_eq!(response.status(), 400);
}

#[tokio::test]
#[ignore]
async fn test_get_stats() {
    let client = Client::new();

    let response = client
        .get(format!("{}/books/stats", BASE_URL))
        .send()
        .await
        .expect("Failed to send request");

    assert!(response.status().is_success());

    let body: Value = response.json().await.expect("Failed to parse response");
    assert!(body["totalBooks"].is_number());
    assert!(body["totalPages"].is_number());
    assert!(body["topAuthors"].as_array().map_or(false, |a| a.len() <= 10));
}
