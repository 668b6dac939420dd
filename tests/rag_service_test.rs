//! Integration tests for the vector search service
//!
//! Builds an index from a small corpus with the hashing embedder, serves it
//! on a local port and queries it over HTTP.

mod common;

use common::{client, spawn_search_service, KERNING_TEXT, RAG_TOKEN};
use glyphs_assistant::rag::index::{CONFIG_FILE, META_FILE, VECTORS_FILE};
use serde_json::{json, Value};
use tempfile::tempdir;

#[tokio::test]
async fn test_search_returns_best_match_first() {
    let dir = tempdir().expect("Failed to create temp dir");
    let base = spawn_search_service(dir.path()).await;

    let response = client()
        .post(format!("{}/search", base))
        .bearer_auth(RAG_TOKEN)
        .json(&json!({"query": "kerning groups leftKerningGroup", "top_k": 2}))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);

    let body: Value = response.json().await.unwrap();
    let results = body["results"].as_array().unwrap();
    assert_eq!(results.len(), 2);
    assert_eq!(results[0]["text"], KERNING_TEXT);
    assert!(results[0]["meta"]["path"]
        .as_str()
        .unwrap()
        .ends_with("kerning.md"));
    assert_eq!(results[0]["id"].as_str().unwrap().len(), 16);
    assert!(results[0]["score"].as_f64().unwrap() > results[1]["score"].as_f64().unwrap());

    // The index directory has the interchange layout
    let index_dir = dir.path().join("index");
    assert!(index_dir.join(VECTORS_FILE).exists());
    assert!(index_dir.join(META_FILE).exists());
    assert!(index_dir.join(CONFIG_FILE).exists());
}

#[tokio::test]
async fn test_search_defaults_top_k() {
    let dir = tempdir().expect("Failed to create temp dir");
    let base = spawn_search_service(dir.path()).await;

    let body: Value = client()
        .post(format!("{}/search", base))
        .bearer_auth(RAG_TOKEN)
        .json(&json!({"query": "export"}))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    // Only two chunks exist, fewer than the default of five
    assert_eq!(body["results"].as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn test_search_requires_bearer_token() {
    let dir = tempdir().expect("Failed to create temp dir");
    let base = spawn_search_service(dir.path()).await;

    let missing = client()
        .post(format!("{}/search", base))
        .json(&json!({"query": "kerning"}))
        .send()
        .await
        .unwrap();
    assert_eq!(missing.status(), 401);
    let body: Value = missing.json().await.unwrap();
    assert_eq!(body["error"], "Unauthorized");
    assert_eq!(body["status"], 401);

    let wrong = client()
        .post(format!("{}/search", base))
        .bearer_auth("nope")
        .json(&json!({"query": "kerning"}))
        .send()
        .await
        .unwrap();
    assert_eq!(wrong.status(), 401);
}

#[tokio::test]
async fn test_health_reports_index() {
    let dir = tempdir().expect("Failed to create temp dir");
    let base = spawn_search_service(dir.path()).await;

    let body: Value = client()
        .get(format!("{}/health", base))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["records"], 2);
    assert_eq!(body["dimension"], 256);
    assert_eq!(body["model"], "hashing");
}
