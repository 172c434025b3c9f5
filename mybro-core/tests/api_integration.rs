//! Integration tests that call the real Gemini API.
//!
//! These tests require GEMINI_API_KEY to be set (via .env file or environment).
//! Run with: `cargo test -p mybro-core --test api_integration -- --ignored`
//!
//! These are marked #[ignore] by default to avoid API costs and slow runs.

use mybro_core::{ChatSession, CompanionConfig, Disposition};
use tempfile::TempDir;

/// Load environment variables from .env file
fn setup() {
    let _ = dotenvy::dotenv();
}

/// Check if API key is available
fn has_api_key() -> bool {
    std::env::var("GEMINI_API_KEY").is_ok()
}

#[tokio::test]
#[ignore] // Run with: cargo test -p mybro-core --test api_integration -- --ignored
async fn test_real_reply() {
    setup();
    if !has_api_key() {
        eprintln!("Skipping test: GEMINI_API_KEY not set");
        return;
    }

    let dir = TempDir::new().unwrap();
    let config = CompanionConfig::default().with_data_dir(dir.path());
    let mut session = ChatSession::open_with_gemini(config, "api_test")
        .await
        .expect("Failed to open session");

    let reply = session.send("I've been a bit stressed about work lately").await;
    println!("Reply: {}", reply.text);

    assert_eq!(reply.disposition, Disposition::Answered);
    assert!(!reply.text.trim().is_empty());
    assert!(!reply.crisis_resources);
}

#[tokio::test]
#[ignore]
async fn test_real_check_in() {
    setup();
    if !has_api_key() {
        eprintln!("Skipping test: GEMINI_API_KEY not set");
        return;
    }

    let dir = TempDir::new().unwrap();
    let config = CompanionConfig::default().with_data_dir(dir.path());
    let mut session = ChatSession::open_with_gemini(config, "api_test")
        .await
        .unwrap();

    let greeting = session.daily_check_in().await.expect("first check-in of the day");
    println!("Check-in: {greeting}");
    assert!(session.daily_check_in().await.is_none());
}
