//! Tests for stop-signal wiring

use std::time::Duration;

use churn::runtime::shutdown_token;

#[tokio::test(start_paused = true)]
async fn test_token_without_deadline_waits() {
    let token = shutdown_token(None);
    tokio::time::sleep(Duration::from_secs(3600)).await;
    assert!(!token.is_cancelled());
    token.cancel();
    assert!(token.is_cancelled());
}

#[tokio::test(start_paused = true)]
async fn test_token_with_deadline_fires() {
    let token = shutdown_token(Some(Duration::from_secs(10)));
    tokio::time::timeout(Duration::from_secs(11), token.cancelled())
        .await
        .expect("token cancelled by deadline");
}
