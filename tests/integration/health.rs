//! Health endpoint integration tests

use crate::common::TestHarness;

#[tokio::test]
async fn test_health_check_ok() {
    let harness = TestHarness::new();

    let response = harness.server.get("/health").await;
    response.assert_status_ok();

    let body: serde_json::Value = response.json();
    assert_eq!(body["ok"], true);
    assert!(body["uptime_seconds"].is_u64());
}
