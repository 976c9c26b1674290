mod common;

use common::TestApp;

#[tokio::test]
#[ignore = "requires a running MongoDB (TEST_MONGODB_URI)"]
async fn health_check_works() {
    let app = TestApp::spawn().await;

    let client = reqwest::Client::new();
    let response = client
        .get(format!("{}/health", app.address))
        .send()
        .await
        .expect("Failed to execute request");

    assert!(response.status().is_success());
    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["status"], "ok");
    assert_eq!(body["service"], "donation-service");

    app.cleanup().await;
}

#[tokio::test]
#[ignore = "requires a running MongoDB (TEST_MONGODB_URI)"]
async fn metrics_endpoint_responds() {
    let app = TestApp::spawn().await;

    let client = reqwest::Client::new();
    let response = client
        .get(format!("{}/metrics", app.address))
        .send()
        .await
        .expect("Failed to execute request");

    assert!(response.status().is_success());

    app.cleanup().await;
}
