//! HTTP tests against a running server.
//!
//! These tests require:
//! - A running `PostgreSQL` database with migrations applied (`gp-cli migrate`)
//! - The server running (`cargo run -p growth-pilot-app`)
//! - `SHOPIFY_API_SECRET` matching the server's, for the webhook tests
//!
//! Run with: `cargo test -p growth-pilot-integration-tests -- --ignored`

use reqwest::StatusCode;
use reqwest::header::LOCATION;

use growth_pilot::shopify::signing::webhook_signature;
use growth_pilot_integration_tests::{base_url, client};

fn api_secret() -> String {
    std::env::var("SHOPIFY_API_SECRET").expect("SHOPIFY_API_SECRET must be set")
}

async fn post_webhook(topic: &str, body: &str, signature: &str) -> reqwest::Response {
    client()
        .post(format!("{}/webhooks", base_url()))
        .header("X-Shopify-Topic", topic)
        .header("X-Shopify-Shop-Domain", "pilot-integration.myshopify.com")
        .header("X-Shopify-Hmac-Sha256", signature)
        .body(body.to_string())
        .send()
        .await
        .expect("Failed to post webhook")
}

// ============================================================================
// Health
// ============================================================================

#[tokio::test]
#[ignore = "Requires running server"]
async fn test_health_endpoints() {
    let resp = client()
        .get(format!("{}/health", base_url()))
        .send()
        .await
        .expect("Failed to get /health");
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(resp.text().await.unwrap(), "ok");

    let resp = client()
        .get(format!("{}/health/ready", base_url()))
        .send()
        .await
        .expect("Failed to get /health/ready");
    assert_eq!(resp.status(), StatusCode::OK);
}

// ============================================================================
// Landing and auth
// ============================================================================

#[tokio::test]
#[ignore = "Requires running server"]
async fn test_landing_page_renders_install_form() {
    let resp = client()
        .get(format!("{}/?error=invalid_shop", base_url()))
        .send()
        .await
        .expect("Failed to get landing page");

    assert_eq!(resp.status(), StatusCode::OK);
    assert!(resp.headers().contains_key("x-request-id"));
    let body = resp.text().await.unwrap();
    assert!(body.contains("action=\"/auth/login\""));
    assert!(body.contains(".myshopify.com"));
}

#[tokio::test]
#[ignore = "Requires running server"]
async fn test_login_rejects_invalid_shop() {
    let resp = client()
        .get(format!("{}/auth/login?shop=evil.example.com", base_url()))
        .send()
        .await
        .expect("Failed to start login");

    assert_eq!(resp.status(), StatusCode::SEE_OTHER);
    assert_eq!(resp.headers()[LOCATION], "/?error=invalid_shop");
}

#[tokio::test]
#[ignore = "Requires running server"]
async fn test_login_redirects_to_shopify_and_sets_cookie() {
    let resp = client()
        .get(format!(
            "{}/auth/login?shop=pilot-integration.myshopify.com",
            base_url()
        ))
        .send()
        .await
        .expect("Failed to start login");

    assert_eq!(resp.status(), StatusCode::SEE_OTHER);
    let location = resp.headers()[LOCATION].to_str().unwrap();
    assert!(location.starts_with("https://pilot-integration.myshopify.com/admin/oauth/authorize"));
    assert!(location.contains("state="));
    assert!(
        resp.cookies().any(|c| c.name() == "gp_session"),
        "session cookie should carry the OAuth state"
    );
}

#[tokio::test]
#[ignore = "Requires running server"]
async fn test_callback_with_bad_hmac_is_rejected() {
    let resp = client()
        .get(format!(
            "{}/auth/callback?shop=pilot-integration.myshopify.com&code=abc&state=x&hmac=00",
            base_url()
        ))
        .send()
        .await
        .expect("Failed to call callback");

    assert_eq!(resp.status(), StatusCode::SEE_OTHER);
    assert_eq!(resp.headers()[LOCATION], "/?error=invalid_hmac");
}

// ============================================================================
// Pages require an installed shop
// ============================================================================

#[tokio::test]
#[ignore = "Requires running server"]
async fn test_pages_redirect_without_session() {
    for path in ["/app", "/app/sales", "/app/orders", "/app/billing", "/app/settings"] {
        let resp = client()
            .get(format!("{}{path}", base_url()))
            .send()
            .await
            .expect("Failed to get page");
        assert_eq!(resp.status(), StatusCode::SEE_OTHER, "{path}");
        assert_eq!(resp.headers()[LOCATION], "/", "{path}");
    }
}

#[tokio::test]
#[ignore = "Requires running server"]
async fn test_api_returns_401_without_session() {
    for path in ["/api/dashboard", "/api/products", "/api/alerts"] {
        let resp = client()
            .get(format!("{}{path}", base_url()))
            .send()
            .await
            .expect("Failed to get API route");
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED, "{path}");
    }
}

// ============================================================================
// Webhooks
// ============================================================================

#[tokio::test]
#[ignore = "Requires running server and SHOPIFY_API_SECRET"]
async fn test_webhook_rejects_bad_signature() {
    let resp = post_webhook("orders/create", "{}", "bm90IHRoZSBzaWduYXR1cmU=").await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
#[ignore = "Requires running server and SHOPIFY_API_SECRET"]
async fn test_webhook_topics() {
    let body = r#"{"id":1}"#;
    let signature = webhook_signature(api_secret().as_bytes(), body.as_bytes()).unwrap();

    let resp = post_webhook("orders/create", body, &signature).await;
    assert_eq!(resp.status(), StatusCode::OK);

    let resp = post_webhook("carts/update", body, &signature).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    assert_eq!(resp.text().await.unwrap(), "Unhandled webhook topic");

    let resp = post_webhook("app/uninstalled", body, &signature).await;
    assert_eq!(resp.status(), StatusCode::OK);
}

#[tokio::test]
#[ignore = "Requires running server"]
async fn test_quick_insight_requires_session() {
    let resp = client()
        .post(format!("{}/api/ai-insights/quick", base_url()))
        .json(&serde_json::json!({"metric": "revenue", "value": 1200}))
        .send()
        .await
        .expect("Failed to post quick insight");
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
}
