//! End-to-end tests for the cart and checkout HTTP surface.
//!
//! Drives the real router over `tower::ServiceExt::oneshot` with an
//! in-memory database, in-memory sessions, and a mock gateway. Session
//! continuity between requests is carried via the session cookie, the
//! same way a browser would.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::Router;
use axum::body::Body;
use axum::http::{Request, Response, StatusCode, header};
use hmac::{Hmac, Mac};
use http_body_util::BodyExt;
use rust_decimal::Decimal;
use secrecy::SecretString;
use serde_json::{Value, json};
use sha2::Sha256;
use sqlx::SqlitePool;
use sqlx::sqlite::SqlitePoolOptions;
use tower::ServiceExt;
use tower_sessions::{MemoryStore, SessionManagerLayer};

use kirana_storefront::config::{RazorpayConfig, StorefrontConfig};
use kirana_storefront::db::{self, OrderRepository, ProductRepository};
use kirana_storefront::models::product::Product;
use kirana_storefront::razorpay::{GatewayError, GatewayOrder, OrderRequest, PaymentGateway};
use kirana_storefront::routes;
use kirana_storefront::state::AppState;

const KEY_SECRET: &str = "rzp_t3st_s3cr3t_f0r_fl0w";

/// Gateway double returning a fixed order id and echoing the amount.
#[derive(Default)]
struct RecordingGateway {
    requests: Mutex<Vec<OrderRequest>>,
}

impl RecordingGateway {
    fn requests(&self) -> Vec<OrderRequest> {
        self.requests.lock().expect("gateway mutex").clone()
    }
}

#[async_trait]
impl PaymentGateway for RecordingGateway {
    async fn create_order(&self, request: &OrderRequest) -> Result<GatewayOrder, GatewayError> {
        self.requests
            .lock()
            .expect("gateway mutex")
            .push(request.clone());
        Ok(GatewayOrder {
            id: "order_mock_1".to_string(),
            amount: request.amount,
            currency: request.currency.clone(),
            receipt: Some(request.receipt.clone()),
        })
    }
}

fn test_config() -> StorefrontConfig {
    StorefrontConfig {
        database_url: SecretString::from("sqlite::memory:"),
        host: "127.0.0.1".parse().expect("loopback"),
        port: 3000,
        base_url: "http://localhost:3000".to_string(),
        session_secret: SecretString::from("x".repeat(32)),
        razorpay: RazorpayConfig {
            key_id: "rzp_test_k3yId".to_string(),
            key_secret: SecretString::from(KEY_SECRET),
        },
        sentry_dsn: None,
    }
}

struct TestApp {
    router: Router,
    pool: SqlitePool,
    gateway: Arc<RecordingGateway>,
}

async fn spawn_app() -> TestApp {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await
        .expect("in-memory pool");
    db::run_migrations(&pool).await.expect("migrations");

    let gateway = Arc::new(RecordingGateway::default());
    let state = AppState::with_gateway(test_config(), pool.clone(), gateway.clone());

    let session_layer = SessionManagerLayer::new(MemoryStore::default());
    let router = routes::routes().layer(session_layer).with_state(state);

    TestApp {
        router,
        pool,
        gateway,
    }
}

impl TestApp {
    async fn send(&self, request: Request<Body>) -> Response<Body> {
        self.router
            .clone()
            .oneshot(request)
            .await
            .expect("request handled")
    }

    async fn seed_product(&self, name: &str, price: &str) -> Product {
        ProductRepository::new(&self.pool)
            .create(name, None, price.parse::<Decimal>().expect("decimal price"))
            .await
            .expect("seed product")
    }

    /// Register an account and return the session cookie for it.
    async fn register(&self, email: &str) -> String {
        let response = self
            .send(post_json(
                "/auth/register",
                None,
                &json!({"email": email, "password": "pass12345"}),
            ))
            .await;
        assert_eq!(response.status(), StatusCode::CREATED);
        session_cookie(&response).expect("register sets a session cookie")
    }
}

fn request(method: &str, uri: &str, cookie: Option<&str>) -> axum::http::request::Builder {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(cookie) = cookie {
        builder = builder.header(header::COOKIE, cookie);
    }
    builder
}

fn get(uri: &str, cookie: Option<&str>) -> Request<Body> {
    request("GET", uri, cookie)
        .body(Body::empty())
        .expect("request")
}

fn post(uri: &str, cookie: Option<&str>) -> Request<Body> {
    request("POST", uri, cookie)
        .body(Body::empty())
        .expect("request")
}

fn post_json(uri: &str, cookie: Option<&str>, body: &Value) -> Request<Body> {
    request("POST", uri, cookie)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .expect("request")
}

fn post_form(uri: &str, cookie: Option<&str>, body: &str) -> Request<Body> {
    request("POST", uri, cookie)
        .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
        .body(Body::from(body.to_string()))
        .expect("request")
}

/// Extract the session cookie pair from a Set-Cookie header, if any.
fn session_cookie(response: &Response<Body>) -> Option<String> {
    let raw = response.headers().get(header::SET_COOKIE)?.to_str().ok()?;
    raw.split(';').next().map(str::to_string)
}

fn location(response: &Response<Body>) -> &str {
    response
        .headers()
        .get(header::LOCATION)
        .and_then(|v| v.to_str().ok())
        .expect("redirect has a location")
}

async fn json_body(response: Response<Body>) -> Value {
    let bytes = response
        .into_body()
        .collect()
        .await
        .expect("read body")
        .to_bytes();
    serde_json::from_slice(&bytes).expect("json body")
}

/// Sign a (order, payment) pair the way the gateway does.
fn sign(order_id: &str, payment_id: &str) -> String {
    let mut mac =
        Hmac::<Sha256>::new_from_slice(KEY_SECRET.as_bytes()).expect("any key length works");
    mac.update(format!("{order_id}|{payment_id}").as_bytes());
    hex::encode(mac.finalize().into_bytes())
}

// ============================================================================
// Cart
// ============================================================================

#[tokio::test]
async fn viewing_an_empty_cart_redirects_home() {
    let app = spawn_app().await;

    let response = app.send(get("/cart", None)).await;

    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/");
}

#[tokio::test]
async fn adding_a_product_prices_the_cart_from_the_catalog() {
    let app = spawn_app().await;
    let product = app.seed_product("Basmati Rice 5kg", "19.99").await;

    let response = app
        .send(post(&format!("/cart/add/{}?quantity=2", product.id), None))
        .await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/?cartAdded=true");
    let cookie = session_cookie(&response).expect("cart mutation starts a session");

    let response = app.send(get("/cart", Some(&cookie))).await;
    assert_eq!(response.status(), StatusCode::OK);

    let body = json_body(response).await;
    assert_eq!(body["total"], "39.98");
    assert_eq!(body["items"][0]["quantity"], 2);
    assert_eq!(body["items"][0]["unit_price"], "19.99");
    assert_eq!(body["flash"]["level"], "success");
}

#[tokio::test]
async fn flash_messages_are_consumed_by_the_first_view() {
    let app = spawn_app().await;
    let product = app.seed_product("Toor Dal 1kg", "4.50").await;

    let response = app
        .send(post(&format!("/cart/add/{}", product.id), None))
        .await;
    let cookie = session_cookie(&response).expect("session cookie");

    let first = json_body(app.send(get("/cart", Some(&cookie))).await).await;
    assert!(first.get("flash").is_some());

    let second = json_body(app.send(get("/cart", Some(&cookie))).await).await;
    assert!(second.get("flash").is_none());
}

#[tokio::test]
async fn updating_to_zero_removes_the_entry_and_empties_the_cart() {
    let app = spawn_app().await;
    let product = app.seed_product("Ghee 500ml", "12.00").await;

    let response = app
        .send(post(&format!("/cart/add/{}", product.id), None))
        .await;
    let cookie = session_cookie(&response).expect("session cookie");

    let response = app
        .send(post_form(
            &format!("/cart/update/{}", product.id),
            Some(&cookie),
            "quantity=0",
        ))
        .await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/");

    let response = app.send(get("/cart", Some(&cookie))).await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
}

#[tokio::test]
async fn adding_with_quantity_zero_still_adds_one() {
    let app = spawn_app().await;
    let product = app.seed_product("Toor Dal 1kg", "4.50").await;

    let response = app
        .send(post(&format!("/cart/add/{}?quantity=0", product.id), None))
        .await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/?cartAdded=true");
    let cookie = session_cookie(&response).expect("session cookie");

    let body = json_body(app.send(get("/cart", Some(&cookie))).await).await;
    assert_eq!(body["items"][0]["quantity"], 1);
    assert_eq!(body["total"], "4.50");
}

#[tokio::test]
async fn adding_an_unknown_product_leaves_the_cart_untouched() {
    let app = spawn_app().await;

    let response = app.send(post("/cart/add/999", None)).await;

    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/?cartError=true");
}

// ============================================================================
// Checkout authentication
// ============================================================================

#[tokio::test]
async fn buy_now_redirects_anonymous_browsers_to_login() {
    let app = spawn_app().await;

    let response = app.send(post("/buy-now/1", None)).await;

    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/auth/login");
}

#[tokio::test]
async fn payment_callbacks_without_a_principal_get_401() {
    let app = spawn_app().await;

    let response = app
        .send(post_json(
            "/payment-success",
            None,
            &json!({
                "razorpay_payment_id": "pay_1",
                "razorpay_order_id": "order_1",
                "razorpay_signature": "00",
            }),
        ))
        .await;

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

// ============================================================================
// Checkout flow
// ============================================================================

#[tokio::test]
async fn cart_checkout_charges_the_server_side_total() {
    let app = spawn_app().await;
    let product = app.seed_product("Basmati Rice 5kg", "19.99").await;
    let cookie = app.register("asha@example.com").await;

    let response = app
        .send(post(
            &format!("/cart/add/{}?quantity=2", product.id),
            Some(&cookie),
        ))
        .await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);

    let response = app
        .send(post_json(
            "/create-order",
            Some(&cookie),
            &json!({"amount": 3998}),
        ))
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["id"], "order_mock_1");
    assert_eq!(body["amount"], 3998);

    let requests = app.gateway.requests();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests.first().map(|r| r.amount), Some(3998));

    // Confirm the payment; the recorded amount must be the order's, not
    // anything the callback claims.
    let response = app
        .send(post_json(
            "/payment-success",
            Some(&cookie),
            &json!({
                "razorpay_payment_id": "pay_flow_1",
                "razorpay_order_id": "order_mock_1",
                "razorpay_signature": sign("order_mock_1", "pay_flow_1"),
            }),
        ))
        .await;
    assert_eq!(response.status(), StatusCode::OK);

    let record = OrderRepository::new(&app.pool)
        .get_by_payment_id("pay_flow_1")
        .await
        .expect("lookup")
        .expect("payment recorded");
    assert_eq!(record.amount_paise, 3998);
    assert_eq!(record.razorpay_order_id, "order_mock_1");
}

#[tokio::test]
async fn replaying_a_payment_confirmation_stays_ok_and_writes_once() {
    let app = spawn_app().await;
    let product = app.seed_product("Toor Dal 1kg", "5.00").await;
    let cookie = app.register("ravi@example.com").await;

    app.send(post(&format!("/cart/add/{}", product.id), Some(&cookie)))
        .await;
    let response = app
        .send(post_json(
            "/create-order",
            Some(&cookie),
            &json!({"amount": 500}),
        ))
        .await;
    assert_eq!(response.status(), StatusCode::OK);

    let confirmation = json!({
        "razorpay_payment_id": "pay_replay",
        "razorpay_order_id": "order_mock_1",
        "razorpay_signature": sign("order_mock_1", "pay_replay"),
    });

    let first = app
        .send(post_json("/payment-success", Some(&cookie), &confirmation))
        .await;
    assert_eq!(first.status(), StatusCode::OK);

    let second = app
        .send(post_json("/payment-success", Some(&cookie), &confirmation))
        .await;
    assert_eq!(second.status(), StatusCode::OK);

    let records = sqlx::query_scalar::<_, i64>(
        "SELECT COUNT(*) FROM payment_record WHERE razorpay_payment_id = 'pay_replay'",
    )
    .fetch_one(&app.pool)
    .await
    .expect("count");
    assert_eq!(records, 1);
}

#[tokio::test]
async fn an_unrelated_confirmation_does_not_consume_the_pending_order() {
    let app = spawn_app().await;
    let product = app.seed_product("Basmati Rice 5kg", "5.00").await;
    let cookie = app.register("asha@example.com").await;

    app.send(post(&format!("/cart/add/{}", product.id), Some(&cookie)))
        .await;
    let response = app
        .send(post_json(
            "/create-order",
            Some(&cookie),
            &json!({"amount": 500}),
        ))
        .await;
    assert_eq!(response.status(), StatusCode::OK);

    // A verified confirmation for some other order: recorded with amount 0,
    // but the pending order for order_mock_1 must survive it.
    let response = app
        .send(post_json(
            "/payment-success",
            Some(&cookie),
            &json!({
                "razorpay_payment_id": "pay_stray",
                "razorpay_order_id": "order_other",
                "razorpay_signature": sign("order_other", "pay_stray"),
            }),
        ))
        .await;
    assert_eq!(response.status(), StatusCode::OK);

    let stray = OrderRepository::new(&app.pool)
        .get_by_payment_id("pay_stray")
        .await
        .expect("lookup")
        .expect("stray confirmation recorded");
    assert_eq!(stray.amount_paise, 0);

    // The real confirmation still recovers the order's amount.
    let response = app
        .send(post_json(
            "/payment-success",
            Some(&cookie),
            &json!({
                "razorpay_payment_id": "pay_real",
                "razorpay_order_id": "order_mock_1",
                "razorpay_signature": sign("order_mock_1", "pay_real"),
            }),
        ))
        .await;
    assert_eq!(response.status(), StatusCode::OK);

    let real = OrderRepository::new(&app.pool)
        .get_by_payment_id("pay_real")
        .await
        .expect("lookup")
        .expect("real confirmation recorded");
    assert_eq!(real.amount_paise, 500);
}

#[tokio::test]
async fn forged_confirmations_are_rejected_and_never_stored() {
    let app = spawn_app().await;
    let cookie = app.register("meera@example.com").await;

    let response = app
        .send(post_json(
            "/payment-success",
            Some(&cookie),
            &json!({
                "razorpay_payment_id": "pay_forged",
                "razorpay_order_id": "order_mock_1",
                "razorpay_signature": "deadbeef",
            }),
        ))
        .await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let record = OrderRepository::new(&app.pool)
        .get_by_payment_id("pay_forged")
        .await
        .expect("lookup");
    assert!(record.is_none());
}

#[tokio::test]
async fn create_order_rejects_a_stale_client_total() {
    let app = spawn_app().await;
    let product = app.seed_product("Ghee 500ml", "12.00").await;
    let cookie = app.register("vijay@example.com").await;

    app.send(post(&format!("/cart/add/{}", product.id), Some(&cookie)))
        .await;

    let response = app
        .send(post_json(
            "/create-order",
            Some(&cookie),
            &json!({"amount": 1}),
        ))
        .await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert!(app.gateway.requests().is_empty());
}

#[tokio::test]
async fn create_order_rejects_an_empty_cart() {
    let app = spawn_app().await;
    let cookie = app.register("nisha@example.com").await;

    let response = app
        .send(post_json(
            "/create-order",
            Some(&cookie),
            &json!({"amount": 100}),
        ))
        .await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert!(app.gateway.requests().is_empty());
}

// ============================================================================
// Accounts
// ============================================================================

#[tokio::test]
async fn duplicate_registration_conflicts() {
    let app = spawn_app().await;
    app.register("dupe@example.com").await;

    let response = app
        .send(post_json(
            "/auth/register",
            None,
            &json!({"email": "dupe@example.com", "password": "pass12345"}),
        ))
        .await;

    assert_eq!(response.status(), StatusCode::CONFLICT);
}

#[tokio::test]
async fn login_rejects_wrong_passwords() {
    let app = spawn_app().await;
    app.register("asha@example.com").await;

    let response = app
        .send(post_json(
            "/auth/login",
            None,
            &json!({"email": "asha@example.com", "password": "wrong-password"}),
        ))
        .await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let response = app
        .send(post_json(
            "/auth/login",
            None,
            &json!({"email": "asha@example.com", "password": "pass12345"}),
        ))
        .await;
    assert_eq!(response.status(), StatusCode::OK);
}
