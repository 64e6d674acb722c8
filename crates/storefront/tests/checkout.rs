//! Integration tests for the checkout orchestrator.
//!
//! Runs against an in-memory `SQLite` database and a mock gateway that
//! records every order-creation request, so the amounts sent to the
//! gateway can be asserted exactly.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use hmac::{Hmac, Mac};
use rust_decimal::Decimal;
use secrecy::SecretString;
use sha2::Sha256;
use sqlx::SqlitePool;
use sqlx::sqlite::SqlitePoolOptions;

use kirana_core::{Email, ProductId, UserId};
use kirana_storefront::config::RazorpayConfig;
use kirana_storefront::db::{self, OrderRepository, ProductRepository, RecordOutcome, UserRepository};
use kirana_storefront::models::CurrentUser;
use kirana_storefront::models::product::Product;
use kirana_storefront::razorpay::{GatewayError, GatewayOrder, OrderRequest, PaymentGateway};
use kirana_storefront::services::checkout::{CheckoutError, CheckoutService, PaymentCallback};

const KEY_SECRET: &str = "rzp_t3st_s3cr3t_f0r_ch3ck0ut";

/// Gateway double that records every request and returns a fixed order id.
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

/// Gateway double that always fails.
struct FailingGateway;

#[async_trait]
impl PaymentGateway for FailingGateway {
    async fn create_order(&self, _request: &OrderRequest) -> Result<GatewayOrder, GatewayError> {
        Err(GatewayError::Api("BAD_REQUEST_ERROR: test failure".to_string()))
    }
}

async fn test_pool() -> SqlitePool {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await
        .expect("in-memory pool");
    db::run_migrations(&pool).await.expect("migrations");
    pool
}

fn razorpay_config() -> RazorpayConfig {
    RazorpayConfig {
        key_id: "rzp_test_k3yId".to_string(),
        key_secret: SecretString::from(KEY_SECRET),
    }
}

fn service(pool: &SqlitePool, gateway: Arc<dyn PaymentGateway>) -> CheckoutService {
    CheckoutService::new(pool.clone(), gateway, razorpay_config())
}

async fn seed_product(pool: &SqlitePool, name: &str, price: &str) -> Product {
    ProductRepository::new(pool)
        .create(name, None, price.parse::<Decimal>().expect("decimal price"))
        .await
        .expect("seed product")
}

async fn seed_user(pool: &SqlitePool, email: &str) -> CurrentUser {
    let email = Email::parse(email).expect("valid email");
    let user = UserRepository::new(pool)
        .create(&email, "$argon2id$fake$hash")
        .await
        .expect("seed user");
    CurrentUser {
        id: user.id,
        email: user.email,
    }
}

/// Sign a (order, payment) pair the way the gateway does.
fn sign(order_id: &str, payment_id: &str, secret: &str) -> String {
    let mut mac =
        Hmac::<Sha256>::new_from_slice(secret.as_bytes()).expect("any key length works");
    mac.update(format!("{order_id}|{payment_id}").as_bytes());
    hex::encode(mac.finalize().into_bytes())
}

fn callback(order_id: &str, payment_id: &str) -> PaymentCallback {
    PaymentCallback {
        razorpay_payment_id: payment_id.to_string(),
        razorpay_order_id: order_id.to_string(),
        razorpay_signature: sign(order_id, payment_id, KEY_SECRET),
    }
}

// ============================================================================
// Order creation
// ============================================================================

#[tokio::test]
async fn buy_now_charges_the_catalog_price_in_paise() {
    let pool = test_pool().await;
    let gateway = Arc::new(RecordingGateway::default());
    let checkout = service(&pool, gateway.clone());
    let product = seed_product(&pool, "Basmati Rice 5kg", "10.00").await;

    let purchase = checkout.buy_now(product.id, 3).await.expect("buy now");

    assert_eq!(purchase.order.amount, 3000);
    assert_eq!(purchase.order.currency, "INR");
    assert_eq!(purchase.quantity, 3);
    assert_eq!(purchase.product.id, product.id);

    let requests = gateway.requests();
    assert_eq!(requests.len(), 1);
    let request = requests.first().expect("one request");
    assert_eq!(request.amount, 3000);
    assert_eq!(request.currency, "INR");
    assert!(request.receipt.starts_with("txn_"));
}

#[tokio::test]
async fn buy_now_receipts_are_unique_per_attempt() {
    let pool = test_pool().await;
    let gateway = Arc::new(RecordingGateway::default());
    let checkout = service(&pool, gateway.clone());
    let product = seed_product(&pool, "Toor Dal 1kg", "4.50").await;

    checkout.buy_now(product.id, 1).await.expect("first");
    checkout.buy_now(product.id, 1).await.expect("second");

    let requests = gateway.requests();
    assert_eq!(requests.len(), 2);
    assert_ne!(
        requests.first().map(|r| r.receipt.clone()),
        requests.get(1).map(|r| r.receipt.clone())
    );
}

#[tokio::test]
async fn buy_now_rejects_unknown_products_without_calling_the_gateway() {
    let pool = test_pool().await;
    let gateway = Arc::new(RecordingGateway::default());
    let checkout = service(&pool, gateway.clone());

    let result = checkout.buy_now(ProductId::new(999), 1).await;

    assert!(matches!(result, Err(CheckoutError::ProductNotFound(_))));
    assert!(gateway.requests().is_empty());
}

#[tokio::test]
async fn order_for_amount_rejects_non_positive_amounts() {
    let pool = test_pool().await;
    let checkout = service(&pool, Arc::new(RecordingGateway::default()));

    assert!(matches!(
        checkout.order_for_amount(0).await,
        Err(CheckoutError::AmountOutOfRange)
    ));
    assert!(matches!(
        checkout.order_for_amount(-100).await,
        Err(CheckoutError::AmountOutOfRange)
    ));
}

#[tokio::test]
async fn gateway_failure_propagates_and_persists_nothing() {
    let pool = test_pool().await;
    let checkout = service(&pool, Arc::new(FailingGateway));
    let product = seed_product(&pool, "Ghee 500ml", "12.00").await;

    let result = checkout.buy_now(product.id, 1).await;
    assert!(matches!(result, Err(CheckoutError::Gateway(_))));

    let result = checkout.order_for_amount(500).await;
    assert!(matches!(result, Err(CheckoutError::Gateway(_))));
}

// ============================================================================
// Payment recording
// ============================================================================

#[tokio::test]
async fn record_payment_persists_a_verified_confirmation() {
    let pool = test_pool().await;
    let checkout = service(&pool, Arc::new(RecordingGateway::default()));
    let user = seed_user(&pool, "asha@example.com").await;

    let outcome = checkout
        .record_payment(&callback("order_abc", "pay_123"), &user, 3000)
        .await
        .expect("record payment");

    let RecordOutcome::Recorded(record) = outcome else {
        panic!("expected a fresh record");
    };
    assert_eq!(record.razorpay_payment_id, "pay_123");
    assert_eq!(record.amount_paise, 3000);
    assert_eq!(record.user_id, user.id);

    let stored = OrderRepository::new(&pool)
        .get_by_payment_id("pay_123")
        .await
        .expect("lookup")
        .expect("row exists");
    assert_eq!(stored.razorpay_order_id, "order_abc");
    assert_eq!(stored.amount_paise, 3000);
}

#[tokio::test]
async fn replayed_confirmations_are_idempotent() {
    let pool = test_pool().await;
    let checkout = service(&pool, Arc::new(RecordingGateway::default()));
    let user = seed_user(&pool, "ravi@example.com").await;
    let confirmation = callback("order_abc", "pay_once");

    let first = checkout
        .record_payment(&confirmation, &user, 500)
        .await
        .expect("first confirmation");
    assert!(matches!(first, RecordOutcome::Recorded(_)));

    let second = checkout
        .record_payment(&confirmation, &user, 500)
        .await
        .expect("replayed confirmation");
    assert!(matches!(second, RecordOutcome::Duplicate));

    let records = OrderRepository::new(&pool)
        .list_for_user(user.id)
        .await
        .expect("list records");
    assert_eq!(records.len(), 1);
}

#[tokio::test]
async fn forged_signatures_persist_nothing() {
    let pool = test_pool().await;
    let checkout = service(&pool, Arc::new(RecordingGateway::default()));
    let user = seed_user(&pool, "meera@example.com").await;

    let forged = PaymentCallback {
        razorpay_payment_id: "pay_forged".to_string(),
        razorpay_order_id: "order_abc".to_string(),
        razorpay_signature: sign("order_abc", "pay_forged", "wrong_secret_entirely"),
    };

    let result = checkout.record_payment(&forged, &user, 3000).await;
    assert!(matches!(result, Err(CheckoutError::InvalidSignature)));

    let stored = OrderRepository::new(&pool)
        .get_by_payment_id("pay_forged")
        .await
        .expect("lookup");
    assert!(stored.is_none());
}

#[tokio::test]
async fn principal_without_an_account_is_a_server_fault() {
    let pool = test_pool().await;
    let checkout = service(&pool, Arc::new(RecordingGateway::default()));
    let ghost = CurrentUser {
        id: UserId::new(42),
        email: Email::parse("ghost@example.com").expect("valid email"),
    };

    let result = checkout
        .record_payment(&callback("order_abc", "pay_ghost"), &ghost, 100)
        .await;

    assert!(matches!(result, Err(CheckoutError::OwnerNotFound(_))));
}
