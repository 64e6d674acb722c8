//! HTTP route handlers for the storefront.
//!
//! # Route Structure
//!
//! ```text
//! GET  /health                 - Liveness check
//! GET  /health/ready           - Readiness check (pings the database)
//!
//! # Products
//! GET  /products               - Product listing
//! GET  /products/{id}          - Product detail
//!
//! # Cart (redirect-based)
//! GET  /cart                   - Cart page (redirects home when empty)
//! POST /cart/add/{id}          - Add to cart (?quantity=N, default 1)
//! POST /cart/remove/{id}       - Remove an item
//! POST /cart/update/{id}       - Set an item's quantity (form body)
//! POST /cart/clear             - Drop the whole cart
//!
//! # Checkout (requires auth)
//! POST /buy-now/{id}           - Gateway order for a single product
//! POST /create-order           - Gateway order for the session cart
//! POST /payment-success        - Payment confirmation callback
//!
//! # Auth
//! GET  /auth/login             - Login page
//! POST /auth/login             - Login action
//! POST /auth/register          - Register action
//! POST /auth/logout            - Logout action
//! ```

pub mod auth;
pub mod cart;
pub mod checkout;
pub mod products;

use axum::{
    Router,
    routing::{get, post},
};

use crate::state::AppState;

/// Create the auth routes router.
pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/login", get(auth::login_page).post(auth::login))
        .route("/register", post(auth::register))
        .route("/logout", post(auth::logout))
}

/// Create the cart routes router.
pub fn cart_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(cart::show))
        .route("/add/{product_id}", post(cart::add))
        .route("/remove/{product_id}", post(cart::remove))
        .route("/update/{product_id}", post(cart::update))
        .route("/clear", post(cart::clear))
}

/// Create the product routes router.
pub fn product_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(products::index))
        .route("/{product_id}", get(products::show))
}

/// Create the checkout routes router.
pub fn checkout_routes() -> Router<AppState> {
    Router::new()
        .route("/buy-now/{product_id}", post(checkout::buy_now))
        .route("/create-order", post(checkout::create_order))
        .route("/payment-success", post(checkout::payment_success))
}

/// Create the complete application router.
pub fn routes() -> Router<AppState> {
    Router::new()
        .nest("/cart", cart_routes())
        .nest("/products", product_routes())
        .nest("/auth", auth_routes())
        .merge(checkout_routes())
}
