//! Integration tests for Larder checkout.
//!
//! The tests drive a real [`CheckoutSession`] over HTTP against
//! [`MockBackend`], an in-process `axum` server that speaks the storefront
//! REST API: cart, delivery pricing, orders and the signed-in customer's
//! profile and addresses.
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p larder-integration-tests
//! ```
//!
//! # Behaviour
//!
//! - Mutations must carry `X-CSRFToken` matching the `csrftoken` cookie set
//!   on `GET /api/cart/`; otherwise `403 {"detail": ...}`.
//! - Quantities outside `[min_order_quantity, stock]` are rejected with
//!   `400 {"error": ...}` and counted in [`BackendState::rejected_quantities`].
//! - Placing an order does not empty the server cart; the client does that.

use std::net::SocketAddr;
use std::str::FromStr;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use axum::body::Bytes;
use axum::extract::{Query, State};
use axum::http::{HeaderMap, StatusCode, header};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use larder_checkout::api::{
    CartItemRequest, CartLinePayload, CartPayload, CartRemoveRequest, DeliveryQuotePayload,
    MutationReply, OrderReply, OrderRequest, SavedAddress, UserProfile,
};
use larder_checkout::{ApiConfig, CheckoutSession, HttpStoreApi, LocalStore, SessionSettings};
use larder_core::{DeliveryMethod, Price, ProductId};
use rust_decimal::Decimal;
use serde::Deserialize;
use serde_json::json;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use uuid::Uuid;

/// City the backend refuses to deliver to.
pub const UNSERVED_CITY: &str = "Nowhere";

/// A product in the mock catalog.
#[derive(Debug, Clone)]
pub struct Product {
    pub id: ProductId,
    pub name: String,
    pub price: Price,
    pub stock: u32,
    pub min_order_quantity: u32,
}

impl Product {
    #[must_use]
    pub fn new(id: i64, name: &str, price: i64, stock: u32) -> Self {
        Self {
            id: ProductId::new(id),
            name: name.to_string(),
            price: Price::from_units(price),
            stock,
            min_order_quantity: 1,
        }
    }

    #[must_use]
    pub const fn min_order(mut self, quantity: u32) -> Self {
        self.min_order_quantity = quantity;
        self
    }
}

/// Everything the mock backend knows and has seen.
#[derive(Debug)]
pub struct BackendState {
    pub products: Vec<Product>,
    /// Cart lines in insertion order.
    pub cart: Vec<(ProductId, u32)>,
    pub delivery_cost: Price,
    pub free_from: Option<Price>,
    pub fail_delivery: bool,
    pub fail_orders: bool,
    pub fail_clear: bool,
    pub user: Option<UserProfile>,
    pub addresses: Vec<SavedAddress>,
    pub orders: Vec<OrderRequest>,
    /// `"<METHOD> <path>"` of every request, in order.
    pub requests: Vec<String>,
    /// Cart writes refused for an out-of-range quantity.
    pub rejected_quantities: usize,
    /// Mutations refused for a missing or wrong CSRF token.
    pub rejected_csrf: usize,
    pub csrf_token: String,
}

impl Default for BackendState {
    fn default() -> Self {
        Self {
            products: Vec::new(),
            cart: Vec::new(),
            delivery_cost: Price::from_units(250),
            free_from: None,
            fail_delivery: false,
            fail_orders: false,
            fail_clear: false,
            user: None,
            addresses: Vec::new(),
            orders: Vec::new(),
            requests: Vec::new(),
            rejected_quantities: 0,
            rejected_csrf: 0,
            csrf_token: Uuid::new_v4().simple().to_string(),
        }
    }
}

impl BackendState {
    fn product(&self, id: ProductId) -> Option<&Product> {
        self.products.iter().find(|p| p.id == id)
    }

    fn cart_payload(&self) -> CartPayload {
        let items: Vec<CartLinePayload> = self
            .cart
            .iter()
            .filter_map(|&(id, quantity)| {
                let product = self.product(id)?;
                Some(CartLinePayload {
                    id,
                    name: product.name.clone(),
                    slug: Some(product.name.to_lowercase().replace(' ', "-")),
                    quantity,
                    price: product.price,
                    total_price: Some(product.price * quantity),
                    available: quantity <= product.stock,
                    stock: product.stock,
                    min_order_quantity: product.min_order_quantity,
                    measure_unit: Some("pcs".to_string()),
                })
            })
            .collect();

        CartPayload {
            total_quantity: Some(items.iter().map(|line| line.quantity).sum()),
            total_price: Some(
                items
                    .iter()
                    .map(|line| line.total_price.unwrap_or(Price::ZERO))
                    .sum(),
            ),
            items,
        }
    }

    /// Number of recorded requests starting with `prefix`.
    #[must_use]
    pub fn count(&self, prefix: &str) -> usize {
        self.requests.iter().filter(|r| r.starts_with(prefix)).count()
    }
}

type Shared = Arc<Mutex<BackendState>>;

// =============================================================================
// MockBackend
// =============================================================================

/// A storefront backend on an ephemeral local port.
///
/// The server task is aborted on drop.
pub struct MockBackend {
    addr: SocketAddr,
    state: Shared,
    server: JoinHandle<()>,
}

impl MockBackend {
    /// Start a backend selling `products` with an empty cart.
    ///
    /// # Panics
    ///
    /// Panics if no local port can be bound.
    pub async fn start(products: Vec<Product>) -> Self {
        let state: Shared = Arc::new(Mutex::new(BackendState {
            products,
            ..BackendState::default()
        }));

        let app = Router::new()
            .route(
                "/api/cart/",
                get(get_cart).post(add_item).put(update_item).delete(delete_items),
            )
            .route(
                "/api/orders/delivery-costs/calculate/",
                get(calculate_delivery),
            )
            .route("/api/orders/", post(create_order))
            .route("/api/users/me/", get(current_user))
            .route("/api/addresses/", get(addresses))
            .with_state(Arc::clone(&state));

        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind mock backend");
        let addr = listener
            .local_addr()
            .expect("Failed to read mock backend address");
        let server = tokio::spawn(async move {
            if let Err(e) = axum::serve(listener, app).await {
                tracing::error!(error = %e, "Mock backend stopped");
            }
        });

        Self {
            addr,
            state,
            server,
        }
    }

    /// Lock the backend state for inspection or setup.
    pub fn state(&self) -> MutexGuard<'_, BackendState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Put `quantity` of `id` into the server cart, bypassing validation.
    pub fn put_in_cart(&self, id: i64, quantity: u32) {
        let id = ProductId::new(id);
        let mut state = self.state();
        match state.cart.iter_mut().find(|(line, _)| *line == id) {
            Some(line) => line.1 = quantity,
            None => state.cart.push((id, quantity)),
        }
    }

    #[must_use]
    pub fn base_url(&self) -> String {
        format!("http://{}/", self.addr)
    }

    /// Client settings for this backend.
    ///
    /// # Panics
    ///
    /// Panics if the base URL is rejected, which would be a bug here.
    #[must_use]
    pub fn api_config(&self) -> ApiConfig {
        let mut config = ApiConfig::new(&self.base_url()).expect("Mock backend URL is valid");
        config.csrf_token = Some(self.state().csrf_token.clone().into());
        config.request_timeout = Some(Duration::from_secs(5));
        config
    }

    /// A session talking to this backend and persisting into `store`.
    ///
    /// # Panics
    ///
    /// Panics if the HTTP client cannot be built.
    pub fn session<S: LocalStore>(
        &self,
        store: S,
        settings: SessionSettings,
    ) -> CheckoutSession<HttpStoreApi, S> {
        let api = HttpStoreApi::new(&self.api_config()).expect("Failed to build HTTP client");
        CheckoutSession::new(api, store, settings)
    }
}

impl Drop for MockBackend {
    fn drop(&mut self) {
        self.server.abort();
    }
}

// =============================================================================
// Handlers
// =============================================================================

fn lock(state: &Shared) -> MutexGuard<'_, BackendState> {
    state.lock().unwrap_or_else(PoisonError::into_inner)
}

fn business(status: StatusCode, message: &str) -> Response {
    (status, Json(json!({ "error": message }))).into_response()
}

fn mutation_ok(message: &str) -> Response {
    Json(MutationReply {
        message: Some(message.to_string()),
        error: None,
    })
    .into_response()
}

/// Reject mutations whose `X-CSRFToken` does not match.
fn check_csrf(state: &mut BackendState, headers: &HeaderMap) -> Result<(), Response> {
    let sent = headers
        .get("x-csrftoken")
        .and_then(|value| value.to_str().ok());
    if sent == Some(state.csrf_token.as_str()) {
        return Ok(());
    }
    state.rejected_csrf += 1;
    Err((
        StatusCode::FORBIDDEN,
        Json(json!({ "detail": "CSRF Failed: CSRF token missing or incorrect." })),
    )
        .into_response())
}

/// Check a resulting cart quantity against the product's limits.
fn check_quantity(state: &mut BackendState, id: ProductId, quantity: u32) -> Result<(), Response> {
    let Some(product) = state.product(id) else {
        return Err(business(StatusCode::NOT_FOUND, "Product not found"));
    };
    let (min, stock) = (product.min_order_quantity, product.stock);

    if quantity < min {
        state.rejected_quantities += 1;
        return Err(business(
            StatusCode::BAD_REQUEST,
            &format!("Minimum order quantity is {min}"),
        ));
    }
    if quantity > stock {
        state.rejected_quantities += 1;
        return Err(business(
            StatusCode::BAD_REQUEST,
            &format!("Only {stock} left in stock"),
        ));
    }
    Ok(())
}

async fn get_cart(State(state): State<Shared>) -> Response {
    let mut state = lock(&state);
    state.requests.push("GET /api/cart/".to_string());

    let cookie = format!("csrftoken={}; Path=/", state.csrf_token);
    ([(header::SET_COOKIE, cookie)], Json(state.cart_payload())).into_response()
}

async fn add_item(
    State(state): State<Shared>,
    headers: HeaderMap,
    Json(body): Json<CartItemRequest>,
) -> Response {
    let mut state = lock(&state);
    state.requests.push(format!(
        "POST /api/cart/ {} {}",
        body.product_id, body.quantity
    ));
    if let Err(rejection) = check_csrf(&mut state, &headers) {
        return rejection;
    }

    let current = state
        .cart
        .iter()
        .find(|(id, _)| *id == body.product_id)
        .map_or(0, |line| line.1);
    let quantity = current + body.quantity;
    if let Err(rejection) = check_quantity(&mut state, body.product_id, quantity) {
        return rejection;
    }

    match state.cart.iter_mut().find(|(id, _)| *id == body.product_id) {
        Some(line) => line.1 = quantity,
        None => state.cart.push((body.product_id, quantity)),
    }
    mutation_ok("Product added to cart")
}

async fn update_item(
    State(state): State<Shared>,
    headers: HeaderMap,
    Json(body): Json<CartItemRequest>,
) -> Response {
    let mut state = lock(&state);
    state.requests.push(format!(
        "PUT /api/cart/ {} {}",
        body.product_id, body.quantity
    ));
    if let Err(rejection) = check_csrf(&mut state, &headers) {
        return rejection;
    }
    if let Err(rejection) = check_quantity(&mut state, body.product_id, body.quantity) {
        return rejection;
    }

    match state.cart.iter_mut().find(|(id, _)| *id == body.product_id) {
        Some(line) => {
            line.1 = body.quantity;
            mutation_ok("Cart updated")
        }
        None => business(StatusCode::NOT_FOUND, "Product is not in the cart"),
    }
}

async fn delete_items(State(state): State<Shared>, headers: HeaderMap, body: Bytes) -> Response {
    let mut state = lock(&state);

    if body.is_empty() {
        state.requests.push("DELETE /api/cart/".to_string());
        if let Err(rejection) = check_csrf(&mut state, &headers) {
            return rejection;
        }
        if state.fail_clear {
            return (StatusCode::INTERNAL_SERVER_ERROR, "Internal Server Error").into_response();
        }
        state.cart.clear();
        return mutation_ok("Cart cleared");
    }

    let Ok(request) = serde_json::from_slice::<CartRemoveRequest>(&body) else {
        return business(StatusCode::BAD_REQUEST, "Invalid request body");
    };
    state
        .requests
        .push(format!("DELETE /api/cart/ {}", request.product_id));
    if let Err(rejection) = check_csrf(&mut state, &headers) {
        return rejection;
    }
    state.cart.retain(|(id, _)| *id != request.product_id);
    mutation_ok("Product removed from cart")
}

#[derive(Debug, Deserialize)]
struct DeliveryQuery {
    #[serde(default)]
    city: String,
    method: String,
    total: String,
}

async fn calculate_delivery(
    State(state): State<Shared>,
    Query(query): Query<DeliveryQuery>,
) -> Response {
    let mut state = lock(&state);
    state.requests.push(format!(
        "GET /api/orders/delivery-costs/calculate/ {} {} {}",
        query.city, query.method, query.total
    ));

    if state.fail_delivery {
        return (StatusCode::SERVICE_UNAVAILABLE, "Service Unavailable").into_response();
    }
    if query.city.eq_ignore_ascii_case(UNSERVED_CITY) {
        return business(StatusCode::BAD_REQUEST, "No delivery to this city");
    }
    let (Ok(method), Ok(total)) = (
        DeliveryMethod::from_str(&query.method),
        Decimal::from_str(&query.total),
    ) else {
        return business(StatusCode::BAD_REQUEST, "Invalid delivery parameters");
    };

    let payload = if method == DeliveryMethod::Pickup {
        DeliveryQuotePayload {
            cost: Price::ZERO,
            is_free: true,
            min_for_free: None,
        }
    } else {
        DeliveryQuotePayload {
            cost: state.delivery_cost,
            is_free: state
                .free_from
                .is_some_and(|min| Price::new(total) >= min),
            min_for_free: state.free_from,
        }
    };
    Json(payload).into_response()
}

async fn create_order(
    State(state): State<Shared>,
    headers: HeaderMap,
    Json(order): Json<OrderRequest>,
) -> Response {
    let mut state = lock(&state);
    state.requests.push("POST /api/orders/".to_string());
    if let Err(rejection) = check_csrf(&mut state, &headers) {
        return rejection;
    }
    if state.fail_orders {
        return (StatusCode::INTERNAL_SERVER_ERROR, "Internal Server Error").into_response();
    }

    let cart = state.cart_payload();
    if cart.items.is_empty() {
        return business(StatusCode::BAD_REQUEST, "Cart is empty");
    }
    if cart.total_price != Some(order.subtotal) || order.total != order.subtotal + order.delivery_cost
    {
        return business(StatusCode::BAD_REQUEST, "Order total does not match the cart");
    }

    state.orders.push(order.clone());
    Json(OrderReply {
        order_number: Some(format!("LD-{:05}", state.orders.len())),
        total: Some(order.total),
        payment_method: Some(order.payment_method),
        status_display: Some("New".to_string()),
    })
    .into_response()
}

async fn current_user(State(state): State<Shared>) -> Response {
    let mut state = lock(&state);
    state.requests.push("GET /api/users/me/".to_string());
    match state.user.clone() {
        Some(user) => Json(user).into_response(),
        None => (
            StatusCode::UNAUTHORIZED,
            Json(json!({ "detail": "Authentication credentials were not provided." })),
        )
            .into_response(),
    }
}

async fn addresses(State(state): State<Shared>) -> Response {
    let mut state = lock(&state);
    state.requests.push("GET /api/addresses/".to_string());
    Json(state.addresses.clone()).into_response()
}
