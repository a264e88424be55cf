//! REST client for the storefront backend.
//!
//! # Endpoints
//!
//! - `GET/POST/PUT/DELETE /api/cart/` - read, add, update quantity, remove/clear
//! - `GET /api/orders/delivery-costs/calculate/?city&method&total` - delivery pricing
//! - `POST /api/orders/` - place an order
//! - `GET /api/users/me/`, `GET /api/addresses/` - form prefill (authenticated)
//!
//! Mutations carry the CSRF token in `X-CSRFToken`. A structured `{error}`
//! reply becomes [`ApiError::Business`], regardless of the HTTP status.

mod client;
#[cfg(test)]
pub(crate) mod fake;
pub mod types;

use std::future::Future;

use larder_core::{DeliveryMethod, Price, ProductId};
use thiserror::Error;

pub use client::HttpStoreApi;
pub use types::*;

/// Errors that can occur when talking to the backend.
#[derive(Debug, Error)]
pub enum ApiError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Non-success status without a structured error body.
    #[error("HTTP {status}: {body}")]
    Status { status: u16, body: String },

    /// JSON parsing failed.
    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),

    /// The backend rejected the request (e.g. insufficient stock).
    #[error("{0}")]
    Business(String),

    /// A successful reply was missing something it must contain.
    #[error("Protocol error: {0}")]
    Protocol(String),

    /// The endpoint URL could not be built.
    #[error("Invalid URL: {0}")]
    Url(#[from] url::ParseError),
}

/// Operations the reconciler needs from the backend.
///
/// [`HttpStoreApi`] is the production implementation; tests substitute an
/// in-memory fake.
pub trait StoreApi: Send + Sync + 'static {
    /// `GET /api/cart/`.
    fn fetch_cart(&self) -> impl Future<Output = Result<CartPayload, ApiError>> + Send;

    /// `POST /api/cart/` with `{product_id, quantity}`.
    fn add_item(
        &self,
        product_id: ProductId,
        quantity: u32,
    ) -> impl Future<Output = Result<(), ApiError>> + Send;

    /// `PUT /api/cart/` with `{product_id, quantity}`.
    fn update_item(
        &self,
        product_id: ProductId,
        quantity: u32,
    ) -> impl Future<Output = Result<(), ApiError>> + Send;

    /// `DELETE /api/cart/` with `{product_id}`.
    fn remove_item(&self, product_id: ProductId)
    -> impl Future<Output = Result<(), ApiError>> + Send;

    /// `DELETE /api/cart/` without a body.
    fn clear_cart(&self) -> impl Future<Output = Result<(), ApiError>> + Send;

    /// `GET /api/orders/delivery-costs/calculate/`.
    fn quote_delivery(
        &self,
        city: &str,
        method: DeliveryMethod,
        subtotal: Price,
    ) -> impl Future<Output = Result<DeliveryQuotePayload, ApiError>> + Send;

    /// `POST /api/orders/`.
    fn submit_order(
        &self,
        order: &OrderRequest,
    ) -> impl Future<Output = Result<OrderReply, ApiError>> + Send;

    /// `GET /api/users/me/`.
    fn current_user(&self) -> impl Future<Output = Result<UserProfile, ApiError>> + Send;

    /// `GET /api/addresses/`.
    fn saved_addresses(&self) -> impl Future<Output = Result<Vec<SavedAddress>, ApiError>> + Send;
}
