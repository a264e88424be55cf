//! `reqwest` implementation of [`StoreApi`].

use std::sync::Arc;

use larder_core::{DeliveryMethod, Price, ProductId};
use reqwest::cookie::{CookieStore, Jar};
use reqwest::{Method, RequestBuilder};
use secrecy::{ExposeSecret, SecretString};
use serde::de::DeserializeOwned;
use tracing::{debug, instrument};
use url::Url;
use uuid::Uuid;

use super::types::{
    CartItemRequest, CartPayload, CartRemoveRequest, DeliveryQuotePayload, MutationReply,
    OrderReply, OrderRequest, SavedAddress, UserProfile,
};
use super::{ApiError, StoreApi};
use crate::config::ApiConfig;

const CSRF_COOKIE: &str = "csrftoken";
const CSRF_HEADER: &str = "X-CSRFToken";
const REQUEST_ID_HEADER: &str = "X-Request-Id";

/// Characters of a response body kept in logs and error messages.
const BODY_PREVIEW: usize = 500;

// =============================================================================
// HttpStoreApi
// =============================================================================

/// HTTP client for the storefront REST API.
///
/// Cookies (session and CSRF) persist in an in-memory jar for the lifetime
/// of the client, the way a browser tab keeps them.
#[derive(Clone)]
pub struct HttpStoreApi {
    inner: Arc<HttpStoreApiInner>,
}

struct HttpStoreApiInner {
    client: reqwest::Client,
    jar: Arc<Jar>,
    base_url: Url,
    csrf_token: Option<SecretString>,
}

impl std::fmt::Debug for HttpStoreApi {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpStoreApi")
            .field("base_url", &self.inner.base_url.as_str())
            .finish_non_exhaustive()
    }
}

impl HttpStoreApi {
    /// Create a new client.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying HTTP client cannot be built.
    pub fn new(config: &ApiConfig) -> Result<Self, ApiError> {
        let jar = Arc::new(Jar::default());

        let mut builder = reqwest::Client::builder()
            .cookie_provider(Arc::clone(&jar))
            .user_agent(concat!("larder/", env!("CARGO_PKG_VERSION")));
        if let Some(timeout) = config.request_timeout {
            builder = builder.timeout(timeout);
        }

        Ok(Self {
            inner: Arc::new(HttpStoreApiInner {
                client: builder.build()?,
                jar,
                base_url: config.base_url.clone(),
                csrf_token: config.csrf_token.clone(),
            }),
        })
    }

    /// Backend base URL.
    #[must_use]
    pub fn base_url(&self) -> &Url {
        &self.inner.base_url
    }

    /// CSRF token: the `csrftoken` cookie if the backend set one, otherwise
    /// the configured token.
    fn csrf_token(&self) -> Option<String> {
        self.inner
            .jar
            .cookies(&self.inner.base_url)
            .and_then(|header| header.to_str().ok().and_then(find_csrf_cookie))
            .or_else(|| {
                self.inner
                    .csrf_token
                    .as_ref()
                    .map(|token| token.expose_secret().to_string())
            })
    }

    fn endpoint(&self, path: &str) -> Result<Url, ApiError> {
        Ok(self.inner.base_url.join(path)?)
    }

    fn request(&self, method: Method, url: Url) -> RequestBuilder {
        let request_id = Uuid::new_v4();
        debug!(%method, %url, %request_id, "Sending request");

        let mutating = method != Method::GET;
        let mut builder = self
            .inner
            .client
            .request(method, url)
            .header(REQUEST_ID_HEADER, request_id.to_string())
            .header(reqwest::header::ACCEPT, "application/json");

        if mutating && let Some(token) = self.csrf_token() {
            builder = builder.header(CSRF_HEADER, token);
        }
        builder
    }

    /// Send a request and return the body of a successful, error-free reply.
    async fn send(&self, request: RequestBuilder) -> Result<String, ApiError> {
        let response = request.send().await?;
        let status = response.status();

        // Get response body as text first for better error diagnostics
        let body = response.text().await?;

        if let Some(message) = business_message(&body, status.is_success()) {
            debug!(status = %status, message = %message, "Backend rejected request");
            return Err(ApiError::Business(message));
        }

        if !status.is_success() {
            tracing::error!(
                status = %status,
                body = %preview(&body),
                "Backend returned non-success status"
            );
            return Err(ApiError::Status {
                status: status.as_u16(),
                body: preview(&body),
            });
        }

        Ok(body)
    }

    async fn send_mutation(&self, request: RequestBuilder) -> Result<(), ApiError> {
        let body = self.send(request).await?;
        if !body.trim().is_empty() {
            let reply: MutationReply = parse(&body)?;
            if let Some(message) = reply.message {
                debug!(message = %message, "Cart updated");
            }
        }
        Ok(())
    }
}

impl StoreApi for HttpStoreApi {
    #[instrument(skip(self))]
    async fn fetch_cart(&self) -> Result<CartPayload, ApiError> {
        let url = self.endpoint("api/cart/")?;
        let body = self.send(self.request(Method::GET, url)).await?;
        parse(&body)
    }

    #[instrument(skip(self), fields(product_id = %product_id))]
    async fn add_item(&self, product_id: ProductId, quantity: u32) -> Result<(), ApiError> {
        let url = self.endpoint("api/cart/")?;
        let request = self.request(Method::POST, url).json(&CartItemRequest {
            product_id,
            quantity,
        });
        self.send_mutation(request).await
    }

    #[instrument(skip(self), fields(product_id = %product_id))]
    async fn update_item(&self, product_id: ProductId, quantity: u32) -> Result<(), ApiError> {
        let url = self.endpoint("api/cart/")?;
        let request = self.request(Method::PUT, url).json(&CartItemRequest {
            product_id,
            quantity,
        });
        self.send_mutation(request).await
    }

    #[instrument(skip(self), fields(product_id = %product_id))]
    async fn remove_item(&self, product_id: ProductId) -> Result<(), ApiError> {
        let url = self.endpoint("api/cart/")?;
        let request = self
            .request(Method::DELETE, url)
            .json(&CartRemoveRequest { product_id });
        self.send_mutation(request).await
    }

    #[instrument(skip(self))]
    async fn clear_cart(&self) -> Result<(), ApiError> {
        let url = self.endpoint("api/cart/")?;
        self.send_mutation(self.request(Method::DELETE, url)).await
    }

    #[instrument(skip(self), fields(city = %city, method = %method))]
    async fn quote_delivery(
        &self,
        city: &str,
        method: DeliveryMethod,
        subtotal: Price,
    ) -> Result<DeliveryQuotePayload, ApiError> {
        let mut url = self.endpoint("api/orders/delivery-costs/calculate/")?;
        url.query_pairs_mut()
            .append_pair("city", city)
            .append_pair("method", method.as_str())
            .append_pair("total", &subtotal.amount().normalize().to_string());

        let body = self.send(self.request(Method::GET, url)).await?;
        parse(&body)
    }

    #[instrument(skip(self, order), fields(total = %order.total))]
    async fn submit_order(&self, order: &OrderRequest) -> Result<OrderReply, ApiError> {
        let url = self.endpoint("api/orders/")?;
        let body = self.send(self.request(Method::POST, url).json(order)).await?;
        parse(&body)
    }

    #[instrument(skip(self))]
    async fn current_user(&self) -> Result<UserProfile, ApiError> {
        let url = self.endpoint("api/users/me/")?;
        let body = self.send(self.request(Method::GET, url)).await?;
        parse(&body)
    }

    #[instrument(skip(self))]
    async fn saved_addresses(&self) -> Result<Vec<SavedAddress>, ApiError> {
        let url = self.endpoint("api/addresses/")?;
        let body = self.send(self.request(Method::GET, url)).await?;
        parse(&body)
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

fn parse<T: DeserializeOwned>(body: &str) -> Result<T, ApiError> {
    serde_json::from_str(body).map_err(|e| {
        tracing::error!(
            error = %e,
            body = %preview(body),
            "Failed to parse backend response"
        );
        ApiError::Parse(e)
    })
}

fn preview(body: &str) -> String {
    body.chars().take(BODY_PREVIEW).collect()
}

fn find_csrf_cookie(cookies: &str) -> Option<String> {
    cookies
        .split(';')
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, _)| *name == CSRF_COOKIE)
        .map(|(_, value)| value.to_string())
}

/// Extract a user-facing message from a structured error reply.
///
/// Successful replies only count as errors when they carry an `error` key.
/// Failed replies are also checked for a `detail` message and for a map of
/// field names to message lists.
fn business_message(body: &str, success: bool) -> Option<String> {
    let value: serde_json::Value = serde_json::from_str(body).ok()?;
    let object = value.as_object()?;

    if let Some(error) = object.get("error").and_then(serde_json::Value::as_str) {
        return Some(error.to_string());
    }
    if success {
        return None;
    }
    if let Some(detail) = object.get("detail").and_then(serde_json::Value::as_str) {
        return Some(detail.to_string());
    }

    let fields = object
        .iter()
        .filter_map(|(field, messages)| {
            let messages = messages
                .as_array()?
                .iter()
                .filter_map(serde_json::Value::as_str)
                .collect::<Vec<_>>();
            (!messages.is_empty()).then(|| format!("{field}: {}", messages.join(" ")))
        })
        .collect::<Vec<_>>();

    (!fields.is_empty()).then(|| fields.join("; "))
}
