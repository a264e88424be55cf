//! Wire types for the storefront REST API.
//!
//! Prices may arrive as JSON strings or numbers; both deserialize into
//! [`Price`]. Every type is also `Serialize` so a mock backend can produce
//! the same payloads.

use larder_core::{AddressId, DeliveryMethod, PaymentMethod, Price, ProductId, UserId};
use serde::{Deserialize, Serialize};

const fn default_true() -> bool {
    true
}

const fn default_min_order() -> u32 {
    1
}

// =============================================================================
// Cart
// =============================================================================

/// `GET /api/cart/` reply.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartPayload {
    #[serde(default)]
    pub items: Vec<CartLinePayload>,
    /// Omitted by some backend versions; derived from the items when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_quantity: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_price: Option<Price>,
}

/// One line of the cart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartLinePayload {
    /// Product ID.
    pub id: ProductId,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub slug: Option<String>,
    pub quantity: u32,
    /// Unit price.
    pub price: Price,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_price: Option<Price>,
    /// False when the requested quantity cannot be supplied.
    #[serde(default = "default_true")]
    pub available: bool,
    #[serde(default)]
    pub stock: u32,
    #[serde(default = "default_min_order")]
    pub min_order_quantity: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub measure_unit: Option<String>,
}

/// Body of `POST`/`PUT /api/cart/`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartItemRequest {
    pub product_id: ProductId,
    pub quantity: u32,
}

/// Body of `DELETE /api/cart/` for a single product.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartRemoveRequest {
    pub product_id: ProductId,
}

/// Reply to any cart mutation: `{message}` on success, `{error}` otherwise.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MutationReply {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

// =============================================================================
// Delivery
// =============================================================================

/// `GET /api/orders/delivery-costs/calculate/` reply.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeliveryQuotePayload {
    pub cost: Price,
    #[serde(default)]
    pub is_free: bool,
    /// Subtotal from which delivery becomes free, if the city has one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_for_free: Option<Price>,
}

// =============================================================================
// Orders
// =============================================================================

/// A cart line as sent with the order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderLine {
    pub product_id: ProductId,
    pub quantity: u32,
}

/// `POST /api/orders/` body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderRequest {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone: String,
    pub delivery_method: DeliveryMethod,
    pub city: String,
    pub address: String,
    pub postal_code: String,
    pub payment_method: PaymentMethod,
    pub items: Vec<OrderLine>,
    pub subtotal: Price,
    pub delivery_cost: Price,
    pub total: Price,
    pub notes: String,
    pub is_gift: bool,
    pub gift_message: String,
}

/// `POST /api/orders/` reply. Only `order_number` is mandatory.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderReply {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub order_number: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total: Option<Price>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payment_method: Option<PaymentMethod>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status_display: Option<String>,
}

// =============================================================================
// Prefill
// =============================================================================

/// `GET /api/users/me/` reply.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct UserProfile {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<UserId>,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub city: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub postal_code: Option<String>,
}

/// An entry of `GET /api/addresses/`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SavedAddress {
    pub id: AddressId,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    #[serde(default)]
    pub phone: String,
    pub city: String,
    pub street: String,
    #[serde(default)]
    pub building: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub apartment: Option<String>,
    #[serde(default)]
    pub postal_code: String,
}

impl SavedAddress {
    /// Single-line street address: `street, building[, apt. N]`.
    #[must_use]
    pub fn street_line(&self) -> String {
        let mut line = self.street.clone();
        if !self.building.is_empty() {
            line.push_str(", ");
            line.push_str(&self.building);
        }
        if let Some(apartment) = self.apartment.as_deref().filter(|a| !a.is_empty()) {
            line.push_str(", apt. ");
            line.push_str(apartment);
        }
        line
    }
}
