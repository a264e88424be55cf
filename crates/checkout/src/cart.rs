//! Cart snapshot: the locally cached copy of the authoritative cart.

use chrono::{DateTime, Utc};
use larder_core::{Price, ProductId};
use serde::{Deserialize, Serialize};

use crate::api::{CartLinePayload, CartPayload, OrderLine};
use crate::validation::{DraftField, FieldError, FieldProblem, ValidationErrors};

/// One product in the cart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartItem {
    pub product_id: ProductId,
    pub name: String,
    pub slug: Option<String>,
    pub quantity: u32,
    pub unit_price: Price,
    pub line_total: Price,
    /// False when the backend cannot supply `quantity`.
    pub available: bool,
    pub stock: u32,
    pub min_order_qty: u32,
    pub measure_unit: Option<String>,
}

impl CartItem {
    /// Check a requested quantity against `[min_order_qty, stock]`.
    ///
    /// # Errors
    ///
    /// Returns the violated bound.
    pub fn check_quantity(&self, quantity: u32) -> Result<(), ValidationErrors> {
        let field = DraftField::Quantity(self.product_id);
        let min = self.min_order_qty.max(1);
        if quantity < min {
            return Err(ValidationErrors::single(FieldError::new(
                field,
                FieldProblem::BelowMinimum { min },
            )));
        }
        if quantity > self.stock {
            return Err(ValidationErrors::single(FieldError::new(
                field,
                FieldProblem::AboveStock { stock: self.stock },
            )));
        }
        Ok(())
    }
}

impl From<CartLinePayload> for CartItem {
    fn from(line: CartLinePayload) -> Self {
        let line_total = line.total_price.unwrap_or(line.price * line.quantity);
        Self {
            product_id: line.id,
            name: line.name,
            slug: line.slug,
            quantity: line.quantity,
            unit_price: line.price,
            line_total,
            available: line.available,
            stock: line.stock,
            min_order_qty: line.min_order_quantity,
            measure_unit: line.measure_unit,
        }
    }
}

/// The cart as last fetched from the backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartSnapshot {
    pub items: Vec<CartItem>,
    pub total_quantity: u32,
    pub total_price: Price,
    pub fetched_at: DateTime<Utc>,
}

impl CartSnapshot {
    /// Build a snapshot from a cart reply, deriving missing totals from the
    /// lines.
    #[must_use]
    pub fn from_payload(payload: CartPayload) -> Self {
        let items: Vec<CartItem> = payload.items.into_iter().map(CartItem::from).collect();
        let total_quantity = payload
            .total_quantity
            .unwrap_or_else(|| items.iter().map(|item| item.quantity).sum());
        let total_price = payload
            .total_price
            .unwrap_or_else(|| items.iter().map(|item| item.line_total).sum());

        Self {
            items,
            total_quantity,
            total_price,
            fetched_at: Utc::now(),
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    #[must_use]
    pub fn item(&self, product_id: ProductId) -> Option<&CartItem> {
        self.items.iter().find(|item| item.product_id == product_id)
    }

    /// Products that cannot be supplied in the requested quantity.
    #[must_use]
    pub fn unavailable_items(&self) -> Vec<ProductId> {
        self.items
            .iter()
            .filter(|item| !item.available)
            .map(|item| item.product_id)
            .collect()
    }

    /// Lines as sent with an order.
    #[must_use]
    pub fn order_lines(&self) -> Vec<OrderLine> {
        self.items
            .iter()
            .map(|item| OrderLine {
                product_id: item.product_id,
                quantity: item.quantity,
            })
            .collect()
    }

    /// Whether two snapshots describe the same cart, ignoring fetch time.
    #[must_use]
    pub fn same_contents(&self, other: &Self) -> bool {
        self.total_price == other.total_price
            && self.items.len() == other.items.len()
            && self.items.iter().zip(&other.items).all(|(a, b)| {
                a.product_id == b.product_id
                    && a.quantity == b.quantity
                    && a.unit_price == b.unit_price
                    && a.available == b.available
            })
    }
}
