//! Checkout phase machine.
//!
//! ```text
//! Loading -> ItemsDisplayed -> (ItemMutated -> ItemsDisplayed)*
//!         -> DeliveryComputed -> Submitting -> Confirmed | SubmitFailed
//! ```
//!
//! An empty cart moves straight to `Blocked`. `Confirmed` and `Blocked` are
//! terminal; only a session reload leaves them.

use std::fmt;

use serde::Serialize;

/// Where the checkout flow currently is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CheckoutPhase {
    /// Nothing fetched yet.
    #[default]
    Loading,
    /// The authoritative cart is shown.
    ItemsDisplayed,
    /// A cart write is in flight; the cart is re-fetched next.
    ItemMutated,
    /// Delivery cost is known for the current subtotal.
    DeliveryComputed,
    /// The order is being posted.
    Submitting,
    /// The order was accepted.
    Confirmed,
    /// The order post failed; the draft is kept for retry.
    SubmitFailed,
    /// The cart was empty; the form is disabled.
    Blocked,
}

impl CheckoutPhase {
    /// Whether the flow may move from `self` to `next`.
    #[must_use]
    pub const fn can_transition_to(self, next: Self) -> bool {
        use CheckoutPhase::{
            Blocked, Confirmed, DeliveryComputed, ItemMutated, ItemsDisplayed, Loading,
            SubmitFailed, Submitting,
        };

        matches!(
            (self, next),
            (Loading, ItemsDisplayed | Blocked | ItemMutated)
                | (
                    ItemsDisplayed,
                    ItemsDisplayed | ItemMutated | DeliveryComputed | Blocked
                )
                | (ItemMutated, ItemsDisplayed | Blocked)
                | (
                    DeliveryComputed,
                    DeliveryComputed | ItemsDisplayed | ItemMutated | Submitting
                )
                | (Submitting, Confirmed | SubmitFailed)
                | (
                    SubmitFailed,
                    Submitting | ItemsDisplayed | ItemMutated | DeliveryComputed
                )
        )
    }

    /// `Confirmed` and `Blocked` accept no further transitions.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Confirmed | Self::Blocked)
    }

    /// Whether the order form is enabled.
    #[must_use]
    pub const fn accepts_form(self) -> bool {
        matches!(
            self,
            Self::ItemsDisplayed | Self::DeliveryComputed | Self::SubmitFailed
        )
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Loading => "loading",
            Self::ItemsDisplayed => "items_displayed",
            Self::ItemMutated => "item_mutated",
            Self::DeliveryComputed => "delivery_computed",
            Self::Submitting => "submitting",
            Self::Confirmed => "confirmed",
            Self::SubmitFailed => "submit_failed",
            Self::Blocked => "blocked",
        }
    }
}

impl fmt::Display for CheckoutPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
