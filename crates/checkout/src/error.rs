//! Unified error handling for the checkout reconciler.
//!
//! Three kinds of failure reach the user:
//! - network failures (transport errors, non-success statuses) and business
//!   errors (structured `{error}` replies) are surfaced as non-blocking
//!   notices and leave the flow retryable;
//! - validation failures block submission and point at the offending field.
//!
//! Everything else here is a guard raised by the reconciler itself.

use std::fmt;

use larder_core::ProductId;
use thiserror::Error;

use crate::api::ApiError;
use crate::flow::CheckoutPhase;
use crate::storage::StorageError;
use crate::validation::ValidationErrors;

/// A logical operation whose responses are sequenced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    /// `GET /api/cart/`.
    FetchCart,
    /// Delivery cost calculation.
    DeliveryQuote,
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::FetchCart => f.write_str("cart fetch"),
            Self::DeliveryQuote => f.write_str("delivery quote"),
        }
    }
}

/// Error type for every reconciler operation.
#[derive(Debug, Error)]
pub enum CheckoutError {
    /// Transport failure or non-success status from the backend.
    #[error("Network error: {0}")]
    Network(ApiError),

    /// The backend rejected the request with a structured message.
    #[error("{0}")]
    Business(String),

    /// Client-side field checks failed; nothing was sent.
    #[error("Validation failed: {0}")]
    Validation(ValidationErrors),

    /// The local store could not be read or written.
    #[error("Local storage error: {0}")]
    Storage(#[from] StorageError),

    /// The operation is not allowed in the current checkout phase.
    #[error("Cannot move checkout from {from} to {to}")]
    InvalidTransition {
        /// Current phase.
        from: CheckoutPhase,
        /// Requested phase.
        to: CheckoutPhase,
    },

    /// The cart was empty when displayed; the form is disabled.
    #[error("Checkout is blocked: the cart is empty")]
    Blocked,

    /// A newer request for the same operation was issued; this response was dropped.
    #[error("Superseded by a newer {0}")]
    Superseded(Operation),

    /// The authoritative cart no longer matches the draft being submitted.
    #[error("The cart changed since the order was drafted")]
    StaleDraft,

    /// The product is not in the current cart snapshot.
    #[error("Product {0} is not in the cart")]
    UnknownItem(ProductId),

    /// A draft was requested before any delivery cost was computed.
    #[error("Delivery cost has not been calculated")]
    DeliveryNotComputed,
}

impl From<ApiError> for CheckoutError {
    fn from(err: ApiError) -> Self {
        match err {
            ApiError::Business(message) => Self::Business(message),
            other => Self::Network(other),
        }
    }
}

impl From<ValidationErrors> for CheckoutError {
    fn from(errors: ValidationErrors) -> Self {
        Self::Validation(errors)
    }
}

impl CheckoutError {
    /// Message suitable for showing to the customer.
    ///
    /// Network details stay in the logs.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::Network(_) => "Could not reach the store, please try again".to_string(),
            Self::Business(message) => message.clone(),
            Self::Validation(errors) => errors.to_string(),
            Self::Storage(_) => "Could not save checkout progress locally".to_string(),
            Self::InvalidTransition { .. } => "That action is not available right now".to_string(),
            Self::Blocked => "Your cart is empty".to_string(),
            Self::Superseded(_) => "A newer request replaced this one".to_string(),
            Self::StaleDraft => {
                "Your cart changed, please review it and place the order again".to_string()
            }
            Self::UnknownItem(_) => "That product is no longer in your cart".to_string(),
            Self::DeliveryNotComputed => "Please calculate the delivery cost first".to_string(),
        }
    }

    /// Whether the error prevents the order from being submitted as is.
    #[must_use]
    pub const fn blocks_submission(&self) -> bool {
        matches!(
            self,
            Self::Validation(_) | Self::Blocked | Self::StaleDraft | Self::DeliveryNotComputed
        )
    }

    /// Whether repeating the same action may succeed without other changes.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::Network(_) | Self::Business(_) | Self::Storage(_))
    }

    /// Whether the error is announced to the user as a notice.
    pub(crate) const fn is_notice(&self) -> bool {
        matches!(self, Self::Network(_) | Self::Business(_) | Self::Storage(_))
    }
}
