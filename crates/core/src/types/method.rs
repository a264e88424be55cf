//! Delivery and payment method enums.
//!
//! Wire values match the backend's snake_case choices.

use core::fmt;
use core::str::FromStr;

use serde::{Deserialize, Serialize};

/// An unrecognized delivery or payment method string.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown {kind} method: {value}")]
pub struct UnknownMethod {
    /// Which enum was being parsed (`delivery` or `payment`).
    pub kind: &'static str,
    /// The rejected input.
    pub value: String,
}

/// How the order reaches the customer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum DeliveryMethod {
    /// Courier delivery to the customer's address.
    #[default]
    Courier,
    /// Customer collects the order at the store. Always free.
    Pickup,
}

impl DeliveryMethod {
    /// Wire value used in query strings and local storage.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Courier => "courier",
            Self::Pickup => "pickup",
        }
    }

    /// Whether an address (city, street) is needed for this method.
    #[must_use]
    pub const fn requires_address(self) -> bool {
        matches!(self, Self::Courier)
    }
}

impl fmt::Display for DeliveryMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DeliveryMethod {
    type Err = UnknownMethod;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "courier" => Ok(Self::Courier),
            "pickup" => Ok(Self::Pickup),
            other => Err(UnknownMethod {
                kind: "delivery",
                value: other.to_string(),
            }),
        }
    }
}

/// How the customer pays. Payment itself is handled by the backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    /// Cash on receipt.
    Cash,
    /// Card payment online after the order is placed.
    #[default]
    CardOnline,
    /// Card payment to the courier.
    CardCourier,
    /// Faster Payments System transfer.
    Sbp,
}

impl PaymentMethod {
    /// Wire value used in the order payload and local storage.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Cash => "cash",
            Self::CardOnline => "card_online",
            Self::CardCourier => "card_courier",
            Self::Sbp => "sbp",
        }
    }

    /// Human-readable label for confirmations.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Cash => "Cash on delivery",
            Self::CardOnline => "Card online",
            Self::CardCourier => "Card to courier",
            Self::Sbp => "Faster Payments (SBP)",
        }
    }
}

impl fmt::Display for PaymentMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PaymentMethod {
    type Err = UnknownMethod;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "cash" => Ok(Self::Cash),
            "card_online" => Ok(Self::CardOnline),
            "card_courier" => Ok(Self::CardCourier),
            "sbp" => Ok(Self::Sbp),
            other => Err(UnknownMethod {
                kind: "payment",
                value: other.to_string(),
            }),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_storefront() {
        assert_eq!(DeliveryMethod::default(), DeliveryMethod::Courier);
        assert_eq!(PaymentMethod::default(), PaymentMethod::CardOnline);
    }

    #[test]
    fn test_parse_and_display_agree() {
        for method in [DeliveryMethod::Courier, DeliveryMethod::Pickup] {
            assert_eq!(method.to_string().parse::<DeliveryMethod>().unwrap(), method);
        }
        for method in [
            PaymentMethod::Cash,
            PaymentMethod::CardOnline,
            PaymentMethod::CardCourier,
            PaymentMethod::Sbp,
        ] {
            assert_eq!(method.as_str().parse::<PaymentMethod>().unwrap(), method);
        }
    }

    #[test]
    fn test_serde_matches_wire_values() {
        let json = serde_json::to_string(&PaymentMethod::CardCourier).unwrap();
        assert_eq!(json, "\"card_courier\"");
        let method: DeliveryMethod = serde_json::from_str("\"pickup\"").unwrap();
        assert_eq!(method, DeliveryMethod::Pickup);
    }

    #[test]
    fn test_unknown_method() {
        let err = "teleport".parse::<DeliveryMethod>().unwrap_err();
        assert_eq!(err.to_string(), "unknown delivery method: teleport");
    }

    #[test]
    fn test_pickup_needs_no_address() {
        assert!(DeliveryMethod::Courier.requires_address());
        assert!(!DeliveryMethod::Pickup.requires_address());
    }
}
