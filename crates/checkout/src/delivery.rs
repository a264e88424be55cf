//! Delivery pricing with a read-through cache.
//!
//! Quotes are keyed by (city, method, subtotal). Pickup is always free and
//! never reaches the backend. When the backend cannot price a delivery the
//! configured default cost is substituted so checkout can continue; such
//! fallback quotes are not cached.

use std::time::Duration;

use larder_core::{DeliveryMethod, Price};
use moka::future::Cache;
use tracing::{debug, warn};

use crate::api::{ApiError, DeliveryQuotePayload, StoreApi};
use crate::validation::{DraftField, FieldError, ValidationErrors};

/// Chosen delivery method and city with its computed cost.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeliverySelection {
    pub city: String,
    pub method: DeliveryMethod,
    /// Zero whenever `is_free` is set.
    pub cost: Price,
    pub is_free: bool,
    pub min_for_free: Option<Price>,
    /// Cart subtotal the cost was computed for.
    pub quoted_subtotal: Price,
    /// Set when the default cost was substituted after a failed query.
    pub fallback: bool,
}

impl DeliverySelection {
    fn pickup(city: &str, subtotal: Price) -> Self {
        Self {
            city: city.to_string(),
            method: DeliveryMethod::Pickup,
            cost: Price::ZERO,
            is_free: true,
            min_for_free: None,
            quoted_subtotal: subtotal,
            fallback: false,
        }
    }

    fn from_payload(
        city: &str,
        method: DeliveryMethod,
        subtotal: Price,
        payload: DeliveryQuotePayload,
    ) -> Self {
        let is_free = payload.is_free || payload.cost.is_zero();
        Self {
            city: city.to_string(),
            method,
            cost: if is_free { Price::ZERO } else { payload.cost },
            is_free,
            min_for_free: payload.min_for_free,
            quoted_subtotal: subtotal,
            fallback: false,
        }
    }

    /// Whether this selection still prices the given inputs.
    #[must_use]
    pub fn matches(&self, city: &str, method: DeliveryMethod, subtotal: Price) -> bool {
        self.method == method
            && self.quoted_subtotal == subtotal
            && (method == DeliveryMethod::Pickup || same_city(&self.city, city))
    }
}

/// Where a quote came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QuoteSource {
    /// Pickup, priced locally.
    Pickup,
    /// Served from the quote cache.
    Cached,
    /// Fresh from the backend.
    Server,
    /// Backend failed; the default cost was used.
    Fallback { reason: String },
}

#[derive(Debug, Clone)]
pub struct Quote {
    pub selection: DeliverySelection,
    pub source: QuoteSource,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct DeliveryKey {
    city: String,
    method: DeliveryMethod,
    subtotal: Price,
}

impl DeliveryKey {
    fn new(city: &str, method: DeliveryMethod, subtotal: Price) -> Self {
        Self {
            city: city.to_lowercase(),
            method,
            subtotal: Price::new(subtotal.amount().normalize()),
        }
    }
}

/// Delivery cost calculator shared by a session.
#[derive(Clone)]
pub struct DeliveryQuoter {
    cache: Cache<DeliveryKey, DeliverySelection>,
    default_cost: Price,
}

impl std::fmt::Debug for DeliveryQuoter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DeliveryQuoter")
            .field("cached", &self.cache.entry_count())
            .field("default_cost", &self.default_cost)
            .finish()
    }
}

impl DeliveryQuoter {
    #[must_use]
    pub fn new(default_cost: Price, ttl: Duration) -> Self {
        let cache = Cache::builder()
            .max_capacity(256)
            .time_to_live(ttl)
            .build();

        Self {
            cache,
            default_cost,
        }
    }

    #[must_use]
    pub const fn default_cost(&self) -> Price {
        self.default_cost
    }

    /// Price a delivery.
    ///
    /// # Errors
    ///
    /// Returns a validation error when a non-pickup method has no city.
    /// Backend failures are not errors: they yield a fallback quote.
    pub async fn quote<A: StoreApi>(
        &self,
        api: &A,
        city: &str,
        method: DeliveryMethod,
        subtotal: Price,
    ) -> Result<Quote, ValidationErrors> {
        let city = city.trim();

        if method == DeliveryMethod::Pickup {
            return Ok(Quote {
                selection: DeliverySelection::pickup(city, subtotal),
                source: QuoteSource::Pickup,
            });
        }

        if city.is_empty() {
            return Err(ValidationErrors::single(FieldError::required(
                DraftField::City,
            )));
        }

        let key = DeliveryKey::new(city, method, subtotal);
        if let Some(mut selection) = self.cache.get(&key).await {
            debug!(city = %city, method = %method, "Delivery quote cache hit");
            city.clone_into(&mut selection.city);
            return Ok(Quote {
                selection,
                source: QuoteSource::Cached,
            });
        }

        match api.quote_delivery(city, method, subtotal).await {
            Ok(payload) => {
                let selection = DeliverySelection::from_payload(city, method, subtotal, payload);
                self.cache.insert(key, selection.clone()).await;
                Ok(Quote {
                    selection,
                    source: QuoteSource::Server,
                })
            }
            Err(err) => {
                warn!(
                    error = %err,
                    city = %city,
                    default_cost = %self.default_cost,
                    "Delivery quote failed, using default cost"
                );
                let reason = match err {
                    ApiError::Business(message) => message,
                    _ => "delivery service unavailable".to_string(),
                };
                Ok(Quote {
                    selection: DeliverySelection {
                        city: city.to_string(),
                        method,
                        cost: self.default_cost,
                        is_free: false,
                        min_for_free: None,
                        quoted_subtotal: subtotal,
                        fallback: true,
                    },
                    source: QuoteSource::Fallback { reason },
                })
            }
        }
    }

    /// Drop every cached quote.
    pub fn invalidate_all(&self) {
        self.cache.invalidate_all();
    }
}

fn same_city(a: &str, b: &str) -> bool {
    a.trim().to_lowercase() == b.trim().to_lowercase()
}
