//! Larder Checkout - Cart/checkout reconciler.
//!
//! Keeps the server-side cart, the locally mirrored checkout state and the
//! delivery cost for the current subtotal consistent while a customer edits
//! their cart and places an order.
//!
//! # Architecture
//!
//! - [`session::CheckoutSession`] drives the flow through [`CheckoutPhase`]s.
//!   Every cart write is followed by a fresh fetch of the authoritative cart.
//! - [`api::StoreApi`] is the backend seam; [`HttpStoreApi`] talks to the
//!   storefront REST API.
//! - [`storage::LocalStore`] mirrors cart and delivery choices across runs.
//! - State changes and user notices are broadcast as [`CheckoutEvent`]s.
//!
//! # Example
//!
//! ```rust,ignore
//! let config = CheckoutConfig::from_env()?;
//! let api = HttpStoreApi::new(&config.api)?;
//! let store = FileStore::open(&config.state_file)?;
//! let session = CheckoutSession::new(api, store, config.session);
//!
//! session.fetch_cart().await?;
//! session.compute_delivery_cost("Kazan", DeliveryMethod::Courier).await?;
//! let draft = session.build_order_draft(&form)?;
//! let confirmation = session.submit_order(&draft).await?;
//! ```

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod api;
pub mod cart;
pub mod config;
pub mod confirm;
pub mod delivery;
pub mod draft;
pub mod error;
pub mod events;
pub mod flow;
mod prefill;
pub mod sequence;
pub mod session;
pub mod storage;
pub mod validation;

pub use api::{ApiError, HttpStoreApi, StoreApi};
pub use cart::{CartItem, CartSnapshot};
pub use config::{ApiConfig, CheckoutConfig, ConfigError, SessionSettings};
pub use confirm::{AssumeNo, AssumeYes, Confirm, ConfirmPrompt};
pub use delivery::{DeliveryQuoter, DeliverySelection, Quote, QuoteSource};
pub use draft::{OrderConfirmation, OrderDraft, OrderForm, Totals, build_order_draft};
pub use error::{CheckoutError, Operation};
pub use events::{CheckoutEvent, Notice, NoticeLevel};
pub use flow::CheckoutPhase;
pub use session::CheckoutSession;
pub use storage::{FileStore, LocalStore, MemoryStore, StorageError};
pub use validation::{DraftField, FieldError, FieldProblem, ValidationErrors};
