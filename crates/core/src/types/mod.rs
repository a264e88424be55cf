//! Core types for Larder.
//!
//! This module provides type-safe wrappers for common domain concepts.

pub mod email;
pub mod id;
pub mod method;
pub mod phone;
pub mod price;

pub use email::{Email, EmailError};
pub use id::*;
pub use method::{DeliveryMethod, PaymentMethod, UnknownMethod};
pub use phone::{PhoneError, PhoneNumber};
pub use price::Price;
