//! Larder Core - Shared types library.
//!
//! This crate provides common types used across all Larder components:
//! - `checkout` - Cart/checkout reconciler and REST client
//! - `cli` - Interactive checkout shell
//!
//! # Architecture
//!
//! The core crate contains only types and validation - no I/O, no HTTP
//! clients, no local storage. This keeps it lightweight and allows it to be
//! used anywhere.
//!
//! # Modules
//!
//! - [`types`] - Newtype wrappers for type-safe IDs, prices, emails, phone
//!   numbers, and delivery/payment methods

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
