//! Confirmation of destructive cart actions and order placement.

use std::fmt;

use larder_core::{Price, ProductId};

/// What the user is asked to confirm.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfirmPrompt {
    /// Remove one product from the cart.
    RemoveItem { product_id: ProductId, name: String },
    /// Empty the whole cart.
    ClearCart,
    /// Submit the drafted order.
    PlaceOrder { total: Price },
}

impl fmt::Display for ConfirmPrompt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::RemoveItem { name, .. } => write!(f, "Remove \"{name}\" from the cart?"),
            Self::ClearCart => f.write_str("Remove all items from the cart?"),
            Self::PlaceOrder { total } => write!(f, "Place the order for {total}?"),
        }
    }
}

/// Answers a [`ConfirmPrompt`]. A `false` answer cancels the action.
pub trait Confirm {
    fn confirm(&self, prompt: &ConfirmPrompt) -> bool;
}

/// Accepts every prompt (`--yes`).
#[derive(Debug, Clone, Copy, Default)]
pub struct AssumeYes;

impl Confirm for AssumeYes {
    fn confirm(&self, _prompt: &ConfirmPrompt) -> bool {
        true
    }
}

/// Declines every prompt.
#[derive(Debug, Clone, Copy, Default)]
pub struct AssumeNo;

impl Confirm for AssumeNo {
    fn confirm(&self, _prompt: &ConfirmPrompt) -> bool {
        false
    }
}

impl<F> Confirm for F
where
    F: Fn(&ConfirmPrompt) -> bool,
{
    fn confirm(&self, prompt: &ConfirmPrompt) -> bool {
        self(prompt)
    }
}
