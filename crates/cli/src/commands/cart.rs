//! One-shot cart commands.

use larder_checkout::CheckoutError;
use larder_core::DeliveryMethod;

use super::{Session, flush_notices, render};

/// Fetch and print the cart.
///
/// # Errors
///
/// Returns an error if the cart cannot be fetched.
pub async fn show(session: &Session) -> Result<(), CheckoutError> {
    let mut events = session.subscribe();
    let result = session.fetch_cart().await;
    flush_notices(&mut events);

    render::cart(&result?);
    Ok(())
}

/// Fetch the cart, price delivery for it and print the totals.
///
/// # Errors
///
/// Returns an error if the cart cannot be fetched or the inputs are invalid.
pub async fn quote(
    session: &Session,
    city: &str,
    method: DeliveryMethod,
) -> Result<(), CheckoutError> {
    let mut events = session.subscribe();

    let cart = session.fetch_cart().await;
    flush_notices(&mut events);
    render::cart(&cart?);

    let selection = session.compute_delivery_cost(city, method).await;
    flush_notices(&mut events);
    render::delivery(&selection?);
    render::totals(&session.totals());
    Ok(())
}
