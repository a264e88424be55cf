//! Terminal output.

use larder_checkout::api::SavedAddress;
use larder_checkout::{
    CartSnapshot, CheckoutError, DeliverySelection, Notice, NoticeLevel, OrderConfirmation,
    OrderDraft, Totals,
};
use larder_core::DeliveryMethod;

#[allow(clippy::print_stdout)]
pub fn cart(cart: &CartSnapshot) {
    if cart.is_empty() {
        println!("Your cart is empty.");
        return;
    }

    for item in &cart.items {
        let unit = item.measure_unit.as_deref().unwrap_or("pcs");
        let flag = if item.available { "" } else { "  [unavailable]" };
        println!(
            "  #{:<6} {:<32} {:>4} {unit} x {:>10} = {:>12}{flag}",
            item.product_id,
            item.name,
            item.quantity,
            item.unit_price.to_string(),
            item.line_total.to_string(),
        );
    }
    println!("  {} item(s), subtotal {}", cart.total_quantity, cart.total_price);
}

#[allow(clippy::print_stdout)]
pub fn delivery(selection: &DeliverySelection) {
    match selection.method {
        DeliveryMethod::Pickup => println!("Pickup: free"),
        DeliveryMethod::Courier if selection.is_free => {
            println!("Courier to {}: free", selection.city);
        }
        DeliveryMethod::Courier => {
            println!("Courier to {}: {}", selection.city, selection.cost);
            if let Some(min) = selection.min_for_free {
                println!("  Free delivery from {min}");
            }
        }
    }
}

#[allow(clippy::print_stdout)]
pub fn totals(totals: &Totals) {
    println!("Subtotal: {}", totals.subtotal);
    match totals.delivery_cost {
        Some(cost) => println!("Delivery: {cost}"),
        None => println!("Delivery: not calculated"),
    }
    println!("Total:    {}", totals.total);
}

#[allow(clippy::print_stdout)]
pub fn draft(draft: &OrderDraft) {
    println!(
        "{} {} <{}>, {}",
        draft.customer.first_name,
        draft.customer.last_name,
        draft.customer.email,
        draft.customer.phone
    );
    match draft.delivery.method {
        DeliveryMethod::Pickup => println!("Pickup"),
        DeliveryMethod::Courier => {
            println!("Courier: {}, {}", draft.delivery.city, draft.delivery.address);
        }
    }
    println!("Payment: {}", draft.payment_method.label());
    totals(&Totals::new(draft.subtotal, Some(draft.delivery_cost)));
}

#[allow(clippy::print_stdout)]
pub fn confirmation(confirmation: &OrderConfirmation) {
    println!("Order {} placed.", confirmation.order_number);
    println!("  Total:   {}", confirmation.total);
    println!("  Payment: {}", confirmation.payment_method.label());
    if let Some(status) = &confirmation.status_display {
        println!("  Status:  {status}");
    }
}

#[allow(clippy::print_stdout)]
pub fn addresses(addresses: &[SavedAddress]) {
    for (n, address) in addresses.iter().enumerate() {
        println!(
            "  {}. {}: {}, {}",
            n + 1,
            address.title,
            address.city,
            address.street_line()
        );
    }
}

#[allow(clippy::print_stdout)]
pub fn notice(notice: &Notice) {
    let tag = match notice.level {
        NoticeLevel::Info => "info",
        NoticeLevel::Success => "ok",
        NoticeLevel::Warning => "warning",
        NoticeLevel::Error => "error",
    };
    println!("[{tag}] {}", notice.message);
}

/// Print errors that were not already announced as notices.
#[allow(clippy::print_stdout)]
pub fn error(err: &CheckoutError) {
    match err {
        // Announced through the event bus
        CheckoutError::Network(_) | CheckoutError::Business(_) | CheckoutError::Storage(_) => {}
        CheckoutError::Superseded(_) => tracing::debug!(error = %err, "Response superseded"),
        CheckoutError::Validation(errors) => {
            println!("Please fix the following:");
            for error in errors {
                println!("  - {error}");
            }
        }
        other => println!("{}", other.user_message()),
    }
}
