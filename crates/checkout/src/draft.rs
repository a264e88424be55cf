//! Order drafts: cart + delivery + form input merged at submit time.

use larder_core::{DeliveryMethod, Email, EmailError, PaymentMethod, PhoneError, PhoneNumber, Price};
use serde::{Deserialize, Serialize};

use crate::api::{ApiError, OrderLine, OrderReply, OrderRequest};
use crate::cart::CartSnapshot;
use crate::delivery::DeliverySelection;
use crate::validation::{DraftField, FieldError, FieldProblem, ValidationErrors};

/// Raw order form input, as typed by the customer.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OrderForm {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone: String,
    pub city: String,
    pub address: String,
    pub postal_code: String,
    /// Falls back to the session's stored choice when unset.
    pub payment_method: Option<PaymentMethod>,
    pub notes: String,
    pub is_gift: bool,
    pub gift_message: String,
}

/// Validated customer details.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Customer {
    pub first_name: String,
    pub last_name: String,
    pub email: Email,
    pub phone: PhoneNumber,
}

/// Validated delivery details.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeliveryDetails {
    pub method: DeliveryMethod,
    pub city: String,
    pub address: String,
    pub postal_code: String,
}

/// A validated, not yet submitted order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderDraft {
    pub customer: Customer,
    pub delivery: DeliveryDetails,
    pub payment_method: PaymentMethod,
    pub items: Vec<OrderLine>,
    pub subtotal: Price,
    pub delivery_cost: Price,
    pub total: Price,
    pub notes: String,
    pub is_gift: bool,
    pub gift_message: String,
}

impl OrderDraft {
    /// Whether `cart` still has exactly the lines and subtotal this draft was
    /// built from, with everything available.
    #[must_use]
    pub fn matches_cart(&self, cart: &CartSnapshot) -> bool {
        cart.total_price == self.subtotal
            && cart.unavailable_items().is_empty()
            && cart.order_lines() == self.items
    }

    /// Verify `total == subtotal + delivery_cost`.
    ///
    /// # Errors
    ///
    /// Returns a `TotalMismatch` failure with the expected total.
    pub fn check_totals(&self) -> Result<(), ValidationErrors> {
        let expected = self.subtotal + self.delivery_cost;
        if self.total == expected {
            Ok(())
        } else {
            Err(ValidationErrors::single(FieldError::new(
                DraftField::Cart,
                FieldProblem::TotalMismatch { expected },
            )))
        }
    }

    /// Request body for `POST /api/orders/`.
    #[must_use]
    pub fn to_request(&self) -> OrderRequest {
        OrderRequest {
            first_name: self.customer.first_name.clone(),
            last_name: self.customer.last_name.clone(),
            email: self.customer.email.as_str().to_string(),
            phone: self.customer.phone.as_str().to_string(),
            delivery_method: self.delivery.method,
            city: self.delivery.city.clone(),
            address: self.delivery.address.clone(),
            postal_code: self.delivery.postal_code.clone(),
            payment_method: self.payment_method,
            items: self.items.clone(),
            subtotal: self.subtotal,
            delivery_cost: self.delivery_cost,
            total: self.total,
            notes: self.notes.clone(),
            is_gift: self.is_gift,
            gift_message: if self.is_gift {
                self.gift_message.clone()
            } else {
                String::new()
            },
        }
    }
}

/// Subtotal, delivery and grand total as currently shown.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Totals {
    pub subtotal: Price,
    /// `None` until a delivery cost has been computed.
    pub delivery_cost: Option<Price>,
    pub total: Price,
}

impl Totals {
    #[must_use]
    pub fn new(subtotal: Price, delivery_cost: Option<Price>) -> Self {
        Self {
            subtotal,
            delivery_cost,
            total: subtotal + delivery_cost.unwrap_or(Price::ZERO),
        }
    }
}

/// The backend's acknowledgement of a placed order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderConfirmation {
    pub order_number: String,
    pub total: Price,
    pub payment_method: PaymentMethod,
    pub status_display: Option<String>,
}

impl OrderConfirmation {
    /// Interpret an order reply, filling optional fields from the draft.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::Protocol`] when the reply has no order number.
    pub fn from_reply(reply: OrderReply, draft: &OrderDraft) -> Result<Self, ApiError> {
        let order_number = reply
            .order_number
            .filter(|number| !number.trim().is_empty())
            .ok_or_else(|| ApiError::Protocol("order reply has no order_number".to_string()))?;

        Ok(Self {
            order_number,
            total: reply.total.unwrap_or(draft.total),
            payment_method: reply.payment_method.unwrap_or(draft.payment_method),
            status_display: reply.status_display,
        })
    }
}

/// Merge the cart, the delivery selection and the form into an order draft.
///
/// Every failing field is reported, not just the first.
///
/// # Errors
///
/// Returns all validation failures found.
pub fn build_order_draft(
    cart: &CartSnapshot,
    delivery: &DeliverySelection,
    form: &OrderForm,
    default_payment: PaymentMethod,
) -> Result<OrderDraft, ValidationErrors> {
    let mut errors = ValidationErrors::new();

    let first_name = required(&mut errors, DraftField::FirstName, &form.first_name);
    let last_name = required(&mut errors, DraftField::LastName, &form.last_name);

    let email = match Email::parse(&form.email) {
        Ok(email) => Some(email),
        Err(EmailError::Empty) => {
            errors.push(FieldError::required(DraftField::Email));
            None
        }
        Err(err) => {
            errors.push(FieldError::new(DraftField::Email, FieldProblem::InvalidEmail(err)));
            None
        }
    };

    let phone = match PhoneNumber::parse(&form.phone) {
        Ok(phone) => Some(phone),
        Err(PhoneError::Empty) => {
            errors.push(FieldError::required(DraftField::Phone));
            None
        }
        Err(err) => {
            errors.push(FieldError::new(DraftField::Phone, FieldProblem::InvalidPhone(err)));
            None
        }
    };

    let method = delivery.method;
    let city = form.city.trim().to_string();
    let address = form.address.trim().to_string();
    if method.requires_address() {
        if city.is_empty() {
            errors.push(FieldError::required(DraftField::City));
        } else if city.to_lowercase() != delivery.city.trim().to_lowercase() {
            errors.push(FieldError::new(
                DraftField::City,
                FieldProblem::QuotedForOtherCity {
                    quoted: delivery.city.clone(),
                },
            ));
        }
        if address.is_empty() {
            errors.push(FieldError::required(DraftField::Address));
        }
    }

    let postal_code = form.postal_code.trim().to_string();
    if !postal_code.is_empty() && !postal_code.chars().all(|c| c.is_ascii_digit()) {
        errors.push(FieldError::new(
            DraftField::PostalCode,
            FieldProblem::InvalidPostalCode,
        ));
    }

    if cart.is_empty() {
        errors.push(FieldError::new(DraftField::Cart, FieldProblem::CartEmpty));
    } else {
        let unavailable = cart.unavailable_items();
        if !unavailable.is_empty() {
            errors.push(FieldError::new(
                DraftField::Cart,
                FieldProblem::UnavailableItems(unavailable),
            ));
        }
    }

    let (Some(first_name), Some(last_name), Some(email), Some(phone), true) =
        (first_name, last_name, email, phone, errors.is_empty())
    else {
        return Err(errors);
    };

    let subtotal = cart.total_price;
    let delivery_cost = delivery.cost;

    Ok(OrderDraft {
        customer: Customer {
            first_name,
            last_name,
            email,
            phone,
        },
        delivery: DeliveryDetails {
            method,
            city,
            address,
            postal_code,
        },
        payment_method: form.payment_method.unwrap_or(default_payment),
        items: cart.order_lines(),
        subtotal,
        delivery_cost,
        total: subtotal + delivery_cost,
        notes: form.notes.trim().to_string(),
        is_gift: form.is_gift,
        gift_message: form.gift_message.trim().to_string(),
    })
}

fn required(errors: &mut ValidationErrors, field: DraftField, value: &str) -> Option<String> {
    let value = value.trim();
    if value.is_empty() {
        errors.push(FieldError::required(field));
        None
    } else {
        Some(value.to_string())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::api::CartPayload;
    use crate::api::fake::line;

    fn cart(lines: Vec<crate::api::CartLinePayload>) -> CartSnapshot {
        CartSnapshot::from_payload(CartPayload {
            items: lines,
            total_quantity: None,
            total_price: None,
        })
    }

    fn courier(city: &str, cost: i64, subtotal: Price) -> DeliverySelection {
        DeliverySelection {
            city: city.to_string(),
            method: DeliveryMethod::Courier,
            cost: Price::from_units(cost),
            is_free: cost == 0,
            min_for_free: None,
            quoted_subtotal: subtotal,
            fallback: false,
        }
    }

    fn form() -> OrderForm {
        OrderForm {
            first_name: "Anna".to_string(),
            last_name: "Petrova".to_string(),
            email: "anna@example.com".to_string(),
            phone: "8 (912) 345-67-89".to_string(),
            city: "Kazan".to_string(),
            address: "Baumana st., 12".to_string(),
            postal_code: "420111".to_string(),
            ..OrderForm::default()
        }
    }

    #[test]
    fn test_valid_draft_totals() {
        let cart = cart(vec![line(1, "Flour", 90, 2, 10)]);
        let delivery = courier("Kazan", 250, cart.total_price);

        let draft = build_order_draft(&cart, &delivery, &form(), PaymentMethod::CardOnline).unwrap();

        assert_eq!(draft.subtotal, Price::from_units(180));
        assert_eq!(draft.delivery_cost, Price::from_units(250));
        assert_eq!(draft.total, Price::from_units(430));
        assert_eq!(draft.customer.phone.as_str(), "+79123456789");
        assert_eq!(draft.payment_method, PaymentMethod::CardOnline);
        assert!(draft.check_totals().is_ok());
        assert!(draft.matches_cart(&cart));
    }

    #[test]
    fn test_unavailable_item_rejects_otherwise_valid_draft() {
        let cart = cart(vec![line(1, "Flour", 90, 2, 10), line(2, "Yeast", 40, 5, 3)]);
        let delivery = courier("Kazan", 250, cart.total_price);

        let errors = build_order_draft(&cart, &delivery, &form(), PaymentMethod::Cash).unwrap_err();

        assert_eq!(errors.len(), 1);
        assert_eq!(
            errors.for_field(DraftField::Cart).map(|e| &e.problem),
            Some(&FieldProblem::UnavailableItems(vec![larder_core::ProductId::new(2)]))
        );
    }

    #[test]
    fn test_all_failures_collected() {
        let cart = cart(vec![]);
        let delivery = courier("Kazan", 250, Price::ZERO);
        let form = OrderForm {
            email: "not an email".to_string(),
            phone: "12345".to_string(),
            postal_code: "42O111".to_string(),
            ..OrderForm::default()
        };

        let errors = build_order_draft(&cart, &delivery, &form, PaymentMethod::Cash).unwrap_err();
        let fields: Vec<DraftField> = errors.iter().map(|e| e.field).collect();

        assert_eq!(
            fields,
            vec![
                DraftField::FirstName,
                DraftField::LastName,
                DraftField::Email,
                DraftField::Phone,
                DraftField::City,
                DraftField::Address,
                DraftField::PostalCode,
                DraftField::Cart,
            ]
        );
    }

    #[test]
    fn test_pickup_needs_no_address() {
        let cart = cart(vec![line(1, "Flour", 90, 2, 10)]);
        let delivery = DeliverySelection {
            city: String::new(),
            method: DeliveryMethod::Pickup,
            cost: Price::ZERO,
            is_free: true,
            min_for_free: None,
            quoted_subtotal: cart.total_price,
            fallback: false,
        };
        let form = OrderForm {
            city: String::new(),
            address: String::new(),
            ..form()
        };

        let draft = build_order_draft(&cart, &delivery, &form, PaymentMethod::Cash).unwrap();
        assert_eq!(draft.total, draft.subtotal);
    }

    #[test]
    fn test_city_must_match_quote() {
        let cart = cart(vec![line(1, "Flour", 90, 2, 10)]);
        let delivery = courier("Moscow", 400, cart.total_price);

        let errors = build_order_draft(&cart, &delivery, &form(), PaymentMethod::Cash).unwrap_err();
        assert!(matches!(
            errors.for_field(DraftField::City).map(|e| &e.problem),
            Some(FieldProblem::QuotedForOtherCity { quoted }) if quoted == "Moscow"
        ));
    }

    #[test]
    fn test_explicit_payment_method_wins() {
        let cart = cart(vec![line(1, "Flour", 90, 2, 10)]);
        let delivery = courier("Kazan", 250, cart.total_price);
        let form = OrderForm {
            payment_method: Some(PaymentMethod::Sbp),
            ..form()
        };

        let draft = build_order_draft(&cart, &delivery, &form, PaymentMethod::Cash).unwrap();
        assert_eq!(draft.to_request().payment_method, PaymentMethod::Sbp);
    }

    #[test]
    fn test_tampered_total_detected() {
        let cart = cart(vec![line(1, "Flour", 90, 2, 10)]);
        let delivery = courier("Kazan", 250, cart.total_price);
        let mut draft = build_order_draft(&cart, &delivery, &form(), PaymentMethod::Cash).unwrap();
        draft.total = Price::from_units(1);

        let errors = draft.check_totals().unwrap_err();
        assert!(errors.to_string().contains("430.00"));
    }

    #[test]
    fn test_confirmation_requires_order_number() {
        let cart = cart(vec![line(1, "Flour", 90, 2, 10)]);
        let delivery = courier("Kazan", 250, cart.total_price);
        let draft = build_order_draft(&cart, &delivery, &form(), PaymentMethod::Cash).unwrap();

        let err = OrderConfirmation::from_reply(OrderReply::default(), &draft).unwrap_err();
        assert!(matches!(err, ApiError::Protocol(_)));

        let confirmation = OrderConfirmation::from_reply(
            OrderReply {
                order_number: Some("LD-00042".to_string()),
                ..OrderReply::default()
            },
            &draft,
        )
        .unwrap();
        assert_eq!(confirmation.order_number, "LD-00042");
        assert_eq!(confirmation.total, draft.total);
        assert_eq!(confirmation.payment_method, PaymentMethod::Cash);
    }
}
