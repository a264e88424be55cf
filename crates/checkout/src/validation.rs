//! Client-side validation results.
//!
//! Validation never throws on the first failure: every offending field is
//! collected so a form can highlight all of them at once.

use std::fmt;

use larder_core::{EmailError, PhoneError, Price, ProductId};

/// A form field (or the cart itself) that failed validation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DraftField {
    FirstName,
    LastName,
    Email,
    Phone,
    City,
    Address,
    PostalCode,
    /// The cart as a whole (empty, unavailable items).
    Cart,
    /// Quantity of a single cart line.
    Quantity(ProductId),
}

impl DraftField {
    /// Human-readable field label.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::FirstName => "first name",
            Self::LastName => "last name",
            Self::Email => "email",
            Self::Phone => "phone",
            Self::City => "city",
            Self::Address => "address",
            Self::PostalCode => "postal code",
            Self::Cart => "cart",
            Self::Quantity(_) => "quantity",
        }
    }
}

impl fmt::Display for DraftField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// What is wrong with a field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldProblem {
    /// Required field left blank.
    Required,
    /// Email failed the format check.
    InvalidEmail(EmailError),
    /// Phone failed the format check.
    InvalidPhone(PhoneError),
    /// Postal code contains something other than digits.
    InvalidPostalCode,
    /// The cart has no items.
    CartEmpty,
    /// Some items cannot be supplied in the requested quantity.
    UnavailableItems(Vec<ProductId>),
    /// Quantity under the product's minimum order quantity.
    BelowMinimum {
        /// Smallest allowed quantity.
        min: u32,
    },
    /// Quantity over what is in stock.
    AboveStock {
        /// Units in stock.
        stock: u32,
    },
    /// Delivery was priced for a different city than the one entered.
    QuotedForOtherCity {
        /// City the delivery cost was calculated for.
        quoted: String,
    },
    /// The draft's totals do not add up.
    TotalMismatch {
        /// Expected total (subtotal + delivery).
        expected: Price,
    },
}

impl fmt::Display for FieldProblem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Required => f.write_str("this field is required"),
            Self::InvalidEmail(err) => write!(f, "{err}"),
            Self::InvalidPhone(err) => write!(f, "{err}"),
            Self::InvalidPostalCode => f.write_str("postal code may only contain digits"),
            Self::CartEmpty => f.write_str("the cart is empty"),
            Self::UnavailableItems(ids) => {
                let ids = ids.iter().map(ToString::to_string).collect::<Vec<_>>();
                write!(
                    f,
                    "some items are not available in the requested quantity (products {})",
                    ids.join(", ")
                )
            }
            Self::BelowMinimum { min } => write!(f, "minimum order quantity is {min}"),
            Self::AboveStock { stock } => write!(f, "maximum available quantity is {stock}"),
            Self::QuotedForOtherCity { quoted } => {
                write!(f, "delivery was calculated for {quoted}, recalculate it")
            }
            Self::TotalMismatch { expected } => write!(f, "total should be {expected}"),
        }
    }
}

/// A single validation failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldError {
    pub field: DraftField,
    pub problem: FieldProblem,
}

impl FieldError {
    #[must_use]
    pub const fn new(field: DraftField, problem: FieldProblem) -> Self {
        Self { field, problem }
    }

    #[must_use]
    pub const fn required(field: DraftField) -> Self {
        Self::new(field, FieldProblem::Required)
    }
}

impl fmt::Display for FieldError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.problem)
    }
}

/// Every validation failure found in one pass.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ValidationErrors(Vec<FieldError>);

impl ValidationErrors {
    #[must_use]
    pub const fn new() -> Self {
        Self(Vec::new())
    }

    #[must_use]
    pub fn single(error: FieldError) -> Self {
        Self(vec![error])
    }

    pub fn push(&mut self, error: FieldError) {
        self.0.push(error);
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &FieldError> {
        self.0.iter()
    }

    /// First failure recorded for `field`, if any.
    #[must_use]
    pub fn for_field(&self, field: DraftField) -> Option<&FieldError> {
        self.0.iter().find(|e| e.field == field)
    }

    /// `Ok(())` when nothing was recorded, `Err(self)` otherwise.
    ///
    /// # Errors
    ///
    /// Returns the collected failures when there is at least one.
    pub fn into_result(self) -> Result<(), Self> {
        if self.is_empty() { Ok(()) } else { Err(self) }
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts = self.0.iter().map(ToString::to_string).collect::<Vec<_>>();
        f.write_str(&parts.join("; "))
    }
}

impl IntoIterator for ValidationErrors {
    type Item = FieldError;
    type IntoIter = std::vec::IntoIter<FieldError>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

impl<'a> IntoIterator for &'a ValidationErrors {
    type Item = &'a FieldError;
    type IntoIter = std::slice::Iter<'a, FieldError>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}
