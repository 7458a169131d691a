//! Turns raw form input into drafts, rejecting it before any local mutation.

use crate::domain::{OrderDraft, Product, ProductDraft};
use chrono::NaiveDate;
use thiserror::Error;

#[derive(Debug, Clone, Error, PartialEq)]
pub enum ValidationError {
    #[error("Please fill out all required fields: {}", .0.join(", "))]
    MissingFields(Vec<&'static str>),
    #[error("{0} must be a non-negative number")]
    InvalidNumber(&'static str),
    #[error("Quantity must be less than or equal to {available}")]
    QuantityExceedsStock { requested: u32, available: u32 },
    #[error("Product is invalid: {0}")]
    UnknownProduct(String),
    #[error("Date must look like YYYY-MM-DD: {0}")]
    InvalidDate(String),
}

/// Raw input for a new product.
#[derive(Debug, Clone, Default)]
pub struct ProductForm {
    pub name: String,
    pub price: String,
    pub remaining: String,
}

/// Raw input for a new order. `product` may be the product's name or its id.
#[derive(Debug, Clone, Default)]
pub struct OrderForm {
    pub product: String,
    pub quantity: String,
    pub date: String,
}

fn missing(fields: &[(&'static str, &str)]) -> Result<(), ValidationError> {
    let missing: Vec<_> = fields
        .iter()
        .filter(|(_, value)| value.trim().is_empty())
        .map(|(name, _)| *name)
        .collect();
    if missing.is_empty() {
        Ok(())
    } else {
        Err(ValidationError::MissingFields(missing))
    }
}

fn non_negative_f64(field: &'static str, raw: &str) -> Result<f64, ValidationError> {
    match raw.trim().parse::<f64>() {
        Ok(n) if n.is_finite() && n >= 0.0 => Ok(n),
        _ => Err(ValidationError::InvalidNumber(field)),
    }
}

fn count(field: &'static str, raw: &str) -> Result<u32, ValidationError> {
    raw.trim()
        .parse::<u32>()
        .map_err(|_| ValidationError::InvalidNumber(field))
}

impl ProductForm {
    pub fn validate(&self) -> Result<ProductDraft, ValidationError> {
        missing(&[
            ("name", self.name.as_str()),
            ("price", self.price.as_str()),
            ("remaining", self.remaining.as_str()),
        ])?;
        let price = non_negative_f64("Price", &self.price)?;
        let remaining = count("Remaining", &self.remaining)?;
        Ok(ProductDraft::new(self.name.trim(), price, remaining))
    }
}

impl OrderForm {
    /// Validates against the currently known products; the amount is priced
    /// from the matching product.
    pub fn validate(&self, products: &[Product]) -> Result<OrderDraft, ValidationError> {
        missing(&[
            ("product", self.product.as_str()),
            ("quantity", self.quantity.as_str()),
            ("date", self.date.as_str()),
        ])?;
        let quantity = count("Quantity", &self.quantity)?;

        let wanted = self.product.trim();
        let product = products
            .iter()
            .find(|p| p.name == wanted)
            .or_else(|| products.iter().find(|p| p.id == wanted))
            .ok_or_else(|| ValidationError::UnknownProduct(wanted.to_string()))?;
        if quantity > product.remaining {
            return Err(ValidationError::QuantityExceedsStock {
                requested: quantity,
                available: product.remaining,
            });
        }

        let date = self.date.trim();
        NaiveDate::parse_from_str(date, "%Y-%m-%d")
            .map_err(|_| ValidationError::InvalidDate(date.to_string()))?;

        Ok(OrderDraft::priced(&product.id, product.price, quantity, date))
    }
}
