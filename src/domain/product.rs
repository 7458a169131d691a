use serde::{Deserialize, Serialize};

/// Represents a product in the inventory.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    #[serde(deserialize_with = "super::id_from_str_or_number")]
    pub id: String,
    pub name: String,
    pub price: f64,
    pub remaining: u32,
}

/// Validated payload for creating a new product.
#[derive(Debug, Clone, PartialEq)]
pub struct ProductDraft {
    pub name: String,
    pub price: f64,
    pub remaining: u32,
}

impl Product {
    pub fn new(id: impl Into<String>, name: impl Into<String>, price: f64, remaining: u32) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            price,
            remaining,
        }
    }
}

impl ProductDraft {
    pub fn new(name: impl Into<String>, price: f64, remaining: u32) -> Self {
        Self {
            name: name.into(),
            price,
            remaining,
        }
    }
}
