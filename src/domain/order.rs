use serde::{Deserialize, Serialize};

/// A purchase against a product.
///
/// `amount` is the unit price times the quantity at the moment the order was
/// placed. It is never recomputed when the product's price changes later.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    #[serde(deserialize_with = "super::id_from_str_or_number")]
    pub id: String,
    #[serde(deserialize_with = "super::id_from_str_or_number")]
    pub product_id: String,
    pub quantity: u32,
    pub amount: f64,
    pub date: String,
}

/// Validated payload for creating a new order.
#[derive(Debug, Clone, PartialEq)]
pub struct OrderDraft {
    pub product_id: String,
    pub quantity: u32,
    pub amount: f64,
    pub date: String,
}

impl Order {
    pub fn new(
        id: impl Into<String>,
        product_id: impl Into<String>,
        quantity: u32,
        amount: f64,
        date: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            product_id: product_id.into(),
            quantity,
            amount,
            date: date.into(),
        }
    }
}

impl OrderDraft {
    /// Builds a draft, snapshotting `unit_price * quantity` as the amount.
    pub fn priced(
        product_id: impl Into<String>,
        unit_price: f64,
        quantity: u32,
        date: impl Into<String>,
    ) -> Self {
        Self {
            product_id: product_id.into(),
            quantity,
            amount: unit_price * f64::from(quantity),
            date: date.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_numeric_ids_as_strings() {
        let raw = serde_json::json!({
            "id": 12,
            "product_id": 3,
            "quantity": 2,
            "amount": 20.0,
            "date": "2025-05-01"
        });
        let order: Order = serde_json::from_value(raw).unwrap();
        assert_eq!(order.id, "12");
        assert_eq!(order.product_id, "3");
    }

    #[test]
    fn priced_draft_snapshots_amount() {
        let draft = OrderDraft::priced("1", 10.0, 3, "2025-05-01");
        assert_eq!(draft.amount, 30.0);
    }
}
