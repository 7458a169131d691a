use super::actions::ProductAction;
use crate::actor_framework::Entity;
use crate::domain::{Product, ProductDraft};
use crate::remote::Collection;

impl Entity for Product {
    type Draft = ProductDraft;
    type Action = ProductAction;

    const COLLECTION: Collection = Collection::Products;

    fn id(&self) -> &str {
        &self.id
    }

    fn set_id(&mut self, id: String) {
        self.id = id;
    }

    fn from_draft(id: String, draft: ProductDraft) -> Self {
        Self {
            id,
            name: draft.name,
            price: draft.price,
            remaining: draft.remaining,
        }
    }

    /// # Errors
    /// Returns an error if attempting to reserve more stock than remains.
    fn handle_action(&mut self, action: ProductAction) -> Result<(), String> {
        match action {
            ProductAction::ReserveStock(amount) => {
                if self.remaining >= amount {
                    self.remaining -= amount;
                    Ok(())
                } else {
                    Err(format!(
                        "Insufficient stock: {} available, {} requested",
                        self.remaining, amount
                    ))
                }
            }
            ProductAction::ReleaseStock(amount) => {
                self.remaining = self.remaining.saturating_add(amount);
                Ok(())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reserve_and_release_move_remaining() {
        let mut product = Product::new("1", "Widget", 10.0, 5);
        product.handle_action(ProductAction::ReserveStock(3)).unwrap();
        assert_eq!(product.remaining, 2);
        product
            .handle_action(ProductAction::ReserveStock(3).inverse())
            .unwrap();
        assert_eq!(product.remaining, 5);
    }

    #[test]
    fn over_reservation_is_rejected_untouched() {
        let mut product = Product::new("1", "Widget", 10.0, 2);
        let err = product
            .handle_action(ProductAction::ReserveStock(3))
            .unwrap_err();
        assert_eq!(err, "Insufficient stock: 2 available, 3 requested");
        assert_eq!(product.remaining, 2);
    }
}
