use crate::actor_framework::Entity;
use crate::domain::{Order, OrderDraft};
use crate::remote::Collection;

impl Entity for Order {
    type Draft = OrderDraft;
    type Action = ();

    const COLLECTION: Collection = Collection::Orders;

    fn id(&self) -> &str {
        &self.id
    }

    fn set_id(&mut self, id: String) {
        self.id = id;
    }

    fn from_draft(id: String, draft: OrderDraft) -> Self {
        Self {
            id,
            product_id: draft.product_id,
            quantity: draft.quantity,
            amount: draft.amount,
            date: draft.date,
        }
    }

    /// Orders are never edited once placed.
    fn handle_action(&mut self, _action: ()) -> Result<(), String> {
        Err(format!("order {} cannot be updated in place", self.id))
    }
}
