/// Stock movements applied to a product in place.
///
/// Both are reversible: a failed remote update restores the previous record,
/// and a committed movement is undone by applying its [`inverse`](Self::inverse).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProductAction {
    /// Takes stock for an order.
    ///
    /// # Errors
    /// Rejected if the amount exceeds the remaining stock.
    ReserveStock(u32),
    /// Puts stock back after an order is removed.
    ReleaseStock(u32),
}

impl ProductAction {
    pub fn inverse(self) -> Self {
        match self {
            ProductAction::ReserveStock(n) => ProductAction::ReleaseStock(n),
            ProductAction::ReleaseStock(n) => ProductAction::ReserveStock(n),
        }
    }

    /// Signed change this action makes to `remaining`.
    pub fn delta(self) -> i64 {
        match self {
            ProductAction::ReserveStock(n) => -i64::from(n),
            ProductAction::ReleaseStock(n) => i64::from(n),
        }
    }
}
