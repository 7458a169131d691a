//! Filtered projections of the record lists, as shown by the list commands.

use crate::domain::{Order, Product};
use std::collections::HashMap;

/// Records that can be matched by the search box.
pub trait Searchable {
    fn search_text(&self) -> &str;
}

impl Searchable for Product {
    fn search_text(&self) -> &str {
        &self.name
    }
}

impl Searchable for Order {
    fn search_text(&self) -> &str {
        &self.product_id
    }
}

/// An order joined with the name of the product it references.
#[derive(Debug, Clone, PartialEq)]
pub struct OrderRow {
    pub order: Order,
    pub product_name: String,
}

impl Searchable for OrderRow {
    fn search_text(&self) -> &str {
        &self.product_name
    }
}

/// Keeps the records whose display field contains `query`, ignoring case.
/// Source order is preserved and the source is left untouched.
pub fn filter<T: Searchable + Clone>(records: &[T], query: &str) -> Vec<T> {
    if query.is_empty() {
        return records.to_vec();
    }
    let needle = query.to_lowercase();
    records
        .iter()
        .filter(|r| r.search_text().to_lowercase().contains(&needle))
        .cloned()
        .collect()
}

/// Resolves each order's product id to the product's name. Orders whose
/// product is unknown keep the raw id as their name.
pub fn join_product_names(orders: &[Order], products: &[Product]) -> Vec<OrderRow> {
    let names: HashMap<&str, &str> = products
        .iter()
        .map(|p| (p.id.as_str(), p.name.as_str()))
        .collect();
    orders
        .iter()
        .map(|order| OrderRow {
            product_name: names
                .get(order.product_id.as_str())
                .map_or_else(|| order.product_id.clone(), |name| name.to_string()),
            order: order.clone(),
        })
        .collect()
}

/// Memoised [`filter`] result.
///
/// The cached rows are reused until either the source version or the query
/// changes. `V` is whatever identifies a source state: a snapshot version, or
/// a pair of them for joined rows.
pub struct FilteredView<T, V = u64> {
    cached: Option<(V, String, Vec<T>)>,
    recomputed: usize,
}

impl<T, V> Default for FilteredView<T, V> {
    fn default() -> Self {
        Self {
            cached: None,
            recomputed: 0,
        }
    }
}

impl<T: Searchable + Clone, V: PartialEq + Copy> FilteredView<T, V> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&mut self, version: V, records: &[T], query: &str) -> &[T] {
        let stale = match &self.cached {
            Some((v, q, _)) => *v != version || q != query,
            None => true,
        };
        if stale {
            self.recomputed += 1;
            self.cached = Some((version, query.to_string(), filter(records, query)));
        }
        match &self.cached {
            Some((_, _, rows)) => rows,
            None => &[],
        }
    }

    /// How many times the projection has been rebuilt.
    pub fn recomputed(&self) -> usize {
        self.recomputed
    }
}
