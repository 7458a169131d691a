pub mod order;
pub mod product;

pub use order::*;
pub use product::*;

use serde::{Deserialize, Deserializer};

/// Accepts ids sent either as JSON strings or as numbers.
///
/// The REST service hands out numeric ids while the client works with
/// strings throughout, so both shapes decode to the same `String`.
pub fn id_from_str_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum RawId {
        Text(String),
        Int(u64),
        Float(f64),
    }

    Ok(match RawId::deserialize(deserializer)? {
        RawId::Text(text) => text,
        RawId::Int(n) => n.to_string(),
        RawId::Float(n) => n.to_string(),
    })
}
