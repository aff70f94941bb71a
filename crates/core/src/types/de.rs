//! Lenient deserializers for columns that legacy rows store inconsistently.

use serde::de::Error as _;
use serde::{Deserialize, Deserializer};

/// Deserialize `null` as the type's default value.
pub fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// Deserialize a count, reading `null` as zero and clamping out-of-range
/// values (negative stock written by hand) into `u32`.
pub fn clamped_count<'de, D>(deserializer: D) -> Result<u32, D::Error>
where
    D: Deserializer<'de>,
{
    let count = Option::<i64>::deserialize(deserializer)?.unwrap_or_default();
    Ok(u32::try_from(count.max(0)).unwrap_or(u32::MAX))
}

/// Deserialize a list of strings stored either as a JSON array or as a
/// string holding a JSON-encoded array (older product rows).
pub fn string_list<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        List(Vec<String>),
        Encoded(String),
    }

    match Option::<Raw>::deserialize(deserializer)? {
        None => Ok(Vec::new()),
        Some(Raw::List(list)) => Ok(list),
        Some(Raw::Encoded(encoded)) if encoded.trim().is_empty() => Ok(Vec::new()),
        Some(Raw::Encoded(encoded)) => serde_json::from_str(&encoded).map_err(D::Error::custom),
    }
}
