//! Serde helpers for reading model replies.

use serde::{Deserialize, Deserializer};

/// Reads an explicit `null` the same way `#[serde(default)]` reads a missing
/// field.
pub fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}
