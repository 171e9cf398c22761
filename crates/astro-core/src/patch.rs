//! Helpers for partial updates.
//!
//! Nullable columns are patched through `Option<Option<T>>`:
//! `None` = field absent (leave unchanged), `Some(None)` = explicit `null`
//! (clear), `Some(Some(v))` = set.

use serde::{Deserialize, Deserializer};

/// Deserializer for `Option<Option<T>>` that keeps an explicit `null`
/// distinct from a missing field. Use together with `#[serde(default)]`.
pub fn double_option<'de, T, D>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

/// Overwrite `target` with `value` when the field was supplied.
pub fn apply<T>(target: &mut T, value: Option<T>) {
    if let Some(v) = value {
        *target = v;
    }
}
