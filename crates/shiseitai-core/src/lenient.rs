//! Field deserializers that read a value of the wrong JSON type as absent.
//!
//! Caller configs are never rejected: a string where a number belongs, or a
//! number where an object belongs, deserializes to `None` (or the type's
//! default) and normalization then applies the documented fallback.

use serde::de::IgnoredAny;
use serde::{Deserialize, Deserializer};

#[derive(Deserialize)]
#[serde(untagged)]
enum Lenient<T> {
    Valid(T),
    Invalid(IgnoredAny),
}

impl<T> Lenient<T> {
    fn into_option(self) -> Option<T> {
        match self {
            Self::Valid(value) => Some(value),
            Self::Invalid(_) => None,
        }
    }
}

/// `Option<T>` where an unreadable value becomes `None`.
pub fn option<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Ok(Option::<Lenient<T>>::deserialize(deserializer)?.and_then(Lenient::into_option))
}

/// `T` where an unreadable value becomes `T::default()`.
pub fn or_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + Default,
{
    Ok(option(deserializer)?.unwrap_or_default())
}

/// Optional list whose unreadable entries become `T::default()`; a non-list becomes `None`.
pub fn option_vec<'de, D, T>(deserializer: D) -> Result<Option<Vec<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + Default,
{
    let entries: Option<Vec<Lenient<T>>> = option(deserializer)?;
    Ok(entries.map(|entries| {
        entries
            .into_iter()
            .map(|entry| entry.into_option().unwrap_or_default())
            .collect()
    }))
}
