//! Deserialization helpers for query strings and PATCH bodies.

use serde::{Deserialize, Deserializer};
use uuid::Uuid;

/// Parses `?class_id=` as `None` instead of failing on the empty string.
pub fn deserialize_optional_uuid<'de, D>(deserializer: D) -> Result<Option<Uuid>, D::Error>
where
    D: Deserializer<'de>,
{
    let opt: Option<String> = Option::deserialize(deserializer)?;
    match opt {
        Some(s) if s.is_empty() => Ok(None),
        Some(s) => Uuid::parse_str(&s)
            .map(Some)
            .map_err(serde::de::Error::custom),
        None => Ok(None),
    }
}

/// Empty search strings are dropped so they don't turn into `ILIKE '%%'`.
pub fn deserialize_optional_trimmed<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let opt: Option<String> = Option::deserialize(deserializer)?;
    Ok(opt
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty()))
}

/// Keeps an explicit `null` apart from a missing field in PATCH bodies.
///
/// Use with `#[serde(default)]`: a missing field stays `None`, `null` becomes
/// `Some(None)` and a value becomes `Some(Some(v))`.
pub fn deserialize_nullable<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Deserialize)]
    struct Query {
        #[serde(default, deserialize_with = "deserialize_optional_uuid")]
        id: Option<Uuid>,
        #[serde(default, deserialize_with = "deserialize_optional_trimmed")]
        search: Option<String>,
    }

    #[test]
    fn test_empty_values_are_none() {
        let q: Query = serde_json::from_str(r#"{"id": "", "search": "   "}"#).unwrap();
        assert!(q.id.is_none());
        assert!(q.search.is_none());
    }

    #[test]
    fn test_values_are_parsed() {
        let id = Uuid::new_v4();
        let q: Query =
            serde_json::from_str(&format!(r#"{{"id": "{}", "search": " math "}}"#, id)).unwrap();
        assert_eq!(q.id, Some(id));
        assert_eq!(q.search.as_deref(), Some("math"));
    }

    #[derive(Deserialize)]
    struct Patch {
        #[serde(default, deserialize_with = "deserialize_nullable")]
        class_id: Option<Option<Uuid>>,
    }

    #[test]
    fn test_nullable_distinguishes_missing_from_null() {
        let missing: Patch = serde_json::from_str("{}").unwrap();
        assert_eq!(missing.class_id, None);

        let cleared: Patch = serde_json::from_str(r#"{"class_id": null}"#).unwrap();
        assert_eq!(cleared.class_id, Some(None));

        let id = Uuid::new_v4();
        let set: Patch = serde_json::from_str(&format!(r#"{{"class_id": "{}"}}"#, id)).unwrap();
        assert_eq!(set.class_id, Some(Some(id)));
    }

    #[test]
    fn test_invalid_uuid_fails() {
        let result: Result<Query, _> = serde_json::from_str(r#"{"id": "nope"}"#);
        assert!(result.is_err());
    }
}
