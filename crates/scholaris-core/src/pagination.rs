//! Page-based pagination for listing endpoints.
//!
//! Every list endpoint accepts `page` (1-indexed, default 1) and `limit`
//! (1-100, default 10) and answers with a `{ data, meta }` envelope:
//!
//! ```json
//! {
//!   "data": [...],
//!   "meta": { "page": 2, "limit": 10, "total": 42, "totalPages": 5 }
//! }
//! ```
//!
//! Filter structs embed [`PaginationParams`] with `#[serde(flatten)]`. Query
//! strings arrive as text, so the numeric fields go through
//! [`deserialize_optional_i64`] which also treats `?page=` as absent.

use serde::{Deserialize, Deserializer, Serialize};
use utoipa::{IntoParams, ToSchema};

pub const DEFAULT_PAGE: i64 = 1;
pub const DEFAULT_LIMIT: i64 = 10;
pub const MAX_LIMIT: i64 = 100;

/// Deserializes an optional string into an optional i64.
///
/// Empty strings are treated as `None`. Plain numbers are accepted too so the
/// struct still works with JSON bodies in tests.
pub fn deserialize_optional_i64<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum NumOrString {
        Num(i64),
        Str(String),
    }

    match Option::<NumOrString>::deserialize(deserializer)? {
        None => Ok(None),
        Some(NumOrString::Num(n)) => Ok(Some(n)),
        Some(NumOrString::Str(s)) if s.trim().is_empty() => Ok(None),
        Some(NumOrString::Str(s)) => s
            .trim()
            .parse::<i64>()
            .map(Some)
            .map_err(serde::de::Error::custom),
    }
}

/// Query parameters for pagination.
///
/// Out-of-range values are clamped rather than rejected: `page` to a minimum
/// of 1 and `limit` to `1..=100`.
#[derive(Debug, Clone, Default, Hash, PartialEq, Eq, Deserialize, ToSchema, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct PaginationParams {
    /// Page number (1-indexed, default: 1)
    #[serde(default, deserialize_with = "deserialize_optional_i64")]
    pub page: Option<i64>,
    /// Items per page (1-100, default: 10)
    #[serde(default, deserialize_with = "deserialize_optional_i64")]
    pub limit: Option<i64>,
}

impl PaginationParams {
    pub fn new(page: i64, limit: i64) -> Self {
        Self {
            page: Some(page),
            limit: Some(limit),
        }
    }

    pub fn page(&self) -> i64 {
        self.page.unwrap_or(DEFAULT_PAGE).max(1)
    }

    pub fn limit(&self) -> i64 {
        self.limit.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT)
    }

    /// Saturates at `i64::MAX` so absurd page numbers yield an empty page.
    pub fn offset(&self) -> i64 {
        (self.page() - 1).saturating_mul(self.limit())
    }
}

/// Metadata attached to every paginated response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct PaginationMeta {
    pub page: i64,
    pub limit: i64,
    /// Total number of matching rows across all pages
    pub total: i64,
    #[serde(rename = "totalPages")]
    pub total_pages: i64,
}

impl PaginationMeta {
    pub fn new(params: &PaginationParams, total: i64) -> Self {
        let limit = params.limit();
        let total = total.max(0);
        Self {
            page: params.page(),
            limit,
            total,
            total_pages: (total + limit - 1) / limit,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let params = PaginationParams::default();
        assert_eq!(params.page(), 1);
        assert_eq!(params.limit(), 10);
        assert_eq!(params.offset(), 0);
    }

    #[test]
    fn test_offset_from_page() {
        let params = PaginationParams::new(3, 25);
        assert_eq!(params.offset(), 50);
    }

    #[test]
    fn test_offset_saturates_on_huge_page() {
        let params: PaginationParams =
            serde_json::from_str(r#"{"page": "9223372036854775807", "limit": "10"}"#).unwrap();
        assert_eq!(params.page(), i64::MAX);
        assert_eq!(params.offset(), i64::MAX);

        let meta = PaginationMeta::new(&params, 3);
        assert_eq!(meta.total_pages, 1);
    }

    #[test]
    fn test_clamping() {
        let params = PaginationParams::new(-5, 500);
        assert_eq!(params.page(), 1);
        assert_eq!(params.limit(), 100);

        let params = PaginationParams::new(0, 0);
        assert_eq!(params.page(), 1);
        assert_eq!(params.limit(), 1);
    }

    #[test]
    fn test_total_pages_rounds_up() {
        let params = PaginationParams::new(1, 10);
        assert_eq!(PaginationMeta::new(&params, 0).total_pages, 0);
        assert_eq!(PaginationMeta::new(&params, 10).total_pages, 1);
        assert_eq!(PaginationMeta::new(&params, 11).total_pages, 2);
        assert_eq!(PaginationMeta::new(&params, 42).total_pages, 5);
    }

    #[test]
    fn test_meta_serializes_total_pages_in_camel_case() {
        let meta = PaginationMeta::new(&PaginationParams::new(2, 10), 42);
        let json = serde_json::to_value(&meta).unwrap();
        assert_eq!(json["totalPages"], 5);
        assert_eq!(json["page"], 2);
        assert!(json.get("total_pages").is_none());
    }

    #[test]
    fn test_deserialize_from_strings() {
        let params: PaginationParams =
            serde_json::from_str(r#"{"page": "2", "limit": ""}"#).unwrap();
        assert_eq!(params.page, Some(2));
        assert_eq!(params.limit, None);
    }

    #[test]
    fn test_deserialize_rejects_garbage() {
        let result: Result<PaginationParams, _> = serde_json::from_str(r#"{"page": "two"}"#);
        assert!(result.is_err());
    }
}
