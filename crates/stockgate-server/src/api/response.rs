//! API response types

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};

/// Standard success response wrapper
#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: T,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub meta: Option<serde_json::Value>,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            data,
            meta: None,
        }
    }

    pub fn success_with_meta(data: T, meta: serde_json::Value) -> Self {
        Self {
            success: true,
            data,
            meta: Some(meta),
        }
    }
}

impl<T: Serialize> IntoResponse for ApiResponse<T> {
    fn into_response(self) -> Response {
        (StatusCode::OK, Json(self)).into_response()
    }
}

/// Offset pagination metadata for list responses
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaginationMeta {
    pub offset: usize,
    pub limit: usize,
    pub total: usize,
    pub has_more: bool,
}

impl PaginationMeta {
    pub fn new(offset: usize, limit: usize, total: usize) -> Self {
        Self {
            offset,
            limit,
            total,
            has_more: offset.saturating_add(limit) < total,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_pagination_has_more() {
        assert!(PaginationMeta::new(0, 10, 25).has_more);
        assert!(!PaginationMeta::new(20, 10, 25).has_more);
        assert!(!PaginationMeta::new(0, usize::MAX, 3).has_more);
    }

    #[test]
    fn test_envelope_omits_missing_meta() {
        let json = serde_json::to_value(ApiResponse::success(vec![1, 2])).unwrap();
        assert_eq!(json["success"], true);
        assert!(json.get("meta").is_none());
    }
}
