use axum::http::StatusCode;
use serde::Serialize;

use crate::extract::Json;

/// Envelope shared by every JSON endpoint.
#[derive(Debug, Serialize)]
pub struct ApiResponse<T: Serialize> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<&'static str>,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn data(data: T) -> Self {
        Self {
            success: true,
            message: None,
            data: Some(data),
            error: None,
        }
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }
}

impl ApiResponse<()> {
    pub fn failure(message: impl Into<String>, code: &'static str) -> Self {
        Self {
            success: false,
            message: Some(message.into()),
            data: None,
            error: Some(code),
        }
    }
}

pub type JsonOk<T> = Json<ApiResponse<T>>;
pub type JsonCreated<T> = (StatusCode, Json<ApiResponse<T>>);

pub fn ok<T: Serialize>(data: T) -> JsonOk<T> {
    Json(ApiResponse::data(data))
}

pub fn created<T: Serialize>(data: T) -> JsonCreated<T> {
    (StatusCode::CREATED, Json(ApiResponse::data(data)))
}

/// Query string shared by the listing endpoints.
#[derive(Debug, Clone, Copy, serde::Deserialize)]
pub struct Pagination {
    #[serde(default = "default_limit")]
    pub limit: i64,
    #[serde(default)]
    pub offset: i64,
}

fn default_limit() -> i64 {
    20
}

impl Pagination {
    pub const MAX_LIMIT: i64 = 100;

    /// Limit clamped to 1..=100 and a non-negative offset.
    pub fn clamped(self) -> (i64, i64) {
        (self.limit.clamp(1, Self::MAX_LIMIT), self.offset.max(0))
    }
}

impl Default for Pagination {
    fn default() -> Self {
        Self {
            limit: default_limit(),
            offset: 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn failure_envelope_omits_data() {
        let json = serde_json::to_value(ApiResponse::failure("nope", "forbidden")).unwrap();
        assert_eq!(json["success"], false);
        assert_eq!(json["message"], "nope");
        assert_eq!(json["error"], "forbidden");
        assert!(json.get("data").is_none());
    }

    #[test]
    fn pagination_is_clamped() {
        let p = Pagination { limit: 10_000, offset: -5 };
        assert_eq!(p.clamped(), (100, 0));
        let p = Pagination { limit: 0, offset: 3 };
        assert_eq!(p.clamped(), (1, 3));
    }
}
