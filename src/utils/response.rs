use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use serde_json::Value;

#[derive(Serialize)]
pub struct ApiResponse<T>
where
    T: Serialize,
{
    pub success: bool,
    pub data: Option<T>,
    pub message: Option<String>,
}

#[derive(Serialize)]
pub struct ApiErrorBody {
    pub code: String,
    pub message: String,
    pub details: Option<Value>,
}

#[derive(Serialize)]
pub struct ApiErrorResponse {
    pub success: bool,
    pub error: ApiErrorBody,
}

pub fn success<T>(data: T, message: impl Into<String>) -> impl IntoResponse
where
    T: Serialize,
{
    let body = ApiResponse {
        success: true,
        data: Some(data),
        message: Some(message.into()),
    };
    (StatusCode::OK, Json(body))
}

pub fn error(
    code: &str,
    message: impl Into<String>,
    details: Option<Value>,
    status: StatusCode,
) -> Response {
    let body = ApiErrorResponse {
        success: false,
        error: ApiErrorBody {
            code: code.to_string(),
            message: message.into(),
            details,
        },
    };

    (status, Json(body)).into_response()
}

/// Expected business outcomes that block an operation (the event still has
/// orders, the account still owns events) are ordinary 200 responses with a
/// structured payload, not errors. Callers branch on `deleted`.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct DeletionOutcome {
    pub deleted: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<Value>,
}

impl DeletionOutcome {
    pub fn deleted() -> Self {
        Self {
            deleted: true,
            message: None,
            details: None,
        }
    }

    pub fn blocked(message: impl Into<String>, details: Option<Value>) -> Self {
        Self {
            deleted: false,
            message: Some(message.into()),
            details,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn blocked_outcome_serializes_reason_and_details() {
        let outcome = DeletionOutcome::blocked(
            "Event has orders",
            Some(json!({ "orders": 3 })),
        );
        let value = serde_json::to_value(&outcome).unwrap();
        assert_eq!(value["deleted"], false);
        assert_eq!(value["message"], "Event has orders");
        assert_eq!(value["details"]["orders"], 3);
    }

    #[test]
    fn deleted_outcome_omits_empty_fields() {
        let value = serde_json::to_value(DeletionOutcome::deleted()).unwrap();
        assert_eq!(value, json!({ "deleted": true }));
    }
}
