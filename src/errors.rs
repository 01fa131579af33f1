use axum::{
    extract::{rejection::JsonRejection, FromRequest},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Authentication failed: {0}")]
    Auth(String),

    #[error("Access denied: {0}")]
    Forbidden(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Product id {product_id} has no variant id {variant_id}")]
    UnknownVariant { product_id: i64, variant_id: i64 },

    #[error("Insufficient stock for product id {product_id}")]
    OutOfStock { product_id: i64 },

    #[error("Order number {0} already exists")]
    DuplicateOrder(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("{0}")]
    RateLimited(String),

    #[error("Error: {0}")]
    Internal(String),
}

pub type AppResult<T> = Result<T, AppError>;

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Database(_) | AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::Auth(_) => StatusCode::UNAUTHORIZED,
            AppError::Forbidden(_) => StatusCode::FORBIDDEN,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Validation(_)
            | AppError::UnknownVariant { .. }
            | AppError::OutOfStock { .. } => StatusCode::BAD_REQUEST,
            AppError::DuplicateOrder(_) | AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::RateLimited(_) => StatusCode::TOO_MANY_REQUESTS,
        }
    }

    /// Message safe to hand to the client. Storage details stay in the logs.
    pub fn public_message(&self) -> String {
        match self {
            AppError::Database(_) => "Internal storage error".to_string(),
            other => other.to_string(),
        }
    }
}

/// Lift a `validation` helper result into the error type.
impl From<String> for AppError {
    fn from(msg: String) -> Self {
        AppError::Validation(msg)
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        AppError::Validation(rejection.body_text())
    }
}

/// `Json` extractor whose rejections use the error envelope.
#[derive(FromRequest)]
#[from_request(via(Json), rejection(AppError))]
pub struct ApiJson<T>(pub T);

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub status: u16,
    pub message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();

        match &self {
            AppError::Database(e) => {
                tracing::error!(target: "DATABASE", error = %e, "storage failure");
            }
            AppError::Internal(msg) => {
                tracing::error!(target: "APP", error = %msg, "internal failure");
            }
            other => {
                tracing::debug!(target: "APP", status = status.as_u16(), "{other}");
            }
        }

        let body = ErrorBody {
            status: status.as_u16(),
            message: self.public_message(),
        };

        (status, Json(body)).into_response()
    }
}

/// Success envelope: `{"status": 200, "data": ...}`.
#[derive(Debug, Serialize)]
pub struct ApiResponse<T: Serialize> {
    pub status: u16,
    pub data: T,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn ok(data: T) -> Self {
        Self { status: 200, data }
    }
}

impl<T: Serialize> IntoResponse for ApiResponse<T> {
    fn into_response(self) -> Response {
        let status = StatusCode::from_u16(self.status).unwrap_or(StatusCode::OK);
        (status, Json(self)).into_response()
    }
}

/// Handler return type.
pub type ApiResult<T> = Result<ApiResponse<T>, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn order_flow_errors_are_client_errors() {
        assert_eq!(
            AppError::OutOfStock { product_id: 3 }.status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            AppError::UnknownVariant {
                product_id: 1,
                variant_id: 9
            }
            .status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            AppError::DuplicateOrder("A-1".into()).status(),
            StatusCode::CONFLICT
        );
    }

    #[test]
    fn storage_errors_hide_details() {
        let err = AppError::Database(sqlx::Error::RowNotFound);
        assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(err.public_message(), "Internal storage error");
    }

    #[test]
    fn out_of_stock_names_the_product() {
        let msg = AppError::OutOfStock { product_id: 42 }.to_string();
        assert!(msg.contains("42"));
    }
}
