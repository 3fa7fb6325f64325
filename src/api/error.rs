use crate::error::LedgerError;
use crate::ledger::validator::{SaleInputError, REQUIRED_SALE_FIELDS};
use actix_web::{http::StatusCode, HttpResponse, ResponseError};
use serde_json::json;
use thiserror::Error;
use tracing::{error, warn};

/// Everything a handler can fail with, rendered as `{ "error": ... }`.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    Ledger(#[from] LedgerError),
    #[error(transparent)]
    SaleInput(#[from] SaleInputError),
    #[error("{0}")]
    BadRequest(String),
}

impl ResponseError for ApiError {
    fn status_code(&self) -> StatusCode {
        match self {
            ApiError::SaleInput(_) | ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Ledger(err) => match err {
                LedgerError::Validation(_)
                | LedgerError::SellerNotRegistered(_)
                | LedgerError::InvalidWallet(_) => StatusCode::BAD_REQUEST,
                LedgerError::SellerNotFound(_) | LedgerError::SaleNotFound(_) => {
                    StatusCode::NOT_FOUND
                }
                LedgerError::SellerAlreadyRegistered(_) => StatusCode::CONFLICT,
                LedgerError::InvalidChain(_)
                | LedgerError::Overflow(_)
                | LedgerError::Storage(_)
                | LedgerError::Mining(_) => StatusCode::INTERNAL_SERVER_ERROR,
            },
        }
    }

    fn error_response(&self) -> HttpResponse {
        let status = self.status_code();
        if status.is_server_error() {
            error!(error = %self, "Request failed");
        } else {
            warn!(status = status.as_u16(), error = %self, "Request rejected");
        }

        let body = match self {
            ApiError::SaleInput(SaleInputError::MissingFields) => json!({
                "error": self.to_string(),
                "required": REQUIRED_SALE_FIELDS,
            }),
            _ => json!({ "error": self.to_string() }),
        };
        HttpResponse::build(status).json(body)
    }
}
