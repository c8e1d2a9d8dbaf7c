use anyhow::Error as AnyhowError;
use axum::{
    extract::Json,
    http::{StatusCode, header::InvalidHeaderName},
    response::{IntoResponse, Response},
};
use log::error;
use postgres_query::Error as PqError;
use serde::Serialize;
use stack_string::{StackString, format_sstr};
use std::{
    fmt::{Debug, Error as FmtError},
    net::AddrParseError,
};
use thiserror::Error;
use time::error::{Format as TimeFormatError, Parse as TimeParseError};
use tokio::task::JoinError;

use crate::session::LOGIN_HTML;

#[derive(Error, Debug)]
pub enum ServiceError {
    #[error("AddrParseError {0}")]
    AddrParseError(#[from] AddrParseError),
    #[error("InvalidHeaderName {0}")]
    InvalidHeaderName(#[from] InvalidHeaderName),
    #[error("Internal Server Error")]
    InternalServerError,
    #[error("BadRequest: {}", _0)]
    BadRequest(StackString),
    #[error("Unauthorized")]
    Unauthorized,
    #[error("Anyhow error {0}")]
    AnyhowError(#[from] AnyhowError),
    #[error("io Error {0}")]
    IoError(#[from] std::io::Error),
    #[error("tokio join error {0}")]
    JoinError(#[from] JoinError),
    #[error("PqError {0}")]
    PqError(#[from] PqError),
    #[error("FmtError {0}")]
    FmtError(#[from] FmtError),
    #[error("TimeFormatError {0}")]
    TimeFormatError(#[from] TimeFormatError),
    #[error("TimeParseError {0}")]
    TimeParseError(#[from] TimeParseError),
}

#[derive(Serialize)]
struct ErrorMessage {
    message: StackString,
}

impl IntoResponse for ErrorMessage {
    fn into_response(self) -> Response {
        Json(self).into_response()
    }
}

impl IntoResponse for ServiceError {
    fn into_response(self) -> Response {
        match self {
            Self::Unauthorized => (StatusCode::OK, axum::response::Html(LOGIN_HTML)).into_response(),
            Self::BadRequest(s) => {
                (StatusCode::BAD_REQUEST, ErrorMessage { message: s }).into_response()
            }
            e => {
                error!("{e}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    ErrorMessage {
                        message: format_sstr!("Internal Server Error: {e}"),
                    },
                )
                    .into_response()
            }
        }
    }
}

#[cfg(test)]
mod test {
    use crate::errors::ServiceError as Error;

    #[test]
    fn test_bad_request_message() {
        let err = Error::BadRequest("conflicts with standup".into());
        assert_eq!(err.to_string(), "BadRequest: conflicts with standup");
    }
}
