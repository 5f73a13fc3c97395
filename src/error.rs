use axum::{
	response::{IntoResponse, Response},
	Json,
};
use hyper::StatusCode;
use serde_json::json;

use crate::store::{InvalidIdentifier, StoreError};

/// Everything a handler can fail with. All of it surfaces as a 500, there is no
/// separate client-error mapping for malformed identifiers.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
	#[error(transparent)]
	InvalidIdentifier(#[from] InvalidIdentifier),
	#[error(transparent)]
	Store(#[from] StoreError),
}

impl AppError {
	fn code(&self) -> &'static str {
		match self {
			AppError::InvalidIdentifier(_) => "invalid_identifier",
			AppError::Store(_) => "store_error",
		}
	}
}

pub fn json_error(status: StatusCode, code: &'static str, message: impl Into<String>) -> Response {
	let body = json!({
		"error": code,
		"message": message.into(),
	});
	(status, Json(body)).into_response()
}

impl IntoResponse for AppError {
	fn into_response(self) -> Response {
		log::error!("{}: {}", self.code(), self);
		json_error(StatusCode::INTERNAL_SERVER_ERROR, self.code(), self.to_string())
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::store::RecordId;

	#[test]
	fn malformed_identifier_is_a_server_error() {
		let err: AppError = "nope".parse::<RecordId>().unwrap_err().into();
		assert_eq!(err.code(), "invalid_identifier");
		assert_eq!(err.into_response().status(), StatusCode::INTERNAL_SERVER_ERROR);
	}

	#[test]
	fn json_error_keeps_status() {
		assert_eq!(json_error(StatusCode::UNAUTHORIZED, "unauthorized", "no").status(), StatusCode::UNAUTHORIZED);
	}
}
