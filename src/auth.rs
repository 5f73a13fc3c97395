//! Authorization boundary for routes that act on behalf of a provider or renter.
//!
//! The routes have always been reachable without credentials. `AllowAll` keeps
//! that behaviour; `JwtAuthorizer` enforces HS256 bearer tokens when a secret is
//! configured.

use std::sync::Arc;

use axum::{
	extract::{Request, State},
	http::HeaderMap,
	middleware::Next,
	response::{IntoResponse, Response},
};
use hyper::StatusCode;
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};

use crate::error::json_error;

/// Identity of the caller, inserted into request extensions once authorized.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Principal {
	pub subject: String,
}

#[derive(Debug, PartialEq, Eq, thiserror::Error)]
pub enum AuthError {
	#[error("missing bearer token")]
	MissingToken,
	#[error("invalid bearer token")]
	InvalidToken,
}

impl IntoResponse for AuthError {
	fn into_response(self) -> Response {
		json_error(StatusCode::UNAUTHORIZED, "unauthorized", self.to_string())
	}
}

pub trait Authorizer: Send + Sync {
	/// `Ok(None)` lets the request through anonymously.
	fn authorize(&self, headers: &HeaderMap) -> Result<Option<Principal>, AuthError>;
}

pub struct AllowAll;

impl Authorizer for AllowAll {
	fn authorize(&self, _headers: &HeaderMap) -> Result<Option<Principal>, AuthError> {
		Ok(None)
	}
}

#[derive(serde::Deserialize)]
struct Claims {
	sub: String,
}

pub struct JwtAuthorizer {
	key: DecodingKey,
	validation: Validation,
}

impl JwtAuthorizer {
	pub fn new(secret: &[u8]) -> Self {
		let mut validation = Validation::new(Algorithm::HS256);
		validation.set_required_spec_claims(&["exp", "sub"]);
		JwtAuthorizer {
			key: DecodingKey::from_secret(secret),
			validation,
		}
	}
}

impl Authorizer for JwtAuthorizer {
	fn authorize(&self, headers: &HeaderMap) -> Result<Option<Principal>, AuthError> {
		let token = bearer_token(headers)?;
		let data = decode::<Claims>(token, &self.key, &self.validation).map_err(|e| {
			log::debug!("rejected token: {}", e);
			AuthError::InvalidToken
		})?;
		Ok(Some(Principal { subject: data.claims.sub }))
	}
}

fn bearer_token(headers: &HeaderMap) -> Result<&str, AuthError> {
	let header = headers
		.get(axum::http::header::AUTHORIZATION)
		.ok_or(AuthError::MissingToken)?
		.to_str()
		.map_err(|_| AuthError::InvalidToken)?;
	let token = header.strip_prefix("Bearer ").ok_or(AuthError::InvalidToken)?.trim();
	if token.is_empty() {
		return Err(AuthError::MissingToken);
	}
	Ok(token)
}

pub type SharedAuthorizer = Arc<dyn Authorizer>;

pub async fn require_auth(State(auth): State<SharedAuthorizer>, mut req: Request, next: Next) -> Result<Response, AuthError> {
	if let Some(principal) = auth.authorize(req.headers())? {
		log::debug!("{} {} as {}", req.method(), req.uri().path(), principal.subject);
		req.extensions_mut().insert(principal);
	}
	Ok(next.run(req).await)
}
