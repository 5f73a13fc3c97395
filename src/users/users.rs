use axum::{extract::State, Json};
use serde_json::Value;

use crate::{
	error::AppError,
	store::{Collection, DocumentStore, Filter, Record, UpdateResult},
};

pub async fn get_users<S: DocumentStore>(db: State<S>) -> Result<Json<Vec<Record>>, AppError> {
	let users = db.find(Collection::Users, Filter::All).await?;
	Ok(Json(users))
}

/// Upserts on `email`: one record per address, later posts overwrite the given fields.
pub async fn upsert_user<S: DocumentStore>(db: State<S>, user: Json<Record>) -> Result<Json<UpdateResult>, AppError> {
	let user = user.0;
	let email = user.get("email").cloned().unwrap_or(Value::Null);
	log::debug!("upserting user {}", email);
	let res = db.update_one(Collection::Users, Filter::eq("email", email), user, true).await?;
	Ok(Json(res))
}
