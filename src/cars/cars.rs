use axum::{
	extract::{Path, Query, State},
	Json,
};
use serde_json::Value;

use crate::{
	error::AppError,
	store::{Collection, DeleteResult, DocumentStore, Filter, InsertResult, Record, RecordId, UpdateResult},
};

#[derive(serde::Deserialize, Debug)]
pub struct ProviderQuery {
	email: Option<String>,
}

#[derive(serde::Deserialize, Debug)]
pub struct StatusUpdate {
	#[serde(default)]
	status: Value,
}

pub async fn add_car<S: DocumentStore>(db: State<S>, car: Json<Record>) -> Result<Json<InsertResult>, AppError> {
	let res = db.insert_one(Collection::Cars, car.0).await?;
	log::debug!("inserted car {}", res.inserted_id);
	Ok(Json(res))
}

pub async fn get_car<S: DocumentStore>(db: State<S>, Path(id): Path<String>) -> Result<Json<Option<Record>>, AppError> {
	let id: RecordId = id.parse()?;
	let car = db.find_one(Collection::Cars, Filter::Id(id)).await?;
	Ok(Json(car))
}

/// All cars, or only the ones listed by `?email=<provider>`.
pub async fn get_cars<S: DocumentStore>(db: State<S>, query: Query<ProviderQuery>) -> Result<Json<Vec<Record>>, AppError> {
	let filter = Filter::eq_if_present("providerEmail", query.0.email);
	let cars = db.find(Collection::Cars, filter).await?;
	Ok(Json(cars))
}

pub async fn update_car<S: DocumentStore>(
	db: State<S>,
	Path(id): Path<String>,
	car: Json<Record>,
) -> Result<Json<UpdateResult>, AppError> {
	let id: RecordId = id.parse()?;
	log::debug!("updating car {}", id);
	let res = db.update_one(Collection::Cars, Filter::Id(id), car.0, false).await?;
	Ok(Json(res))
}

pub async fn update_car_status<S: DocumentStore>(
	db: State<S>,
	Path(id): Path<String>,
	update: Json<StatusUpdate>,
) -> Result<Json<UpdateResult>, AppError> {
	let id: RecordId = id.parse()?;
	let mut set = Record::new();
	set.insert("status".to_owned(), update.0.status);
	log::debug!("setting status of car {} to {}", id, set["status"]);
	let res = db.update_one(Collection::Cars, Filter::Id(id), set, false).await?;
	Ok(Json(res))
}

pub async fn delete_car<S: DocumentStore>(db: State<S>, Path(id): Path<String>) -> Result<Json<DeleteResult>, AppError> {
	let id: RecordId = id.parse()?;
	let res = db.delete_one(Collection::Cars, Filter::Id(id)).await?;
	if res.deleted_count == 0 {
		log::debug!("no car {} to delete", id);
	}
	Ok(Json(res))
}
