use axum::{
	extract::{Query, State},
	Json,
};

use crate::{
	error::AppError,
	store::{Collection, DocumentStore, Filter, InsertResult, Record},
};

#[derive(serde::Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct RenterQuery {
	renter_id: Option<String>,
}

pub async fn book_car<S: DocumentStore>(db: State<S>, booking: Json<Record>) -> Result<Json<InsertResult>, AppError> {
	let res = db.insert_one(Collection::Bookings, booking.0).await?;
	log::debug!("inserted booking {}", res.inserted_id);
	Ok(Json(res))
}

pub async fn get_bookings<S: DocumentStore>(db: State<S>, query: Query<RenterQuery>) -> Result<Json<Vec<Record>>, AppError> {
	let filter = Filter::eq_if_present("renterId", query.0.renter_id);
	let bookings = db.find(Collection::Bookings, filter).await?;
	Ok(Json(bookings))
}
