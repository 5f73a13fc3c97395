use axum::{
	middleware,
	routing::{get, post, put},
	Router,
};
use tower_http::cors::CorsLayer;

use crate::{
	auth::{require_auth, SharedAuthorizer},
	bookings::bookings::{book_car, get_bookings},
	cars::cars::{add_car, delete_car, get_car, get_cars, update_car, update_car_status},
	store::DocumentStore,
	users::users::{get_users, upsert_user},
};

pub const LIVENESS: &str = "Rental Wheels Server is running";

async fn root() -> &'static str {
	LIVENESS
}

/// Full router over `db`. Provider and renter routes pass through `auth` first;
/// `/`, `/users` and `GET /cars/:id` are public.
pub fn build_app<S: DocumentStore>(db: S, auth: SharedAuthorizer) -> Router {
	let private = middleware::from_fn_with_state(auth, require_auth);

	Router::new()
		.route("/", get(root))
		.route("/users", get(get_users::<S>).post(upsert_user::<S>))
		.route("/cars", post(add_car::<S>).get(get_cars::<S>).route_layer(private.clone()))
		.route(
			"/cars/:id",
			get(get_car::<S>).merge(
				put(update_car::<S>)
					.patch(update_car_status::<S>)
					.delete(delete_car::<S>)
					.route_layer(private.clone()),
			),
		)
		.route("/bookings", post(book_car::<S>).get(get_bookings::<S>).route_layer(private))
		.layer(CorsLayer::permissive())
		.with_state(db)
}
