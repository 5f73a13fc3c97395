use std::{net::SocketAddr, sync::Arc};

use anyhow::Context;
use rental_wheels_server::{
	app::build_app,
	auth::{AllowAll, JwtAuthorizer, SharedAuthorizer},
	config::{Config, StoreKind},
	db_client::DbClient,
	store::{memory::InMemoryStore, DocumentStore},
};
use tokio::net::TcpListener;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
	env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

	let config = Config::from_env()?;

	let auth: SharedAuthorizer = match &config.jwt_secret {
		Some(secret) => Arc::new(JwtAuthorizer::new(secret.as_bytes())),
		None => {
			log::warn!("JWT_SECRET not set; private routes accept unauthenticated requests");
			Arc::new(AllowAll)
		}
	};

	match config.store {
		StoreKind::Mongo => {
			let uri = config.uri.as_deref().context("URI must be set")?;
			let db = DbClient::connect(uri, &config.db_name)
				.await
				.context("failed to connect to MongoDB")?;
			let served = serve(db.clone(), auth, config.port).await;
			db.shutdown().await;
			served
		}
		StoreKind::Memory => {
			log::warn!("using the in-memory store; records are lost on exit");
			serve(InMemoryStore::new(), auth, config.port).await
		}
	}
}

async fn serve<S: DocumentStore>(db: S, auth: SharedAuthorizer, port: u16) -> anyhow::Result<()> {
	let addr = SocketAddr::from(([0, 0, 0, 0], port));
	let listener = TcpListener::bind(addr).await.with_context(|| format!("failed to bind {}", addr))?;
	log::info!("Server is running on port: {}", port);

	axum::serve(listener, build_app(db, auth))
		.with_graceful_shutdown(shutdown_signal())
		.await
		.context("server error")
}

async fn shutdown_signal() {
	let ctrl_c = async {
		if let Err(e) = tokio::signal::ctrl_c().await {
			log::error!("failed to listen for ctrl-c: {}", e);
			std::future::pending::<()>().await;
		}
	};

	#[cfg(unix)]
	let terminate = async {
		match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
			Ok(mut sig) => {
				sig.recv().await;
			}
			Err(e) => {
				log::error!("failed to listen for SIGTERM: {}", e);
				std::future::pending::<()>().await;
			}
		}
	};

	#[cfg(not(unix))]
	let terminate = std::future::pending::<()>();

	tokio::select! {
		_ = ctrl_c => {},
		_ = terminate => {},
	}
	log::info!("shutting down");
}
