use std::str::FromStr;

pub const DEFAULT_PORT: u16 = 3000;
pub const DEFAULT_DB_NAME: &str = "rentalwheels";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreKind {
	Mongo,
	Memory,
}

impl FromStr for StoreKind {
	type Err = ConfigError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		match s.to_ascii_lowercase().as_str() {
			"mongo" | "mongodb" => Ok(StoreKind::Mongo),
			"memory" => Ok(StoreKind::Memory),
			other => Err(ConfigError::Invalid {
				var: "STORE",
				value: other.to_owned(),
			}),
		}
	}
}

#[derive(Debug, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
	#[error("environment variable {0} must be set")]
	Missing(&'static str),
	#[error("environment variable {var} has an invalid value {value:?}")]
	Invalid { var: &'static str, value: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
	pub store: StoreKind,
	/// Connection string, only required for the Mongo store.
	pub uri: Option<String>,
	pub db_name: String,
	pub port: u16,
	pub jwt_secret: Option<String>,
}

impl Config {
	pub fn from_env() -> Result<Self, ConfigError> {
		Self::from_lookup(|key| std::env::var(key).ok())
	}

	pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
		let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

		let store = match get("STORE") {
			Some(v) => v.parse()?,
			None => StoreKind::Mongo,
		};
		let uri = get("URI");
		if store == StoreKind::Mongo && uri.is_none() {
			return Err(ConfigError::Missing("URI"));
		}
		let port = match get("PORT") {
			Some(v) => v.trim().parse().map_err(|_| ConfigError::Invalid { var: "PORT", value: v })?,
			None => DEFAULT_PORT,
		};

		Ok(Config {
			store,
			uri,
			db_name: get("DB_NAME").unwrap_or_else(|| DEFAULT_DB_NAME.to_owned()),
			port,
			jwt_secret: get("JWT_SECRET"),
		})
	}
}
