use std::{fmt, future::Future, str::FromStr};

use mongodb::bson::oid::ObjectId;
use serde::Serialize;
use serde_json::{Map, Value};

pub mod memory;

/// A schema-less record: an ordered map of top-level fields.
pub type Record = Map<String, Value>;

pub const ID_FIELD: &str = "_id";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Collection {
	Users,
	Cars,
	Bookings,
}

impl Collection {
	pub fn as_str(&self) -> &'static str {
		match self {
			Collection::Users => "users",
			Collection::Cars => "cars",
			Collection::Bookings => "bookings",
		}
	}
}

impl fmt::Display for Collection {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

/// Store-generated record identifier (12-byte object id, 24 hex digits on the wire).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RecordId(ObjectId);

impl RecordId {
	pub fn new() -> Self {
		RecordId(ObjectId::new())
	}

	pub fn object_id(&self) -> ObjectId {
		self.0
	}

	pub fn to_hex(&self) -> String {
		self.0.to_hex()
	}
}

impl Default for RecordId {
	fn default() -> Self {
		Self::new()
	}
}

impl FromStr for RecordId {
	type Err = InvalidIdentifier;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		ObjectId::parse_str(s).map(RecordId).map_err(|_| InvalidIdentifier(s.to_owned()))
	}
}

impl fmt::Display for RecordId {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(&self.0.to_hex())
	}
}

#[derive(Debug, thiserror::Error)]
#[error("input must be a 24 character hex string, got {0:?}")]
pub struct InvalidIdentifier(pub String);

/// Which records an operation applies to.
#[derive(Debug, Clone, PartialEq)]
pub enum Filter {
	All,
	Eq(String, Value),
	Id(RecordId),
}

impl Filter {
	pub fn eq(field: impl Into<String>, value: impl Into<Value>) -> Self {
		Filter::Eq(field.into(), value.into())
	}

	/// Equality on `field` when the query value is present and non-empty, otherwise everything.
	pub fn eq_if_present(field: &str, value: Option<String>) -> Self {
		match value {
			Some(v) if !v.is_empty() => Filter::eq(field, v),
			_ => Filter::All,
		}
	}

	pub fn matches(&self, record: &Record) -> bool {
		match self {
			Filter::All => true,
			// a null match also selects records missing the field
			Filter::Eq(field, Value::Null) => record.get(field).map_or(true, Value::is_null),
			Filter::Eq(field, value) => record.get(field) == Some(value),
			Filter::Id(id) => record.get(ID_FIELD).and_then(Value::as_str) == Some(id.to_hex().as_str()),
		}
	}
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InsertResult {
	pub acknowledged: bool,
	pub inserted_id: Value,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateResult {
	pub acknowledged: bool,
	pub matched_count: u64,
	pub modified_count: u64,
	pub upserted_id: Option<Value>,
	pub upserted_count: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteResult {
	pub acknowledged: bool,
	pub deleted_count: u64,
}

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
	#[error("database error: {0}")]
	Driver(#[from] mongodb::error::Error),
	#[error("record conversion failed: {0}")]
	Conversion(String),
	#[error("duplicate key {key} in collection {collection}")]
	DuplicateKey { collection: Collection, key: String },
	#[error("performing an update on the path '_id' would modify the immutable field '_id' in collection {collection}")]
	ImmutableId { collection: Collection },
}

/// A document database grouped into named collections.
///
/// Handlers issue exactly one call per request. Implementations are cheap to
/// clone and share one underlying connection.
pub trait DocumentStore: Clone + Send + Sync + 'static {
	fn find(&self, coll: Collection, filter: Filter) -> impl Future<Output = Result<Vec<Record>, StoreError>> + Send;

	fn find_one(&self, coll: Collection, filter: Filter) -> impl Future<Output = Result<Option<Record>, StoreError>> + Send;

	fn insert_one(&self, coll: Collection, record: Record) -> impl Future<Output = Result<InsertResult, StoreError>> + Send;

	/// Sets every top-level field of `set` on the first match; with `upsert`, inserts when nothing matches.
	fn update_one(
		&self,
		coll: Collection,
		filter: Filter,
		set: Record,
		upsert: bool,
	) -> impl Future<Output = Result<UpdateResult, StoreError>> + Send;

	fn delete_one(&self, coll: Collection, filter: Filter) -> impl Future<Output = Result<DeleteResult, StoreError>> + Send;
}
