use mongodb::{
	bson::{self, doc, Bson, Document},
	options::{ClientOptions, ServerApi, ServerApiVersion, UpdateOptions},
	Client, Database,
};
use serde_json::Value;

use crate::store::{Collection, DeleteResult, DocumentStore, Filter, InsertResult, Record, StoreError, UpdateResult};

/// Shared MongoDB handle. Created once at startup and cloned into every request.
#[derive(Clone)]
pub struct DbClient {
	client: Client,
	db: Database,
}

impl DbClient {
	pub async fn connect(uri: &str, db_name: &str) -> Result<Self, StoreError> {
		let mut options = ClientOptions::parse(uri).await?;
		options.server_api = Some(
			ServerApi::builder()
				.version(ServerApiVersion::V1)
				.strict(true)
				.deprecation_errors(true)
				.build(),
		);
		let client = Client::with_options(options)?;

		client.database("admin").run_command(doc! { "ping": 1 }, None).await?;
		log::info!("Pinged your deployment. Successfully connected to MongoDB");

		let db = client.database(db_name);
		Ok(DbClient { client, db })
	}

	pub async fn shutdown(self) {
		self.client.shutdown().await;
		log::info!("MongoDB client closed");
	}

	fn collection(&self, coll: Collection) -> mongodb::Collection<Document> {
		self.db.collection(coll.as_str())
	}
}

fn to_bson(value: &Value) -> Result<Bson, StoreError> {
	bson::to_bson(value).map_err(|e| StoreError::Conversion(e.to_string()))
}

fn to_document(record: &Record) -> Result<Document, StoreError> {
	bson::to_document(record).map_err(|e| StoreError::Conversion(e.to_string()))
}

fn filter_document(filter: &Filter) -> Result<Document, StoreError> {
	Ok(match filter {
		Filter::All => Document::new(),
		Filter::Eq(field, value) => {
			let mut d = Document::new();
			d.insert(field.as_str(), to_bson(value)?);
			d
		}
		Filter::Id(id) => doc! { "_id": id.object_id() },
	})
}

/// Relaxed extended JSON, with object ids flattened to their hex string.
fn to_json(value: Bson) -> Value {
	flatten_object_ids(value.into_relaxed_extjson())
}

fn flatten_object_ids(value: Value) -> Value {
	match value {
		Value::Object(map) => {
			if map.len() == 1 {
				if let Some(Value::String(hex)) = map.get("$oid") {
					return Value::String(hex.clone());
				}
			}
			Value::Object(map.into_iter().map(|(k, v)| (k, flatten_object_ids(v))).collect())
		}
		Value::Array(items) => Value::Array(items.into_iter().map(flatten_object_ids).collect()),
		other => other,
	}
}

fn to_record(document: Document) -> Record {
	match to_json(Bson::Document(document)) {
		Value::Object(map) => map,
		_ => Record::new(),
	}
}

impl DocumentStore for DbClient {
	async fn find(&self, coll: Collection, filter: Filter) -> Result<Vec<Record>, StoreError> {
		let mut cursor = self.collection(coll).find(filter_document(&filter)?, None).await?;
		let mut records = Vec::new();
		while cursor.advance().await? {
			let document: Document = cursor.deserialize_current()?;
			records.push(to_record(document));
		}
		Ok(records)
	}

	async fn find_one(&self, coll: Collection, filter: Filter) -> Result<Option<Record>, StoreError> {
		let document = self.collection(coll).find_one(filter_document(&filter)?, None).await?;
		Ok(document.map(to_record))
	}

	async fn insert_one(&self, coll: Collection, record: Record) -> Result<InsertResult, StoreError> {
		let res = self.collection(coll).insert_one(to_document(&record)?, None).await?;
		Ok(InsertResult {
			acknowledged: true,
			inserted_id: to_json(res.inserted_id),
		})
	}

	async fn update_one(&self, coll: Collection, filter: Filter, set: Record, upsert: bool) -> Result<UpdateResult, StoreError> {
		let update = doc! { "$set": to_document(&set)? };
		let options = UpdateOptions::builder().upsert(upsert).build();
		let res = self.collection(coll).update_one(filter_document(&filter)?, update, options).await?;
		let upserted_count = u64::from(res.upserted_id.is_some());
		Ok(UpdateResult {
			acknowledged: true,
			matched_count: res.matched_count,
			modified_count: res.modified_count,
			upserted_id: res.upserted_id.map(to_json),
			upserted_count,
		})
	}

	async fn delete_one(&self, coll: Collection, filter: Filter) -> Result<DeleteResult, StoreError> {
		let res = self.collection(coll).delete_one(filter_document(&filter)?, None).await?;
		Ok(DeleteResult {
			acknowledged: true,
			deleted_count: res.deleted_count,
		})
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::store::RecordId;
	use mongodb::bson::oid::ObjectId;
	use serde_json::json;

	#[test]
	fn object_ids_become_hex_strings() {
		let oid = ObjectId::parse_str("65f1a2b3c4d5e6f708192a3b").unwrap();
		let record = to_record(doc! { "_id": oid, "model": "Premio", "seats": 5_i32, "owners": [oid] });
		assert_eq!(
			Value::Object(record),
			json!({
				"_id": "65f1a2b3c4d5e6f708192a3b",
				"model": "Premio",
				"seats": 5,
				"owners": ["65f1a2b3c4d5e6f708192a3b"],
			})
		);
	}

	#[test]
	fn id_filter_uses_object_id() {
		let id: RecordId = "65f1a2b3c4d5e6f708192a3b".parse().unwrap();
		let filter = filter_document(&Filter::Id(id)).unwrap();
		assert_eq!(filter.get_object_id("_id").unwrap(), id.object_id());
	}

	#[test]
	fn equality_filter_keeps_value() {
		let filter = filter_document(&Filter::eq("providerEmail", "p@x.io")).unwrap();
		assert_eq!(filter, doc! { "providerEmail": "p@x.io" });
		let filter = filter_document(&Filter::eq("email", Value::Null)).unwrap();
		assert_eq!(filter, doc! { "email": Bson::Null });
		assert!(filter_document(&Filter::All).unwrap().is_empty());
	}

	#[test]
	fn record_keeps_field_order() {
		let record = match json!({"b": 1, "a": {"c": true}}) {
			Value::Object(m) => m,
			_ => unreachable!(),
		};
		let document = to_document(&record).unwrap();
		let keys: Vec<&String> = document.keys().collect();
		assert_eq!(keys, ["b", "a"]);
	}
}
