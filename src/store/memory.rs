use std::{collections::HashMap, sync::Arc};

use serde_json::Value;
use tokio::sync::RwLock;

use super::{Collection, DeleteResult, DocumentStore, Filter, InsertResult, Record, RecordId, StoreError, UpdateResult, ID_FIELD};

/// Process-local store with the same write semantics as the database.
///
/// Generated ids are kept as hex strings; `Filter::Id` only selects records
/// whose id the store generated, never a client-supplied string `_id`.
#[derive(Clone, Default)]
pub struct InMemoryStore {
	collections: Arc<RwLock<HashMap<Collection, Vec<Entry>>>>,
}

#[derive(Clone)]
struct Entry {
	/// `_id` was generated by the store rather than taken from the body.
	generated: bool,
	record: Record,
}

impl Entry {
	fn matches(&self, filter: &Filter) -> bool {
		match filter {
			Filter::Id(_) => self.generated && filter.matches(&self.record),
			_ => filter.matches(&self.record),
		}
	}
}

impl InMemoryStore {
	pub fn new() -> Self {
		Self::default()
	}
}

fn with_id_first(id: Value, record: Record) -> Record {
	let mut out = Record::with_capacity(record.len() + 1);
	out.insert(ID_FIELD.to_owned(), id);
	out.extend(record.into_iter().filter(|(k, _)| k != ID_FIELD));
	out
}

/// Returns true when any field actually changed.
fn apply_set(record: &mut Record, set: Record) -> bool {
	let mut changed = false;
	for (key, value) in set {
		if record.get(&key) != Some(&value) {
			record.insert(key, value);
			changed = true;
		}
	}
	changed
}

impl DocumentStore for InMemoryStore {
	async fn find(&self, coll: Collection, filter: Filter) -> Result<Vec<Record>, StoreError> {
		let collections = self.collections.read().await;
		let entries = collections.get(&coll).map(Vec::as_slice).unwrap_or_default();
		Ok(entries.iter().filter(|e| e.matches(&filter)).map(|e| e.record.clone()).collect())
	}

	async fn find_one(&self, coll: Collection, filter: Filter) -> Result<Option<Record>, StoreError> {
		let collections = self.collections.read().await;
		let entries = collections.get(&coll).map(Vec::as_slice).unwrap_or_default();
		Ok(entries.iter().find(|e| e.matches(&filter)).map(|e| e.record.clone()))
	}

	async fn insert_one(&self, coll: Collection, mut record: Record) -> Result<InsertResult, StoreError> {
		let (id, generated) = match record.remove(ID_FIELD) {
			Some(id) => (id, false),
			None => (Value::String(RecordId::new().to_hex()), true),
		};
		let mut collections = self.collections.write().await;
		let entries = collections.entry(coll).or_default();
		if entries.iter().any(|e| e.record.get(ID_FIELD) == Some(&id)) {
			return Err(StoreError::DuplicateKey {
				collection: coll,
				key: id.to_string(),
			});
		}
		entries.push(Entry {
			generated,
			record: with_id_first(id.clone(), record),
		});
		Ok(InsertResult {
			acknowledged: true,
			inserted_id: id,
		})
	}

	async fn update_one(&self, coll: Collection, filter: Filter, mut set: Record, upsert: bool) -> Result<UpdateResult, StoreError> {
		let mut collections = self.collections.write().await;
		let entries = collections.entry(coll).or_default();

		if let Some(entry) = entries.iter_mut().find(|e| e.matches(&filter)) {
			if let Some(id) = set.remove(ID_FIELD) {
				if entry.record.get(ID_FIELD) != Some(&id) {
					return Err(StoreError::ImmutableId { collection: coll });
				}
			}
			let modified = apply_set(&mut entry.record, set);
			return Ok(UpdateResult {
				acknowledged: true,
				matched_count: 1,
				modified_count: u64::from(modified),
				upserted_id: None,
				upserted_count: 0,
			});
		}

		if !upsert {
			return Ok(UpdateResult {
				acknowledged: true,
				matched_count: 0,
				modified_count: 0,
				upserted_id: None,
				upserted_count: 0,
			});
		}

		// the equality part of the filter seeds the new record
		let mut seed = Record::new();
		let generated_id = match filter {
			Filter::Id(id) => Value::String(id.to_hex()),
			Filter::Eq(field, value) => {
				seed.insert(field, value);
				Value::String(RecordId::new().to_hex())
			}
			Filter::All => Value::String(RecordId::new().to_hex()),
		};
		apply_set(&mut seed, set);
		let (id, generated) = match seed.remove(ID_FIELD) {
			Some(id) => (id, false),
			None => (generated_id, true),
		};
		entries.push(Entry {
			generated,
			record: with_id_first(id.clone(), seed),
		});
		Ok(UpdateResult {
			acknowledged: true,
			matched_count: 0,
			modified_count: 0,
			upserted_id: Some(id),
			upserted_count: 1,
		})
	}

	async fn delete_one(&self, coll: Collection, filter: Filter) -> Result<DeleteResult, StoreError> {
		let mut collections = self.collections.write().await;
		let entries = collections.entry(coll).or_default();
		let deleted_count = match entries.iter().position(|e| e.matches(&filter)) {
			Some(idx) => {
				entries.remove(idx);
				1
			}
			None => 0,
		};
		Ok(DeleteResult {
			acknowledged: true,
			deleted_count,
		})
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use serde_json::json;

	fn record(v: Value) -> Record {
		match v {
			Value::Object(m) => m,
			_ => unreachable!(),
		}
	}

	fn id_of(result: &InsertResult) -> RecordId {
		result.inserted_id.as_str().unwrap().parse().unwrap()
	}

	#[tokio::test]
	async fn insert_assigns_id_and_find_returns_it() {
		let store = InMemoryStore::new();
		let res = store.insert_one(Collection::Cars, record(json!({"model": "Axio"}))).await.unwrap();
		let id = id_of(&res);

		let car = store.find_one(Collection::Cars, Filter::Id(id)).await.unwrap().unwrap();
		assert_eq!(Value::Object(car), json!({"_id": id.to_hex(), "model": "Axio"}));
	}

	#[tokio::test]
	async fn collections_are_separate() {
		let store = InMemoryStore::new();
		store.insert_one(Collection::Cars, record(json!({"a": 1}))).await.unwrap();
		assert!(store.find(Collection::Bookings, Filter::All).await.unwrap().is_empty());
		assert_eq!(store.find(Collection::Cars, Filter::All).await.unwrap().len(), 1);
	}

	#[tokio::test]
	async fn update_without_match_is_noop() {
		let store = InMemoryStore::new();
		let res = store
			.update_one(Collection::Cars, Filter::Id(RecordId::new()), record(json!({"status": "x"})), false)
			.await
			.unwrap();
		assert_eq!(res.matched_count, 0);
		assert!(store.find(Collection::Cars, Filter::All).await.unwrap().is_empty());
	}

	#[tokio::test]
	async fn update_sets_only_given_fields() {
		let store = InMemoryStore::new();
		let id = id_of(&store.insert_one(Collection::Cars, record(json!({"model": "Vitz", "status": "available"}))).await.unwrap());

		let res = store
			.update_one(Collection::Cars, Filter::Id(id), record(json!({"status": "booked"})), false)
			.await
			.unwrap();
		assert_eq!((res.matched_count, res.modified_count), (1, 1));

		let car = store.find_one(Collection::Cars, Filter::Id(id)).await.unwrap().unwrap();
		assert_eq!(car["model"], json!("Vitz"));
		assert_eq!(car["status"], json!("booked"));

		// same value again matches but modifies nothing
		let res = store
			.update_one(Collection::Cars, Filter::Id(id), record(json!({"status": "booked"})), false)
			.await
			.unwrap();
		assert_eq!((res.matched_count, res.modified_count), (1, 0));
	}

	#[tokio::test]
	async fn upsert_seeds_from_filter() {
		let store = InMemoryStore::new();
		let filter = Filter::eq("email", "a@x.io");
		let res = store
			.update_one(Collection::Users, filter.clone(), record(json!({"name": "Ann"})), true)
			.await
			.unwrap();
		assert_eq!(res.upserted_count, 1);

		let users = store.find(Collection::Users, Filter::All).await.unwrap();
		assert_eq!(users.len(), 1);
		assert_eq!(users[0]["email"], json!("a@x.io"));
		assert_eq!(users[0]["name"], json!("Ann"));
		assert_eq!(users[0]["_id"], res.upserted_id.unwrap());
	}

	#[tokio::test]
	async fn delete_removes_one() {
		let store = InMemoryStore::new();
		let id = id_of(&store.insert_one(Collection::Cars, record(json!({}))).await.unwrap());
		assert_eq!(store.delete_one(Collection::Cars, Filter::Id(id)).await.unwrap().deleted_count, 1);
		assert_eq!(store.delete_one(Collection::Cars, Filter::Id(id)).await.unwrap().deleted_count, 0);
	}

	#[tokio::test]
	async fn duplicate_id_is_rejected() {
		let store = InMemoryStore::new();
		store.insert_one(Collection::Bookings, record(json!({"_id": "b1"}))).await.unwrap();
		assert!(store.insert_one(Collection::Bookings, record(json!({"_id": "b1"}))).await.is_err());
	}

	#[tokio::test]
	async fn update_cannot_change_id() {
		let store = InMemoryStore::new();
		let id = id_of(&store.insert_one(Collection::Cars, record(json!({"model": "Axio"}))).await.unwrap());

		let res = store
			.update_one(Collection::Cars, Filter::Id(id), record(json!({"_id": "x", "model": "B"})), false)
			.await;
		assert!(matches!(res, Err(StoreError::ImmutableId { .. })));
		let car = store.find_one(Collection::Cars, Filter::Id(id)).await.unwrap().unwrap();
		assert_eq!(car["model"], json!("Axio"));

		// restating the current id is allowed
		let res = store
			.update_one(Collection::Cars, Filter::Id(id), record(json!({"_id": id.to_hex(), "model": "B"})), false)
			.await
			.unwrap();
		assert_eq!((res.matched_count, res.modified_count), (1, 1));
		let car = store.find_one(Collection::Cars, Filter::Id(id)).await.unwrap().unwrap();
		assert_eq!(Value::Object(car), json!({"_id": id.to_hex(), "model": "B"}));
	}

	#[tokio::test]
	async fn id_filter_skips_client_supplied_ids() {
		let store = InMemoryStore::new();
		let hex = "65f1a2b3c4d5e6f708192a3b";
		store.insert_one(Collection::Bookings, record(json!({"_id": hex, "renterId": "r1"}))).await.unwrap();

		let id: RecordId = hex.parse().unwrap();
		assert!(store.find_one(Collection::Bookings, Filter::Id(id)).await.unwrap().is_none());
		assert_eq!(store.delete_one(Collection::Bookings, Filter::Id(id)).await.unwrap().deleted_count, 0);
		assert_eq!(store.find(Collection::Bookings, Filter::eq("_id", hex)).await.unwrap().len(), 1);
	}
}
