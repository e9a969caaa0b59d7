use std::{
	collections::{HashMap, VecDeque},
	sync::Mutex,
};

use color_eyre::eyre;
use serde_json::{Map, Value, json};

use lode_query::{
	BoxFuture, IndexDocument, IndexTarget, Indexer, Record, RecordStore, SearchClient,
};

#[derive(Clone, Debug)]
enum Scripted {
	Reply(Value),
	Fail(String),
}

/// Which client operation a recorded payload went through.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ClientOp {
	Search,
	Count,
}

#[derive(Clone, Debug, PartialEq)]
pub struct RecordedCall {
	pub op: ClientOp,
	pub payload: Value,
}

/// A search client that replays queued responses in order and records every payload.
///
/// An exhausted queue answers with an empty result.
#[derive(Debug, Default)]
pub struct ScriptedSearchClient {
	searches: Mutex<VecDeque<Scripted>>,
	counts: Mutex<VecDeque<Scripted>>,
	calls: Mutex<Vec<RecordedCall>>,
	mappings: Mutex<Vec<(String, String, Value)>>,
}
impl ScriptedSearchClient {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn push_search(&self, response: Value) -> &Self {
		lock(&self.searches).push_back(Scripted::Reply(response));

		self
	}

	pub fn push_hits(&self, total: u64, ids: &[&str]) -> &Self {
		self.push_search(hits_response(total, ids))
	}

	pub fn push_search_failure(&self, message: &str) -> &Self {
		lock(&self.searches).push_back(Scripted::Fail(message.to_string()));

		self
	}

	pub fn push_count(&self, count: u64) -> &Self {
		lock(&self.counts).push_back(Scripted::Reply(json!({ "count": count })));

		self
	}

	pub fn push_count_failure(&self, message: &str) -> &Self {
		lock(&self.counts).push_back(Scripted::Fail(message.to_string()));

		self
	}

	pub fn calls(&self) -> Vec<RecordedCall> {
		lock(&self.calls).clone()
	}

	pub fn payloads(&self, op: ClientOp) -> Vec<Value> {
		lock(&self.calls).iter().filter(|call| call.op == op).map(|call| call.payload.clone()).collect()
	}

	pub fn mappings(&self) -> Vec<(String, String, Value)> {
		lock(&self.mappings).clone()
	}

	fn answer(&self, op: ClientOp, payload: &Value) -> color_eyre::Result<Value> {
		lock(&self.calls).push(RecordedCall { op, payload: payload.clone() });

		let queue = match op {
			ClientOp::Search => &self.searches,
			ClientOp::Count => &self.counts,
		};

		match lock(queue).pop_front() {
			Some(Scripted::Reply(response)) => Ok(response),
			Some(Scripted::Fail(message)) => Err(eyre::eyre!(message)),
			None => Ok(match op {
				ClientOp::Search => hits_response(0, &[]),
				ClientOp::Count => json!({ "count": 0 }),
			}),
		}
	}
}
impl SearchClient for ScriptedSearchClient {
	fn search<'a>(&'a self, payload: &'a Value) -> BoxFuture<'a, color_eyre::Result<Value>> {
		Box::pin(async move { self.answer(ClientOp::Search, payload) })
	}

	fn count<'a>(&'a self, payload: &'a Value) -> BoxFuture<'a, color_eyre::Result<Value>> {
		Box::pin(async move { self.answer(ClientOp::Count, payload) })
	}

	fn put_mapping<'a>(
		&'a self,
		index: &'a str,
		doc_type: &'a str,
		mapping: &'a Value,
	) -> BoxFuture<'a, color_eyre::Result<()>> {
		Box::pin(async move {
			lock(&self.mappings).push((index.to_string(), doc_type.to_string(), mapping.clone()));

			Ok(())
		})
	}
}

/// A search response with `total` and one bare hit per id, in order.
pub fn hits_response(total: u64, ids: &[&str]) -> Value {
	let hits = ids
		.iter()
		.map(|id| json!({ "_id": id, "_score": 1.0, "_source": {} }))
		.collect::<Vec<_>>();

	json!({ "hits": { "total": { "value": total }, "hits": hits } })
}

/// Records kept in insertion order, with has-many relations keyed by owner id.
#[derive(Debug, Default)]
pub struct MemoryRecordStore {
	records: Vec<Record>,
	related: HashMap<String, Vec<(String, Value)>>,
	fetches: Mutex<Vec<(Vec<String>, Option<Vec<String>>)>>,
}
impl MemoryRecordStore {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn with_record(mut self, id: &str, attributes: Value) -> Self {
		let attributes = match attributes {
			Value::Object(map) => map,
			_ => Map::new(),
		};

		self.records.push(Record::new(id, attributes));

		self
	}

	pub fn with_related(mut self, relation: &str, owner: &str, row: Value) -> Self {
		self.related.entry(relation.to_string()).or_default().push((owner.to_string(), row));

		self
	}

	/// Every `fetch_by_ids` call as `(ids, columns)`.
	pub fn fetches(&self) -> Vec<(Vec<String>, Option<Vec<String>>)> {
		lock(&self.fetches).clone()
	}
}
impl RecordStore for MemoryRecordStore {
	fn fetch_by_ids<'a>(
		&'a self,
		_key_name: &'a str,
		ids: &'a [String],
		columns: Option<&'a [String]>,
	) -> BoxFuture<'a, color_eyre::Result<HashMap<String, Record>>> {
		Box::pin(async move {
			lock(&self.fetches).push((ids.to_vec(), columns.map(<[String]>::to_vec)));

			let found = self
				.records
				.iter()
				.filter(|record| ids.contains(&record.id))
				.map(|record| {
					let mut record = record.clone();

					if let Some(columns) = columns {
						record.attributes.retain(|name, _| columns.contains(name));
					}

					(record.id.clone(), record)
				})
				.collect();

			Ok(found)
		})
	}

	fn fetch_ids<'a>(&'a self, _key_name: &'a str) -> BoxFuture<'a, color_eyre::Result<Vec<String>>> {
		Box::pin(async move { Ok(self.records.iter().map(|record| record.id.clone()).collect()) })
	}

	fn load_relations<'a>(
		&'a self,
		records: &'a mut [Record],
		relations: &'a [String],
	) -> BoxFuture<'a, color_eyre::Result<()>> {
		Box::pin(async move {
			for name in relations {
				let Some(rows) = self.related.get(name) else {
					return Err(eyre::eyre!("Relation {name} is not declared."));
				};

				for record in records.iter_mut() {
					let owned = rows
						.iter()
						.filter(|(owner, _)| owner == &record.id)
						.map(|(_, row)| row.clone())
						.collect();

					record.relations.insert(name.clone(), owned);
				}
			}

			Ok(())
		})
	}
}

/// An indexer that only records what it was asked to do.
#[derive(Debug, Default)]
pub struct RecordingIndexer {
	updates: Mutex<Vec<(IndexTarget, Vec<IndexDocument>)>>,
	deletes: Mutex<Vec<(IndexTarget, Vec<String>)>>,
}
impl RecordingIndexer {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn updates(&self) -> Vec<(IndexTarget, Vec<IndexDocument>)> {
		lock(&self.updates).clone()
	}

	pub fn deletes(&self) -> Vec<(IndexTarget, Vec<String>)> {
		lock(&self.deletes).clone()
	}
}
impl Indexer for RecordingIndexer {
	fn update<'a>(
		&'a self,
		target: &'a IndexTarget,
		documents: &'a [IndexDocument],
	) -> BoxFuture<'a, color_eyre::Result<()>> {
		Box::pin(async move {
			lock(&self.updates).push((target.clone(), documents.to_vec()));

			Ok(())
		})
	}

	fn delete<'a>(
		&'a self,
		target: &'a IndexTarget,
		ids: &'a [String],
	) -> BoxFuture<'a, color_eyre::Result<()>> {
		Box::pin(async move {
			lock(&self.deletes).push((target.clone(), ids.to_vec()));

			Ok(())
		})
	}
}

fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
	mutex.lock().unwrap_or_else(|err| err.into_inner())
}
