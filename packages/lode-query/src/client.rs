use std::{
	collections::HashMap,
	fmt::{Debug, Formatter},
	future::Future,
	pin::Pin,
	sync::Arc,
};

use serde_json::Value;

use crate::{Record, SearchOptions};

pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// The engine-facing half of a search. Transport, retries and timeouts belong to implementors.
pub trait SearchClient
where
	Self: Send + Sync,
{
	fn search<'a>(&'a self, payload: &'a Value) -> BoxFuture<'a, color_eyre::Result<Value>>;

	/// Returns the engine's `{count}` document.
	fn count<'a>(&'a self, payload: &'a Value) -> BoxFuture<'a, color_eyre::Result<Value>>;

	fn explain<'a>(&'a self, payload: &'a Value) -> BoxFuture<'a, color_eyre::Result<Value>> {
		let payload = with_body_flag(payload, "explain");

		Box::pin(async move { self.search(&payload).await })
	}

	fn profile<'a>(&'a self, payload: &'a Value) -> BoxFuture<'a, color_eyre::Result<Value>> {
		let payload = with_body_flag(payload, "profile");

		Box::pin(async move { self.search(&payload).await })
	}

	fn put_mapping<'a>(
		&'a self,
		index: &'a str,
		doc_type: &'a str,
		mapping: &'a Value,
	) -> BoxFuture<'a, color_eyre::Result<()>>;
}

/// Batch access to the records that back indexed documents.
pub trait RecordStore
where
	Self: Send + Sync,
{
	/// Fetches records keyed by their stringified key. `columns` of `None` selects every column.
	fn fetch_by_ids<'a>(
		&'a self,
		key_name: &'a str,
		ids: &'a [String],
		columns: Option<&'a [String]>,
	) -> BoxFuture<'a, color_eyre::Result<HashMap<String, Record>>>;

	/// Every record id in key order.
	fn fetch_ids<'a>(&'a self, key_name: &'a str) -> BoxFuture<'a, color_eyre::Result<Vec<String>>>;

	fn load_relations<'a>(
		&'a self,
		records: &'a mut [Record],
		relations: &'a [String],
	) -> BoxFuture<'a, color_eyre::Result<()>>;
}

#[derive(Clone, Debug, PartialEq)]
pub struct IndexTarget {
	pub index: String,
	pub doc_type: String,
}

#[derive(Clone, Debug, PartialEq)]
pub struct IndexDocument {
	pub id: String,
	pub source: Value,
}

/// Writes documents into, and removes them from, an index.
pub trait Indexer
where
	Self: Send + Sync,
{
	fn update<'a>(
		&'a self,
		target: &'a IndexTarget,
		documents: &'a [IndexDocument],
	) -> BoxFuture<'a, color_eyre::Result<()>>;

	fn delete<'a>(
		&'a self,
		target: &'a IndexTarget,
		ids: &'a [String],
	) -> BoxFuture<'a, color_eyre::Result<()>>;
}

pub type RawSearchFn = dyn Fn(Arc<dyn SearchClient>, String, SearchOptions) -> BoxFuture<'static, color_eyre::Result<Value>>
	+ Send
	+ Sync;

/// Caller-supplied search that replaces compilation and rule fallback entirely.
#[derive(Clone)]
pub struct RawCallback(Arc<RawSearchFn>);
impl RawCallback {
	pub fn new<F>(f: F) -> Self
	where
		F: Fn(Arc<dyn SearchClient>, String, SearchOptions) -> BoxFuture<'static, color_eyre::Result<Value>>
			+ Send
			+ Sync
			+ 'static,
	{
		Self(Arc::new(f))
	}

	pub fn call(
		&self,
		client: Arc<dyn SearchClient>,
		query: String,
		options: SearchOptions,
	) -> BoxFuture<'static, color_eyre::Result<Value>> {
		(self.0)(client, query, options)
	}
}
impl Debug for RawCallback {
	fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
		f.write_str("RawCallback")
	}
}

fn with_body_flag(payload: &Value, flag: &str) -> Value {
	let mut payload = payload.clone();

	if let Some(root) = payload.as_object_mut() {
		let body = root.entry("body").or_insert_with(|| Value::Object(Default::default()));

		if let Some(body) = body.as_object_mut() {
			body.insert(flag.to_string(), Value::Bool(true));
		}
	}

	payload
}
