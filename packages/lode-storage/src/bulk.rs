use serde_json::{Map, Value};

use lode_query::{BoxFuture, IndexDocument, IndexTarget, Indexer};

use crate::{Error, Result, engine::EsClient};

/// Writes documents through the engine's `_bulk` endpoint.
#[derive(Clone, Debug)]
pub struct BulkIndexer {
	client: EsClient,
}
impl BulkIndexer {
	pub fn new(client: EsClient) -> Self {
		Self { client }
	}

	pub fn update_body(&self, target: &IndexTarget, documents: &[IndexDocument]) -> Result<String> {
		let mut body = String::new();

		for document in documents {
			push_line(&mut body, &self.action("index", target, &document.id))?;
			push_line(&mut body, &document.source)?;
		}

		Ok(body)
	}

	pub fn delete_body(&self, target: &IndexTarget, ids: &[String]) -> Result<String> {
		let mut body = String::new();

		for id in ids {
			push_line(&mut body, &self.action("delete", target, id))?;
		}

		Ok(body)
	}

	async fn submit(&self, body: String) -> Result<()> {
		if body.is_empty() {
			return Ok(());
		}

		let url = format!("{}/_bulk", self.client.base_url());
		let response = self.client.send_ndjson(&url, body).await?;

		check_bulk_response(&response)
	}

	fn action(&self, op: &str, target: &IndexTarget, id: &str) -> Value {
		let mut meta = Map::new();

		meta.insert("_index".to_string(), Value::String(target.index.clone()));

		if self.client.legacy_types() {
			meta.insert("_type".to_string(), Value::String(target.doc_type.clone()));
		}

		meta.insert("_id".to_string(), Value::String(id.to_string()));

		let mut action = Map::new();

		action.insert(op.to_string(), Value::Object(meta));

		Value::Object(action)
	}
}
impl Indexer for BulkIndexer {
	fn update<'a>(
		&'a self,
		target: &'a IndexTarget,
		documents: &'a [IndexDocument],
	) -> BoxFuture<'a, color_eyre::Result<()>> {
		Box::pin(async move {
			let body = self.update_body(target, documents)?;

			tracing::debug!(index = %target.index, documents = documents.len(), "Indexing documents.");

			Ok(self.submit(body).await?)
		})
	}

	fn delete<'a>(
		&'a self,
		target: &'a IndexTarget,
		ids: &'a [String],
	) -> BoxFuture<'a, color_eyre::Result<()>> {
		Box::pin(async move {
			let body = self.delete_body(target, ids)?;

			tracing::debug!(index = %target.index, documents = ids.len(), "Deleting documents.");

			Ok(self.submit(body).await?)
		})
	}
}

fn push_line(body: &mut String, value: &Value) -> Result<()> {
	body.push_str(&serde_json::to_string(value)?);
	body.push('\n');

	Ok(())
}

fn check_bulk_response(response: &Value) -> Result<()> {
	if !response.get("errors").and_then(Value::as_bool).unwrap_or(false) {
		return Ok(());
	}

	let reason = response
		.get("items")
		.and_then(Value::as_array)
		.into_iter()
		.flatten()
		.filter_map(Value::as_object)
		.flat_map(|item| item.values())
		.find_map(|result| result.get("error"))
		.map(|error| match error.get("reason").and_then(Value::as_str) {
			Some(reason) => reason.to_string(),
			None => error.to_string(),
		})
		.unwrap_or_else(|| "unknown error".to_string());

	Err(Error::InvalidResponse { message: format!("Bulk request failed: {reason}.") })
}
