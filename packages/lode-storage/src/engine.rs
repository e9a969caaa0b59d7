use std::time::Duration;

use reqwest::{
	Client, Method, Response,
	header::{CONTENT_TYPE, HeaderMap},
};
use serde_json::{Map, Value};

use lode_query::{BoxFuture, SearchClient};

use crate::{Error, Result};

/// HTTP client for the engine's search, count and mapping endpoints.
#[derive(Clone, Debug)]
pub struct EsClient {
	http: Client,
	base_url: String,
	headers: HeaderMap,
	legacy_types: bool,
}
impl EsClient {
	pub fn new(cfg: &lode_config::Engine) -> Result<Self> {
		let http = Client::builder().timeout(Duration::from_millis(cfg.timeout_ms)).build()?;
		let headers = crate::auth_headers(cfg.api_key.as_deref(), &cfg.default_headers)?;

		Ok(Self {
			http,
			base_url: cfg.url.trim_end_matches('/').to_string(),
			headers,
			legacy_types: cfg.legacy_types,
		})
	}

	pub fn base_url(&self) -> &str {
		&self.base_url
	}

	pub fn legacy_types(&self) -> bool {
		self.legacy_types
	}

	/// Resolves `{url}/{index}[/{type}]/{endpoint}` for a compiled payload.
	pub fn payload_url(&self, payload: &Value, endpoint: &str) -> Result<String> {
		let index = payload
			.get("index")
			.and_then(Value::as_str)
			.filter(|index| !index.is_empty())
			.ok_or_else(|| Error::InvalidArgument {
				message: "Payload does not name an index.".to_string(),
			})?;
		let mut url = format!("{}/{index}", self.base_url);

		if self.legacy_types
			&& let Some(doc_type) = payload.get("type").and_then(Value::as_str)
		{
			url.push('/');
			url.push_str(doc_type);
		}

		url.push('/');
		url.push_str(endpoint);

		Ok(url)
	}

	pub async fn search_payload(&self, payload: &Value) -> Result<Value> {
		let url = self.payload_url(payload, "_search")?;
		let body = payload.get("body").cloned().unwrap_or_else(|| Value::Object(Map::new()));

		self.send_json(Method::POST, &url, &body).await
	}

	/// Sends only the query section, since the count endpoint rejects paging and sorting.
	pub async fn count_payload(&self, payload: &Value) -> Result<Value> {
		let url = self.payload_url(payload, "_count")?;
		let mut body = Map::new();

		if let Some(query) = payload.pointer("/body/query") {
			body.insert("query".to_string(), query.clone());
		}

		let response = self.send_json(Method::POST, &url, &Value::Object(body)).await?;

		if response.get("count").and_then(Value::as_u64).is_none() {
			return Err(Error::InvalidResponse {
				message: "Count response is missing the count field.".to_string(),
			});
		}

		Ok(response)
	}

	pub async fn put_mapping_document(
		&self,
		index: &str,
		doc_type: &str,
		mapping: &Value,
	) -> Result<()> {
		let url = if self.legacy_types {
			format!("{}/{index}/_mapping/{doc_type}", self.base_url)
		} else {
			format!("{}/{index}/_mapping", self.base_url)
		};

		self.send_json(Method::PUT, &url, mapping).await?;

		Ok(())
	}

	pub(crate) async fn send_json(&self, method: Method, url: &str, body: &Value) -> Result<Value> {
		tracing::debug!(%method, url, "Sending engine request.");

		let res =
			self.http.request(method, url).headers(self.headers.clone()).json(body).send().await?;

		read_response(res).await
	}

	pub(crate) async fn send_ndjson(&self, url: &str, body: String) -> Result<Value> {
		tracing::debug!(url, bytes = body.len(), "Sending engine bulk request.");

		let res = self
			.http
			.post(url)
			.headers(self.headers.clone())
			.header(CONTENT_TYPE, "application/x-ndjson")
			.body(body)
			.send()
			.await?;

		read_response(res).await
	}
}
impl SearchClient for EsClient {
	fn search<'a>(&'a self, payload: &'a Value) -> BoxFuture<'a, color_eyre::Result<Value>> {
		Box::pin(async move { Ok(self.search_payload(payload).await?) })
	}

	fn count<'a>(&'a self, payload: &'a Value) -> BoxFuture<'a, color_eyre::Result<Value>> {
		Box::pin(async move { Ok(self.count_payload(payload).await?) })
	}

	fn put_mapping<'a>(
		&'a self,
		index: &'a str,
		doc_type: &'a str,
		mapping: &'a Value,
	) -> BoxFuture<'a, color_eyre::Result<()>> {
		Box::pin(async move { Ok(self.put_mapping_document(index, doc_type, mapping).await?) })
	}
}

async fn read_response(res: Response) -> Result<Value> {
	let status = res.status();

	if !status.is_success() {
		let body = res.text().await.unwrap_or_default();

		tracing::warn!(status = status.as_u16(), "Engine request failed.");

		return Err(Error::Engine { status: status.as_u16(), body });
	}

	let bytes = res.bytes().await?;

	Ok(serde_json::from_slice(&bytes)?)
}
