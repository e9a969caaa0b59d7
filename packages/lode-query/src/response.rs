use serde_json::{Map, Value};

#[derive(Clone, Debug, PartialEq)]
pub struct Hit {
	pub id: String,
	pub score: Option<f64>,
	pub source: Value,
	pub highlight: Option<Map<String, Value>>,
	pub sort: Option<Vec<Value>>,
}

/// A read-only view over one engine search response.
#[derive(Clone, Debug, PartialEq)]
pub struct SearchResult {
	pub total: u64,
	pub hits: Vec<Hit>,
	pub raw: Value,
}
impl SearchResult {
	pub fn empty() -> Self {
		Self { total: 0, hits: Vec::new(), raw: Value::Null }
	}

	pub fn from_response(raw: Value) -> Self {
		let total = total_count(&raw);
		let hits = raw
			.pointer("/hits/hits")
			.and_then(Value::as_array)
			.map(|hits| hits.iter().filter_map(parse_hit).collect())
			.unwrap_or_default();

		Self { total, hits, raw }
	}

	pub fn ids(&self) -> Vec<String> {
		self.hits.iter().map(|hit| hit.id.clone()).collect()
	}
}

/// Reads `hits.total.value`, accepting the bare numeric form older engines return.
pub fn total_count(raw: &Value) -> u64 {
	match raw.pointer("/hits/total") {
		Some(Value::Object(total)) => total.get("value").and_then(Value::as_u64).unwrap_or(0),
		Some(total) => total.as_u64().unwrap_or(0),
		None => 0,
	}
}

/// Reads the `count` field of a count response.
pub fn count_value(raw: &Value) -> u64 {
	raw.get("count").and_then(Value::as_u64).unwrap_or(0)
}

fn parse_hit(raw: &Value) -> Option<Hit> {
	let id = match raw.get("_id")? {
		Value::String(id) => id.clone(),
		Value::Number(id) => id.to_string(),
		_ => return None,
	};

	Some(Hit {
		id,
		score: raw.get("_score").and_then(Value::as_f64),
		source: raw.get("_source").cloned().unwrap_or(Value::Null),
		highlight: raw.get("highlight").and_then(Value::as_object).cloned(),
		sort: raw.get("sort").and_then(Value::as_array).cloned(),
	})
}
