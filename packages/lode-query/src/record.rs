use std::collections::BTreeMap;

use serde::Serialize;
use serde_json::{Map, Value};

/// Highlighted fragments of one hit, keyed by field.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct Highlight(BTreeMap<String, Vec<String>>);
impl Highlight {
	pub fn from_hit(raw: &Map<String, Value>) -> Self {
		let fields = raw
			.iter()
			.map(|(field, fragments)| {
				let fragments = match fragments {
					Value::Array(items) =>
						items.iter().filter_map(Value::as_str).map(str::to_string).collect(),
					Value::String(text) => vec![text.clone()],
					_ => Vec::new(),
				};

				(field.clone(), fragments)
			})
			.collect();

		Self(fields)
	}

	pub fn get(&self, field: &str) -> Option<&[String]> {
		self.0.get(field).map(Vec::as_slice)
	}

	pub fn joined(&self, field: &str) -> Option<String> {
		self.get(field).map(|fragments| fragments.join(" "))
	}

	pub fn fields(&self) -> impl Iterator<Item = &str> {
		self.0.keys().map(String::as_str)
	}
}

/// A backing record fetched from the record store.
///
/// `highlight`, `sort_payload` and `relations` are transient and never written back.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Record {
	pub id: String,
	pub attributes: Map<String, Value>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub highlight: Option<Highlight>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub sort_payload: Option<Vec<Value>>,
	#[serde(skip_serializing_if = "BTreeMap::is_empty")]
	pub relations: BTreeMap<String, Vec<Value>>,
}
impl Record {
	pub fn new(id: impl Into<String>, attributes: Map<String, Value>) -> Self {
		Self {
			id: id.into(),
			attributes,
			highlight: None,
			sort_payload: None,
			relations: BTreeMap::new(),
		}
	}

	pub fn get(&self, attribute: &str) -> Option<&Value> {
		self.attributes.get(attribute)
	}
}

/// Renders a key column value as the string id the engine stores.
pub fn key_to_id(value: &Value) -> Option<String> {
	match value {
		Value::String(id) => Some(id.clone()),
		Value::Number(id) => Some(id.to_string()),
		_ => None,
	}
}

#[cfg(test)]
mod tests {
	use serde_json::json;

	use crate::record::{Highlight, key_to_id};

	#[test]
	fn highlight_reads_fragment_lists() {
		let raw = json!({"title": ["<em>rust</em> book", "more <em>rust</em>"], "body": "single"});
		let highlight = Highlight::from_hit(raw.as_object().expect("Highlight must be an object."));

		assert_eq!(highlight.get("title").map(<[String]>::len), Some(2));
		assert_eq!(
			highlight.joined("title").as_deref(),
			Some("<em>rust</em> book more <em>rust</em>")
		);
		assert_eq!(highlight.joined("body").as_deref(), Some("single"));
		assert_eq!(highlight.get("missing"), None);
	}

	#[test]
	fn key_to_id_accepts_strings_and_numbers() {
		assert_eq!(key_to_id(&json!(42)).as_deref(), Some("42"));
		assert_eq!(key_to_id(&json!("a-1")).as_deref(), Some("a-1"));
		assert_eq!(key_to_id(&json!(null)), None);
	}
}
