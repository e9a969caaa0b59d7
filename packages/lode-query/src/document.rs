use std::collections::BTreeSet;

use serde_json::{Map, Value};

/// A nested request document addressed by dot-separated key paths.
///
/// Top-level keys marked as protected reject every later write through [`Payload::set`] and its
/// variants, so merged filter data can never retarget the request.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Payload {
	doc: Map<String, Value>,
	protected: BTreeSet<String>,
}
impl Payload {
	pub fn new() -> Self {
		Self::default()
	}

	/// Sets a top-level key and marks it protected.
	pub fn protect(&mut self, key: &str, value: Value) -> &mut Self {
		if !self.protected.contains(key) {
			self.doc.insert(key.to_string(), value);
			self.protected.insert(key.to_string());
		}

		self
	}

	pub fn is_protected(&self, key: &str) -> bool {
		self.protected.contains(top_level(key))
	}

	pub fn protected_keys(&self) -> impl Iterator<Item = &str> {
		self.protected.iter().map(String::as_str)
	}

	pub fn set(&mut self, path: &str, value: Value) -> &mut Self {
		if self.is_protected(path) {
			return self;
		}

		set_path(&mut self.doc, path, value);

		self
	}

	pub fn set_if_not_empty(&mut self, path: &str, value: Value) -> &mut Self {
		if is_empty_value(&value) {
			return self;
		}

		self.set(path, value)
	}

	pub fn set_if_not_null(&mut self, path: &str, value: Value) -> &mut Self {
		if value.is_null() {
			return self;
		}

		self.set(path, value)
	}

	/// Appends `value` to the array at `path`, creating it when absent.
	pub fn add(&mut self, path: &str, value: Value) -> &mut Self {
		if self.is_protected(path) {
			return self;
		}

		let mut items = match self.get(path) {
			Some(Value::Array(items)) => items.clone(),
			Some(Value::Null) | None => Vec::new(),
			Some(other) => vec![other.clone()],
		};

		items.push(value);
		set_path(&mut self.doc, path, Value::Array(items));

		self
	}

	pub fn add_if_not_empty(&mut self, path: &str, value: Value) -> &mut Self {
		if is_empty_value(&value) {
			return self;
		}

		self.add(path, value)
	}

	pub fn get(&self, path: &str) -> Option<&Value> {
		let mut segments = path.split('.');
		let mut current = self.doc.get(segments.next()?)?;

		for segment in segments {
			current = current.as_object()?.get(segment)?;
		}

		Some(current)
	}

	pub fn has(&self, path: &str) -> bool {
		self.get(path).is_some()
	}

	pub fn as_map(&self) -> &Map<String, Value> {
		&self.doc
	}

	pub fn to_value(&self) -> Value {
		Value::Object(self.doc.clone())
	}

	pub fn into_value(self) -> Value {
		Value::Object(self.doc)
	}

	/// Replaces a protected key. Only index resolution may retarget a payload.
	pub(crate) fn replace_protected(&mut self, key: &str, value: Value) {
		self.doc.insert(key.to_string(), value);
		self.protected.insert(key.to_string());
	}
}

/// Mirrors the emptiness rule of the wire format: null, `false`, zero, `""`, `"0"`, `[]` and `{}`.
pub fn is_empty_value(value: &Value) -> bool {
	match value {
		Value::Null => true,
		Value::Bool(flag) => !flag,
		Value::Number(number) => number.as_f64().map(|n| n == 0.0).unwrap_or(false),
		Value::String(text) => text.is_empty() || text == "0",
		Value::Array(items) => items.is_empty(),
		Value::Object(map) => map.is_empty(),
	}
}

fn top_level(path: &str) -> &str {
	path.split('.').next().unwrap_or(path)
}

fn set_path(doc: &mut Map<String, Value>, path: &str, value: Value) {
	let mut segments = path.split('.').peekable();
	let mut current = doc;

	while let Some(segment) = segments.next() {
		if segments.peek().is_none() {
			current.insert(segment.to_string(), value);

			return;
		}

		let entry = current.entry(segment.to_string()).or_insert_with(|| Value::Object(Map::new()));

		if !entry.is_object() {
			*entry = Value::Object(Map::new());
		}

		let Value::Object(next) = entry else {
			return;
		};

		current = next;
	}
}
