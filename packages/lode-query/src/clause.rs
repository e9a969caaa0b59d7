use serde_json::{Map, Value, json};

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ClauseKind {
	Term,
	Range,
	Terms,
	Exists,
	Match,
	Regexp,
	GeoDistance,
	GeoBoundingBox,
	GeoPolygon,
	GeoShape,
}
impl ClauseKind {
	pub fn as_str(&self) -> &'static str {
		match self {
			Self::Term => "term",
			Self::Range => "range",
			Self::Terms => "terms",
			Self::Exists => "exists",
			Self::Match => "match",
			Self::Regexp => "regexp",
			Self::GeoDistance => "geo_distance",
			Self::GeoBoundingBox => "geo_bounding_box",
			Self::GeoPolygon => "geo_polygon",
			Self::GeoShape => "geo_shape",
		}
	}
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum RangeBound {
	Gt,
	Gte,
	Lt,
	Lte,
}
impl RangeBound {
	pub fn as_str(&self) -> &'static str {
		match self {
			Self::Gt => "gt",
			Self::Gte => "gte",
			Self::Lt => "lt",
			Self::Lte => "lte",
		}
	}
}

/// Comparison operators accepted by [`crate::QuerySpec::where_op`].
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Operator {
	Eq,
	Gt,
	Lt,
	Gte,
	Lte,
	NotEq,
}
impl Operator {
	/// Returns `None` for anything outside `=`, `>`, `<`, `>=`, `<=`, `!=`, `<>`.
	pub fn parse(raw: &str) -> Option<Self> {
		match raw {
			"=" => Some(Self::Eq),
			">" => Some(Self::Gt),
			"<" => Some(Self::Lt),
			">=" => Some(Self::Gte),
			"<=" => Some(Self::Lte),
			"!=" | "<>" => Some(Self::NotEq),
			_ => None,
		}
	}

	pub fn range_bound(&self) -> Option<RangeBound> {
		match self {
			Self::Gt => Some(RangeBound::Gt),
			Self::Lt => Some(RangeBound::Lt),
			Self::Gte => Some(RangeBound::Gte),
			Self::Lte => Some(RangeBound::Lte),
			Self::Eq | Self::NotEq => None,
		}
	}
}

#[derive(Clone, Debug, PartialEq)]
pub enum Condition {
	Term(Value),
	Range(Vec<(RangeBound, Value)>),
	Terms(Vec<Value>),
	Exists,
	Match(String),
	Regexp { pattern: String, flags: String },
	GeoDistance { point: Value, distance: Value },
	GeoBoundingBox(Value),
	GeoPolygon(Vec<Value>),
	GeoShape { shape: Value, relation: String },
}
impl Condition {
	pub fn kind(&self) -> ClauseKind {
		match self {
			Self::Term(_) => ClauseKind::Term,
			Self::Range(_) => ClauseKind::Range,
			Self::Terms(_) => ClauseKind::Terms,
			Self::Exists => ClauseKind::Exists,
			Self::Match(_) => ClauseKind::Match,
			Self::Regexp { .. } => ClauseKind::Regexp,
			Self::GeoDistance { .. } => ClauseKind::GeoDistance,
			Self::GeoBoundingBox(_) => ClauseKind::GeoBoundingBox,
			Self::GeoPolygon(_) => ClauseKind::GeoPolygon,
			Self::GeoShape { .. } => ClauseKind::GeoShape,
		}
	}
}

/// One boolean-query condition. Negated clauses live in `must_not`.
#[derive(Clone, Debug, PartialEq)]
pub struct FilterClause {
	field: String,
	condition: Condition,
	negated: bool,
}
impl FilterClause {
	pub fn new(field: impl Into<String>, condition: Condition, negated: bool) -> Self {
		Self { field: field.into(), condition, negated }
	}

	pub fn field(&self) -> &str {
		&self.field
	}

	pub fn condition(&self) -> &Condition {
		&self.condition
	}

	pub fn kind(&self) -> ClauseKind {
		self.condition.kind()
	}

	pub fn is_negated(&self) -> bool {
		self.negated
	}

	pub fn is_term(&self, field: &str, value: &Value) -> bool {
		matches!(&self.condition, Condition::Term(term) if self.field == field && term == value)
	}

	/// Renders the engine's query DSL form of this clause.
	pub fn to_value(&self) -> Value {
		let field = self.field.as_str();
		let body = match &self.condition {
			Condition::Term(value) => single(field, value.clone()),
			Condition::Range(bounds) => {
				let mut rendered = Map::new();

				for (bound, value) in bounds {
					rendered.insert(bound.as_str().to_string(), value.clone());
				}

				single(field, Value::Object(rendered))
			},
			Condition::Terms(values) => single(field, Value::Array(values.clone())),
			Condition::Exists => json!({ "field": field }),
			Condition::Match(text) => single(field, Value::String(text.clone())),
			Condition::Regexp { pattern, flags } =>
				single(field, json!({ "value": pattern, "flags": flags })),
			Condition::GeoDistance { point, distance } => {
				let mut rendered = Map::new();

				rendered.insert("distance".to_string(), distance.clone());
				rendered.insert(field.to_string(), point.clone());

				Value::Object(rendered)
			},
			Condition::GeoBoundingBox(bounds) => single(field, bounds.clone()),
			Condition::GeoPolygon(points) => single(field, json!({ "points": points })),
			Condition::GeoShape { shape, relation } =>
				single(field, json!({ "shape": shape, "relation": relation })),
		};

		single(self.kind().as_str(), body)
	}
}

fn single(key: &str, value: Value) -> Value {
	let mut map = Map::new();

	map.insert(key.to_string(), value);

	Value::Object(map)
}

#[cfg(test)]
mod tests {
	use serde_json::json;

	use crate::clause::{Condition, FilterClause, Operator, RangeBound};

	#[test]
	fn parses_supported_operators() {
		assert_eq!(Operator::parse("="), Some(Operator::Eq));
		assert_eq!(Operator::parse("<>"), Some(Operator::NotEq));
		assert_eq!(Operator::parse("!="), Some(Operator::NotEq));
		assert_eq!(Operator::parse(">=").and_then(|op| op.range_bound()), Some(RangeBound::Gte));
		assert_eq!(Operator::parse("like"), None);
		assert_eq!(Operator::parse("=="), None);
	}

	#[test]
	fn renders_wire_forms() {
		let cases = [
			(Condition::Term(json!("active")), json!({"term": {"status": "active"}})),
			(Condition::Terms(vec![json!(1), json!(2)]), json!({"terms": {"status": [1, 2]}})),
			(
				Condition::Range(vec![(RangeBound::Gte, json!(18)), (RangeBound::Lte, json!(65))]),
				json!({"range": {"status": {"gte": 18, "lte": 65}}}),
			),
			(Condition::Exists, json!({"exists": {"field": "status"}})),
			(Condition::Match("new york".to_string()), json!({"match": {"status": "new york"}})),
			(
				Condition::Regexp { pattern: "a.*".to_string(), flags: "ALL".to_string() },
				json!({"regexp": {"status": {"value": "a.*", "flags": "ALL"}}}),
			),
			(
				Condition::GeoDistance { point: json!([1.0, 2.0]), distance: json!("10km") },
				json!({"geo_distance": {"distance": "10km", "status": [1.0, 2.0]}}),
			),
			(
				Condition::GeoPolygon(vec![json!([0, 0]), json!([1, 1])]),
				json!({"geo_polygon": {"status": {"points": [[0, 0], [1, 1]]}}}),
			),
			(
				Condition::GeoShape {
					shape: json!({"type": "point"}),
					relation: "WITHIN".to_string(),
				},
				json!({"geo_shape": {"status": {"shape": {"type": "point"}, "relation": "WITHIN"}}}),
			),
		];

		for (condition, expected) in cases {
			assert_eq!(FilterClause::new("status", condition, false).to_value(), expected);
		}
	}
}
