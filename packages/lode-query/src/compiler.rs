use serde_json::{Value, json};

use crate::{FilterClause, IndexPayload, Payload, QuerySpec, Result, Rule, Searchable};

/// Per-execution switches for compilation.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct SearchOptions {
	pub explain: bool,
	pub profile: bool,
	pub highlight: bool,
}
impl Default for SearchOptions {
	fn default() -> Self {
		Self { explain: false, profile: false, highlight: true }
	}
}

/// Renders `spec` into the request document for `entity`.
///
/// `rule` of `None` compiles a pure filter search that matches every document before filtering.
pub fn compile(
	entity: &dyn Searchable,
	spec: &QuerySpec,
	rule: Option<&Rule>,
	options: SearchOptions,
) -> Result<Payload> {
	let mut payload = IndexPayload::for_entity(entity)?;

	match rule {
		Some(rule) => {
			payload.set_if_not_empty("body.query.bool", rule.query_fragment(spec));

			if options.highlight
				&& let Some(highlight) = rule.highlight_fragment(spec)
			{
				payload.set_if_not_empty("body.highlight", highlight);
			}
		},
		None => {
			payload.set("body.query.bool.must.match_all", json!({}));
		},
	}

	append_filters(&mut payload, "body.query.bool.filter.bool.must", spec.must());
	append_filters(&mut payload, "body.query.bool.filter.bool.must_not", spec.must_not());

	let select = spec.selected_fields().iter().cloned().map(Value::String).collect();
	let sort = spec.sort_directives().iter().map(|directive| directive.to_value()).collect();

	payload
		.set_if_not_empty("body._source", Value::Array(select))
		.set_if_not_empty(
			"body.collapse.field",
			spec.collapse_field().map(|field| Value::String(field.to_string())).unwrap_or_default(),
		)
		.set_if_not_empty("body.sort", Value::Array(sort))
		.set_if_not_empty("body.explain", Value::Bool(options.explain))
		.set_if_not_empty("body.profile", Value::Bool(options.profile))
		.set_if_not_empty("body.min_score", spec.minimum_score().map(Value::from).unwrap_or_default())
		.set("body.from", Value::from(spec.offset()));

	if let Some(limit) = spec.limit() {
		payload.set("body.size", Value::from(limit));
	}

	Ok(payload.into_payload())
}

/// Compiles one payload per applicable rule, in rule order.
///
/// A full-text spec without rules of its own uses the entity's rules. A filter-only spec yields a
/// single payload.
pub fn compile_all(
	entity: &dyn Searchable,
	spec: &QuerySpec,
	options: SearchOptions,
) -> Result<Vec<Payload>> {
	if !spec.is_full_text() {
		return Ok(vec![compile(entity, spec, None, options)?]);
	}

	applicable_rules(entity, spec)
		.iter()
		.map(|rule| compile(entity, spec, Some(rule), options))
		.collect()
}

/// The rules a full-text search will try, in order.
pub fn applicable_rules(entity: &dyn Searchable, spec: &QuerySpec) -> Vec<Rule> {
	let rules = if spec.rules().is_empty() { entity.search_rules() } else { spec.rules().to_vec() };

	rules.into_iter().filter(|rule| rule.is_applicable(spec)).collect()
}

fn append_filters(payload: &mut Payload, path: &str, clauses: &[FilterClause]) {
	if clauses.is_empty() {
		return;
	}

	let mut merged = match payload.get(path) {
		Some(Value::Array(existing)) => existing.clone(),
		Some(Value::Object(existing)) if existing.is_empty() => Vec::new(),
		Some(Value::Null) | None => Vec::new(),
		Some(existing) => vec![existing.clone()],
	};

	merged.extend(clauses.iter().map(FilterClause::to_value));

	payload.set_if_not_empty(path, Value::Array(merged));
}
