use std::sync::Arc;

use serde_json::Value;

use crate::{
	BoxFuture, RawCallback, Rule, SearchClient, SearchOptions,
	clause::{Condition, FilterClause, Operator, RangeBound},
	soft_delete::{self, SoftDeleteState},
};

pub const DEFAULT_REGEXP_FLAGS: &str = "ALL";
pub const DEFAULT_GEO_SHAPE_RELATION: &str = "INTERSECTS";

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum SortDirection {
	Asc,
	Desc,
}
impl SortDirection {
	/// Anything other than a case-insensitive `asc` sorts descending.
	pub fn normalize(raw: &str) -> Self {
		if raw.eq_ignore_ascii_case("asc") { Self::Asc } else { Self::Desc }
	}

	pub fn as_str(&self) -> &'static str {
		match self {
			Self::Asc => "asc",
			Self::Desc => "desc",
		}
	}
}

#[derive(Clone, Debug, PartialEq)]
pub enum SortDirective {
	Field { field: String, direction: SortDirection },
	Raw(Value),
}
impl SortDirective {
	pub fn to_value(&self) -> Value {
		match self {
			Self::Field { field, direction } => {
				let mut map = serde_json::Map::new();

				map.insert(field.clone(), Value::String(direction.as_str().to_string()));

				Value::Object(map)
			},
			Self::Raw(doc) => doc.clone(),
		}
	}
}

/// Accumulated search state. Builder methods mutate in place and return the same spec.
#[derive(Clone, Debug)]
pub struct QuerySpec {
	query: Option<String>,
	must: Vec<FilterClause>,
	must_not: Vec<FilterClause>,
	sort: Vec<SortDirective>,
	offset: u64,
	limit: Option<u64>,
	select: Vec<String>,
	collapse: Option<String>,
	min_score: Option<f64>,
	eager_load: Option<Vec<String>>,
	rules: Vec<Rule>,
	callback: Option<RawCallback>,
	soft_delete: SoftDeleteState,
}
impl QuerySpec {
	/// A structured-filter search that matches every document before filtering.
	pub fn filter(soft_delete: bool) -> Self {
		Self::with_query(None, soft_delete)
	}

	/// A full-text search driven by rules.
	pub fn search(query: impl Into<String>, soft_delete: bool) -> Self {
		Self::with_query(Some(query.into()), soft_delete)
	}

	/// Starts a search from user input. The text `*` starts a filter-only search.
	pub fn start(text: &str, soft_delete: bool) -> Self {
		if text == "*" { Self::filter(soft_delete) } else { Self::search(text, soft_delete) }
	}

	fn with_query(query: Option<String>, soft_delete: bool) -> Self {
		let mut spec = Self {
			query,
			must: Vec::new(),
			must_not: Vec::new(),
			sort: Vec::new(),
			offset: 0,
			limit: None,
			select: Vec::new(),
			collapse: None,
			min_score: None,
			eager_load: None,
			rules: Vec::new(),
			callback: None,
			soft_delete: SoftDeleteState::Default,
		};

		if soft_delete {
			soft_delete::exclude_trashed(&mut spec.must);
		}

		spec
	}

	pub fn query_text(&self) -> Option<&str> {
		self.query.as_deref()
	}

	pub fn is_full_text(&self) -> bool {
		self.query.is_some()
	}

	pub fn must(&self) -> &[FilterClause] {
		&self.must
	}

	pub fn must_not(&self) -> &[FilterClause] {
		&self.must_not
	}

	pub fn sort_directives(&self) -> &[SortDirective] {
		&self.sort
	}

	pub fn offset(&self) -> u64 {
		self.offset
	}

	pub fn limit(&self) -> Option<u64> {
		self.limit
	}

	pub fn selected_fields(&self) -> &[String] {
		&self.select
	}

	pub fn collapse_field(&self) -> Option<&str> {
		self.collapse.as_deref()
	}

	pub fn minimum_score(&self) -> Option<f64> {
		self.min_score
	}

	pub fn relations(&self) -> Option<&[String]> {
		self.eager_load.as_deref()
	}

	pub fn rules(&self) -> &[Rule] {
		&self.rules
	}

	pub fn raw_callback(&self) -> Option<&RawCallback> {
		self.callback.as_ref()
	}

	pub fn soft_delete_state(&self) -> SoftDeleteState {
		self.soft_delete
	}

	pub fn push_clause(&mut self, clause: FilterClause) -> &mut Self {
		if clause.is_negated() {
			self.must_not.push(clause);
		} else {
			self.must.push(clause);
		}

		self
	}

	pub fn where_eq(&mut self, field: &str, value: impl Into<Value>) -> &mut Self {
		self.where_op(field, "=", value)
	}

	/// Unsupported operators add no clause.
	pub fn where_op(&mut self, field: &str, operator: &str, value: impl Into<Value>) -> &mut Self {
		let Some(op) = Operator::parse(operator) else {
			tracing::trace!(field, operator, "Ignoring unsupported comparison operator.");

			return self;
		};
		let value = value.into();
		let clause = match (op, op.range_bound()) {
			(_, Some(bound)) => FilterClause::new(field, Condition::Range(vec![(bound, value)]), false),
			(Operator::NotEq, None) => FilterClause::new(field, Condition::Term(value), true),
			_ => FilterClause::new(field, Condition::Term(value), false),
		};

		self.push_clause(clause)
	}

	pub fn where_in(&mut self, field: &str, values: Vec<Value>) -> &mut Self {
		self.push_clause(FilterClause::new(field, Condition::Terms(values), false))
	}

	pub fn where_not_in(&mut self, field: &str, values: Vec<Value>) -> &mut Self {
		self.push_clause(FilterClause::new(field, Condition::Terms(values), true))
	}

	pub fn where_between(&mut self, field: &str, bounds: [Value; 2]) -> &mut Self {
		self.push_clause(FilterClause::new(field, between(bounds), false))
	}

	pub fn where_not_between(&mut self, field: &str, bounds: [Value; 2]) -> &mut Self {
		self.push_clause(FilterClause::new(field, between(bounds), true))
	}

	pub fn where_exists(&mut self, field: &str) -> &mut Self {
		self.push_clause(FilterClause::new(field, Condition::Exists, false))
	}

	pub fn where_not_exists(&mut self, field: &str) -> &mut Self {
		self.push_clause(FilterClause::new(field, Condition::Exists, true))
	}

	pub fn where_match(&mut self, field: &str, text: &str) -> &mut Self {
		self.push_clause(FilterClause::new(field, Condition::Match(text.to_string()), false))
	}

	pub fn where_not_match(&mut self, field: &str, text: &str) -> &mut Self {
		self.push_clause(FilterClause::new(field, Condition::Match(text.to_string()), true))
	}

	pub fn where_regexp(&mut self, field: &str, pattern: &str, flags: Option<&str>) -> &mut Self {
		let condition = Condition::Regexp {
			pattern: pattern.to_string(),
			flags: flags.unwrap_or(DEFAULT_REGEXP_FLAGS).to_string(),
		};

		self.push_clause(FilterClause::new(field, condition, false))
	}

	pub fn where_geo_distance(
		&mut self,
		field: &str,
		point: Value,
		distance: impl Into<Value>,
	) -> &mut Self {
		let condition = Condition::GeoDistance { point, distance: distance.into() };

		self.push_clause(FilterClause::new(field, condition, false))
	}

	pub fn where_geo_bounding_box(&mut self, field: &str, bounds: Value) -> &mut Self {
		self.push_clause(FilterClause::new(field, Condition::GeoBoundingBox(bounds), false))
	}

	pub fn where_geo_polygon(&mut self, field: &str, points: Vec<Value>) -> &mut Self {
		self.push_clause(FilterClause::new(field, Condition::GeoPolygon(points), false))
	}

	pub fn where_geo_shape(&mut self, field: &str, shape: Value, relation: Option<&str>) -> &mut Self {
		let condition = Condition::GeoShape {
			shape,
			relation: relation.unwrap_or(DEFAULT_GEO_SHAPE_RELATION).to_string(),
		};

		self.push_clause(FilterClause::new(field, condition, false))
	}

	pub fn order_by(&mut self, field: &str, direction: &str) -> &mut Self {
		self.sort.push(SortDirective::Field {
			field: field.to_string(),
			direction: SortDirection::normalize(direction),
		});

		self
	}

	pub fn order_raw(&mut self, doc: Value) -> &mut Self {
		self.sort.push(SortDirective::Raw(doc));

		self
	}

	pub fn from(&mut self, offset: u64) -> &mut Self {
		self.offset = offset;

		self
	}

	pub fn take(&mut self, limit: u64) -> &mut Self {
		self.limit = Some(limit);

		self
	}

	/// Sets the window for a one-based `page` of `per_page` hits.
	pub fn paginate(&mut self, per_page: u64, page: u64) -> &mut Self {
		self.from(page.saturating_sub(1).saturating_mul(per_page)).take(per_page)
	}

	/// Adds fields to the selection, keeping first-seen order.
	pub fn select<I, S>(&mut self, fields: I) -> &mut Self
	where
		I: IntoIterator<Item = S>,
		S: Into<String>,
	{
		for field in fields {
			let field = field.into();

			if !self.select.contains(&field) {
				self.select.push(field);
			}
		}

		self
	}

	pub fn collapse(&mut self, field: &str) -> &mut Self {
		self.collapse = Some(field.to_string());

		self
	}

	pub fn min_score(&mut self, score: f64) -> &mut Self {
		self.min_score = Some(score);

		self
	}

	pub fn with<I, S>(&mut self, relations: I) -> &mut Self
	where
		I: IntoIterator<Item = S>,
		S: Into<String>,
	{
		self.eager_load = Some(relations.into_iter().map(Into::into).collect());

		self
	}

	pub fn rule(&mut self, rule: Rule) -> &mut Self {
		self.rules.push(rule);

		self
	}

	pub fn callback<F>(&mut self, f: F) -> &mut Self
	where
		F: Fn(Arc<dyn SearchClient>, String, SearchOptions) -> BoxFuture<'static, color_eyre::Result<Value>>
			+ Send
			+ Sync
			+ 'static,
	{
		self.callback = Some(RawCallback::new(f));

		self
	}

	/// Drops the live-records filter. Calling it again is a no-op.
	///
	/// An `only_trashed` restriction is not lifted, so the state stays `OnlyTrashed`.
	pub fn with_trashed(&mut self) -> &mut Self {
		soft_delete::include_trashed(&mut self.must);

		if self.soft_delete != SoftDeleteState::OnlyTrashed {
			self.soft_delete = SoftDeleteState::WithTrashed;
		}

		self
	}

	/// Restricts the search to trashed records.
	pub fn only_trashed(&mut self) -> &mut Self {
		soft_delete::only_trashed(&mut self.must);

		self.soft_delete = SoftDeleteState::OnlyTrashed;

		self
	}
}

fn between(bounds: [Value; 2]) -> Condition {
	let [low, high] = bounds;

	Condition::Range(vec![(RangeBound::Gte, low), (RangeBound::Lte, high)])
}
