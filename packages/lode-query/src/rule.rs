use std::{
	collections::BTreeMap,
	fmt::{Debug, Formatter},
	sync::Arc,
};

use serde_json::{Value, json};

use crate::{Error, QuerySpec, Result};

pub const QUERY_STRING_RULE: &str = "query_string";

/// A full-text strategy expressed as an object with its own applicability check.
pub trait SearchRule
where
	Self: Send + Sync,
{
	fn is_applicable(&self, _spec: &QuerySpec) -> bool {
		true
	}

	/// Returns the fragment placed at `body.query.bool`.
	fn build_query_payload(&self, spec: &QuerySpec) -> Value;

	fn build_highlight_payload(&self, _spec: &QuerySpec) -> Option<Value> {
		None
	}
}

pub type RulePredicate = dyn Fn(&QuerySpec) -> Value + Send + Sync;

#[derive(Clone)]
pub enum Rule {
	Predicate(Arc<RulePredicate>),
	Object(Arc<dyn SearchRule>),
}
impl Rule {
	pub fn predicate<F>(f: F) -> Self
	where
		F: Fn(&QuerySpec) -> Value + Send + Sync + 'static,
	{
		Self::Predicate(Arc::new(f))
	}

	pub fn object<R>(rule: R) -> Self
	where
		R: SearchRule + 'static,
	{
		Self::Object(Arc::new(rule))
	}

	pub fn query_string() -> Self {
		Self::object(QueryStringRule)
	}

	/// Predicate rules always apply.
	pub fn is_applicable(&self, spec: &QuerySpec) -> bool {
		match self {
			Self::Predicate(_) => true,
			Self::Object(rule) => rule.is_applicable(spec),
		}
	}

	pub fn query_fragment(&self, spec: &QuerySpec) -> Value {
		match self {
			Self::Predicate(f) => f(spec),
			Self::Object(rule) => rule.build_query_payload(spec),
		}
	}

	pub fn highlight_fragment(&self, spec: &QuerySpec) -> Option<Value> {
		match self {
			Self::Predicate(_) => None,
			Self::Object(rule) => rule.build_highlight_payload(spec),
		}
	}
}
impl Debug for Rule {
	fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
		match self {
			Self::Predicate(_) => f.write_str("Rule::Predicate"),
			Self::Object(_) => f.write_str("Rule::Object"),
		}
	}
}

/// Matches the raw query text against every field with the engine's query-string syntax.
#[derive(Clone, Copy, Debug, Default)]
pub struct QueryStringRule;
impl SearchRule for QueryStringRule {
	fn build_query_payload(&self, spec: &QuerySpec) -> Value {
		json!({
			"must": {
				"query_string": {
					"query": spec.query_text().unwrap_or_default(),
				},
			},
		})
	}
}

/// Named rules that entity configuration can refer to.
#[derive(Clone, Debug)]
pub struct RuleRegistry {
	rules: BTreeMap<String, Rule>,
}
impl RuleRegistry {
	pub fn new() -> Self {
		let mut rules = BTreeMap::new();

		rules.insert(QUERY_STRING_RULE.to_string(), Rule::query_string());

		Self { rules }
	}

	pub fn register(&mut self, name: impl Into<String>, rule: Rule) -> &mut Self {
		self.rules.insert(name.into(), rule);

		self
	}

	pub fn contains(&self, name: &str) -> bool {
		self.rules.contains_key(name)
	}

	pub fn resolve(&self, name: &str) -> Result<Rule> {
		self.rules.get(name).cloned().ok_or_else(|| Error::Configuration {
			message: format!("Search rule '{name}' is not registered."),
		})
	}

	pub fn resolve_all<S>(&self, names: &[S]) -> Result<Vec<Rule>>
	where
		S: AsRef<str>,
	{
		names.iter().map(|name| self.resolve(name.as_ref())).collect()
	}
}
impl Default for RuleRegistry {
	fn default() -> Self {
		Self::new()
	}
}
