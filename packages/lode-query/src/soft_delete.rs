use serde_json::{Value, json};

use crate::clause::{Condition, FilterClause};

pub const SOFT_DELETE_FIELD: &str = "__soft_deleted";
/// Backing-record column whose non-null value marks a record as trashed.
pub const TRASHED_AT_FIELD: &str = "deleted_at";

/// Which records a soft-delete aware search includes.
///
/// `Default` excludes trashed records. Once left, it cannot be re-entered on the same spec.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum SoftDeleteState {
	#[default]
	Default,
	WithTrashed,
	OnlyTrashed,
}

pub(crate) fn marker_clause(value: i64) -> FilterClause {
	FilterClause::new(SOFT_DELETE_FIELD, Condition::Term(json!(value)), false)
}

pub(crate) fn exclude_trashed(must: &mut Vec<FilterClause>) {
	must.push(marker_clause(0));
}

pub(crate) fn include_trashed(must: &mut Vec<FilterClause>) {
	let live = Value::from(0);

	must.retain(|clause| !clause.is_term(SOFT_DELETE_FIELD, &live));
}

pub(crate) fn only_trashed(must: &mut Vec<FilterClause>) {
	include_trashed(must);

	if !must.iter().any(|clause| clause.is_term(SOFT_DELETE_FIELD, &Value::from(1))) {
		must.push(marker_clause(1));
	}
}

/// Marker value stored with each indexed document.
pub fn marker_value(trashed: bool) -> Value {
	json!(if trashed { 1 } else { 0 })
}
