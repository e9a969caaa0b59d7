use lode_query::{Highlight, QuerySpec, Record, RecordStore, SearchResult, Searchable};

use crate::ServiceResult;

/// Joins engine hits with their backing records.
pub struct ResultMapper<'a> {
	store: &'a dyn RecordStore,
}
impl<'a> ResultMapper<'a> {
	pub fn new(store: &'a dyn RecordStore) -> Self {
		Self { store }
	}

	/// Returns records in hit order. Hits without a backing record are dropped.
	pub async fn map(
		&self,
		entity: &dyn Searchable,
		spec: &QuerySpec,
		result: &SearchResult,
	) -> ServiceResult<Vec<Record>> {
		if result.total == 0 || result.hits.is_empty() {
			return Ok(Vec::new());
		}

		let ids = result.ids();
		let columns = selected_columns(spec, entity.key_name());
		let found = self.store.fetch_by_ids(entity.key_name(), &ids, columns.as_deref()).await?;
		let mut records = Vec::with_capacity(result.hits.len());

		for hit in &result.hits {
			let Some(record) = found.get(&hit.id) else {
				continue;
			};
			let mut record = record.clone();

			record.highlight = hit.highlight.as_ref().map(Highlight::from_hit);
			record.sort_payload = hit.sort.clone();

			records.push(record);
		}

		if records.len() < result.hits.len() {
			tracing::debug!(
				entity = entity.searchable_as(),
				dropped = result.hits.len() - records.len(),
				"Dropped hits without backing records."
			);
		}

		Ok(records)
	}
}

/// The selected fields plus the key, or `None` for every column.
fn selected_columns(spec: &QuerySpec, key_name: &str) -> Option<Vec<String>> {
	let select = spec.selected_fields();

	if select.is_empty() {
		return None;
	}

	let mut columns = select.to_vec();

	if !columns.iter().any(|column| column == key_name) {
		columns.push(key_name.to_string());
	}

	Some(columns)
}

#[cfg(test)]
mod tests {
	use lode_query::QuerySpec;

	use crate::mapper::selected_columns;

	#[test]
	fn selection_always_includes_the_key() {
		let mut spec = QuerySpec::filter(false);

		assert_eq!(selected_columns(&spec, "id"), None);

		spec.select(["title", "body"]);

		assert_eq!(
			selected_columns(&spec, "id"),
			Some(vec!["title".to_string(), "body".to_string(), "id".to_string()])
		);

		spec.select(["id"]);

		assert_eq!(selected_columns(&spec, "id").map(|columns| columns.len()), Some(3));
	}
}
