use std::sync::Arc;

use serde::Serialize;
use serde_json::Value;

use lode_query::{
	IndexDocument, IndexPayload, IndexTarget, Indexer, QuerySpec, Record, RecordStore,
	SOFT_DELETE_FIELD, SearchClient, SearchOptions, SearchResult, Searchable, WRITE_ALIAS,
	compile_all, count_value, effective_mapping, marker_value, total_count,
};

use crate::{MappingCache, ResultMapper, ServiceError, ServiceResult};

/// Ids per delete request when flushing an entity.
pub const FLUSH_CHUNK_SIZE: usize = 500;

/// The winning attempt of a rule-fallback search.
#[derive(Clone, Debug)]
pub struct SearchOutcome {
	/// `None` when no payload was sent, either because no rule applied or a raw callback ran.
	pub payload: Option<Value>,
	/// Position of the winning rule among the applicable rules.
	pub rule: Option<usize>,
	pub result: SearchResult,
}
impl SearchOutcome {
	pub fn empty() -> Self {
		Self { payload: None, rule: None, result: SearchResult::empty() }
	}
}

#[derive(Clone, Debug, Serialize)]
pub struct Page {
	pub items: Vec<Record>,
	pub total: u64,
	pub per_page: u64,
	pub current_page: u64,
	pub last_page: u64,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
enum Operation {
	Search,
	Count,
	Explain,
	Profile,
}

struct Attempt {
	payload: Option<Value>,
	rule: Option<usize>,
	response: Value,
}

#[derive(Clone)]
pub struct SearchEngine {
	settings: lode_config::Search,
	client: Arc<dyn SearchClient>,
	indexer: Arc<dyn Indexer>,
	mappings: Arc<MappingCache>,
}
impl SearchEngine {
	pub fn new(
		settings: lode_config::Search,
		client: Arc<dyn SearchClient>,
		indexer: Arc<dyn Indexer>,
	) -> Self {
		Self { settings, client, indexer, mappings: Arc::new(MappingCache::new()) }
	}

	/// Shares a mapping cache between engines of the same process.
	pub fn with_mapping_cache(mut self, mappings: Arc<MappingCache>) -> Self {
		self.mappings = mappings;

		self
	}

	pub fn mapping_cache(&self) -> &Arc<MappingCache> {
		&self.mappings
	}

	pub fn soft_delete_enabled(&self, entity: &dyn Searchable) -> bool {
		soft_delete_in_force(&self.settings, entity)
	}

	/// Starts a spec for `entity`. The text `*` starts a filter-only search.
	pub fn query(&self, entity: &dyn Searchable, text: &str) -> QuerySpec {
		start_query(&self.settings, entity, text)
	}

	/// Tries each applicable rule in order and keeps the first response with hits.
	///
	/// When every rule comes back empty the last response is returned.
	pub async fn search(
		&self,
		entity: &dyn Searchable,
		spec: &QuerySpec,
	) -> ServiceResult<SearchOutcome> {
		self.search_with(entity, spec, SearchOptions::default()).await
	}

	/// [`SearchEngine::search`] with caller-chosen compile options.
	pub async fn search_with(
		&self,
		entity: &dyn Searchable,
		spec: &QuerySpec,
		options: SearchOptions,
	) -> ServiceResult<SearchOutcome> {
		let attempt = self.run(entity, spec, options, Operation::Search).await?;

		Ok(match attempt {
			Some(attempt) => SearchOutcome {
				payload: attempt.payload,
				rule: attempt.rule,
				result: SearchResult::from_response(attempt.response),
			},
			None => SearchOutcome::empty(),
		})
	}

	pub async fn count(&self, entity: &dyn Searchable, spec: &QuerySpec) -> ServiceResult<u64> {
		let options = SearchOptions { highlight: false, ..SearchOptions::default() };
		let attempt = self.run(entity, spec, options, Operation::Count).await?;

		Ok(attempt.map(|attempt| count_value(&attempt.response)).unwrap_or(0))
	}

	/// The engine's scoring explanation for the winning rule.
	pub async fn explain(&self, entity: &dyn Searchable, spec: &QuerySpec) -> ServiceResult<Value> {
		let options = SearchOptions { explain: true, ..SearchOptions::default() };
		let attempt = self.run(entity, spec, options, Operation::Explain).await?;

		Ok(attempt.map(|attempt| attempt.response).unwrap_or(Value::Null))
	}

	/// The engine's query profile for the winning rule.
	pub async fn profile(&self, entity: &dyn Searchable, spec: &QuerySpec) -> ServiceResult<Value> {
		let options = SearchOptions { profile: true, ..SearchOptions::default() };
		let attempt = self.run(entity, spec, options, Operation::Profile).await?;

		Ok(attempt.map(|attempt| attempt.response).unwrap_or(Value::Null))
	}

	/// Sends `body` as-is to the entity's index.
	pub async fn search_raw(&self, entity: &dyn Searchable, body: Value) -> ServiceResult<Value> {
		let mut payload = IndexPayload::for_entity(entity)?;

		payload.set("body", body);

		Ok(self.client.search(&payload.to_value()).await?)
	}

	pub async fn map(
		&self,
		entity: &dyn Searchable,
		spec: &QuerySpec,
		result: &SearchResult,
		store: &dyn RecordStore,
	) -> ServiceResult<Vec<Record>> {
		ResultMapper::new(store).map(entity, spec, result).await
	}

	pub fn map_ids(&self, result: &SearchResult) -> Vec<String> {
		result.ids()
	}

	/// Searches, maps hits to records and loads the relations named by `with`.
	pub async fn get(
		&self,
		entity: &dyn Searchable,
		spec: &QuerySpec,
		store: &dyn RecordStore,
	) -> ServiceResult<Vec<Record>> {
		self.get_with(entity, spec, store, SearchOptions::default()).await
	}

	pub async fn get_with(
		&self,
		entity: &dyn Searchable,
		spec: &QuerySpec,
		store: &dyn RecordStore,
		options: SearchOptions,
	) -> ServiceResult<Vec<Record>> {
		let outcome = self.search_with(entity, spec, options).await?;

		self.hydrate(entity, spec, &outcome.result, store).await
	}

	pub async fn paginate(
		&self,
		entity: &dyn Searchable,
		spec: &QuerySpec,
		store: &dyn RecordStore,
		per_page: u64,
		page: u64,
	) -> ServiceResult<Page> {
		self.paginate_with(entity, spec, store, per_page, page, SearchOptions::default()).await
	}

	pub async fn paginate_with(
		&self,
		entity: &dyn Searchable,
		spec: &QuerySpec,
		store: &dyn RecordStore,
		per_page: u64,
		page: u64,
		options: SearchOptions,
	) -> ServiceResult<Page> {
		if per_page == 0 {
			return Err(ServiceError::InvalidRequest {
				message: "per_page must be greater than zero.".to_string(),
			});
		}

		let current_page = page.max(1);
		let mut spec = spec.clone();

		spec.paginate(per_page, current_page);

		let outcome = self.search_with(entity, &spec, options).await?;
		let items = self.hydrate(entity, &spec, &outcome.result, store).await?;
		let total = outcome.result.total;

		Ok(Page { items, total, per_page, current_page, last_page: total.div_ceil(per_page).max(1) })
	}

	/// Indexes `records` through the write alias, pushing the entity mapping first when enabled.
	pub async fn update(&self, entity: &dyn Searchable, records: &[Record]) -> ServiceResult<()> {
		if records.is_empty() {
			return Ok(());
		}

		let soft_delete = self.soft_delete_enabled(entity);

		if self.settings.update_mapping && !self.mappings.contains(entity.searchable_as()) {
			let index = entity.index_name()?;
			let mapping = effective_mapping(entity, soft_delete);

			self.client.put_mapping(&index, entity.searchable_as(), &mapping).await?;
			self.mappings.insert(entity.searchable_as());

			tracing::info!(index = %index, entity = entity.searchable_as(), "Updated index mapping.");
		}

		let target = write_target(entity)?;
		let documents = records
			.iter()
			.map(|record| {
				let mut source = record.attributes.clone();

				if soft_delete {
					source.insert(SOFT_DELETE_FIELD.to_string(), marker_value(entity.is_trashed(record)));
				}

				IndexDocument { id: record.id.clone(), source: Value::Object(source) }
			})
			.collect::<Vec<_>>();

		self.indexer.update(&target, &documents).await?;

		Ok(())
	}

	pub async fn delete(&self, entity: &dyn Searchable, records: &[Record]) -> ServiceResult<()> {
		if records.is_empty() {
			return Ok(());
		}

		let target = write_target(entity)?;
		let ids = records.iter().map(|record| record.id.clone()).collect::<Vec<_>>();

		self.indexer.delete(&target, &ids).await?;

		Ok(())
	}

	/// Removes every record of `entity` from the index, in key order.
	pub async fn flush(&self, entity: &dyn Searchable, store: &dyn RecordStore) -> ServiceResult<()> {
		let target = write_target(entity)?;
		let ids = store.fetch_ids(entity.key_name()).await?;

		for chunk in ids.chunks(FLUSH_CHUNK_SIZE) {
			self.indexer.delete(&target, chunk).await?;
		}

		tracing::info!(index = %target.index, removed = ids.len(), "Flushed entity from the index.");

		Ok(())
	}

	async fn hydrate(
		&self,
		entity: &dyn Searchable,
		spec: &QuerySpec,
		result: &SearchResult,
		store: &dyn RecordStore,
	) -> ServiceResult<Vec<Record>> {
		let mut records = ResultMapper::new(store).map(entity, spec, result).await?;

		if let Some(relations) = spec.relations()
			&& !relations.is_empty()
			&& !records.is_empty()
		{
			store.load_relations(&mut records, relations).await?;
		}

		Ok(records)
	}

	async fn run(
		&self,
		entity: &dyn Searchable,
		spec: &QuerySpec,
		options: SearchOptions,
		operation: Operation,
	) -> ServiceResult<Option<Attempt>> {
		// Count never goes through the raw callback.
		if operation != Operation::Count
			&& let Some(callback) = spec.raw_callback()
		{
			let query = spec.query_text().unwrap_or("*").to_string();
			let response = callback.call(self.client.clone(), query, options).await?;

			return Ok(Some(Attempt { payload: None, rule: None, response }));
		}

		let payloads = compile_all(entity, spec, options)?;
		let mut last = None;

		for (rule, payload) in payloads.into_iter().enumerate() {
			let payload = payload.into_value();

			tracing::debug!(entity = entity.searchable_as(), rule, "Trying search rule.");

			let response = match operation {
				Operation::Search => self.client.search(&payload).await?,
				Operation::Count => self.client.count(&payload).await?,
				Operation::Explain => self.client.explain(&payload).await?,
				Operation::Profile => self.client.profile(&payload).await?,
			};
			let total = match operation {
				Operation::Count => count_value(&response),
				_ => total_count(&response),
			};

			if total > 0 {
				tracing::debug!(entity = entity.searchable_as(), rule, total, "Search rule matched.");

				return Ok(Some(Attempt { payload: Some(payload), rule: Some(rule), response }));
			}

			last = Some(Attempt { payload: Some(payload), rule: Some(rule), response });
		}

		if last.is_some() {
			tracing::info!(entity = entity.searchable_as(), "No search rule matched any document.");
		}

		Ok(last)
	}
}

/// Whether searches on `entity` exclude trashed records by default.
pub fn soft_delete_in_force(settings: &lode_config::Search, entity: &dyn Searchable) -> bool {
	settings.soft_delete && entity.uses_soft_delete()
}

/// Starts a spec for `entity` from user input, applying the default soft-delete filter.
pub fn start_query(
	settings: &lode_config::Search,
	entity: &dyn Searchable,
	text: &str,
) -> QuerySpec {
	QuerySpec::start(text, soft_delete_in_force(settings, entity))
}

fn write_target(entity: &dyn Searchable) -> ServiceResult<IndexTarget> {
	let mut payload = IndexPayload::for_entity(entity)?;

	payload.use_alias(WRITE_ALIAS)?;

	let index = payload.get("index").and_then(Value::as_str).unwrap_or_default().to_string();

	Ok(IndexTarget { index, doc_type: entity.searchable_as().to_string() })
}
