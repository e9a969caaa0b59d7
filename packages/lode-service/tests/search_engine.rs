use std::sync::Arc;

use serde_json::{Value, json};

use lode_query::{
	ConfiguredEntity, IndexConfigurator, QuerySpec, Record, Rule, SearchOptions, SearchResult,
	SearchRule,
};
use lode_service::{SearchEngine, ServiceError};
use lode_testkit::{
	MemoryRecordStore, RecordingIndexer, ScriptedSearchClient,
	fakes::{ClientOp, RecordedCall},
};

struct Harness {
	client: Arc<ScriptedSearchClient>,
	indexer: Arc<RecordingIndexer>,
	engine: SearchEngine,
}

struct HighlightingRule;
impl SearchRule for HighlightingRule {
	fn build_query_payload(&self, spec: &QuerySpec) -> Value {
		json!({"must": {"match": {"title": spec.query_text().unwrap_or_default()}}})
	}

	fn build_highlight_payload(&self, _spec: &QuerySpec) -> Option<Value> {
		Some(json!({"fields": {"title": {}}}))
	}
}

fn harness(update_mapping: bool) -> Harness {
	let client = Arc::new(ScriptedSearchClient::new());
	let indexer = Arc::new(RecordingIndexer::new());
	let settings = lode_config::Search { prefix: String::new(), soft_delete: true, update_mapping };
	let engine = SearchEngine::new(settings, client.clone(), indexer.clone());

	Harness { client, indexer, engine }
}

fn articles() -> ConfiguredEntity {
	ConfiguredEntity::new("article", "id")
		.with_index(IndexConfigurator::new("articles"))
		.with_soft_delete(true)
}

fn match_rule(field: &'static str) -> Rule {
	Rule::predicate(move |spec| {
		json!({"must": {"match": {field: spec.query_text().unwrap_or_default()}}})
	})
}

fn two_rule_spec(engine: &SearchEngine) -> QuerySpec {
	let mut spec = engine.query(&articles(), "rust");

	spec.rule(match_rule("title")).rule(match_rule("body"));

	spec
}

fn rule_field(call: &RecordedCall) -> Option<String> {
	call.payload
		.pointer("/body/query/bool/must/match")
		.and_then(Value::as_object)
		.and_then(|fields| fields.keys().next().cloned())
}

#[tokio::test]
async fn falls_back_to_the_next_rule_when_the_first_is_empty() {
	let h = harness(false);

	h.client.push_hits(0, &[]).push_hits(5, &["1", "2"]);

	let outcome =
		h.engine.search(&articles(), &two_rule_spec(&h.engine)).await.expect("Search failed.");
	let calls = h.client.calls();

	assert_eq!(calls.len(), 2);
	assert_eq!(outcome.rule, Some(1));
	assert_eq!(outcome.result.total, 5);
	assert_eq!(outcome.payload.as_ref(), Some(&calls[1].payload));
	assert_eq!(rule_field(&calls[1]).as_deref(), Some("body"));
}

#[tokio::test]
async fn stops_at_the_first_rule_with_hits() {
	let h = harness(false);

	h.client.push_hits(3, &["1"]).push_hits(5, &["2"]);

	let outcome =
		h.engine.search(&articles(), &two_rule_spec(&h.engine)).await.expect("Search failed.");
	let calls = h.client.calls();

	assert_eq!(calls.len(), 1);
	assert_eq!(outcome.rule, Some(0));
	assert_eq!(outcome.result.ids(), vec!["1"]);
	assert_eq!(rule_field(&calls[0]).as_deref(), Some("title"));
}

#[tokio::test]
async fn exhausted_rules_return_the_last_attempt() {
	let h = harness(false);
	let outcome =
		h.engine.search(&articles(), &two_rule_spec(&h.engine)).await.expect("Search failed.");
	let calls = h.client.calls();

	assert_eq!(calls.len(), 2);
	assert_eq!(outcome.rule, Some(1));
	assert_eq!(outcome.result.total, 0);
	assert_eq!(outcome.payload.as_ref(), Some(&calls[1].payload));
}

#[tokio::test]
async fn transport_errors_abort_the_loop() {
	let h = harness(false);

	h.client.push_search_failure("connection reset").push_hits(5, &["1"]);

	let err = h
		.engine
		.search(&articles(), &two_rule_spec(&h.engine))
		.await
		.expect_err("Expected a transport error.");

	assert!(matches!(
		err,
		ServiceError::Transport { ref message } if message.contains("connection reset")
	));
	assert_eq!(h.client.calls().len(), 1);
}

#[tokio::test]
async fn no_applicable_rule_yields_an_empty_outcome() {
	struct Never;
	impl SearchRule for Never {
		fn is_applicable(&self, _spec: &QuerySpec) -> bool {
			false
		}

		fn build_query_payload(&self, _spec: &QuerySpec) -> Value {
			json!({})
		}
	}

	let h = harness(false);
	let mut spec = h.engine.query(&articles(), "rust");

	spec.rule(Rule::object(Never));

	let outcome = h.engine.search(&articles(), &spec).await.expect("Search failed.");

	assert!(outcome.payload.is_none());
	assert_eq!(outcome.result, SearchResult::empty());
	assert!(h.client.calls().is_empty());
}

#[tokio::test]
async fn raw_callback_bypasses_compilation() {
	let h = harness(false);
	let mut spec = h.engine.query(&articles(), "rust");

	spec.rule(match_rule("title")).callback(|client, query, options| {
		Box::pin(async move {
			let payload = json!({"index": "custom", "q": query, "highlight": options.highlight});

			client.search(&payload).await
		})
	});
	h.client.push_hits(2, &["9"]);

	let outcome = h.engine.search(&articles(), &spec).await.expect("Search failed.");
	let calls = h.client.calls();

	assert!(outcome.payload.is_none());
	assert_eq!(outcome.result.ids(), vec!["9"]);
	assert_eq!(calls.len(), 1);
	assert_eq!(calls[0].payload, json!({"index": "custom", "q": "rust", "highlight": true}));
}

#[tokio::test]
async fn count_runs_the_loop_without_highlight() {
	let h = harness(false);
	let mut spec = h.engine.query(&articles(), "rust");

	spec.rule(Rule::object(HighlightingRule)).rule(match_rule("body"));
	h.client.push_count(0).push_count(4);

	let count = h.engine.count(&articles(), &spec).await.expect("Count failed.");
	let payloads = h.client.payloads(ClientOp::Count);

	assert_eq!(count, 4);
	assert_eq!(payloads.len(), 2);
	assert!(payloads[0]["body"].get("highlight").is_none());
	assert!(h.client.payloads(ClientOp::Search).is_empty());
}

#[tokio::test]
async fn count_ignores_the_raw_callback() {
	let h = harness(false);
	let mut spec = h.engine.query(&articles(), "rust");

	spec.callback(|client, _query, _options| {
		Box::pin(async move {
			let payload = json!({"index": "custom"});

			client.search(&payload).await
		})
	});
	h.client.push_hits(7, &["1"]).push_count(7);

	let count = h.engine.count(&articles(), &spec).await.expect("Count failed.");

	assert_eq!(count, 7);
	assert!(h.client.payloads(ClientOp::Search).is_empty());
	assert_eq!(h.client.payloads(ClientOp::Count).len(), 1);
}

#[tokio::test]
async fn search_with_can_drop_rule_highlights() {
	let h = harness(false);
	let store = MemoryRecordStore::new().with_record("1", json!({"id": "1"}));
	let options = SearchOptions { highlight: false, ..SearchOptions::default() };
	let mut spec = h.engine.query(&articles(), "rust");

	spec.rule(Rule::object(HighlightingRule));
	h.client.push_hits(1, &["1"]).push_hits(1, &["1"]);

	h.engine.search_with(&articles(), &spec, options).await.expect("Search failed.");

	let page = h
		.engine
		.paginate_with(&articles(), &spec, &store, 10, 1, options)
		.await
		.expect("Pagination failed.");
	let payloads = h.client.payloads(ClientOp::Search);

	assert_eq!(page.items.len(), 1);
	assert_eq!(payloads.len(), 2);
	assert!(payloads.iter().all(|payload| payload["body"].get("highlight").is_none()));
}

#[tokio::test]
async fn search_keeps_rule_highlights() {
	let h = harness(false);
	let mut spec = h.engine.query(&articles(), "rust");

	spec.rule(Rule::object(HighlightingRule));
	h.engine.search(&articles(), &spec).await.expect("Search failed.");

	assert_eq!(h.client.calls()[0].payload["body"]["highlight"], json!({"fields": {"title": {}}}));
}

#[tokio::test]
async fn star_query_is_filter_only_and_soft_delete_aware() {
	let h = harness(false);
	let mut spec = h.engine.query(&articles(), "*");

	spec.where_eq("status", "active");
	h.engine.search(&articles(), &spec).await.expect("Search failed.");

	let payload = &h.client.calls()[0].payload;

	assert_eq!(payload["body"]["query"]["bool"]["must"], json!({"match_all": {}}));
	assert_eq!(
		payload["body"]["query"]["bool"]["filter"]["bool"]["must"],
		json!([{"term": {"__soft_deleted": 0}}, {"term": {"status": "active"}}])
	);
}

#[tokio::test]
async fn full_text_without_rules_uses_query_string() {
	let h = harness(false);

	h.engine
		.search(&articles(), &h.engine.query(&articles(), "rust"))
		.await
		.expect("Search failed.");

	assert_eq!(
		h.client.calls()[0].payload["body"]["query"]["bool"]["must"],
		json!({"query_string": {"query": "rust"}})
	);
}

#[tokio::test]
async fn mapping_preserves_hit_order_and_drops_missing_records() {
	let h = harness(false);
	let store = MemoryRecordStore::new()
		.with_record("c", json!({"id": "c", "title": "C"}))
		.with_record("a", json!({"id": "a", "title": "A"}));

	h.client.push_search(json!({
		"hits": {
			"total": {"value": 3},
			"hits": [
				{
					"_id": "a",
					"_score": 2.0,
					"_source": {},
					"highlight": {"title": ["<em>A</em>"]},
					"sort": [2],
				},
				{"_id": "b", "_score": 1.5, "_source": {}},
				{"_id": "c", "_score": 1.0, "_source": {}, "sort": [1]},
			],
		},
	}));

	let spec = h.engine.query(&articles(), "*");
	let records = h.engine.get(&articles(), &spec, &store).await.expect("Get failed.");

	assert_eq!(records.iter().map(|record| record.id.as_str()).collect::<Vec<_>>(), vec!["a", "c"]);
	assert_eq!(
		records[0].highlight.as_ref().and_then(|highlight| highlight.joined("title")).as_deref(),
		Some("<em>A</em>")
	);
	assert_eq!(records[0].sort_payload, Some(vec![json!(2)]));
	assert!(records[1].highlight.is_none());
	assert_eq!(store.fetches().len(), 1);
	assert_eq!(store.fetches()[0].0, vec!["a", "b", "c"]);
}

#[tokio::test]
async fn empty_results_skip_the_store() {
	let h = harness(false);
	let store = MemoryRecordStore::new().with_record("a", json!({"id": "a"}));
	let records = h
		.engine
		.get(&articles(), &h.engine.query(&articles(), "*"), &store)
		.await
		.expect("Get failed.");

	assert!(records.is_empty());
	assert!(store.fetches().is_empty());
}

#[tokio::test]
async fn selection_limits_fetched_columns_and_relations_load() {
	let h = harness(false);
	let store = MemoryRecordStore::new()
		.with_record("a", json!({"id": "a", "title": "A", "body": "long"}))
		.with_related("comments", "a", json!({"id": 1, "article_id": "a"}));
	let mut spec = h.engine.query(&articles(), "*");

	spec.select(["title"]).with(["comments"]);
	h.client.push_hits(1, &["a"]);

	let records = h.engine.get(&articles(), &spec, &store).await.expect("Get failed.");

	assert_eq!(store.fetches()[0].1, Some(vec!["title".to_string(), "id".to_string()]));
	assert!(records[0].get("body").is_none());
	assert_eq!(records[0].relations["comments"], vec![json!({"id": 1, "article_id": "a"})]);
	assert_eq!(h.client.calls()[0].payload["body"]["_source"], json!(["title"]));
}

#[tokio::test]
async fn paginate_sets_the_window_and_page_counts() {
	let h = harness(false);
	let store = MemoryRecordStore::new().with_record("21", json!({"id": "21"}));

	h.client.push_hits(45, &["21"]);

	let page = h
		.engine
		.paginate(&articles(), &h.engine.query(&articles(), "*"), &store, 20, 2)
		.await
		.expect("Paginate failed.");
	let payload = &h.client.calls()[0].payload;

	assert_eq!(payload["body"]["from"], json!(20));
	assert_eq!(payload["body"]["size"], json!(20));
	assert_eq!((page.total, page.per_page, page.current_page, page.last_page), (45, 20, 2, 3));
	assert_eq!(page.items.len(), 1);
	assert!(matches!(
		h.engine.paginate(&articles(), &h.engine.query(&articles(), "*"), &store, 0, 1).await,
		Err(ServiceError::InvalidRequest { .. })
	));
}

#[tokio::test]
async fn explain_and_profile_flag_the_request() {
	let h = harness(false);
	let spec = h.engine.query(&articles(), "*");

	h.engine.explain(&articles(), &spec).await.expect("Explain failed.");
	h.engine.profile(&articles(), &spec).await.expect("Profile failed.");

	let calls = h.client.calls();

	assert_eq!(calls[0].payload["body"]["explain"], json!(true));
	assert_eq!(calls[1].payload["body"]["profile"], json!(true));
}

#[tokio::test]
async fn raw_search_wraps_the_body() {
	let h = harness(false);
	let body = json!({"query": {"term": {"id": "a"}}});

	h.engine.search_raw(&articles(), body.clone()).await.expect("Raw search failed.");

	assert_eq!(
		h.client.calls()[0].payload,
		json!({"index": "articles", "type": "article", "body": body})
	);
}

#[tokio::test]
async fn map_ids_follow_hit_order() {
	let h = harness(false);
	let result = SearchResult::from_response(lode_testkit::hits_response(2, &["b", "a"]));

	assert_eq!(h.engine.map_ids(&result), vec!["b", "a"]);
}

#[tokio::test]
async fn configuration_errors_fail_before_any_io() {
	let h = harness(false);
	let entity = ConfiguredEntity::new("article", "id");
	let err = h
		.engine
		.search(&entity, &h.engine.query(&entity, "rust"))
		.await
		.expect_err("Expected a configuration error.");

	assert!(matches!(err, ServiceError::Configuration { .. }));
	assert!(h.client.calls().is_empty());
}

#[tokio::test]
async fn update_pushes_the_mapping_once_and_marks_trashed_records() {
	let h = harness(true);
	let entity = articles();
	let record = |id: &str, attributes: Value| {
		Record::new(id, attributes.as_object().cloned().expect("Attributes must be an object."))
	};
	let records = vec![
		record("1", json!({"id": 1, "deleted_at": null})),
		record("2", json!({"id": 2, "deleted_at": "2024-05-01"})),
	];

	h.engine.update(&entity, &records).await.expect("Update failed.");
	h.engine.update(&entity, &records[..1]).await.expect("Update failed.");

	let mappings = h.client.mappings();

	assert_eq!(mappings.len(), 1);
	assert_eq!(mappings[0].0, "articles");
	assert_eq!(mappings[0].2["properties"]["__soft_deleted"], json!({"type": "integer"}));

	let updates = h.indexer.updates();

	assert_eq!(updates.len(), 2);
	assert_eq!(updates[0].0.index, "articles_write");
	assert_eq!(updates[0].1[0].source["__soft_deleted"], json!(0));
	assert_eq!(updates[0].1[1].source["__soft_deleted"], json!(1));

	h.engine.mapping_cache().clear();
	h.engine.update(&entity, &records[..1]).await.expect("Update failed.");

	assert_eq!(h.client.mappings().len(), 2);
}

#[tokio::test]
async fn delete_and_flush_target_the_write_alias() {
	let h = harness(false);
	let store = MemoryRecordStore::new()
		.with_record("1", json!({"id": 1}))
		.with_record("2", json!({"id": 2}));

	h.engine
		.delete(&articles(), &[Record::new("7", Default::default())])
		.await
		.expect("Delete failed.");
	h.engine.flush(&articles(), &store).await.expect("Flush failed.");

	let deletes = h.indexer.deletes();

	assert_eq!(deletes.len(), 2);
	assert_eq!(deletes[0].0.index, "articles_write");
	assert_eq!(deletes[0].1, vec!["7"]);
	assert_eq!(deletes[1].1, vec!["1", "2"]);
	assert!(h.client.mappings().is_empty());
}
