use std::{
	env, fs,
	path::PathBuf,
	sync::atomic::{AtomicU64, Ordering},
	time::{SystemTime, UNIX_EPOCH},
};

use toml::Value;

use lode_config::{Config, Error};

const SAMPLE_CONFIG_TEMPLATE_TOML: &str = include_str!("fixtures/sample_config.template.toml");

static COUNTER: AtomicU64 = AtomicU64::new(0);

fn sample_value() -> Value {
	toml::from_str(SAMPLE_CONFIG_TEMPLATE_TOML).expect("Failed to parse template config.")
}

fn write_temp_config(payload: String) -> PathBuf {
	let nanos = SystemTime::now()
		.duration_since(UNIX_EPOCH)
		.expect("System time must be after the epoch.")
		.as_nanos();
	let seq = COUNTER.fetch_add(1, Ordering::SeqCst);
	let path = env::temp_dir().join(format!("lode_config_test_{nanos}_{seq}.toml"));

	fs::write(&path, payload).expect("Failed to write test config.");

	path
}

fn load_value(value: &Value) -> lode_config::Result<Config> {
	let path = write_temp_config(toml::to_string(value).expect("Failed to render config."));
	let result = lode_config::load(&path);

	fs::remove_file(&path).expect("Failed to remove test config.");

	result
}

fn table_mut<'a>(value: &'a mut Value, key: &str) -> &'a mut toml::Table {
	value
		.as_table_mut()
		.and_then(|root| root.get_mut(key))
		.and_then(Value::as_table_mut)
		.unwrap_or_else(|| panic!("Template config must include [{key}]."))
}

fn first_entity_mut(value: &mut Value) -> &mut toml::Table {
	value
		.as_table_mut()
		.and_then(|root| root.get_mut("entities"))
		.and_then(Value::as_array_mut)
		.and_then(|entities| entities.first_mut())
		.and_then(Value::as_table_mut)
		.expect("Template config must include [[entities]].")
}

fn expect_validation(result: lode_config::Result<Config>, needle: &str) {
	match result {
		Err(Error::Validation { message }) => {
			assert!(message.contains(needle), "Unexpected validation message: {message}");
		},
		other => panic!("Expected a validation error, got {other:?}."),
	}
}

#[test]
fn loads_and_normalizes_sample_config() {
	let cfg = load_value(&sample_value()).expect("Sample config should load.");

	assert_eq!(cfg.engine.url, "http://127.0.0.1:9200");
	assert!(cfg.engine.api_key.is_none(), "Blank api_key should normalize to none.");
	assert_eq!(cfg.search.prefix, "test_");
	assert!(cfg.search.soft_delete);

	let entity = cfg.entity("articles").expect("Entity should be declared.");

	assert_eq!(entity.table(), "articles");
	assert_eq!(entity.rules, vec!["query_string".to_string()]);
	assert_eq!(entity.relations.len(), 1);

	let index = cfg.index("articles").expect("Index should be declared.");

	assert_eq!(index.aliases.get("read").map(String::as_str), Some("_read"));
}

#[test]
fn search_section_defaults_when_missing() {
	let mut value = sample_value();

	value.as_table_mut().expect("Config must be a table.").remove("search");

	let cfg = load_value(&value).expect("Config without [search] should load.");

	assert_eq!(cfg.search.prefix, "");
	assert!(!cfg.search.soft_delete);
	assert!(!cfg.search.update_mapping);
}

#[test]
fn rejects_empty_engine_url() {
	let mut value = sample_value();

	table_mut(&mut value, "engine").insert("url".to_string(), Value::String(" ".to_string()));

	expect_validation(load_value(&value), "engine.url");
}

#[test]
fn rejects_zero_timeout() {
	let mut value = sample_value();

	table_mut(&mut value, "engine").insert("timeout_ms".to_string(), Value::Integer(0));

	expect_validation(load_value(&value), "engine.timeout_ms");
}

#[test]
fn rejects_entity_with_unknown_index() {
	let mut value = sample_value();

	first_entity_mut(&mut value)
		.insert("index".to_string(), Value::String("missing".to_string()));

	expect_validation(load_value(&value), "does not match any declared index");
}

#[test]
fn entity_without_index_loads() {
	let mut value = sample_value();

	first_entity_mut(&mut value).remove("index");

	let cfg = load_value(&value).expect("Missing index is reported at search time.");

	assert!(cfg.entities[0].index.is_none());
}

#[test]
fn rejects_empty_entity_key() {
	let mut value = sample_value();

	first_entity_mut(&mut value).insert("key".to_string(), Value::String(String::new()));

	expect_validation(load_value(&value), "entities.key");
}

#[test]
fn rejects_duplicate_entities() {
	let mut value = sample_value();
	let duplicate = Value::Table(first_entity_mut(&mut value).clone());

	value
		.as_table_mut()
		.and_then(|root| root.get_mut("entities"))
		.and_then(Value::as_array_mut)
		.expect("Template config must include [[entities]].")
		.push(duplicate);

	expect_validation(load_value(&value), "declared more than once");
}

#[test]
fn reports_missing_file() {
	let path = env::temp_dir().join("lode_config_test_missing_file.toml");

	assert!(matches!(lode_config::load(&path), Err(Error::ReadConfig { .. })));
}
