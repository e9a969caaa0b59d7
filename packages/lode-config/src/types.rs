use std::collections::BTreeMap;

use serde::Deserialize;
use serde_json::{Map, Value};

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
	pub service: Service,
	pub engine: Engine,
	#[serde(default)]
	pub search: Search,
	pub storage: Storage,
	#[serde(default)]
	pub indices: Vec<Index>,
	#[serde(default)]
	pub entities: Vec<Entity>,
}
impl Config {
	pub fn index(&self, name: &str) -> Option<&Index> {
		self.indices.iter().find(|index| index.name == name)
	}

	pub fn entity(&self, name: &str) -> Option<&Entity> {
		self.entities.iter().find(|entity| entity.name == name)
	}
}

#[derive(Debug, Clone, Deserialize)]
pub struct Service {
	#[serde(default = "default_log_level")]
	pub log_level: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Engine {
	pub url: String,
	#[serde(default = "default_timeout_ms")]
	pub timeout_ms: u64,
	/// Include the legacy document type in request paths. Only engines older than 7.x need it.
	#[serde(default)]
	pub legacy_types: bool,
	pub api_key: Option<String>,
	#[serde(default)]
	pub default_headers: Map<String, Value>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Search {
	/// Prepended to every resolved index name.
	pub prefix: String,
	pub soft_delete: bool,
	pub update_mapping: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Storage {
	pub postgres: Postgres,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Postgres {
	pub dsn: String,
	pub pool_max_conns: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Index {
	pub name: String,
	#[serde(default)]
	pub settings: Map<String, Value>,
	/// Alias name to suffix. The suffix is appended to the prefixed index name.
	#[serde(default)]
	pub aliases: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Entity {
	pub name: String,
	pub index: Option<String>,
	pub table: Option<String>,
	#[serde(default = "default_key")]
	pub key: String,
	#[serde(default)]
	pub soft_delete: bool,
	#[serde(default)]
	pub rules: Vec<String>,
	#[serde(default)]
	pub mapping: Map<String, Value>,
	#[serde(default)]
	pub relations: Vec<Relation>,
}
impl Entity {
	pub fn table(&self) -> &str {
		self.table.as_deref().unwrap_or(self.name.as_str())
	}
}

/// A has-many relation loaded eagerly after a search.
#[derive(Debug, Clone, Deserialize)]
pub struct Relation {
	pub name: String,
	pub table: String,
	pub foreign_key: String,
}

fn default_log_level() -> String {
	"info".to_string()
}

fn default_timeout_ms() -> u64 {
	5_000
}

fn default_key() -> String {
	"id".to_string()
}
