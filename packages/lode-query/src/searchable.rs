use serde_json::{Map, Value, json};

use crate::{
	Error, IndexConfigurator, Record, Result, Rule, RuleRegistry,
	soft_delete::{SOFT_DELETE_FIELD, TRASHED_AT_FIELD},
};

/// The capability an entity needs to be searched.
pub trait Searchable
where
	Self: Send + Sync,
{
	/// Fails when the entity has no index configurator.
	fn index_configurator(&self) -> Result<&IndexConfigurator>;

	/// The legacy document type, and the name the entity is registered under.
	fn searchable_as(&self) -> &str;

	fn key_name(&self) -> &str;

	fn uses_soft_delete(&self) -> bool;

	fn mapping(&self) -> Value {
		json!({})
	}

	fn search_rules(&self) -> Vec<Rule> {
		vec![Rule::query_string()]
	}

	fn index_name(&self) -> Result<String> {
		Ok(self.index_configurator()?.name().to_string())
	}

	fn is_trashed(&self, record: &Record) -> bool {
		record.get(TRASHED_AT_FIELD).is_some_and(|value| !value.is_null())
	}
}

/// The entity mapping, with the soft-delete marker declared when soft delete is in force.
pub fn effective_mapping(entity: &dyn Searchable, soft_delete_enabled: bool) -> Value {
	let mut mapping = match entity.mapping() {
		Value::Object(map) => map,
		_ => Map::new(),
	};

	if entity.uses_soft_delete() && soft_delete_enabled {
		let properties =
			mapping.entry("properties").or_insert_with(|| Value::Object(Map::new()));

		if !properties.is_object() {
			*properties = Value::Object(Map::new());
		}
		if let Some(properties) = properties.as_object_mut() {
			properties.insert(SOFT_DELETE_FIELD.to_string(), json!({"type": "integer"}));
		}
	}

	Value::Object(mapping)
}

/// A searchable entity declared in configuration.
#[derive(Clone, Debug)]
pub struct ConfiguredEntity {
	name: String,
	key: String,
	soft_delete: bool,
	mapping: Map<String, Value>,
	rules: Vec<Rule>,
	index: Option<IndexConfigurator>,
}
impl ConfiguredEntity {
	pub fn from_config(
		cfg: &lode_config::Config,
		entity: &lode_config::Entity,
		registry: &RuleRegistry,
	) -> Result<Self> {
		let index = match entity.index.as_deref() {
			Some(name) => {
				let index = cfg.index(name).ok_or_else(|| Error::Configuration {
					message: format!(
						"Index '{name}' for the {} entity is not declared.",
						entity.name
					),
				})?;

				Some(IndexConfigurator::from_config(&cfg.search.prefix, index))
			},
			None => None,
		};

		Ok(Self {
			name: entity.name.clone(),
			key: entity.key.clone(),
			soft_delete: entity.soft_delete,
			mapping: entity.mapping.clone(),
			rules: registry.resolve_all(entity.rules.as_slice())?,
			index,
		})
	}

	pub fn lookup(
		cfg: &lode_config::Config,
		name: &str,
		registry: &RuleRegistry,
	) -> Result<Self> {
		let entity = cfg.entity(name).ok_or_else(|| Error::Configuration {
			message: format!("Entity '{name}' is not declared."),
		})?;

		Self::from_config(cfg, entity, registry)
	}

	pub fn new(name: impl Into<String>, key: impl Into<String>) -> Self {
		Self {
			name: name.into(),
			key: key.into(),
			soft_delete: false,
			mapping: Map::new(),
			rules: Vec::new(),
			index: None,
		}
	}

	pub fn with_index(mut self, index: IndexConfigurator) -> Self {
		self.index = Some(index);

		self
	}

	pub fn with_soft_delete(mut self, soft_delete: bool) -> Self {
		self.soft_delete = soft_delete;

		self
	}

	pub fn with_mapping(mut self, mapping: Map<String, Value>) -> Self {
		self.mapping = mapping;

		self
	}

	pub fn with_rules(mut self, rules: Vec<Rule>) -> Self {
		self.rules = rules;

		self
	}
}
impl Searchable for ConfiguredEntity {
	fn index_configurator(&self) -> Result<&IndexConfigurator> {
		self.index.as_ref().ok_or_else(|| Error::Configuration {
			message: format!("An index configurator for the {} entity is not specified.", self.name),
		})
	}

	fn searchable_as(&self) -> &str {
		&self.name
	}

	fn key_name(&self) -> &str {
		&self.key
	}

	fn uses_soft_delete(&self) -> bool {
		self.soft_delete
	}

	fn mapping(&self) -> Value {
		Value::Object(self.mapping.clone())
	}

	fn search_rules(&self) -> Vec<Rule> {
		if self.rules.is_empty() { vec![Rule::query_string()] } else { self.rules.clone() }
	}
}

#[cfg(test)]
mod tests {
	use serde_json::json;

	use crate::{ConfiguredEntity, Error, IndexConfigurator, Searchable, effective_mapping};

	#[test]
	fn missing_index_is_a_configuration_error() {
		let entity = ConfiguredEntity::new("articles", "id");

		assert!(matches!(entity.index_name(), Err(Error::Configuration { .. })));
	}

	#[test]
	fn default_rules_fall_back_to_query_string() {
		let entity = ConfiguredEntity::new("articles", "id");

		assert_eq!(entity.search_rules().len(), 1);
	}

	#[test]
	fn trashed_records_carry_a_deletion_time() {
		let entity = ConfiguredEntity::new("articles", "id");
		let record = |id: &str, deleted_at: serde_json::Value| {
			let mut attributes = serde_json::Map::new();

			attributes.insert("deleted_at".to_string(), deleted_at);

			crate::Record::new(id, attributes)
		};
		let live = record("1", serde_json::Value::Null);
		let trashed = record("2", json!("2024-01-01"));

		assert!(!entity.is_trashed(&live));
		assert!(entity.is_trashed(&trashed));
	}

	#[test]
	fn mapping_declares_marker_only_when_enabled() {
		let mapping = json!({"properties": {"title": {"type": "text"}}});
		let entity = ConfiguredEntity::new("articles", "id")
			.with_index(IndexConfigurator::new("articles"))
			.with_soft_delete(true)
			.with_mapping(mapping.as_object().cloned().expect("Mapping must be an object."));

		assert_eq!(
			effective_mapping(&entity, true),
			json!({"properties": {"title": {"type": "text"}, "__soft_deleted": {"type": "integer"}}})
		);
		assert_eq!(effective_mapping(&entity, false), mapping);
	}
}
