use std::{
	collections::BTreeMap,
	fmt::{Debug, Formatter},
	sync::Arc,
};

use serde_json::{Map, Value};

use crate::{Error, Result};

pub const WRITE_ALIAS: &str = "write";

pub type AliasResolver = dyn Fn(&str) -> String + Send + Sync;

/// Resolves the concrete index name and its aliases for one searchable entity.
#[derive(Clone)]
pub struct IndexConfigurator {
	name: String,
	settings: Map<String, Value>,
	aliases: BTreeMap<String, Arc<AliasResolver>>,
}
impl IndexConfigurator {
	/// `name` is the fully resolved index name. The `write` alias is always registered.
	pub fn new(name: impl Into<String>) -> Self {
		let mut configurator =
			Self { name: name.into(), settings: Map::new(), aliases: BTreeMap::new() };

		configurator.with_alias_suffix(WRITE_ALIAS, "_write");

		configurator
	}

	pub fn from_config(prefix: &str, index: &lode_config::Index) -> Self {
		let mut configurator = Self::new(format!("{prefix}{}", index.name));

		configurator.settings = index.settings.clone();

		for (alias, suffix) in &index.aliases {
			configurator.with_alias_suffix(alias, suffix);
		}

		configurator
	}

	pub fn with_settings(&mut self, settings: Map<String, Value>) -> &mut Self {
		self.settings = settings;

		self
	}

	pub fn with_alias<F>(&mut self, alias: &str, resolver: F) -> &mut Self
	where
		F: Fn(&str) -> String + Send + Sync + 'static,
	{
		self.aliases.insert(alias.to_string(), Arc::new(resolver));

		self
	}

	pub fn with_alias_suffix(&mut self, alias: &str, suffix: &str) -> &mut Self {
		let suffix = suffix.to_string();

		self.with_alias(alias, move |name| format!("{name}{suffix}"))
	}

	pub fn name(&self) -> &str {
		&self.name
	}

	pub fn settings(&self) -> &Map<String, Value> {
		&self.settings
	}

	pub fn alias_names(&self) -> impl Iterator<Item = &str> {
		self.aliases.keys().map(String::as_str)
	}

	pub fn alias(&self, alias: &str) -> Result<String> {
		let resolver = self.aliases.get(alias).ok_or_else(|| Error::Configuration {
			message: format!("Index '{}' has no resolver for the '{alias}' alias.", self.name),
		})?;

		Ok(resolver(&self.name))
	}

	pub fn write_alias(&self) -> Result<String> {
		self.alias(WRITE_ALIAS)
	}
}
impl Debug for IndexConfigurator {
	fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("IndexConfigurator")
			.field("name", &self.name)
			.field("settings", &self.settings)
			.field("aliases", &self.aliases.keys().collect::<Vec<_>>())
			.finish()
	}
}
