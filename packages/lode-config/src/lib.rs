mod error;
mod types;

pub use error::{Error, Result};
pub use types::{Config, Engine, Entity, Index, Postgres, Relation, Search, Service, Storage};

use std::{collections::HashSet, fs, path::Path};

pub fn load(path: &Path) -> Result<Config> {
	let raw = fs::read_to_string(path)
		.map_err(|err| Error::ReadConfig { path: path.to_path_buf(), source: err })?;

	let mut cfg: Config = toml::from_str(&raw)
		.map_err(|err| Error::ParseConfig { path: path.to_path_buf(), source: err })?;

	normalize(&mut cfg);

	validate(&cfg)?;

	Ok(cfg)
}

pub fn validate(cfg: &Config) -> Result<()> {
	if cfg.engine.url.trim().is_empty() {
		return Err(Error::Validation { message: "engine.url must be non-empty.".to_string() });
	}
	if cfg.engine.timeout_ms == 0 {
		return Err(Error::Validation {
			message: "engine.timeout_ms must be greater than zero.".to_string(),
		});
	}

	for (key, value) in &cfg.engine.default_headers {
		if !value.is_string() {
			return Err(Error::Validation {
				message: format!("engine.default_headers.{key} must be a string."),
			});
		}
	}

	if cfg.storage.postgres.pool_max_conns == 0 {
		return Err(Error::Validation {
			message: "storage.postgres.pool_max_conns must be greater than zero.".to_string(),
		});
	}

	let mut index_names = HashSet::new();

	for index in &cfg.indices {
		if index.name.trim().is_empty() {
			return Err(Error::Validation {
				message: "indices.name must be non-empty.".to_string(),
			});
		}
		if !index_names.insert(index.name.as_str()) {
			return Err(Error::Validation {
				message: format!("indices.name '{}' is declared more than once.", index.name),
			});
		}

		for (alias, suffix) in &index.aliases {
			if alias.trim().is_empty() || suffix.trim().is_empty() {
				return Err(Error::Validation {
					message: format!(
						"indices.aliases for '{}' must have non-empty names and suffixes.",
						index.name
					),
				});
			}
		}
	}

	let mut entity_names = HashSet::new();

	for entity in &cfg.entities {
		if entity.name.trim().is_empty() {
			return Err(Error::Validation {
				message: "entities.name must be non-empty.".to_string(),
			});
		}
		if !entity_names.insert(entity.name.as_str()) {
			return Err(Error::Validation {
				message: format!("entities.name '{}' is declared more than once.", entity.name),
			});
		}
		if entity.key.trim().is_empty() {
			return Err(Error::Validation {
				message: format!("entities.key for '{}' must be non-empty.", entity.name),
			});
		}

		if let Some(index) = entity.index.as_deref()
			&& !index_names.contains(index)
		{
			return Err(Error::Validation {
				message: format!(
					"entities.index '{index}' for '{}' does not match any declared index.",
					entity.name
				),
			});
		}

		for relation in &entity.relations {
			if relation.name.trim().is_empty()
				|| relation.table.trim().is_empty()
				|| relation.foreign_key.trim().is_empty()
			{
				return Err(Error::Validation {
					message: format!(
						"entities.relations for '{}' must have non-empty name, table, and foreign_key.",
						entity.name
					),
				});
			}
		}
	}

	Ok(())
}

fn normalize(cfg: &mut Config) {
	if cfg.engine.api_key.as_deref().map(|key| key.trim().is_empty()).unwrap_or(false) {
		cfg.engine.api_key = None;
	}

	cfg.engine.url = cfg.engine.url.trim_end_matches('/').to_string();

	for entity in &mut cfg.entities {
		if entity.index.as_deref().map(|index| index.trim().is_empty()).unwrap_or(false) {
			entity.index = None;
		}
		if entity.table.as_deref().map(|table| table.trim().is_empty()).unwrap_or(false) {
			entity.table = None;
		}
	}
}
