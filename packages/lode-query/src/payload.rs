use std::ops::{Deref, DerefMut};

use serde_json::Value;

use crate::{Error, IndexConfigurator, Payload, Result, Searchable};

/// A payload bound to one index, with `index` (and `type` for entity payloads) protected.
#[derive(Clone, Debug)]
pub struct IndexPayload {
	payload: Payload,
	configurator: IndexConfigurator,
}
impl IndexPayload {
	pub fn new(configurator: &IndexConfigurator) -> Self {
		let mut payload = Payload::new();

		payload.protect("index", Value::String(configurator.name().to_string()));

		Self { payload, configurator: configurator.clone() }
	}

	/// Builds the payload for a searchable entity, adding the legacy `type` key.
	pub fn for_entity(entity: &dyn Searchable) -> Result<Self> {
		if entity.searchable_as().trim().is_empty() {
			return Err(Error::ContractViolation {
				message: "A searchable entity must declare a non-empty searchable name.".to_string(),
			});
		}
		if entity.key_name().trim().is_empty() {
			return Err(Error::ContractViolation {
				message: format!(
					"The {} entity must declare a non-empty key name.",
					entity.searchable_as()
				),
			});
		}

		let mut this = Self::new(entity.index_configurator()?);

		this.payload.protect("type", Value::String(entity.searchable_as().to_string()));

		Ok(this)
	}

	/// Retargets the payload at a configured alias of its index.
	pub fn use_alias(&mut self, alias: &str) -> Result<&mut Self> {
		let name = self.configurator.alias(alias)?;

		self.payload.replace_protected("index", Value::String(name));

		Ok(self)
	}

	pub fn into_payload(self) -> Payload {
		self.payload
	}
}
impl Deref for IndexPayload {
	type Target = Payload;

	fn deref(&self) -> &Self::Target {
		&self.payload
	}
}
impl DerefMut for IndexPayload {
	fn deref_mut(&mut self) -> &mut Self::Target {
		&mut self.payload
	}
}
