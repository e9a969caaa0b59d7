use std::{fs, path::Path};

use color_eyre::{Result, eyre};
use serde::Deserialize;
use serde_json::Value;

use lode_query::{QuerySpec, SearchOptions, Searchable};
use lode_service::start_query;

/// A search described as JSON, the input of every subcommand.
#[derive(Debug, Clone, Deserialize)]
pub struct SearchRequest {
	pub entity: String,
	#[serde(default = "default_query")]
	pub query: String,
	#[serde(default)]
	pub filters: Vec<Filter>,
	#[serde(default)]
	pub sort: Vec<Sort>,
	pub from: Option<u64>,
	pub size: Option<u64>,
	pub page: Option<u64>,
	pub per_page: Option<u64>,
	#[serde(default)]
	pub select: Vec<String>,
	pub collapse: Option<String>,
	pub min_score: Option<f64>,
	#[serde(default)]
	pub with: Vec<String>,
	#[serde(default)]
	pub trashed: Trashed,
	#[serde(default = "default_highlight")]
	pub highlight: bool,
}
impl SearchRequest {
	pub fn load(path: &Path) -> Result<Self> {
		let raw = fs::read_to_string(path)
			.map_err(|err| eyre::eyre!("Failed to read request file at {path:?}: {err}."))?;

		Ok(serde_json::from_str(&raw)?)
	}

	/// Starts a spec for `entity` and applies the whole request to it, page window included.
	pub fn spec(
		&self,
		settings: &lode_config::Search,
		entity: &dyn Searchable,
	) -> Result<QuerySpec> {
		let mut spec = start_query(settings, entity, &self.query);

		self.apply(&mut spec)?;

		if let Some((per_page, page)) = self.pagination() {
			spec.paginate(per_page, page);
		}

		Ok(spec)
	}

	/// Applies the request to a spec started for its entity.
	pub fn apply(&self, spec: &mut QuerySpec) -> Result<()> {
		for filter in &self.filters {
			filter.apply(spec)?;
		}

		for sort in &self.sort {
			match sort {
				Sort::Field { field, direction } => {
					spec.order_by(field, direction);
				},
				Sort::Raw(doc) => {
					spec.order_raw(doc.clone());
				},
			}
		}

		if let Some(from) = self.from {
			spec.from(from);
		}
		if let Some(size) = self.size {
			spec.take(size);
		}
		if !self.select.is_empty() {
			spec.select(self.select.iter().cloned());
		}
		if let Some(field) = &self.collapse {
			spec.collapse(field);
		}
		if let Some(score) = self.min_score {
			spec.min_score(score);
		}
		if !self.with.is_empty() {
			spec.with(self.with.iter().cloned());
		}

		match self.trashed {
			Trashed::Exclude => {},
			Trashed::Include => {
				spec.with_trashed();
			},
			Trashed::Only => {
				spec.only_trashed();
			},
		}

		Ok(())
	}

	/// The requested page, when both `page` and `per_page` are given.
	pub fn pagination(&self) -> Option<(u64, u64)> {
		Some((self.per_page?, self.page?))
	}

	/// Compile options for every command. Only highlighting is caller-controlled.
	pub fn options(&self) -> SearchOptions {
		SearchOptions { highlight: self.highlight, ..SearchOptions::default() }
	}
}

#[derive(Debug, Clone, Copy, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Trashed {
	#[default]
	Exclude,
	Include,
	Only,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum Sort {
	Field {
		field: String,
		#[serde(default = "default_direction")]
		direction: String,
	},
	Raw(Value),
}

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Filter {
	Compare {
		field: String,
		#[serde(default = "default_operator")]
		op: String,
		value: Value,
	},
	In {
		field: String,
		values: Vec<Value>,
		#[serde(default)]
		negated: bool,
	},
	Between {
		field: String,
		bounds: [Value; 2],
		#[serde(default)]
		negated: bool,
	},
	Exists {
		field: String,
		#[serde(default)]
		negated: bool,
	},
	Match {
		field: String,
		text: String,
		#[serde(default)]
		negated: bool,
	},
	Regexp {
		field: String,
		pattern: String,
		flags: Option<String>,
	},
	GeoDistance {
		field: String,
		point: Value,
		distance: Value,
	},
	GeoBoundingBox {
		field: String,
		bounds: Value,
	},
	GeoPolygon {
		field: String,
		points: Vec<Value>,
	},
	GeoShape {
		field: String,
		shape: Value,
		relation: Option<String>,
	},
}
impl Filter {
	fn apply(&self, spec: &mut QuerySpec) -> Result<()> {
		match self {
			Self::Compare { field, op, value } => {
				spec.where_op(field, op, value.clone());
			},
			Self::In { field, values, negated: false } => {
				spec.where_in(field, values.clone());
			},
			Self::In { field, values, negated: true } => {
				spec.where_not_in(field, values.clone());
			},
			Self::Between { field, bounds, negated: false } => {
				spec.where_between(field, bounds.clone());
			},
			Self::Between { field, bounds, negated: true } => {
				spec.where_not_between(field, bounds.clone());
			},
			Self::Exists { field, negated: false } => {
				spec.where_exists(field);
			},
			Self::Exists { field, negated: true } => {
				spec.where_not_exists(field);
			},
			Self::Match { field, text, negated: false } => {
				spec.where_match(field, text);
			},
			Self::Match { field, text, negated: true } => {
				spec.where_not_match(field, text);
			},
			Self::Regexp { field, pattern, flags } => {
				spec.where_regexp(field, pattern, flags.as_deref());
			},
			Self::GeoDistance { field, point, distance } => {
				spec.where_geo_distance(field, point.clone(), distance.clone());
			},
			Self::GeoBoundingBox { field, bounds } => {
				spec.where_geo_bounding_box(field, bounds.clone());
			},
			Self::GeoPolygon { field, points } => {
				if points.len() < 3 {
					return Err(eyre::eyre!("A geo polygon on {field} needs at least three points."));
				}

				spec.where_geo_polygon(field, points.clone());
			},
			Self::GeoShape { field, shape, relation } => {
				spec.where_geo_shape(field, shape.clone(), relation.as_deref());
			},
		}

		Ok(())
	}
}

fn default_query() -> String {
	"*".to_string()
}

fn default_direction() -> String {
	"asc".to_string()
}

fn default_operator() -> String {
	"=".to_string()
}

fn default_highlight() -> bool {
	true
}
