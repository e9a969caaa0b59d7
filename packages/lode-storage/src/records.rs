use std::collections::{BTreeMap, HashMap};

use regex::Regex;
use serde_json::Value;
use sqlx::PgPool;

use lode_query::{BoxFuture, Record, RecordStore, key_to_id};

use crate::{Error, Result};

const IDENTIFIER_PATTERN: &str = r"^[A-Za-z_][A-Za-z0-9_]*$";

#[derive(Clone, Debug)]
struct RelationTable {
	table: String,
	foreign_key: String,
	foreign_key_column: String,
}

/// Reads the backing rows of one entity table.
///
/// Rows are fetched as JSON objects so any table shape maps onto [`Record`] attributes.
#[derive(Clone, Debug)]
pub struct PgRecordStore {
	pool: PgPool,
	table: String,
	relations: BTreeMap<String, RelationTable>,
}
impl PgRecordStore {
	pub fn new(pool: PgPool, entity: &lode_config::Entity) -> Result<Self> {
		let table = quote_identifier(entity.table())?;
		let mut relations = BTreeMap::new();

		for relation in &entity.relations {
			relations.insert(
				relation.name.clone(),
				RelationTable {
					table: quote_identifier(&relation.table)?,
					foreign_key: quote_identifier(&relation.foreign_key)?,
					foreign_key_column: relation.foreign_key.clone(),
				},
			);
		}

		Ok(Self { pool, table, relations })
	}

	pub async fn fetch_records(
		&self,
		key_name: &str,
		ids: &[String],
		columns: Option<&[String]>,
	) -> Result<HashMap<String, Record>> {
		if ids.is_empty() {
			return Ok(HashMap::new());
		}

		let key = quote_identifier(key_name)?;
		let select = match columns {
			Some(columns) if !columns.is_empty() => columns
				.iter()
				.map(|column| quote_identifier(column.as_str()))
				.collect::<Result<Vec<_>>>()?
				.join(", "),
			_ => "*".to_string(),
		};
		let sql = format!(
			"\
SELECT row_to_json(t)::jsonb
FROM (SELECT {select} FROM {table} WHERE {key}::text = ANY($1)) t",
			table = self.table,
		);
		let rows: Vec<Value> =
			sqlx::query_scalar(sql.as_str()).bind(ids.to_vec()).fetch_all(&self.pool).await?;
		let mut records = HashMap::with_capacity(rows.len());

		for row in rows {
			let Value::Object(attributes) = row else {
				continue;
			};
			let Some(id) = attributes.get(key_name).and_then(key_to_id) else {
				return Err(Error::InvalidResponse {
					message: format!("Row in {} has no usable {key_name} value.", self.table),
				});
			};

			records.insert(id.clone(), Record::new(id, attributes));
		}

		Ok(records)
	}

	pub async fn fetch_key_ids(&self, key_name: &str) -> Result<Vec<String>> {
		let key = quote_identifier(key_name)?;
		let sql = format!("SELECT {key}::text FROM {table} ORDER BY {key}", table = self.table);
		let ids: Vec<String> = sqlx::query_scalar(sql.as_str()).fetch_all(&self.pool).await?;

		Ok(ids)
	}

	/// Loads has-many relations keyed by each record's id.
	pub async fn attach_relations(&self, records: &mut [Record], relations: &[String]) -> Result<()> {
		if records.is_empty() {
			return Ok(());
		}

		let ids = records.iter().map(|record| record.id.clone()).collect::<Vec<_>>();

		for name in relations {
			let relation = self.relations.get(name).ok_or_else(|| Error::InvalidArgument {
				message: format!("Relation '{name}' is not declared for {}.", self.table),
			})?;
			let sql = format!(
				"\
SELECT row_to_json(t)::jsonb
FROM (SELECT * FROM {table} WHERE {foreign_key}::text = ANY($1)) t",
				table = relation.table,
				foreign_key = relation.foreign_key,
			);
			let rows: Vec<Value> =
				sqlx::query_scalar(sql.as_str()).bind(ids.clone()).fetch_all(&self.pool).await?;
			let mut grouped: HashMap<String, Vec<Value>> = HashMap::new();

			for row in rows {
				let Some(owner) = row.get(&relation.foreign_key_column).and_then(key_to_id) else {
					continue;
				};

				grouped.entry(owner).or_default().push(row);
			}

			for record in records.iter_mut() {
				let related = grouped.remove(&record.id).unwrap_or_default();

				record.relations.insert(name.clone(), related);
			}
		}

		Ok(())
	}
}
impl RecordStore for PgRecordStore {
	fn fetch_by_ids<'a>(
		&'a self,
		key_name: &'a str,
		ids: &'a [String],
		columns: Option<&'a [String]>,
	) -> BoxFuture<'a, color_eyre::Result<HashMap<String, Record>>> {
		Box::pin(async move { Ok(self.fetch_records(key_name, ids, columns).await?) })
	}

	fn fetch_ids<'a>(&'a self, key_name: &'a str) -> BoxFuture<'a, color_eyre::Result<Vec<String>>> {
		Box::pin(async move { Ok(self.fetch_key_ids(key_name).await?) })
	}

	fn load_relations<'a>(
		&'a self,
		records: &'a mut [Record],
		relations: &'a [String],
	) -> BoxFuture<'a, color_eyre::Result<()>> {
		Box::pin(async move { Ok(self.attach_relations(records, relations).await?) })
	}
}

/// Quotes a possibly schema-qualified identifier after checking each part.
pub fn quote_identifier(raw: &str) -> Result<String> {
	let parts = raw
		.split('.')
		.map(|part| {
			if is_identifier(part) {
				Ok(format!("\"{part}\""))
			} else {
				Err(Error::InvalidArgument { message: format!("'{raw}' is not a valid identifier.") })
			}
		})
		.collect::<Result<Vec<_>>>()?;

	Ok(parts.join("."))
}

fn is_identifier(raw: &str) -> bool {
	Regex::new(IDENTIFIER_PATTERN).map(|re| re.is_match(raw)).unwrap_or(false)
}

#[cfg(test)]
mod tests {
	use crate::records::quote_identifier;

	#[test]
	fn quotes_plain_and_qualified_names() {
		assert_eq!(quote_identifier("articles").expect("Plain name is valid."), "\"articles\"");
		assert_eq!(
			quote_identifier("public.articles").expect("Qualified name is valid."),
			"\"public\".\"articles\""
		);
	}

	#[test]
	fn rejects_injection_attempts() {
		for raw in ["", "a b", "id; DROP TABLE x", "x\"y", "1abc", "public."] {
			assert!(quote_identifier(raw).is_err(), "{raw:?} should be rejected.");
		}
	}
}
