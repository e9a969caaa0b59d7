pub mod clause;
pub mod client;
pub mod compiler;
pub mod document;
pub mod index;
pub mod payload;
pub mod record;
pub mod response;
pub mod rule;
pub mod searchable;
pub mod soft_delete;
pub mod spec;

mod error;

pub use clause::{ClauseKind, Condition, FilterClause, Operator, RangeBound};
pub use client::{
	BoxFuture, IndexDocument, IndexTarget, Indexer, RawCallback, RecordStore, SearchClient,
};
pub use compiler::{SearchOptions, applicable_rules, compile, compile_all};
pub use document::{Payload, is_empty_value};
pub use error::{Error, Result};
pub use index::{IndexConfigurator, WRITE_ALIAS};
pub use payload::IndexPayload;
pub use record::{Highlight, Record, key_to_id};
pub use response::{Hit, SearchResult, count_value, total_count};
pub use rule::{QUERY_STRING_RULE, QueryStringRule, Rule, RuleRegistry, SearchRule};
pub use searchable::{ConfiguredEntity, Searchable, effective_mapping};
pub use soft_delete::{SOFT_DELETE_FIELD, SoftDeleteState, TRASHED_AT_FIELD, marker_value};
pub use spec::{QuerySpec, SortDirection, SortDirective};
