pub mod request;

use std::{path::PathBuf, sync::Arc};

use clap::{
	Parser, Subcommand,
	builder::{
		Styles,
		styling::{AnsiColor, Effects},
	},
};
use color_eyre::eyre;
use serde::Serialize;
use tracing_subscriber::EnvFilter;

use lode_query::{ConfiguredEntity, RuleRegistry, compile_all};
use lode_service::SearchEngine;
use lode_storage::{bulk::BulkIndexer, db::Db, engine::EsClient, records::PgRecordStore};

use crate::request::SearchRequest;

pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[derive(Debug, Parser)]
#[command(version = VERSION, rename_all = "kebab", styles = styles())]
pub struct Args {
	#[arg(long, short = 'c', value_name = "FILE")]
	pub config: PathBuf,
	#[command(subcommand)]
	pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
	/// Print the payload each applicable rule would send, without contacting the engine.
	Compile(RequestArgs),
	/// Run the search and print the matching records.
	Search {
		#[command(flatten)]
		request: RequestArgs,
		/// Print the engine response instead of loading records.
		#[arg(long)]
		raw: bool,
		#[arg(long, conflicts_with_all = ["raw", "profile"])]
		explain: bool,
		#[arg(long, conflicts_with = "raw")]
		profile: bool,
	},
	/// Print the number of matching documents.
	Count(RequestArgs),
}

#[derive(Debug, clap::Args)]
pub struct RequestArgs {
	/// JSON search request.
	#[arg(long, short = 'r', value_name = "FILE")]
	pub request: PathBuf,
}

pub async fn run(args: Args) -> color_eyre::Result<()> {
	let config = lode_config::load(&args.config)?;

	init_tracing(&config);

	let registry = RuleRegistry::new();

	match args.command {
		Command::Compile(input) => {
			let request = SearchRequest::load(&input.request)?;
			let entity = ConfiguredEntity::lookup(&config, &request.entity, &registry)?;
			let spec = request.spec(&config.search, &entity)?;

			let payloads = compile_all(&entity, &spec, request.options())?
				.into_iter()
				.map(|payload| payload.into_value())
				.collect::<Vec<_>>();

			print_json(&payloads)
		},
		Command::Search { request: input, raw, explain, profile } => {
			let request = SearchRequest::load(&input.request)?;
			let entity = ConfiguredEntity::lookup(&config, &request.entity, &registry)?;
			let engine = build_engine(&config)?;
			let spec = request.spec(&config.search, &entity)?;

			if explain {
				return print_json(&engine.explain(&entity, &spec).await?);
			}
			if profile {
				return print_json(&engine.profile(&entity, &spec).await?);
			}
			if raw {
				let outcome = engine.search_with(&entity, &spec, request.options()).await?;

				tracing::info!(
					entity = %request.entity,
					rule = ?outcome.rule,
					total = outcome.result.total,
					"Search finished."
				);

				return print_json(&outcome.result.raw);
			}

			let store = connect_store(&config, &request).await?;

			match request.pagination() {
				Some((per_page, page)) => print_json(
					&engine
						.paginate_with(&entity, &spec, &store, per_page, page, request.options())
						.await?,
				),
				None => print_json(
					&engine.get_with(&entity, &spec, &store, request.options()).await?,
				),
			}
		},
		Command::Count(input) => {
			let request = SearchRequest::load(&input.request)?;
			let entity = ConfiguredEntity::lookup(&config, &request.entity, &registry)?;
			let engine = build_engine(&config)?;
			let spec = request.spec(&config.search, &entity)?;

			let count = engine.count(&entity, &spec).await?;

			tracing::info!(entity = %request.entity, count, "Count finished.");
			println!("{count}");

			Ok(())
		},
	}
}

pub fn styles() -> Styles {
	Styles::styled()
		.header(AnsiColor::Red.on_default() | Effects::BOLD)
		.usage(AnsiColor::Red.on_default() | Effects::BOLD)
		.literal(AnsiColor::Blue.on_default() | Effects::BOLD)
		.placeholder(AnsiColor::Green.on_default())
}

fn build_engine(config: &lode_config::Config) -> color_eyre::Result<SearchEngine> {
	let client = EsClient::new(&config.engine)?;
	let indexer = BulkIndexer::new(client.clone());

	Ok(SearchEngine::new(config.search.clone(), Arc::new(client), Arc::new(indexer)))
}

async fn connect_store(
	config: &lode_config::Config,
	request: &SearchRequest,
) -> color_eyre::Result<PgRecordStore> {
	let entity = config
		.entity(&request.entity)
		.ok_or_else(|| eyre::eyre!("Entity '{}' is not declared.", request.entity))?;
	let db = Db::connect(&config.storage.postgres).await?;

	Ok(PgRecordStore::new(db.pool, entity)?)
}

fn print_json<T>(value: &T) -> color_eyre::Result<()>
where
	T: Serialize,
{
	println!("{}", serde_json::to_string_pretty(value)?);

	Ok(())
}

fn init_tracing(config: &lode_config::Config) {
	let filter =
		EnvFilter::try_new(&config.service.log_level).unwrap_or_else(|_| EnvFilter::new("info"));

	tracing_subscriber::fmt().with_env_filter(filter).with_writer(std::io::stderr).init();
}
