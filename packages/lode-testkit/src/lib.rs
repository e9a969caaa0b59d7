pub mod fakes;

mod error;

pub use error::{Error, Result};
pub use fakes::{
	ClientOp, MemoryRecordStore, RecordedCall, RecordingIndexer, ScriptedSearchClient, hits_response,
};

use std::{env, str::FromStr, thread};

use sqlx::{
	ConnectOptions, Connection, Executor,
	postgres::{PgConnectOptions, PgConnection},
};
use tokio::runtime::Builder;
use uuid::Uuid;

/// Environment variable holding the DSN of a Postgres server the tests may create databases on.
pub const PG_DSN_VAR: &str = "LODE_PG_DSN";

pub fn env_dsn() -> Option<String> {
	env::var(PG_DSN_VAR).ok().filter(|dsn| !dsn.trim().is_empty())
}

/// A database named `lode_test_<uuid>` on the server behind [`PG_DSN_VAR`].
///
/// Dropped on [`TestDatabase::cleanup`], or from a helper thread when the value goes out of scope.
pub struct TestDatabase {
	name: String,
	options: PgConnectOptions,
	admin: PgConnectOptions,
	dropped: bool,
}
impl TestDatabase {
	pub async fn new(server_dsn: &str) -> Result<Self> {
		let server = PgConnectOptions::from_str(server_dsn)
			.map_err(|err| Error::Message(format!("{PG_DSN_VAR} is not a valid DSN: {err}.")))?;
		let admin = server.clone().database("postgres");
		let name = format!("lode_test_{}", Uuid::new_v4().simple());
		let mut conn = PgConnection::connect_with(&admin).await?;

		conn.execute(format!(r#"CREATE DATABASE "{name}""#).as_str()).await?;

		Ok(Self { options: server.database(&name), name, admin, dropped: false })
	}

	pub fn dsn(&self) -> String {
		self.options.to_url_lossy().to_string()
	}

	/// Runs each statement in order on a fresh connection.
	pub async fn seed(&self, statements: &[&str]) -> Result<()> {
		let mut conn = PgConnection::connect_with(&self.options).await?;

		for statement in statements {
			conn.execute(*statement).await?;
		}

		conn.close().await?;

		Ok(())
	}

	pub async fn cleanup(mut self) -> Result<()> {
		drop_database(&self.admin, &self.name).await?;

		self.dropped = true;

		Ok(())
	}
}
impl Drop for TestDatabase {
	fn drop(&mut self) {
		if self.dropped {
			return;
		}

		let admin = self.admin.clone();
		let name = self.name.clone();
		let handle = thread::spawn(move || {
			let outcome = Builder::new_current_thread()
				.enable_all()
				.build()
				.map_err(|err| Error::Message(err.to_string()))
				.and_then(|runtime| runtime.block_on(drop_database(&admin, &name)));

			if let Err(err) = outcome {
				eprintln!("Failed to drop test database {name}: {err}.");
			}
		});
		let _ = handle.join();
	}
}

async fn drop_database(admin: &PgConnectOptions, name: &str) -> Result<()> {
	let mut conn = PgConnection::connect_with(admin).await?;

	conn.execute(format!(r#"DROP DATABASE IF EXISTS "{name}" WITH (FORCE)"#).as_str()).await?;

	Ok(())
}
