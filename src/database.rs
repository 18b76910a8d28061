// © 2024-2025 ElementalAlchemist and the Dainsleif Mains Development Team
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use crate::config::DatabaseConfig;
use diesel::prelude::*;
use diesel::r2d2::{ConnectionManager, Pool, PooledConnection};
use diesel_migrations::{EmbeddedMigrations, MigrationHarness, embed_migrations};
use miette::{Diagnostic, IntoDiagnostic};
use std::error::Error;
use std::fmt;

const MIGRATIONS: EmbeddedMigrations = embed_migrations!();

pub type DbPool = Pool<ConnectionManager<PgConnection>>;
pub type DbConnection = PooledConnection<ConnectionManager<PgConnection>>;

// To get boxed errors (as returned by the migration runner) into miette, we need a wrapper type for them.
#[derive(Debug, Diagnostic)]
pub struct MigrationError(pub Box<dyn Error + Send + Sync>);

impl fmt::Display for MigrationError {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		fmt::Display::fmt(&self.0, f)
	}
}

impl Error for MigrationError {
	fn source(&self) -> Option<&(dyn Error + 'static)> {
		self.0.source()
	}
}

pub fn connect_db(config: &DatabaseConfig) -> miette::Result<DbPool> {
	let url = db_url(config);
	let manager: ConnectionManager<PgConnection> = ConnectionManager::new(url);
	Pool::builder()
		.max_size(config.max_connections)
		.min_idle(Some(config.min_idle))
		.test_on_check_out(true)
		.build(manager)
		.into_diagnostic()
}

fn db_url(db_config: &DatabaseConfig) -> String {
	match db_config.port {
		Some(port) => format!(
			"postgres://{}:{}@{}:{}/{}",
			db_config.username, db_config.password, db_config.host, port, db_config.database
		),
		None => format!(
			"postgres://{}:{}@{}/{}",
			db_config.username, db_config.password, db_config.host, db_config.database
		),
	}
}

pub fn run_embedded_migrations(db_connection_pool: &DbPool) -> Result<(), MigrationError> {
	let mut db_connection = match db_connection_pool.get() {
		Ok(connection) => connection,
		Err(error) => return Err(MigrationError(Box::new(error))),
	};
	match db_connection.run_pending_migrations(MIGRATIONS) {
		Ok(_) => Ok(()),
		Err(error) => Err(MigrationError(error)),
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	fn config(port: Option<u16>) -> DatabaseConfig {
		DatabaseConfig {
			host: String::from("db.internal"),
			port,
			username: String::from("steward"),
			password: String::from("pw"),
			database: String::from("steward"),
			max_connections: 20,
			min_idle: 2,
		}
	}

	#[test]
	fn url_without_port() {
		assert_eq!(db_url(&config(None)), "postgres://steward:pw@db.internal/steward");
	}

	#[test]
	fn url_with_port() {
		assert_eq!(db_url(&config(Some(6543))), "postgres://steward:pw@db.internal:6543/steward");
	}
}
