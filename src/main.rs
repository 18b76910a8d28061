// © 2024-2025 ElementalAlchemist and the Dainsleif Mains Development Team
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use guild_steward::config::{DEFAULT_CONFIG_PATH, parse_config};
use guild_steward::context::BotContext;
use guild_steward::database::{connect_db, run_embedded_migrations};
use guild_steward::discord::run_bot;
use guild_steward::scheduler::spawn_scheduled_tasks;
use guild_steward::web::run_server_task;
use miette::IntoDiagnostic;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> miette::Result<()> {
	tracing_subscriber::fmt()
		.with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
		.init();

	let config_path = std::env::args().nth(1).unwrap_or_else(|| DEFAULT_CONFIG_PATH.to_string());
	let config = Arc::new(parse_config(&config_path).await?);

	let db_connection_pool = connect_db(&config.database)?;
	run_embedded_migrations(&db_connection_pool)?;

	let ctx = Arc::new(BotContext::new(config, db_connection_pool).await?);

	tokio::spawn(run_server_task(Arc::clone(&ctx)));
	spawn_scheduled_tasks(Arc::clone(&ctx));

	tokio::select! {
		result = run_bot(ctx) => result,
		signal = tokio::signal::ctrl_c() => {
			signal.into_diagnostic()?;
			tracing::info!("Shutting down");
			Ok(())
		}
	}
}
