// © 2024-2025 ElementalAlchemist and the Dainsleif Mains Development Team
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use crate::context::BotContext;
use crate::model::{BOT_STATS_ROW, BotStats};
use crate::schema::bot_stats;
use chrono::{DateTime, Utc};
use diesel::prelude::*;
use miette::IntoDiagnostic;

pub fn get_stats(db_connection: &mut PgConnection) -> QueryResult<Option<BotStats>> {
	bot_stats::table.find(BOT_STATS_ROW).first(db_connection).optional()
}

pub fn record_command_use(db_connection: &mut PgConnection) -> QueryResult<()> {
	diesel::update(bot_stats::table.find(BOT_STATS_ROW))
		.set(bot_stats::commands_used.eq(bot_stats::commands_used + 1))
		.execute(db_connection)?;
	Ok(())
}

pub fn save_counts(
	db_connection: &mut PgConnection,
	server_count: i64,
	user_count: i64,
	now: DateTime<Utc>,
) -> QueryResult<()> {
	diesel::update(bot_stats::table.find(BOT_STATS_ROW))
		.set((
			bot_stats::server_count.eq(server_count),
			bot_stats::user_count.eq(user_count),
			bot_stats::updated_at.eq(now),
		))
		.execute(db_connection)?;
	Ok(())
}

/// Server and member totals across every guild in the cache
pub fn cached_counts(ctx: &BotContext) -> (i64, i64) {
	let mut server_count = 0;
	let mut user_count = 0;
	for guild in ctx.cache.iter().guilds() {
		server_count += 1;
		user_count += guild.value().member_count().unwrap_or_default();
	}
	(server_count, i64::try_from(user_count).unwrap_or(i64::MAX))
}

/// Stores the current guild and member counts.
pub fn refresh_stats(ctx: &BotContext) -> miette::Result<()> {
	let (server_count, user_count) = cached_counts(ctx);
	let mut db_connection = ctx.db_connection_pool.get().into_diagnostic()?;
	save_counts(&mut db_connection, server_count, user_count, Utc::now()).into_diagnostic()?;
	tracing::debug!(server_count, user_count, "Refreshed bot stats");
	Ok(())
}
