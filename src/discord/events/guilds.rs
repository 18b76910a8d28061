// © 2024-2025 ElementalAlchemist and the Dainsleif Mains Development Team
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use crate::context::BotContext;
use crate::discord::utils::errors::report_discord_error;
use crate::guilds::is_guild_banned;
use crate::stats::refresh_stats;
use miette::IntoDiagnostic;
use twilight_model::id::Id;
use twilight_model::id::marker::GuildMarker;

/// Leaves guilds on the ban list as soon as they're joined or become available.
pub async fn handle_guild_create(ctx: &BotContext, guild_id: Id<GuildMarker>) -> miette::Result<()> {
	let banned = {
		let mut db_connection = ctx.db_connection_pool.get().into_diagnostic()?;
		is_guild_banned(&mut db_connection, guild_id).into_diagnostic()?
	};
	if banned {
		tracing::warn!(guild = %guild_id, "Joined a banned guild; leaving");
		if let Err(error) = ctx.http_client.leave_guild(guild_id).await {
			report_discord_error(&error, "leave banned guild");
		}
		return Ok(());
	}

	refresh_stats(ctx)
}
