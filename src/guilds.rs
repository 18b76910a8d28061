// © 2024-2025 ElementalAlchemist and the Dainsleif Mains Development Team
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use crate::model::{BannedGuild, database_id_from_discord_id};
use crate::schema::banned_guilds;
use chrono::{DateTime, Utc};
use diesel::prelude::*;
use twilight_model::id::Id;
use twilight_model::id::marker::{GuildMarker, UserMarker};

pub fn is_guild_banned(db_connection: &mut PgConnection, guild_id: Id<GuildMarker>) -> QueryResult<bool> {
	let banned: Option<BannedGuild> = banned_guilds::table
		.find(database_id_from_discord_id(guild_id.get()))
		.first(db_connection)
		.optional()?;
	Ok(banned.is_some())
}

/// Returns whether the guild was newly banned.
pub fn ban_guild(
	db_connection: &mut PgConnection,
	guild_id: Id<GuildMarker>,
	banned_by: Id<UserMarker>,
	now: DateTime<Utc>,
) -> QueryResult<bool> {
	let ban = BannedGuild {
		guild_id: database_id_from_discord_id(guild_id.get()),
		banned_by: database_id_from_discord_id(banned_by.get()),
		banned_at: now,
	};
	let inserted = diesel::insert_into(banned_guilds::table)
		.values(&ban)
		.on_conflict_do_nothing()
		.execute(db_connection)?;
	Ok(inserted > 0)
}

/// Returns whether the guild had been banned.
pub fn unban_guild(db_connection: &mut PgConnection, guild_id: Id<GuildMarker>) -> QueryResult<bool> {
	let deleted = diesel::delete(banned_guilds::table.find(database_id_from_discord_id(guild_id.get())))
		.execute(db_connection)?;
	Ok(deleted > 0)
}
