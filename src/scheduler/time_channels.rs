// © 2024-2025 ElementalAlchemist and the Dainsleif Mains Development Team
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use crate::context::BotContext;
use crate::discord::utils::errors::report_discord_error;
use crate::model::{TimeChannelConfig, database_id_from_discord_id};
use crate::schema::time_channel_configs;
use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use diesel::prelude::*;
use miette::IntoDiagnostic;
use twilight_model::id::Id;
use twilight_model::id::marker::{ChannelMarker, GuildMarker};

pub const DATE_TIMEZONE: Tz = chrono_tz::Asia::Kolkata;
pub const INDIA_TIMEZONE: Tz = chrono_tz::Asia::Kolkata;
pub const JAPAN_TIMEZONE: Tz = chrono_tz::Asia::Tokyo;

pub fn date_channel_name(now: DateTime<Utc>) -> String {
	now.with_timezone(&DATE_TIMEZONE).format("📅 %d %B, %Y").to_string()
}

pub fn india_channel_name(now: DateTime<Utc>) -> String {
	now.with_timezone(&INDIA_TIMEZONE).format("🇮🇳 IST %H:%M").to_string()
}

pub fn japan_channel_name(now: DateTime<Utc>) -> String {
	now.with_timezone(&JAPAN_TIMEZONE).format("🇯🇵 JST %H:%M").to_string()
}

pub fn get_time_channel_config(
	db_connection: &mut PgConnection,
	guild_id: Id<GuildMarker>,
) -> QueryResult<Option<TimeChannelConfig>> {
	time_channel_configs::table
		.find(database_id_from_discord_id(guild_id.get()))
		.first(db_connection)
		.optional()
}

pub fn list_enabled_configs(db_connection: &mut PgConnection) -> QueryResult<Vec<TimeChannelConfig>> {
	time_channel_configs::table
		.filter(time_channel_configs::enabled.eq(true))
		.load(db_connection)
}

/// Sets which channels a guild uses for the date and clocks, enabling updates. Channels passed as `None` stop being
/// updated.
pub fn set_time_channels(
	db_connection: &mut PgConnection,
	guild_id: Id<GuildMarker>,
	date_channel: Option<Id<ChannelMarker>>,
	india_channel: Option<Id<ChannelMarker>>,
	japan_channel: Option<Id<ChannelMarker>>,
) -> QueryResult<TimeChannelConfig> {
	let config = TimeChannelConfig {
		guild_id: database_id_from_discord_id(guild_id.get()),
		date_channel_id: date_channel.map(|channel_id| database_id_from_discord_id(channel_id.get())),
		india_channel_id: india_channel.map(|channel_id| database_id_from_discord_id(channel_id.get())),
		japan_channel_id: japan_channel.map(|channel_id| database_id_from_discord_id(channel_id.get())),
		enabled: true,
	};
	diesel::insert_into(time_channel_configs::table)
		.values(&config)
		.on_conflict(time_channel_configs::guild_id)
		.do_update()
		.set(&config)
		.get_result(db_connection)
}

/// Returns whether the guild had time channels enabled.
pub fn disable_time_channels(db_connection: &mut PgConnection, guild_id: Id<GuildMarker>) -> QueryResult<bool> {
	let updated = diesel::update(time_channel_configs::table.find(database_id_from_discord_id(guild_id.get())))
		.filter(time_channel_configs::enabled.eq(true))
		.set(time_channel_configs::enabled.eq(false))
		.execute(db_connection)?;
	Ok(updated > 0)
}

/// Renames a channel unless it already has the name.
async fn rename_if_changed(ctx: &BotContext, channel_id: Id<ChannelMarker>, name: &str) {
	let current_name = ctx.cache.channel(channel_id).and_then(|channel| channel.name.clone());
	if current_name.as_deref() == Some(name) {
		return;
	}
	if let Err(error) = ctx.http_client.update_channel(channel_id).name(name).await {
		report_discord_error(&error, "rename time channel");
	}
}

fn configs_for_cached_guilds(ctx: &BotContext) -> miette::Result<Vec<TimeChannelConfig>> {
	let mut db_connection = ctx.db_connection_pool.get().into_diagnostic()?;
	let configs = list_enabled_configs(&mut db_connection).into_diagnostic()?;
	Ok(configs
		.into_iter()
		.filter(|config| ctx.cache.guild(config.get_guild()).is_some())
		.collect())
}

/// Updates the India and Japan clock channels for every guild using them.
pub async fn update_time_channels(ctx: &BotContext, now: DateTime<Utc>) -> miette::Result<()> {
	let india_name = india_channel_name(now);
	let japan_name = japan_channel_name(now);
	for config in configs_for_cached_guilds(ctx)? {
		if let Some(channel_id) = config.get_india_channel() {
			rename_if_changed(ctx, channel_id, &india_name).await;
		}
		if let Some(channel_id) = config.get_japan_channel() {
			rename_if_changed(ctx, channel_id, &japan_name).await;
		}
	}
	Ok(())
}

pub async fn update_date_channels(ctx: &BotContext, now: DateTime<Utc>) -> miette::Result<()> {
	let date_name = date_channel_name(now);
	for config in configs_for_cached_guilds(ctx)? {
		if let Some(channel_id) = config.get_date_channel() {
			rename_if_changed(ctx, channel_id, &date_name).await;
		}
	}
	tracing::debug!(name = %date_name, "Updated date channels");
	Ok(())
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn channel_names() {
		// 19:05 UTC on April 30 is already May 1 in both India and Japan
		let now = DateTime::parse_from_rfc3339("2025-04-30T19:05:00Z")
			.unwrap()
			.with_timezone(&Utc);
		assert_eq!(date_channel_name(now), "📅 01 May, 2025");
		assert_eq!(india_channel_name(now), "🇮🇳 IST 00:35");
		assert_eq!(japan_channel_name(now), "🇯🇵 JST 04:05");
	}
}
