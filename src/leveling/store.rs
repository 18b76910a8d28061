// © 2024-2025 ElementalAlchemist and the Dainsleif Mains Development Team
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use super::rewards::RewardTable;
use super::state::GuildLevelSettings;
use crate::model::{
	AutoReset, LastNotifiedLevel, LevelNotifyChannel, LevelRoleReward, LevelSettings, UserLevel, UserXpGain,
	database_id_from_discord_id,
};
use crate::schema::{auto_resets, last_notified_levels, level_notify_channels, level_role_rewards, level_settings, user_levels};
use chrono::{DateTime, Utc};
use diesel::prelude::*;
use diesel::upsert::excluded;
use twilight_model::id::Id;
use twilight_model::id::marker::{ChannelMarker, GuildMarker, RoleMarker, UserMarker};

/// Gets a guild's XP rates, storing the defaults first if the guild has none.
pub fn get_or_create_settings(
	db_connection: &mut PgConnection,
	guild_id: Id<GuildMarker>,
) -> QueryResult<GuildLevelSettings> {
	let db_guild_id = database_id_from_discord_id(guild_id.get());
	diesel::insert_into(level_settings::table)
		.values(GuildLevelSettings::default().to_record(db_guild_id))
		.on_conflict_do_nothing()
		.execute(db_connection)?;
	let settings: LevelSettings = level_settings::table.find(db_guild_id).first(db_connection)?;
	Ok(GuildLevelSettings::from(&settings))
}

pub fn save_settings(
	db_connection: &mut PgConnection,
	guild_id: Id<GuildMarker>,
	settings: GuildLevelSettings,
) -> QueryResult<()> {
	let record = settings.to_record(database_id_from_discord_id(guild_id.get()));
	diesel::insert_into(level_settings::table)
		.values(&record)
		.on_conflict(level_settings::guild_id)
		.do_update()
		.set(&record)
		.execute(db_connection)?;
	Ok(())
}

/// Adds XP to a user, creating their row if needed. Returns the stored state after the gain.
pub fn add_xp(
	db_connection: &mut PgConnection,
	guild_id: Id<GuildMarker>,
	user_id: Id<UserMarker>,
	xp: u64,
	voice_xp: u64,
) -> QueryResult<UserLevel> {
	let gain = UserXpGain {
		guild_id: database_id_from_discord_id(guild_id.get()),
		user_id: database_id_from_discord_id(user_id.get()),
		xp: i64::try_from(xp).unwrap_or(i64::MAX),
		voice_xp_earned: i64::try_from(voice_xp).unwrap_or(i64::MAX),
	};
	diesel::insert_into(user_levels::table)
		.values(&gain)
		.on_conflict((user_levels::guild_id, user_levels::user_id))
		.do_update()
		.set((
			user_levels::xp.eq(user_levels::xp + excluded(user_levels::xp)),
			user_levels::voice_xp_earned.eq(user_levels::voice_xp_earned + excluded(user_levels::voice_xp_earned)),
		))
		.get_result(db_connection)
}

pub fn get_user_level(
	db_connection: &mut PgConnection,
	guild_id: Id<GuildMarker>,
	user_id: Id<UserMarker>,
) -> QueryResult<Option<UserLevel>> {
	user_levels::table
		.find((
			database_id_from_discord_id(guild_id.get()),
			database_id_from_discord_id(user_id.get()),
		))
		.first(db_connection)
		.optional()
}

pub fn list_user_levels(db_connection: &mut PgConnection, guild_id: Id<GuildMarker>) -> QueryResult<Vec<UserLevel>> {
	user_levels::table
		.filter(user_levels::guild_id.eq(database_id_from_discord_id(guild_id.get())))
		.load(db_connection)
}

pub fn leaderboard(db_connection: &mut PgConnection, guild_id: Id<GuildMarker>, limit: i64) -> QueryResult<Vec<UserLevel>> {
	user_levels::table
		.filter(user_levels::guild_id.eq(database_id_from_discord_id(guild_id.get())))
		.order((user_levels::xp.desc(), user_levels::user_id))
		.limit(limit)
		.load(db_connection)
}

pub fn get_last_notified_level(
	db_connection: &mut PgConnection,
	guild_id: Id<GuildMarker>,
	user_id: Id<UserMarker>,
) -> QueryResult<u32> {
	let level: Option<i32> = last_notified_levels::table
		.find((
			database_id_from_discord_id(guild_id.get()),
			database_id_from_discord_id(user_id.get()),
		))
		.select(last_notified_levels::level)
		.first(db_connection)
		.optional()?;
	Ok(level.unwrap_or(0).max(0) as u32)
}

pub fn set_last_notified_level(
	db_connection: &mut PgConnection,
	guild_id: Id<GuildMarker>,
	user_id: Id<UserMarker>,
	level: u32,
) -> QueryResult<()> {
	let record = LastNotifiedLevel {
		guild_id: database_id_from_discord_id(guild_id.get()),
		user_id: database_id_from_discord_id(user_id.get()),
		level: i32::try_from(level).unwrap_or(i32::MAX),
	};
	diesel::insert_into(last_notified_levels::table)
		.values(&record)
		.on_conflict((last_notified_levels::guild_id, last_notified_levels::user_id))
		.do_update()
		.set(last_notified_levels::level.eq(record.level))
		.execute(db_connection)?;
	Ok(())
}

pub fn get_notify_channel(
	db_connection: &mut PgConnection,
	guild_id: Id<GuildMarker>,
) -> QueryResult<Option<Id<ChannelMarker>>> {
	let channel: Option<LevelNotifyChannel> = level_notify_channels::table
		.find(database_id_from_discord_id(guild_id.get()))
		.first(db_connection)
		.optional()?;
	Ok(channel.map(|channel| channel.get_channel()))
}

pub fn set_notify_channel(
	db_connection: &mut PgConnection,
	guild_id: Id<GuildMarker>,
	channel_id: Id<ChannelMarker>,
) -> QueryResult<()> {
	let record = LevelNotifyChannel {
		guild_id: database_id_from_discord_id(guild_id.get()),
		channel_id: database_id_from_discord_id(channel_id.get()),
	};
	diesel::insert_into(level_notify_channels::table)
		.values(&record)
		.on_conflict(level_notify_channels::guild_id)
		.do_update()
		.set(level_notify_channels::channel_id.eq(record.channel_id))
		.execute(db_connection)?;
	Ok(())
}

pub fn get_reward_records(
	db_connection: &mut PgConnection,
	guild_id: Id<GuildMarker>,
) -> QueryResult<Vec<LevelRoleReward>> {
	level_role_rewards::table
		.filter(level_role_rewards::guild_id.eq(database_id_from_discord_id(guild_id.get())))
		.order(level_role_rewards::level)
		.load(db_connection)
}

pub fn get_reward_table(db_connection: &mut PgConnection, guild_id: Id<GuildMarker>) -> QueryResult<RewardTable> {
	let records = get_reward_records(db_connection, guild_id)?;
	Ok(RewardTable::from_records(&records))
}

pub fn set_level_reward(
	db_connection: &mut PgConnection,
	guild_id: Id<GuildMarker>,
	level: u32,
	role_id: Id<RoleMarker>,
) -> QueryResult<()> {
	let record = LevelRoleReward {
		guild_id: database_id_from_discord_id(guild_id.get()),
		level: i32::try_from(level).unwrap_or(i32::MAX),
		role_id: database_id_from_discord_id(role_id.get()),
	};
	diesel::insert_into(level_role_rewards::table)
		.values(&record)
		.on_conflict((level_role_rewards::guild_id, level_role_rewards::level))
		.do_update()
		.set(level_role_rewards::role_id.eq(record.role_id))
		.execute(db_connection)?;
	Ok(())
}

/// Returns whether a reward was configured at that level.
pub fn remove_level_reward(db_connection: &mut PgConnection, guild_id: Id<GuildMarker>, level: u32) -> QueryResult<bool> {
	let deleted = diesel::delete(level_role_rewards::table)
		.filter(level_role_rewards::guild_id.eq(database_id_from_discord_id(guild_id.get())))
		.filter(level_role_rewards::level.eq(i32::try_from(level).unwrap_or(i32::MAX)))
		.execute(db_connection)?;
	Ok(deleted > 0)
}

/// Zeroes every user's XP and announcement progress in the guild. Returns the number of user rows reset.
pub fn reset_guild_levels(db_connection: &mut PgConnection, guild_id: Id<GuildMarker>) -> QueryResult<usize> {
	let db_guild_id = database_id_from_discord_id(guild_id.get());
	db_connection.transaction(|db_connection| {
		let users_reset = diesel::update(user_levels::table)
			.filter(user_levels::guild_id.eq(db_guild_id))
			.set((user_levels::xp.eq(0), user_levels::voice_xp_earned.eq(0)))
			.execute(db_connection)?;
		diesel::update(last_notified_levels::table)
			.filter(last_notified_levels::guild_id.eq(db_guild_id))
			.set(last_notified_levels::level.eq(0))
			.execute(db_connection)?;
		Ok(users_reset)
	})
}

pub fn get_auto_reset(db_connection: &mut PgConnection, guild_id: Id<GuildMarker>) -> QueryResult<Option<AutoReset>> {
	auto_resets::table
		.find(database_id_from_discord_id(guild_id.get()))
		.first(db_connection)
		.optional()
}

pub fn list_auto_resets(db_connection: &mut PgConnection) -> QueryResult<Vec<AutoReset>> {
	auto_resets::table.load(db_connection)
}

/// Sets the reset interval, restarting the period from `now`.
pub fn set_auto_reset(
	db_connection: &mut PgConnection,
	guild_id: Id<GuildMarker>,
	days: i32,
	now: DateTime<Utc>,
) -> QueryResult<AutoReset> {
	let record = AutoReset {
		guild_id: database_id_from_discord_id(guild_id.get()),
		days,
		last_reset: now,
	};
	diesel::insert_into(auto_resets::table)
		.values(&record)
		.on_conflict(auto_resets::guild_id)
		.do_update()
		.set((auto_resets::days.eq(days), auto_resets::last_reset.eq(now)))
		.get_result(db_connection)
}

pub fn mark_auto_reset_done(
	db_connection: &mut PgConnection,
	guild_id: Id<GuildMarker>,
	now: DateTime<Utc>,
) -> QueryResult<()> {
	diesel::update(auto_resets::table)
		.filter(auto_resets::guild_id.eq(database_id_from_discord_id(guild_id.get())))
		.set(auto_resets::last_reset.eq(now))
		.execute(db_connection)?;
	Ok(())
}

/// Returns whether auto-reset had been configured.
pub fn delete_auto_reset(db_connection: &mut PgConnection, guild_id: Id<GuildMarker>) -> QueryResult<bool> {
	let deleted = diesel::delete(auto_resets::table)
		.filter(auto_resets::guild_id.eq(database_id_from_discord_id(guild_id.get())))
		.execute(db_connection)?;
	Ok(deleted > 0)
}
