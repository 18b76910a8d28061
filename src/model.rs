// © 2024-2025 ElementalAlchemist and the Dainsleif Mains Development Team
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use crate::schema::{
	auto_resets, banned_guilds, bot_stats, bypass_roles, channel_restrictions, last_notified_levels,
	level_notify_channels, level_role_rewards, level_settings, reminders, sessions, time_channel_configs, user_levels,
	youtube_configs, youtube_notification_logs,
};
use bigdecimal::BigDecimal;
use chrono::{DateTime, Utc};
use diesel::prelude::*;
use diesel_derive_enum::DbEnum;
use serde::{Deserialize, Serialize};
use twilight_model::id::Id;
use twilight_model::id::marker::{ChannelMarker, GuildMarker, RoleMarker, UserMarker};

/// The single-mode restriction presets that predate granular content masks.
#[derive(Clone, Copy, DbEnum, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[ExistingTypePath = "crate::schema::sql_types::LegacyRestrictionMode"]
#[serde(rename_all = "snake_case")]
pub enum LegacyRestrictionMode {
	BlockInvites,
	BlockAllLinks,
	MediaOnly,
	TextOnly,
	None,
}

#[derive(Clone, Copy, DbEnum, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[ExistingTypePath = "crate::schema::sql_types::ReminderStatus"]
#[serde(rename_all = "snake_case")]
pub enum ReminderStatus {
	Active,
	Paused,
	Completed,
	Deleted,
}

#[derive(Clone, Copy, DbEnum, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[ExistingTypePath = "crate::schema::sql_types::VideoStatus"]
#[serde(rename_all = "snake_case")]
pub enum VideoStatus {
	/// Seen in a feed but too old to announce
	None,
	/// Marked as seen when notifications were set up
	Seeded,
	/// Announced to the guild
	Notified,
}

/// Content restrictions configured for a single channel.
#[derive(Clone, Debug, Insertable, Queryable)]
#[diesel(table_name = channel_restrictions)]
pub struct ChannelRestriction {
	/// To get a Discord-facing version of this more easily, use [Self::get_guild].
	pub guild_id: i64,
	/// To get a Discord-facing version of this more easily, use [Self::get_channel].
	pub channel_id: i64,
	/// Bitmask of content types permitted in the channel. Zero means no allowlist is in effect.
	pub allowed_mask: i32,
	/// Bitmask of content types removed from the channel. Zero means no blocklist is in effect.
	pub blocked_mask: i32,
	/// The preset that produced the masks, if the restriction was set up through one.
	pub legacy_mode: LegacyRestrictionMode,
	/// To get a Discord-facing version of this more easily, use [Self::get_redirect_channel].
	pub redirect_channel_id: Option<i64>,
	pub configured_by: Option<i64>,
	pub updated_at: DateTime<Utc>,
}

impl ChannelRestriction {
	pub fn get_guild(&self) -> Id<GuildMarker> {
		Id::new(discord_id_from_database_id(self.guild_id))
	}

	pub fn get_channel(&self) -> Id<ChannelMarker> {
		Id::new(discord_id_from_database_id(self.channel_id))
	}

	pub fn get_redirect_channel(&self) -> Option<Id<ChannelMarker>> {
		self.redirect_channel_id
			.map(|database_id| Id::new(discord_id_from_database_id(database_id)))
	}
}

#[derive(Clone, Debug, Insertable, Queryable)]
#[diesel(table_name = bypass_roles)]
pub struct BypassRole {
	pub guild_id: i64,
	pub role_id: i64,
}

impl BypassRole {
	pub fn get_role(&self) -> Id<RoleMarker> {
		Id::new(discord_id_from_database_id(self.role_id))
	}
}

/// Per-guild XP rates
#[derive(AsChangeset, Clone, Debug, Insertable, Queryable)]
#[diesel(table_name = level_settings)]
pub struct LevelSettings {
	pub guild_id: i64,
	pub xp_per_message: i32,
	pub xp_per_image: i32,
	pub xp_per_minute_in_voice: i32,
	pub voice_xp_limit: i64,
}

#[derive(Clone, Debug, Queryable)]
#[diesel(table_name = user_levels)]
pub struct UserLevel {
	pub guild_id: i64,
	pub user_id: i64,
	pub xp: i64,
	/// Generated by the database as `xp / 1000`
	pub level: i32,
	pub voice_xp_earned: i64,
}

/// An XP gain. The level column is generated, so it's never written.
#[derive(Insertable)]
#[diesel(table_name = user_levels)]
pub struct UserXpGain {
	pub guild_id: i64,
	pub user_id: i64,
	pub xp: i64,
	pub voice_xp_earned: i64,
}

impl UserLevel {
	pub fn get_user(&self) -> Id<UserMarker> {
		Id::new(discord_id_from_database_id(self.user_id))
	}
}

/// The highest level for which a user has been congratulated.
#[derive(Clone, Debug, Insertable, Queryable)]
#[diesel(table_name = last_notified_levels)]
pub struct LastNotifiedLevel {
	pub guild_id: i64,
	pub user_id: i64,
	pub level: i32,
}

#[derive(Clone, Debug, Insertable, Queryable)]
#[diesel(table_name = level_notify_channels)]
pub struct LevelNotifyChannel {
	pub guild_id: i64,
	pub channel_id: i64,
}

impl LevelNotifyChannel {
	pub fn get_channel(&self) -> Id<ChannelMarker> {
		Id::new(discord_id_from_database_id(self.channel_id))
	}
}

#[derive(Clone, Debug, Insertable, Queryable)]
#[diesel(table_name = level_role_rewards)]
pub struct LevelRoleReward {
	pub guild_id: i64,
	pub level: i32,
	pub role_id: i64,
}

impl LevelRoleReward {
	pub fn get_role(&self) -> Id<RoleMarker> {
		Id::new(discord_id_from_database_id(self.role_id))
	}
}

#[derive(Clone, Debug, Insertable, Queryable)]
#[diesel(table_name = auto_resets)]
pub struct AutoReset {
	pub guild_id: i64,
	pub days: i32,
	pub last_reset: DateTime<Utc>,
}

impl AutoReset {
	pub fn get_guild(&self) -> Id<GuildMarker> {
		Id::new(discord_id_from_database_id(self.guild_id))
	}

	pub fn next_reset(&self) -> DateTime<Utc> {
		self.last_reset + chrono::Duration::days(i64::from(self.days))
	}
}

#[derive(Clone, Debug, Insertable, Queryable)]
#[diesel(table_name = reminders)]
pub struct Reminder {
	/// A short ID users type to refer to the reminder, like `R-x1y2z3a4`.
	pub reminder_id: String,
	pub guild_id: i64,
	pub channel_id: i64,
	pub role_id: Option<i64>,
	pub message: String,
	pub next_run: DateTime<Utc>,
	pub last_run: Option<DateTime<Utc>>,
	/// `once` or a count followed by `m`, `h`, or `d`
	pub interval: String,
	/// IANA time zone the reminder was created in
	pub timezone: String,
	pub status: ReminderStatus,
	pub run_count: i32,
	pub created_by: i64,
	pub created_at: DateTime<Utc>,
}

impl Reminder {
	pub fn get_guild(&self) -> Id<GuildMarker> {
		Id::new(discord_id_from_database_id(self.guild_id))
	}

	pub fn get_channel(&self) -> Id<ChannelMarker> {
		Id::new(discord_id_from_database_id(self.channel_id))
	}

	pub fn get_role(&self) -> Option<Id<RoleMarker>> {
		self.role_id
			.map(|database_id| Id::new(discord_id_from_database_id(database_id)))
	}
}

/// Changes to an existing reminder. Fields left as `None` keep their stored value.
#[derive(AsChangeset, Clone, Debug, Default)]
#[diesel(table_name = reminders)]
pub struct ReminderEdit {
	pub channel_id: Option<i64>,
	pub role_id: Option<i64>,
	pub message: Option<String>,
	pub next_run: Option<DateTime<Utc>>,
	pub interval: Option<String>,
}

impl ReminderEdit {
	pub fn is_empty(&self) -> bool {
		self.channel_id.is_none()
			&& self.role_id.is_none()
			&& self.message.is_none()
			&& self.next_run.is_none()
			&& self.interval.is_none()
	}
}

#[derive(Clone, Debug, Insertable, Queryable)]
#[diesel(table_name = youtube_configs)]
pub struct YouTubeNotificationConfig {
	pub guild_id: i64,
	pub yt_channel_id: String,
	pub yt_channel_name: String,
	pub target_channel_id: i64,
	pub mention_role_id: Option<i64>,
	/// Custom announcement text. See [crate::scheduler::youtube::render_notification] for placeholders.
	pub message_template: Option<String>,
	pub enabled: bool,
	pub updated_at: DateTime<Utc>,
}

impl YouTubeNotificationConfig {
	pub fn get_guild(&self) -> Id<GuildMarker> {
		Id::new(discord_id_from_database_id(self.guild_id))
	}

	pub fn get_target_channel(&self) -> Id<ChannelMarker> {
		Id::new(discord_id_from_database_id(self.target_channel_id))
	}

	pub fn get_mention_role(&self) -> Option<Id<RoleMarker>> {
		self.mention_role_id
			.map(|database_id| Id::new(discord_id_from_database_id(database_id)))
	}
}

#[derive(Clone, Debug, Insertable, Queryable)]
#[diesel(table_name = youtube_notification_logs)]
pub struct YouTubeNotificationLog {
	pub guild_id: i64,
	pub yt_channel_id: String,
	pub video_id: String,
	pub status: VideoStatus,
	pub logged_at: DateTime<Utc>,
}

#[derive(AsChangeset, Clone, Debug, Insertable, Queryable)]
#[diesel(table_name = time_channel_configs, treat_none_as_null = true)]
pub struct TimeChannelConfig {
	pub guild_id: i64,
	pub date_channel_id: Option<i64>,
	pub india_channel_id: Option<i64>,
	pub japan_channel_id: Option<i64>,
	pub enabled: bool,
}

impl TimeChannelConfig {
	pub fn get_guild(&self) -> Id<GuildMarker> {
		Id::new(discord_id_from_database_id(self.guild_id))
	}

	pub fn get_date_channel(&self) -> Option<Id<ChannelMarker>> {
		self.date_channel_id
			.map(|database_id| Id::new(discord_id_from_database_id(database_id)))
	}

	pub fn get_india_channel(&self) -> Option<Id<ChannelMarker>> {
		self.india_channel_id
			.map(|database_id| Id::new(discord_id_from_database_id(database_id)))
	}

	pub fn get_japan_channel(&self) -> Option<Id<ChannelMarker>> {
		self.japan_channel_id
			.map(|database_id| Id::new(discord_id_from_database_id(database_id)))
	}
}

#[derive(Clone, Debug, Insertable, Queryable)]
#[diesel(table_name = banned_guilds)]
pub struct BannedGuild {
	pub guild_id: i64,
	pub banned_by: i64,
	pub banned_at: DateTime<Utc>,
}

#[derive(Clone, Debug, Queryable, Serialize)]
#[diesel(table_name = bot_stats)]
pub struct BotStats {
	#[serde(skip)]
	pub id: i32,
	pub server_count: i64,
	pub user_count: i64,
	pub commands_used: i64,
	pub updated_at: DateTime<Utc>,
}

/// The single row ID used in the bot stats table
pub const BOT_STATS_ROW: i32 = 1;

#[derive(Insertable, Queryable)]
#[diesel(table_name = sessions)]
pub struct Session {
	pub session_id: BigDecimal,
	pub data: String,
	pub expires: DateTime<Utc>,
}

/// Converts an ID used with Discord (unsigned) to an ID for Postgres use (signed)
pub fn database_id_from_discord_id(discord_id: u64) -> i64 {
	discord_id as i64
}

/// Converts an ID retrieved from the database (signed) to an ID for use with Discord (unsigned)
pub fn discord_id_from_database_id(database_id: i64) -> u64 {
	database_id as u64
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn snowflake_conversion_round_trips_high_bit_ids() {
		let discord_id = u64::MAX - 5;
		let database_id = database_id_from_discord_id(discord_id);
		assert!(database_id < 0);
		assert_eq!(discord_id_from_database_id(database_id), discord_id);
	}

	#[test]
	fn auto_reset_next_reset_adds_days() {
		let last_reset = DateTime::parse_from_rfc3339("2025-03-01T12:00:00Z")
			.unwrap()
			.with_timezone(&Utc);
		let config = AutoReset {
			guild_id: 1,
			days: 7,
			last_reset,
		};
		assert_eq!(config.next_reset().to_rfc3339(), "2025-03-08T12:00:00+00:00");
	}
}
