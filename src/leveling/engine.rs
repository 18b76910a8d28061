// © 2024-2025 ElementalAlchemist and the Dainsleif Mains Development Team
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use super::rewards::{RoleDelta, compute_role_delta};
use super::state::{GuildLevelSettings, LevelChange, UserLevelState, should_announce};
use super::store;
use crate::context::BotContext;
use crate::discord::utils::errors::{DiscordFailure, classify_error, report_discord_error};
use crate::error::ValidationError;
use crate::model::AutoReset;
use chrono::{DateTime, Utc};
use miette::IntoDiagnostic;
use serde::Serialize;
use std::collections::HashSet;
use std::fmt::Display;
use twilight_http::request::AuditLogReason;
use twilight_mention::fmt::Mention;
use twilight_model::channel::message::AllowedMentions;
use twilight_model::id::Id;
use twilight_model::id::marker::{GuildMarker, RoleMarker, UserMarker};

/// Gets a guild's XP rates through the settings cache. Database failures fall back to the default rates.
pub async fn guild_settings(ctx: &BotContext, guild_id: Id<GuildMarker>) -> GuildLevelSettings {
	if let Some(settings) = ctx.level_settings.lock().await.get(&guild_id) {
		return settings;
	}

	let loaded = ctx
		.db_connection_pool
		.get()
		.into_diagnostic()
		.and_then(|mut db_connection| store::get_or_create_settings(&mut db_connection, guild_id).into_diagnostic());
	match loaded {
		Ok(settings) => {
			ctx.level_settings.lock().await.insert(guild_id, settings);
			settings
		}
		Err(error) => {
			tracing::error!(source = ?error, guild = %guild_id, "Failed to load level settings; using defaults");
			GuildLevelSettings::default()
		}
	}
}

pub async fn update_guild_settings(
	ctx: &BotContext,
	guild_id: Id<GuildMarker>,
	settings: GuildLevelSettings,
) -> miette::Result<()> {
	let mut db_connection = ctx.db_connection_pool.get().into_diagnostic()?;
	store::save_settings(&mut db_connection, guild_id, settings).into_diagnostic()?;
	ctx.level_settings.lock().await.invalidate(&guild_id);
	Ok(())
}

/// Gets a member's XP state, preferring the in-memory copy.
pub async fn user_state(
	ctx: &BotContext,
	guild_id: Id<GuildMarker>,
	user_id: Id<UserMarker>,
) -> miette::Result<UserLevelState> {
	if let Some(state) = ctx.user_levels.lock().await.get(&(guild_id, user_id)).copied() {
		return Ok(state);
	}

	let mut db_connection = ctx.db_connection_pool.get().into_diagnostic()?;
	let stored = store::get_user_level(&mut db_connection, guild_id, user_id).into_diagnostic()?;
	let state = stored.as_ref().map(UserLevelState::from).unwrap_or_default();
	ctx.user_levels.lock().await.insert((guild_id, user_id), state);
	Ok(state)
}

async fn record_gain(
	ctx: &BotContext,
	guild_id: Id<GuildMarker>,
	user_id: Id<UserMarker>,
	xp: u64,
	voice_xp: u64,
) -> miette::Result<LevelChange> {
	let mut db_connection = ctx.db_connection_pool.get().into_diagnostic()?;
	let stored = store::add_xp(&mut db_connection, guild_id, user_id, xp, voice_xp).into_diagnostic()?;
	let after = UserLevelState::from(&stored);
	let before = UserLevelState::new(
		after.xp().saturating_sub(xp),
		after.voice_xp_earned().saturating_sub(voice_xp),
	);
	ctx.user_levels.lock().await.insert((guild_id, user_id), after);
	Ok(LevelChange { before, after })
}

/// Awards XP for a message from a (non-bot) member, subject to the per-member cooldown.
pub async fn award_message_xp(
	ctx: &BotContext,
	guild_id: Id<GuildMarker>,
	user_id: Id<UserMarker>,
	has_image: bool,
) -> miette::Result<()> {
	if !ctx.message_cooldowns.try_use((guild_id, user_id)) {
		return Ok(());
	}

	let settings = guild_settings(ctx, guild_id).await;
	let amount = settings.message_xp(has_image);
	if amount == 0 {
		return Ok(());
	}

	let change = record_gain(ctx, guild_id, user_id, amount, 0).await?;
	if let Some(new_level) = change.level_up() {
		handle_level_up(ctx, guild_id, user_id, new_level).await?;
	}
	Ok(())
}

pub async fn start_voice_session(
	ctx: &BotContext,
	guild_id: Id<GuildMarker>,
	user_id: Id<UserMarker>,
	started_at: DateTime<Utc>,
) {
	ctx.voice_sessions
		.lock()
		.await
		.insert((guild_id, user_id), started_at);
}

/// Ends a member's voice session, converting its length to XP.
pub async fn end_voice_session(
	ctx: &BotContext,
	guild_id: Id<GuildMarker>,
	user_id: Id<UserMarker>,
	ended_at: DateTime<Utc>,
) -> miette::Result<()> {
	let Some(started_at) = ctx.voice_sessions.lock().await.remove(&(guild_id, user_id)) else {
		return Ok(());
	};

	let settings = guild_settings(ctx, guild_id).await;
	let current = user_state(ctx, guild_id, user_id).await?;
	let earned = settings.voice_xp(ended_at - started_at, current.voice_xp_earned());
	if earned == 0 {
		return Ok(());
	}

	let change = record_gain(ctx, guild_id, user_id, earned, earned).await?;
	if let Some(new_level) = change.level_up() {
		handle_level_up(ctx, guild_id, user_id, new_level).await?;
	}
	Ok(())
}

pub fn level_up_message(member_mention: impl Display, level: u32, earned_role_name: Option<&str>) -> String {
	match earned_role_name {
		Some(role_name) => format!(
			"🎉 Congrats {}! You've reached **Level {}** and earned the **{}** role!",
			member_mention, level, role_name
		),
		None => format!("🚀 Congrats {}! You've reached **Level {}**!", member_mention, level),
	}
}

/// Syncs reward roles and announces a new level, unless that level (or a higher one) was already announced.
pub async fn handle_level_up(
	ctx: &BotContext,
	guild_id: Id<GuildMarker>,
	user_id: Id<UserMarker>,
	new_level: u32,
) -> miette::Result<()> {
	let mut db_connection = ctx.db_connection_pool.get().into_diagnostic()?;
	let last_notified = store::get_last_notified_level(&mut db_connection, guild_id, user_id).into_diagnostic()?;
	if !should_announce(new_level, last_notified) {
		return Ok(());
	}

	tracing::info!(guild = %guild_id, user = %user_id, level = new_level, "Member leveled up");

	let earned_role = match sync_member_roles(ctx, guild_id, user_id, new_level).await {
		Ok(role) => role,
		Err(error) => {
			tracing::error!(source = ?error, guild = %guild_id, user = %user_id, "Failed to sync reward roles on level up");
			None
		}
	};

	let notify_channel = store::get_notify_channel(&mut db_connection, guild_id).into_diagnostic()?;
	if let Some(channel_id) = notify_channel {
		let role_name = earned_role.and_then(|role_id| ctx.cache.role(role_id).map(|role| role.resource().name.clone()));
		let message = level_up_message(user_id.mention(), new_level, role_name.as_deref());
		let mut allowed_mentions = AllowedMentions::default();
		allowed_mentions.users.push(user_id);
		let send_result = ctx
			.http_client
			.create_message(channel_id)
			.content(&message)
			.allowed_mentions(Some(&allowed_mentions))
			.await;
		if let Err(error) = send_result {
			report_discord_error(&error, "send level-up announcement");
		}
	}

	store::set_last_notified_level(&mut db_connection, guild_id, user_id, new_level).into_diagnostic()?;
	Ok(())
}

async fn member_roles(
	ctx: &BotContext,
	guild_id: Id<GuildMarker>,
	user_id: Id<UserMarker>,
) -> miette::Result<Option<Vec<Id<RoleMarker>>>> {
	if let Some(member) = ctx.cache.member(guild_id, user_id) {
		return Ok(Some(member.roles().to_vec()));
	}

	match ctx.http_client.guild_member(guild_id, user_id).await {
		Ok(response) => {
			let member = response.model().await.into_diagnostic()?;
			Ok(Some(member.roles))
		}
		Err(error) if classify_error(&error) == DiscordFailure::NotFound => Ok(None),
		Err(error) => Err(error).into_diagnostic(),
	}
}

/// Applies a role delta. Returns whether every change went through.
async fn apply_role_delta(
	ctx: &BotContext,
	guild_id: Id<GuildMarker>,
	user_id: Id<UserMarker>,
	delta: &RoleDelta,
	level: u32,
) -> bool {
	let mut all_applied = true;
	let add_reason = format!("Reached Level {}", level);
	for role_id in delta.to_add.iter() {
		let result = ctx
			.http_client
			.add_guild_member_role(guild_id, user_id, *role_id)
			.reason(&add_reason)
			.await;
		if let Err(error) = result {
			if report_discord_error(&error, "add reward role") != DiscordFailure::NotFound {
				all_applied = false;
			}
		}
	}
	for role_id in delta.to_remove.iter() {
		let result = ctx
			.http_client
			.remove_guild_member_role(guild_id, user_id, *role_id)
			.reason("Level role sync")
			.await;
		if let Err(error) = result {
			if report_discord_error(&error, "remove superseded reward role") != DiscordFailure::NotFound {
				all_applied = false;
			}
		}
	}
	all_applied
}

/// Brings a member's reward roles in line with their level. Returns the member's reward role if anything changed.
pub async fn sync_member_roles(
	ctx: &BotContext,
	guild_id: Id<GuildMarker>,
	user_id: Id<UserMarker>,
	level: u32,
) -> miette::Result<Option<Id<RoleMarker>>> {
	let table = {
		let mut db_connection = ctx.db_connection_pool.get().into_diagnostic()?;
		store::get_reward_table(&mut db_connection, guild_id).into_diagnostic()?
	};
	if table.is_empty() {
		return Ok(None);
	}

	let Some(current_roles) = member_roles(ctx, guild_id, user_id).await? else {
		return Ok(None);
	};
	let delta = compute_role_delta(&current_roles, level, &table);
	if delta.is_empty() {
		return Ok(None);
	}

	if apply_role_delta(ctx, guild_id, user_id, &delta, level).await {
		Ok(delta.target)
	} else {
		Ok(None)
	}
}

#[derive(Clone, Copy, Debug, Default, Serialize)]
pub struct RoleSyncSummary {
	pub users_checked: usize,
	pub members_updated: usize,
}

/// Syncs reward roles for every member with stored XP.
pub async fn upgrade_all_roles(ctx: &BotContext, guild_id: Id<GuildMarker>) -> miette::Result<RoleSyncSummary> {
	let users = {
		let mut db_connection = ctx.db_connection_pool.get().into_diagnostic()?;
		store::list_user_levels(&mut db_connection, guild_id).into_diagnostic()?
	};

	let mut summary = RoleSyncSummary {
		users_checked: users.len(),
		members_updated: 0,
	};
	for user in users.iter() {
		let level = user.level.max(0) as u32;
		match sync_member_roles(ctx, guild_id, user.get_user(), level).await {
			Ok(Some(_)) => summary.members_updated += 1,
			Ok(None) => (),
			Err(error) => {
				tracing::error!(source = ?error, guild = %guild_id, user = %user.get_user(), "Failed to sync reward roles")
			}
		}
	}
	Ok(summary)
}

#[derive(Clone, Copy, Debug, Default, Serialize)]
pub struct ResetSummary {
	pub roles_removed: usize,
	pub users_affected: usize,
	pub rows_reset: usize,
}

/// Non-bot members known to the cache, with their roles
fn cached_members(ctx: &BotContext, guild_id: Id<GuildMarker>) -> Vec<(Id<UserMarker>, Vec<Id<RoleMarker>>)> {
	let Some(member_ids) = ctx.cache.guild_members(guild_id) else {
		return Vec::new();
	};
	member_ids
		.iter()
		.filter(|user_id| !ctx.cache.user(**user_id).is_some_and(|user| user.bot))
		.filter_map(|user_id| {
			ctx.cache
				.member(guild_id, *user_id)
				.map(|member| (*user_id, member.roles().to_vec()))
		})
		.collect()
}

/// Strips every reward role from every member and zeroes all XP in the guild.
pub async fn full_reset(ctx: &BotContext, guild_id: Id<GuildMarker>) -> miette::Result<ResetSummary> {
	tracing::warn!(guild = %guild_id, "Performing full XP reset");

	let table = {
		let mut db_connection = ctx.db_connection_pool.get().into_diagnostic()?;
		store::get_reward_table(&mut db_connection, guild_id).into_diagnostic()?
	};
	let reward_roles: HashSet<Id<RoleMarker>> = table.all_roles();

	let mut summary = ResetSummary::default();
	if !reward_roles.is_empty() {
		for (user_id, roles) in cached_members(ctx, guild_id) {
			let mut removed = 0;
			for role_id in roles.iter().filter(|role_id| reward_roles.contains(role_id)) {
				let result = ctx
					.http_client
					.remove_guild_member_role(guild_id, user_id, *role_id)
					.reason("XP Reset")
					.await;
				match result {
					Ok(_) => removed += 1,
					Err(error) => {
						report_discord_error(&error, "remove reward role during reset");
					}
				}
			}
			if removed > 0 {
				summary.roles_removed += removed;
				summary.users_affected += 1;
			}
		}
	}

	let mut db_connection = ctx.db_connection_pool.get().into_diagnostic()?;
	summary.rows_reset = store::reset_guild_levels(&mut db_connection, guild_id).into_diagnostic()?;
	ctx.user_levels
		.lock()
		.await
		.retain(|(cached_guild_id, _), _| *cached_guild_id != guild_id);

	Ok(summary)
}

pub fn validate_auto_reset_days(days: i64) -> Result<i32, ValidationError> {
	if (1..=365).contains(&days) {
		Ok(days as i32)
	} else {
		Err(ValidationError::InvalidAutoResetDays(days))
	}
}

pub fn is_reset_due(config: &AutoReset, now: DateTime<Utc>) -> bool {
	(now - config.last_reset).num_days() >= i64::from(config.days)
}

/// Runs the full reset for every guild whose auto-reset period has elapsed.
pub async fn run_due_auto_resets(ctx: &BotContext, now: DateTime<Utc>) -> miette::Result<()> {
	let configs = {
		let mut db_connection = ctx.db_connection_pool.get().into_diagnostic()?;
		store::list_auto_resets(&mut db_connection).into_diagnostic()?
	};

	for config in configs.iter().filter(|config| is_reset_due(config, now)) {
		let guild_id = config.get_guild();
		if ctx.cache.guild(guild_id).is_none() {
			continue;
		}

		match full_reset(ctx, guild_id).await {
			Ok(summary) => {
				tracing::info!(
					guild = %guild_id,
					roles_removed = summary.roles_removed,
					users_affected = summary.users_affected,
					"Auto-reset complete"
				);
				let marked = ctx
					.db_connection_pool
					.get()
					.into_diagnostic()
					.and_then(|mut db_connection| {
						store::mark_auto_reset_done(&mut db_connection, guild_id, now).into_diagnostic()
					});
				if let Err(error) = marked {
					tracing::error!(source = ?error, guild = %guild_id, "Failed to record auto-reset time");
				}
			}
			Err(error) => tracing::error!(source = ?error, guild = %guild_id, "Auto-reset failed"),
		}
	}

	Ok(())
}

/// Forgets message cooldowns that have lapsed.
pub fn prune_cooldowns(ctx: &BotContext) {
	let removed = ctx.message_cooldowns.prune();
	if removed > 0 {
		tracing::info!(removed, "Cleaned up old message cooldown entries");
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	fn auto_reset(days: i32, last_reset: &str) -> AutoReset {
		AutoReset {
			guild_id: 1,
			days,
			last_reset: DateTime::parse_from_rfc3339(last_reset).unwrap().with_timezone(&Utc),
		}
	}

	#[test]
	fn reset_is_due_after_whole_days() {
		let config = auto_reset(7, "2025-01-01T10:00:00Z");
		let almost = DateTime::parse_from_rfc3339("2025-01-08T09:59:59Z").unwrap().with_timezone(&Utc);
		let due = DateTime::parse_from_rfc3339("2025-01-08T10:00:00Z").unwrap().with_timezone(&Utc);
		assert!(!is_reset_due(&config, almost));
		assert!(is_reset_due(&config, due));
	}

	#[test]
	fn auto_reset_days_range() {
		assert_eq!(validate_auto_reset_days(1), Ok(1));
		assert_eq!(validate_auto_reset_days(365), Ok(365));
		assert_eq!(validate_auto_reset_days(0), Err(ValidationError::InvalidAutoResetDays(0)));
		assert_eq!(validate_auto_reset_days(366), Err(ValidationError::InvalidAutoResetDays(366)));
	}

	#[test]
	fn announcement_text() {
		assert_eq!(
			level_up_message("<@5>", 3, None),
			"🚀 Congrats <@5>! You've reached **Level 3**!"
		);
		assert_eq!(
			level_up_message("<@5>", 10, Some("Veteran")),
			"🎉 Congrats <@5>! You've reached **Level 10** and earned the **Veteran** role!"
		);
	}
}
