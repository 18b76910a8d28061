// © 2024-2025 ElementalAlchemist and the Dainsleif Mains Development Team
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use crate::error::ValidationError;
use crate::leveling::engine::{self, validate_auto_reset_days};
use crate::leveling::{GuildLevelSettings, store};
use crate::model::{AutoReset, LevelRoleReward, UserLevel};
use crate::web::auth::GuildAccess;
use crate::web::error::{ApiError, ApiResult};
use crate::web::state::AppState;
use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use twilight_model::id::Id;
use twilight_model::id::marker::{ChannelMarker, RoleMarker, UserMarker};

const LEADERBOARD_SIZE: i64 = 10;

#[derive(Debug, Serialize)]
pub struct SettingsView {
	#[serde(flatten)]
	settings: GuildLevelSettings,
	notify_channel_id: Option<Id<ChannelMarker>>,
}

#[derive(Debug, Deserialize)]
pub struct SettingsInput {
	xp_per_message: i64,
	xp_per_image: i64,
	xp_per_minute_in_voice: i64,
	voice_xp_limit: i64,
}

pub async fn get_settings(access: GuildAccess, State(state): State<AppState>) -> ApiResult<Json<SettingsView>> {
	let settings = engine::guild_settings(&state.ctx, access.guild_id).await;
	let mut db_connection = state.ctx.db_connection_pool.get()?;
	let notify_channel_id = store::get_notify_channel(&mut db_connection, access.guild_id)?;
	Ok(Json(SettingsView {
		settings,
		notify_channel_id,
	}))
}

pub async fn update_settings(
	access: GuildAccess,
	State(state): State<AppState>,
	Json(body): Json<SettingsInput>,
) -> ApiResult<Json<GuildLevelSettings>> {
	let settings = GuildLevelSettings::from_input(
		body.xp_per_message,
		body.xp_per_image,
		body.xp_per_minute_in_voice,
		body.voice_xp_limit,
	)?;
	engine::update_guild_settings(&state.ctx, access.guild_id, settings).await?;
	tracing::info!(guild = %access.guild_id, user = %access.user_id, "Level settings changed from dashboard");
	Ok(Json(settings))
}

#[derive(Debug, Serialize)]
pub struct RewardView {
	level: i32,
	role_id: Id<RoleMarker>,
}

impl From<&LevelRoleReward> for RewardView {
	fn from(reward: &LevelRoleReward) -> Self {
		Self {
			level: reward.level,
			role_id: reward.get_role(),
		}
	}
}

#[derive(Debug, Deserialize)]
pub struct RewardInput {
	level: i64,
	role_id: Id<RoleMarker>,
}

fn reward_level(level: i64) -> Result<u32, ValidationError> {
	u32::try_from(level)
		.ok()
		.filter(|level| *level >= 1 && i32::try_from(*level).is_ok())
		.ok_or(ValidationError::InvalidLevel(level))
}

pub async fn list_rewards(access: GuildAccess, State(state): State<AppState>) -> ApiResult<Json<Vec<RewardView>>> {
	let mut db_connection = state.ctx.db_connection_pool.get()?;
	let rewards = store::get_reward_records(&mut db_connection, access.guild_id)?;
	Ok(Json(rewards.iter().map(RewardView::from).collect()))
}

pub async fn set_reward(
	access: GuildAccess,
	State(state): State<AppState>,
	Json(body): Json<RewardInput>,
) -> ApiResult<StatusCode> {
	let level = reward_level(body.level)?;
	let mut db_connection = state.ctx.db_connection_pool.get()?;
	store::set_level_reward(&mut db_connection, access.guild_id, level, body.role_id)?;
	tracing::info!(guild = %access.guild_id, level, role = %body.role_id, "Level reward set from dashboard");
	Ok(StatusCode::NO_CONTENT)
}

pub async fn remove_reward(
	access: GuildAccess,
	Path((_, level)): Path<(u64, i64)>,
	State(state): State<AppState>,
) -> ApiResult<StatusCode> {
	let level = reward_level(level)?;
	let mut db_connection = state.ctx.db_connection_pool.get()?;
	if store::remove_level_reward(&mut db_connection, access.guild_id, level)? {
		Ok(StatusCode::NO_CONTENT)
	} else {
		Err(ApiError::NotFound)
	}
}

#[derive(Debug, Deserialize)]
pub struct NotifyChannelInput {
	channel_id: Id<ChannelMarker>,
}

pub async fn set_notify_channel(
	access: GuildAccess,
	State(state): State<AppState>,
	Json(body): Json<NotifyChannelInput>,
) -> ApiResult<StatusCode> {
	let mut db_connection = state.ctx.db_connection_pool.get()?;
	store::set_notify_channel(&mut db_connection, access.guild_id, body.channel_id)?;
	Ok(StatusCode::NO_CONTENT)
}

#[derive(Debug, Serialize)]
pub struct AutoResetView {
	days: i32,
	last_reset: DateTime<Utc>,
	next_reset: DateTime<Utc>,
}

impl From<&AutoReset> for AutoResetView {
	fn from(config: &AutoReset) -> Self {
		Self {
			days: config.days,
			last_reset: config.last_reset,
			next_reset: config.next_reset(),
		}
	}
}

#[derive(Debug, Deserialize)]
pub struct AutoResetInput {
	days: i64,
}

pub async fn get_auto_reset(
	access: GuildAccess,
	State(state): State<AppState>,
) -> ApiResult<Json<Option<AutoResetView>>> {
	let mut db_connection = state.ctx.db_connection_pool.get()?;
	let config = store::get_auto_reset(&mut db_connection, access.guild_id)?;
	Ok(Json(config.as_ref().map(AutoResetView::from)))
}

pub async fn set_auto_reset(
	access: GuildAccess,
	State(state): State<AppState>,
	Json(body): Json<AutoResetInput>,
) -> ApiResult<Json<AutoResetView>> {
	let days = validate_auto_reset_days(body.days)?;
	let mut db_connection = state.ctx.db_connection_pool.get()?;
	let config = store::set_auto_reset(&mut db_connection, access.guild_id, days, Utc::now())?;
	tracing::info!(guild = %access.guild_id, days, "Auto-reset set from dashboard");
	Ok(Json(AutoResetView::from(&config)))
}

pub async fn delete_auto_reset(access: GuildAccess, State(state): State<AppState>) -> ApiResult<StatusCode> {
	let mut db_connection = state.ctx.db_connection_pool.get()?;
	if store::delete_auto_reset(&mut db_connection, access.guild_id)? {
		Ok(StatusCode::NO_CONTENT)
	} else {
		Err(ApiError::NotFound)
	}
}

#[derive(Debug, Serialize)]
pub struct LeaderboardEntry {
	rank: usize,
	user_id: Id<UserMarker>,
	/// Only known for users in the cache
	username: Option<String>,
	xp: i64,
	level: i32,
}

pub async fn leaderboard(
	access: GuildAccess,
	State(state): State<AppState>,
) -> ApiResult<Json<Vec<LeaderboardEntry>>> {
	let users: Vec<UserLevel> = {
		let mut db_connection = state.ctx.db_connection_pool.get()?;
		store::leaderboard(&mut db_connection, access.guild_id, LEADERBOARD_SIZE)?
	};
	let entries = users
		.iter()
		.enumerate()
		.map(|(index, user)| {
			let user_id = user.get_user();
			LeaderboardEntry {
				rank: index + 1,
				user_id,
				username: state.ctx.cache.user(user_id).map(|cached| cached.name.clone()),
				xp: user.xp,
				level: user.level,
			}
		})
		.collect();
	Ok(Json(entries))
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn reward_levels_start_at_one() {
		assert_eq!(reward_level(1), Ok(1));
		assert_eq!(reward_level(250), Ok(250));
		assert_eq!(reward_level(0), Err(ValidationError::InvalidLevel(0)));
		assert_eq!(reward_level(-3), Err(ValidationError::InvalidLevel(-3)));
		assert_eq!(
			reward_level(i64::from(u32::MAX)),
			Err(ValidationError::InvalidLevel(i64::from(u32::MAX)))
		);
	}

	#[test]
	fn settings_view_flattens_rates() {
		let view = SettingsView {
			settings: GuildLevelSettings::default(),
			notify_channel_id: Some(Id::new(42)),
		};
		let json = serde_json::to_value(&view).unwrap();
		assert_eq!(json["xp_per_message"], 5);
		assert_eq!(json["voice_xp_limit"], 1500);
		assert_eq!(json["notify_channel_id"], "42");
	}
}
