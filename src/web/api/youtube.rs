// © 2024-2025 ElementalAlchemist and the Dainsleif Mains Development Team
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use crate::model::YouTubeNotificationConfig;
use crate::scheduler::youtube::{self, NotificationSetup, fetch_feed, validate_channel_id};
use crate::web::auth::GuildAccess;
use crate::web::error::{ApiError, ApiResult};
use crate::web::state::AppState;
use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use twilight_model::id::Id;
use twilight_model::id::marker::{ChannelMarker, RoleMarker};

#[derive(Debug, Serialize)]
pub struct YouTubeConfigView {
	yt_channel_id: String,
	yt_channel_name: String,
	target_channel_id: Id<ChannelMarker>,
	mention_role_id: Option<Id<RoleMarker>>,
	message_template: Option<String>,
	enabled: bool,
	updated_at: DateTime<Utc>,
}

impl From<YouTubeNotificationConfig> for YouTubeConfigView {
	fn from(config: YouTubeNotificationConfig) -> Self {
		Self {
			target_channel_id: config.get_target_channel(),
			mention_role_id: config.get_mention_role(),
			yt_channel_id: config.yt_channel_id,
			yt_channel_name: config.yt_channel_name,
			message_template: config.message_template,
			enabled: config.enabled,
			updated_at: config.updated_at,
		}
	}
}

#[derive(Debug, Serialize)]
pub struct CreatedConfigView {
	#[serde(flatten)]
	config: YouTubeConfigView,
	seeded: usize,
}

#[derive(Debug, Deserialize)]
pub struct YouTubeConfigInput {
	yt_channel_id: String,
	target_channel_id: Id<ChannelMarker>,
	mention_role_id: Option<Id<RoleMarker>>,
	message_template: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct YouTubeChannelPath {
	yt_channel_id: String,
}

pub async fn list_configs(
	access: GuildAccess,
	State(state): State<AppState>,
) -> ApiResult<Json<Vec<YouTubeConfigView>>> {
	let mut db_connection = state.ctx.db_connection_pool.get()?;
	let configs = youtube::list_guild_configs(&mut db_connection, access.guild_id)?;
	Ok(Json(configs.into_iter().map(YouTubeConfigView::from).collect()))
}

pub async fn create_config(
	access: GuildAccess,
	State(state): State<AppState>,
	Json(body): Json<YouTubeConfigInput>,
) -> ApiResult<(StatusCode, Json<CreatedConfigView>)> {
	let yt_channel_id = validate_channel_id(&body.yt_channel_id)?;
	let feed = match fetch_feed(&state.ctx, yt_channel_id).await {
		Ok(feed) => feed,
		Err(error) => {
			tracing::info!(source = ?error, yt_channel_id, "Dashboard YouTube setup couldn't fetch the feed");
			return Err(ApiError::Upstream("Couldn't read that channel's YouTube feed"));
		}
	};

	let setup = NotificationSetup {
		guild_id: access.guild_id,
		yt_channel_id,
		target_channel_id: body.target_channel_id,
		mention_role_id: body.mention_role_id,
		message_template: body.message_template.as_deref(),
	};
	let mut db_connection = state.ctx.db_connection_pool.get()?;
	let (config, seeded) = youtube::save_setup(&mut db_connection, &setup, &feed, Utc::now())?;
	tracing::info!(guild = %access.guild_id, yt_channel_id, seeded, "YouTube notifications set up from dashboard");

	Ok((
		StatusCode::CREATED,
		Json(CreatedConfigView {
			config: YouTubeConfigView::from(config),
			seeded,
		}),
	))
}

pub async fn delete_config(
	access: GuildAccess,
	Path(path): Path<YouTubeChannelPath>,
	State(state): State<AppState>,
) -> ApiResult<StatusCode> {
	let mut db_connection = state.ctx.db_connection_pool.get()?;
	if youtube::delete_config(&mut db_connection, access.guild_id, &path.yt_channel_id)? {
		tracing::info!(guild = %access.guild_id, yt_channel_id = %path.yt_channel_id, "YouTube config removed from dashboard");
		Ok(StatusCode::NO_CONTENT)
	} else {
		Err(ApiError::NotFound)
	}
}
