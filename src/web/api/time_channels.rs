// © 2024-2025 ElementalAlchemist and the Dainsleif Mains Development Team
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use crate::model::TimeChannelConfig;
use crate::scheduler::time_channels;
use crate::web::auth::GuildAccess;
use crate::web::error::ApiResult;
use crate::web::state::AppState;
use axum::Json;
use axum::extract::State;
use serde::{Deserialize, Serialize};
use twilight_model::id::Id;
use twilight_model::id::marker::ChannelMarker;

#[derive(Debug, Deserialize)]
pub struct TimeChannelInput {
	date_channel_id: Option<Id<ChannelMarker>>,
	india_channel_id: Option<Id<ChannelMarker>>,
	japan_channel_id: Option<Id<ChannelMarker>>,
	enabled: bool,
}

#[derive(Debug, Default, Serialize)]
pub struct TimeChannelView {
	date_channel_id: Option<Id<ChannelMarker>>,
	india_channel_id: Option<Id<ChannelMarker>>,
	japan_channel_id: Option<Id<ChannelMarker>>,
	enabled: bool,
}

impl From<&TimeChannelConfig> for TimeChannelView {
	fn from(config: &TimeChannelConfig) -> Self {
		Self {
			date_channel_id: config.get_date_channel(),
			india_channel_id: config.get_india_channel(),
			japan_channel_id: config.get_japan_channel(),
			enabled: config.enabled,
		}
	}
}

/// Saves a guild's time channels. Disabling keeps the stored channels so they can be re-enabled later.
pub async fn set_time_channels(
	access: GuildAccess,
	State(state): State<AppState>,
	Json(body): Json<TimeChannelInput>,
) -> ApiResult<Json<TimeChannelView>> {
	let mut db_connection = state.ctx.db_connection_pool.get()?;
	if !body.enabled {
		time_channels::disable_time_channels(&mut db_connection, access.guild_id)?;
		let stored = time_channels::get_time_channel_config(&mut db_connection, access.guild_id)?;
		tracing::info!(guild = %access.guild_id, "Time channels disabled from dashboard");
		return Ok(Json(stored.as_ref().map(TimeChannelView::from).unwrap_or_default()));
	}

	let config = time_channels::set_time_channels(
		&mut db_connection,
		access.guild_id,
		body.date_channel_id,
		body.india_channel_id,
		body.japan_channel_id,
	)?;
	tracing::info!(guild = %access.guild_id, "Time channels configured from dashboard");
	Ok(Json(TimeChannelView::from(&config)))
}
