// © 2024-2025 ElementalAlchemist and the Dainsleif Mains Development Team
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use crate::web::auth::DashboardUser;
use crate::web::error::ApiResult;
use crate::web::state::AppState;
use axum::Json;
use axum::extract::State;
use serde::Serialize;
use twilight_model::id::Id;
use twilight_model::id::marker::{GuildMarker, UserMarker};

#[derive(Debug, Serialize)]
pub struct CurrentUserView {
	user_id: Id<UserMarker>,
	manageable_guilds: Vec<ManageableGuild>,
}

#[derive(Debug, Serialize)]
pub struct ManageableGuild {
	guild_id: Id<GuildMarker>,
	name: Option<String>,
	/// Whether the bot is in the guild
	bot_present: bool,
}

/// The logged-in user and the guilds they may open in the dashboard
pub async fn current_user(user: DashboardUser, State(state): State<AppState>) -> ApiResult<Json<CurrentUserView>> {
	let manageable_guilds = user
		.manageable_guilds()
		.await?
		.into_iter()
		.map(|guild_id| {
			let cached = state.ctx.cache.guild(guild_id);
			ManageableGuild {
				guild_id,
				name: cached.as_ref().map(|guild| guild.name().to_string()),
				bot_present: cached.is_some(),
			}
		})
		.collect();
	Ok(Json(CurrentUserView {
		user_id: user.user_id,
		manageable_guilds,
	}))
}
