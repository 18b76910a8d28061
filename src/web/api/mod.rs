// © 2024-2025 ElementalAlchemist and the Dainsleif Mains Development Team
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

mod leveling;
mod reminders;
mod restrictions;
mod stats;
mod time_channels;
mod user;
mod youtube;

use super::error::{ApiError, ApiResult};
use super::state::AppState;
use axum::Router;
use axum::routing::{delete, get, post, put};
use twilight_model::id::Id;

/// Routes under `/api`
pub fn api_router() -> Router<AppState> {
	let guild_routes = Router::new()
		.route(
			"/restrictions",
			get(restrictions::list_restrictions).post(restrictions::create_restriction),
		)
		.route(
			"/restrictions/{channel_id}",
			put(restrictions::replace_restriction).delete(restrictions::delete_restriction),
		)
		.route(
			"/settings",
			get(leveling::get_settings).post(leveling::update_settings),
		)
		.route(
			"/level-rewards",
			get(leveling::list_rewards).post(leveling::set_reward),
		)
		.route("/level-rewards/{level}", delete(leveling::remove_reward))
		.route("/level-notify-channel", post(leveling::set_notify_channel))
		.route(
			"/auto-reset",
			get(leveling::get_auto_reset)
				.post(leveling::set_auto_reset)
				.delete(leveling::delete_auto_reset),
		)
		.route("/leaderboard", get(leveling::leaderboard))
		.route("/reminders", get(reminders::list_reminders))
		.route("/reminders/{reminder_id}", delete(reminders::delete_reminder))
		.route("/reminders/{reminder_id}/toggle", post(reminders::toggle_reminder))
		.route(
			"/youtube-configs",
			get(youtube::list_configs).post(youtube::create_config),
		)
		.route("/youtube-configs/{yt_channel_id}", delete(youtube::delete_config))
		.route("/time-channels", post(time_channels::set_time_channels));

	Router::new()
		.route("/stats", get(stats::bot_stats))
		.route("/me", get(user::current_user))
		.nest("/server/{guild_id}", guild_routes)
}

/// Reads a Discord ID from a route parameter. Zero isn't an ID, so nothing can be found under it.
fn path_id<T>(raw_id: u64) -> ApiResult<Id<T>> {
	Id::new_checked(raw_id).ok_or(ApiError::NotFound)
}
