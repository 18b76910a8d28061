// © 2024-2025 ElementalAlchemist and the Dainsleif Mains Development Team
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use crate::model::{Reminder, ReminderStatus};
use crate::scheduler::reminders::{self, PauseToggle};
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
pub struct ReminderView {
	reminder_id: String,
	channel_id: Id<ChannelMarker>,
	role_id: Option<Id<RoleMarker>>,
	message: String,
	next_run: DateTime<Utc>,
	last_run: Option<DateTime<Utc>>,
	interval: String,
	timezone: String,
	status: ReminderStatus,
	run_count: i32,
}

impl From<Reminder> for ReminderView {
	fn from(reminder: Reminder) -> Self {
		Self {
			channel_id: reminder.get_channel(),
			role_id: reminder.get_role(),
			reminder_id: reminder.reminder_id,
			message: reminder.message,
			next_run: reminder.next_run,
			last_run: reminder.last_run,
			interval: reminder.interval,
			timezone: reminder.timezone,
			status: reminder.status,
			run_count: reminder.run_count,
		}
	}
}

#[derive(Debug, Deserialize)]
pub struct ReminderPath {
	reminder_id: String,
}

#[derive(Debug, Serialize)]
pub struct ToggleView {
	status: ReminderStatus,
}

pub async fn list_reminders(access: GuildAccess, State(state): State<AppState>) -> ApiResult<Json<Vec<ReminderView>>> {
	let mut db_connection = state.ctx.db_connection_pool.get()?;
	let reminders = reminders::list_reminders(&mut db_connection, access.guild_id)?;
	Ok(Json(reminders.into_iter().map(ReminderView::from).collect()))
}

pub async fn delete_reminder(
	access: GuildAccess,
	Path(path): Path<ReminderPath>,
	State(state): State<AppState>,
) -> ApiResult<StatusCode> {
	let mut db_connection = state.ctx.db_connection_pool.get()?;
	if reminders::soft_delete_reminder(&mut db_connection, access.guild_id, &path.reminder_id)? {
		tracing::info!(guild = %access.guild_id, reminder = %path.reminder_id, "Reminder deleted from dashboard");
		Ok(StatusCode::NO_CONTENT)
	} else {
		Err(ApiError::NotFound)
	}
}

fn toggle_result(toggle: PauseToggle) -> ApiResult<ToggleView> {
	match toggle {
		PauseToggle::Paused => Ok(ToggleView {
			status: ReminderStatus::Paused,
		}),
		PauseToggle::Resumed => Ok(ToggleView {
			status: ReminderStatus::Active,
		}),
		PauseToggle::NotToggleable(_) => Err(ApiError::Conflict("Only active or paused reminders can be toggled")),
		PauseToggle::NotFound => Err(ApiError::NotFound),
	}
}

pub async fn toggle_reminder(
	access: GuildAccess,
	Path(path): Path<ReminderPath>,
	State(state): State<AppState>,
) -> ApiResult<Json<ToggleView>> {
	let mut db_connection = state.ctx.db_connection_pool.get()?;
	let toggle = reminders::toggle_pause(&mut db_connection, access.guild_id, &path.reminder_id)?;
	let view = toggle_result(toggle)?;
	tracing::info!(guild = %access.guild_id, reminder = %path.reminder_id, status = ?view.status, "Reminder toggled from dashboard");
	Ok(Json(view))
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn toggle_outcomes_map_to_responses() {
		assert_eq!(toggle_result(PauseToggle::Paused).unwrap().status, ReminderStatus::Paused);
		assert_eq!(toggle_result(PauseToggle::Resumed).unwrap().status, ReminderStatus::Active);
		assert_eq!(
			toggle_result(PauseToggle::NotToggleable(ReminderStatus::Completed))
				.unwrap_err()
				.status(),
			StatusCode::CONFLICT
		);
		assert_eq!(
			toggle_result(PauseToggle::NotFound).unwrap_err().status(),
			StatusCode::NOT_FOUND
		);
	}
}
