// © 2024-2025 ElementalAlchemist and the Dainsleif Mains Development Team
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use crate::model::BotStats;
use crate::stats;
use crate::web::error::{ApiError, ApiResult};
use crate::web::state::AppState;
use axum::Json;
use axum::extract::State;

pub async fn bot_stats(State(state): State<AppState>) -> ApiResult<Json<BotStats>> {
	let mut db_connection = state.ctx.db_connection_pool.get()?;
	let stats = stats::get_stats(&mut db_connection)?;
	stats.map(Json).ok_or(ApiError::NotFound)
}
