// © 2024-2025 ElementalAlchemist and the Dainsleif Mains Development Team
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use super::path_id;
use crate::error::ValidationError;
use crate::model::{ChannelRestriction, LegacyRestrictionMode};
use crate::restrictions::store::{self, RestrictionWrite};
use crate::restrictions::{ContentTypeFlags, RestrictionMasks};
use crate::web::auth::GuildAccess;
use crate::web::error::{ApiError, ApiResult};
use crate::web::state::AppState;
use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use twilight_model::id::Id;
use twilight_model::id::marker::ChannelMarker;

#[derive(Debug, Serialize)]
pub struct RestrictionView {
	channel_id: Id<ChannelMarker>,
	allowed: Vec<&'static str>,
	blocked: Vec<&'static str>,
	legacy_mode: Option<LegacyRestrictionMode>,
	redirect_channel_id: Option<Id<ChannelMarker>>,
	updated_at: DateTime<Utc>,
}

impl From<&ChannelRestriction> for RestrictionView {
	fn from(restriction: &ChannelRestriction) -> Self {
		let masks = RestrictionMasks::from_restriction(restriction);
		let legacy_mode = match restriction.legacy_mode {
			LegacyRestrictionMode::None => None,
			mode => Some(mode),
		};
		Self {
			channel_id: restriction.get_channel(),
			allowed: masks.allowed().key_names(),
			blocked: masks.blocked().key_names(),
			legacy_mode,
			redirect_channel_id: restriction.get_redirect_channel(),
			updated_at: restriction.updated_at,
		}
	}
}

#[derive(Debug, Default, Deserialize)]
pub struct RestrictionInput {
	#[serde(default)]
	allowed: Vec<String>,
	#[serde(default)]
	blocked: Vec<String>,
	redirect_channel_id: Option<Id<ChannelMarker>>,
}

impl RestrictionInput {
	fn masks(&self) -> Result<RestrictionMasks, ValidationError> {
		let allowed = ContentTypeFlags::parse_list(&self.allowed.join(","))?;
		let blocked = ContentTypeFlags::parse_list(&self.blocked.join(","))?;
		RestrictionMasks::new(allowed, blocked)
	}
}

#[derive(Debug, Deserialize)]
pub struct NewRestriction {
	channel_id: Id<ChannelMarker>,
	#[serde(flatten)]
	input: RestrictionInput,
}

#[derive(Debug, Deserialize)]
pub struct ChannelPath {
	channel_id: u64,
}

pub async fn list_restrictions(
	access: GuildAccess,
	State(state): State<AppState>,
) -> ApiResult<Json<Vec<RestrictionView>>> {
	let mut db_connection = state.ctx.db_connection_pool.get()?;
	let restrictions = store::list_restrictions(&mut db_connection, access.guild_id)?;
	Ok(Json(restrictions.iter().map(RestrictionView::from).collect()))
}

fn write_restriction(
	state: &AppState,
	access: &GuildAccess,
	channel_id: Id<ChannelMarker>,
	input: &RestrictionInput,
) -> ApiResult<Response> {
	let masks = input.masks()?;
	let mut db_connection = state.ctx.db_connection_pool.get()?;
	let write = store::upsert_restriction(
		&mut db_connection,
		access.guild_id,
		channel_id,
		masks,
		input.redirect_channel_id,
		Some(access.user_id),
	)?;
	tracing::info!(guild = %access.guild_id, channel = %channel_id, user = %access.user_id, "Restriction changed from dashboard");
	match write {
		RestrictionWrite::Saved(restriction) => Ok(Json(RestrictionView::from(&restriction)).into_response()),
		RestrictionWrite::Cleared => Ok(StatusCode::NO_CONTENT.into_response()),
	}
}

pub async fn create_restriction(
	access: GuildAccess,
	State(state): State<AppState>,
	Json(body): Json<NewRestriction>,
) -> ApiResult<Response> {
	write_restriction(&state, &access, body.channel_id, &body.input)
}

pub async fn replace_restriction(
	access: GuildAccess,
	Path(path): Path<ChannelPath>,
	State(state): State<AppState>,
	Json(body): Json<RestrictionInput>,
) -> ApiResult<Response> {
	let channel_id = path_id(path.channel_id)?;
	write_restriction(&state, &access, channel_id, &body)
}

pub async fn delete_restriction(
	access: GuildAccess,
	Path(path): Path<ChannelPath>,
	State(state): State<AppState>,
) -> ApiResult<StatusCode> {
	let channel_id = path_id(path.channel_id)?;
	let mut db_connection = state.ctx.db_connection_pool.get()?;
	if store::delete_restriction(&mut db_connection, access.guild_id, channel_id)? {
		tracing::info!(guild = %access.guild_id, channel = %channel_id, "Restriction removed from dashboard");
		Ok(StatusCode::NO_CONTENT)
	} else {
		Err(ApiError::NotFound)
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	fn input(allowed: &[&str], blocked: &[&str]) -> RestrictionInput {
		RestrictionInput {
			allowed: allowed.iter().map(|name| name.to_string()).collect(),
			blocked: blocked.iter().map(|name| name.to_string()).collect(),
			redirect_channel_id: None,
		}
	}

	#[test]
	fn input_masks_use_content_type_keys() {
		let masks = input(&["image_attachments", "Image-Links"], &[]).masks().unwrap();
		assert_eq!(
			masks.allowed(),
			ContentTypeFlags::IMAGE_ATTACHMENT | ContentTypeFlags::IMAGE_LINK
		);
		assert!(masks.blocked().is_empty());
	}

	#[test]
	fn overlapping_input_is_rejected() {
		let error = input(&["embeds"], &["embeds", "regular_links"]).masks().unwrap_err();
		assert_eq!(error, ValidationError::ConflictingMasks(ContentTypeFlags::EMBED));
	}

	#[test]
	fn unknown_content_type_is_rejected() {
		let error = input(&[], &["gifs"]).masks().unwrap_err();
		assert_eq!(error, ValidationError::UnknownContentType(String::from("gifs")));
	}

	#[test]
	fn body_with_channel_reads_string_ids() {
		let body: NewRestriction = serde_json::from_str(
			r#"{"channel_id": "123456789012345678", "blocked": ["discord_invites"], "redirect_channel_id": null}"#,
		)
		.unwrap();
		assert_eq!(body.channel_id.get(), 123456789012345678);
		assert_eq!(body.input.masks().unwrap().blocked(), ContentTypeFlags::DISCORD_INVITE);
	}
}
