// © 2024-2025 ElementalAlchemist and the Dainsleif Mains Development Team
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use crate::context::BotContext;
use miette::Diagnostic;
use std::fmt;
use twilight_http::error::Error;
use twilight_http::response::DeserializeBodyError;
use twilight_model::id::Id;
use twilight_model::id::marker::{GuildMarker, UserMarker};

/// Error data for getting user/member data
#[derive(Debug, Diagnostic)]
pub enum UserDataError {
	Http(Error),
	Deserialize(DeserializeBodyError),
}

impl From<Error> for UserDataError {
	fn from(error: Error) -> Self {
		Self::Http(error)
	}
}

impl From<DeserializeBodyError> for UserDataError {
	fn from(error: DeserializeBodyError) -> Self {
		Self::Deserialize(error)
	}
}

impl std::error::Error for UserDataError {
	fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
		match self {
			Self::Http(error) => Some(error),
			Self::Deserialize(error) => Some(error),
		}
	}
}

impl fmt::Display for UserDataError {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Self::Http(error) => write!(f, "HTTP error: {}", error),
			Self::Deserialize(error) => write!(f, "deserialization error: {}", error),
		}
	}
}

fn cached_display_name(ctx: &BotContext, guild_id: Id<GuildMarker>, user_id: Id<UserMarker>) -> Option<String> {
	let nick = ctx
		.cache
		.member(guild_id, user_id)
		.and_then(|member| member.nick().map(String::from));
	if nick.is_some() {
		return nick;
	}
	ctx.cache
		.user(user_id)
		.map(|user| user.global_name.clone().unwrap_or_else(|| user.name.clone()))
}

async fn fetched_display_name(
	ctx: &BotContext,
	guild_id: Id<GuildMarker>,
	user_id: Id<UserMarker>,
) -> Result<String, UserDataError> {
	match ctx.http_client.guild_member(guild_id, user_id).await {
		Ok(response) => {
			let member = response.model().await?;
			Ok(member.nick.or(member.user.global_name).unwrap_or(member.user.name))
		}
		Err(_) => {
			let user = ctx.http_client.user(user_id).await?.model().await?;
			Ok(user.global_name.unwrap_or(user.name))
		}
	}
}

/// The name a member shows up as in the guild, for places where a mention won't render (like embed fields). Members
/// who can't be found at all get a placeholder.
pub async fn display_name(ctx: &BotContext, guild_id: Id<GuildMarker>, user_id: Id<UserMarker>) -> String {
	if let Some(name) = cached_display_name(ctx, guild_id, user_id) {
		return name;
	}
	match fetched_display_name(ctx, guild_id, user_id).await {
		Ok(name) => name,
		Err(error) => {
			tracing::debug!(source = ?error, user = %user_id, "Couldn't look up a display name");
			format!("Unknown User ({})", user_id)
		}
	}
}
