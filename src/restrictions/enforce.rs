// © 2024-2025 ElementalAlchemist and the Dainsleif Mains Development Team
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use super::content::MessageContent;
use super::evaluate::{Decision, RestrictionMasks, evaluate, redirect_notice};
use super::store;
use crate::context::BotContext;
use crate::discord::utils::errors::{DiscordFailure, report_discord_error};
use crate::discord::utils::permissions::is_administrator;
use miette::IntoDiagnostic;
use std::sync::Arc;
use std::time::Duration;
use twilight_http::client::Client;
use twilight_http::request::AuditLogReason;
use twilight_mention::fmt::Mention;
use twilight_model::channel::Message;
use twilight_model::channel::message::AllowedMentions;
use twilight_model::id::Id;
use twilight_model::id::marker::{ChannelMarker, GuildMarker, MessageMarker, RoleMarker};

pub const NOTICE_LIFETIME: Duration = Duration::from_secs(15);

fn author_roles(ctx: &BotContext, guild_id: Id<GuildMarker>, message: &Message) -> Vec<Id<RoleMarker>> {
	if let Some(member) = message.member.as_ref() {
		return member.roles.clone();
	}
	ctx.cache
		.member(guild_id, message.author.id)
		.map(|member| member.roles().to_vec())
		.unwrap_or_default()
}

/// Administrators and holders of a bypass role aren't subject to channel restrictions.
async fn author_bypasses(ctx: &BotContext, guild_id: Id<GuildMarker>, message: &Message) -> miette::Result<bool> {
	let roles = author_roles(ctx, guild_id, message);
	if is_administrator(ctx, guild_id, message.author.id, &roles) {
		return Ok(true);
	}

	let bypass_roles = {
		let mut db_connection = ctx.db_connection_pool.get().into_diagnostic()?;
		store::list_bypass_roles(&mut db_connection, guild_id).into_diagnostic()?
	};
	Ok(roles.iter().any(|role_id| bypass_roles.contains(role_id)))
}

/// Deletes a notice after it has been up for [NOTICE_LIFETIME].
pub fn schedule_notice_removal(http_client: Arc<Client>, channel_id: Id<ChannelMarker>, message_id: Id<MessageMarker>) {
	tokio::spawn(async move {
		tokio::time::sleep(NOTICE_LIFETIME).await;
		if let Err(error) = http_client.delete_message(channel_id, message_id).await {
			report_discord_error(&error, "remove restriction notice");
		}
	});
}

/// Applies the channel's restriction to a new guild message. Returns whether the message was removed.
pub async fn enforce_restriction(ctx: &BotContext, guild_id: Id<GuildMarker>, message: &Message) -> miette::Result<bool> {
	let restriction = {
		let mut db_connection = ctx.db_connection_pool.get().into_diagnostic()?;
		store::get_restriction(&mut db_connection, guild_id, message.channel_id).into_diagnostic()?
	};
	let Some(restriction) = restriction else {
		return Ok(false);
	};
	let masks = RestrictionMasks::from_restriction(&restriction);
	if masks.is_empty() {
		return Ok(false);
	}
	if author_bypasses(ctx, guild_id, message).await? {
		return Ok(false);
	}

	let detected = ctx.classifier.classify(&MessageContent::from_message(message));
	let Decision::Block { violating, cause } = evaluate(detected, &masks) else {
		return Ok(false);
	};

	tracing::debug!(
		guild = %guild_id,
		channel = %message.channel_id,
		violating = %violating.display_names(),
		"Removing restricted message"
	);
	let delete_result = ctx
		.http_client
		.delete_message(message.channel_id, message.id)
		.reason("Channel content restriction")
		.await;
	if let Err(error) = delete_result {
		return Ok(report_discord_error(&error, "delete restricted message") == DiscordFailure::NotFound);
	}

	let Some(redirect_channel_id) = restriction.get_redirect_channel() else {
		return Ok(true);
	};
	let notice = redirect_notice(
		cause,
		violating,
		&masks,
		message.author.id.mention(),
		redirect_channel_id.mention(),
	);
	let mut allowed_mentions = AllowedMentions::default();
	allowed_mentions.users.push(message.author.id);
	let notice_result = ctx
		.http_client
		.create_message(message.channel_id)
		.content(&notice)
		.allowed_mentions(Some(&allowed_mentions))
		.await;
	match notice_result {
		Ok(response) => {
			let notice_message = response.model().await.into_diagnostic()?;
			schedule_notice_removal(Arc::clone(&ctx.http_client), message.channel_id, notice_message.id);
		}
		Err(error) => {
			report_discord_error(&error, "send restriction notice");
		}
	}

	Ok(true)
}
