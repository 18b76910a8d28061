// © 2024-2025 ElementalAlchemist and the Dainsleif Mains Development Team
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use crate::context::BotContext;
use miette::IntoDiagnostic;
use twilight_model::channel::message::{AllowedMentions, Embed, MessageFlags};
use twilight_model::gateway::payload::incoming::InteractionCreate;
use twilight_model::http::interaction::{InteractionResponse, InteractionResponseType};
use twilight_util::builder::InteractionResponseDataBuilder;

pub const GUILD_ONLY: &str = "❌ This command can only be used in a server.";
pub const MISSING_PERMISSIONS: &str = "🚫 You do not have the required permissions to run this command.";
pub const OWNER_ONLY: &str = "🚫 You are not allowed to use this command.";
pub const GENERIC_FAILURE: &str = "❌ An unexpected error occurred. Please try again later.";

async fn send_response(ctx: &BotContext, interaction: &InteractionCreate, response: &InteractionResponse) -> miette::Result<()> {
	ctx.http_client
		.interaction(ctx.application_id)
		.create_response(interaction.id, &interaction.token, response)
		.await
		.into_diagnostic()?;
	Ok(())
}

/// Replies with a plain message. Mentions in the text render but never ping.
pub async fn respond(ctx: &BotContext, interaction: &InteractionCreate, content: &str, ephemeral: bool) -> miette::Result<()> {
	let mut data = InteractionResponseDataBuilder::new()
		.content(content)
		.allowed_mentions(AllowedMentions::default());
	if ephemeral {
		data = data.flags(MessageFlags::EPHEMERAL);
	}
	let response = InteractionResponse {
		kind: InteractionResponseType::ChannelMessageWithSource,
		data: Some(data.build()),
	};
	send_response(ctx, interaction, &response).await
}

pub async fn respond_embed(
	ctx: &BotContext,
	interaction: &InteractionCreate,
	embed: Embed,
	ephemeral: bool,
) -> miette::Result<()> {
	let mut data = InteractionResponseDataBuilder::new()
		.embeds([embed])
		.allowed_mentions(AllowedMentions::default());
	if ephemeral {
		data = data.flags(MessageFlags::EPHEMERAL);
	}
	let response = InteractionResponse {
		kind: InteractionResponseType::ChannelMessageWithSource,
		data: Some(data.build()),
	};
	send_response(ctx, interaction, &response).await
}

/// Acknowledges a command that needs more time than Discord allows for a first response. Finish it with [follow_up]
/// or [follow_up_embed].
pub async fn defer(ctx: &BotContext, interaction: &InteractionCreate, ephemeral: bool) -> miette::Result<()> {
	let data = if ephemeral {
		Some(InteractionResponseDataBuilder::new().flags(MessageFlags::EPHEMERAL).build())
	} else {
		None
	};
	let response = InteractionResponse {
		kind: InteractionResponseType::DeferredChannelMessageWithSource,
		data,
	};
	send_response(ctx, interaction, &response).await
}

pub async fn follow_up(ctx: &BotContext, interaction: &InteractionCreate, content: &str) -> miette::Result<()> {
	let allowed_mentions = AllowedMentions::default();
	ctx.http_client
		.interaction(ctx.application_id)
		.update_response(&interaction.token)
		.content(Some(content))
		.allowed_mentions(Some(&allowed_mentions))
		.await
		.into_diagnostic()?;
	Ok(())
}

pub async fn follow_up_embed(ctx: &BotContext, interaction: &InteractionCreate, embed: Embed) -> miette::Result<()> {
	let allowed_mentions = AllowedMentions::default();
	ctx.http_client
		.interaction(ctx.application_id)
		.update_response(&interaction.token)
		.embeds(Some(&[embed]))
		.allowed_mentions(Some(&allowed_mentions))
		.await
		.into_diagnostic()?;
	Ok(())
}

/// Truncates text for display, marking the cut with an ellipsis.
pub fn truncate(text: &str, max_chars: usize) -> String {
	if text.chars().count() <= max_chars {
		return text.to_string();
	}
	let kept: String = text.chars().take(max_chars).collect();
	format!("{}...", kept)
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn truncation_counts_characters() {
		assert_eq!(truncate("short", 50), "short");
		assert_eq!(truncate("abcdef", 3), "abc...");
		assert_eq!(truncate("🎉🎉🎉🎉", 2), "🎉🎉...");
	}
}
