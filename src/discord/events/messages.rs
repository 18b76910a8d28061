// © 2024-2025 ElementalAlchemist and the Dainsleif Mains Development Team
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use crate::context::BotContext;
use crate::leveling::engine::award_message_xp;
use crate::restrictions::MessageContent;
use crate::restrictions::enforce::enforce_restriction;
use twilight_model::channel::Message;

/// Polices a new guild message against its channel's restriction, then awards XP if the message stays.
pub async fn handle_message(ctx: &BotContext, message: &Message) -> miette::Result<()> {
	let Some(guild_id) = message.guild_id else {
		return Ok(());
	};
	if message.author.bot || message.webhook_id.is_some() {
		return Ok(());
	}

	if enforce_restriction(ctx, guild_id, message).await? {
		return Ok(());
	}

	let has_image = MessageContent::from_message(message).has_image_attachment();
	award_message_xp(ctx, guild_id, message.author.id, has_image).await
}
