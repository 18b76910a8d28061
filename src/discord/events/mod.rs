// © 2024-2025 ElementalAlchemist and the Dainsleif Mains Development Team
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use super::commands::route_command;
use crate::context::BotContext;
use crate::leveling::VoicePresence;
use crate::stats::refresh_stats;
use twilight_model::application::interaction::InteractionData;
use twilight_model::gateway::event::Event;

mod guilds;
mod messages;
mod voice;

/// Handles one gateway event. `previous_voice` is the member's voice state from before a voice state update was
/// applied to the cache.
pub async fn route_event(ctx: &BotContext, event: Event, previous_voice: Option<VoicePresence>) -> miette::Result<()> {
	tracing::trace!("Incoming gateway message: {:?}", event);
	match event {
		Event::InteractionCreate(interaction) => {
			if let Some(InteractionData::ApplicationCommand(command_data)) = &interaction.data {
				route_command(ctx, &interaction, command_data).await?;
			}
		}
		Event::MessageCreate(message) => messages::handle_message(ctx, &message).await?,
		Event::VoiceStateUpdate(update) => voice::handle_voice_state(ctx, &update.0, previous_voice).await?,
		Event::GuildCreate(guild) => guilds::handle_guild_create(ctx, guild.id()).await?,
		Event::GuildDelete(guild) => {
			tracing::info!(guild = %guild.id, unavailable = ?guild.unavailable, "Removed from guild");
			refresh_stats(ctx)?;
		}
		Event::Ready(ready) => {
			tracing::info!(guilds = ready.guilds.len(), "Discord gateway is ready");
			refresh_stats(ctx)?;
		}
		_ => (),
	}
	Ok(())
}
