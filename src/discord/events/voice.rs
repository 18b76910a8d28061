// © 2024-2025 ElementalAlchemist and the Dainsleif Mains Development Team
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use crate::context::BotContext;
use crate::leveling::engine::{end_voice_session, start_voice_session};
use crate::leveling::{VoicePresence, VoiceTransition, voice_transition};
use chrono::Utc;
use twilight_model::voice::VoiceState;

pub async fn handle_voice_state(
	ctx: &BotContext,
	voice_state: &VoiceState,
	previous: Option<VoicePresence>,
) -> miette::Result<()> {
	let Some(guild_id) = voice_state.guild_id else {
		return Ok(());
	};
	let is_bot = voice_state.member.as_ref().is_some_and(|member| member.user.bot)
		|| ctx.cache.user(voice_state.user_id).is_some_and(|user| user.bot);
	if is_bot {
		return Ok(());
	}

	let afk_channel_id = ctx.cache.guild(guild_id).and_then(|guild| guild.afk_channel_id());
	let current = VoicePresence {
		channel_id: voice_state.channel_id,
		self_deaf: voice_state.self_deaf,
	};
	let was_active = previous.is_some_and(|previous| previous.is_active(afk_channel_id));
	let now = Utc::now();

	match voice_transition(was_active, current.is_active(afk_channel_id)) {
		VoiceTransition::SessionStarted => {
			tracing::debug!(guild = %guild_id, user = %voice_state.user_id, "Voice session started");
			start_voice_session(ctx, guild_id, voice_state.user_id, now).await;
		}
		VoiceTransition::SessionEnded => {
			tracing::debug!(guild = %guild_id, user = %voice_state.user_id, "Voice session ended");
			end_voice_session(ctx, guild_id, voice_state.user_id, now).await?;
		}
		VoiceTransition::Unchanged => (),
	}
	Ok(())
}
