// © 2024-2025 ElementalAlchemist and the Dainsleif Mains Development Team
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use super::commands::command_definitions;
use super::events::route_event;
use crate::context::BotContext;
use crate::leveling::VoicePresence;
use miette::IntoDiagnostic;
use std::future::Future;
use std::sync::Arc;
use tokio::sync::mpsc::{UnboundedReceiver, unbounded_channel};
use twilight_gateway::{EventTypeFlags, Intents, Shard, ShardId, StreamExt};
use twilight_model::gateway::event::Event;

pub async fn run_bot(ctx: Arc<BotContext>) -> miette::Result<()> {
	let intents = Intents::GUILDS
		| Intents::GUILD_MEMBERS
		| Intents::GUILD_MESSAGES
		| Intents::MESSAGE_CONTENT
		| Intents::GUILD_VOICE_STATES;

	let mut shard = Shard::new(ShardId::ONE, ctx.config.discord.bot_token.clone(), intents);

	{
		let interaction_client = ctx.http_client.interaction(ctx.application_id);
		let commands = command_definitions();
		interaction_client
			.set_global_commands(&commands)
			.await
			.into_diagnostic()?;
		tracing::info!(count = commands.len(), "Registered commands");
	}

	let (voice_queue, voice_events) = unbounded_channel();
	{
		let ctx = Arc::clone(&ctx);
		tokio::spawn(run_in_order(voice_events, move |(event, previous_voice)| {
			handle_event(event, Arc::clone(&ctx), previous_voice)
		}));
	}

	while let Some(event) = shard.next_event(EventTypeFlags::all()).await {
		let event = match event {
			Ok(event) => event,
			Err(error) => {
				tracing::warn!(source = ?error, "error receiving event");
				continue;
			}
		};

		// The cache is about to be overwritten with the new voice state
		let previous_voice = match &event {
			Event::VoiceStateUpdate(update) => update.guild_id.and_then(|guild_id| {
				ctx.cache
					.voice_state(update.user_id, guild_id)
					.map(|voice_state| VoicePresence {
						channel_id: Some(voice_state.channel_id()),
						self_deaf: voice_state.self_deaf(),
					})
			}),
			_ => None,
		};
		ctx.cache.update(&event);

		if needs_gateway_order(&event) {
			if voice_queue.send((event, previous_voice)).is_err() {
				tracing::error!("Voice event queue closed; voice state update dropped");
			}
		} else {
			tokio::spawn(handle_event(event, Arc::clone(&ctx), previous_voice));
		}
	}

	Ok(())
}

async fn handle_event(event: Event, ctx: Arc<BotContext>, previous_voice: Option<VoicePresence>) {
	let event_result = route_event(&ctx, event, previous_voice).await;
	if let Err(error) = event_result {
		tracing::error!(source = ?error, "An error occurred handling a gateway event");
	}
}

/// Voice session tracking compares each update with the one before it, so voice updates are handled one at a time
/// in the order the gateway sent them.
fn needs_gateway_order(event: &Event) -> bool {
	matches!(event, Event::VoiceStateUpdate(_))
}

async fn run_in_order<T, F, Fut>(mut queue: UnboundedReceiver<T>, mut handle: F)
where
	F: FnMut(T) -> Fut,
	Fut: Future<Output = ()>,
{
	while let Some(item) = queue.recv().await {
		handle(item).await;
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use std::time::Duration;
	use tokio::sync::Mutex;
	use twilight_model::gateway::payload::incoming::GuildDelete;
	use twilight_model::id::Id;

	#[tokio::test(start_paused = true)]
	async fn queued_items_finish_in_arrival_order() {
		let (queue, items) = unbounded_channel();
		let handled = Arc::new(Mutex::new(Vec::new()));
		let worker_handled = Arc::clone(&handled);
		let worker = tokio::spawn(run_in_order(items, move |(name, delay_secs): (&'static str, u64)| {
			let handled = Arc::clone(&worker_handled);
			async move {
				tokio::time::sleep(Duration::from_secs(delay_secs)).await;
				handled.lock().await.push(name);
			}
		}));

		queue.send(("join", 5)).unwrap();
		queue.send(("leave", 0)).unwrap();
		drop(queue);
		worker.await.unwrap();

		assert_eq!(*handled.lock().await, vec!["join", "leave"]);
	}

	#[test]
	fn only_voice_updates_are_queued() {
		let guild_delete = Event::GuildDelete(GuildDelete {
			id: Id::new(1),
			unavailable: None,
		});
		assert!(!needs_gateway_order(&guild_delete));
	}
}
