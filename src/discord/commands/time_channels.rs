// © 2024-2025 ElementalAlchemist and the Dainsleif Mains Development Team
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use super::{CommandGroup, CommandSpec, Invocation, Requirement, guild_command};
use crate::discord::utils::options::channel_option;
use crate::scheduler::time_channels::{
	disable_time_channels, set_time_channels, update_date_channels, update_time_channels,
};
use chrono::Utc;
use miette::{IntoDiagnostic, bail};
use twilight_mention::fmt::Mention;
use twilight_model::application::command::Command;
use twilight_model::channel::ChannelType;
use twilight_model::guild::Permissions;
use twilight_util::builder::command::ChannelBuilder;

pub fn command_specs() -> Vec<CommandSpec> {
	let manage_channels = Requirement::Permission(Permissions::MANAGE_CHANNELS);
	vec![
		CommandSpec {
			name: "t1-setup-time-channels",
			definition: setup_definition,
			requirement: manage_channels,
			group: CommandGroup::TimeChannels,
		},
		CommandSpec {
			name: "t2-disable-time-channels",
			definition: disable_definition,
			requirement: manage_channels,
			group: CommandGroup::TimeChannels,
		},
	]
}

fn voice_channel(name: &'static str, description: &'static str) -> ChannelBuilder {
	ChannelBuilder::new(name, description)
		.channel_types([ChannelType::GuildVoice])
		.required(true)
}

fn setup_definition() -> Command {
	guild_command(
		"t1-setup-time-channels",
		"Set up and enable date, India time, and Japan time channels.",
	)
	.option(voice_channel("date_channel", "The channel that shows today's date"))
	.option(voice_channel("india_channel", "The channel that shows the time in India"))
	.option(voice_channel("japan_channel", "The channel that shows the time in Japan"))
	.build()
}

fn disable_definition() -> Command {
	guild_command("t2-disable-time-channels", "Stop updating this server's time channels.").build()
}

pub async fn handle_command(invocation: &Invocation<'_>, name: &str) -> miette::Result<()> {
	match name {
		"t1-setup-time-channels" => setup_time_channels(invocation).await,
		"t2-disable-time-channels" => disable(invocation).await,
		_ => bail!("Time channel command handler got unknown command {}", name),
	}
}

async fn setup_time_channels(invocation: &Invocation<'_>) -> miette::Result<()> {
	let ctx = invocation.ctx;
	let options = invocation.options;
	let (Some(date_channel), Some(india_channel), Some(japan_channel)) = (
		channel_option(options, "date_channel"),
		channel_option(options, "india_channel"),
		channel_option(options, "japan_channel"),
	) else {
		bail!("Time channel setup is missing a channel");
	};

	invocation.defer(true).await?;
	{
		let mut db_connection = ctx.db_connection_pool.get().into_diagnostic()?;
		set_time_channels(
			&mut db_connection,
			invocation.guild_id,
			Some(date_channel),
			Some(india_channel),
			Some(japan_channel),
		)
		.into_diagnostic()?;
	}
	tracing::info!(guild = %invocation.guild_id, "Time channels configured");

	let now = Utc::now();
	update_date_channels(ctx, now).await?;
	update_time_channels(ctx, now).await?;

	invocation
		.follow_up(&format!(
			"✅ Time channels configured and enabled!\n📅 Date: {}\n🇮🇳 IST: {}\n🇯🇵 JST: {}\n\nYou can manage these settings from the web dashboard.",
			date_channel.mention(),
			india_channel.mention(),
			japan_channel.mention()
		))
		.await
}

async fn disable(invocation: &Invocation<'_>) -> miette::Result<()> {
	invocation.defer(true).await?;
	let disabled = {
		let mut db_connection = invocation.ctx.db_connection_pool.get().into_diagnostic()?;
		disable_time_channels(&mut db_connection, invocation.guild_id).into_diagnostic()?
	};
	if disabled {
		tracing::info!(guild = %invocation.guild_id, "Time channels disabled");
		invocation
			.follow_up("✅ Time channels have been disabled. The channels will keep their last names.")
			.await
	} else {
		invocation
			.follow_up("❌ Time channels are not enabled on this server.")
			.await
	}
}
