// © 2024-2025 ElementalAlchemist and the Dainsleif Mains Development Team
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use super::{CommandGroup, CommandSpec, Invocation, Requirement, command_registry, guild_command};
use super::restrictions::describe_restriction;
use crate::discord::utils::options::string_option;
use crate::discord::utils::responses::truncate;
use crate::discord::utils::timestamp::timestamp_mention;
use crate::guilds::{ban_guild, unban_guild};
use crate::leveling::store as level_store;
use crate::restrictions::store as restriction_store;
use crate::scheduler::time_channels::get_time_channel_config;
use crate::scheduler::youtube::list_guild_configs;
use chrono::Utc;
use miette::{IntoDiagnostic, bail};
use twilight_mention::fmt::Mention;
use twilight_mention::timestamp::TimestampStyle;
use twilight_model::application::command::Command;
use twilight_model::id::Id;
use twilight_model::guild::Permissions;
use twilight_model::id::marker::{ChannelMarker, GuildMarker};
use twilight_util::builder::command::StringBuilder;
use twilight_util::builder::embed::{EmbedBuilder, EmbedFieldBuilder, EmbedFooterBuilder};
use twilight_validate::embed::{DESCRIPTION_LENGTH, FIELD_VALUE_LENGTH};

const HELP_COLOR: u32 = 0x00FF00;
const CONFIG_COLOR: u32 = 0x3498DB;

pub fn command_specs() -> Vec<CommandSpec> {
	let spec = |name: &'static str, definition: fn() -> Command, requirement: Requirement| CommandSpec {
		name,
		definition,
		requirement,
		group: CommandGroup::General,
	};
	vec![
		spec("g1-help", help_definition, Requirement::Everyone),
		spec(
			"g2-show-config",
			show_config_definition,
			Requirement::Permission(Permissions::MANAGE_GUILD),
		),
		spec("g3-serverlist", server_list_definition, Requirement::BotOwner),
		spec("g4-leaveserver", leave_server_definition, Requirement::BotOwner),
		spec("g5-banguild", ban_guild_definition, Requirement::BotOwner),
		spec("g6-unbanguild", unban_guild_definition, Requirement::BotOwner),
	]
}

fn guild_id_command(name: &'static str, description: &'static str) -> Command {
	guild_command(name, description)
		.option(StringBuilder::new("guild_id", "The server's ID").required(true))
		.build()
}

fn help_definition() -> Command {
	guild_command("g1-help", "Show every command this bot offers.").build()
}

fn show_config_definition() -> Command {
	guild_command("g2-show-config", "Show the current bot configuration for this server.").build()
}

fn server_list_definition() -> Command {
	guild_command("g3-serverlist", "Lists all servers the bot is in (Bot Owner only).").build()
}

fn leave_server_definition() -> Command {
	guild_id_command("g4-leaveserver", "Makes the bot leave a server (Bot Owner only).")
}

fn ban_guild_definition() -> Command {
	guild_id_command(
		"g5-banguild",
		"Bans a server so the bot leaves and never stays in it (Bot Owner only).",
	)
}

fn unban_guild_definition() -> Command {
	guild_id_command("g6-unbanguild", "Removes a server from the ban list (Bot Owner only).")
}

pub async fn handle_command(invocation: &Invocation<'_>, name: &str) -> miette::Result<()> {
	match name {
		"g1-help" => help(invocation).await,
		"g2-show-config" => show_config(invocation).await,
		"g3-serverlist" => server_list(invocation).await,
		"g4-leaveserver" => leave_server(invocation).await,
		"g5-banguild" => ban_server(invocation).await,
		"g6-unbanguild" => unban_server(invocation).await,
		_ => bail!("General command handler got unknown command {}", name),
	}
}

fn group_title(group: CommandGroup) -> &'static str {
	match group {
		CommandGroup::Leveling => "📊 Leveling",
		CommandGroup::Restrictions => "🚫 Channel Restrictions",
		CommandGroup::YouTube => "📺 YouTube Notifications",
		CommandGroup::Reminders => "⏰ Reminders",
		CommandGroup::TimeChannels => "🕐 Time Channels",
		CommandGroup::General => "🤖 General",
	}
}

/// Packs lines into embed fields no longer than Discord allows, continuing a section in another field if needed.
fn pack_field(fields: &mut Vec<(String, String)>, title: &str, lines: &[String]) {
	let mut value = String::new();
	let mut continued = false;
	for line in lines.iter() {
		if !value.is_empty() && value.len() + line.len() + 1 > FIELD_VALUE_LENGTH {
			let name = if continued {
				format!("{} (cont.)", title)
			} else {
				title.to_string()
			};
			fields.push((name, std::mem::take(&mut value)));
			continued = true;
		}
		if !value.is_empty() {
			value.push('\n');
		}
		value.push_str(line);
	}
	if !value.is_empty() {
		let name = if continued {
			format!("{} (cont.)", title)
		} else {
			title.to_string()
		};
		fields.push((name, value));
	}
}

/// The help sections shown to a user. Bot owner commands are only listed for bot owners.
pub fn help_fields(show_owner_commands: bool) -> Vec<(String, String)> {
	let registry = command_registry();
	let mut fields = Vec::new();
	for group in [
		CommandGroup::Leveling,
		CommandGroup::Restrictions,
		CommandGroup::YouTube,
		CommandGroup::Reminders,
		CommandGroup::TimeChannels,
		CommandGroup::General,
	] {
		let lines: Vec<String> = registry
			.iter()
			.filter(|spec| spec.group == group && spec.requirement != Requirement::BotOwner)
			.map(|spec| format!("`/{}` - {}", spec.name, (spec.definition)().description))
			.collect();
		pack_field(&mut fields, group_title(group), &lines);
	}

	if show_owner_commands {
		let lines: Vec<String> = registry
			.iter()
			.filter(|spec| spec.requirement == Requirement::BotOwner)
			.map(|spec| format!("`/{}` - {}", spec.name, (spec.definition)().description))
			.collect();
		pack_field(&mut fields, "👑 Bot Owner", &lines);
	}
	fields
}

async fn help(invocation: &Invocation<'_>) -> miette::Result<()> {
	let mut embed = EmbedBuilder::new()
		.title("🤖 Guild Steward Help")
		.description("Complete list of available commands organized by category.")
		.color(HELP_COLOR);
	for (name, value) in help_fields(invocation.ctx.is_bot_owner(invocation.user_id)) {
		embed = embed.field(EmbedFieldBuilder::new(name, value));
	}
	invocation
		.respond_embed(embed.validate().into_diagnostic()?.build(), true)
		.await
}

async fn show_config(invocation: &Invocation<'_>) -> miette::Result<()> {
	let ctx = invocation.ctx;
	let guild_id = invocation.guild_id;
	invocation.defer(true).await?;

	let (notify_channel, auto_reset, tracked_users, rewards, youtube_configs, restrictions, time_channels) = {
		let mut db_connection = ctx.db_connection_pool.get().into_diagnostic()?;
		(
			level_store::get_notify_channel(&mut db_connection, guild_id).into_diagnostic()?,
			level_store::get_auto_reset(&mut db_connection, guild_id).into_diagnostic()?,
			level_store::list_user_levels(&mut db_connection, guild_id)
				.into_diagnostic()?
				.len(),
			level_store::get_reward_table(&mut db_connection, guild_id).into_diagnostic()?,
			list_guild_configs(&mut db_connection, guild_id).into_diagnostic()?,
			restriction_store::list_restrictions(&mut db_connection, guild_id).into_diagnostic()?,
			get_time_channel_config(&mut db_connection, guild_id).into_diagnostic()?,
		)
	};

	let mut leveling = Vec::new();
	match notify_channel {
		Some(channel_id) => leveling.push(format!("📢 **Notifications:** {}", channel_id.mention())),
		None => leveling.push(String::from("📢 **Notifications:** ⚠️ Not Configured")),
	}
	match auto_reset {
		Some(config) => {
			leveling.push(format!("♻️ **Auto-Reset:** Every {} day(s)", config.days));
			leveling.push(format!(
				"📅 **Next Reset:** {}",
				timestamp_mention(config.next_reset(), TimestampStyle::RelativeTime)
			));
		}
		None => leveling.push(String::from("♻️ **Auto-Reset:** ⚠️ Disabled")),
	}
	leveling.push(format!("👥 **Tracked Users:** {}", tracked_users));
	if rewards.is_empty() {
		leveling.push(String::from("🏆 **Role Rewards:** ⚠️ None Configured"));
	} else {
		leveling.push(format!("🏆 **Role Rewards:** {} configured", rewards.entries().len()));
		for (level, role_id) in rewards.entries().iter().take(5) {
			leveling.push(format!("  • Level {} → {}", level, role_id.mention()));
		}
	}

	let youtube = if youtube_configs.is_empty() {
		String::from("⚠️ No YouTube channels configured\nUse `/y2-setup-youtube-notifications` to add one")
	} else {
		let mut lines = Vec::new();
		for config in youtube_configs.iter().take(3) {
			let status = if config.enabled { "✅" } else { "🔴" };
			lines.push(format!("{} **{}**", status, config.yt_channel_name));
			lines.push(format!("  📺 Channel ID: `{}`", config.yt_channel_id));
			lines.push(format!("  📍 Posts to: {}", config.get_target_channel().mention()));
		}
		if youtube_configs.len() > 3 {
			lines.push(format!("...and {} more", youtube_configs.len() - 3));
		}
		lines.join("\n")
	};

	let restriction_summary = if restrictions.is_empty() {
		String::from("⚠️ No restrictions configured")
	} else {
		let lines: Vec<String> = restrictions.iter().map(describe_restriction).collect();
		truncate(&lines.join("\n"), FIELD_VALUE_LENGTH - 3)
	};

	let time_channel_summary = match time_channels {
		Some(config) if config.enabled => {
			let describe = |channel: Option<Id<ChannelMarker>>| match channel {
				Some(channel_id) => channel_id.mention().to_string(),
				None => String::from("⚠️ Not Set"),
			};
			format!(
				"📅 **Date:** {}\n🇮🇳 **IST:** {}\n🇯🇵 **JST:** {}\n⏰ *Updates every 10 minutes*",
				describe(config.get_date_channel()),
				describe(config.get_india_channel()),
				describe(config.get_japan_channel())
			)
		}
		_ => String::from("⚠️ Not Configured"),
	};

	let guild_name = ctx
		.cache
		.guild(guild_id)
		.map(|guild| guild.name().to_string())
		.unwrap_or_else(|| String::from("Unknown"));
	let embed = EmbedBuilder::new()
		.title("🤖 Bot Configuration")
		.description(format!("**Server:** {}\n**Server ID:** `{}`", guild_name, guild_id))
		.color(CONFIG_COLOR)
		.field(EmbedFieldBuilder::new("📊 Leveling System", leveling.join("\n")))
		.field(EmbedFieldBuilder::new("📺 YouTube Notifications", youtube))
		.field(EmbedFieldBuilder::new("🚫 Channel Restrictions", restriction_summary))
		.field(EmbedFieldBuilder::new("⏰ Time Channels", time_channel_summary))
		.footer(EmbedFooterBuilder::new("Use /g1-help to see all commands"))
		.validate()
		.into_diagnostic()?
		.build();
	invocation.follow_up_embed(embed).await
}

async fn server_list(invocation: &Invocation<'_>) -> miette::Result<()> {
	let mut guilds: Vec<(String, Id<GuildMarker>)> = invocation
		.ctx
		.cache
		.iter()
		.guilds()
		.map(|guild| (guild.value().name().to_string(), *guild.key()))
		.collect();
	guilds.sort_by_key(|(name, _)| name.to_lowercase());

	let mut description = String::new();
	for (name, guild_id) in guilds.iter() {
		description.push_str(&format!("- **{}** (ID: `{}`)\n", name, guild_id));
	}
	let embed = EmbedBuilder::new()
		.title(format!("🔎 Bot is in {} Servers", guilds.len()))
		.description(truncate(&description, DESCRIPTION_LENGTH - 3))
		.color(CONFIG_COLOR)
		.validate()
		.into_diagnostic()?
		.build();
	invocation.respond_embed(embed, true).await
}

/// Reads a guild ID typed as text
pub fn parse_guild_id(input: &str) -> Option<Id<GuildMarker>> {
	input.trim().parse::<u64>().ok().and_then(Id::new_checked)
}

const INVALID_GUILD_ID: &str = "❌ Invalid Guild ID format. Please provide a numeric ID.";

async fn leave_server(invocation: &Invocation<'_>) -> miette::Result<()> {
	let ctx = invocation.ctx;
	let Some(input) = string_option(invocation.options, "guild_id") else {
		bail!("Leave server is missing the guild ID");
	};
	let Some(guild_id) = parse_guild_id(input) else {
		return invocation.respond(INVALID_GUILD_ID, true).await;
	};
	let Some(guild_name) = ctx.cache.guild(guild_id).map(|guild| guild.name().to_string()) else {
		return invocation
			.respond(
				&format!("❌ I am not a member of a server with the ID `{}`.", guild_id),
				true,
			)
			.await;
	};

	ctx.http_client.leave_guild(guild_id).await.into_diagnostic()?;
	tracing::info!(guild = %guild_id, owner = %invocation.user_id, "Left guild by owner request");
	invocation
		.respond(
			&format!("✅ Successfully left the server: **{}** (`{}`).", guild_name, guild_id),
			true,
		)
		.await
}

async fn ban_server(invocation: &Invocation<'_>) -> miette::Result<()> {
	let ctx = invocation.ctx;
	let Some(input) = string_option(invocation.options, "guild_id") else {
		bail!("Ban guild is missing the guild ID");
	};
	let Some(guild_id) = parse_guild_id(input) else {
		return invocation.respond(INVALID_GUILD_ID, true).await;
	};
	{
		let mut db_connection = ctx.db_connection_pool.get().into_diagnostic()?;
		ban_guild(&mut db_connection, guild_id, invocation.user_id, Utc::now()).into_diagnostic()?;
	}
	tracing::info!(guild = %guild_id, owner = %invocation.user_id, "Guild banned");

	let guild_name = ctx.cache.guild(guild_id).map(|guild| guild.name().to_string());
	match guild_name {
		Some(guild_name) => {
			ctx.http_client.leave_guild(guild_id).await.into_diagnostic()?;
			invocation
				.respond(
					&format!(
						"✅ Server **{}** (`{}`) has been banned and I have left.",
						guild_name, guild_id
					),
					true,
				)
				.await
		}
		None => {
			invocation
				.respond(
					&format!(
						"✅ Server ID `{}` has been added to the ban list. I was not a member of it.",
						guild_id
					),
					true,
				)
				.await
		}
	}
}

async fn unban_server(invocation: &Invocation<'_>) -> miette::Result<()> {
	let Some(input) = string_option(invocation.options, "guild_id") else {
		bail!("Unban guild is missing the guild ID");
	};
	let Some(guild_id) = parse_guild_id(input) else {
		return invocation.respond(INVALID_GUILD_ID, true).await;
	};
	let unbanned = {
		let mut db_connection = invocation.ctx.db_connection_pool.get().into_diagnostic()?;
		unban_guild(&mut db_connection, guild_id).into_diagnostic()?
	};
	if unbanned {
		tracing::info!(guild = %guild_id, owner = %invocation.user_id, "Guild unbanned");
		invocation
			.respond(&format!("✅ Server ID `{}` has been unbanned.", guild_id), true)
			.await
	} else {
		invocation
			.respond(
				&format!("❌ Server ID `{}` was not found in the ban list.", guild_id),
				true,
			)
			.await
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn guild_ids_must_be_nonzero_numbers() {
		assert_eq!(parse_guild_id(" 123456789 "), Some(Id::new(123456789)));
		assert_eq!(parse_guild_id("0"), None);
		assert_eq!(parse_guild_id("abc"), None);
		assert_eq!(parse_guild_id("-5"), None);
	}

	#[test]
	fn help_hides_owner_commands_from_members() {
		let member_help = help_fields(false);
		assert!(member_help.iter().all(|(_, value)| !value.contains("g3-serverlist")));
		assert!(member_help.iter().any(|(_, value)| value.contains("`/l1-level`")));

		let owner_help = help_fields(true);
		let (name, value) = owner_help.last().unwrap();
		assert_eq!(name, "👑 Bot Owner");
		assert!(value.contains("`/g6-unbanguild`"));
	}

	#[test]
	fn help_fields_fit_in_embeds() {
		for (_, value) in help_fields(true) {
			assert!(value.len() <= FIELD_VALUE_LENGTH);
		}
	}

	#[test]
	fn long_sections_continue_in_another_field() {
		let lines: Vec<String> = (0..30).map(|i| format!("{:0>60}", i)).collect();
		let mut fields = Vec::new();
		pack_field(&mut fields, "Section", &lines);
		assert_eq!(fields.len(), 2);
		assert_eq!(fields[0].0, "Section");
		assert_eq!(fields[1].0, "Section (cont.)");
		assert_eq!(fields[0].1.lines().count() + fields[1].1.lines().count(), 30);
	}
}
