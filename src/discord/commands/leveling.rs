// © 2024-2025 ElementalAlchemist and the Dainsleif Mains Development Team
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use super::{CommandGroup, CommandSpec, Invocation, Requirement, guild_command};
use crate::discord::utils::options::{channel_option, integer_option, role_option, user_option};
use crate::discord::utils::timestamp::timestamp_mention;
use crate::discord::utils::users::display_name;
use crate::error::ValidationError;
use crate::leveling::engine::{self, full_reset, upgrade_all_roles, validate_auto_reset_days};
use crate::leveling::{GuildLevelSettings, store};
use chrono::Utc;
use miette::{IntoDiagnostic, bail};
use twilight_mention::fmt::Mention;
use twilight_mention::timestamp::TimestampStyle;
use twilight_model::application::command::Command;
use twilight_model::channel::ChannelType;
use twilight_model::channel::message::Embed;
use twilight_model::guild::Permissions;
use twilight_model::id::Id;
use twilight_model::id::marker::UserMarker;
use twilight_model::util::ImageHash;
use twilight_util::builder::command::{ChannelBuilder, IntegerBuilder, RoleBuilder, UserBuilder};
use twilight_util::builder::embed::{EmbedBuilder, EmbedFieldBuilder, ImageSource};

const INFO_COLOR: u32 = 0x3498DB;
const GOLD_COLOR: u32 = 0xF1C40F;
const LEADERBOARD_SIZE: i64 = 10;

pub fn command_specs() -> Vec<CommandSpec> {
	let spec = |name: &'static str, definition: fn() -> Command, requirement: Requirement| CommandSpec {
		name,
		definition,
		requirement,
		group: CommandGroup::Leveling,
	};
	vec![
		spec("l1-level", level_definition, Requirement::Everyone),
		spec("l2-leaderboard", leaderboard_definition, Requirement::Everyone),
		spec(
			"l3-setup-level-reward",
			setup_level_reward_definition,
			Requirement::Permission(Permissions::MANAGE_ROLES),
		),
		spec(
			"l4-level-reward-show",
			level_reward_show_definition,
			Requirement::Permission(Permissions::VIEW_AUDIT_LOG),
		),
		spec(
			"l5-notify-level-msg",
			notify_level_msg_definition,
			Requirement::Permission(Permissions::MANAGE_CHANNELS),
		),
		spec(
			"l6-set-auto-reset",
			set_auto_reset_definition,
			Requirement::Permission(Permissions::ADMINISTRATOR),
		),
		spec(
			"l7-show-auto-reset",
			show_auto_reset_definition,
			Requirement::Permission(Permissions::ADMINISTRATOR),
		),
		spec(
			"l8-stop-auto-reset",
			stop_auto_reset_definition,
			Requirement::Permission(Permissions::ADMINISTRATOR),
		),
		spec(
			"l9-reset-xp",
			reset_xp_definition,
			Requirement::Permission(Permissions::ADMINISTRATOR),
		),
		spec(
			"l10-upgrade-all-roles",
			upgrade_all_roles_definition,
			Requirement::Permission(Permissions::MANAGE_ROLES),
		),
		spec(
			"l11-level-settings",
			level_settings_definition,
			Requirement::Permission(Permissions::MANAGE_GUILD),
		),
		spec(
			"l12-remove-level-reward",
			remove_level_reward_definition,
			Requirement::Permission(Permissions::MANAGE_ROLES),
		),
	]
}

fn level_definition() -> Command {
	guild_command("l1-level", "Check your or another user's level.")
		.option(UserBuilder::new("member", "The member to check"))
		.build()
}

fn leaderboard_definition() -> Command {
	guild_command("l2-leaderboard", "Show the top 10 users on the leaderboard.").build()
}

fn setup_level_reward_definition() -> Command {
	guild_command("l3-setup-level-reward", "Set a role reward for reaching a specific level.")
		.option(IntegerBuilder::new("level", "The level that earns the role").required(true).min_value(1))
		.option(RoleBuilder::new("role", "The role to give").required(true))
		.build()
}

fn level_reward_show_definition() -> Command {
	guild_command("l4-level-reward-show", "Show configured level rewards in this server.").build()
}

fn notify_level_msg_definition() -> Command {
	guild_command("l5-notify-level-msg", "Set a channel for level-up messages.")
		.option(
			ChannelBuilder::new("channel", "The channel for level-up messages")
				.required(true)
				.channel_types([ChannelType::GuildText]),
		)
		.build()
}

fn set_auto_reset_definition() -> Command {
	guild_command("l6-set-auto-reset", "Set automatic XP reset schedule (in days).")
		.option(
			IntegerBuilder::new("days", "Days between resets")
				.required(true)
				.min_value(1)
				.max_value(365),
		)
		.build()
}

fn show_auto_reset_definition() -> Command {
	guild_command("l7-show-auto-reset", "Show the current auto-reset configuration.").build()
}

fn stop_auto_reset_definition() -> Command {
	guild_command("l8-stop-auto-reset", "Disable the automatic XP reset for this server.").build()
}

fn reset_xp_definition() -> Command {
	guild_command("l9-reset-xp", "MANUALLY reset all XP and remove reward roles.").build()
}

fn upgrade_all_roles_definition() -> Command {
	guild_command(
		"l10-upgrade-all-roles",
		"Manually sync roles for all users based on their current level.",
	)
	.build()
}

fn level_settings_definition() -> Command {
	guild_command("l11-level-settings", "View or change how much XP members earn.")
		.option(IntegerBuilder::new("xp_per_message", "XP for each message").min_value(0))
		.option(IntegerBuilder::new("xp_per_image", "XP for each message with an image").min_value(0))
		.option(IntegerBuilder::new("xp_per_minute_in_voice", "XP for each minute in voice").min_value(0))
		.option(IntegerBuilder::new("voice_xp_limit", "Most voice XP a member can earn per period").min_value(0))
		.build()
}

fn remove_level_reward_definition() -> Command {
	guild_command("l12-remove-level-reward", "Remove the role reward for a level.")
		.option(IntegerBuilder::new("level", "The level to remove the reward from").required(true).min_value(1))
		.build()
}

pub async fn handle_command(invocation: &Invocation<'_>, name: &str) -> miette::Result<()> {
	match name {
		"l1-level" => level(invocation).await,
		"l2-leaderboard" => leaderboard(invocation).await,
		"l3-setup-level-reward" => setup_level_reward(invocation).await,
		"l4-level-reward-show" => level_reward_show(invocation).await,
		"l5-notify-level-msg" => notify_level_msg(invocation).await,
		"l6-set-auto-reset" => set_auto_reset(invocation).await,
		"l7-show-auto-reset" => show_auto_reset(invocation).await,
		"l8-stop-auto-reset" => stop_auto_reset(invocation).await,
		"l9-reset-xp" => reset_xp(invocation).await,
		"l10-upgrade-all-roles" => upgrade_roles(invocation).await,
		"l11-level-settings" => level_settings(invocation).await,
		"l12-remove-level-reward" => remove_level_reward(invocation).await,
		_ => bail!("Leveling command handler got unknown command {}", name),
	}
}

fn avatar_url(user_id: Id<UserMarker>, avatar: ImageHash) -> String {
	let extension = if avatar.is_animated() { "gif" } else { "png" };
	format!("https://cdn.discordapp.com/avatars/{}/{}.{}", user_id, avatar, extension)
}

async fn level(invocation: &Invocation<'_>) -> miette::Result<()> {
	let ctx = invocation.ctx;
	let target = user_option(invocation.options, "member").unwrap_or(invocation.user_id);
	let state = engine::user_state(ctx, invocation.guild_id, target).await?;
	let settings = engine::guild_settings(ctx, invocation.guild_id).await;
	let name = display_name(ctx, invocation.guild_id, target).await;

	let mut embed = EmbedBuilder::new()
		.title(format!("📊 Level Info for {}", name))
		.color(INFO_COLOR)
		.field(EmbedFieldBuilder::new("Level", state.level().to_string()).inline())
		.field(EmbedFieldBuilder::new("Total XP", state.xp().to_string()).inline())
		.field(EmbedFieldBuilder::new(
			"Voice XP This Period",
			format!("{} / {}", state.voice_xp_earned(), settings.voice_xp_limit),
		));
	let avatar = ctx.cache.user(target).and_then(|user| user.avatar);
	if let Some(thumbnail) = avatar.and_then(|avatar| ImageSource::url(avatar_url(target, avatar)).ok()) {
		embed = embed.thumbnail(thumbnail);
	}
	let embed = embed.validate().into_diagnostic()?.build();
	invocation.respond_embed(embed, true).await
}

async fn leaderboard(invocation: &Invocation<'_>) -> miette::Result<()> {
	let ctx = invocation.ctx;
	invocation.defer(false).await?;

	let top_users = {
		let mut db_connection = ctx.db_connection_pool.get().into_diagnostic()?;
		store::leaderboard(&mut db_connection, invocation.guild_id, LEADERBOARD_SIZE).into_diagnostic()?
	};
	let guild_name = ctx
		.cache
		.guild(invocation.guild_id)
		.map(|guild| guild.name().to_string())
		.unwrap_or_default();

	let mut embed = EmbedBuilder::new()
		.title(format!("🏆 Leaderboard - {}", guild_name))
		.color(GOLD_COLOR);
	if top_users.is_empty() {
		embed = embed.description("No one has earned any XP yet!");
	}
	for (rank, user) in top_users.iter().enumerate() {
		let name = display_name(ctx, invocation.guild_id, user.get_user()).await;
		embed = embed.field(EmbedFieldBuilder::new(
			format!("#{} {}", rank + 1, name),
			format!("Lvl {} ({} XP)", user.level, user.xp),
		));
	}
	invocation.follow_up_embed(embed.validate().into_diagnostic()?.build()).await
}

async fn setup_level_reward(invocation: &Invocation<'_>) -> miette::Result<()> {
	let (Some(level), Some(role_id)) = (
		integer_option(invocation.options, "level"),
		role_option(invocation.options, "role"),
	) else {
		bail!("Level reward setup is missing required options");
	};
	let level = match u32::try_from(level).ok().filter(|level| *level >= 1) {
		Some(level) => level,
		None => {
			let error = ValidationError::InvalidLevel(level);
			return invocation.respond(&format!("❌ {}", error), true).await;
		}
	};

	invocation.defer(true).await?;
	{
		let mut db_connection = invocation.ctx.db_connection_pool.get().into_diagnostic()?;
		store::set_level_reward(&mut db_connection, invocation.guild_id, level, role_id).into_diagnostic()?;
	}
	invocation
		.follow_up(&format!(
			"✅ Reward set: Users reaching Level {} will now receive the {} role.",
			level,
			role_id.mention()
		))
		.await
}

async fn level_reward_show(invocation: &Invocation<'_>) -> miette::Result<()> {
	let ctx = invocation.ctx;
	invocation.defer(true).await?;
	let rewards = {
		let mut db_connection = ctx.db_connection_pool.get().into_diagnostic()?;
		store::get_reward_records(&mut db_connection, invocation.guild_id).into_diagnostic()?
	};
	if rewards.is_empty() {
		return invocation
			.follow_up("❌ No level rewards are configured for this server.")
			.await;
	}

	let mut description = String::from("Here are the role rewards for reaching specific levels:\n");
	for reward in rewards.iter().rev() {
		let role_id = reward.get_role();
		if ctx.cache.role(role_id).is_some() {
			description.push_str(&format!("\n**Level {}** → {}", reward.level, role_id.mention()));
		} else {
			description.push_str(&format!("\n**Level {}** → `{}` (Deleted)", reward.level, role_id));
		}
	}
	let embed = EmbedBuilder::new()
		.title("🏅 Level Rewards")
		.description(description)
		.color(GOLD_COLOR)
		.validate()
		.into_diagnostic()?
		.build();
	invocation.follow_up_embed(embed).await
}

async fn notify_level_msg(invocation: &Invocation<'_>) -> miette::Result<()> {
	let Some(channel_id) = channel_option(invocation.options, "channel") else {
		bail!("Level notification setup is missing the channel");
	};
	invocation.defer(true).await?;
	{
		let mut db_connection = invocation.ctx.db_connection_pool.get().into_diagnostic()?;
		store::set_notify_channel(&mut db_connection, invocation.guild_id, channel_id).into_diagnostic()?;
	}
	invocation
		.follow_up(&format!(
			"✅ Level-up messages will now be sent in {}.",
			channel_id.mention()
		))
		.await
}

async fn set_auto_reset(invocation: &Invocation<'_>) -> miette::Result<()> {
	let days = integer_option(invocation.options, "days").unwrap_or_default();
	let days = match validate_auto_reset_days(days) {
		Ok(days) => days,
		Err(error) => return invocation.respond(&format!("❌ {}", error), true).await,
	};

	invocation.defer(true).await?;
	let now = Utc::now();
	let config = {
		let mut db_connection = invocation.ctx.db_connection_pool.get().into_diagnostic()?;
		store::set_auto_reset(&mut db_connection, invocation.guild_id, days, now).into_diagnostic()?
	};
	invocation
		.follow_up(&format!(
			"♻️ Auto-reset has been set for every **{}** day(s). The next reset is scheduled for {}.",
			days,
			timestamp_mention(config.next_reset(), TimestampStyle::LongDateTime)
		))
		.await
}

async fn show_auto_reset(invocation: &Invocation<'_>) -> miette::Result<()> {
	invocation.defer(true).await?;
	let config = {
		let mut db_connection = invocation.ctx.db_connection_pool.get().into_diagnostic()?;
		store::get_auto_reset(&mut db_connection, invocation.guild_id).into_diagnostic()?
	};
	let Some(config) = config else {
		return invocation
			.follow_up("❌ Auto-reset is not configured for this server.")
			.await;
	};

	let embed = EmbedBuilder::new()
		.title("♻️ Auto-Reset Configuration")
		.color(INFO_COLOR)
		.field(EmbedFieldBuilder::new("Reset Interval", format!("Every {} day(s)", config.days)).inline())
		.field(
			EmbedFieldBuilder::new(
				"Last Reset",
				timestamp_mention(config.last_reset, TimestampStyle::RelativeTime),
			)
			.inline(),
		)
		.field(EmbedFieldBuilder::new(
			"Next Scheduled Reset",
			timestamp_mention(config.next_reset(), TimestampStyle::LongDateTime),
		))
		.validate()
		.into_diagnostic()?
		.build();
	invocation.follow_up_embed(embed).await
}

async fn stop_auto_reset(invocation: &Invocation<'_>) -> miette::Result<()> {
	invocation.defer(true).await?;
	let deleted = {
		let mut db_connection = invocation.ctx.db_connection_pool.get().into_diagnostic()?;
		store::delete_auto_reset(&mut db_connection, invocation.guild_id).into_diagnostic()?
	};
	if deleted {
		invocation.follow_up("♻️ Automatic XP reset has been disabled.").await
	} else {
		invocation.follow_up("❌ Auto-reset was not enabled on this server.").await
	}
}

async fn reset_xp(invocation: &Invocation<'_>) -> miette::Result<()> {
	invocation.defer(false).await?;
	let summary = full_reset(invocation.ctx, invocation.guild_id).await?;
	invocation
		.follow_up(&format!(
			"♻️ **Manual XP Reset Complete!**\n- All user XP and levels have been reset to 0.\n- Removed {} reward roles from {} users.",
			summary.roles_removed, summary.users_affected
		))
		.await
}

async fn upgrade_roles(invocation: &Invocation<'_>) -> miette::Result<()> {
	invocation.defer(true).await?;
	let summary = upgrade_all_roles(invocation.ctx, invocation.guild_id).await?;
	if summary.users_checked == 0 {
		return invocation
			.follow_up("No users found in the database for this server.")
			.await;
	}
	invocation
		.follow_up(&format!(
			"🔄 Role synchronization complete! Updated roles for {} member(s).",
			summary.members_updated
		))
		.await
}

fn settings_embed(title: &str, settings: &GuildLevelSettings) -> miette::Result<Embed> {
	let embed = EmbedBuilder::new()
		.title(title)
		.color(INFO_COLOR)
		.field(EmbedFieldBuilder::new("XP per Message", settings.xp_per_message.to_string()).inline())
		.field(EmbedFieldBuilder::new("XP per Image", settings.xp_per_image.to_string()).inline())
		.field(EmbedFieldBuilder::new("XP per Voice Minute", settings.xp_per_minute_in_voice.to_string()).inline())
		.field(EmbedFieldBuilder::new("Voice XP Limit", settings.voice_xp_limit.to_string()).inline())
		.validate()
		.into_diagnostic()?
		.build();
	Ok(embed)
}

async fn level_settings(invocation: &Invocation<'_>) -> miette::Result<()> {
	let ctx = invocation.ctx;
	let current = engine::guild_settings(ctx, invocation.guild_id).await;
	let options = invocation.options;
	let changes = [
		integer_option(options, "xp_per_message"),
		integer_option(options, "xp_per_image"),
		integer_option(options, "xp_per_minute_in_voice"),
		integer_option(options, "voice_xp_limit"),
	];
	if changes.iter().all(Option::is_none) {
		let embed = settings_embed("⚙️ Level Settings", &current)?;
		return invocation.respond_embed(embed, true).await;
	}

	let updated = GuildLevelSettings::from_input(
		changes[0].unwrap_or(i64::from(current.xp_per_message)),
		changes[1].unwrap_or(i64::from(current.xp_per_image)),
		changes[2].unwrap_or(i64::from(current.xp_per_minute_in_voice)),
		changes[3].unwrap_or(i64::try_from(current.voice_xp_limit).unwrap_or(i64::MAX)),
	);
	let updated = match updated {
		Ok(settings) => settings,
		Err(error) => return invocation.respond(&format!("❌ {}", error), true).await,
	};

	engine::update_guild_settings(ctx, invocation.guild_id, updated).await?;
	let embed = settings_embed("✅ Level Settings Updated", &updated)?;
	invocation.respond_embed(embed, true).await
}

async fn remove_level_reward(invocation: &Invocation<'_>) -> miette::Result<()> {
	let level = integer_option(invocation.options, "level").unwrap_or_default();
	let Some(level) = u32::try_from(level).ok().filter(|level| *level >= 1) else {
		let error = ValidationError::InvalidLevel(level);
		return invocation.respond(&format!("❌ {}", error), true).await;
	};

	invocation.defer(true).await?;
	let removed = {
		let mut db_connection = invocation.ctx.db_connection_pool.get().into_diagnostic()?;
		store::remove_level_reward(&mut db_connection, invocation.guild_id, level).into_diagnostic()?
	};
	if removed {
		invocation
			.follow_up(&format!("✅ Removed the role reward for Level {}.", level))
			.await
	} else {
		invocation
			.follow_up(&format!("❌ No role reward is configured for Level {}.", level))
			.await
	}
}
