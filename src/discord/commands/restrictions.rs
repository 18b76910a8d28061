// © 2024-2025 ElementalAlchemist and the Dainsleif Mains Development Team
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use super::{CommandGroup, CommandSpec, Invocation, Requirement, guild_command};
use crate::discord::utils::options::{channel_option, role_option, string_option};
use crate::model::{ChannelRestriction, LegacyRestrictionMode};
use crate::restrictions::store::{self, LegacySetupOutcome, RestrictionWrite};
use crate::restrictions::{ContentTypeFlags, RestrictionMasks};
use miette::{IntoDiagnostic, bail};
use twilight_mention::fmt::Mention;
use twilight_model::application::command::Command;
use twilight_model::channel::ChannelType;
use twilight_model::guild::Permissions;
use twilight_util::builder::command::{ChannelBuilder, RoleBuilder, StringBuilder};
use twilight_util::builder::embed::EmbedBuilder;

const GOLD_COLOR: u32 = 0xF1C40F;
const RESTRICTION_COLOR: u32 = 0xE74C3C;

pub fn command_specs() -> Vec<CommandSpec> {
	let spec = |name: &'static str, definition: fn() -> Command, requirement: Permissions| CommandSpec {
		name,
		definition,
		requirement: Requirement::Permission(requirement),
		group: CommandGroup::Restrictions,
	};
	vec![
		spec("n1-setup-no-text", setup_no_text_definition, Permissions::MANAGE_CHANNELS),
		spec("n2-remove-no-text", remove_no_text_definition, Permissions::MANAGE_CHANNELS),
		spec("n3-bypass-no-text", bypass_definition, Permissions::MANAGE_ROLES),
		spec("n4-show-bypass-roles", show_bypass_roles_definition, Permissions::MANAGE_ROLES),
		spec("n5-remove-bypass-role", remove_bypass_role_definition, Permissions::MANAGE_ROLES),
		spec("n6-no-discord-link", no_discord_link_definition, Permissions::MANAGE_CHANNELS),
		spec("n7-no-links", no_links_definition, Permissions::MANAGE_CHANNELS),
		spec(
			"n8-remove-no-discord-link",
			remove_no_discord_link_definition,
			Permissions::MANAGE_CHANNELS,
		),
		spec("n9-remove-no-links", remove_no_links_definition, Permissions::MANAGE_CHANNELS),
		spec("n10-setup-text-only", setup_text_only_definition, Permissions::MANAGE_CHANNELS),
		spec("n11-remove-text-only", remove_text_only_definition, Permissions::MANAGE_CHANNELS),
		spec("n12-restrict-content", restrict_content_definition, Permissions::MANAGE_CHANNELS),
		spec("n13-show-restrictions", show_restrictions_definition, Permissions::MANAGE_CHANNELS),
	]
}

fn text_channel(name: &'static str, description: &'static str) -> ChannelBuilder {
	ChannelBuilder::new(name, description).channel_types([ChannelType::GuildText])
}

fn channel_command(name: &'static str, description: &'static str) -> Command {
	guild_command(name, description)
		.option(text_channel("channel", "The channel to configure").required(true))
		.build()
}

fn redirect_command(name: &'static str, description: &'static str) -> Command {
	guild_command(name, description)
		.option(text_channel("channel", "The channel to configure").required(true))
		.option(text_channel("redirect_channel", "Where to send people whose messages are removed").required(true))
		.build()
}

fn role_command(name: &'static str, description: &'static str) -> Command {
	guild_command(name, description)
		.option(RoleBuilder::new("role", "The role").required(true))
		.build()
}

fn setup_no_text_definition() -> Command {
	redirect_command(
		"n1-setup-no-text",
		"Configure a channel to only allow media and links (media-only).",
	)
}

fn remove_no_text_definition() -> Command {
	channel_command("n2-remove-no-text", "Remove the media-only restriction from a channel.")
}

fn bypass_definition() -> Command {
	role_command("n3-bypass-no-text", "Allow a role to bypass all message restrictions.")
}

fn show_bypass_roles_definition() -> Command {
	guild_command("n4-show-bypass-roles", "Show all roles that can bypass restrictions.").build()
}

fn remove_bypass_role_definition() -> Command {
	role_command("n5-remove-bypass-role", "Remove a role's bypass ability.")
}

fn no_discord_link_definition() -> Command {
	channel_command("n6-no-discord-link", "Silently delete Discord invite links in a channel.")
}

fn no_links_definition() -> Command {
	channel_command("n7-no-links", "Silently delete ALL links in a channel.")
}

fn remove_no_discord_link_definition() -> Command {
	channel_command("n8-remove-no-discord-link", "Stop deleting Discord invite links in a channel.")
}

fn remove_no_links_definition() -> Command {
	channel_command("n9-remove-no-links", "Stop deleting all links in a channel.")
}

fn setup_text_only_definition() -> Command {
	redirect_command(
		"n10-setup-text-only",
		"Configure a channel to only allow plain text (no media).",
	)
}

fn remove_text_only_definition() -> Command {
	channel_command("n11-remove-text-only", "Remove the text-only restriction from a channel.")
}

fn restrict_content_definition() -> Command {
	guild_command(
		"n12-restrict-content",
		"Choose exactly which kinds of content a channel allows or blocks.",
	)
	.option(text_channel("channel", "The channel to configure").required(true))
	.option(StringBuilder::new(
		"allowed",
		"Only allow these (comma-separated, like image_attachments, embeds)",
	))
	.option(StringBuilder::new(
		"blocked",
		"Block these (comma-separated, like discord_invites, regular_links)",
	))
	.option(text_channel(
		"redirect_channel",
		"Where to send people whose messages are removed",
	))
	.build()
}

fn show_restrictions_definition() -> Command {
	guild_command("n13-show-restrictions", "Show every channel restriction in this server.").build()
}

pub async fn handle_command(invocation: &Invocation<'_>, name: &str) -> miette::Result<()> {
	match name {
		"n1-setup-no-text" => setup_legacy(invocation, LegacyRestrictionMode::MediaOnly).await,
		"n2-remove-no-text" => remove_legacy(invocation, LegacyRestrictionMode::MediaOnly).await,
		"n3-bypass-no-text" => add_bypass_role(invocation).await,
		"n4-show-bypass-roles" => show_bypass_roles(invocation).await,
		"n5-remove-bypass-role" => remove_bypass_role(invocation).await,
		"n6-no-discord-link" => setup_legacy(invocation, LegacyRestrictionMode::BlockInvites).await,
		"n7-no-links" => setup_legacy(invocation, LegacyRestrictionMode::BlockAllLinks).await,
		"n8-remove-no-discord-link" => remove_legacy(invocation, LegacyRestrictionMode::BlockInvites).await,
		"n9-remove-no-links" => remove_legacy(invocation, LegacyRestrictionMode::BlockAllLinks).await,
		"n10-setup-text-only" => setup_legacy(invocation, LegacyRestrictionMode::TextOnly).await,
		"n11-remove-text-only" => remove_legacy(invocation, LegacyRestrictionMode::TextOnly).await,
		"n12-restrict-content" => restrict_content(invocation).await,
		"n13-show-restrictions" => show_restrictions(invocation).await,
		_ => bail!("Restriction command handler got unknown command {}", name),
	}
}

/// The short name a legacy preset is shown with
pub fn legacy_label(mode: LegacyRestrictionMode) -> Option<&'static str> {
	match mode {
		LegacyRestrictionMode::MediaOnly => Some("media-only"),
		LegacyRestrictionMode::TextOnly => Some("text-only"),
		LegacyRestrictionMode::BlockInvites => Some("no Discord links"),
		LegacyRestrictionMode::BlockAllLinks => Some("no links"),
		LegacyRestrictionMode::None => None,
	}
}

/// One line summarizing a channel's restriction
pub fn describe_restriction(restriction: &ChannelRestriction) -> String {
	let masks = RestrictionMasks::from_restriction(restriction);
	let mut rules = Vec::new();
	if !masks.allowed().is_empty() {
		rules.push(format!("only {}", masks.allowed().display_names()));
	}
	if !masks.blocked().is_empty() {
		rules.push(format!("no {}", masks.blocked().display_names()));
	}

	let mut line = format!("• {}: {}", restriction.get_channel().mention(), rules.join("; "));
	if let Some(label) = legacy_label(restriction.legacy_mode) {
		line.push_str(&format!(" ({})", label));
	}
	if let Some(redirect_channel_id) = restriction.get_redirect_channel() {
		line.push_str(&format!(" → {}", redirect_channel_id.mention()));
	}
	line
}

async fn setup_legacy(invocation: &Invocation<'_>, mode: LegacyRestrictionMode) -> miette::Result<()> {
	let Some(channel_id) = channel_option(invocation.options, "channel") else {
		bail!("Restriction setup is missing the channel");
	};
	let redirect_channel_id = channel_option(invocation.options, "redirect_channel");

	invocation.defer(true).await?;
	let outcome = {
		let mut db_connection = invocation.ctx.db_connection_pool.get().into_diagnostic()?;
		store::set_legacy_restriction(
			&mut db_connection,
			invocation.guild_id,
			channel_id,
			mode,
			redirect_channel_id,
			invocation.user_id,
		)
		.into_diagnostic()?
	};
	if outcome == LegacySetupOutcome::AlreadyRestricted {
		return invocation
			.follow_up(&format!(
				"❌ {} already has a restriction. Please remove it first.",
				channel_id.mention()
			))
			.await;
	}

	tracing::info!(guild = %invocation.guild_id, channel = %channel_id, ?mode, "Channel restriction set up");
	let channel = channel_id.mention();
	let message = match (mode, redirect_channel_id) {
		(LegacyRestrictionMode::MediaOnly, Some(redirect)) => format!(
			"✅ Media-only rule has been set for {}. Text-only messages will be redirected to {}.",
			channel,
			redirect.mention()
		),
		(LegacyRestrictionMode::TextOnly, Some(redirect)) => format!(
			"✅ Text-only rule has been set for {}. Media will be redirected to {}.",
			channel,
			redirect.mention()
		),
		(LegacyRestrictionMode::BlockInvites, _) => {
			format!("✅ Discord invite links will now be deleted in {}.", channel)
		}
		(LegacyRestrictionMode::BlockAllLinks, _) => format!("✅ All links will now be deleted in {}.", channel),
		_ => format!("✅ The restriction has been set for {}.", channel),
	};
	invocation.follow_up(&message).await
}

async fn remove_legacy(invocation: &Invocation<'_>, mode: LegacyRestrictionMode) -> miette::Result<()> {
	let Some(channel_id) = channel_option(invocation.options, "channel") else {
		bail!("Restriction removal is missing the channel");
	};

	invocation.defer(true).await?;
	let removed = {
		let mut db_connection = invocation.ctx.db_connection_pool.get().into_diagnostic()?;
		store::remove_legacy_restriction(&mut db_connection, invocation.guild_id, channel_id, mode).into_diagnostic()?
	};

	let channel = channel_id.mention();
	let message = match (mode, removed) {
		(LegacyRestrictionMode::MediaOnly, true) => {
			format!("✅ The media-only restriction has been removed from {}.", channel)
		}
		(LegacyRestrictionMode::MediaOnly, false) => {
			format!("❌ {} was not configured as a media-only channel.", channel)
		}
		(LegacyRestrictionMode::TextOnly, true) => {
			format!("✅ The text-only restriction has been removed from {}.", channel)
		}
		(LegacyRestrictionMode::TextOnly, false) => {
			format!("❌ {} was not configured as a text-only channel.", channel)
		}
		(LegacyRestrictionMode::BlockInvites, true) => {
			format!("✅ Removed the no-discord-link rule from {}.", channel)
		}
		(LegacyRestrictionMode::BlockInvites, false) => {
			format!("❌ {} was not configured to block Discord links.", channel)
		}
		(LegacyRestrictionMode::BlockAllLinks, true) => format!("✅ Removed the no-links rule from {}.", channel),
		(LegacyRestrictionMode::BlockAllLinks, false) => {
			format!("❌ {} was not configured to block all links.", channel)
		}
		(LegacyRestrictionMode::None, _) => bail!("There's no command to remove an unlabeled restriction"),
	};
	invocation.follow_up(&message).await
}

async fn add_bypass_role(invocation: &Invocation<'_>) -> miette::Result<()> {
	let Some(role_id) = role_option(invocation.options, "role") else {
		bail!("Bypass role setup is missing the role");
	};
	invocation.defer(true).await?;
	{
		let mut db_connection = invocation.ctx.db_connection_pool.get().into_diagnostic()?;
		store::add_bypass_role(&mut db_connection, invocation.guild_id, role_id).into_diagnostic()?;
	}
	invocation
		.follow_up(&format!(
			"✅ {} can now bypass all channel restrictions.",
			role_id.mention()
		))
		.await
}

async fn show_bypass_roles(invocation: &Invocation<'_>) -> miette::Result<()> {
	let ctx = invocation.ctx;
	invocation.defer(true).await?;
	let role_ids = {
		let mut db_connection = ctx.db_connection_pool.get().into_diagnostic()?;
		store::list_bypass_roles(&mut db_connection, invocation.guild_id).into_diagnostic()?
	};
	if role_ids.is_empty() {
		return invocation
			.follow_up("❌ No bypass roles are configured for this server.")
			.await;
	}

	let mut description = String::from("Users with these roles can ignore all channel message restrictions:\n");
	for role_id in role_ids.iter() {
		if ctx.cache.role(*role_id).is_some() {
			description.push_str(&format!("\n• {}", role_id.mention()));
		} else {
			description.push_str(&format!("\n• `{}` (Deleted Role)", role_id));
		}
	}
	let embed = EmbedBuilder::new()
		.title("🛡️ Bypass Roles")
		.description(description)
		.color(GOLD_COLOR)
		.validate()
		.into_diagnostic()?
		.build();
	invocation.follow_up_embed(embed).await
}

async fn remove_bypass_role(invocation: &Invocation<'_>) -> miette::Result<()> {
	let Some(role_id) = role_option(invocation.options, "role") else {
		bail!("Bypass role removal is missing the role");
	};
	invocation.defer(true).await?;
	let removed = {
		let mut db_connection = invocation.ctx.db_connection_pool.get().into_diagnostic()?;
		store::remove_bypass_role(&mut db_connection, invocation.guild_id, role_id).into_diagnostic()?
	};
	if removed {
		invocation
			.follow_up(&format!(
				"✅ {} can no longer bypass channel restrictions.",
				role_id.mention()
			))
			.await
	} else {
		invocation
			.follow_up(&format!("❌ {} was not configured as a bypass role.", role_id.mention()))
			.await
	}
}

async fn restrict_content(invocation: &Invocation<'_>) -> miette::Result<()> {
	let options = invocation.options;
	let Some(channel_id) = channel_option(options, "channel") else {
		bail!("Content restriction is missing the channel");
	};
	let redirect_channel_id = channel_option(options, "redirect_channel");

	let masks = ContentTypeFlags::parse_list(string_option(options, "allowed").unwrap_or_default()).and_then(|allowed| {
		let blocked = ContentTypeFlags::parse_list(string_option(options, "blocked").unwrap_or_default())?;
		RestrictionMasks::new(allowed, blocked)
	});
	let masks = match masks {
		Ok(masks) => masks,
		Err(error) => return invocation.respond(&format!("❌ {}", error), true).await,
	};

	invocation.defer(true).await?;
	let written = {
		let mut db_connection = invocation.ctx.db_connection_pool.get().into_diagnostic()?;
		store::upsert_restriction(
			&mut db_connection,
			invocation.guild_id,
			channel_id,
			masks,
			redirect_channel_id,
			Some(invocation.user_id),
		)
		.into_diagnostic()?
	};

	match written {
		RestrictionWrite::Saved(restriction) => {
			tracing::info!(guild = %invocation.guild_id, channel = %channel_id, "Content restriction saved");
			invocation
				.follow_up(&format!(
					"✅ Content rules updated:\n{}",
					describe_restriction(&restriction)
				))
				.await
		}
		RestrictionWrite::Cleared => {
			invocation
				.follow_up(&format!("✅ Removed all content rules from {}.", channel_id.mention()))
				.await
		}
	}
}

async fn show_restrictions(invocation: &Invocation<'_>) -> miette::Result<()> {
	invocation.defer(true).await?;
	let restrictions = {
		let mut db_connection = invocation.ctx.db_connection_pool.get().into_diagnostic()?;
		store::list_restrictions(&mut db_connection, invocation.guild_id).into_diagnostic()?
	};
	if restrictions.is_empty() {
		return invocation.follow_up("⚠️ No restrictions configured").await;
	}

	let description: Vec<String> = restrictions.iter().map(describe_restriction).collect();
	let embed = EmbedBuilder::new()
		.title("🚫 Channel Restrictions")
		.description(description.join("\n"))
		.color(RESTRICTION_COLOR)
		.validate()
		.into_diagnostic()?
		.build();
	invocation.follow_up_embed(embed).await
}

#[cfg(test)]
mod tests {
	use super::*;
	use chrono::Utc;

	fn restriction(allowed: ContentTypeFlags, blocked: ContentTypeFlags, legacy_mode: LegacyRestrictionMode) -> ChannelRestriction {
		ChannelRestriction {
			guild_id: 1,
			channel_id: 20,
			allowed_mask: allowed.to_mask(),
			blocked_mask: blocked.to_mask(),
			legacy_mode,
			redirect_channel_id: None,
			configured_by: None,
			updated_at: Utc::now(),
		}
	}

	#[test]
	fn describes_granular_restrictions() {
		let line = describe_restriction(&restriction(
			ContentTypeFlags::empty(),
			ContentTypeFlags::DISCORD_INVITE | ContentTypeFlags::REGULAR_LINK,
			LegacyRestrictionMode::None,
		));
		assert_eq!(line, "• <#20>: no discord invites, regular links");
	}

	#[test]
	fn describes_legacy_restrictions_with_redirect() {
		let mut media_only = restriction(
			RestrictionMasks::from_legacy(LegacyRestrictionMode::MediaOnly).allowed(),
			ContentTypeFlags::empty(),
			LegacyRestrictionMode::MediaOnly,
		);
		media_only.redirect_channel_id = Some(30);
		let line = describe_restriction(&media_only);
		assert!(line.starts_with("• <#20>: only discord invites"));
		assert!(line.ends_with("(media-only) → <#30>"));
		assert!(!line.contains("plain text"));
	}
}
