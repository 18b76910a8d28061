// © 2024-2025 ElementalAlchemist and the Dainsleif Mains Development Team
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use crate::context::BotContext;
use crate::discord::utils::permissions::has_permission;
use crate::discord::utils::responses::{self, GENERIC_FAILURE, GUILD_ONLY, MISSING_PERMISSIONS, OWNER_ONLY};
use crate::stats::record_command_use;
use miette::{IntoDiagnostic, bail};
use twilight_model::application::command::{Command, CommandType};
use twilight_model::application::interaction::InteractionContextType;
use twilight_model::application::interaction::application_command::{CommandData, CommandDataOption};
use twilight_model::channel::message::Embed;
use twilight_model::gateway::payload::incoming::InteractionCreate;
use twilight_model::guild::Permissions;
use twilight_model::id::Id;
use twilight_model::id::marker::{GuildMarker, UserMarker};
use twilight_util::builder::command::CommandBuilder;

mod general;
mod leveling;
mod reminders;
mod restrictions;
mod time_channels;
mod youtube;

/// Who may run a command
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Requirement {
	Everyone,
	/// The member needs these permissions in the guild. Administrators always qualify.
	Permission(Permissions),
	BotOwner,
}

impl Requirement {
	pub fn is_met(self, member_permissions: Option<Permissions>, is_bot_owner: bool) -> bool {
		match self {
			Self::Everyone => true,
			Self::Permission(required) => member_permissions.is_some_and(|permissions| has_permission(permissions, required)),
			Self::BotOwner => is_bot_owner,
		}
	}

	fn denial_message(self) -> &'static str {
		match self {
			Self::BotOwner => OWNER_ONLY,
			_ => MISSING_PERMISSIONS,
		}
	}
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum CommandGroup {
	Leveling,
	Restrictions,
	YouTube,
	Reminders,
	TimeChannels,
	General,
}

pub struct CommandSpec {
	pub name: &'static str,
	pub definition: fn() -> Command,
	pub requirement: Requirement,
	pub group: CommandGroup,
}

/// Starts a chat command that's only available in guilds.
fn guild_command(name: &'static str, description: &'static str) -> CommandBuilder {
	CommandBuilder::new(name, description, CommandType::ChatInput).contexts([InteractionContextType::Guild])
}

/// Every command the bot offers
pub fn command_registry() -> Vec<CommandSpec> {
	let mut registry = Vec::new();
	registry.extend(leveling::command_specs());
	registry.extend(restrictions::command_specs());
	registry.extend(youtube::command_specs());
	registry.extend(reminders::command_specs());
	registry.extend(time_channels::command_specs());
	registry.extend(general::command_specs());
	registry
}

/// Builds the command definitions to register with Discord. Commands that need permissions are hidden from members
/// without them by default.
pub fn command_definitions() -> Vec<Command> {
	command_registry()
		.iter()
		.map(|spec| {
			let mut command = (spec.definition)();
			if let Requirement::Permission(required) = spec.requirement {
				command.default_member_permissions = Some(required);
			}
			command
		})
		.collect()
}

/// A single use of a command in a guild
pub struct Invocation<'a> {
	pub ctx: &'a BotContext,
	pub interaction: &'a InteractionCreate,
	pub guild_id: Id<GuildMarker>,
	pub user_id: Id<UserMarker>,
	pub options: &'a [CommandDataOption],
}

impl Invocation<'_> {
	pub async fn respond(&self, content: &str, ephemeral: bool) -> miette::Result<()> {
		responses::respond(self.ctx, self.interaction, content, ephemeral).await
	}

	pub async fn respond_embed(&self, embed: Embed, ephemeral: bool) -> miette::Result<()> {
		responses::respond_embed(self.ctx, self.interaction, embed, ephemeral).await
	}

	pub async fn defer(&self, ephemeral: bool) -> miette::Result<()> {
		responses::defer(self.ctx, self.interaction, ephemeral).await
	}

	pub async fn follow_up(&self, content: &str) -> miette::Result<()> {
		responses::follow_up(self.ctx, self.interaction, content).await
	}

	pub async fn follow_up_embed(&self, embed: Embed) -> miette::Result<()> {
		responses::follow_up_embed(self.ctx, self.interaction, embed).await
	}
}

pub async fn route_command(ctx: &BotContext, interaction: &InteractionCreate, command_data: &CommandData) -> miette::Result<()> {
	let registry = command_registry();
	let Some(spec) = registry.iter().find(|spec| spec.name == command_data.name) else {
		bail!("Unknown command encountered: {}\n{:?}", command_data.name, command_data);
	};

	let (Some(guild_id), Some(user_id)) = (interaction.guild_id, interaction.author_id()) else {
		return responses::respond(ctx, interaction, GUILD_ONLY, true).await;
	};

	let member_permissions = interaction.member.as_ref().and_then(|member| member.permissions);
	if !spec.requirement.is_met(member_permissions, ctx.is_bot_owner(user_id)) {
		tracing::info!(command = spec.name, guild = %guild_id, user = %user_id, "Command refused for missing permissions");
		return responses::respond(ctx, interaction, spec.requirement.denial_message(), true).await;
	}

	let invocation = Invocation {
		ctx,
		interaction,
		guild_id,
		user_id,
		options: &command_data.options,
	};
	let result = match spec.group {
		CommandGroup::Leveling => leveling::handle_command(&invocation, spec.name).await,
		CommandGroup::Restrictions => restrictions::handle_command(&invocation, spec.name).await,
		CommandGroup::YouTube => youtube::handle_command(&invocation, spec.name).await,
		CommandGroup::Reminders => reminders::handle_command(&invocation, spec.name).await,
		CommandGroup::TimeChannels => time_channels::handle_command(&invocation, spec.name).await,
		CommandGroup::General => general::handle_command(&invocation, spec.name).await,
	};

	if let Err(error) = result {
		tracing::error!(source = ?error, command = spec.name, guild = %guild_id, "Command failed");
		if invocation.follow_up(GENERIC_FAILURE).await.is_err() {
			invocation.respond(GENERIC_FAILURE, true).await?;
		}
		return Ok(());
	}

	let mut db_connection = ctx.db_connection_pool.get().into_diagnostic()?;
	record_command_use(&mut db_connection).into_diagnostic()?;
	Ok(())
}

#[cfg(test)]
mod tests {
	use super::*;
	use std::collections::HashSet;

	#[test]
	fn command_names_are_unique() {
		let registry = command_registry();
		let names: HashSet<&str> = registry.iter().map(|spec| spec.name).collect();
		assert_eq!(names.len(), registry.len());
	}

	#[test]
	fn definitions_match_registry_names() {
		for spec in command_registry() {
			let command = (spec.definition)();
			assert_eq!(command.name, spec.name);
			assert!(command.name.len() <= 32, "{} is too long for a command name", command.name);
		}
	}

	#[test]
	fn permission_commands_are_hidden_by_default() {
		let registry = command_registry();
		for (spec, command) in registry.iter().zip(command_definitions()) {
			match spec.requirement {
				Requirement::Permission(required) => assert_eq!(command.default_member_permissions, Some(required)),
				_ => assert_eq!(command.default_member_permissions, None),
			}
		}
	}

	#[test]
	fn every_prefix_is_registered() {
		let registry = command_registry();
		for name in [
			"l1-level",
			"l12-remove-level-reward",
			"n1-setup-no-text",
			"n13-show-restrictions",
			"y5-test-rss-feed",
			"r0-list",
			"r4-pause",
			"t2-disable-time-channels",
			"g6-unbanguild",
		] {
			assert!(registry.iter().any(|spec| spec.name == name), "{} is missing", name);
		}
	}

	#[test]
	fn requirements() {
		let manage_roles = Requirement::Permission(Permissions::MANAGE_ROLES);
		assert!(Requirement::Everyone.is_met(None, false));
		assert!(manage_roles.is_met(Some(Permissions::MANAGE_ROLES | Permissions::SEND_MESSAGES), false));
		assert!(manage_roles.is_met(Some(Permissions::ADMINISTRATOR), false));
		assert!(!manage_roles.is_met(Some(Permissions::SEND_MESSAGES), true));
		assert!(!manage_roles.is_met(None, false));
		assert!(Requirement::BotOwner.is_met(None, true));
		assert!(!Requirement::BotOwner.is_met(Some(Permissions::ADMINISTRATOR), false));
	}
}
