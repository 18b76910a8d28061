// © 2024-2025 ElementalAlchemist and the Dainsleif Mains Development Team
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use super::{CommandGroup, CommandSpec, Invocation, Requirement, guild_command};
use crate::discord::utils::options::{channel_option, role_option, string_option};
use crate::discord::utils::responses::truncate;
use crate::discord::utils::timestamp::timestamp_mention;
use crate::error::ValidationError;
use crate::model::{Reminder, ReminderEdit, ReminderStatus, database_id_from_discord_id};
use crate::scheduler::reminders::{
	self, COMMON_TIMEZONES, DEFAULT_TIMEZONE, Interval, PauseToggle, ReminderRequest, parse_reminder_time,
	parse_timezone, prepare_reminder,
};
use chrono::Utc;
use miette::{IntoDiagnostic, bail};
use twilight_mention::fmt::Mention;
use twilight_mention::timestamp::TimestampStyle;
use twilight_model::application::command::Command;
use twilight_model::channel::ChannelType;
use twilight_model::guild::Permissions;
use twilight_util::builder::command::{ChannelBuilder, RoleBuilder, StringBuilder};
use twilight_util::builder::embed::{EmbedBuilder, EmbedFieldBuilder, EmbedFooterBuilder};

const REMINDER_COLOR: u32 = 0x3498DB;
const CREATED_COLOR: u32 = 0x2ECC71;
const LIST_LIMIT: usize = 10;

const INVALID_TIME_MESSAGE: &str = "❌ Invalid time format.\n\n**Valid formats:**\n• `14:30` - Today at 2:30 PM (or tomorrow if time passed)\n• `12/25 09:00` - December 25 at 9:00 AM\n• `01/15 18:45` - January 15 at 6:45 PM";
const INVALID_INTERVAL_MESSAGE: &str = "❌ Invalid interval format.\n\n**Valid intervals:**\n• `once` - One-time reminder\n• `5m` - Every 5 minutes\n• `30m` - Every 30 minutes\n• `1h` - Every hour\n• `6h` - Every 6 hours\n• `1d` - Daily\n• `2d` - Every 2 days\n• `7d` - Weekly\n\nIntervals can be at most 365 days.";

pub fn command_specs() -> Vec<CommandSpec> {
	let spec = |name: &'static str, definition: fn() -> Command, requirement: Requirement| CommandSpec {
		name,
		definition,
		requirement,
		group: CommandGroup::Reminders,
	};
	let manage_guild = Requirement::Permission(Permissions::MANAGE_GUILD);
	vec![
		spec("r0-list", list_definition, Requirement::Everyone),
		spec("r1-create", create_definition, manage_guild),
		spec("r2-delete", delete_definition, manage_guild),
		spec("r3-edit", edit_definition, manage_guild),
		spec("r4-pause", pause_definition, manage_guild),
	]
}

fn reminder_id_option() -> StringBuilder {
	StringBuilder::new("reminder_id", "The reminder's ID (like R-abc123)").required(true)
}

fn text_channel_option(description: &'static str) -> ChannelBuilder {
	ChannelBuilder::new("channel", description).channel_types([ChannelType::GuildText, ChannelType::GuildAnnouncement])
}

fn list_definition() -> Command {
	guild_command("r0-list", "List all active reminders in this server").build()
}

fn create_definition() -> Command {
	guild_command("r1-create", "Create a new reminder with advanced options")
		.option(text_channel_option("The channel to post the reminder in").required(true))
		.option(StringBuilder::new("message", "What to remind people of").required(true))
		.option(StringBuilder::new("time", "When to send it: HH:MM or MM/DD HH:MM").required(true))
		.option(StringBuilder::new(
			"interval",
			"How often to repeat: once, 30m, 6h, 1d, ... (default once)",
		))
		.option(RoleBuilder::new("role", "A role to mention"))
		.option(StringBuilder::new("timezone", "Time zone for the time (default Asia/Kolkata)"))
		.build()
}

fn delete_definition() -> Command {
	guild_command("r2-delete", "Delete a reminder by ID")
		.option(reminder_id_option())
		.build()
}

fn edit_definition() -> Command {
	guild_command("r3-edit", "Edit an existing reminder")
		.option(reminder_id_option())
		.option(text_channel_option("A new channel to post in"))
		.option(RoleBuilder::new("role", "A new role to mention"))
		.option(StringBuilder::new("message", "A new message"))
		.option(StringBuilder::new("time", "A new time: HH:MM or MM/DD HH:MM"))
		.option(StringBuilder::new("interval", "A new interval: once, 30m, 6h, 1d, ..."))
		.build()
}

fn pause_definition() -> Command {
	guild_command("r4-pause", "Pause or resume a reminder")
		.option(reminder_id_option())
		.build()
}

pub async fn handle_command(invocation: &Invocation<'_>, name: &str) -> miette::Result<()> {
	match name {
		"r0-list" => list_reminders(invocation).await,
		"r1-create" => create_reminder(invocation).await,
		"r2-delete" => delete_reminder(invocation).await,
		"r3-edit" => edit_reminder(invocation).await,
		"r4-pause" => toggle_pause(invocation).await,
		_ => bail!("Reminder command handler got unknown command {}", name),
	}
}

fn invalid_timezone_message(timezone: &str) -> String {
	let suggestions: Vec<String> = COMMON_TIMEZONES
		.iter()
		.map(|timezone| format!("• `{}`", timezone))
		.collect();
	format!(
		"❌ Invalid timezone: `{}`\n\n**📍 Common Timezones:**\n{}\n\n💡 **Tip:** If you don't specify a timezone, it defaults to `{}` (IST)\n\n🔍 For more timezones, visit: <https://en.wikipedia.org/wiki/List_of_tz_database_time_zones>",
		timezone,
		suggestions.join("\n"),
		DEFAULT_TIMEZONE.name()
	)
}

/// The message shown when a reminder can't be created
pub fn creation_error_message(error: &ValidationError) -> String {
	match error {
		ValidationError::UnknownTimezone(timezone) => invalid_timezone_message(timezone),
		ValidationError::InvalidTime(_) => String::from(INVALID_TIME_MESSAGE),
		ValidationError::InvalidInterval(_) => String::from(INVALID_INTERVAL_MESSAGE),
		other => format!("❌ {}", other),
	}
}

/// The summary shown for a reminder in the reminder list
pub fn reminder_summary(reminder: &Reminder) -> String {
	let status = match reminder.status {
		ReminderStatus::Paused => "⏸️ Paused",
		ReminderStatus::Active => "✅ Active",
		ReminderStatus::Completed => "☑️ Completed",
		ReminderStatus::Deleted => "🗑️ Deleted",
	};
	let role = match reminder.get_role() {
		Some(role_id) => role_id.mention().to_string(),
		None => String::from("None"),
	};
	format!(
		"**Status:** {}\n**Channel:** {}\n**Role:** {}\n**Next Run:** {}\n**Interval:** {}\n**Timezone:** {}\n**Message:** {}",
		status,
		reminder.get_channel().mention(),
		role,
		timestamp_mention(reminder.next_run, TimestampStyle::RelativeTime),
		reminder.interval,
		reminder.timezone,
		truncate(&reminder.message, 50)
	)
}

async fn list_reminders(invocation: &Invocation<'_>) -> miette::Result<()> {
	invocation.defer(true).await?;
	let reminders = {
		let mut db_connection = invocation.ctx.db_connection_pool.get().into_diagnostic()?;
		reminders::list_reminders(&mut db_connection, invocation.guild_id).into_diagnostic()?
	};
	if reminders.is_empty() {
		return invocation.follow_up("📭 No active reminders found.").await;
	}

	let mut embed = EmbedBuilder::new()
		.title("🔔 Active Reminders")
		.description(format!("Found {} reminder(s)", reminders.len()))
		.color(REMINDER_COLOR);
	for reminder in reminders.iter().take(LIST_LIMIT) {
		embed = embed.field(EmbedFieldBuilder::new(
			format!("ID: {}", reminder.reminder_id),
			reminder_summary(reminder),
		));
	}
	if reminders.len() > LIST_LIMIT {
		embed = embed.footer(EmbedFooterBuilder::new(format!(
			"Showing {} of {} reminders",
			LIST_LIMIT,
			reminders.len()
		)));
	}
	invocation
		.follow_up_embed(embed.validate().into_diagnostic()?.build())
		.await
}

async fn create_reminder(invocation: &Invocation<'_>) -> miette::Result<()> {
	let options = invocation.options;
	let (Some(channel_id), Some(message), Some(time)) = (
		channel_option(options, "channel"),
		string_option(options, "message"),
		string_option(options, "time"),
	) else {
		bail!("Reminder creation is missing required options");
	};
	let request = ReminderRequest {
		guild_id: invocation.guild_id,
		channel_id,
		role_id: role_option(options, "role"),
		message,
		time,
		interval: string_option(options, "interval"),
		timezone: string_option(options, "timezone"),
		created_by: invocation.user_id,
	};

	let reminder = match prepare_reminder(&request, Utc::now()) {
		Ok(reminder) => reminder,
		Err(error) => return invocation.respond(&creation_error_message(&error), true).await,
	};
	invocation.defer(true).await?;
	{
		let mut db_connection = invocation.ctx.db_connection_pool.get().into_diagnostic()?;
		reminders::insert_reminder(&mut db_connection, &reminder).into_diagnostic()?;
	}
	tracing::info!(guild = %invocation.guild_id, reminder = %reminder.reminder_id, "Reminder created");

	let role = match reminder.get_role() {
		Some(role_id) => role_id.mention().to_string(),
		None => String::from("@here"),
	};
	let embed = EmbedBuilder::new()
		.title("✅ Reminder Created")
		.description(format!("**ID:** `{}`", reminder.reminder_id))
		.color(CREATED_COLOR)
		.field(EmbedFieldBuilder::new("Channel", reminder.get_channel().mention().to_string()).inline())
		.field(EmbedFieldBuilder::new("Role", role).inline())
		.field(EmbedFieldBuilder::new(
			"Next Run",
			timestamp_mention(reminder.next_run, TimestampStyle::LongDateTime),
		))
		.field(EmbedFieldBuilder::new("Interval", reminder.interval.clone()).inline())
		.field(EmbedFieldBuilder::new("Timezone", format!("`{}`", reminder.timezone)).inline())
		.field(EmbedFieldBuilder::new("Message", truncate(&reminder.message, 100)))
		.validate()
		.into_diagnostic()?
		.build();
	invocation.follow_up_embed(embed).await
}

async fn delete_reminder(invocation: &Invocation<'_>) -> miette::Result<()> {
	let Some(reminder_id) = string_option(invocation.options, "reminder_id") else {
		bail!("Reminder deletion is missing the reminder ID");
	};
	let reminder_id = reminder_id.trim();
	invocation.defer(true).await?;
	let deleted = {
		let mut db_connection = invocation.ctx.db_connection_pool.get().into_diagnostic()?;
		reminders::soft_delete_reminder(&mut db_connection, invocation.guild_id, reminder_id).into_diagnostic()?
	};
	if deleted {
		tracing::info!(guild = %invocation.guild_id, reminder = reminder_id, "Reminder deleted");
		invocation
			.follow_up(&format!("✅ Reminder `{}` deleted.", reminder_id))
			.await
	} else {
		invocation
			.follow_up(&format!("❌ Reminder `{}` not found.", reminder_id))
			.await
	}
}

async fn edit_reminder(invocation: &Invocation<'_>) -> miette::Result<()> {
	let options = invocation.options;
	let Some(reminder_id) = string_option(options, "reminder_id") else {
		bail!("Reminder edit is missing the reminder ID");
	};
	let reminder_id = reminder_id.trim();

	let interval = match string_option(options, "interval") {
		Some(interval) => match interval.parse::<Interval>() {
			Ok(interval) => Some(interval.to_string()),
			Err(_) => return invocation.respond("❌ Invalid interval format.", true).await,
		},
		None => None,
	};
	let message = string_option(options, "message")
		.map(str::trim)
		.filter(|message| !message.is_empty())
		.map(String::from);
	let mut edit = ReminderEdit {
		channel_id: channel_option(options, "channel").map(|channel_id| database_id_from_discord_id(channel_id.get())),
		role_id: role_option(options, "role").map(|role_id| database_id_from_discord_id(role_id.get())),
		message,
		next_run: None,
		interval,
	};
	let time = string_option(options, "time");
	if edit.is_empty() && time.is_none() {
		return invocation.respond("❌ No changes provided.", true).await;
	}

	invocation.defer(true).await?;
	let reminder = {
		let mut db_connection = invocation.ctx.db_connection_pool.get().into_diagnostic()?;
		reminders::get_reminder(&mut db_connection, invocation.guild_id, reminder_id).into_diagnostic()?
	};
	let Some(reminder) = reminder else {
		return invocation
			.follow_up(&format!("❌ Reminder `{}` not found.", reminder_id))
			.await;
	};
	if let Some(time) = time {
		let timezone = parse_timezone(&reminder.timezone).unwrap_or(DEFAULT_TIMEZONE);
		match parse_reminder_time(time, timezone, Utc::now()) {
			Ok(next_run) => edit.next_run = Some(next_run),
			Err(_) => return invocation.follow_up(INVALID_TIME_MESSAGE).await,
		}
	}

	let updated = {
		let mut db_connection = invocation.ctx.db_connection_pool.get().into_diagnostic()?;
		reminders::edit_reminder(&mut db_connection, invocation.guild_id, reminder_id, &edit).into_diagnostic()?
	};
	if updated {
		tracing::info!(guild = %invocation.guild_id, reminder = reminder_id, "Reminder edited");
		invocation
			.follow_up(&format!("✅ Reminder `{}` updated successfully.", reminder_id))
			.await
	} else {
		invocation
			.follow_up(&format!("❌ Reminder `{}` not found.", reminder_id))
			.await
	}
}

async fn toggle_pause(invocation: &Invocation<'_>) -> miette::Result<()> {
	let Some(reminder_id) = string_option(invocation.options, "reminder_id") else {
		bail!("Reminder pause is missing the reminder ID");
	};
	let reminder_id = reminder_id.trim();
	invocation.defer(true).await?;
	let toggled = {
		let mut db_connection = invocation.ctx.db_connection_pool.get().into_diagnostic()?;
		reminders::toggle_pause(&mut db_connection, invocation.guild_id, reminder_id).into_diagnostic()?
	};
	let message = match toggled {
		PauseToggle::Paused => format!("✅ Reminder `{}` ⏸️ paused.", reminder_id),
		PauseToggle::Resumed => format!("✅ Reminder `{}` ▶️ resumed.", reminder_id),
		PauseToggle::NotToggleable(_) => format!(
			"❌ Reminder `{}` has already completed and can't be paused or resumed.",
			reminder_id
		),
		PauseToggle::NotFound => format!("❌ Reminder `{}` not found.", reminder_id),
	};
	invocation.follow_up(&message).await
}

#[cfg(test)]
mod tests {
	use super::*;
	use chrono::{DateTime, TimeZone};

	fn reminder(status: ReminderStatus, role_id: Option<i64>, message: &str) -> Reminder {
		let next_run: DateTime<Utc> = Utc.with_ymd_and_hms(2023, 11, 14, 22, 13, 20).unwrap();
		Reminder {
			reminder_id: String::from("R-test"),
			guild_id: 1,
			channel_id: 2,
			role_id,
			message: message.to_string(),
			next_run,
			last_run: None,
			interval: String::from("1d"),
			timezone: String::from("Asia/Kolkata"),
			status,
			run_count: 0,
			created_by: 3,
			created_at: next_run,
		}
	}

	#[test]
	fn summaries_show_status_and_role() {
		let summary = reminder_summary(&reminder(ReminderStatus::Paused, Some(9), "Drink water"));
		assert_eq!(
			summary,
			"**Status:** ⏸️ Paused\n**Channel:** <#2>\n**Role:** <@&9>\n**Next Run:** <t:1700000000:R>\n**Interval:** 1d\n**Timezone:** Asia/Kolkata\n**Message:** Drink water"
		);

		let summary = reminder_summary(&reminder(ReminderStatus::Active, None, &"x".repeat(60)));
		assert!(summary.starts_with("**Status:** ✅ Active"));
		assert!(summary.contains("**Role:** None"));
		assert!(summary.ends_with(&format!("{}...", "x".repeat(50))));
	}

	#[test]
	fn creation_errors_explain_valid_input() {
		let timezone_message = creation_error_message(&ValidationError::UnknownTimezone(String::from("Mars/Base")));
		assert!(timezone_message.starts_with("❌ Invalid timezone: `Mars/Base`"));
		assert!(timezone_message.contains("• `Asia/Tokyo`"));
		assert!(timezone_message.contains("defaults to `Asia/Kolkata`"));

		assert_eq!(
			creation_error_message(&ValidationError::InvalidTime(String::from("25:00"))),
			INVALID_TIME_MESSAGE
		);
		assert_eq!(
			creation_error_message(&ValidationError::InvalidInterval(String::from("3w"))),
			INVALID_INTERVAL_MESSAGE
		);
		assert_eq!(
			creation_error_message(&ValidationError::EmptyReminderMessage),
			"❌ The reminder message can't be empty."
		);
	}
}
