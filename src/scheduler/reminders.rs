// © 2024-2025 ElementalAlchemist and the Dainsleif Mains Development Team
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use crate::context::BotContext;
use crate::discord::utils::errors::report_discord_error;
use crate::error::ValidationError;
use crate::model::{Reminder, ReminderEdit, ReminderStatus, database_id_from_discord_id};
use crate::schema::reminders;
use chrono::{DateTime, Datelike, NaiveDate, NaiveDateTime, NaiveTime, TimeDelta, TimeZone, Utc};
use chrono_tz::Tz;
use diesel::prelude::*;
use miette::IntoDiagnostic;
use std::fmt;
use std::str::FromStr;
use twilight_model::channel::message::AllowedMentions;
use twilight_model::id::Id;
use twilight_model::id::marker::{ChannelMarker, GuildMarker, RoleMarker, UserMarker};

pub const DEFAULT_TIMEZONE: Tz = chrono_tz::Asia::Kolkata;

/// Suggested when someone enters a time zone that doesn't exist
pub const COMMON_TIMEZONES: &[&str] = &[
	"Asia/Kolkata",
	"Asia/Tokyo",
	"Asia/Singapore",
	"Europe/London",
	"Europe/Berlin",
	"America/New_York",
	"America/Los_Angeles",
	"Australia/Sydney",
	"UTC",
];

/// Longest repeat interval a reminder may use
pub const MAX_INTERVAL_DAYS: i64 = 365;

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum IntervalUnit {
	Minutes,
	Hours,
	Days,
}

/// How often a reminder repeats
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Interval {
	Once,
	Every { count: u32, unit: IntervalUnit },
}

impl Interval {
	/// The length of one repeat. Counts too large for a `TimeDelta` have no step.
	pub fn step(&self) -> Option<TimeDelta> {
		match self {
			Self::Once => None,
			Self::Every { count, unit } => {
				let count = i64::from(*count);
				match unit {
					IntervalUnit::Minutes => TimeDelta::try_minutes(count),
					IntervalUnit::Hours => TimeDelta::try_hours(count),
					IntervalUnit::Days => TimeDelta::try_days(count),
				}
			}
		}
	}

	/// The run following `previous_run`, or `None` for a one-off reminder.
	pub fn advance(&self, previous_run: DateTime<Utc>) -> Option<DateTime<Utc>> {
		previous_run.checked_add_signed(self.step()?)
	}

	/// The first scheduled run after `now`. Periods missed while the bot was down are skipped instead of being fired
	/// in a burst. `None` means there's no further run, either because the reminder is one-off or because the next
	/// run falls outside the representable date range.
	pub fn next_run_after(&self, previous_run: DateTime<Utc>, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
		let step = self.step()?;
		let next_run = previous_run.checked_add_signed(step)?;
		if next_run > now {
			return Some(next_run);
		}

		let step_millis = step.num_milliseconds();
		if step_millis <= 0 {
			return None;
		}
		let missed_steps = (now - next_run).num_milliseconds() / step_millis + 1;
		let skipped = TimeDelta::try_milliseconds(missed_steps.checked_mul(step_millis)?)?;
		next_run.checked_add_signed(skipped)
	}
}

impl FromStr for Interval {
	type Err = ValidationError;

	fn from_str(input: &str) -> Result<Self, Self::Err> {
		let invalid = || ValidationError::InvalidInterval(input.to_string());
		let trimmed = input.trim().to_lowercase();
		if trimmed == "once" {
			return Ok(Self::Once);
		}

		let Some(unit_char) = trimmed.chars().last() else {
			return Err(invalid());
		};
		let unit = match unit_char {
			'm' => IntervalUnit::Minutes,
			'h' => IntervalUnit::Hours,
			'd' => IntervalUnit::Days,
			_ => return Err(invalid()),
		};
		let count_text = &trimmed[..trimmed.len() - 1];
		if count_text.is_empty() || !count_text.chars().all(|c| c.is_ascii_digit()) {
			return Err(invalid());
		}
		let count: u32 = count_text.parse().map_err(|_| invalid())?;
		if count == 0 {
			return Err(invalid());
		}

		let interval = Self::Every { count, unit };
		match interval.step() {
			Some(step) if step <= TimeDelta::days(MAX_INTERVAL_DAYS) => Ok(interval),
			_ => Err(invalid()),
		}
	}
}

impl fmt::Display for Interval {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Self::Once => write!(f, "once"),
			Self::Every { count, unit } => {
				let unit = match unit {
					IntervalUnit::Minutes => 'm',
					IntervalUnit::Hours => 'h',
					IntervalUnit::Days => 'd',
				};
				write!(f, "{}{}", count, unit)
			}
		}
	}
}

pub fn parse_timezone(name: &str) -> Result<Tz, ValidationError> {
	name.trim()
		.parse::<Tz>()
		.map_err(|_| ValidationError::UnknownTimezone(name.to_string()))
}

/// Parses a reminder's time.
///
/// - `HH:MM` is today in the given time zone, or tomorrow if that time has already passed
/// - `MM/DD HH:MM` is that date in the current year
pub fn parse_reminder_time(input: &str, timezone: Tz, now: DateTime<Utc>) -> Result<DateTime<Utc>, ValidationError> {
	let invalid = || ValidationError::InvalidTime(input.to_string());
	let trimmed = input.trim();
	let local_now = now.with_timezone(&timezone);

	let localize = |naive: NaiveDateTime| {
		timezone
			.from_local_datetime(&naive)
			.earliest()
			.map(|local| local.with_timezone(&Utc))
	};

	match trimmed.split_once(' ') {
		Some((date_text, time_text)) => {
			let time = NaiveTime::parse_from_str(time_text.trim(), "%H:%M").map_err(|_| invalid())?;
			let (month_text, day_text) = date_text.split_once('/').ok_or_else(invalid)?;
			let month: u32 = month_text.parse().map_err(|_| invalid())?;
			let day: u32 = day_text.parse().map_err(|_| invalid())?;
			let date = NaiveDate::from_ymd_opt(local_now.year(), month, day).ok_or_else(invalid)?;
			localize(date.and_time(time)).ok_or_else(invalid)
		}
		None => {
			let time = NaiveTime::parse_from_str(trimmed, "%H:%M").map_err(|_| invalid())?;
			let today = local_now.date_naive();
			let candidate = localize(today.and_time(time)).ok_or_else(invalid)?;
			if candidate > now {
				return Ok(candidate);
			}
			let tomorrow = today.succ_opt().ok_or_else(invalid)?;
			localize(tomorrow.and_time(time)).ok_or_else(invalid)
		}
	}
}

pub fn new_reminder_id() -> String {
	format!("R-{}", cuid2::slug())
}

/// The text posted when a reminder fires
pub fn reminder_content(role_id: Option<Id<RoleMarker>>, message: &str) -> String {
	match role_id {
		Some(role_id) => format!("<@&{}>\n{}", role_id, message),
		None => message.to_string(),
	}
}

pub struct ReminderRequest<'a> {
	pub guild_id: Id<GuildMarker>,
	pub channel_id: Id<ChannelMarker>,
	pub role_id: Option<Id<RoleMarker>>,
	pub message: &'a str,
	pub time: &'a str,
	pub interval: Option<&'a str>,
	pub timezone: Option<&'a str>,
	pub created_by: Id<UserMarker>,
}

/// Validates a reminder request and builds the record to store.
pub fn prepare_reminder(request: &ReminderRequest<'_>, now: DateTime<Utc>) -> Result<Reminder, ValidationError> {
	let message = request.message.trim();
	if message.is_empty() {
		return Err(ValidationError::EmptyReminderMessage);
	}
	let timezone = match request.timezone {
		Some(name) => parse_timezone(name)?,
		None => DEFAULT_TIMEZONE,
	};
	let interval: Interval = request.interval.unwrap_or("once").parse()?;
	let next_run = parse_reminder_time(request.time, timezone, now)?;

	Ok(Reminder {
		reminder_id: new_reminder_id(),
		guild_id: database_id_from_discord_id(request.guild_id.get()),
		channel_id: database_id_from_discord_id(request.channel_id.get()),
		role_id: request.role_id.map(|role_id| database_id_from_discord_id(role_id.get())),
		message: message.to_string(),
		next_run,
		last_run: None,
		interval: interval.to_string(),
		timezone: timezone.name().to_string(),
		status: ReminderStatus::Active,
		run_count: 0,
		created_by: database_id_from_discord_id(request.created_by.get()),
		created_at: now,
	})
}

pub fn insert_reminder(db_connection: &mut PgConnection, reminder: &Reminder) -> QueryResult<()> {
	diesel::insert_into(reminders::table)
		.values(reminder)
		.execute(db_connection)?;
	Ok(())
}

/// Gets a guild's reminder by ID. Deleted reminders are never returned.
pub fn get_reminder(
	db_connection: &mut PgConnection,
	guild_id: Id<GuildMarker>,
	reminder_id: &str,
) -> QueryResult<Option<Reminder>> {
	reminders::table
		.filter(
			reminders::guild_id
				.eq(database_id_from_discord_id(guild_id.get()))
				.and(reminders::reminder_id.eq(reminder_id))
				.and(reminders::status.ne(ReminderStatus::Deleted)),
		)
		.first(db_connection)
		.optional()
}

/// Active and paused reminders, soonest first
pub fn list_reminders(db_connection: &mut PgConnection, guild_id: Id<GuildMarker>) -> QueryResult<Vec<Reminder>> {
	reminders::table
		.filter(
			reminders::guild_id
				.eq(database_id_from_discord_id(guild_id.get()))
				.and(
					reminders::status
						.eq(ReminderStatus::Active)
						.or(reminders::status.eq(ReminderStatus::Paused)),
				),
		)
		.order(reminders::next_run.asc())
		.load(db_connection)
}

pub fn due_reminders(db_connection: &mut PgConnection, now: DateTime<Utc>) -> QueryResult<Vec<Reminder>> {
	reminders::table
		.filter(
			reminders::status
				.eq(ReminderStatus::Active)
				.and(reminders::next_run.le(now)),
		)
		.order(reminders::next_run.asc())
		.load(db_connection)
}

/// Marks a reminder deleted. Returns whether there was a reminder to delete.
pub fn soft_delete_reminder(
	db_connection: &mut PgConnection,
	guild_id: Id<GuildMarker>,
	reminder_id: &str,
) -> QueryResult<bool> {
	let updated = diesel::update(reminders::table)
		.filter(
			reminders::guild_id
				.eq(database_id_from_discord_id(guild_id.get()))
				.and(reminders::reminder_id.eq(reminder_id))
				.and(reminders::status.ne(ReminderStatus::Deleted)),
		)
		.set(reminders::status.eq(ReminderStatus::Deleted))
		.execute(db_connection)?;
	Ok(updated > 0)
}

pub fn edit_reminder(
	db_connection: &mut PgConnection,
	guild_id: Id<GuildMarker>,
	reminder_id: &str,
	edit: &ReminderEdit,
) -> QueryResult<bool> {
	if edit.is_empty() {
		return Ok(false);
	}
	let updated = diesel::update(reminders::table)
		.filter(
			reminders::guild_id
				.eq(database_id_from_discord_id(guild_id.get()))
				.and(reminders::reminder_id.eq(reminder_id))
				.and(reminders::status.ne(ReminderStatus::Deleted)),
		)
		.set(edit)
		.execute(db_connection)?;
	Ok(updated > 0)
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum PauseToggle {
	Paused,
	Resumed,
	/// Completed reminders can't be paused or resumed
	NotToggleable(ReminderStatus),
	NotFound,
}

/// Flips a reminder between active and paused.
pub fn toggle_pause(
	db_connection: &mut PgConnection,
	guild_id: Id<GuildMarker>,
	reminder_id: &str,
) -> QueryResult<PauseToggle> {
	db_connection.transaction(|db_connection| {
		let Some(reminder) = get_reminder(db_connection, guild_id, reminder_id)? else {
			return Ok(PauseToggle::NotFound);
		};
		let (new_status, outcome) = match reminder.status {
			ReminderStatus::Active => (ReminderStatus::Paused, PauseToggle::Paused),
			ReminderStatus::Paused => (ReminderStatus::Active, PauseToggle::Resumed),
			other => return Ok(PauseToggle::NotToggleable(other)),
		};
		diesel::update(reminders::table.find(&reminder.reminder_id))
			.set(reminders::status.eq(new_status))
			.execute(db_connection)?;
		Ok(outcome)
	})
}

/// Records that a reminder fired, scheduling its next run or completing it. A reminder that was paused or deleted
/// while it was being sent is left alone.
pub fn record_reminder_run(
	db_connection: &mut PgConnection,
	reminder_id: &str,
	next_run: Option<DateTime<Utc>>,
	now: DateTime<Utc>,
) -> QueryResult<()> {
	db_connection.transaction(|db_connection| {
		let status: Option<ReminderStatus> = reminders::table
			.find(reminder_id)
			.select(reminders::status)
			.for_update()
			.first(db_connection)
			.optional()?;
		if status != Some(ReminderStatus::Active) {
			return Ok(());
		}

		let stamped = reminders::table.find(reminder_id);
		match next_run {
			Some(next_run) => diesel::update(stamped)
				.set((
					reminders::next_run.eq(next_run),
					reminders::last_run.eq(Some(now)),
					reminders::run_count.eq(reminders::run_count + 1),
				))
				.execute(db_connection)?,
			None => diesel::update(stamped)
				.set((
					reminders::status.eq(ReminderStatus::Completed),
					reminders::last_run.eq(Some(now)),
					reminders::run_count.eq(reminders::run_count + 1),
				))
				.execute(db_connection)?,
		};
		Ok(())
	})
}

/// Sends every reminder that has come due.
pub async fn fire_due_reminders(ctx: &BotContext, now: DateTime<Utc>) -> miette::Result<()> {
	let due = {
		let mut db_connection = ctx.db_connection_pool.get().into_diagnostic()?;
		due_reminders(&mut db_connection, now).into_diagnostic()?
	};

	for reminder in due.iter() {
		if let Err(error) = fire_reminder(ctx, reminder, now).await {
			tracing::error!(source = ?error, reminder = %reminder.reminder_id, "Failed to fire reminder");
		}
	}
	Ok(())
}

async fn fire_reminder(ctx: &BotContext, reminder: &Reminder, now: DateTime<Utc>) -> miette::Result<()> {
	let guild_id = reminder.get_guild();
	if ctx.cache.guild(guild_id).is_none() {
		tracing::warn!(reminder = %reminder.reminder_id, guild = %guild_id, "Skipping reminder for a guild the bot can't see");
		return Ok(());
	}
	let channel_id = reminder.get_channel();
	if ctx.cache.channel(channel_id).is_none() {
		tracing::warn!(reminder = %reminder.reminder_id, channel = %channel_id, "Skipping reminder for a missing channel");
		return Ok(());
	}

	let content = reminder_content(reminder.get_role(), &reminder.message);
	let mut allowed_mentions = AllowedMentions::default();
	if let Some(role_id) = reminder.get_role() {
		allowed_mentions.roles.push(role_id);
	}
	let send_result = ctx
		.http_client
		.create_message(channel_id)
		.content(&content)
		.allowed_mentions(Some(&allowed_mentions))
		.await;
	if let Err(error) = send_result {
		report_discord_error(&error, "send reminder");
		return Ok(());
	}

	let interval = match reminder.interval.parse::<Interval>() {
		Ok(interval) => interval,
		Err(error) => {
			tracing::warn!(source = ?error, reminder = %reminder.reminder_id, "Stored reminder interval is invalid; completing it");
			Interval::Once
		}
	};
	let next_run = interval.next_run_after(reminder.next_run, now);

	let mut db_connection = ctx.db_connection_pool.get().into_diagnostic()?;
	record_reminder_run(&mut db_connection, &reminder.reminder_id, next_run, now).into_diagnostic()?;
	tracing::info!(reminder = %reminder.reminder_id, guild = %guild_id, "Fired reminder");
	Ok(())
}

#[cfg(test)]
mod tests {
	use super::*;

	fn at(timestamp: &str) -> DateTime<Utc> {
		DateTime::parse_from_rfc3339(timestamp).unwrap().with_timezone(&Utc)
	}

	#[test]
	fn interval_grammar() {
		assert_eq!("once".parse::<Interval>(), Ok(Interval::Once));
		assert_eq!("ONCE".parse::<Interval>(), Ok(Interval::Once));
		assert_eq!(
			"30m".parse::<Interval>(),
			Ok(Interval::Every {
				count: 30,
				unit: IntervalUnit::Minutes
			})
		);
		assert_eq!(
			" 12h ".parse::<Interval>(),
			Ok(Interval::Every {
				count: 12,
				unit: IntervalUnit::Hours
			})
		);
		for bad in ["", "d", "0d", "2w", "-3h", "1.5h", "h2", "twice"] {
			assert_eq!(
				bad.parse::<Interval>(),
				Err(ValidationError::InvalidInterval(bad.to_string())),
				"{:?} should be rejected",
				bad
			);
		}
	}

	#[test]
	fn intervals_are_capped_at_a_year() {
		assert!("365d".parse::<Interval>().is_ok());
		assert!("8760h".parse::<Interval>().is_ok());
		assert!("525600m".parse::<Interval>().is_ok());
		for bad in ["366d", "8761h", "525601m", "4294967295d", "99999999999d"] {
			assert_eq!(
				bad.parse::<Interval>(),
				Err(ValidationError::InvalidInterval(bad.to_string())),
				"{:?} should be rejected",
				bad
			);
		}
	}

	#[test]
	fn unrepresentable_next_run_completes_the_reminder() {
		let last_run = at("2025-04-10T08:00:00Z");
		let huge = Interval::Every {
			count: u32::MAX,
			unit: IntervalUnit::Days,
		};
		assert_eq!(huge.advance(last_run), None);
		assert_eq!(huge.next_run_after(last_run, last_run + TimeDelta::minutes(1)), None);

		let near_the_end = DateTime::<Utc>::MAX_UTC - TimeDelta::minutes(30);
		let hourly: Interval = "1h".parse().unwrap();
		assert_eq!(hourly.next_run_after(near_the_end, near_the_end), None);
	}

	#[test]
	fn interval_display_is_canonical() {
		assert_eq!("7D".parse::<Interval>().unwrap().to_string(), "7d");
		assert_eq!(Interval::Once.to_string(), "once");
	}

	#[test]
	fn two_days_after_last_run() {
		let last_run = at("2025-04-10T08:15:00Z");
		let interval: Interval = "2d".parse().unwrap();
		assert_eq!(interval.advance(last_run), Some(at("2025-04-12T08:15:00Z")));
		assert_eq!(Interval::Once.advance(last_run), None);
	}

	#[test]
	fn missed_runs_are_skipped() {
		let interval: Interval = "1h".parse().unwrap();
		let scheduled = at("2025-04-10T08:00:00Z");
		// On time: the next run is one step later
		assert_eq!(
			interval.next_run_after(scheduled, at("2025-04-10T08:00:30Z")),
			Some(at("2025-04-10T09:00:00Z"))
		);
		// Three and a half hours late: land on the next boundary still in the future
		assert_eq!(
			interval.next_run_after(scheduled, at("2025-04-10T11:30:00Z")),
			Some(at("2025-04-10T12:00:00Z"))
		);
		// Exactly on a later boundary: that one counts as already passed
		assert_eq!(
			interval.next_run_after(scheduled, at("2025-04-10T10:00:00Z")),
			Some(at("2025-04-10T11:00:00Z"))
		);
	}

	#[test]
	fn time_of_day_rolls_to_tomorrow_once_passed() {
		// 10:00 UTC is 15:30 in Kolkata
		let now = at("2025-06-01T10:00:00Z");
		assert_eq!(
			parse_reminder_time("18:00", DEFAULT_TIMEZONE, now),
			Ok(at("2025-06-01T12:30:00Z"))
		);
		assert_eq!(
			parse_reminder_time("09:00", DEFAULT_TIMEZONE, now),
			Ok(at("2025-06-02T03:30:00Z"))
		);
	}

	#[test]
	fn month_and_day_use_the_current_year() {
		let now = at("2025-06-01T10:00:00Z");
		assert_eq!(
			parse_reminder_time("12/25 09:30", chrono_tz::UTC, now),
			Ok(at("2025-12-25T09:30:00Z"))
		);
		assert_eq!(
			parse_reminder_time("02/30 09:30", chrono_tz::UTC, now),
			Err(ValidationError::InvalidTime("02/30 09:30".to_string()))
		);
	}

	#[test]
	fn nonexistent_local_times_are_rejected() {
		// Clocks in New York jump from 02:00 to 03:00 on this date
		let now = at("2025-01-15T00:00:00Z");
		assert_eq!(
			parse_reminder_time("03/09 02:30", chrono_tz::America::New_York, now),
			Err(ValidationError::InvalidTime("03/09 02:30".to_string()))
		);
	}

	#[test]
	fn malformed_times_are_rejected() {
		let now = at("2025-06-01T10:00:00Z");
		for bad in ["25:00", "noon", "12/25", "1225 10:00", "12:5x"] {
			assert!(parse_reminder_time(bad, DEFAULT_TIMEZONE, now).is_err(), "{:?} should be rejected", bad);
		}
	}

	#[test]
	fn timezones() {
		assert_eq!(parse_timezone("Asia/Tokyo"), Ok(chrono_tz::Asia::Tokyo));
		assert_eq!(
			parse_timezone("Mars/Olympus"),
			Err(ValidationError::UnknownTimezone("Mars/Olympus".to_string()))
		);
		for name in COMMON_TIMEZONES {
			assert!(parse_timezone(name).is_ok());
		}
	}

	#[test]
	fn role_mention_prefix() {
		assert_eq!(reminder_content(None, "Stand-up time"), "Stand-up time");
		assert_eq!(reminder_content(Some(Id::new(42)), "Stand-up time"), "<@&42>\nStand-up time");
	}

	#[test]
	fn prepared_reminders() {
		let now = at("2025-06-01T10:00:00Z");
		let request = ReminderRequest {
			guild_id: Id::new(1),
			channel_id: Id::new(2),
			role_id: None,
			message: "  Drink water  ",
			time: "18:00",
			interval: None,
			timezone: None,
			created_by: Id::new(3),
		};
		let reminder = prepare_reminder(&request, now).unwrap();
		assert!(reminder.reminder_id.starts_with("R-"));
		assert_eq!(reminder.message, "Drink water");
		assert_eq!(reminder.interval, "once");
		assert_eq!(reminder.timezone, "Asia/Kolkata");
		assert_eq!(reminder.status, ReminderStatus::Active);
		assert_eq!(reminder.next_run, at("2025-06-01T12:30:00Z"));

		let empty = ReminderRequest {
			message: "   ",
			..request
		};
		assert_eq!(prepare_reminder(&empty, now).unwrap_err(), ValidationError::EmptyReminderMessage);
	}

	#[test]
	fn generated_ids_differ() {
		assert_ne!(new_reminder_id(), new_reminder_id());
	}
}
