// © 2024-2025 ElementalAlchemist and the Dainsleif Mains Development Team
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use super::{CommandGroup, CommandSpec, Invocation, Requirement, guild_command};
use crate::discord::utils::options::{channel_option, integer_option, role_option, string_option};
use crate::discord::utils::responses::truncate;
use crate::scheduler::youtube::{
	self, FeedEntry, MAX_SEED_COUNT, NotificationSetup, feed_url, fetch_feed, validate_channel_id, validate_seed_count,
};
use chrono::{DateTime, Utc};
use miette::{IntoDiagnostic, bail};
use std::collections::HashSet;
use twilight_mention::fmt::Mention;
use twilight_model::application::command::Command;
use twilight_model::channel::ChannelType;
use twilight_model::guild::Permissions;
use twilight_util::builder::command::{ChannelBuilder, IntegerBuilder, RoleBuilder, StringBuilder};
use twilight_util::builder::embed::{EmbedBuilder, EmbedFieldBuilder, EmbedFooterBuilder};

const YOUTUBE_COLOR: u32 = 0xFF0000;
const SUCCESS_COLOR: u32 = 0x00FF00;
const DEFAULT_SEED_COUNT: i64 = 50;
const FEED_TEST_ENTRIES: usize = 5;

pub fn command_specs() -> Vec<CommandSpec> {
	let spec = |name: &'static str, definition: fn() -> Command, requirement: Requirement| CommandSpec {
		name,
		definition,
		requirement,
		group: CommandGroup::YouTube,
	};
	vec![
		spec("y1-find-youtube-channel-id", find_channel_id_definition, Requirement::Everyone),
		spec(
			"y2-setup-youtube-notifications",
			setup_definition,
			Requirement::Permission(Permissions::MANAGE_GUILD),
		),
		spec(
			"y3-disable-youtube-notifications",
			disable_definition,
			Requirement::Permission(Permissions::MANAGE_GUILD),
		),
		spec(
			"y4-bulk-seed-all-videos",
			bulk_seed_definition,
			Requirement::Permission(Permissions::ADMINISTRATOR),
		),
		spec(
			"y5-test-rss-feed",
			test_feed_definition,
			Requirement::Permission(Permissions::MANAGE_GUILD),
		),
	]
}

fn youtube_channel_id_option() -> StringBuilder {
	StringBuilder::new("youtube_channel_id", "The YouTube channel ID (starts with UC)").required(true)
}

fn find_channel_id_definition() -> Command {
	guild_command(
		"y1-find-youtube-channel-id",
		"Find the Channel ID for a YouTube channel URL or @handle.",
	)
	.option(StringBuilder::new("channel_url", "The channel URL, @handle, or ID").required(true))
	.build()
}

fn setup_definition() -> Command {
	guild_command(
		"y2-setup-youtube-notifications",
		"Set up notifications for a YouTube channel.",
	)
	.option(youtube_channel_id_option())
	.option(
		ChannelBuilder::new("notification_channel", "The channel to post notifications in")
			.channel_types([ChannelType::GuildText, ChannelType::GuildAnnouncement])
			.required(true),
	)
	.option(RoleBuilder::new("role_to_mention", "The role to mention (defaults to @here)"))
	.option(StringBuilder::new(
		"message_template",
		"Custom message using {mention}, {channel}, {title}, and {url}",
	))
	.build()
}

fn disable_definition() -> Command {
	guild_command(
		"y3-disable-youtube-notifications",
		"Disable YouTube notifications for a channel.",
	)
	.option(youtube_channel_id_option())
	.build()
}

fn bulk_seed_definition() -> Command {
	guild_command(
		"y4-bulk-seed-all-videos",
		"[ADMIN] Seed existing videos from a channel's feed. Run once per channel.",
	)
	.option(youtube_channel_id_option())
	.option(
		IntegerBuilder::new("max_videos", "How many videos to mark as seen (default 50)")
			.min_value(1)
			.max_value(MAX_SEED_COUNT),
	)
	.build()
}

fn test_feed_definition() -> Command {
	guild_command(
		"y5-test-rss-feed",
		"Test the RSS feed for a YouTube channel and see what videos would be processed.",
	)
	.option(youtube_channel_id_option())
	.build()
}

pub async fn handle_command(invocation: &Invocation<'_>, name: &str) -> miette::Result<()> {
	match name {
		"y1-find-youtube-channel-id" => find_channel_id(invocation).await,
		"y2-setup-youtube-notifications" => setup_notifications(invocation).await,
		"y3-disable-youtube-notifications" => disable_notifications(invocation).await,
		"y4-bulk-seed-all-videos" => bulk_seed(invocation).await,
		"y5-test-rss-feed" => test_feed(invocation).await,
		_ => bail!("YouTube command handler got unknown command {}", name),
	}
}

/// One line describing how a feed entry would be handled
pub fn feed_entry_status(entry: &FeedEntry, seen: &HashSet<String>, now: DateTime<Utc>) -> String {
	let age_days = (now - entry.published).num_days();
	let status = if seen.contains(&entry.video_id) {
		"✅ In database (will skip)"
	} else {
		"🆕 NEW - Would notify!"
	};
	format!("Age: {} days ago | {}\nID: `{}`", age_days, status, entry.video_id)
}

async fn find_channel_id(invocation: &Invocation<'_>) -> miette::Result<()> {
	let ctx = invocation.ctx;
	let Some(input) = string_option(invocation.options, "channel_url") else {
		bail!("Channel lookup is missing the channel URL");
	};
	invocation.defer(true).await?;

	let channel_id = match youtube::find_channel_id(ctx, input).await {
		Ok(Some(channel_id)) => channel_id,
		Ok(None) => {
			return invocation
				.follow_up(
					"❌ Could not find channel ID. Please provide:\n• Direct channel URL: `youtube.com/channel/UC...`\n• Channel @handle: `@MrBeast`\n• Or the channel ID directly: `UC...`",
				)
				.await;
		}
		Err(error) => {
			tracing::warn!(source = ?error, input, "YouTube channel lookup failed");
			return invocation
				.follow_up("❌ An error occurred. Please provide a valid YouTube channel URL or @handle.")
				.await;
		}
	};

	let channel_name = match fetch_feed(ctx, &channel_id).await {
		Ok(feed) => feed.title.unwrap_or_else(|| channel_id.clone()),
		Err(error) => {
			tracing::info!(source = ?error, channel_id = %channel_id, "Couldn't verify YouTube channel");
			return invocation
				.follow_up(&format!("❌ Could not verify channel with ID `{}`", channel_id))
				.await;
		}
	};

	let embed = EmbedBuilder::new()
		.title("🔍 YouTube Channel Found")
		.color(YOUTUBE_COLOR)
		.field(EmbedFieldBuilder::new("Channel Name", channel_name))
		.field(EmbedFieldBuilder::new("Channel ID", format!("`{}`", channel_id)))
		.field(EmbedFieldBuilder::new(
			"RSS Feed",
			format!(
				"[Click here]({})",
				feed_url(&ctx.config.youtube.feed_url_base, &channel_id)
			),
		))
		.footer(EmbedFooterBuilder::new("Copy the Channel ID for the setup command."))
		.validate()
		.into_diagnostic()?
		.build();
	invocation.follow_up_embed(embed).await
}

async fn setup_notifications(invocation: &Invocation<'_>) -> miette::Result<()> {
	let ctx = invocation.ctx;
	let options = invocation.options;
	let (Some(channel_id_input), Some(target_channel_id)) = (
		string_option(options, "youtube_channel_id"),
		channel_option(options, "notification_channel"),
	) else {
		bail!("YouTube setup is missing required options");
	};
	let mention_role_id = role_option(options, "role_to_mention");
	let message_template = string_option(options, "message_template");

	let Ok(yt_channel_id) = validate_channel_id(channel_id_input) else {
		return invocation
			.respond(
				"❌ That doesn't look like a valid YouTube Channel ID. It should start with `UC`.\nUse `/y1-find-youtube-channel-id` to get the correct ID.",
				true,
			)
			.await;
	};
	invocation.defer(true).await?;

	let feed = match fetch_feed(ctx, yt_channel_id).await {
		Ok(feed) => feed,
		Err(error) => {
			tracing::info!(source = ?error, yt_channel_id, "YouTube setup couldn't fetch the feed");
			return invocation
				.follow_up("❌ Could not find a YouTube channel with that ID. Please verify the ID is correct.")
				.await;
		}
	};

	let setup = NotificationSetup {
		guild_id: invocation.guild_id,
		yt_channel_id,
		target_channel_id,
		mention_role_id,
		message_template,
	};
	let saved = {
		let mut db_connection = ctx.db_connection_pool.get().into_diagnostic()?;
		youtube::save_setup(&mut db_connection, &setup, &feed, Utc::now())
	};
	let (config, seeded) = match saved {
		Ok(saved) => saved,
		Err(error) => {
			tracing::error!(source = ?error, guild = %invocation.guild_id, yt_channel_id, "Failed to save YouTube setup");
			return invocation
				.follow_up("❌ An error occurred during setup. Please check the channel ID and my permissions.")
				.await;
		}
	};

	tracing::info!(guild = %invocation.guild_id, yt_channel_id, seeded, "YouTube notifications set up");
	let mention = match mention_role_id {
		Some(role_id) => role_id.mention().to_string(),
		None => String::from("@here"),
	};
	invocation
		.follow_up(&format!(
			"✅ **Setup Complete!**\n\n📺 **Channel:** {}\n📢 **Notifications:** {}\n🏷️ **Mention:** {}\n📦 **Auto-seeded:** {} existing videos marked as seen\n\n🔔 **Only NEW videos** uploaded after now will trigger notifications!\n🔄 **Method:** RSS feeds (no API quota limits)",
			config.yt_channel_name,
			target_channel_id.mention(),
			mention,
			seeded
		))
		.await
}

async fn disable_notifications(invocation: &Invocation<'_>) -> miette::Result<()> {
	let Some(yt_channel_id) = string_option(invocation.options, "youtube_channel_id") else {
		bail!("YouTube disable is missing the channel ID");
	};
	let yt_channel_id = yt_channel_id.trim();
	invocation.defer(true).await?;

	let disabled = {
		let mut db_connection = invocation.ctx.db_connection_pool.get().into_diagnostic()?;
		youtube::disable_config(&mut db_connection, invocation.guild_id, yt_channel_id, Utc::now())
			.into_diagnostic()?
	};
	if disabled {
		invocation
			.follow_up(&format!(
				"✅ Notifications for the YouTube channel `{}` have been disabled.",
				yt_channel_id
			))
			.await
	} else {
		invocation
			.follow_up("❌ No notification setup was found for that YouTube channel ID in this server.")
			.await
	}
}

async fn bulk_seed(invocation: &Invocation<'_>) -> miette::Result<()> {
	let ctx = invocation.ctx;
	let Some(channel_id_input) = string_option(invocation.options, "youtube_channel_id") else {
		bail!("Bulk seed is missing the channel ID");
	};
	let Ok(yt_channel_id) = validate_channel_id(channel_id_input) else {
		return invocation.respond("❌ Invalid YouTube Channel ID format.", true).await;
	};
	let requested = integer_option(invocation.options, "max_videos").unwrap_or(DEFAULT_SEED_COUNT);
	let Ok(max_videos) = validate_seed_count(requested) else {
		return invocation.respond("❌ max_videos must be between 1 and 200.", true).await;
	};
	invocation.defer(true).await?;

	let (feed, seeded) = match youtube::seed_feed(ctx, invocation.guild_id, yt_channel_id, max_videos, Utc::now()).await {
		Ok(result) => result,
		Err(error) => {
			tracing::warn!(source = ?error, guild = %invocation.guild_id, yt_channel_id, "Bulk seed failed");
			return invocation.follow_up("❌ Could not fetch videos for this channel.").await;
		}
	};
	let considered = feed.entries.len().min(max_videos);
	let skipped = considered.saturating_sub(seeded);
	let channel_name = feed.title.unwrap_or_else(|| yt_channel_id.to_string());

	let embed = EmbedBuilder::new()
		.title("📦 Bulk Seed Complete")
		.description(format!("Channel: **{}**", channel_name))
		.color(SUCCESS_COLOR)
		.field(EmbedFieldBuilder::new("✅ Seeded", seeded.to_string()).inline())
		.field(EmbedFieldBuilder::new("⏭️ Skipped (already in DB)", skipped.to_string()).inline())
		.field(EmbedFieldBuilder::new(
			"ℹ️ Note",
			"RSS feeds only provide ~15 recent videos. For complete history, wait for videos to naturally appear in feed over time.",
		))
		.footer(EmbedFooterBuilder::new(format!("Channel ID: {}", yt_channel_id)))
		.validate()
		.into_diagnostic()?
		.build();
	invocation.follow_up_embed(embed).await
}

async fn test_feed(invocation: &Invocation<'_>) -> miette::Result<()> {
	let ctx = invocation.ctx;
	let Some(yt_channel_id) = string_option(invocation.options, "youtube_channel_id") else {
		bail!("Feed test is missing the channel ID");
	};
	let yt_channel_id = yt_channel_id.trim();
	invocation.defer(true).await?;

	let feed = match fetch_feed(ctx, yt_channel_id).await {
		Ok(feed) => feed,
		Err(error) => {
			tracing::info!(source = ?error, yt_channel_id, "Feed test couldn't fetch the feed");
			return invocation.follow_up("❌ Could not fetch RSS feed for this channel.").await;
		}
	};
	let seen = {
		let mut db_connection = ctx.db_connection_pool.get().into_diagnostic()?;
		youtube::seen_video_ids(&mut db_connection, invocation.guild_id, yt_channel_id).into_diagnostic()?
	};

	let now = Utc::now();
	let channel_name = feed.title.as_deref().unwrap_or(yt_channel_id);
	let mut embed = EmbedBuilder::new()
		.title(format!("📡 RSS Feed Test: {}", channel_name))
		.description(format!("Found **{}** videos in RSS feed", feed.entries.len()))
		.color(YOUTUBE_COLOR);
	for (index, entry) in feed.entries.iter().take(FEED_TEST_ENTRIES).enumerate() {
		embed = embed.field(EmbedFieldBuilder::new(
			format!("{}. {}", index + 1, truncate(&entry.title, 50)),
			feed_entry_status(entry, &seen, now),
		));
	}
	let embed = embed
		.footer(EmbedFooterBuilder::new(format!(
			"Channel ID: {} | Only videos NOT in database trigger notifications",
			yt_channel_id
		)))
		.validate()
		.into_diagnostic()?
		.build();
	invocation.follow_up_embed(embed).await
}

#[cfg(test)]
mod tests {
	use super::*;
	use chrono::TimeDelta;

	fn entry(video_id: &str, published: DateTime<Utc>) -> FeedEntry {
		FeedEntry {
			video_id: video_id.to_string(),
			title: String::from("A video"),
			link: format!("https://www.youtube.com/watch?v={}", video_id),
			author: String::from("Someone"),
			published,
		}
	}

	#[test]
	fn feed_entry_status_reports_seen_and_new_videos() {
		let now = Utc::now();
		let seen: HashSet<String> = [String::from("old")].into_iter().collect();

		let seen_line = feed_entry_status(&entry("old", now - TimeDelta::days(3)), &seen, now);
		assert_eq!(seen_line, "Age: 3 days ago | ✅ In database (will skip)\nID: `old`");

		let new_line = feed_entry_status(&entry("new", now - TimeDelta::hours(2)), &seen, now);
		assert_eq!(new_line, "Age: 0 days ago | 🆕 NEW - Would notify!\nID: `new`");
	}
}
