// © 2024-2025 ElementalAlchemist and the Dainsleif Mains Development Team
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use crate::context::BotContext;
use crate::discord::utils::errors::report_discord_error;
use crate::error::ValidationError;
use crate::model::{VideoStatus, YouTubeNotificationConfig, YouTubeNotificationLog, database_id_from_discord_id};
use crate::schema::{youtube_configs, youtube_notification_logs};
use chrono::{DateTime, TimeDelta, Utc};
use diesel::prelude::*;
use diesel::upsert::excluded;
use miette::IntoDiagnostic;
use quick_xml::events::Event;
use quick_xml::reader::Reader;
use regex::Regex;
use std::collections::{HashMap, HashSet};
use std::time::Duration;
use twilight_model::channel::message::{AllowedMentions, MentionType};
use twilight_model::id::Id;
use twilight_model::id::marker::{ChannelMarker, GuildMarker, RoleMarker};

/// Feeds list roughly this many of a channel's latest uploads
pub const MAX_FEED_ENTRIES: usize = 15;
pub const MAX_SEED_COUNT: i64 = 200;
pub const NOTIFICATION_SPACING: Duration = Duration::from_secs(2);
pub const DEFAULT_TEMPLATE: &str = "🔔 {mention} **{channel}** just uploaded a new video!\n\n**{title}**\n{url}";

#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct Feed {
	/// The uploading channel's name
	pub title: Option<String>,
	pub entries: Vec<FeedEntry>,
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct FeedEntry {
	pub video_id: String,
	pub title: String,
	pub link: String,
	pub author: String,
	pub published: DateTime<Utc>,
}

#[derive(Default)]
struct PartialEntry {
	video_id: Option<String>,
	title: Option<String>,
	link: Option<String>,
	author: Option<String>,
	published: Option<String>,
}

impl PartialEntry {
	fn finish(self) -> Option<FeedEntry> {
		let video_id = self.video_id.filter(|id| !id.is_empty())?;
		let published = DateTime::parse_from_rfc3339(self.published?.trim())
			.ok()?
			.with_timezone(&Utc);
		let link = self
			.link
			.unwrap_or_else(|| format!("https://www.youtube.com/watch?v={}", video_id));
		Some(FeedEntry {
			title: self.title.unwrap_or_else(|| String::from("Untitled")),
			author: self.author.unwrap_or_else(|| String::from("Unknown Channel")),
			video_id,
			link,
			published,
		})
	}
}

#[derive(Clone, Copy, Eq, PartialEq)]
enum TextField {
	FeedTitle,
	VideoId,
	Title,
	Author,
	Published,
}

/// Parses a YouTube Atom feed. Entries without a video ID or a readable publish time are skipped, and only the first
/// [MAX_FEED_ENTRIES] entries are kept.
pub fn parse_feed(xml: &str) -> miette::Result<Feed> {
	let mut reader = Reader::from_str(xml);
	reader.config_mut().trim_text(true);

	let mut feed = Feed::default();
	let mut entry: Option<PartialEntry> = None;
	let mut in_author = false;
	let mut field: Option<TextField> = None;

	loop {
		match reader.read_event().into_diagnostic()? {
			Event::Start(element) => match element.name().as_ref() {
				b"entry" => entry = Some(PartialEntry::default()),
				b"author" => in_author = true,
				b"yt:videoId" if entry.is_some() => field = Some(TextField::VideoId),
				b"title" if entry.is_some() => field = Some(TextField::Title),
				b"title" if feed.title.is_none() => field = Some(TextField::FeedTitle),
				b"name" if in_author && entry.is_some() => field = Some(TextField::Author),
				b"published" if entry.is_some() => field = Some(TextField::Published),
				_ => field = None,
			},
			Event::Empty(element) => {
				if element.name().as_ref() == b"link" {
					if let Some(entry) = entry.as_mut() {
						if entry.link.is_none() {
							if let Some(href) = element.try_get_attribute("href").into_diagnostic()? {
								entry.link = Some(href.unescape_value().into_diagnostic()?.into_owned());
							}
						}
					}
				}
			}
			Event::Text(text) => {
				let Some(current_field) = field else {
					continue;
				};
				let value = text.unescape().into_diagnostic()?.into_owned();
				match (current_field, entry.as_mut()) {
					(TextField::FeedTitle, _) => feed.title = Some(value),
					(TextField::VideoId, Some(entry)) => entry.video_id = Some(value),
					(TextField::Title, Some(entry)) => entry.title = Some(value),
					(TextField::Author, Some(entry)) => entry.author = Some(value),
					(TextField::Published, Some(entry)) => entry.published = Some(value),
					_ => (),
				}
			}
			Event::End(element) => {
				field = None;
				match element.name().as_ref() {
					b"author" => in_author = false,
					b"entry" => {
						if let Some(finished) = entry.take().and_then(PartialEntry::finish) {
							if feed.entries.len() < MAX_FEED_ENTRIES {
								feed.entries.push(finished);
							}
						}
					}
					_ => (),
				}
			}
			Event::Eof => break,
			_ => (),
		}
	}

	Ok(feed)
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum VideoAction {
	/// Recent enough to announce
	Notify,
	/// Too old to announce; recorded so it's never reconsidered
	LogOnly,
}

/// Decides what to do with each feed entry not yet logged for a guild. Entries already in `seen` produce nothing.
pub fn plan_feed<'a>(
	entries: &'a [FeedEntry],
	seen: &HashSet<String>,
	now: DateTime<Utc>,
	notify_window: TimeDelta,
) -> Vec<(&'a FeedEntry, VideoAction)> {
	let mut planned: HashSet<&str> = HashSet::new();
	entries
		.iter()
		.filter(|entry| !seen.contains(&entry.video_id))
		.filter(|entry| planned.insert(entry.video_id.as_str()))
		.map(|entry| {
			let action = if now - entry.published <= notify_window {
				VideoAction::Notify
			} else {
				VideoAction::LogOnly
			};
			(entry, action)
		})
		.collect()
}

/// Builds an upload announcement. Templates may use `{mention}`, `{channel}`, `{title}`, and `{url}`.
pub fn render_notification(template: Option<&str>, mention: &str, channel_name: &str, title: &str, url: &str) -> String {
	template
		.filter(|template| !template.trim().is_empty())
		.unwrap_or(DEFAULT_TEMPLATE)
		.replace("{mention}", mention)
		.replace("{channel}", channel_name)
		.replace("{title}", title)
		.replace("{url}", url)
}

pub fn validate_channel_id(channel_id: &str) -> Result<&str, ValidationError> {
	let channel_id = channel_id.trim();
	let well_formed = channel_id.len() == 24
		&& channel_id.starts_with("UC")
		&& channel_id
			.chars()
			.all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
	if well_formed {
		Ok(channel_id)
	} else {
		Err(ValidationError::InvalidYouTubeChannelId(channel_id.to_string()))
	}
}

pub fn validate_seed_count(count: i64) -> Result<usize, ValidationError> {
	if (1..=MAX_SEED_COUNT).contains(&count) {
		Ok(count as usize)
	} else {
		Err(ValidationError::InvalidSeedCount(count))
	}
}

/// What a user gave to identify a YouTube channel
#[derive(Debug, Eq, PartialEq)]
pub enum ChannelLookup {
	/// The channel ID was given directly or as part of a `/channel/` URL
	Known(String),
	/// A handle or custom URL; these pages need to be fetched to find the ID
	Pages(Vec<String>),
}

pub fn channel_lookup(input: &str) -> ChannelLookup {
	let input = input.trim();
	if let Ok(channel_id) = validate_channel_id(input) {
		return ChannelLookup::Known(channel_id.to_string());
	}
	if let Some((_, after)) = input.split_once("/channel/") {
		let channel_id = after.split(['/', '?']).next().unwrap_or_default();
		return ChannelLookup::Known(channel_id.to_string());
	}

	let search_term = input
		.trim_start_matches("https://")
		.trim_start_matches("http://")
		.trim_start_matches("www.")
		.trim_start_matches("youtube.com/")
		.trim_start_matches("c/")
		.trim_start_matches("user/")
		.trim_start_matches('@')
		.trim_end_matches('/');
	ChannelLookup::Pages(vec![
		format!("https://www.youtube.com/@{}", search_term),
		format!("https://www.youtube.com/c/{}", search_term),
		format!("https://www.youtube.com/user/{}", search_term),
	])
}

pub fn channel_id_from_page(html: &str) -> Option<String> {
	let pattern = Regex::new(r#""channelId":"(UC[A-Za-z0-9_-]{22})""#).ok()?;
	pattern
		.captures(html)
		.and_then(|captures| captures.get(1))
		.map(|channel_id| channel_id.as_str().to_string())
}

pub fn feed_url(feed_url_base: &str, yt_channel_id: &str) -> String {
	format!("{}?channel_id={}", feed_url_base, yt_channel_id)
}

pub async fn fetch_feed(ctx: &BotContext, yt_channel_id: &str) -> miette::Result<Feed> {
	let url = feed_url(&ctx.config.youtube.feed_url_base, yt_channel_id);
	let response = ctx.web_client.get(&url).send().await.into_diagnostic()?;
	let status = response.status();
	miette::ensure!(status.is_success(), "YouTube feed returned status {}", status);
	let body = response.text().await.into_diagnostic()?;
	parse_feed(&body)
}

/// Finds a channel ID from an ID, channel URL, handle, or custom URL. Returns `None` if nothing matched.
pub async fn find_channel_id(ctx: &BotContext, input: &str) -> miette::Result<Option<String>> {
	let pages = match channel_lookup(input) {
		ChannelLookup::Known(channel_id) => return Ok(validate_channel_id(&channel_id).ok().map(String::from)),
		ChannelLookup::Pages(pages) => pages,
	};

	for page in pages.iter() {
		let response = match ctx.web_client.get(page).send().await {
			Ok(response) if response.status().is_success() => response,
			Ok(_) => continue,
			Err(error) => {
				tracing::debug!(source = ?error, page = %page, "Couldn't fetch YouTube page");
				continue;
			}
		};
		let Ok(html) = response.text().await else {
			continue;
		};
		if let Some(channel_id) = channel_id_from_page(&html) {
			return Ok(Some(channel_id));
		}
	}
	Ok(None)
}

pub fn list_enabled_configs(db_connection: &mut PgConnection) -> QueryResult<Vec<YouTubeNotificationConfig>> {
	youtube_configs::table
		.filter(youtube_configs::enabled.eq(true))
		.load(db_connection)
}

pub fn list_guild_configs(
	db_connection: &mut PgConnection,
	guild_id: Id<GuildMarker>,
) -> QueryResult<Vec<YouTubeNotificationConfig>> {
	youtube_configs::table
		.filter(youtube_configs::guild_id.eq(database_id_from_discord_id(guild_id.get())))
		.order(youtube_configs::yt_channel_name.asc())
		.load(db_connection)
}

/// Saves a notification config, enabling it.
pub fn upsert_config(
	db_connection: &mut PgConnection,
	config: &YouTubeNotificationConfig,
) -> QueryResult<YouTubeNotificationConfig> {
	diesel::insert_into(youtube_configs::table)
		.values(config)
		.on_conflict((youtube_configs::guild_id, youtube_configs::yt_channel_id))
		.do_update()
		.set((
			youtube_configs::yt_channel_name.eq(excluded(youtube_configs::yt_channel_name)),
			youtube_configs::target_channel_id.eq(excluded(youtube_configs::target_channel_id)),
			youtube_configs::mention_role_id.eq(excluded(youtube_configs::mention_role_id)),
			youtube_configs::message_template.eq(excluded(youtube_configs::message_template)),
			youtube_configs::enabled.eq(true),
			youtube_configs::updated_at.eq(excluded(youtube_configs::updated_at)),
		))
		.get_result(db_connection)
}

pub fn disable_config(
	db_connection: &mut PgConnection,
	guild_id: Id<GuildMarker>,
	yt_channel_id: &str,
	now: DateTime<Utc>,
) -> QueryResult<bool> {
	let updated = diesel::update(youtube_configs::table)
		.filter(
			youtube_configs::guild_id
				.eq(database_id_from_discord_id(guild_id.get()))
				.and(youtube_configs::yt_channel_id.eq(yt_channel_id))
				.and(youtube_configs::enabled.eq(true)),
		)
		.set((youtube_configs::enabled.eq(false), youtube_configs::updated_at.eq(now)))
		.execute(db_connection)?;
	Ok(updated > 0)
}

pub fn delete_config(
	db_connection: &mut PgConnection,
	guild_id: Id<GuildMarker>,
	yt_channel_id: &str,
) -> QueryResult<bool> {
	let deleted = diesel::delete(youtube_configs::table)
		.filter(
			youtube_configs::guild_id
				.eq(database_id_from_discord_id(guild_id.get()))
				.and(youtube_configs::yt_channel_id.eq(yt_channel_id)),
		)
		.execute(db_connection)?;
	Ok(deleted > 0)
}

pub fn seen_video_ids(
	db_connection: &mut PgConnection,
	guild_id: Id<GuildMarker>,
	yt_channel_id: &str,
) -> QueryResult<HashSet<String>> {
	let video_ids: Vec<String> = youtube_notification_logs::table
		.filter(
			youtube_notification_logs::guild_id
				.eq(database_id_from_discord_id(guild_id.get()))
				.and(youtube_notification_logs::yt_channel_id.eq(yt_channel_id)),
		)
		.select(youtube_notification_logs::video_id)
		.load(db_connection)?;
	Ok(video_ids.into_iter().collect())
}

/// Logs a video for a guild unless it's already logged. Returns whether this call created the log entry.
pub fn claim_video(
	db_connection: &mut PgConnection,
	guild_id: Id<GuildMarker>,
	yt_channel_id: &str,
	video_id: &str,
	status: VideoStatus,
	now: DateTime<Utc>,
) -> QueryResult<bool> {
	let log = YouTubeNotificationLog {
		guild_id: database_id_from_discord_id(guild_id.get()),
		yt_channel_id: yt_channel_id.to_string(),
		video_id: video_id.to_string(),
		status,
		logged_at: now,
	};
	let inserted = diesel::insert_into(youtube_notification_logs::table)
		.values(&log)
		.on_conflict_do_nothing()
		.execute(db_connection)?;
	Ok(inserted > 0)
}

/// Marks videos as already seen. Returns how many weren't logged before.
pub fn seed_videos(
	db_connection: &mut PgConnection,
	guild_id: Id<GuildMarker>,
	yt_channel_id: &str,
	video_ids: &[&str],
	now: DateTime<Utc>,
) -> QueryResult<usize> {
	let logs: Vec<YouTubeNotificationLog> = video_ids
		.iter()
		.map(|video_id| YouTubeNotificationLog {
			guild_id: database_id_from_discord_id(guild_id.get()),
			yt_channel_id: yt_channel_id.to_string(),
			video_id: video_id.to_string(),
			status: VideoStatus::Seeded,
			logged_at: now,
		})
		.collect();
	diesel::insert_into(youtube_notification_logs::table)
		.values(&logs)
		.on_conflict_do_nothing()
		.execute(db_connection)
}

/// Where and how a guild wants a YouTube channel's uploads announced
pub struct NotificationSetup<'a> {
	pub guild_id: Id<GuildMarker>,
	pub yt_channel_id: &'a str,
	pub target_channel_id: Id<ChannelMarker>,
	pub mention_role_id: Option<Id<RoleMarker>>,
	pub message_template: Option<&'a str>,
}

/// Saves and enables a notification config, marking the feed's current entries as seen so only later uploads are
/// announced. Returns the saved config and the number of newly seeded videos.
pub fn save_setup(
	db_connection: &mut PgConnection,
	setup: &NotificationSetup<'_>,
	feed: &Feed,
	now: DateTime<Utc>,
) -> QueryResult<(YouTubeNotificationConfig, usize)> {
	let config = YouTubeNotificationConfig {
		guild_id: database_id_from_discord_id(setup.guild_id.get()),
		yt_channel_id: setup.yt_channel_id.to_string(),
		yt_channel_name: feed.title.clone().unwrap_or_else(|| setup.yt_channel_id.to_string()),
		target_channel_id: database_id_from_discord_id(setup.target_channel_id.get()),
		mention_role_id: setup.mention_role_id.map(|role_id| database_id_from_discord_id(role_id.get())),
		message_template: setup
			.message_template
			.map(str::trim)
			.filter(|template| !template.is_empty())
			.map(String::from),
		enabled: true,
		updated_at: now,
	};
	let video_ids: Vec<&str> = feed
		.entries
		.iter()
		.take(MAX_FEED_ENTRIES)
		.map(|entry| entry.video_id.as_str())
		.collect();
	db_connection.transaction(|db_connection| {
		let saved = upsert_config(db_connection, &config)?;
		let seeded = seed_videos(db_connection, setup.guild_id, setup.yt_channel_id, &video_ids, now)?;
		Ok((saved, seeded))
	})
}

/// Fetches a channel's feed and marks up to `max_videos` of its entries as seen for the guild.
pub async fn seed_feed(
	ctx: &BotContext,
	guild_id: Id<GuildMarker>,
	yt_channel_id: &str,
	max_videos: usize,
	now: DateTime<Utc>,
) -> miette::Result<(Feed, usize)> {
	let feed = fetch_feed(ctx, yt_channel_id).await?;
	let video_ids: Vec<&str> = feed
		.entries
		.iter()
		.take(max_videos)
		.map(|entry| entry.video_id.as_str())
		.collect();
	let mut db_connection = ctx.db_connection_pool.get().into_diagnostic()?;
	let seeded = seed_videos(&mut db_connection, guild_id, yt_channel_id, &video_ids, now).into_diagnostic()?;
	tracing::info!(guild = %guild_id, yt_channel_id, seeded, "Seeded YouTube feed");
	Ok((feed, seeded))
}

async fn send_notification(ctx: &BotContext, config: &YouTubeNotificationConfig, entry: &FeedEntry) {
	let mut allowed_mentions = AllowedMentions::default();
	let mention = match config.get_mention_role() {
		Some(role_id) => {
			allowed_mentions.roles.push(role_id);
			format!("<@&{}>", role_id)
		}
		None => {
			allowed_mentions.parse.push(MentionType::Everyone);
			String::from("@here")
		}
	};
	let channel_name = if entry.author.is_empty() {
		config.yt_channel_name.as_str()
	} else {
		entry.author.as_str()
	};
	let content = render_notification(
		config.message_template.as_deref(),
		&mention,
		channel_name,
		&entry.title,
		&entry.link,
	);

	let send_result = ctx
		.http_client
		.create_message(config.get_target_channel())
		.content(&content)
		.allowed_mentions(Some(&allowed_mentions))
		.await;
	match send_result {
		Ok(_) => tracing::info!(guild = %config.get_guild(), video = %entry.video_id, "Sent YouTube notification"),
		Err(error) => {
			report_discord_error(&error, "send YouTube notification");
		}
	}
}

async fn process_config(
	ctx: &BotContext,
	config: &YouTubeNotificationConfig,
	feed: &Feed,
	now: DateTime<Utc>,
) -> miette::Result<()> {
	let guild_id = config.get_guild();
	let seen = {
		let mut db_connection = ctx.db_connection_pool.get().into_diagnostic()?;
		seen_video_ids(&mut db_connection, guild_id, &config.yt_channel_id).into_diagnostic()?
	};

	for (entry, action) in plan_feed(&feed.entries, &seen, now, ctx.config.youtube.notify_window()) {
		let status = match action {
			VideoAction::Notify => VideoStatus::Notified,
			VideoAction::LogOnly => VideoStatus::None,
		};
		let claimed = {
			let mut db_connection = ctx.db_connection_pool.get().into_diagnostic()?;
			claim_video(&mut db_connection, guild_id, &config.yt_channel_id, &entry.video_id, status, now)
				.into_diagnostic()?
		};
		if !claimed || action == VideoAction::LogOnly {
			continue;
		}

		tracing::info!(guild = %guild_id, yt_channel_id = %config.yt_channel_id, video = %entry.video_id, "New upload detected");
		send_notification(ctx, config, entry).await;
		tokio::time::sleep(NOTIFICATION_SPACING).await;
	}
	Ok(())
}

/// Checks every enabled feed once, announcing recent uploads no guild has seen yet.
pub async fn poll_all_feeds(ctx: &BotContext, now: DateTime<Utc>) -> miette::Result<()> {
	let configs = {
		let mut db_connection = ctx.db_connection_pool.get().into_diagnostic()?;
		list_enabled_configs(&mut db_connection).into_diagnostic()?
	};
	if configs.is_empty() {
		return Ok(());
	}

	let mut feeds: HashMap<String, Option<Feed>> = HashMap::new();
	for config in configs.iter() {
		if ctx.cache.guild(config.get_guild()).is_none() {
			continue;
		}

		if !feeds.contains_key(&config.yt_channel_id) {
			let fetched = match fetch_feed(ctx, &config.yt_channel_id).await {
				Ok(feed) => Some(feed),
				Err(error) => {
					tracing::warn!(source = ?error, yt_channel_id = %config.yt_channel_id, "Failed to fetch YouTube feed");
					None
				}
			};
			feeds.insert(config.yt_channel_id.clone(), fetched);
		}
		let Some(Some(feed)) = feeds.get(&config.yt_channel_id) else {
			continue;
		};

		if let Err(error) = process_config(ctx, config, feed, now).await {
			tracing::error!(
				source = ?error,
				guild = %config.get_guild(),
				yt_channel_id = %config.yt_channel_id,
				"Failed to process YouTube notifications"
			);
		}
	}
	Ok(())
}

#[cfg(test)]
mod tests {
	use super::*;

	const SAMPLE_FEED: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<feed xmlns:yt="http://www.youtube.com/xml/schemas/2015" xmlns:media="http://search.yahoo.com/mrss/" xmlns="http://www.w3.org/2005/Atom">
 <link rel="self" href="http://www.youtube.com/feeds/videos.xml?channel_id=UCabcdefghijklmnopqrstuv"/>
 <id>yt:channel:abcdefghijklmnopqrstuv</id>
 <yt:channelId>abcdefghijklmnopqrstuv</yt:channelId>
 <title>Teyvat Travels</title>
 <author>
  <name>Teyvat Travels</name>
  <uri>https://www.youtube.com/channel/UCabcdefghijklmnopqrstuv</uri>
 </author>
 <published>2019-01-01T00:00:00+00:00</published>
 <entry>
  <id>yt:video:vid00000001</id>
  <yt:videoId>vid00000001</yt:videoId>
  <yt:channelId>UCabcdefghijklmnopqrstuv</yt:channelId>
  <title>Fishing &amp; Chill</title>
  <link rel="alternate" href="https://www.youtube.com/watch?v=vid00000001"/>
  <author>
   <name>Teyvat Travels</name>
   <uri>https://www.youtube.com/channel/UCabcdefghijklmnopqrstuv</uri>
  </author>
  <published>2025-05-01T11:30:00+00:00</published>
  <updated>2025-05-01T11:45:00+00:00</updated>
  <media:group>
   <media:title>Fishing &amp; Chill</media:title>
  </media:group>
 </entry>
 <entry>
  <id>yt:video:missing</id>
  <title>No ID here</title>
  <published>2025-04-30T08:00:00+00:00</published>
 </entry>
 <entry>
  <id>yt:video:vid00000002</id>
  <yt:videoId>vid00000002</yt:videoId>
  <title>Old Video</title>
  <link rel="alternate" href="https://www.youtube.com/watch?v=vid00000002"/>
  <author>
   <name>Teyvat Travels</name>
  </author>
  <published>2025-04-20T08:00:00+00:00</published>
 </entry>
</feed>"#;

	fn at(timestamp: &str) -> DateTime<Utc> {
		DateTime::parse_from_rfc3339(timestamp).unwrap().with_timezone(&Utc)
	}

	fn entry(video_id: &str, published: &str) -> FeedEntry {
		FeedEntry {
			video_id: video_id.to_string(),
			title: format!("Video {}", video_id),
			link: format!("https://www.youtube.com/watch?v={}", video_id),
			author: String::from("Channel"),
			published: at(published),
		}
	}

	#[test]
	fn parses_entries_and_skips_incomplete_ones() {
		let feed = parse_feed(SAMPLE_FEED).unwrap();
		assert_eq!(feed.title.as_deref(), Some("Teyvat Travels"));
		assert_eq!(feed.entries.len(), 2);

		let first = &feed.entries[0];
		assert_eq!(first.video_id, "vid00000001");
		assert_eq!(first.title, "Fishing & Chill");
		assert_eq!(first.link, "https://www.youtube.com/watch?v=vid00000001");
		assert_eq!(first.author, "Teyvat Travels");
		assert_eq!(first.published, at("2025-05-01T11:30:00Z"));

		assert_eq!(feed.entries[1].video_id, "vid00000002");
	}

	#[test]
	fn feed_is_capped() {
		let mut xml = String::from(r#"<feed xmlns:yt="http://www.youtube.com/xml/schemas/2015">"#);
		for index in 0..20 {
			xml.push_str(&format!(
				"<entry><yt:videoId>v{}</yt:videoId><published>2025-05-01T00:00:00+00:00</published></entry>",
				index
			));
		}
		xml.push_str("</feed>");
		let feed = parse_feed(&xml).unwrap();
		assert_eq!(feed.entries.len(), MAX_FEED_ENTRIES);
		assert_eq!(feed.entries[0].title, "Untitled");
		assert_eq!(feed.entries[0].link, "https://www.youtube.com/watch?v=v0");
	}

	#[test]
	fn malformed_feed_is_an_error() {
		assert!(parse_feed("<feed><entry></feed>").is_err());
	}

	#[test]
	fn plan_splits_by_age_and_skips_seen() {
		let now = at("2025-05-01T12:00:00Z");
		let entries = vec![
			entry("fresh", "2025-05-01T11:30:00Z"),
			entry("edge", "2025-05-01T11:00:00Z"),
			entry("stale", "2025-05-01T10:59:59Z"),
			entry("seen", "2025-05-01T11:59:00Z"),
		];
		let seen: HashSet<String> = [String::from("seen")].into_iter().collect();
		let plan: Vec<(&str, VideoAction)> = plan_feed(&entries, &seen, now, TimeDelta::minutes(60))
			.into_iter()
			.map(|(entry, action)| (entry.video_id.as_str(), action))
			.collect();
		assert_eq!(
			plan,
			vec![
				("fresh", VideoAction::Notify),
				("edge", VideoAction::Notify),
				("stale", VideoAction::LogOnly),
			]
		);
	}

	#[test]
	fn repeated_polls_notify_each_video_once() {
		let entries = vec![
			entry("a", "2025-05-01T11:50:00Z"),
			entry("b", "2025-05-01T11:55:00Z"),
			entry("a", "2025-05-01T11:50:00Z"),
		];
		let mut log: HashSet<String> = HashSet::new();
		let mut notifications = Vec::new();
		for cycle in 0..4 {
			let now = at("2025-05-01T12:00:00Z") + TimeDelta::minutes(15 * cycle);
			for (entry, action) in plan_feed(&entries, &log, now, TimeDelta::minutes(60)) {
				if log.insert(entry.video_id.clone()) && action == VideoAction::Notify {
					notifications.push(entry.video_id.clone());
				}
			}
		}
		assert_eq!(notifications, vec![String::from("a"), String::from("b")]);
	}

	#[test]
	fn notification_text() {
		assert_eq!(
			render_notification(None, "@here", "Teyvat Travels", "Fishing", "https://youtu.be/x"),
			"🔔 @here **Teyvat Travels** just uploaded a new video!\n\n**Fishing**\nhttps://youtu.be/x"
		);
		assert_eq!(
			render_notification(Some("{title} by {channel}: {url} {mention}"), "<@&5>", "TT", "Fishing", "u"),
			"Fishing by TT: u <@&5>"
		);
		assert_eq!(
			render_notification(Some("   "), "@here", "TT", "T", "u"),
			"🔔 @here **TT** just uploaded a new video!\n\n**T**\nu"
		);
	}

	#[test]
	fn channel_id_validation() {
		assert_eq!(
			validate_channel_id("UCabcdefghijklmnopqrstuv"),
			Ok("UCabcdefghijklmnopqrstuv")
		);
		assert!(validate_channel_id("UCshort").is_err());
		assert!(validate_channel_id("XXabcdefghijklmnopqrstuv").is_err());
		assert_eq!(validate_seed_count(50), Ok(50));
		assert_eq!(validate_seed_count(0), Err(ValidationError::InvalidSeedCount(0)));
		assert_eq!(validate_seed_count(201), Err(ValidationError::InvalidSeedCount(201)));
	}

	#[test]
	fn channel_lookup_forms() {
		assert_eq!(
			channel_lookup("UCabcdefghijklmnopqrstuv"),
			ChannelLookup::Known(String::from("UCabcdefghijklmnopqrstuv"))
		);
		assert_eq!(
			channel_lookup("https://www.youtube.com/channel/UCabcdefghijklmnopqrstuv/videos?view=0"),
			ChannelLookup::Known(String::from("UCabcdefghijklmnopqrstuv"))
		);
		assert_eq!(
			channel_lookup("https://www.youtube.com/@TeyvatTravels"),
			ChannelLookup::Pages(vec![
				String::from("https://www.youtube.com/@TeyvatTravels"),
				String::from("https://www.youtube.com/c/TeyvatTravels"),
				String::from("https://www.youtube.com/user/TeyvatTravels"),
			])
		);
	}

	#[test]
	fn channel_id_from_page_html() {
		let html = r#"<script>var data = {"header":{},"channelId":"UCabcdefghijklmnopqrstuv","title":"x"};</script>"#;
		assert_eq!(channel_id_from_page(html), Some(String::from("UCabcdefghijklmnopqrstuv")));
		assert_eq!(channel_id_from_page("<html></html>"), None);
	}
}
