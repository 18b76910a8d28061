// © 2024-2025 ElementalAlchemist and the Dainsleif Mains Development Team
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use kdl::{KdlDocument, KdlValue};
use miette::{IntoDiagnostic, bail, miette};
use std::time::Duration;
use tokio::fs::read_to_string;
use twilight_model::id::Id;
use twilight_model::id::marker::UserMarker;

pub const DEFAULT_CONFIG_PATH: &str = "config.kdl";
pub const DEFAULT_FEED_URL_BASE: &str = "https://www.youtube.com/feeds/videos.xml";

pub async fn parse_config(config_path: &str) -> miette::Result<ConfigData> {
	let config_file_contents = read_to_string(config_path).await.into_diagnostic()?;
	parse_config_str(&config_file_contents)
}

pub fn parse_config_str(config_file_contents: &str) -> miette::Result<ConfigData> {
	let document: KdlDocument = config_file_contents.parse()?;

	let discord = section(&document, "discord")?;
	let database = section(&document, "database")?;
	let web = section(&document, "web")?;
	let youtube = document.get("youtube").and_then(|node| node.children());

	let owners = discord
		.nodes()
		.iter()
		.filter(|node| node.name().value() == "owner")
		.flat_map(|node| node.entries().iter().filter(|entry| entry.name().is_none()))
		.map(|entry| {
			entry
				.value()
				.as_integer()
				.and_then(|id| u64::try_from(id).ok())
				.and_then(Id::new_checked)
				.ok_or_else(|| miette!("discord.owner entries must be Discord user IDs"))
		})
		.collect::<miette::Result<Vec<Id<UserMarker>>>>()?;

	let discord = DiscordConfig {
		bot_token: required_string(discord, "discord", "bot_token")?,
		client_id: required_string(discord, "discord", "client_id")?,
		client_secret: required_string(discord, "discord", "client_secret")?,
		owners,
	};

	let database = DatabaseConfig {
		host: required_string(database, "database", "host")?,
		port: optional_integer(database, "database", "port")?,
		username: required_string(database, "database", "username")?,
		password: required_string(database, "database", "password")?,
		database: required_string(database, "database", "database")?,
		max_connections: optional_integer(database, "database", "max_connections")?.unwrap_or(20),
		min_idle: optional_integer(database, "database", "min_idle")?.unwrap_or(2),
	};

	let web = WebConfig {
		bind_addr: required_string(web, "web", "bind_addr")?,
		base_url: required_string(web, "web", "base_url")?.trim_end_matches('/').to_string(),
	};

	let youtube = match youtube {
		Some(youtube) => YouTubeConfig {
			notify_window_minutes: optional_integer(youtube, "youtube", "notify_window_minutes")?.unwrap_or(60),
			request_timeout_seconds: optional_integer(youtube, "youtube", "request_timeout_seconds")?.unwrap_or(10),
			feed_url_base: youtube
				.get_arg("feed_url_base")
				.and_then(KdlValue::as_string)
				.unwrap_or(DEFAULT_FEED_URL_BASE)
				.to_string(),
		},
		None => YouTubeConfig::default(),
	};

	if database.min_idle > database.max_connections {
		bail!("database.min_idle cannot be larger than database.max_connections");
	}

	Ok(ConfigData {
		discord,
		database,
		web,
		youtube,
	})
}

fn section<'a>(document: &'a KdlDocument, name: &str) -> miette::Result<&'a KdlDocument> {
	match document.get(name).and_then(|node| node.children()) {
		Some(children) => Ok(children),
		None => bail!("Configuration is missing the `{}` block", name),
	}
}

fn required_string(block: &KdlDocument, block_name: &str, key: &str) -> miette::Result<String> {
	match block.get_arg(key).and_then(KdlValue::as_string) {
		Some(value) => Ok(value.to_string()),
		None => bail!("Configuration value `{}.{}` must be set to a string", block_name, key),
	}
}

fn optional_integer<T: TryFrom<i128>>(block: &KdlDocument, block_name: &str, key: &str) -> miette::Result<Option<T>> {
	let Some(value) = block.get_arg(key) else {
		return Ok(None);
	};
	let Some(value) = value.as_integer() else {
		bail!("Configuration value `{}.{}` must be an integer", block_name, key);
	};
	match T::try_from(value) {
		Ok(value) => Ok(Some(value)),
		Err(_) => bail!("Configuration value `{}.{}` is out of range", block_name, key),
	}
}

#[derive(Debug)]
pub struct ConfigData {
	pub discord: DiscordConfig,
	pub database: DatabaseConfig,
	pub web: WebConfig,
	pub youtube: YouTubeConfig,
}

#[derive(Debug)]
pub struct DiscordConfig {
	pub bot_token: String,
	pub client_id: String,
	pub client_secret: String,
	/// Users allowed to run the bot-owner commands
	pub owners: Vec<Id<UserMarker>>,
}

#[derive(Debug)]
pub struct DatabaseConfig {
	pub host: String,
	pub port: Option<u16>,
	pub username: String,
	pub password: String,
	pub database: String,
	pub max_connections: u32,
	pub min_idle: u32,
}

#[derive(Debug)]
pub struct WebConfig {
	pub bind_addr: String,
	/// The externally-visible URL of the dashboard, without a trailing slash
	pub base_url: String,
}

#[derive(Debug)]
pub struct YouTubeConfig {
	/// Uploads newer than this are announced; older unseen uploads are only logged
	pub notify_window_minutes: i64,
	pub request_timeout_seconds: u64,
	pub feed_url_base: String,
}

impl YouTubeConfig {
	pub fn request_timeout(&self) -> Duration {
		Duration::from_secs(self.request_timeout_seconds)
	}

	pub fn notify_window(&self) -> chrono::Duration {
		chrono::Duration::minutes(self.notify_window_minutes)
	}
}

impl Default for YouTubeConfig {
	fn default() -> Self {
		Self {
			notify_window_minutes: 60,
			request_timeout_seconds: 10,
			feed_url_base: DEFAULT_FEED_URL_BASE.to_string(),
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	const MINIMAL: &str = r#"
discord {
	bot_token "token"
	client_id "123"
	client_secret "secret"
	owner 80351110224678912
}
database {
	host "localhost"
	username "steward"
	password "hunter2"
	database "steward"
}
web {
	bind_addr "127.0.0.1:5000"
	base_url "https://steward.example/"
}
"#;

	#[test]
	fn minimal_config_uses_defaults() {
		let config = parse_config_str(MINIMAL).unwrap();
		assert_eq!(config.discord.owners, vec![Id::new(80351110224678912)]);
		assert_eq!(config.database.port, None);
		assert_eq!(config.database.max_connections, 20);
		assert_eq!(config.database.min_idle, 2);
		assert_eq!(config.web.base_url, "https://steward.example");
		assert_eq!(config.youtube.notify_window_minutes, 60);
		assert_eq!(config.youtube.request_timeout(), Duration::from_secs(10));
	}

	#[test]
	fn youtube_block_overrides_defaults() {
		let config = format!(
			"{}\nyoutube {{\n\tnotify_window_minutes 30\n\trequest_timeout_seconds 5\n}}\n",
			MINIMAL
		);
		let config = parse_config_str(&config).unwrap();
		assert_eq!(config.youtube.notify_window(), chrono::Duration::minutes(30));
		assert_eq!(config.youtube.request_timeout_seconds, 5);
		assert_eq!(config.youtube.feed_url_base, DEFAULT_FEED_URL_BASE);
	}

	#[test]
	fn owners_can_share_a_node_or_repeat_it() {
		let config = MINIMAL.replace(
			"owner 80351110224678912",
			"owner 80351110224678912 153928348301361153\n\towner 219846584815026177",
		);
		let config = parse_config_str(&config).unwrap();
		assert_eq!(
			config.discord.owners,
			vec![
				Id::new(80351110224678912),
				Id::new(153928348301361153),
				Id::new(219846584815026177)
			]
		);
	}

	#[test]
	fn owner_ids_must_be_positive_integers() {
		let config = MINIMAL.replace("owner 80351110224678912", "owner \"someone\"");
		assert!(parse_config_str(&config).is_err());
		let config = MINIMAL.replace("owner 80351110224678912", "owner 0");
		assert!(parse_config_str(&config).is_err());
	}

	#[test]
	fn missing_block_is_an_error() {
		let config = MINIMAL.replace("web {", "website {");
		assert!(parse_config_str(&config).is_err());
	}

	#[test]
	fn pool_bounds_are_checked() {
		let config = MINIMAL.replace("database \"steward\"", "database \"steward\"\n\tmax_connections 1\n\tmin_idle 4");
		assert!(parse_config_str(&config).is_err());
	}
}
