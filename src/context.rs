// © 2024-2025 ElementalAlchemist and the Dainsleif Mains Development Team
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use crate::cache::{Cooldowns, TtlCache};
use crate::config::ConfigData;
use crate::database::DbPool;
use crate::leveling::{GuildLevelSettings, UserLevelState};
use crate::restrictions::ContentClassifier;
use chrono::{DateTime, Utc};
use miette::IntoDiagnostic;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use twilight_cache_inmemory::{DefaultInMemoryCache, ResourceType};
use twilight_http::client::Client;
use twilight_model::id::Id;
use twilight_model::id::marker::{ApplicationMarker, GuildMarker, UserMarker};

pub const SETTINGS_CACHE_TTL: Duration = Duration::from_secs(5 * 60);
pub const MESSAGE_XP_COOLDOWN: Duration = Duration::from_secs(60);

pub type MemberKey = (Id<GuildMarker>, Id<UserMarker>);

/// Everything the bot's event handlers, scheduled tasks, and web API share.
pub struct BotContext {
	pub config: Arc<ConfigData>,
	pub http_client: Arc<Client>,
	pub application_id: Id<ApplicationMarker>,
	pub cache: DefaultInMemoryCache,
	pub db_connection_pool: DbPool,
	pub web_client: reqwest::Client,
	pub classifier: ContentClassifier,
	pub level_settings: Mutex<TtlCache<Id<GuildMarker>, GuildLevelSettings>>,
	/// Last known XP state per member. Entries are replaced on every write and dropped on reset.
	pub user_levels: Mutex<HashMap<MemberKey, UserLevelState>>,
	pub message_cooldowns: Cooldowns<MemberKey>,
	/// Start of each member's current qualifying voice session
	pub voice_sessions: Mutex<HashMap<MemberKey, DateTime<Utc>>>,
}

impl BotContext {
	pub async fn new(config: Arc<ConfigData>, db_connection_pool: DbPool) -> miette::Result<Self> {
		let http_client = Arc::new(Client::new(config.discord.bot_token.clone()));
		let application_id = {
			let application_response = http_client.current_user_application().await.into_diagnostic()?;
			application_response.model().await.into_diagnostic()?.id
		};

		let cache = DefaultInMemoryCache::builder()
			.resource_types(
				ResourceType::GUILD
					| ResourceType::CHANNEL
					| ResourceType::ROLE
					| ResourceType::MEMBER
					| ResourceType::USER
					| ResourceType::VOICE_STATE
					| ResourceType::USER_CURRENT,
			)
			.build();

		let web_client = reqwest::Client::builder()
			.timeout(config.youtube.request_timeout())
			.build()
			.into_diagnostic()?;

		let classifier = ContentClassifier::new().into_diagnostic()?;

		Ok(Self {
			config,
			http_client,
			application_id,
			cache,
			db_connection_pool,
			web_client,
			classifier,
			level_settings: Mutex::new(TtlCache::new(SETTINGS_CACHE_TTL)),
			user_levels: Mutex::new(HashMap::new()),
			message_cooldowns: Cooldowns::new(MESSAGE_XP_COOLDOWN),
			voice_sessions: Mutex::new(HashMap::new()),
		})
	}

	pub fn is_bot_owner(&self, user_id: Id<UserMarker>) -> bool {
		self.config.discord.owners.contains(&user_id)
	}
}
