// © 2024-2025 ElementalAlchemist and the Dainsleif Mains Development Team
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use crate::error::ValidationError;
use crate::model::{LevelSettings, UserLevel};
use chrono::Duration;
use serde::{Deserialize, Serialize};

pub const XP_PER_LEVEL: u64 = 1000;

pub fn level_for_xp(xp: u64) -> u32 {
	u32::try_from(xp / XP_PER_LEVEL).unwrap_or(u32::MAX)
}

/// XP rates for a guild
#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct GuildLevelSettings {
	pub xp_per_message: u32,
	pub xp_per_image: u32,
	pub xp_per_minute_in_voice: u32,
	pub voice_xp_limit: u64,
}

impl Default for GuildLevelSettings {
	fn default() -> Self {
		Self {
			xp_per_message: 5,
			xp_per_image: 10,
			xp_per_minute_in_voice: 15,
			voice_xp_limit: 1500,
		}
	}
}

impl GuildLevelSettings {
	/// Builds settings from user input, rejecting negative values.
	pub fn from_input(
		xp_per_message: i64,
		xp_per_image: i64,
		xp_per_minute_in_voice: i64,
		voice_xp_limit: i64,
	) -> Result<Self, ValidationError> {
		fn rate(setting: &'static str, value: i64) -> Result<u32, ValidationError> {
			u32::try_from(value)
				.ok()
				.filter(|value| i32::try_from(*value).is_ok())
				.ok_or(ValidationError::InvalidXpRate { setting, value })
		}
		let voice_xp_limit = u64::try_from(voice_xp_limit).map_err(|_| ValidationError::InvalidXpRate {
			setting: "voice_xp_limit",
			value: voice_xp_limit,
		})?;
		Ok(Self {
			xp_per_message: rate("xp_per_message", xp_per_message)?,
			xp_per_image: rate("xp_per_image", xp_per_image)?,
			xp_per_minute_in_voice: rate("xp_per_minute_in_voice", xp_per_minute_in_voice)?,
			voice_xp_limit,
		})
	}

	/// XP granted for one message
	pub fn message_xp(&self, has_image: bool) -> u64 {
		if has_image {
			u64::from(self.xp_per_image)
		} else {
			u64::from(self.xp_per_message)
		}
	}

	/// XP granted for a voice session of the given length, given how much voice XP the user has already earned this
	/// period. The grant is clamped to the room left under the limit.
	pub fn voice_xp(&self, elapsed: Duration, already_earned: u64) -> u64 {
		if already_earned >= self.voice_xp_limit {
			return 0;
		}
		let elapsed_ms = elapsed.num_milliseconds();
		if elapsed_ms <= 0 {
			return 0;
		}
		let earned = (elapsed_ms as u128 * u128::from(self.xp_per_minute_in_voice)) / 60_000;
		let earned = u64::try_from(earned).unwrap_or(u64::MAX);
		earned.min(self.voice_xp_limit - already_earned)
	}

	pub fn to_record(self, guild_id: i64) -> LevelSettings {
		LevelSettings {
			guild_id,
			xp_per_message: self.xp_per_message as i32,
			xp_per_image: self.xp_per_image as i32,
			xp_per_minute_in_voice: self.xp_per_minute_in_voice as i32,
			voice_xp_limit: self.voice_xp_limit as i64,
		}
	}
}

impl From<&LevelSettings> for GuildLevelSettings {
	fn from(record: &LevelSettings) -> Self {
		Self {
			xp_per_message: record.xp_per_message.max(0) as u32,
			xp_per_image: record.xp_per_image.max(0) as u32,
			xp_per_minute_in_voice: record.xp_per_minute_in_voice.max(0) as u32,
			voice_xp_limit: record.voice_xp_limit.max(0) as u64,
		}
	}
}

/// A user's standing in a guild. The level is always derived from the XP total.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Serialize)]
pub struct UserLevelState {
	xp: u64,
	voice_xp_earned: u64,
}

impl UserLevelState {
	pub fn new(xp: u64, voice_xp_earned: u64) -> Self {
		Self { xp, voice_xp_earned }
	}

	pub fn xp(&self) -> u64 {
		self.xp
	}

	pub fn level(&self) -> u32 {
		level_for_xp(self.xp)
	}

	pub fn voice_xp_earned(&self) -> u64 {
		self.voice_xp_earned
	}

	/// Applies an XP gain. `voice_xp` is the part of `xp` that came from voice.
	pub fn gain(&self, xp: u64, voice_xp: u64) -> LevelChange {
		let after = Self {
			xp: self.xp.saturating_add(xp),
			voice_xp_earned: self.voice_xp_earned.saturating_add(voice_xp),
		};
		LevelChange { before: *self, after }
	}
}

impl From<&UserLevel> for UserLevelState {
	fn from(record: &UserLevel) -> Self {
		Self {
			xp: record.xp.max(0) as u64,
			voice_xp_earned: record.voice_xp_earned.max(0) as u64,
		}
	}
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct LevelChange {
	pub before: UserLevelState,
	pub after: UserLevelState,
}

impl LevelChange {
	/// The new level, if the change crossed into a higher one
	pub fn level_up(&self) -> Option<u32> {
		let new_level = self.after.level();
		(new_level > self.before.level()).then_some(new_level)
	}
}

/// Whether a level-up should be announced given the last level announced for the user.
pub fn should_announce(new_level: u32, last_notified: u32) -> bool {
	new_level > last_notified
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn level_is_floor_of_xp() {
		assert_eq!(level_for_xp(0), 0);
		assert_eq!(level_for_xp(999), 0);
		assert_eq!(level_for_xp(1000), 1);
		assert_eq!(level_for_xp(25_999), 25);
	}

	#[test]
	fn message_crossing_a_level_boundary() {
		let settings = GuildLevelSettings::default();
		let state = UserLevelState::new(998, 0);
		let change = state.gain(settings.message_xp(false), 0);
		assert_eq!(change.after.xp(), 1003);
		assert_eq!(change.after.level(), 1);
		assert_eq!(change.level_up(), Some(1));

		let next = change.after.gain(settings.message_xp(false), 0);
		assert_eq!(next.level_up(), None);
	}

	#[test]
	fn image_messages_use_image_rate() {
		let settings = GuildLevelSettings::default();
		assert_eq!(settings.message_xp(true), 10);
		assert_eq!(settings.message_xp(false), 5);
	}

	#[test]
	fn level_tracks_xp_after_every_gain() {
		let mut state = UserLevelState::default();
		for gain in [5, 10, 999, 1, 2500, 7, 12_345] {
			state = state.gain(gain, 0).after;
			assert_eq!(u64::from(state.level()), state.xp() / XP_PER_LEVEL);
		}
	}

	#[test]
	fn voice_xp_counts_whole_minutes_worth() {
		let settings = GuildLevelSettings::default();
		assert_eq!(settings.voice_xp(Duration::seconds(90), 0), 22);
		assert_eq!(settings.voice_xp(Duration::seconds(3), 0), 0);
		assert_eq!(settings.voice_xp(Duration::seconds(-30), 0), 0);
	}

	#[test]
	fn voice_xp_is_clamped_to_remaining_room() {
		let settings = GuildLevelSettings::default();
		assert_eq!(settings.voice_xp(Duration::hours(3), 1400), 100);
		assert_eq!(settings.voice_xp(Duration::hours(3), 1500), 0);
		assert_eq!(settings.voice_xp(Duration::hours(3), 2000), 0);
	}

	#[test]
	fn repeated_voice_sessions_never_pass_the_limit() {
		let settings = GuildLevelSettings::default();
		let mut state = UserLevelState::default();
		for minutes in [10, 45, 30, 120, 5, 600] {
			let earned = settings.voice_xp(Duration::minutes(minutes), state.voice_xp_earned());
			state = state.gain(earned, earned).after;
			assert!(state.voice_xp_earned() <= settings.voice_xp_limit);
		}
		assert_eq!(state.voice_xp_earned(), settings.voice_xp_limit);
	}

	#[test]
	fn announcement_guard() {
		assert!(should_announce(3, 2));
		assert!(!should_announce(3, 3));
		assert!(!should_announce(2, 5));
	}

	#[test]
	fn settings_input_rejects_negative_values() {
		assert_eq!(
			GuildLevelSettings::from_input(5, -1, 15, 1500),
			Err(ValidationError::InvalidXpRate {
				setting: "xp_per_image",
				value: -1
			})
		);
		let settings = GuildLevelSettings::from_input(1, 2, 3, 0).unwrap();
		assert_eq!(settings.voice_xp(Duration::hours(1), 0), 0);
	}
}
