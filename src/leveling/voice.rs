// © 2024-2025 ElementalAlchemist and the Dainsleif Mains Development Team
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use twilight_model::id::Id;
use twilight_model::id::marker::ChannelMarker;

/// The parts of a voice state that decide whether a member is earning voice XP.
#[derive(Clone, Copy, Debug, Default)]
pub struct VoicePresence {
	pub channel_id: Option<Id<ChannelMarker>>,
	pub self_deaf: bool,
}

impl VoicePresence {
	/// Connected to a channel other than the guild's AFK channel, and not deafened
	pub fn is_active(&self, afk_channel_id: Option<Id<ChannelMarker>>) -> bool {
		match self.channel_id {
			Some(channel_id) => Some(channel_id) != afk_channel_id && !self.self_deaf,
			None => false,
		}
	}
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum VoiceTransition {
	SessionStarted,
	SessionEnded,
	Unchanged,
}

pub fn voice_transition(was_active: bool, is_active: bool) -> VoiceTransition {
	match (was_active, is_active) {
		(false, true) => VoiceTransition::SessionStarted,
		(true, false) => VoiceTransition::SessionEnded,
		_ => VoiceTransition::Unchanged,
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn afk_and_deafened_members_are_inactive() {
		let afk = Some(Id::new(9));
		let talking = VoicePresence {
			channel_id: Some(Id::new(1)),
			self_deaf: false,
		};
		assert!(talking.is_active(afk));
		assert!(talking.is_active(None));

		let in_afk = VoicePresence {
			channel_id: afk,
			self_deaf: false,
		};
		assert!(!in_afk.is_active(afk));

		let deafened = VoicePresence {
			channel_id: Some(Id::new(1)),
			self_deaf: true,
		};
		assert!(!deafened.is_active(afk));
		assert!(!VoicePresence::default().is_active(afk));
	}

	#[test]
	fn transitions() {
		assert_eq!(voice_transition(false, true), VoiceTransition::SessionStarted);
		assert_eq!(voice_transition(true, false), VoiceTransition::SessionEnded);
		assert_eq!(voice_transition(true, true), VoiceTransition::Unchanged);
		assert_eq!(voice_transition(false, false), VoiceTransition::Unchanged);
	}
}
