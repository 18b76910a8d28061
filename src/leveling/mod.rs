// © 2024-2025 ElementalAlchemist and the Dainsleif Mains Development Team
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

pub mod engine;
mod rewards;
mod state;
pub mod store;
mod voice;

pub use rewards::{RewardTable, RoleDelta, compute_role_delta};
pub use state::{GuildLevelSettings, LevelChange, UserLevelState, XP_PER_LEVEL, level_for_xp, should_announce};
pub use voice::{VoicePresence, VoiceTransition, voice_transition};
