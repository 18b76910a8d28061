// © 2024-2025 ElementalAlchemist and the Dainsleif Mains Development Team
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

pub const DISCORD_USER: &str = "discord_user";
/// Guilds the logged-in user may manage through the dashboard, captured at login
pub const MANAGEABLE_GUILDS: &str = "manageable_guilds";
pub const AUTH_CALLBACK_PATH: &str = "auth_callback_uri";
pub const AUTH_CSRF_STATE: &str = "csrf_state";
pub const AUTH_CSRF_VERIFIER: &str = "csrf_verifier";
