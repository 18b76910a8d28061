// © 2024-2025 ElementalAlchemist and the Dainsleif Mains Development Team
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use twilight_http::error::{Error, ErrorType};
use twilight_http::response::StatusCode;

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum DiscordFailure {
	/// The bot lacks a permission it needs
	Forbidden,
	/// The target (message, channel, role, member) is already gone
	NotFound,
	Other,
}

pub fn classify_status(status: u16) -> DiscordFailure {
	if status == StatusCode::FORBIDDEN.get() {
		DiscordFailure::Forbidden
	} else if status == StatusCode::NOT_FOUND.get() {
		DiscordFailure::NotFound
	} else {
		DiscordFailure::Other
	}
}

pub fn classify_error(error: &Error) -> DiscordFailure {
	match error.kind() {
		ErrorType::Response { status, .. } => classify_status(status.get()),
		_ => DiscordFailure::Other,
	}
}

/// Logs a failed Discord request at a level matching its cause. Requests against something that no longer exists
/// aren't logged at all. Returns the classification so callers can count failures.
pub fn report_discord_error(error: &Error, action: &str) -> DiscordFailure {
	let failure = classify_error(error);
	match failure {
		DiscordFailure::Forbidden => tracing::warn!(action, "Missing Discord permissions"),
		DiscordFailure::NotFound => (),
		DiscordFailure::Other => tracing::error!(source = ?error, action, "Discord request failed"),
	}
	failure
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn statuses_map_to_failure_kinds() {
		assert_eq!(classify_status(403), DiscordFailure::Forbidden);
		assert_eq!(classify_status(404), DiscordFailure::NotFound);
		assert_eq!(classify_status(500), DiscordFailure::Other);
		assert_eq!(classify_status(429), DiscordFailure::Other);
	}
}
