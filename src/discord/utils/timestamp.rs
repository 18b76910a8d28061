// © 2024-2025 ElementalAlchemist and the Dainsleif Mains Development Team
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use chrono::{DateTime, Utc};
use twilight_mention::fmt::Mention;
use twilight_mention::timestamp::{Timestamp, TimestampStyle};

/// Formats a time so Discord shows it in each reader's own time zone.
pub fn timestamp_mention(datetime: DateTime<Utc>, style: TimestampStyle) -> String {
	let unix_seconds = u64::try_from(datetime.timestamp()).unwrap_or_default();
	Timestamp::new(unix_seconds, Some(style)).mention().to_string()
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn formats_discord_timestamps() {
		let datetime = DateTime::parse_from_rfc3339("2023-11-14T22:13:20Z")
			.unwrap()
			.with_timezone(&Utc);
		assert_eq!(timestamp_mention(datetime, TimestampStyle::RelativeTime), "<t:1700000000:R>");
		assert_eq!(timestamp_mention(datetime, TimestampStyle::LongDateTime), "<t:1700000000:F>");
	}
}
