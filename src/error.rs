// © 2024-2025 ElementalAlchemist and the Dainsleif Mains Development Team
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use crate::restrictions::ContentTypeFlags;
use miette::Diagnostic;
use std::error::Error;
use std::fmt;

/// Input rejected before anything is written. The display text is meant to be shown to the user who sent it.
#[derive(Debug, Diagnostic, Eq, PartialEq)]
pub enum ValidationError {
	ConflictingMasks(ContentTypeFlags),
	UnknownContentType(String),
	InvalidInterval(String),
	InvalidLevel(i64),
	InvalidAutoResetDays(i64),
	InvalidXpRate { setting: &'static str, value: i64 },
	UnknownTimezone(String),
	InvalidTime(String),
	InvalidYouTubeChannelId(String),
	InvalidSeedCount(i64),
	EmptyReminderMessage,
}

impl fmt::Display for ValidationError {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Self::ConflictingMasks(overlap) => write!(
				f,
				"A content type can't be both allowed and blocked ({}).",
				overlap.display_names()
			),
			Self::UnknownContentType(name) => write!(
				f,
				"`{}` isn't a content type. Use any of: {}.",
				name,
				ContentTypeFlags::all().display_names()
			),
			Self::InvalidInterval(interval) => write!(
				f,
				"`{}` isn't a valid interval. Use `once` or a number followed by `m`, `h`, or `d` (like `30m` or `2d`).",
				interval
			),
			Self::InvalidLevel(level) => write!(f, "Level {} is out of range; levels must be at least 1.", level),
			Self::InvalidAutoResetDays(days) => {
				write!(f, "{} days is out of range; choose between 1 and 365 days.", days)
			}
			Self::InvalidXpRate { setting, value } => {
				write!(f, "{} can't be set to {}; it must be zero or more.", setting, value)
			}
			Self::UnknownTimezone(timezone) => write!(
				f,
				"`{}` isn't a known time zone. Use an IANA name like `Asia/Kolkata`.",
				timezone
			),
			Self::InvalidTime(time) => write!(f, "`{}` isn't a valid time. Use `HH:MM` or `MM/DD HH:MM`.", time),
			Self::InvalidYouTubeChannelId(channel_id) => write!(
				f,
				"`{}` isn't a YouTube channel ID. Channel IDs start with `UC`.",
				channel_id
			),
			Self::InvalidSeedCount(count) => write!(f, "{} is out of range; choose between 1 and 200 videos.", count),
			Self::EmptyReminderMessage => write!(f, "The reminder message can't be empty."),
		}
	}
}

impl Error for ValidationError {}
