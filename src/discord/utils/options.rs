// © 2024-2025 ElementalAlchemist and the Dainsleif Mains Development Team
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use twilight_model::application::interaction::application_command::{CommandDataOption, CommandOptionValue};
use twilight_model::id::Id;
use twilight_model::id::marker::{ChannelMarker, RoleMarker, UserMarker};

fn find<'a>(options: &'a [CommandDataOption], name: &str) -> Option<&'a CommandOptionValue> {
	options
		.iter()
		.find(|option| option.name == name)
		.map(|option| &option.value)
}

pub fn string_option<'a>(options: &'a [CommandDataOption], name: &str) -> Option<&'a str> {
	match find(options, name) {
		Some(CommandOptionValue::String(value)) => Some(value.as_str()),
		_ => None,
	}
}

pub fn integer_option(options: &[CommandDataOption], name: &str) -> Option<i64> {
	match find(options, name) {
		Some(CommandOptionValue::Integer(value)) => Some(*value),
		_ => None,
	}
}

pub fn channel_option(options: &[CommandDataOption], name: &str) -> Option<Id<ChannelMarker>> {
	match find(options, name) {
		Some(CommandOptionValue::Channel(value)) => Some(*value),
		_ => None,
	}
}

pub fn role_option(options: &[CommandDataOption], name: &str) -> Option<Id<RoleMarker>> {
	match find(options, name) {
		Some(CommandOptionValue::Role(value)) => Some(*value),
		_ => None,
	}
}

pub fn user_option(options: &[CommandDataOption], name: &str) -> Option<Id<UserMarker>> {
	match find(options, name) {
		Some(CommandOptionValue::User(value)) => Some(*value),
		_ => None,
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	fn option(name: &str, value: CommandOptionValue) -> CommandDataOption {
		CommandDataOption {
			name: name.to_string(),
			value,
		}
	}

	#[test]
	fn options_are_found_by_name_and_type() {
		let options = vec![
			option("message", CommandOptionValue::String(String::from("hello"))),
			option("level", CommandOptionValue::Integer(5)),
			option("channel", CommandOptionValue::Channel(Id::new(10))),
			option("role", CommandOptionValue::Role(Id::new(11))),
		];
		assert_eq!(string_option(&options, "message"), Some("hello"));
		assert_eq!(integer_option(&options, "level"), Some(5));
		assert_eq!(channel_option(&options, "channel"), Some(Id::new(10)));
		assert_eq!(role_option(&options, "role"), Some(Id::new(11)));
		assert_eq!(string_option(&options, "level"), None);
		assert_eq!(user_option(&options, "user"), None);
	}
}
