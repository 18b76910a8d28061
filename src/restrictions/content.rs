// © 2024-2025 ElementalAlchemist and the Dainsleif Mains Development Team
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use crate::error::ValidationError;
use bitflags::bitflags;
use regex::Regex;
use twilight_model::channel::Message;

bitflags! {
	/// Kinds of content a message can carry. A message may carry several at once.
	#[derive(Clone, Copy, Debug, Default, Eq, Hash, PartialEq)]
	pub struct ContentTypeFlags: u32 {
		const PLAIN_TEXT = 1;
		const DISCORD_INVITE = 1 << 1;
		const IMAGE_LINK = 1 << 2;
		const REGULAR_LINK = 1 << 3;
		const IMAGE_ATTACHMENT = 1 << 4;
		const FILE_ATTACHMENT = 1 << 5;
		const EMBED = 1 << 6;
	}
}

/// (flag, name used in commands and the dashboard, name shown to users)
const CONTENT_TYPE_NAMES: [(ContentTypeFlags, &str, &str); 7] = [
	(ContentTypeFlags::PLAIN_TEXT, "plain_text", "plain text"),
	(ContentTypeFlags::DISCORD_INVITE, "discord_invites", "discord invites"),
	(ContentTypeFlags::IMAGE_LINK, "image_links", "image links"),
	(ContentTypeFlags::REGULAR_LINK, "regular_links", "regular links"),
	(ContentTypeFlags::IMAGE_ATTACHMENT, "image_attachments", "image attachments"),
	(ContentTypeFlags::FILE_ATTACHMENT, "file_attachments", "file attachments"),
	(ContentTypeFlags::EMBED, "embeds", "embeds"),
];

impl ContentTypeFlags {
	/// Reads a mask as stored in the database. Unknown bits are dropped.
	pub fn from_mask(mask: i32) -> Self {
		Self::from_bits_truncate(mask as u32)
	}

	pub fn to_mask(self) -> i32 {
		self.bits() as i32
	}

	/// A comma-separated list of the human-readable names of every set flag, or `nothing` if none are set.
	pub fn display_names(self) -> String {
		let names: Vec<&str> = CONTENT_TYPE_NAMES
			.iter()
			.filter(|(flag, _, _)| self.contains(*flag))
			.map(|(_, _, display_name)| *display_name)
			.collect();
		if names.is_empty() {
			String::from("nothing")
		} else {
			names.join(", ")
		}
	}

	pub fn key_names(self) -> Vec<&'static str> {
		CONTENT_TYPE_NAMES
			.iter()
			.filter(|(flag, _, _)| self.contains(*flag))
			.map(|(_, key, _)| *key)
			.collect()
	}

	/// Parses content type keys (`image_links` or `image-links`, any case) separated by commas or spaces. An empty
	/// list is an empty set.
	pub fn parse_list(list: &str) -> Result<Self, ValidationError> {
		let mut flags = Self::empty();
		for name in list.split(|c: char| c == ',' || c.is_whitespace()) {
			if name.is_empty() {
				continue;
			}
			let key = name.to_lowercase().replace('-', "_");
			let Some((flag, _, _)) = CONTENT_TYPE_NAMES.iter().find(|(_, known, _)| *known == key) else {
				return Err(ValidationError::UnknownContentType(name.to_string()));
			};
			flags |= *flag;
		}
		Ok(flags)
	}
}

/// The observable parts of a message, independent of where the message came from.
#[derive(Debug, Default)]
pub struct MessageContent<'a> {
	pub text: &'a str,
	/// MIME type of each attachment, if Discord reported one
	pub attachment_content_types: Vec<Option<&'a str>>,
	pub embed_count: usize,
}

impl<'a> MessageContent<'a> {
	pub fn from_message(message: &'a Message) -> Self {
		Self {
			text: &message.content,
			attachment_content_types: message
				.attachments
				.iter()
				.map(|attachment| attachment.content_type.as_deref())
				.collect(),
			embed_count: message.embeds.len(),
		}
	}

	pub fn has_image_attachment(&self) -> bool {
		self.attachment_content_types
			.iter()
			.any(|content_type| is_image_type(*content_type))
	}
}

fn is_image_type(content_type: Option<&str>) -> bool {
	content_type.is_some_and(|content_type| content_type.starts_with("image/"))
}

/// Detects which kinds of content a message carries.
#[derive(Debug)]
pub struct ContentClassifier {
	url_pattern: Regex,
	invite_pattern: Regex,
	image_url_pattern: Regex,
}

impl ContentClassifier {
	pub fn new() -> Result<Self, regex::Error> {
		Ok(Self {
			url_pattern: Regex::new(r"https?://(?:[a-zA-Z]|[0-9]|[$-_@.&+]|[!*\(\),]|(?:%[0-9a-fA-F][0-9a-fA-F]))+")?,
			invite_pattern: Regex::new(r"(?:https?://)?(?:www\.)?discord(?:app\.com/invite|\.gg)/[a-zA-Z0-9]+")?,
			image_url_pattern: Regex::new(r"(?i)^https?://\S+\.(?:png|jpe?g|gif|webp)(?:\?\S*)?$")?,
		})
	}

	pub fn classify(&self, message: &MessageContent<'_>) -> ContentTypeFlags {
		let mut detected = ContentTypeFlags::empty();
		let text = message.text;

		if !text.trim().is_empty() {
			let without_urls = self.url_pattern.replace_all(text, "");
			if !without_urls.trim().is_empty() {
				detected |= ContentTypeFlags::PLAIN_TEXT;
			}
		}

		if self.invite_pattern.is_match(text) {
			detected |= ContentTypeFlags::DISCORD_INVITE;
		}

		for url in self.url_pattern.find_iter(text) {
			let url = url.as_str();
			if self.is_invite_url(url) {
				continue;
			}
			if self.image_url_pattern.is_match(url) {
				detected |= ContentTypeFlags::IMAGE_LINK;
			} else {
				detected |= ContentTypeFlags::REGULAR_LINK;
			}
		}

		for content_type in message.attachment_content_types.iter() {
			if is_image_type(*content_type) {
				detected |= ContentTypeFlags::IMAGE_ATTACHMENT;
			} else {
				detected |= ContentTypeFlags::FILE_ATTACHMENT;
			}
		}

		if message.embed_count > 0 {
			detected |= ContentTypeFlags::EMBED;
		}

		detected
	}

	fn is_invite_url(&self, url: &str) -> bool {
		self.invite_pattern.find(url).is_some_and(|found| found.start() == 0)
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	fn text(text: &str) -> MessageContent<'_> {
		MessageContent {
			text,
			..Default::default()
		}
	}

	fn classify(message: &MessageContent<'_>) -> ContentTypeFlags {
		ContentClassifier::new().unwrap().classify(message)
	}

	#[test]
	fn empty_message_has_no_content() {
		assert_eq!(classify(&text("")), ContentTypeFlags::empty());
		assert_eq!(classify(&text("  \n\t ")), ContentTypeFlags::empty());
	}

	#[test]
	fn invite_with_text() {
		let detected = classify(&text("join my server https://discord.gg/abc123"));
		assert_eq!(detected, ContentTypeFlags::PLAIN_TEXT | ContentTypeFlags::DISCORD_INVITE);
	}

	#[test]
	fn bare_url_is_not_plain_text() {
		assert_eq!(
			classify(&text("https://example.com/page?a=1")),
			ContentTypeFlags::REGULAR_LINK
		);
		assert_eq!(
			classify(&text("https://discordapp.com/invite/xyz")),
			ContentTypeFlags::DISCORD_INVITE
		);
	}

	#[test]
	fn image_links_are_case_insensitive() {
		assert_eq!(
			classify(&text("https://cdn.example.com/cat.PNG")),
			ContentTypeFlags::IMAGE_LINK
		);
		assert_eq!(
			classify(&text("https://cdn.example.com/cat.jpeg?size=large")),
			ContentTypeFlags::IMAGE_LINK
		);
	}

	#[test]
	fn mixed_links_set_each_bit() {
		let detected = classify(&text(
			"https://cdn.example.com/a.gif https://example.com https://discord.gg/abc",
		));
		assert_eq!(
			detected,
			ContentTypeFlags::IMAGE_LINK | ContentTypeFlags::REGULAR_LINK | ContentTypeFlags::DISCORD_INVITE
		);
	}

	#[test]
	fn attachments_split_by_mime_type() {
		let message = MessageContent {
			text: "",
			attachment_content_types: vec![Some("image/png"), Some("application/pdf"), None],
			embed_count: 0,
		};
		assert_eq!(
			classify(&message),
			ContentTypeFlags::IMAGE_ATTACHMENT | ContentTypeFlags::FILE_ATTACHMENT
		);
		assert!(message.has_image_attachment());
	}

	#[test]
	fn captioned_image_and_embed() {
		let message = MessageContent {
			text: "check this out",
			attachment_content_types: vec![Some("image/webp")],
			embed_count: 2,
		};
		assert_eq!(
			classify(&message),
			ContentTypeFlags::PLAIN_TEXT | ContentTypeFlags::IMAGE_ATTACHMENT | ContentTypeFlags::EMBED
		);
	}

	#[test]
	fn parse_list_accepts_keys_and_dashes() {
		let flags = ContentTypeFlags::parse_list("Plain_Text, image-links embeds").unwrap();
		assert_eq!(
			flags,
			ContentTypeFlags::PLAIN_TEXT | ContentTypeFlags::IMAGE_LINK | ContentTypeFlags::EMBED
		);
		assert_eq!(ContentTypeFlags::parse_list("").unwrap(), ContentTypeFlags::empty());
		assert_eq!(
			ContentTypeFlags::parse_list("text, gifs"),
			Err(ValidationError::UnknownContentType(String::from("text")))
		);
	}

	#[test]
	fn display_names_follow_bit_order() {
		let flags = ContentTypeFlags::EMBED | ContentTypeFlags::PLAIN_TEXT;
		assert_eq!(flags.display_names(), "plain text, embeds");
		assert_eq!(ContentTypeFlags::empty().display_names(), "nothing");
		assert_eq!(flags.key_names(), vec!["plain_text", "embeds"]);
	}

	#[test]
	fn masks_drop_unknown_bits() {
		assert_eq!(ContentTypeFlags::from_mask(0b1000_0001), ContentTypeFlags::PLAIN_TEXT);
		assert_eq!(ContentTypeFlags::all().to_mask(), 127);
	}
}
