// © 2024-2025 ElementalAlchemist and the Dainsleif Mains Development Team
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use super::content::ContentTypeFlags;
use crate::error::ValidationError;
use crate::model::{ChannelRestriction, LegacyRestrictionMode};

/// The allow and block sets for a channel. The two sets never overlap.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct RestrictionMasks {
	allowed: ContentTypeFlags,
	blocked: ContentTypeFlags,
}

impl RestrictionMasks {
	pub fn new(allowed: ContentTypeFlags, blocked: ContentTypeFlags) -> Result<Self, ValidationError> {
		let overlap = allowed & blocked;
		if !overlap.is_empty() {
			return Err(ValidationError::ConflictingMasks(overlap));
		}
		Ok(Self { allowed, blocked })
	}

	/// The masks equivalent to one of the single-mode presets.
	pub fn from_legacy(mode: LegacyRestrictionMode) -> Self {
		let (allowed, blocked) = match mode {
			LegacyRestrictionMode::BlockInvites => (ContentTypeFlags::empty(), ContentTypeFlags::DISCORD_INVITE),
			LegacyRestrictionMode::BlockAllLinks => (
				ContentTypeFlags::empty(),
				ContentTypeFlags::DISCORD_INVITE | ContentTypeFlags::IMAGE_LINK | ContentTypeFlags::REGULAR_LINK,
			),
			LegacyRestrictionMode::MediaOnly => (
				ContentTypeFlags::all().difference(ContentTypeFlags::PLAIN_TEXT),
				ContentTypeFlags::empty(),
			),
			LegacyRestrictionMode::TextOnly => (
				ContentTypeFlags::empty(),
				ContentTypeFlags::IMAGE_LINK
					| ContentTypeFlags::IMAGE_ATTACHMENT
					| ContentTypeFlags::FILE_ATTACHMENT
					| ContentTypeFlags::EMBED,
			),
			LegacyRestrictionMode::None => (ContentTypeFlags::empty(), ContentTypeFlags::empty()),
		};
		Self { allowed, blocked }
	}

	/// Reads the masks from a stored restriction. Stored rows are checked on write, but an overlapping row is still
	/// read safely: the blocklist wins during evaluation.
	pub fn from_restriction(restriction: &ChannelRestriction) -> Self {
		Self {
			allowed: ContentTypeFlags::from_mask(restriction.allowed_mask),
			blocked: ContentTypeFlags::from_mask(restriction.blocked_mask),
		}
	}

	pub fn allowed(&self) -> ContentTypeFlags {
		self.allowed
	}

	pub fn blocked(&self) -> ContentTypeFlags {
		self.blocked
	}

	pub fn is_empty(&self) -> bool {
		self.allowed.is_empty() && self.blocked.is_empty()
	}
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum BlockCause {
	/// The message carried a type on the channel's blocklist.
	Blocklist,
	/// The message carried a type outside the channel's allowlist.
	Allowlist,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Decision {
	Allow,
	Block {
		violating: ContentTypeFlags,
		cause: BlockCause,
	},
}

/// Decides whether a message with the detected content may stay in a channel with the given masks.
pub fn evaluate(detected: ContentTypeFlags, masks: &RestrictionMasks) -> Decision {
	if detected.is_empty() {
		return Decision::Allow;
	}

	let violating = detected & masks.blocked;
	if !violating.is_empty() {
		return Decision::Block {
			violating,
			cause: BlockCause::Blocklist,
		};
	}

	if !masks.allowed.is_empty() {
		let excess = detected.difference(masks.allowed);
		if !excess.is_empty() {
			return Decision::Block {
				violating: excess,
				cause: BlockCause::Allowlist,
			};
		}
	}

	Decision::Allow
}

/// The notice posted in place of a removed message when the channel redirects elsewhere.
pub fn redirect_notice(
	cause: BlockCause,
	violating: ContentTypeFlags,
	masks: &RestrictionMasks,
	author_mention: impl std::fmt::Display,
	redirect_mention: impl std::fmt::Display,
) -> String {
	match cause {
		BlockCause::Blocklist => format!(
			"🚫 {}, this channel doesn't allow **{}**. Please use {} instead.",
			author_mention,
			violating.display_names(),
			redirect_mention
		),
		BlockCause::Allowlist => format!(
			"🚫 {}, this channel only allows **{}**. Please use {} for other content.",
			author_mention,
			masks.allowed.display_names(),
			redirect_mention
		),
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	fn masks(allowed: ContentTypeFlags, blocked: ContentTypeFlags) -> RestrictionMasks {
		RestrictionMasks::new(allowed, blocked).unwrap()
	}

	#[test]
	fn nothing_detected_is_always_allowed() {
		for mode in [
			LegacyRestrictionMode::BlockInvites,
			LegacyRestrictionMode::BlockAllLinks,
			LegacyRestrictionMode::MediaOnly,
			LegacyRestrictionMode::TextOnly,
			LegacyRestrictionMode::None,
		] {
			let masks = RestrictionMasks::from_legacy(mode);
			assert_eq!(evaluate(ContentTypeFlags::empty(), &masks), Decision::Allow);
		}
		let everything_blocked = masks(ContentTypeFlags::empty(), ContentTypeFlags::all());
		assert_eq!(evaluate(ContentTypeFlags::empty(), &everything_blocked), Decision::Allow);
	}

	#[test]
	fn overlapping_masks_are_rejected() {
		let result = RestrictionMasks::new(
			ContentTypeFlags::PLAIN_TEXT | ContentTypeFlags::EMBED,
			ContentTypeFlags::EMBED | ContentTypeFlags::REGULAR_LINK,
		);
		assert_eq!(result, Err(ValidationError::ConflictingMasks(ContentTypeFlags::EMBED)));
	}

	#[test]
	fn blocked_invite_is_removed() {
		let masks = masks(ContentTypeFlags::empty(), ContentTypeFlags::DISCORD_INVITE);
		let detected = ContentTypeFlags::PLAIN_TEXT | ContentTypeFlags::DISCORD_INVITE;
		assert_eq!(
			evaluate(detected, &masks),
			Decision::Block {
				violating: ContentTypeFlags::DISCORD_INVITE,
				cause: BlockCause::Blocklist,
			}
		);
	}

	#[test]
	fn allowlist_is_exclusive() {
		let masks = masks(ContentTypeFlags::IMAGE_ATTACHMENT, ContentTypeFlags::empty());
		let detected = ContentTypeFlags::IMAGE_ATTACHMENT | ContentTypeFlags::PLAIN_TEXT;
		assert_eq!(
			evaluate(detected, &masks),
			Decision::Block {
				violating: ContentTypeFlags::PLAIN_TEXT,
				cause: BlockCause::Allowlist,
			}
		);
		assert_eq!(evaluate(ContentTypeFlags::IMAGE_ATTACHMENT, &masks), Decision::Allow);
	}

	#[test]
	fn blocklist_checked_before_allowlist() {
		let masks = masks(ContentTypeFlags::PLAIN_TEXT, ContentTypeFlags::DISCORD_INVITE);
		let detected = ContentTypeFlags::PLAIN_TEXT | ContentTypeFlags::DISCORD_INVITE | ContentTypeFlags::EMBED;
		assert_eq!(
			evaluate(detected, &masks),
			Decision::Block {
				violating: ContentTypeFlags::DISCORD_INVITE,
				cause: BlockCause::Blocklist,
			}
		);
	}

	#[test]
	fn evaluation_is_repeatable() {
		let masks = masks(ContentTypeFlags::REGULAR_LINK, ContentTypeFlags::IMAGE_LINK);
		let detected = ContentTypeFlags::REGULAR_LINK | ContentTypeFlags::FILE_ATTACHMENT;
		assert_eq!(evaluate(detected, &masks), evaluate(detected, &masks));
	}

	#[test]
	fn media_only_rejects_text_alone_and_captions() {
		let masks = RestrictionMasks::from_legacy(LegacyRestrictionMode::MediaOnly);
		assert!(matches!(
			evaluate(ContentTypeFlags::PLAIN_TEXT, &masks),
			Decision::Block { .. }
		));
		assert!(matches!(
			evaluate(ContentTypeFlags::PLAIN_TEXT | ContentTypeFlags::IMAGE_ATTACHMENT, &masks),
			Decision::Block { .. }
		));
		assert_eq!(
			evaluate(ContentTypeFlags::IMAGE_ATTACHMENT | ContentTypeFlags::EMBED, &masks),
			Decision::Allow
		);
	}

	#[test]
	fn text_only_and_link_presets() {
		let text_only = RestrictionMasks::from_legacy(LegacyRestrictionMode::TextOnly);
		assert_eq!(evaluate(ContentTypeFlags::PLAIN_TEXT, &text_only), Decision::Allow);
		assert!(matches!(
			evaluate(ContentTypeFlags::FILE_ATTACHMENT, &text_only),
			Decision::Block { .. }
		));

		let no_links = RestrictionMasks::from_legacy(LegacyRestrictionMode::BlockAllLinks);
		assert_eq!(
			evaluate(ContentTypeFlags::PLAIN_TEXT | ContentTypeFlags::IMAGE_ATTACHMENT, &no_links),
			Decision::Allow
		);
		assert_eq!(
			evaluate(ContentTypeFlags::REGULAR_LINK | ContentTypeFlags::IMAGE_LINK, &no_links),
			Decision::Block {
				violating: ContentTypeFlags::REGULAR_LINK | ContentTypeFlags::IMAGE_LINK,
				cause: BlockCause::Blocklist,
			}
		);
		assert!(RestrictionMasks::from_legacy(LegacyRestrictionMode::None).is_empty());
	}

	#[test]
	fn notices_name_the_right_types() {
		let masks = masks(ContentTypeFlags::IMAGE_ATTACHMENT, ContentTypeFlags::DISCORD_INVITE);
		let blocked = redirect_notice(
			BlockCause::Blocklist,
			ContentTypeFlags::DISCORD_INVITE,
			&masks,
			"<@1>",
			"<#2>",
		);
		assert_eq!(
			blocked,
			"🚫 <@1>, this channel doesn't allow **discord invites**. Please use <#2> instead."
		);
		let excess = redirect_notice(BlockCause::Allowlist, ContentTypeFlags::PLAIN_TEXT, &masks, "<@1>", "<#2>");
		assert_eq!(
			excess,
			"🚫 <@1>, this channel only allows **image attachments**. Please use <#2> for other content."
		);
	}
}
