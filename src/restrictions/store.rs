// © 2024-2025 ElementalAlchemist and the Dainsleif Mains Development Team
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use super::evaluate::RestrictionMasks;
use crate::model::{
	BypassRole, ChannelRestriction, LegacyRestrictionMode, database_id_from_discord_id, discord_id_from_database_id,
};
use crate::schema::{bypass_roles, channel_restrictions};
use chrono::Utc;
use diesel::prelude::*;
use twilight_model::id::Id;
use twilight_model::id::marker::{ChannelMarker, GuildMarker, RoleMarker, UserMarker};

#[derive(Debug, Eq, PartialEq)]
pub enum LegacySetupOutcome {
	Created,
	/// The channel already has a restriction of some kind, which was left alone.
	AlreadyRestricted,
}

#[derive(Debug)]
pub enum RestrictionWrite {
	Saved(ChannelRestriction),
	/// The new masks were empty, so the channel no longer has a restriction.
	Cleared,
}

pub fn get_restriction(
	db_connection: &mut PgConnection,
	guild_id: Id<GuildMarker>,
	channel_id: Id<ChannelMarker>,
) -> QueryResult<Option<ChannelRestriction>> {
	channel_restrictions::table
		.find((
			database_id_from_discord_id(guild_id.get()),
			database_id_from_discord_id(channel_id.get()),
		))
		.first(db_connection)
		.optional()
}

pub fn list_restrictions(
	db_connection: &mut PgConnection,
	guild_id: Id<GuildMarker>,
) -> QueryResult<Vec<ChannelRestriction>> {
	channel_restrictions::table
		.filter(channel_restrictions::guild_id.eq(database_id_from_discord_id(guild_id.get())))
		.order(channel_restrictions::channel_id)
		.load(db_connection)
}

/// Sets up one of the preset restrictions, translated to masks, on a channel that has no restriction yet.
pub fn set_legacy_restriction(
	db_connection: &mut PgConnection,
	guild_id: Id<GuildMarker>,
	channel_id: Id<ChannelMarker>,
	mode: LegacyRestrictionMode,
	redirect_channel_id: Option<Id<ChannelMarker>>,
	configured_by: Id<UserMarker>,
) -> QueryResult<LegacySetupOutcome> {
	let masks = RestrictionMasks::from_legacy(mode);
	let restriction = ChannelRestriction {
		guild_id: database_id_from_discord_id(guild_id.get()),
		channel_id: database_id_from_discord_id(channel_id.get()),
		allowed_mask: masks.allowed().to_mask(),
		blocked_mask: masks.blocked().to_mask(),
		legacy_mode: mode,
		redirect_channel_id: redirect_channel_id.map(|id| database_id_from_discord_id(id.get())),
		configured_by: Some(database_id_from_discord_id(configured_by.get())),
		updated_at: Utc::now(),
	};

	let inserted = diesel::insert_into(channel_restrictions::table)
		.values(&restriction)
		.on_conflict_do_nothing()
		.execute(db_connection)?;
	if inserted == 0 {
		Ok(LegacySetupOutcome::AlreadyRestricted)
	} else {
		Ok(LegacySetupOutcome::Created)
	}
}

/// Removes a channel's restriction only if it was set up through the given preset. Returns whether a restriction was
/// removed.
pub fn remove_legacy_restriction(
	db_connection: &mut PgConnection,
	guild_id: Id<GuildMarker>,
	channel_id: Id<ChannelMarker>,
	mode: LegacyRestrictionMode,
) -> QueryResult<bool> {
	let deleted = diesel::delete(channel_restrictions::table)
		.filter(channel_restrictions::guild_id.eq(database_id_from_discord_id(guild_id.get())))
		.filter(channel_restrictions::channel_id.eq(database_id_from_discord_id(channel_id.get())))
		.filter(channel_restrictions::legacy_mode.eq(mode))
		.execute(db_connection)?;
	Ok(deleted > 0)
}

/// Creates or replaces the granular restriction on a channel.
pub fn upsert_restriction(
	db_connection: &mut PgConnection,
	guild_id: Id<GuildMarker>,
	channel_id: Id<ChannelMarker>,
	masks: RestrictionMasks,
	redirect_channel_id: Option<Id<ChannelMarker>>,
	configured_by: Option<Id<UserMarker>>,
) -> QueryResult<RestrictionWrite> {
	if masks.is_empty() {
		delete_restriction(db_connection, guild_id, channel_id)?;
		return Ok(RestrictionWrite::Cleared);
	}

	let restriction = ChannelRestriction {
		guild_id: database_id_from_discord_id(guild_id.get()),
		channel_id: database_id_from_discord_id(channel_id.get()),
		allowed_mask: masks.allowed().to_mask(),
		blocked_mask: masks.blocked().to_mask(),
		legacy_mode: LegacyRestrictionMode::None,
		redirect_channel_id: redirect_channel_id.map(|id| database_id_from_discord_id(id.get())),
		configured_by: configured_by.map(|id| database_id_from_discord_id(id.get())),
		updated_at: Utc::now(),
	};

	let saved = diesel::insert_into(channel_restrictions::table)
		.values(&restriction)
		.on_conflict((channel_restrictions::guild_id, channel_restrictions::channel_id))
		.do_update()
		.set((
			channel_restrictions::allowed_mask.eq(restriction.allowed_mask),
			channel_restrictions::blocked_mask.eq(restriction.blocked_mask),
			channel_restrictions::legacy_mode.eq(restriction.legacy_mode),
			channel_restrictions::redirect_channel_id.eq(restriction.redirect_channel_id),
			channel_restrictions::configured_by.eq(restriction.configured_by),
			channel_restrictions::updated_at.eq(restriction.updated_at),
		))
		.get_result(db_connection)?;
	Ok(RestrictionWrite::Saved(saved))
}

pub fn delete_restriction(
	db_connection: &mut PgConnection,
	guild_id: Id<GuildMarker>,
	channel_id: Id<ChannelMarker>,
) -> QueryResult<bool> {
	let deleted = diesel::delete(channel_restrictions::table)
		.filter(channel_restrictions::guild_id.eq(database_id_from_discord_id(guild_id.get())))
		.filter(channel_restrictions::channel_id.eq(database_id_from_discord_id(channel_id.get())))
		.execute(db_connection)?;
	Ok(deleted > 0)
}

/// Returns whether the role was newly added.
pub fn add_bypass_role(
	db_connection: &mut PgConnection,
	guild_id: Id<GuildMarker>,
	role_id: Id<RoleMarker>,
) -> QueryResult<bool> {
	let new_role = BypassRole {
		guild_id: database_id_from_discord_id(guild_id.get()),
		role_id: database_id_from_discord_id(role_id.get()),
	};
	let inserted = diesel::insert_into(bypass_roles::table)
		.values(new_role)
		.on_conflict_do_nothing()
		.execute(db_connection)?;
	Ok(inserted > 0)
}

/// Returns whether the role had been a bypass role.
pub fn remove_bypass_role(
	db_connection: &mut PgConnection,
	guild_id: Id<GuildMarker>,
	role_id: Id<RoleMarker>,
) -> QueryResult<bool> {
	let deleted = diesel::delete(bypass_roles::table)
		.filter(bypass_roles::guild_id.eq(database_id_from_discord_id(guild_id.get())))
		.filter(bypass_roles::role_id.eq(database_id_from_discord_id(role_id.get())))
		.execute(db_connection)?;
	Ok(deleted > 0)
}

pub fn list_bypass_roles(
	db_connection: &mut PgConnection,
	guild_id: Id<GuildMarker>,
) -> QueryResult<Vec<Id<RoleMarker>>> {
	let role_ids: Vec<i64> = bypass_roles::table
		.filter(bypass_roles::guild_id.eq(database_id_from_discord_id(guild_id.get())))
		.select(bypass_roles::role_id)
		.load(db_connection)?;
	Ok(role_ids
		.into_iter()
		.map(|role_id| Id::new(discord_id_from_database_id(role_id)))
		.collect())
}
