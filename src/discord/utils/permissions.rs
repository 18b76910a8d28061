// © 2024-2025 ElementalAlchemist and the Dainsleif Mains Development Team
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use crate::context::BotContext;
use twilight_model::guild::Permissions;
use twilight_model::id::Id;
use twilight_model::id::marker::{GuildMarker, RoleMarker, UserMarker};
use twilight_util::permission_calculator::PermissionCalculator;

/// Calculates a member's guild-level permissions from the cache. Roles missing from the cache contribute nothing.
pub fn cached_member_permissions(
	ctx: &BotContext,
	guild_id: Id<GuildMarker>,
	user_id: Id<UserMarker>,
	member_roles: &[Id<RoleMarker>],
) -> Permissions {
	let Some(owner_id) = ctx.cache.guild(guild_id).map(|guild| guild.owner_id()) else {
		return Permissions::empty();
	};

	let everyone_role_id: Id<RoleMarker> = guild_id.cast();
	let everyone_permissions = ctx
		.cache
		.role(everyone_role_id)
		.map(|role| role.resource().permissions)
		.unwrap_or_else(Permissions::empty);
	let role_permissions: Vec<(Id<RoleMarker>, Permissions)> = member_roles
		.iter()
		.filter_map(|role_id| {
			ctx.cache
				.role(*role_id)
				.map(|role| (*role_id, role.resource().permissions))
		})
		.collect();

	PermissionCalculator::new(guild_id, user_id, everyone_permissions, &role_permissions)
		.owner_id(owner_id)
		.root()
}

/// Guild owners and administrators
pub fn is_administrator(
	ctx: &BotContext,
	guild_id: Id<GuildMarker>,
	user_id: Id<UserMarker>,
	member_roles: &[Id<RoleMarker>],
) -> bool {
	has_permission(cached_member_permissions(ctx, guild_id, user_id, member_roles), Permissions::ADMINISTRATOR)
}

/// Whether a permission set grants `required`. Administrator implies every permission.
pub fn has_permission(permissions: Permissions, required: Permissions) -> bool {
	permissions.contains(Permissions::ADMINISTRATOR) || permissions.contains(required)
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn administrator_implies_everything() {
		assert!(has_permission(Permissions::ADMINISTRATOR, Permissions::MANAGE_ROLES));
		assert!(has_permission(
			Permissions::MANAGE_ROLES | Permissions::MANAGE_CHANNELS,
			Permissions::MANAGE_ROLES
		));
		assert!(!has_permission(Permissions::MANAGE_CHANNELS, Permissions::MANAGE_ROLES));
		assert!(!has_permission(Permissions::empty(), Permissions::ADMINISTRATOR));
	}
}
