// © 2024-2025 ElementalAlchemist and the Dainsleif Mains Development Team
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use crate::model::LevelRoleReward;
use std::collections::HashSet;
use twilight_model::id::Id;
use twilight_model::id::marker::RoleMarker;

/// A guild's level thresholds and the roles they grant, sorted by threshold.
#[derive(Clone, Debug, Default)]
pub struct RewardTable {
	rewards: Vec<(u32, Id<RoleMarker>)>,
}

impl RewardTable {
	pub fn new(mut rewards: Vec<(u32, Id<RoleMarker>)>) -> Self {
		rewards.sort_by_key(|(level, _)| *level);
		Self { rewards }
	}

	pub fn from_records(records: &[LevelRoleReward]) -> Self {
		Self::new(
			records
				.iter()
				.map(|reward| (reward.level.max(0) as u32, reward.get_role()))
				.collect(),
		)
	}

	pub fn is_empty(&self) -> bool {
		self.rewards.is_empty()
	}

	pub fn entries(&self) -> &[(u32, Id<RoleMarker>)] {
		&self.rewards
	}

	/// The reward for the highest threshold at or below the level
	pub fn role_for_level(&self, level: u32) -> Option<Id<RoleMarker>> {
		self.rewards
			.iter()
			.rev()
			.find(|(threshold, _)| *threshold <= level)
			.map(|(_, role)| *role)
	}

	pub fn all_roles(&self) -> HashSet<Id<RoleMarker>> {
		self.rewards.iter().map(|(_, role)| *role).collect()
	}
}

/// The role changes needed to bring a member in line with the reward table.
#[derive(Debug, Default, Eq, PartialEq)]
pub struct RoleDelta {
	pub target: Option<Id<RoleMarker>>,
	pub to_add: Vec<Id<RoleMarker>>,
	pub to_remove: Vec<Id<RoleMarker>>,
}

impl RoleDelta {
	pub fn is_empty(&self) -> bool {
		self.to_add.is_empty() && self.to_remove.is_empty()
	}
}

pub fn compute_role_delta(current_roles: &[Id<RoleMarker>], level: u32, table: &RewardTable) -> RoleDelta {
	let target = table.role_for_level(level);
	let reward_roles = table.all_roles();

	let to_add = match target {
		Some(target) if !current_roles.contains(&target) => vec![target],
		_ => Vec::new(),
	};

	let mut to_remove: Vec<Id<RoleMarker>> = current_roles
		.iter()
		.filter(|role| reward_roles.contains(role) && Some(**role) != target)
		.copied()
		.collect();
	to_remove.sort();
	to_remove.dedup();

	RoleDelta {
		target,
		to_add,
		to_remove,
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	fn table() -> RewardTable {
		RewardTable::new(vec![(10, Id::new(110)), (5, Id::new(105)), (20, Id::new(120))])
	}

	fn apply(current: &[Id<RoleMarker>], delta: &RoleDelta) -> Vec<Id<RoleMarker>> {
		let mut roles: Vec<Id<RoleMarker>> = current
			.iter()
			.filter(|role| !delta.to_remove.contains(role))
			.copied()
			.collect();
		roles.extend(delta.to_add.iter().copied());
		roles
	}

	#[test]
	fn picks_highest_threshold_at_or_below_level() {
		let table = table();
		assert_eq!(table.role_for_level(4), None);
		assert_eq!(table.role_for_level(5), Some(Id::new(105)));
		assert_eq!(table.role_for_level(19), Some(Id::new(110)));
		assert_eq!(table.role_for_level(500), Some(Id::new(120)));
	}

	#[test]
	fn swaps_superseded_reward() {
		let current = vec![Id::new(1), Id::new(105)];
		let delta = compute_role_delta(&current, 12, &table());
		assert_eq!(delta.target, Some(Id::new(110)));
		assert_eq!(delta.to_add, vec![Id::new(110)]);
		assert_eq!(delta.to_remove, vec![Id::new(105)]);
	}

	#[test]
	fn already_correct_is_a_no_op() {
		let current = vec![Id::new(110), Id::new(2)];
		let delta = compute_role_delta(&current, 15, &table());
		assert!(delta.is_empty());
		assert_eq!(delta.target, Some(Id::new(110)));
	}

	#[test]
	fn below_every_threshold_strips_all_rewards() {
		let current = vec![Id::new(120), Id::new(105), Id::new(3)];
		let delta = compute_role_delta(&current, 2, &table());
		assert_eq!(delta.target, None);
		assert!(delta.to_add.is_empty());
		assert_eq!(delta.to_remove, vec![Id::new(105), Id::new(120)]);
	}

	#[test]
	fn member_ends_with_exactly_the_target_reward() {
		let table = table();
		let reward_roles = table.all_roles();
		let starting_roles = [
			vec![],
			vec![Id::new(105), Id::new(110), Id::new(120)],
			vec![Id::new(7), Id::new(120)],
		];
		for current in starting_roles.iter() {
			for level in [0, 5, 9, 10, 20, 99] {
				let delta = compute_role_delta(current, level, &table);
				let result = apply(current, &delta);
				let held: Vec<&Id<RoleMarker>> = result.iter().filter(|role| reward_roles.contains(role)).collect();
				match table.role_for_level(level) {
					Some(target) => assert_eq!(held, vec![&target]),
					None => assert!(held.is_empty()),
				}
			}
		}
	}
}
