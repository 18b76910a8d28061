// © 2024-2025 ElementalAlchemist and the Dainsleif Mains Development Team
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use governor::clock::{Clock, DefaultClock};
use governor::middleware::NoOpMiddleware;
use governor::state::keyed::DashMapStateStore;
use governor::{Quota, RateLimiter};
use std::collections::HashMap;
use std::hash::Hash;
use std::num::NonZeroU32;
use std::time::Duration;
use tokio::time::Instant;

/// A map whose entries expire a fixed time after insertion. Expiry is checked on read; there's no background
/// eviction.
#[derive(Debug)]
pub struct TtlCache<K, V> {
	ttl: Duration,
	entries: HashMap<K, (Instant, V)>,
}

impl<K: Eq + Hash, V: Clone> TtlCache<K, V> {
	pub fn new(ttl: Duration) -> Self {
		Self {
			ttl,
			entries: HashMap::new(),
		}
	}

	pub fn get(&self, key: &K) -> Option<V> {
		let (inserted_at, value) = self.entries.get(key)?;
		if inserted_at.elapsed() >= self.ttl {
			return None;
		}
		Some(value.clone())
	}

	pub fn insert(&mut self, key: K, value: V) {
		self.entries.insert(key, (Instant::now(), value));
	}

	pub fn invalidate(&mut self, key: &K) {
		self.entries.remove(key);
	}

	/// Drops every expired entry.
	pub fn purge_expired(&mut self) {
		let ttl = self.ttl;
		self.entries.retain(|_, (inserted_at, _)| inserted_at.elapsed() < ttl);
	}

	pub fn len(&self) -> usize {
		self.entries.len()
	}

	pub fn is_empty(&self) -> bool {
		self.entries.is_empty()
	}
}

type KeyedLimiter<K, C> = RateLimiter<K, DashMapStateStore<K>, C, NoOpMiddleware<<C as Clock>::Instant>>;

/// Lets each key perform an action once per window.
pub struct Cooldowns<K: Hash + Eq + Clone, C: Clock = DefaultClock> {
	limiter: KeyedLimiter<K, C>,
}

impl<K: Hash + Eq + Clone> Cooldowns<K> {
	pub fn new(window: Duration) -> Self {
		Self::with_clock(window, &DefaultClock::default())
	}
}

impl<K: Hash + Eq + Clone, C: Clock> Cooldowns<K, C> {
	pub fn with_clock(window: Duration, clock: &C) -> Self {
		let quota = Quota::with_period(window)
			.unwrap_or_else(|| Quota::per_second(NonZeroU32::MIN))
			.allow_burst(NonZeroU32::MIN);
		Self {
			limiter: RateLimiter::dashmap_with_clock(quota, clock),
		}
	}

	/// Records a use for the key if it's outside its cooldown window. Returns whether the use was allowed.
	pub fn try_use(&self, key: K) -> bool {
		self.limiter.check_key(&key).is_ok()
	}

	/// Forgets every key whose cooldown has fully lapsed. Returns the number of keys removed.
	pub fn prune(&self) -> usize {
		let before = self.limiter.len();
		self.limiter.retain_recent();
		self.limiter.shrink_to_fit();
		before.saturating_sub(self.limiter.len())
	}

	pub fn len(&self) -> usize {
		self.limiter.len()
	}

	pub fn is_empty(&self) -> bool {
		self.limiter.is_empty()
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use governor::clock::FakeRelativeClock;
	use tokio::time::advance;

	#[tokio::test(start_paused = true)]
	async fn ttl_entries_expire_on_read() {
		let mut cache = TtlCache::new(Duration::from_secs(300));
		cache.insert(1u64, "settings");
		assert_eq!(cache.get(&1), Some("settings"));

		advance(Duration::from_secs(299)).await;
		assert_eq!(cache.get(&1), Some("settings"));

		advance(Duration::from_secs(1)).await;
		assert_eq!(cache.get(&1), None);
		assert_eq!(cache.len(), 1);
		cache.purge_expired();
		assert!(cache.is_empty());
	}

	#[tokio::test(start_paused = true)]
	async fn ttl_invalidate_removes_immediately() {
		let mut cache = TtlCache::new(Duration::from_secs(300));
		cache.insert("guild", 5);
		cache.invalidate(&"guild");
		assert_eq!(cache.get(&"guild"), None);
	}

	#[test]
	fn cooldown_blocks_within_window() {
		let clock = FakeRelativeClock::default();
		let cooldowns = Cooldowns::with_clock(Duration::from_secs(60), &clock);
		assert!(cooldowns.try_use((1u64, 2u64)));
		assert!(!cooldowns.try_use((1, 2)));
		assert!(cooldowns.try_use((1, 3)));

		clock.advance(Duration::from_secs(59));
		assert!(!cooldowns.try_use((1, 2)));

		clock.advance(Duration::from_secs(2));
		assert!(cooldowns.try_use((1, 2)));
	}

	#[test]
	fn prune_drops_only_lapsed_entries() {
		let clock = FakeRelativeClock::default();
		let cooldowns = Cooldowns::with_clock(Duration::from_secs(60), &clock);
		cooldowns.try_use("old");
		clock.advance(Duration::from_secs(3000));
		cooldowns.try_use("recent");
		clock.advance(Duration::from_secs(30));

		assert_eq!(cooldowns.prune(), 1);
		assert_eq!(cooldowns.len(), 1);
		assert!(!cooldowns.try_use("recent"));
	}
}
