// © 2024-2025 ElementalAlchemist and the Dainsleif Mains Development Team
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use crate::context::BotContext;
use crate::leveling::engine::{prune_cooldowns, run_due_auto_resets};
use chrono::{DateTime, Days, TimeZone, Utc};
use chrono_tz::Tz;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{Instant, MissedTickBehavior, interval_at, sleep};

pub mod reminders;
pub mod time_channels;
pub mod youtube;

pub const REMINDER_PERIOD: Duration = Duration::from_secs(60);
pub const TIME_CHANNEL_PERIOD: Duration = Duration::from_secs(10 * 60);
pub const YOUTUBE_PERIOD: Duration = Duration::from_secs(15 * 60);
pub const AUTO_RESET_PERIOD: Duration = Duration::from_secs(60 * 60);
pub const COOLDOWN_PRUNE_PERIOD: Duration = Duration::from_secs(60 * 60);

/// Time from `now` until the next multiple of `period` since the Unix epoch. At an exact boundary this is a full
/// period.
pub fn until_next_boundary(now: DateTime<Utc>, period: Duration) -> Duration {
	let period_ms = period.as_millis().max(1) as i64;
	let elapsed_in_period = now.timestamp_millis().rem_euclid(period_ms);
	Duration::from_millis((period_ms - elapsed_in_period) as u64)
}

/// Time from `now` until the next midnight in the given time zone
pub fn until_next_local_midnight(now: DateTime<Utc>, timezone: Tz) -> Duration {
	let local_today = now.with_timezone(&timezone).date_naive();
	let next_midnight = local_today
		.checked_add_days(Days::new(1))
		.and_then(|date| date.and_hms_opt(0, 0, 0))
		.and_then(|midnight| timezone.from_local_datetime(&midnight).earliest());
	match next_midnight {
		Some(next_midnight) => (next_midnight.with_timezone(&Utc) - now)
			.to_std()
			.unwrap_or(Duration::from_secs(1)),
		None => Duration::from_secs(24 * 60 * 60),
	}
}

/// Runs `task` every `period`, with the first run after `first_delay`. A failed run is logged and the loop continues.
pub async fn run_periodically<F, Fut>(name: &'static str, first_delay: Duration, period: Duration, mut task: F)
where
	F: FnMut() -> Fut,
	Fut: Future<Output = miette::Result<()>>,
{
	let mut ticks = interval_at(Instant::now() + first_delay, period);
	ticks.set_missed_tick_behavior(MissedTickBehavior::Skip);
	loop {
		ticks.tick().await;
		if let Err(error) = task().await {
			tracing::error!(source = ?error, task = name, "Scheduled task failed");
		}
	}
}

/// Runs `task` every `period`, aligned to clean boundaries of the period.
pub async fn run_aligned<F, Fut>(name: &'static str, period: Duration, task: F)
where
	F: FnMut() -> Fut,
	Fut: Future<Output = miette::Result<()>>,
{
	let first_delay = until_next_boundary(Utc::now(), period);
	tracing::debug!(task = name, wait_seconds = first_delay.as_secs(), "Aligning scheduled task");
	run_periodically(name, first_delay, period, task).await;
}

/// Runs `task` at every midnight in the given time zone. The delay is recomputed each day so DST changes don't drift
/// the schedule.
pub async fn run_daily_at_midnight<F, Fut>(name: &'static str, timezone: Tz, mut task: F)
where
	F: FnMut() -> Fut,
	Fut: Future<Output = miette::Result<()>>,
{
	loop {
		sleep(until_next_local_midnight(Utc::now(), timezone)).await;
		if let Err(error) = task().await {
			tracing::error!(source = ?error, task = name, "Scheduled task failed");
		}
	}
}

/// Starts every periodic task.
pub fn spawn_scheduled_tasks(ctx: Arc<BotContext>) {
	{
		let ctx = Arc::clone(&ctx);
		tokio::spawn(async move {
			run_aligned("reminders", REMINDER_PERIOD, || reminders::fire_due_reminders(&ctx, Utc::now())).await
		});
	}
	{
		let ctx = Arc::clone(&ctx);
		tokio::spawn(async move {
			run_aligned("time channels", TIME_CHANNEL_PERIOD, || {
				time_channels::update_time_channels(&ctx, Utc::now())
			})
			.await
		});
	}
	{
		let ctx = Arc::clone(&ctx);
		tokio::spawn(async move {
			if let Err(error) = time_channels::update_date_channels(&ctx, Utc::now()).await {
				tracing::error!(source = ?error, "Failed to update date channels at startup");
			}
			run_daily_at_midnight("date channels", time_channels::DATE_TIMEZONE, || {
				time_channels::update_date_channels(&ctx, Utc::now())
			})
			.await
		});
	}
	{
		let ctx = Arc::clone(&ctx);
		tokio::spawn(async move {
			run_aligned("youtube", YOUTUBE_PERIOD, || youtube::poll_all_feeds(&ctx, Utc::now())).await
		});
	}
	{
		let ctx = Arc::clone(&ctx);
		tokio::spawn(async move {
			run_aligned("auto reset", AUTO_RESET_PERIOD, || run_due_auto_resets(&ctx, Utc::now())).await
		});
	}
	tokio::spawn(async move {
		run_periodically("cooldown cleanup", COOLDOWN_PRUNE_PERIOD, COOLDOWN_PRUNE_PERIOD, || async {
			prune_cooldowns(&ctx);
			Ok(())
		})
		.await
	});
}

#[cfg(test)]
mod tests {
	use super::*;
	use std::sync::atomic::{AtomicUsize, Ordering};

	fn at(timestamp: &str) -> DateTime<Utc> {
		DateTime::parse_from_rfc3339(timestamp).unwrap().with_timezone(&Utc)
	}

	#[test]
	fn boundary_wait_reaches_next_clean_mark() {
		let now = at("2025-05-01T12:07:30Z");
		assert_eq!(until_next_boundary(now, TIME_CHANNEL_PERIOD), Duration::from_secs(150));
		assert_eq!(until_next_boundary(now, YOUTUBE_PERIOD), Duration::from_secs(450));
		assert_eq!(until_next_boundary(now, AUTO_RESET_PERIOD), Duration::from_secs(52 * 60 + 30));
		assert_eq!(until_next_boundary(now, REMINDER_PERIOD), Duration::from_secs(30));
	}

	#[test]
	fn boundary_wait_on_the_mark_is_a_full_period() {
		let now = at("2025-05-01T12:10:00Z");
		assert_eq!(until_next_boundary(now, TIME_CHANNEL_PERIOD), TIME_CHANNEL_PERIOD);
	}

	#[test]
	fn boundary_wait_counts_subseconds() {
		let now = at("2025-05-01T12:09:59.250Z");
		assert_eq!(until_next_boundary(now, TIME_CHANNEL_PERIOD), Duration::from_millis(750));
	}

	#[test]
	fn local_midnight_in_kolkata() {
		// 17:30 UTC is 23:00 IST
		let now = at("2025-05-01T17:30:00Z");
		assert_eq!(
			until_next_local_midnight(now, chrono_tz::Asia::Kolkata),
			Duration::from_secs(60 * 60)
		);
		// 18:30 UTC is exactly midnight IST, so the next one is a day away
		let now = at("2025-05-01T18:30:00Z");
		assert_eq!(
			until_next_local_midnight(now, chrono_tz::Asia::Kolkata),
			Duration::from_secs(24 * 60 * 60)
		);
	}

	#[tokio::test(start_paused = true)]
	async fn periodic_runs_survive_failures() {
		let runs = Arc::new(AtomicUsize::new(0));
		let task_runs = Arc::clone(&runs);
		let handle = tokio::spawn(async move {
			run_periodically("test", Duration::from_secs(5), Duration::from_secs(60), move || {
				let task_runs = Arc::clone(&task_runs);
				async move {
					let run = task_runs.fetch_add(1, Ordering::SeqCst);
					if run == 0 {
						miette::bail!("first run fails");
					}
					Ok(())
				}
			})
			.await
		});

		tokio::time::sleep(Duration::from_secs(4)).await;
		assert_eq!(runs.load(Ordering::SeqCst), 0);
		tokio::time::sleep(Duration::from_secs(2)).await;
		assert_eq!(runs.load(Ordering::SeqCst), 1);
		tokio::time::sleep(Duration::from_secs(120)).await;
		assert_eq!(runs.load(Ordering::SeqCst), 3);

		handle.abort();
	}

	#[tokio::test(start_paused = true)]
	async fn overrunning_task_returns_to_its_boundaries() {
		let start = Instant::now();
		let runs = Arc::new(std::sync::Mutex::new(Vec::new()));
		let task_runs = Arc::clone(&runs);
		let handle = tokio::spawn(async move {
			run_periodically("test", Duration::from_secs(10), Duration::from_secs(10), move || {
				let task_runs = Arc::clone(&task_runs);
				async move {
					let first_run = {
						let mut runs = task_runs.lock().unwrap();
						runs.push(start.elapsed().as_secs());
						runs.len() == 1
					};
					if first_run {
						sleep(Duration::from_secs(15)).await;
					}
					Ok(())
				}
			})
			.await
		});

		sleep(Duration::from_secs(42)).await;
		handle.abort();
		// The tick missed at 20 s fires late at 25 s; later ticks stay on multiples of the period
		assert_eq!(*runs.lock().unwrap(), vec![10, 25, 30, 40]);
	}
}
