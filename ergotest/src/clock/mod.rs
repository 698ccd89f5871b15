// Copyright (c) The ergotest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! An abstraction over wall time.
//!
//! The engine never touches `std::time::Instant` directly; every wait,
//! timeout race, ticker and watchdog in this crate goes through the free
//! functions here, which are thin wrappers over `tokio::time`. That
//! indirection is what lets the engine's own tests run under a paused,
//! manually-advanced clock (see [`testing`]) instead of real sleeps: tokio's
//! timers already respect a runtime-wide pause, so there is no need for a
//! parallel "null" implementation of this module's functions.

use std::{future::Future, sync::Arc, time::Duration};
use tokio::sync::Notify;

fn duration_ms(ms: u64) -> Duration {
    Duration::from_millis(ms)
}

/// Monotonic milliseconds since the engine was first asked for the time.
///
/// The epoch is process-local and has no meaning across processes; it exists
/// only to support [`crate::result::RunResult`] style reporting that wants a
/// timestamp, not a true wall-clock value.
pub fn now_ms() -> u64 {
    use std::sync::OnceLock;
    use tokio::time::Instant;

    static EPOCH: OnceLock<Instant> = OnceLock::new();
    let epoch = EPOCH.get_or_init(Instant::now);
    Instant::now().saturating_duration_since(*epoch).as_millis() as u64
}

/// Suspends the caller for `ms` milliseconds.
pub async fn wait(ms: u64) {
    tokio::time::sleep(duration_ms(ms)).await;
}

/// Races `body` against a timer of `ms` milliseconds.
///
/// If `body` completes first, its result is returned. If the timer elapses
/// first, `on_timeout` is evaluated instead; a tie (both ready on the same
/// poll) goes to the timer, matching the "timer wins" rule in the
/// specification. `body`'s eventual completion after a timeout is dropped,
/// not awaited further: this is the "best-effort, may run to completion in
/// the background" cancellation contract described for platforms without
/// cooperative cancellation.
pub async fn timeout<T, F, O>(ms: u64, body: F, on_timeout: O) -> T
where
    F: Future<Output = T>,
    O: FnOnce() -> T,
{
    tokio::select! {
        biased;
        _ = tokio::time::sleep(duration_ms(ms)) => on_timeout(),
        out = body => out,
    }
}

/// A handle that stops a [`repeat`] or [`keepalive`] task. Cancelling more
/// than once is a no-op.
pub struct CancelHandle {
    notify: Arc<Notify>,
}

impl CancelHandle {
    pub fn cancel(&self) {
        self.notify.notify_waiters();
    }
}

/// Schedules `f` to run every `ms` milliseconds, on the current Tokio
/// runtime, until the returned handle is cancelled.
pub fn repeat<F>(ms: u64, f: F) -> CancelHandle
where
    F: Fn() + Send + 'static,
{
    let notify = Arc::new(Notify::new());
    let cancel = notify.clone();
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(duration_ms(ms));
        interval.tick().await; // first tick fires immediately; skip it
        loop {
            tokio::select! {
                _ = cancel.notified() => return,
                _ = interval.tick() => f(),
            }
        }
    });
    CancelHandle { notify }
}

/// Returns `(alive, cancel)`. Call `alive()` periodically; if more than `ms`
/// elapses between calls (or since `keepalive` was invoked), `on_stall` fires
/// exactly once. `cancel` stops the watchdog for good.
pub fn keepalive<S>(ms: u64, on_stall: S) -> (impl Fn() + Clone, CancelHandle)
where
    S: FnOnce() + Send + 'static,
{
    let notify = Arc::new(Notify::new());
    let cancel = notify.clone();
    let pulse = Arc::new(Notify::new());
    let alive_pulse = pulse.clone();

    tokio::spawn(async move {
        let mut on_stall = Some(on_stall);
        loop {
            tokio::select! {
                _ = cancel.notified() => return,
                _ = pulse.notified() => continue,
                _ = tokio::time::sleep(duration_ms(ms)) => {
                    if let Some(f) = on_stall.take() {
                        f();
                    }
                    return;
                }
            }
        }
    });

    let alive = move || alive_pulse.notify_one();
    (alive, CancelHandle { notify: notify })
}

/// Deterministic clock support for the engine's own tests.
///
/// `tokio::time::{pause, advance}` make the runtime-wide clock controllable:
/// once paused, timers (including the ones [`wait`], [`timeout`], [`repeat`]
/// and [`keepalive`] create) only fire when [`advance`] moves time forward
/// explicitly. Tests that need this should use `#[tokio::test(start_paused =
/// true)]` and call [`advance`] rather than sleeping for real.
#[cfg(test)]
pub mod testing {
    use std::time::Duration;

    /// Advances the paused clock by `ms` milliseconds, running any timers
    /// that become due.
    pub async fn advance(ms: u64) {
        tokio::time::advance(Duration::from_millis(ms)).await;
    }
}
