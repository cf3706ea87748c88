// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Housekeeping ticker.
//!
//! Publishes the periodic `ticker.<seconds>` topics plugins use for
//! scheduling:
//!
//! | Topic         | Published                       |
//! |---------------|---------------------------------|
//! | `ticker.1`    | every tick                      |
//! | `ticker.10`   | every 10th tick                 |
//! | `ticker.60`   | every 60th tick                 |
//! | `ticker.300`  | every 300th tick                |
//! | `ticker.600`  | every 600th tick                |
//! | `ticker.3600` | every 3600th tick, then restart |
//!
//! Topics due on the same tick are published in the order of the table.
//! A subscriber on `ticker` sees all of them.
//!
//! # Examples
//!
//! ```no_run
//! use std::sync::Arc;
//! use topicbus::PubSub;
//! use topicbus::ticker::Ticker;
//!
//! # async fn example() -> topicbus::Result<()> {
//! let bus: Arc<PubSub> = Arc::new(PubSub::new());
//! bus.subscribe_fn("ticker.60", |_, tick| println!("minute: {tick}"))?;
//!
//! let handle = Ticker::default().spawn(&bus);
//! // ...
//! handle.stop();
//! # Ok(())
//! # }
//! ```

use std::sync::{Arc, Weak};
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use crate::PubSub;

/// Default time between ticks.
const DEFAULT_PERIOD: Duration = Duration::from_secs(1);

/// Tick count after which the counter restarts.
const CYCLE: u32 = 3600;

/// Secondary tickers, as (divisor, topic).
const SCHEDULE: [(u32, &str); 5] = [
    (10, "ticker.10"),
    (60, "ticker.60"),
    (300, "ticker.300"),
    (600, "ticker.600"),
    (CYCLE, "ticker.3600"),
];

/// Payload published with every ticker topic.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Tick {
    /// Ticks since the ticker started. Never wraps.
    pub monotonic: u64,
    /// Wall-clock time of the tick.
    pub at: DateTime<Utc>,
}

/// Renders `at` as RFC 3339.
impl From<Tick> for serde_json::Value {
    fn from(tick: Tick) -> Self {
        serde_json::json!({
            "monotonic": tick.monotonic,
            "at": tick.at.to_rfc3339(),
        })
    }
}

/// Counts ticks and decides which topics are due.
#[derive(Debug, Default)]
struct TickCounter {
    tick: u32,
    monotonic: u64,
}

impl TickCounter {
    /// Advances one tick and returns the topics due, `ticker.1` first.
    fn advance(&mut self) -> Vec<&'static str> {
        self.monotonic += 1;
        self.tick += 1;

        let mut due = vec!["ticker.1"];
        due.extend(
            SCHEDULE
                .iter()
                .filter(|(divisor, _)| self.tick % divisor == 0)
                .map(|(_, topic)| *topic),
        );
        if self.tick == CYCLE {
            self.tick = 0;
        }
        due
    }
}

/// Ticker settings.
#[derive(Debug, Clone)]
pub struct Ticker {
    period: Duration,
}

impl Ticker {
    /// Creates a ticker with the default one-second period.
    #[must_use]
    pub fn new() -> Self {
        Self {
            period: DEFAULT_PERIOD,
        }
    }

    /// Sets the time between ticks.
    ///
    /// A zero period is raised to one millisecond.
    #[must_use]
    pub fn with_period(mut self, period: Duration) -> Self {
        self.period = period.max(Duration::from_millis(1));
        self
    }

    /// Returns the time between ticks.
    #[must_use]
    pub fn period(&self) -> Duration {
        self.period
    }

    /// Starts publishing on `bus` from a background task.
    ///
    /// The task holds only a weak reference and ends once the bus is
    /// dropped. Publish errors are logged and do not stop the ticker.
    ///
    /// Must be called from within a tokio runtime.
    pub fn spawn<T>(self, bus: &Arc<PubSub<T>>) -> TickerHandle
    where
        T: From<Tick> + Send + Sync + 'static,
    {
        let bus = Arc::downgrade(bus);
        tracing::debug!(period = ?self.period, "Starting ticker");
        let task = tokio::spawn(run(self.period, bus));
        TickerHandle { task }
    }
}

impl Default for Ticker {
    fn default() -> Self {
        Self::new()
    }
}

/// Ticker loop.
async fn run<T>(period: Duration, bus: Weak<PubSub<T>>)
where
    T: From<Tick> + Send + Sync + 'static,
{
    let mut interval = tokio::time::interval(period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
    // The first tick completes immediately.
    interval.tick().await;

    let mut counter = TickCounter::default();
    loop {
        interval.tick().await;

        let Some(bus) = bus.upgrade() else {
            tracing::debug!("Bus dropped, stopping ticker");
            return;
        };

        let due = counter.advance();
        let data = T::from(Tick {
            monotonic: counter.monotonic,
            at: Utc::now(),
        });
        for topic in due {
            if let Err(err) = bus.publish(topic, &data) {
                tracing::warn!(topic = %topic, error = %err, "Ticker publish failed");
            }
        }
    }
}

/// Handle to a running ticker. Dropping it stops the ticker.
#[derive(Debug)]
pub struct TickerHandle {
    task: JoinHandle<()>,
}

impl TickerHandle {
    /// Stops the ticker.
    pub fn stop(self) {
        self.task.abort();
    }

    /// Returns `true` if the ticker task has ended.
    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }
}

impl Drop for TickerHandle {
    fn drop(&mut self) {
        self.task.abort();
    }
}
