// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Glassbowl-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Glassbowl and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

//! Cancellable timer tasks.
//!
//! Timers never touch controller state. They send [`Command`]s tagged with their [`TimerId`];
//! the controller drops any message whose id is not the one it currently holds.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use tokio::sync::mpsc::UnboundedSender;
use tokio::task::AbortHandle;
use tokio::time::{self, Instant, MissedTickBehavior};

use super::Command;

static NEXT_TIMER_ID: AtomicU64 = AtomicU64::new(1);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TimerId(u64);

impl TimerId {
    fn next() -> Self {
        Self(NEXT_TIMER_ID.fetch_add(1, Ordering::Relaxed))
    }
}

/// Owning handle to a spawned timer task; dropping it cancels the task.
#[derive(Debug)]
pub struct TimerHandle {
    id: TimerId,
    task: AbortHandle,
}

impl TimerHandle {
    pub fn id(&self) -> TimerId {
        self.id
    }

    /// Aborts the task; ticks it already queued are dropped by id.
    pub fn cancel(self) {
        self.task.abort();
    }
}

impl Drop for TimerHandle {
    fn drop(&mut self) {
        self.task.abort();
    }
}

/// Sends `RefreshTick` every `period`, first one period from now.
pub fn spawn_interval(period: Duration, tx: UnboundedSender<Command>) -> TimerHandle {
    let id = TimerId::next();
    let task = tokio::spawn(async move {
        let mut ticker = time::interval_at(Instant::now() + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        loop {
            ticker.tick().await;
            if tx.send(Command::RefreshTick(id)).is_err() {
                break;
            }
        }
    });
    TimerHandle {
        id,
        task: task.abort_handle(),
    }
}

/// Sends one `CountdownTick` per second with the seconds left, ending with `remaining: 0`.
pub fn spawn_countdown(secs: u64, tx: UnboundedSender<Command>) -> TimerHandle {
    let id = TimerId::next();
    let task = tokio::spawn(async move {
        let start = Instant::now();
        for elapsed in 1..=secs.max(1) {
            time::sleep_until(start + Duration::from_secs(elapsed)).await;
            let remaining = secs.saturating_sub(elapsed);
            if tx
                .send(Command::CountdownTick {
                    timer: id,
                    remaining,
                })
                .is_err()
            {
                break;
            }
        }
    });
    TimerHandle {
        id,
        task: task.abort_handle(),
    }
}
