// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Glassbowl-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Glassbowl and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

use std::time::Duration;

use super::RetryPolicy;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Escalation {
    /// Schedule automatic attempt `attempt` (1-based) after `delay`.
    Retry { attempt: u32, delay: Duration },
    GiveUp,
}

/// Decides what follows the `retry_count`-th consecutive failed initialize.
pub fn classify(retry_count: u32, policy: &RetryPolicy) -> Escalation {
    if retry_count == 0 || retry_count > policy.max_retries() {
        return Escalation::GiveUp;
    }
    Escalation::Retry {
        attempt: retry_count,
        delay: policy.delay(retry_count as usize - 1),
    }
}

/// Whole seconds shown by the countdown for `delay`, rounded up.
pub fn countdown_secs(delay: Duration) -> u64 {
    let secs = delay.as_secs();
    if delay.subsec_nanos() > 0 {
        secs + 1
    } else {
        secs
    }
}
