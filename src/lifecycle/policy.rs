// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Glassbowl-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Glassbowl and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

use std::fmt;
use std::time::Duration;

pub const MAX_RETRIES: u32 = 3;
pub const RETRY_DELAYS: [Duration; 3] = [
    Duration::from_millis(1000),
    Duration::from_millis(2000),
    Duration::from_millis(4000),
];

/// Retry budget and backoff table shared by the fetch loop and the init escalation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    max_retries: u32,
    delays: Vec<Duration>,
}

impl RetryPolicy {
    /// `delays` must cover every gap between `max_retries + 1` attempts.
    pub fn new(max_retries: u32, delays: Vec<Duration>) -> Result<Self, PolicyError> {
        if delays.is_empty() {
            return Err(PolicyError::NoDelays);
        }
        if delays.len() < max_retries as usize {
            return Err(PolicyError::TooFewDelays {
                max_retries,
                delays: delays.len(),
            });
        }
        Ok(Self {
            max_retries,
            delays,
        })
    }

    pub fn max_retries(&self) -> u32 {
        self.max_retries
    }

    pub fn delays(&self) -> &[Duration] {
        &self.delays
    }

    /// Delay after the `idx`-th failure (0-based). Past the end of the table the last entry repeats.
    pub fn delay(&self, idx: usize) -> Duration {
        let idx = idx.min(self.delays.len().saturating_sub(1));
        self.delays.get(idx).copied().unwrap_or_default()
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: MAX_RETRIES,
            delays: RETRY_DELAYS.to_vec(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PolicyError {
    NoDelays,
    TooFewDelays { max_retries: u32, delays: usize },
}

impl fmt::Display for PolicyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoDelays => f.write_str("retry policy needs at least one delay"),
            Self::TooFewDelays {
                max_retries,
                delays,
            } => write!(
                f,
                "retry policy with {max_retries} retries needs {max_retries} delays, got {delays}"
            ),
        }
    }
}

impl std::error::Error for PolicyError {}
