// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Glassbowl-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Glassbowl and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

use std::time::Duration;

use chrono::{DateTime, SecondsFormat, Utc};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Visibility {
    #[default]
    Visible,
    Hidden,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Phase {
    #[default]
    Idle,
    Initializing,
    Ready,
    Retrying {
        attempt: u32,
        max_retries: u32,
        delay: Duration,
        remaining_secs: u64,
    },
    PermanentFailure,
}

impl Phase {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Initializing => "initializing",
            Self::Ready => "ready",
            Self::Retrying { .. } => "retrying",
            Self::PermanentFailure => "failed",
        }
    }
}

/// What the host shows about the lifecycle: phase, last error and last good load.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Status {
    pub phase: Phase,
    pub error: Option<String>,
    pub last_successful_load: Option<DateTime<Utc>>,
}

impl Status {
    /// One-line summary for the status bar.
    pub fn message(&self) -> String {
        let mut message = match &self.phase {
            Phase::Idle => "idle".to_owned(),
            Phase::Initializing => "loading snapshot…".to_owned(),
            Phase::Ready => "live".to_owned(),
            Phase::Retrying {
                attempt,
                max_retries,
                remaining_secs,
                ..
            } => format!("retrying in {remaining_secs}s (attempt {attempt}/{max_retries})"),
            Phase::PermanentFailure => "unavailable, press r to retry now".to_owned(),
        };

        if let Some(error) = self.error.as_deref() {
            if !matches!(self.phase, Phase::Ready | Phase::Idle) {
                message.push_str(": ");
                message.push_str(error);
            }
        }

        if let Some(at) = self.last_successful_load {
            message.push_str(" | last load ");
            message.push_str(&at.to_rfc3339_opts(SecondsFormat::Secs, true));
        }

        message
    }
}
