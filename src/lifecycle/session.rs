// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Glassbowl-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Glassbowl and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

use chrono::{DateTime, Utc};

use super::backend::ListenerId;
use super::timer::TimerHandle;

/// Live handles of the current generation plus escalation state.
///
/// Handles are either all absent or belong to one generation. `retry_count` and
/// `last_successful_load` outlive teardown.
#[derive(Debug)]
pub struct Session<St, Su> {
    pub generation: u64,
    pub store: Option<St>,
    pub surface: Option<Su>,
    pub refresh_timer: Option<TimerHandle>,
    pub resize_listener: Option<ListenerId>,
    pub retry_timer: Option<TimerHandle>,
    pub retry_count: u32,
    pub last_successful_load: Option<DateTime<Utc>>,
}

impl<St, Su> Default for Session<St, Su> {
    fn default() -> Self {
        Self {
            generation: 0,
            store: None,
            surface: None,
            refresh_timer: None,
            resize_listener: None,
            retry_timer: None,
            retry_count: 0,
            last_successful_load: None,
        }
    }
}

impl<St, Su> Session<St, Su> {
    /// A store and a surface are both held.
    pub fn is_live(&self) -> bool {
        self.store.is_some() && self.surface.is_some()
    }

    pub fn is_torn_down(&self) -> bool {
        self.store.is_none()
            && self.surface.is_none()
            && self.refresh_timer.is_none()
            && self.resize_listener.is_none()
            && self.retry_timer.is_none()
    }
}
