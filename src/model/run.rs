// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Glassbowl-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Glassbowl and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

use serde::Deserialize;

use super::ids::{RunId, StepId};

/// One workflow run as stored in the `runs` table.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Run {
    pub id: RunId,
    #[serde(default)]
    pub workflow_id: Option<String>,
    #[serde(default)]
    pub task: Option<String>,
    pub status: RunStatus,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub updated_at: Option<String>,
}

impl Run {
    /// Short label for panel titles: workflow id, falling back to the run id.
    pub fn title(&self) -> &str {
        self.workflow_id.as_deref().unwrap_or(self.id.as_str())
    }
}

/// One step of a run as stored in the `steps` table.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Step {
    pub id: StepId,
    pub run_id: RunId,
    #[serde(default)]
    pub step_id: String,
    #[serde(default)]
    pub agent_id: Option<String>,
    pub status: StepStatus,
    #[serde(default)]
    pub step_index: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(from = "String")]
pub enum RunStatus {
    Running,
    Completed,
    Failed,
    Other(String),
}

impl From<String> for RunStatus {
    fn from(value: String) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "running" => Self::Running,
            "completed" | "done" => Self::Completed,
            "failed" | "error" => Self::Failed,
            _ => Self::Other(value),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(from = "String")]
pub enum StepStatus {
    Pending,
    Running,
    Done,
    Failed,
    Other(String),
}

impl From<String> for StepStatus {
    fn from(value: String) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "pending" | "waiting" | "queued" => Self::Pending,
            "running" | "in_progress" | "claimed" => Self::Running,
            "done" | "completed" | "succeeded" => Self::Done,
            "failed" | "error" => Self::Failed,
            _ => Self::Other(value),
        }
    }
}

impl StepStatus {
    pub fn glyph(&self) -> char {
        match self {
            Self::Pending => '○',
            Self::Running => '◐',
            Self::Done => '●',
            Self::Failed => '✖',
            Self::Other(_) => '·',
        }
    }
}
