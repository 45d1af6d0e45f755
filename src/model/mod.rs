// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Glassbowl-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Glassbowl and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

//! Typed rows decoded from the orchestrator snapshot.
//!
//! Runs and their steps are the only entities the dashboard reads.

pub mod ids;
pub mod run;

pub use ids::{Id, IdError, RunId, StepId};
pub use run::{Run, RunStatus, Step, StepStatus};
