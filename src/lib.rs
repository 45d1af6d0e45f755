// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Glassbowl-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Glassbowl and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

//! Glassbowl: a live terminal dashboard over an orchestrator's SQLite snapshot.
//!
//! The crate is organised bottom-up: [`store`] opens snapshots, [`query`] runs scoped statements
//! over them, [`fetch`] downloads them with bounded retries, [`render`] turns query results into a
//! retained scene, [`lifecycle`] owns the init/teardown/refresh state machine, and [`tui`] hosts it
//! all in a terminal.

pub mod config;
pub mod fetch;
pub mod lifecycle;
pub mod model;
pub mod query;
pub mod render;
pub mod store;
pub mod tui;
