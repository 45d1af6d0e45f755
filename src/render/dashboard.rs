// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Glassbowl-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Glassbowl and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

use tracing::warn;

use crate::model::{Run, Step, StepStatus};
use crate::query::{active_runs, steps_for_run};
use crate::store::QueryStore;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunView {
    pub run: Run,
    pub steps: Vec<Step>,
}

impl RunView {
    pub fn done_steps(&self) -> usize {
        self.steps
            .iter()
            .filter(|step| step.status == StepStatus::Done)
            .count()
    }
}

/// Everything one frame shows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Dashboard {
    Runs(Vec<RunView>),
    NoData,
    /// A query failed; the previous frame is replaced with this notice.
    Unavailable { reason: String },
}

/// Queries active runs and their steps. Query failures degrade to [`Dashboard::Unavailable`].
pub fn load_dashboard<S: QueryStore>(store: &S) -> Dashboard {
    let runs = match active_runs(store) {
        Ok(runs) => runs,
        Err(err) => {
            warn!(%err, "active runs query failed");
            return Dashboard::Unavailable {
                reason: err.to_string(),
            };
        }
    };

    if runs.is_empty() {
        return Dashboard::NoData;
    }

    let mut views = Vec::with_capacity(runs.len());
    for run in runs {
        match steps_for_run(store, &run.id) {
            Ok(steps) => views.push(RunView { run, steps }),
            Err(err) => {
                warn!(run = %run.id, %err, "steps query failed");
                return Dashboard::Unavailable {
                    reason: err.to_string(),
                };
            }
        }
    }
    Dashboard::Runs(views)
}

#[cfg(test)]
mod tests {
    use std::rc::Rc;

    use super::{load_dashboard, Dashboard};
    use crate::store::test_utils::{
        empty_snapshot_store, insert_run, insert_step, StatementLedger, Tracked,
    };
    use crate::store::SqliteStore;

    #[test]
    fn empty_store_is_no_data() {
        assert_eq!(load_dashboard(&empty_snapshot_store()), Dashboard::NoData);
    }

    #[test]
    fn runs_carry_their_steps() {
        let store = empty_snapshot_store();
        insert_run(&store, "run-1", "feature-dev", "running");
        insert_step(&store, "run-1", "plan", "done", 0);
        insert_step(&store, "run-1", "code", "running", 1);

        let Dashboard::Runs(views) = load_dashboard(&store) else {
            panic!("expected runs");
        };
        assert_eq!(views.len(), 1);
        assert_eq!(views[0].steps.len(), 2);
        assert_eq!(views[0].done_steps(), 1);
    }

    #[test]
    fn missing_schema_degrades_to_unavailable_without_leaking() {
        let ledger = Rc::new(StatementLedger::default());
        let store = Tracked::new(SqliteStore::open_in_memory().unwrap(), ledger.clone());

        let dashboard = load_dashboard(&store);

        assert!(matches!(dashboard, Dashboard::Unavailable { .. }));
        assert_eq!(ledger.failed_acquires(), 1);
        assert_eq!(ledger.acquired(), ledger.released());
    }
}
