// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Glassbowl-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Glassbowl and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

// Shared deterministic benchmark fixtures (no RNG).

use glassbowl::query::SNAPSHOT_SCHEMA;
use rusqlite::{params, Connection};

#[derive(Debug, Clone, Copy)]
pub enum Case {
    /// 4 running runs with 6 steps each.
    Small,
    /// 40 running runs with 12 steps each, plus 200 finished runs.
    Medium,
}

impl Case {
    fn shape(self) -> (usize, usize, usize) {
        match self {
            Self::Small => (4, 6, 0),
            Self::Medium => (40, 12, 200),
        }
    }
}

const STEP_STATUSES: [&str; 4] = ["done", "done", "running", "pending"];

/// Serialized SQLite snapshot bytes for `case`.
pub fn snapshot(case: Case) -> Vec<u8> {
    let (running, steps, finished) = case.shape();
    let dir = tempfile::tempdir().expect("temp dir");
    let path = dir.path().join("fixture.sqlite");

    {
        let mut conn = Connection::open(&path).expect("open fixture");
        conn.execute_batch(SNAPSHOT_SCHEMA).expect("schema");
        let tx = conn.transaction().expect("transaction");
        for run in 0..running + finished {
            let run_id = format!("run-{run:04}");
            let status = if run < running { "running" } else { "completed" };
            tx.execute(
                "INSERT INTO runs (id, workflow_id, task, status, created_at, updated_at)
                 VALUES (?1, ?2, 'bench task', ?3, ?4, ?4)",
                params![
                    run_id,
                    format!("workflow-{}", run % 7),
                    status,
                    format!("2026-01-01T00:{:02}:{:02}Z", run / 60 % 60, run % 60)
                ],
            )
            .expect("insert run");
            for step in 0..steps {
                tx.execute(
                    "INSERT INTO steps (id, run_id, step_id, agent_id, status, step_index)
                     VALUES (?1, ?2, ?3, 'agent', ?4, ?5)",
                    params![
                        format!("{run_id}:{step}"),
                        run_id,
                        format!("step-{step}"),
                        STEP_STATUSES[step % STEP_STATUSES.len()],
                        step as i64
                    ],
                )
                .expect("insert step");
            }
        }
        tx.commit().expect("commit");
    }

    std::fs::read(&path).expect("read fixture")
}
