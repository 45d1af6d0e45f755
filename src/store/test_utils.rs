// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Glassbowl-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Glassbowl and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use super::{QueryStore, Record, SqliteStore, Statement, StoreError};
use crate::query::SNAPSHOT_SCHEMA;

/// Acquire/release bookkeeping shared between a tracked store and its statements.
#[derive(Debug, Default)]
pub(crate) struct StatementLedger {
    next_id: Cell<usize>,
    acquired: RefCell<Vec<usize>>,
    released: RefCell<Vec<usize>>,
    failed_acquires: Cell<usize>,
    closed: Cell<bool>,
}

impl StatementLedger {
    pub(crate) fn acquired(&self) -> usize {
        self.acquired.borrow().len()
    }

    pub(crate) fn released(&self) -> usize {
        self.released.borrow().len()
    }

    pub(crate) fn failed_acquires(&self) -> usize {
        self.failed_acquires.get()
    }

    pub(crate) fn closed(&self) -> bool {
        self.closed.get()
    }

    /// Every released id was acquired, and none was released twice.
    pub(crate) fn releases_are_sound(&self) -> bool {
        let acquired = self.acquired.borrow();
        let released = self.released.borrow();
        let mut seen = std::collections::BTreeSet::new();
        released
            .iter()
            .all(|id| acquired.contains(id) && seen.insert(*id))
    }
}

/// Wraps a store and records every acquisition and release on a shared ledger.
pub(crate) struct Tracked<S> {
    inner: S,
    ledger: Rc<StatementLedger>,
}

impl<S> Tracked<S> {
    pub(crate) fn new(inner: S, ledger: Rc<StatementLedger>) -> Self {
        Self { inner, ledger }
    }

    pub(crate) fn inner(&self) -> &S {
        &self.inner
    }
}

pub(crate) struct TrackedStatement<'a, St> {
    inner: St,
    id: usize,
    ledger: &'a StatementLedger,
}

impl<S: QueryStore> QueryStore for Tracked<S> {
    type Statement<'a> = TrackedStatement<'a, S::Statement<'a>> where Self: 'a;

    fn prepare(&self, sql: &str) -> Result<Self::Statement<'_>, StoreError> {
        match self.inner.prepare(sql) {
            Ok(inner) => {
                let id = self.ledger.next_id.get();
                self.ledger.next_id.set(id + 1);
                self.ledger.acquired.borrow_mut().push(id);
                Ok(TrackedStatement {
                    inner,
                    id,
                    ledger: &self.ledger,
                })
            }
            Err(err) => {
                self.ledger
                    .failed_acquires
                    .set(self.ledger.failed_acquires.get() + 1);
                Err(err)
            }
        }
    }

    fn close(self) -> Result<(), StoreError> {
        self.ledger.closed.set(true);
        self.inner.close()
    }
}

impl<St: Statement> Statement for TrackedStatement<'_, St> {
    fn bind(&mut self, params: &[&str]) -> Result<(), StoreError> {
        self.inner.bind(params)
    }

    fn step(&mut self) -> Result<Option<Record>, StoreError> {
        self.inner.step()
    }

    fn free(self) -> Result<(), StoreError> {
        self.ledger.released.borrow_mut().push(self.id);
        self.inner.free()
    }
}

/// An in-memory store with the snapshot schema and no rows.
pub(crate) fn empty_snapshot_store() -> SqliteStore {
    let store = SqliteStore::open_in_memory().expect("in-memory store");
    store
        .connection()
        .execute_batch(SNAPSHOT_SCHEMA)
        .expect("snapshot schema");
    store
}

pub(crate) fn insert_run(store: &SqliteStore, id: &str, workflow_id: &str, status: &str) {
    store
        .connection()
        .execute(
            "INSERT INTO runs (id, workflow_id, task, status, created_at, updated_at)
             VALUES (?1, ?2, 'task', ?3, datetime('now'), datetime('now'))",
            [id, workflow_id, status],
        )
        .expect("insert run");
}

pub(crate) fn insert_step(store: &SqliteStore, run_id: &str, step_id: &str, status: &str, index: i64) {
    store
        .connection()
        .execute(
            "INSERT INTO steps (id, run_id, step_id, agent_id, status, step_index)
             VALUES (?1, ?2, ?3, 'agent', ?4, ?5)",
            rusqlite::params![format!("{run_id}:{step_id}"), run_id, step_id, status, index],
        )
        .expect("insert step");
}

/// Serialized snapshot bytes with the given running runs and no steps.
pub(crate) fn snapshot_payload(running: &[&str]) -> Vec<u8> {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("source.sqlite");
    let conn = rusqlite::Connection::open(&path).expect("open source");
    conn.execute_batch(SNAPSHOT_SCHEMA).expect("snapshot schema");
    for id in running {
        conn.execute(
            "INSERT INTO runs (id, workflow_id, task, status, created_at)
             VALUES (?1, 'feature-dev', 'task', 'running', datetime('now'))",
            [id],
        )
        .expect("insert run");
    }
    drop(conn);
    std::fs::read(&path).expect("read snapshot")
}
