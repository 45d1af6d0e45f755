// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Glassbowl-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Glassbowl and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

//! Read-only queries over the snapshot store.
//!
//! Every query runs through [`ScopedStatement`], which owns one prepared statement from
//! acquisition until release. Release happens exactly once on every exit path: explicitly on
//! success, from `Drop` when binding or stepping bails out early.

use std::fmt;

use serde_json::Value;
use tracing::warn;

use crate::model::{Run, RunId, Step};
use crate::store::{QueryStore, Record, Statement, StoreError};


/// Tables and columns the dashboard reads from an orchestrator snapshot.
pub const SNAPSHOT_SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS runs (
    id TEXT PRIMARY KEY,
    workflow_id TEXT,
    task TEXT,
    status TEXT NOT NULL,
    created_at TEXT,
    updated_at TEXT
);
CREATE TABLE IF NOT EXISTS steps (
    id TEXT PRIMARY KEY,
    run_id TEXT NOT NULL,
    step_id TEXT,
    agent_id TEXT,
    status TEXT NOT NULL,
    step_index INTEGER NOT NULL DEFAULT 0
);
";

pub const ACTIVE_RUNS_SQL: &str = "SELECT id, workflow_id, task, status, created_at, updated_at \
     FROM runs WHERE status = 'running' ORDER BY created_at DESC, id ASC";

pub const STEPS_FOR_RUN_SQL: &str = "SELECT id, run_id, step_id, agent_id, status, step_index \
     FROM steps WHERE run_id = ?1 ORDER BY step_index ASC, id ASC";

/// Exclusive owner of one prepared statement.
pub struct ScopedStatement<'s, S: QueryStore + 's> {
    inner: Option<S::Statement<'s>>,
}

impl<'s, S: QueryStore + 's> ScopedStatement<'s, S> {
    /// Prepares `sql`. A failed prepare yields no guard, so nothing is ever released for it.
    pub fn acquire(store: &'s S, sql: &str) -> Result<Self, StoreError> {
        let inner = store.prepare(sql)?;
        Ok(Self { inner: Some(inner) })
    }

    pub fn bind(&mut self, params: &[&str]) -> Result<(), StoreError> {
        match self.inner.as_mut() {
            Some(stmt) => stmt.bind(params),
            None => Ok(()),
        }
    }

    pub fn step(&mut self) -> Result<Option<Record>, StoreError> {
        match self.inner.as_mut() {
            Some(stmt) => stmt.step(),
            None => Ok(None),
        }
    }

    /// Frees the statement and reports the outcome.
    pub fn release(mut self) -> Result<(), StoreError> {
        self.free_inner()
    }

    fn free_inner(&mut self) -> Result<(), StoreError> {
        match self.inner.take() {
            Some(stmt) => stmt.free(),
            None => Ok(()),
        }
    }
}

impl<'s, S: QueryStore + 's> Drop for ScopedStatement<'s, S> {
    fn drop(&mut self) {
        if let Err(err) = self.free_inner() {
            warn!(%err, "prepared statement release failed");
        }
    }
}

/// Runs one query and collects its rows in result order.
pub fn query_records<S: QueryStore>(
    store: &S,
    sql: &str,
    params: &[&str],
) -> Result<Vec<Record>, StoreError> {
    let mut stmt = ScopedStatement::acquire(store, sql)?;
    stmt.bind(params)?;

    let mut records = Vec::new();
    while let Some(record) = stmt.step()? {
        records.push(record);
    }

    stmt.release()?;
    Ok(records)
}

/// All runs currently in the `running` state, newest first.
pub fn active_runs<S: QueryStore>(store: &S) -> Result<Vec<Run>, QueryError> {
    let records = query_records(store, ACTIVE_RUNS_SQL, &[])?;
    decode_records(records, "run")
}

/// All steps of `run_id`, in step order.
pub fn steps_for_run<S: QueryStore>(store: &S, run_id: &RunId) -> Result<Vec<Step>, QueryError> {
    let records = query_records(store, STEPS_FOR_RUN_SQL, &[run_id.as_str()])?;
    decode_records(records, "step")
}

fn decode_records<T: serde::de::DeserializeOwned>(
    records: Vec<Record>,
    entity: &'static str,
) -> Result<Vec<T>, QueryError> {
    records
        .into_iter()
        .map(|record| {
            serde_json::from_value(Value::Object(record))
                .map_err(|source| QueryError::Decode { entity, source })
        })
        .collect()
}

#[derive(Debug)]
pub enum QueryError {
    Store(StoreError),
    Decode {
        entity: &'static str,
        source: serde_json::Error,
    },
}

impl From<StoreError> for QueryError {
    fn from(value: StoreError) -> Self {
        Self::Store(value)
    }
}

impl fmt::Display for QueryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Store(source) => write!(f, "store query failed: {source}"),
            Self::Decode { entity, source } => write!(f, "cannot decode {entity} row: {source}"),
        }
    }
}

impl std::error::Error for QueryError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Store(source) => Some(source),
            Self::Decode { source, .. } => Some(source),
        }
    }
}
