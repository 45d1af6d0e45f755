// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Glassbowl-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Glassbowl and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

//! Embedded store access.
//!
//! The store module exposes the prepare → bind → step → free primitives the query layer drives,
//! plus the SQLite implementation that opens a downloaded orchestrator snapshot.

use std::fmt;
use std::io;
use std::path::PathBuf;

pub mod sqlite;
#[cfg(test)]
pub(crate) mod test_utils;

pub use sqlite::{SqliteStatement, SqliteStore};

/// One result row: column name to value, in column order.
pub type Record = serde_json::Map<String, serde_json::Value>;

/// A store that hands out prepared statements.
pub trait QueryStore {
    type Statement<'a>: Statement
    where
        Self: 'a;

    fn prepare(&self, sql: &str) -> Result<Self::Statement<'_>, StoreError>;

    /// Closes the underlying connection.
    fn close(self) -> Result<(), StoreError>
    where
        Self: Sized;
}

/// A prepared statement owned by exactly one query.
pub trait Statement {
    /// Binds positional text parameters, 1-based in SQL order.
    fn bind(&mut self, params: &[&str]) -> Result<(), StoreError>;

    /// Returns the next row, or `None` once the result set is exhausted.
    fn step(&mut self) -> Result<Option<Record>, StoreError>;

    /// Releases the statement.
    fn free(self) -> Result<(), StoreError>
    where
        Self: Sized;
}

#[derive(Debug)]
pub enum StoreError {
    Io {
        path: PathBuf,
        source: io::Error,
    },
    Open {
        path: PathBuf,
        source: rusqlite::Error,
    },
    Prepare {
        sql: String,
        source: rusqlite::Error,
    },
    ParameterCount {
        expected: usize,
        actual: usize,
    },
    Bind {
        index: usize,
        source: rusqlite::Error,
    },
    Step {
        source: rusqlite::Error,
    },
    Finalize {
        source: rusqlite::Error,
    },
    Close {
        source: rusqlite::Error,
    },
    EmptySnapshot,
    /// The payload opened as SQLite but is not a usable snapshot.
    InvalidSnapshot {
        path: PathBuf,
        reason: String,
    },
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io { path, source } => write!(f, "io error at {path:?}: {source}"),
            Self::Open { path, source } => {
                write!(f, "cannot open snapshot database {path:?}: {source}")
            }
            Self::Prepare { sql, source } => write!(f, "cannot prepare query {sql:?}: {source}"),
            Self::ParameterCount { expected, actual } => {
                write!(f, "query expects {expected} parameter(s), got {actual}")
            }
            Self::Bind { index, source } => {
                write!(f, "cannot bind query parameter {index}: {source}")
            }
            Self::Step { source } => write!(f, "cannot step query rows: {source}"),
            Self::Finalize { source } => write!(f, "cannot free prepared statement: {source}"),
            Self::Close { source } => write!(f, "cannot close snapshot database: {source}"),
            Self::EmptySnapshot => f.write_str("snapshot payload is empty"),
            Self::InvalidSnapshot { path, reason } => {
                write!(f, "invalid snapshot database {path:?}: {reason}")
            }
        }
    }
}

impl std::error::Error for StoreError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io { source, .. } => Some(source),
            Self::Open { source, .. } => Some(source),
            Self::Prepare { source, .. } => Some(source),
            Self::Bind { source, .. } => Some(source),
            Self::Step { source } => Some(source),
            Self::Finalize { source } => Some(source),
            Self::Close { source } => Some(source),
            Self::ParameterCount { .. } | Self::EmptySnapshot | Self::InvalidSnapshot { .. } => None,
        }
    }
}
