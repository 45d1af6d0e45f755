// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Glassbowl-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Glassbowl and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

use std::collections::VecDeque;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use rusqlite::types::ValueRef;
use rusqlite::{Connection, OpenFlags};
use serde_json::Value;
use tempfile::TempPath;
use tracing::{debug, warn};

use super::{QueryStore, Record, Statement, StoreError};

/// Tables a downloaded snapshot must carry before it may replace the current store.
const REQUIRED_TABLES: [&str; 2] = ["runs", "steps"];

/// A SQLite connection over a private copy of a downloaded snapshot.
///
/// Field order matters: the connection is dropped before the snapshot file is unlinked.
#[derive(Debug)]
pub struct SqliteStore {
    conn: Connection,
    snapshot: Option<SnapshotFile>,
}

impl SqliteStore {
    /// Writes `payload` to a fresh file under `dir`, opens it and checks that it is a snapshot.
    ///
    /// SQLite reads lazily, so a payload that is not a database would otherwise open cleanly and
    /// only fail on the first query.
    pub fn from_snapshot(dir: &Path, payload: &[u8]) -> Result<Self, StoreError> {
        if payload.is_empty() {
            return Err(StoreError::EmptySnapshot);
        }

        fs::create_dir_all(dir).map_err(|source| StoreError::Io {
            path: dir.to_path_buf(),
            source,
        })?;

        let snapshot = SnapshotFile::write_in(dir, payload)?;

        let conn = Connection::open_with_flags(
            &snapshot.path,
            OpenFlags::SQLITE_OPEN_READ_WRITE | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )
        .map_err(|source| StoreError::Open {
            path: snapshot.path.to_path_buf(),
            source,
        })?;
        validate_snapshot(&conn, &snapshot.path)?;

        debug!(path = %snapshot.path.display(), bytes = payload.len(), "snapshot store opened");
        Ok(Self {
            conn,
            snapshot: Some(snapshot),
        })
    }

    pub fn open_in_memory() -> Result<Self, StoreError> {
        let conn = Connection::open_in_memory().map_err(|source| StoreError::Open {
            path: PathBuf::from(":memory:"),
            source,
        })?;
        Ok(Self {
            conn,
            snapshot: None,
        })
    }

    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    pub fn snapshot_path(&self) -> Option<&Path> {
        self.snapshot.as_ref().map(|snapshot| &*snapshot.path)
    }
}

impl QueryStore for SqliteStore {
    type Statement<'a> = SqliteStatement<'a>;

    fn prepare(&self, sql: &str) -> Result<Self::Statement<'_>, StoreError> {
        let stmt = self.conn.prepare(sql).map_err(|source| StoreError::Prepare {
            sql: sql.to_owned(),
            source,
        })?;
        let columns = stmt.column_names().into_iter().map(str::to_owned).collect();
        Ok(SqliteStatement {
            stmt,
            columns,
            pending: None,
        })
    }

    fn close(self) -> Result<(), StoreError> {
        let Self { conn, snapshot } = self;
        let result = conn.close().map_err(|(_, source)| StoreError::Close { source });
        drop(snapshot);
        result
    }
}

pub struct SqliteStatement<'conn> {
    stmt: rusqlite::Statement<'conn>,
    columns: Vec<String>,
    pending: Option<VecDeque<Record>>,
}

impl Statement for SqliteStatement<'_> {
    fn bind(&mut self, params: &[&str]) -> Result<(), StoreError> {
        let expected = self.stmt.parameter_count();
        if params.len() != expected {
            return Err(StoreError::ParameterCount {
                expected,
                actual: params.len(),
            });
        }

        for (idx, param) in params.iter().enumerate() {
            self.stmt
                .raw_bind_parameter(idx + 1, *param)
                .map_err(|source| StoreError::Bind {
                    index: idx + 1,
                    source,
                })?;
        }
        Ok(())
    }

    fn step(&mut self) -> Result<Option<Record>, StoreError> {
        if self.pending.is_none() {
            // rusqlite resets a statement when its row cursor drops, so the whole result set is
            // read once and handed out row by row.
            let mut buffered = VecDeque::new();
            let mut rows = self.stmt.raw_query();
            while let Some(row) = rows.next().map_err(|source| StoreError::Step { source })? {
                let mut record = Record::new();
                for (idx, name) in self.columns.iter().enumerate() {
                    let value = row.get_ref(idx).map_err(|source| StoreError::Step { source })?;
                    record.insert(name.clone(), value_to_json(value));
                }
                buffered.push_back(record);
            }
            self.pending = Some(buffered);
        }

        Ok(self.pending.as_mut().and_then(VecDeque::pop_front))
    }

    fn free(self) -> Result<(), StoreError> {
        self.stmt
            .finalize()
            .map_err(|source| StoreError::Finalize { source })
    }
}

fn value_to_json(value: ValueRef<'_>) -> Value {
    match value {
        ValueRef::Null => Value::Null,
        ValueRef::Integer(value) => Value::from(value),
        ValueRef::Real(value) => serde_json::Number::from_f64(value).map_or(Value::Null, Value::Number),
        ValueRef::Text(bytes) => Value::String(String::from_utf8_lossy(bytes).into_owned()),
        ValueRef::Blob(bytes) => Value::String(BASE64.encode(bytes)),
    }
}

fn validate_snapshot(conn: &Connection, path: &Path) -> Result<(), StoreError> {
    let open_error = |source: rusqlite::Error| StoreError::Open {
        path: path.to_path_buf(),
        source,
    };

    let integrity: String = conn
        .query_row("PRAGMA quick_check", [], |row| row.get(0))
        .map_err(open_error)?;
    if integrity != "ok" {
        return Err(StoreError::InvalidSnapshot {
            path: path.to_path_buf(),
            reason: integrity,
        });
    }

    for table in REQUIRED_TABLES {
        let present: bool = conn
            .query_row(
                "SELECT EXISTS (SELECT 1 FROM sqlite_master WHERE type = 'table' AND name = ?1)",
                [table],
                |row| row.get(0),
            )
            .map_err(open_error)?;
        if !present {
            return Err(StoreError::InvalidSnapshot {
                path: path.to_path_buf(),
                reason: format!("missing table `{table}`"),
            });
        }
    }
    Ok(())
}

/// The on-disk copy of a snapshot, created exclusively with owner-only permissions.
#[derive(Debug)]
struct SnapshotFile {
    path: TempPath,
}

impl SnapshotFile {
    fn write_in(dir: &Path, payload: &[u8]) -> Result<Self, StoreError> {
        let io_error = |source: std::io::Error| StoreError::Io {
            path: dir.to_path_buf(),
            source,
        };
        let mut file = tempfile::Builder::new()
            .prefix("glassbowl-snapshot-")
            .suffix(".sqlite")
            .tempfile_in(dir)
            .map_err(io_error)?;
        file.write_all(payload).map_err(io_error)?;
        file.flush().map_err(io_error)?;
        Ok(Self {
            path: file.into_temp_path(),
        })
    }
}

// The snapshot itself goes with `TempPath`; SQLite may leave siblings next to it.
impl Drop for SnapshotFile {
    fn drop(&mut self) {
        for suffix in ["-journal", "-wal", "-shm"] {
            let mut path = self.path.as_os_str().to_owned();
            path.push(suffix);
            let path = PathBuf::from(path);
            match fs::remove_file(&path) {
                Ok(()) => {}
                Err(err) if err.kind() == std::io::ErrorKind::NotFound => {}
                Err(err) => warn!(path = %path.display(), %err, "cannot remove snapshot file"),
            }
        }
    }
}
