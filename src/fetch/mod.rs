// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Glassbowl-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Glassbowl and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

//! Snapshot download with a bounded retry schedule.
//!
//! [`resilient_fetch`] makes up to `max_retries + 1` attempts and sleeps the policy's fixed delay
//! between them. The last failure is returned to the caller; partial data never is.

use std::fmt;
use std::io;
use std::path::PathBuf;

use tracing::{debug, warn};

use crate::lifecycle::RetryPolicy;

pub mod source;

pub use source::{FileFetcher, HttpFetcher, SourceFetcher};

/// One attempt at reading the bootstrap payload.
#[allow(async_fn_in_trait)]
pub trait Fetcher {
    async fn fetch(&self) -> Result<Vec<u8>, FetchError>;

    /// Human-readable location, used in logs and status messages.
    fn resource(&self) -> &str;
}

pub async fn resilient_fetch<F: Fetcher + ?Sized>(
    fetcher: &F,
    policy: &RetryPolicy,
) -> Result<Vec<u8>, FetchError> {
    let attempts = policy.max_retries() + 1;

    for attempt in 0..attempts {
        match fetcher.fetch().await {
            Ok(payload) => {
                debug!(resource = fetcher.resource(), attempt, bytes = payload.len(), "fetch ok");
                return Ok(payload);
            }
            Err(err) if attempt + 1 == attempts => {
                warn!(resource = fetcher.resource(), attempts, %err, "fetch attempts exhausted");
                return Err(FetchError::Exhausted {
                    attempts,
                    source: Box::new(err),
                });
            }
            Err(err) => {
                let delay = policy.delay(attempt as usize);
                warn!(
                    resource = fetcher.resource(),
                    attempt,
                    delay_ms = delay.as_millis() as u64,
                    %err,
                    "fetch failed, backing off"
                );
                tokio::time::sleep(delay).await;
            }
        }
    }

    // Only reachable with a zero-attempt policy, which RetryPolicy rules out.
    Err(FetchError::Exhausted {
        attempts: 0,
        source: Box::new(FetchError::NoAttempts),
    })
}

#[derive(Debug)]
pub enum FetchError {
    Request {
        url: String,
        source: reqwest::Error,
    },
    Status {
        url: String,
        status: u16,
    },
    Io {
        path: PathBuf,
        source: io::Error,
    },
    Exhausted {
        attempts: u32,
        source: Box<FetchError>,
    },
    NoAttempts,
    /// Failure reported by a non-network source.
    Other(String),
}

impl fmt::Display for FetchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Request { url, source } => write!(f, "request to {url} failed: {source}"),
            Self::Status { url, status } => write!(f, "HTTP {status} from {url}"),
            Self::Io { path, source } => write!(f, "cannot read snapshot {path:?}: {source}"),
            Self::Exhausted { attempts, source } => {
                write!(f, "giving up after {attempts} attempt(s): {source}")
            }
            Self::NoAttempts => f.write_str("retry policy allows no attempts"),
            Self::Other(message) => f.write_str(message),
        }
    }
}

impl std::error::Error for FetchError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Request { source, .. } => Some(source),
            Self::Io { source, .. } => Some(source),
            Self::Exhausted { source, .. } => Some(source.as_ref()),
            Self::Status { .. } | Self::NoAttempts | Self::Other(_) => None,
        }
    }
}
