// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Glassbowl-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Glassbowl and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

use std::path::PathBuf;
use std::time::Duration;

use super::{FetchError, Fetcher};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Downloads the snapshot with a single HTTP GET.
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: reqwest::Client,
    url: String,
}

impl HttpFetcher {
    pub fn new(url: impl Into<String>) -> Self {
        Self::with_client(reqwest::Client::new(), url)
    }

    pub fn with_client(client: reqwest::Client, url: impl Into<String>) -> Self {
        Self {
            client,
            url: url.into(),
        }
    }
}

impl Fetcher for HttpFetcher {
    async fn fetch(&self) -> Result<Vec<u8>, FetchError> {
        let request_error = |source: reqwest::Error| FetchError::Request {
            url: self.url.clone(),
            source,
        };

        let response = self
            .client
            .get(&self.url)
            .timeout(REQUEST_TIMEOUT)
            .send()
            .await
            .map_err(request_error)?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                url: self.url.clone(),
                status: status.as_u16(),
            });
        }

        let body = response.bytes().await.map_err(request_error)?;
        Ok(body.to_vec())
    }

    fn resource(&self) -> &str {
        &self.url
    }
}

/// Reads a snapshot that is already on disk.
#[derive(Debug, Clone)]
pub struct FileFetcher {
    path: PathBuf,
    display: String,
}

impl FileFetcher {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let display = path.display().to_string();
        Self { path, display }
    }
}

impl Fetcher for FileFetcher {
    async fn fetch(&self) -> Result<Vec<u8>, FetchError> {
        tokio::fs::read(&self.path)
            .await
            .map_err(|source| FetchError::Io {
                path: self.path.clone(),
                source,
            })
    }

    fn resource(&self) -> &str {
        &self.display
    }
}

/// The configured snapshot source.
#[derive(Debug, Clone)]
pub enum SourceFetcher {
    Http(HttpFetcher),
    File(FileFetcher),
}

impl Fetcher for SourceFetcher {
    async fn fetch(&self) -> Result<Vec<u8>, FetchError> {
        match self {
            Self::Http(fetcher) => fetcher.fetch().await,
            Self::File(fetcher) => fetcher.fetch().await,
        }
    }

    fn resource(&self) -> &str {
        match self {
            Self::Http(fetcher) => fetcher.resource(),
            Self::File(fetcher) => fetcher.resource(),
        }
    }
}
