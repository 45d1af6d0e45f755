// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Glassbowl-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Glassbowl and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

//! Command line and environment configuration.
//!
//! Precedence is defaults, then `GLASSBOWL_*` environment variables, then flags.

use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use crate::fetch::{FileFetcher, HttpFetcher, SourceFetcher};
use crate::lifecycle::{LifecycleConfig, RetryPolicy, DEFAULT_REFRESH_INTERVAL};

pub const DEFAULT_URL: &str = "http://127.0.0.1:3333/api/db";

const URL_ENV: &str = "GLASSBOWL_URL";
const REFRESH_ENV: &str = "GLASSBOWL_REFRESH_SECS";

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct CliOptions {
    pub help: bool,
    pub url: Option<String>,
    pub file: Option<PathBuf>,
    pub refresh_secs: Option<u64>,
    pub no_reload: bool,
    pub cache_dir: Option<PathBuf>,
    pub log_file: Option<PathBuf>,
}

pub fn parse_options(mut args: impl Iterator<Item = String>) -> Result<CliOptions, ()> {
    let mut options = CliOptions::default();

    while let Some(arg) = args.next() {
        match arg.as_str() {
            "-h" | "--help" => options.help = true,
            "--url" => {
                if options.url.is_some() {
                    return Err(());
                }
                options.url = Some(args.next().ok_or(())?);
            }
            "--file" => {
                if options.file.is_some() {
                    return Err(());
                }
                options.file = Some(PathBuf::from(args.next().ok_or(())?));
            }
            "--refresh-secs" => {
                if options.refresh_secs.is_some() {
                    return Err(());
                }
                let raw = args.next().ok_or(())?;
                let secs: u64 = raw.parse().map_err(|_| ())?;
                if secs == 0 {
                    return Err(());
                }
                options.refresh_secs = Some(secs);
            }
            "--no-reload" => {
                if options.no_reload {
                    return Err(());
                }
                options.no_reload = true;
            }
            "--cache-dir" => {
                if options.cache_dir.is_some() {
                    return Err(());
                }
                options.cache_dir = Some(PathBuf::from(args.next().ok_or(())?));
            }
            "--log-file" => {
                if options.log_file.is_some() {
                    return Err(());
                }
                options.log_file = Some(PathBuf::from(args.next().ok_or(())?));
            }
            _ => return Err(()),
        }
    }

    if options.url.is_some() && options.file.is_some() {
        return Err(());
    }

    Ok(options)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Source {
    Url(String),
    File(PathBuf),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub source: Source,
    pub refresh_interval: Duration,
    pub reload_on_refresh: bool,
    pub cache_dir: PathBuf,
    pub log_file: Option<PathBuf>,
}

impl Config {
    pub fn from_env(options: CliOptions) -> Result<Self, ConfigError> {
        Self::resolve(options, |name| std::env::var(name).ok())
    }

    /// Merges `options` over the variables `env` yields.
    pub fn resolve(
        options: CliOptions,
        env: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, ConfigError> {
        let env_url = env(URL_ENV).filter(|value| !value.trim().is_empty());

        let env_refresh = match env(REFRESH_ENV) {
            Some(raw) if !raw.trim().is_empty() => match raw.trim().parse::<u64>() {
                Ok(secs) if secs > 0 => Some(secs),
                _ => {
                    return Err(ConfigError::InvalidEnv {
                        name: REFRESH_ENV,
                        value: raw,
                    })
                }
            },
            _ => None,
        };

        let source = match (options.file, options.url) {
            (Some(path), _) => Source::File(path),
            (None, Some(url)) => Source::Url(url),
            (None, None) => Source::Url(env_url.unwrap_or_else(|| DEFAULT_URL.to_owned())),
        };

        let refresh_interval = options
            .refresh_secs
            .or(env_refresh)
            .map_or(DEFAULT_REFRESH_INTERVAL, Duration::from_secs);

        Ok(Self {
            source,
            refresh_interval,
            reload_on_refresh: !options.no_reload,
            cache_dir: options
                .cache_dir
                .unwrap_or_else(|| std::env::temp_dir().join("glassbowl")),
            log_file: options.log_file,
        })
    }

    pub fn fetcher(&self) -> SourceFetcher {
        match &self.source {
            Source::Url(url) => SourceFetcher::Http(HttpFetcher::new(url.clone())),
            Source::File(path) => SourceFetcher::File(FileFetcher::new(path.clone())),
        }
    }

    pub fn lifecycle(&self) -> LifecycleConfig {
        LifecycleConfig {
            policy: RetryPolicy::default(),
            refresh_interval: self.refresh_interval,
            reload_on_refresh: self.reload_on_refresh,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    InvalidEnv { name: &'static str, value: String },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidEnv { name, value } => write!(f, "invalid env {name}={value}"),
        }
    }
}

impl std::error::Error for ConfigError {}
