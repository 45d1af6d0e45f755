// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Glassbowl-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Glassbowl and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

//! Glassbowl CLI entrypoint.
//!
//! Runs the live dashboard against the snapshot endpoint (or a local snapshot file).

use std::error::Error;
use std::fs::File;
use std::path::Path;
use std::sync::Mutex;

use glassbowl::config::{parse_options, Config, DEFAULT_URL};
use tracing_subscriber::EnvFilter;

fn print_usage(program: &str) {
    eprintln!(
        "Usage:\n  {program} [--url <url> | --file <path>] [--refresh-secs <n>] [--no-reload] [--cache-dir <dir>] [--log-file <path>]\n  {program} --help\n\nDownloads the orchestrator snapshot (default {DEFAULT_URL}) and renders the active runs.\n--file reads a local snapshot instead and cannot be combined with --url.\n--refresh-secs sets the refresh period (default 5). --no-reload re-renders without re-downloading.\n--log-file enables tracing output (filter with RUST_LOG, default info).\n\nEnvironment: GLASSBOWL_URL, GLASSBOWL_REFRESH_SECS, GLASSBOWL_PALETTE (fg,bg,accent,ok,warn,error).\nKeys: r retry now, q/Esc/Ctrl-C quit."
    );
}

fn init_logging(path: &Path) -> Result<(), Box<dyn Error>> {
    let file = File::create(path)?;
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .try_init()
        .map_err(|err| err as Box<dyn Error>)?;
    Ok(())
}

fn main() {
    let result = (|| -> Result<(), Box<dyn Error>> {
        let mut args = std::env::args();
        let program = args.next().unwrap_or_else(|| "glassbowl".to_owned());

        let options = match parse_options(args) {
            Ok(options) if options.help => {
                print_usage(&program);
                return Ok(());
            }
            Ok(options) => options,
            Err(()) => {
                print_usage(&program);
                std::process::exit(2);
            }
        };

        let config = Config::from_env(options)?;
        if let Some(path) = config.log_file.as_deref() {
            init_logging(path)?;
        }

        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()?;
        runtime.block_on(glassbowl::tui::run(config))?;
        Ok(())
    })();

    if let Err(err) = result {
        eprintln!("glassbowl: {err}");
        std::process::exit(1);
    }
}
