// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Glassbowl-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Glassbowl and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

//! Initialization and resource lifecycle for the live dashboard.
//!
//! The [`Controller`] owns one [`Session`] at a time: the store opened from the bootstrap snapshot,
//! the render surface, the resize listener and the refresh/countdown timers. It is a
//! single-consumer actor. Timers and the host only send [`Command`]s; every state change happens
//! inside [`Controller::handle`], one command at a time.
//!
//! Failure handling is two-layered. Each `initialize` downloads the snapshot through
//! [`resilient_fetch`], and a failed `initialize` escalates through [`escalation::classify`] into a
//! visible countdown followed by another `initialize`, or into a permanent failure that only
//! [`Controller::manual_retry`] leaves.

use std::fmt;
use std::time::Duration;

use chrono::Utc;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tracing::{debug, info, trace, warn};

use crate::fetch::{resilient_fetch, FetchError, Fetcher};
use crate::render::{load_dashboard, DestroyOptions, RenderError, RenderSurface};
use crate::store::{QueryStore, StoreError};

pub mod backend;
pub mod escalation;
pub mod policy;
pub mod session;
pub mod status;
pub mod timer;

pub use backend::{Backend, ListenerId};
pub use escalation::{classify, Escalation};
pub use policy::{PolicyError, RetryPolicy, MAX_RETRIES, RETRY_DELAYS};
pub use session::Session;
pub use status::{Phase, Status, Visibility};
pub use timer::{TimerHandle, TimerId};

pub const DEFAULT_REFRESH_INTERVAL: Duration = Duration::from_secs(5);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LifecycleConfig {
    pub policy: RetryPolicy,
    /// Period of the refresh interval while ready and visible.
    pub refresh_interval: Duration,
    /// Re-download the snapshot on every refresh tick.
    pub reload_on_refresh: bool,
}

impl Default for LifecycleConfig {
    fn default() -> Self {
        Self {
            policy: RetryPolicy::default(),
            refresh_interval: DEFAULT_REFRESH_INTERVAL,
            reload_on_refresh: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Initialize,
    ManualRetry,
    RefreshTick(TimerId),
    CountdownTick { timer: TimerId, remaining: u64 },
    Resize { width: u16, height: u16 },
    Visibility(Visibility),
    Exit,
}

pub struct Controller<B: Backend, F: Fetcher> {
    backend: B,
    fetcher: F,
    config: LifecycleConfig,
    session: Session<B::Store, B::Surface>,
    status: Status,
    visibility: Visibility,
    exiting: bool,
    tx: UnboundedSender<Command>,
    rx: UnboundedReceiver<Command>,
}

impl<B: Backend, F: Fetcher> Controller<B, F> {
    pub fn new(backend: B, fetcher: F, config: LifecycleConfig) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        Self {
            backend,
            fetcher,
            config,
            session: Session::default(),
            status: Status::default(),
            visibility: Visibility::Visible,
            exiting: false,
            tx,
            rx,
        }
    }

    /// A handle for feeding commands from the host.
    pub fn sender(&self) -> UnboundedSender<Command> {
        self.tx.clone()
    }

    pub fn status(&self) -> &Status {
        &self.status
    }

    pub fn session(&self) -> &Session<B::Store, B::Surface> {
        &self.session
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn backend_mut(&mut self) -> &mut B {
        &mut self.backend
    }

    pub fn visibility(&self) -> Visibility {
        self.visibility
    }

    pub fn is_exiting(&self) -> bool {
        self.exiting
    }

    /// Next queued command. Never yields `None` while the controller is alive.
    pub async fn recv(&mut self) -> Option<Command> {
        self.rx.recv().await
    }

    /// Handles one queued command. Returns `false` once the controller has exited.
    pub async fn step(&mut self) -> bool {
        if let Some(command) = self.rx.recv().await {
            self.handle(command).await;
        }
        !self.exiting
    }

    pub async fn handle(&mut self, command: Command) {
        trace!(?command, "command");
        match command {
            Command::Initialize => self.initialize().await,
            Command::ManualRetry => self.manual_retry().await,
            Command::RefreshTick(timer) => self.on_refresh_tick(timer).await,
            Command::CountdownTick { timer, remaining } => {
                self.on_countdown_tick(timer, remaining).await
            }
            Command::Resize { width, height } => self.on_resize(width, height),
            Command::Visibility(visibility) => self.set_visibility(visibility),
            Command::Exit => {
                self.teardown();
                self.exiting = true;
            }
        }
    }

    /// Tears down the current generation and builds a fresh one.
    ///
    /// Errors never reach the caller: they are routed to [`Self::handle_init_error`].
    pub async fn initialize(&mut self) {
        self.teardown();
        self.session.generation += 1;
        let generation = self.session.generation;
        debug!(generation, resource = self.fetcher.resource(), "initializing");
        self.set_phase(Phase::Initializing);

        match self.build_generation().await {
            Ok(()) => {
                let now = Utc::now();
                self.session.retry_count = 0;
                self.session.last_successful_load = Some(now);
                self.status.last_successful_load = Some(now);
                self.status.error = None;
                info!(generation, "generation ready");
                self.set_phase(Phase::Ready);
                self.start_refresh();
            }
            Err(err) => {
                self.teardown();
                self.handle_init_error(err);
            }
        }
    }

    async fn build_generation(&mut self) -> Result<(), InitError> {
        let payload = resilient_fetch(&self.fetcher, &self.config.policy)
            .await
            .map_err(InitError::Fetch)?;

        let store = self.backend.open_store(&payload).map_err(InitError::Store)?;
        self.session.store = Some(store);

        let (width, height) = self.backend.viewport();
        let surface = self
            .backend
            .create_surface(width, height)
            .map_err(InitError::Render)?;
        self.session.surface = Some(surface);

        self.session.resize_listener = Some(self.backend.add_resize_listener());

        self.render_visualization().map_err(InitError::Render)
    }

    /// Releases every handle of the current generation. Safe to call any number of times.
    pub fn teardown(&mut self) {
        if let Some(timer) = self.session.refresh_timer.take() {
            timer.cancel();
        }
        if let Some(timer) = self.session.retry_timer.take() {
            timer.cancel();
        }
        if let Some(listener) = self.session.resize_listener.take() {
            self.backend.remove_resize_listener(listener);
        }
        if let Some(surface) = self.session.surface.take() {
            let report = surface.destroy(DestroyOptions::RECURSIVE);
            debug!(
                generation = self.session.generation,
                children = report.children,
                textures = report.textures,
                "surface destroyed"
            );
        }
        if let Some(store) = self.session.store.take() {
            if let Err(err) = store.close() {
                warn!(generation = self.session.generation, %err, "store close failed");
            }
        }
        if self.status.phase == Phase::Ready {
            self.status.phase = Phase::Idle;
        }
    }

    /// Escalates one failed `initialize`.
    pub fn handle_init_error(&mut self, err: InitError) {
        self.session.retry_count += 1;
        self.status.error = Some(err.to_string());

        match classify(self.session.retry_count, &self.config.policy) {
            Escalation::Retry { attempt, delay } => {
                if let Some(timer) = self.session.retry_timer.take() {
                    timer.cancel();
                }
                let remaining_secs = escalation::countdown_secs(delay);
                warn!(
                    attempt,
                    max_retries = self.config.policy.max_retries(),
                    delay_ms = delay.as_millis() as u64,
                    %err,
                    "initialize failed, retry scheduled"
                );
                self.session.retry_timer =
                    Some(timer::spawn_countdown(remaining_secs, self.tx.clone()));
                self.set_phase(Phase::Retrying {
                    attempt,
                    max_retries: self.config.policy.max_retries(),
                    delay,
                    remaining_secs,
                });
            }
            Escalation::GiveUp => {
                warn!(
                    retries = self.session.retry_count,
                    %err,
                    "initialize failed permanently"
                );
                self.set_phase(Phase::PermanentFailure);
            }
        }
    }

    /// Cancels any pending countdown, resets escalation and initializes immediately.
    pub async fn manual_retry(&mut self) {
        if let Some(timer) = self.session.retry_timer.take() {
            timer.cancel();
        }
        self.session.retry_count = 0;
        info!(phase = self.status.phase.label(), "manual retry");
        self.initialize().await;
    }

    pub fn set_visibility(&mut self, visibility: Visibility) {
        if self.visibility == visibility {
            trace!(?visibility, "visibility unchanged");
            return;
        }
        self.visibility = visibility;
        debug!(?visibility, "visibility changed");

        match visibility {
            Visibility::Hidden => {
                if let Some(timer) = self.session.refresh_timer.take() {
                    timer.cancel();
                }
            }
            Visibility::Visible => self.start_refresh(),
        }
    }

    /// Starts the refresh interval if ready, live, visible and not already running.
    pub fn start_refresh(&mut self) {
        if self.status.phase != Phase::Ready
            || !self.session.is_live()
            || self.visibility == Visibility::Hidden
            || self.session.refresh_timer.is_some()
        {
            trace!("refresh interval not started");
            return;
        }
        self.session.refresh_timer = Some(timer::spawn_interval(
            self.config.refresh_interval,
            self.tx.clone(),
        ));
    }

    /// Re-queries the live store and redraws. A no-op without a live session.
    pub fn render_visualization(&mut self) -> Result<(), RenderError> {
        let (Some(store), Some(surface)) =
            (self.session.store.as_ref(), self.session.surface.as_mut())
        else {
            trace!("render skipped without a live session");
            return Ok(());
        };

        let dashboard = load_dashboard(store);
        surface.render(&dashboard)?;
        self.present();
        Ok(())
    }

    pub fn on_resize(&mut self, width: u16, height: u16) {
        if self.session.resize_listener.is_none() {
            trace!(width, height, "resize ignored without a listener");
            return;
        }
        let Some(surface) = self.session.surface.as_mut() else {
            trace!(width, height, "resize ignored without a surface");
            return;
        };
        surface.resize(width, height);
        if let Err(err) = self.render_visualization() {
            warn!(%err, "render after resize failed");
        }
    }

    async fn on_refresh_tick(&mut self, timer: TimerId) {
        let current = self.session.refresh_timer.as_ref().map(TimerHandle::id);
        if current != Some(timer) || !self.session.is_live() {
            trace!("stale refresh tick");
            return;
        }

        if self.config.reload_on_refresh {
            self.reload_store().await;
        }
        if let Err(err) = self.render_visualization() {
            warn!(%err, "refresh render failed");
        }
    }

    /// One unretried download; on success the fresh store replaces the current one.
    async fn reload_store(&mut self) {
        let payload = match self.fetcher.fetch().await {
            Ok(payload) => payload,
            Err(err) => {
                warn!(%err, "snapshot reload failed, keeping current data");
                return;
            }
        };
        let store = match self.backend.open_store(&payload) {
            Ok(store) => store,
            Err(err) => {
                warn!(%err, "reloaded snapshot unreadable, keeping current data");
                return;
            }
        };

        if let Some(previous) = self.session.store.replace(store) {
            if let Err(err) = previous.close() {
                warn!(%err, "previous store close failed");
            }
        }
        let now = Utc::now();
        self.session.last_successful_load = Some(now);
        self.status.last_successful_load = Some(now);
    }

    async fn on_countdown_tick(&mut self, timer: TimerId, remaining: u64) {
        let current = self.session.retry_timer.as_ref().map(TimerHandle::id);
        if current != Some(timer) {
            trace!("stale countdown tick");
            return;
        }

        if remaining == 0 {
            self.session.retry_timer = None;
            self.initialize().await;
            return;
        }

        if let Phase::Retrying { remaining_secs, .. } = &mut self.status.phase {
            *remaining_secs = remaining;
        }
        self.present();
    }

    fn set_phase(&mut self, phase: Phase) {
        self.status.phase = phase;
        self.present();
    }

    fn present(&mut self) {
        self.backend
            .present(&self.status, self.session.surface.as_ref());
    }
}

/// Why one `initialize` failed.
#[derive(Debug)]
pub enum InitError {
    Fetch(FetchError),
    Store(StoreError),
    Render(RenderError),
}

impl fmt::Display for InitError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Fetch(err) => write!(f, "snapshot download failed: {err}"),
            Self::Store(err) => write!(f, "snapshot store unavailable: {err}"),
            Self::Render(err) => write!(f, "render surface unavailable: {err}"),
        }
    }
}

impl std::error::Error for InitError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Fetch(err) => Some(err),
            Self::Store(err) => Some(err),
            Self::Render(err) => Some(err),
        }
    }
}

#[cfg(test)]
mod tests;
