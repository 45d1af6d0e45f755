// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Glassbowl-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Glassbowl and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;
use std::sync::OnceLock;
use std::time::Duration;

use ratatui::buffer::Buffer;
use ratatui::layout::Rect;
use rstest::rstest;
use tokio::time::{timeout, timeout_at, Instant};

use super::{
    Backend, Command, Controller, LifecycleConfig, ListenerId, Phase, Status, Visibility,
    RETRY_DELAYS,
};
use crate::fetch::{FetchError, Fetcher};
use crate::render::{Dashboard, DestroyOptions, DestroyReport, RenderError, RenderSurface};
use crate::store::test_utils::{snapshot_payload, StatementLedger, Tracked};
use crate::store::{SqliteStore, StoreError};

/// A 200 response whose body is not a SQLite database.
const CORRUPT: &[u8] = b"<html>maintenance</html>";

fn good_snapshot() -> &'static [u8] {
    static SNAPSHOT: OnceLock<Vec<u8>> = OnceLock::new();
    SNAPSHOT.get_or_init(|| snapshot_payload(&["run-1"]))
}

/// Everything the fake host observed, in order.
#[derive(Debug, Default)]
struct HostLog {
    events: Vec<String>,
    phases: Vec<Phase>,
    destroyed: Vec<(usize, DestroyOptions)>,
    renders: usize,
    ledgers: Vec<Rc<StatementLedger>>,
}

impl HostLog {
    fn count(&self, prefix: &str) -> usize {
        self.events
            .iter()
            .filter(|event| event.starts_with(prefix))
            .count()
    }

    /// Delays of every countdown that was scheduled, as first presented.
    fn scheduled_delays(&self) -> Vec<Duration> {
        self.phases
            .iter()
            .filter_map(|phase| match phase {
                Phase::Retrying {
                    delay,
                    remaining_secs,
                    ..
                } if *remaining_secs == super::escalation::countdown_secs(*delay) => Some(*delay),
                _ => None,
            })
            .collect()
    }
}

struct FakeSurface {
    id: usize,
    size: (u16, u16),
    log: Rc<RefCell<HostLog>>,
}

impl RenderSurface for FakeSurface {
    fn size(&self) -> (u16, u16) {
        self.size
    }

    fn resize(&mut self, width: u16, height: u16) {
        self.size = (width, height);
        self.log
            .borrow_mut()
            .events
            .push(format!("resize {} {width}x{height}", self.id));
    }

    fn render(&mut self, _dashboard: &Dashboard) -> Result<(), RenderError> {
        self.log.borrow_mut().renders += 1;
        Ok(())
    }

    fn paint(&self, _area: Rect, _buf: &mut Buffer) {}

    fn destroy(self, options: DestroyOptions) -> DestroyReport {
        let mut log = self.log.borrow_mut();
        log.events.push(format!("destroy {}", self.id));
        log.destroyed.push((self.id, options));
        DestroyReport {
            children: usize::from(options.children),
            textures: usize::from(options.texture),
        }
    }
}

struct FakeBackend {
    cache: tempfile::TempDir,
    log: Rc<RefCell<HostLog>>,
    surfaces: usize,
    listeners: u64,
}

impl Backend for FakeBackend {
    type Store = Tracked<SqliteStore>;
    type Surface = FakeSurface;

    fn open_store(&mut self, payload: &[u8]) -> Result<Self::Store, StoreError> {
        let store = match SqliteStore::from_snapshot(self.cache.path(), payload) {
            Ok(store) => store,
            Err(err) => {
                self.log.borrow_mut().events.push("open failed".to_owned());
                return Err(err);
            }
        };

        let ledger = Rc::new(StatementLedger::default());
        let mut log = self.log.borrow_mut();
        log.ledgers.push(ledger.clone());
        let generation = log.ledgers.len();
        log.events.push(format!("open {generation}"));
        Ok(Tracked::new(store, ledger))
    }

    fn create_surface(&mut self, width: u16, height: u16) -> Result<Self::Surface, RenderError> {
        self.surfaces += 1;
        self.log
            .borrow_mut()
            .events
            .push(format!("surface {}", self.surfaces));
        Ok(FakeSurface {
            id: self.surfaces,
            size: (width, height),
            log: self.log.clone(),
        })
    }

    fn add_resize_listener(&mut self) -> ListenerId {
        self.listeners += 1;
        self.log
            .borrow_mut()
            .events
            .push(format!("listen {}", self.listeners));
        ListenerId(self.listeners)
    }

    fn remove_resize_listener(&mut self, id: ListenerId) {
        self.log.borrow_mut().events.push(format!("unlisten {}", id.0));
    }

    fn viewport(&self) -> (u16, u16) {
        (80, 24)
    }

    fn present(&mut self, status: &Status, _surface: Option<&Self::Surface>) {
        self.log.borrow_mut().phases.push(status.phase.clone());
    }
}

/// Serves payloads from a script; an empty script serves a good snapshot.
#[derive(Clone, Default)]
struct ScriptedFetcher {
    script: Rc<RefCell<VecDeque<Result<Vec<u8>, u16>>>>,
    calls: Rc<RefCell<usize>>,
}

impl ScriptedFetcher {
    fn push(&self, outcome: Result<&[u8], u16>) {
        self.script.borrow_mut().push_back(outcome.map(<[u8]>::to_vec));
    }

    fn calls(&self) -> usize {
        *self.calls.borrow()
    }
}

impl Fetcher for ScriptedFetcher {
    async fn fetch(&self) -> Result<Vec<u8>, FetchError> {
        *self.calls.borrow_mut() += 1;
        let next = self.script.borrow_mut().pop_front();
        match next.unwrap_or_else(|| Ok(good_snapshot().to_vec())) {
            Ok(payload) => Ok(payload),
            Err(status) => Err(FetchError::Status {
                url: "scripted".to_owned(),
                status,
            }),
        }
    }

    fn resource(&self) -> &str {
        "scripted"
    }
}

type TestController = Controller<FakeBackend, ScriptedFetcher>;

struct Harness {
    controller: TestController,
    log: Rc<RefCell<HostLog>>,
    fetcher: ScriptedFetcher,
}

fn harness(config: LifecycleConfig) -> Harness {
    let log = Rc::new(RefCell::new(HostLog::default()));
    let fetcher = ScriptedFetcher::default();
    let backend = FakeBackend {
        cache: tempfile::tempdir().expect("cache dir"),
        log: log.clone(),
        surfaces: 0,
        listeners: 0,
    };
    Harness {
        controller: Controller::new(backend, fetcher.clone(), config),
        log,
        fetcher,
    }
}

fn quiet_config() -> LifecycleConfig {
    LifecycleConfig {
        reload_on_refresh: false,
        ..LifecycleConfig::default()
    }
}

/// Steps the controller until `done` holds, failing after two virtual minutes.
async fn drive_until(controller: &mut TestController, done: impl Fn(&Status) -> bool) {
    let reached = timeout(Duration::from_secs(120), async {
        while !done(controller.status()) {
            controller.step().await;
        }
    })
    .await;
    assert!(reached.is_ok(), "stuck in {:?}", controller.status().phase);
}

/// Steps the controller until `deadline`.
async fn drive_for(controller: &mut TestController, span: Duration) {
    let deadline = Instant::now() + span;
    while timeout_at(deadline, controller.step()).await.is_ok() {}
}

fn is_ready(status: &Status) -> bool {
    status.phase == Phase::Ready
}

#[tokio::test(start_paused = true)]
async fn initialize_builds_a_live_ready_generation() {
    let Harness {
        mut controller,
        log,
        ..
    } = harness(quiet_config());

    controller.initialize().await;

    let session = controller.session();
    assert_eq!(controller.status().phase, Phase::Ready);
    assert!(session.is_live());
    assert!(session.resize_listener.is_some());
    assert!(session.refresh_timer.is_some());
    assert!(session.retry_timer.is_none());
    assert!(session.last_successful_load.is_some());
    assert_eq!(log.borrow().events, ["open 1", "surface 1", "listen 1"]);
    assert_eq!(log.borrow().renders, 1);
    assert_eq!(log.borrow().phases.first(), Some(&Phase::Initializing));
}

#[tokio::test(start_paused = true)]
async fn teardown_twice_equals_teardown_once() {
    let Harness {
        mut controller,
        log,
        ..
    } = harness(quiet_config());

    controller.teardown();
    assert!(controller.session().is_torn_down());

    controller.initialize().await;
    controller.teardown();
    let after_first = log.borrow().events.clone();
    controller.teardown();

    assert!(controller.session().is_torn_down());
    assert_eq!(log.borrow().events, after_first);
    assert_eq!(log.borrow().count("destroy"), 1);
    assert_eq!(log.borrow().count("unlisten"), 1);
    assert!(log.borrow().ledgers[0].closed());
    assert_eq!(controller.status().phase, Phase::Idle);
}

#[rstest]
#[case::no_failures(0)]
#[case::one_failure(1)]
#[case::two_failures(2)]
#[tokio::test(start_paused = true)]
async fn failed_initializes_retry_on_the_fixed_schedule(#[case] failures: usize) {
    let Harness {
        mut controller,
        log,
        fetcher,
    } = harness(quiet_config());
    for _ in 0..failures {
        fetcher.push(Ok(CORRUPT));
    }
    let started = Instant::now();

    controller.initialize().await;
    drive_until(&mut controller, is_ready).await;

    let expected = &RETRY_DELAYS[..failures];
    assert_eq!(log.borrow().scheduled_delays(), expected);
    assert_eq!(Instant::now() - started, expected.iter().sum::<Duration>());
    assert_eq!(controller.session().retry_count, 0);
    assert!(controller.status().last_successful_load.is_some());
    assert!(controller.status().error.is_none());
    assert_eq!(fetcher.calls(), failures + 1);
}

#[tokio::test(start_paused = true)]
async fn countdown_presents_each_remaining_second() {
    let Harness {
        mut controller,
        log,
        fetcher,
    } = harness(quiet_config());
    fetcher.push(Ok(CORRUPT));
    fetcher.push(Ok(CORRUPT));

    controller.initialize().await;
    drive_until(&mut controller, is_ready).await;

    let remaining: Vec<u64> = log
        .borrow()
        .phases
        .iter()
        .filter_map(|phase| match phase {
            Phase::Retrying {
                attempt: 2,
                remaining_secs,
                ..
            } => Some(*remaining_secs),
            _ => None,
        })
        .collect();
    assert_eq!(remaining, [2, 1]);
}

#[tokio::test(start_paused = true)]
async fn four_failures_end_in_permanent_failure_with_nothing_scheduled() {
    let Harness {
        mut controller,
        log,
        fetcher,
    } = harness(quiet_config());
    for _ in 0..5 {
        fetcher.push(Ok(CORRUPT));
    }

    controller.initialize().await;
    drive_until(&mut controller, |status| {
        status.phase == Phase::PermanentFailure
    })
    .await;

    assert_eq!(fetcher.calls(), 4);
    assert_eq!(controller.session().retry_count, 4);
    assert!(controller.session().is_torn_down());
    assert_eq!(log.borrow().scheduled_delays(), RETRY_DELAYS);
    assert!(controller.status().error.is_some());

    let idle = timeout(Duration::from_secs(600), controller.step()).await;
    assert!(idle.is_err(), "nothing may be scheduled after giving up");
    assert_eq!(fetcher.calls(), 4);
    assert_eq!(controller.status().phase, Phase::PermanentFailure);
}

#[tokio::test(start_paused = true)]
async fn exhausted_fetch_escalates_after_backoff() {
    let Harness {
        mut controller,
        fetcher,
        ..
    } = harness(quiet_config());
    for status in [500, 502, 503, 504] {
        fetcher.push(Err(status));
    }
    let started = Instant::now();

    controller.initialize().await;

    assert_eq!(fetcher.calls(), 4);
    assert_eq!(Instant::now() - started, Duration::from_secs(7));
    assert!(matches!(
        controller.status().phase,
        Phase::Retrying { attempt: 1, .. }
    ));
    let error = controller.status().error.clone().unwrap_or_default();
    assert!(error.contains("HTTP 504"), "{error}");
    assert!(!controller.session().is_live());
}

#[tokio::test(start_paused = true)]
async fn manual_retry_from_retrying_cancels_the_countdown() {
    let Harness {
        mut controller,
        log,
        fetcher,
    } = harness(quiet_config());
    fetcher.push(Ok(CORRUPT));
    fetcher.push(Ok(CORRUPT));

    controller.initialize().await;
    controller.initialize().await;
    assert_eq!(controller.session().retry_count, 2);
    let stale = controller
        .session()
        .retry_timer
        .as_ref()
        .map(|timer| timer.id())
        .unwrap();
    let presented = log.borrow().phases.len();
    let started = Instant::now();

    controller.manual_retry().await;

    assert_eq!(Instant::now(), started);
    assert_eq!(log.borrow().phases[presented], Phase::Initializing);
    assert_eq!(controller.status().phase, Phase::Ready);
    assert_eq!(controller.session().retry_count, 0);
    assert!(controller.session().retry_timer.is_none());

    // The cancelled countdown can no longer trigger an initialize.
    controller
        .handle(Command::CountdownTick {
            timer: stale,
            remaining: 0,
        })
        .await;
    assert_eq!(fetcher.calls(), 3);
}

#[tokio::test(start_paused = true)]
async fn manual_retry_leaves_permanent_failure() {
    let Harness {
        mut controller,
        fetcher,
        ..
    } = harness(quiet_config());
    for _ in 0..4 {
        fetcher.push(Ok(CORRUPT));
    }
    controller.initialize().await;
    drive_until(&mut controller, |status| {
        status.phase == Phase::PermanentFailure
    })
    .await;

    controller.sender().send(Command::ManualRetry).unwrap();
    controller.step().await;

    assert_eq!(controller.status().phase, Phase::Ready);
    assert_eq!(controller.session().retry_count, 0);
    assert_eq!(fetcher.calls(), 5);
}

#[tokio::test(start_paused = true)]
async fn manual_retry_restarts_escalation_from_the_first_delay() {
    let Harness {
        mut controller,
        log,
        fetcher,
    } = harness(quiet_config());
    for _ in 0..5 {
        fetcher.push(Ok(CORRUPT));
    }
    controller.initialize().await;
    drive_until(&mut controller, |status| {
        status.phase == Phase::PermanentFailure
    })
    .await;
    log.borrow_mut().phases.clear();

    controller.manual_retry().await;

    assert_eq!(log.borrow().scheduled_delays(), &RETRY_DELAYS[..1]);
}

#[tokio::test(start_paused = true)]
async fn visibility_toggles_leave_exactly_one_interval() {
    let Harness {
        mut controller,
        log,
        ..
    } = harness(quiet_config());
    controller.initialize().await;
    let first_timer = controller.session().refresh_timer.as_ref().map(|t| t.id());

    for visibility in [
        Visibility::Hidden,
        Visibility::Visible,
        Visibility::Hidden,
        Visibility::Visible,
    ] {
        controller.set_visibility(visibility);
    }
    controller.set_visibility(Visibility::Visible);

    let current = controller.session().refresh_timer.as_ref().map(|t| t.id());
    assert!(current.is_some());
    assert_ne!(current, first_timer);

    let renders_before = log.borrow().renders;
    drive_for(&mut controller, Duration::from_secs(16)).await;
    assert_eq!(log.borrow().renders - renders_before, 3);
}

#[tokio::test(start_paused = true)]
async fn hidden_dashboard_does_not_refresh() {
    let Harness {
        mut controller,
        log,
        ..
    } = harness(quiet_config());
    controller.initialize().await;
    controller.handle(Command::Visibility(Visibility::Hidden)).await;
    assert!(controller.session().refresh_timer.is_none());

    let renders_before = log.borrow().renders;
    drive_for(&mut controller, Duration::from_secs(60)).await;
    assert_eq!(log.borrow().renders, renders_before);

    controller.set_visibility(Visibility::Visible);
    assert!(controller.session().refresh_timer.is_some());
}

#[tokio::test(start_paused = true)]
async fn initialize_while_hidden_defers_the_interval() {
    let Harness { mut controller, .. } = harness(quiet_config());
    controller.set_visibility(Visibility::Hidden);

    controller.initialize().await;

    assert_eq!(controller.status().phase, Phase::Ready);
    assert!(controller.session().refresh_timer.is_none());
    controller.set_visibility(Visibility::Visible);
    assert!(controller.session().refresh_timer.is_some());
}

#[tokio::test(start_paused = true)]
async fn second_initialize_releases_the_first_generation_first() {
    let Harness {
        mut controller,
        log,
        ..
    } = harness(quiet_config());

    controller.initialize().await;
    controller.initialize().await;

    let log = log.borrow();
    assert_eq!(
        log.events,
        [
            "open 1",
            "surface 1",
            "listen 1",
            "unlisten 1",
            "destroy 1",
            "open 2",
            "surface 2",
            "listen 2",
        ]
    );
    assert_eq!(log.destroyed, [(1, DestroyOptions::RECURSIVE)]);
    assert!(log.ledgers[0].closed());
    assert_eq!(log.ledgers[0].acquired(), log.ledgers[0].released());
    assert!(!log.ledgers[1].closed());
    assert_eq!(controller.session().generation, 2);
}

#[tokio::test(start_paused = true)]
async fn resize_is_ignored_without_a_live_generation() {
    let Harness {
        mut controller,
        log,
        ..
    } = harness(quiet_config());

    controller
        .handle(Command::Resize {
            width: 100,
            height: 40,
        })
        .await;
    assert_eq!(log.borrow().count("resize"), 0);

    controller.initialize().await;
    let renders = log.borrow().renders;
    controller
        .handle(Command::Resize {
            width: 100,
            height: 40,
        })
        .await;

    assert_eq!(log.borrow().count("resize 1 100x40"), 1);
    assert_eq!(log.borrow().renders, renders + 1);
    assert_eq!(
        controller.session().surface.as_ref().map(RenderSurface::size),
        Some((100, 40))
    );
}

#[tokio::test(start_paused = true)]
async fn refresh_reload_swaps_in_a_fresh_store() {
    let Harness {
        mut controller,
        log,
        ..
    } = harness(LifecycleConfig::default());
    controller.initialize().await;

    drive_for(&mut controller, Duration::from_secs(6)).await;

    let log = log.borrow();
    assert_eq!(log.count("open"), 2);
    assert_eq!(log.count("surface"), 1);
    assert!(log.ledgers[0].closed());
    assert_eq!(log.ledgers[1].acquired(), log.ledgers[1].released());
    assert_eq!(log.renders, 2);
}

#[tokio::test(start_paused = true)]
async fn failed_reload_keeps_the_current_store() {
    let Harness {
        mut controller,
        log,
        fetcher,
    } = harness(LifecycleConfig::default());
    controller.initialize().await;
    fetcher.push(Err(503));

    drive_for(&mut controller, Duration::from_secs(6)).await;

    assert_eq!(controller.status().phase, Phase::Ready);
    assert_eq!(log.borrow().count("open"), 1);
    assert!(!log.borrow().ledgers[0].closed());
    assert_eq!(log.borrow().renders, 2);
}

#[tokio::test(start_paused = true)]
async fn reload_of_a_non_database_body_keeps_the_current_store() {
    let Harness {
        mut controller,
        log,
        fetcher,
    } = harness(LifecycleConfig::default());
    controller.initialize().await;
    let loaded_at = controller.status().last_successful_load;
    fetcher.push(Ok(CORRUPT));

    drive_for(&mut controller, Duration::from_secs(6)).await;

    let log = log.borrow();
    assert_eq!(controller.status().phase, Phase::Ready);
    assert_eq!(controller.status().last_successful_load, loaded_at);
    assert_eq!(log.count("open failed"), 1);
    assert_eq!(log.ledgers.len(), 1);
    assert!(!log.ledgers[0].closed());
    assert_eq!(log.renders, 2);
}

#[tokio::test(start_paused = true)]
async fn exit_tears_down_and_stops_the_loop() {
    let Harness {
        mut controller,
        log,
        ..
    } = harness(quiet_config());
    controller.initialize().await;

    controller.sender().send(Command::Exit).unwrap();
    let running = controller.step().await;

    assert!(!running);
    assert!(controller.is_exiting());
    assert!(controller.session().is_torn_down());
    assert_eq!(log.borrow().count("destroy"), 1);
}
