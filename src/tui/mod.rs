// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Glassbowl-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Glassbowl and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

//! Terminal UI.
//!
//! Hosts the lifecycle controller in a ratatui + crossterm terminal: focus changes drive
//! visibility, resize events feed the resize listener, `r` retries and `q` exits.

use std::{collections::VecDeque, error::Error, io, path::PathBuf};

use crossterm::{
    event::{
        DisableFocusChange, EnableFocusChange, Event, EventStream, KeyCode, KeyEventKind,
        KeyModifiers,
    },
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use futures::StreamExt;
use ratatui::{
    prelude::*,
    widgets::{Block, Borders, Paragraph, Wrap},
};
use tracing::{debug, trace, warn};

use crate::config::Config;
use crate::fetch::Fetcher;
use crate::lifecycle::{Backend, Command, Controller, ListenerId, Status, Visibility};
use crate::render::{RenderError, RenderSurface, Scene};
use crate::store::{SqliteStore, StoreError};

mod theme;

use theme::TuiTheme;

const STATUS_BAR_HEIGHT: u16 = 1;
const KEY_HINTS: &str = " r retry · q quit ";

/// Runs the dashboard until the user quits.
pub async fn run(config: Config) -> Result<(), Box<dyn Error>> {
    let theme = TuiTheme::from_env()?;
    let fetcher = config.fetcher();
    let lifecycle = config.lifecycle();

    let _session = TerminalSession::new()?;
    let terminal = Terminal::new(CrosstermBackend::new(io::stdout()))?;
    let backend = TerminalBackend::new(terminal, theme, config.cache_dir.clone());
    let mut controller = Controller::new(backend, fetcher, lifecycle);

    let mut events = EventStream::new();
    let mut pending = VecDeque::from([HostInput::Start]);

    while !controller.is_exiting() {
        let input = match pending.pop_front() {
            Some(input) => input,
            None => tokio::select! {
                Some(command) = controller.recv() => HostInput::Internal(command),
                event = events.next() => match event {
                    Some(Ok(event)) => match map_event(&event) {
                        Some(input) => input,
                        None => continue,
                    },
                    Some(Err(err)) => {
                        warn!(%err, "terminal event stream failed");
                        HostInput::Quit
                    }
                    None => HostInput::Quit,
                },
            },
        };

        let listening = controller.backend().is_listening();
        let Some(command) = input.into_command(listening) else {
            trace!("host input dropped");
            continue;
        };
        dispatch(&mut controller, command, &mut events, &mut pending).await;
    }

    Ok(())
}

/// Handles one command while still honouring quit keys. Other input is queued.
async fn dispatch<B: Backend, F: Fetcher>(
    controller: &mut Controller<B, F>,
    command: Command,
    events: &mut EventStream,
    pending: &mut VecDeque<HostInput>,
) {
    let quit = {
        let handling = controller.handle(command);
        tokio::pin!(handling);
        loop {
            tokio::select! {
                () = &mut handling => break false,
                event = events.next() => match event {
                    Some(Ok(event)) => match map_event(&event) {
                        Some(HostInput::Quit) => break true,
                        Some(input) => pending.push_back(input),
                        None => {}
                    },
                    Some(Err(_)) | None => break true,
                },
            }
        }
    };

    if quit {
        debug!("quit while a command was in flight");
        controller.handle(Command::Exit).await;
    }
}

/// Terminal input translated into lifecycle intent.
#[derive(Debug, Clone, PartialEq, Eq)]
enum HostInput {
    Start,
    Quit,
    Retry,
    Resize { width: u16, height: u16 },
    Focus(Visibility),
    Internal(Command),
}

impl HostInput {
    fn into_command(self, listening: bool) -> Option<Command> {
        match self {
            Self::Start => Some(Command::Initialize),
            Self::Quit => Some(Command::Exit),
            Self::Retry => Some(Command::ManualRetry),
            Self::Resize { width, height } if listening => Some(Command::Resize {
                width,
                height: height.saturating_sub(STATUS_BAR_HEIGHT),
            }),
            Self::Resize { .. } => None,
            Self::Focus(visibility) => Some(Command::Visibility(visibility)),
            Self::Internal(command) => Some(command),
        }
    }
}

fn map_event(event: &Event) -> Option<HostInput> {
    match event {
        Event::Key(key) if key.kind == KeyEventKind::Press => match key.code {
            KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => {
                Some(HostInput::Quit)
            }
            KeyCode::Char('q') | KeyCode::Esc => Some(HostInput::Quit),
            KeyCode::Char('r') | KeyCode::Char('R') => Some(HostInput::Retry),
            _ => None,
        },
        Event::Resize(width, height) => Some(HostInput::Resize {
            width: *width,
            height: *height,
        }),
        Event::FocusLost => Some(HostInput::Focus(Visibility::Hidden)),
        Event::FocusGained => Some(HostInput::Focus(Visibility::Visible)),
        _ => None,
    }
}

/// The terminal as a lifecycle host.
pub(crate) struct TerminalBackend<T: ratatui::backend::Backend> {
    terminal: Terminal<T>,
    theme: TuiTheme,
    cache_dir: PathBuf,
    next_listener: u64,
    listener: Option<ListenerId>,
}

impl<T: ratatui::backend::Backend> TerminalBackend<T> {
    pub(crate) fn new(terminal: Terminal<T>, theme: TuiTheme, cache_dir: PathBuf) -> Self {
        Self {
            terminal,
            theme,
            cache_dir,
            next_listener: 0,
            listener: None,
        }
    }

    pub(crate) fn is_listening(&self) -> bool {
        self.listener.is_some()
    }

    #[cfg(test)]
    pub(crate) fn terminal(&self) -> &Terminal<T> {
        &self.terminal
    }
}

impl<T: ratatui::backend::Backend> Backend for TerminalBackend<T> {
    type Store = SqliteStore;
    type Surface = Scene;

    fn open_store(&mut self, payload: &[u8]) -> Result<Self::Store, StoreError> {
        SqliteStore::from_snapshot(&self.cache_dir, payload)
    }

    fn create_surface(&mut self, width: u16, height: u16) -> Result<Self::Surface, RenderError> {
        Scene::new(width, height, self.theme.scene_styles())
    }

    fn add_resize_listener(&mut self) -> ListenerId {
        self.next_listener += 1;
        let id = ListenerId(self.next_listener);
        self.listener = Some(id);
        id
    }

    fn remove_resize_listener(&mut self, id: ListenerId) {
        if self.listener == Some(id) {
            self.listener = None;
        } else {
            trace!(?id, "unknown resize listener");
        }
    }

    fn viewport(&self) -> (u16, u16) {
        match self.terminal.size() {
            Ok(size) => (
                size.width,
                size.height.saturating_sub(STATUS_BAR_HEIGHT),
            ),
            Err(err) => {
                warn!(%err, "cannot read terminal size");
                (80, 23)
            }
        }
    }

    fn present(&mut self, status: &Status, surface: Option<&Self::Surface>) {
        let theme = &self.theme;
        if let Err(err) = self.terminal.draw(|frame| draw(frame, theme, status, surface)) {
            warn!(%err, "terminal draw failed");
        }
    }
}

fn draw<S: RenderSurface>(frame: &mut Frame<'_>, theme: &TuiTheme, status: &Status, surface: Option<&S>) {
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(1), Constraint::Length(STATUS_BAR_HEIGHT)])
        .split(frame.area());

    match surface {
        Some(surface) => surface.paint(rows[0], frame.buffer_mut()),
        None => {
            let block = Block::default()
                .borders(Borders::ALL)
                .title(" glassbowl ")
                .style(theme.base_style());
            let body = Paragraph::new(status.message())
                .alignment(Alignment::Center)
                .wrap(Wrap { trim: true })
                .block(block);
            frame.render_widget(body, rows[0]);
        }
    }

    let bar = Line::from(vec![
        Span::styled(
            format!(" {} ", status.phase.label()),
            theme.status_style(&status.phase),
        ),
        Span::styled(format!(" {}", status.message()), theme.base_style()),
    ]);
    let hints = Line::from(Span::styled(KEY_HINTS, theme.base_style())).right_aligned();
    frame.render_widget(Paragraph::new(bar).style(theme.base_style()), rows[1]);
    frame.render_widget(hints, rows[1]);
}

/// Raw mode, alternate screen and focus reporting for the lifetime of the value.
struct TerminalSession;

impl TerminalSession {
    fn new() -> Result<Self, Box<dyn Error>> {
        enable_raw_mode()?;

        let mut stdout = io::stdout();
        execute!(stdout, EnterAlternateScreen, EnableFocusChange).map_err(|err| {
            teardown_terminal();
            err
        })?;

        Ok(Self)
    }
}

impl Drop for TerminalSession {
    fn drop(&mut self) {
        teardown_terminal();
    }
}

fn teardown_terminal() {
    let _ = disable_raw_mode();
    let mut stdout = io::stdout();
    let _ = execute!(
        stdout,
        DisableFocusChange,
        LeaveAlternateScreen,
        crossterm::cursor::Show
    );
}
