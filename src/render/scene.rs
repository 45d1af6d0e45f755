// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Glassbowl-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Glassbowl and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

use std::collections::BTreeMap;

use ratatui::buffer::Buffer;
use ratatui::layout::{Alignment, Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Paragraph, Widget};
use tracing::trace;

use super::text::{progress_bar, truncate_with_ellipsis};
use super::{Dashboard, DestroyOptions, DestroyReport, RenderError, RenderSurface, RunView};
use crate::model::{RunId, StepStatus};

const BAR_WIDTH: usize = 12;

/// Rows for one run panel: its steps (at least one) plus the two borders.
fn panel_height(steps: usize) -> u16 {
    u16::try_from(steps.max(1))
        .unwrap_or(u16::MAX)
        .saturating_add(2)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SceneStyles {
    pub base: Style,
    pub border: Style,
    pub title: Style,
    pub done: Style,
    pub running: Style,
    pub pending: Style,
    pub failed: Style,
}

impl Default for SceneStyles {
    fn default() -> Self {
        Self {
            base: Style::default(),
            border: Style::default().fg(Color::DarkGray),
            title: Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
            done: Style::default().fg(Color::Green),
            running: Style::default().fg(Color::Yellow),
            pending: Style::default().fg(Color::DarkGray),
            failed: Style::default().fg(Color::Red),
        }
    }
}

impl SceneStyles {
    fn for_step(&self, status: &StepStatus) -> Style {
        match status {
            StepStatus::Done => self.done,
            StepStatus::Running => self.running,
            StepStatus::Failed => self.failed,
            StepStatus::Pending | StepStatus::Other(_) => self.pending,
        }
    }
}

/// One run panel in the retained tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunNode {
    pub run_id: RunId,
    pub title: String,
    pub progress: String,
    pub steps: usize,
}

/// Retained terminal scene: one node per active run, each with a cached line texture.
#[derive(Debug)]
pub struct Scene {
    width: u16,
    height: u16,
    styles: SceneStyles,
    children: Vec<RunNode>,
    textures: BTreeMap<RunId, Vec<Line<'static>>>,
    notice: Option<Line<'static>>,
    frames: u64,
}

impl Scene {
    pub fn new(width: u16, height: u16, styles: SceneStyles) -> Result<Self, RenderError> {
        if width == 0 || height == 0 {
            return Err(RenderError::ZeroSize { width, height });
        }
        Ok(Self {
            width,
            height,
            styles,
            children: Vec::new(),
            textures: BTreeMap::new(),
            notice: None,
            frames: 0,
        })
    }

    pub fn children(&self) -> &[RunNode] {
        &self.children
    }

    pub fn texture_count(&self) -> usize {
        self.textures.len()
    }

    /// Number of completed `render` calls.
    pub fn frames(&self) -> u64 {
        self.frames
    }

    fn texture_for(&self, view: &RunView) -> Vec<Line<'static>> {
        let inner_width = usize::from(self.width.saturating_sub(4));
        view.steps
            .iter()
            .map(|step| {
                let style = self.styles.for_step(&step.status);
                let label = match step.agent_id.as_deref() {
                    Some(agent) => format!("{} ({agent})", step.step_id),
                    None => step.step_id.clone(),
                };
                Line::from(vec![
                    Span::styled(format!("{} ", step.status.glyph()), style),
                    Span::styled(
                        truncate_with_ellipsis(&label, inner_width.saturating_sub(2)),
                        self.styles.base,
                    ),
                ])
            })
            .collect()
    }

    fn paint_notice(&self, notice: &Line<'static>, area: Rect, buf: &mut Buffer) {
        let block = Block::default()
            .borders(Borders::ALL)
            .border_style(self.styles.border);
        Paragraph::new(notice.clone())
            .alignment(Alignment::Center)
            .block(block)
            .render(area, buf);
    }
}

impl RenderSurface for Scene {
    fn size(&self) -> (u16, u16) {
        (self.width, self.height)
    }

    fn resize(&mut self, width: u16, height: u16) {
        trace!(width, height, "scene resized");
        self.width = width;
        self.height = height;
    }

    fn render(&mut self, dashboard: &Dashboard) -> Result<(), RenderError> {
        if self.width == 0 || self.height == 0 {
            return Err(RenderError::ZeroSize {
                width: self.width,
                height: self.height,
            });
        }

        self.children.clear();
        self.textures.clear();
        self.notice = None;

        match dashboard {
            Dashboard::NoData => {
                self.notice = Some(Line::styled("no active runs", self.styles.pending));
            }
            Dashboard::Unavailable { reason } => {
                self.notice = Some(Line::styled(
                    format!("data unavailable: {reason}"),
                    self.styles.failed,
                ));
            }
            Dashboard::Runs(views) => {
                for view in views {
                    let texture = self.texture_for(view);
                    self.children.push(RunNode {
                        run_id: view.run.id.clone(),
                        title: view.run.title().to_owned(),
                        progress: progress_bar(view.done_steps(), view.steps.len(), BAR_WIDTH),
                        steps: view.steps.len(),
                    });
                    self.textures.insert(view.run.id.clone(), texture);
                }
            }
        }

        self.frames += 1;
        Ok(())
    }

    fn paint(&self, area: Rect, buf: &mut Buffer) {
        if let Some(notice) = &self.notice {
            self.paint_notice(notice, area, buf);
            return;
        }

        let constraints: Vec<Constraint> = self
            .children
            .iter()
            .map(|node| Constraint::Length(panel_height(node.steps)))
            .chain(std::iter::once(Constraint::Min(0)))
            .collect();
        let rows = Layout::default()
            .direction(Direction::Vertical)
            .constraints(constraints)
            .split(area);

        for (node, row) in self.children.iter().zip(rows.iter()) {
            if row.height < 2 {
                break;
            }
            let title = Line::from(vec![
                Span::styled(format!(" {} ", node.title), self.styles.title),
                Span::styled(format!("{} ", node.progress), self.styles.base),
            ]);
            let block = Block::default()
                .borders(Borders::ALL)
                .border_style(self.styles.border)
                .title(title);
            let lines = self.textures.get(&node.run_id).cloned().unwrap_or_default();
            Paragraph::new(lines).block(block).render(*row, buf);
        }
    }

    fn destroy(mut self, options: DestroyOptions) -> DestroyReport {
        let mut report = DestroyReport::default();
        if options.children {
            report.children = self.children.len();
            self.children.clear();
            self.notice = None;
        }
        if options.texture {
            report.textures = self.textures.len();
            self.textures.clear();
        }
        trace!(?report, "scene destroyed");
        report
    }
}
