// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Glassbowl-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Glassbowl and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

//! Dashboard rendering.
//!
//! A render surface keeps a retained tree of run nodes plus cached line textures built from the
//! last [`Dashboard`]. The terminal paints from that retained state; the lifecycle controller
//! only ever creates, resizes, re-renders and destroys surfaces.

use std::fmt;

use ratatui::buffer::Buffer;
use ratatui::layout::Rect;

pub mod dashboard;
pub mod scene;
mod text;

pub use dashboard::{load_dashboard, Dashboard, RunView};
pub use scene::{Scene, SceneStyles};

/// What `destroy` releases along with the surface itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DestroyOptions {
    pub children: bool,
    pub texture: bool,
}

impl DestroyOptions {
    /// Release the whole node tree and every cached texture.
    pub const RECURSIVE: Self = Self {
        children: true,
        texture: true,
    };
}

/// Counts of what a `destroy` call released.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DestroyReport {
    pub children: usize,
    pub textures: usize,
}

pub trait RenderSurface {
    fn size(&self) -> (u16, u16);

    fn resize(&mut self, width: u16, height: u16);

    /// Rebuilds the retained scene from `dashboard`.
    fn render(&mut self, dashboard: &Dashboard) -> Result<(), RenderError>;

    /// Draws the retained scene into `buf` within `area`.
    fn paint(&self, area: Rect, buf: &mut Buffer);

    fn destroy(self, options: DestroyOptions) -> DestroyReport
    where
        Self: Sized;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RenderError {
    ZeroSize { width: u16, height: u16 },
}

impl fmt::Display for RenderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ZeroSize { width, height } => {
                write!(f, "render surface cannot be {width}x{height}")
            }
        }
    }
}

impl std::error::Error for RenderError {}
