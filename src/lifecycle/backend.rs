// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Glassbowl-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Glassbowl and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

use crate::render::{RenderError, RenderSurface};
use crate::store::{QueryStore, StoreError};

use super::Status;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(pub u64);

/// The host environment: resource factories plus the place status and frames are shown.
pub trait Backend {
    type Store: QueryStore;
    type Surface: RenderSurface;

    fn open_store(&mut self, payload: &[u8]) -> Result<Self::Store, StoreError>;

    fn create_surface(&mut self, width: u16, height: u16) -> Result<Self::Surface, RenderError>;

    fn add_resize_listener(&mut self) -> ListenerId;

    fn remove_resize_listener(&mut self, id: ListenerId);

    /// Current viewport size in cells.
    fn viewport(&self) -> (u16, u16);

    /// Shows the status line and, when one is live, the surface's current frame.
    fn present(&mut self, status: &Status, surface: Option<&Self::Surface>);
}
