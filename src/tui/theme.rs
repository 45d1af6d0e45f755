// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Glassbowl-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Glassbowl and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

use std::{env, error::Error, fmt};

use ratatui::style::{Color, Modifier, Style};

use crate::lifecycle::Phase;
use crate::render::SceneStyles;

const PALETTE_ENV: &str = "GLASSBOWL_PALETTE";

#[derive(Debug, Clone, Default)]
pub(crate) struct TuiTheme {
    palette: Option<TuiPalette>,
}

impl TuiTheme {
    pub(crate) fn from_env() -> Result<Self, ThemeError> {
        match env::var(PALETTE_ENV) {
            Ok(value) => Self::from_palette_value(&value),
            Err(env::VarError::NotPresent) => Ok(Self::default()),
            Err(env::VarError::NotUnicode(_)) => Err(ThemeError::InvalidEnv {
                name: PALETTE_ENV.to_string(),
                value: "<non-unicode>".to_string(),
            }),
        }
    }

    fn from_palette_value(value: &str) -> Result<Self, ThemeError> {
        let trimmed = value.trim();
        if trimmed.is_empty() {
            return Ok(Self::default());
        }
        let palette = TuiPalette::parse_csv(trimmed).map_err(|error| ThemeError::InvalidEnv {
            name: PALETTE_ENV.to_string(),
            value: format!("{trimmed} ({error})"),
        })?;
        Ok(Self {
            palette: Some(palette),
        })
    }

    pub(crate) fn base_style(&self) -> Style {
        match &self.palette {
            Some(palette) => Style::default().fg(palette.fg).bg(palette.bg),
            None => Style::default(),
        }
    }

    fn color(&self, pick: fn(&TuiPalette) -> Color, fallback: Color) -> Color {
        self.palette.as_ref().map_or(fallback, pick)
    }

    fn accent(&self) -> Color {
        self.color(|p| p.accent, Color::Cyan)
    }

    fn ok(&self) -> Color {
        self.color(|p| p.ok, Color::Green)
    }

    fn warn(&self) -> Color {
        self.color(|p| p.warn, Color::Yellow)
    }

    fn error(&self) -> Color {
        self.color(|p| p.error, Color::Red)
    }

    pub(crate) fn status_style(&self, phase: &Phase) -> Style {
        let color = match phase {
            Phase::Ready => self.ok(),
            Phase::Initializing | Phase::Retrying { .. } => self.warn(),
            Phase::PermanentFailure => self.error(),
            Phase::Idle => return self.base_style().add_modifier(Modifier::DIM),
        };
        self.base_style()
            .fg(color)
            .add_modifier(Modifier::REVERSED | Modifier::BOLD)
    }

    pub(crate) fn scene_styles(&self) -> SceneStyles {
        let base = self.base_style();
        SceneStyles {
            base,
            border: base.add_modifier(Modifier::DIM),
            title: base.fg(self.accent()).add_modifier(Modifier::BOLD),
            done: base.fg(self.ok()),
            running: base.fg(self.warn()),
            pending: base.add_modifier(Modifier::DIM),
            failed: base.fg(self.error()),
        }
    }
}

#[derive(Debug, Clone)]
struct TuiPalette {
    fg: Color,
    bg: Color,
    accent: Color,
    ok: Color,
    warn: Color,
    error: Color,
}

impl TuiPalette {
    const CSV_LEN: usize = 6;

    fn parse_csv(value: &str) -> Result<Self, String> {
        let parts: Vec<&str> = value.split(',').map(|part| part.trim()).collect();
        if parts.len() != Self::CSV_LEN {
            return Err(format!(
                "expected {} comma-separated colors (fg,bg,accent,ok,warn,error), got {}",
                Self::CSV_LEN,
                parts.len()
            ));
        }

        Ok(Self {
            fg: parse_palette_color(parts[0])?,
            bg: parse_palette_color(parts[1])?,
            accent: parse_palette_color(parts[2])?,
            ok: parse_palette_color(parts[3])?,
            warn: parse_palette_color(parts[4])?,
            error: parse_palette_color(parts[5])?,
        })
    }
}

fn parse_palette_color(value: &str) -> Result<Color, String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err("empty color".to_string());
    }

    let lower = trimmed.to_ascii_lowercase();
    if let Some(rest) = lower.strip_prefix("rgb:") {
        let parts: Vec<&str> = rest.split('/').collect();
        if parts.len() != 3 {
            return Err(format!("invalid rgb: value: {trimmed}"));
        }
        let r = parse_hex_channel(parts[0])?;
        let g = parse_hex_channel(parts[1])?;
        let b = parse_hex_channel(parts[2])?;
        return Ok(Color::Rgb(r, g, b));
    }

    let hex = trimmed
        .strip_prefix('#')
        .or_else(|| trimmed.strip_prefix("0x"))
        .or_else(|| trimmed.strip_prefix("0X"))
        .unwrap_or(trimmed);

    if hex.len() != 6 || !hex.chars().all(|ch| ch.is_ascii_hexdigit()) {
        return Err(format!("invalid hex color: {trimmed} (expected #RRGGBB)"));
    }
    let rgb = u32::from_str_radix(hex, 16).map_err(|_| format!("invalid hex color: {trimmed}"))?;
    let r = ((rgb >> 16) & 0xFF) as u8;
    let g = ((rgb >> 8) & 0xFF) as u8;
    let b = (rgb & 0xFF) as u8;
    Ok(Color::Rgb(r, g, b))
}

fn parse_hex_channel(value: &str) -> Result<u8, String> {
    let value = value.trim();
    match value.len() {
        2 => u8::from_str_radix(value, 16).map_err(|_| format!("invalid rgb: component {value}")),
        4 => u16::from_str_radix(value, 16)
            .map(|parsed| (parsed >> 8) as u8)
            .map_err(|_| format!("invalid rgb: component {value}")),
        _ => Err(format!(
            "invalid rgb: component {value} (expected 2 or 4 hex digits)"
        )),
    }
}

#[derive(Debug, Clone)]
pub(crate) enum ThemeError {
    InvalidEnv { name: String, value: String },
}

impl fmt::Display for ThemeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidEnv { name, value } => write!(f, "invalid env {name}={value}"),
        }
    }
}

impl Error for ThemeError {}
