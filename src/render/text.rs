// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Glassbowl-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Glassbowl and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

pub(crate) fn truncate_with_ellipsis(text: &str, max_len: usize) -> String {
    if max_len == 0 {
        return String::new();
    }

    if text_len(text) <= max_len {
        return text.to_owned();
    }

    if max_len == 1 {
        return "…".to_owned();
    }

    let mut out: String = text.chars().take(max_len - 1).collect();
    out.push('…');
    out
}

pub(crate) fn text_len(text: &str) -> usize {
    text.chars().count()
}

/// `done/total` plus a bar of `width` cells.
pub(crate) fn progress_bar(done: usize, total: usize, width: usize) -> String {
    let filled = if total == 0 { 0 } else { done.min(total) * width / total };
    let mut bar = String::with_capacity(width * 3);
    bar.extend(std::iter::repeat('█').take(filled));
    bar.extend(std::iter::repeat('░').take(width - filled));
    format!("{bar} {done}/{total}")
}
