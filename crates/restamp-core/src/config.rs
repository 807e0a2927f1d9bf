// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Engine and application configuration.

use serde::{Deserialize, Serialize};

use crate::types::{PaperSize, Rgb};

/// Tunables for the rewrite engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Maximum distance between a run's baseline and a line's running
    /// baseline for the run to join that line.
    pub baseline_tolerance: f32,
    /// Extra margin painted around each erased line box.
    pub erase_margin: f32,
    /// Fill colour used to cover original glyphs.
    pub background: Rgb,
    /// Colour used for replacement text.
    pub text_color: Rgb,
    /// Size used when a line carries no usable font size.
    pub default_font_size: f32,
    /// Page margin for fresh (fallback) documents.
    pub page_margin: f32,
    /// Font size for fresh (fallback) documents.
    pub fallback_font_size: f32,
    /// Leading as a multiple of the fallback font size.
    pub leading_multiplier: f32,
    /// Page size for fresh documents when the source has no pages.
    pub fallback_paper_size: PaperSize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            baseline_tolerance: 1.5,
            erase_margin: 1.0,
            background: Rgb::WHITE,
            text_color: Rgb::BLACK,
            default_font_size: 10.0,
            page_margin: 50.0,
            fallback_font_size: 12.0,
            leading_multiplier: 1.4,
            fallback_paper_size: PaperSize::Letter,
        }
    }
}

/// Persistent application settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Rewrite engine tunables.
    pub engine: EngineConfig,
    /// Processing history settings.
    pub history: HistoryConfig,
}

/// Settings for the processing history store.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HistoryConfig {
    /// Record every successful rewrite.
    pub enabled: bool,
    /// Number of entries returned by history queries.
    pub recent_limit: u32,
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            recent_limit: 10,
        }
    }
}
