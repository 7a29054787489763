// Copyright 2026 the Floodmap Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Engine configuration.

use crate::level::{FloodLevel, ScenarioMode};

/// Tunables for [`FloodMap`](crate::engine::FloodMap).
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct EngineConfig {
    /// Fill opacity applied to every flood layer.
    pub fill_opacity: f32,
    /// Feature attribute holding the water depth in feet.
    pub depth_property: &'static str,
    /// Text placed before the depth in the hover tooltip.
    pub tooltip_label: &'static str,
    /// Unit suffix after a numeric depth.
    pub depth_unit: &'static str,
    /// Level selected when the engine is created.
    pub initial_level: FloodLevel,
    /// Mode selected when the engine is created.
    pub initial_mode: ScenarioMode,
}

impl EngineConfig {
    /// Default configuration.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            fill_opacity: 0.6,
            depth_property: "depth",
            tooltip_label: "Water Depth",
            depth_unit: "ft",
            initial_level: FloodLevel::BARRIER_MIN,
            initial_mode: ScenarioMode::Base,
        }
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self::new()
    }
}
