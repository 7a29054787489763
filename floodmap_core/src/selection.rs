// Copyright 2026 the Floodmap Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! User-facing selection state.
//!
//! Barrier mode is only meaningful for levels [`FloodLevel::BARRIER_MIN`]
//! through [`FloodLevel::BARRIER_MAX`]. Every setter restores that invariant
//! by forcing [`ScenarioMode::Base`] and reports when it did so.

use crate::level::{FloodLevel, LayerKey, ScenarioMode};

/// Whether a setter had to force base mode.
pub type Forced = bool;

/// Selected level, scenario mode, and menu flag.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Selection {
    level: FloodLevel,
    mode: ScenarioMode,
    menu_open: bool,
}

impl Selection {
    /// Creates a selection, forcing base mode if `mode` is not allowed at
    /// `level`.
    #[must_use]
    pub const fn new(level: FloodLevel, mode: ScenarioMode) -> Self {
        let mode = match mode {
            ScenarioMode::Barrier if !level.allows_barrier() => ScenarioMode::Base,
            mode => mode,
        };
        Self {
            level,
            mode,
            menu_open: false,
        }
    }

    /// Selected level.
    #[inline]
    #[must_use]
    pub const fn level(&self) -> FloodLevel {
        self.level
    }

    /// Selected scenario mode.
    #[inline]
    #[must_use]
    pub const fn mode(&self) -> ScenarioMode {
        self.mode
    }

    /// Whether the level menu is open.
    #[inline]
    #[must_use]
    pub const fn menu_open(&self) -> bool {
        self.menu_open
    }

    /// The matrix cell the selection points at.
    #[must_use]
    pub const fn target(&self) -> LayerKey {
        LayerKey::new(self.mode, self.level.tile_index())
    }

    /// Selects `level`.
    pub fn set_level(&mut self, level: FloodLevel) -> Forced {
        self.level = level;
        self.enforce()
    }

    /// Moves the level by `delta`, clamping at the ends of the range.
    pub fn step_level(&mut self, delta: i32) -> Forced {
        self.set_level(self.level.step(delta))
    }

    /// Selects `mode`. Barrier is refused outside the barrier range.
    pub fn set_mode(&mut self, mode: ScenarioMode) -> Forced {
        self.mode = mode;
        self.enforce()
    }

    /// Flips the scenario mode. Barrier is refused outside the barrier range.
    pub fn toggle_mode(&mut self) -> Forced {
        self.set_mode(self.mode.toggled())
    }

    /// Opens or closes the level menu.
    pub fn set_menu_open(&mut self, open: bool) {
        self.menu_open = open;
    }

    fn enforce(&mut self) -> Forced {
        if self.mode == ScenarioMode::Barrier && !self.level.allows_barrier() {
            self.mode = ScenarioMode::Base;
            true
        } else {
            false
        }
    }
}

impl Default for Selection {
    fn default() -> Self {
        Self::new(FloodLevel::BARRIER_MIN, ScenarioMode::Base)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::level::TileIndex;

    fn level(n: u8) -> FloodLevel {
        FloodLevel::new(n).unwrap()
    }

    #[test]
    fn leaving_barrier_range_forces_base() {
        let mut selection = Selection::new(level(16), ScenarioMode::Barrier);
        assert_eq!(selection.mode(), ScenarioMode::Barrier);
        assert!(selection.set_level(level(9)), "leaving 14..=18 must force");
        assert_eq!(selection.mode(), ScenarioMode::Base);
        assert!(!selection.set_level(level(15)), "already base");
        assert_eq!(selection.mode(), ScenarioMode::Base);
    }

    #[test]
    fn toggle_outside_barrier_range_stays_base() {
        for n in 1..FloodLevel::BARRIER_MIN.get() {
            let mut selection = Selection::new(level(n), ScenarioMode::Base);
            assert!(selection.toggle_mode(), "level {n} must refuse barrier");
            assert_eq!(selection.mode(), ScenarioMode::Base, "level {n}");
        }
    }

    #[test]
    fn toggle_inside_barrier_range_flips() {
        let mut selection = Selection::new(level(18), ScenarioMode::Base);
        assert!(!selection.toggle_mode(), "barrier allowed at 18");
        assert_eq!(selection.mode(), ScenarioMode::Barrier);
        assert!(!selection.toggle_mode(), "back to base is never forced");
        assert_eq!(selection.mode(), ScenarioMode::Base);
    }

    #[test]
    fn constructor_enforces_invariant() {
        let selection = Selection::new(level(3), ScenarioMode::Barrier);
        assert_eq!(selection.mode(), ScenarioMode::Base);
    }

    #[test]
    fn step_clamps_and_enforces() {
        let mut selection = Selection::new(level(14), ScenarioMode::Barrier);
        assert!(selection.step_level(-1), "13 does not allow barrier");
        assert_eq!(selection.level(), level(13));
        selection.step_level(100);
        assert_eq!(selection.level(), FloodLevel::MAX);
        selection.step_level(-100);
        assert_eq!(selection.level(), FloodLevel::MIN);
    }

    #[test]
    fn target_tracks_level_and_mode() {
        let mut selection = Selection::new(level(16), ScenarioMode::Barrier);
        assert_eq!(
            selection.target(),
            LayerKey::new(ScenarioMode::Barrier, TileIndex(72))
        );
        selection.toggle_mode();
        assert_eq!(
            selection.target(),
            LayerKey::new(ScenarioMode::Base, TileIndex(72))
        );
    }

    #[test]
    fn menu_flag_is_independent() {
        let mut selection = Selection::default();
        selection.set_menu_open(true);
        assert!(selection.menu_open());
        assert_eq!(selection.target(), Selection::default().target());
    }
}
