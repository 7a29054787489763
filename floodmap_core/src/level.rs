// Copyright 2026 the Floodmap Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Flood levels, tile indices, and scenario modes.
//!
//! The user-facing selector works in [`FloodLevel`]s (1–18). Published
//! tilesets are addressed by [`TileIndex`], which is offset from the level by
//! a fixed amount: `tile = 64 + (level - 8)`. Only tile indices inside
//! [`TileIndex::MIN`]..=[`TileIndex::MAX`] can ever carry a tileset; anything
//! outside that matrix is simply unavailable.

use core::fmt;

/// A user-selectable flood level in `1..=18`.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct FloodLevel(u8);

impl FloodLevel {
    /// Lowest selectable level.
    pub const MIN: Self = Self(1);
    /// Highest selectable level.
    pub const MAX: Self = Self(18);
    /// Lowest level for which the barrier scenario exists.
    pub const BARRIER_MIN: Self = Self(14);
    /// Highest level for which the barrier scenario exists.
    pub const BARRIER_MAX: Self = Self(18);

    /// Returns the level if `n` is inside `1..=18`.
    #[must_use]
    pub const fn new(n: u8) -> Option<Self> {
        if n >= Self::MIN.0 && n <= Self::MAX.0 {
            Some(Self(n))
        } else {
            None
        }
    }

    /// Clamps `n` into the selectable range.
    #[must_use]
    pub const fn clamped(n: i32) -> Self {
        if n < Self::MIN.0 as i32 {
            Self::MIN
        } else if n > Self::MAX.0 as i32 {
            Self::MAX
        } else {
            #[expect(
                clippy::cast_possible_truncation,
                clippy::cast_sign_loss,
                reason = "bounds checked above"
            )]
            let n = n as u8;
            Self(n)
        }
    }

    /// Returns the raw level number.
    #[inline]
    #[must_use]
    pub const fn get(self) -> u8 {
        self.0
    }

    /// Returns the tile index this level is published under.
    #[inline]
    #[must_use]
    pub const fn tile_index(self) -> TileIndex {
        TileIndex(self.0 as u16 + TileIndex::LEVEL_OFFSET)
    }

    /// Returns whether the barrier scenario is defined at this level.
    #[inline]
    #[must_use]
    pub const fn allows_barrier(self) -> bool {
        self.0 >= Self::BARRIER_MIN.0 && self.0 <= Self::BARRIER_MAX.0
    }

    /// Returns the level `delta` steps away, clamped into range.
    #[must_use]
    pub const fn step(self, delta: i32) -> Self {
        Self::clamped(self.0 as i32 + delta)
    }
}

impl fmt::Debug for FloodLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "FloodLevel({})", self.0)
    }
}

impl fmt::Display for FloodLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ft", self.0)
    }
}

/// Index of a published flood tileset.
///
/// Unlike [`FloodLevel`], a `TileIndex` is not range-checked on
/// construction: an index outside the matrix is a valid value that just
/// never has a tileset.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TileIndex(pub u16);

impl TileIndex {
    /// First index of the tileset matrix.
    pub const MIN: Self = Self(64);
    /// Last index of the tileset matrix.
    pub const MAX: Self = Self(76);
    /// First index with a barrier variant.
    pub const BARRIER_MIN: Self = Self(70);
    /// Last index with a barrier variant.
    pub const BARRIER_MAX: Self = Self(74);
    /// Number of indices in the matrix.
    pub const COUNT: usize = (Self::MAX.0 - Self::MIN.0 + 1) as usize;

    /// `tile = level + LEVEL_OFFSET`, i.e. `64 + (level - 8)`.
    const LEVEL_OFFSET: u16 = 56;

    /// Returns whether this index lies inside the tileset matrix.
    #[inline]
    #[must_use]
    pub const fn in_matrix(self) -> bool {
        self.0 >= Self::MIN.0 && self.0 <= Self::MAX.0
    }

    /// Returns whether a barrier tileset may exist at this index.
    #[inline]
    #[must_use]
    pub const fn allows_barrier(self) -> bool {
        self.0 >= Self::BARRIER_MIN.0 && self.0 <= Self::BARRIER_MAX.0
    }

    /// Returns the zero-based offset into the matrix, if inside it.
    #[inline]
    #[must_use]
    pub const fn matrix_offset(self) -> Option<usize> {
        if self.in_matrix() {
            Some((self.0 - Self::MIN.0) as usize)
        } else {
            None
        }
    }

    /// Iterates every index of the matrix in ascending order.
    pub fn matrix() -> impl Iterator<Item = Self> {
        (Self::MIN.0..=Self::MAX.0).map(Self)
    }
}

impl fmt::Debug for TileIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TileIndex({})", self.0)
    }
}

impl fmt::Display for TileIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Which inundation dataset is shown.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ScenarioMode {
    /// Baseline inundation without mitigation.
    #[default]
    Base,
    /// Inundation with the HESCO barrier deployed.
    Barrier,
}

impl ScenarioMode {
    /// Both modes, base first.
    pub const ALL: [Self; 2] = [Self::Base, Self::Barrier];

    /// Returns the other mode.
    #[must_use]
    pub const fn toggled(self) -> Self {
        match self {
            Self::Base => Self::Barrier,
            Self::Barrier => Self::Base,
        }
    }

    /// Returns a short lowercase name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Base => "base",
            Self::Barrier => "barrier",
        }
    }
}

/// A `(mode, tile)` pair naming one cell of the layer matrix.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct LayerKey {
    /// Scenario mode.
    pub mode: ScenarioMode,
    /// Tile index.
    pub tile: TileIndex,
}

impl LayerKey {
    /// Creates a key.
    #[inline]
    #[must_use]
    pub const fn new(mode: ScenarioMode, tile: TileIndex) -> Self {
        Self { mode, tile }
    }

    /// Iterates the full matrix: every tile index in both modes.
    pub fn matrix() -> impl Iterator<Item = Self> {
        ScenarioMode::ALL
            .into_iter()
            .flat_map(|mode| TileIndex::matrix().map(move |tile| Self::new(mode, tile)))
    }
}

impl fmt::Debug for LayerKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "LayerKey({}@{})", self.mode.as_str(), self.tile.0)
    }
}
