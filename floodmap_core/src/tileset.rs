// Copyright 2026 the Floodmap Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Mapping from `(mode, tile)` to remote tileset identifiers.
//!
//! A missing entry is not an error: it means no tileset was published for
//! that combination, and the layer engine treats it as "unavailable".

use alloc::collections::BTreeMap;
use alloc::format;
use alloc::string::String;
use core::fmt;

use serde::Deserialize;

use crate::level::{LayerKey, ScenarioMode, TileIndex};

/// One published tileset.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
pub struct TilesetEntry {
    /// Remote tileset identifier (e.g. `account.tileset`).
    pub tileset: String,
    /// Name of the layer inside the vector tiles.
    pub source_layer: String,
}

impl TilesetEntry {
    /// Creates an entry.
    #[must_use]
    pub fn new(tileset: impl Into<String>, source_layer: impl Into<String>) -> Self {
        Self {
            tileset: tileset.into(),
            source_layer: source_layer.into(),
        }
    }

    /// Returns the tile URL the renderer should fetch from.
    #[must_use]
    pub fn url(&self) -> String {
        format!("mapbox://{}", self.tileset)
    }
}

/// Errors from [`TilesetRegistry::from_json`].
#[derive(Debug)]
pub enum RegistryError {
    /// The manifest is not valid JSON or has the wrong shape.
    Parse(serde_json::Error),
    /// An entry names a tile index outside the matrix.
    TileOutOfRange(ScenarioMode, u16),
    /// A barrier entry names a tile index without a barrier scenario.
    BarrierOutOfRange(u16),
}

impl fmt::Display for RegistryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Parse(err) => write!(f, "invalid tileset manifest: {err}"),
            Self::TileOutOfRange(mode, tile) => write!(
                f,
                "{} tile {tile} is outside {}..={}",
                mode.as_str(),
                TileIndex::MIN,
                TileIndex::MAX
            ),
            Self::BarrierOutOfRange(tile) => write!(
                f,
                "barrier tile {tile} is outside {}..={}",
                TileIndex::BARRIER_MIN,
                TileIndex::BARRIER_MAX
            ),
        }
    }
}

impl core::error::Error for RegistryError {}

#[derive(Deserialize)]
struct Manifest {
    #[serde(default)]
    base: BTreeMap<u16, TilesetEntry>,
    #[serde(default)]
    barrier: BTreeMap<u16, TilesetEntry>,
}

/// Static `(mode, tile) → tileset` table.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TilesetRegistry {
    base: [Option<TilesetEntry>; TileIndex::COUNT],
    barrier: [Option<TilesetEntry>; TileIndex::COUNT],
}

/// Stock base-scenario tilesets, indexed by `tile - 64`.
const BUILTIN_BASE: [(&str, &str); TileIndex::COUNT] = [
    ("floodmap.flood64-6k1q2w", "flood64"),
    ("floodmap.flood65-0d9r4x", "flood65"),
    ("floodmap.flood66-4m7t1c", "flood66"),
    ("floodmap.flood67-8p2v6z", "flood67"),
    ("floodmap.flood68-2h5n9b", "flood68"),
    ("floodmap.flood69-7s3k0f", "flood69"),
    ("floodmap.flood70-1j8w5d", "flood70"),
    ("floodmap.flood71-5c4y7g", "flood71"),
    ("floodmap.flood72-9a6e3m", "flood72"),
    ("floodmap.flood73-3t0u8q", "flood73"),
    ("floodmap.flood74-6r1i2l", "flood74"),
    ("floodmap.flood75-0v9o4n", "flood75"),
    ("floodmap.flood76-4x7b6k", "flood76"),
];

/// Stock barrier-scenario tilesets for tiles 70..=74.
const BUILTIN_BARRIER: [(&str, &str); 5] = [
    ("floodmap.hesco70-2q8f1a", "hesco70"),
    ("floodmap.hesco71-6w3g5s", "hesco71"),
    ("floodmap.hesco72-0e7h9d", "hesco72"),
    ("floodmap.hesco73-4r2j3f", "hesco73"),
    ("floodmap.hesco74-8t6k7g", "hesco74"),
];

impl TilesetRegistry {
    /// Creates an empty registry (every combination unavailable).
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    /// Returns the stock registry shipped with the map.
    #[must_use]
    pub fn builtin() -> Self {
        let mut registry = Self::empty();
        for (tile, (tileset, layer)) in TileIndex::matrix().zip(BUILTIN_BASE) {
            registry.insert(ScenarioMode::Base, tile, TilesetEntry::new(tileset, layer));
        }
        let barrier_tiles = (TileIndex::BARRIER_MIN.0..=TileIndex::BARRIER_MAX.0).map(TileIndex);
        for (tile, (tileset, layer)) in barrier_tiles.zip(BUILTIN_BARRIER) {
            registry.insert(
                ScenarioMode::Barrier,
                tile,
                TilesetEntry::new(tileset, layer),
            );
        }
        registry
    }

    /// Parses a JSON manifest of the form
    /// `{"base": {"64": {"tileset": …, "source_layer": …}}, "barrier": {…}}`.
    pub fn from_json(json: &str) -> Result<Self, RegistryError> {
        let manifest: Manifest = serde_json::from_str(json).map_err(RegistryError::Parse)?;
        let mut registry = Self::empty();
        for (mode, entries) in [
            (ScenarioMode::Base, manifest.base),
            (ScenarioMode::Barrier, manifest.barrier),
        ] {
            for (raw, entry) in entries {
                let tile = TileIndex(raw);
                if !tile.in_matrix() {
                    return Err(RegistryError::TileOutOfRange(mode, raw));
                }
                if mode == ScenarioMode::Barrier && !tile.allows_barrier() {
                    return Err(RegistryError::BarrierOutOfRange(raw));
                }
                registry.insert(mode, tile, entry);
            }
        }
        Ok(registry)
    }

    /// Inserts or replaces an entry, returning the previous one.
    ///
    /// Returns `None` and stores nothing if `tile` is outside the matrix.
    pub fn insert(
        &mut self,
        mode: ScenarioMode,
        tile: TileIndex,
        entry: TilesetEntry,
    ) -> Option<TilesetEntry> {
        let offset = tile.matrix_offset()?;
        self.column_mut(mode)[offset].replace(entry)
    }

    /// Removes an entry, returning it.
    pub fn remove(&mut self, mode: ScenarioMode, tile: TileIndex) -> Option<TilesetEntry> {
        let offset = tile.matrix_offset()?;
        self.column_mut(mode)[offset].take()
    }

    /// Looks up the tileset for `key`.
    #[must_use]
    pub fn get(&self, key: LayerKey) -> Option<&TilesetEntry> {
        let offset = key.tile.matrix_offset()?;
        self.column(key.mode)[offset].as_ref()
    }

    /// Returns whether a tileset exists for `key`.
    #[must_use]
    pub fn contains(&self, key: LayerKey) -> bool {
        self.get(key).is_some()
    }

    /// Number of published combinations.
    #[must_use]
    pub fn len(&self) -> usize {
        self.base.iter().chain(&self.barrier).flatten().count()
    }

    /// Returns `true` if nothing is published.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn column(&self, mode: ScenarioMode) -> &[Option<TilesetEntry>; TileIndex::COUNT] {
        match mode {
            ScenarioMode::Base => &self.base,
            ScenarioMode::Barrier => &self.barrier,
        }
    }

    fn column_mut(&mut self, mode: ScenarioMode) -> &mut [Option<TilesetEntry>; TileIndex::COUNT] {
        match mode {
            ScenarioMode::Base => &mut self.base,
            ScenarioMode::Barrier => &mut self.barrier,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(mode: ScenarioMode, tile: u16) -> LayerKey {
        LayerKey::new(mode, TileIndex(tile))
    }

    #[test]
    fn builtin_covers_base_matrix_and_barrier_subrange() {
        let registry = TilesetRegistry::builtin();
        for tile in TileIndex::matrix() {
            assert!(
                registry.contains(LayerKey::new(ScenarioMode::Base, tile)),
                "base tile {tile} missing"
            );
            assert_eq!(
                registry.contains(LayerKey::new(ScenarioMode::Barrier, tile)),
                tile.allows_barrier(),
                "barrier availability wrong at tile {tile}"
            );
        }
        assert_eq!(registry.len(), 18);
    }

    #[test]
    fn lookup_outside_matrix_is_absent() {
        let registry = TilesetRegistry::builtin();
        assert_eq!(registry.get(key(ScenarioMode::Base, 82)), None);
        assert_eq!(registry.get(key(ScenarioMode::Base, 57)), None);
    }

    #[test]
    fn insert_outside_matrix_is_ignored() {
        let mut registry = TilesetRegistry::empty();
        let previous = registry.insert(
            ScenarioMode::Base,
            TileIndex(90),
            TilesetEntry::new("a.b", "b"),
        );
        assert_eq!(previous, None);
        assert!(registry.is_empty());
    }

    #[test]
    fn entry_url_uses_mapbox_scheme() {
        let entry = TilesetEntry::new("floodmap.flood73-x", "flood73");
        assert_eq!(entry.url(), "mapbox://floodmap.flood73-x");
    }

    #[test]
    fn manifest_parses() {
        let registry = TilesetRegistry::from_json(
            r#"{
                "base": {"73": {"tileset": "acct.flood73", "source_layer": "f73"}},
                "barrier": {"72": {"tileset": "acct.hesco72", "source_layer": "h72"}}
            }"#,
        )
        .unwrap();
        assert_eq!(registry.len(), 2);
        assert_eq!(
            registry.get(key(ScenarioMode::Base, 73)).unwrap().tileset,
            "acct.flood73"
        );
        assert_eq!(
            registry
                .get(key(ScenarioMode::Barrier, 72))
                .unwrap()
                .source_layer,
            "h72"
        );
    }

    #[test]
    fn manifest_rejects_tiles_outside_matrix() {
        let err = TilesetRegistry::from_json(
            r#"{"base": {"82": {"tileset": "a.b", "source_layer": "b"}}}"#,
        )
        .unwrap_err();
        assert!(
            matches!(err, RegistryError::TileOutOfRange(ScenarioMode::Base, 82)),
            "got {err:?}"
        );
    }

    #[test]
    fn manifest_rejects_barrier_outside_subrange() {
        let err = TilesetRegistry::from_json(
            r#"{"barrier": {"65": {"tileset": "a.b", "source_layer": "b"}}}"#,
        )
        .unwrap_err();
        assert!(
            matches!(err, RegistryError::BarrierOutOfRange(65)),
            "got {err:?}"
        );
    }

    #[test]
    fn manifest_rejects_malformed_json() {
        let err = TilesetRegistry::from_json("{not json").unwrap_err();
        assert!(matches!(err, RegistryError::Parse(_)), "got {err:?}");
    }
}
