// Copyright 2026 the Floodmap Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Deterministic source and layer identifiers.
//!
//! Identity is a pure function of [`LayerKey`]: base layers are named
//! `flood{tile}` / `flood{tile}-fill` and barrier layers `hesco{tile}` /
//! `hesco{tile}-fill`, so the two modes never collide at the same tile.

use alloc::format;
use alloc::string::String;
use core::fmt;

use crate::level::{LayerKey, ScenarioMode, TileIndex};

/// Renderer-side names for one cell of the layer matrix.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct LayerIdentity {
    key: LayerKey,
    source_id: String,
    layer_id: String,
}

impl LayerIdentity {
    /// Derives the identity for `key`.
    #[must_use]
    pub fn of(key: LayerKey) -> Self {
        Self {
            key,
            source_id: source_id(key),
            layer_id: layer_id(key),
        }
    }

    /// Returns the matrix cell this identity names.
    #[inline]
    #[must_use]
    pub fn key(&self) -> LayerKey {
        self.key
    }

    /// Returns the renderer source id.
    #[inline]
    #[must_use]
    pub fn source_id(&self) -> &str {
        &self.source_id
    }

    /// Returns the renderer layer id.
    #[inline]
    #[must_use]
    pub fn layer_id(&self) -> &str {
        &self.layer_id
    }
}

impl fmt::Debug for LayerIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "LayerIdentity({})", self.layer_id)
    }
}

fn prefix(mode: ScenarioMode) -> &'static str {
    match mode {
        ScenarioMode::Base => "flood",
        ScenarioMode::Barrier => "hesco",
    }
}

/// Returns the source id for `key`.
#[must_use]
pub fn source_id(key: LayerKey) -> String {
    format!("{}{}", prefix(key.mode), key.tile.0)
}

/// Returns the fill layer id for `key`.
#[must_use]
pub fn layer_id(key: LayerKey) -> String {
    format!("{}{}-fill", prefix(key.mode), key.tile.0)
}

/// Recovers the key from a layer id produced by [`layer_id`].
#[must_use]
pub fn parse_layer_id(id: &str) -> Option<LayerKey> {
    let stem = id.strip_suffix("-fill")?;
    let (mode, digits) = if let Some(rest) = stem.strip_prefix("flood") {
        (ScenarioMode::Base, rest)
    } else if let Some(rest) = stem.strip_prefix("hesco") {
        (ScenarioMode::Barrier, rest)
    } else {
        return None;
    };
    let tile = digits.parse().ok()?;
    Some(LayerKey::new(mode, TileIndex(tile)))
}
