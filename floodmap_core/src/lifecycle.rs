// Copyright 2026 the Floodmap Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Creation and visibility of flood layers.
//!
//! Layers are created lazily and, once created, stay resident for the rest
//! of the session: switching level or mode only flips `visibility`. Both
//! scenario variants of a tile are kept side by side, so a mode switch never
//! removes a layer and never refetches its tiles.
//!
//! The only removal path is [`LayerLifecycle::purge_changed`], used when the
//! tileset registry itself is replaced.

use alloc::collections::BTreeMap;

use crate::generation::Generation;
use crate::ids::LayerIdentity;
use crate::level::{LayerKey, TileIndex};
use crate::renderer::{FillColor, FillLayer, Renderer, Visibility};
use crate::tileset::{TilesetEntry, TilesetRegistry};
use crate::trace::{EnsureOutcome, LayerEnsureEvent, Tracer, VisibilityEvent};

/// Lifecycle phase of the layer engine for one renderer instance.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum Phase {
    /// No activation has been requested yet.
    #[default]
    Uninitialized,
    /// The first activation is waiting for the style to load.
    Initializing,
    /// Layers can be toggled freely.
    Ready,
    /// The renderer was torn down.
    Disposed,
}

/// Result of [`LayerLifecycle::ensure_layer`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum LayerStatus {
    /// The layer exists on the renderer.
    Ready(LayerIdentity),
    /// No layer can exist for this combination.
    Unavailable,
}

/// Fill colours by `tile - 64`, shallow (light) to deep (dark).
const PALETTE: [FillColor; TileIndex::COUNT] = [
    FillColor([0xde, 0xeb, 0xf7]),
    FillColor([0xc6, 0xdb, 0xef]),
    FillColor([0xb0, 0xd0, 0xe8]),
    FillColor([0x9e, 0xca, 0xe1]),
    FillColor([0x84, 0xbc, 0xdb]),
    FillColor([0x6b, 0xae, 0xd6]),
    FillColor([0x57, 0xa0, 0xce]),
    FillColor([0x42, 0x92, 0xc6]),
    FillColor([0x31, 0x82, 0xbd]),
    FillColor([0x21, 0x71, 0xb5]),
    FillColor([0x10, 0x60, 0xa8]),
    FillColor([0x08, 0x51, 0x9c]),
    FillColor([0x08, 0x30, 0x6b]),
];

/// Returns the fill colour for `tile`, or `None` outside the matrix.
#[must_use]
pub fn fill_color(tile: TileIndex) -> Option<FillColor> {
    tile.matrix_offset().map(|offset| PALETTE[offset])
}

/// Tracks which flood layers are resident and drives their visibility.
#[derive(Debug)]
pub struct LayerLifecycle {
    phase: Phase,
    /// Resident layers and the entry each was built from.
    resident: BTreeMap<LayerKey, TilesetEntry>,
    opacity: f32,
}

impl LayerLifecycle {
    /// Creates a lifecycle with no resident layers.
    #[must_use]
    pub fn new(opacity: f32) -> Self {
        Self {
            phase: Phase::Uninitialized,
            resident: BTreeMap::new(),
            opacity,
        }
    }

    /// Returns the current phase.
    #[must_use]
    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// Marks that an activation is waiting for the style.
    ///
    /// Only the very first wait moves the phase; once `Ready`, the phase
    /// never regresses.
    pub fn waiting_for_style(&mut self) {
        if self.phase == Phase::Uninitialized {
            self.phase = Phase::Initializing;
        }
    }

    /// Number of resident layers.
    #[must_use]
    pub fn resident_count(&self) -> usize {
        self.resident.len()
    }

    /// Returns whether the layer for `key` was created by this lifecycle.
    #[must_use]
    pub fn is_resident(&self, key: LayerKey) -> bool {
        self.resident.contains_key(&key)
    }

    /// Makes sure the layer for `key` exists, creating its source and fill
    /// layer (initially hidden) if needed.
    ///
    /// Idempotent. Returns [`LayerStatus::Unavailable`] when no tileset is
    /// published for `key` or the renderer refused the additions.
    pub fn ensure_layer<R: Renderer + ?Sized>(
        &mut self,
        renderer: &mut R,
        registry: &TilesetRegistry,
        key: LayerKey,
    ) -> (LayerStatus, EnsureOutcome) {
        let (Some(entry), Some(color)) = (registry.get(key), fill_color(key.tile)) else {
            return (LayerStatus::Unavailable, EnsureOutcome::Unavailable);
        };
        let identity = LayerIdentity::of(key);
        if renderer.has_layer(identity.layer_id()) {
            self.resident.entry(key).or_insert_with(|| entry.clone());
            return (LayerStatus::Ready(identity), EnsureOutcome::Resident);
        }

        let added_source = !renderer.has_source(identity.source_id());
        if added_source
            && renderer
                .add_vector_source(identity.source_id(), &entry.url())
                .is_err()
        {
            return (LayerStatus::Unavailable, EnsureOutcome::Rejected);
        }
        let layer = FillLayer {
            id: identity.layer_id(),
            source: identity.source_id(),
            source_layer: &entry.source_layer,
            color,
            opacity: self.opacity,
            visibility: Visibility::None,
        };
        if renderer.add_fill_layer(&layer).is_err() {
            // Nothing tracks a source without its layer.
            if added_source {
                renderer.remove_source(identity.source_id());
            }
            return (LayerStatus::Unavailable, EnsureOutcome::Rejected);
        }
        self.resident.insert(key, entry.clone());
        (LayerStatus::Ready(identity), EnsureOutcome::Created)
    }

    /// Ensures every layer of the matrix and shows exactly the one for
    /// `target`.
    ///
    /// Returns the identity of the visible layer, or `None` if `target` is
    /// unavailable (in which case every layer is hidden).
    pub fn activate<R: Renderer + ?Sized>(
        &mut self,
        renderer: &mut R,
        registry: &TilesetRegistry,
        target: LayerKey,
        generation: Generation,
        tracer: &mut Tracer,
    ) -> Option<LayerIdentity> {
        let mut active = None;
        for key in LayerKey::matrix() {
            let (status, outcome) = self.ensure_layer(renderer, registry, key);
            tracer.layer_ensure(&LayerEnsureEvent {
                generation,
                key,
                outcome,
            });
            let LayerStatus::Ready(identity) = status else {
                continue;
            };
            if key == target {
                renderer.set_visibility(identity.layer_id(), Visibility::Visible);
                active = Some(identity);
            } else {
                renderer.set_visibility(identity.layer_id(), Visibility::None);
            }
        }
        self.phase = Phase::Ready;
        tracer.visibility(&VisibilityEvent {
            generation,
            active: active.as_ref().map(LayerIdentity::key),
            resident: self.resident.len(),
        });
        active
    }

    /// Removes resident layers whose entry differs in `registry` (tileset or
    /// source layer) or is no longer published. Returns how many layers were
    /// removed.
    pub fn purge_changed<R: Renderer + ?Sized>(
        &mut self,
        renderer: &mut R,
        registry: &TilesetRegistry,
    ) -> usize {
        let before = self.resident.len();
        self.resident.retain(|&key, built_from| {
            let unchanged = registry.get(key) == Some(&*built_from);
            if !unchanged {
                let identity = LayerIdentity::of(key);
                renderer.remove_layer(identity.layer_id());
                renderer.remove_source(identity.source_id());
            }
            unchanged
        });
        before - self.resident.len()
    }

    /// Forgets every resident layer and enters [`Phase::Disposed`].
    ///
    /// The renderer is about to be destroyed, which disposes its layers.
    pub fn dispose(&mut self) -> usize {
        let resident = self.resident.len();
        self.resident.clear();
        self.phase = Phase::Disposed;
        resident
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn palette_is_defined_exactly_on_the_matrix() {
        for tile in TileIndex::matrix() {
            assert!(fill_color(tile).is_some(), "tile {tile} has no colour");
        }
        assert_eq!(fill_color(TileIndex(63)), None);
        assert_eq!(fill_color(TileIndex(77)), None);
    }

    #[test]
    fn palette_is_distinct_per_level() {
        for (i, a) in PALETTE.iter().enumerate() {
            for b in &PALETTE[i + 1..] {
                assert_ne!(a, b, "palette entries must differ");
            }
        }
    }

    #[test]
    fn phase_only_advances_from_uninitialized() {
        let mut lifecycle = LayerLifecycle::new(0.6);
        assert_eq!(lifecycle.phase(), Phase::Uninitialized);
        lifecycle.waiting_for_style();
        assert_eq!(lifecycle.phase(), Phase::Initializing);
        lifecycle.phase = Phase::Ready;
        lifecycle.waiting_for_style();
        assert_eq!(lifecycle.phase(), Phase::Ready, "Ready never regresses");
        assert_eq!(lifecycle.dispose(), 0);
        assert_eq!(lifecycle.phase(), Phase::Disposed);
    }
}
