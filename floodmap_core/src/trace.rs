// Copyright 2026 the Floodmap Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Tracing and diagnostics for the layer engine.
//!
//! This module provides a [`TraceSink`] trait with per-event methods that the
//! engine calls at each step of an activation. All method bodies default to
//! no-ops, so implementing only the events you care about is fine.
//!
//! [`Tracer`] owns an optional boxed sink. When the `trace` feature is
//! **off**, every `Tracer` method compiles to nothing and the sink is never
//! stored. When **on**, each method performs a single `Option` branch before
//! dispatching.
//!
//! Superseded work is reported through [`TraceSink::on_stale`]; it is part of
//! normal operation, not an error.

use alloc::boxed::Box;

use crate::generation::Generation;
use crate::level::{FloodLevel, LayerKey, ScenarioMode, TileIndex};

// ---------------------------------------------------------------------------
// Enums
// ---------------------------------------------------------------------------

/// What happened at the readiness gate.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum GateAction {
    /// The style is not loaded; the activation was parked.
    Deferred,
    /// The style finished loading; the parked activation resumed.
    Released,
    /// There was no renderer; the activation was dropped.
    Dropped,
}

/// Result of ensuring one layer exists.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum EnsureOutcome {
    /// Source and/or layer were added to the renderer.
    Created,
    /// The layer already existed.
    Resident,
    /// No tileset is published for the combination.
    Unavailable,
    /// The renderer refused the source or layer.
    Rejected,
}

/// Which continuation a stale completion belonged to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Stage {
    /// Waiting for the style to load.
    StyleReady,
    /// Waiting for the renderer to go idle before rebinding hover.
    Idle,
}

/// Gauge poller activity.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum GaugeAction {
    /// A poll round started.
    PollStarted,
    /// A response for the current round was applied.
    Accepted,
    /// A response for an older round was dropped.
    StaleDropped,
    /// The round was cancelled.
    Cancelled,
}

// ---------------------------------------------------------------------------
// Event structs
// ---------------------------------------------------------------------------

/// Emitted when the selection changes and an activation starts.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SelectionEvent {
    /// Generation assigned to the activation.
    pub generation: Generation,
    /// Selected level, if the activation came from the level selector.
    pub level: Option<FloodLevel>,
    /// Target tile index.
    pub tile: TileIndex,
    /// Target mode.
    pub mode: ScenarioMode,
    /// Whether barrier mode was forced back to base.
    pub forced_base: bool,
}

/// Emitted at the readiness gate.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct GateEvent {
    /// Generation of the activation passing through the gate.
    pub generation: Generation,
    /// What the gate did.
    pub action: GateAction,
}

/// Emitted for every matrix cell an activation ensures.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct LayerEnsureEvent {
    /// Generation of the activation.
    pub generation: Generation,
    /// Matrix cell.
    pub key: LayerKey,
    /// What happened.
    pub outcome: EnsureOutcome,
}

/// Emitted once visibility has been applied across the matrix.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct VisibilityEvent {
    /// Generation of the activation.
    pub generation: Generation,
    /// The visible layer, or `None` if the combination is unavailable.
    pub active: Option<LayerKey>,
    /// Number of layers resident on the renderer.
    pub resident: usize,
}

/// Emitted when hover handlers are rebound.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct HoverEvent {
    /// Generation of the activation.
    pub generation: Generation,
    /// The layer now carrying hover handlers, if any.
    pub layer: Option<LayerKey>,
}

/// Emitted when a superseded continuation resumes and is discarded.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct StaleEvent {
    /// Generation the continuation was created under.
    pub stale: Generation,
    /// The engine's current generation.
    pub current: Generation,
    /// Which continuation it was.
    pub stage: Stage,
}

/// Emitted by the gauge poller.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct GaugeEvent {
    /// Poll round.
    pub round: u64,
    /// What happened.
    pub action: GaugeAction,
    /// Site index for per-site events.
    pub site: Option<usize>,
    /// Whether the site reading is live after this event.
    pub online: bool,
}

/// Emitted once when the engine is torn down.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TeardownEvent {
    /// Renderer listeners removed during teardown.
    pub listeners_removed: usize,
    /// Flood layers that were resident.
    pub layers_resident: usize,
}

// ---------------------------------------------------------------------------
// TraceSink trait
// ---------------------------------------------------------------------------

/// Receives trace events from the engine.
///
/// All methods have default no-op implementations, so you only need to
/// override the events you care about.
pub trait TraceSink {
    /// Called when an activation starts.
    fn on_selection(&mut self, e: &SelectionEvent) {
        _ = e;
    }

    /// Called when an activation passes the readiness gate.
    fn on_gate(&mut self, e: &GateEvent) {
        _ = e;
    }

    /// Called for every ensured layer.
    fn on_layer_ensure(&mut self, e: &LayerEnsureEvent) {
        _ = e;
    }

    /// Called after visibility is applied.
    fn on_visibility(&mut self, e: &VisibilityEvent) {
        _ = e;
    }

    /// Called after hover handlers are rebound.
    fn on_hover(&mut self, e: &HoverEvent) {
        _ = e;
    }

    /// Called when a stale continuation is discarded.
    fn on_stale(&mut self, e: &StaleEvent) {
        _ = e;
    }

    /// Called on gauge poller activity.
    fn on_gauge(&mut self, e: &GaugeEvent) {
        _ = e;
    }

    /// Called on teardown.
    fn on_teardown(&mut self, e: &TeardownEvent) {
        _ = e;
    }
}

// ---------------------------------------------------------------------------
// NoopSink
// ---------------------------------------------------------------------------

/// A [`TraceSink`] that discards all events.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoopSink;

impl TraceSink for NoopSink {}

// ---------------------------------------------------------------------------
// Tracer wrapper
// ---------------------------------------------------------------------------

/// Owner of an optional boxed [`TraceSink`].
///
/// When the `trace` feature is **off**, every method compiles to nothing.
#[derive(Default)]
pub struct Tracer {
    #[cfg(feature = "trace")]
    sink: Option<Box<dyn TraceSink>>,
}

impl core::fmt::Debug for Tracer {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Tracer").finish_non_exhaustive()
    }
}

macro_rules! dispatch {
    ($self:ident, $method:ident, $e:ident) => {{
        #[cfg(feature = "trace")]
        if let Some(s) = &mut $self.sink {
            s.$method($e);
        }
        #[cfg(not(feature = "trace"))]
        {
            _ = $e;
        }
    }};
}

impl Tracer {
    /// Creates a tracer that dispatches to `sink`.
    #[inline]
    #[must_use]
    pub fn new(sink: Box<dyn TraceSink>) -> Self {
        #[cfg(feature = "trace")]
        {
            Self { sink: Some(sink) }
        }
        #[cfg(not(feature = "trace"))]
        {
            _ = sink;
            Self {}
        }
    }

    /// Creates a tracer that discards all events.
    #[inline]
    #[must_use]
    pub fn none() -> Self {
        Self::default()
    }

    /// Returns whether events reach a sink.
    #[inline]
    #[must_use]
    pub fn is_enabled(&self) -> bool {
        #[cfg(feature = "trace")]
        {
            self.sink.is_some()
        }
        #[cfg(not(feature = "trace"))]
        {
            false
        }
    }

    /// Emits a [`SelectionEvent`].
    #[inline]
    pub fn selection(&mut self, e: &SelectionEvent) {
        dispatch!(self, on_selection, e);
    }

    /// Emits a [`GateEvent`].
    #[inline]
    pub fn gate(&mut self, e: &GateEvent) {
        dispatch!(self, on_gate, e);
    }

    /// Emits a [`LayerEnsureEvent`].
    #[inline]
    pub fn layer_ensure(&mut self, e: &LayerEnsureEvent) {
        dispatch!(self, on_layer_ensure, e);
    }

    /// Emits a [`VisibilityEvent`].
    #[inline]
    pub fn visibility(&mut self, e: &VisibilityEvent) {
        dispatch!(self, on_visibility, e);
    }

    /// Emits a [`HoverEvent`].
    #[inline]
    pub fn hover(&mut self, e: &HoverEvent) {
        dispatch!(self, on_hover, e);
    }

    /// Emits a [`StaleEvent`].
    #[inline]
    pub fn stale(&mut self, e: &StaleEvent) {
        dispatch!(self, on_stale, e);
    }

    /// Emits a [`GaugeEvent`].
    #[inline]
    pub fn gauge(&mut self, e: &GaugeEvent) {
        dispatch!(self, on_gauge, e);
    }

    /// Emits a [`TeardownEvent`].
    #[inline]
    pub fn teardown(&mut self, e: &TeardownEvent) {
        dispatch!(self, on_teardown, e);
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_selection() -> SelectionEvent {
        SelectionEvent {
            generation: Generation(3),
            level: FloodLevel::new(16),
            tile: TileIndex(72),
            mode: ScenarioMode::Barrier,
            forced_base: false,
        }
    }

    #[test]
    fn noop_sink_compiles() {
        let mut sink = NoopSink;
        sink.on_selection(&sample_selection());
        sink.on_teardown(&TeardownEvent {
            listeners_removed: 0,
            layers_resident: 0,
        });
    }

    #[test]
    fn tracer_none_does_nothing() {
        let mut tracer = Tracer::none();
        assert!(!tracer.is_enabled());
        tracer.selection(&sample_selection());
        tracer.stale(&StaleEvent {
            stale: Generation(1),
            current: Generation(2),
            stage: Stage::Idle,
        });
    }

    #[cfg(feature = "trace")]
    #[test]
    fn tracer_dispatches_to_sink() {
        use alloc::rc::Rc;
        use alloc::vec::Vec;
        use core::cell::RefCell;

        struct RecordingSink {
            generations: Rc<RefCell<Vec<u64>>>,
        }
        impl TraceSink for RecordingSink {
            fn on_selection(&mut self, e: &SelectionEvent) {
                self.generations.borrow_mut().push(e.generation.0);
            }
        }

        let generations = Rc::new(RefCell::new(Vec::new()));
        let mut tracer = Tracer::new(Box::new(RecordingSink {
            generations: Rc::clone(&generations),
        }));
        assert!(tracer.is_enabled());
        tracer.selection(&sample_selection());
        assert_eq!(*generations.borrow(), [3]);
    }
}
