// Copyright 2026 the Floodmap Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The flood-map state engine.
//!
//! [`FloodMap`] owns the renderer handle and ties the pieces together:
//!
//! ```text
//! selection change
//!   -> new Generation, supersede pending idle / gate waiters
//!   -> ReadinessGate (park until styledata if the style is loading)
//!   -> LayerLifecycle::activate (ensure the matrix, flip visibility)
//!   -> once(idle)
//!   -> HoverBinding::bind (active layer, or nothing)
//! ```
//!
//! Every continuation is stored as data tagged with the generation it was
//! created under. The host forwards renderer notifications with
//! [`FloodMap::dispatch`]; a notification for a superseded continuation no
//! longer matches any stored listener and is ignored.

use alloc::boxed::Box;
use alloc::vec::Vec;
use core::fmt;

use crate::config::EngineConfig;
use crate::gate::{Admission, ReadinessGate};
use crate::generation::Generation;
use crate::hover::HoverBinding;
use crate::ids::LayerIdentity;
use crate::level::{FloodLevel, LayerKey, ScenarioMode, TileIndex};
use crate::lifecycle::{LayerLifecycle, LayerStatus, Phase};
use crate::renderer::{ListenerId, MapEvent, OnceEvent, Renderer};
use crate::selection::Selection;
use crate::tileset::TilesetRegistry;
use crate::trace::{
    GateAction, GateEvent, HoverEvent, LayerEnsureEvent, SelectionEvent, Stage, StaleEvent,
    TeardownEvent, TraceSink, Tracer,
};

/// Observer of active-layer changes.
pub type ActiveObserver = Box<dyn FnMut(Option<&LayerIdentity>)>;

/// Snapshot of one activation request.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct Activation {
    generation: Generation,
    target: LayerKey,
}

/// Hover rebind waiting for the renderer to go idle.
#[derive(Debug)]
struct IdleWait {
    listener: ListenerId,
    generation: Generation,
    active: Option<LayerIdentity>,
}

/// Layer-lifecycle and hover-binding engine for one map.
pub struct FloodMap<R: Renderer> {
    renderer: Option<R>,
    config: EngineConfig,
    registry: TilesetRegistry,
    selection: Selection,
    lifecycle: LayerLifecycle,
    hover: HoverBinding,
    gate: ReadinessGate<Activation>,
    idle: Option<IdleWait>,
    generation: Generation,
    loading: bool,
    active: Option<LayerIdentity>,
    notified: Option<LayerKey>,
    observers: Vec<ActiveObserver>,
    tracer: Tracer,
}

impl<R: Renderer> fmt::Debug for FloodMap<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FloodMap")
            .field("phase", &self.lifecycle.phase())
            .field("generation", &self.generation)
            .field("selection", &self.selection)
            .field("active", &self.active)
            .field("loading", &self.loading)
            .field("resident", &self.lifecycle.resident_count())
            .field("observers", &self.observers.len())
            .finish_non_exhaustive()
    }
}

impl<R: Renderer> FloodMap<R> {
    /// Creates an engine over `renderer`.
    ///
    /// Nothing is sent to the renderer until the first activation; call
    /// [`refresh`](Self::refresh) once the map is mounted to show the
    /// initial selection.
    #[must_use]
    pub fn new(renderer: R, registry: TilesetRegistry, config: EngineConfig) -> Self {
        Self {
            renderer: Some(renderer),
            selection: Selection::new(config.initial_level, config.initial_mode),
            lifecycle: LayerLifecycle::new(config.fill_opacity),
            hover: HoverBinding::new(&config),
            config,
            registry,
            gate: ReadinessGate::new(),
            idle: None,
            generation: Generation::default(),
            loading: false,
            active: None,
            notified: None,
            observers: Vec::new(),
            tracer: Tracer::none(),
        }
    }

    /// Routes trace events to `sink`.
    #[must_use]
    pub fn with_trace_sink(mut self, sink: Box<dyn TraceSink>) -> Self {
        self.tracer = Tracer::new(sink);
        self
    }

    // -----------------------------------------------------------------------
    // Accessors
    // -----------------------------------------------------------------------

    /// The renderer, until teardown.
    #[must_use]
    pub fn renderer(&self) -> Option<&R> {
        self.renderer.as_ref()
    }

    /// Mutable access to the renderer, until teardown.
    pub fn renderer_mut(&mut self) -> Option<&mut R> {
        self.renderer.as_mut()
    }

    /// Engine configuration.
    #[must_use]
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Current tileset registry.
    #[must_use]
    pub fn registry(&self) -> &TilesetRegistry {
        &self.registry
    }

    /// Current selection.
    #[must_use]
    pub fn selection(&self) -> &Selection {
        &self.selection
    }

    /// Selected level.
    #[must_use]
    pub fn level(&self) -> FloodLevel {
        self.selection.level()
    }

    /// Selected scenario mode.
    #[must_use]
    pub fn scenario_mode(&self) -> ScenarioMode {
        self.selection.mode()
    }

    /// Whether the level menu is open.
    #[must_use]
    pub fn menu_open(&self) -> bool {
        self.selection.menu_open()
    }

    /// Lifecycle phase.
    #[must_use]
    pub fn phase(&self) -> Phase {
        self.lifecycle.phase()
    }

    /// Generation of the latest activation.
    #[must_use]
    pub fn generation(&self) -> Generation {
        self.generation
    }

    /// True from the start of an activation until its hover rebind.
    #[must_use]
    pub fn is_loading(&self) -> bool {
        self.loading
    }

    /// The visible layer after the latest settled activation.
    #[must_use]
    pub fn active_layer(&self) -> Option<&LayerIdentity> {
        self.active.as_ref()
    }

    /// The layer currently carrying hover handlers.
    #[must_use]
    pub fn hover_layer(&self) -> Option<&LayerIdentity> {
        self.hover.bound_layer()
    }

    /// Number of renderer listeners the engine holds.
    #[must_use]
    pub fn listener_count(&self) -> usize {
        usize::from(self.gate.is_waiting())
            + usize::from(self.idle.is_some())
            + self.hover.listener_count()
    }

    // -----------------------------------------------------------------------
    // UI operations
    // -----------------------------------------------------------------------

    /// Selects level `n`, clamped into the valid range, and activates it.
    pub fn select_level(&mut self, n: i32) -> FloodLevel {
        let level = FloodLevel::clamped(n);
        let forced = self.selection.set_level(level);
        self.activate_selection(forced);
        level
    }

    /// Moves the level by `delta` and activates it.
    pub fn step_level(&mut self, delta: i32) -> FloodLevel {
        let forced = self.selection.step_level(delta);
        self.activate_selection(forced);
        self.selection.level()
    }

    /// Flips the scenario mode and activates the result.
    ///
    /// Outside the barrier range the mode stays [`ScenarioMode::Base`].
    pub fn toggle_scenario_mode(&mut self) -> ScenarioMode {
        let forced = self.selection.toggle_mode();
        self.activate_selection(forced);
        self.selection.mode()
    }

    /// Sets the scenario mode and activates the result.
    pub fn set_scenario_mode(&mut self, mode: ScenarioMode) -> ScenarioMode {
        let forced = self.selection.set_mode(mode);
        self.activate_selection(forced);
        self.selection.mode()
    }

    /// Opens or closes the level menu. No layer work is done.
    pub fn set_menu_open(&mut self, open: bool) {
        self.selection.set_menu_open(open);
    }

    /// Flips the menu flag and returns the new state.
    pub fn toggle_menu(&mut self) -> bool {
        let open = !self.selection.menu_open();
        self.selection.set_menu_open(open);
        open
    }

    /// Re-activates the current selection.
    pub fn refresh(&mut self) {
        self.activate_selection(false);
    }

    /// Activates an arbitrary matrix cell without touching the selection.
    ///
    /// Tile indices outside the matrix are accepted and settle with no
    /// visible layer.
    pub fn activate_tile(&mut self, mode: ScenarioMode, tile: TileIndex) {
        self.activate(None, LayerKey::new(mode, tile), false);
    }

    /// Makes sure the layer for `(mode, tile)` exists, without changing
    /// visibility.
    ///
    /// The caller is responsible for the style being loaded.
    pub fn ensure_layer(&mut self, mode: ScenarioMode, tile: TileIndex) -> LayerStatus {
        let Some(renderer) = self.renderer.as_mut() else {
            return LayerStatus::Unavailable;
        };
        let key = LayerKey::new(mode, tile);
        let (status, outcome) = self.lifecycle.ensure_layer(renderer, &self.registry, key);
        self.tracer.layer_ensure(&LayerEnsureEvent {
            generation: self.generation,
            key,
            outcome,
        });
        status
    }

    /// Registers an observer of active-layer changes.
    pub fn on_active_change(&mut self, observer: impl FnMut(Option<&LayerIdentity>) + 'static) {
        self.observers.push(Box::new(observer));
    }

    /// Swaps the tileset registry.
    ///
    /// Resident layers whose tileset changed are removed from the renderer;
    /// the current selection is then re-activated. Returns the number of
    /// layers removed.
    pub fn replace_registry(&mut self, registry: TilesetRegistry) -> usize {
        let mut purged = 0;
        if let Some(renderer) = self.renderer.as_mut() {
            purged = self.lifecycle.purge_changed(renderer, &registry);
            if let Some(bound) = self.hover.bound_layer()
                && !renderer.has_layer(bound.layer_id())
            {
                self.hover.unbind(renderer);
            }
        }
        self.registry = registry;
        if self.lifecycle.phase() != Phase::Uninitialized {
            self.refresh();
        }
        purged
    }

    // -----------------------------------------------------------------------
    // Renderer notifications
    // -----------------------------------------------------------------------

    /// Delivers a renderer notification for `listener`.
    ///
    /// Returns `false` if the engine holds no such listener, which is normal
    /// for notifications of superseded work.
    pub fn dispatch(&mut self, listener: ListenerId, event: &MapEvent) -> bool {
        let Some(renderer) = self.renderer.as_mut() else {
            return false;
        };
        match event {
            MapEvent::StyleData => {
                if self.gate.listener() != Some(listener) {
                    return false;
                }
                if let Some(activation) = self.gate.release(renderer, listener) {
                    self.tracer.gate(&GateEvent {
                        generation: activation.generation,
                        action: GateAction::Released,
                    });
                    self.run(activation);
                }
                true
            }
            MapEvent::Idle => {
                let Some(wait) = self.idle.take_if(|wait| wait.listener == listener) else {
                    return false;
                };
                renderer.off(listener);
                if wait.generation != self.generation {
                    self.tracer.stale(&StaleEvent {
                        stale: wait.generation,
                        current: self.generation,
                        stage: Stage::Idle,
                    });
                    return true;
                }
                let bound = self.hover.bind(renderer, wait.active.as_ref());
                self.tracer.hover(&HoverEvent {
                    generation: wait.generation,
                    layer: bound.map(LayerIdentity::key),
                });
                self.loading = false;
                true
            }
            MapEvent::PointerMove(_) | MapEvent::PointerLeave => {
                self.hover.handle(renderer, listener, event)
            }
        }
    }

    // -----------------------------------------------------------------------
    // Teardown
    // -----------------------------------------------------------------------

    /// Removes every listener, destroys the renderer, and hands it back.
    ///
    /// Idempotent: later calls return `None` and do nothing.
    pub fn teardown(&mut self) -> Option<R> {
        let mut renderer = self.renderer.take()?;
        let mut removed = 0;
        if self.gate.cancel(&mut renderer).is_some() {
            removed += 1;
        }
        if let Some(wait) = self.idle.take() {
            renderer.off(wait.listener);
            removed += 1;
        }
        removed += self.hover.unbind(&mut renderer);
        renderer.destroy();

        let resident = self.lifecycle.dispose();
        self.loading = false;
        self.active = None;
        self.observers.clear();
        self.tracer.teardown(&TeardownEvent {
            listeners_removed: removed,
            layers_resident: resident,
        });
        Some(renderer)
    }

    // -----------------------------------------------------------------------
    // Internals
    // -----------------------------------------------------------------------

    fn activate_selection(&mut self, forced: bool) {
        let level = self.selection.level();
        self.activate(Some(level), self.selection.target(), forced);
    }

    fn activate(&mut self, level: Option<FloodLevel>, target: LayerKey, forced: bool) {
        self.generation = self.generation.next();
        let activation = Activation {
            generation: self.generation,
            target,
        };
        self.tracer.selection(&SelectionEvent {
            generation: activation.generation,
            level,
            tile: target.tile,
            mode: target.mode,
            forced_base: forced,
        });

        if let Some(renderer) = self.renderer.as_mut()
            && let Some(wait) = self.idle.take()
        {
            renderer.off(wait.listener);
            self.tracer.stale(&StaleEvent {
                stale: wait.generation,
                current: activation.generation,
                stage: Stage::Idle,
            });
        }

        match self.gate.admit(self.renderer.as_mut(), activation) {
            Admission::Run { action, superseded } => {
                self.trace_superseded(superseded);
                self.loading = true;
                self.run(action);
            }
            Admission::Deferred { superseded } => {
                self.trace_superseded(superseded);
                self.loading = true;
                self.lifecycle.waiting_for_style();
                self.tracer.gate(&GateEvent {
                    generation: activation.generation,
                    action: GateAction::Deferred,
                });
            }
            Admission::Dropped => {
                self.tracer.gate(&GateEvent {
                    generation: activation.generation,
                    action: GateAction::Dropped,
                });
            }
        }
    }

    fn trace_superseded(&mut self, superseded: Option<Activation>) {
        if let Some(old) = superseded {
            self.tracer.stale(&StaleEvent {
                stale: old.generation,
                current: self.generation,
                stage: Stage::StyleReady,
            });
        }
    }

    fn run(&mut self, activation: Activation) {
        let Some(renderer) = self.renderer.as_mut() else {
            return;
        };
        let active = self.lifecycle.activate(
            renderer,
            &self.registry,
            activation.target,
            activation.generation,
            &mut self.tracer,
        );
        let listener = renderer.once(OnceEvent::Idle);
        self.idle = Some(IdleWait {
            listener,
            generation: activation.generation,
            active: active.clone(),
        });
        self.active = active;
        self.notify();
    }

    fn notify(&mut self) {
        let key = self.active.as_ref().map(LayerIdentity::key);
        if key == self.notified {
            return;
        }
        self.notified = key;
        for observer in &mut self.observers {
            observer(self.active.as_ref());
        }
    }
}

impl<R: Renderer> Drop for FloodMap<R> {
    fn drop(&mut self) {
        self.teardown();
    }
}
