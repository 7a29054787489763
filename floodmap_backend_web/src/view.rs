// Copyright 2026 the Floodmap Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Mounting the engine into a page.
//!
//! Mapbox may fire events synchronously from inside a call the engine is
//! making (`styledata` from `addLayer`, for example). [`MapView`] therefore
//! never dispatches from a JS callback directly: callbacks push onto an
//! inbox, and the inbox is drained whenever the engine is not already
//! borrowed. Events raised while the engine is busy are picked up by the
//! drain loop that is already running further up the stack. An unmount
//! requested while the engine is busy is carried out by that same loop.

use alloc::collections::VecDeque;
use alloc::rc::{Rc, Weak};
use alloc::string::{String, ToString};
use core::cell::{Cell, RefCell};

use js_sys::{Array, Reflect};
use wasm_bindgen::JsValue;

use floodmap_core::config::EngineConfig;
use floodmap_core::engine::FloodMap;
use floodmap_core::ids::LayerIdentity;
use floodmap_core::level::{FloodLevel, ScenarioMode};
use floodmap_core::renderer::{ListenerId, LngLat, MapEvent, Renderer};
use floodmap_core::tileset::TilesetRegistry;

use crate::mapbox::{EventSink, MapHandle, MapboxRenderer};

/// How to create the underlying map.
#[derive(Clone, Debug, PartialEq)]
pub struct MapOptions {
    /// Id of the container element.
    pub container: String,
    /// Style URL.
    pub style: String,
    /// Initial centre.
    pub center: LngLat,
    /// Initial zoom.
    pub zoom: f64,
    /// Mapbox access token, assigned to `mapboxgl.accessToken` if set.
    pub access_token: Option<String>,
}

impl MapOptions {
    fn to_js(&self) -> JsValue {
        let options = js_sys::Object::new();
        let center = Array::of2(&self.center.lng.into(), &self.center.lat.into());
        for (key, value) in [
            ("container", JsValue::from_str(&self.container)),
            ("style", JsValue::from_str(&self.style)),
            ("center", center.into()),
            ("zoom", self.zoom.into()),
        ] {
            let _ = Reflect::set(&options, &key.into(), &value);
        }
        options.into()
    }
}

type Engine = FloodMap<MapboxRenderer>;

struct ViewInner<R: Renderer> {
    engine: RefCell<Option<FloodMap<R>>>,
    inbox: RefCell<VecDeque<(ListenerId, MapEvent)>>,
    unmount_pending: Cell<bool>,
}

impl<R: Renderer> ViewInner<R> {
    fn new(engine: FloodMap<R>) -> Self {
        Self {
            engine: RefCell::new(Some(engine)),
            inbox: RefCell::new(VecDeque::new()),
            unmount_pending: Cell::new(false),
        }
    }

    fn deliver(&self, listener: ListenerId, event: MapEvent) {
        self.inbox.borrow_mut().push_back((listener, event));
        self.drain();
    }

    fn drain(&self) {
        loop {
            let Ok(mut engine) = self.engine.try_borrow_mut() else {
                return;
            };
            if self.unmount_pending.take() {
                let taken = engine.take();
                drop(engine);
                if let Some(mut taken) = taken {
                    let _ = taken.teardown();
                }
                self.inbox.borrow_mut().clear();
                return;
            }
            let Some((listener, event)) = self.inbox.borrow_mut().pop_front() else {
                return;
            };
            if let Some(engine) = engine.as_mut() {
                engine.dispatch(listener, &event);
            }
        }
    }

    /// Tears the engine down now, or as soon as the current engine call
    /// returns.
    fn request_unmount(&self) {
        self.unmount_pending.set(true);
        self.drain();
    }

    fn is_mounted(&self) -> bool {
        !self.unmount_pending.get()
            && self
                .engine
                .try_borrow()
                .map_or(true, |engine| engine.is_some())
    }

    fn with_engine<T>(&self, f: impl FnOnce(&mut FloodMap<R>) -> T) -> Option<T> {
        let result = {
            let mut engine = self.engine.try_borrow_mut().ok()?;
            f(engine.as_mut()?)
        };
        self.drain();
        Some(result)
    }
}

/// A flood map mounted into a page element.
///
/// Operations return `None` when called re-entrantly from an
/// [`on_active_change`](Self::on_active_change) observer, or after
/// [`unmount`](Self::unmount).
pub struct MapView {
    inner: Rc<ViewInner<MapboxRenderer>>,
}

impl core::fmt::Debug for MapView {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("MapView")
            .field("engine", &self.inner.engine.try_borrow().ok())
            .field("queued", &self.inner.inbox.borrow().len())
            .finish()
    }
}

impl MapView {
    /// Creates the map and shows the initial selection once its style loads.
    #[must_use]
    pub fn mount(options: &MapOptions, registry: TilesetRegistry, config: EngineConfig) -> Self {
        if let Some(token) = &options.access_token {
            let global = js_sys::global();
            let mapboxgl = Reflect::get(&global, &"mapboxgl".into()).unwrap_or(JsValue::UNDEFINED);
            let _ = Reflect::set(&mapboxgl, &"accessToken".into(), &token.into());
        }
        let map = MapHandle::new(&options.to_js());
        Self::attach(map, registry, config)
    }

    /// Wraps an existing map.
    #[must_use]
    pub fn attach(map: MapHandle, registry: TilesetRegistry, config: EngineConfig) -> Self {
        let inner = Rc::new_cyclic(|weak: &Weak<ViewInner<MapboxRenderer>>| {
            let weak = weak.clone();
            let sink: EventSink = Rc::new(move |listener: ListenerId, event: MapEvent| {
                if let Some(inner) = weak.upgrade() {
                    inner.deliver(listener, event);
                }
            });
            let renderer = MapboxRenderer::new(map, sink);
            ViewInner::new(FloodMap::new(renderer, registry, config))
        });
        let view = Self { inner };
        view.inner.with_engine(Engine::refresh);
        view
    }

    /// See [`FloodMap::select_level`].
    pub fn select_level(&self, n: i32) -> Option<FloodLevel> {
        self.inner.with_engine(|engine| engine.select_level(n))
    }

    /// See [`FloodMap::step_level`].
    pub fn step_level(&self, delta: i32) -> Option<FloodLevel> {
        self.inner.with_engine(|engine| engine.step_level(delta))
    }

    /// See [`FloodMap::toggle_scenario_mode`].
    pub fn toggle_scenario_mode(&self) -> Option<ScenarioMode> {
        self.inner.with_engine(Engine::toggle_scenario_mode)
    }

    /// See [`FloodMap::set_scenario_mode`].
    pub fn set_scenario_mode(&self, mode: ScenarioMode) -> Option<ScenarioMode> {
        self.inner.with_engine(|engine| engine.set_scenario_mode(mode))
    }

    /// See [`FloodMap::set_menu_open`].
    pub fn set_menu_open(&self, open: bool) {
        self.inner.with_engine(|engine| engine.set_menu_open(open));
    }

    /// See [`FloodMap::toggle_menu`].
    pub fn toggle_menu(&self) -> Option<bool> {
        self.inner.with_engine(Engine::toggle_menu)
    }

    /// See [`FloodMap::is_loading`].
    #[must_use]
    pub fn is_loading(&self) -> bool {
        self.inner
            .engine
            .try_borrow()
            .ok()
            .and_then(|engine| engine.as_ref().map(Engine::is_loading))
            .unwrap_or(false)
    }

    /// Layer id of the visible flood layer.
    #[must_use]
    pub fn active_layer(&self) -> Option<String> {
        let engine = self.inner.engine.try_borrow().ok()?;
        engine
            .as_ref()?
            .active_layer()
            .map(|layer| layer.layer_id().to_string())
    }

    /// See [`FloodMap::on_active_change`].
    pub fn on_active_change(&self, observer: impl FnMut(Option<&LayerIdentity>) + 'static) {
        self.inner
            .with_engine(move |engine| engine.on_active_change(observer));
    }

    /// See [`FloodMap::replace_registry`].
    pub fn replace_registry(&self, registry: TilesetRegistry) -> Option<usize> {
        self.inner
            .with_engine(move |engine| engine.replace_registry(registry))
    }

    /// Returns `false` once [`unmount`](Self::unmount) was requested.
    #[must_use]
    pub fn is_mounted(&self) -> bool {
        self.inner.is_mounted()
    }

    /// Tears the engine down and removes the map. Idempotent.
    ///
    /// Called from inside an engine callback, the teardown runs as soon as
    /// that callback returns.
    pub fn unmount(&self) {
        self.inner.request_unmount();
    }
}

impl Drop for MapView {
    fn drop(&mut self) {
        self.unmount();
    }
}
