// Copyright 2026 the Floodmap Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Scripted in-memory renderer for driving a [`FloodMap`] without a browser.
//!
//! [`ScriptedRenderer`] records every mutation the engine makes (sources,
//! layers and their visibility, listeners, popups, the cursor, teardown) and
//! lets a test decide when the style loads, when the map goes idle, and
//! which feature sits under the pointer. [`emit`] plays the role of the map
//! firing an event: it finds the matching listeners, drops `once` listeners
//! as they fire, and forwards each to [`FloodMap::dispatch`].

#![no_std]

extern crate alloc;

use alloc::collections::BTreeMap;
use alloc::string::{String, ToString};
use alloc::vec::Vec;

use floodmap_core::engine::FloodMap;
use floodmap_core::ids::parse_layer_id;
use floodmap_core::level::LayerKey;
use floodmap_core::renderer::{
    Cursor, Feature, FillColor, FillLayer, LayerEvent, ListenerId, LngLat, MapEvent, OnceEvent,
    PointerEvent, PopupId, Renderer, RendererError, Visibility,
};
use kurbo::Point;
use serde_json::{Map, Value};

/// What a listener is subscribed to.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Subscription {
    /// A map-wide `once` event.
    Once(OnceEvent),
    /// A pointer event on a layer.
    Layer(LayerEvent, String),
}

/// A fill layer as the renderer holds it.
#[derive(Clone, Debug, PartialEq)]
pub struct LayerRecord {
    /// Backing source id.
    pub source: String,
    /// Layer name inside the tiles.
    pub source_layer: String,
    /// Fill colour.
    pub color: FillColor,
    /// Fill opacity.
    pub opacity: f32,
    /// Current visibility.
    pub visibility: Visibility,
}

#[derive(Clone, Debug, Default)]
struct PopupRecord {
    shown: Option<(LngLat, String)>,
}

/// In-memory [`Renderer`] with scripted readiness and hit testing.
#[derive(Debug, Default)]
pub struct ScriptedRenderer {
    style_loaded: bool,
    /// `styledata` has fired at least once.
    style_data: bool,
    sources: BTreeMap<String, String>,
    layers: BTreeMap<String, LayerRecord>,
    listeners: BTreeMap<ListenerId, Subscription>,
    next_listener: u32,
    features: BTreeMap<String, Feature>,
    popups: Vec<PopupRecord>,
    cursor: Cursor,
    destroyed: u32,
    reject_layers: bool,
    source_adds: usize,
    layer_adds: usize,
}

impl ScriptedRenderer {
    /// A renderer whose style is still loading.
    #[must_use]
    pub fn loading() -> Self {
        Self::default()
    }

    /// A renderer whose style has already loaded.
    #[must_use]
    pub fn ready() -> Self {
        Self {
            style_loaded: true,
            ..Self::default()
        }
    }

    /// Marks the style loaded or not. Does not fire `styledata`.
    pub fn set_style_loaded(&mut self, loaded: bool) {
        self.style_loaded = loaded;
    }

    /// Records that style data arrived. From now on sources and layers can be
    /// added even while [`is_style_loaded`](Renderer::is_style_loaded) still
    /// reports `false`, which is how Mapbox behaves while tiles load.
    pub fn receive_style_data(&mut self) {
        self.style_data = true;
    }

    /// Returns whether sources and layers can be added yet.
    fn accepts_additions(&self) -> bool {
        self.style_loaded || self.style_data
    }

    /// Makes every later `add_fill_layer` fail.
    pub fn reject_layers(&mut self, reject: bool) {
        self.reject_layers = reject;
    }

    /// Places `feature` under the pointer for `layer_id`. It is only
    /// reported while the layer is visible.
    pub fn place_feature(&mut self, layer_id: &str, feature: Feature) {
        self.features.insert(layer_id.to_string(), feature);
    }

    /// Removes every placed feature.
    pub fn clear_features(&mut self) {
        self.features.clear();
    }

    /// Number of live listeners.
    #[must_use]
    pub fn listener_count(&self) -> usize {
        self.listeners.len()
    }

    /// Live listeners on `layer_id`.
    #[must_use]
    pub fn layer_listener_count(&self, layer_id: &str) -> usize {
        self.listeners
            .values()
            .filter(|sub| matches!(sub, Subscription::Layer(_, id) if id == layer_id))
            .count()
    }

    /// Layer ids that currently carry any pointer listener.
    #[must_use]
    pub fn hover_layers(&self) -> Vec<&str> {
        let mut ids: Vec<&str> = self
            .listeners
            .values()
            .filter_map(|sub| match sub {
                Subscription::Layer(_, id) => Some(id.as_str()),
                Subscription::Once(_) => None,
            })
            .collect();
        ids.sort_unstable();
        ids.dedup();
        ids
    }

    /// Number of sources.
    #[must_use]
    pub fn source_count(&self) -> usize {
        self.sources.len()
    }

    /// Number of layers.
    #[must_use]
    pub fn layer_count(&self) -> usize {
        self.layers.len()
    }

    /// Total successful `add_vector_source` calls.
    #[must_use]
    pub fn source_adds(&self) -> usize {
        self.source_adds
    }

    /// Total successful `add_fill_layer` calls.
    #[must_use]
    pub fn layer_adds(&self) -> usize {
        self.layer_adds
    }

    /// The layer with `id`.
    #[must_use]
    pub fn layer(&self, id: &str) -> Option<&LayerRecord> {
        self.layers.get(id)
    }

    /// The tile URL of source `id`.
    #[must_use]
    pub fn source_url(&self, id: &str) -> Option<&str> {
        self.sources.get(id).map(String::as_str)
    }

    /// Ids of visible layers.
    #[must_use]
    pub fn visible_layers(&self) -> Vec<&str> {
        self.layers
            .iter()
            .filter(|(_, layer)| layer.visibility == Visibility::Visible)
            .map(|(id, _)| id.as_str())
            .collect()
    }

    /// Matrix cells of visible layers.
    #[must_use]
    pub fn visible_keys(&self) -> Vec<LayerKey> {
        self.visible_layers()
            .into_iter()
            .filter_map(parse_layer_id)
            .collect()
    }

    /// Number of popups ever created.
    #[must_use]
    pub fn popups_created(&self) -> usize {
        self.popups.len()
    }

    /// Text of the popup currently on the map, if any.
    #[must_use]
    pub fn popup_text(&self) -> Option<&str> {
        self.popups
            .iter()
            .find_map(|popup| popup.shown.as_ref().map(|(_, text)| text.as_str()))
    }

    /// Current cursor.
    #[must_use]
    pub fn cursor(&self) -> Cursor {
        self.cursor
    }

    /// How many times `destroy` was called.
    #[must_use]
    pub fn destroy_count(&self) -> u32 {
        self.destroyed
    }

    fn matching(&self, event: &MapEvent) -> Vec<ListenerId> {
        self.listeners
            .iter()
            .filter(|(_, sub)| match (sub, event) {
                (Subscription::Once(OnceEvent::StyleData), MapEvent::StyleData)
                | (Subscription::Once(OnceEvent::Idle), MapEvent::Idle) => true,
                (Subscription::Layer(LayerEvent::PointerMove, id), MapEvent::PointerMove(_))
                | (Subscription::Layer(LayerEvent::PointerLeave, id), MapEvent::PointerLeave) => {
                    self.layers.contains_key(id)
                }
                _ => false,
            })
            .map(|(id, _)| *id)
            .collect()
    }

    /// Fires `listener`: removes it if it is a `once` listener. Returns
    /// `false` if it is no longer registered.
    fn fire(&mut self, listener: ListenerId) -> bool {
        match self.listeners.get(&listener) {
            Some(Subscription::Once(_)) => {
                self.listeners.remove(&listener);
                true
            }
            Some(Subscription::Layer(..)) => true,
            None => false,
        }
    }

    fn subscribe(&mut self, sub: Subscription) -> ListenerId {
        self.next_listener += 1;
        let id = ListenerId(self.next_listener);
        self.listeners.insert(id, sub);
        id
    }
}

impl Renderer for ScriptedRenderer {
    fn is_style_loaded(&self) -> bool {
        self.style_loaded
    }

    fn has_source(&self, id: &str) -> bool {
        self.sources.contains_key(id)
    }

    fn has_layer(&self, id: &str) -> bool {
        self.layers.contains_key(id)
    }

    fn add_vector_source(&mut self, id: &str, url: &str) -> Result<(), RendererError> {
        if !self.accepts_additions() {
            return Err(RendererError::SourceRejected {
                id: id.to_string(),
                reason: String::from("style is not done loading"),
            });
        }
        if self.sources.contains_key(id) {
            return Err(RendererError::SourceRejected {
                id: id.to_string(),
                reason: String::from("source already exists"),
            });
        }
        self.sources.insert(id.to_string(), url.to_string());
        self.source_adds += 1;
        Ok(())
    }

    fn add_fill_layer(&mut self, layer: &FillLayer<'_>) -> Result<(), RendererError> {
        let reason = if self.reject_layers {
            Some("rejected by script")
        } else if !self.accepts_additions() {
            Some("style is not done loading")
        } else if self.layers.contains_key(layer.id) {
            Some("layer already exists")
        } else if !self.sources.contains_key(layer.source) {
            Some("source does not exist")
        } else {
            None
        };
        if let Some(reason) = reason {
            return Err(RendererError::LayerRejected {
                id: layer.id.to_string(),
                reason: String::from(reason),
            });
        }
        self.layers.insert(
            layer.id.to_string(),
            LayerRecord {
                source: layer.source.to_string(),
                source_layer: layer.source_layer.to_string(),
                color: layer.color,
                opacity: layer.opacity,
                visibility: layer.visibility,
            },
        );
        self.layer_adds += 1;
        Ok(())
    }

    fn remove_layer(&mut self, id: &str) {
        self.layers.remove(id);
        self.listeners
            .retain(|_, sub| !matches!(sub, Subscription::Layer(_, layer) if layer == id));
    }

    fn remove_source(&mut self, id: &str) {
        self.sources.remove(id);
    }

    fn set_visibility(&mut self, layer_id: &str, visibility: Visibility) {
        if let Some(layer) = self.layers.get_mut(layer_id) {
            layer.visibility = visibility;
        }
    }

    fn query_feature(&self, _point: Point, layer_id: &str) -> Option<Feature> {
        let layer = self.layers.get(layer_id)?;
        if layer.visibility != Visibility::Visible {
            return None;
        }
        self.features.get(layer_id).cloned()
    }

    fn once(&mut self, event: OnceEvent) -> ListenerId {
        self.subscribe(Subscription::Once(event))
    }

    fn on_layer(&mut self, event: LayerEvent, layer_id: &str) -> ListenerId {
        self.subscribe(Subscription::Layer(event, layer_id.to_string()))
    }

    fn off(&mut self, listener: ListenerId) {
        self.listeners.remove(&listener);
    }

    fn set_cursor(&mut self, cursor: Cursor) {
        self.cursor = cursor;
    }

    fn create_popup(&mut self) -> PopupId {
        self.popups.push(PopupRecord::default());
        #[expect(
            clippy::cast_possible_truncation,
            reason = "a scripted session never creates 2^32 popups"
        )]
        let id = PopupId((self.popups.len() - 1) as u32);
        id
    }

    fn show_popup(&mut self, popup: PopupId, at: LngLat, text: &str) {
        if let Some(record) = self.popups.get_mut(popup.0 as usize) {
            record.shown = Some((at, text.to_string()));
        }
    }

    fn hide_popup(&mut self, popup: PopupId) {
        if let Some(record) = self.popups.get_mut(popup.0 as usize) {
            record.shown = None;
        }
    }

    fn destroy(&mut self) {
        self.destroyed += 1;
        self.listeners.clear();
        for popup in &mut self.popups {
            popup.shown = None;
        }
    }
}

// ---------------------------------------------------------------------------
// Driving helpers
// ---------------------------------------------------------------------------

/// Fires `event` at every matching listener and forwards each to the engine.
///
/// `StyleData` also marks the style data as arrived on the renderer.
///
/// Returns how many deliveries the engine accepted.
pub fn emit(engine: &mut FloodMap<ScriptedRenderer>, event: MapEvent) -> usize {
    let Some(renderer) = engine.renderer_mut() else {
        return 0;
    };
    if matches!(event, MapEvent::StyleData) {
        renderer.receive_style_data();
    }
    let targets = renderer.matching(&event);
    let mut accepted = 0;
    for listener in targets {
        let Some(renderer) = engine.renderer_mut() else {
            break;
        };
        if !renderer.fire(listener) {
            continue;
        }
        if engine.dispatch(listener, &event) {
            accepted += 1;
        }
    }
    accepted
}

/// Loads the style and fires `styledata`.
pub fn finish_style_load(engine: &mut FloodMap<ScriptedRenderer>) -> usize {
    if let Some(renderer) = engine.renderer_mut() {
        renderer.set_style_loaded(true);
    }
    emit(engine, MapEvent::StyleData)
}

/// Fires `idle`.
pub fn settle(engine: &mut FloodMap<ScriptedRenderer>) -> usize {
    emit(engine, MapEvent::Idle)
}

/// Moves the pointer to a fixed position over the map.
pub fn hover(engine: &mut FloodMap<ScriptedRenderer>) -> usize {
    emit(
        engine,
        MapEvent::PointerMove(PointerEvent {
            point: Point::new(120.0, 80.0),
            lng_lat: LngLat::new(-75.15, 39.95),
        }),
    )
}

/// Moves the pointer off the layer.
pub fn leave(engine: &mut FloodMap<ScriptedRenderer>) -> usize {
    emit(engine, MapEvent::PointerLeave)
}

/// A feature with a single `depth` attribute.
#[must_use]
pub fn depth_feature(depth: Value) -> Feature {
    let mut properties = Map::new();
    properties.insert(String::from("depth"), depth);
    Feature::new(properties)
}

#[cfg(test)]
mod tests {
    use super::*;
    use floodmap_core::level::{ScenarioMode, TileIndex};

    #[test]
    fn once_listeners_fire_once() {
        let mut renderer = ScriptedRenderer::ready();
        let id = renderer.once(OnceEvent::Idle);
        assert_eq!(renderer.matching(&MapEvent::Idle), [id]);
        assert!(renderer.fire(id));
        assert!(!renderer.fire(id), "once listener must be gone");
        assert_eq!(renderer.listener_count(), 0);
    }

    #[test]
    fn layers_require_loaded_style_and_source() {
        let mut renderer = ScriptedRenderer::loading();
        let layer = FillLayer {
            id: "flood72-fill",
            source: "flood72",
            source_layer: "flood72",
            color: FillColor([0, 0, 0]),
            opacity: 0.6,
            visibility: Visibility::None,
        };
        assert!(renderer.add_vector_source("flood72", "mapbox://x").is_err());
        renderer.set_style_loaded(true);
        assert!(renderer.add_fill_layer(&layer).is_err(), "no source yet");
        renderer.add_vector_source("flood72", "mapbox://x").unwrap();
        renderer.add_fill_layer(&layer).unwrap();
        assert!(renderer.add_fill_layer(&layer).is_err(), "duplicate layer");
        assert_eq!(renderer.layer_adds(), 1);
        assert!(renderer.visible_keys().is_empty());
        renderer.set_visibility("flood72-fill", Visibility::Visible);
        assert_eq!(
            renderer.visible_keys(),
            [LayerKey::new(ScenarioMode::Base, TileIndex(72))]
        );
    }

    #[test]
    fn style_data_allows_additions_before_style_loads() {
        let mut renderer = ScriptedRenderer::loading();
        assert!(renderer.add_vector_source("flood70", "mapbox://x").is_err());
        renderer.receive_style_data();
        assert!(!renderer.is_style_loaded(), "tiles may still be loading");
        assert!(renderer.add_vector_source("flood70", "mapbox://x").is_ok());
        assert_eq!(renderer.source_count(), 1);
    }

    #[test]
    fn hidden_layers_report_no_features() {
        let mut renderer = ScriptedRenderer::ready();
        renderer.add_vector_source("hesco72", "mapbox://x").unwrap();
        renderer
            .add_fill_layer(&FillLayer {
                id: "hesco72-fill",
                source: "hesco72",
                source_layer: "hesco72",
                color: FillColor([0, 0, 0]),
                opacity: 0.6,
                visibility: Visibility::None,
            })
            .unwrap();
        renderer.place_feature("hesco72-fill", depth_feature(Value::from(1.0)));
        assert!(renderer.query_feature(Point::ZERO, "hesco72-fill").is_none());
        renderer.set_visibility("hesco72-fill", Visibility::Visible);
        assert!(renderer.query_feature(Point::ZERO, "hesco72-fill").is_some());
    }
}
