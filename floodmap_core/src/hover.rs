// Copyright 2026 the Floodmap Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Pointer-hover tooltips scoped to the active flood layer.
//!
//! At most one layer carries hover handlers at a time. [`HoverBinding::bind`]
//! removes the previous layer's pointer-move and pointer-leave listeners
//! before subscribing on the new one, in the same call, so there is never a
//! moment with two bound layers.
//!
//! A single renderer popup is created on first use and reused for every
//! later hover and every rebind.

use alloc::format;
use alloc::string::String;

use serde_json::Value;

use crate::config::EngineConfig;
use crate::ids::LayerIdentity;
use crate::renderer::{
    Cursor, Feature, LayerEvent, ListenerId, MapEvent, PointerEvent, PopupId, Renderer,
};

#[derive(Debug)]
struct Bound {
    identity: LayerIdentity,
    on_move: ListenerId,
    on_leave: ListenerId,
}

/// Hover handler state for the active layer.
#[derive(Debug)]
pub struct HoverBinding {
    bound: Option<Bound>,
    popup: Option<PopupId>,
    popup_open: bool,
    cursor: Cursor,
    depth_property: &'static str,
    label: &'static str,
    unit: &'static str,
}

impl HoverBinding {
    /// Creates an unbound hover manager.
    #[must_use]
    pub fn new(config: &EngineConfig) -> Self {
        Self {
            bound: None,
            popup: None,
            popup_open: false,
            cursor: Cursor::Default,
            depth_property: config.depth_property,
            label: config.tooltip_label,
            unit: config.depth_unit,
        }
    }

    /// Returns the layer currently carrying hover handlers.
    #[must_use]
    pub fn bound_layer(&self) -> Option<&LayerIdentity> {
        self.bound.as_ref().map(|bound| &bound.identity)
    }

    /// Number of renderer listeners held (0 or 2).
    #[must_use]
    pub fn listener_count(&self) -> usize {
        if self.bound.is_some() { 2 } else { 0 }
    }

    /// Returns whether the tooltip is currently shown.
    #[must_use]
    pub fn is_tooltip_open(&self) -> bool {
        self.popup_open
    }

    /// Binds hover handlers to `layer`, replacing any previous binding.
    ///
    /// With `None`, or if the renderer does not know the layer, nothing is
    /// left bound. Rebinding the already-bound layer is a no-op.
    pub fn bind<R: Renderer + ?Sized>(
        &mut self,
        renderer: &mut R,
        layer: Option<&LayerIdentity>,
    ) -> Option<&LayerIdentity> {
        if let (Some(bound), Some(layer)) = (&self.bound, layer)
            && bound.identity == *layer
            && renderer.has_layer(layer.layer_id())
        {
            return self.bound_layer();
        }
        self.unbind(renderer);

        let layer = layer?;
        if !renderer.has_layer(layer.layer_id()) {
            return None;
        }
        let on_move = renderer.on_layer(LayerEvent::PointerMove, layer.layer_id());
        let on_leave = renderer.on_layer(LayerEvent::PointerLeave, layer.layer_id());
        self.bound = Some(Bound {
            identity: layer.clone(),
            on_move,
            on_leave,
        });
        self.bound_layer()
    }

    /// Removes the current binding and clears the tooltip and cursor.
    ///
    /// Returns the number of listeners removed.
    pub fn unbind<R: Renderer + ?Sized>(&mut self, renderer: &mut R) -> usize {
        let Some(bound) = self.bound.take() else {
            return 0;
        };
        renderer.off(bound.on_move);
        renderer.off(bound.on_leave);
        self.clear(renderer);
        2
    }

    /// Handles a pointer event. Returns `false` if `listener` is not one of
    /// this binding's listeners.
    pub fn handle<R: Renderer + ?Sized>(
        &mut self,
        renderer: &mut R,
        listener: ListenerId,
        event: &MapEvent,
    ) -> bool {
        let Some(bound) = &self.bound else {
            return false;
        };
        match event {
            MapEvent::PointerMove(pointer) if listener == bound.on_move => {
                let layer_id = bound.identity.layer_id();
                match renderer.query_feature(pointer.point, layer_id) {
                    Some(feature) => self.show(renderer, pointer, &feature),
                    None => self.clear(renderer),
                }
                true
            }
            MapEvent::PointerLeave if listener == bound.on_leave => {
                self.clear(renderer);
                true
            }
            _ => false,
        }
    }

    /// Formats the tooltip for `feature`.
    #[must_use]
    pub fn tooltip_text(&self, feature: &Feature) -> String {
        match depth_of(feature.properties.get(self.depth_property)) {
            Some(depth) => format!("{}: {depth:.1} {}", self.label, self.unit),
            None => format!("{}: Unknown", self.label),
        }
    }

    fn show<R: Renderer + ?Sized>(
        &mut self,
        renderer: &mut R,
        pointer: &PointerEvent,
        feature: &Feature,
    ) {
        let text = self.tooltip_text(feature);
        let popup = match self.popup {
            Some(popup) => popup,
            None => *self.popup.insert(renderer.create_popup()),
        };
        renderer.show_popup(popup, pointer.lng_lat, &text);
        self.popup_open = true;
        self.set_cursor(renderer, Cursor::Pointer);
    }

    fn clear<R: Renderer + ?Sized>(&mut self, renderer: &mut R) {
        if self.popup_open
            && let Some(popup) = self.popup
        {
            renderer.hide_popup(popup);
        }
        self.popup_open = false;
        self.set_cursor(renderer, Cursor::Default);
    }

    fn set_cursor<R: Renderer + ?Sized>(&mut self, renderer: &mut R, cursor: Cursor) {
        if self.cursor != cursor {
            renderer.set_cursor(cursor);
            self.cursor = cursor;
        }
    }
}

/// Interprets a depth attribute: JSON numbers, or strings holding a finite
/// number.
fn depth_of(value: Option<&Value>) -> Option<f64> {
    let depth = match value? {
        Value::Number(n) => n.as_f64()?,
        Value::String(s) => s.trim().parse::<f64>().ok()?,
        _ => return None,
    };
    depth.is_finite().then_some(depth)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{Map, json};

    fn feature(depth: Value) -> Feature {
        let mut properties = Map::new();
        properties.insert(String::from("depth"), depth);
        Feature::new(properties)
    }

    #[test]
    fn numeric_depth_has_one_decimal() {
        let hover = HoverBinding::new(&EngineConfig::new());
        assert_eq!(hover.tooltip_text(&feature(json!(3.2))), "Water Depth: 3.2 ft");
        assert_eq!(hover.tooltip_text(&feature(json!(4))), "Water Depth: 4.0 ft");
        assert_eq!(
            hover.tooltip_text(&feature(json!(2.349))),
            "Water Depth: 2.3 ft"
        );
    }

    #[test]
    fn numeric_strings_are_accepted() {
        let hover = HoverBinding::new(&EngineConfig::new());
        assert_eq!(
            hover.tooltip_text(&feature(json!(" 1.75 "))),
            "Water Depth: 1.8 ft"
        );
    }

    #[test]
    fn missing_or_non_numeric_depth_is_unknown() {
        let hover = HoverBinding::new(&EngineConfig::new());
        assert_eq!(
            hover.tooltip_text(&Feature::default()),
            "Water Depth: Unknown"
        );
        assert_eq!(
            hover.tooltip_text(&feature(json!("deep"))),
            "Water Depth: Unknown"
        );
        assert_eq!(
            hover.tooltip_text(&feature(json!(null))),
            "Water Depth: Unknown"
        );
        assert_eq!(
            hover.tooltip_text(&feature(json!([1.0]))),
            "Water Depth: Unknown"
        );
        assert_eq!(
            hover.tooltip_text(&feature(json!("NaN"))),
            "Water Depth: Unknown"
        );
    }

    #[test]
    fn depth_property_is_configurable() {
        let config = EngineConfig {
            depth_property: "DEPTH_FT",
            ..EngineConfig::new()
        };
        let hover = HoverBinding::new(&config);
        let mut properties = Map::new();
        properties.insert(String::from("DEPTH_FT"), json!(7.04));
        assert_eq!(
            hover.tooltip_text(&Feature::new(properties)),
            "Water Depth: 7.0 ft"
        );
    }
}
