// Copyright 2026 the Floodmap Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! [`Renderer`] over a Mapbox GL JS map.
//!
//! Every subscription wraps a JS closure that forwards the event to an
//! [`EventSink`] together with the subscription's [`ListenerId`]. The closure
//! is kept alive in the renderer until [`off`](Renderer::off) or
//! [`destroy`](Renderer::destroy), so JS never calls into a dropped closure.

use alloc::boxed::Box;
use alloc::collections::BTreeMap;
use alloc::rc::Rc;
use alloc::string::{String, ToString};
use alloc::vec::Vec;

use js_sys::{Array, Function, Object, Reflect};
use kurbo::Point;
use wasm_bindgen::closure::Closure;
use wasm_bindgen::prelude::*;

use floodmap_core::renderer::{
    Cursor, Feature, FillLayer, LayerEvent, ListenerId, LngLat, MapEvent, OnceEvent,
    PointerEvent, PopupId, Renderer, RendererError, Visibility,
};

#[wasm_bindgen]
extern "C" {
    /// A `mapboxgl.Map` instance.
    #[derive(Clone, Debug)]
    #[wasm_bindgen(js_namespace = mapboxgl, js_name = Map)]
    pub type MapHandle;

    /// Creates a map from an options object.
    #[wasm_bindgen(constructor, js_namespace = mapboxgl, js_class = "Map")]
    pub fn new(options: &JsValue) -> MapHandle;

    #[wasm_bindgen(method, js_name = isStyleLoaded)]
    fn is_style_loaded(this: &MapHandle) -> bool;

    #[wasm_bindgen(method, js_name = getSource)]
    fn get_source(this: &MapHandle, id: &str) -> JsValue;

    #[wasm_bindgen(method, js_name = getLayer)]
    fn get_layer(this: &MapHandle, id: &str) -> JsValue;

    #[wasm_bindgen(method, catch, js_name = addSource)]
    fn add_source(this: &MapHandle, id: &str, source: &JsValue) -> Result<(), JsValue>;

    #[wasm_bindgen(method, catch, js_name = addLayer)]
    fn add_layer(this: &MapHandle, layer: &JsValue) -> Result<(), JsValue>;

    #[wasm_bindgen(method, js_name = removeLayer)]
    fn remove_layer(this: &MapHandle, id: &str);

    #[wasm_bindgen(method, js_name = removeSource)]
    fn remove_source(this: &MapHandle, id: &str);

    #[wasm_bindgen(method, js_name = setLayoutProperty)]
    fn set_layout_property(this: &MapHandle, layer: &str, name: &str, value: &JsValue);

    #[wasm_bindgen(method, js_name = queryRenderedFeatures)]
    fn query_rendered_features(this: &MapHandle, point: &JsValue, options: &JsValue) -> Array;

    #[wasm_bindgen(method, js_name = once)]
    fn once(this: &MapHandle, event: &str, listener: &Function);

    #[wasm_bindgen(method, js_name = on)]
    fn on_layer(this: &MapHandle, event: &str, layer: &str, listener: &Function);

    #[wasm_bindgen(method, js_name = off)]
    fn off(this: &MapHandle, event: &str, listener: &Function);

    #[wasm_bindgen(method, js_name = off)]
    fn off_layer(this: &MapHandle, event: &str, layer: &str, listener: &Function);

    #[wasm_bindgen(method, js_name = getCanvas)]
    fn get_canvas(this: &MapHandle) -> web_sys::HtmlElement;

    #[wasm_bindgen(method, js_name = remove)]
    fn remove_map(this: &MapHandle);

    #[wasm_bindgen(js_namespace = mapboxgl, js_name = Popup)]
    type Popup;

    #[wasm_bindgen(constructor, js_namespace = mapboxgl, js_class = "Popup")]
    fn new_popup(options: &JsValue) -> Popup;

    #[wasm_bindgen(method, js_name = setLngLat)]
    fn set_lng_lat(this: &Popup, lng_lat: &JsValue);

    #[wasm_bindgen(method, js_name = setText)]
    fn set_text(this: &Popup, text: &str);

    #[wasm_bindgen(method, js_name = addTo)]
    fn add_to(this: &Popup, map: &MapHandle);

    #[wasm_bindgen(method, js_name = remove)]
    fn remove_popup(this: &Popup);
}

/// Receives renderer events tagged with the subscription they belong to.
pub type EventSink = Rc<dyn Fn(ListenerId, MapEvent)>;

type EventClosure = Closure<dyn FnMut(JsValue)>;

struct Registration {
    event: &'static str,
    layer: Option<String>,
    closure: EventClosure,
}

/// [`Renderer`] implementation over a `mapboxgl.Map`.
pub struct MapboxRenderer {
    map: MapHandle,
    sink: EventSink,
    listeners: BTreeMap<ListenerId, Registration>,
    next_listener: u32,
    popups: Vec<Popup>,
    destroyed: bool,
}

impl core::fmt::Debug for MapboxRenderer {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("MapboxRenderer")
            .field("listeners", &self.listeners.len())
            .field("popups", &self.popups.len())
            .field("destroyed", &self.destroyed)
            .finish_non_exhaustive()
    }
}

impl MapboxRenderer {
    /// Wraps `map`. Events are forwarded to `sink`.
    #[must_use]
    pub fn new(map: MapHandle, sink: EventSink) -> Self {
        Self {
            map,
            sink,
            listeners: BTreeMap::new(),
            next_listener: 0,
            popups: Vec::new(),
            destroyed: false,
        }
    }

    /// The wrapped map.
    #[must_use]
    pub fn map(&self) -> &MapHandle {
        &self.map
    }

    fn subscribe(
        &mut self,
        event: &'static str,
        layer: Option<&str>,
        convert: fn(&JsValue) -> MapEvent,
    ) -> ListenerId {
        self.next_listener += 1;
        let id = ListenerId(self.next_listener);
        let sink = Rc::clone(&self.sink);
        let closure = Closure::wrap(Box::new(move |e: JsValue| {
            sink(id, convert(&e));
        }) as Box<dyn FnMut(JsValue)>);
        let function: &Function = closure.as_ref().unchecked_ref();
        match layer {
            Some(layer) => self.map.on_layer(event, layer, function),
            None => self.map.once(event, function),
        }
        self.listeners.insert(
            id,
            Registration {
                event,
                layer: layer.map(ToString::to_string),
                closure,
            },
        );
        id
    }

    fn unsubscribe(&self, registration: &Registration) {
        let function: &Function = registration.closure.as_ref().unchecked_ref();
        match &registration.layer {
            Some(layer) => self.map.off_layer(registration.event, layer, function),
            None => self.map.off(registration.event, function),
        }
    }
}

/// Builds a plain JS object from key/value pairs.
fn object(entries: &[(&str, JsValue)]) -> JsValue {
    let obj = Object::new();
    for (key, value) in entries {
        // Setting a property on a fresh plain object cannot fail.
        let _ = Reflect::set(&obj, &JsValue::from_str(key), value);
    }
    obj.into()
}

fn get(target: &JsValue, key: &str) -> JsValue {
    Reflect::get(target, &JsValue::from_str(key)).unwrap_or(JsValue::UNDEFINED)
}

fn get_f64(target: &JsValue, key: &str) -> f64 {
    get(target, key).as_f64().unwrap_or(f64::NAN)
}

fn describe(error: &JsValue) -> String {
    if let Some(error) = error.dyn_ref::<js_sys::Error>() {
        return String::from(error.message());
    }
    error
        .as_string()
        .unwrap_or_else(|| String::from("unknown error"))
}

fn pointer_event(e: &JsValue) -> PointerEvent {
    let point = get(e, "point");
    let lng_lat = get(e, "lngLat");
    PointerEvent {
        point: Point::new(get_f64(&point, "x"), get_f64(&point, "y")),
        lng_lat: LngLat::new(get_f64(&lng_lat, "lng"), get_f64(&lng_lat, "lat")),
    }
}

impl Renderer for MapboxRenderer {
    fn is_style_loaded(&self) -> bool {
        !self.destroyed && self.map.is_style_loaded()
    }

    fn has_source(&self, id: &str) -> bool {
        !self.map.get_source(id).is_undefined()
    }

    fn has_layer(&self, id: &str) -> bool {
        !self.map.get_layer(id).is_undefined()
    }

    fn add_vector_source(&mut self, id: &str, url: &str) -> Result<(), RendererError> {
        let source = object(&[("type", "vector".into()), ("url", url.into())]);
        self.map
            .add_source(id, &source)
            .map_err(|e| RendererError::SourceRejected {
                id: id.to_string(),
                reason: describe(&e),
            })
    }

    fn add_fill_layer(&mut self, layer: &FillLayer<'_>) -> Result<(), RendererError> {
        let definition = object(&[
            ("id", layer.id.into()),
            ("type", "fill".into()),
            ("source", layer.source.into()),
            ("source-layer", layer.source_layer.into()),
            (
                "layout",
                object(&[("visibility", layer.visibility.as_str().into())]),
            ),
            (
                "paint",
                object(&[
                    ("fill-color", layer.color.to_string().into()),
                    ("fill-opacity", f64::from(layer.opacity).into()),
                ]),
            ),
        ]);
        self.map
            .add_layer(&definition)
            .map_err(|e| RendererError::LayerRejected {
                id: layer.id.to_string(),
                reason: describe(&e),
            })
    }

    fn remove_layer(&mut self, id: &str) {
        if self.has_layer(id) {
            self.map.remove_layer(id);
        }
    }

    fn remove_source(&mut self, id: &str) {
        if self.has_source(id) {
            self.map.remove_source(id);
        }
    }

    fn set_visibility(&mut self, layer_id: &str, visibility: Visibility) {
        self.map
            .set_layout_property(layer_id, "visibility", &visibility.as_str().into());
    }

    fn query_feature(&self, point: Point, layer_id: &str) -> Option<Feature> {
        let at = Array::of2(&point.x.into(), &point.y.into());
        let layers = Array::of1(&layer_id.into());
        let options = object(&[("layers", layers.into())]);
        let hits = self.map.query_rendered_features(&at, &options);
        if hits.length() == 0 {
            return None;
        }
        let properties = get(&hits.get(0), "properties");
        let json = js_sys::JSON::stringify(&properties).ok()?.as_string()?;
        let properties = serde_json::from_str(&json).unwrap_or_default();
        Some(Feature::new(properties))
    }

    fn once(&mut self, event: OnceEvent) -> ListenerId {
        match event {
            OnceEvent::StyleData => self.subscribe("styledata", None, |_| MapEvent::StyleData),
            OnceEvent::Idle => self.subscribe("idle", None, |_| MapEvent::Idle),
        }
    }

    fn on_layer(&mut self, event: LayerEvent, layer_id: &str) -> ListenerId {
        match event {
            LayerEvent::PointerMove => self.subscribe("mousemove", Some(layer_id), |e| {
                MapEvent::PointerMove(pointer_event(e))
            }),
            LayerEvent::PointerLeave => {
                self.subscribe("mouseleave", Some(layer_id), |_| MapEvent::PointerLeave)
            }
        }
    }

    fn off(&mut self, listener: ListenerId) {
        if let Some(registration) = self.listeners.remove(&listener) {
            self.unsubscribe(&registration);
        }
    }

    fn set_cursor(&mut self, cursor: Cursor) {
        let _ = self
            .map
            .get_canvas()
            .style()
            .set_property("cursor", cursor.css());
    }

    fn create_popup(&mut self) -> PopupId {
        let options = object(&[
            ("closeButton", false.into()),
            ("closeOnClick", false.into()),
        ]);
        self.popups.push(Popup::new_popup(&options));
        #[expect(
            clippy::cast_possible_truncation,
            reason = "the engine creates a single popup per map"
        )]
        let id = PopupId((self.popups.len() - 1) as u32);
        id
    }

    fn show_popup(&mut self, popup: PopupId, at: LngLat, text: &str) {
        let Some(popup) = self.popups.get(popup.0 as usize) else {
            return;
        };
        popup.set_lng_lat(&Array::of2(&at.lng.into(), &at.lat.into()));
        popup.set_text(text);
        popup.add_to(&self.map);
    }

    fn hide_popup(&mut self, popup: PopupId) {
        if let Some(popup) = self.popups.get(popup.0 as usize) {
            popup.remove_popup();
        }
    }

    fn destroy(&mut self) {
        if self.destroyed {
            return;
        }
        self.destroyed = true;
        for registration in core::mem::take(&mut self.listeners).into_values() {
            self.unsubscribe(&registration);
        }
        for popup in self.popups.drain(..) {
            popup.remove_popup();
        }
        self.map.remove_map();
    }
}
