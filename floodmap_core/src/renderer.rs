// Copyright 2026 the Floodmap Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Renderer capability contract.
//!
//! The map renderer (style loading, tile fetching, drawing) is not
//! reimplemented here. The engine consumes it through the [`Renderer`] trait,
//! which a platform backend implements over a real map and a test harness
//! implements in memory.
//!
//! # Events
//!
//! Renderer notifications are delivered *to* the engine rather than through
//! callbacks stored in the renderer: [`once`](Renderer::once) and
//! [`on_layer`](Renderer::on_layer) return a [`ListenerId`], and when the
//! renderer fires that listener the host calls
//! [`FloodMap::dispatch`](crate::engine::FloodMap::dispatch) with the id and a
//! [`MapEvent`]. This keeps every continuation as plain data inside the
//! engine, so a superseded continuation can be recognised and dropped.
//!
//! `once` listeners fire at most once. The engine calls [`off`](Renderer::off)
//! on them when they fire as well, so `off` must tolerate ids that are
//! already gone.

use alloc::string::String;
use core::fmt;

use kurbo::Point;
use serde_json::{Map, Value};

/// Handle for one renderer event subscription.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ListenerId(pub u32);

impl fmt::Debug for ListenerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ListenerId({})", self.0)
    }
}

/// Handle for a renderer popup.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct PopupId(pub u32);

impl fmt::Debug for PopupId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PopupId({})", self.0)
    }
}

/// Map-wide events that are subscribed to once.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum OnceEvent {
    /// The style (or style data) changed; the style may now be loaded.
    StyleData,
    /// All pending tile and network loads for the current view finished.
    Idle,
}

/// Pointer events scoped to a single layer.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum LayerEvent {
    /// The pointer moved over a feature of the layer.
    PointerMove,
    /// The pointer left the layer.
    PointerLeave,
}

/// A geographic coordinate.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct LngLat {
    /// Longitude in degrees.
    pub lng: f64,
    /// Latitude in degrees.
    pub lat: f64,
}

impl LngLat {
    /// Creates a coordinate.
    #[must_use]
    pub const fn new(lng: f64, lat: f64) -> Self {
        Self { lng, lat }
    }
}

/// Pointer position in screen space and on the map.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PointerEvent {
    /// Screen position in CSS pixels relative to the map canvas.
    pub point: Point,
    /// Geographic position under the pointer.
    pub lng_lat: LngLat,
}

/// An event delivered to [`FloodMap::dispatch`](crate::engine::FloodMap::dispatch).
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum MapEvent {
    /// See [`OnceEvent::StyleData`].
    StyleData,
    /// See [`OnceEvent::Idle`].
    Idle,
    /// See [`LayerEvent::PointerMove`].
    PointerMove(PointerEvent),
    /// See [`LayerEvent::PointerLeave`].
    PointerLeave,
}

/// Layout visibility of a layer.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Visibility {
    /// Drawn.
    Visible,
    /// Not drawn.
    None,
}

impl Visibility {
    /// Returns the Mapbox style keyword.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Visible => "visible",
            Self::None => "none",
        }
    }
}

/// Canvas cursor.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum Cursor {
    /// Whatever the map normally shows.
    #[default]
    Default,
    /// Hand cursor over a hoverable feature.
    Pointer,
}

impl Cursor {
    /// Returns the CSS `cursor` value (empty resets to the stylesheet).
    #[must_use]
    pub const fn css(self) -> &'static str {
        match self {
            Self::Default => "",
            Self::Pointer => "pointer",
        }
    }
}

/// An opaque RGB fill colour.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct FillColor(pub [u8; 3]);

impl fmt::Debug for FillColor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "FillColor({self})")
    }
}

impl fmt::Display for FillColor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let [r, g, b] = self.0;
        write!(f, "#{r:02x}{g:02x}{b:02x}")
    }
}

/// Description of a fill layer to add.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FillLayer<'a> {
    /// Layer id.
    pub id: &'a str,
    /// Id of the backing source.
    pub source: &'a str,
    /// Layer name inside the vector tiles.
    pub source_layer: &'a str,
    /// Fill colour.
    pub color: FillColor,
    /// Fill opacity in `0.0..=1.0`.
    pub opacity: f32,
    /// Initial layout visibility.
    pub visibility: Visibility,
}

/// A rendered feature returned by [`Renderer::query_feature`].
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Feature {
    /// Feature attributes.
    pub properties: Map<String, Value>,
}

impl Feature {
    /// Creates a feature with the given attributes.
    #[must_use]
    pub fn new(properties: Map<String, Value>) -> Self {
        Self { properties }
    }
}

/// A renderer rejected a mutation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RendererError {
    /// `add_vector_source` failed.
    SourceRejected {
        /// Source id.
        id: String,
        /// Renderer-provided reason.
        reason: String,
    },
    /// `add_fill_layer` failed.
    LayerRejected {
        /// Layer id.
        id: String,
        /// Renderer-provided reason.
        reason: String,
    },
}

impl fmt::Display for RendererError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SourceRejected { id, reason } => write!(f, "source {id} rejected: {reason}"),
            Self::LayerRejected { id, reason } => write!(f, "layer {id} rejected: {reason}"),
        }
    }
}

impl core::error::Error for RendererError {}

/// The capability the engine needs from a map renderer.
///
/// All methods are called from the single UI thread. None of them may block.
pub trait Renderer {
    /// Returns whether the style is fully loaded, so that sources and layers
    /// may be added.
    fn is_style_loaded(&self) -> bool;

    /// Returns whether a source with `id` exists.
    fn has_source(&self, id: &str) -> bool;

    /// Returns whether a layer with `id` exists.
    fn has_layer(&self, id: &str) -> bool;

    /// Adds a remote vector tile source.
    fn add_vector_source(&mut self, id: &str, url: &str) -> Result<(), RendererError>;

    /// Adds a fill layer drawing `layer.source`.
    fn add_fill_layer(&mut self, layer: &FillLayer<'_>) -> Result<(), RendererError>;

    /// Removes a layer. Unknown ids are ignored.
    fn remove_layer(&mut self, id: &str);

    /// Removes a source. Unknown ids are ignored.
    fn remove_source(&mut self, id: &str);

    /// Sets the `visibility` layout property of a layer.
    fn set_visibility(&mut self, layer_id: &str, visibility: Visibility);

    /// Returns the topmost feature of `layer_id` rendered at `point`.
    fn query_feature(&self, point: Point, layer_id: &str) -> Option<Feature>;

    /// Subscribes once to a map-wide event.
    fn once(&mut self, event: OnceEvent) -> ListenerId;

    /// Subscribes to a pointer event scoped to `layer_id`.
    fn on_layer(&mut self, event: LayerEvent, layer_id: &str) -> ListenerId;

    /// Removes a subscription. Unknown or already-fired ids are ignored.
    fn off(&mut self, listener: ListenerId);

    /// Sets the canvas cursor.
    fn set_cursor(&mut self, cursor: Cursor);

    /// Creates a detached popup.
    fn create_popup(&mut self) -> PopupId;

    /// Positions `popup` at `at`, sets its text, and attaches it to the map.
    fn show_popup(&mut self, popup: PopupId, at: LngLat, text: &str);

    /// Detaches `popup` from the map without destroying it.
    fn hide_popup(&mut self, popup: PopupId);

    /// Disposes the renderer instance.
    fn destroy(&mut self);
}
