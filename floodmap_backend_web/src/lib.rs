// Copyright 2026 the Floodmap Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Web backend for floodmap.
//!
//! This crate connects the engine to Mapbox GL JS in the browser:
//!
//! - [`MapboxRenderer`]: [`Renderer`] over a `mapboxgl.Map`
//! - [`MapView`]: mounts a map and owns the engine driving it
//! - [`GaugeFeed`]: periodic river-gauge polling with `fetch`
//!
//! Map callbacks never call into the engine directly. They are routed
//! through an [`EventSink`] so the view can queue events that arrive while
//! the engine is already running.

#![no_std]

extern crate alloc;

mod gauge_feed;
mod mapbox;
mod view;

pub use floodmap_core::renderer::Renderer;
pub use gauge_feed::{GaugeCallback, GaugeFeed};
pub use mapbox::{EventSink, MapHandle, MapboxRenderer};
pub use view::{MapOptions, MapView};
