// Copyright 2026 the Floodmap Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Web demo: flood scenarios on Mapbox GL JS driven by `floodmap_backend_web`.
//!
//! Mounts a [`MapView`] into `#map`, wires the level slider and scenario
//! button in `#controls`, and shows live river gauges in `#gauges` through a
//! [`GaugeFeed`].
//!
//! Build with: `wasm-pack build --target web demos/web_map`
//!
//! Then serve `demos/web_map/` and open `index.html?token=<mapbox token>`.
//!
//! [`MapView`]: floodmap_backend_web::MapView
//! [`GaugeFeed`]: floodmap_backend_web::GaugeFeed

// This crate only runs in the browser; suppress dead-code warnings when
// cargo-checking on a native host target.
#![no_std]
#![cfg_attr(
    not(target_arch = "wasm32"),
    allow(dead_code, reason = "this crate only runs in the browser")
)]

extern crate alloc;

use alloc::boxed::Box;
use alloc::format;
use alloc::rc::Rc;
use alloc::string::{String, ToString};
use alloc::vec;
use core::fmt::Write as _;

use wasm_bindgen::prelude::*;
use web_sys::{Document, HtmlElement, HtmlInputElement};

use floodmap_backend_web::{GaugeFeed, MapOptions, MapView};
use floodmap_core::config::EngineConfig;
use floodmap_core::gauge::{GaugeConfig, GaugeReading, GaugeSite};
use floodmap_core::level::ScenarioMode;
use floodmap_core::renderer::LngLat;
use floodmap_core::tileset::TilesetRegistry;

const STYLE: &str = "mapbox://styles/mapbox/light-v11";
/// Philadelphia waterfront.
const CENTER: LngLat = LngLat {
    lng: -75.1422,
    lat: 39.9526,
};
const ZOOM: f64 = 13.0;

fn element<T: JsCast>(document: &Document, id: &str) -> Result<T, JsValue> {
    document
        .get_element_by_id(id)
        .ok_or_else(|| JsValue::from_str(&format!("missing #{id}")))?
        .dyn_into::<T>()
        .map_err(|_| JsValue::from_str(&format!("#{id} has the wrong element type")))
}

fn mode_button_label(mode: ScenarioMode) -> &'static str {
    match mode {
        ScenarioMode::Base => "Barrier",
        ScenarioMode::Barrier => "No barrier",
    }
}

fn render_gauges(sites: &[GaugeSite], readings: &[GaugeReading]) -> String {
    let mut text = String::new();
    for (site, reading) in sites.iter().zip(readings) {
        let _ = writeln!(text, "{}: {reading} ({})", site.label, reading.timestamp_label());
    }
    text
}

/// Entry point, called automatically by `wasm_bindgen(start)`.
#[wasm_bindgen(start)]
pub fn main() -> Result<(), JsValue> {
    let window = web_sys::window().ok_or_else(|| JsValue::from_str("no global window"))?;
    let document = window
        .document()
        .ok_or_else(|| JsValue::from_str("no document"))?;

    let access_token = mapbox_token(&window);
    let view = Rc::new(MapView::mount(
        &MapOptions {
            container: String::from("map"),
            style: String::from(STYLE),
            center: CENTER,
            zoom: ZOOM,
            access_token,
        },
        TilesetRegistry::builtin(),
        EngineConfig::new(),
    ));

    let status: HtmlElement = element(&document, "status")?;
    view.on_active_change(move |layer| {
        let text = layer.map_or("no data for this level", |layer| layer.layer_id());
        status.set_text_content(Some(text));
    });

    // -- level slider -------------------------------------------------------
    let slider: HtmlInputElement = element(&document, "level")?;
    let label: HtmlElement = element(&document, "level-label")?;
    let on_input = {
        let view = Rc::clone(&view);
        let slider = slider.clone();
        Closure::wrap(Box::new(move || {
            let n = slider.value().parse::<i32>().unwrap_or(14);
            if let Some(level) = view.select_level(n) {
                label.set_text_content(Some(&level.to_string()));
            }
        }) as Box<dyn FnMut()>)
    };
    slider.add_event_listener_with_callback("input", on_input.as_ref().unchecked_ref())?;
    on_input.forget();

    // -- scenario toggle ----------------------------------------------------
    let button: HtmlElement = element(&document, "mode")?;
    let on_click = {
        let view = Rc::clone(&view);
        let button = button.clone();
        Closure::wrap(Box::new(move || {
            if let Some(mode) = view.toggle_scenario_mode() {
                button.set_text_content(Some(mode_button_label(mode)));
            }
        }) as Box<dyn FnMut()>)
    };
    button.add_event_listener_with_callback("click", on_click.as_ref().unchecked_ref())?;
    on_click.forget();

    // -- gauges -------------------------------------------------------------
    let panel: HtmlElement = element(&document, "gauges")?;
    let feed = GaugeFeed::start(
        GaugeConfig::usgs(vec![
            GaugeSite::new("01474500", "Schuylkill River at Philadelphia"),
            GaugeSite::new("01467200", "Delaware River at Penn's Landing"),
        ]),
        move |sites, readings| panel.set_text_content(Some(&render_gauges(sites, readings))),
    )?;

    // Keep the map and feed alive; there is no graceful shutdown on the web.
    core::mem::forget(view);
    core::mem::forget(feed);
    Ok(())
}

/// Reads `window.MAPBOX_TOKEN`, set by the page.
fn mapbox_token(window: &web_sys::Window) -> Option<String> {
    js_sys::Reflect::get(window, &JsValue::from_str("MAPBOX_TOKEN"))
        .ok()?
        .as_string()
}
