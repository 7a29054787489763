// Copyright 2026 the Floodmap Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Scripted session that exercises the engine's tracing pipeline.
//!
//! Drives a [`FloodMap`] over the in-memory [`ScriptedRenderer`] through a
//! slow style load, a burst of level changes, a mode switch mid-flight,
//! pointer hover and teardown, then runs two gauge poll rounds with canned
//! responses. Events go to a
//! [`PrettyPrintSink`](floodmap_debug::pretty::PrettyPrintSink) on stderr and
//! to a [`Journal`](floodmap_debug::journal::Journal), which is exported as
//! JSON to the path given as the first argument (default: stdout).

use std::fs::File;
use std::io::{BufWriter, Write};

use serde_json::json;

use floodmap_core::config::EngineConfig;
use floodmap_core::engine::FloodMap;
use floodmap_core::gauge::{FetchError, GaugePoller, GaugeSite};
use floodmap_core::tileset::TilesetRegistry;
use floodmap_core::trace::{
    GateEvent, GaugeEvent, HoverEvent, LayerEnsureEvent, SelectionEvent, StaleEvent,
    TeardownEvent, TraceSink, VisibilityEvent,
};
use floodmap_debug::journal::{Journal, JournalSink};
use floodmap_debug::pretty::PrettyPrintSink;
use floodmap_harness::{
    ScriptedRenderer, depth_feature, finish_style_load, hover, leave, settle,
};

/// Forwards every event to both sinks.
struct Tee {
    pretty: PrettyPrintSink,
    journal: JournalSink,
}

impl TraceSink for Tee {
    fn on_selection(&mut self, e: &SelectionEvent) {
        self.pretty.on_selection(e);
        self.journal.on_selection(e);
    }

    fn on_gate(&mut self, e: &GateEvent) {
        self.pretty.on_gate(e);
        self.journal.on_gate(e);
    }

    fn on_layer_ensure(&mut self, e: &LayerEnsureEvent) {
        self.pretty.on_layer_ensure(e);
        self.journal.on_layer_ensure(e);
    }

    fn on_visibility(&mut self, e: &VisibilityEvent) {
        self.pretty.on_visibility(e);
        self.journal.on_visibility(e);
    }

    fn on_hover(&mut self, e: &HoverEvent) {
        self.pretty.on_hover(e);
        self.journal.on_hover(e);
    }

    fn on_stale(&mut self, e: &StaleEvent) {
        self.pretty.on_stale(e);
        self.journal.on_stale(e);
    }

    fn on_gauge(&mut self, e: &GaugeEvent) {
        self.pretty.on_gauge(e);
        self.journal.on_gauge(e);
    }

    fn on_teardown(&mut self, e: &TeardownEvent) {
        self.pretty.on_teardown(e);
        self.journal.on_teardown(e);
    }
}

fn tee(journal: &Journal) -> Box<Tee> {
    Box::new(Tee {
        pretty: PrettyPrintSink::stderr(),
        journal: journal.sink(),
    })
}

fn gauge_body(feet: &str, time: &str) -> String {
    json!({
        "value": { "timeSeries": [ { "values": [ { "value": [
            { "value": feet, "dateTime": time }
        ] } ] } ] }
    })
    .to_string()
}

fn replay_map(journal: &Journal) {
    let mut map = FloodMap::new(
        ScriptedRenderer::loading(),
        TilesetRegistry::builtin(),
        EngineConfig::new(),
    )
    .with_trace_sink(tee(journal));

    // -- style still loading: only the last selection survives --------------
    map.refresh();
    for level in [15, 16, 17] {
        map.select_level(level);
    }
    map.toggle_scenario_mode();
    finish_style_load(&mut map);
    settle(&mut map);

    // -- hover a flooded block ----------------------------------------------
    let active = map.active_layer().map(|layer| layer.layer_id().to_owned());
    if let (Some(layer), Some(renderer)) = (active, map.renderer_mut()) {
        renderer.place_feature(&layer, depth_feature(json!(3.2)));
    }
    hover(&mut map);
    if let Some(text) = map.renderer().and_then(ScriptedRenderer::popup_text) {
        eprintln!("tooltip: {text}");
    }
    leave(&mut map);

    // -- leave the barrier range mid-flight ---------------------------------
    map.select_level(12);
    map.step_level(3);
    settle(&mut map);

    if let Some(renderer) = map.teardown() {
        eprintln!(
            "renderer destroyed {} time(s), {} listener(s) left",
            renderer.destroy_count(),
            renderer.listener_count(),
        );
    }
}

fn replay_gauges(journal: &Journal) {
    let sites = vec![
        GaugeSite::new("01474500", "Schuylkill at Philadelphia"),
        GaugeSite::new("01467200", "Delaware at Penn's Landing"),
    ];
    let mut poller = GaugePoller::new(sites).with_trace_sink(tee(journal));

    let first = poller.begin();
    poller.complete(
        first.ticket,
        0,
        Ok(gauge_body("6.42", "2026-10-19T08:15:00.000-04:00").as_str()),
    );
    // The second response arrives after the next round has started.
    let second = poller.begin();
    let late = gauge_body("9.10", "2026-10-19T08:15:00.000-04:00");
    poller.complete(first.ticket, 1, Ok(late.as_str()));
    poller.complete(
        second.ticket,
        0,
        Ok(gauge_body("6.51", "2026-10-19T08:20:00.000-04:00").as_str()),
    );
    poller.complete(second.ticket, 1, Err(FetchError::Status(503)));

    for (site, reading) in poller.sites().iter().zip(poller.readings()) {
        eprintln!("{}: {reading} ({})", site.label, reading.timestamp_label());
    }
}

fn main() {
    let journal = Journal::new();
    replay_map(&journal);
    replay_gauges(&journal);

    let result = match std::env::args().nth(1) {
        Some(path) => File::create(&path).and_then(|file| {
            let mut writer = BufWriter::new(file);
            journal.export(&mut writer)?;
            writer.flush()?;
            eprintln!("wrote {} events to {path}", journal.len());
            Ok(())
        }),
        None => journal.export(&mut std::io::stdout().lock()),
    };
    if let Err(err) = result {
        eprintln!("failed to export journal: {err}");
        std::process::exit(1);
    }
}
