// Copyright 2026 the Floodmap Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Human-readable trace output.
//!
//! [`PrettyPrintSink`] implements [`TraceSink`] and writes one line per event
//! to a [`Write`](std::io::Write) destination (default: stderr).

use std::io::Write;

use floodmap_core::level::LayerKey;
use floodmap_core::trace::{
    EnsureOutcome, GateAction, GateEvent, GaugeAction, GaugeEvent, HoverEvent, LayerEnsureEvent,
    SelectionEvent, Stage, StaleEvent, TeardownEvent, TraceSink, VisibilityEvent,
};

/// Writes human-readable trace lines to a [`Write`](std::io::Write) destination.
pub struct PrettyPrintSink<W: Write = Box<dyn Write>> {
    writer: W,
    verbose: bool,
}

impl<W: Write> std::fmt::Debug for PrettyPrintSink<W> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PrettyPrintSink")
            .field("verbose", &self.verbose)
            .finish_non_exhaustive()
    }
}

impl PrettyPrintSink {
    /// Creates a sink that writes to stderr.
    #[must_use]
    pub fn stderr() -> Self {
        Self::new(Box::new(std::io::stderr()))
    }

    /// Creates a sink that writes to a boxed writer.
    #[must_use]
    pub fn new(writer: Box<dyn Write>) -> Self {
        Self {
            writer,
            verbose: false,
        }
    }
}

impl<W: Write> PrettyPrintSink<W> {
    /// Creates a sink that writes to the given destination.
    #[must_use]
    pub fn with_writer(writer: W) -> Self {
        Self {
            writer,
            verbose: false,
        }
    }

    /// Also prints one line per ensured layer (26 per activation).
    #[must_use]
    pub fn verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    /// Consumes the sink and returns the writer.
    pub fn into_inner(self) -> W {
        self.writer
    }
}

fn key_label(key: Option<LayerKey>) -> String {
    match key {
        Some(key) => format!("{}@{}", key.mode.as_str(), key.tile.0),
        None => String::from("none"),
    }
}

fn stage_name(stage: Stage) -> &'static str {
    match stage {
        Stage::StyleReady => "style",
        Stage::Idle => "idle",
    }
}

impl<W: Write> TraceSink for PrettyPrintSink<W> {
    fn on_selection(&mut self, e: &SelectionEvent) {
        let level = match e.level {
            Some(level) => level.to_string(),
            None => String::from("-"),
        };
        let forced = if e.forced_base { " (forced base)" } else { "" };
        let _ = writeln!(
            self.writer,
            "[select] {:?} level={level} tile={} mode={}{forced}",
            e.generation,
            e.tile.0,
            e.mode.as_str(),
        );
    }

    fn on_gate(&mut self, e: &GateEvent) {
        let action = match e.action {
            GateAction::Deferred => "deferred until style loads",
            GateAction::Released => "released",
            GateAction::Dropped => "dropped (no renderer)",
        };
        let _ = writeln!(self.writer, "[gate] {:?} {action}", e.generation);
    }

    fn on_layer_ensure(&mut self, e: &LayerEnsureEvent) {
        if !self.verbose && e.outcome == EnsureOutcome::Resident {
            return;
        }
        let _ = writeln!(
            self.writer,
            "[ensure] {:?} {} {:?}",
            e.generation,
            key_label(Some(e.key)),
            e.outcome,
        );
    }

    fn on_visibility(&mut self, e: &VisibilityEvent) {
        let _ = writeln!(
            self.writer,
            "[visible] {:?} active={} resident={}",
            e.generation,
            key_label(e.active),
            e.resident,
        );
    }

    fn on_hover(&mut self, e: &HoverEvent) {
        let _ = writeln!(
            self.writer,
            "[hover] {:?} bound={}",
            e.generation,
            key_label(e.layer),
        );
    }

    fn on_stale(&mut self, e: &StaleEvent) {
        let _ = writeln!(
            self.writer,
            "[stale] {} continuation of {:?} superseded by {:?}",
            stage_name(e.stage),
            e.stale,
            e.current,
        );
    }

    fn on_gauge(&mut self, e: &GaugeEvent) {
        let action = match e.action {
            GaugeAction::PollStarted => "poll",
            GaugeAction::Accepted => "accepted",
            GaugeAction::StaleDropped => "stale",
            GaugeAction::Cancelled => "cancelled",
        };
        match e.site {
            Some(site) => {
                let state = if e.online { "live" } else { "offline" };
                let _ = writeln!(
                    self.writer,
                    "[gauge] round={} {action} site={site} {state}",
                    e.round,
                );
            }
            None => {
                let _ = writeln!(self.writer, "[gauge] round={} {action}", e.round);
            }
        }
    }

    fn on_teardown(&mut self, e: &TeardownEvent) {
        let _ = writeln!(
            self.writer,
            "[teardown] listeners_removed={} layers_resident={}",
            e.listeners_removed, e.layers_resident,
        );
    }
}
