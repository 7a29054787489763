// Copyright 2026 the Floodmap Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! In-memory event journal with JSON export.
//!
//! The engine owns its sink, so [`JournalSink`] writes into storage shared
//! with a [`Journal`] handle that stays with the caller. [`Journal::export`]
//! writes the recorded events as a JSON array, one object per event, with an
//! `"event"` discriminant and the event fields.

use std::cell::RefCell;
use std::io::{self, Write};
use std::rc::Rc;

use serde_json::{Value, json};

use floodmap_core::level::LayerKey;
use floodmap_core::trace::{
    GateEvent, GaugeEvent, HoverEvent, LayerEnsureEvent, SelectionEvent, StaleEvent,
    TeardownEvent, TraceSink, VisibilityEvent,
};

/// One recorded event.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum JournalEntry {
    /// See [`TraceSink::on_selection`].
    Selection(SelectionEvent),
    /// See [`TraceSink::on_gate`].
    Gate(GateEvent),
    /// See [`TraceSink::on_layer_ensure`].
    LayerEnsure(LayerEnsureEvent),
    /// See [`TraceSink::on_visibility`].
    Visibility(VisibilityEvent),
    /// See [`TraceSink::on_hover`].
    Hover(HoverEvent),
    /// See [`TraceSink::on_stale`].
    Stale(StaleEvent),
    /// See [`TraceSink::on_gauge`].
    Gauge(GaugeEvent),
    /// See [`TraceSink::on_teardown`].
    Teardown(TeardownEvent),
}

/// Caller-side handle to a journal.
#[derive(Clone, Debug, Default)]
pub struct Journal {
    entries: Rc<RefCell<Vec<JournalEntry>>>,
}

impl Journal {
    /// Creates an empty journal.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a sink that records into this journal.
    #[must_use]
    pub fn sink(&self) -> JournalSink {
        JournalSink {
            entries: Rc::clone(&self.entries),
        }
    }

    /// Number of recorded events.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.borrow().len()
    }

    /// Returns `true` if nothing was recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.borrow().is_empty()
    }

    /// Copies out the recorded events.
    #[must_use]
    pub fn entries(&self) -> Vec<JournalEntry> {
        self.entries.borrow().clone()
    }

    /// Discards every recorded event.
    pub fn clear(&self) {
        self.entries.borrow_mut().clear();
    }

    /// Builds the JSON array of recorded events.
    #[must_use]
    pub fn to_json(&self) -> Value {
        Value::Array(self.entries.borrow().iter().map(entry_json).collect())
    }

    /// Writes the recorded events as a pretty-printed JSON array.
    pub fn export(&self, writer: &mut dyn Write) -> io::Result<()> {
        serde_json::to_writer_pretty(&mut *writer, &self.to_json())?;
        writeln!(writer)
    }
}

/// A [`TraceSink`] that appends to a [`Journal`].
#[derive(Debug)]
pub struct JournalSink {
    entries: Rc<RefCell<Vec<JournalEntry>>>,
}

impl JournalSink {
    fn push(&self, entry: JournalEntry) {
        self.entries.borrow_mut().push(entry);
    }
}

impl TraceSink for JournalSink {
    fn on_selection(&mut self, e: &SelectionEvent) {
        self.push(JournalEntry::Selection(*e));
    }

    fn on_gate(&mut self, e: &GateEvent) {
        self.push(JournalEntry::Gate(*e));
    }

    fn on_layer_ensure(&mut self, e: &LayerEnsureEvent) {
        self.push(JournalEntry::LayerEnsure(*e));
    }

    fn on_visibility(&mut self, e: &VisibilityEvent) {
        self.push(JournalEntry::Visibility(*e));
    }

    fn on_hover(&mut self, e: &HoverEvent) {
        self.push(JournalEntry::Hover(*e));
    }

    fn on_stale(&mut self, e: &StaleEvent) {
        self.push(JournalEntry::Stale(*e));
    }

    fn on_gauge(&mut self, e: &GaugeEvent) {
        self.push(JournalEntry::Gauge(*e));
    }

    fn on_teardown(&mut self, e: &TeardownEvent) {
        self.push(JournalEntry::Teardown(*e));
    }
}

fn key_json(key: Option<LayerKey>) -> Value {
    match key {
        Some(key) => json!({ "mode": key.mode.as_str(), "tile": key.tile.0 }),
        None => Value::Null,
    }
}

fn entry_json(entry: &JournalEntry) -> Value {
    match entry {
        JournalEntry::Selection(e) => json!({
            "event": "selection",
            "generation": e.generation.0,
            "level": e.level.map(|level| level.get()),
            "tile": e.tile.0,
            "mode": e.mode.as_str(),
            "forced_base": e.forced_base,
        }),
        JournalEntry::Gate(e) => json!({
            "event": "gate",
            "generation": e.generation.0,
            "action": format!("{:?}", e.action),
        }),
        JournalEntry::LayerEnsure(e) => json!({
            "event": "layer_ensure",
            "generation": e.generation.0,
            "layer": key_json(Some(e.key)),
            "outcome": format!("{:?}", e.outcome),
        }),
        JournalEntry::Visibility(e) => json!({
            "event": "visibility",
            "generation": e.generation.0,
            "active": key_json(e.active),
            "resident": e.resident,
        }),
        JournalEntry::Hover(e) => json!({
            "event": "hover",
            "generation": e.generation.0,
            "layer": key_json(e.layer),
        }),
        JournalEntry::Stale(e) => json!({
            "event": "stale",
            "stale": e.stale.0,
            "current": e.current.0,
            "stage": format!("{:?}", e.stage),
        }),
        JournalEntry::Gauge(e) => json!({
            "event": "gauge",
            "round": e.round,
            "action": format!("{:?}", e.action),
            "site": e.site,
            "online": e.online,
        }),
        JournalEntry::Teardown(e) => json!({
            "event": "teardown",
            "listeners_removed": e.listeners_removed,
            "layers_resident": e.layers_resident,
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use floodmap_core::generation::Generation;
    use floodmap_core::level::{ScenarioMode, TileIndex};
    use floodmap_core::trace::{Stage, Tracer};

    #[test]
    fn records_through_a_tracer() {
        let journal = Journal::new();
        let mut tracer = Tracer::new(Box::new(journal.sink()));
        tracer.hover(&HoverEvent {
            generation: Generation(5),
            layer: Some(LayerKey::new(ScenarioMode::Base, TileIndex(73))),
        });
        tracer.stale(&StaleEvent {
            stale: Generation(4),
            current: Generation(5),
            stage: Stage::Idle,
        });
        assert_eq!(journal.len(), 2);
        assert!(matches!(journal.entries()[1], JournalEntry::Stale(_)));
    }

    #[test]
    fn export_produces_valid_json() {
        let journal = Journal::new();
        let mut sink = journal.sink();
        sink.on_hover(&HoverEvent {
            generation: Generation(2),
            layer: Some(LayerKey::new(ScenarioMode::Barrier, TileIndex(72))),
        });
        sink.on_teardown(&TeardownEvent {
            listeners_removed: 2,
            layers_resident: 18,
        });

        let mut out = Vec::new();
        journal.export(&mut out).unwrap();
        let parsed: Vec<Value> = serde_json::from_slice(&out).unwrap();
        assert_eq!(parsed.len(), 2);
        assert_eq!(parsed[0]["event"], "hover");
        assert_eq!(parsed[0]["layer"]["mode"], "barrier");
        assert_eq!(parsed[0]["layer"]["tile"], 72);
        assert_eq!(parsed[1]["event"], "teardown");
        assert_eq!(parsed[1]["layers_resident"], 18);
    }

    #[test]
    fn export_empty_journal() {
        let journal = Journal::new();
        let mut out = Vec::new();
        journal.export(&mut out).unwrap();
        let parsed: Vec<Value> = serde_json::from_slice(&out).unwrap();
        assert!(parsed.is_empty());
        journal.clear();
        assert!(journal.is_empty());
    }
}
