// Copyright 2026 the Floodmap Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Layer lifecycle and hover binding for discrete flood-inundation maps.
//!
//! `floodmap_core` decides, as the user moves a flood-level selector or
//! toggles the barrier scenario, which map layers must exist, which one is
//! visible, and which one receives hover tooltips, while the map renderer
//! loads its style and tiles asynchronously. It is `no_std` compatible (with
//! `alloc`) and never talks to a real map: the renderer is injected through
//! the [`Renderer`](renderer::Renderer) trait.
//!
//! # Architecture
//!
//! ```text
//!   UI (select_level / toggle_scenario_mode)
//!       │
//!       ▼
//!   Selection ──► Generation::next() ──► ReadinessGate ──(styledata)──┐
//!                                             │                      │
//!                                             ▼                      │
//!                     LayerLifecycle::activate() ◄───────────────────┘
//!                                             │
//!                                             ▼
//!                        once(idle) ──► HoverBinding::bind()
//! ```
//!
//! **[`level`]**: Flood levels, tile indices, scenario modes, and the
//! 13 × 2 layer matrix.
//!
//! **[`tileset`]**: Which remote tileset backs each matrix cell.
//!
//! **[`ids`]**: Deterministic source and layer ids.
//!
//! **[`renderer`]**: The capability contract a map backend implements.
//!
//! **[`gate`]**: Single-slot deferral until the style is loaded.
//!
//! **[`lifecycle`]**: Ensure-and-toggle layer management. Layers are created
//! once and only their visibility changes afterwards.
//!
//! **[`hover`]**: Pointer tooltips bound to exactly one layer, with a single
//! reused popup.
//!
//! **[`selection`]**: Level, mode, and menu state with the barrier-range
//! invariant.
//!
//! **[`engine`]**: [`FloodMap`](engine::FloodMap), which ties the above
//! together and discards superseded work by generation.
//!
//! **[`gauge`]**: River gauge reading parser and poll-round bookkeeping.
//!
//! **[`trace`]**: [`TraceSink`](trace::TraceSink) trait and event types, with
//! the zero-overhead [`Tracer`](trace::Tracer) wrapper.
//!
//! # Crate features
//!
//! - `std` (disabled by default): Enables `std` support in dependencies.
//! - `trace` (disabled by default): Enables `Tracer` method bodies (one branch
//!   per call site).

#![no_std]
#![cfg_attr(docsrs, feature(doc_auto_cfg))]

extern crate alloc;

pub mod config;
pub mod engine;
pub mod gate;
pub mod gauge;
pub mod generation;
pub mod hover;
pub mod ids;
pub mod level;
pub mod lifecycle;
pub mod renderer;
pub mod selection;
pub mod tileset;
pub mod trace;
