// Copyright 2026 the Floodmap Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Pretty-printing and JSON journal export for Floodmap diagnostics.
//!
//! This crate provides [`TraceSink`](floodmap_core::trace::TraceSink)
//! implementations for development and post-mortem analysis:
//!
//! - [`pretty::PrettyPrintSink`]: human-readable one-line-per-event output.
//! - [`journal::JournalSink`]: in-memory event log shared with a
//!   [`journal::Journal`] handle, exportable as a JSON array.

pub mod journal;
pub mod pretty;
