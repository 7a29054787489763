// Copyright 2026 the Floodmap Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Deferral of work until the renderer's style is loaded.
//!
//! Most layer operations fail (or silently do nothing) if issued before the
//! style has loaded. [`ReadinessGate::admit`] either hands the action back
//! for immediate execution or parks it behind a single `styledata`
//! subscription. The first time that listener fires,
//! [`ReadinessGate::release`] unsubscribes and hands the action back exactly
//! once. It does not re-check `is_style_loaded`: Mapbox keeps reporting
//! `false` while tiles are in flight, and tile completion never fires
//! `styledata` again.
//!
//! The gate holds at most one waiting action. Admitting a new action while
//! one is parked replaces it and reuses the existing subscription: the older
//! action is superseded and returned to the caller, never run.

use crate::renderer::{ListenerId, OnceEvent, Renderer};

/// Outcome of [`ReadinessGate::admit`].
#[derive(Debug, PartialEq, Eq)]
pub enum Admission<A> {
    /// The style is loaded: run `action` now.
    Run {
        /// The admitted action.
        action: A,
        /// A previously parked action that will now never run.
        superseded: Option<A>,
    },
    /// The action is parked until the style loads.
    Deferred {
        /// A previously parked action that was replaced.
        superseded: Option<A>,
    },
    /// There is no renderer; the action was dropped.
    Dropped,
}

/// Single-slot "run when the style is ready" gate.
#[derive(Debug)]
pub struct ReadinessGate<A> {
    waiting: Option<(ListenerId, A)>,
}

impl<A> Default for ReadinessGate<A> {
    fn default() -> Self {
        Self::new()
    }
}

impl<A> ReadinessGate<A> {
    /// Creates an empty gate.
    #[must_use]
    pub const fn new() -> Self {
        Self { waiting: None }
    }

    /// Admits `action`, running it now if the style is loaded.
    pub fn admit<R: Renderer + ?Sized>(
        &mut self,
        renderer: Option<&mut R>,
        action: A,
    ) -> Admission<A> {
        let Some(renderer) = renderer else {
            return Admission::Dropped;
        };
        if renderer.is_style_loaded() {
            let superseded = self.cancel(renderer);
            return Admission::Run { action, superseded };
        }
        match &mut self.waiting {
            Some((_, parked)) => Admission::Deferred {
                superseded: Some(core::mem::replace(parked, action)),
            },
            None => {
                let listener = renderer.once(OnceEvent::StyleData);
                self.waiting = Some((listener, action));
                Admission::Deferred { superseded: None }
            }
        }
    }

    /// Handles a `styledata` notification for `listener`.
    ///
    /// Returns the parked action if `listener` is the gate's subscription.
    /// Notifications for any other listener return `None`.
    pub fn release<R: Renderer + ?Sized>(
        &mut self,
        renderer: &mut R,
        listener: ListenerId,
    ) -> Option<A> {
        let (waiting_on, _) = self.waiting.as_ref()?;
        if *waiting_on != listener {
            return None;
        }
        let (listener, action) = self.waiting.take()?;
        renderer.off(listener);
        Some(action)
    }

    /// Drops the parked action, if any, and unsubscribes.
    pub fn cancel<R: Renderer + ?Sized>(&mut self, renderer: &mut R) -> Option<A> {
        let (listener, action) = self.waiting.take()?;
        renderer.off(listener);
        Some(action)
    }

    /// Returns whether an action is parked.
    #[must_use]
    pub fn is_waiting(&self) -> bool {
        self.waiting.is_some()
    }

    /// Returns the listener the gate is waiting on.
    #[must_use]
    pub fn listener(&self) -> Option<ListenerId> {
        self.waiting.as_ref().map(|(listener, _)| *listener)
    }
}
