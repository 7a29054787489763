// Copyright 2026 the Floodmap Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Periodic gauge polling in the browser.
//!
//! [`GaugeFeed`] fires a poll round on a `setInterval` timer. Each round gets
//! its own `AbortController`; starting a round aborts the previous round's
//! requests, and [`GaugePoller`] drops any response that still arrives for
//! it. Dropping the feed clears the timer and aborts everything in flight.

use alloc::boxed::Box;
use alloc::format;
use alloc::rc::{Rc, Weak};
use alloc::string::String;
use core::cell::{Cell, RefCell};

use wasm_bindgen::closure::Closure;
use wasm_bindgen::prelude::*;
use wasm_bindgen_futures::JsFuture;
use web_sys::{AbortController, AbortSignal, RequestInit, Response};

use floodmap_core::gauge::{FetchError, GaugeConfig, GaugePoller, GaugeReading, GaugeSite};

/// Callback receiving every site with its latest reading after a change.
pub type GaugeCallback = Box<dyn FnMut(&[GaugeSite], &[GaugeReading])>;

struct FeedInner {
    config: GaugeConfig,
    poller: RefCell<GaugePoller>,
    controller: RefCell<Option<AbortController>>,
    interval: Cell<Option<i32>>,
    tick: RefCell<Option<Closure<dyn FnMut()>>>,
    on_update: RefCell<GaugeCallback>,
}

/// Polls the configured gauges until dropped.
pub struct GaugeFeed {
    inner: Rc<FeedInner>,
}

impl core::fmt::Debug for GaugeFeed {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("GaugeFeed")
            .field("poller", &self.inner.poller.try_borrow().ok())
            .field("interval", &self.inner.interval.get())
            .finish_non_exhaustive()
    }
}

impl GaugeFeed {
    /// Polls immediately, then every `config.interval_ms`.
    ///
    /// Fails if the timer cannot be installed.
    pub fn start(
        config: GaugeConfig,
        on_update: impl FnMut(&[GaugeSite], &[GaugeReading]) + 'static,
    ) -> Result<Self, JsValue> {
        let window = web_sys::window().ok_or_else(|| JsValue::from_str("no window"))?;
        let inner = Rc::new(FeedInner {
            poller: RefCell::new(GaugePoller::new(config.sites.clone())),
            config,
            controller: RefCell::new(None),
            interval: Cell::new(None),
            tick: RefCell::new(None),
            on_update: RefCell::new(Box::new(on_update)),
        });

        let weak = Rc::downgrade(&inner);
        let tick = Closure::wrap(Box::new(move || {
            if let Some(inner) = weak.upgrade() {
                poll(&inner);
            }
        }) as Box<dyn FnMut()>);
        let timeout = i32::try_from(inner.config.interval_ms).unwrap_or(i32::MAX);
        let id = window.set_interval_with_callback_and_timeout_and_arguments_0(
            tick.as_ref().unchecked_ref(),
            timeout,
        )?;
        inner.interval.set(Some(id));
        *inner.tick.borrow_mut() = Some(tick);

        poll(&inner);
        Ok(Self { inner })
    }

    /// Latest readings, parallel to the configured sites.
    #[must_use]
    pub fn readings(&self) -> alloc::vec::Vec<GaugeReading> {
        self.inner.poller.borrow().readings().to_vec()
    }

    /// Stops polling and aborts outstanding requests. Idempotent.
    pub fn stop(&self) {
        if let Some(id) = self.inner.interval.take()
            && let Some(window) = web_sys::window()
        {
            window.clear_interval_with_handle(id);
        }
        if let Some(controller) = self.inner.controller.borrow_mut().take() {
            controller.abort();
        }
        self.inner.poller.borrow_mut().cancel();
        self.inner.tick.borrow_mut().take();
    }
}

impl Drop for GaugeFeed {
    fn drop(&mut self) {
        self.stop();
    }
}

fn poll(inner: &Rc<FeedInner>) {
    let round = inner.poller.borrow_mut().begin();
    if let Some(previous) = inner.controller.borrow_mut().take() {
        previous.abort();
    }
    let controller = match AbortController::new() {
        Ok(controller) => controller,
        Err(_) => {
            web_sys::console::warn_1(&"gauge poll skipped: AbortController unavailable".into());
            return;
        }
    };
    let signal = controller.signal();
    *inner.controller.borrow_mut() = Some(controller);

    for (index, site) in inner.config.sites.iter().enumerate() {
        let url = inner.config.url(site);
        let signal = signal.clone();
        let weak: Weak<FeedInner> = Rc::downgrade(inner);
        wasm_bindgen_futures::spawn_local(async move {
            let result = fetch_text(&url, &signal).await;
            let Some(inner) = weak.upgrade() else {
                return;
            };
            let accepted = inner.poller.borrow_mut().complete(
                round.ticket,
                index,
                result.as_deref().map_err(Clone::clone),
            );
            if accepted {
                let poller = inner.poller.borrow();
                (inner.on_update.borrow_mut())(poller.sites(), poller.readings());
            }
        });
    }
}

fn classify(error: &JsValue) -> FetchError {
    if let Some(exception) = error.dyn_ref::<web_sys::DomException>()
        && exception.name() == "AbortError"
    {
        return FetchError::Aborted;
    }
    if let Some(error) = error.dyn_ref::<js_sys::Error>() {
        return FetchError::Network(String::from(error.message()));
    }
    FetchError::Network(format!("{error:?}"))
}

async fn fetch_text(url: &str, signal: &AbortSignal) -> Result<String, FetchError> {
    let window = web_sys::window().ok_or_else(|| FetchError::Network(String::from("no window")))?;
    let init = RequestInit::new();
    init.set_method("GET");
    init.set_signal(Some(signal));
    let response = JsFuture::from(window.fetch_with_str_and_init(url, &init))
        .await
        .map_err(|e| classify(&e))?;
    let response: Response = response
        .dyn_into()
        .map_err(|_| FetchError::Network(String::from("fetch did not return a Response")))?;
    if !response.ok() {
        return Err(FetchError::Status(response.status()));
    }
    let text = response.text().map_err(|e| classify(&e))?;
    let text = JsFuture::from(text).await.map_err(|e| classify(&e))?;
    text.as_string()
        .ok_or_else(|| FetchError::Network(String::from("response body is not text")))
}
