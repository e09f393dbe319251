//! `setTimeout`-backed scheduler

use std::time::Duration;

use jb_core::schedule::{Scheduler, Task};
use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;

/// A pending timeout. Owns its callback, so canceling frees it.
pub struct Timeout {
    id: i32,
    _callback: Closure<dyn FnMut()>,
}

#[derive(Clone)]
pub struct WindowScheduler {
    window: web_sys::Window,
}

impl WindowScheduler {
    pub fn new(window: web_sys::Window) -> Self {
        Self { window }
    }
}

impl Scheduler for WindowScheduler {
    type Handle = Option<Timeout>;

    fn schedule(&self, delay: Duration, task: Task) -> Option<Timeout> {
        let callback = Closure::once(task);
        let millis = i32::try_from(delay.as_millis()).unwrap_or(i32::MAX);
        match self
            .window
            .set_timeout_with_callback_and_timeout_and_arguments_0(callback.as_ref().unchecked_ref(), millis)
        {
            Ok(id) => Some(Timeout { id, _callback: callback }),
            Err(e) => {
                log::warn!("setTimeout failed: {:?}", e);
                None
            }
        }
    }

    fn cancel(&self, handle: Option<Timeout>) {
        if let Some(timeout) = handle {
            self.window.clear_timeout_with_handle(timeout.id);
        }
    }
}

/// Fire-and-forget timeout for UI transitions that are never canceled.
pub fn after(window: &web_sys::Window, millis: i32, f: impl FnOnce() + 'static) {
    let callback = Closure::once_into_js(f);
    if let Err(e) = window.set_timeout_with_callback_and_timeout_and_arguments_0(callback.unchecked_ref(), millis) {
        log::debug!("setTimeout failed: {:?}", e);
    }
}
