//! WebAssembly content script for Job Blocker
//!
//! The extension's loader calls [`start`] once per page with an optional
//! engine configuration. Everything after that is driven by page events:
//! DOM mutations, `chrome.storage` changes and block-control clicks.

mod app;
mod dom;
mod i18n;
mod observe;
mod storage;
mod timers;
mod ui;

use std::cell::RefCell;
use std::rc::Rc;

use jb_core::config::EngineConfig;
use serde::Serialize;
use thiserror::Error;
use wasm_bindgen::prelude::*;

use crate::app::ContentScript;

#[derive(Debug, Error)]
pub enum BindingError {
    #[error("missing extension API: {0}")]
    MissingApi(&'static str),

    #[error("missing DOM object: {0}")]
    Dom(&'static str),

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("JavaScript error: {0}")]
    Js(String),
}

impl From<BindingError> for JsValue {
    fn from(e: BindingError) -> Self {
        JsValue::from_str(&e.to_string())
    }
}

thread_local! {
    static APP: RefCell<Option<Rc<ContentScript>>> = const { RefCell::new(None) };
}

#[wasm_bindgen(start)]
pub fn init_logging() {
    console_error_panic_hook::set_once();
    let level = if cfg!(debug_assertions) { log::Level::Debug } else { log::Level::Info };
    wasm_logger::init(wasm_logger::Config::new(level));
}

fn parse_config(config: JsValue) -> Result<EngineConfig, BindingError> {
    let config = if config.is_undefined() || config.is_null() {
        EngineConfig::default()
    } else {
        serde_wasm_bindgen::from_value::<EngineConfig>(config).map_err(|e| BindingError::Config(e.to_string()))?
    };
    config.validate().map_err(|e| BindingError::Config(e.to_string()))?;
    Ok(config)
}

/// Start filtering the current page.
#[wasm_bindgen]
pub fn start(config: JsValue) -> Result<(), JsValue> {
    if is_running() {
        return Err(JsValue::from_str("Already running. Call stop() first."));
    }

    let config = parse_config(config)?;
    let app = ContentScript::new(config)?;
    app.start()?;
    APP.with(|slot| *slot.borrow_mut() = Some(app));
    log::info!("Job Blocker started");
    Ok(())
}

#[wasm_bindgen]
pub fn is_running() -> bool {
    APP.with(|slot| slot.borrow().is_some())
}

/// Run a pass immediately; returns the pass report, or `null` when no pass ran.
#[wasm_bindgen]
pub fn rescan() -> Result<JsValue, JsValue> {
    let app = APP.with(|slot| slot.borrow().clone());
    let Some(report) = app.and_then(|app| app.run_pass()) else {
        return Ok(JsValue::NULL);
    };
    report
        .serialize(&serde_wasm_bindgen::Serializer::json_compatible())
        .map_err(|e| JsValue::from_str(&e.to_string()))
}

/// Disconnect observers and listeners.
#[wasm_bindgen]
pub fn stop() {
    if let Some(app) = APP.with(|slot| slot.borrow_mut().take()) {
        app.stop();
        log::info!("Job Blocker stopped");
    }
}
