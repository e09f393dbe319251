//! `chrome.i18n` message source

use js_sys::{Function, Reflect};
use jb_core::i18n::MessageSource;
use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;

use crate::storage::chrome_api;

/// Looks messages up in the extension's `_locales`. Without `chrome.i18n`
/// (e.g. in tests) every lookup misses and callers use the built-in catalog.
pub struct ChromeMessages {
    i18n: Option<(JsValue, Function)>,
}

impl ChromeMessages {
    pub fn new() -> Self {
        let i18n = chrome_api(&["i18n"]).and_then(|i18n| {
            let get_message = Reflect::get(&i18n, &"getMessage".into()).ok()?.dyn_into::<Function>().ok()?;
            Some((i18n, get_message))
        });
        Self { i18n }
    }
}

impl Default for ChromeMessages {
    fn default() -> Self {
        Self::new()
    }
}

impl MessageSource for ChromeMessages {
    fn message(&self, key: &str) -> Option<String> {
        let (i18n, get_message) = self.i18n.as_ref()?;
        get_message
            .call1(i18n, &JsValue::from_str(key))
            .ok()
            .and_then(|value| value.as_string())
            .filter(|text| !text.is_empty())
    }
}
