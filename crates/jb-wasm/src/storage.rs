//! `chrome.storage` binding

use js_sys::{Function, Promise, Reflect};
use jb_core::config::StorageArea;
use jb_core::settings::{SettingsStore, StoreError, StoreValues};
use jb_core::sync::StoreChanges;
use serde::Serialize;
use serde_json::Value;
use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;
use wasm_bindgen_futures::JsFuture;

use crate::BindingError;

/// Resolve a dotted path such as `chrome.storage.sync` from the global object.
pub(crate) fn chrome_api(path: &[&str]) -> Option<JsValue> {
    let mut value = Reflect::get(&js_sys::global(), &"chrome".into()).ok()?;
    for segment in path {
        if value.is_undefined() || value.is_null() {
            return None;
        }
        value = Reflect::get(&value, &JsValue::from_str(segment)).ok()?;
    }
    if value.is_undefined() || value.is_null() {
        None
    } else {
        Some(value)
    }
}

/// One `chrome.storage` area (promise-based, Manifest V3).
pub struct ChromeStore {
    area: JsValue,
    name: StorageArea,
}

impl ChromeStore {
    pub fn new(name: StorageArea) -> Result<Self, BindingError> {
        let area = chrome_api(&["storage", name.as_str()]).ok_or(BindingError::MissingApi("chrome.storage"))?;
        Ok(Self { area, name })
    }

    fn call(&self, method: &str, arg: &JsValue) -> Result<Promise, String> {
        let function: Function = Reflect::get(&self.area, &JsValue::from_str(method))
            .map_err(|e| format!("{:?}", e))?
            .dyn_into()
            .map_err(|_| format!("storage.{}.{} is not a function", self.name.as_str(), method))?;
        function
            .call1(&self.area, arg)
            .map_err(|e| format!("{:?}", e))?
            .dyn_into::<Promise>()
            .map_err(|_| format!("storage.{}.{} did not return a promise", self.name.as_str(), method))
    }

    /// Deliver change events for this area to `handler` until the returned
    /// subscription is dropped.
    pub fn subscribe(&self, handler: impl Fn(StoreChanges) + 'static) -> Result<Subscription, BindingError> {
        let on_changed = chrome_api(&["storage", "onChanged"]).ok_or(BindingError::MissingApi("chrome.storage.onChanged"))?;
        let add_listener = listener_method(&on_changed, "addListener")?;

        let area = self.name;
        let callback = Closure::<dyn FnMut(JsValue, JsValue)>::new(move |changes: JsValue, area_name: JsValue| {
            if area_name.as_string().as_deref() != Some(area.as_str()) {
                return;
            }
            match serde_wasm_bindgen::from_value::<StoreChanges>(changes) {
                Ok(changes) => handler(changes),
                Err(e) => log::warn!("Ignoring malformed storage change event: {}", e),
            }
        });

        add_listener
            .call1(&on_changed, callback.as_ref())
            .map_err(|e| BindingError::Js(format!("{:?}", e)))?;

        Ok(Subscription {
            on_changed,
            callback,
        })
    }
}

fn listener_method(event: &JsValue, name: &'static str) -> Result<Function, BindingError> {
    Reflect::get(event, &JsValue::from_str(name))
        .ok()
        .and_then(|f| f.dyn_into().ok())
        .ok_or(BindingError::MissingApi(name))
}

/// A registered `chrome.storage.onChanged` listener. Dropping it removes the
/// listener before its closure is freed.
pub struct Subscription {
    on_changed: JsValue,
    callback: Closure<dyn FnMut(JsValue, JsValue)>,
}

impl Drop for Subscription {
    fn drop(&mut self) {
        let removed = listener_method(&self.on_changed, "removeListener")
            .and_then(|remove| {
                remove
                    .call1(&self.on_changed, self.callback.as_ref())
                    .map_err(|e| BindingError::Js(format!("{:?}", e)))
            });
        if let Err(e) = removed {
            log::warn!("Failed to remove storage listener: {}", e);
        }
    }
}

impl SettingsStore for ChromeStore {
    async fn get(&self, keys: &[&str]) -> Result<StoreValues, StoreError> {
        let array = js_sys::Array::new();
        for key in keys {
            array.push(&JsValue::from_str(key));
        }

        let promise = self.call("get", &array).map_err(StoreError::Unavailable)?;
        let result = JsFuture::from(promise)
            .await
            .map_err(|e| StoreError::Read(format!("{:?}", e)))?;

        match serde_wasm_bindgen::from_value::<Value>(result) {
            Ok(Value::Object(values)) => Ok(values),
            Ok(Value::Null) => Ok(StoreValues::new()),
            Ok(other) => Err(StoreError::Read(format!("unexpected result: {}", other))),
            Err(e) => Err(StoreError::Read(e.to_string())),
        }
    }

    async fn set(&self, values: StoreValues) -> Result<(), StoreError> {
        let object = values
            .serialize(&serde_wasm_bindgen::Serializer::json_compatible())
            .map_err(|e| StoreError::Write(e.to_string()))?;

        let promise = self.call("set", &object).map_err(StoreError::Unavailable)?;
        JsFuture::from(promise)
            .await
            .map(|_| ())
            .map_err(|e| StoreError::Write(format!("{:?}", e)))
    }
}

#[cfg(all(test, target_arch = "wasm32"))]
mod tests {
    use super::*;
    use wasm_bindgen_test::*;

    wasm_bindgen_test_configure!(run_in_browser);

    fn install_stub_chrome() {
        Function::new_no_args(
            "globalThis.chrome = { storage: { sync: {}, onChanged: {
                listeners: [],
                addListener(f) { this.listeners.push(f); },
                removeListener(f) { this.listeners = this.listeners.filter((g) => g !== f); },
            } } };",
        )
        .call0(&JsValue::NULL)
        .unwrap();
    }

    fn listener_count() -> u32 {
        let on_changed = chrome_api(&["storage", "onChanged"]).unwrap();
        let listeners = Reflect::get(&on_changed, &"listeners".into()).unwrap();
        js_sys::Array::from(&listeners).length()
    }

    #[wasm_bindgen_test]
    fn test_dropping_subscription_removes_listener() {
        install_stub_chrome();
        let store = ChromeStore::new(StorageArea::Sync).unwrap();

        let first = store.subscribe(|_| {}).unwrap();
        let second = store.subscribe(|_| {}).unwrap();
        assert_eq!(listener_count(), 2);

        drop(first);
        assert_eq!(listener_count(), 1);
        drop(second);
        assert_eq!(listener_count(), 0);
    }
}
