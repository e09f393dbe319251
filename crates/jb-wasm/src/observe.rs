//! MutationObserver on the listing container

use std::cell::RefCell;

use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;
use web_sys::{MutationObserver, MutationObserverInit, Node};

use crate::dom::WebDocument;
use crate::BindingError;

/// Observes the list container, or the body when there is none.
///
/// The host is a single-page app and may swap the container out on
/// navigation. [`ensure`](Self::ensure) moves the observation to the current
/// container once the observed one has left the document.
pub struct RootObserver {
    observer: MutationObserver,
    _callback: Closure<dyn FnMut(js_sys::Array, MutationObserver)>,
    root: RefCell<Option<Node>>,
}

impl RootObserver {
    pub fn new(on_mutation: impl Fn() + 'static) -> Result<Self, BindingError> {
        let callback = Closure::<dyn FnMut(js_sys::Array, MutationObserver)>::new(
            move |_records: js_sys::Array, _observer: MutationObserver| on_mutation(),
        );
        let observer = MutationObserver::new(callback.as_ref().unchecked_ref())
            .map_err(|e| BindingError::Js(format!("{:?}", e)))?;
        Ok(Self {
            observer,
            _callback: callback,
            root: RefCell::new(None),
        })
    }

    /// Observe the current root unless the observed one is still attached.
    /// Returns `true` when the observation moved.
    pub fn ensure(&self, document: &WebDocument) -> Result<bool, BindingError> {
        if self.root.borrow().as_ref().is_some_and(Node::is_connected) {
            return Ok(false);
        }

        let root = document.observation_root().ok_or(BindingError::Dom("document.body"))?;
        self.observer.disconnect();

        let init = MutationObserverInit::new();
        init.set_child_list(true);
        init.set_subtree(true);
        self.observer
            .observe_with_options(&root, &init)
            .map_err(|e| BindingError::Js(format!("{:?}", e)))?;

        log::debug!("Observing {}", root.node_name());
        *self.root.borrow_mut() = Some(root);
        Ok(true)
    }

    pub fn root(&self) -> Option<Node> {
        self.root.borrow().clone()
    }
}

impl Drop for RootObserver {
    fn drop(&mut self) {
        self.observer.disconnect();
    }
}
