//! Content script wiring
//!
//! Connects the engine to the page: the mutation observer feeds the
//! watcher, the watcher and store change events run passes, pass reports
//! feed the notice batch, and block-control clicks edit the block list.

use std::cell::{Cell, RefCell};
use std::rc::{Rc, Weak};
use std::time::Duration;

use jb_core::actions::{add_blocked_company, AddOutcome};
use jb_core::config::EngineConfig;
use jb_core::i18n::localize;
use jb_core::notify::{Notice, NotificationAggregator};
use jb_core::reconcile::Reconciler;
use jb_core::settings::{load_settings, SettingsCache};
use jb_core::sync::StoreChanges;
use jb_core::types::PassReport;
use jb_core::watcher::MutationWatcher;
use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;
use wasm_bindgen_futures::spawn_local;
use web_sys::{Element, Event};

use crate::dom::{WebDocument, COMPANY_ATTR};
use crate::i18n::ChromeMessages;
use crate::observe::RootObserver;
use crate::storage::{ChromeStore, Subscription};
use crate::timers::WindowScheduler;
use crate::ui::{AdvisoryText, Ui};
use crate::BindingError;

pub struct ContentScript {
    document: WebDocument,
    cache: RefCell<SettingsCache>,
    reconciler: Reconciler,
    watcher: MutationWatcher<WindowScheduler>,
    notices: NotificationAggregator<WindowScheduler>,
    store: ChromeStore,
    messages: Rc<ChromeMessages>,
    ui: Rc<Ui>,
    observer: RefCell<Option<RootObserver>>,
    subscription: RefCell<Option<Subscription>>,
    click_handler: RefCell<Option<Closure<dyn FnMut(Event)>>>,
    /// A settings read is in flight.
    loading: Cell<bool>,
    load_error_shown: Cell<bool>,
}

impl ContentScript {
    pub fn new(config: EngineConfig) -> Result<Rc<Self>, BindingError> {
        let window = web_sys::window().ok_or(BindingError::Dom("window"))?;
        let document = window.document().ok_or(BindingError::Dom("document"))?;
        let store = ChromeStore::new(config.storage_area)?;
        let scheduler = WindowScheduler::new(window.clone());
        let messages = Rc::new(ChromeMessages::new());
        let ui = Rc::new(Ui::new(window, document.clone(), config.timing.toast_ms));
        let tooltip = localize(messages.as_ref(), "tooltipBlockButton", &[]);

        let debounce = Duration::from_millis(config.timing.debounce_ms.into());
        let window_ms = Duration::from_millis(config.timing.notification_window_ms.into());

        Ok(Rc::new_cyclic(|weak: &Weak<Self>| {
            let weak = weak.clone();
            let on_fire = move || {
                if let Some(app) = weak.upgrade() {
                    app.run_pass();
                }
            };

            let toast_ui = Rc::clone(&ui);
            let toast_messages = Rc::clone(&messages);
            let sink = move |notice: Notice| {
                toast_ui.toast(&notice.message(toast_messages.as_ref()), notice.is_error());
            };

            Self {
                document: WebDocument::new(document, config.selectors.clone(), config.markers.clone(), tooltip),
                cache: RefCell::new(SettingsCache::new()),
                reconciler: Reconciler::new(&config.keywords),
                watcher: MutationWatcher::new(scheduler.clone(), debounce, on_fire),
                notices: NotificationAggregator::new(scheduler, window_ms, Rc::new(sink)),
                store,
                messages,
                ui,
                observer: RefCell::new(None),
                subscription: RefCell::new(None),
                click_handler: RefCell::new(None),
                loading: Cell::new(false),
                load_error_shown: Cell::new(false),
            }
        }))
    }

    /// Install listeners and kick off the initial load and pass.
    pub fn start(self: &Rc<Self>) -> Result<(), BindingError> {
        if let Err(e) = self.ui.inject_styles() {
            log::warn!("Failed to inject styles: {:?}", e);
        }
        self.install_click_handler()?;
        self.observe()?;

        let weak = Rc::downgrade(self);
        let subscription = self.store.subscribe(move |changes| {
            if let Some(app) = weak.upgrade() {
                app.on_store_changed(&changes);
            }
        })?;
        *self.subscription.borrow_mut() = Some(subscription);

        // Not loaded yet, so this starts the first read.
        self.run_pass();
        Ok(())
    }

    /// Disconnect the observer and listeners and drop pending work.
    pub fn stop(&self) {
        self.observer.borrow_mut().take();
        self.subscription.borrow_mut().take();
        if let Some(handler) = self.click_handler.borrow_mut().take() {
            if let Some(document) = web_sys::window().and_then(|w| w.document()) {
                if let Err(e) = document.remove_event_listener_with_callback_and_bool(
                    "click",
                    handler.as_ref().unchecked_ref(),
                    true,
                ) {
                    log::debug!("Failed to remove click handler: {:?}", e);
                }
            }
        }
        self.watcher.stop();
        self.notices.flush_now();
    }

    /// Read the settings in the background, then run a pass. Until a read
    /// succeeds every trigger lands here, so a failed read is retried by the
    /// next mutation, change event or click.
    fn load_then_pass(self: &Rc<Self>) {
        if self.loading.replace(true) {
            return;
        }
        let app = Rc::clone(self);
        spawn_local(async move {
            let result = load_settings(&app.store).await;
            let loaded = app.cache.borrow_mut().apply_load(result);
            app.loading.set(false);

            if loaded {
                app.run_pass();
            } else if !app.load_error_shown.replace(true) {
                app.ui.toast(&Notice::LoadFailed.message(app.messages.as_ref()), true);
            }
        });
    }

    /// Run one reconciliation pass now, or start loading the settings when
    /// they have never been read.
    pub fn run_pass(self: &Rc<Self>) -> Option<PassReport> {
        if !self.cache.borrow().is_loaded() {
            log::debug!("Settings not loaded yet, reading them before the pass");
            self.load_then_pass();
            return None;
        }
        let report = self.reconciler.run_with(&self.document, || self.cache.borrow().get());
        self.refresh_observer();

        let report = report?;
        self.notices
            .record_hidden(u32::try_from(report.hidden()).unwrap_or(u32::MAX));
        Some(report)
    }

    fn refresh_observer(&self) {
        if let Some(observer) = self.observer.borrow().as_ref() {
            match observer.ensure(&self.document) {
                Ok(true) => log::info!("Listing container replaced, observing the new one"),
                Ok(false) => {}
                Err(e) => log::warn!("Failed to observe listing container: {}", e),
            }
        }
    }

    fn on_store_changed(self: &Rc<Self>, changes: &StoreChanges) {
        let outcome = self.cache.borrow_mut().apply_changes(changes);
        self.run_pass();
        if !self.cache.borrow().is_loaded() {
            return;
        }

        if outcome.reload_required() {
            let text = AdvisoryText {
                message: localize(self.messages.as_ref(), "reloadAdvisory", &[]),
                reload: localize(self.messages.as_ref(), "reloadButton", &[]),
                dismiss: localize(self.messages.as_ref(), "dismissButton", &[]),
            };
            if let Err(e) = self.ui.show_advisory(&text) {
                log::warn!("Failed to show reload advisory: {:?}", e);
            }
        }
    }

    fn block_company(self: Rc<Self>, company: String) {
        spawn_local(async move {
            match add_blocked_company(&self.cache, &self.store, &company).await {
                Ok(outcome) => {
                    if let Some(notice) = outcome.notice() {
                        self.ui.toast(&notice.message(self.messages.as_ref()), notice.is_error());
                    }
                    if matches!(outcome, AddOutcome::Added(_)) {
                        self.run_pass();
                    }
                }
                Err(e) => {
                    log::warn!("Failed to block '{}': {}", company, e);
                    self.ui.toast(&Notice::SaveFailed.message(self.messages.as_ref()), true);
                }
            }
        });
    }

    /// One capture-phase listener on the document serves every block
    /// control, so the host's own listing click handlers never see the click.
    fn install_click_handler(self: &Rc<Self>) -> Result<(), BindingError> {
        let window = web_sys::window().ok_or(BindingError::Dom("window"))?;
        let document = window.document().ok_or(BindingError::Dom("document"))?;
        let selector = self.document.control_selector().to_string();
        let weak = Rc::downgrade(self);

        let handler = Closure::<dyn FnMut(Event)>::new(move |event: Event| {
            let Some(control) = event
                .target()
                .and_then(|target| target.dyn_into::<Element>().ok())
                .and_then(|target| target.closest(&selector).ok().flatten())
            else {
                return;
            };

            event.prevent_default();
            event.stop_propagation();
            event.stop_immediate_propagation();

            let Some(company) = control.get_attribute(COMPANY_ATTR) else {
                return;
            };
            if let Some(app) = weak.upgrade() {
                app.block_company(company);
            }
        });

        document
            .add_event_listener_with_callback_and_bool("click", handler.as_ref().unchecked_ref(), true)
            .map_err(|e| BindingError::Js(format!("{:?}", e)))?;
        *self.click_handler.borrow_mut() = Some(handler);
        Ok(())
    }

    fn observe(self: &Rc<Self>) -> Result<(), BindingError> {
        let weak = Rc::downgrade(self);
        let observer = RootObserver::new(move || {
            if let Some(app) = weak.upgrade() {
                app.watcher.notify_mutation();
            }
        })?;
        observer.ensure(&self.document)?;
        *self.observer.borrow_mut() = Some(observer);
        Ok(())
    }
}
