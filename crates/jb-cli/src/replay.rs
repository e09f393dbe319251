//! `replay` command: drive the engine through a timed event script
//!
//! Runs the same pieces the content script wires together (watcher,
//! reconciler, notification batching, sync and the block action) against
//! an in-memory page and store on a virtual clock, so a script always
//! produces the same transcript.

use std::cell::RefCell;
use std::fs;
use std::rc::{Rc, Weak};
use std::time::Duration;

use jb_core::{
    add_blocked_company, load_settings, localize, AddOutcome, BuiltinMessages, EngineConfig, Listing, MemoryDocument,
    MemoryStore, MutationWatcher, Notice, NotificationAggregator, Reconciler, SettingsCache, SettingsStore, StoreValues,
    VirtualClock,
};
use serde::Deserialize;
use tokio::runtime::Runtime;

use crate::runtime;

/// Upper bound on trailing clock steps once the script is exhausted.
const MAX_DRAIN_STEPS: usize = 1000;

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Script {
    pub config: EngineConfig,
    /// Initial store contents
    pub settings: StoreValues,
    /// Listings present before the first pass
    pub listings: Vec<Listing>,
    pub events: Vec<TimedEvent>,
    /// The first settings read fails
    pub fail_initial_load: bool,
}

#[derive(Debug, Deserialize)]
pub struct TimedEvent {
    /// Milliseconds since the script started
    pub at: u64,
    #[serde(flatten)]
    pub event: Event,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum Event {
    /// The host list mutated: listings appended and/or removed by id.
    Mutation {
        #[serde(default)]
        insert: Vec<Listing>,
        #[serde(default)]
        remove: Vec<usize>,
    },
    /// Another context wrote these values to the store.
    SettingsChange { values: StoreValues },
    /// The user clicked the block control of a listing.
    Click { company: String },
    /// Make store reads and/or writes fail until the next fault event.
    StoreFault {
        #[serde(default)]
        reads: bool,
        #[serde(default)]
        writes: bool,
    },
}

struct Session {
    clock: VirtualClock,
    doc: MemoryDocument,
    store: MemoryStore,
    cache: RefCell<SettingsCache>,
    reconciler: Reconciler,
    watcher: MutationWatcher<VirtualClock>,
    notices: NotificationAggregator<VirtualClock>,
    transcript: Rc<RefCell<Vec<String>>>,
    runtime: Runtime,
}

fn stamp(clock: &VirtualClock, line: &str) -> String {
    format!("[{:>6}ms] {}", clock.now().as_millis(), line)
}

impl Session {
    fn new(script: &Script) -> Result<Rc<Self>, String> {
        script.config.validate().map_err(|e| format!("Invalid config: {}", e))?;
        let runtime = runtime()?;
        let clock = VirtualClock::new();
        let transcript = Rc::new(RefCell::new(Vec::new()));
        let timing = script.config.timing;

        let sink_clock = clock.clone();
        let sink_transcript = Rc::clone(&transcript);
        let sink = move |notice: Notice| {
            let line = format!("notice: {}", notice.message(&BuiltinMessages));
            sink_transcript.borrow_mut().push(stamp(&sink_clock, &line));
        };

        Ok(Rc::new_cyclic(|weak: &Weak<Self>| {
            let weak = weak.clone();
            let on_fire = move || {
                if let Some(session) = weak.upgrade() {
                    session.run_pass("debounced");
                }
            };

            Self {
                doc: MemoryDocument::from_listings(script.listings.clone()),
                store: MemoryStore::with_values(script.settings.clone()),
                cache: RefCell::new(SettingsCache::new()),
                reconciler: Reconciler::new(&script.config.keywords),
                watcher: MutationWatcher::new(
                    clock.clone(),
                    Duration::from_millis(timing.debounce_ms.into()),
                    on_fire,
                ),
                notices: NotificationAggregator::new(
                    clock.clone(),
                    Duration::from_millis(timing.notification_window_ms.into()),
                    Rc::new(sink),
                ),
                clock,
                transcript,
                runtime,
            }
        }))
    }

    fn log(&self, line: &str) {
        self.transcript.borrow_mut().push(stamp(&self.clock, line));
    }

    fn load(&self) {
        let result = self.runtime.block_on(load_settings(&self.store));
        if !self.cache.borrow_mut().apply_load(result) {
            self.log(&format!("notice: {}", Notice::LoadFailed.message(&BuiltinMessages)));
        }
    }

    /// Run a pass. Until settings have loaded, each trigger reads them first.
    fn run_pass(&self, trigger: &str) {
        if !self.cache.borrow().is_loaded() {
            self.load();
            if !self.cache.borrow().is_loaded() {
                return;
            }
        }
        let Some(report) = self.reconciler.run_with(&self.doc, || self.cache.borrow().get()) else {
            return;
        };
        self.log(&format!(
            "pass ({}): scanned {}, hidden {}, kept {}, controls +{}",
            trigger,
            report.scanned,
            report.hidden(),
            report.kept,
            report.controls_added
        ));
        self.notices
            .record_hidden(u32::try_from(report.hidden()).unwrap_or(u32::MAX));
    }

    /// Deliver pending store writes as change events.
    fn deliver_changes(&self) {
        for changes in self.store.take_changes() {
            let outcome = self.cache.borrow_mut().apply_changes(&changes);
            if outcome.changed_keys.is_empty() {
                continue;
            }
            self.log(&format!("settings changed: {}", outcome.changed_keys.join(", ")));
            self.run_pass("settings");
            if outcome.reload_required() {
                self.log(&format!("advisory: {}", localize(&BuiltinMessages, "reloadAdvisory", &[])));
            }
        }
    }

    fn handle(&self, event: &Event) -> Result<(), String> {
        match event {
            Event::Mutation { insert, remove } => {
                for id in remove {
                    self.doc.remove(*id);
                }
                for listing in insert {
                    self.doc.insert(listing.clone());
                }
                self.watcher.notify_mutation();
            }
            Event::SettingsChange { values } => {
                self.runtime
                    .block_on(self.store.set(values.clone()))
                    .map_err(|e| format!("Failed to write settings: {}", e))?;
                self.deliver_changes();
            }
            Event::Click { company } => {
                match self.runtime.block_on(add_blocked_company(&self.cache, &self.store, company)) {
                    Ok(outcome) => {
                        if let Some(notice) = outcome.notice() {
                            self.log(&format!("notice: {}", notice.message(&BuiltinMessages)));
                        }
                        if matches!(outcome, AddOutcome::Added(_)) {
                            self.run_pass("block");
                        }
                    }
                    Err(e) => {
                        log::warn!("Failed to block '{}': {}", company, e);
                        self.log(&format!("notice: {}", Notice::SaveFailed.message(&BuiltinMessages)));
                    }
                }
                // Our own write echoes back; the cache already holds it.
                self.deliver_changes();
            }
            Event::StoreFault { reads, writes } => {
                self.store.set_fail_reads(*reads);
                self.store.set_fail_writes(*writes);
                self.log(&format!("store fault: reads {}, writes {}", reads, writes));
            }
        }
        Ok(())
    }

    /// Let every pending timer fire.
    fn drain(&self) {
        let step = Duration::from_millis(100);
        for _ in 0..MAX_DRAIN_STEPS {
            if self.clock.pending() == 0 {
                return;
            }
            self.clock.advance(step);
        }
        log::warn!("Timers still pending after drain");
    }
}

/// Run a script and return its transcript.
pub fn replay(script: &Script) -> Result<Vec<String>, String> {
    let session = Session::new(script)?;
    session.store.set_fail_reads(script.fail_initial_load);
    session.run_pass("initial");
    session.store.set_fail_reads(false);

    let mut events: Vec<&TimedEvent> = script.events.iter().collect();
    events.sort_by_key(|event| event.at);

    for timed in events {
        session.clock.advance_to(Duration::from_millis(timed.at));
        session.handle(&timed.event)?;
    }
    session.drain();

    let hidden = session.doc.hidden_ids().len();
    let visible = session.doc.visible_ids().len();
    session.log(&format!("done: {} hidden, {} visible", hidden, visible));

    let transcript = session.transcript.borrow().clone();
    Ok(transcript)
}

pub fn cmd_replay(path: &str) -> Result<(), String> {
    let text = fs::read_to_string(path).map_err(|e| format!("Failed to read '{}': {}", path, e))?;
    let script: Script = serde_json::from_str(&text).map_err(|e| format!("Invalid script '{}': {}", path, e))?;

    for line in replay(&script)? {
        println!("{}", line);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn script(value: serde_json::Value) -> Script {
        serde_json::from_value(value).unwrap()
    }

    fn count(transcript: &[String], needle: &str) -> usize {
        transcript.iter().filter(|line| line.contains(needle)).count()
    }

    #[test]
    fn test_mutation_burst_runs_one_pass() {
        let transcript = replay(&script(json!({
            "settings": { "blockedCompanies": ["Acme"] },
            "events": [
                { "at": 0, "type": "mutation", "insert": [{ "company": "Acme" }] },
                { "at": 50, "type": "mutation", "insert": [{ "company": "Beta" }] },
                { "at": 100, "type": "mutation", "insert": [{ "company": "Acme" }] }
            ]
        })))
        .unwrap();

        assert_eq!(count(&transcript, "pass (debounced)"), 1);
        assert!(transcript.iter().any(|line| line.contains("[   300ms] pass (debounced)")));
        assert_eq!(count(&transcript, "Hid 2 job listing(s)"), 1);
        assert!(transcript.last().unwrap().contains("2 hidden, 1 visible"));
    }

    #[test]
    fn test_disabling_filter_raises_advisory_without_reveal() {
        let transcript = replay(&script(json!({
            "settings": { "applied": true },
            "listings": [{ "company": "Acme", "footer": "Applied" }, { "company": "Beta" }],
            "events": [
                { "at": 1000, "type": "settingsChange", "values": { "applied": false } }
            ]
        })))
        .unwrap();

        assert_eq!(count(&transcript, "advisory:"), 1);
        assert!(transcript.last().unwrap().contains("1 hidden, 1 visible"));
    }

    #[test]
    fn test_failed_first_load_is_retried_by_next_trigger() {
        let script = script(json!({ "settings": { "blockedCompanies": ["Acme"] } }));
        let session = Session::new(&script).unwrap();
        session.store.set_fail_reads(true);
        session.run_pass("initial");
        assert!(!session.cache.borrow().is_loaded());

        session.store.set_fail_reads(false);
        let id = session.doc.insert(Listing::company("Acme"));
        session.watcher.notify_mutation();
        session.drain();

        assert!(session.cache.borrow().is_loaded());
        assert_eq!(session.doc.hidden_ids(), vec![id]);
        let transcript = session.transcript.borrow();
        assert_eq!(count(&transcript, "Could not load your settings"), 1);
        assert_eq!(count(&transcript, "pass (debounced)"), 1);
    }

    #[test]
    fn test_store_fault_script_recovers() {
        let transcript = replay(&script(json!({
            "settings": { "blockedCompanies": ["Acme"] },
            "failInitialLoad": true,
            "events": [
                { "at": 100, "type": "mutation", "insert": [{ "company": "Acme" }, { "company": "Beta" }] }
            ]
        })))
        .unwrap();

        assert_eq!(count(&transcript, "pass (initial)"), 0);
        assert_eq!(count(&transcript, "pass (debounced)"), 1);
        assert!(transcript.last().unwrap().contains("1 hidden, 1 visible"));
    }

    #[test]
    fn test_click_blocks_company_once() {
        let transcript = replay(&script(json!({
            "listings": [{ "company": "Acme" }, { "company": "Acme" }, { "company": "Beta" }],
            "events": [
                { "at": 10, "type": "click", "company": "Acme" },
                { "at": 20, "type": "click", "company": "Acme" }
            ]
        })))
        .unwrap();

        assert_eq!(count(&transcript, "notice: Acme"), 2);
        assert_eq!(count(&transcript, "is already blocked"), 1);
        assert_eq!(count(&transcript, "pass (block)"), 1);
        // The echo of our own write is applied but raises no advisory.
        assert_eq!(count(&transcript, "settings changed"), 1);
        assert_eq!(count(&transcript, "advisory:"), 0);
        assert!(transcript.last().unwrap().contains("2 hidden, 1 visible"));
    }
}
