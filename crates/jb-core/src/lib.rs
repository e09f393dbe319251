//! Job Blocker Core Library
//!
//! This crate provides the listing filter engine for the Job Blocker content
//! script. It never touches a browser API directly: the host page, the
//! persisted settings store, timers and localized strings are all reached
//! through traits, so every stage runs the same way in the wasm content
//! script, in the CLI and in unit tests.
//!
//! # Architecture
//!
//! A reconciliation pass scans the host document for listing nodes, takes a
//! plain-data snapshot of each one, classifies the snapshots against the
//! current [`Settings`] and applies the resulting hides and block controls.
//! Passes are triggered by the [`MutationWatcher`] (debounced host DOM
//! mutations) and by cross-context settings changes; hide counts are batched
//! into a single notice by the [`NotificationAggregator`].
//!
//! # Modules
//!
//! - `types`: Filter flags, candidate snapshots and classification results
//! - `config`: Host selectors, status keywords and timing configuration
//! - `settings`: Settings model, persisted store trait and settings cache
//! - `sync`: Applying store change events and detecting stale hides
//! - `classifier`: Pure listing classification
//! - `reconcile`: Host document trait and the reconciliation pass
//! - `schedule`: Cancelable timers, the re-arm primitive and a virtual clock
//! - `watcher`: Debounced mutation watcher
//! - `notify`: User notices and hide-count batching
//! - `actions`: Block-list edits triggered from the page
//! - `i18n`: Localized message lookup with `{param}` substitution
//! - `memory`: In-memory host document and settings store

pub mod types;
pub mod config;
pub mod settings;
pub mod sync;
pub mod classifier;
pub mod reconcile;
pub mod schedule;
pub mod watcher;
pub mod notify;
pub mod actions;
pub mod i18n;
pub mod memory;

// Re-export commonly used types
pub use types::{CandidateNode, Classification, FilterFlags, HideReason, PassReport, StatusFilter};
pub use config::{ConfigError, EngineConfig, HostSelectors, Markers, StatusPatterns, StorageArea, Timing};
pub use settings::{load_settings, BlockedCompanies, Settings, SettingsCache, SettingsStore, StoreError, StoreValues};
pub use sync::{StoreChange, StoreChanges, SyncOutcome};
pub use classifier::{classify, StatusMatcher};
pub use reconcile::{HostDocument, PassState, Reconciler};
pub use memory::{Listing, MemoryDocument, MemoryStore};
pub use schedule::{Rearm, Scheduler, Task, VirtualClock};
pub use watcher::MutationWatcher;
pub use notify::{Notice, NoticeSink, NotificationAggregator};
pub use actions::{add_blocked_company, AddOutcome};
pub use i18n::{localize, BuiltinMessages, MessageSource};
