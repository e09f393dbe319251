//! Settings model and cache
//!
//! The persisted store is shared with the popup, the options page and every
//! other tab running the content script. The cache mirrors it in memory so a
//! reconciliation pass never waits on storage: a pass takes one
//! [`Rc<Settings>`] snapshot at its start and keeps it to the end.

use std::collections::HashSet;
use std::rc::Rc;

use serde_json::Value;

use crate::sync::StoreChanges;
use crate::types::{FilterFlags, StatusFilter};

/// Raw key/value view of the persisted store.
pub type StoreValues = serde_json::Map<String, Value>;

/// Store key of the blocked company list.
pub const BLOCKED_COMPANIES_KEY: &str = "blockedCompanies";
/// Store key of the block control toggle.
pub const SHOW_BLOCK_CONTROL_KEY: &str = "showBlockControl";

/// Every key the engine reads.
pub const SETTINGS_KEYS: [&str; 6] = [
    BLOCKED_COMPANIES_KEY,
    "applied",
    "promoted",
    "viewed",
    "dismissed",
    SHOW_BLOCK_CONTROL_KEY,
];

// =============================================================================
// Store
// =============================================================================

/// Error type for persisted store access.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    #[error("Store unavailable: {0}")]
    Unavailable(String),
    #[error("Store read failed: {0}")]
    Read(String),
    #[error("Store write failed: {0}")]
    Write(String),
}

/// Async key/value store shared across browser contexts.
///
/// Futures are driven on the page's single thread and need not be `Send`.
#[allow(async_fn_in_trait)]
pub trait SettingsStore {
    /// Read the given keys. Absent keys are simply missing from the result.
    async fn get(&self, keys: &[&str]) -> Result<StoreValues, StoreError>;

    /// Write a partial update.
    async fn set(&self, values: StoreValues) -> Result<(), StoreError>;
}

// =============================================================================
// Blocked Companies
// =============================================================================

/// Ordered, duplicate-free list of blocked company names.
///
/// Names are trimmed on insert and empty names are rejected. Order is kept
/// for display only.
#[derive(Debug, Clone, Default)]
pub struct BlockedCompanies {
    names: Vec<String>,
    index: HashSet<String>,
}

impl BlockedCompanies {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from raw names, dropping blanks and duplicates.
    pub fn from_names<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut list = Self::new();
        for name in names {
            list.insert(name.as_ref());
        }
        list
    }

    /// Insert a name. Returns `false` if it was blank or already present.
    pub fn insert(&mut self, name: &str) -> bool {
        let name = name.trim();
        if name.is_empty() || self.index.contains(name) {
            return false;
        }
        self.index.insert(name.to_string());
        self.names.push(name.to_string());
        true
    }

    pub fn remove(&mut self, name: &str) -> bool {
        let name = name.trim();
        if !self.index.remove(name) {
            return false;
        }
        self.names.retain(|n| n != name);
        true
    }

    pub fn contains(&self, name: &str) -> bool {
        self.index.contains(name.trim())
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.names.iter().map(String::as_str)
    }

    /// Names present here but missing from `newer`.
    pub fn removed_in(&self, newer: &BlockedCompanies) -> Vec<String> {
        self.names
            .iter()
            .filter(|name| !newer.index.contains(name.as_str()))
            .cloned()
            .collect()
    }

    /// Store representation.
    pub fn to_value(&self) -> Value {
        Value::Array(self.names.iter().cloned().map(Value::String).collect())
    }

    /// Parse the store representation. Non-string entries are dropped;
    /// anything other than an array is treated as absent.
    pub fn from_value(value: Option<&Value>) -> Self {
        match value {
            Some(Value::Array(items)) => Self::from_names(items.iter().filter_map(Value::as_str)),
            Some(Value::Null) | None => Self::new(),
            Some(other) => {
                log::debug!("Ignoring malformed {}: {}", BLOCKED_COMPANIES_KEY, other);
                Self::new()
            }
        }
    }
}

impl PartialEq for BlockedCompanies {
    fn eq(&self, other: &Self) -> bool {
        self.names == other.names
    }
}

impl Eq for BlockedCompanies {}

// =============================================================================
// Settings
// =============================================================================

/// Effective settings, with defaults applied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub blocked_companies: BlockedCompanies,
    pub filters: FilterFlags,
    pub show_block_control: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            blocked_companies: BlockedCompanies::new(),
            filters: FilterFlags::empty(),
            show_block_control: true,
        }
    }
}

impl Settings {
    /// Build from raw store values. Absent or malformed keys take defaults.
    pub fn from_values(values: &StoreValues) -> Self {
        let mut filters = FilterFlags::empty();
        for filter in StatusFilter::ALL {
            filters.set(filter.flag(), read_bool(values.get(filter.key()), false));
        }

        Self {
            blocked_companies: BlockedCompanies::from_value(values.get(BLOCKED_COMPANIES_KEY)),
            filters,
            show_block_control: read_bool(values.get(SHOW_BLOCK_CONTROL_KEY), true),
        }
    }

    pub fn filter_enabled(&self, filter: StatusFilter) -> bool {
        self.filters.contains(filter.flag())
    }

    /// Store representation of every recognized key.
    pub fn to_values(&self) -> StoreValues {
        let mut values = StoreValues::new();
        values.insert(BLOCKED_COMPANIES_KEY.to_string(), self.blocked_companies.to_value());
        for filter in StatusFilter::ALL {
            values.insert(filter.key().to_string(), Value::Bool(self.filter_enabled(filter)));
        }
        values.insert(SHOW_BLOCK_CONTROL_KEY.to_string(), Value::Bool(self.show_block_control));
        values
    }
}

pub(crate) fn read_bool(value: Option<&Value>, default: bool) -> bool {
    match value {
        Some(Value::Bool(b)) => *b,
        Some(Value::Null) | None => default,
        Some(other) => {
            log::debug!("Ignoring non-boolean setting value: {}", other);
            default
        }
    }
}

/// Read every recognized key and build fresh settings.
pub async fn load_settings<S: SettingsStore>(store: &S) -> Result<Settings, StoreError> {
    let values = store.get(&SETTINGS_KEYS).await?;
    Ok(Settings::from_values(&values))
}

// =============================================================================
// Settings Cache
// =============================================================================

/// In-memory mirror of the persisted settings.
///
/// Updates replace the whole snapshot, so a pass holding an earlier
/// snapshot never sees a torn mix of old and new values.
///
/// Change events that arrive before the first load completes are kept and
/// re-applied on top of the loaded snapshot, since the read may predate them.
#[derive(Debug, Default)]
pub struct SettingsCache {
    pub(crate) current: Rc<Settings>,
    loaded: bool,
    pub(crate) early_changes: Vec<StoreChanges>,
}

impl SettingsCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current snapshot. Never blocks.
    pub fn get(&self) -> Rc<Settings> {
        Rc::clone(&self.current)
    }

    /// Replace the snapshot atomically.
    pub fn replace(&mut self, settings: Settings) {
        self.current = Rc::new(settings);
        self.loaded = true;
    }

    /// Whether a load from the store has completed.
    pub fn is_loaded(&self) -> bool {
        self.loaded
    }

    /// Apply the result of a store read. Failures are logged and leave the
    /// previous snapshot in place; the next trigger reads again.
    pub fn apply_load(&mut self, result: Result<Settings, StoreError>) -> bool {
        match result {
            Ok(settings) => {
                log::debug!(
                    "Settings loaded: {} blocked companies, filters {:?}, block control {}",
                    settings.blocked_companies.len(),
                    settings.filters,
                    settings.show_block_control
                );
                self.replace(settings);
                for changes in std::mem::take(&mut self.early_changes) {
                    self.apply_changes(&changes);
                }
                true
            }
            Err(e) => {
                log::warn!("Failed to load settings: {}", e);
                false
            }
        }
    }
}
