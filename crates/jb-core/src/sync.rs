//! Cross-context settings sync
//!
//! Other tabs, the popup and the options page all write the same store. Each
//! write arrives here as a change event and is folded into the cache. Hides
//! are one-way: a listing hidden under the old settings stays hidden, because
//! the host's list virtualization may already have replaced the node. When a
//! change would have revealed listings, the outcome asks for a reload.

use std::collections::BTreeMap;
use std::rc::Rc;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::settings::{read_bool, BlockedCompanies, SettingsCache, BLOCKED_COMPANIES_KEY, SHOW_BLOCK_CONTROL_KEY};
use crate::types::StatusFilter;

/// One key's change, as delivered by `chrome.storage.onChanged`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct StoreChange {
    pub old_value: Option<Value>,
    pub new_value: Option<Value>,
}

impl StoreChange {
    pub fn new(old_value: Option<Value>, new_value: Option<Value>) -> Self {
        Self { old_value, new_value }
    }
}

/// Changes keyed by store key.
pub type StoreChanges = BTreeMap<String, StoreChange>;

/// What applying a change event did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncOutcome {
    /// Recognized keys that were updated
    pub changed_keys: Vec<String>,
    /// Filters switched from on to off
    pub disabled_filters: Vec<StatusFilter>,
    /// Companies dropped from the block list
    pub unblocked_companies: Vec<String>,
}

impl SyncOutcome {
    /// Hidden listings may no longer match; only a reload reveals them.
    pub fn reload_required(&self) -> bool {
        !self.disabled_filters.is_empty() || !self.unblocked_companies.is_empty()
    }
}

impl SettingsCache {
    /// Fold a change event into the cache.
    ///
    /// Transitions are measured against the cached snapshot rather than the
    /// event's `oldValue`, so a change this context already applied (its own
    /// write echoing back) is a no-op. Unknown keys are ignored.
    ///
    /// Before the first load completes the event is also kept, so the load
    /// result cannot overwrite it.
    pub fn apply_changes(&mut self, changes: &StoreChanges) -> SyncOutcome {
        if !self.is_loaded() {
            self.early_changes.push(changes.clone());
        }
        let mut next = (*self.current).clone();
        let mut outcome = SyncOutcome::default();

        for (key, change) in changes {
            let new_value = change.new_value.as_ref();
            match key.as_str() {
                BLOCKED_COMPANIES_KEY => {
                    let companies = BlockedCompanies::from_value(new_value);
                    outcome.unblocked_companies.extend(next.blocked_companies.removed_in(&companies));
                    next.blocked_companies = companies;
                }
                SHOW_BLOCK_CONTROL_KEY => {
                    next.show_block_control = read_bool(new_value, true);
                }
                other => match StatusFilter::from_key(other) {
                    Some(filter) => {
                        let enabled = read_bool(new_value, false);
                        if next.filter_enabled(filter) && !enabled {
                            outcome.disabled_filters.push(filter);
                        }
                        next.filters.set(filter.flag(), enabled);
                    }
                    None => {
                        log::trace!("Ignoring change to unrelated key '{}'", other);
                        continue;
                    }
                },
            }
            outcome.changed_keys.push(key.clone());
        }

        if !outcome.changed_keys.is_empty() {
            log::debug!("Settings changed in another context: {:?}", outcome.changed_keys);
            self.current = Rc::new(next);
        }
        if outcome.reload_required() {
            log::info!(
                "Reload required: filters disabled {:?}, companies unblocked {:?}",
                outcome.disabled_filters,
                outcome.unblocked_companies
            );
        }
        outcome
    }
}
