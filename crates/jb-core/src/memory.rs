//! In-memory host document and settings store
//!
//! Stand-ins for the browser used by the CLI fixtures and the tests. The
//! document behaves like the host list: nodes can be inserted and removed at
//! any time, and hides and controls are recorded on the nodes themselves.

use std::cell::{Cell, RefCell};
use std::collections::BTreeMap;
use std::rc::Rc;

use serde::{Deserialize, Serialize};

use crate::reconcile::HostDocument;
use crate::settings::{SettingsStore, StoreError, StoreValues};
use crate::sync::{StoreChange, StoreChanges};
use crate::types::CandidateNode;

// =============================================================================
// Memory Document
// =============================================================================

/// One listing as it appears in a fixture.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Listing {
    pub company: Option<String>,
    /// `None` when the listing has no footer region at all
    pub footer: Option<String>,
    pub dismiss_text: String,
    pub dismissed: bool,
}

impl Default for Listing {
    fn default() -> Self {
        Self {
            company: None,
            footer: Some(String::new()),
            dismiss_text: String::new(),
            dismissed: false,
        }
    }
}

impl Listing {
    pub fn company(name: &str) -> Self {
        Self {
            company: Some(name.to_string()),
            ..Self::default()
        }
    }

    pub fn with_footer(mut self, text: &str) -> Self {
        self.footer = Some(text.to_string());
        self
    }

    pub fn without_footer(mut self) -> Self {
        self.footer = None;
        self
    }

    pub fn dismissed(mut self, text: &str) -> Self {
        self.dismissed = true;
        self.dismiss_text = text.to_string();
        self
    }
}

#[derive(Debug, Clone)]
struct MemoryNode {
    listing: Listing,
    hidden: bool,
    controls: Vec<String>,
}

/// Host document backed by a map of listing nodes, keyed by a stable id.
#[derive(Debug, Default)]
pub struct MemoryDocument {
    nodes: RefCell<BTreeMap<usize, MemoryNode>>,
    next_id: Cell<usize>,
}

impl MemoryDocument {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_listings(listings: impl IntoIterator<Item = Listing>) -> Self {
        let doc = Self::new();
        for listing in listings {
            doc.insert(listing);
        }
        doc
    }

    /// Insert a listing, as the host does while the user scrolls.
    pub fn insert(&self, listing: Listing) -> usize {
        let id = self.next_id.get();
        self.next_id.set(id + 1);
        self.nodes.borrow_mut().insert(
            id,
            MemoryNode {
                listing,
                hidden: false,
                controls: Vec::new(),
            },
        );
        id
    }

    /// Remove a listing, as the host's virtualization does.
    pub fn remove(&self, id: usize) -> bool {
        self.nodes.borrow_mut().remove(&id).is_some()
    }

    pub fn len(&self) -> usize {
        self.nodes.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.borrow().is_empty()
    }

    pub fn is_hidden_id(&self, id: usize) -> bool {
        self.nodes.borrow().get(&id).is_some_and(|node| node.hidden)
    }

    pub fn hidden_ids(&self) -> Vec<usize> {
        self.nodes
            .borrow()
            .iter()
            .filter(|(_, node)| node.hidden)
            .map(|(id, _)| *id)
            .collect()
    }

    pub fn visible_ids(&self) -> Vec<usize> {
        self.nodes
            .borrow()
            .iter()
            .filter(|(_, node)| !node.hidden)
            .map(|(id, _)| *id)
            .collect()
    }

    pub fn control_count(&self, id: usize) -> usize {
        self.nodes.borrow().get(&id).map_or(0, |node| node.controls.len())
    }

    /// Company bound to the node's block control.
    pub fn control_company(&self, id: usize) -> Option<String> {
        self.nodes.borrow().get(&id).and_then(|node| node.controls.first().cloned())
    }

    pub fn listing(&self, id: usize) -> Option<Listing> {
        self.nodes.borrow().get(&id).map(|node| node.listing.clone())
    }
}

impl HostDocument for MemoryDocument {
    type Node = usize;

    fn candidates(&self) -> Vec<usize> {
        self.nodes.borrow().keys().copied().collect()
    }

    fn is_hidden(&self, node: &usize) -> bool {
        self.is_hidden_id(*node)
    }

    fn snapshot(&self, node: &usize) -> CandidateNode {
        let nodes = self.nodes.borrow();
        let Some(node) = nodes.get(node) else {
            return CandidateNode::default();
        };
        CandidateNode {
            company_name: node.listing.company.clone(),
            footer_text: node.listing.footer.clone().unwrap_or_default(),
            dismiss_text: node.listing.dismiss_text.clone(),
            dismissed_marker: node.listing.dismissed,
            hidden_marker: node.hidden,
            has_block_control: !node.controls.is_empty(),
        }
    }

    fn hide(&self, node: &usize) {
        if let Some(node) = self.nodes.borrow_mut().get_mut(node) {
            node.hidden = true;
        }
    }

    fn attach_block_control(&self, node: &usize, company: &str) -> bool {
        let mut nodes = self.nodes.borrow_mut();
        match nodes.get_mut(node) {
            Some(node) if node.listing.footer.is_some() && node.controls.is_empty() => {
                node.controls.push(company.to_string());
                true
            }
            _ => false,
        }
    }
}

// =============================================================================
// Memory Store
// =============================================================================

/// Settings store held in memory.
///
/// Every successful write is recorded as a change event, in the shape
/// `chrome.storage.onChanged` delivers, so callers can replay writes into
/// other contexts. Clones share the same storage.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    values: Rc<RefCell<StoreValues>>,
    changes: Rc<RefCell<Vec<StoreChanges>>>,
    writes: Rc<Cell<usize>>,
    fail_reads: Rc<Cell<bool>>,
    fail_writes: Rc<Cell<bool>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_values(values: StoreValues) -> Self {
        let store = Self::new();
        *store.values.borrow_mut() = values;
        store
    }

    /// Successful writes so far.
    pub fn writes(&self) -> usize {
        self.writes.get()
    }

    pub fn set_fail_reads(&self, fail: bool) {
        self.fail_reads.set(fail);
    }

    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.set(fail);
    }

    /// Drain recorded change events, oldest first.
    pub fn take_changes(&self) -> Vec<StoreChanges> {
        std::mem::take(&mut *self.changes.borrow_mut())
    }

    pub fn values(&self) -> StoreValues {
        self.values.borrow().clone()
    }
}

impl SettingsStore for MemoryStore {
    async fn get(&self, keys: &[&str]) -> Result<StoreValues, StoreError> {
        if self.fail_reads.get() {
            return Err(StoreError::Read("simulated read failure".to_string()));
        }
        let values = self.values.borrow();
        Ok(keys
            .iter()
            .filter_map(|key| values.get(*key).map(|value| (key.to_string(), value.clone())))
            .collect())
    }

    async fn set(&self, update: StoreValues) -> Result<(), StoreError> {
        if self.fail_writes.get() {
            return Err(StoreError::Write("simulated write failure".to_string()));
        }

        let mut values = self.values.borrow_mut();
        let mut changes = StoreChanges::new();
        for (key, new_value) in update {
            let old_value = values.insert(key.clone(), new_value.clone());
            if old_value.as_ref() != Some(&new_value) {
                changes.insert(key, StoreChange::new(old_value, Some(new_value)));
            }
        }

        self.writes.set(self.writes.get() + 1);
        if !changes.is_empty() {
            self.changes.borrow_mut().push(changes);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_document_insert_remove() {
        let doc = MemoryDocument::from_listings([Listing::company("Acme"), Listing::company("Beta")]);
        assert_eq!(doc.candidates(), vec![0, 1]);
        assert!(doc.remove(0));
        let id = doc.insert(Listing::company("Gamma"));
        assert_eq!(id, 2);
        assert_eq!(doc.candidates(), vec![1, 2]);
        assert_eq!(doc.snapshot(&2).company(), Some("Gamma"));
    }

    #[test]
    fn test_control_attached_once() {
        let doc = MemoryDocument::from_listings([Listing::company("Acme")]);
        assert!(doc.attach_block_control(&0, "Acme"));
        assert!(!doc.attach_block_control(&0, "Acme"));
        assert!(doc.snapshot(&0).has_block_control);
        assert_eq!(doc.control_count(0), 1);
    }

    #[test]
    fn test_listing_fixture_shape() {
        let listing: Listing = serde_json::from_value(json!({
            "company": "Acme",
            "dismissText": "We won't show you this job again",
            "dismissed": true
        }))
        .unwrap();
        assert_eq!(listing.footer, Some(String::new()));
        assert!(listing.dismissed);
    }

    #[tokio::test]
    async fn test_store_records_changes() {
        let store = MemoryStore::new();
        let mut update = StoreValues::new();
        update.insert("applied".to_string(), json!(true));
        store.set(update.clone()).await.unwrap();
        // Same value again: a write, but no change event.
        store.set(update).await.unwrap();

        assert_eq!(store.writes(), 2);
        let changes = store.take_changes();
        assert_eq!(changes.len(), 1);
        assert_eq!(changes[0]["applied"], StoreChange::new(None, Some(json!(true))));
        assert!(store.take_changes().is_empty());

        let read = store.get(&["applied", "viewed"]).await.unwrap();
        assert_eq!(read.len(), 1);
    }

    #[tokio::test]
    async fn test_store_failures() {
        let store = MemoryStore::new();
        store.set_fail_writes(true);
        assert!(matches!(store.set(StoreValues::new()).await, Err(StoreError::Write(_))));
        store.set_fail_reads(true);
        assert!(matches!(store.get(&["applied"]).await, Err(StoreError::Read(_))));
        assert_eq!(store.writes(), 0);
    }
}
