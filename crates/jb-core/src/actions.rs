//! Block-list edits triggered from the page

use std::cell::RefCell;

use crate::notify::Notice;
use crate::settings::{BlockedCompanies, SettingsCache, SettingsStore, StoreError, StoreValues, BLOCKED_COMPANIES_KEY};

/// Result of a block request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AddOutcome {
    Added(String),
    AlreadyExists(String),
    /// Blank name
    Invalid,
}

impl AddOutcome {
    /// Notice to show the user, if any.
    pub fn notice(&self) -> Option<Notice> {
        match self {
            Self::Added(company) => Some(Notice::CompanyAdded(company.clone())),
            Self::AlreadyExists(company) => Some(Notice::CompanyExists(company.clone())),
            Self::Invalid => None,
        }
    }
}

/// Add `name` to the blocked companies and persist it.
///
/// The persisted list is re-read first so a company blocked meanwhile in
/// another tab is not lost by this write. Duplicates cause no write. The
/// cache is updated only after the write succeeds; no borrow of `cache` is
/// held across an await.
pub async fn add_blocked_company<S: SettingsStore>(
    cache: &RefCell<SettingsCache>,
    store: &S,
    name: &str,
) -> Result<AddOutcome, StoreError> {
    let name = name.trim();
    if name.is_empty() {
        return Ok(AddOutcome::Invalid);
    }
    if cache.borrow().get().blocked_companies.contains(name) {
        return Ok(AddOutcome::AlreadyExists(name.to_string()));
    }

    let stored = store.get(&[BLOCKED_COMPANIES_KEY]).await?;
    let mut companies = BlockedCompanies::from_value(stored.get(BLOCKED_COMPANIES_KEY));
    if !companies.insert(name) {
        return Ok(AddOutcome::AlreadyExists(name.to_string()));
    }

    let mut update = StoreValues::new();
    update.insert(BLOCKED_COMPANIES_KEY.to_string(), companies.to_value());
    store.set(update).await?;

    let mut cache = cache.borrow_mut();
    let mut settings = (*cache.get()).clone();
    settings.blocked_companies = companies;
    cache.replace(settings);
    log::info!("Blocked company added: {}", name);

    Ok(AddOutcome::Added(name.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryStore;
    use crate::settings::Settings;
    use serde_json::json;

    fn cache_with(companies: &[&str]) -> RefCell<SettingsCache> {
        let mut cache = SettingsCache::new();
        cache.replace(Settings {
            blocked_companies: BlockedCompanies::from_names(companies),
            ..Settings::default()
        });
        RefCell::new(cache)
    }

    #[tokio::test]
    async fn test_add_new_company() {
        let store = MemoryStore::new();
        let cache = cache_with(&[]);

        let outcome = add_blocked_company(&cache, &store, "  Acme ").await.unwrap();
        assert_eq!(outcome, AddOutcome::Added("Acme".to_string()));
        assert_eq!(outcome.notice(), Some(Notice::CompanyAdded("Acme".to_string())));
        assert!(cache.borrow().get().blocked_companies.contains("Acme"));
        assert_eq!(store.values()["blockedCompanies"], json!(["Acme"]));
        assert_eq!(store.writes(), 1);
    }

    #[tokio::test]
    async fn test_duplicate_is_noop() {
        let store = MemoryStore::new();
        let cache = cache_with(&["Acme"]);

        let outcome = add_blocked_company(&cache, &store, "Acme").await.unwrap();
        assert_eq!(outcome, AddOutcome::AlreadyExists("Acme".to_string()));
        assert_eq!(outcome.notice(), Some(Notice::CompanyExists("Acme".to_string())));
        assert_eq!(store.writes(), 0);
        assert_eq!(cache.borrow().get().blocked_companies.len(), 1);
    }

    #[tokio::test]
    async fn test_duplicate_in_store_is_noop() {
        let mut values = StoreValues::new();
        values.insert("blockedCompanies".to_string(), json!(["Acme"]));
        let store = MemoryStore::with_values(values);
        let cache = cache_with(&[]);

        let outcome = add_blocked_company(&cache, &store, "Acme").await.unwrap();
        assert_eq!(outcome, AddOutcome::AlreadyExists("Acme".to_string()));
        assert_eq!(store.writes(), 0);
    }

    #[tokio::test]
    async fn test_merges_with_other_context_writes() {
        let mut values = StoreValues::new();
        values.insert("blockedCompanies".to_string(), json!(["Beta"]));
        let store = MemoryStore::with_values(values);
        let cache = cache_with(&[]);

        add_blocked_company(&cache, &store, "Acme").await.unwrap();
        assert_eq!(store.values()["blockedCompanies"], json!(["Beta", "Acme"]));
        let settings = cache.borrow().get();
        assert!(settings.blocked_companies.contains("Beta"));
        assert!(settings.blocked_companies.contains("Acme"));
    }

    #[tokio::test]
    async fn test_blank_name_is_invalid() {
        let store = MemoryStore::new();
        let cache = cache_with(&[]);
        let outcome = add_blocked_company(&cache, &store, "   ").await.unwrap();
        assert_eq!(outcome, AddOutcome::Invalid);
        assert_eq!(outcome.notice(), None);
        assert_eq!(store.writes(), 0);
    }

    #[tokio::test]
    async fn test_write_failure_leaves_cache_untouched() {
        let store = MemoryStore::new();
        store.set_fail_writes(true);
        let cache = cache_with(&[]);

        let err = add_blocked_company(&cache, &store, "Acme").await.unwrap_err();
        assert!(matches!(err, StoreError::Write(_)));
        assert!(!cache.borrow().get().blocked_companies.contains("Acme"));
    }
}
