//! Localized messages
//!
//! Lookups go to a [`MessageSource`] (the browser's `chrome.i18n` in the
//! content script), then to the built-in English catalog, then fall back to
//! the key itself. Templates use `{name}` placeholders.

pub trait MessageSource {
    fn message(&self, key: &str) -> Option<String>;
}

/// Built-in English catalog.
#[derive(Debug, Clone, Copy, Default)]
pub struct BuiltinMessages;

impl MessageSource for BuiltinMessages {
    fn message(&self, key: &str) -> Option<String> {
        let text = match key {
            "toastHiddenSummary" => "Hid {count} job listing(s)",
            "toastCompanyAdded" => "{company} added to your blocked companies",
            "toastCompanyExists" => "{company} is already blocked",
            "errorSaving" => "Could not save your changes. Please try again.",
            "errorLoading" => "Could not load your settings.",
            "tooltipBlockButton" => "Block this company",
            "reloadAdvisory" => "Your filters changed. Reload the page to show listings that were hidden.",
            "reloadButton" => "Reload",
            "dismissButton" => "Dismiss",
            _ => return None,
        };
        Some(text.to_string())
    }
}

/// Look up `key` and substitute every `{name}` from `params`.
pub fn localize(source: &dyn MessageSource, key: &str, params: &[(&str, &str)]) -> String {
    let template = source
        .message(key)
        .filter(|text| !text.is_empty())
        .or_else(|| BuiltinMessages.message(key))
        .unwrap_or_else(|| key.to_string());
    substitute(&template, params)
}

/// Replace each `{name}` placeholder. Unknown placeholders are left as is.
pub fn substitute(template: &str, params: &[(&str, &str)]) -> String {
    params.iter().fold(template.to_string(), |text, (name, value)| {
        text.replace(&format!("{{{}}}", name), value)
    })
}
