//! Engine configuration
//!
//! Selectors are the coupling points to a third-party page's markup and
//! drift whenever the host redesigns, so every one of them can be overridden.
//! Defaults match the LinkedIn job search list.

use serde::{Deserialize, Serialize};

use crate::types::StatusFilter;

/// Error type for configuration loading.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid config JSON: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("Selector '{0}' must not be empty")]
    EmptySelector(&'static str),
    #[error("Timing value '{0}' must be greater than zero")]
    ZeroTiming(&'static str),
}

/// Top-level configuration for the content engine.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub struct EngineConfig {
    pub selectors: HostSelectors,
    pub markers: Markers,
    pub keywords: StatusPatterns,
    pub timing: Timing,
    pub storage_area: StorageArea,
}

impl EngineConfig {
    /// Parse and validate a JSON config. Missing fields take their defaults.
    pub fn from_json(text: &str) -> Result<Self, ConfigError> {
        let config: EngineConfig = serde_json::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let required = [
            ("listItem", &self.selectors.list_item),
            ("companyName", &self.selectors.company_name),
            ("footer", &self.selectors.footer),
            ("hiddenClass", &self.markers.hidden_class),
            ("controlClass", &self.markers.control_class),
        ];
        for (name, value) in required {
            if value.trim().is_empty() {
                return Err(ConfigError::EmptySelector(name));
            }
        }

        if self.timing.debounce_ms == 0 {
            return Err(ConfigError::ZeroTiming("debounceMs"));
        }
        if self.timing.notification_window_ms == 0 {
            return Err(ConfigError::ZeroTiming("notificationWindowMs"));
        }
        Ok(())
    }
}

// =============================================================================
// Host Selectors
// =============================================================================

/// CSS selectors describing the host page's listing markup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub struct HostSelectors {
    /// One element per listing
    pub list_item: String,
    /// Company name, relative to a listing
    pub company_name: String,
    /// Footer carrying status labels, relative to a listing
    pub footer: String,
    /// Structural "dismissed" marker, on the listing or a descendant
    pub dismissed_marker: String,
    /// Dismissal notice text, relative to a listing
    pub dismiss_text: String,
    /// Narrowest ancestor holding the list; the observer falls back to the body
    pub list_container: String,
}

impl Default for HostSelectors {
    fn default() -> Self {
        Self {
            list_item: r#"li[id^="ember"], li.discovery-templates-entity-item"#.to_string(),
            company_name: ".artdeco-entity-lockup__subtitle span".to_string(),
            footer: ".job-card-list__footer-wrapper".to_string(),
            dismissed_marker: ".job-card-list--is-dismissed".to_string(),
            dismiss_text: ".job-card-container__footer-item--highlighted".to_string(),
            list_container: ".scaffold-layout__list".to_string(),
        }
    }
}

/// Class names the engine writes into the host page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub struct Markers {
    /// Marks a listing as hidden by a previous pass
    pub hidden_class: String,
    /// Marks an injected block control
    pub control_class: String,
}

impl Default for Markers {
    fn default() -> Self {
        Self {
            hidden_class: "hidden-job".to_string(),
            control_class: "block-company".to_string(),
        }
    }
}

// =============================================================================
// Status Keywords
// =============================================================================

/// Keywords per status filter, matched case-insensitively as substrings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub struct StatusPatterns {
    /// Matched against the footer text
    pub applied: Vec<String>,
    /// Matched against the footer text
    pub promoted: Vec<String>,
    /// Matched against the footer text
    pub viewed: Vec<String>,
    /// Matched against the dismissal notice text
    pub dismissed: Vec<String>,
}

impl StatusPatterns {
    pub fn keywords(&self, filter: StatusFilter) -> &[String] {
        match filter {
            StatusFilter::Applied => &self.applied,
            StatusFilter::Promoted => &self.promoted,
            StatusFilter::Viewed => &self.viewed,
            StatusFilter::Dismissed => &self.dismissed,
        }
    }
}

impl Default for StatusPatterns {
    fn default() -> Self {
        Self {
            applied: vec!["Applied".to_string()],
            promoted: vec!["Promoted".to_string()],
            viewed: vec!["Viewed".to_string()],
            dismissed: vec!["We won't show you this job again".to_string()],
        }
    }
}

// =============================================================================
// Timing
// =============================================================================

/// Delays, in milliseconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub struct Timing {
    /// Quiet period after the last host mutation before a pass runs
    pub debounce_ms: u32,
    /// Batch window for the "N listings hidden" notice
    pub notification_window_ms: u32,
    /// How long a toast stays on screen
    pub toast_ms: u32,
}

impl Default for Timing {
    fn default() -> Self {
        Self {
            debounce_ms: 200,
            notification_window_ms: 1500,
            toast_ms: 3000,
        }
    }
}

/// Which `chrome.storage` area holds the settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub enum StorageArea {
    #[default]
    Sync,
    Local,
}

impl StorageArea {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Sync => "sync",
            Self::Local => "local",
        }
    }
}
