//! Core type definitions for Job Blocker
//!
//! These types are the plain data that flows between the stages of a
//! reconciliation pass: snapshots in, classifications out, one report per pass.

use serde::{Deserialize, Serialize};

// =============================================================================
// Status Filters
// =============================================================================

bitflags::bitflags! {
    /// Enabled status filters.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct FilterFlags: u8 {
        /// Hide listings already applied to
        const APPLIED = 1 << 0;
        /// Hide promoted (sponsored) listings
        const PROMOTED = 1 << 1;
        /// Hide listings already viewed
        const VIEWED = 1 << 2;
        /// Hide listings the user dismissed
        const DISMISSED = 1 << 3;
    }
}

/// A single status filter.
///
/// The declaration order is the evaluation order used by the classifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub enum StatusFilter {
    Applied,
    Promoted,
    Viewed,
    Dismissed,
}

impl StatusFilter {
    /// All filters, in evaluation order.
    pub const ALL: [StatusFilter; 4] = [
        StatusFilter::Applied,
        StatusFilter::Promoted,
        StatusFilter::Viewed,
        StatusFilter::Dismissed,
    ];

    /// Key of this filter's flag in the persisted store.
    pub const fn key(self) -> &'static str {
        match self {
            Self::Applied => "applied",
            Self::Promoted => "promoted",
            Self::Viewed => "viewed",
            Self::Dismissed => "dismissed",
        }
    }

    pub const fn flag(self) -> FilterFlags {
        match self {
            Self::Applied => FilterFlags::APPLIED,
            Self::Promoted => FilterFlags::PROMOTED,
            Self::Viewed => FilterFlags::VIEWED,
            Self::Dismissed => FilterFlags::DISMISSED,
        }
    }

    /// Parse from a store key.
    pub fn from_key(key: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|filter| filter.key() == key)
    }

    /// Dense index, used for per-filter tables.
    pub const fn index(self) -> usize {
        self as usize
    }
}

// =============================================================================
// Candidate Node
// =============================================================================

/// Snapshot of one listing node, scraped from the host document.
///
/// The element itself stays owned by the host page; this only carries what
/// the classifier needs to decide the node's fate.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub struct CandidateNode {
    /// Company name; `None` when the company sub-element is missing
    pub company_name: Option<String>,
    /// Text of the status-bearing footer
    pub footer_text: String,
    /// Text of the dismissal notice
    pub dismiss_text: String,
    /// The structural "dismissed" marker is present
    pub dismissed_marker: bool,
    /// A previous pass already hid this node
    pub hidden_marker: bool,
    /// A block control is already attached to the footer
    pub has_block_control: bool,
}

impl CandidateNode {
    /// Snapshot with only a company name set.
    pub fn with_company(company: &str) -> Self {
        Self {
            company_name: Some(company.to_string()),
            ..Self::default()
        }
    }

    /// Trimmed, non-empty company name.
    pub fn company(&self) -> Option<&str> {
        self.company_name
            .as_deref()
            .map(str::trim)
            .filter(|name| !name.is_empty())
    }
}

// =============================================================================
// Classification
// =============================================================================

/// Why a listing is hidden.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HideReason {
    /// The listing's company is on the block list
    BlockedCompany(String),
    /// An enabled status filter matched
    Status(StatusFilter),
}

/// Classifier verdict for one candidate node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Classification {
    /// Leave the listing visible
    Keep {
        company: String,
        /// A block control should be attached
        block_control: bool,
    },
    /// Hide the listing
    Hide(HideReason),
}

impl Classification {
    pub fn is_hidden(&self) -> bool {
        matches!(self, Self::Hide(_))
    }
}

// =============================================================================
// Pass Report
// =============================================================================

/// Counters for one reconciliation pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub struct PassReport {
    /// Listing nodes matched by the list-item selector
    pub scanned: usize,
    /// Nodes hidden by an earlier pass (not re-evaluated)
    pub already_hidden: usize,
    /// Nodes without a company name
    pub skipped: usize,
    /// Nodes hidden because their company is blocked
    pub hidden_by_company: usize,
    /// Nodes hidden by a status filter
    pub hidden_by_status: usize,
    /// Nodes left visible
    pub kept: usize,
    /// Block controls attached during this pass
    pub controls_added: usize,
}

impl PassReport {
    /// Nodes newly hidden by this pass.
    pub fn hidden(&self) -> usize {
        self.hidden_by_company + self.hidden_by_status
    }

    /// Fold a follow-up pass into this report.
    pub fn merge(&mut self, other: &PassReport) {
        self.scanned += other.scanned;
        self.already_hidden += other.already_hidden;
        self.skipped += other.skipped;
        self.hidden_by_company += other.hidden_by_company;
        self.hidden_by_status += other.hidden_by_status;
        self.kept += other.kept;
        self.controls_added += other.controls_added;
    }
}
