//! Reconciliation pass
//!
//! Scan, classify, apply. The host page owns every listing node; the
//! reconciler only ever touches a node's visibility, its hidden marker and
//! the optional block control appended to its footer.

use std::cell::Cell;
use std::ops::Deref;

use crate::classifier::{classify, StatusMatcher};
use crate::config::StatusPatterns;
use crate::settings::Settings;
use crate::types::{CandidateNode, Classification, HideReason, PassReport};

/// The host page's listing DOM, as seen by the reconciler.
///
/// Methods take `&self`: DOM handles mutate through shared references.
pub trait HostDocument {
    type Node;

    /// Listing nodes currently in the document.
    fn candidates(&self) -> Vec<Self::Node>;

    /// The node carries the hidden marker from an earlier pass.
    fn is_hidden(&self, node: &Self::Node) -> bool;

    /// Scrape the node's classifiable fields.
    fn snapshot(&self, node: &Self::Node) -> CandidateNode;

    /// Hide the node and set the hidden marker.
    fn hide(&self, node: &Self::Node);

    /// Append a block control for `company` to the node's footer. Returns
    /// `false` when the node has no footer or already carries a control.
    fn attach_block_control(&self, node: &Self::Node, company: &str) -> bool;
}

/// Pass lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PassState {
    #[default]
    Idle,
    Scanning,
    Classifying,
    Applying,
}

/// Runs passes one at a time.
///
/// A pass requested while another is in flight (a re-entrant trigger from
/// inside the host document) is not run concurrently; it is recorded and
/// exactly one follow-up pass runs when the current one completes.
#[derive(Debug, Default)]
pub struct Reconciler {
    matcher: StatusMatcher,
    state: Cell<PassState>,
    rerun: Cell<bool>,
    passes: Cell<u64>,
}

impl Reconciler {
    pub fn new(patterns: &StatusPatterns) -> Self {
        Self {
            matcher: StatusMatcher::new(patterns),
            ..Self::default()
        }
    }

    pub fn state(&self) -> PassState {
        self.state.get()
    }

    /// Completed passes.
    pub fn passes(&self) -> u64 {
        self.passes.get()
    }

    /// Run a pass against `settings`. Returns `None` when a pass is already
    /// in flight; that pass then repeats once before returning.
    pub fn run<D: HostDocument>(&self, doc: &D, settings: &Settings) -> Option<PassReport> {
        self.run_with(doc, || settings)
    }

    /// Like [`run`](Self::run), but every pass, follow-ups included, takes
    /// its own snapshot from `snapshot` when it starts.
    pub fn run_with<D, F, R>(&self, doc: &D, snapshot: F) -> Option<PassReport>
    where
        D: HostDocument,
        F: Fn() -> R,
        R: Deref<Target = Settings>,
    {
        if self.state.get() != PassState::Idle {
            self.rerun.set(true);
            return None;
        }

        let mut report = self.pass(doc, &*snapshot());
        while self.rerun.replace(false) {
            let follow_up = self.pass(doc, &*snapshot());
            report.merge(&follow_up);
        }
        Some(report)
    }

    fn pass<D: HostDocument>(&self, doc: &D, settings: &Settings) -> PassReport {
        let mut report = PassReport::default();

        self.state.set(PassState::Scanning);
        let mut candidates = Vec::new();
        for node in doc.candidates() {
            report.scanned += 1;
            if doc.is_hidden(&node) {
                report.already_hidden += 1;
                continue;
            }
            let snapshot = doc.snapshot(&node);
            candidates.push((node, snapshot));
        }

        self.state.set(PassState::Classifying);
        let mut decisions = Vec::with_capacity(candidates.len());
        for (node, snapshot) in candidates {
            match classify(&snapshot, settings, &self.matcher) {
                Some(classification) => decisions.push((node, classification)),
                None => report.skipped += 1,
            }
        }

        self.state.set(PassState::Applying);
        for (node, classification) in &decisions {
            apply(doc, node, classification, &mut report);
        }

        self.state.set(PassState::Idle);
        self.passes.set(self.passes.get() + 1);
        log::debug!(
            "Pass {}: scanned {}, hidden {} (company {}, status {}), kept {}, controls +{}",
            self.passes.get(),
            report.scanned,
            report.hidden(),
            report.hidden_by_company,
            report.hidden_by_status,
            report.kept,
            report.controls_added
        );
        report
    }
}

/// Apply one classification to one node.
pub fn apply<D: HostDocument>(doc: &D, node: &D::Node, classification: &Classification, report: &mut PassReport) {
    match classification {
        Classification::Hide(reason) => {
            if doc.is_hidden(node) {
                return;
            }
            doc.hide(node);
            match reason {
                HideReason::BlockedCompany(company) => {
                    log::info!("Listing hidden for company: {}", company);
                    report.hidden_by_company += 1;
                }
                HideReason::Status(filter) => {
                    log::debug!("Listing hidden by '{}' filter", filter.key());
                    report.hidden_by_status += 1;
                }
            }
        }
        Classification::Keep { company, block_control } => {
            report.kept += 1;
            if *block_control && doc.attach_block_control(node, company) {
                report.controls_added += 1;
            }
        }
    }
}
