//! Listing classifier
//!
//! Pure function of (snapshot, settings, keywords). No DOM, no I/O.

use crate::config::StatusPatterns;
use crate::settings::Settings;
use crate::types::{CandidateNode, Classification, HideReason, StatusFilter};

/// Status keywords normalized for case-insensitive matching.
#[derive(Debug, Clone)]
pub struct StatusMatcher {
    keywords: [Vec<String>; 4],
}

impl StatusMatcher {
    pub fn new(patterns: &StatusPatterns) -> Self {
        let compile = |filter: StatusFilter| -> Vec<String> {
            patterns
                .keywords(filter)
                .iter()
                .map(|keyword| normalize(keyword))
                .filter(|keyword| !keyword.is_empty())
                .collect()
        };
        Self {
            keywords: StatusFilter::ALL.map(compile),
        }
    }

    /// Whether `text` (already normalized) contains a keyword for `filter`.
    pub fn matches(&self, filter: StatusFilter, text: &str) -> bool {
        self.keywords[filter.index()]
            .iter()
            .any(|keyword| text.contains(keyword.as_str()))
    }
}

impl Default for StatusMatcher {
    fn default() -> Self {
        Self::new(&StatusPatterns::default())
    }
}

/// Lowercase and fold typographic apostrophes, so "won’t" matches "won't".
pub fn normalize(text: &str) -> String {
    text.trim().to_lowercase().replace('\u{2019}', "'")
}

/// Classify one listing.
///
/// Returns `None` for nodes that are not classifiable (no company name) or
/// that an earlier pass already hid. A blocked company always wins over the
/// status filters, and both win over the block control.
pub fn classify(node: &CandidateNode, settings: &Settings, matcher: &StatusMatcher) -> Option<Classification> {
    let company = node.company()?;
    if node.hidden_marker {
        return None;
    }

    if settings.blocked_companies.contains(company) {
        return Some(Classification::Hide(HideReason::BlockedCompany(company.to_string())));
    }

    if let Some(filter) = match_status(node, settings, matcher) {
        return Some(Classification::Hide(HideReason::Status(filter)));
    }

    Some(Classification::Keep {
        company: company.to_string(),
        block_control: settings.show_block_control && !node.has_block_control,
    })
}

/// First enabled status filter that matches the node.
pub fn match_status(node: &CandidateNode, settings: &Settings, matcher: &StatusMatcher) -> Option<StatusFilter> {
    if settings.filters.is_empty() {
        return None;
    }

    let footer = normalize(&node.footer_text);
    let mut dismiss: Option<String> = None;

    StatusFilter::ALL
        .into_iter()
        .filter(|filter| settings.filter_enabled(*filter))
        .find(|filter| match filter {
            StatusFilter::Dismissed => {
                node.dismissed_marker
                    || matcher.matches(
                        StatusFilter::Dismissed,
                        dismiss.get_or_insert_with(|| normalize(&node.dismiss_text)),
                    )
            }
            _ => matcher.matches(*filter, &footer),
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settings::BlockedCompanies;
    use crate::types::FilterFlags;

    fn settings(companies: &[&str], filters: FilterFlags) -> Settings {
        Settings {
            blocked_companies: BlockedCompanies::from_names(companies),
            filters,
            show_block_control: true,
        }
    }

    fn footer(company: &str, text: &str) -> CandidateNode {
        CandidateNode {
            footer_text: text.to_string(),
            ..CandidateNode::with_company(company)
        }
    }

    #[test]
    fn test_missing_company_is_skipped() {
        let s = settings(&["Acme"], FilterFlags::all());
        let node = CandidateNode {
            footer_text: "Applied".to_string(),
            ..CandidateNode::default()
        };
        assert_eq!(classify(&node, &s, &StatusMatcher::default()), None);
    }

    #[test]
    fn test_blocked_company_dominates_status_filters() {
        let matcher = StatusMatcher::default();
        let node = CandidateNode {
            dismissed_marker: true,
            ..footer("Acme", "Promoted · Applied")
        };
        for bits in 0..=FilterFlags::all().bits() {
            let s = settings(&["Acme"], FilterFlags::from_bits_truncate(bits));
            assert_eq!(
                classify(&node, &s, &matcher),
                Some(Classification::Hide(HideReason::BlockedCompany("Acme".to_string())))
            );
        }
    }

    #[test]
    fn test_company_match_is_trimmed_and_exact() {
        let matcher = StatusMatcher::default();
        let s = settings(&["Acme"], FilterFlags::empty());
        assert!(classify(&CandidateNode::with_company(" Acme\n"), &s, &matcher).unwrap().is_hidden());
        assert!(!classify(&CandidateNode::with_company("Acme Corp"), &s, &matcher).unwrap().is_hidden());
    }

    #[test]
    fn test_applied_filter() {
        let matcher = StatusMatcher::default();
        let s = settings(&[], FilterFlags::APPLIED);

        assert_eq!(
            classify(&footer("Beta", "Applied on Jan 3"), &s, &matcher),
            Some(Classification::Hide(HideReason::Status(StatusFilter::Applied)))
        );
        assert_eq!(
            classify(&footer("Beta", "Viewed 2 days ago"), &s, &matcher),
            Some(Classification::Keep { company: "Beta".to_string(), block_control: true })
        );
    }

    #[test]
    fn test_status_match_is_case_insensitive() {
        let matcher = StatusMatcher::default();
        let s = settings(&[], FilterFlags::PROMOTED);
        assert!(classify(&footer("Beta", "PROMOTED"), &s, &matcher).unwrap().is_hidden());
    }

    #[test]
    fn test_first_enabled_filter_wins() {
        let matcher = StatusMatcher::default();
        let s = settings(&[], FilterFlags::PROMOTED | FilterFlags::VIEWED);
        assert_eq!(
            match_status(&footer("Beta", "Viewed · Promoted"), &s, &matcher),
            Some(StatusFilter::Promoted)
        );
    }

    #[test]
    fn test_dismissed_structural_marker() {
        let matcher = StatusMatcher::default();
        let node = CandidateNode {
            dismissed_marker: true,
            ..CandidateNode::with_company("Beta")
        };
        assert_eq!(
            match_status(&node, &settings(&[], FilterFlags::DISMISSED), &matcher),
            Some(StatusFilter::Dismissed)
        );
        assert_eq!(match_status(&node, &settings(&[], FilterFlags::APPLIED), &matcher), None);
    }

    #[test]
    fn test_dismissed_text_with_curly_apostrophe() {
        let matcher = StatusMatcher::default();
        let node = CandidateNode {
            dismiss_text: "We won\u{2019}t show you this job again.".to_string(),
            ..CandidateNode::with_company("Beta")
        };
        assert_eq!(
            match_status(&node, &settings(&[], FilterFlags::DISMISSED), &matcher),
            Some(StatusFilter::Dismissed)
        );
    }

    #[test]
    fn test_dismissed_text_is_not_read_from_footer() {
        let matcher = StatusMatcher::default();
        let node = footer("Beta", "We won't show you this job again");
        assert_eq!(match_status(&node, &settings(&[], FilterFlags::DISMISSED), &matcher), None);
    }

    #[test]
    fn test_already_hidden_is_not_reclassified() {
        let node = CandidateNode {
            hidden_marker: true,
            ..CandidateNode::with_company("Acme")
        };
        assert_eq!(classify(&node, &settings(&["Acme"], FilterFlags::empty()), &StatusMatcher::default()), None);
    }

    #[test]
    fn test_block_control_eligibility() {
        let matcher = StatusMatcher::default();
        let mut s = settings(&[], FilterFlags::empty());

        let with_control = CandidateNode {
            has_block_control: true,
            ..CandidateNode::with_company("Beta")
        };
        assert_eq!(
            classify(&with_control, &s, &matcher),
            Some(Classification::Keep { company: "Beta".to_string(), block_control: false })
        );

        s.show_block_control = false;
        assert_eq!(
            classify(&CandidateNode::with_company("Beta"), &s, &matcher),
            Some(Classification::Keep { company: "Beta".to_string(), block_control: false })
        );
    }

    #[test]
    fn test_custom_keywords() {
        let patterns = StatusPatterns {
            applied: vec!["Candidature envoyée".to_string(), "  ".to_string()],
            ..StatusPatterns::default()
        };
        let matcher = StatusMatcher::new(&patterns);
        let s = settings(&[], FilterFlags::APPLIED);
        assert!(classify(&footer("Beta", "candidature envoyée il y a 2 jours"), &s, &matcher)
            .unwrap()
            .is_hidden());
        // A blank keyword must not match everything.
        assert!(!classify(&footer("Beta", "Applied"), &s, &matcher).unwrap().is_hidden());
    }
}
