//! User notices and hide-count batching
//!
//! A single scroll can hide dozens of listings. Rather than one toast per
//! listing, hide counts accumulate in a batch window that restarts on every
//! new hide; one summary is emitted once hides stop arriving.

use std::cell::Cell;
use std::rc::Rc;
use std::time::Duration;

use crate::i18n::{localize, MessageSource};
use crate::schedule::{Rearm, Scheduler};

/// A transient message for the user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notice {
    /// Listings hidden during the last batch window
    HiddenSummary { count: u32 },
    CompanyAdded(String),
    CompanyExists(String),
    SaveFailed,
    LoadFailed,
}

impl Notice {
    pub fn is_error(&self) -> bool {
        matches!(self, Self::CompanyExists(_) | Self::SaveFailed | Self::LoadFailed)
    }

    /// Localized text.
    pub fn message(&self, source: &dyn MessageSource) -> String {
        match self {
            Self::HiddenSummary { count } => {
                localize(source, "toastHiddenSummary", &[("count", &count.to_string())])
            }
            Self::CompanyAdded(company) => localize(source, "toastCompanyAdded", &[("company", company)]),
            Self::CompanyExists(company) => localize(source, "toastCompanyExists", &[("company", company)]),
            Self::SaveFailed => localize(source, "errorSaving", &[]),
            Self::LoadFailed => localize(source, "errorLoading", &[]),
        }
    }
}

/// Receiver of notices (toasts in the browser).
pub trait NoticeSink {
    fn notify(&self, notice: Notice);
}

impl<F: Fn(Notice)> NoticeSink for F {
    fn notify(&self, notice: Notice) {
        self(notice)
    }
}

/// Batches hide counts into one [`Notice::HiddenSummary`] per window.
pub struct NotificationAggregator<S: Scheduler> {
    hidden: Rc<Cell<u32>>,
    window: Rearm<S>,
    sink: Rc<dyn NoticeSink>,
}

impl<S: Scheduler> NotificationAggregator<S> {
    pub fn new(scheduler: S, window: Duration, sink: Rc<dyn NoticeSink>) -> Self {
        Self {
            hidden: Rc::new(Cell::new(0)),
            window: Rearm::new(scheduler, window),
            sink,
        }
    }

    /// Add `n` hides and restart the batch window.
    pub fn record_hidden(&self, n: u32) {
        if n == 0 {
            return;
        }
        self.hidden.set(self.hidden.get().saturating_add(n));

        let hidden = Rc::clone(&self.hidden);
        let sink = Rc::clone(&self.sink);
        self.window.arm(Box::new(move || flush(&hidden, sink.as_ref())));
    }

    /// Emit the pending summary now instead of waiting for the window.
    pub fn flush_now(&self) {
        self.window.cancel();
        flush(&self.hidden, self.sink.as_ref());
    }

    /// Hides counted but not yet reported.
    pub fn pending(&self) -> u32 {
        self.hidden.get()
    }
}

fn flush(hidden: &Cell<u32>, sink: &dyn NoticeSink) {
    let count = hidden.replace(0);
    if count > 0 {
        log::debug!("Reporting {} hidden listings", count);
        sink.notify(Notice::HiddenSummary { count });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::i18n::BuiltinMessages;
    use crate::schedule::VirtualClock;
    use std::cell::RefCell;

    fn ms(n: u64) -> Duration {
        Duration::from_millis(n)
    }

    fn aggregator(clock: &VirtualClock) -> (NotificationAggregator<VirtualClock>, Rc<RefCell<Vec<Notice>>>) {
        let notices = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&notices);
        let aggregator = NotificationAggregator::new(
            clock.clone(),
            ms(1500),
            Rc::new(move |notice: Notice| sink.borrow_mut().push(notice)),
        );
        (aggregator, notices)
    }

    #[test]
    fn test_hides_within_window_report_once() {
        let clock = VirtualClock::new();
        let (aggregator, notices) = aggregator(&clock);

        aggregator.record_hidden(2);
        clock.advance_to(ms(100));
        aggregator.record_hidden(1);
        clock.advance_to(ms(200));
        aggregator.record_hidden(4);
        clock.advance_to(ms(5000));

        assert_eq!(*notices.borrow(), vec![Notice::HiddenSummary { count: 7 }]);
        assert_eq!(aggregator.pending(), 0);
    }

    #[test]
    fn test_window_restarts_on_each_hide() {
        let clock = VirtualClock::new();
        let (aggregator, notices) = aggregator(&clock);

        for _ in 0..5 {
            aggregator.record_hidden(1);
            clock.advance(ms(1000));
        }
        assert!(notices.borrow().is_empty());

        clock.advance(ms(500));
        assert_eq!(*notices.borrow(), vec![Notice::HiddenSummary { count: 5 }]);
    }

    #[test]
    fn test_zero_is_ignored() {
        let clock = VirtualClock::new();
        let (aggregator, notices) = aggregator(&clock);
        aggregator.record_hidden(0);
        assert_eq!(clock.pending(), 0);
        clock.advance(ms(5000));
        assert!(notices.borrow().is_empty());
    }

    #[test]
    fn test_flush_now() {
        let clock = VirtualClock::new();
        let (aggregator, notices) = aggregator(&clock);
        aggregator.record_hidden(3);
        aggregator.flush_now();
        clock.advance(ms(5000));
        assert_eq!(*notices.borrow(), vec![Notice::HiddenSummary { count: 3 }]);
    }

    #[test]
    fn test_notice_messages() {
        let messages = BuiltinMessages;
        assert_eq!(Notice::HiddenSummary { count: 3 }.message(&messages), "Hid 3 job listing(s)");
        assert_eq!(
            Notice::CompanyExists("Acme".to_string()).message(&messages),
            "Acme is already blocked"
        );
        assert!(Notice::SaveFailed.is_error());
        assert!(!Notice::CompanyAdded("Acme".to_string()).is_error());
    }
}
