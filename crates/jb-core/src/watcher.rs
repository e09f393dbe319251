//! Debounced mutation watcher
//!
//! Virtualized lists mutate in bursts while the user scrolls. Every observed
//! mutation re-arms one timer; only the last arm fires, and the fire runs a
//! full fresh scan, so coalescing loses no listing, only time.

use std::cell::Cell;
use std::rc::Rc;
use std::time::Duration;

use crate::schedule::{Rearm, Scheduler};

pub struct MutationWatcher<S: Scheduler> {
    debounce: Rearm<S>,
    on_fire: Rc<dyn Fn()>,
    observed: Cell<u64>,
    fired: Rc<Cell<u64>>,
}

impl<S: Scheduler> MutationWatcher<S> {
    /// `on_fire` runs one reconciliation pass.
    pub fn new(scheduler: S, delay: Duration, on_fire: impl Fn() + 'static) -> Self {
        Self {
            debounce: Rearm::new(scheduler, delay),
            on_fire: Rc::new(on_fire),
            observed: Cell::new(0),
            fired: Rc::new(Cell::new(0)),
        }
    }

    /// Record a host mutation and (re)start the quiet period.
    pub fn notify_mutation(&self) {
        self.observed.set(self.observed.get() + 1);
        self.schedule();
    }

    /// Request a pass through the same debounce, e.g. after a settings change.
    pub fn schedule(&self) {
        let on_fire = Rc::clone(&self.on_fire);
        let fired = Rc::clone(&self.fired);
        self.debounce.arm(Box::new(move || {
            fired.set(fired.get() + 1);
            on_fire();
        }));
    }

    /// Drop any pending pass.
    pub fn stop(&self) {
        self.debounce.cancel();
    }

    pub fn is_pending(&self) -> bool {
        self.debounce.is_armed()
    }

    /// Mutations observed so far.
    pub fn observed(&self) -> u64 {
        self.observed.get()
    }

    /// Passes triggered so far.
    pub fn fired(&self) -> u64 {
        self.fired.get()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schedule::VirtualClock;

    fn ms(n: u64) -> Duration {
        Duration::from_millis(n)
    }

    fn watcher(clock: &VirtualClock) -> (MutationWatcher<VirtualClock>, Rc<Cell<u32>>) {
        let passes = Rc::new(Cell::new(0));
        let p = Rc::clone(&passes);
        let watcher = MutationWatcher::new(clock.clone(), ms(200), move || p.set(p.get() + 1));
        (watcher, passes)
    }

    #[test]
    fn test_burst_collapses_into_one_pass() {
        let clock = VirtualClock::new();
        let (watcher, passes) = watcher(&clock);

        for _ in 0..50 {
            watcher.notify_mutation();
            clock.advance(ms(10));
        }
        assert_eq!(passes.get(), 0);
        assert!(watcher.is_pending());

        clock.advance(ms(200));
        assert_eq!(passes.get(), 1);
        assert_eq!(watcher.observed(), 50);
        assert_eq!(watcher.fired(), 1);
        assert!(!watcher.is_pending());
    }

    #[test]
    fn test_separate_bursts_fire_separately() {
        let clock = VirtualClock::new();
        let (watcher, passes) = watcher(&clock);

        watcher.notify_mutation();
        clock.advance(ms(300));
        watcher.notify_mutation();
        clock.advance(ms(300));
        assert_eq!(passes.get(), 2);
    }

    #[test]
    fn test_stop_drops_pending_pass() {
        let clock = VirtualClock::new();
        let (watcher, passes) = watcher(&clock);
        watcher.notify_mutation();
        watcher.stop();
        clock.advance(ms(1000));
        assert_eq!(passes.get(), 0);
    }

    #[test]
    fn test_schedule_shares_debounce_with_mutations() {
        let clock = VirtualClock::new();
        let (watcher, passes) = watcher(&clock);
        watcher.notify_mutation();
        clock.advance(ms(100));
        watcher.schedule();
        clock.advance(ms(1000));
        assert_eq!(passes.get(), 1);
        assert_eq!(watcher.observed(), 1);
    }
}
