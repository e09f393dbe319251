//! Timers
//!
//! Both debounced stages (the mutation watcher and the notice batch window)
//! are built on [`Rearm`]: arming cancels whatever was outstanding, so only
//! the most recent arm ever fires. The browser binds [`Scheduler`] to
//! `setTimeout`; tests and the CLI use [`VirtualClock`].

use std::cell::{Cell, RefCell};
use std::collections::BTreeMap;
use std::rc::Rc;
use std::time::Duration;

/// A deferred callback.
pub type Task = Box<dyn FnOnce()>;

/// Source of cancelable one-shot timers.
pub trait Scheduler {
    type Handle;

    /// Run `task` once after `delay`.
    fn schedule(&self, delay: Duration, task: Task) -> Self::Handle;

    /// Cancel a pending timer. Canceling a timer that already fired is a no-op.
    fn cancel(&self, handle: Self::Handle);
}

// =============================================================================
// Rearm
// =============================================================================

/// Single outstanding timer; each [`arm`](Rearm::arm) replaces the last.
pub struct Rearm<S: Scheduler> {
    scheduler: S,
    delay: Duration,
    pending: RefCell<Option<S::Handle>>,
    armed: Rc<Cell<bool>>,
}

impl<S: Scheduler> Rearm<S> {
    pub fn new(scheduler: S, delay: Duration) -> Self {
        Self {
            scheduler,
            delay,
            pending: RefCell::new(None),
            armed: Rc::new(Cell::new(false)),
        }
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// Cancel any outstanding timer and arm a new one running `task`.
    pub fn arm(&self, task: Task) {
        self.cancel();

        let armed = Rc::clone(&self.armed);
        armed.set(true);
        let handle = self.scheduler.schedule(
            self.delay,
            Box::new(move || {
                armed.set(false);
                task();
            }),
        );
        *self.pending.borrow_mut() = Some(handle);
    }

    /// Cancel the outstanding timer, if any.
    pub fn cancel(&self) {
        let handle = self.pending.borrow_mut().take();
        if let Some(handle) = handle {
            self.scheduler.cancel(handle);
        }
        self.armed.set(false);
    }

    /// A timer is outstanding and has not fired yet.
    pub fn is_armed(&self) -> bool {
        self.armed.get()
    }
}

impl<S: Scheduler> Drop for Rearm<S> {
    fn drop(&mut self) {
        self.cancel();
    }
}

// =============================================================================
// Virtual Clock
// =============================================================================

/// Handle of a [`VirtualClock`] timer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TimerId(u64);

#[derive(Default)]
struct ClockState {
    now: Duration,
    next_id: u64,
    timers: BTreeMap<(Duration, u64), Task>,
    deadlines: BTreeMap<u64, Duration>,
}

/// Deterministic scheduler driven by [`advance`](VirtualClock::advance).
///
/// Cloning yields another handle to the same clock.
#[derive(Clone, Default)]
pub struct VirtualClock {
    state: Rc<RefCell<ClockState>>,
}

impl VirtualClock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current virtual time since the clock was created.
    pub fn now(&self) -> Duration {
        self.state.borrow().now
    }

    /// Number of timers waiting to fire.
    pub fn pending(&self) -> usize {
        self.state.borrow().timers.len()
    }

    /// Move time forward, firing due timers in deadline order. Timers
    /// scheduled by a firing task run in the same call if they fall due.
    /// Returns the number of timers fired.
    pub fn advance(&self, by: Duration) -> usize {
        let target = self.now() + by;
        let mut fired = 0;

        loop {
            let due = {
                let mut state = self.state.borrow_mut();
                let next = state
                    .timers
                    .keys()
                    .next()
                    .copied()
                    .filter(|(deadline, _)| *deadline <= target);
                match next {
                    Some(key) => {
                        state.now = key.0;
                        state.deadlines.remove(&key.1);
                        state.timers.remove(&key)
                    }
                    None => None,
                }
            };

            // The borrow is released before running, so tasks may schedule.
            match due {
                Some(task) => {
                    task();
                    fired += 1;
                }
                None => break,
            }
        }

        self.state.borrow_mut().now = target;
        fired
    }

    /// Advance to an absolute virtual time. Times in the past are ignored.
    pub fn advance_to(&self, at: Duration) -> usize {
        let now = self.now();
        if at <= now {
            return 0;
        }
        self.advance(at - now)
    }
}

impl Scheduler for VirtualClock {
    type Handle = TimerId;

    fn schedule(&self, delay: Duration, task: Task) -> TimerId {
        let mut state = self.state.borrow_mut();
        let id = state.next_id;
        state.next_id += 1;
        let deadline = state.now + delay;
        state.timers.insert((deadline, id), task);
        state.deadlines.insert(id, deadline);
        TimerId(id)
    }

    fn cancel(&self, handle: TimerId) {
        let mut state = self.state.borrow_mut();
        if let Some(deadline) = state.deadlines.remove(&handle.0) {
            state.timers.remove(&(deadline, handle.0));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ms(n: u64) -> Duration {
        Duration::from_millis(n)
    }

    fn counter() -> (Rc<Cell<u32>>, impl Fn() -> Task) {
        let count = Rc::new(Cell::new(0));
        let c = Rc::clone(&count);
        (count, move || {
            let c = Rc::clone(&c);
            Box::new(move || c.set(c.get() + 1)) as Task
        })
    }

    #[test]
    fn test_clock_fires_in_deadline_order() {
        let clock = VirtualClock::new();
        let log = Rc::new(RefCell::new(Vec::new()));
        for (delay, tag) in [(30, "c"), (10, "a"), (20, "b")] {
            let log = Rc::clone(&log);
            clock.schedule(ms(delay), Box::new(move || log.borrow_mut().push(tag)));
        }

        assert_eq!(clock.advance(ms(15)), 1);
        assert_eq!(clock.advance(ms(100)), 2);
        assert_eq!(*log.borrow(), vec!["a", "b", "c"]);
        assert_eq!(clock.now(), ms(115));
    }

    #[test]
    fn test_clock_cancel() {
        let clock = VirtualClock::new();
        let (count, task) = counter();
        let id = clock.schedule(ms(10), task());
        clock.cancel(id);
        clock.cancel(id);
        assert_eq!(clock.advance(ms(50)), 0);
        assert_eq!(count.get(), 0);
    }

    #[test]
    fn test_task_can_schedule_follow_up() {
        let clock = VirtualClock::new();
        let (count, task) = counter();
        let inner = clock.clone();
        let follow_up = task();
        clock.schedule(ms(10), Box::new(move || {
            inner.schedule(ms(10), follow_up);
        }));

        assert_eq!(clock.advance(ms(25)), 2);
        assert_eq!(count.get(), 1);
    }

    #[test]
    fn test_rearm_only_last_fires() {
        let clock = VirtualClock::new();
        let rearm = Rearm::new(clock.clone(), ms(200));
        let (count, task) = counter();

        rearm.arm(task());
        clock.advance(ms(150));
        rearm.arm(task());
        clock.advance(ms(150));
        rearm.arm(task());
        assert!(rearm.is_armed());
        assert_eq!(clock.pending(), 1);

        clock.advance(ms(199));
        assert_eq!(count.get(), 0);
        clock.advance(ms(1));
        assert_eq!(count.get(), 1);
        assert!(!rearm.is_armed());
    }

    #[test]
    fn test_rearm_cancel() {
        let clock = VirtualClock::new();
        let rearm = Rearm::new(clock.clone(), ms(100));
        let (count, task) = counter();
        rearm.arm(task());
        rearm.cancel();
        clock.advance(ms(500));
        assert_eq!(count.get(), 0);
        assert_eq!(clock.pending(), 0);
    }

    #[test]
    fn test_rearm_drop_cancels() {
        let clock = VirtualClock::new();
        let (count, task) = counter();
        {
            let rearm = Rearm::new(clock.clone(), ms(100));
            rearm.arm(task());
        }
        clock.advance(ms(500));
        assert_eq!(count.get(), 0);
    }
}
