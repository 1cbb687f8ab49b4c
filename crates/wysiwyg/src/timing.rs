//! Timer state machines for throttled and debounced work.
//!
//! Neither type owns a timer. Callers report calls with `call(now)` and
//! drive time with `poll(now)`; both return `true` when the wrapped work
//! should run at that moment. `next_deadline` tells a host loop how long it
//! may sleep.

use std::time::{Duration, Instant};

/// Runs at most once per `wait`: on the leading edge of a burst, and once
/// more on the trailing edge when calls arrived inside the window.
#[derive(Debug, Clone)]
pub struct Throttle {
    wait: Duration,
    leading: bool,
    trailing: bool,
    window_end: Option<Instant>,
    trailing_pending: bool,
}

impl Throttle {
    pub fn new(wait: Duration) -> Self {
        Self::with_edges(wait, true, true)
    }

    pub fn with_edges(wait: Duration, leading: bool, trailing: bool) -> Self {
        Self {
            wait,
            leading,
            trailing,
            window_end: None,
            trailing_pending: false,
        }
    }

    pub fn wait(&self) -> Duration {
        self.wait
    }

    pub fn call(&mut self, now: Instant) -> bool {
        if let Some(end) = self.window_end {
            if now < end {
                if self.trailing {
                    self.trailing_pending = true;
                }
                return false;
            }
        }

        // A trailing run that nobody polled for is folded into this call.
        let overdue = self.trailing_pending;
        self.window_end = Some(now + self.wait);
        if self.leading {
            self.trailing_pending = false;
            return true;
        }
        self.trailing_pending = self.trailing;
        overdue
    }

    pub fn poll(&mut self, now: Instant) -> bool {
        let Some(end) = self.window_end else {
            return false;
        };
        if now < end {
            return false;
        }
        if self.trailing_pending {
            self.trailing_pending = false;
            self.window_end = Some(now + self.wait);
            true
        } else {
            self.window_end = None;
            false
        }
    }

    pub fn is_pending(&self) -> bool {
        self.trailing_pending
    }

    pub fn next_deadline(&self) -> Option<Instant> {
        self.window_end.filter(|_| self.trailing_pending)
    }

    pub fn cancel(&mut self) {
        self.window_end = None;
        self.trailing_pending = false;
    }
}

/// Runs once calls have stopped for `wait`.
#[derive(Debug, Clone)]
pub struct Debounce {
    wait: Duration,
    leading: bool,
    trailing: bool,
    deadline: Option<Instant>,
    trailing_pending: bool,
}

impl Debounce {
    pub fn new(wait: Duration) -> Self {
        Self::with_edges(wait, false, true)
    }

    pub fn with_edges(wait: Duration, leading: bool, trailing: bool) -> Self {
        Self {
            wait,
            leading,
            trailing,
            deadline: None,
            trailing_pending: false,
        }
    }

    pub fn wait(&self) -> Duration {
        self.wait
    }

    pub fn call(&mut self, now: Instant) -> bool {
        let idle = self.deadline.is_none_or(|deadline| now >= deadline);
        let overdue = idle && self.trailing_pending;
        self.deadline = Some(now + self.wait);

        if idle && self.leading {
            self.trailing_pending = false;
            return true;
        }
        self.trailing_pending = self.trailing;
        overdue
    }

    pub fn poll(&mut self, now: Instant) -> bool {
        match self.deadline {
            Some(deadline) if now >= deadline => {
                self.deadline = None;
                std::mem::take(&mut self.trailing_pending)
            }
            _ => false,
        }
    }

    pub fn is_pending(&self) -> bool {
        self.trailing_pending
    }

    pub fn next_deadline(&self) -> Option<Instant> {
        self.deadline.filter(|_| self.trailing_pending)
    }

    pub fn cancel(&mut self) {
        self.deadline = None;
        self.trailing_pending = false;
    }
}
