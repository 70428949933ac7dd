use std::{sync::atomic::{AtomicI64, Ordering}, time::Instant};

use crate::util::period_rate::GetRateState;

const ORDERING: Ordering = Ordering::Relaxed;

/// Counters shared by every connection worker and the reporter.
#[derive(Debug)]
pub struct Stati {
    conns: AtomicI64,
    requests: AtomicI64,
    start_time: Instant,
}

impl Default for Stati {
    fn default() -> Self {
        Self::new()
    }
}

impl Stati {
    pub fn new() -> Self {
        Self {
            conns: AtomicI64::new(0),
            requests: AtomicI64::new(0),
            start_time: Instant::now(),
        }
    }

    /// active connections
    pub fn conns(&self) -> i64 {
        self.conns.load(ORDERING)
    }

    /// completed round-trips
    pub fn requests(&self) -> i64 {
        self.requests.load(ORDERING)
    }

    pub fn start_time(&self) -> Instant {
        self.start_time
    }

    pub fn inc_requests(&self) {
        self.requests.fetch_add(1, ORDERING);
    }

    /// Counts one active connection until the guard is dropped.
    pub fn conn_guard(&self) -> ConnGuard<'_> {
        self.conns.fetch_add(1, ORDERING);
        ConnGuard { stati: self }
    }
}

impl GetRateState for Stati {
    type Output = i64;
    fn get_rate_state(&self) -> Self::Output {
        self.requests()
    }
}

#[derive(Debug)]
pub struct ConnGuard<'a> {
    stati: &'a Stati,
}

impl<'a> Drop for ConnGuard<'a> {
    fn drop(&mut self) {
        self.stati.conns.fetch_sub(1, ORDERING);
    }
}
