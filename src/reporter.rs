use std::{time::{Duration, Instant}, fmt};

use anyhow::Result;
use time::{OffsetDateTime, macros::format_description};

use crate::{stati::Stati, util::{period_call::{PeriodCall, PeriodCallGuard, period_call}, period_rate::RateEstimator}};

pub const REPORT_INTERVAL: Duration = Duration::from_secs(1);


/// One throughput line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Sample {
    pub time: OffsetDateTime,
    pub conns: i64,
    pub requests: i64,
    pub rps: i64,
}

impl Sample {
    /// ISO-8601 in UTC with 100ns precision, e.g. 2026-10-18T08:30:05.1234567Z
    pub fn timestamp(&self) -> Result<String, time::error::Format> {
        self.time
        .to_offset(time::UtcOffset::UTC)
        .format(format_description!("[year]-[month]-[day]T[hour]:[minute]:[second].[subsecond digits:7]Z"))
    }
}

impl fmt::Display for Sample {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let ts = self.timestamp().map_err(|_e| fmt::Error)?;
        write!(f, "{}\tConnections\t{}\tRequests\t{}\tRPS\t{}", ts, self.conns, self.requests, self.rps)
    }
}


pub struct PeriodReport<S, F>
where
    S: AsRef<Stati>,
{
    estimator: RateEstimator<i64>,
    stati: S,
    func: F,
}

impl<S, F> PeriodReport<S, F>
where
    S: AsRef<Stati>,
    F: FnMut(&Sample),
{
    pub fn new(stati: S, func: F) -> Self {
        Self::with_interval(stati, REPORT_INTERVAL, func)
    }

    pub fn with_interval(stati: S, interval: Duration, func: F) -> Self {
        Self {
            estimator: RateEstimator::starting_at(stati.as_ref().start_time(), interval, 0),
            stati,
            func,
        }
    }
}

impl<S, F> PeriodCall for PeriodReport<S, F>
where
    S: AsRef<Stati>,
    F: FnMut(&Sample),
{
    fn next(&mut self) -> Duration {
        let now = Instant::now();
        let next = self.estimator.next_time();
        if now < next {
            next - now
        } else {
            Duration::ZERO
        }
    }

    fn call(&mut self, completed: bool) {
        if completed {
            return;
        }

        let stati = self.stati.as_ref();
        if let Some(rps) = self.estimator.estimate(Instant::now(), stati) {
            let sample = Sample {
                time: OffsetDateTime::now_utc(),
                conns: stati.conns(),
                requests: *self.estimator.last(),
                rps,
            };
            (self.func)(&sample);
        }
    }
}

/// Calls `func` with a new sample every second until the guard is dropped.
pub fn period_report<S, F>(stati: S, func: F) -> Result<PeriodCallGuard>
where
    S: AsRef<Stati> + Send + 'static,
    F: FnMut(&Sample) + Send + 'static,
{
    period_call("reporter", PeriodReport::new(stati, func))
}
