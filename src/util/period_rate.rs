use std::time::{Instant, Duration};


pub trait CalcRate {
    type Delta;
    type Rate;
    fn calc_rate(&self, delta: &Self::Delta, duration: Duration) -> Self::Rate ;
    fn calc_delta_only(&self, new_state: &Self) -> Self::Delta ;
}

pub trait GetRateState {
    type Output: CalcRate;
    fn get_rate_state(&self) -> Self::Output;
}


/// Samples a state once per interval and derives the rate between two samples.
pub struct RateEstimator<R> {
    next_time: Instant,
    interval: Duration,
    last: R,
}

impl<R> RateEstimator<R> {

    /// the first rate is measured from `start` instead of now
    pub fn starting_at(start: Instant, interval: Duration, last: R) -> Self {
        Self {
            next_time: start + interval,
            interval,
            last,
        }
    }

    pub fn next_time(&self) -> Instant {
        self.next_time
    }

    /// state captured by the last successful estimate
    pub fn last(&self) -> &R {
        &self.last
    }

    fn reset(&mut self, now: Instant) {
        self.next_time = now + self.interval;
    }
}

impl<R> RateEstimator<R>
where
    R: CalcRate,
{
    pub fn estimate<G>(&mut self, now: Instant, new_value: &G) -> Option<R::Rate>
    where
        G: GetRateState<Output = R>
    {
        self.estimate2(now, new_value).1
    }

    pub fn estimate2<G>(&mut self, now: Instant, new_value: &G) -> (R::Delta, Option<R::Rate>)
    where
        G: GetRateState<Output = R>
    {
        let new_state = new_value.get_rate_state();

        let delta = self.last.calc_delta_only(&new_state);

        let rate = if now < self.next_time {
            None

        } else {
            // elapsed since the last sample
            let d = now - self.next_time + self.interval;
            let rate = self.last.calc_rate(&delta, d);

            self.last = new_state;
            self.reset(now);

            Some(rate)
        };

        return (delta, rate);
    }
}


impl CalcRate for i64 {
    type Rate = i64;
    type Delta = i64;

    /// rounded to the nearest integer, ties to even
    fn calc_rate(&self, delta: &Self::Delta, duration: Duration) -> Self::Rate {
        let secs = duration.as_secs_f64();
        if secs > 0.0 {
            (*delta as f64 / secs).round_ties_even() as i64
        } else {
            0
        }
    }

    fn calc_delta_only(&self, new_state: &Self) -> Self::Delta  {
        *new_state - *self
    }
}

impl GetRateState for i64 {
    type Output = i64;
    fn get_rate_state(&self) -> Self::Output {
        *self
    }
}
