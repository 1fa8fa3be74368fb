//! Document clock: tracks real time at a rate, or stays frozen.

use crate::time::TimeInstant;

#[derive(Copy, Clone, Debug, PartialEq)]
pub enum ClockState {
    /// Frozen at `at`; used while paused and before the timeline starts.
    Broken { at: TimeInstant },
    /// Document time = `anchor_doc + (now - anchor_real) * rate`.
    Tracking {
        anchor_real: i64,
        anchor_doc: TimeInstant,
    },
}

#[derive(Clone, Debug)]
pub struct DocumentClock {
    state: ClockState,
    rate: f64,
    last_real: Option<i64>,
    /// Real-time delay the host was asked to wait before the next sample.
    expected_gap: i64,
}

impl DocumentClock {
    pub fn new(rate: f64) -> Self {
        Self {
            state: ClockState::Broken {
                at: TimeInstant::ZERO,
            },
            rate,
            last_real: None,
            expected_gap: 0,
        }
    }

    #[inline]
    pub fn state(&self) -> ClockState {
        self.state
    }

    #[inline]
    pub fn is_tracking(&self) -> bool {
        matches!(self.state, ClockState::Tracking { .. })
    }

    #[inline]
    pub fn rate(&self) -> f64 {
        self.rate
    }

    /// Document time at real time `now`.
    pub fn time_at(&self, now: i64) -> TimeInstant {
        match self.state {
            ClockState::Broken { at } => at,
            ClockState::Tracking {
                anchor_real,
                anchor_doc,
            } => {
                let elapsed = (now.saturating_sub(anchor_real)) as f64 * self.rate;
                anchor_doc + TimeInstant::from_ms(elapsed.round() as i64)
            }
        }
    }

    /// Start following real time from document time `from`.
    pub fn track(&mut self, now: i64, from: TimeInstant) {
        self.state = ClockState::Tracking {
            anchor_real: now,
            anchor_doc: from,
        };
        self.last_real = Some(now);
        self.expected_gap = 0;
    }

    /// Stop following real time; returns the frozen document time.
    pub fn freeze(&mut self, now: i64) -> TimeInstant {
        let at = self.time_at(now);
        self.state = ClockState::Broken { at };
        at
    }

    pub fn freeze_at(&mut self, at: TimeInstant) {
        self.state = ClockState::Broken { at };
    }

    /// Move the anchor to `doc` at `now` without changing the state.
    pub fn reanchor(&mut self, now: i64, doc: TimeInstant) {
        match self.state {
            ClockState::Broken { .. } => self.state = ClockState::Broken { at: doc },
            ClockState::Tracking { .. } => self.track(now, doc),
        }
    }

    /// Change the rate without a jump in document time.
    pub fn set_rate(&mut self, now: i64, rate: f64) {
        if self.is_tracking() {
            let doc = self.time_at(now);
            self.track(now, doc);
        }
        self.rate = rate;
    }

    pub fn expect_gap(&mut self, real_ms: i64) {
        self.expected_gap = real_ms.max(0);
    }

    /// Record a sample at `now`. When the gap since the previous sample exceeds
    /// the expected wait by more than `threshold`, re-anchor at `hold` and
    /// return the lag.
    pub fn sample(&mut self, now: i64, threshold: i64, hold: TimeInstant) -> Option<i64> {
        let lag = match (self.state, self.last_real) {
            (ClockState::Tracking { .. }, Some(last)) => {
                let gap = now.saturating_sub(last);
                (gap.saturating_sub(self.expected_gap) > threshold).then_some(gap)
            }
            _ => None,
        };
        if lag.is_some() {
            self.track(now, hold);
        }
        self.last_real = Some(now);
        lag
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tracking_scales_real_time() {
        let mut clock = DocumentClock::new(2.0);
        assert_eq!(clock.time_at(500), TimeInstant::ZERO);
        clock.track(100, TimeInstant::from_ms(1000));
        assert_eq!(clock.time_at(350), TimeInstant::from_ms(1500));
        assert_eq!(clock.freeze(400), TimeInstant::from_ms(1600));
        assert_eq!(clock.time_at(10_000), TimeInstant::from_ms(1600));
    }

    #[test]
    fn rate_change_keeps_document_time() {
        let mut clock = DocumentClock::new(1.0);
        clock.track(0, TimeInstant::ZERO);
        clock.set_rate(1000, 0.5);
        assert_eq!(clock.time_at(1000), TimeInstant::from_ms(1000));
        assert_eq!(clock.time_at(2000), TimeInstant::from_ms(1500));
    }

    #[test]
    fn lag_reanchors_at_held_time() {
        let mut clock = DocumentClock::new(1.0);
        clock.track(0, TimeInstant::ZERO);
        assert_eq!(clock.sample(16, 1000, TimeInstant::from_ms(16)), None);
        assert_eq!(clock.sample(5016, 1000, TimeInstant::from_ms(16)), Some(5000));
        assert_eq!(clock.time_at(5016), TimeInstant::from_ms(16));

        clock.expect_gap(3000);
        assert_eq!(clock.sample(8016, 1000, TimeInstant::from_ms(3016)), None);
    }
}
