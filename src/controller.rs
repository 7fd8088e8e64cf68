use crate::approach::{Approach, ApproachBoard, ApproachState, ApproachStats, APPROACHES};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Instant;

/// The hold times which govern when the green approach may change.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SignalTiming {
    /// The minimum time an approach holds green before a queue-driven change, in s.
    pub min_green_seconds: f64,
    /// The time after which a green approach is rotated away, in s.
    pub max_green_seconds: f64,
    /// The minimum time since the last change before an emergency preemption, in s.
    pub emergency_preempt_seconds: f64,
}

impl Default for SignalTiming {
    fn default() -> Self {
        Self {
            min_green_seconds: 5.0,
            max_green_seconds: 45.0,
            emergency_preempt_seconds: 2.0,
        }
    }
}

/// The outcome of one decision cycle.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Decision {
    /// Nothing was allowed to change this cycle.
    Hold,
    /// The current green was re-evaluated and kept.
    Keep,
    /// Green was handed to an emergency-flagged approach.
    Preempt(Approach),
    /// Green was handed to the approach with the largest queue.
    Switch(Approach),
    /// Green was rotated away after overstaying.
    Rotate(Approach),
}

/// A point-in-time view of the controller.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ControllerSnapshot {
    pub current_green: Approach,
    pub since_seconds: f64,
    pub state: BTreeMap<Approach, ApproachState>,
}

impl ControllerSnapshot {
    /// The snapshot with `since_seconds` rounded to a tenth of a second, for reporting.
    pub fn report(mut self) -> Self {
        self.since_seconds = (self.since_seconds * 10.0).round() / 10.0;
        self
    }
}

/// A timed priority state machine which decides which approach holds green.
#[derive(Clone, Debug)]
pub struct SignalController {
    /// The hold times.
    timing: SignalTiming,
    /// The observed state of each approach.
    board: ApproachBoard,
    /// The approach which currently holds green.
    current_green: Approach,
    /// When the green approach last changed.
    last_change: Instant,
}

impl Default for SignalController {
    fn default() -> Self {
        Self::new()
    }
}

impl SignalController {
    /// Creates a controller with default timing, giving green to North.
    pub fn new() -> Self {
        Self::with_timing_at(SignalTiming::default(), Instant::now())
    }

    /// Creates a controller whose green phase for North starts at `now`.
    pub fn with_timing_at(timing: SignalTiming, now: Instant) -> Self {
        Self {
            timing,
            board: ApproachBoard::default(),
            current_green: Approach::N,
            last_change: now,
        }
    }

    /// The approach which currently holds green.
    pub fn current_green(&self) -> Approach {
        self.current_green
    }

    /// The observed state of each approach.
    pub fn board(&self) -> &ApproachBoard {
        &self.board
    }

    /// Merges new demand into the approach board and runs one decision cycle.
    pub fn update_demands<I>(&mut self, stats: I) -> Decision
    where
        I: IntoIterator<Item = (Approach, ApproachStats)>,
    {
        self.update_demands_at(stats, Instant::now())
    }

    /// Like [Self::update_demands], with the decision taken at `now`.
    pub fn update_demands_at<I>(&mut self, stats: I, now: Instant) -> Decision
    where
        I: IntoIterator<Item = (Approach, ApproachStats)>,
    {
        for (approach, stats) in stats {
            self.board.merge(approach, &stats);
        }
        self.decide(now)
    }

    /// Like [Self::update_demands_at], keyed by approach name.
    /// Entries whose key does not name an approach are ignored.
    pub fn update_named_demands_at<'a, I>(&mut self, stats: I, now: Instant) -> Decision
    where
        I: IntoIterator<Item = (&'a str, ApproachStats)>,
    {
        let parsed = stats
            .into_iter()
            .filter_map(|(name, stats)| match name.parse::<Approach>() {
                Ok(approach) => Some((approach, stats)),
                Err(err) => {
                    log::debug!("ignoring demand update: {}", err);
                    None
                }
            })
            .collect::<Vec<_>>();
        self.update_demands_at(parsed, now)
    }

    /// Takes a snapshot of the controller.
    pub fn snapshot(&self) -> ControllerSnapshot {
        self.snapshot_at(Instant::now())
    }

    /// Takes a snapshot of the controller as seen at `now`.
    pub fn snapshot_at(&self, now: Instant) -> ControllerSnapshot {
        ControllerSnapshot {
            current_green: self.current_green,
            since_seconds: self.elapsed(now),
            state: self.board.iter().map(|(a, s)| (a, *s)).collect(),
        }
    }

    /// Seconds since the green approach last changed.
    fn elapsed(&self, now: Instant) -> f64 {
        now.saturating_duration_since(self.last_change).as_secs_f64()
    }

    /// Runs one decision cycle.
    fn decide(&mut self, now: Instant) -> Decision {
        let elapsed = self.elapsed(now);

        // Only the first flagged approach is considered; the rest wait for later cycles.
        if let Some(flagged) = APPROACHES.into_iter().find(|a| self.board[*a].has_emergency) {
            if flagged != self.current_green && elapsed >= self.timing.emergency_preempt_seconds {
                self.switch_to(flagged, now);
                return Decision::Preempt(flagged);
            }
            return Decision::Hold;
        }

        if elapsed < self.timing.min_green_seconds {
            return Decision::Hold;
        }

        for approach in APPROACHES {
            let state = &mut self.board[approach];
            state.score = state.queue;
        }

        // Strict comparison keeps the earliest approach on ties.
        let best = APPROACHES
            .into_iter()
            .reduce(|best, a| {
                if self.board[a].score > self.board[best].score {
                    a
                } else {
                    best
                }
            })
            .unwrap_or(self.current_green);

        if best != self.current_green {
            self.switch_to(best, now);
            Decision::Switch(best)
        } else if elapsed > self.timing.max_green_seconds {
            let next = self.current_green.next();
            self.switch_to(next, now);
            Decision::Rotate(next)
        } else {
            Decision::Keep
        }
    }

    fn switch_to(&mut self, approach: Approach, now: Instant) {
        log::debug!("green {} -> {}", self.current_green, approach);
        self.current_green = approach;
        self.last_change = now;
    }
}
