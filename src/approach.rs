use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{Index, IndexMut};
use std::str::FromStr;

/// The fixed evaluation order used for every scan and tie-break.
pub const APPROACHES: [Approach; 4] = [Approach::N, Approach::S, Approach::E, Approach::W];

/// One of the four approaches feeding the intersection.
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub enum Approach {
    #[default]
    N,
    S,
    E,
    W,
}

impl Approach {
    /// The position of the approach in [APPROACHES].
    pub const fn index(self) -> usize {
        match self {
            Approach::N => 0,
            Approach::S => 1,
            Approach::E => 2,
            Approach::W => 3,
        }
    }

    /// The next approach in cyclic order (N -> S -> E -> W -> N).
    pub const fn next(self) -> Self {
        APPROACHES[(self.index() + 1) % APPROACHES.len()]
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Approach::N => "N",
            Approach::S => "S",
            Approach::E => "E",
            Approach::W => "W",
        }
    }
}

impl fmt::Display for Approach {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Returned when a string does not name an approach.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
#[error("unknown approach `{0}`")]
pub struct UnknownApproach(pub String);

impl FromStr for Approach {
    type Err = UnknownApproach;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "N" => Ok(Approach::N),
            "S" => Ok(Approach::S),
            "E" => Ok(Approach::E),
            "W" => Ok(Approach::W),
            other => Err(UnknownApproach(other.to_owned())),
        }
    }
}

/// The observed state of a single approach.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ApproachState {
    /// The estimated number of queued vehicles.
    pub queue: f64,
    /// Whether an emergency vehicle was last reported on this approach.
    pub has_emergency: bool,
    /// The priority score computed by the last full decision.
    pub score: f64,
}

/// A partial update for one approach. Absent fields keep their prior value.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ApproachStats {
    #[serde(default)]
    pub queue: Option<f64>,
    #[serde(default)]
    pub has_emergency: Option<bool>,
}

impl ApproachStats {
    pub fn new(queue: f64, has_emergency: bool) -> Self {
        Self {
            queue: Some(queue),
            has_emergency: Some(has_emergency),
        }
    }
}

/// The state of all four approaches, indexed by [Approach].
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct ApproachBoard {
    states: [ApproachState; 4],
}

impl ApproachBoard {
    /// Merges a partial update into the state of one approach.
    pub(crate) fn merge(&mut self, approach: Approach, stats: &ApproachStats) {
        let state = &mut self[approach];
        if let Some(queue) = stats.queue {
            state.queue = f64::max(queue, 0.0);
        }
        if let Some(has_emergency) = stats.has_emergency {
            state.has_emergency = has_emergency;
        }
    }

    /// Iterates over the approaches in evaluation order.
    pub fn iter(&self) -> impl Iterator<Item = (Approach, &ApproachState)> + '_ {
        APPROACHES.iter().map(move |a| (*a, &self.states[a.index()]))
    }
}

impl Index<Approach> for ApproachBoard {
    type Output = ApproachState;

    fn index(&self, approach: Approach) -> &ApproachState {
        &self.states[approach.index()]
    }
}

impl IndexMut<Approach> for ApproachBoard {
    fn index_mut(&mut self, approach: Approach) -> &mut ApproachState {
        &mut self.states[approach.index()]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rotation_is_cyclic() {
        assert_eq!(Approach::N.next(), Approach::S);
        assert_eq!(Approach::S.next(), Approach::E);
        assert_eq!(Approach::E.next(), Approach::W);
        assert_eq!(Approach::W.next(), Approach::N);
    }

    #[test]
    fn parses_names() {
        assert_eq!("E".parse::<Approach>(), Ok(Approach::E));
        assert!("NE".parse::<Approach>().is_err());
    }

    #[test]
    fn merge_keeps_absent_fields() {
        let mut board = ApproachBoard::default();
        board.merge(Approach::S, &ApproachStats::new(3.0, true));
        board.merge(
            Approach::S,
            &ApproachStats {
                queue: Some(7.5),
                has_emergency: None,
            },
        );
        assert_eq!(board[Approach::S].queue, 7.5);
        assert!(board[Approach::S].has_emergency);
        assert_eq!(board[Approach::N], ApproachState::default());
    }
}
