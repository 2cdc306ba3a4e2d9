use crate::Time;
use serde::Deserialize;
use serde::Serialize;

/// A time point value with a total order, usable as a key.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Timepoint(Time);

impl Timepoint {
    pub fn value(self) -> Time {
        self.0
    }
}

impl From<Time> for Timepoint {
    fn from(t: Time) -> Self {
        // -0.0 and 0.0 are the same time point
        match t == 0. {
            true => Self(0.),
            false => Self(t),
        }
    }
}

impl From<Timepoint> for Time {
    fn from(t: Timepoint) -> Self {
        t.0
    }
}

impl PartialEq for Timepoint {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == std::cmp::Ordering::Equal
    }
}
impl Eq for Timepoint {}

impl PartialOrd for Timepoint {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}
impl Ord for Timepoint {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.0.total_cmp(&other.0)
    }
}

impl std::hash::Hash for Timepoint {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.0.to_bits().hash(state)
    }
}

impl std::fmt::Display for Timepoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}
