use super::timepoint::Timepoint;
use crate::Error;
use crate::Result;
use crate::Time;
use serde::Deserialize;
use serde::Serialize;
use std::collections::BTreeSet;

/// Rule deciding which pairs of time points get their own transport problem.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Policy {
    /// consecutive time points
    #[default]
    Sequential,
    /// caller-supplied pairs, in caller order
    Explicit(Vec<(Time, Time)>),
    /// every earlier time point to every later one
    Triu,
    /// every other time point to one reference
    Star(Time),
}

impl Policy {
    /// Pairs over the sorted, distinct observed time points.
    pub fn pairs(&self, times: &[Timepoint]) -> Result<Vec<(Timepoint, Timepoint)>> {
        debug_assert!(times.windows(2).all(|w| w[0] < w[1]));
        match self {
            Self::Sequential => Ok(times.windows(2).map(|w| (w[0], w[1])).collect()),
            Self::Triu => Ok(times
                .iter()
                .enumerate()
                .flat_map(|(i, &s)| times[i + 1..].iter().map(move |&t| (s, t)))
                .collect()),
            Self::Star(reference) => {
                let reference = Self::observed(times, *reference)?;
                Ok(times
                    .iter()
                    .copied()
                    .filter(|&t| t != reference)
                    .map(|t| (t, reference))
                    .collect())
            }
            Self::Explicit(pairs) => {
                let mut seen = BTreeSet::new();
                pairs
                    .iter()
                    .map(|&(s, t)| -> Result<(Timepoint, Timepoint)> {
                        Ok((Self::observed(times, s)?, Self::observed(times, t)?))
                    })
                    .map(|pair| match pair {
                        Ok(pair) if !seen.insert(pair) => Err(Error::Value(format!(
                            "duplicate pair ({}, {})",
                            pair.0, pair.1
                        ))),
                        pair => pair,
                    })
                    .collect()
            }
        }
    }

    fn observed(times: &[Timepoint], t: Time) -> Result<Timepoint> {
        let t = Timepoint::from(t);
        match times.binary_search(&t) {
            Ok(_) => Ok(t),
            Err(_) => Err(Error::Key(format!("time point {} is not observed", t))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn times() -> Vec<Timepoint> {
        [0., 1., 2.].into_iter().map(Timepoint::from).collect()
    }
    fn values(pairs: Vec<(Timepoint, Timepoint)>) -> Vec<(Time, Time)> {
        pairs.into_iter().map(|(s, t)| (s.value(), t.value())).collect()
    }

    #[test]
    fn generated_pairs() {
        let times = times();
        assert_eq!(values(Policy::Sequential.pairs(&times).unwrap()), vec![(0., 1.), (1., 2.)]);
        assert_eq!(
            values(Policy::Triu.pairs(&times).unwrap()),
            vec![(0., 1.), (0., 2.), (1., 2.)]
        );
        assert_eq!(values(Policy::Star(1.).pairs(&times).unwrap()), vec![(0., 1.), (2., 1.)]);
    }

    #[test]
    fn explicit_pairs_are_validated() {
        let times = times();
        let order = Policy::Explicit(vec![(1., 2.), (0., 2.)]).pairs(&times).unwrap();
        assert_eq!(values(order), vec![(1., 2.), (0., 2.)]);
        let missing = Policy::Explicit(vec![(0., 3.)]).pairs(&times);
        assert!(matches!(missing, Err(Error::Key(_))));
        let duplicate = Policy::Explicit(vec![(0., 1.), (0., 1.)]).pairs(&times);
        assert!(matches!(duplicate, Err(Error::Value(_))));
    }
}
