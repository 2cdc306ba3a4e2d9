use super::stage::ProblemStage;
use super::timepoint::Timepoint;
use crate::Error;
use crate::Result;
use crate::Time;
use std::collections::BTreeMap;
use std::collections::VecDeque;

/// Insertion-ordered problems keyed by `(source, target)` time points.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProblemCollection {
    stages: Vec<ProblemStage>,
}

impl ProblemCollection {
    pub fn insert(&mut self, stage: ProblemStage) -> Result<()> {
        match self.position(stage.key()) {
            Some(_) => Err(Error::Value(format!(
                "problem ({}, {}) already exists",
                stage.source(),
                stage.target()
            ))),
            None => {
                self.stages.push(stage);
                Ok(())
            }
        }
    }
    pub fn len(&self) -> usize {
        self.stages.len()
    }
    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }
    pub fn keys(&self) -> impl Iterator<Item = (Timepoint, Timepoint)> + '_ {
        self.stages.iter().map(ProblemStage::key)
    }
    pub fn iter(&self) -> impl Iterator<Item = &ProblemStage> {
        self.stages.iter()
    }
    /// stages in insertion order. keys are fixed, only solutions may change.
    pub fn stages_mut(&mut self) -> &mut [ProblemStage] {
        &mut self.stages
    }
    pub fn get(&self, key: (Timepoint, Timepoint)) -> Option<&ProblemStage> {
        self.position(key).map(|i| &self.stages[i])
    }
    pub fn get_mut(&mut self, key: (Timepoint, Timepoint)) -> Option<&mut ProblemStage> {
        self.position(key).map(move |i| &mut self.stages[i])
    }

    /// Shortest forward chain of keys leading from `source` to `target`.
    ///
    /// A direct problem is its own chain, including a self pair `(t, t)`.
    /// Ties between equally short chains go to the earliest inserted keys.
    pub fn route(&self, source: Timepoint, target: Timepoint) -> Option<Vec<(Timepoint, Timepoint)>> {
        if self.position((source, target)).is_some() {
            return Some(vec![(source, target)]);
        }
        let mut parents = BTreeMap::<Timepoint, Timepoint>::new();
        let mut queue = VecDeque::from([source]);
        while let Some(node) = queue.pop_front() {
            if node == target {
                let mut path = Vec::new();
                let mut head = target;
                while let Some(&parent) = parents.get(&head) {
                    path.push((parent, head));
                    head = parent;
                }
                path.reverse();
                return Some(path).filter(|path| !path.is_empty());
            }
            let next = self
                .keys()
                .filter(|&(s, _)| s == node)
                .map(|(_, t)| t)
                .collect::<Vec<_>>();
            for t in next {
                if t != source && !parents.contains_key(&t) {
                    parents.insert(t, node);
                    queue.push_back(t);
                }
            }
        }
        None
    }

    fn position(&self, key: (Timepoint, Timepoint)) -> Option<usize> {
        self.stages.iter().position(|s| s.key() == key)
    }
}

impl std::ops::Index<(Time, Time)> for ProblemCollection {
    type Output = ProblemStage;
    fn index(&self, (source, target): (Time, Time)) -> &Self::Output {
        match self.get((Timepoint::from(source), Timepoint::from(target))) {
            Some(stage) => stage,
            None => panic!("no problem ({}, {})", source, target),
        }
    }
}

impl<'a> IntoIterator for &'a ProblemCollection {
    type Item = &'a ProblemStage;
    type IntoIter = std::slice::Iter<'a, ProblemStage>;
    fn into_iter(self) -> Self::IntoIter {
        self.stages.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::TaggedArray;
    use crate::transport::uniform;
    use crate::transport::Geometry;
    use ndarray::Array2;

    fn stage(s: Time, t: Time) -> ProblemStage {
        ProblemStage::new(
            (Timepoint::from(s), Timepoint::from(t)),
            (vec![0], vec![1]),
            Geometry::Precomputed(TaggedArray::cost(Array2::zeros((1, 1)))),
            (uniform(1), uniform(1)),
        )
        .unwrap()
    }
    fn collection() -> ProblemCollection {
        let mut problems = ProblemCollection::default();
        problems.insert(stage(0., 1.)).unwrap();
        problems.insert(stage(1., 2.)).unwrap();
        problems.insert(stage(2., 3.)).unwrap();
        problems
    }

    #[test]
    fn keys_keep_insertion_order() {
        let mut problems = collection();
        assert!(problems.insert(stage(1., 2.)).is_err());
        let keys = problems.keys().map(|(s, t)| (s.value(), t.value())).collect::<Vec<_>>();
        assert_eq!(keys, vec![(0., 1.), (1., 2.), (2., 3.)]);
        assert_eq!(problems[(1., 2.)].source().value(), 1.);
    }

    #[test]
    fn routes_chain_forward() {
        let mut problems = collection();
        let route = problems.route(Timepoint::from(0.), Timepoint::from(3.)).unwrap();
        assert_eq!(route.len(), 3);
        assert!(problems.route(Timepoint::from(3.), Timepoint::from(0.)).is_none());
        problems.insert(stage(0., 2.)).unwrap();
        let route = problems.route(Timepoint::from(0.), Timepoint::from(3.)).unwrap();
        assert_eq!(route.len(), 2);
        assert!(problems.route(Timepoint::from(1.), Timepoint::from(1.)).is_none());
    }

    #[test]
    fn self_pairs_route_to_themselves() {
        let mut problems = collection();
        problems.insert(stage(1., 1.)).unwrap();
        let route = problems.route(Timepoint::from(1.), Timepoint::from(1.)).unwrap();
        assert_eq!(route, vec![(Timepoint::from(1.), Timepoint::from(1.))]);
        let route = problems.route(Timepoint::from(1.), Timepoint::from(3.)).unwrap();
        assert_eq!(route.len(), 2);
    }
}
