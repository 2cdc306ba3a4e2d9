use super::collection::ProblemCollection;
use super::policy::Policy;
use super::stage::ProblemStage;
use super::timepoint::Timepoint;
use crate::data::AnnData;
use crate::data::Column;
use crate::data::DataPointer;
use crate::data::Dataset;
use crate::data::LossRegistry;
use crate::data::Pca;
use crate::data::Tag;
use crate::data::TaggedArray;
use crate::transport::density;
use crate::transport::Geometry;
use crate::transport::ScaleCost;
use crate::transport::SinkhornSolver;
use crate::transport::Solution;
use crate::transport::Solver;
use crate::transport::SolverConfig;
use crate::Error;
use crate::Mass;
use crate::Result;
use crate::Time;
use ndarray::Array1;
use ndarray::Array2;
use ndarray::Axis;
use serde::Deserialize;
use serde::Serialize;
use std::collections::BTreeMap;

/// Feature transforms applied jointly to each pair of time slices.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Callback {
    /// project both slices onto their top shared principal components
    LocalPca { n_comps: usize },
}

/// How problems are built from the dataset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PrepareConfig {
    /// numeric `obs` column holding each cell's time point
    pub time_key: String,
    pub policy: Policy,
    /// features or costs shared by every problem
    pub joint_attr: DataPointer,
    pub callback: Option<Callback>,
    /// numeric `obs` column of prior cell weights, uniform when absent
    pub marginals: Option<String>,
    /// cost normalization used whenever the solver config leaves it at unit
    pub scale_cost: ScaleCost,
}

impl Default for PrepareConfig {
    fn default() -> Self {
        Self {
            time_key: "time".to_string(),
            policy: Policy::default(),
            joint_attr: DataPointer::new("obsm", Some("X_pca")),
            callback: None,
            marginals: None,
            scale_cost: ScaleCost::default(),
        }
    }
}

impl PrepareConfig {
    pub fn new(time_key: &str) -> Self {
        Self {
            time_key: time_key.to_string(),
            ..Self::default()
        }
    }
    pub fn with_policy(self, policy: Policy) -> Self {
        Self { policy, ..self }
    }
    pub fn with_joint_attr(self, joint_attr: DataPointer) -> Self {
        Self { joint_attr, ..self }
    }
    pub fn with_callback(self, callback: Callback) -> Self {
        Self {
            callback: Some(callback),
            ..self
        }
    }
    pub fn with_marginals(self, key: &str) -> Self {
        Self {
            marginals: Some(key.to_string()),
            ..self
        }
    }
    pub fn with_scale_cost(self, scale_cost: ScaleCost) -> Self {
        Self { scale_cost, ..self }
    }
}

/// A dense transport plan between two time slices, possibly composed over several hops.
#[derive(Debug, Clone, PartialEq)]
pub struct TransportMap {
    pub source_cells: Vec<usize>,
    pub target_cells: Vec<usize>,
    pub plan: Array2<Mass>,
}

/// Features of three time slices and the growth of the earliest.
#[derive(Debug, Clone, PartialEq)]
pub struct InterpolationData {
    pub source: Array2<f64>,
    pub intermediate: Array2<f64>,
    pub target: Array2<f64>,
    pub growth: Array1<Mass>,
}

/// Shared state and helpers behind every temporal analysis.
///
/// Implementors expose their dataset, solved problems, the cells of each
/// time point and the joint features. Everything else composes from those.
pub trait Temporal {
    fn dataset(&self) -> &dyn Dataset;
    fn problems(&self) -> &ProblemCollection;
    /// dataset rows observed at `time`
    fn cells(&self, time: Time) -> Result<&[usize]>;
    /// joint features as a point cloud over every cell
    fn features(&self) -> Result<TaggedArray>;

    fn stage(&self, source: Time, target: Time) -> Result<&ProblemStage> {
        self.problems()
            .get((Timepoint::from(source), Timepoint::from(target)))
            .ok_or_else(|| Error::Key(format!("no problem ({}, {})", source, target)))
    }
    /// chain of problem keys leading from `source` to `target`
    fn route(&self, source: Time, target: Time) -> Result<Vec<(Timepoint, Timepoint)>> {
        self.problems()
            .route(Timepoint::from(source), Timepoint::from(target))
            .ok_or_else(|| {
                Error::Key(format!(
                    "no chain of problems leads from {} to {}",
                    source, target
                ))
            })
    }

    /// Coupling from `source` to `target`.
    ///
    /// A direct problem is read as is. Otherwise the forward chain is composed
    /// hop by hop, renormalizing the rows of every hop after the first, so the
    /// result keeps the first hop's row sums.
    fn transport_map(&self, source: Time, target: Time) -> Result<TransportMap> {
        let route = self.route(source, target)?;
        let mut hops = route
            .iter()
            .map(|&(s, t)| self.stage(s.value(), t.value()));
        let first = hops
            .next()
            .ok_or_else(|| Error::Key(format!("no problem ({}, {})", source, target)))??;
        let mut plan = first.solution()?.coupling().clone();
        let mut last = first;
        for hop in hops {
            let hop = hop?;
            plan = plan.dot(&rownorm(hop.solution()?.coupling()));
            last = hop;
        }
        if route.len() > 1 {
            log::debug!("{:<32}{:<32}", "composed transport hops", route.len());
        }
        Ok(TransportMap {
            source_cells: first.source_cells().to_vec(),
            target_cells: last.target_cells().to_vec(),
            plan,
        })
    }

    /// growth rates of `source` cells, read off the first problem towards `target`
    fn growth_rates(&self, source: Time, target: Time, posterior: bool) -> Result<Array1<Mass>> {
        let (s, t) = self.route(source, target)?[0];
        self.stage(s.value(), t.value())?.growth_rates(posterior)
    }

    /// Fractional position of `intermediate` between `start` and `end`.
    ///
    /// A supplied parameter wins over the computed one but must lie in `[0, 1]`.
    fn get_interp_param(
        &self,
        start: Time,
        intermediate: Time,
        end: Time,
        parameter: Option<f64>,
    ) -> Result<f64> {
        if intermediate <= start || end <= intermediate {
            return Err(Error::Value(format!(
                "expected {} < {} < {}",
                start, intermediate, end
            )));
        }
        match parameter {
            Some(t) if !(0. ..=1.).contains(&t) => Err(Error::Value(format!(
                "interpolation parameter {} is outside [0, 1]",
                t
            ))),
            Some(t) => Ok(t),
            None => Ok((intermediate - start) / (end - start)),
        }
    }

    /// joint features of the cells at `time`
    fn slice(&self, time: Time) -> Result<Array2<f64>> {
        let features = self.features()?;
        Ok(features.rows(self.cells(time)?).values().clone())
    }

    /// features at three time points plus the growth of source cells towards `target`
    fn get_data(
        &self,
        source: Time,
        intermediate: Time,
        target: Time,
        posterior: bool,
    ) -> Result<InterpolationData> {
        let features = self.features()?;
        let rows = |t: Time| -> Result<Array2<f64>> {
            Ok(features.rows(self.cells(t)?).values().clone())
        };
        Ok(InterpolationData {
            source: rows(source)?,
            intermediate: rows(intermediate)?,
            target: rows(target)?,
            growth: self.growth_rates(source, target, posterior)?,
        })
    }
}

/// each row rescaled to unit mass. massless rows stay zero.
pub fn rownorm(plan: &Array2<Mass>) -> Array2<Mass> {
    let sums = plan.sum_axis(Axis(1));
    let mut normed = plan.clone();
    normed
        .rows_mut()
        .into_iter()
        .zip(sums.iter())
        .filter(|(_, sum)| **sum > 0.)
        .for_each(|(mut row, sum)| row /= *sum);
    normed
}

/// Temporal optimal transport over one annotated dataset.
#[derive(Debug, Clone)]
pub struct TemporalProblem {
    adata: AnnData,
    registry: LossRegistry,
    problems: ProblemCollection,
    slices: BTreeMap<Timepoint, Vec<usize>>,
    config: Option<PrepareConfig>,
}

impl TemporalProblem {
    pub fn new(adata: AnnData) -> Self {
        Self {
            adata,
            registry: LossRegistry::default(),
            problems: ProblemCollection::default(),
            slices: BTreeMap::new(),
            config: None,
        }
    }
    pub fn with_registry(self, registry: LossRegistry) -> Self {
        Self { registry, ..self }
    }
    pub fn adata(&self) -> &AnnData {
        &self.adata
    }
    pub fn registry(&self) -> &LossRegistry {
        &self.registry
    }
    pub fn config(&self) -> Option<&PrepareConfig> {
        self.config.as_ref()
    }
    pub fn get(&self, key: (Time, Time)) -> Option<&ProblemStage> {
        self.problems.get((Timepoint::from(key.0), Timepoint::from(key.1)))
    }

    /// Build one fresh problem per time pair the policy generates.
    ///
    /// Any previously prepared problems are discarded.
    pub fn prepare(&mut self, config: PrepareConfig) -> Result<&mut Self> {
        let times = self.times(&config.time_key)?;
        let mut slices = BTreeMap::<Timepoint, Vec<usize>>::new();
        times
            .iter()
            .enumerate()
            .for_each(|(i, &t)| slices.entry(Timepoint::from(t)).or_default().push(i));
        let observed = slices.keys().copied().collect::<Vec<_>>();
        let pairs = config.policy.pairs(&observed)?;
        if pairs.is_empty() {
            return Err(Error::Value(format!(
                "policy {:?} generates no problems over {} time points",
                config.policy,
                observed.len()
            )));
        }
        let weights = self.weights(config.marginals.as_deref())?;
        let joint = config.joint_attr.create(&self.adata, &self.registry)?;
        let n = self.adata.n_obs();
        match (joint.is_point_cloud(), joint.shape()) {
            (true, (rows, _)) if rows == n => {}
            (false, shape) if shape == (n, n) => {}
            (_, shape) => {
                return Err(Error::Value(format!(
                    "joint attribute of shape {:?} does not fit {} cells",
                    shape, n
                )));
            }
        }
        let mut problems = ProblemCollection::default();
        for (source, target) in pairs {
            let ref source_cells = slices[&source];
            let ref target_cells = slices[&target];
            let geometry = Self::geometry(&joint, config.callback, source_cells, target_cells)?;
            let a = Self::marginal(&weights, source_cells)?;
            let b = Self::marginal(&weights, target_cells)?;
            problems.insert(ProblemStage::new(
                (source, target),
                (source_cells.clone(), target_cells.clone()),
                geometry,
                (a, b),
            )?)?;
        }
        log::info!("{:<32}{:<32}", "prepared problems", problems.len());
        self.problems = problems;
        self.slices = slices;
        self.config = Some(config);
        Ok(self)
    }

    /// Solve every problem with the default entropic solver.
    ///
    /// The cost scaling chosen at prepare time applies unless `config` names its own.
    pub fn solve(&mut self, config: SolverConfig) -> Result<&mut Self> {
        let scale_cost = match (config.scale_cost, self.config.as_ref()) {
            (ScaleCost::Unit, Some(prepared)) => prepared.scale_cost,
            (scale_cost, _) => scale_cost,
        };
        let solver = SinkhornSolver::from(SolverConfig { scale_cost, ..config });
        self.solve_with(&solver)
    }

    /// Solve every problem with any solver. Problems are independent and solved in parallel.
    pub fn solve_with(&mut self, solver: &impl Solver) -> Result<&mut Self> {
        if self.problems.is_empty() {
            return Err(Error::Value("no problems have been prepared".into()));
        }
        #[cfg(feature = "parallel")]
        use rayon::prelude::*;
        #[cfg(feature = "parallel")]
        let results = self
            .problems
            .stages_mut()
            .par_iter_mut()
            .map(|stage| stage.solve(solver))
            .collect::<Vec<Result<()>>>();
        #[cfg(not(feature = "parallel"))]
        let results = self
            .problems
            .stages_mut()
            .iter_mut()
            .map(|stage| stage.solve(solver))
            .collect::<Vec<Result<()>>>();
        results.into_iter().collect::<Result<Vec<()>>>()?;
        log::info!("{:<32}{:<32}", "solved problems", self.problems.len());
        Ok(self)
    }

    /// Store a solution for one problem without invoking any solver.
    pub fn inject_solution(&mut self, key: (Time, Time), solution: impl Into<Solution>) -> Result<()> {
        self.problems
            .get_mut((Timepoint::from(key.0), Timepoint::from(key.1)))
            .ok_or_else(|| Error::Key(format!("no problem ({}, {})", key.0, key.1)))?
            .inject(solution.into())
    }

    fn times(&self, key: &str) -> Result<Vec<Time>> {
        let column = self.adata.column(key).map_err(|_| {
            Error::Key(format!("Unable to find temporal key `adata.obs['{}']`", key))
        })?;
        let times = column.numeric().ok_or_else(|| {
            Error::Type(format!(
                "Expected `adata.obs['{}']` to be numeric, found categorical",
                key
            ))
        })?;
        match times.iter().find(|t| !t.is_finite()) {
            Some(t) => Err(Error::Value(format!(
                "`adata.obs['{}']` holds non-finite time {}",
                key, t
            ))),
            None => Ok(times.to_vec()),
        }
    }
    fn weights(&self, key: Option<&str>) -> Result<Array1<Mass>> {
        match key {
            None => Ok(Array1::ones(self.adata.n_obs())),
            Some(key) => match self.adata.column(key)? {
                Column::Numeric(values) if values.iter().all(|w| *w >= 0. && w.is_finite()) => {
                    Ok(Array1::from(values.clone()))
                }
                Column::Numeric(_) => Err(Error::Value(format!(
                    "`adata.obs['{}']` must hold nonnegative finite weights",
                    key
                ))),
                Column::Categorical { .. } => Err(Error::Type(format!(
                    "Expected `adata.obs['{}']` to be numeric, found categorical",
                    key
                ))),
            },
        }
    }
    fn marginal(weights: &Array1<Mass>, cells: &[usize]) -> Result<Array1<Mass>> {
        let ref slice = weights.select(Axis(0), cells);
        match slice.sum() > 0. {
            true => Ok(density::normalize(slice)),
            false => Err(Error::Value("prior marginals carry no mass".into())),
        }
    }
    fn geometry(
        joint: &TaggedArray,
        callback: Option<Callback>,
        source: &[usize],
        target: &[usize],
    ) -> Result<Geometry> {
        match (joint.tag(), callback) {
            (Tag::PointCloud, None) => Ok(Geometry::Linear {
                x: joint.rows(source),
                y: joint.rows(target),
            }),
            (Tag::PointCloud, Some(Callback::LocalPca { n_comps })) => {
                let x = joint.rows(source);
                let y = joint.rows(target);
                let (px, py) = Pca::new(n_comps)?.project(x.values(), y.values())?;
                Ok(Geometry::Linear {
                    x: TaggedArray::new(px, Tag::PointCloud, x.loss().cloned())?,
                    y: TaggedArray::new(py, Tag::PointCloud, y.loss().cloned())?,
                })
            }
            (Tag::CostMatrix | Tag::Kernel, None) => Ok(Geometry::Precomputed(joint.block(source, target)?)),
            (Tag::CostMatrix | Tag::Kernel, Some(_)) => Err(Error::Value(
                "feature callbacks need point-cloud features".into(),
            )),
            (Tag::Grid, _) => Err(Error::Value("grid geometries are not supported".into())),
        }
    }
}

impl Temporal for TemporalProblem {
    fn dataset(&self) -> &dyn Dataset {
        &self.adata
    }
    fn problems(&self) -> &ProblemCollection {
        &self.problems
    }
    fn cells(&self, time: Time) -> Result<&[usize]> {
        self.slices
            .get(&Timepoint::from(time))
            .map(Vec::as_slice)
            .ok_or_else(|| Error::Key(format!("time point {} is not observed", time)))
    }
    fn features(&self) -> Result<TaggedArray> {
        let config = self
            .config
            .as_ref()
            .ok_or_else(|| Error::Value("no problems have been prepared".into()))?;
        let features = config.joint_attr.create(&self.adata, &self.registry)?;
        match features.is_point_cloud() {
            true => Ok(features),
            false => Err(Error::Value(
                "distances need point-cloud features, found precomputed costs".into(),
            )),
        }
    }
}

impl std::ops::Index<(Time, Time)> for TemporalProblem {
    type Output = ProblemStage;
    fn index(&self, key: (Time, Time)) -> &Self::Output {
        &self.problems[key]
    }
}
