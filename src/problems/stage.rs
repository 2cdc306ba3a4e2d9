use super::timepoint::Timepoint;
use crate::transport::Geometry;
use crate::transport::Solution;
use crate::transport::Solver;
use crate::Error;
use crate::Mass;
use crate::Result;
use ndarray::Array1;

/// One transport problem between the cells of two time points.
///
/// Cell indices point into the full dataset. `a` and `b` are the prior
/// marginals over those cells, normalized to unit mass.
#[derive(Debug, Clone, PartialEq)]
pub struct ProblemStage {
    source: Timepoint,
    target: Timepoint,
    source_cells: Vec<usize>,
    target_cells: Vec<usize>,
    geometry: Geometry,
    a: Array1<Mass>,
    b: Array1<Mass>,
    solution: Option<Solution>,
}

impl ProblemStage {
    pub fn new(
        (source, target): (Timepoint, Timepoint),
        (source_cells, target_cells): (Vec<usize>, Vec<usize>),
        geometry: Geometry,
        (a, b): (Array1<Mass>, Array1<Mass>),
    ) -> Result<Self> {
        let shape = (source_cells.len(), target_cells.len());
        if geometry.shape() != shape || (a.len(), b.len()) != shape {
            return Err(Error::Value(format!(
                "problem ({}, {}) expects {:?} cells, geometry is {:?}",
                source,
                target,
                shape,
                geometry.shape()
            )));
        }
        Ok(Self {
            source,
            target,
            source_cells,
            target_cells,
            geometry,
            a,
            b,
            solution: None,
        })
    }

    pub fn key(&self) -> (Timepoint, Timepoint) {
        (self.source, self.target)
    }
    pub fn source(&self) -> Timepoint {
        self.source
    }
    pub fn target(&self) -> Timepoint {
        self.target
    }
    pub fn source_cells(&self) -> &[usize] {
        &self.source_cells
    }
    pub fn target_cells(&self) -> &[usize] {
        &self.target_cells
    }
    pub fn geometry(&self) -> &Geometry {
        &self.geometry
    }
    pub fn a(&self) -> &Array1<Mass> {
        &self.a
    }
    pub fn b(&self) -> &Array1<Mass> {
        &self.b
    }
    pub fn is_solved(&self) -> bool {
        self.solution.is_some()
    }
    pub fn solution(&self) -> Result<&Solution> {
        self.solution
            .as_ref()
            .ok_or_else(|| Error::Unsolved(format!("({}, {})", self.source, self.target)))
    }

    /// run the solver and keep its output
    pub fn solve(&mut self, solver: &impl Solver) -> Result<()> {
        let solution = solver.solve(&self.geometry, self.a.view(), self.b.view())?;
        log::info!(
            "{:<32}{:<32}",
            format!("solved ({}, {})", self.source, self.target),
            format!("{} iterations, converged {}", solution.iterations(), solution.converged())
        );
        self.solution = Some(solution);
        Ok(())
    }
    /// replace the solution without invoking any solver
    pub fn inject(&mut self, solution: Solution) -> Result<()> {
        let shape = (self.source_cells.len(), self.target_cells.len());
        match solution.coupling().dim() == shape {
            true => {
                self.solution = Some(solution);
                Ok(())
            }
            false => Err(Error::Value(format!(
                "coupling of shape {:?} does not fit problem ({}, {}) of shape {:?}",
                solution.coupling().dim(),
                self.source,
                self.target,
                shape
            ))),
        }
    }

    /// Relative growth of each source cell.
    ///
    /// The posterior compares mass the coupling actually moves out of each cell
    /// against its prior. The prior is the prior marginal relative to its mean.
    pub fn growth_rates(&self, posterior: bool) -> Result<Array1<Mass>> {
        match posterior {
            true => {
                let moved = self.solution()?.a();
                Ok(Array1::from_shape_fn(self.a.len(), |i| match self.a[i] > 0. {
                    true => moved[i] / self.a[i],
                    false => 0.,
                }))
            }
            false => {
                let mean = self.a.mean().unwrap_or(0.).max(crate::MASS_MIN);
                Ok(&self.a / mean)
            }
        }
    }
}
