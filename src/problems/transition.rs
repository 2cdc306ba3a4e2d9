use super::temporal::Temporal;
use crate::data::Dataset;
use crate::Error;
use crate::Mass;
use crate::Result;
use crate::Time;
use ndarray::Array1;
use ndarray::Array2;
use ndarray::Axis;
use serde::Serialize;

/// Which labels of a categorical column become table rows or columns.
#[derive(Debug, Clone, PartialEq)]
pub enum Groups {
    /// every category observed in the time slice, in category order
    Key(String),
    /// exactly these categories, in this order
    Subset { key: String, labels: Vec<String> },
}

impl Groups {
    pub fn key(key: &str) -> Self {
        Self::Key(key.to_string())
    }
    pub fn subset<S: AsRef<str>>(key: &str, labels: &[S]) -> Self {
        Self::Subset {
            key: key.to_string(),
            labels: labels.iter().map(|l| l.as_ref().to_string()).collect(),
        }
    }
    pub fn column(&self) -> &str {
        match self {
            Self::Key(key) | Self::Subset { key, .. } => key,
        }
    }

    /// Requested labels and, for each of `cells`, the position of its label among them.
    pub fn resolve(
        &self,
        dataset: &dyn Dataset,
        cells: &[usize],
    ) -> Result<(Vec<String>, Vec<Option<usize>>)> {
        let key = self.column();
        let column = dataset.column(key)?;
        let categories = column.categories().ok_or_else(|| {
            Error::Type(format!(
                "Expected `adata.obs['{}']` to be categorical, found numeric",
                key
            ))
        })?;
        let labels = match self {
            Self::Key(_) => categories
                .iter()
                .filter(|c| cells.iter().any(|&i| column.label(i) == Some(c.as_str())))
                .cloned()
                .collect::<Vec<_>>(),
            Self::Subset { labels, .. } => {
                if let Some(missing) = labels.iter().find(|l| !categories.contains(*l)) {
                    return Err(Error::Key(format!(
                        "`{}` is not a category of `adata.obs['{}']`",
                        missing, key
                    )));
                }
                if labels.iter().enumerate().any(|(i, l)| labels[..i].contains(l)) {
                    return Err(Error::Value(format!("duplicate groups in {:?}", labels)));
                }
                labels.clone()
            }
        };
        let membership = cells
            .iter()
            .map(|&i| column.label(i))
            .map(|label| label.and_then(|l| labels.iter().position(|g| g == l)))
            .collect();
        Ok((labels, membership))
    }
}

/// Aggregated transport mass between groups of source and target cells.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GroupTransitionTable {
    pub index: Vec<String>,
    pub columns: Vec<String>,
    pub values: Array2<f64>,
}

impl GroupTransitionTable {
    pub fn shape(&self) -> (usize, usize) {
        self.values.dim()
    }
    pub fn get(&self, row: &str, column: &str) -> Option<f64> {
        let i = self.index.iter().position(|r| r == row)?;
        let j = self.columns.iter().position(|c| c == column)?;
        Some(self.values[[i, j]])
    }
    pub fn row_sums(&self) -> Array1<f64> {
        self.values.sum_axis(Axis(1))
    }
    pub fn col_sums(&self) -> Array1<f64> {
        self.values.sum_axis(Axis(0))
    }
}

impl std::fmt::Display for GroupTransitionTable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:<16}", "")?;
        for column in &self.columns {
            write!(f, "{:>16}", column)?;
        }
        writeln!(f)?;
        for (label, row) in self.index.iter().zip(self.values.rows()) {
            write!(f, "{:<16}", label)?;
            for x in row {
                write!(f, "{:>16.4}", x)?;
            }
            writeln!(f)?;
        }
        Ok(())
    }
}

/// Group-level transitions between two time points.
pub trait CellTransition: Temporal {
    /// Transition table between groups of `source` cells and groups of `target` cells.
    ///
    /// Forward tables sum to one along rows, backward tables along columns.
    /// Groups that neither send nor receive mass keep all-zero lines.
    fn cell_transition(
        &self,
        source: Time,
        target: Time,
        source_groups: &Groups,
        target_groups: &Groups,
        forward: bool,
    ) -> Result<GroupTransitionTable> {
        let map = self.transport_map(source, target)?;
        let (index, rows) = source_groups.resolve(self.dataset(), &map.source_cells)?;
        let (columns, cols) = target_groups.resolve(self.dataset(), &map.target_cells)?;
        let mut values = Array2::<Mass>::zeros((index.len(), columns.len()));
        for (i, s) in rows.iter().enumerate() {
            for (j, g) in cols.iter().enumerate() {
                if let (Some(s), Some(g)) = (s, g) {
                    values[[*s, *g]] += map.plan[[i, j]];
                }
            }
        }
        let lanes = match forward {
            true => Axis(1),
            false => Axis(0),
        };
        values
            .lanes_mut(lanes)
            .into_iter()
            .for_each(|mut lane| {
                let sum = lane.sum();
                if sum > 0. {
                    lane /= sum;
                }
            });
        log::debug!(
            "{:<32}{:<32}",
            format!("transitions {} -> {}", source, target),
            format!("{} x {}", index.len(), columns.len())
        );
        Ok(GroupTransitionTable {
            index,
            columns,
            values,
        })
    }
}

impl<T: Temporal> CellTransition for T {}
