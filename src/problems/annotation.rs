use super::temporal::Temporal;
use crate::Error;
use crate::Mass;
use crate::Result;
use crate::Time;
use ndarray::ArrayView2;
use serde::Deserialize;
use serde::Serialize;

/// How a cell picks a label from the cells it exchanges mass with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MappingMode {
    /// label of the single counterpart cell carrying the most mass
    #[default]
    Max,
    /// label whose counterpart cells carry the most mass in total
    Sum,
}

/// One transferred label per cell. Cells without mass stay unlabelled.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnnotationTable {
    pub cells: Vec<String>,
    pub label: String,
    pub values: Vec<Option<String>>,
}

impl AnnotationTable {
    pub fn len(&self) -> usize {
        self.cells.len()
    }
    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }
    pub fn get(&self, cell: &str) -> Option<&str> {
        let i = self.cells.iter().position(|c| c == cell)?;
        self.values[i].as_deref()
    }
}

/// Label transfer along transport maps.
pub trait AnnotationMapping: Temporal {
    /// Forward labels target cells from `source` annotations,
    /// backward labels source cells from `target` annotations.
    fn annotation_mapping(
        &self,
        mode: MappingMode,
        label: &str,
        source: Time,
        target: Time,
        forward: bool,
    ) -> Result<AnnotationTable> {
        let map = self.transport_map(source, target)?;
        let (annotated, counterparts, plan) = match forward {
            true => (&map.target_cells, &map.source_cells, map.plan.t()),
            false => (&map.source_cells, &map.target_cells, map.plan.view()),
        };
        let column = self.dataset().column(label)?;
        let categories = column.categories().ok_or_else(|| {
            Error::Type(format!(
                "Expected `adata.obs['{}']` to be categorical, found numeric",
                label
            ))
        })?;
        let codes = counterparts
            .iter()
            .map(|&i| column.label(i).and_then(|l| categories.iter().position(|c| c == l)))
            .collect::<Vec<_>>();
        let values = transfer(plan, &codes, categories.len(), mode)
            .into_iter()
            .map(|code| code.map(|c| categories[c].clone()))
            .collect();
        Ok(AnnotationTable {
            cells: annotated
                .iter()
                .map(|&i| self.dataset().obs_names()[i].clone())
                .collect(),
            label: label.to_string(),
            values,
        })
    }
}

impl<T: Temporal> AnnotationMapping for T {}

/// For each row of `plan`, the winning category code among its columns.
fn transfer(
    plan: ArrayView2<'_, Mass>,
    codes: &[Option<usize>],
    n_categories: usize,
    mode: MappingMode,
) -> Vec<Option<usize>> {
    plan.rows()
        .into_iter()
        .map(|row| match mode {
            MappingMode::Max => argmax(row.iter().copied()).and_then(|j| codes[j]),
            MappingMode::Sum => {
                let mut mass = vec![0.; n_categories];
                row.iter()
                    .zip(codes.iter())
                    .filter_map(|(m, c)| c.map(|c| (c, m)))
                    .for_each(|(c, m)| mass[c] += m);
                argmax(mass.into_iter())
            }
        })
        .collect()
}

/// first index of the largest positive value
fn argmax(values: impl Iterator<Item = Mass>) -> Option<usize> {
    values
        .enumerate()
        .filter(|(_, m)| *m > 0.)
        .fold(None, |best: Option<(usize, Mass)>, (i, m)| match best {
            Some((_, b)) if b >= m => best,
            _ => Some((i, m)),
        })
        .map(|(i, _)| i)
}
