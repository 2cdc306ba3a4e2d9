use super::anndata::Dataset;
use super::tagged::Loss;
use super::tagged::LossFn;
use crate::Energy;
use crate::Error;
use crate::Result;
use ndarray::Array2;
use ndarray::ArrayView2;
use serde_json::Map;
use serde_json::Value;
use std::collections::BTreeMap;

/// Keyword arguments forwarded to cost builders.
pub type LossKwargs = Map<String, Value>;

/// Builds a full cost matrix straight from a dataset attribute.
pub type CostBuilder =
    fn(&dyn Dataset, &str, Option<&str>, &LossKwargs) -> Result<Array2<Energy>>;

/// Name of the loss used when a pointer names none.
pub const DEFAULT_LOSS: &str = "sq_euclidean";

/// Immutable lookup of named losses, injected where data is bound.
///
/// Backend losses turn two point clouds into a cost at solve time.
/// Cost builders derive a complete cost matrix from the dataset up front.
#[derive(Clone)]
pub struct LossRegistry {
    losses: BTreeMap<String, LossFn>,
    costs: BTreeMap<String, CostBuilder>,
}

impl LossRegistry {
    /// registry without any entries
    pub fn empty() -> Self {
        Self {
            losses: BTreeMap::new(),
            costs: BTreeMap::new(),
        }
    }
    pub fn with_loss(mut self, name: &str, f: LossFn) -> Self {
        self.losses.insert(name.to_string(), f);
        self
    }
    pub fn with_cost(mut self, name: &str, f: CostBuilder) -> Self {
        self.costs.insert(name.to_string(), f);
        self
    }
    pub fn loss(&self, name: &str) -> Result<Loss> {
        self.losses
            .get(name)
            .map(|&f| Loss::new(name, f))
            .ok_or_else(|| Error::Key(format!("unknown loss `{}`", name)))
    }
    pub fn cost(&self, name: &str) -> Result<CostBuilder> {
        self.costs
            .get(name)
            .copied()
            .ok_or_else(|| Error::Key(format!("unknown cost `{}`", name)))
    }
}

impl Default for LossRegistry {
    fn default() -> Self {
        Self::empty()
            .with_loss(DEFAULT_LOSS, sq_euclidean)
            .with_loss("euclidean", euclidean)
            .with_loss("cosine", cosine)
            .with_cost("barcode_distance", barcode_distance)
    }
}

impl std::fmt::Debug for LossRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LossRegistry")
            .field("losses", &self.losses.keys().collect::<Vec<_>>())
            .field("costs", &self.costs.keys().collect::<Vec<_>>())
            .finish()
    }
}

/// squared euclidean distance between rows
pub fn sq_euclidean(x: ArrayView2<'_, f64>, y: ArrayView2<'_, f64>) -> Array2<Energy> {
    let xx = x.rows().into_iter().map(|r| r.dot(&r)).collect::<Vec<_>>();
    let yy = y.rows().into_iter().map(|r| r.dot(&r)).collect::<Vec<_>>();
    let xy = x.dot(&y.t());
    Array2::from_shape_fn(xy.dim(), |(i, j)| (xx[i] + yy[j] - 2. * xy[[i, j]]).max(0.))
}

/// euclidean distance between rows
pub fn euclidean(x: ArrayView2<'_, f64>, y: ArrayView2<'_, f64>) -> Array2<Energy> {
    sq_euclidean(x, y).mapv(f64::sqrt)
}

/// one minus cosine similarity between rows. zero rows are maximally distant.
pub fn cosine(x: ArrayView2<'_, f64>, y: ArrayView2<'_, f64>) -> Array2<Energy> {
    let xn = x.rows().into_iter().map(|r| r.dot(&r).sqrt()).collect::<Vec<_>>();
    let yn = y.rows().into_iter().map(|r| r.dot(&r).sqrt()).collect::<Vec<_>>();
    let xy = x.dot(&y.t());
    Array2::from_shape_fn(xy.dim(), |(i, j)| match xn[i] * yn[j] {
        norm if norm > 0. => 1. - xy[[i, j]] / norm,
        _ => 1.,
    })
}

/// Scaled Hamming distance between lineage barcodes.
///
/// Negative entries mark unobserved sites and are skipped. Cells sharing no
/// observed site sit at distance 1. kwargs: `scale` (default 1).
pub fn barcode_distance(
    adata: &dyn Dataset,
    attr: &str,
    key: Option<&str>,
    kwargs: &LossKwargs,
) -> Result<Array2<Energy>> {
    let scale = match kwargs.get("scale") {
        None => 1.,
        Some(v) => v
            .as_f64()
            .ok_or_else(|| Error::Type("`scale` must be numeric".into()))?,
    };
    let barcodes = adata.attribute(attr)?.resolve(attr, key)?.to_2d()?;
    let n = barcodes.nrows();
    Ok(Array2::from_shape_fn((n, n), |(i, j)| {
        let (shared, differ) = barcodes
            .row(i)
            .iter()
            .zip(barcodes.row(j).iter())
            .filter(|(a, b)| **a >= 0. && **b >= 0.)
            .fold((0usize, 0usize), |(s, d), (a, b)| (s + 1, d + (a != b) as usize));
        match shared {
            0 => scale,
            _ => scale * differ as f64 / shared as f64,
        }
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::anndata::AnnData;
    use ndarray::array;

    #[test]
    fn squared_euclidean_matches_definition() {
        let x = array![[0., 0.], [1., 2.]];
        let y = array![[3., 4.]];
        let c = sq_euclidean(x.view(), y.view());
        assert!((c[[0, 0]] - 25.).abs() < 1e-12);
        assert!((c[[1, 0]] - 8.).abs() < 1e-12);
        assert!((euclidean(x.view(), y.view())[[0, 0]] - 5.).abs() < 1e-12);
    }

    #[test]
    fn cosine_is_zero_on_parallel_rows() {
        let x = array![[1., 1.], [0., 0.]];
        let y = array![[2., 2.], [1., -1.]];
        let c = cosine(x.view(), y.view());
        assert!(c[[0, 0]].abs() < 1e-12);
        assert!((c[[0, 1]] - 1.).abs() < 1e-12);
        assert_eq!(c[[1, 0]], 1.);
    }

    #[test]
    fn unknown_names_are_key_errors() {
        let registry = LossRegistry::default();
        assert!(registry.loss(DEFAULT_LOSS).is_ok());
        assert!(matches!(registry.loss("wasserstein"), Err(Error::Key(_))));
        assert!(matches!(registry.cost("geodesic"), Err(Error::Key(_))));
    }

    #[test]
    fn barcodes_skip_unobserved_sites() {
        let adata = AnnData::new(3)
            .with_obsm("barcodes", array![[1., 2., -1.], [1., 3., 4.], [-1., -1., -1.]])
            .unwrap();
        let mut kwargs = LossKwargs::new();
        kwargs.insert("scale".into(), Value::from(2.));
        let c = barcode_distance(&adata, "obsm", Some("barcodes"), &kwargs).unwrap();
        assert_eq!(c[[0, 0]], 0.);
        assert!((c[[0, 1]] - 1.).abs() < 1e-12);
        assert_eq!(c[[0, 2]], 2.);
    }
}
