use super::column::Column;
use super::container::Container;
use crate::Error;
use crate::Result;
use serde::Deserialize;
use serde::Serialize;
use std::collections::BTreeMap;

/// What an attribute name resolves to: a bare container (`X`)
/// or a keyed collection of containers (`obsm`, `layers`, `obsp`, `obs`).
#[derive(Debug, Clone, Copy)]
pub enum Attribute<'a> {
    Matrix(&'a Container),
    Mapping(&'a BTreeMap<String, Container>),
    Frame(&'a BTreeMap<String, Column>),
}

impl Attribute<'_> {
    /// the container under `key`, or the bare matrix when no key is given
    pub fn resolve(self, attr: &str, key: Option<&str>) -> Result<Container> {
        match (self, key) {
            (Self::Matrix(container), None) => Ok(container.clone()),
            (Self::Matrix(_), Some(key)) => Err(Error::Key(format!(
                "unable to find `adata.{}['{}']`, attribute is not keyed",
                attr, key
            ))),
            (Self::Mapping(_), None) | (Self::Frame(_), None) => Err(Error::Key(format!(
                "`adata.{}` is a mapping, a key is required",
                attr
            ))),
            (Self::Mapping(mapping), Some(key)) => mapping
                .get(key)
                .cloned()
                .ok_or_else(|| Error::Key(format!("unable to find `adata.{}['{}']`", attr, key))),
            (Self::Frame(frame), Some(key)) => match frame.get(key) {
                Some(Column::Numeric(values)) => {
                    Ok(Container::from(ndarray::Array1::from(values.clone())))
                }
                Some(Column::Categorical { .. }) => Err(Error::Type(format!(
                    "expected `adata.{}['{}']` to be numeric",
                    attr, key
                ))),
                None => Err(Error::Key(format!("unable to find `adata.{}['{}']`", attr, key))),
            },
        }
    }
}

/// Capability interface over an annotated cell-by-feature dataset.
pub trait Dataset {
    /// number of observations (cells)
    fn n_obs(&self) -> usize;
    /// observation names, one per cell
    fn obs_names(&self) -> &[String];
    fn has_attribute(&self, name: &str) -> bool;
    fn attribute(&self, name: &str) -> Result<Attribute<'_>>;
    /// per-cell annotation column
    fn column(&self, key: &str) -> Result<&Column>;
}

/// In-memory annotated data matrix.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnnData {
    obs_names: Vec<String>,
    obs: BTreeMap<String, Column>,
    x: Option<Container>,
    obsm: BTreeMap<String, Container>,
    layers: BTreeMap<String, Container>,
    obsp: BTreeMap<String, Container>,
}

impl AnnData {
    /// empty dataset over `n` cells named `cell_0..cell_n`
    pub fn new(n: usize) -> Self {
        Self {
            obs_names: (0..n).map(|i| format!("cell_{}", i)).collect(),
            ..Self::default()
        }
    }
    pub fn with_obs_names(mut self, names: Vec<String>) -> Result<Self> {
        self.check(names.len(), "obs_names")?;
        self.obs_names = names;
        Ok(self)
    }
    pub fn with_x(mut self, x: impl Into<Container>) -> Result<Self> {
        let x = x.into();
        self.check(x.len(), "X")?;
        self.x = Some(x);
        Ok(self)
    }
    pub fn with_obs(mut self, key: &str, column: Column) -> Result<Self> {
        self.check(column.len(), key)?;
        self.obs.insert(key.to_string(), column);
        Ok(self)
    }
    pub fn with_obsm(mut self, key: &str, container: impl Into<Container>) -> Result<Self> {
        let container = container.into();
        self.check(container.len(), key)?;
        self.obsm.insert(key.to_string(), container);
        Ok(self)
    }
    pub fn with_layer(mut self, key: &str, container: impl Into<Container>) -> Result<Self> {
        let container = container.into();
        self.check(container.len(), key)?;
        self.layers.insert(key.to_string(), container);
        Ok(self)
    }
    pub fn with_obsp(mut self, key: &str, container: impl Into<Container>) -> Result<Self> {
        let container = container.into();
        self.check(container.len(), key)?;
        self.obsp.insert(key.to_string(), container);
        Ok(self)
    }
    /// parse a serialized dataset and check every attribute against `obs_names`
    pub fn from_json(json: &str) -> Result<Self> {
        let adata = serde_json::from_str::<Self>(json).map_err(|e| Error::Value(e.to_string()))?;
        adata
            .obs
            .iter()
            .map(|(k, c)| adata.check(c.len(), k))
            .chain(adata.x.iter().map(|c| adata.check(c.len(), "X")))
            .chain(adata.obsm.iter().map(|(k, c)| adata.check(c.len(), k)))
            .chain(adata.layers.iter().map(|(k, c)| adata.check(c.len(), k)))
            .chain(adata.obsp.iter().map(|(k, c)| adata.check(c.len(), k)))
            .collect::<Result<Vec<_>>>()?;
        log::debug!("{:<32}{:<32}", "loaded annotated data", adata.n_obs());
        Ok(adata)
    }

    /// rows at the given indices. pairwise `obsp` matrices are subset on both axes.
    pub fn subset(&self, rows: &[usize]) -> Result<Self> {
        if let Some(&i) = rows.iter().find(|&&i| i >= self.n_obs()) {
            return Err(Error::Value(format!("row {} out of bounds", i)));
        }
        let take = |c: &Container| -> Result<Container> {
            let dense = c.to_2d()?;
            let rows = dense.select(ndarray::Axis(0), rows);
            Ok(Container::from(rows))
        };
        let pair = |c: &Container| -> Result<Container> {
            let dense = c.to_2d()?;
            let rows = dense
                .select(ndarray::Axis(0), rows)
                .select(ndarray::Axis(1), rows);
            Ok(Container::from(rows))
        };
        Ok(Self {
            obs_names: rows.iter().map(|&i| self.obs_names[i].clone()).collect(),
            obs: self
                .obs
                .iter()
                .map(|(k, c)| (k.clone(), c.take(rows)))
                .collect(),
            x: self.x.as_ref().map(take).transpose()?,
            obsm: Self::map(&self.obsm, take)?,
            layers: Self::map(&self.layers, take)?,
            obsp: Self::map(&self.obsp, pair)?,
        })
    }
    /// rows where the mask holds
    pub fn mask(&self, mask: &[bool]) -> Result<Self> {
        self.check(mask.len(), "mask")?;
        let rows = mask
            .iter()
            .enumerate()
            .filter(|(_, keep)| **keep)
            .map(|(i, _)| i)
            .collect::<Vec<_>>();
        self.subset(&rows)
    }

    fn map(
        mapping: &BTreeMap<String, Container>,
        f: impl Fn(&Container) -> Result<Container>,
    ) -> Result<BTreeMap<String, Container>> {
        mapping
            .iter()
            .map(|(k, c)| f(c).map(|c| (k.clone(), c)))
            .collect()
    }
    fn check(&self, n: usize, what: &str) -> Result<()> {
        match n == self.n_obs() {
            true => Ok(()),
            false => Err(Error::Value(format!(
                "`{}` has {} rows, expected {}",
                what,
                n,
                self.n_obs()
            ))),
        }
    }
}

impl Dataset for AnnData {
    fn n_obs(&self) -> usize {
        self.obs_names.len()
    }
    fn obs_names(&self) -> &[String] {
        &self.obs_names
    }
    fn has_attribute(&self, name: &str) -> bool {
        match name {
            "X" => self.x.is_some(),
            "obs" | "obsm" | "layers" | "obsp" => true,
            _ => false,
        }
    }
    fn attribute(&self, name: &str) -> Result<Attribute<'_>> {
        match name {
            "X" => self
                .x
                .as_ref()
                .map(Attribute::Matrix)
                .ok_or_else(|| Error::Attribute(name.to_string())),
            "obs" => Ok(Attribute::Frame(&self.obs)),
            "obsm" => Ok(Attribute::Mapping(&self.obsm)),
            "layers" => Ok(Attribute::Mapping(&self.layers)),
            "obsp" => Ok(Attribute::Mapping(&self.obsp)),
            _ => Err(Error::Attribute(name.to_string())),
        }
    }
    fn column(&self, key: &str) -> Result<&Column> {
        self.obs
            .get(key)
            .ok_or_else(|| Error::Key(format!("unable to find `adata.obs['{}']`", key)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    fn adata() -> AnnData {
        AnnData::new(3)
            .with_x(array![[1., 0.], [0., 2.], [3., 3.]])
            .unwrap()
            .with_obs("time", Column::Numeric(vec![0., 0., 1.]))
            .unwrap()
            .with_obs("cell_type", Column::categorical(&["a", "b", "a"]))
            .unwrap()
            .with_obsm("X_pca", array![[0.1], [0.2], [0.3]])
            .unwrap()
            .with_obsp("distances", array![[0., 1., 2.], [1., 0., 3.], [2., 3., 0.]])
            .unwrap()
    }

    #[test]
    fn attributes_resolve() {
        let adata = adata();
        assert!(adata.has_attribute("X"));
        assert!(!adata.has_attribute("uns"));
        assert!(matches!(adata.attribute("uns"), Err(Error::Attribute(_))));
        let pca = adata.attribute("obsm").unwrap().resolve("obsm", Some("X_pca"));
        assert_eq!(pca.unwrap().to_2d().unwrap().dim(), (3, 1));
        let missing = adata.attribute("obsm").unwrap().resolve("obsm", Some("X_umap"));
        assert!(matches!(missing, Err(Error::Key(_))));
    }

    #[test]
    fn obs_columns_resolve_as_vectors() {
        let adata = adata();
        let time = adata.attribute("obs").unwrap().resolve("obs", Some("time"));
        assert_eq!(time.unwrap().to_2d().unwrap().dim(), (3, 1));
        let labels = adata.attribute("obs").unwrap().resolve("obs", Some("cell_type"));
        assert!(matches!(labels, Err(Error::Type(_))));
    }

    #[test]
    fn subset_slices_every_attribute() {
        let sub = adata().subset(&[2, 0]).unwrap();
        assert_eq!(sub.n_obs(), 2);
        assert_eq!(sub.obs_names(), &["cell_2", "cell_0"]);
        assert_eq!(sub.column("cell_type").unwrap().label(0), Some("a"));
        let distances = sub.attribute("obsp").unwrap().resolve("obsp", Some("distances"));
        assert_eq!(distances.unwrap().to_2d().unwrap(), array![[0., 2.], [2., 0.]]);
    }

    #[test]
    fn mask_keeps_selected_rows() {
        let sub = adata().mask(&[false, true, true]).unwrap();
        assert_eq!(sub.column("time").unwrap().numeric().unwrap(), &[0., 1.]);
        assert!(adata().mask(&[true]).is_err());
    }

    #[test]
    fn json_loading_checks_row_counts() {
        let json = serde_json::to_string(&adata()).unwrap();
        assert_eq!(AnnData::from_json(&json).unwrap(), adata());
        let short = r#"{"obs_names": ["a", "b"], "obs": {"t": {"Numeric": [1.0]}}}"#;
        assert!(matches!(AnnData::from_json(short), Err(Error::Value(_))));
        let codes = r#"{"obs_names": ["a", "b"], "obs": {"c": {"Categorical": {"categories": ["A"], "codes": [0, 5]}}}}"#;
        assert!(matches!(AnnData::from_json(codes), Err(Error::Value(_))));
    }

    #[test]
    fn mismatched_rows_are_rejected() {
        assert!(AnnData::new(2).with_obs("t", Column::Numeric(vec![0.])).is_err());
    }
}
