use super::anndata::Dataset;
use super::loss::LossKwargs;
use super::loss::LossRegistry;
use super::loss::DEFAULT_LOSS;
use super::tagged::Tag;
use super::tagged::TaggedArray;
use crate::Error;
use crate::Result;
use serde::Deserialize;
use serde::Serialize;

/// Where raw counts live when `use_raw` is set.
const RAW_LAYER: &str = "raw";

/// Immutable reference to `adata.<attr>[<key>]` plus how to read it.
///
/// [`DataPointer::create`] is a pure function of these fields and the
/// dataset's current contents.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DataPointer {
    pub attr: String,
    pub key: Option<String>,
    pub use_raw: bool,
    pub tag: Tag,
    pub loss: Option<String>,
    pub loss_kwargs: LossKwargs,
}

impl Default for DataPointer {
    fn default() -> Self {
        Self {
            attr: "X".to_string(),
            key: None,
            use_raw: false,
            tag: Tag::PointCloud,
            loss: Some(DEFAULT_LOSS.to_string()),
            loss_kwargs: LossKwargs::new(),
        }
    }
}

impl DataPointer {
    /// point cloud at `adata.<attr>[<key>]` with the default loss
    pub fn new(attr: &str, key: Option<&str>) -> Self {
        Self {
            attr: attr.to_string(),
            key: key.map(str::to_string),
            ..Self::default()
        }
    }
    /// precomputed cost at `adata.<attr>[<key>]`
    pub fn cost(attr: &str, key: Option<&str>) -> Self {
        Self {
            tag: Tag::CostMatrix,
            loss: None,
            ..Self::new(attr, key)
        }
    }
    pub fn with_tag(self, tag: Tag) -> Self {
        Self { tag, ..self }
    }
    pub fn with_loss(self, loss: &str, loss_kwargs: LossKwargs) -> Self {
        Self {
            loss: Some(loss.to_string()),
            loss_kwargs,
            ..self
        }
    }
    pub fn with_raw(self) -> Self {
        Self {
            use_raw: true,
            ..self
        }
    }

    /// Resolve into a tagged array.
    ///
    /// Cost matrices are either built by the named cost builder or read as-is;
    /// neither carries a loss. Every other tag reads raw features and attaches
    /// the named backend loss for solve time.
    pub fn create(&self, adata: &dyn Dataset, registry: &LossRegistry) -> Result<TaggedArray> {
        match (self.tag, self.loss.as_deref()) {
            (Tag::CostMatrix, Some(kind)) => {
                let builder = registry.cost(kind)?;
                let cost = builder(adata, &self.attr, self.key.as_deref(), &self.loss_kwargs)?;
                log::debug!("{:<32}{:<32}", "built cost matrix", kind);
                Ok(TaggedArray::cost(cost))
            }
            (Tag::CostMatrix, None) => Ok(TaggedArray::cost(self.read(adata)?)),
            (tag, kind) => {
                let loss = registry.loss(kind.unwrap_or(DEFAULT_LOSS))?;
                TaggedArray::new(self.read(adata)?, tag, Some(loss))
            }
        }
    }

    fn read(&self, adata: &dyn Dataset) -> Result<ndarray::Array2<f64>> {
        let (attr, key) = match (self.use_raw, self.attr.as_str()) {
            (true, "X") => ("layers", Some(RAW_LAYER)),
            (true, attr) => {
                return Err(Error::Value(format!(
                    "`use_raw` only applies to `adata.X`, not `adata.{}`",
                    attr
                )));
            }
            (false, attr) => (attr, self.key.as_deref()),
        };
        if !adata.has_attribute(attr) {
            return Err(Error::Attribute(attr.to_string()));
        }
        match adata.attribute(attr)?.resolve(attr, key) {
            Err(Error::Key(_)) if self.use_raw => Err(Error::Attribute("raw".to_string())),
            result => result?.to_2d(),
        }
    }
}
