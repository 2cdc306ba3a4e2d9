/// Failures surfaced while binding data, preparing problems or querying couplings.
///
/// Every variant is a deterministic data-validation failure; nothing here is retried.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum Error {
    /// A referenced dataset attribute does not exist.
    #[error("unable to find attribute `adata.{0}`")]
    Attribute(String),
    /// A key, group label, loss name or time pair is missing.
    #[error("{0}")]
    Key(String),
    /// Shape or ordering violation.
    #[error("{0}")]
    Value(String),
    /// A column holds the wrong kind of values.
    #[error("{0}")]
    Type(String),
    /// A stage was queried before it held a solution.
    #[error("problem `{0}` has not been solved")]
    Unsolved(String),
}

pub type Result<T> = std::result::Result<T, Error>;
