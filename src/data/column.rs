use crate::Error;
use crate::Result;
use serde::Deserialize;
use serde::Serialize;

/// A per-cell annotation column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "ColumnParts")]
pub enum Column {
    Numeric(Vec<f64>),
    /// `codes[i]` indexes into `categories`. unused categories are allowed.
    Categorical {
        categories: Vec<String>,
        codes: Vec<usize>,
    },
}

impl Column {
    /// categorical column from raw labels, categories in order of first appearance
    pub fn categorical<S: AsRef<str>>(labels: &[S]) -> Self {
        let mut categories = Vec::<String>::new();
        let codes = labels
            .iter()
            .map(|label| label.as_ref())
            .map(|label| match categories.iter().position(|c| c == label) {
                Some(code) => code,
                None => {
                    categories.push(label.to_string());
                    categories.len() - 1
                }
            })
            .collect();
        Self::Categorical { categories, codes }
    }
    /// categorical column with an explicit category order, which may include unused labels
    pub fn with_categories<S: AsRef<str>>(labels: &[S], categories: &[S]) -> Result<Self> {
        let categories = categories
            .iter()
            .map(|c| c.as_ref().to_string())
            .collect::<Vec<_>>();
        let codes = labels
            .iter()
            .map(|label| {
                categories
                    .iter()
                    .position(|c| c == label.as_ref())
                    .ok_or_else(|| Error::Key(format!("label `{}` is not a category", label.as_ref())))
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Self::Categorical { categories, codes })
    }
    pub fn len(&self) -> usize {
        match self {
            Self::Numeric(values) => values.len(),
            Self::Categorical { codes, .. } => codes.len(),
        }
    }
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
    pub fn is_numeric(&self) -> bool {
        matches!(self, Self::Numeric(_))
    }
    pub fn numeric(&self) -> Option<&[f64]> {
        match self {
            Self::Numeric(values) => Some(values),
            Self::Categorical { .. } => None,
        }
    }
    pub fn categories(&self) -> Option<&[String]> {
        match self {
            Self::Numeric(_) => None,
            Self::Categorical { categories, .. } => Some(categories),
        }
    }
    /// label of the i-th cell, if categorical
    pub fn label(&self, i: usize) -> Option<&str> {
        match self {
            Self::Numeric(_) => None,
            Self::Categorical { categories, codes } => {
                codes
                    .get(i)
                    .and_then(|&c| categories.get(c))
                    .map(String::as_str)
            }
        }
    }
    /// rows restricted to the given cell indices; categories are kept intact
    pub fn take(&self, rows: &[usize]) -> Self {
        match self {
            Self::Numeric(values) => Self::Numeric(rows.iter().map(|&i| values[i]).collect()),
            Self::Categorical { categories, codes } => Self::Categorical {
                categories: categories.clone(),
                codes: rows.iter().map(|&i| codes[i]).collect(),
            },
        }
    }
}

/// unchecked wire form of a column
#[derive(Deserialize)]
enum ColumnParts {
    Numeric(Vec<f64>),
    Categorical {
        categories: Vec<String>,
        codes: Vec<usize>,
    },
}

impl TryFrom<ColumnParts> for Column {
    type Error = Error;
    fn try_from(parts: ColumnParts) -> Result<Self> {
        match parts {
            ColumnParts::Numeric(values) => Ok(Self::Numeric(values)),
            ColumnParts::Categorical { categories, codes } => {
                match codes.iter().find(|&&c| c >= categories.len()) {
                    Some(c) => Err(Error::Value(format!(
                        "category code {} out of range for {} categories",
                        c,
                        categories.len()
                    ))),
                    None => Ok(Self::Categorical { categories, codes }),
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn categories_follow_first_appearance() {
        let column = Column::categorical(&["b", "a", "b", "c"]);
        assert_eq!(column.categories().unwrap(), &["b", "a", "c"]);
        assert_eq!(column.label(2), Some("b"));
        assert!(column.numeric().is_none());
    }

    #[test]
    fn explicit_categories_keep_unused_labels() {
        let column = Column::with_categories(&["a", "a"], &["a", "unknown"]).unwrap();
        assert_eq!(column.categories().unwrap().len(), 2);
        assert!(Column::with_categories(&["z"], &["a"]).is_err());
    }

    #[test]
    fn take_keeps_categories() {
        let column = Column::categorical(&["x", "y", "z"]).take(&[2]);
        assert_eq!(column.len(), 1);
        assert_eq!(column.categories().unwrap().len(), 3);
        assert_eq!(column.label(0), Some("z"));
    }

    #[test]
    fn codes_must_index_categories() {
        let valid = r#"{"Categorical": {"categories": ["A"], "codes": [0, 0]}}"#;
        let column = serde_json::from_str::<Column>(valid).unwrap();
        assert_eq!(column.label(1), Some("A"));
        let invalid = r#"{"Categorical": {"categories": ["A"], "codes": [0, 5]}}"#;
        assert!(serde_json::from_str::<Column>(invalid).is_err());
    }
}
