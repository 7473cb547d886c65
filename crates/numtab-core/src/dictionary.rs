//! Per-column feature metadata owned by a table

use crate::error::{Error, ErrorKind, Result};
use crate::numeric::DataType;
use serde::{Deserialize, Serialize};

/// Semantic kind of a feature
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FeatureKind {
    #[default]
    Continuous,
    Categorical,
    Ordinal,
}

/// Metadata for a single column
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeatureInfo {
    pub kind: FeatureKind,
    pub data_type: DataType,
    /// Number of categories for categorical features, 0 otherwise
    #[serde(default)]
    pub categories: usize,
}

impl FeatureInfo {
    pub fn continuous(data_type: DataType) -> Self {
        Self {
            kind: FeatureKind::Continuous,
            data_type,
            categories: 0,
        }
    }

    pub fn categorical(data_type: DataType, categories: usize) -> Self {
        Self {
            kind: FeatureKind::Categorical,
            data_type,
            categories,
        }
    }
}

/// Ordered feature metadata, one entry per column
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dictionary {
    features: Vec<FeatureInfo>,
}

impl Dictionary {
    /// `columns` continuous features of one storage type
    pub fn homogeneous(columns: usize, data_type: DataType) -> Self {
        Self {
            features: vec![FeatureInfo::continuous(data_type); columns],
        }
    }

    pub fn from_features(features: Vec<FeatureInfo>) -> Self {
        Self { features }
    }

    /// Concatenation of several dictionaries, in order
    pub fn concat<'d>(parts: impl IntoIterator<Item = &'d Dictionary>) -> Self {
        Self {
            features: parts
                .into_iter()
                .flat_map(|d| d.features.iter().copied())
                .collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.features.len()
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }

    pub fn feature(&self, column: usize) -> Option<&FeatureInfo> {
        self.features.get(column)
    }

    pub fn features(&self) -> &[FeatureInfo] {
        &self.features
    }

    pub fn iter(&self) -> impl Iterator<Item = &FeatureInfo> {
        self.features.iter()
    }

    /// The shared storage type if every column has the same one
    pub fn is_homogeneous(&self) -> Option<DataType> {
        let first = self.features.first()?.data_type;
        self.features
            .iter()
            .all(|f| f.data_type == first)
            .then_some(first)
    }

    pub fn set_feature_kind(&mut self, column: usize, kind: FeatureKind) -> Result<()> {
        self.feature_mut(column)?.kind = kind;
        Ok(())
    }

    pub fn set_categories(&mut self, column: usize, categories: usize) -> Result<()> {
        let feature = self.feature_mut(column)?;
        feature.kind = FeatureKind::Categorical;
        feature.categories = categories;
        Ok(())
    }

    /// Storage types are fixed by the owning table
    pub(crate) fn set_data_type(&mut self, column: usize, data_type: DataType) -> Result<()> {
        self.feature_mut(column)?.data_type = data_type;
        Ok(())
    }

    fn feature_mut(&mut self, column: usize) -> Result<&mut FeatureInfo> {
        let len = self.features.len();
        self.features.get_mut(column).ok_or_else(|| {
            Error::with_detail(
                ErrorKind::IncorrectNumberOfColumns,
                "column",
                format!("column {column} outside dictionary of {len} features"),
            )
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_homogeneous() {
        let dict = Dictionary::homogeneous(3, DataType::F32);
        assert_eq!(dict.len(), 3);
        assert_eq!(dict.is_homogeneous(), Some(DataType::F32));
        assert!(dict.iter().all(|f| f.kind == FeatureKind::Continuous));
        assert_eq!(Dictionary::default().is_homogeneous(), None);
    }

    #[test]
    fn test_feature_kinds() {
        let mut dict = Dictionary::homogeneous(2, DataType::F64);
        dict.set_feature_kind(1, FeatureKind::Ordinal).unwrap();
        assert_eq!(dict.feature(1).unwrap().kind, FeatureKind::Ordinal);

        dict.set_categories(0, 4).unwrap();
        assert_eq!(dict.feature(0).unwrap().kind, FeatureKind::Categorical);
        assert_eq!(dict.feature(0).unwrap().categories, 4);

        let err = dict.set_feature_kind(2, FeatureKind::Ordinal).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::IncorrectNumberOfColumns);
    }

    #[test]
    fn test_concat() {
        let a = Dictionary::homogeneous(2, DataType::F64);
        let b = Dictionary::from_features(vec![FeatureInfo::categorical(DataType::I32, 3)]);
        let merged = Dictionary::concat([&a, &b]);
        assert_eq!(merged.len(), 3);
        assert_eq!(merged.is_homogeneous(), None);
        assert_eq!(merged.feature(2).unwrap().data_type, DataType::I32);
    }

    #[test]
    fn test_serde_defaults() {
        let json = r#"{"features":[{"kind":"Ordinal","data_type":"F64"}]}"#;
        let dict: Dictionary = serde_json::from_str(json).unwrap();
        assert_eq!(dict.feature(0).unwrap().categories, 0);
        assert_eq!(dict.feature(0).unwrap().kind, FeatureKind::Ordinal);
    }
}
