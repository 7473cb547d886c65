//! Serializable dense copies of tables
//!
//! Partial results cross process boundaries between distributed steps; a
//! snapshot records shape, layout, dictionary and every element widened to
//! f64 (exact for all storage types), and restores to an owned table with the
//! original storage types. CSR captures also keep the stored arrays and the
//! index base, so explicitly stored zeros survive.

use super::{
    check_block_len, CsrNumericTable, HomogenNumericTable, IndexBase, NumericTable,
    SoaNumericTable, TableExt, TableLayout, TableRef,
};
use crate::dictionary::Dictionary;
use crate::error::{Error, Result};
use crate::numeric::{DataType, Numeric};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableSnapshot {
    pub rows: usize,
    pub columns: usize,
    pub layout: TableLayout,
    pub dictionary: Dictionary,
    /// Row-major elements
    pub values: Vec<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sparse: Option<SparseSnapshot>,
}

/// Stored arrays of a CSR table, values widened to f64
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SparseSnapshot {
    pub values: Vec<f64>,
    pub column_indices: Vec<usize>,
    pub row_offsets: Vec<usize>,
    pub base: IndexBase,
}

fn column_as<T: Numeric>(values: &[f64], rows: usize, columns: usize, column: usize) -> Vec<T> {
    (0..rows)
        .map(|r| T::from_f64(values[r * columns + column]))
        .collect()
}

impl TableSnapshot {
    pub fn capture<N: NumericTable + ?Sized>(table: &N) -> Result<Self> {
        Ok(Self {
            rows: table.rows(),
            columns: table.columns(),
            layout: table.layout(),
            dictionary: table.dictionary().clone(),
            values: table.read_all::<f64>()?.into_vec(),
            sparse: table.csr().map(|parts| SparseSnapshot {
                values: parts.values.to_vec(),
                column_indices: parts.column_indices.to_vec(),
                row_offsets: parts.row_offsets.to_vec(),
                base: parts.base,
            }),
        })
    }

    fn check(&self) -> Result<()> {
        check_block_len(self.rows, self.columns, self.values.len())?;
        if self.dictionary.len() != self.columns {
            return Err(Error::size_mismatch(
                self.columns,
                self.dictionary.len(),
                "dictionary",
            ));
        }
        Ok(())
    }

    /// Row-major table of `T`, ignoring the recorded storage types
    pub fn restore_as<T: Numeric>(&self) -> Result<HomogenNumericTable<'static, T>> {
        self.check()?;
        let values = self.values.iter().map(|&v| T::from_f64(v)).collect();
        let table = HomogenNumericTable::from_vec(self.rows, self.columns, values)?;
        table.with_dictionary(self.dictionary_as::<T>()?)
    }

    /// Recorded feature kinds over a homogeneous `T` dictionary
    fn dictionary_as<T: Numeric>(&self) -> Result<Dictionary> {
        let mut dictionary = Dictionary::homogeneous(self.columns, T::DATA_TYPE);
        for (c, feature) in self.dictionary.iter().enumerate() {
            dictionary.set_feature_kind(c, feature.kind)?;
            if feature.categories > 0 {
                dictionary.set_categories(c, feature.categories)?;
            }
        }
        Ok(dictionary)
    }

    fn restore_sparse<T: Numeric>(&self, sparse: &SparseSnapshot) -> Result<TableRef<'static>> {
        let values = sparse.values.iter().map(|&v| T::from_f64(v)).collect();
        let mut table = CsrNumericTable::<T>::new(
            self.rows,
            self.columns,
            values,
            sparse.column_indices.clone(),
            sparse.row_offsets.clone(),
            sparse.base,
        )?;
        *table.dictionary_mut() = self.dictionary_as::<T>()?;
        Ok(table.into_shared())
    }

    /// Owned table with the recorded storage types
    ///
    /// Homogeneous snapshots restore row-major, or CSR with the captured
    /// arrays and index base; heterogeneous ones restore column-major.
    pub fn restore(&self) -> Result<TableRef<'static>> {
        self.check()?;
        let data_type = match self.dictionary.is_homogeneous() {
            Some(data_type) => data_type,
            None if self.columns == 0 => DataType::F64,
            None => return self.restore_columns(),
        };
        crate::dispatch_data_type!(data_type, T => {
            match (&self.sparse, self.layout) {
                (Some(sparse), _) => self.restore_sparse::<T>(sparse),
                // captured before the stored arrays were recorded
                (None, TableLayout::Csr) => Ok(CsrNumericTable::<T>::from_dense(
                    &self.restore_as::<T>()?,
                    IndexBase::Zero,
                )?
                .into_shared()),
                (None, _) => Ok(self.restore_as::<T>()?.into_shared()),
            }
        })
    }

    fn restore_columns(&self) -> Result<TableRef<'static>> {
        let mut table = SoaNumericTable::new(self.rows, self.dictionary.clone());
        for (c, feature) in self.dictionary.iter().enumerate() {
            crate::dispatch_data_type!(feature.data_type, T => {
                table.set_column(c, column_as::<T>(&self.values, self.rows, self.columns, c))?;
            });
        }
        Ok(table.into_shared())
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }
}
