//! Compressed sparse row table
//!
//! Three arrays describe an `rows x columns` matrix with `nnz` stored entries:
//!
//! - `values` (nnz) and `column_indices` (nnz) run in parallel
//! - `row_offsets` (rows + 1) is non-decreasing, starts at `base` and ends at
//!   `base + nnz`
//!
//! Indices and offsets are either zero-based or one-based according to an
//! explicit [`IndexBase`]. Column indices within a row may come in any order;
//! entries repeating a column add up when the table is read.

use super::{
    check_block_len, check_read, check_write, AllocationState, HomogenNumericTable, NumericTable,
    TableExt, TableFlags, TableLayout, TableRef,
};
use crate::alloc::{checked_len, try_vec, try_with_capacity};
use crate::dictionary::Dictionary;
use crate::error::{Error, ErrorKind, Result};
use crate::numeric::{cast_value, ElementSlice, ElementSliceMut, Numeric};
use serde::{Deserialize, Serialize};
use std::ops::Range;
use std::sync::Arc;

/// Whether CSR indices count from 0 or from 1
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum IndexBase {
    Zero,
    One,
}

impl IndexBase {
    #[inline]
    pub fn offset(self) -> usize {
        match self {
            Self::Zero => 0,
            Self::One => 1,
        }
    }
}

/// Borrowed view of a CSR table's arrays
#[derive(Debug, Clone, Copy)]
pub struct CsrParts<'a> {
    pub rows: usize,
    pub columns: usize,
    pub values: ElementSlice<'a>,
    pub column_indices: &'a [usize],
    pub row_offsets: &'a [usize],
    pub base: IndexBase,
}

impl<'a> CsrParts<'a> {
    pub fn nnz(&self) -> usize {
        self.column_indices.len()
    }

    /// Values as `T`, failing if they are stored as another type
    pub fn values_as<T: Numeric>(&self) -> Result<&'a [T]> {
        T::narrow(self.values).ok_or_else(|| {
            Error::with_detail(
                ErrorKind::IncorrectTypeOfInput,
                "values",
                format!(
                    "sparse values are stored as {}, not {}",
                    self.values.data_type(),
                    T::DATA_TYPE
                ),
            )
        })
    }

    /// Zero-based positions of row `row`'s entries in `values`
    #[inline]
    pub fn row_range(&self, row: usize) -> Range<usize> {
        let b = self.base.offset();
        self.row_offsets[row] - b..self.row_offsets[row + 1] - b
    }

    /// Zero-based column of entry `k`
    #[inline]
    pub fn column(&self, k: usize) -> usize {
        self.column_indices[k] - self.base.offset()
    }
}

/// Owned CSR table of `T` values
#[derive(Debug, Clone)]
pub struct CsrNumericTable<T: Numeric> {
    rows: usize,
    columns: usize,
    values: Vec<T>,
    column_indices: Vec<usize>,
    row_offsets: Vec<usize>,
    base: IndexBase,
    dictionary: Dictionary,
}

fn offsets_error(detail: String) -> Error {
    Error::with_detail(ErrorKind::IncorrectRowOffsets, "row_offsets", detail)
}

fn indices_error(detail: String) -> Error {
    Error::with_detail(ErrorKind::IncorrectSparseIndices, "column_indices", detail)
}

fn validate(
    rows: usize,
    columns: usize,
    nnz: usize,
    column_indices: &[usize],
    row_offsets: &[usize],
    base: IndexBase,
) -> Result<()> {
    let b = base.offset();
    let expected = rows
        .checked_add(1)
        .ok_or_else(|| Error::allocation("row count overflows offsets array"))?;
    if row_offsets.len() != expected {
        return Err(offsets_error(format!(
            "expected {expected} offsets, got {}",
            row_offsets.len()
        )));
    }
    if column_indices.len() != nnz {
        return Err(Error::size_mismatch(nnz, column_indices.len(), "column_indices"));
    }
    if row_offsets[0] != b {
        return Err(offsets_error(format!(
            "first offset is {}, expected {b}",
            row_offsets[0]
        )));
    }
    if let Some(r) = row_offsets.windows(2).position(|w| w[1] < w[0]) {
        return Err(offsets_error(format!("offsets decrease after row {r}")));
    }
    if row_offsets[rows] - b != nnz {
        return Err(offsets_error(format!(
            "last offset is {}, expected {}",
            row_offsets[rows],
            nnz + b
        )));
    }
    for r in 0..rows {
        let row = &column_indices[row_offsets[r] - b..row_offsets[r + 1] - b];
        if let Some(&c) = row.iter().find(|&&c| c < b || c - b >= columns) {
            return Err(indices_error(format!(
                "index {c} in row {r} outside {b}..{}",
                columns + b
            )));
        }
    }
    Ok(())
}

impl<T: Numeric> CsrNumericTable<T> {
    /// Validate and take ownership of the three arrays
    pub fn new(
        rows: usize,
        columns: usize,
        values: Vec<T>,
        column_indices: Vec<usize>,
        row_offsets: Vec<usize>,
        base: IndexBase,
    ) -> Result<Self> {
        validate(rows, columns, values.len(), &column_indices, &row_offsets, base)?;
        Ok(Self {
            rows,
            columns,
            values,
            column_indices,
            row_offsets,
            base,
            dictionary: Dictionary::homogeneous(columns, T::DATA_TYPE),
        })
    }

    /// All-zero matrix with no stored entries
    pub fn empty(rows: usize, columns: usize, base: IndexBase) -> Result<Self> {
        let offsets = try_vec(rows + 1, base.offset())?;
        Self::new(rows, columns, Vec::new(), Vec::new(), offsets, base)
    }

    /// Compress any table, keeping the non-zero elements
    pub fn from_dense<N: NumericTable + ?Sized>(table: &N, base: IndexBase) -> Result<Self> {
        let (rows, columns) = (table.rows(), table.columns());
        let b = base.offset();
        let dense = table.read_all::<T>()?;
        let mut values = Vec::new();
        let mut column_indices = Vec::new();
        let mut row_offsets = try_with_capacity(rows + 1)?;
        row_offsets.push(b);
        for r in 0..rows {
            for (c, &v) in dense[r * columns..(r + 1) * columns].iter().enumerate() {
                if v != T::zero() {
                    values.push(v);
                    column_indices.push(c + b);
                }
            }
            row_offsets.push(values.len() + b);
        }
        let mut csr = Self::new(rows, columns, values, column_indices, row_offsets, base)?;
        for (c, feature) in table.dictionary().iter().enumerate() {
            csr.dictionary.set_feature_kind(c, feature.kind)?;
        }
        Ok(csr)
    }

    pub fn values(&self) -> &[T] {
        &self.values
    }

    pub fn column_indices(&self) -> &[usize] {
        &self.column_indices
    }

    pub fn row_offsets(&self) -> &[usize] {
        &self.row_offsets
    }

    pub fn index_base(&self) -> IndexBase {
        self.base
    }

    pub fn nnz(&self) -> usize {
        self.values.len()
    }

    /// Column indices (in the table's base) and values of row `row`
    pub fn row(&self, row: usize) -> Option<(&[usize], &[T])> {
        if row >= self.rows {
            return None;
        }
        let range = self.parts().row_range(row);
        Some((&self.column_indices[range.clone()], &self.values[range]))
    }

    fn parts(&self) -> CsrParts<'_> {
        CsrParts {
            rows: self.rows,
            columns: self.columns,
            values: T::as_elements(&self.values),
            column_indices: &self.column_indices,
            row_offsets: &self.row_offsets,
            base: self.base,
        }
    }

    /// Renumber indices and offsets; logical values are unchanged
    pub fn set_index_base(&mut self, base: IndexBase) {
        match (self.base, base) {
            (IndexBase::Zero, IndexBase::One) => {
                self.column_indices.iter_mut().for_each(|c| *c += 1);
                self.row_offsets.iter_mut().for_each(|o| *o += 1);
            }
            (IndexBase::One, IndexBase::Zero) => {
                self.column_indices.iter_mut().for_each(|c| *c -= 1);
                self.row_offsets.iter_mut().for_each(|o| *o -= 1);
            }
            _ => {}
        }
        self.base = base;
    }

    pub fn with_index_base(mut self, base: IndexBase) -> Self {
        self.set_index_base(base);
        self
    }

    /// Owned row-major copy
    pub fn to_dense(&self) -> Result<HomogenNumericTable<'static, T>> {
        let mut dense = HomogenNumericTable::allocated(self.rows, self.columns)?;
        let data = dense
            .data_mut()
            .ok_or(ErrorKind::NullNumericTable)?;
        let parts = self.parts();
        for r in 0..self.rows {
            for k in parts.row_range(r) {
                let at = r * self.columns + parts.column(k);
                data[at] = data[at] + self.values[k];
            }
        }
        dense.with_dictionary(self.dictionary.clone())
    }

    /// `(values, column_indices, row_offsets, base)`
    pub fn into_parts(self) -> (Vec<T>, Vec<usize>, Vec<usize>, IndexBase) {
        (self.values, self.column_indices, self.row_offsets, self.base)
    }

    pub fn into_shared(self) -> TableRef<'static> {
        Arc::new(self)
    }
}

impl<T: Numeric> NumericTable for CsrNumericTable<T> {
    fn rows(&self) -> usize {
        self.rows
    }

    fn columns(&self) -> usize {
        self.columns
    }

    fn layout(&self) -> TableLayout {
        TableLayout::Csr
    }

    fn dictionary(&self) -> &Dictionary {
        &self.dictionary
    }

    fn dictionary_mut(&mut self) -> &mut Dictionary {
        &mut self.dictionary
    }

    fn allocation(&self) -> AllocationState {
        AllocationState::Owned
    }

    fn flags(&self) -> TableFlags {
        TableFlags::all()
    }

    fn gather(
        &self,
        rows: Range<usize>,
        columns: Range<usize>,
        mut out: ElementSliceMut<'_>,
    ) -> Result<()> {
        check_read(self, &rows, &columns)?;
        check_block_len(rows.len(), columns.len(), out.len())?;
        out.fill_f64(0.0);
        let parts = self.parts();
        let width = columns.len();
        crate::with_elements_mut!(out, dst => {
            for (local, r) in rows.enumerate() {
                for k in parts.row_range(r) {
                    let c = parts.column(k);
                    if columns.contains(&c) {
                        let at = local * width + c - columns.start;
                        let [prev, add] = [dst[at], cast_value(self.values[k])];
                        dst[at] = prev + add;
                    }
                }
            }
        });
        Ok(())
    }

    fn scatter(
        &mut self,
        rows: Range<usize>,
        columns: Range<usize>,
        block: ElementSlice<'_>,
    ) -> Result<()> {
        check_write(self, &rows, &columns)?;
        check_block_len(rows.len(), columns.len(), block.len())?;
        let b = self.base.offset();
        let width = columns.len();
        let capacity = checked_len(rows.len(), width)?
            .checked_add(self.nnz())
            .ok_or_else(|| Error::allocation("sparse capacity overflows usize"))?;
        let mut values = try_with_capacity(capacity)?;
        let mut column_indices = try_with_capacity(capacity)?;
        let mut row_offsets = try_with_capacity(self.rows + 1)?;
        row_offsets.push(b);

        let parts = self.parts();
        for r in 0..self.rows {
            let range = parts.row_range(r);
            if !rows.contains(&r) {
                values.extend_from_slice(&self.values[range.clone()]);
                column_indices.extend_from_slice(&self.column_indices[range]);
            } else {
                let local = r - rows.start;
                // block entries go before the first kept entry right of the block
                let split = range
                    .clone()
                    .find(|&k| parts.column(k) >= columns.end)
                    .unwrap_or(range.end);
                let kept = |k: &usize| !columns.contains(&parts.column(*k));
                for k in (range.start..split).filter(kept) {
                    values.push(self.values[k]);
                    column_indices.push(self.column_indices[k]);
                }
                for (j, c) in columns.clone().enumerate() {
                    let v = block.get_f64(local * width + j).unwrap_or(0.0);
                    if v != 0.0 {
                        values.push(T::from_f64(v));
                        column_indices.push(c + b);
                    }
                }
                for k in (split..range.end).filter(kept) {
                    values.push(self.values[k]);
                    column_indices.push(self.column_indices[k]);
                }
            }
            row_offsets.push(values.len() + b);
        }

        self.values = values;
        self.column_indices = column_indices;
        self.row_offsets = row_offsets;
        Ok(())
    }

    fn assign(&mut self, value: f64) -> Result<()> {
        let b = self.base.offset();
        if value == 0.0 {
            self.values.clear();
            self.column_indices.clear();
            self.row_offsets.iter_mut().for_each(|o| *o = b);
            return Ok(());
        }
        let nnz = checked_len(self.rows, self.columns)?;
        let columns = self.columns;
        self.values = try_vec(nnz, T::from_f64(value))?;
        let mut column_indices = try_with_capacity(nnz)?;
        for _ in 0..self.rows {
            column_indices.extend((0..columns).map(|c| c + b));
        }
        self.column_indices = column_indices;
        for (r, offset) in self.row_offsets.iter_mut().enumerate() {
            *offset = r * columns + b;
        }
        Ok(())
    }

    fn allocate(&mut self) -> Result<()> {
        Ok(())
    }

    fn csr(&self) -> Option<CsrParts<'_>> {
        Some(self.parts())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::TableExt;

    fn three_by_two() -> CsrNumericTable<f64> {
        CsrNumericTable::new(
            3,
            2,
            vec![1.0, 2.0, 3.0],
            vec![1, 2, 1],
            vec![1, 2, 3, 4],
            IndexBase::One,
        )
        .unwrap()
    }

    #[test]
    fn test_densify_one_based() {
        let table = three_by_two();
        assert_eq!(table.nnz(), 3);
        assert_eq!(table.layout(), TableLayout::Csr);
        let dense = table.read_all::<f64>().unwrap();
        assert_eq!(&*dense, &[1.0, 0.0, 0.0, 2.0, 3.0, 0.0]);

        let dense = table.to_dense().unwrap();
        assert_eq!(dense.data(), Some(&[1.0, 0.0, 0.0, 2.0, 3.0, 0.0][..]));
    }

    #[test]
    fn test_index_base_conversion() {
        let one = three_by_two();
        let zero = one.clone().with_index_base(IndexBase::Zero);
        assert_eq!(zero.column_indices(), &[0, 1, 0]);
        assert_eq!(zero.row_offsets(), &[0, 1, 2, 3]);
        assert_eq!(
            zero.read_all::<f64>().unwrap().to_vec(),
            one.read_all::<f64>().unwrap().to_vec()
        );

        let back = zero.with_index_base(IndexBase::One);
        assert_eq!(back.column_indices(), one.column_indices());
        assert_eq!(back.row_offsets(), one.row_offsets());
    }

    #[test]
    fn test_validation() {
        let kind = |r: Result<CsrNumericTable<f64>>| r.unwrap_err().kind();

        // offsets length
        assert_eq!(
            kind(CsrNumericTable::new(2, 2, vec![1.0], vec![1], vec![1, 2], IndexBase::One)),
            ErrorKind::IncorrectRowOffsets
        );
        // first offset must equal the base
        assert_eq!(
            kind(CsrNumericTable::new(1, 2, vec![1.0], vec![1], vec![0, 1], IndexBase::One)),
            ErrorKind::IncorrectRowOffsets
        );
        // decreasing
        assert_eq!(
            kind(CsrNumericTable::new(
                2,
                2,
                vec![1.0],
                vec![0],
                vec![0, 2, 1],
                IndexBase::Zero
            )),
            ErrorKind::IncorrectRowOffsets
        );
        // last offset disagrees with nnz
        assert_eq!(
            kind(CsrNumericTable::new(1, 2, vec![1.0, 2.0], vec![0, 1], vec![0, 1], IndexBase::Zero)),
            ErrorKind::IncorrectRowOffsets
        );
        // index out of range (one-based 0 and 3 in a 2-column table)
        assert_eq!(
            kind(CsrNumericTable::new(1, 2, vec![1.0], vec![0], vec![1, 2], IndexBase::One)),
            ErrorKind::IncorrectSparseIndices
        );
        assert_eq!(
            kind(CsrNumericTable::new(1, 2, vec![1.0], vec![3], vec![1, 2], IndexBase::One)),
            ErrorKind::IncorrectSparseIndices
        );
        // zero-based 2 in a 2-column table
        assert_eq!(
            kind(CsrNumericTable::new(1, 2, vec![1.0, 2.0], vec![1, 2], vec![0, 2], IndexBase::Zero)),
            ErrorKind::IncorrectSparseIndices
        );
        // values and indices differ in length
        assert_eq!(
            kind(CsrNumericTable::new(1, 2, vec![1.0], vec![0, 1], vec![0, 2], IndexBase::Zero)),
            ErrorKind::IncorrectSizeOfArray
        );
    }

    #[test]
    fn test_unordered_and_repeated_indices() {
        let table =
            CsrNumericTable::<f64>::new(1, 3, vec![1.0, 2.0], vec![3, 2], vec![1, 3], IndexBase::One)
                .unwrap();
        assert_eq!(table.read_all::<f64>().unwrap().to_vec(), vec![0.0, 2.0, 1.0]);
        assert_eq!(table.to_dense().unwrap().data(), Some(&[0.0, 2.0, 1.0][..]));
        assert_eq!(&*table.read_block::<f32>(0..1, 1..3).unwrap(), &[2.0f32, 1.0]);

        let repeated =
            CsrNumericTable::<f64>::new(1, 2, vec![1.0, 2.0], vec![1, 1], vec![0, 2], IndexBase::Zero)
                .unwrap();
        assert_eq!(repeated.read_all::<f64>().unwrap().to_vec(), vec![0.0, 3.0]);
    }

    #[test]
    fn test_scatter_keeps_unordered_entries() {
        // row 0 stores columns 3, 0, 2 (zero-based)
        let mut table = CsrNumericTable::<f64>::new(
            1,
            4,
            vec![4.0, 1.0, 3.0],
            vec![3, 0, 2],
            vec![0, 3],
            IndexBase::Zero,
        )
        .unwrap();
        table.write_from::<f64>(0..1, 1..3, &[5.0, 0.0]).unwrap();
        assert_eq!(table.read_all::<f64>().unwrap().to_vec(), vec![1.0, 5.0, 0.0, 4.0]);
        assert_eq!(table.column_indices(), &[1, 3, 0]);
        assert_eq!(table.values(), &[5.0, 4.0, 1.0]);
    }

    #[test]
    fn test_sub_block_read() {
        let table = three_by_two();
        let block = table.read_block::<f32>(1..3, 0..1).unwrap();
        assert_eq!(&*block, &[0.0f32, 3.0]);
    }

    #[test]
    fn test_scatter_rebuilds_rows() {
        let mut table = three_by_two();
        {
            let mut block = table.write_block::<f64>(1..2, 0..2).unwrap();
            assert!(!block.is_direct());
            block.copy_from_slice(&[5.0, 0.0]);
        }
        assert_eq!(table.row_offsets(), &[1, 2, 3, 4]);
        assert_eq!(table.column_indices(), &[1, 1, 1]);
        assert_eq!(table.values(), &[1.0, 5.0, 3.0]);

        table.write_from::<f64>(0..1, 1..2, &[7.0]).unwrap();
        assert_eq!(table.row(0), Some((&[1, 2][..], &[1.0, 7.0][..])));
        assert_eq!(table.nnz(), 4);
        assert_eq!(
            table.read_all::<f64>().unwrap().to_vec(),
            vec![1.0, 7.0, 5.0, 0.0, 3.0, 0.0]
        );
    }

    #[test]
    fn test_assign() {
        let mut table = three_by_two();
        table.assign(2.0).unwrap();
        assert_eq!(table.nnz(), 6);
        assert_eq!(table.row_offsets(), &[1, 3, 5, 7]);
        assert_eq!(table.read_all::<f64>().unwrap().to_vec(), vec![2.0; 6]);

        table.assign(0.0).unwrap();
        assert_eq!(table.nnz(), 0);
        assert_eq!(table.row_offsets(), &[1, 1, 1, 1]);
    }

    #[test]
    fn test_from_dense_and_parts() {
        let dense = HomogenNumericTable::from_vec(2, 3, vec![0i32, 4, 0, 5, 0, 6]).unwrap();
        let csr = CsrNumericTable::<f32>::from_dense(&dense, IndexBase::Zero).unwrap();
        assert_eq!(csr.values(), &[4.0, 5.0, 6.0]);
        assert_eq!(csr.column_indices(), &[1, 0, 2]);
        assert_eq!(csr.row_offsets(), &[0, 1, 3]);

        let parts = csr.csr().unwrap();
        assert_eq!(parts.nnz(), 3);
        assert_eq!(parts.row_range(1), 1..3);
        assert_eq!(parts.values_as::<f32>().unwrap(), &[4.0, 5.0, 6.0]);
        let err = parts.values_as::<f64>().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::IncorrectTypeOfInput);

        let empty = CsrNumericTable::<f64>::empty(2, 2, IndexBase::One).unwrap();
        assert_eq!(empty.row_offsets(), &[1, 1, 1]);
        assert_eq!(empty.read_all::<f64>().unwrap().to_vec(), vec![0.0; 4]);
    }
}
