//! Column-major table: one independently typed buffer per column

use super::storage::Storage;
use super::{
    check_block_len, check_read, check_write, AllocationState, NumericTable, TableFlags,
    TableLayout, TableRef,
};
use crate::dictionary::{Dictionary, FeatureInfo};
use crate::error::{Error, ErrorKind, Result};
use crate::numeric::{
    collect_from, spread_into, DataType, ElementSlice, ElementSliceMut, ElementVec, Numeric,
};
use std::ops::Range;
use std::sync::Arc;

#[derive(Debug)]
enum Column<'a> {
    F32(Storage<'a, f32>),
    F64(Storage<'a, f64>),
    I32(Storage<'a, i32>),
}

macro_rules! with_column {
    ($column:expr, $s:ident => $body:expr) => {
        match $column {
            Column::F32($s) => $body,
            Column::F64($s) => $body,
            Column::I32($s) => $body,
        }
    };
}

impl<'a> Column<'a> {
    fn not_allocated(data_type: DataType) -> Self {
        match data_type {
            DataType::F32 => Self::F32(Storage::NotAllocated),
            DataType::F64 => Self::F64(Storage::NotAllocated),
            DataType::I32 => Self::I32(Storage::NotAllocated),
        }
    }

    fn owned(values: ElementVec) -> Self {
        match values {
            ElementVec::F32(v) => Self::F32(Storage::Owned(v)),
            ElementVec::F64(v) => Self::F64(Storage::Owned(v)),
            ElementVec::I32(v) => Self::I32(Storage::Owned(v)),
        }
    }

    fn borrowed(values: ElementSlice<'a>) -> Self {
        match values {
            ElementSlice::F32(s) => Self::F32(Storage::Borrowed(s)),
            ElementSlice::F64(s) => Self::F64(Storage::Borrowed(s)),
            ElementSlice::I32(s) => Self::I32(Storage::Borrowed(s)),
        }
    }

    fn borrowed_mut(values: ElementSliceMut<'a>) -> Self {
        match values {
            ElementSliceMut::F32(s) => Self::F32(Storage::BorrowedMut(s)),
            ElementSliceMut::F64(s) => Self::F64(Storage::BorrowedMut(s)),
            ElementSliceMut::I32(s) => Self::I32(Storage::BorrowedMut(s)),
        }
    }

    fn as_elements(&self) -> Option<ElementSlice<'_>> {
        match self {
            Self::F32(s) => s.as_slice().map(ElementSlice::F32),
            Self::F64(s) => s.as_slice().map(ElementSlice::F64),
            Self::I32(s) => s.as_slice().map(ElementSlice::I32),
        }
    }

    fn as_elements_mut(&mut self) -> Option<ElementSliceMut<'_>> {
        match self {
            Self::F32(s) => s.as_mut_slice().map(ElementSliceMut::F32),
            Self::F64(s) => s.as_mut_slice().map(ElementSliceMut::F64),
            Self::I32(s) => s.as_mut_slice().map(ElementSliceMut::I32),
        }
    }

    fn allocation(&self) -> AllocationState {
        with_column!(self, s => s.allocation())
    }

    fn flags(&self) -> TableFlags {
        with_column!(self, s => s.flags())
    }

    fn allocate(&mut self, len: usize) -> Result<()> {
        with_column!(self, s => s.allocate(len))
    }
}

/// Structure-of-arrays table
///
/// Each column carries its own storage type (recorded in the dictionary) and
/// may be owned or borrowed independently of the others.
#[derive(Debug)]
pub struct SoaNumericTable<'a> {
    rows: usize,
    columns: Vec<Column<'a>>,
    dictionary: Dictionary,
}

impl<'a> SoaNumericTable<'a> {
    /// Shape only; column storage types come from `dictionary`
    pub fn new(rows: usize, dictionary: Dictionary) -> Self {
        let columns = dictionary
            .iter()
            .map(|f| Column::not_allocated(f.data_type))
            .collect();
        Self {
            rows,
            columns,
            dictionary,
        }
    }

    /// `columns` not-allocated continuous columns of one type
    pub fn not_allocated(rows: usize, columns: usize, data_type: DataType) -> Self {
        Self::new(rows, Dictionary::homogeneous(columns, data_type))
    }

    /// Owned table from a list of equally long columns
    pub fn from_columns<T: Numeric>(rows: usize, columns: Vec<Vec<T>>) -> Result<Self> {
        let mut table = Self::not_allocated(rows, columns.len(), T::DATA_TYPE);
        for (index, values) in columns.into_iter().enumerate() {
            table.set_column(index, values)?;
        }
        Ok(table)
    }

    fn check_column(&self, index: usize, len: usize) -> Result<()> {
        if index >= self.columns.len() {
            return Err(Error::with_detail(
                ErrorKind::IncorrectNumberOfColumns,
                "column",
                format!("column {index} outside table of {} columns", self.columns.len()),
            ));
        }
        if len != self.rows {
            return Err(Error::size_mismatch(self.rows, len, "column"));
        }
        Ok(())
    }

    fn install(&mut self, index: usize, column: Column<'a>, data_type: DataType) -> Result<()> {
        // kind and categories survive a change of storage type
        self.dictionary.set_data_type(index, data_type)?;
        self.columns[index] = column;
        Ok(())
    }

    /// Give column `index` owned storage
    pub fn set_column<T: Numeric>(&mut self, index: usize, values: Vec<T>) -> Result<()> {
        self.check_column(index, values.len())?;
        self.install(index, Column::owned(T::into_element_vec(values)), T::DATA_TYPE)
    }

    /// Point column `index` at read-only caller memory
    pub fn wrap_column<T: Numeric>(&mut self, index: usize, values: &'a [T]) -> Result<()> {
        self.check_column(index, values.len())?;
        self.install(index, Column::borrowed(T::as_elements(values)), T::DATA_TYPE)
    }

    /// Point column `index` at writable caller memory
    pub fn wrap_column_mut<T: Numeric>(&mut self, index: usize, values: &'a mut [T]) -> Result<()> {
        self.check_column(index, values.len())?;
        self.install(
            index,
            Column::borrowed_mut(T::as_elements_mut(values)),
            T::DATA_TYPE,
        )
    }

    /// Column `index` if it is stored as `T`
    pub fn column<T: Numeric>(&self, index: usize) -> Option<&[T]> {
        self.columns.get(index)?.as_elements().and_then(T::narrow)
    }

    pub fn feature(&self, index: usize) -> Option<&FeatureInfo> {
        self.dictionary.feature(index)
    }

    pub fn into_shared(self) -> TableRef<'a> {
        Arc::new(self)
    }
}

impl NumericTable for SoaNumericTable<'_> {
    fn rows(&self) -> usize {
        self.rows
    }

    fn columns(&self) -> usize {
        self.columns.len()
    }

    fn layout(&self) -> TableLayout {
        TableLayout::ColumnMajor
    }

    fn dictionary(&self) -> &Dictionary {
        &self.dictionary
    }

    fn dictionary_mut(&mut self) -> &mut Dictionary {
        &mut self.dictionary
    }

    fn allocation(&self) -> AllocationState {
        let states: Vec<_> = self.columns.iter().map(Column::allocation).collect();
        if states.contains(&AllocationState::NotAllocated) {
            AllocationState::NotAllocated
        } else if states.contains(&AllocationState::UserProvided) {
            AllocationState::UserProvided
        } else {
            AllocationState::Owned
        }
    }

    fn flags(&self) -> TableFlags {
        self.columns
            .iter()
            .fold(TableFlags::all(), |acc, c| acc & c.flags())
    }

    fn gather(
        &self,
        rows: Range<usize>,
        columns: Range<usize>,
        mut out: ElementSliceMut<'_>,
    ) -> Result<()> {
        check_read(self, &rows, &columns)?;
        check_block_len(rows.len(), columns.len(), out.len())?;
        let width = columns.len();
        for (j, c) in columns.enumerate() {
            let src = self.columns[c]
                .as_elements()
                .and_then(|e| e.slice(rows.clone()))
                .ok_or(ErrorKind::NullNumericTable)?;
            crate::with_elements!(src, s => {
                crate::with_elements_mut!(out.reborrow(), d => spread_into(s, d, j, width))
            });
        }
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
        let width = columns.len();
        for (j, c) in columns.enumerate() {
            let dst = self.columns[c]
                .as_elements_mut()
                .ok_or(ErrorKind::ReadOnlyNumericTable)?;
            crate::with_elements_mut!(dst, d => {
                crate::with_elements!(block, b => collect_from(b, j, width, &mut d[rows.clone()]))
            });
        }
        Ok(())
    }

    fn assign(&mut self, value: f64) -> Result<()> {
        check_write(self, &(0..self.rows), &(0..self.columns.len()))?;
        for column in &mut self.columns {
            if let Some(mut elements) = column.as_elements_mut() {
                elements.fill_f64(value);
            }
        }
        Ok(())
    }

    fn allocate(&mut self) -> Result<()> {
        let rows = self.rows;
        self.columns.iter_mut().try_for_each(|c| c.allocate(rows))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dictionary::FeatureKind;
    use crate::table::TableExt;

    #[test]
    fn test_heterogeneous_columns() {
        let mut table = SoaNumericTable::not_allocated(3, 3, DataType::F64);
        table.set_column(0, vec![1.0f64, 2.0, 3.0]).unwrap();
        table.set_column(1, vec![4.0f32, 5.0, 6.0]).unwrap();
        table.set_column(2, vec![7i32, 8, 9]).unwrap();

        assert_eq!(table.layout(), TableLayout::ColumnMajor);
        assert_eq!(table.dictionary().is_homogeneous(), None);
        assert_eq!(table.feature(1).unwrap().data_type, DataType::F32);
        assert_eq!(table.column::<i32>(2), Some(&[7, 8, 9][..]));
        assert_eq!(table.column::<f64>(2), None);

        let block = table.read_rows::<f64>(0..3).unwrap();
        assert!(!block.is_borrowed());
        assert_eq!(&*block, &[1.0, 4.0, 7.0, 2.0, 5.0, 8.0, 3.0, 6.0, 9.0]);
    }

    #[test]
    fn test_partial_allocation() {
        let mut table = SoaNumericTable::not_allocated(2, 2, DataType::F32);
        table.set_column(0, vec![1.0f32, 2.0]).unwrap();
        assert_eq!(table.allocation(), AllocationState::NotAllocated);
        let err = table.read_rows::<f32>(0..1).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NullNumericTable);

        table.allocate().unwrap();
        assert_eq!(table.allocation(), AllocationState::Owned);
        assert_eq!(table.column::<f32>(1), Some(&[0.0, 0.0][..]));
    }

    #[test]
    fn test_borrowed_columns() {
        let a = [1.0f64, 2.0];
        let mut b = [0i32, 0];
        {
            let mut table = SoaNumericTable::not_allocated(2, 2, DataType::F64);
            table.wrap_column(0, &a).unwrap();
            table.wrap_column_mut(1, &mut b).unwrap();
            assert_eq!(table.allocation(), AllocationState::UserProvided);
            assert!(!table.flags().contains(TableFlags::WRITE));
            let err = table.write_rows::<f64>(0..1).unwrap_err();
            assert_eq!(err.kind(), ErrorKind::ReadOnlyNumericTable);
        }
        {
            let mut table = SoaNumericTable::not_allocated(2, 1, DataType::I32);
            table.wrap_column_mut(0, &mut b).unwrap();
            let mut block = table.write_rows::<f64>(0..2).unwrap();
            block.copy_from_slice(&[3.0, 4.0]);
        }
        assert_eq!(b, [3, 4]);
    }

    #[test]
    fn test_wrong_column_length() {
        let mut table = SoaNumericTable::not_allocated(3, 1, DataType::F64);
        let err = table.set_column(0, vec![1.0f64]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::IncorrectSizeOfArray);
        let err = table.set_column(1, vec![1.0f64; 3]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::IncorrectNumberOfColumns);
    }

    #[test]
    fn test_feature_kind_survives_set_column() {
        let mut dict = Dictionary::homogeneous(1, DataType::F64);
        dict.set_feature_kind(0, FeatureKind::Ordinal).unwrap();
        let mut table = SoaNumericTable::new(2, dict);
        table.set_column(0, vec![1i32, 2]).unwrap();
        let feature = table.feature(0).unwrap();
        assert_eq!(feature.kind, FeatureKind::Ordinal);
        assert_eq!(feature.data_type, DataType::I32);
    }
}
