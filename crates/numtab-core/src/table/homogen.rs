//! Dense row-major table with one storage type

use super::storage::Storage;
use super::{
    check_block_len, check_read, check_write, AllocationState, NumericTable, TableFlags,
    TableLayout, TableRef,
};
use crate::alloc::checked_len;
use crate::dictionary::Dictionary;
use crate::error::{Error, ErrorKind, Result};
use crate::numeric::{convert_slice, ElementSlice, ElementSliceMut, Numeric};
use std::ops::Range;
use std::sync::Arc;

/// Row-major table of `T` elements
///
/// Storage is either owned, borrowed from the caller (read-only or writable)
/// or not yet allocated.
#[derive(Debug)]
pub struct HomogenNumericTable<'a, T: Numeric> {
    rows: usize,
    columns: usize,
    storage: Storage<'a, T>,
    dictionary: Dictionary,
}

impl<'a, T: Numeric> HomogenNumericTable<'a, T> {
    fn with_storage(rows: usize, columns: usize, storage: Storage<'a, T>) -> Self {
        Self {
            rows,
            columns,
            storage,
            dictionary: Dictionary::homogeneous(columns, T::DATA_TYPE),
        }
    }

    /// Shape only; call [`NumericTable::allocate`] before accessing data
    pub fn not_allocated(rows: usize, columns: usize) -> Self {
        Self::with_storage(rows, columns, Storage::NotAllocated)
    }

    /// Owned storage, zero-initialized
    pub fn allocated(rows: usize, columns: usize) -> Result<Self> {
        let len = checked_len(rows, columns)?;
        Ok(Self::with_storage(rows, columns, Storage::zeroed(len)?))
    }

    /// Take ownership of row-major `data`
    pub fn from_vec(rows: usize, columns: usize, data: Vec<T>) -> Result<Self> {
        check_block_len(rows, columns, data.len())?;
        Ok(Self::with_storage(rows, columns, Storage::Owned(data)))
    }

    /// Read-only view over caller memory
    pub fn wrap(rows: usize, columns: usize, data: &'a [T]) -> Result<Self> {
        check_block_len(rows, columns, data.len())?;
        Ok(Self::with_storage(rows, columns, Storage::Borrowed(data)))
    }

    /// Writable view over caller memory
    pub fn wrap_mut(rows: usize, columns: usize, data: &'a mut [T]) -> Result<Self> {
        check_block_len(rows, columns, data.len())?;
        Ok(Self::with_storage(rows, columns, Storage::BorrowedMut(data)))
    }

    /// Replace the dictionary; it must describe `columns` features of type `T`
    pub fn with_dictionary(mut self, dictionary: Dictionary) -> Result<Self> {
        if dictionary.len() != self.columns {
            return Err(Error::size_mismatch(self.columns, dictionary.len(), "dictionary"));
        }
        if dictionary.is_homogeneous() != Some(T::DATA_TYPE) && self.columns > 0 {
            return Err(Error::with_detail(
                ErrorKind::IncorrectTypeOfInput,
                "dictionary",
                format!("every feature must be stored as {}", T::DATA_TYPE),
            ));
        }
        self.dictionary = dictionary;
        Ok(self)
    }

    pub fn into_shared(self) -> TableRef<'a> {
        Arc::new(self)
    }

    /// All elements, row-major
    pub fn data(&self) -> Option<&[T]> {
        self.storage.as_slice()
    }

    pub fn data_mut(&mut self) -> Option<&mut [T]> {
        self.storage.as_mut_slice()
    }

    pub fn row(&self, index: usize) -> Option<&[T]> {
        let columns = self.columns;
        self.data()?.get(index * columns..(index + 1) * columns)
    }

    pub fn get(&self, row: usize, column: usize) -> Option<T> {
        if column >= self.columns {
            return None;
        }
        self.row(row).map(|r| r[column])
    }

    /// Owned storage, or a copy of borrowed storage
    pub fn into_vec(self) -> Option<Vec<T>> {
        match self.storage {
            Storage::Owned(v) => Some(v),
            Storage::Borrowed(s) => Some(s.to_vec()),
            Storage::BorrowedMut(s) => Some(s.to_vec()),
            Storage::NotAllocated => None,
        }
    }
}

impl<T: Numeric> NumericTable for HomogenNumericTable<'_, T> {
    fn rows(&self) -> usize {
        self.rows
    }

    fn columns(&self) -> usize {
        self.columns
    }

    fn layout(&self) -> TableLayout {
        TableLayout::RowMajor
    }

    fn dictionary(&self) -> &Dictionary {
        &self.dictionary
    }

    fn dictionary_mut(&mut self) -> &mut Dictionary {
        &mut self.dictionary
    }

    fn allocation(&self) -> AllocationState {
        self.storage.allocation()
    }

    fn flags(&self) -> TableFlags {
        self.storage.flags()
    }

    fn row_slice(&self) -> Option<ElementSlice<'_>> {
        self.storage.as_slice().map(T::as_elements)
    }

    fn row_slice_mut(&mut self) -> Option<ElementSliceMut<'_>> {
        self.storage.as_mut_slice().map(T::as_elements_mut)
    }

    fn gather(
        &self,
        rows: Range<usize>,
        columns: Range<usize>,
        out: ElementSliceMut<'_>,
    ) -> Result<()> {
        check_read(self, &rows, &columns)?;
        check_block_len(rows.len(), columns.len(), out.len())?;
        let data = self.storage.as_slice().ok_or(ErrorKind::NullNumericTable)?;
        let width = columns.len();
        if width == 0 {
            return Ok(());
        }
        crate::with_elements_mut!(out, dst => {
            for (r, out_row) in rows.zip(dst.chunks_exact_mut(width)) {
                let start = r * self.columns;
                convert_slice(&data[start + columns.start..start + columns.end], out_row);
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
        let n_columns = self.columns;
        let data = self
            .storage
            .as_mut_slice()
            .ok_or(ErrorKind::ReadOnlyNumericTable)?;
        let width = columns.len();
        if width == 0 {
            return Ok(());
        }
        crate::with_elements!(block, src => {
            for (r, src_row) in rows.zip(src.chunks_exact(width)) {
                let start = r * n_columns;
                convert_slice(src_row, &mut data[start + columns.start..start + columns.end]);
            }
        });
        Ok(())
    }

    fn assign(&mut self, value: f64) -> Result<()> {
        check_write(self, &(0..self.rows), &(0..self.columns))?;
        let data = self
            .storage
            .as_mut_slice()
            .ok_or(ErrorKind::ReadOnlyNumericTable)?;
        data.fill(T::from_f64(value));
        Ok(())
    }

    fn allocate(&mut self) -> Result<()> {
        let len = checked_len(self.rows, self.columns)?;
        self.storage.allocate(len)
    }
}
