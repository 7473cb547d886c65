//! Numeric tables and the block accessor protocol
//!
//! A table has a logical shape (rows x columns), a [`TableLayout`] and a
//! [`Dictionary`]. Algorithms never touch storage directly; they ask for a
//! block of rows (and optionally a column sub-range) as a dense row-major
//! buffer of the element type they compute in:
//!
//! - Row-major storage of the requested type, covering full rows, is handed
//!   out as a borrowed slice.
//! - Anything else (column sub-range, column-major, CSR, type conversion) is
//!   materialized into a conversion buffer. Write blocks copy the buffer back
//!   on [`WriteBlock::commit`] or on drop.
//!
//! ```
//! use numtab_core::table::{HomogenNumericTable, TableExt};
//!
//! let data = [1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0, 9.0, 10.0, 11.0, 12.0];
//! let table = HomogenNumericTable::wrap(4, 3, &data).unwrap();
//! let block = table.read_block::<f64>(1..3, 1..3).unwrap();
//! assert_eq!(&*block, &[5.0, 6.0, 8.0, 9.0]);
//! ```

mod csr;
mod homogen;
mod merged;
mod snapshot;
mod soa;
mod storage;

pub use csr::{CsrNumericTable, CsrParts, IndexBase};
pub use homogen::HomogenNumericTable;
pub use merged::MergedNumericTable;
pub use snapshot::{SparseSnapshot, TableSnapshot};
pub use soa::SoaNumericTable;

use crate::alloc::{checked_len, try_zeroed};
use crate::dictionary::Dictionary;
use crate::error::{Error, ErrorKind, Result};
use crate::numeric::{ElementSlice, ElementSliceMut, Numeric};
use bitflags::bitflags;
use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::fmt;
use std::ops::{Deref, DerefMut, Range};
use std::sync::Arc;

/// Physical arrangement of a table's elements
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TableLayout {
    /// Dense, one contiguous buffer, rows adjacent
    RowMajor,
    /// Dense, one buffer per column (structure of arrays)
    ColumnMajor,
    /// Compressed sparse row
    Csr,
}

/// Who owns a table's storage
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AllocationState {
    /// Shape only
    NotAllocated,
    /// Storage allocated and freed by the table
    Owned,
    /// Storage borrowed from the caller
    UserProvided,
}

bitflags! {
    /// Capabilities of a table in its current allocation state
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct TableFlags: u8 {
        const READ = 1;
        const WRITE = 1 << 1;
        const ALLOCATED = 1 << 2;
        const OWNS_MEMORY = 1 << 3;
    }
}

/// Shared handle to a table
pub type TableRef<'a> = Arc<dyn NumericTable + 'a>;

/// Object-safe table interface
///
/// `gather` and `scatter` move a dense row-major block between the table and a
/// type-erased buffer of `rows.len() * columns.len()` elements. Generic,
/// typed access is layered on top by [`TableExt`].
pub trait NumericTable: Send + Sync + fmt::Debug {
    fn rows(&self) -> usize;

    fn columns(&self) -> usize;

    fn layout(&self) -> TableLayout;

    fn dictionary(&self) -> &Dictionary;

    fn dictionary_mut(&mut self) -> &mut Dictionary;

    fn allocation(&self) -> AllocationState;

    fn flags(&self) -> TableFlags;

    /// Contiguous row-major storage, if the table has it
    fn row_slice(&self) -> Option<ElementSlice<'_>> {
        None
    }

    fn row_slice_mut(&mut self) -> Option<ElementSliceMut<'_>> {
        None
    }

    /// Copy a block into `out`, converting to its element type
    fn gather(&self, rows: Range<usize>, columns: Range<usize>, out: ElementSliceMut<'_>)
        -> Result<()>;

    /// Copy `block` into the table, converting to the storage type
    fn scatter(&mut self, rows: Range<usize>, columns: Range<usize>, block: ElementSlice<'_>)
        -> Result<()>;

    /// Set every element to `value`
    fn assign(&mut self, value: f64) -> Result<()>;

    /// Allocate zeroed owned storage for a not-allocated table; no-op otherwise
    fn allocate(&mut self) -> Result<()>;

    /// The three CSR arrays, for CSR tables
    fn csr(&self) -> Option<CsrParts<'_>> {
        None
    }
}

pub(crate) fn check_bounds(
    n_rows: usize,
    n_columns: usize,
    rows: &Range<usize>,
    columns: &Range<usize>,
) -> Result<()> {
    if rows.start > rows.end || rows.end > n_rows {
        return Err(Error::with_detail(
            ErrorKind::IncorrectNumberOfRows,
            "rows",
            format!("rows {rows:?} outside table of {n_rows} rows"),
        ));
    }
    if columns.start > columns.end || columns.end > n_columns {
        return Err(Error::with_detail(
            ErrorKind::IncorrectNumberOfColumns,
            "columns",
            format!("columns {columns:?} outside table of {n_columns} columns"),
        ));
    }
    Ok(())
}

/// Allocation and bounds checks shared by every read path
pub(crate) fn check_read<N: NumericTable + ?Sized>(
    table: &N,
    rows: &Range<usize>,
    columns: &Range<usize>,
) -> Result<()> {
    if !table.flags().contains(TableFlags::ALLOCATED) {
        return Err(Error::new(ErrorKind::NullNumericTable));
    }
    check_bounds(table.rows(), table.columns(), rows, columns)
}

/// As [`check_read`], additionally requiring write access
pub(crate) fn check_write<N: NumericTable + ?Sized>(
    table: &N,
    rows: &Range<usize>,
    columns: &Range<usize>,
) -> Result<()> {
    let flags = table.flags();
    if !flags.contains(TableFlags::ALLOCATED) {
        return Err(Error::new(ErrorKind::NullNumericTable));
    }
    if !flags.contains(TableFlags::WRITE) {
        return Err(Error::new(ErrorKind::ReadOnlyNumericTable));
    }
    check_bounds(table.rows(), table.columns(), rows, columns)
}

pub(crate) fn check_block_len(expected_rows: usize, expected_columns: usize, len: usize) -> Result<()> {
    let expected = checked_len(expected_rows, expected_columns)?;
    if expected != len {
        return Err(Error::size_mismatch(expected, len, "block"));
    }
    Ok(())
}

/// Dense row-major view of a block, borrowed or converted
#[derive(Debug)]
pub struct ReadBlock<'t, T: Numeric> {
    data: Cow<'t, [T]>,
    rows: Range<usize>,
    columns: Range<usize>,
}

impl<'t, T: Numeric> ReadBlock<'t, T> {
    pub fn rows(&self) -> Range<usize> {
        self.rows.clone()
    }

    pub fn columns(&self) -> Range<usize> {
        self.columns.clone()
    }

    /// Elements per row of the block
    pub fn width(&self) -> usize {
        self.columns.len()
    }

    /// Row `index` of the block, counted from the first row of the block
    pub fn row(&self, index: usize) -> Option<&[T]> {
        let width = self.width();
        self.data.get(index * width..(index + 1) * width)
    }

    /// Whether the view points straight into table storage
    pub fn is_borrowed(&self) -> bool {
        matches!(self.data, Cow::Borrowed(_))
    }

    pub fn into_vec(self) -> Vec<T> {
        self.data.into_owned()
    }
}

impl<T: Numeric> Deref for ReadBlock<'_, T> {
    type Target = [T];

    fn deref(&self) -> &[T] {
        &self.data
    }
}

enum WriteState<'t, T, N: ?Sized> {
    Direct(&'t mut [T]),
    Staged { table: &'t mut N, buffer: Vec<T> },
    Released,
}

/// Dense row-major read-write view of a block
///
/// A staged view holds a conversion buffer that is written back to the table
/// by [`commit`](Self::commit), or by drop if the view is never committed.
pub struct WriteBlock<'t, T: Numeric, N: NumericTable + ?Sized> {
    state: WriteState<'t, T, N>,
    rows: Range<usize>,
    columns: Range<usize>,
}

impl<'t, T: Numeric, N: NumericTable + ?Sized> WriteBlock<'t, T, N> {
    pub fn rows(&self) -> Range<usize> {
        self.rows.clone()
    }

    pub fn columns(&self) -> Range<usize> {
        self.columns.clone()
    }

    pub fn width(&self) -> usize {
        self.columns.len()
    }

    pub fn row_mut(&mut self, index: usize) -> Option<&mut [T]> {
        let width = self.width();
        self.get_mut(index * width..(index + 1) * width)
    }

    /// Whether writes go straight into table storage
    pub fn is_direct(&self) -> bool {
        matches!(self.state, WriteState::Direct(_))
    }

    /// Write the block back and release the view, reporting failures
    pub fn commit(mut self) -> Result<()> {
        self.release()
    }

    fn release(&mut self) -> Result<()> {
        match std::mem::replace(&mut self.state, WriteState::Released) {
            WriteState::Staged { table, buffer } => {
                table.scatter(self.rows.clone(), self.columns.clone(), T::as_elements(&buffer))
            }
            WriteState::Direct(_) | WriteState::Released => Ok(()),
        }
    }
}

impl<T: Numeric, N: NumericTable + ?Sized> Deref for WriteBlock<'_, T, N> {
    type Target = [T];

    fn deref(&self) -> &[T] {
        match &self.state {
            WriteState::Direct(slice) => &**slice,
            WriteState::Staged { buffer, .. } => buffer.as_slice(),
            WriteState::Released => &[],
        }
    }
}

impl<T: Numeric, N: NumericTable + ?Sized> DerefMut for WriteBlock<'_, T, N> {
    fn deref_mut(&mut self) -> &mut [T] {
        match &mut self.state {
            WriteState::Direct(slice) => &mut **slice,
            WriteState::Staged { buffer, .. } => buffer.as_mut_slice(),
            WriteState::Released => &mut [],
        }
    }
}

impl<T: Numeric, N: NumericTable + ?Sized> Drop for WriteBlock<'_, T, N> {
    fn drop(&mut self) {
        if let Err(err) = self.release() {
            log::error!(
                "write-back of block rows {:?} columns {:?} failed: {err}",
                self.rows,
                self.columns
            );
        }
    }
}

impl<T: Numeric, N: NumericTable + ?Sized> fmt::Debug for WriteBlock<'_, T, N> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WriteBlock")
            .field("rows", &self.rows)
            .field("columns", &self.columns)
            .field("direct", &self.is_direct())
            .finish()
    }
}

/// Typed block access for every table
pub trait TableExt: NumericTable {
    /// Read `rows` x `columns` as row-major elements of type `T`
    fn read_block<T: Numeric>(
        &self,
        rows: Range<usize>,
        columns: Range<usize>,
    ) -> Result<ReadBlock<'_, T>> {
        check_read(self, &rows, &columns)?;
        let width = columns.len();
        if columns.start == 0 && columns.end == self.columns() {
            if let Some(slice) = self.row_slice().and_then(T::narrow) {
                let data = &slice[rows.start * width..rows.end * width];
                return Ok(ReadBlock {
                    data: Cow::Borrowed(data),
                    rows,
                    columns,
                });
            }
        }
        let mut buffer = try_zeroed::<T>(checked_len(rows.len(), width)?)?;
        self.gather(rows.clone(), columns.clone(), T::as_elements_mut(&mut buffer))?;
        Ok(ReadBlock {
            data: Cow::Owned(buffer),
            rows,
            columns,
        })
    }

    fn read_rows<T: Numeric>(&self, rows: Range<usize>) -> Result<ReadBlock<'_, T>> {
        let columns = self.columns();
        self.read_block(rows, 0..columns)
    }

    /// The whole table as one block
    fn read_all<T: Numeric>(&self) -> Result<ReadBlock<'_, T>> {
        let rows = self.rows();
        self.read_rows(0..rows)
    }

    /// Read-write view of `rows` x `columns`, pre-filled with current values
    fn write_block<T: Numeric>(
        &mut self,
        rows: Range<usize>,
        columns: Range<usize>,
    ) -> Result<WriteBlock<'_, T, Self>> {
        check_write(self, &rows, &columns)?;
        let width = columns.len();
        let direct = columns.start == 0
            && columns.end == self.columns()
            && self
                .row_slice()
                .is_some_and(|elements| elements.data_type() == T::DATA_TYPE);
        if direct {
            let slice = self
                .row_slice_mut()
                .and_then(T::narrow_mut)
                .ok_or_else(|| Error::new(ErrorKind::ReadOnlyNumericTable))?;
            return Ok(WriteBlock {
                state: WriteState::Direct(&mut slice[rows.start * width..rows.end * width]),
                rows,
                columns,
            });
        }
        let mut buffer = try_zeroed::<T>(checked_len(rows.len(), width)?)?;
        self.gather(rows.clone(), columns.clone(), T::as_elements_mut(&mut buffer))?;
        Ok(WriteBlock {
            state: WriteState::Staged {
                table: self,
                buffer,
            },
            rows,
            columns,
        })
    }

    fn write_rows<T: Numeric>(&mut self, rows: Range<usize>) -> Result<WriteBlock<'_, T, Self>> {
        let columns = self.columns();
        self.write_block(rows, 0..columns)
    }

    /// Overwrite a block from a row-major slice
    fn write_from<T: Numeric>(
        &mut self,
        rows: Range<usize>,
        columns: Range<usize>,
        values: &[T],
    ) -> Result<()> {
        check_write(self, &rows, &columns)?;
        check_block_len(rows.len(), columns.len(), values.len())?;
        self.scatter(rows, columns, T::as_elements(values))
    }
}

impl<N: NumericTable + ?Sized> TableExt for N {}
