//! Horizontal composition of tables sharing a row count

use super::{
    check_block_len, check_read, AllocationState, NumericTable, TableFlags, TableLayout, TableRef,
};
use crate::alloc::{checked_len, try_zeroed};
use crate::dictionary::Dictionary;
use crate::error::{Error, ErrorKind, Result};
use crate::numeric::{convert_slice, ElementSlice, ElementSliceMut, Numeric};
use std::ops::Range;
use std::sync::Arc;

/// Read-only view of several child tables side by side
///
/// Children are shared, not owned: the merged table holds handles and its own
/// concatenated copy of their dictionaries.
#[derive(Debug)]
pub struct MergedNumericTable<'a> {
    rows: usize,
    columns: usize,
    children: Vec<TableRef<'a>>,
    /// first column of each child
    starts: Vec<usize>,
    dictionary: Dictionary,
}

impl<'a> MergedNumericTable<'a> {
    pub fn new(children: Vec<TableRef<'a>>) -> Result<Self> {
        let rows = children.first().map(|c| c.rows()).ok_or_else(|| {
            Error::with_detail(
                ErrorKind::IncorrectParameter,
                "children",
                "a merged table needs at least one child",
            )
        })?;
        if let Some(i) = children.iter().position(|c| c.rows() != rows) {
            return Err(Error::with_detail(
                ErrorKind::IncorrectNumberOfRows,
                "children",
                format!("child {i} has {} rows, expected {rows}", children[i].rows()),
            ));
        }
        let mut starts = Vec::with_capacity(children.len());
        let mut columns = 0;
        for child in &children {
            starts.push(columns);
            columns += child.columns();
        }
        let dictionary = Dictionary::concat(children.iter().map(|c| c.dictionary()));
        Ok(Self {
            rows,
            columns,
            children,
            starts,
            dictionary,
        })
    }

    pub fn children(&self) -> &[TableRef<'a>] {
        &self.children
    }

    pub fn into_shared(self) -> TableRef<'a> {
        Arc::new(self)
    }
}

fn gather_child<D: Numeric>(
    child: &dyn NumericTable,
    rows: Range<usize>,
    child_columns: Range<usize>,
    out: &mut [D],
    width: usize,
    offset: usize,
) -> Result<()> {
    let child_width = child_columns.len();
    let mut buffer = try_zeroed::<D>(checked_len(rows.len(), child_width)?)?;
    child.gather(rows, child_columns, D::as_elements_mut(&mut buffer))?;
    if child_width == 0 {
        return Ok(());
    }
    for (src, dst) in buffer.chunks_exact(child_width).zip(out.chunks_exact_mut(width)) {
        convert_slice(src, &mut dst[offset..offset + child_width]);
    }
    Ok(())
}

impl NumericTable for MergedNumericTable<'_> {
    fn rows(&self) -> usize {
        self.rows
    }

    fn columns(&self) -> usize {
        self.columns
    }

    fn layout(&self) -> TableLayout {
        // children may each have their own layout; blocks are always gathered
        TableLayout::ColumnMajor
    }

    fn dictionary(&self) -> &Dictionary {
        &self.dictionary
    }

    fn dictionary_mut(&mut self) -> &mut Dictionary {
        &mut self.dictionary
    }

    fn allocation(&self) -> AllocationState {
        if self
            .children
            .iter()
            .any(|c| c.allocation() == AllocationState::NotAllocated)
        {
            AllocationState::NotAllocated
        } else {
            AllocationState::UserProvided
        }
    }

    fn flags(&self) -> TableFlags {
        if self
            .children
            .iter()
            .all(|c| c.flags().contains(TableFlags::ALLOCATED))
        {
            TableFlags::READ | TableFlags::ALLOCATED
        } else {
            TableFlags::empty()
        }
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
        for (child, &start) in self.children.iter().zip(&self.starts) {
            let end = start + child.columns();
            let lo = columns.start.max(start);
            let hi = columns.end.min(end);
            if lo >= hi {
                continue;
            }
            let offset = lo - columns.start;
            crate::with_elements_mut!(out.reborrow(), dst => gather_child(
                child.as_ref(),
                rows.clone(),
                lo - start..hi - start,
                dst,
                width,
                offset,
            ))?;
        }
        Ok(())
    }

    fn scatter(&mut self, _: Range<usize>, _: Range<usize>, _: ElementSlice<'_>) -> Result<()> {
        Err(Error::new(ErrorKind::ReadOnlyNumericTable))
    }

    fn assign(&mut self, _: f64) -> Result<()> {
        Err(Error::new(ErrorKind::ReadOnlyNumericTable))
    }

    /// Children are shared handles and cannot be allocated through the merge
    fn allocate(&mut self) -> Result<()> {
        if self.flags().contains(TableFlags::ALLOCATED) {
            Ok(())
        } else {
            Err(Error::with_detail(
                ErrorKind::ReadOnlyNumericTable,
                "children",
                "allocate child tables before merging",
            ))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::numeric::DataType;
    use crate::table::{CsrNumericTable, HomogenNumericTable, IndexBase, SoaNumericTable, TableExt};

    #[test]
    fn test_merge_children() {
        let left = HomogenNumericTable::from_vec(2, 2, vec![1.0f64, 2.0, 4.0, 5.0])
            .unwrap()
            .into_shared();
        let right = SoaNumericTable::from_columns(2, vec![vec![3i32, 6]])
            .unwrap()
            .into_shared();
        let merged = MergedNumericTable::new(vec![left, right]).unwrap();

        assert_eq!(merged.rows(), 2);
        assert_eq!(merged.columns(), 3);
        assert_eq!(merged.dictionary().feature(2).unwrap().data_type, DataType::I32);
        assert_eq!(
            merged.read_all::<f64>().unwrap().to_vec(),
            vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0]
        );
        assert_eq!(
            merged.read_block::<f32>(0..2, 1..3).unwrap().to_vec(),
            vec![2.0, 3.0, 5.0, 6.0]
        );
    }

    #[test]
    fn test_merge_is_read_only() {
        let child = CsrNumericTable::<f64>::empty(2, 2, IndexBase::Zero)
            .unwrap()
            .into_shared();
        let mut merged = MergedNumericTable::new(vec![child.clone(), child]).unwrap();
        let err = merged.write_rows::<f64>(0..1).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ReadOnlyNumericTable);
        assert_eq!(
            merged.assign(1.0).unwrap_err().kind(),
            ErrorKind::ReadOnlyNumericTable
        );
    }

    #[test]
    fn test_mismatched_rows() {
        let a = HomogenNumericTable::<f64>::allocated(2, 1).unwrap().into_shared();
        let b = HomogenNumericTable::<f64>::allocated(3, 1).unwrap().into_shared();
        let err = MergedNumericTable::new(vec![a, b]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::IncorrectNumberOfRows);
        assert_eq!(
            MergedNumericTable::new(Vec::new()).unwrap_err().kind(),
            ErrorKind::IncorrectParameter
        );
    }

    #[test]
    fn test_unallocated_child() {
        let a = HomogenNumericTable::<f64>::not_allocated(2, 1).into_shared();
        let mut merged = MergedNumericTable::new(vec![a]).unwrap();
        assert_eq!(merged.allocation(), AllocationState::NotAllocated);
        assert_eq!(
            merged.read_all::<f64>().unwrap_err().kind(),
            ErrorKind::NullNumericTable
        );
        assert!(merged.allocate().is_err());
    }
}
