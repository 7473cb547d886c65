//! Backing storage shared by the dense table types

use super::{AllocationState, TableFlags};
use crate::alloc::try_zeroed;
use crate::error::Result;
use crate::numeric::Numeric;

/// Elements of one dense buffer
#[derive(Debug)]
pub(crate) enum Storage<'a, T> {
    NotAllocated,
    Owned(Vec<T>),
    /// Caller memory, read-only
    Borrowed(&'a [T]),
    /// Caller memory, writable
    BorrowedMut(&'a mut [T]),
}

impl<T: Numeric> Storage<'_, T> {
    pub fn zeroed(len: usize) -> Result<Self> {
        Ok(Self::Owned(try_zeroed(len)?))
    }

    pub fn as_slice(&self) -> Option<&[T]> {
        match self {
            Self::NotAllocated => None,
            Self::Owned(v) => Some(v.as_slice()),
            Self::Borrowed(s) => Some(*s),
            Self::BorrowedMut(s) => Some(&**s),
        }
    }

    /// `None` when not allocated or read-only
    pub fn as_mut_slice(&mut self) -> Option<&mut [T]> {
        match self {
            Self::Owned(v) => Some(v.as_mut_slice()),
            Self::BorrowedMut(s) => Some(&mut **s),
            Self::NotAllocated | Self::Borrowed(_) => None,
        }
    }

    pub fn allocation(&self) -> AllocationState {
        match self {
            Self::NotAllocated => AllocationState::NotAllocated,
            Self::Owned(_) => AllocationState::Owned,
            Self::Borrowed(_) | Self::BorrowedMut(_) => AllocationState::UserProvided,
        }
    }

    pub fn flags(&self) -> TableFlags {
        match self {
            Self::NotAllocated => TableFlags::empty(),
            Self::Owned(_) => TableFlags::all(),
            Self::Borrowed(_) => TableFlags::READ | TableFlags::ALLOCATED,
            Self::BorrowedMut(_) => TableFlags::READ | TableFlags::WRITE | TableFlags::ALLOCATED,
        }
    }

    /// Replace not-allocated storage with `len` owned zeros
    pub fn allocate(&mut self, len: usize) -> Result<()> {
        if matches!(self, Self::NotAllocated) {
            *self = Self::zeroed(len)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_storage_states() {
        let mut storage = Storage::<f64>::NotAllocated;
        assert!(storage.as_slice().is_none());
        assert_eq!(storage.flags(), TableFlags::empty());

        storage.allocate(3).unwrap();
        assert_eq!(storage.as_slice(), Some(&[0.0; 3][..]));
        assert_eq!(storage.allocation(), AllocationState::Owned);
        assert!(storage.flags().contains(TableFlags::OWNS_MEMORY));

        let data = [1.0f32];
        let mut borrowed = Storage::Borrowed(&data[..]);
        assert!(borrowed.as_mut_slice().is_none());
        assert_eq!(borrowed.allocation(), AllocationState::UserProvided);
        assert!(!borrowed.flags().contains(TableFlags::WRITE));
    }
}
