//! Fallible allocation helpers
//!
//! Every dynamic buffer sized from runtime input goes through these so that an
//! oversized request surfaces as `MemoryAllocationFailed` instead of aborting.

use crate::error::{Error, ErrorKind, ErrorRecord, Result};

/// `rows * columns` with overflow reported as an allocation failure
pub fn checked_len(rows: usize, columns: usize) -> Result<usize> {
    rows.checked_mul(columns).ok_or_else(|| {
        Error::allocation(format!("{rows} x {columns} elements overflows usize"))
    })
}

/// Empty vector with room for exactly `capacity` elements
pub fn try_with_capacity<T>(capacity: usize) -> Result<Vec<T>> {
    let mut vec = Vec::new();
    vec.try_reserve_exact(capacity).map_err(|e| {
        Error::from(
            ErrorRecord::new(ErrorKind::MemoryAllocationFailed)
                .with_detail(format!("{capacity} elements of {}: {e}", std::any::type_name::<T>())),
        )
    })?;
    Ok(vec)
}

/// Vector of `len` copies of `value`
pub fn try_vec<T: Clone>(len: usize, value: T) -> Result<Vec<T>> {
    let mut vec = try_with_capacity(len)?;
    vec.resize(len, value);
    Ok(vec)
}

/// Vector of `len` zero-initialized elements
pub fn try_zeroed<T: bytemuck::Zeroable + Clone>(len: usize) -> Result<Vec<T>> {
    try_vec(len, T::zeroed())
}
