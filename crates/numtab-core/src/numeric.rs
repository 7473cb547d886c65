//! Element types stored in numeric tables
//!
//! Tables store `f32`, `f64` or `i32` elements; kernels compute in one of the
//! two floating-point precisions. Type-erased views ([`ElementSlice`],
//! [`ElementSliceMut`]) let object-safe table methods move data between a
//! table's storage type and the element type a caller asks for.

use bytemuck::Pod;
use num_traits::{Float, Num};
use serde::{Deserialize, Serialize};
use std::fmt::{self, Debug};
use std::ops::{AddAssign, MulAssign, SubAssign};

/// Storage type of one column
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DataType {
    F32,
    F64,
    I32,
}

impl DataType {
    /// Size of one element in bytes
    pub fn size(self) -> usize {
        match self {
            Self::F32 | Self::I32 => 4,
            Self::F64 => 8,
        }
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::F32 => "f32",
            Self::F64 => "f64",
            Self::I32 => "i32",
        })
    }
}

/// Floating-point precision a kernel is instantiated for
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Precision {
    F32,
    #[default]
    F64,
}

impl Precision {
    pub fn data_type(self) -> DataType {
        match self {
            Self::F32 => DataType::F32,
            Self::F64 => DataType::F64,
        }
    }
}

impl fmt::Display for Precision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.data_type(), f)
    }
}

/// Base trait for element types a table can store
pub trait Numeric: Pod + Num + Copy + PartialOrd + Debug + Send + Sync + 'static {
    const DATA_TYPE: DataType;

    /// Widen to f64; exact for every supported type
    fn into_f64(self) -> f64;

    /// Narrow from f64 (saturating for integers)
    fn from_f64(value: f64) -> Self;

    /// Always true for integers
    fn is_finite_value(self) -> bool;

    fn as_elements(slice: &[Self]) -> ElementSlice<'_>;

    fn as_elements_mut(slice: &mut [Self]) -> ElementSliceMut<'_>;

    /// Recover the typed slice if `elements` holds this type
    fn narrow(elements: ElementSlice<'_>) -> Option<&[Self]>;

    fn narrow_mut(elements: ElementSliceMut<'_>) -> Option<&mut [Self]>;

    fn into_element_vec(values: Vec<Self>) -> ElementVec;
}

/// Element types kernels compute in
pub trait FloatNumeric: Numeric + Float + AddAssign + SubAssign + MulAssign {
    const PRECISION: Precision;
}

macro_rules! impl_numeric {
    ($ty:ty, $variant:ident, $finite:expr) => {
        impl Numeric for $ty {
            const DATA_TYPE: DataType = DataType::$variant;

            #[inline]
            fn into_f64(self) -> f64 {
                self as f64
            }

            #[inline]
            fn from_f64(value: f64) -> Self {
                value as $ty
            }

            #[inline]
            fn is_finite_value(self) -> bool {
                let check: fn($ty) -> bool = $finite;
                check(self)
            }

            fn as_elements(slice: &[Self]) -> ElementSlice<'_> {
                ElementSlice::$variant(slice)
            }

            fn as_elements_mut(slice: &mut [Self]) -> ElementSliceMut<'_> {
                ElementSliceMut::$variant(slice)
            }

            fn narrow(elements: ElementSlice<'_>) -> Option<&[Self]> {
                match elements {
                    ElementSlice::$variant(slice) => Some(slice),
                    _ => None,
                }
            }

            fn narrow_mut(elements: ElementSliceMut<'_>) -> Option<&mut [Self]> {
                match elements {
                    ElementSliceMut::$variant(slice) => Some(slice),
                    _ => None,
                }
            }

            fn into_element_vec(values: Vec<Self>) -> ElementVec {
                ElementVec::$variant(values)
            }
        }
    };
}

impl_numeric!(f32, F32, f32::is_finite);
impl_numeric!(f64, F64, f64::is_finite);
impl_numeric!(i32, I32, |_| true);

impl FloatNumeric for f32 {
    const PRECISION: Precision = Precision::F32;
}

impl FloatNumeric for f64 {
    const PRECISION: Precision = Precision::F64;
}

/// Borrowed elements of one of the storage types
#[derive(Debug, Clone, Copy)]
pub enum ElementSlice<'a> {
    F32(&'a [f32]),
    F64(&'a [f64]),
    I32(&'a [i32]),
}

/// Mutably borrowed elements of one of the storage types
#[derive(Debug)]
pub enum ElementSliceMut<'a> {
    F32(&'a mut [f32]),
    F64(&'a mut [f64]),
    I32(&'a mut [i32]),
}

/// Owned elements of one of the storage types
#[derive(Debug, Clone, PartialEq)]
pub enum ElementVec {
    F32(Vec<f32>),
    F64(Vec<f64>),
    I32(Vec<i32>),
}

/// Run `$body` with `$s` bound to the typed slice inside an [`ElementSlice`]
#[macro_export]
macro_rules! with_elements {
    ($elements:expr, $s:ident => $body:expr) => {
        match $elements {
            $crate::numeric::ElementSlice::F32($s) => $body,
            $crate::numeric::ElementSlice::F64($s) => $body,
            $crate::numeric::ElementSlice::I32($s) => $body,
        }
    };
}

/// Run `$body` with `$s` bound to the typed slice inside an [`ElementSliceMut`]
#[macro_export]
macro_rules! with_elements_mut {
    ($elements:expr, $s:ident => $body:expr) => {
        match $elements {
            $crate::numeric::ElementSliceMut::F32($s) => $body,
            $crate::numeric::ElementSliceMut::F64($s) => $body,
            $crate::numeric::ElementSliceMut::I32($s) => $body,
        }
    };
}

/// Instantiate `$body` with `$T` aliased to the float type of a [`Precision`]
///
/// ```
/// use numtab_core::{dispatch_precision, Precision};
///
/// fn width(precision: Precision) -> usize {
///     dispatch_precision!(precision, T => { std::mem::size_of::<T>() })
/// }
/// assert_eq!(width(Precision::F32), 4);
/// assert_eq!(width(Precision::F64), 8);
/// ```
#[macro_export]
macro_rules! dispatch_precision {
    ($precision:expr, $T:ident => $body:block) => {
        match $precision {
            $crate::numeric::Precision::F32 => {
                type $T = f32;
                $body
            }
            $crate::numeric::Precision::F64 => {
                type $T = f64;
                $body
            }
        }
    };
}

/// Instantiate `$body` with `$T` aliased to the Rust type of a [`DataType`]
#[macro_export]
macro_rules! dispatch_data_type {
    ($data_type:expr, $T:ident => $body:block) => {
        match $data_type {
            $crate::numeric::DataType::F32 => {
                type $T = f32;
                $body
            }
            $crate::numeric::DataType::F64 => {
                type $T = f64;
                $body
            }
            $crate::numeric::DataType::I32 => {
                type $T = i32;
                $body
            }
        }
    };
}

impl<'a> ElementSlice<'a> {
    pub fn data_type(&self) -> DataType {
        match self {
            Self::F32(_) => DataType::F32,
            Self::F64(_) => DataType::F64,
            Self::I32(_) => DataType::I32,
        }
    }

    pub fn len(&self) -> usize {
        with_elements!(self, s => s.len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Element `index` widened to f64
    pub fn get_f64(&self, index: usize) -> Option<f64> {
        with_elements!(self, s => s.get(index).map(|v| v.into_f64()))
    }

    /// Sub-slice over `range`, or `None` if it falls outside
    pub fn slice(&self, range: std::ops::Range<usize>) -> Option<ElementSlice<'a>> {
        Some(match *self {
            Self::F32(s) => Self::F32(s.get(range)?),
            Self::F64(s) => Self::F64(s.get(range)?),
            Self::I32(s) => Self::I32(s.get(range)?),
        })
    }

    /// Raw bytes of the underlying storage
    pub fn as_bytes(&self) -> &'a [u8] {
        match *self {
            Self::F32(s) => bytemuck::cast_slice(s),
            Self::F64(s) => bytemuck::cast_slice(s),
            Self::I32(s) => bytemuck::cast_slice(s),
        }
    }

    /// Convert every element into `dst`, which must have the same length
    pub fn copy_into<D: Numeric>(&self, dst: &mut [D]) {
        with_elements!(*self, s => convert_slice(s, dst))
    }

    pub fn to_vec<D: Numeric>(&self) -> Vec<D> {
        let mut out = vec![D::zero(); self.len()];
        self.copy_into(&mut out);
        out
    }
}

impl ElementSliceMut<'_> {
    pub fn data_type(&self) -> DataType {
        match self {
            Self::F32(_) => DataType::F32,
            Self::F64(_) => DataType::F64,
            Self::I32(_) => DataType::I32,
        }
    }

    pub fn len(&self) -> usize {
        with_elements_mut!(self, s => s.len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Shorter-lived view so the slice can be handed out repeatedly
    pub fn reborrow(&mut self) -> ElementSliceMut<'_> {
        match self {
            Self::F32(s) => ElementSliceMut::F32(s),
            Self::F64(s) => ElementSliceMut::F64(s),
            Self::I32(s) => ElementSliceMut::I32(s),
        }
    }

    pub fn as_slice(&self) -> ElementSlice<'_> {
        match self {
            Self::F32(s) => ElementSlice::F32(s),
            Self::F64(s) => ElementSlice::F64(s),
            Self::I32(s) => ElementSlice::I32(s),
        }
    }

    pub fn fill_f64(&mut self, value: f64) {
        with_elements_mut!(self, s => s.fill(Numeric::from_f64(value)))
    }
}

impl ElementVec {
    pub fn zeroed(data_type: DataType, len: usize) -> crate::Result<Self> {
        use crate::alloc::try_zeroed;
        Ok(match data_type {
            DataType::F32 => Self::F32(try_zeroed(len)?),
            DataType::F64 => Self::F64(try_zeroed(len)?),
            DataType::I32 => Self::I32(try_zeroed(len)?),
        })
    }

    pub fn data_type(&self) -> DataType {
        self.as_slice().data_type()
    }

    pub fn len(&self) -> usize {
        self.as_slice().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn as_slice(&self) -> ElementSlice<'_> {
        match self {
            Self::F32(v) => ElementSlice::F32(v),
            Self::F64(v) => ElementSlice::F64(v),
            Self::I32(v) => ElementSlice::I32(v),
        }
    }

    pub fn as_mut_slice(&mut self) -> ElementSliceMut<'_> {
        match self {
            Self::F32(v) => ElementSliceMut::F32(v),
            Self::F64(v) => ElementSliceMut::F64(v),
            Self::I32(v) => ElementSliceMut::I32(v),
        }
    }
}

/// Convert a single element between storage types
#[inline]
pub fn cast_value<S: Numeric, D: Numeric>(value: S) -> D {
    D::from_f64(value.into_f64())
}

/// Element-wise conversion of `src` into `dst` (equal lengths)
///
/// Same-type copies go through a byte cast.
pub fn convert_slice<S: Numeric, D: Numeric>(src: &[S], dst: &mut [D]) {
    debug_assert_eq!(src.len(), dst.len());
    if S::DATA_TYPE == D::DATA_TYPE {
        if let Ok(same) = bytemuck::try_cast_slice::<S, D>(src) {
            dst.copy_from_slice(same);
            return;
        }
    }
    for (d, &s) in dst.iter_mut().zip(src) {
        *d = cast_value(s);
    }
}

/// Write `src[i]` to `dst[offset + i * stride]`
pub fn spread_into<S: Numeric, D: Numeric>(src: &[S], dst: &mut [D], offset: usize, stride: usize) {
    for (i, &s) in src.iter().enumerate() {
        dst[offset + i * stride] = cast_value(s);
    }
}

/// Read `dst[i]` from `src[offset + i * stride]`
pub fn collect_from<S: Numeric, D: Numeric>(src: &[S], offset: usize, stride: usize, dst: &mut [D]) {
    for (i, d) in dst.iter_mut().enumerate() {
        *d = cast_value(src[offset + i * stride]);
    }
}
