//! Dynamically typed in-memory array data.
//!
//! [`ArrayData`] holds an [`ndarray::ArrayD`] of any supported element type.
//! It is the materialised form of every array read through the readers, and the element type is only known once a structure has been fetched.
//! Convert to and from typed arrays with [`ArrayData::as_array`], [`ArrayData::into_array`] and [`From`].

mod element;

pub use element::Element;

use std::fmt::Debug;

use ndarray::{ArrayD, Axis, IxDyn};
use thiserror::Error;

use crate::{
    array_subset::{ArraySubset, IncompatibleDimensionalityError},
    selection::{InvalidSelectionError, NormalisedSelection, Selection},
    structure::{DataType, ElementType, Endianness},
    ArrayShape,
};

/// The shape and element type of an array, materialised or not.
pub trait ArrayLike: Clone + Debug + Send + Sync {
    /// The array shape.
    fn shape(&self) -> ArrayShape;

    /// The data type of the elements.
    fn data_type(&self) -> DataType;

    /// The dimensionality of the array.
    fn dimensionality(&self) -> usize {
        self.shape().len()
    }
}

/// An array of any supported element type.
#[derive(Clone, Debug, PartialEq)]
pub enum ArrayData {
    /// `bool` elements.
    Bool(ArrayD<bool>),
    /// `int8` elements.
    Int8(ArrayD<i8>),
    /// `int16` elements.
    Int16(ArrayD<i16>),
    /// `int32` elements.
    Int32(ArrayD<i32>),
    /// `int64` elements.
    Int64(ArrayD<i64>),
    /// `uint8` elements.
    UInt8(ArrayD<u8>),
    /// `uint16` elements.
    UInt16(ArrayD<u16>),
    /// `uint32` elements.
    UInt32(ArrayD<u32>),
    /// `uint64` elements.
    UInt64(ArrayD<u64>),
    /// `float32` elements.
    Float32(ArrayD<f32>),
    /// `float64` elements.
    Float64(ArrayD<f64>),
}

macro_rules! array_data_apply {
    ($data:expr, $array:ident => $body:expr) => {
        match $data {
            ArrayData::Bool($array) => $body,
            ArrayData::Int8($array) => $body,
            ArrayData::Int16($array) => $body,
            ArrayData::Int32($array) => $body,
            ArrayData::Int64($array) => $body,
            ArrayData::UInt8($array) => $body,
            ArrayData::UInt16($array) => $body,
            ArrayData::UInt32($array) => $body,
            ArrayData::UInt64($array) => $body,
            ArrayData::Float32($array) => $body,
            ArrayData::Float64($array) => $body,
        }
    };
}

macro_rules! array_data_map {
    ($data:expr, $array:ident => $body:expr) => {
        match $data {
            ArrayData::Bool($array) => ArrayData::Bool($body),
            ArrayData::Int8($array) => ArrayData::Int8($body),
            ArrayData::Int16($array) => ArrayData::Int16($body),
            ArrayData::Int32($array) => ArrayData::Int32($body),
            ArrayData::Int64($array) => ArrayData::Int64($body),
            ArrayData::UInt8($array) => ArrayData::UInt8($body),
            ArrayData::UInt16($array) => ArrayData::UInt16($body),
            ArrayData::UInt32($array) => ArrayData::UInt32($body),
            ArrayData::UInt64($array) => ArrayData::UInt64($body),
            ArrayData::Float32($array) => ArrayData::Float32($body),
            ArrayData::Float64($array) => ArrayData::Float64($body),
        }
    };
}

macro_rules! array_data_zip {
    ($a:expr, $b:expr, $x:ident, $y:ident => $body:expr, $otherwise:expr) => {
        match ($a, $b) {
            (ArrayData::Bool($x), ArrayData::Bool($y)) => $body,
            (ArrayData::Int8($x), ArrayData::Int8($y)) => $body,
            (ArrayData::Int16($x), ArrayData::Int16($y)) => $body,
            (ArrayData::Int32($x), ArrayData::Int32($y)) => $body,
            (ArrayData::Int64($x), ArrayData::Int64($y)) => $body,
            (ArrayData::UInt8($x), ArrayData::UInt8($y)) => $body,
            (ArrayData::UInt16($x), ArrayData::UInt16($y)) => $body,
            (ArrayData::UInt32($x), ArrayData::UInt32($y)) => $body,
            (ArrayData::UInt64($x), ArrayData::UInt64($y)) => $body,
            (ArrayData::Float32($x), ArrayData::Float32($y)) => $body,
            (ArrayData::Float64($x), ArrayData::Float64($y)) => $body,
            _ => $otherwise,
        }
    };
}

macro_rules! with_element {
    ($data_type:expr, $t:ident => $body:expr) => {
        match $data_type {
            DataType::Bool => { type $t = bool; $body }
            DataType::Int8 => { type $t = i8; $body }
            DataType::Int16 => { type $t = i16; $body }
            DataType::Int32 => { type $t = i32; $body }
            DataType::Int64 => { type $t = i64; $body }
            DataType::UInt8 => { type $t = u8; $body }
            DataType::UInt16 => { type $t = u16; $body }
            DataType::UInt32 => { type $t = u32; $body }
            DataType::UInt64 => { type $t = u64; $body }
            DataType::Float32 => { type $t = f32; $body }
            DataType::Float64 => { type $t = f64; $body }
        }
    };
}

impl ArrayData {
    /// Create an array of `shape` filled with zeros (or `false`).
    ///
    /// # Errors
    /// Returns [`ArrayDataError::Shape`] if `shape` overflows the address space.
    pub fn zeros(data_type: DataType, shape: &[u64]) -> Result<Self, ArrayDataError> {
        let dim = IxDyn(&to_usize_shape(shape));
        let num_elements = dim_num_elements(shape)?;
        with_element!(data_type, T => {
            let elements = vec![T::default(); num_elements];
            Ok(ArrayD::<T>::from_shape_vec(dim, elements)?.into())
        })
    }

    /// Decode C-order element bytes encoded with `element_type` into an array of `shape`.
    ///
    /// # Errors
    /// Returns [`ArrayDataError::UnexpectedSize`] if the length of `bytes` does not match `shape` and the element size.
    pub fn from_bytes(
        bytes: &[u8],
        element_type: ElementType,
        shape: &[u64],
    ) -> Result<Self, ArrayDataError> {
        let expected = shape.iter().product::<u64>() * element_type.size() as u64;
        if bytes.len() as u64 != expected {
            return Err(ArrayDataError::UnexpectedSize {
                got: bytes.len() as u64,
                expected,
            });
        }
        let dim = IxDyn(&to_usize_shape(shape));
        let swap = !element_type.endianness().is_native();
        macro_rules! decode {
            ($t:ty) => {
                ArrayD::<$t>::from_shape_vec(dim, decode_pod::<$t>(bytes, swap))?.into()
            };
        }
        Ok(match element_type.data_type() {
            DataType::Bool => {
                ArrayD::<bool>::from_shape_vec(dim, bytes.iter().map(|&byte| byte != 0).collect())?
                    .into()
            }
            DataType::Int8 => decode!(i8),
            DataType::Int16 => decode!(i16),
            DataType::Int32 => decode!(i32),
            DataType::Int64 => decode!(i64),
            DataType::UInt8 => decode!(u8),
            DataType::UInt16 => decode!(u16),
            DataType::UInt32 => decode!(u32),
            DataType::UInt64 => decode!(u64),
            DataType::Float32 => decode!(f32),
            DataType::Float64 => decode!(f64),
        })
    }

    /// Encode the elements in C order with `endianness`.
    #[must_use]
    pub fn to_bytes(&self, endianness: Endianness) -> Vec<u8> {
        let swap = !endianness.is_native();
        match self {
            Self::Bool(array) => array.iter().map(|&element| u8::from(element)).collect(),
            Self::Int8(array) => encode_pod(array, swap),
            Self::Int16(array) => encode_pod(array, swap),
            Self::Int32(array) => encode_pod(array, swap),
            Self::Int64(array) => encode_pod(array, swap),
            Self::UInt8(array) => encode_pod(array, swap),
            Self::UInt16(array) => encode_pod(array, swap),
            Self::UInt32(array) => encode_pod(array, swap),
            Self::UInt64(array) => encode_pod(array, swap),
            Self::Float32(array) => encode_pod(array, swap),
            Self::Float64(array) => encode_pod(array, swap),
        }
    }

    /// The data type of the elements.
    #[must_use]
    pub fn data_type(&self) -> DataType {
        match self {
            Self::Bool(_) => DataType::Bool,
            Self::Int8(_) => DataType::Int8,
            Self::Int16(_) => DataType::Int16,
            Self::Int32(_) => DataType::Int32,
            Self::Int64(_) => DataType::Int64,
            Self::UInt8(_) => DataType::UInt8,
            Self::UInt16(_) => DataType::UInt16,
            Self::UInt32(_) => DataType::UInt32,
            Self::UInt64(_) => DataType::UInt64,
            Self::Float32(_) => DataType::Float32,
            Self::Float64(_) => DataType::Float64,
        }
    }

    /// The array shape.
    #[must_use]
    pub fn shape(&self) -> ArrayShape {
        array_data_apply!(self, array => array.shape().iter().map(|&size| size as u64).collect())
    }

    /// The number of elements.
    #[must_use]
    pub fn num_elements(&self) -> u64 {
        array_data_apply!(self, array => array.len() as u64)
    }

    /// Borrow the typed array, if the elements are of type `T`.
    #[must_use]
    pub fn as_array<T: Element>(&self) -> Option<&ArrayD<T>> {
        T::as_array(self)
    }

    /// Convert into a typed array.
    ///
    /// # Errors
    /// Returns [`ArrayDataError::DataTypeMismatch`] if the elements are not of type `T`.
    pub fn into_array<T: Element>(self) -> Result<ArrayD<T>, ArrayDataError> {
        T::into_array(self).map_err(|data| ArrayDataError::DataTypeMismatch {
            got: data.data_type(),
            expected: T::DATA_TYPE,
        })
    }

    /// Extract the elements within `subset`.
    ///
    /// # Errors
    /// Returns [`ArrayDataError::OutOfBounds`] if `subset` is not within the array.
    pub fn extract(&self, subset: &ArraySubset) -> Result<Self, ArrayDataError> {
        let shape = self.shape();
        if !subset.inbounds(&shape) {
            return Err(ArrayDataError::OutOfBounds(subset.clone(), shape));
        }
        let slices = subset_slices(subset);
        Ok(array_data_map!(self, array => {
            array.slice_each_axis(|ax| slices[ax.axis.index()]).to_owned()
        }))
    }

    /// Overwrite the elements within `subset` with `src`.
    ///
    /// # Errors
    /// Returns an [`ArrayDataError`] if
    ///  - `subset` is not within the array,
    ///  - the shape of `src` does not match `subset`, or
    ///  - the data type of `src` does not match.
    pub fn assign(&mut self, subset: &ArraySubset, src: &Self) -> Result<(), ArrayDataError> {
        let shape = self.shape();
        if !subset.inbounds(&shape) {
            return Err(ArrayDataError::OutOfBounds(subset.clone(), shape));
        }
        let src_shape = src.shape();
        if src_shape != subset.shape() {
            return Err(ArrayDataError::ShapeMismatch {
                got: src_shape,
                expected: subset.shape().to_vec(),
            });
        }
        let (got, expected) = (src.data_type(), self.data_type());
        let slices = subset_slices(subset);
        array_data_zip!(self, src, dst, src => {
            dst.slice_each_axis_mut(|ax| slices[ax.axis.index()]).assign(src);
            Ok(())
        }, Err(ArrayDataError::DataTypeMismatch { got, expected }))
    }

    /// Select elements with `selection`, removing indexed axes.
    ///
    /// # Errors
    /// Returns [`ArrayDataError::InvalidSelection`] if `selection` is not valid for the array shape.
    pub fn select(&self, selection: &Selection) -> Result<Self, ArrayDataError> {
        let shape = self.shape();
        let normalised = selection.normalise(&shape)?;
        self.apply(&normalised, &vec![0; shape.len()])
    }

    /// Apply a normalised selection to this array, whose first element is at `origin` in the coordinates of the selection.
    pub(crate) fn apply(
        &self,
        selection: &NormalisedSelection,
        origin: &[u64],
    ) -> Result<Self, ArrayDataError> {
        let shape = self.shape();
        if selection.axes().len() != shape.len() || origin.len() != shape.len() {
            return Err(
                IncompatibleDimensionalityError::new(selection.axes().len(), shape.len()).into(),
            );
        }
        let covered = itertools::izip!(selection.axes(), origin, &shape).all(
            |(axis, &origin, &size)| {
                let bounds = axis.bounds();
                axis.count() == 0 || (bounds.start >= origin && bounds.end - origin <= size)
            },
        );
        if !covered {
            return Err(ArrayDataError::OutOfBounds(
                selection.bounding_subset(),
                shape,
            ));
        }
        let slices = selection.ndarray_slices(&origin.to_vec());
        let dropped: Vec<usize> = selection
            .axes()
            .iter()
            .enumerate()
            .filter_map(|(i, axis)| axis.is_dropped().then_some(i))
            .collect();
        Ok(array_data_map!(self, array => {
            let mut view = array.slice_each_axis(|ax| slices[ax.axis.index()]);
            for &axis in dropped.iter().rev() {
                view = view.index_axis_move(Axis(axis), 0);
            }
            view.to_owned()
        }))
    }
}

impl ArrayLike for ArrayData {
    fn shape(&self) -> ArrayShape {
        ArrayData::shape(self)
    }

    fn data_type(&self) -> DataType {
        ArrayData::data_type(self)
    }
}

fn to_usize_shape(shape: &[u64]) -> Vec<usize> {
    shape
        .iter()
        .map(|&size| usize::try_from(size).unwrap_or(usize::MAX))
        .collect()
}

fn dim_num_elements(shape: &[u64]) -> Result<usize, ArrayDataError> {
    shape
        .iter()
        .try_fold(1u64, |acc, &size| acc.checked_mul(size))
        .and_then(|n| usize::try_from(n).ok())
        .ok_or_else(|| ndarray::ShapeError::from_kind(ndarray::ErrorKind::Overflow).into())
}

fn subset_slices(subset: &ArraySubset) -> Vec<ndarray::Slice> {
    subset
        .to_ranges()
        .into_iter()
        .map(|range| {
            let start = isize::try_from(range.start).unwrap_or(isize::MAX);
            let end = isize::try_from(range.end).unwrap_or(isize::MAX);
            ndarray::Slice::from(start..end)
        })
        .collect()
}

fn decode_pod<T: bytemuck::Pod>(bytes: &[u8], swap: bool) -> Vec<T> {
    if swap {
        let swapped: Vec<u8> = bytes
            .chunks_exact(std::mem::size_of::<T>())
            .flat_map(|element| element.iter().rev().copied())
            .collect();
        bytemuck::pod_collect_to_vec(&swapped[..])
    } else {
        bytemuck::pod_collect_to_vec(bytes)
    }
}

fn encode_pod<T: bytemuck::Pod>(array: &ArrayD<T>, swap: bool) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(array.len() * std::mem::size_of::<T>());
    for element in array {
        let element = bytemuck::bytes_of(element);
        if swap {
            bytes.extend(element.iter().rev());
        } else {
            bytes.extend_from_slice(element);
        }
    }
    bytes
}

/// An array data error.
#[derive(Clone, Debug, Error)]
pub enum ArrayDataError {
    /// Incompatible dimensionality.
    #[error(transparent)]
    IncompatibleDimensionality(#[from] IncompatibleDimensionalityError),
    /// The number of encoded bytes does not match the shape.
    #[error("got {got} bytes, expected {expected}")]
    UnexpectedSize {
        /// The number of bytes.
        got: u64,
        /// The expected number of bytes.
        expected: u64,
    },
    /// The data types do not match.
    #[error("data type {got} does not match {expected}")]
    DataTypeMismatch {
        /// The data type.
        got: DataType,
        /// The expected data type.
        expected: DataType,
    },
    /// The subset is out of bounds of the array.
    #[error("subset {_0} is out of bounds of array shape {_1:?}")]
    OutOfBounds(ArraySubset, ArrayShape),
    /// The shape does not match the target region.
    #[error("shape {got:?} does not match {expected:?}")]
    ShapeMismatch {
        /// The shape.
        got: ArrayShape,
        /// The expected shape.
        expected: ArrayShape,
    },
    /// An invalid selection.
    #[error(transparent)]
    InvalidSelection(#[from] InvalidSelectionError),
    /// An ndarray shape error.
    #[error(transparent)]
    Shape(#[from] ndarray::ShapeError),
}

#[cfg(test)]
mod tests {
    use ndarray::{array, ArrayD};

    use super::*;
    use crate::{selection::Slice, structure::NATIVE_ENDIAN};

    fn arange_2d(rows: usize, cols: usize) -> ArrayData {
        let elements: Vec<i32> = (0..i32::try_from(rows * cols).unwrap()).collect();
        ArrayD::from_shape_vec(IxDyn(&[rows, cols]), elements)
            .unwrap()
            .into()
    }

    #[test]
    fn array_data_bytes() {
        let data = arange_2d(2, 3);
        for endianness in [Endianness::Little, Endianness::Big] {
            let element_type = ElementType::new(DataType::Int32, endianness);
            let bytes = data.to_bytes(endianness);
            assert_eq!(bytes.len(), 24);
            let decoded = ArrayData::from_bytes(&bytes, element_type, &[2, 3]).unwrap();
            assert_eq!(decoded, data);
        }
        let big = data.to_bytes(Endianness::Big);
        assert_eq!(&big[4..8], &[0, 0, 0, 1]);
        assert!(matches!(
            ArrayData::from_bytes(&big, ElementType::native(DataType::Int32), &[2, 2]),
            Err(ArrayDataError::UnexpectedSize {
                got: 24,
                expected: 16
            })
        ));
    }

    #[test]
    fn array_data_bool() {
        let data =
            ArrayData::from_bytes(&[0, 1, 2], ElementType::native(DataType::Bool), &[3]).unwrap();
        assert_eq!(
            data.as_array::<bool>().unwrap(),
            &array![false, true, true].into_dyn()
        );
        assert_eq!(data.to_bytes(NATIVE_ENDIAN), vec![0, 1, 1]);
    }

    #[test]
    fn array_data_extract_assign() {
        let data = arange_2d(4, 4);
        let subset = ArraySubset::new_with_ranges(&[1..3, 2..4]);
        let extracted = data.extract(&subset).unwrap();
        assert_eq!(
            extracted.as_array::<i32>().unwrap(),
            &array![[6, 7], [10, 11]].into_dyn()
        );

        let mut zeros = ArrayData::zeros(DataType::Int32, &[4, 4]).unwrap();
        zeros.assign(&subset, &extracted).unwrap();
        assert_eq!(zeros.extract(&subset).unwrap(), extracted);
        assert_eq!(zeros.num_elements(), 16);

        assert!(data
            .extract(&ArraySubset::new_with_ranges(&[3..5, 0..1]))
            .is_err());
        let floats = ArrayData::zeros(DataType::Float32, &[2, 2]).unwrap();
        assert!(matches!(
            zeros.assign(&subset, &floats),
            Err(ArrayDataError::DataTypeMismatch { .. })
        ));
    }

    #[test]
    fn array_data_select() {
        let data = arange_2d(4, 5);
        let row = data
            .select(&Selection::from([Slice::Index(1), Slice::from(1..4)]))
            .unwrap();
        assert_eq!(row.as_array::<i32>().unwrap(), &array![6, 7, 8].into_dyn());

        let reversed = data
            .select(&Selection::from([
                Slice::new(None, None, Some(-2)),
                Slice::Index(-1),
            ]))
            .unwrap();
        assert_eq!(reversed.as_array::<i32>().unwrap(), &array![19, 9].into_dyn());

        let scalar = data
            .select(&Selection::from([Slice::Index(2), Slice::Index(3)]))
            .unwrap();
        assert_eq!(scalar.shape(), Vec::<u64>::new());
        assert_eq!(scalar.into_array::<i32>().unwrap().into_raw_vec_and_offset().0, vec![13]);

        let empty = data.select(&Selection::from(3..1)).unwrap();
        assert_eq!(empty.shape(), vec![0, 5]);
    }

    #[test]
    fn array_data_apply_with_origin() {
        let block = arange_2d(2, 2);
        let selection = Selection::from([Slice::Index(3), Slice::from(4..6)])
            .normalise(&[10, 10])
            .unwrap();
        let selected = block.apply(&selection, &[2, 4]).unwrap();
        assert_eq!(selected.as_array::<i32>().unwrap(), &array![2, 3].into_dyn());
        assert!(block.apply(&selection, &[0, 0]).is_err());
    }

    #[test]
    fn array_data_into_array_mismatch() {
        let data = ArrayData::zeros(DataType::UInt8, &[2]).unwrap();
        assert!(matches!(
            data.into_array::<f64>(),
            Err(ArrayDataError::DataTypeMismatch {
                got: DataType::UInt8,
                expected: DataType::Float64
            })
        ));
    }
}
