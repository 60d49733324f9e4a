use ndarray::ArrayD;

use super::ArrayData;
use crate::structure::DataType;

/// A Rust element type which has a corresponding [`DataType`].
pub trait Element: Clone + Send + Sync + 'static {
    /// The data type of the element.
    const DATA_TYPE: DataType;

    /// Wrap an array of this element type.
    fn wrap(array: ArrayD<Self>) -> ArrayData;

    /// Borrow the array of `data` if its elements are of this type.
    fn as_array(data: &ArrayData) -> Option<&ArrayD<Self>>;

    /// Unwrap the array of `data` if its elements are of this type, otherwise return `data`.
    ///
    /// # Errors
    /// Returns `data` unchanged if its data type does not match.
    fn into_array(data: ArrayData) -> Result<ArrayD<Self>, ArrayData>;
}

macro_rules! impl_element {
    ($t:ty, $variant:ident) => {
        impl Element for $t {
            const DATA_TYPE: DataType = DataType::$variant;

            fn wrap(array: ArrayD<Self>) -> ArrayData {
                ArrayData::$variant(array)
            }

            fn as_array(data: &ArrayData) -> Option<&ArrayD<Self>> {
                if let ArrayData::$variant(array) = data {
                    Some(array)
                } else {
                    None
                }
            }

            fn into_array(data: ArrayData) -> Result<ArrayD<Self>, ArrayData> {
                if let ArrayData::$variant(array) = data {
                    Ok(array)
                } else {
                    Err(data)
                }
            }
        }

        impl From<ArrayD<$t>> for ArrayData {
            fn from(array: ArrayD<$t>) -> Self {
                Self::$variant(array)
            }
        }
    };
}

impl_element!(bool, Bool);
impl_element!(i8, Int8);
impl_element!(i16, Int16);
impl_element!(i32, Int32);
impl_element!(i64, Int64);
impl_element!(u8, UInt8);
impl_element!(u16, UInt16);
impl_element!(u32, UInt32);
impl_element!(u64, UInt64);
impl_element!(f32, Float32);
impl_element!(f64, Float64);
