//! Column value kinds supported by the virtual file layout.

use arrow_schema::DataType;
use virtfile_common::{Result, error::Error};

/// Physical value kind of a column, independent of whether its chunks are
/// dictionary-encoded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValueKind {
    /// 32-bit signed integer, Parquet `INT32`.
    Int32,
    /// 64-bit floating point, Parquet `DOUBLE`.
    Float64,
    /// UTF-8 text, Parquet `BYTE_ARRAY` annotated as `STRING`.
    Utf8,
}

impl ValueKind {
    /// Resolves the value kind of an Arrow type.
    ///
    /// Dictionary types resolve to the kind of their value type. Any other type fails
    /// with an `UnsupportedType` error naming it.
    pub fn from_data_type(data_type: &DataType) -> Result<ValueKind> {
        match data_type {
            DataType::Int32 => Ok(ValueKind::Int32),
            DataType::Float64 => Ok(ValueKind::Float64),
            DataType::Utf8 => Ok(ValueKind::Utf8),
            DataType::Dictionary(key_type, value_type) if key_type.is_dictionary_key_type() => {
                Self::from_data_type(value_type)
            }
            other => Err(Error::unsupported_type(other.to_string())),
        }
    }

    /// Size of one plain-encoded value, `None` for variable-width kinds.
    pub fn fixed_width(&self) -> Option<u64> {
        match self {
            ValueKind::Int32 => Some(4),
            ValueKind::Float64 => Some(8),
            ValueKind::Utf8 => None,
        }
    }

    pub fn is_variable_width(&self) -> bool {
        self.fixed_width().is_none()
    }

    pub fn name(&self) -> &'static str {
        match self {
            ValueKind::Int32 => "Int32",
            ValueKind::Float64 => "Float64",
            ValueKind::Utf8 => "Utf8",
        }
    }
}

impl std::fmt::Display for ValueKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}
