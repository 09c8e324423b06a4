//! Error types for slot conversion

/// Result type for conversions between slots and dynamic values
pub type ConvResult<T> = Result<T, ConversionError>;

/// Failure converting a value across the bridge
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ConversionError {
    /// Value has the wrong kind for the target type
    #[error("Type mismatch: expected {expected}, got {got}")]
    TypeMismatch {
        /// Expected type name
        expected: String,
        /// Actual type name
        got: String,
    },

    /// Value does not fit in the target type
    #[error("Value {value} out of range for {type_name}")]
    OutOfRange {
        /// Target type name
        type_name: String,
        /// Offending value, rendered
        value: String,
    },
}

impl ConversionError {
    /// Shorthand for a type mismatch
    pub fn mismatch(expected: impl Into<String>, got: impl Into<String>) -> Self {
        ConversionError::TypeMismatch {
            expected: expected.into(),
            got: got.into(),
        }
    }
}
