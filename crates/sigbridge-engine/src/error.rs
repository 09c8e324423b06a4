//! Bridge errors
//!
//! Malformed state (entities without identity, corrupt payloads, grammar
//! violations from the generator, patch failures) escalates to the caller.
//! Read-only writes, unknown converters, conversion failures, unsupported
//! resets and raising callables are ordinary conditions a caller may catch.

use sigbridge_sdk::ConversionError;
use thiserror::Error;

/// Result type for bridge operations
pub type BridgeResult<T> = Result<T, BridgeError>;

/// Errors raised by the signature and metaobject bridge
#[derive(Debug, Clone, Error, PartialEq)]
pub enum BridgeError {
    /// Entity lacks a required identity attribute
    #[error("Malformed entity {entity}: missing {attribute}")]
    MalformedEntity {
        /// Entity description
        entity: String,
        /// Name of the missing attribute
        attribute: &'static str,
    },

    /// Compressed signature payload could not be inflated
    #[error("Cannot decompress signatures of {key}: {reason}")]
    Decompression {
        /// Key the payload was registered under
        key: String,
        /// Decoder message
        reason: String,
    },

    /// No converter is registered for a declared type name
    #[error("Unknown type '{type_name}'")]
    UnknownConverter {
        /// Declared type name
        type_name: String,
    },

    /// A converter exists but the value did not convert
    #[error("Conversion to '{type_name}' failed: {source}")]
    Conversion {
        /// Declared type name
        type_name: String,
        /// Converter error
        source: ConversionError,
    },

    /// Write to a property without setter, deleter or resetter
    #[error("Attribute '{name}' is read only")]
    ReadOnlyAttribute {
        /// Property name
        name: String,
    },

    /// Reset on a property without resetter
    #[error("Attribute '{name}' cannot be reset")]
    ResetUnsupported {
        /// Property name
        name: String,
    },

    /// Signature line does not follow the generator grammar
    #[error("Invalid signature line {line:?}: {reason}")]
    SignatureSyntax {
        /// Offending line
        line: String,
        /// What was wrong
        reason: String,
    },

    /// Property construction violated a declaration rule
    #[error("Invalid property: {reason}")]
    InvalidProperty {
        /// Violated rule
        reason: String,
    },

    /// A script callable raised
    #[error("Call to {callable} failed: {message}")]
    CallFailed {
        /// Callable name
        callable: String,
        /// Raised message
        message: String,
    },

    /// Call arguments match none of the callable's signatures
    #[error("{message}")]
    ArgumentMismatch {
        /// Qualified callable name
        callable: String,
        /// Rendered report with the supported signatures
        message: String,
    },

    /// Native handle has no registered wrapper
    #[error("No wrapper registered for native object {handle}")]
    UnknownInstance {
        /// Native handle, rendered
        handle: String,
    },

    /// Attribute injection failed
    #[error("Cannot install attribute '{attribute}' on {target}: {reason}")]
    PatchFailed {
        /// Target metakind
        target: String,
        /// Attribute name
        attribute: String,
        /// What went wrong
        reason: String,
    },
}

impl BridgeError {
    /// True for conditions a caller is expected to handle
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            BridgeError::ReadOnlyAttribute { .. }
                | BridgeError::UnknownConverter { .. }
                | BridgeError::Conversion { .. }
                | BridgeError::ResetUnsupported { .. }
                | BridgeError::CallFailed { .. }
                | BridgeError::ArgumentMismatch { .. }
        )
    }

    /// True if the error reports a type name without converter
    pub fn is_unknown_type(&self) -> bool {
        matches!(self, BridgeError::UnknownConverter { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recoverable_classes() {
        let read_only = BridgeError::ReadOnlyAttribute {
            name: "x".to_string(),
        };
        let malformed = BridgeError::MalformedEntity {
            entity: "Widget".to_string(),
            attribute: "__qualname__",
        };
        assert!(read_only.is_recoverable());
        assert!(!malformed.is_recoverable());
        assert_eq!(read_only.to_string(), "Attribute 'x' is read only");
    }

    #[test]
    fn test_unknown_type_is_distinct_from_conversion() {
        let unknown = BridgeError::UnknownConverter {
            type_name: "QString".to_string(),
        };
        let failed = BridgeError::Conversion {
            type_name: "int".to_string(),
            source: ConversionError::mismatch("int", "str"),
        };
        assert!(unknown.is_unknown_type());
        assert!(!failed.is_unknown_type());
    }
}
