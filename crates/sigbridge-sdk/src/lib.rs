//! Sigbridge SDK - value types shared by the bridge and its hosts
//!
//! This crate holds what a host needs to talk to the bridge without
//! depending on the engine: the NaN-boxed argument slot, the dynamic
//! value model, script callables and the converter trait.
//!
//! # Example
//!
//! ```ignore
//! use sigbridge_sdk::{IntConverter, NativeValue, TypeConverter, Value};
//!
//! let slot = IntConverter.to_native(&Value::Int(3))?;
//! assert_eq!(slot.as_i32(), Some(3));
//! ```

#![warn(missing_docs)]

pub mod convert;
pub mod error;
pub mod handler;
pub mod types;
pub mod value;

pub use convert::{
    builtin_converters, BoolConverter, DoubleConverter, Int64Converter, IntConverter,
    ObjectConverter, TypeConverter,
};
pub use error::{ConvResult, ConversionError};
pub use handler::{ScriptFn, ScriptFunction, ScriptResult};
pub use types::{NativeHandle, Value};
pub use value::NativeValue;
