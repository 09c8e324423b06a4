//! Converters between native slots and dynamic values.
//!
//! A `TypeConverter` is looked up by the native type name recorded on a
//! property or method parameter. The converters here cover the primitive
//! types and object pointers; hosts register more through the engine's
//! converter registry.

use std::sync::Arc;

use crate::error::{ConvResult, ConversionError};
use crate::types::Value;
use crate::value::{NativeValue, SLOT_I64_MAX, SLOT_I64_MIN};

/// Two-way conversion for one native type.
pub trait TypeConverter: Send + Sync {
    /// Canonical native type name
    fn type_name(&self) -> &str;

    /// Convert a dynamic value into a native slot
    fn to_native(&self, value: &Value) -> ConvResult<NativeValue>;

    /// Convert a native slot into a dynamic value
    fn to_dynamic(&self, slot: NativeValue) -> ConvResult<Value>;
}

// ============================================================================
// Builtin converters
// ============================================================================

/// `bool`
#[derive(Debug, Default)]
pub struct BoolConverter;

impl TypeConverter for BoolConverter {
    fn type_name(&self) -> &str {
        "bool"
    }

    fn to_native(&self, value: &Value) -> ConvResult<NativeValue> {
        match value {
            Value::Bool(b) => Ok(NativeValue::bool(*b)),
            other => Err(ConversionError::mismatch("bool", other.kind())),
        }
    }

    fn to_dynamic(&self, slot: NativeValue) -> ConvResult<Value> {
        slot.as_bool()
            .map(Value::Bool)
            .ok_or_else(|| ConversionError::mismatch("bool", slot.type_name()))
    }
}

/// `int` (32-bit signed)
#[derive(Debug, Default)]
pub struct IntConverter;

impl TypeConverter for IntConverter {
    fn type_name(&self) -> &str {
        "int"
    }

    fn to_native(&self, value: &Value) -> ConvResult<NativeValue> {
        match value {
            Value::Int(i) => i32::try_from(*i).map(NativeValue::i32).map_err(|_| {
                ConversionError::OutOfRange {
                    type_name: "int".to_string(),
                    value: i.to_string(),
                }
            }),
            Value::Bool(b) => Ok(NativeValue::i32(*b as i32)),
            other => Err(ConversionError::mismatch("int", other.kind())),
        }
    }

    fn to_dynamic(&self, slot: NativeValue) -> ConvResult<Value> {
        slot.as_i32()
            .map(Value::from)
            .ok_or_else(|| ConversionError::mismatch("int", slot.type_name()))
    }
}

/// `qint64` (carried in a 48-bit slot payload)
#[derive(Debug, Default)]
pub struct Int64Converter;

impl TypeConverter for Int64Converter {
    fn type_name(&self) -> &str {
        "qint64"
    }

    fn to_native(&self, value: &Value) -> ConvResult<NativeValue> {
        match value {
            Value::Int(i) if (SLOT_I64_MIN..=SLOT_I64_MAX).contains(i) => Ok(NativeValue::i64(*i)),
            Value::Int(i) => Err(ConversionError::OutOfRange {
                type_name: "qint64".to_string(),
                value: i.to_string(),
            }),
            other => Err(ConversionError::mismatch("qint64", other.kind())),
        }
    }

    fn to_dynamic(&self, slot: NativeValue) -> ConvResult<Value> {
        slot.as_i64()
            .or_else(|| slot.as_i32().map(i64::from))
            .map(Value::Int)
            .ok_or_else(|| ConversionError::mismatch("qint64", slot.type_name()))
    }
}

/// `double`
#[derive(Debug, Default)]
pub struct DoubleConverter;

impl TypeConverter for DoubleConverter {
    fn type_name(&self) -> &str {
        "double"
    }

    fn to_native(&self, value: &Value) -> ConvResult<NativeValue> {
        match value {
            Value::Float(f) => Ok(NativeValue::f64(*f)),
            Value::Int(i) => Ok(NativeValue::f64(*i as f64)),
            other => Err(ConversionError::mismatch("double", other.kind())),
        }
    }

    fn to_dynamic(&self, slot: NativeValue) -> ConvResult<Value> {
        slot.as_f64()
            .map(Value::Float)
            .ok_or_else(|| ConversionError::mismatch("double", slot.type_name()))
    }
}

/// Native object pointer, carried as a handle
#[derive(Debug, Default)]
pub struct ObjectConverter;

impl TypeConverter for ObjectConverter {
    fn type_name(&self) -> &str {
        "QObject*"
    }

    fn to_native(&self, value: &Value) -> ConvResult<NativeValue> {
        match value {
            Value::Object(h) => Ok(NativeValue::handle(*h)),
            Value::None => Ok(NativeValue::null()),
            other => Err(ConversionError::mismatch("QObject*", other.kind())),
        }
    }

    fn to_dynamic(&self, slot: NativeValue) -> ConvResult<Value> {
        if slot.is_null() {
            return Ok(Value::None);
        }
        slot.as_handle()
            .map(Value::Object)
            .ok_or_else(|| ConversionError::mismatch("QObject*", slot.type_name()))
    }
}

/// Builtin converters with the type names each one answers to.
///
/// The first name in each list is the canonical one.
pub fn builtin_converters() -> Vec<(&'static [&'static str], Arc<dyn TypeConverter>)> {
    vec![
        (&["bool"][..], Arc::new(BoolConverter) as Arc<dyn TypeConverter>),
        (&["int", "qint32", "int32_t"][..], Arc::new(IntConverter)),
        (&["qint64", "long long", "int64_t"][..], Arc::new(Int64Converter)),
        (&["double", "qreal", "float"][..], Arc::new(DoubleConverter)),
        (&["QObject*", "QObject *"][..], Arc::new(ObjectConverter)),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::NativeHandle;

    #[test]
    fn test_int_converter_range() {
        let c = IntConverter;
        assert_eq!(c.to_native(&Value::Int(7)).unwrap().as_i32(), Some(7));
        assert!(matches!(
            c.to_native(&Value::Int(i64::from(i32::MAX) + 1)),
            Err(ConversionError::OutOfRange { .. })
        ));
        assert!(matches!(
            c.to_native(&Value::str("7")),
            Err(ConversionError::TypeMismatch { .. })
        ));
    }

    #[test]
    fn test_int64_converter_accepts_i32_slot() {
        let c = Int64Converter;
        assert_eq!(c.to_dynamic(NativeValue::i32(-3)).unwrap(), Value::Int(-3));
        assert_eq!(
            c.to_dynamic(NativeValue::i64(1 << 40)).unwrap(),
            Value::Int(1 << 40)
        );
    }

    #[test]
    fn test_object_converter_null() {
        let c = ObjectConverter;
        let h = NativeHandle::from_raw(42);
        assert_eq!(c.to_native(&Value::Object(h)).unwrap().as_handle(), Some(h));
        assert_eq!(c.to_dynamic(NativeValue::null()).unwrap(), Value::None);
    }

    #[test]
    fn test_builtin_names_unique() {
        let mut names: Vec<&str> = builtin_converters()
            .iter()
            .flat_map(|(names, _)| names.iter().copied())
            .collect();
        let total = names.len();
        names.sort();
        names.dedup();
        assert_eq!(names.len(), total);
    }
}
