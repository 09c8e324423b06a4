//! Metacall dispatch helpers
//!
//! The native object system funnels property access and method
//! invocation through one entry point taking a call kind, an index and an
//! argument vector. Slot 0 of the vector carries the return value (or the
//! property value), slots 1.. carry the arguments.

use sigbridge_sdk::{NativeValue, ScriptFunction, Value};

use crate::converter::ConverterRegistry;
use crate::error::{BridgeError, BridgeResult};
use crate::property::PropertyCall;
use crate::signal::MetaMethod;

/// Kind of a native metacall
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetaCall {
    /// Read a property into slot 0
    ReadProperty,
    /// Write a property from slot 0
    WriteProperty,
    /// Reset a property
    ResetProperty,
    /// Invoke a signal or slot
    InvokeMetaMethod,
    /// Any other call kind; not handled by the bridge
    Other(u32),
}

impl MetaCall {
    /// Property access requested by this call, if any
    pub fn property_call(self) -> Option<PropertyCall> {
        match self {
            MetaCall::ReadProperty => Some(PropertyCall::Read),
            MetaCall::WriteProperty => Some(PropertyCall::Write),
            MetaCall::ResetProperty => Some(PropertyCall::Reset),
            MetaCall::InvokeMetaMethod | MetaCall::Other(_) => None,
        }
    }
}

/// Outcome of invoking a script function for a meta-method
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CallResult {
    /// Call completed and the return value (if any) was stored
    Ok,
    /// The function raised
    OtherError(String),
    /// The return value could not be converted
    ReturnValueError,
    /// Argument at this index could not be converted
    ArgumentError(usize),
}

impl CallResult {
    /// Check for success
    pub fn is_ok(&self) -> bool {
        matches!(self, CallResult::Ok)
    }

    /// Convert into a bridge result with a diagnostic naming the method
    pub fn into_result(self, method: &MetaMethod) -> BridgeResult<()> {
        let message = match self {
            CallResult::Ok => return Ok(()),
            CallResult::OtherError(message) => message,
            CallResult::ReturnValueError => format!(
                "The return value of \"{}\" cannot be converted.",
                method.signature()
            ),
            CallResult::ArgumentError(index) => format!(
                "Cannot call meta function \"{}\" because parameter {} of type \"{}\" cannot be converted.",
                method.signature(),
                index,
                method.parameter_types().get(index).map(String::as_str).unwrap_or("?")
            ),
        };
        Err(BridgeError::CallFailed {
            callable: method.signature().to_string(),
            message,
        })
    }
}

/// Call `func` for `method` with the arguments in `slots[1..]`.
///
/// `receiver` is prepended to the converted arguments. A non-`None`
/// return value is converted with the method's return type into slot 0.
pub fn call_script_method(
    func: &ScriptFunction,
    receiver: Option<&Value>,
    method: &MetaMethod,
    slots: &mut [NativeValue],
    converters: &ConverterRegistry,
) -> CallResult {
    let mut args = Vec::with_capacity(method.parameter_types().len() + 1);
    if let Some(receiver) = receiver {
        args.push(receiver.clone());
    }
    for (index, type_name) in method.parameter_types().iter().enumerate() {
        let Some(slot) = slots.get(index + 1) else {
            return CallResult::ArgumentError(index);
        };
        let Some(converter) = converters.get(type_name) else {
            return CallResult::ArgumentError(index);
        };
        match converter.to_dynamic(*slot) {
            Ok(value) => args.push(value),
            Err(_) => return CallResult::ArgumentError(index),
        }
    }

    let result = match func.call(&args) {
        Ok(result) => result,
        Err(message) => return CallResult::OtherError(message),
    };

    if let (Some(return_type), false) = (method.return_type(), result.is_none()) {
        let Some(converter) = converters.get(return_type) else {
            return CallResult::ReturnValueError;
        };
        let Ok(native) = converter.to_native(&result) else {
            return CallResult::ReturnValueError;
        };
        match slots.first_mut() {
            Some(slot) => *slot = native,
            None => return CallResult::ReturnValueError,
        }
    }
    CallResult::Ok
}
