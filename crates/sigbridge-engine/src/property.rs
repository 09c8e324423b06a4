//! Property descriptors
//!
//! A `PropertyDescriptor` bundles the script accessors of one reflected
//! property with its declared native type name and meta-object flags.
//! Descriptors are never modified after construction: the `with_*`
//! modifiers return a new descriptor that inherits every slot not being
//! replaced.
//!
//! # Accessor semantics
//!
//! - `get`: getter(instance), or no value without a getter
//! - `set`: setter(instance, value), else deleter(instance), else
//!   resetter(instance), else a read-only error
//! - `reset`: resetter(instance), else a reset-unsupported error

use std::fmt;
use std::sync::Arc;

use parking_lot::RwLock;
use sigbridge_sdk::{NativeValue, ScriptFunction, Value};

use crate::converter::ConverterRegistry;
use crate::error::{BridgeError, BridgeResult};

/// Meta-object flags of a property
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PropertyFlags {
    /// Visible in designers
    pub designable: bool,
    /// Accessible from scripts
    pub scriptable: bool,
    /// Saved with the object state
    pub stored: bool,
    /// The user-facing property of the type
    pub user: bool,
    /// Never changes
    pub constant: bool,
    /// Cannot be overridden
    pub final_: bool,
}

impl Default for PropertyFlags {
    fn default() -> Self {
        Self {
            designable: true,
            scriptable: true,
            stored: true,
            user: false,
            constant: false,
            final_: false,
        }
    }
}

/// Property access requested by the native metacall loop
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PropertyCall {
    /// Read into slot 0
    Read,
    /// Write from slot 0
    Write,
    /// Reset
    Reset,
}

#[derive(Debug, Clone, Default)]
struct DocState {
    text: Option<String>,
    from_getter: bool,
}

/// One reflected property
pub struct PropertyDescriptor {
    name: String,
    type_name: String,
    getter: Option<Arc<ScriptFunction>>,
    setter: Option<Arc<ScriptFunction>>,
    resetter: Option<Arc<ScriptFunction>>,
    deleter: Option<Arc<ScriptFunction>>,
    notify: Option<String>,
    flags: PropertyFlags,
    doc: RwLock<DocState>,
}

impl PropertyDescriptor {
    /// Start declaring a property
    pub fn builder(name: impl Into<String>, type_name: impl Into<String>) -> PropertyBuilder {
        PropertyBuilder {
            name: name.into(),
            type_name: type_name.into(),
            getter: None,
            setter: None,
            resetter: None,
            deleter: None,
            notify: None,
            flags: PropertyFlags::default(),
            doc: None,
        }
    }

    /// Property name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Declared native type name
    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    /// Flags
    pub fn flags(&self) -> PropertyFlags {
        self.flags
    }

    /// Notify signal signature
    pub fn notify(&self) -> Option<&str> {
        self.notify.as_deref()
    }

    /// Getter
    pub fn getter(&self) -> Option<&Arc<ScriptFunction>> {
        self.getter.as_ref()
    }

    /// Setter
    pub fn setter(&self) -> Option<&Arc<ScriptFunction>> {
        self.setter.as_ref()
    }

    /// Resetter
    pub fn resetter(&self) -> Option<&Arc<ScriptFunction>> {
        self.resetter.as_ref()
    }

    /// Deleter
    pub fn deleter(&self) -> Option<&Arc<ScriptFunction>> {
        self.deleter.as_ref()
    }

    /// Documentation: the explicit doc, else the getter's doc.
    /// The getter's doc is fetched on first access and cached.
    pub fn doc(&self) -> Option<String> {
        {
            let state = self.doc.read();
            if state.text.is_some() {
                return state.text.clone();
            }
        }
        let derived = self.getter.as_ref().and_then(|g| g.doc()).map(str::to_string);
        if derived.is_some() {
            let mut state = self.doc.write();
            if state.text.is_none() {
                state.text = derived;
                state.from_getter = true;
            }
            return state.text.clone();
        }
        None
    }

    // ========================================================================
    // Copy modifiers
    // ========================================================================

    fn copy_with(&self, slot: Slot, func: ScriptFunction) -> PropertyDescriptor {
        let doc = self.doc.read().clone();
        let mut copy = PropertyDescriptor {
            name: self.name.clone(),
            type_name: self.type_name.clone(),
            getter: self.getter.clone(),
            setter: self.setter.clone(),
            resetter: self.resetter.clone(),
            deleter: self.deleter.clone(),
            notify: self.notify.clone(),
            flags: self.flags,
            doc: RwLock::new(doc),
        };
        let func = Some(Arc::new(func));
        match slot {
            Slot::Getter => {
                copy.getter = func;
                // A getter-derived doc belongs to the old getter
                let state = copy.doc.get_mut();
                if state.from_getter {
                    *state = DocState::default();
                }
            }
            Slot::Setter => copy.setter = func,
            Slot::Resetter => copy.resetter = func,
            Slot::Deleter => copy.deleter = func,
        }
        copy
    }

    /// Copy with a new getter
    pub fn with_getter(&self, getter: ScriptFunction) -> PropertyDescriptor {
        self.copy_with(Slot::Getter, getter)
    }

    /// Copy with a new setter
    pub fn with_setter(&self, setter: ScriptFunction) -> PropertyDescriptor {
        self.copy_with(Slot::Setter, setter)
    }

    /// Copy with a new resetter
    pub fn with_resetter(&self, resetter: ScriptFunction) -> PropertyDescriptor {
        self.copy_with(Slot::Resetter, resetter)
    }

    /// Copy with a new deleter
    pub fn with_deleter(&self, deleter: ScriptFunction) -> PropertyDescriptor {
        self.copy_with(Slot::Deleter, deleter)
    }

    // ========================================================================
    // Access
    // ========================================================================

    /// Read the property. `Ok(None)` when there is no getter.
    pub fn get(&self, instance: &Value) -> BridgeResult<Option<Value>> {
        match &self.getter {
            Some(getter) => call(getter, &[instance.clone()]).map(Some),
            None => Ok(None),
        }
    }

    /// Write the property
    pub fn set(&self, instance: &Value, value: Value) -> BridgeResult<()> {
        if let Some(setter) = &self.setter {
            return call(setter, &[instance.clone(), value]).map(drop);
        }
        if let Some(deleter) = &self.deleter {
            return call(deleter, &[instance.clone()]).map(drop);
        }
        if let Some(resetter) = &self.resetter {
            return call(resetter, &[instance.clone()]).map(drop);
        }
        Err(BridgeError::ReadOnlyAttribute {
            name: self.name.clone(),
        })
    }

    /// Reset the property
    pub fn reset(&self, instance: &Value) -> BridgeResult<()> {
        match &self.resetter {
            Some(resetter) => call(resetter, &[instance.clone()]).map(drop),
            None => Err(BridgeError::ResetUnsupported {
                name: self.name.clone(),
            }),
        }
    }

    /// Serve a native property access. Slot 0 carries the value.
    ///
    /// A type name without converter is reported as `UnknownConverter`;
    /// a value the converter rejects is reported as `Conversion`.
    pub fn meta_call(
        &self,
        call: PropertyCall,
        instance: &Value,
        slots: &mut [NativeValue],
        converters: &ConverterRegistry,
    ) -> BridgeResult<()> {
        match call {
            PropertyCall::Read => {
                let Some(value) = self.get(instance)? else {
                    return Ok(());
                };
                let converter = converters.resolve(&self.type_name)?;
                let native = converter
                    .to_native(&value)
                    .map_err(|source| BridgeError::Conversion {
                        type_name: self.type_name.clone(),
                        source,
                    })?;
                *self.value_slot(slots)? = native;
                Ok(())
            }
            PropertyCall::Write => {
                let converter = converters.resolve(&self.type_name)?;
                let slot = *self.value_slot(slots)?;
                let value = converter
                    .to_dynamic(slot)
                    .map_err(|source| BridgeError::Conversion {
                        type_name: self.type_name.clone(),
                        source,
                    })?;
                self.set(instance, value)
            }
            PropertyCall::Reset => self.reset(instance),
        }
    }

    fn value_slot<'a>(&self, slots: &'a mut [NativeValue]) -> BridgeResult<&'a mut NativeValue> {
        slots.first_mut().ok_or_else(|| BridgeError::CallFailed {
            callable: self.name.clone(),
            message: "empty argument vector".to_string(),
        })
    }
}

impl fmt::Debug for PropertyDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PropertyDescriptor")
            .field("name", &self.name)
            .field("type_name", &self.type_name)
            .field("getter", &self.getter.as_ref().map(|g| g.name().to_string()))
            .field("setter", &self.setter.as_ref().map(|s| s.name().to_string()))
            .field("resetter", &self.resetter.as_ref().map(|r| r.name().to_string()))
            .field("deleter", &self.deleter.as_ref().map(|d| d.name().to_string()))
            .field("flags", &self.flags)
            .finish()
    }
}

#[derive(Clone, Copy)]
enum Slot {
    Getter,
    Setter,
    Resetter,
    Deleter,
}

fn call(func: &ScriptFunction, args: &[Value]) -> BridgeResult<Value> {
    func.call(args).map_err(|message| BridgeError::CallFailed {
        callable: func.name().to_string(),
        message,
    })
}

/// Builder for [`PropertyDescriptor`]
pub struct PropertyBuilder {
    name: String,
    type_name: String,
    getter: Option<ScriptFunction>,
    setter: Option<ScriptFunction>,
    resetter: Option<ScriptFunction>,
    deleter: Option<ScriptFunction>,
    notify: Option<String>,
    flags: PropertyFlags,
    doc: Option<String>,
}

impl PropertyBuilder {
    /// Getter
    pub fn getter(mut self, f: ScriptFunction) -> Self {
        self.getter = Some(f);
        self
    }

    /// Setter
    pub fn setter(mut self, f: ScriptFunction) -> Self {
        self.setter = Some(f);
        self
    }

    /// Resetter
    pub fn resetter(mut self, f: ScriptFunction) -> Self {
        self.resetter = Some(f);
        self
    }

    /// Deleter
    pub fn deleter(mut self, f: ScriptFunction) -> Self {
        self.deleter = Some(f);
        self
    }

    /// Notify signal signature
    pub fn notify(mut self, signal: impl Into<String>) -> Self {
        self.notify = Some(signal.into());
        self
    }

    /// Flags
    pub fn flags(mut self, flags: PropertyFlags) -> Self {
        self.flags = flags;
        self
    }

    /// Explicit documentation
    pub fn doc(mut self, doc: impl Into<String>) -> Self {
        self.doc = Some(doc.into());
        self
    }

    /// Validate and finish
    pub fn build(self) -> BridgeResult<PropertyDescriptor> {
        if self.type_name.trim().is_empty() {
            return Err(BridgeError::InvalidProperty {
                reason: "Invalid property type or type name.".to_string(),
            });
        }
        if self.flags.constant && (self.setter.is_some() || self.notify.is_some()) {
            return Err(BridgeError::InvalidProperty {
                reason: "A constant property cannot have a WRITE method or a NOTIFY signal."
                    .to_string(),
            });
        }
        Ok(PropertyDescriptor {
            name: self.name,
            type_name: self.type_name,
            getter: self.getter.map(Arc::new),
            setter: self.setter.map(Arc::new),
            resetter: self.resetter.map(Arc::new),
            deleter: self.deleter.map(Arc::new),
            notify: self.notify,
            flags: self.flags,
            doc: RwLock::new(DocState {
                text: self.doc,
                from_getter: false,
            }),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sigbridge_sdk::NativeHandle;

    fn instance() -> Value {
        Value::Object(NativeHandle::from_raw(7))
    }

    fn getter(doc: &str) -> ScriptFunction {
        ScriptFunction::new("value", |_| Ok(Value::Int(42))).with_doc(doc)
    }

    #[test]
    fn test_no_accessors() {
        let prop = PropertyDescriptor::builder("value", "int").build().unwrap();
        assert_eq!(prop.get(&instance()).unwrap(), None);
        assert!(matches!(
            prop.set(&instance(), Value::Int(1)),
            Err(BridgeError::ReadOnlyAttribute { .. })
        ));
        assert!(matches!(
            prop.reset(&instance()),
            Err(BridgeError::ResetUnsupported { .. })
        ));
    }

    #[test]
    fn test_set_falls_back_to_deleter_then_resetter() {
        let prop = PropertyDescriptor::builder("value", "int")
            .resetter(ScriptFunction::new("reset", |_| Ok(Value::str("reset"))))
            .build()
            .unwrap();
        assert!(prop.set(&instance(), Value::Int(1)).is_ok());

        let deleted = std::sync::Arc::new(std::sync::atomic::AtomicBool::new(false));
        let flag = deleted.clone();
        let prop = prop.with_deleter(ScriptFunction::new("del", move |_| {
            flag.store(true, std::sync::atomic::Ordering::SeqCst);
            Ok(Value::None)
        }));
        prop.set(&instance(), Value::Int(1)).unwrap();
        assert!(deleted.load(std::sync::atomic::Ordering::SeqCst));
    }

    #[test]
    fn test_raising_getter_is_call_failure() {
        let prop = PropertyDescriptor::builder("value", "int")
            .getter(ScriptFunction::new("value", |_| Err("boom".to_string())))
            .build()
            .unwrap();
        assert!(matches!(
            prop.get(&instance()),
            Err(BridgeError::CallFailed { .. })
        ));
    }

    #[test]
    fn test_construction_rules() {
        assert!(matches!(
            PropertyDescriptor::builder("value", " ").build(),
            Err(BridgeError::InvalidProperty { .. })
        ));
        let constant = PropertyFlags {
            constant: true,
            ..PropertyFlags::default()
        };
        assert!(PropertyDescriptor::builder("value", "int")
            .flags(constant)
            .notify("valueChanged()")
            .build()
            .is_err());
        assert!(PropertyDescriptor::builder("value", "int")
            .flags(constant)
            .getter(getter("doc"))
            .build()
            .is_ok());
    }

    #[test]
    fn test_default_flags() {
        let flags = PropertyFlags::default();
        assert!(flags.designable && flags.scriptable && flags.stored);
        assert!(!flags.user && !flags.constant && !flags.final_);
    }

    #[test]
    fn test_doc_from_getter_is_rederived() {
        let prop = PropertyDescriptor::builder("value", "int")
            .getter(getter("old getter doc"))
            .build()
            .unwrap();
        assert_eq!(prop.doc().as_deref(), Some("old getter doc"));

        let replaced = prop.with_getter(getter("new getter doc"));
        assert_eq!(replaced.doc().as_deref(), Some("new getter doc"));
        assert_eq!(prop.doc().as_deref(), Some("old getter doc"));
    }

    #[test]
    fn test_explicit_doc_survives_new_getter() {
        let prop = PropertyDescriptor::builder("value", "int")
            .getter(getter("getter doc"))
            .doc("explicit")
            .build()
            .unwrap();
        let replaced = prop.with_getter(getter("other"));
        assert_eq!(replaced.doc().as_deref(), Some("explicit"));
    }

    #[test]
    fn test_meta_call_read_write() {
        let converters = ConverterRegistry::with_builtins();
        let stored = std::sync::Arc::new(parking_lot::Mutex::new(Value::Int(5)));
        let read = stored.clone();
        let write = stored.clone();
        let prop = PropertyDescriptor::builder("value", "int")
            .getter(ScriptFunction::new("value", move |_| Ok(read.lock().clone())))
            .setter(ScriptFunction::new("setValue", move |args| {
                *write.lock() = args[1].clone();
                Ok(Value::None)
            }))
            .build()
            .unwrap();

        let mut slots = [NativeValue::null()];
        prop.meta_call(PropertyCall::Read, &instance(), &mut slots, &converters)
            .unwrap();
        assert_eq!(slots[0].as_i32(), Some(5));

        let mut slots = [NativeValue::i32(9)];
        prop.meta_call(PropertyCall::Write, &instance(), &mut slots, &converters)
            .unwrap();
        assert_eq!(*stored.lock(), Value::Int(9));
    }

    #[test]
    fn test_meta_call_conversion_failure() {
        let converters = ConverterRegistry::with_builtins();
        let prop = PropertyDescriptor::builder("value", "int")
            .getter(ScriptFunction::new("value", |_| Ok(Value::str("not an int"))))
            .build()
            .unwrap();
        let mut slots = [NativeValue::null()];
        let err = prop
            .meta_call(PropertyCall::Read, &instance(), &mut slots, &converters)
            .unwrap_err();
        assert!(matches!(err, BridgeError::Conversion { .. }));
        assert!(!err.is_unknown_type());
    }
}
