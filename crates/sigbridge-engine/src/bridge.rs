//! Bridge facade
//!
//! Ties the reflection registry, the attribute patcher and the
//! marshalling services together behind the calls made by generated
//! wrapper code (signature registration, module finalization, metacalls)
//! and by the scripting layer (signature and attribute lookups).

use std::sync::Arc;

use sigbridge_sdk::{NativeHandle, NativeValue, Value};

use crate::binding::BindingManager;
use crate::config::BridgeConfig;
use crate::converter::ConverterRegistry;
use crate::error::{BridgeError, BridgeResult};
use crate::metacall::{call_script_method, MetaCall};
use crate::object::{
    Accessor, Attribute, BuiltinFunction, Entity, Instance, MetaKind, MethodBinding, MethodDef,
    ModuleDef, NativeProperty, NativeType, Owner, Receiver,
};
use crate::patch::AttributePatcher;
use crate::registry::{ReflectionRegistry, SignatureBlob, TypeKey};
use crate::signal::{MethodKind, SignalManager};
use crate::signature::{render_member, FuncKind, Layout, Signature};

/// Modifier selecting the function kind instead of a layout
pub const FUNC_KIND_MODIFIER: &str = "__func_kind__";

/// Result of a signature lookup
#[derive(Debug, Clone, PartialEq)]
pub enum SignatureValue {
    /// Rendered signature or overload family
    Signature(Signature),
    /// Function kind (`__func_kind__`)
    Kind(FuncKind),
}

/// Result of an attribute lookup
#[derive(Debug, Clone)]
pub enum AttrValue {
    /// `__signature__`; `None` when the entity has no native signature
    Signature(Option<SignatureValue>),
    /// `__doc__`
    Doc(Option<String>),
    /// A reflectable member
    Entity(Entity),
    /// A plain value or a property read
    Value(Value),
    /// Read of a property that has no getter
    NoValue,
    /// Native getter/setter pair presented as one property
    NativeProperty {
        /// Property name
        name: String,
        /// Getter, bound when read through an instance
        getter: Entity,
        /// Setter, absent for read-only properties
        setter: Option<Entity>,
    },
}

/// The signature and metaobject bridge
pub struct Bridge {
    registry: Arc<ReflectionRegistry>,
    patcher: AttributePatcher,
    bindings: BindingManager,
    signals: SignalManager,
    converters: ConverterRegistry,
    config: BridgeConfig,
}

impl Bridge {
    /// Bridge with a fresh registry
    pub fn new(config: BridgeConfig) -> Self {
        Self::with_registry(Arc::new(ReflectionRegistry::new()), config)
    }

    /// Bridge over a shared registry
    pub fn with_registry(registry: Arc<ReflectionRegistry>, config: BridgeConfig) -> Self {
        Self {
            registry,
            patcher: AttributePatcher::new(),
            bindings: BindingManager::new(),
            signals: SignalManager::new(config.clone()),
            converters: ConverterRegistry::with_builtins(),
            config,
        }
    }

    /// Bridge configured from the environment
    pub fn from_env() -> Self {
        Self::new(BridgeConfig::from_env())
    }

    /// Reflection registry
    pub fn registry(&self) -> &Arc<ReflectionRegistry> {
        &self.registry
    }

    /// Attribute patcher
    pub fn patcher(&self) -> &AttributePatcher {
        &self.patcher
    }

    /// Wrapper table
    pub fn bindings(&self) -> &BindingManager {
        &self.bindings
    }

    /// Signal manager
    pub fn signals(&self) -> &SignalManager {
        &self.signals
    }

    /// Converter table
    pub fn converters(&self) -> &ConverterRegistry {
        &self.converters
    }

    /// Configuration
    pub fn config(&self) -> &BridgeConfig {
        &self.config
    }

    // ========================================================================
    // Registration
    // ========================================================================

    /// Register raw signature lines for a type or module
    pub fn init_signature_strings<S: AsRef<str>>(&self, owner: &Owner, lines: &[S]) -> BridgeResult<TypeKey> {
        self.registry.register(owner, SignatureBlob::lines(lines))
    }

    /// Register a zlib-compressed payload. An empty slice is an empty payload.
    pub fn init_signature_bytes(&self, owner: &Owner, bytes: &[u8]) -> BridgeResult<TypeKey> {
        self.registry.register(owner, SignatureBlob::Compressed(bytes.to_vec()))
    }

    /// Finish a module: install the accessors (first module only) and
    /// record the module's functions as owned by it.
    pub fn finish_signature_init(&self, module: &Arc<ModuleDef>) -> BridgeResult<()> {
        self.patcher.ensure_installed()?;
        self.registry.names().record_module_owners(module);
        log::debug!(target: "sigbridge::signature", "finished signature init of {}", module.name());
        Ok(())
    }

    /// Wrapper of a native object, created on first sight
    pub fn wrap_instance(&self, handle: NativeHandle, ty: &Arc<NativeType>) -> Arc<Instance> {
        self.bindings.wrap(handle, ty)
    }

    /// Drop the wrapper and the signal channels of a native object
    pub fn release_instance(&self, handle: NativeHandle) -> bool {
        self.signals.deregister(handle);
        self.bindings.release(handle).is_some()
    }

    // ========================================================================
    // Signatures
    // ========================================================================

    /// Signature of an entity under a layout modifier.
    ///
    /// `None` for entities without native signature, for members without
    /// an entry and for unknown modifiers.
    pub fn get_signature(&self, entity: &Entity, modifier: Option<&str>) -> BridgeResult<Option<SignatureValue>> {
        let layout = match modifier {
            None => Some(Layout::SIGNATURE),
            Some(FUNC_KIND_MODIFIER) => None,
            Some(name) => match Layout::by_name(name) {
                Some(layout) => Some(layout),
                None => return Ok(None),
            },
        };

        let Some((member, kind)) = member_of(entity) else {
            return Ok(None);
        };

        // Inherited members are described by the type that declares them
        let mut current = self.registry.class_or_module_of(entity);
        while let Some(owner) = current {
            if let Some(dict) = self.registry.props_for(&owner)? {
                let props = match (dict.get(&member), entity) {
                    (Some(props), _) => Some(props),
                    // `__init__` without own entry takes the class signature
                    (None, Entity::WrapperDescriptor { owner: ty, name }) if name == "__init__" => {
                        dict.get(ty.short_name())
                    }
                    (None, _) => None,
                };
                if let Some(props) = props {
                    return Ok(Some(match layout {
                        Some(layout) => SignatureValue::Signature(render_member(props, layout)),
                        None => SignatureValue::Kind(kind),
                    }));
                }
            }
            current = match (&owner, entity) {
                (_, Entity::Type(_)) | (Owner::Module(_), _) => None,
                (Owner::Type(ty), _) => ty.base().cloned().map(Owner::Type),
            };
        }
        Ok(None)
    }

    /// Error for a call whose argument types match none of the callable's
    /// signatures. Supported signatures are listed in the `typeerror`
    /// layout under the qualified callable name:
    ///
    /// ```text
    /// 'mod.Widget.resize' called with wrong argument types:
    ///   mod.Widget.resize(str)
    /// Supported signatures:
    ///   mod.Widget.resize(int, int)
    /// ```
    pub fn argument_error(&self, entity: &Entity, arg_types: &[&str]) -> BridgeResult<BridgeError> {
        let callable = match entity {
            Entity::Function(func) => func.name().to_string(),
            Entity::Instance(_) | Entity::Module(_) => entity.describe(),
            Entity::Type(ty) => self.registry.type_key(&Owner::Type(ty.clone()))?.to_string(),
            _ => match (self.registry.class_or_module_of(entity), member_of(entity)) {
                (Some(owner), Some((member, _))) => format!("{}.{}", self.registry.type_key(&owner)?, member),
                (_, Some((member, _))) => member,
                (_, None) => entity.describe(),
            },
        };

        let mut message = format!(
            "'{callable}' called with wrong argument types:\n  {callable}({})",
            arg_types.join(", ")
        );
        if let Some(SignatureValue::Signature(sig)) = self.get_signature(entity, Some("typeerror"))? {
            message.push_str("\nSupported signatures:");
            for rendered in sig.signatures() {
                message.push_str(&format!("\n  {}({})", callable, rendered.parameters.join(", ")));
            }
        }
        log::debug!(target: "sigbridge::signature", "argument mismatch on {}", callable);
        Ok(BridgeError::ArgumentMismatch { callable, message })
    }

    // ========================================================================
    // Attributes
    // ========================================================================

    /// Resolve an attribute of an entity.
    ///
    /// Accessors installed on the entity's metatype come first. Type
    /// members resolve under their declared name or alternate spelling.
    pub fn get_attr(&self, entity: &Entity, name: &str) -> BridgeResult<Option<AttrValue>> {
        if let Some(kind) = entity.meta_kind() {
            match self.patcher.injected(kind, name) {
                Some(Accessor::Signature) => {
                    return Ok(Some(AttrValue::Signature(self.get_signature(entity, None)?)));
                }
                Some(Accessor::Doc) => return Ok(Some(AttrValue::Doc(self.doc_of(entity, kind)?))),
                None => {}
            }
        }

        match entity {
            Entity::Type(ty) => self.type_attr(ty, name, None),
            Entity::Instance(instance) => self.type_attr(instance.native_type(), name, Some(instance)),
            Entity::Module(module) => Ok(module.namespace().resolve(name).and_then(|attr| match attr {
                Attribute::Method(def) => Some(AttrValue::Entity(Entity::Builtin(BuiltinFunction::new(
                    def,
                    Receiver::Module(module.clone()),
                )))),
                other => plain_attr(other),
            })),
            _ => Ok(None),
        }
    }

    fn type_attr(
        &self,
        ty: &Arc<NativeType>,
        name: &str,
        instance: Option<&Arc<Instance>>,
    ) -> BridgeResult<Option<AttrValue>> {
        if self.config.true_property() {
            if let Some(property) = ty.find_native_property(name) {
                if let Some(value) = self.native_property_attr(ty, property, instance)? {
                    return Ok(Some(value));
                }
            } else if ty.is_replaced_accessor(name) {
                return Ok(None);
            }
        }

        let Some((declaring, attr)) = self.resolve_member(ty, name)? else {
            return Ok(None);
        };
        let value = match (attr, instance) {
            (Attribute::Method(def), instance) => AttrValue::Entity(bind_method(ty, declaring, def, instance)),
            (Attribute::Property(descriptor), None) => AttrValue::Entity(Entity::Property {
                owner: declaring,
                name: name.to_string(),
                descriptor,
            }),
            (Attribute::Property(descriptor), Some(instance)) => {
                let receiver = Value::Object(instance.handle());
                match descriptor.get(&receiver)? {
                    Some(value) => AttrValue::Value(value),
                    None => AttrValue::NoValue,
                }
            }
            (other, _) => return Ok(plain_attr(other)),
        };
        Ok(Some(value))
    }

    /// Namespace attribute or indexed member, with its declaring type
    fn resolve_member(&self, ty: &Arc<NativeType>, name: &str) -> BridgeResult<Option<(Arc<NativeType>, Attribute)>> {
        if let Some(found) = ty.lookup_declared(name) {
            return Ok(Some(found));
        }
        Ok(self
            .registry
            .lookup_member(ty, name)?
            .map(|(declaring, def)| (declaring, Attribute::Method(def))))
    }

    /// Getter and setter of a native property. `None` when the getter is
    /// not an instance method, so the name resolves as usual.
    fn native_property_attr(
        &self,
        ty: &Arc<NativeType>,
        property: &NativeProperty,
        instance: Option<&Arc<Instance>>,
    ) -> BridgeResult<Option<AttrValue>> {
        let accessor = |name: &str| -> BridgeResult<Option<Entity>> {
            Ok(match self.resolve_member(ty, name)? {
                Some((declaring, Attribute::Method(def))) if def.binding() == MethodBinding::Instance => {
                    Some(bind_method(ty, declaring, def, instance))
                }
                _ => None,
            })
        };
        let Some(getter) = accessor(property.read())? else {
            return Ok(None);
        };
        let setter = match property.write() {
            Some(write) => accessor(write)?,
            None => None,
        };
        Ok(Some(AttrValue::NativeProperty {
            name: property.name().to_string(),
            getter,
            setter,
        }))
    }

    /// `__doc__`: own doc, else the signature text, else the metatype's
    /// previous doc.
    fn doc_of(&self, entity: &Entity, kind: MetaKind) -> BridgeResult<Option<String>> {
        let own = match entity {
            Entity::Type(ty) => ty.doc().map(str::to_string),
            Entity::Builtin(func) | Entity::StaticMethod(func) => func.def.doc().map(str::to_string),
            Entity::MethodDescriptor { def, .. } => def.doc().map(str::to_string),
            Entity::Property { descriptor, .. } => descriptor.doc(),
            _ => None,
        };
        if own.is_some() {
            return Ok(own);
        }
        if let Some(SignatureValue::Signature(sig)) = self.get_signature(entity, None)? {
            return Ok(Some(sig.to_string()));
        }
        Ok(self.patcher.previous_doc(kind))
    }

    // ========================================================================
    // Metacall
    // ========================================================================

    /// Serve a native metacall on a wrapped object.
    ///
    /// Property calls index the type's meta-object properties (inherited
    /// first); method calls index the instance's signal/slot table. Returns
    /// `id` reduced by the number of entries handled at this level.
    pub fn qt_metacall(&self, handle: NativeHandle, call: MetaCall, id: i32, slots: &mut [NativeValue]) -> BridgeResult<i32> {
        let instance = self.bindings.retrieve(handle).ok_or_else(|| BridgeError::UnknownInstance {
            handle: handle.to_string(),
        })?;
        let ty = instance.native_type();
        let receiver = Value::Object(handle);

        if let Some(property_call) = call.property_call() {
            let properties = ty.meta_properties();
            let count = properties.len() as i32;
            let Some((_, descriptor)) = usize::try_from(id).ok().and_then(|i| properties.get(i)) else {
                return Ok(id - count);
            };
            match descriptor.meta_call(property_call, &receiver, slots, &self.converters) {
                Ok(()) => {}
                Err(e) if e.is_unknown_type() => {
                    log::warn!(
                        target: "sigbridge::metacall",
                        "Unknown property type '{}' of QObject '{}' used in fset/fget",
                        descriptor.type_name(),
                        ty.name()
                    );
                }
                Err(e) => return Err(e),
            }
            return Ok(id - count);
        }

        if call != MetaCall::InvokeMetaMethod {
            return Ok(id);
        }
        let count = self.signals.method_count(&instance) as i32;
        let Some(method) = usize::try_from(id).ok().and_then(|i| self.signals.method(&instance, i)) else {
            return Ok(id - count);
        };
        match method.kind() {
            MethodKind::Signal => {
                self.signals.emit_index(&instance, id as usize, slots, &self.converters)?;
            }
            MethodKind::Slot => {
                let func = match ty.lookup(method.name()) {
                    Some(Attribute::Function(func)) => func,
                    _ => {
                        return Err(BridgeError::CallFailed {
                            callable: method.signature().to_string(),
                            message: format!("no script implementation on {}", ty.name()),
                        })
                    }
                };
                call_script_method(&func, Some(&receiver), &method, slots, &self.converters).into_result(&method)?;
            }
        }
        Ok(id - count)
    }
}

impl Default for Bridge {
    fn default() -> Self {
        Self::new(BridgeConfig::default())
    }
}

/// Method object as seen through a type or an instance
fn bind_method(
    ty: &Arc<NativeType>,
    declaring: Arc<NativeType>,
    def: Arc<MethodDef>,
    instance: Option<&Arc<Instance>>,
) -> Entity {
    match (def.binding(), instance) {
        (MethodBinding::Instance, None) => Entity::MethodDescriptor { owner: declaring, def },
        (MethodBinding::Instance, Some(instance)) => {
            Entity::Builtin(BuiltinFunction::new(def, Receiver::Instance(instance.clone())))
        }
        (MethodBinding::Class, _) => Entity::Builtin(BuiltinFunction::new(def, Receiver::Type(ty.clone()))),
        (MethodBinding::Static, _) => Entity::StaticMethod(BuiltinFunction::new(def, Receiver::None)),
    }
}

/// Member name and function kind of a reflectable entity
fn member_of(entity: &Entity) -> Option<(String, FuncKind)> {
    Some(match entity {
        Entity::Function(_) | Entity::Instance(_) | Entity::Module(_) => return None,
        Entity::Type(ty) => (ty.short_name().to_string(), FuncKind::Method),
        Entity::Builtin(func) => (func.def.name().to_string(), builtin_kind(func)),
        Entity::StaticMethod(func) => (func.def.name().to_string(), FuncKind::StaticMethod),
        Entity::MethodDescriptor { def, .. } => (def.name().to_string(), binding_kind(def)),
        Entity::WrapperDescriptor { name, .. } => (name.clone(), FuncKind::Method),
        Entity::Property { name, .. } => (name.clone(), FuncKind::Property),
    })
}

fn binding_kind(def: &MethodDef) -> FuncKind {
    match def.binding() {
        MethodBinding::Instance => FuncKind::Method,
        MethodBinding::Class => FuncKind::ClassMethod,
        MethodBinding::Static => FuncKind::StaticMethod,
    }
}

fn builtin_kind(func: &BuiltinFunction) -> FuncKind {
    match func.receiver {
        Receiver::Module(_) => FuncKind::Function,
        _ => binding_kind(&func.def),
    }
}

/// Script functions and plain values; other attributes need an owner.
fn plain_attr(attr: Attribute) -> Option<AttrValue> {
    match attr {
        Attribute::Function(func) => Some(AttrValue::Entity(Entity::Function(func))),
        Attribute::Value(value) => Some(AttrValue::Value(value)),
        Attribute::Method(_) | Attribute::Property(_) | Attribute::Injected(_) => None,
    }
}
