//! Native types, modules, methods and wrapper instances

use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use sigbridge_sdk::{NativeHandle, ScriptFunction};

use super::namespace::{Attribute, Namespace};
use crate::error::{BridgeError, BridgeResult};
use crate::property::PropertyDescriptor;
use crate::signal::MetaMethod;
use crate::signature::snake_case_name;

// ============================================================================
// Methods
// ============================================================================

/// Unique identity of a native function object
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FuncId(u64);

impl FuncId {
    fn next() -> Self {
        static NEXT: AtomicU64 = AtomicU64::new(1);
        FuncId(NEXT.fetch_add(1, Ordering::Relaxed))
    }
}

/// How a method binds to its owner
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum MethodBinding {
    /// Bound to an instance
    #[default]
    Instance,
    /// Bound to the class
    Class,
    /// Not bound
    Static,
}

/// Entry of a native member table
#[derive(Debug, Clone)]
pub struct MethodDef {
    id: FuncId,
    name: String,
    binding: MethodBinding,
    doc: Option<String>,
}

impl MethodDef {
    /// Declare an instance method
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: FuncId::next(),
            name: name.into(),
            binding: MethodBinding::Instance,
            doc: None,
        }
    }

    /// Set the binding
    pub fn with_binding(mut self, binding: MethodBinding) -> Self {
        self.binding = binding;
        self
    }

    /// Attach a doc string
    pub fn with_doc(mut self, doc: impl Into<String>) -> Self {
        self.doc = Some(doc.into());
        self
    }

    /// Copy under another name. The copy is a distinct function object.
    pub fn renamed(&self, name: impl Into<String>) -> Self {
        Self {
            id: FuncId::next(),
            name: name.into(),
            binding: self.binding,
            doc: self.doc.clone(),
        }
    }

    /// Function identity
    pub fn id(&self) -> FuncId {
        self.id
    }

    /// Declared name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Binding
    pub fn binding(&self) -> MethodBinding {
        self.binding
    }

    /// Doc string
    pub fn doc(&self) -> Option<&str> {
        self.doc.as_deref()
    }
}

// ============================================================================
// Native property declarations
// ============================================================================

/// Property of a native type, declared by the generator as
/// `name:read[:write]`.
///
/// An empty read field means the getter is named like the property; an
/// empty write field means `set` + capitalized name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NativeProperty {
    name: String,
    read: String,
    write: Option<String>,
}

impl NativeProperty {
    /// Parse a `name:read[:write]` declaration
    pub fn parse(decl: &str) -> BridgeResult<Self> {
        let fields: Vec<&str> = decl.split(':').collect();
        let invalid = |reason: &str| BridgeError::InvalidProperty {
            reason: format!("{:?}: {}", decl, reason),
        };
        if !(2..=3).contains(&fields.len()) {
            return Err(invalid("expected name:read[:write]"));
        }
        let name = fields[0].trim();
        if name.is_empty() {
            return Err(invalid("empty property name"));
        }
        let read = match fields[1].trim() {
            "" => name.to_string(),
            read => read.to_string(),
        };
        let write = fields.get(2).map(|write| match write.trim() {
            "" => setter_name(name),
            write => write.to_string(),
        });
        Ok(Self {
            name: name.to_string(),
            read,
            write,
        })
    }

    /// Property name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Getter method name
    pub fn read(&self) -> &str {
        &self.read
    }

    /// Setter method name, if writable
    pub fn write(&self) -> Option<&str> {
        self.write.as_deref()
    }

    fn is_named(&self, name: &str) -> bool {
        self.name == name || snake_case_name(&self.name) == name
    }

    /// True if `name` spells an accessor that the property replaces
    fn replaces(&self, name: &str) -> bool {
        let spelled = |method: &str| method == name || snake_case_name(method) == name;
        (self.read != self.name && spelled(&self.read)) || self.write.as_deref().map_or(false, spelled)
    }
}

fn setter_name(property: &str) -> String {
    let mut chars = property.chars();
    match chars.next() {
        Some(first) => format!("set{}{}", first.to_uppercase(), chars.as_str()),
        None => "set".to_string(),
    }
}

// ============================================================================
// Types
// ============================================================================

/// A native type exposed to the scripting layer
pub struct NativeType {
    name: String,
    module: Option<String>,
    qualname: Option<String>,
    doc: Option<String>,
    methods: Vec<Arc<MethodDef>>,
    properties: Vec<(String, Arc<PropertyDescriptor>)>,
    native_properties: Vec<NativeProperty>,
    meta_methods: Vec<MetaMethod>,
    base: Option<Arc<NativeType>>,
    namespace: Arc<Namespace>,
}

impl NativeType {
    /// Start declaring a type
    pub fn builder(name: impl Into<String>) -> NativeTypeBuilder {
        NativeTypeBuilder {
            name: name.into(),
            module: None,
            qualname: None,
            doc: None,
            methods: Vec::new(),
            properties: Vec::new(),
            native_properties: Vec::new(),
            meta_methods: Vec::new(),
            functions: Vec::new(),
            base: None,
        }
    }

    /// Type name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Declared module name
    pub fn module(&self) -> Option<&str> {
        self.module.as_deref()
    }

    /// Declared qualified name
    pub fn qualname(&self) -> Option<&str> {
        self.qualname.as_deref()
    }

    /// Short name: last component of the qualified name
    pub fn short_name(&self) -> &str {
        let full = self.qualname.as_deref().unwrap_or(&self.name);
        full.rsplit('.').next().unwrap_or(full)
    }

    /// Own doc string
    pub fn doc(&self) -> Option<&str> {
        self.doc.as_deref()
    }

    /// Member table
    pub fn methods(&self) -> &[Arc<MethodDef>] {
        &self.methods
    }

    /// Method declared on this type or a base
    pub fn find_method(&self, name: &str) -> Option<Arc<MethodDef>> {
        self.methods
            .iter()
            .find(|m| m.name() == name)
            .cloned()
            .or_else(|| self.base.as_ref().and_then(|b| b.find_method(name)))
    }

    /// Base type
    pub fn base(&self) -> Option<&Arc<NativeType>> {
        self.base.as_ref()
    }

    /// Attribute namespace
    pub fn namespace(&self) -> &Arc<Namespace> {
        &self.namespace
    }

    /// Resolve an attribute on this type or its bases
    pub fn lookup(&self, name: &str) -> Option<Attribute> {
        self.namespace
            .resolve(name)
            .or_else(|| self.base.as_ref().and_then(|b| b.lookup(name)))
    }

    /// Resolve an attribute together with the type that declares it
    pub fn lookup_declared(self: &Arc<Self>, name: &str) -> Option<(Arc<NativeType>, Attribute)> {
        let mut current = Some(self.clone());
        while let Some(ty) = current {
            if let Some(attr) = ty.namespace.resolve(name) {
                return Some((ty, attr));
            }
            current = ty.base.clone();
        }
        None
    }

    /// Meta-object properties, inherited first, in declaration order.
    /// A property's position is its meta-object index.
    pub fn meta_properties(&self) -> Vec<(String, Arc<PropertyDescriptor>)> {
        let mut all = match &self.base {
            Some(base) => base.meta_properties(),
            None => Vec::new(),
        };
        all.extend(self.properties.iter().cloned());
        all
    }

    /// Native property declared under `name` (or its snake-case
    /// spelling) on this type or a base
    pub fn find_native_property(&self, name: &str) -> Option<&NativeProperty> {
        self.native_properties
            .iter()
            .find(|p| p.is_named(name))
            .or_else(|| self.base.as_ref().and_then(|b| b.find_native_property(name)))
    }

    /// True if `name` is a getter or setter replaced by a native property
    pub fn is_replaced_accessor(&self, name: &str) -> bool {
        self.native_properties.iter().any(|p| p.replaces(name))
            || self.base.as_ref().map_or(false, |b| b.is_replaced_accessor(name))
    }

    /// Declared signals and slots, inherited first
    pub fn meta_methods(&self) -> Vec<MetaMethod> {
        let mut all = match &self.base {
            Some(base) => base.meta_methods(),
            None => Vec::new(),
        };
        all.extend(self.meta_methods.iter().cloned());
        all
    }
}

impl fmt::Debug for NativeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NativeType")
            .field("name", &self.name)
            .field("module", &self.module)
            .field("qualname", &self.qualname)
            .field("methods", &self.methods.len())
            .field("properties", &self.properties.len())
            .finish_non_exhaustive()
    }
}

/// Builder for [`NativeType`]
pub struct NativeTypeBuilder {
    name: String,
    module: Option<String>,
    qualname: Option<String>,
    doc: Option<String>,
    methods: Vec<Arc<MethodDef>>,
    properties: Vec<(String, Arc<PropertyDescriptor>)>,
    native_properties: Vec<NativeProperty>,
    meta_methods: Vec<MetaMethod>,
    functions: Vec<Arc<ScriptFunction>>,
    base: Option<Arc<NativeType>>,
}

impl NativeTypeBuilder {
    /// Declared module name
    pub fn module(mut self, module: impl Into<String>) -> Self {
        self.module = Some(module.into());
        self
    }

    /// Declared qualified name
    pub fn qualname(mut self, qualname: impl Into<String>) -> Self {
        self.qualname = Some(qualname.into());
        self
    }

    /// Doc string
    pub fn doc(mut self, doc: impl Into<String>) -> Self {
        self.doc = Some(doc.into());
        self
    }

    /// Add a member table entry
    pub fn method(mut self, def: MethodDef) -> Self {
        self.methods.push(Arc::new(def));
        self
    }

    /// Add a meta-object property
    pub fn property(mut self, name: impl Into<String>, descriptor: PropertyDescriptor) -> Self {
        self.properties.push((name.into(), Arc::new(descriptor)));
        self
    }

    /// Declare a native property backed by getter and setter methods
    pub fn native_property(mut self, property: NativeProperty) -> Self {
        self.native_properties.push(property);
        self
    }

    /// Declare a signal or slot
    pub fn meta_method(mut self, method: MetaMethod) -> Self {
        self.meta_methods.push(method);
        self
    }

    /// Add a script function (e.g. a slot implemented in the scripting layer)
    pub fn function(mut self, func: ScriptFunction) -> Self {
        self.functions.push(Arc::new(func));
        self
    }

    /// Base type
    pub fn base(mut self, base: Arc<NativeType>) -> Self {
        self.base = Some(base);
        self
    }

    /// Finish the type
    pub fn build(self) -> Arc<NativeType> {
        let namespace = Namespace::new(self.name.clone());
        for def in &self.methods {
            namespace.insert(def.name().to_string(), Attribute::Method(def.clone()));
        }
        for (name, prop) in &self.properties {
            namespace.insert(name.clone(), Attribute::Property(prop.clone()));
        }
        for func in &self.functions {
            namespace.insert(func.name().to_string(), Attribute::Function(func.clone()));
        }
        Arc::new(NativeType {
            name: self.name,
            module: self.module,
            qualname: self.qualname,
            doc: self.doc,
            methods: self.methods,
            properties: self.properties,
            native_properties: self.native_properties,
            meta_methods: self.meta_methods,
            base: self.base,
            namespace,
        })
    }
}

// ============================================================================
// Modules
// ============================================================================

/// A native module with free functions
pub struct ModuleDef {
    name: String,
    functions: Vec<Arc<MethodDef>>,
    namespace: Arc<Namespace>,
}

impl ModuleDef {
    /// Create a module from its function table
    pub fn new(name: impl Into<String>, functions: Vec<MethodDef>) -> Arc<Self> {
        let name = name.into();
        let namespace = Namespace::new(name.clone());
        let functions: Vec<Arc<MethodDef>> = functions.into_iter().map(Arc::new).collect();
        for def in &functions {
            namespace.insert(def.name().to_string(), Attribute::Method(def.clone()));
        }
        Arc::new(Self {
            name,
            functions,
            namespace,
        })
    }

    /// Module name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Function table
    pub fn functions(&self) -> &[Arc<MethodDef>] {
        &self.functions
    }

    /// Attribute namespace
    pub fn namespace(&self) -> &Arc<Namespace> {
        &self.namespace
    }
}

impl fmt::Debug for ModuleDef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModuleDef")
            .field("name", &self.name)
            .field("functions", &self.functions.len())
            .finish()
    }
}

// ============================================================================
// Instances
// ============================================================================

/// Managed wrapper of one native object
#[derive(Debug)]
pub struct Instance {
    handle: NativeHandle,
    ty: Arc<NativeType>,
    released: AtomicBool,
}

impl Instance {
    /// Wrap a native handle
    pub fn new(handle: NativeHandle, ty: Arc<NativeType>) -> Arc<Self> {
        Arc::new(Self {
            handle,
            ty,
            released: AtomicBool::new(false),
        })
    }

    /// False once the wrapper was released from its binding table
    pub fn is_live(&self) -> bool {
        !self.released.load(Ordering::Acquire)
    }

    pub(crate) fn mark_released(&self) {
        self.released.store(true, Ordering::Release);
    }

    /// Native handle
    pub fn handle(&self) -> NativeHandle {
        self.handle
    }

    /// Wrapper type
    pub fn native_type(&self) -> &Arc<NativeType> {
        &self.ty
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_renamed_method_is_distinct() {
        let def = MethodDef::new("setValue").with_doc("sets");
        let copy = def.renamed("set_value");
        assert_ne!(def.id(), copy.id());
        assert_eq!(copy.doc(), Some("sets"));
        assert_eq!(copy.binding(), MethodBinding::Instance);
    }

    #[test]
    fn test_native_property_defaults() {
        let prop = NativeProperty::parse("windowTitle::").unwrap();
        assert_eq!(prop.read(), "windowTitle");
        assert_eq!(prop.write(), Some("setWindowTitle"));

        let read_only = NativeProperty::parse("visible:isVisible").unwrap();
        assert_eq!(read_only.read(), "isVisible");
        assert_eq!(read_only.write(), None);

        assert!(matches!(
            NativeProperty::parse("broken"),
            Err(BridgeError::InvalidProperty { .. })
        ));
        assert!(NativeProperty::parse(":read:write").is_err());
    }

    #[test]
    fn test_native_property_lookup_and_replaced_accessors() {
        let base = NativeType::builder("Base")
            .native_property(NativeProperty::parse("visible:isVisible:setVisible").unwrap())
            .build();
        let derived = NativeType::builder("Derived")
            .base(base)
            .native_property(NativeProperty::parse("windowTitle::").unwrap())
            .build();
        assert_eq!(derived.find_native_property("window_title").unwrap().name(), "windowTitle");
        assert_eq!(derived.find_native_property("visible").unwrap().read(), "isVisible");
        assert!(derived.find_native_property("setVisible").is_none());

        assert!(derived.is_replaced_accessor("setWindowTitle"));
        assert!(derived.is_replaced_accessor("set_window_title"));
        assert!(derived.is_replaced_accessor("is_visible"));
        // Getter named like the property is the property itself
        assert!(!derived.is_replaced_accessor("windowTitle"));
    }

    #[test]
    fn test_short_name_from_qualname() {
        let ty = NativeType::builder("mod.Outer.Inner")
            .module("mod")
            .qualname("Outer.Inner")
            .build();
        assert_eq!(ty.short_name(), "Inner");
    }

    #[test]
    fn test_lookup_walks_bases() {
        let base = NativeType::builder("Base")
            .module("mod")
            .qualname("Base")
            .method(MethodDef::new("show"))
            .build();
        let derived = NativeType::builder("Derived")
            .module("mod")
            .qualname("Derived")
            .base(base)
            .build();
        assert!(matches!(derived.lookup("show"), Some(Attribute::Method(_))));
        assert!(derived.find_method("show").is_some());
        assert!(derived.lookup("hide").is_none());
    }

    #[test]
    fn test_lookup_declared_reports_base() {
        let base = NativeType::builder("Base")
            .module("mod")
            .qualname("Base")
            .method(MethodDef::new("show"))
            .build();
        let derived = NativeType::builder("Derived")
            .module("mod")
            .qualname("Derived")
            .method(MethodDef::new("hide"))
            .base(base.clone())
            .build();
        let (owner, _) = derived.lookup_declared("show").unwrap();
        assert!(Arc::ptr_eq(&owner, &base));
        let (owner, _) = derived.lookup_declared("hide").unwrap();
        assert!(Arc::ptr_eq(&owner, &derived));
        assert!(derived.lookup_declared("close").is_none());
    }
}
