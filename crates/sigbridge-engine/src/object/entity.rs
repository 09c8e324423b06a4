//! Reflectable entities
//!
//! The set of entity kinds is closed: every object the bridge is asked
//! about is one of the variants below.

use std::sync::Arc;

use sigbridge_sdk::ScriptFunction;

use super::native_type::{Instance, MethodDef, ModuleDef, NativeType};
use crate::property::PropertyDescriptor;

/// Owning class or module of a member
#[derive(Debug, Clone)]
pub enum Owner {
    /// A native type
    Type(Arc<NativeType>),
    /// A native module
    Module(Arc<ModuleDef>),
}

impl Owner {
    /// Owner name for diagnostics
    pub fn name(&self) -> &str {
        match self {
            Owner::Type(ty) => ty.name(),
            Owner::Module(module) => module.name(),
        }
    }

    /// Check for identical owners
    pub fn same_as(&self, other: &Owner) -> bool {
        match (self, other) {
            (Owner::Type(a), Owner::Type(b)) => Arc::ptr_eq(a, b),
            (Owner::Module(a), Owner::Module(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }
}

/// What a builtin function is bound to
#[derive(Debug, Clone)]
pub enum Receiver {
    /// Unbound (static methods)
    None,
    /// Bound to a type (class methods)
    Type(Arc<NativeType>),
    /// Bound to a module (free functions)
    Module(Arc<ModuleDef>),
    /// Bound to an instance
    Instance(Arc<Instance>),
}

/// A native function object with its receiver
#[derive(Debug, Clone)]
pub struct BuiltinFunction {
    /// Member table entry
    pub def: Arc<MethodDef>,
    /// Bound receiver
    pub receiver: Receiver,
}

impl BuiltinFunction {
    /// Bind a method definition
    pub fn new(def: Arc<MethodDef>, receiver: Receiver) -> Self {
        Self { def, receiver }
    }
}

/// Kind of the metatype an entity belongs to.
///
/// Injected accessors are installed per metakind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum MetaKind {
    /// Native types
    Type,
    /// Native modules
    Module,
    /// Native function objects
    Builtin,
    /// Static method wrappers
    StaticMethod,
    /// Method descriptors
    MethodDescriptor,
    /// Slot wrapper descriptors (`__init__` and friends)
    WrapperDescriptor,
    /// Property descriptors
    Property,
}

impl MetaKind {
    /// All metakinds
    pub const ALL: [MetaKind; 7] = [
        MetaKind::Type,
        MetaKind::Module,
        MetaKind::Builtin,
        MetaKind::StaticMethod,
        MetaKind::MethodDescriptor,
        MetaKind::WrapperDescriptor,
        MetaKind::Property,
    ];

    /// Metatype name
    pub fn as_str(self) -> &'static str {
        match self {
            MetaKind::Type => "type",
            MetaKind::Module => "module",
            MetaKind::Builtin => "builtin_function_or_method",
            MetaKind::StaticMethod => "staticmethod",
            MetaKind::MethodDescriptor => "method_descriptor",
            MetaKind::WrapperDescriptor => "wrapper_descriptor",
            MetaKind::Property => "property",
        }
    }
}

/// Any object the bridge can be asked about
#[derive(Debug, Clone)]
pub enum Entity {
    /// A native type
    Type(Arc<NativeType>),
    /// A native module
    Module(Arc<ModuleDef>),
    /// A native function object
    Builtin(BuiltinFunction),
    /// A static method wrapper around a function object
    StaticMethod(BuiltinFunction),
    /// Unbound method of a type
    MethodDescriptor {
        /// Declaring type
        owner: Arc<NativeType>,
        /// Member table entry
        def: Arc<MethodDef>,
    },
    /// Slot wrapper of a type (`__init__`)
    WrapperDescriptor {
        /// Declaring type
        owner: Arc<NativeType>,
        /// Slot name
        name: String,
    },
    /// Property of a type
    Property {
        /// Declaring type
        owner: Arc<NativeType>,
        /// Property name
        name: String,
        /// Descriptor
        descriptor: Arc<PropertyDescriptor>,
    },
    /// Function written in the scripting language
    Function(Arc<ScriptFunction>),
    /// Wrapper instance
    Instance(Arc<Instance>),
}

impl Entity {
    /// Metakind of entities that carry native signatures.
    /// Script functions and instances have none.
    pub fn meta_kind(&self) -> Option<MetaKind> {
        match self {
            Entity::Type(_) => Some(MetaKind::Type),
            Entity::Module(_) => Some(MetaKind::Module),
            Entity::Builtin(_) => Some(MetaKind::Builtin),
            Entity::StaticMethod(_) => Some(MetaKind::StaticMethod),
            Entity::MethodDescriptor { .. } => Some(MetaKind::MethodDescriptor),
            Entity::WrapperDescriptor { .. } => Some(MetaKind::WrapperDescriptor),
            Entity::Property { .. } => Some(MetaKind::Property),
            Entity::Function(_) | Entity::Instance(_) => None,
        }
    }

    /// Short description for diagnostics
    pub fn describe(&self) -> String {
        match self {
            Entity::Type(ty) => format!("type {}", ty.name()),
            Entity::Module(m) => format!("module {}", m.name()),
            Entity::Builtin(f) => format!("builtin {}", f.def.name()),
            Entity::StaticMethod(f) => format!("staticmethod {}", f.def.name()),
            Entity::MethodDescriptor { owner, def } => {
                format!("method {}.{}", owner.name(), def.name())
            }
            Entity::WrapperDescriptor { owner, name } => {
                format!("slot wrapper {}.{}", owner.name(), name)
            }
            Entity::Property { owner, name, .. } => format!("property {}.{}", owner.name(), name),
            Entity::Function(f) => format!("function {}", f.name()),
            Entity::Instance(i) => format!("{} object at {}", i.native_type().name(), i.handle()),
        }
    }
}
