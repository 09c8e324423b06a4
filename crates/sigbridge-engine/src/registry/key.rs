//! TypeKey derivation and entity classification

use std::fmt;
use std::sync::Arc;

use dashmap::DashSet;
use serde::Serialize;

use crate::error::{BridgeError, BridgeResult};
use crate::object::{Entity, Owner, Receiver};

/// Canonical identity of a reflectable class, module or member.
///
/// Keys are immutable. Components are interned through [`KeyInterner`],
/// and equality and hashing are structural.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(untagged)]
pub enum TypeKey {
    /// `(module, qualified name)` of a class
    Class {
        /// Declared module name
        module: Arc<str>,
        /// Declared qualified name
        qualname: Arc<str>,
    },
    /// Bare module name
    Module(Arc<str>),
    /// Member of a class or module
    Member {
        /// Key of the owner
        owner: Box<TypeKey>,
        /// Member name
        name: Arc<str>,
    },
}

impl TypeKey {
    /// Key of a member of this key
    pub fn member(&self, interner: &KeyInterner, name: &str) -> TypeKey {
        TypeKey::Member {
            owner: Box::new(self.clone()),
            name: interner.intern(name),
        }
    }
}

impl fmt::Display for TypeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypeKey::Class { module, qualname } => write!(f, "{}.{}", module, qualname),
            TypeKey::Module(name) => f.write_str(name),
            TypeKey::Member { owner, name } => write!(f, "{}.{}", owner, name),
        }
    }
}

/// Interner for key components
#[derive(Debug, Default)]
pub struct KeyInterner {
    strings: DashSet<Arc<str>>,
}

impl KeyInterner {
    /// Create an empty interner
    pub fn new() -> Self {
        Self::default()
    }

    /// Shared copy of `s`
    pub fn intern(&self, s: &str) -> Arc<str> {
        if let Some(existing) = self.strings.get(s) {
            return existing.key().clone();
        }
        let arc: Arc<str> = Arc::from(s);
        self.strings.insert(arc.clone());
        match self.strings.get(s) {
            Some(existing) => existing.key().clone(),
            None => arc,
        }
    }

    /// Number of interned strings
    pub fn len(&self) -> usize {
        self.strings.len()
    }

    /// Check for no interned strings
    pub fn is_empty(&self) -> bool {
        self.strings.is_empty()
    }
}

/// Derive the key of a class or module.
///
/// A type without a declared module is keyed by its plain name, like a
/// module. A type with a module but without a qualified name is malformed.
pub fn type_key(interner: &KeyInterner, owner: &Owner) -> BridgeResult<TypeKey> {
    match owner {
        Owner::Module(module) => Ok(TypeKey::Module(interner.intern(module.name()))),
        Owner::Type(ty) => match ty.module() {
            None => Ok(TypeKey::Module(interner.intern(ty.name()))),
            Some(module) => {
                let qualname = ty.qualname().ok_or_else(|| BridgeError::MalformedEntity {
                    entity: ty.name().to_string(),
                    attribute: "__qualname__",
                })?;
                Ok(TypeKey::Class {
                    module: interner.intern(module),
                    qualname: interner.intern(qualname),
                })
            }
        },
    }
}

/// Owning class or module of an entity.
///
/// `owner_of_unbound` resolves receiver-less function objects through
/// the owner map. Returns `None` only when that lookup fails.
///
/// # Panics
///
/// Script functions and instances are not reflectable entities; passing
/// one is a programming error.
pub fn class_or_module_of(
    entity: &Entity,
    owner_of_unbound: impl Fn(&crate::object::MethodDef) -> Option<Owner>,
) -> Option<Owner> {
    match entity {
        Entity::Type(ty) => Some(Owner::Type(ty.clone())),
        Entity::Module(module) => Some(Owner::Module(module.clone())),
        Entity::Builtin(func) | Entity::StaticMethod(func) => match &func.receiver {
            Receiver::Type(ty) => Some(Owner::Type(ty.clone())),
            Receiver::Module(module) => Some(Owner::Module(module.clone())),
            Receiver::Instance(instance) => Some(Owner::Type(instance.native_type().clone())),
            Receiver::None => owner_of_unbound(&func.def),
        },
        Entity::MethodDescriptor { owner, .. }
        | Entity::WrapperDescriptor { owner, .. }
        | Entity::Property { owner, .. } => Some(Owner::Type(owner.clone())),
        Entity::Function(_) | Entity::Instance(_) => {
            panic!("unsupported entity kind in classification: {}", entity.describe())
        }
    }
}
