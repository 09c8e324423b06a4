//! Attribute namespaces of native types, modules and metatypes
//!
//! A namespace can be replaced by another layer (a shadow) after it was
//! created. The shadow keeps a back-reference to the namespace it
//! replaced. Attribute resolution always goes through the original
//! namespace, so writers that must be seen by lookups follow the
//! back-reference with [`Namespace::original_root`].

use std::sync::Arc;

use parking_lot::RwLock;
use rustc_hash::FxHashMap;
use sigbridge_sdk::{ScriptFunction, Value};

use super::native_type::MethodDef;
use crate::property::PropertyDescriptor;

/// Computed attribute installed by the patcher
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Accessor {
    /// `__signature__`
    Signature,
    /// `__doc__`
    Doc,
}

/// Value bound to a name in a namespace
#[derive(Debug, Clone)]
pub enum Attribute {
    /// Native method from the member table
    Method(Arc<MethodDef>),
    /// Reflected property
    Property(Arc<PropertyDescriptor>),
    /// Script function defined on the type
    Function(Arc<ScriptFunction>),
    /// Plain value
    Value(Value),
    /// Accessor installed by the patcher
    Injected(Accessor),
}

impl Attribute {
    /// Check for an injected accessor of the given kind
    pub fn is_injected(&self, accessor: Accessor) -> bool {
        matches!(self, Attribute::Injected(a) if *a == accessor)
    }
}

/// Name → attribute table with an optional back-reference
#[derive(Debug)]
pub struct Namespace {
    label: String,
    attrs: RwLock<FxHashMap<String, Attribute>>,
    original: Option<Arc<Namespace>>,
}

impl Namespace {
    /// Create an empty namespace
    pub fn new(label: impl Into<String>) -> Arc<Self> {
        Arc::new(Self {
            label: label.into(),
            attrs: RwLock::new(FxHashMap::default()),
            original: None,
        })
    }

    /// Label used in diagnostics
    pub fn label(&self) -> &str {
        &self.label
    }

    /// Create a layer replacing this namespace
    pub fn shadow(self: &Arc<Self>) -> Arc<Namespace> {
        Arc::new(Namespace {
            label: format!("{} (shadow)", self.label),
            attrs: RwLock::new(FxHashMap::default()),
            original: Some(self.original_root()),
        })
    }

    /// Namespace this layer replaced, if any
    pub fn original(&self) -> Option<&Arc<Namespace>> {
        self.original.as_ref()
    }

    /// Namespace at the bottom of the back-reference chain
    pub fn original_root(self: &Arc<Self>) -> Arc<Namespace> {
        let mut current = self.clone();
        while let Some(next) = current.original.clone() {
            current = next;
        }
        current
    }

    /// Check whether this layer replaced another namespace
    pub fn is_shadow(&self) -> bool {
        self.original.is_some()
    }

    /// Attribute defined in this layer only
    pub fn get_own(&self, name: &str) -> Option<Attribute> {
        self.attrs.read().get(name).cloned()
    }

    /// Resolve an attribute through the original namespace
    pub fn resolve(self: &Arc<Self>, name: &str) -> Option<Attribute> {
        self.original_root().get_own(name)
    }

    /// Bind a name in this layer
    pub fn insert(&self, name: impl Into<String>, attr: Attribute) -> Option<Attribute> {
        self.attrs.write().insert(name.into(), attr)
    }

    /// Names bound in this layer, sorted
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.attrs.read().keys().cloned().collect();
        names.sort();
        names
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shadow_back_reference() {
        let ns = Namespace::new("type");
        ns.insert("__doc__", Attribute::Value(Value::str("doc")));

        let shadow = ns.shadow();
        let shadow2 = shadow.shadow();
        assert!(shadow2.is_shadow());
        assert!(Arc::ptr_eq(&shadow2.original_root(), &ns));
        assert!(matches!(shadow2.resolve("__doc__"), Some(Attribute::Value(_))));
    }

    #[test]
    fn test_writes_to_shadow_are_not_resolved() {
        let ns = Namespace::new("type");
        let shadow = ns.shadow();
        shadow.insert("x", Attribute::Value(Value::Int(1)));
        assert!(shadow.get_own("x").is_some());
        assert!(shadow.resolve("x").is_none());

        shadow.original_root().insert("x", Attribute::Value(Value::Int(2)));
        assert!(matches!(
            shadow.resolve("x"),
            Some(Attribute::Value(Value::Int(2)))
        ));
    }
}
