//! Overload/Name Index
//!
//! `(TypeKey, member name) -> function object`, built once per type from
//! its member table. Every member is indexed under its declared name and
//! under its snake-case spelling. On a collision the declared spelling
//! wins: alternate spellings are only inserted where the name is free.
//!
//! The index also keeps the owner map used to classify receiver-less
//! function objects (static methods, module functions) and to answer
//! reverse lookups from a function object to its owning type.

use std::sync::Arc;

use dashmap::DashMap;
use once_cell::sync::OnceCell;

use super::key::{KeyInterner, TypeKey};
use crate::object::{FuncId, MethodBinding, MethodDef, ModuleDef, NativeType, Owner};
use crate::signature::{snake_case_name, PropsDict};

/// Add snake-case spellings to a parsed dictionary.
///
/// Each entry (every record of an overload family included) is copied
/// under its alternate name; the copies are merged without overwriting
/// existing keys. Applying this twice yields the same key set as once.
pub fn insert_alternate_variants(dict: &mut PropsDict) {
    let mut variants = PropsDict::new();
    for (name, member) in dict.iter() {
        let alternate = snake_case_name(name);
        if alternate != name {
            variants.insert(alternate.clone(), member.renamed(&alternate));
        }
    }
    dict.merge_missing(variants);
}

/// Process-wide `(TypeKey, name) -> callable` map with the owner map
#[derive(Default)]
pub struct NameIndex {
    callables: DashMap<(TypeKey, Arc<str>), Arc<MethodDef>>,
    built: DashMap<TypeKey, Arc<OnceCell<()>>>,
    owners: DashMap<FuncId, Owner>,
}

impl NameIndex {
    /// Create an empty index
    pub fn new() -> Self {
        Self::default()
    }

    /// Index a type's member table. Exactly one caller per key does the
    /// work; concurrent callers wait for it to finish.
    pub fn build(&self, interner: &KeyInterner, key: &TypeKey, ty: &Arc<NativeType>) {
        let cell = self.built.entry(key.clone()).or_default().value().clone();
        cell.get_or_init(|| self.index_members(interner, key, ty));
    }

    fn index_members(&self, interner: &KeyInterner, key: &TypeKey, ty: &Arc<NativeType>) {
        let owner = Owner::Type(ty.clone());
        let mut staged: Vec<(Arc<str>, Arc<MethodDef>)> = Vec::with_capacity(ty.methods().len() * 2);
        for def in ty.methods() {
            staged.push((interner.intern(def.name()), def.clone()));
        }
        for def in ty.methods() {
            let alternate = snake_case_name(def.name());
            if alternate == def.name() || ty.methods().iter().any(|m| m.name() == alternate) {
                continue;
            }
            staged.push((interner.intern(&alternate), Arc::new(def.renamed(alternate.clone()))));
        }

        for (name, def) in staged {
            self.owners.entry(def.id()).or_insert_with(|| owner.clone());
            self.callables.entry((key.clone(), name)).or_insert(def);
        }
        log::debug!(target: "sigbridge::signature", "indexed members of {}", key);
    }

    /// Check whether a type was indexed
    pub fn is_built(&self, key: &TypeKey) -> bool {
        self.built
            .get(key)
            .map_or(false, |cell| cell.get().is_some())
    }

    /// Function object for a member name
    pub fn get(&self, key: &TypeKey, name: &str) -> Option<Arc<MethodDef>> {
        self.callables
            .get(&(key.clone(), Arc::from(name)))
            .map(|entry| entry.value().clone())
    }

    /// Number of indexed members across all types
    pub fn len(&self) -> usize {
        self.callables.len()
    }

    /// Check for an empty index
    pub fn is_empty(&self) -> bool {
        self.callables.is_empty()
    }

    /// Record static methods of a type in the owner map
    pub fn record_type_owners(&self, ty: &Arc<NativeType>) {
        for def in ty.methods() {
            if def.binding() == MethodBinding::Static {
                self.owners.insert(def.id(), Owner::Type(ty.clone()));
            }
        }
    }

    /// Record the functions of a module in the owner map
    pub fn record_module_owners(&self, module: &Arc<ModuleDef>) {
        for def in module.functions() {
            self.owners.insert(def.id(), Owner::Module(module.clone()));
        }
    }

    /// Owner of a function object, if known
    pub fn owner_of(&self, def: &MethodDef) -> Option<Owner> {
        self.owners.get(&def.id()).map(|entry| entry.value().clone())
    }
}
