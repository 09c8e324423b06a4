//! Reflection registry
//!
//! One owned service bundling the key interner, the Signature Store and
//! the Overload/Name Index. It is created once and shared by `Arc` with
//! every consumer; entries live as long as the registry.

pub mod key;
pub mod name_index;
pub mod store;

use std::sync::Arc;

pub use key::{class_or_module_of, type_key, KeyInterner, TypeKey};
pub use name_index::{insert_alternate_variants, NameIndex};
pub use store::{GrammarParser, SignatureBlob, SignatureParser, SignatureStore};

use crate::error::BridgeResult;
use crate::object::{Entity, MethodDef, NativeType, Owner};
use crate::signature::PropsDict;

/// Signature and name lookups for all registered types and modules
pub struct ReflectionRegistry {
    interner: KeyInterner,
    store: SignatureStore,
    names: NameIndex,
}

impl ReflectionRegistry {
    /// Registry with the grammar parser
    pub fn new() -> Self {
        Self::with_parser(Some(Arc::new(GrammarParser)))
    }

    /// Registry with a specific parser (or none)
    pub fn with_parser(parser: Option<Arc<dyn SignatureParser>>) -> Self {
        Self {
            interner: KeyInterner::new(),
            store: SignatureStore::with_parser(parser),
            names: NameIndex::new(),
        }
    }

    /// Key interner
    pub fn interner(&self) -> &KeyInterner {
        &self.interner
    }

    /// Signature Store
    pub fn store(&self) -> &SignatureStore {
        &self.store
    }

    /// Overload/Name Index
    pub fn names(&self) -> &NameIndex {
        &self.names
    }

    /// Key of a class or module
    pub fn type_key(&self, owner: &Owner) -> BridgeResult<TypeKey> {
        type_key(&self.interner, owner)
    }

    /// Owning class or module of an entity
    pub fn class_or_module_of(&self, entity: &Entity) -> Option<Owner> {
        class_or_module_of(entity, |def| self.names.owner_of(def))
    }

    /// Register a blob for an owner.
    ///
    /// Fails without touching the store when no key can be derived.
    pub fn register(&self, owner: &Owner, blob: SignatureBlob) -> BridgeResult<TypeKey> {
        let key = self.type_key(owner).map_err(|e| {
            log::error!(target: "sigbridge::signature", "cannot register signatures: {}", e);
            e
        })?;
        if let Owner::Type(ty) = owner {
            self.names.record_type_owners(ty);
        }
        self.store.register(key.clone(), blob);
        Ok(key)
    }

    /// Parsed dictionary of an owner, built on first access
    pub fn props_for(&self, owner: &Owner) -> BridgeResult<Option<Arc<PropsDict>>> {
        let key = self.type_key(owner)?;
        self.store.props_for(&key)
    }

    /// Function object of a type member under either spelling, with the
    /// type that declares it. Bases are searched after the type itself;
    /// each type's index is built on first use.
    pub fn lookup_member(
        &self,
        ty: &Arc<NativeType>,
        name: &str,
    ) -> BridgeResult<Option<(Arc<NativeType>, Arc<MethodDef>)>> {
        let mut current = Some(ty.clone());
        while let Some(level) = current {
            let key = self.type_key(&Owner::Type(level.clone()))?;
            self.names.build(&self.interner, &key, &level);
            if let Some(def) = self.names.get(&key, name) {
                return Ok(Some((level, def)));
            }
            current = level.base().cloned();
        }
        Ok(None)
    }
}

impl Default for ReflectionRegistry {
    fn default() -> Self {
        Self::new()
    }
}
