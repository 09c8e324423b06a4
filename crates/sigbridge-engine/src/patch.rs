//! Dynamic Attribute Patcher
//!
//! Metatypes of native entities are sealed: their attribute tables cannot
//! be extended by subclassing. The patcher keeps one namespace per
//! [`MetaKind`] as a side table and writes the computed accessors
//! (`__signature__`, `__doc__`) straight into it. Lookups on an entity
//! consult the side table of its metakind before anything else.
//!
//! A metatype namespace may have been replaced by another layer. Writes
//! then go to the original namespace found through the back-reference,
//! because a write into the shadow would never be resolved.

use std::sync::Arc;

use dashmap::DashMap;
use once_cell::sync::OnceCell;
use sigbridge_sdk::Value;

use crate::error::{BridgeError, BridgeResult};
use crate::object::{Accessor, Attribute, MetaKind, Namespace};

/// Metakinds that get `__signature__`
pub const SIGNATURE_KINDS: [MetaKind; 6] = [
    MetaKind::Type,
    MetaKind::Builtin,
    MetaKind::StaticMethod,
    MetaKind::MethodDescriptor,
    MetaKind::WrapperDescriptor,
    MetaKind::Property,
];

/// Metakinds whose `__doc__` is forwarded
pub const DOC_KINDS: [MetaKind; 3] = [MetaKind::Type, MetaKind::Builtin, MetaKind::MethodDescriptor];

/// Attribute name of an accessor
pub fn accessor_name(accessor: Accessor) -> &'static str {
    match accessor {
        Accessor::Signature => "__signature__",
        Accessor::Doc => "__doc__",
    }
}

fn builtin_doc(kind: MetaKind) -> String {
    match kind {
        MetaKind::Type => "type(object) -> the object's type".to_string(),
        other => format!("{} object", other.as_str()),
    }
}

fn default_accessors(kind: MetaKind) -> Vec<Accessor> {
    let mut accessors = Vec::with_capacity(2);
    if SIGNATURE_KINDS.contains(&kind) {
        accessors.push(Accessor::Signature);
    }
    if DOC_KINDS.contains(&kind) {
        accessors.push(Accessor::Doc);
    }
    accessors
}

/// Checked writes for one metatype
struct Plan {
    kind: MetaKind,
    target: Arc<Namespace>,
    pending: Vec<Accessor>,
}

/// Side table of metatype namespaces with installed accessors
pub struct AttributePatcher {
    metatypes: DashMap<MetaKind, Arc<Namespace>>,
    previous_docs: DashMap<MetaKind, Attribute>,
    installed: OnceCell<()>,
}

impl AttributePatcher {
    /// Metatype namespaces holding only their builtin `__doc__`
    pub fn new() -> Self {
        let metatypes = DashMap::new();
        for kind in MetaKind::ALL {
            let ns = Namespace::new(kind.as_str());
            ns.insert("__doc__", Attribute::Value(Value::str(builtin_doc(kind))));
            metatypes.insert(kind, ns);
        }
        Self {
            metatypes,
            previous_docs: DashMap::new(),
            installed: OnceCell::new(),
        }
    }

    /// Current namespace layer of a metatype
    pub fn metatype(&self, kind: MetaKind) -> Arc<Namespace> {
        self.metatypes
            .entry(kind)
            .or_insert_with(|| Namespace::new(kind.as_str()))
            .value()
            .clone()
    }

    /// Replace a metatype's namespace by a new layer and return it
    pub fn shadow_metatype(&self, kind: MetaKind) -> Arc<Namespace> {
        let shadow = self.metatype(kind).shadow();
        self.metatypes.insert(kind, shadow.clone());
        shadow
    }

    /// Install accessors on one metatype. Returns how many were written.
    ///
    /// An accessor already present is skipped. A builtin `__doc__` is
    /// remembered before being replaced. Any other attribute already bound
    /// under an accessor name fails the installation.
    pub fn install(&self, kind: MetaKind, accessors: &[Accessor]) -> BridgeResult<usize> {
        let plan = self.plan(kind, accessors)?;
        Ok(self.apply(&plan))
    }

    /// Install the fixed accessor set on every metatype, once.
    ///
    /// Every metatype is checked before the first write, so a conflict
    /// leaves all of them untouched.
    pub fn ensure_installed(&self) -> BridgeResult<()> {
        self.installed
            .get_or_try_init(|| {
                let plans = MetaKind::ALL
                    .into_iter()
                    .map(|kind| self.plan(kind, &default_accessors(kind)))
                    .collect::<BridgeResult<Vec<_>>>()
                    .map_err(|e| {
                        log::error!(target: "sigbridge::patch", "{}", e);
                        e
                    })?;
                for plan in &plans {
                    self.apply(plan);
                }
                Ok(())
            })
            .map(|_| ())
    }

    fn plan(&self, kind: MetaKind, accessors: &[Accessor]) -> BridgeResult<Plan> {
        let target = self.metatype(kind).original_root();
        let mut pending = Vec::with_capacity(accessors.len());
        for &accessor in accessors {
            let name = accessor_name(accessor);
            match target.get_own(name) {
                Some(existing) if existing.is_injected(accessor) => continue,
                Some(_) if accessor == Accessor::Doc => {}
                Some(_) => {
                    return Err(BridgeError::PatchFailed {
                        target: kind.as_str().to_string(),
                        attribute: name.to_string(),
                        reason: "name is bound to a foreign attribute".to_string(),
                    });
                }
                None => {}
            }
            pending.push(accessor);
        }
        Ok(Plan { kind, target, pending })
    }

    fn apply(&self, plan: &Plan) -> usize {
        for &accessor in &plan.pending {
            let name = accessor_name(accessor);
            if let Some(previous) = plan.target.insert(name, Attribute::Injected(accessor)) {
                self.previous_docs.insert(plan.kind, previous);
            }
            log::debug!(target: "sigbridge::patch", "installed {} on {}", name, plan.kind.as_str());
        }
        plan.pending.len()
    }

    /// Check whether the accessor set was installed
    pub fn is_installed(&self) -> bool {
        self.installed.get().is_some()
    }

    /// Resolve an attribute on a metatype
    pub fn lookup(&self, kind: MetaKind, name: &str) -> Option<Attribute> {
        self.metatype(kind).resolve(name)
    }

    /// Accessor bound under `name` on a metatype, if any
    pub fn injected(&self, kind: MetaKind, name: &str) -> Option<Accessor> {
        match self.lookup(kind, name) {
            Some(Attribute::Injected(accessor)) => Some(accessor),
            _ => None,
        }
    }

    /// `__doc__` the metatype had before it was replaced
    pub fn previous_doc(&self, kind: MetaKind) -> Option<String> {
        match self.previous_docs.get(&kind)?.value() {
            Attribute::Value(Value::Str(doc)) => Some(doc.to_string()),
            _ => None,
        }
    }
}

impl Default for AttributePatcher {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_install_once() {
        let patcher = AttributePatcher::new();
        assert!(!patcher.is_installed());
        patcher.ensure_installed().unwrap();
        patcher.ensure_installed().unwrap();
        assert!(patcher.is_installed());
        assert_eq!(patcher.injected(MetaKind::Builtin, "__signature__"), Some(Accessor::Signature));
        assert_eq!(patcher.injected(MetaKind::Type, "__doc__"), Some(Accessor::Doc));
        assert_eq!(patcher.injected(MetaKind::Module, "__signature__"), None);
        assert_eq!(patcher.injected(MetaKind::Property, "__doc__"), None);
    }

    #[test]
    fn test_reinstall_skips_existing() {
        let patcher = AttributePatcher::new();
        assert_eq!(patcher.install(MetaKind::Type, &[Accessor::Signature, Accessor::Doc]).unwrap(), 2);
        assert_eq!(patcher.install(MetaKind::Type, &[Accessor::Signature, Accessor::Doc]).unwrap(), 0);
    }

    #[test]
    fn test_previous_doc_kept() {
        let patcher = AttributePatcher::new();
        patcher.install(MetaKind::Type, &[Accessor::Doc]).unwrap();
        assert_eq!(
            patcher.previous_doc(MetaKind::Type).as_deref(),
            Some("type(object) -> the object's type")
        );
    }

    #[test]
    fn test_writes_through_shadow() {
        let patcher = AttributePatcher::new();
        let shadow = patcher.shadow_metatype(MetaKind::Builtin);
        patcher.ensure_installed().unwrap();
        assert!(shadow.get_own("__signature__").is_none());
        assert!(shadow.original_root().get_own("__signature__").is_some());
        assert_eq!(patcher.injected(MetaKind::Builtin, "__signature__"), Some(Accessor::Signature));
    }

    #[test]
    fn test_foreign_attribute_fails() {
        let patcher = AttributePatcher::new();
        patcher
            .metatype(MetaKind::StaticMethod)
            .insert("__signature__", Attribute::Value(Value::Int(1)));
        let err = patcher.ensure_installed().unwrap_err();
        assert!(matches!(err, BridgeError::PatchFailed { .. }));
        assert!(!patcher.is_installed());
    }

    #[test]
    fn test_conflict_leaves_every_metatype_untouched() {
        let patcher = AttributePatcher::new();
        patcher
            .metatype(MetaKind::StaticMethod)
            .insert("__signature__", Attribute::Value(Value::Int(1)));
        assert!(patcher.ensure_installed().is_err());
        for kind in MetaKind::ALL {
            assert_eq!(patcher.injected(kind, "__signature__"), None);
            assert_eq!(patcher.injected(kind, "__doc__"), None);
        }
        assert!(patcher.previous_doc(MetaKind::Type).is_none());
    }
}
