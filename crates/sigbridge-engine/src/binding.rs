//! Native handle to wrapper mapping

use std::sync::Arc;

use dashmap::DashMap;
use sigbridge_sdk::NativeHandle;

use crate::object::{Instance, NativeType};

/// Wrappers of live native objects, keyed by handle
#[derive(Default)]
pub struct BindingManager {
    wrappers: DashMap<NativeHandle, Arc<Instance>>,
}

impl BindingManager {
    /// Create an empty manager
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a wrapper. Replaces any wrapper of the same handle.
    pub fn register(&self, instance: Arc<Instance>) -> Option<Arc<Instance>> {
        self.wrappers.insert(instance.handle(), instance)
    }

    /// Wrapper of a handle, created with `ty` if there is none yet
    pub fn wrap(&self, handle: NativeHandle, ty: &Arc<NativeType>) -> Arc<Instance> {
        self.wrappers
            .entry(handle)
            .or_insert_with(|| Instance::new(handle, ty.clone()))
            .value()
            .clone()
    }

    /// Wrapper of a handle
    pub fn retrieve(&self, handle: NativeHandle) -> Option<Arc<Instance>> {
        self.wrappers.get(&handle).map(|w| w.value().clone())
    }

    /// Forget a handle. The released wrapper is no longer live.
    pub fn release(&self, handle: NativeHandle) -> Option<Arc<Instance>> {
        let (_, wrapper) = self.wrappers.remove(&handle)?;
        wrapper.mark_released();
        Some(wrapper)
    }

    /// Number of live wrappers
    pub fn count(&self) -> usize {
        self.wrappers.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wrap_reuses_wrapper() {
        let bindings = BindingManager::new();
        let ty = NativeType::builder("Widget").build();
        let handle = NativeHandle::from_raw(42);
        let a = bindings.wrap(handle, &ty);
        let b = bindings.wrap(handle, &ty);
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(bindings.count(), 1);
    }

    #[test]
    fn test_release_forgets() {
        let bindings = BindingManager::new();
        let ty = NativeType::builder("Widget").build();
        let handle = NativeHandle::from_raw(7);
        bindings.register(Instance::new(handle, ty));
        assert!(bindings.retrieve(handle).is_some());
        let released = bindings.release(handle).unwrap();
        assert!(!released.is_live());
        assert!(bindings.retrieve(handle).is_none());
        assert!(bindings.release(handle).is_none());
    }
}
