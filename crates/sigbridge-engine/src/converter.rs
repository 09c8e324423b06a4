//! Converter lookup by declared type name

use std::sync::Arc;

use dashmap::DashMap;
use sigbridge_sdk::{builtin_converters, TypeConverter};

use crate::error::{BridgeError, BridgeResult};

/// Type name → converter table
pub struct ConverterRegistry {
    converters: DashMap<String, Arc<dyn TypeConverter>>,
}

impl ConverterRegistry {
    /// Empty table
    pub fn new() -> Self {
        Self {
            converters: DashMap::new(),
        }
    }

    /// Table holding the builtin converters
    pub fn with_builtins() -> Self {
        let registry = Self::new();
        for (names, converter) in builtin_converters() {
            registry.register(names, converter);
        }
        registry
    }

    /// Register a converter under one or more type names
    pub fn register(&self, names: &[&str], converter: Arc<dyn TypeConverter>) {
        for name in names {
            self.converters.insert(normalize(name), converter.clone());
        }
    }

    /// Converter for a type name, if any
    pub fn get(&self, type_name: &str) -> Option<Arc<dyn TypeConverter>> {
        self.converters
            .get(&normalize(type_name))
            .map(|entry| entry.value().clone())
    }

    /// Converter for a type name, or `UnknownConverter`
    pub fn resolve(&self, type_name: &str) -> BridgeResult<Arc<dyn TypeConverter>> {
        self.get(type_name).ok_or_else(|| BridgeError::UnknownConverter {
            type_name: type_name.to_string(),
        })
    }

    /// Check whether a type name is marshallable
    pub fn contains(&self, type_name: &str) -> bool {
        self.converters.contains_key(&normalize(type_name))
    }

    /// Number of registered names
    pub fn len(&self) -> usize {
        self.converters.len()
    }

    /// Check for an empty table
    pub fn is_empty(&self) -> bool {
        self.converters.is_empty()
    }
}

impl Default for ConverterRegistry {
    fn default() -> Self {
        Self::with_builtins()
    }
}

/// Collapse whitespace so `QObject *` and `QObject*` name the same type
fn normalize(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    let mut pending_space = false;
    for ch in name.trim().chars() {
        if ch.is_whitespace() {
            pending_space = true;
            continue;
        }
        if pending_space && ch.is_alphanumeric() && out.chars().last().is_some_and(char::is_alphanumeric) {
            out.push(' ');
        }
        pending_space = false;
        out.push(ch);
    }
    out
}
