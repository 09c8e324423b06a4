//! Sigbridge Engine
//!
//! Runtime signature and metaobject bridge between a native object system
//! and a dynamic scripting layer:
//! - **Signatures**: grammar, layouts and compressed payloads (`signature`)
//! - **Registry**: TypeKey resolver, Signature Store, Overload/Name Index (`registry`)
//! - **Patcher**: computed accessors on sealed metatypes (`patch`)
//! - **Marshalling**: properties, signals, converters and metacalls
//!
//! # Example
//!
//! ```rust,ignore
//! use sigbridge_engine::{Bridge, Entity, MethodDef, ModuleDef, NativeType, Owner};
//!
//! let bridge = Bridge::from_env();
//! let widget = NativeType::builder("mod.Widget")
//!     .module("mod")
//!     .qualname("Widget")
//!     .method(MethodDef::new("resize"))
//!     .build();
//! bridge.init_signature_strings(
//!     &Owner::Type(widget.clone()),
//!     &["mod.Widget.resize(self,w:int,h:int)->None"],
//! )?;
//! bridge.finish_signature_init(&ModuleDef::new("mod", vec![]))?;
//!
//! let resize = bridge.get_attr(&Entity::Type(widget), "resize")?;
//! ```

#![warn(missing_docs)]
#![warn(rust_2018_idioms)]

// ============================================================================
// Core Modules
// ============================================================================

/// Object model: types, modules, methods, namespaces and entities
pub mod object;

/// Signature grammar, parsed records, layouts and compressed payloads
pub mod signature;

/// Reflection registry: keys, Signature Store and Overload/Name Index
pub mod registry;

/// Dynamic Attribute Patcher
pub mod patch;

// ============================================================================
// Marshalling
// ============================================================================

pub mod binding;
pub mod converter;
pub mod metacall;
pub mod property;
pub mod signal;

// ============================================================================
// Facade, errors and configuration
// ============================================================================

pub mod bridge;
pub mod config;
pub mod error;

// ============================================================================
// Re-exports
// ============================================================================

pub use binding::BindingManager;
pub use bridge::{AttrValue, Bridge, SignatureValue, FUNC_KIND_MODIFIER};
pub use config::{BridgeConfig, LOGGING_RULES_ENV, SLOTS_WARNING_CATEGORY, TRUE_PROPERTY_FEATURE};
pub use converter::ConverterRegistry;
pub use error::{BridgeError, BridgeResult};
pub use metacall::{call_script_method, CallResult, MetaCall};
pub use object::{
    Accessor, Attribute, BuiltinFunction, Entity, Instance, MetaKind, MethodBinding, MethodDef,
    ModuleDef, Namespace, NativeProperty, NativeType, Owner, Receiver,
};
pub use patch::AttributePatcher;
pub use property::{PropertyBuilder, PropertyCall, PropertyDescriptor, PropertyFlags};
pub use registry::{
    GrammarParser, KeyInterner, NameIndex, ReflectionRegistry, SignatureBlob, SignatureParser,
    SignatureStore, TypeKey,
};
pub use signal::{ConnectionId, MetaMethod, MethodKind, SignalManager};
pub use signature::{
    build_props, compress_lines, decompress_lines, render_member, FuncKind, Layout, MemberProps,
    Param, PropsDict, RenderedSignature, Signature, SignatureProps, TypeExpr,
};

pub use sigbridge_sdk::{NativeHandle, NativeValue, ScriptFunction, Value};
