//! Object model the bridge reflects over
//!
//! Native types and modules are declared by generated wrapper code; the
//! bridge classifies [`Entity`] values derived from them.

mod entity;
mod namespace;
mod native_type;

pub use entity::{BuiltinFunction, Entity, MetaKind, Owner, Receiver};
pub use namespace::{Accessor, Attribute, Namespace};
pub use native_type::{
    FuncId, Instance, MethodBinding, MethodDef, ModuleDef, NativeProperty, NativeType,
    NativeTypeBuilder,
};
