//! Signature grammar, parsed records and layouts
//!
//! Signature lines are produced by the binding generator, registered
//! raw or zlib-compressed, and parsed on first access into a
//! [`PropsDict`] per type or module.
//!
//! ```text
//! "1:Widget.resize(self,w:int,h:int)->None"
//! "0:Widget.resize(self,size:Size)->None"
//!        |
//!        v
//! PropsDict { "resize": Overloads [ ... 2 records ... ] }
//! ```

pub mod compress;
pub mod grammar;
pub mod layout;
pub mod naming;
pub mod props;
pub mod types;

pub use compress::{compress_lines, decompress_lines};
pub use grammar::{build_props, fixup_multilines, parse_line};
pub use layout::{render, render_member, Layout, RenderedSignature, Signature};
pub use naming::snake_case_name;
pub use props::{FuncKind, MemberProps, Param, PropsDict, SignatureProps};
pub use types::TypeExpr;
