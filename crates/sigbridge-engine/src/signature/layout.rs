//! Signature layouts
//!
//! A layout decides which parts of a parsed signature are rendered:
//!
//! | layout        | receiver | defaults | `...` defaults | return | names |
//! |---------------|----------|----------|----------------|--------|-------|
//! | `signature`   | yes      | yes      | no             | yes    | yes   |
//! | `existence`   | no       | no       | no             | no     | no    |
//! | `hintingstub` | yes      | yes      | yes            | yes    | yes   |
//! | `typeerror`   | no       | yes      | no             | no     | no    |

use std::fmt;

use serde::Serialize;

use super::props::{MemberProps, SignatureProps};
use super::types::TypeExpr;

/// Rendering switches
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Layout {
    /// Keep the `self`/`cls` receiver
    pub definition: bool,
    /// Render default values
    pub defaults: bool,
    /// Render defaults as `...`
    pub ellipsis: bool,
    /// Render the return annotation
    pub return_annotation: bool,
    /// Render parameter names
    pub parameter_names: bool,
}

impl Layout {
    /// Full signature
    pub const SIGNATURE: Layout = Layout {
        definition: true,
        defaults: true,
        ellipsis: false,
        return_annotation: true,
        parameter_names: true,
    };

    /// Annotations only, for existence checks
    pub const EXISTENCE: Layout = Layout {
        definition: false,
        defaults: false,
        ellipsis: false,
        return_annotation: false,
        parameter_names: false,
    };

    /// Stub-file form
    pub const HINTING_STUB: Layout = Layout {
        ellipsis: true,
        ..Layout::SIGNATURE
    };

    /// Form used in call-mismatch messages
    pub const TYPE_ERROR: Layout = Layout {
        definition: false,
        defaults: true,
        ellipsis: false,
        return_annotation: false,
        parameter_names: false,
    };

    /// Look up a layout by modifier name
    pub fn by_name(name: &str) -> Option<Layout> {
        match name {
            "signature" => Some(Layout::SIGNATURE),
            "existence" => Some(Layout::EXISTENCE),
            "hintingstub" => Some(Layout::HINTING_STUB),
            "typeerror" => Some(Layout::TYPE_ERROR),
            _ => None,
        }
    }
}

impl Default for Layout {
    fn default() -> Self {
        Layout::SIGNATURE
    }
}

/// One signature rendered under a layout
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RenderedSignature {
    /// Member name
    pub name: String,
    /// Rendered parameters
    pub parameters: Vec<String>,
    /// Rendered return annotation
    #[serde(skip_serializing_if = "Option::is_none")]
    pub return_annotation: Option<String>,
}

impl fmt::Display for RenderedSignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({})", self.name, self.parameters.join(", "))?;
        if let Some(ret) = &self.return_annotation {
            write!(f, " -> {}", ret)?;
        }
        Ok(())
    }
}

/// Result of a signature query
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum Signature {
    /// Single signature
    Single(RenderedSignature),
    /// Overload family after ordering and de-duplication
    Overloads(Vec<RenderedSignature>),
}

impl Signature {
    /// Rendered signatures
    pub fn signatures(&self) -> &[RenderedSignature] {
        match self {
            Signature::Single(sig) => std::slice::from_ref(sig),
            Signature::Overloads(sigs) => sigs,
        }
    }
}

impl fmt::Display for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, sig) in self.signatures().iter().enumerate() {
            if i > 0 {
                writeln!(f)?;
            }
            write!(f, "{}", sig)?;
        }
        Ok(())
    }
}

/// Render one signature
pub fn render(props: &SignatureProps, layout: Layout) -> RenderedSignature {
    let mut parameters = Vec::with_capacity(props.params.len() + 1);
    if layout.definition {
        if let Some(receiver) = &props.receiver {
            parameters.push(receiver.clone());
        }
    }
    for param in &props.params {
        let mut text = String::new();
        if param.variadic {
            text.push_str(&param.display_name());
        } else {
            if layout.parameter_names {
                text.push_str(&param.name);
                text.push_str(": ");
            }
            text.push_str(&param.annotation.to_string());
        }
        if layout.defaults {
            if let Some(default) = &param.default {
                text.push_str(" = ");
                text.push_str(if layout.ellipsis { "..." } else { default });
            }
        }
        parameters.push(text);
    }
    let return_annotation = if layout.return_annotation {
        props.return_type.as_ref().map(ToString::to_string)
    } else {
        None
    };
    RenderedSignature {
        name: props.name.clone(),
        parameters,
        return_annotation,
    }
}

/// Render a member record. Overload families are ordered and duplicates
/// removed; a family reduced to one entry renders as a single signature.
pub fn render_member(member: &MemberProps, layout: Layout) -> Signature {
    match member {
        MemberProps::Single(props) => Signature::Single(render(props, layout)),
        MemberProps::Overloads { multi } => {
            let mut ordered: Vec<&SignatureProps> = multi.iter().collect();
            ordered.sort_by_key(|p| ordering_key(p));
            let kept = remove_ambiguous(remove_ambiguous(ordered));
            let mut rendered: Vec<RenderedSignature> =
                kept.into_iter().map(|p| render(p, layout)).collect();
            if rendered.len() == 1 {
                Signature::Single(rendered.remove(0))
            } else {
                Signature::Overloads(rendered)
            }
        }
    }
}

/// Sort key of one annotation: derived and named types first, then
/// containers, then numeric types narrowest first, then `Any`.
fn annotation_key(ann: &TypeExpr) -> (i32, usize, String) {
    let name = ann.head_name().rsplit('.').next().unwrap_or_default().to_string();
    match ann {
        TypeExpr::Named { .. } => {
            let weight = match name.as_str() {
                "bool" => 101,
                "int" => 102,
                "float" => 103,
                "Any" => 1000,
                _ => -1,
            };
            (weight, 1, name)
        }
        TypeExpr::Generic { args, .. } => (99, args.len(), name),
        TypeExpr::Tuple { elems } => (99, elems.len(), name),
        TypeExpr::Array { .. } => (99, 1, name),
        TypeExpr::Ellipsis => (1000, 1, name),
    }
}

fn ordering_key(props: &SignatureProps) -> Vec<(i32, usize, String)> {
    props.params.iter().map(|p| annotation_key(&p.annotation)).collect()
}

/// Drop adjacent entries with identical parameter annotations, keeping
/// the one with a return annotation.
fn remove_ambiguous(sigs: Vec<&SignatureProps>) -> Vec<&SignatureProps> {
    let mut out: Vec<&SignatureProps> = Vec::with_capacity(sigs.len());
    for sig in sigs {
        if let Some(last) = out.last() {
            let same = last.params.len() == sig.params.len()
                && last
                    .params
                    .iter()
                    .zip(&sig.params)
                    .all(|(a, b)| a.annotation == b.annotation);
            if same {
                if last.return_type.is_none() && sig.return_type.is_some() {
                    out.pop();
                    out.push(sig);
                }
                continue;
            }
        }
        out.push(sig);
    }
    out
}
