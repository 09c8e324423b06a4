//! Parsed signature records
//!
//! A `PropsDict` maps member names of one type (or module) to either a
//! single `SignatureProps` or an overload family.

use std::collections::BTreeMap;
use std::fmt;

use serde::Serialize;

use super::types::TypeExpr;

/// How a member is bound to its owner
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FuncKind {
    /// Free function of a module
    Function,
    /// Instance method
    Method,
    /// Class method
    ClassMethod,
    /// Static method
    StaticMethod,
    /// Property accessor
    Property,
}

impl FuncKind {
    /// Name as reported by the `__func_kind__` modifier
    pub fn as_str(self) -> &'static str {
        match self {
            FuncKind::Function => "function",
            FuncKind::Method => "method",
            FuncKind::ClassMethod => "classmethod",
            FuncKind::StaticMethod => "staticmethod",
            FuncKind::Property => "property",
        }
    }
}

impl fmt::Display for FuncKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One declared parameter
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Param {
    /// Parameter name (reserved words already suffixed with `_`)
    pub name: String,
    /// Declared annotation
    pub annotation: TypeExpr,
    /// Default expression, verbatim
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default: Option<String>,
    /// Declared with a `...` annotation
    pub variadic: bool,
}

impl Param {
    /// Name as shown in a rendered signature (`*args` for variadics)
    pub fn display_name(&self) -> String {
        if !self.variadic {
            self.name.clone()
        } else if self.name.starts_with("arg_") {
            "*args".to_string()
        } else {
            format!("*{}", self.name)
        }
    }
}

/// Structured form of one signature line
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SignatureProps {
    /// Short member name
    pub name: String,
    /// Full dotted path as declared
    pub path: String,
    /// `self` or `cls` when the line declares a receiver
    #[serde(skip_serializing_if = "Option::is_none")]
    pub receiver: Option<String>,
    /// Declared parameters, receiver excluded
    pub params: Vec<Param>,
    /// Return annotation
    #[serde(skip_serializing_if = "Option::is_none")]
    pub return_type: Option<TypeExpr>,
    /// Index inside an overload family
    #[serde(skip_serializing_if = "Option::is_none")]
    pub multi: Option<u32>,
}

impl SignatureProps {
    /// Number of declared parameters (receiver excluded)
    pub fn arity(&self) -> usize {
        self.params.len()
    }

    /// Copy of this record under another member name
    pub fn renamed(&self, new_name: &str) -> SignatureProps {
        let path = match self.path.rsplit_once('.') {
            Some((prefix, _)) => format!("{}.{}", prefix, new_name),
            None => new_name.to_string(),
        };
        SignatureProps {
            name: new_name.to_string(),
            path,
            ..self.clone()
        }
    }

    /// Canonical signature line, parseable by the grammar
    pub fn to_line(&self) -> String {
        let mut out = String::new();
        if let Some(multi) = self.multi {
            out.push_str(&format!("{}:", multi));
        }
        out.push_str(&self.path);
        out.push('(');
        let mut first = true;
        if let Some(receiver) = &self.receiver {
            out.push_str(receiver);
            first = false;
        }
        for param in &self.params {
            if !first {
                out.push(',');
            }
            first = false;
            out.push_str(&format!("{}:{}", param.name, param.annotation));
            if let Some(default) = &param.default {
                out.push('=');
                out.push_str(default);
            }
        }
        out.push(')');
        if let Some(ret) = &self.return_type {
            out.push_str(&format!("->{}", ret));
        }
        out
    }
}

/// Record of one member: a single signature or an overload family
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum MemberProps {
    /// Exactly one signature
    Single(SignatureProps),
    /// Several signatures for the same name
    Overloads {
        /// Family members in declaration order
        multi: Vec<SignatureProps>,
    },
}

impl MemberProps {
    /// All signatures of the member
    pub fn signatures(&self) -> &[SignatureProps] {
        match self {
            MemberProps::Single(props) => std::slice::from_ref(props),
            MemberProps::Overloads { multi } => multi,
        }
    }

    /// Check for an overload family
    pub fn is_overloaded(&self) -> bool {
        matches!(self, MemberProps::Overloads { .. })
    }

    /// Deep copy with every record renamed
    pub fn renamed(&self, new_name: &str) -> MemberProps {
        match self {
            MemberProps::Single(props) => MemberProps::Single(props.renamed(new_name)),
            MemberProps::Overloads { multi } => MemberProps::Overloads {
                multi: multi.iter().map(|p| p.renamed(new_name)).collect(),
            },
        }
    }

    /// Append a signature, turning a single record into a family.
    /// Family indices count down so that the last record carries `0`.
    pub(crate) fn push_overload(&mut self, props: SignatureProps) {
        let mut multi = match std::mem::replace(self, MemberProps::Overloads { multi: Vec::new() }) {
            MemberProps::Single(first) => vec![first],
            MemberProps::Overloads { multi } => multi,
        };
        multi.push(props);
        let n = multi.len() as u32;
        for (i, p) in multi.iter_mut().enumerate() {
            p.multi = Some(n - 1 - i as u32);
        }
        *self = MemberProps::Overloads { multi };
    }
}

/// Parsed signatures of one type or module, keyed by member name
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct PropsDict {
    members: BTreeMap<String, MemberProps>,
}

impl PropsDict {
    /// Empty dictionary
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up a member
    pub fn get(&self, name: &str) -> Option<&MemberProps> {
        self.members.get(name)
    }

    /// Check for a member
    pub fn contains_key(&self, name: &str) -> bool {
        self.members.contains_key(name)
    }

    /// Insert or replace a member
    pub fn insert(&mut self, name: impl Into<String>, props: MemberProps) -> Option<MemberProps> {
        self.members.insert(name.into(), props)
    }

    /// Number of members
    pub fn len(&self) -> usize {
        self.members.len()
    }

    /// Check for no members
    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    /// Member names in sorted order
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.members.keys().map(String::as_str)
    }

    /// Members in name order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &MemberProps)> {
        self.members.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Merge `other` into `self`; existing keys are kept
    pub fn merge_missing(&mut self, other: PropsDict) {
        for (name, props) in other.members {
            self.members.entry(name).or_insert(props);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn props(name: &str) -> SignatureProps {
        SignatureProps {
            name: name.to_string(),
            path: format!("Widget.{}", name),
            receiver: Some("self".to_string()),
            params: vec![Param {
                name: "w".to_string(),
                annotation: TypeExpr::named("int"),
                default: Some("0".to_string()),
                variadic: false,
            }],
            return_type: Some(TypeExpr::named("None")),
            multi: None,
        }
    }

    #[test]
    fn test_to_line() {
        assert_eq!(props("resize").to_line(), "Widget.resize(self,w:int=0)->None");
    }

    #[test]
    fn test_renamed_keeps_path_prefix() {
        let renamed = props("setValue").renamed("set_value");
        assert_eq!(renamed.name, "set_value");
        assert_eq!(renamed.path, "Widget.set_value");
        assert_eq!(renamed.params, props("setValue").params);
    }

    #[test]
    fn test_push_overload_renumbers() {
        let mut member = MemberProps::Single(props("resize"));
        member.push_overload(props("resize"));
        member.push_overload(props("resize"));
        let indices: Vec<_> = member.signatures().iter().map(|p| p.multi).collect();
        assert_eq!(indices, vec![Some(2), Some(1), Some(0)]);
        assert!(member.is_overloaded());
    }

    #[test]
    fn test_merge_missing_keeps_existing() {
        let mut dict = PropsDict::new();
        dict.insert("a", MemberProps::Single(props("a")));
        let mut other = PropsDict::new();
        other.insert("a", MemberProps::Single(props("other")));
        other.insert("b", MemberProps::Single(props("b")));
        dict.merge_missing(other);
        assert_eq!(dict.len(), 2);
        match dict.get("a") {
            Some(MemberProps::Single(p)) => assert_eq!(p.name, "a"),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_variadic_display_name() {
        let mut p = props("f").params.remove(0);
        p.variadic = true;
        p.name = "arg_1".to_string();
        assert_eq!(p.display_name(), "*args");
        p.name = "rest".to_string();
        assert_eq!(p.display_name(), "*rest");
    }
}
