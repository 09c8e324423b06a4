//! Type expressions inside signature lines
//!
//! ```text
//! type    := atom suffix*
//! atom    := '(' list ')' | '...' | name ( '[' list ']' )?
//! suffix  := '[' digits? ']'
//! ```
//!
//! `name[]` and `name[N]` are arrays, any other bracket is a generic
//! argument list. Rendering is canonical: no whitespace anywhere.

use std::fmt;

use serde::Serialize;

/// Parsed annotation
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum TypeExpr {
    /// Plain or dotted name: `int`, `PySide6.QtCore.QSize`
    Named {
        /// Full name
        name: String,
    },
    /// Generic application: `QList[int]`
    Generic {
        /// Constructor name
        name: String,
        /// Arguments
        args: Vec<TypeExpr>,
    },
    /// Array: `int[]` or `int[3]`
    Array {
        /// Element type
        elem: Box<TypeExpr>,
        /// Fixed length, if any
        len: Option<usize>,
    },
    /// Tuple: `(int,int)`
    Tuple {
        /// Elements
        elems: Vec<TypeExpr>,
    },
    /// `...`
    Ellipsis,
}

impl TypeExpr {
    /// Named type shorthand
    pub fn named(name: impl Into<String>) -> Self {
        TypeExpr::Named { name: name.into() }
    }

    /// Parse an annotation. Returns a description of the problem on failure.
    pub fn parse(text: &str) -> Result<TypeExpr, String> {
        let compact: String = text.chars().filter(|c| !c.is_whitespace()).collect();
        let mut parser = TypeParser {
            src: compact.as_bytes(),
            pos: 0,
        };
        let ty = parser.parse_type()?;
        if parser.pos != parser.src.len() {
            return Err(format!("trailing input in type {:?}", text));
        }
        Ok(ty)
    }

    /// Head name used for ordering and converter lookup
    pub fn head_name(&self) -> &str {
        match self {
            TypeExpr::Named { name } | TypeExpr::Generic { name, .. } => name,
            TypeExpr::Array { elem, .. } => elem.head_name(),
            TypeExpr::Tuple { .. } => "Tuple",
            TypeExpr::Ellipsis => "...",
        }
    }

    /// Check for `None`
    pub fn is_none(&self) -> bool {
        matches!(self, TypeExpr::Named { name } if name == "None")
    }
}

struct TypeParser<'a> {
    src: &'a [u8],
    pos: usize,
}

impl<'a> TypeParser<'a> {
    fn peek(&self) -> Option<u8> {
        self.src.get(self.pos).copied()
    }

    fn eat(&mut self, byte: u8) -> bool {
        if self.peek() == Some(byte) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn parse_type(&mut self) -> Result<TypeExpr, String> {
        let mut ty = self.parse_atom()?;
        // Array suffixes: `[]` or `[N]`
        while self.peek() == Some(b'[') {
            let start = self.pos + 1;
            let mut end = start;
            while self.src.get(end).is_some_and(|b| b.is_ascii_digit()) {
                end += 1;
            }
            if self.src.get(end) != Some(&b']') {
                break;
            }
            let len = if end > start {
                let digits = std::str::from_utf8(&self.src[start..end]).map_err(|e| e.to_string())?;
                Some(digits.parse::<usize>().map_err(|e| e.to_string())?)
            } else {
                None
            };
            self.pos = end + 1;
            ty = TypeExpr::Array {
                elem: Box::new(ty),
                len,
            };
        }
        Ok(ty)
    }

    fn parse_atom(&mut self) -> Result<TypeExpr, String> {
        if self.src[self.pos..].starts_with(b"...") {
            self.pos += 3;
            return Ok(TypeExpr::Ellipsis);
        }
        if self.eat(b'(') {
            let elems = self.parse_list(b')')?;
            return Ok(TypeExpr::Tuple { elems });
        }
        let name = self.parse_name()?;
        if self.peek() == Some(b'[') && !self.is_array_suffix() {
            self.pos += 1;
            let args = self.parse_list(b']')?;
            return Ok(TypeExpr::Generic { name, args });
        }
        Ok(TypeExpr::Named { name })
    }

    fn is_array_suffix(&self) -> bool {
        let mut i = self.pos + 1;
        while self.src.get(i).is_some_and(|b| b.is_ascii_digit()) {
            i += 1;
        }
        self.src.get(i) == Some(&b']')
    }

    fn parse_name(&mut self) -> Result<String, String> {
        let start = self.pos;
        while let Some(b) = self.peek() {
            if matches!(b, b'[' | b']' | b'(' | b')' | b',') {
                break;
            }
            self.pos += 1;
        }
        if self.pos == start {
            return Err(format!("expected a type name at offset {}", start));
        }
        let name = std::str::from_utf8(&self.src[start..self.pos]).map_err(|e| e.to_string())?;
        Ok(name.to_string())
    }

    fn parse_list(&mut self, close: u8) -> Result<Vec<TypeExpr>, String> {
        let mut items = Vec::new();
        if self.eat(close) {
            return Ok(items);
        }
        loop {
            items.push(self.parse_type()?);
            if self.eat(b',') {
                continue;
            }
            if self.eat(close) {
                return Ok(items);
            }
            return Err(format!("expected ',' or '{}' at offset {}", close as char, self.pos));
        }
    }
}

fn write_list(f: &mut fmt::Formatter<'_>, items: &[TypeExpr]) -> fmt::Result {
    for (i, item) in items.iter().enumerate() {
        if i > 0 {
            f.write_str(",")?;
        }
        write!(f, "{}", item)?;
    }
    Ok(())
}

impl fmt::Display for TypeExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypeExpr::Named { name } => f.write_str(name),
            TypeExpr::Generic { name, args } => {
                write!(f, "{}[", name)?;
                write_list(f, args)?;
                f.write_str("]")
            }
            TypeExpr::Array { elem, len: Some(n) } => write!(f, "{}[{}]", elem, n),
            TypeExpr::Array { elem, len: None } => write!(f, "{}[]", elem),
            TypeExpr::Tuple { elems } => {
                f.write_str("(")?;
                write_list(f, elems)?;
                f.write_str(")")
            }
            TypeExpr::Ellipsis => f.write_str("..."),
        }
    }
}
