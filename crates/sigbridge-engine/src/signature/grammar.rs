//! Signature line grammar
//!
//! Each line produced by the generator has the form
//!
//! ```text
//! [N:]dotted.path(arg, arg, ...)[->return]
//! arg := self | cls | name:annotation[=default]
//! ```
//!
//! `N:` marks a member of an overload family; indices count down and
//! `0:` closes the family. Defaults are arbitrary expressions and may
//! contain nested brackets, commas inside brackets and quoted strings.

use once_cell::sync::Lazy;
use regex::Regex;

use super::naming::escape_reserved;
use super::props::{MemberProps, Param, PropsDict, SignatureProps};
use super::types::TypeExpr;
use crate::error::{BridgeError, BridgeResult};

static LINE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(?:(?P<multi>[0-9]+):)?(?P<funcname>\w+(?:\.\w+)*)\((?P<arglist>.*?)\)(?:->(?P<returntype>.*))?$")
        .unwrap_or_else(|e| panic!("signature line pattern: {}", e))
});

static MULTI_PREFIX_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^([0-9]+):").unwrap_or_else(|e| panic!("multi prefix pattern: {}", e)));

fn syntax_error(line: &str, reason: impl Into<String>) -> BridgeError {
    BridgeError::SignatureSyntax {
        line: line.to_string(),
        reason: reason.into(),
    }
}

/// Split an argument list at top-level commas.
///
/// Commas nested in `()`, `[]`, `{}` or quotes do not split.
pub fn split_args(arglist: &str) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut depth = 0usize;
    let mut quote: Option<char> = None;
    let mut start = 0;
    let mut escaped = false;

    for (i, ch) in arglist.char_indices() {
        if let Some(q) = quote {
            if escaped {
                escaped = false;
            } else if ch == '\\' {
                escaped = true;
            } else if ch == q {
                quote = None;
            }
            continue;
        }
        match ch {
            '"' | '\'' => quote = Some(ch),
            '(' | '[' | '{' => depth += 1,
            ')' | ']' | '}' => depth = depth.saturating_sub(1),
            ',' if depth == 0 => {
                parts.push(arglist[start..i].trim());
                start = i + 1;
            }
            _ => {}
        }
    }
    let tail = arglist[start..].trim();
    if !tail.is_empty() || !parts.is_empty() {
        parts.push(tail);
    }
    parts.retain(|p| !p.is_empty());
    parts
}

/// Parse one signature line
pub fn parse_line(line: &str) -> BridgeResult<SignatureProps> {
    let line = line.trim();
    let caps = LINE_RE
        .captures(line)
        .ok_or_else(|| syntax_error(line, "does not match the signature grammar"))?;

    let multi = match caps.name("multi") {
        Some(m) => Some(
            m.as_str()
                .parse::<u32>()
                .map_err(|e| syntax_error(line, e.to_string()))?,
        ),
        None => None,
    };

    let mut path = caps["funcname"].to_string();
    let short = match path.rsplit_once('.') {
        Some((_, last)) => last.to_string(),
        None => path.clone(),
    };
    let name = escape_reserved(&short);
    if name != short {
        path.push('_');
    }

    let mut receiver = None;
    let mut params = Vec::new();
    for (idx, arg) in split_args(&caps["arglist"]).into_iter().enumerate() {
        let Some((raw_name, rest)) = arg.split_once(':') else {
            if idx == 0 && (arg == "self" || arg == "cls") {
                receiver = Some(arg.to_string());
                continue;
            }
            return Err(syntax_error(line, format!("argument {:?} has no annotation", arg)));
        };
        let (ann, default) = match rest.split_once('=') {
            Some((ann, default)) => (ann.trim(), Some(default.trim().to_string())),
            None => (rest.trim(), None),
        };
        let annotation = TypeExpr::parse(ann).map_err(|e| syntax_error(line, e))?;
        params.push(Param {
            name: escape_reserved(raw_name.trim()),
            variadic: annotation == TypeExpr::Ellipsis,
            annotation,
            default,
        });
    }

    let return_type = match caps.name("returntype") {
        Some(ret) => Some(TypeExpr::parse(ret.as_str()).map_err(|e| syntax_error(line, e))?),
        None => None,
    };

    Ok(SignatureProps {
        name,
        path,
        receiver,
        params,
        return_type,
        multi,
    })
}

/// Recompute overload families.
///
/// Families can collapse when distinct native types map to the same
/// scripting type. Duplicate lines inside a family are removed, the
/// family is renumbered, and a family of one becomes a plain line.
pub fn fixup_multilines<S: AsRef<str>>(lines: &[S]) -> Vec<String> {
    let mut res = Vec::with_capacity(lines.len());
    let mut family: Vec<String> = Vec::new();

    for line in lines {
        let line = line.as_ref().trim();
        if line.is_empty() {
            continue;
        }
        let Some(caps) = MULTI_PREFIX_RE.captures(line) else {
            res.push(line.to_string());
            continue;
        };
        let idx: u64 = caps[1].parse().unwrap_or(0);
        family.push(line[caps[0].len()..].to_string());
        if idx > 0 {
            continue;
        }
        family.sort();
        family.dedup();
        let n = family.len();
        if n > 1 {
            for (i, rest) in family.drain(..).enumerate() {
                res.push(format!("{}:{}", n - i - 1, rest));
            }
        } else {
            res.append(&mut family);
        }
    }
    // Unterminated family: keep what was collected
    res.extend(family);
    res
}

/// Build a `PropsDict` from the lines registered for one key.
///
/// Lines that repeat a member name are grouped into an overload family,
/// whether or not they carry an index prefix.
pub fn build_props<S: AsRef<str>>(lines: &[S]) -> BridgeResult<PropsDict> {
    let mut dict = PropsDict::new();
    for line in fixup_multilines(lines) {
        let props = parse_line(&line)?;
        let name = props.name.clone();
        match dict.get(&name).cloned() {
            Some(mut existing) => {
                existing.push_overload(props);
                dict.insert(name, existing);
            }
            None => {
                let member = if props.multi.is_some_and(|m| m > 0) {
                    MemberProps::Overloads { multi: vec![props] }
                } else {
                    MemberProps::Single(SignatureProps { multi: None, ..props })
                };
                dict.insert(name, member);
            }
        }
    }
    Ok(dict)
}
