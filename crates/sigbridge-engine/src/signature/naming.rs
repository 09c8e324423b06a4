//! Alternate member spellings and reserved-word fixups

/// Reserved words of the scripting language. Names matching one of these
/// get a trailing underscore when parsed.
pub const RESERVED_WORDS: &[&str] = &[
    "False", "None", "True", "and", "as", "assert", "async", "await", "break", "class",
    "continue", "def", "del", "elif", "else", "except", "finally", "for", "from", "global",
    "if", "import", "in", "is", "lambda", "nonlocal", "not", "or", "pass", "raise", "return",
    "try", "while", "with", "yield",
];

/// Check for a reserved word
pub fn is_reserved(name: &str) -> bool {
    RESERVED_WORDS.contains(&name)
}

/// Append `_` to reserved words
pub fn escape_reserved(name: &str) -> String {
    if is_reserved(name) {
        format!("{}_", name)
    } else {
        name.to_string()
    }
}

/// Snake-case spelling of a camel-case member name.
///
/// Names are returned unchanged when shorter than three characters, when
/// they start with an uppercase letter, when they follow the `glXxx`
/// naming of GL entry points, or when they contain two consecutive
/// uppercase letters (acronyms have no unambiguous snake form).
/// The transform is idempotent: a snake-case name has no uppercase letters.
pub fn snake_case_name(name: &str) -> String {
    let bytes = name.as_bytes();
    if bytes.len() < 3 {
        return name.to_string();
    }
    if bytes[0].is_ascii_uppercase() {
        return name.to_string();
    }
    if name.starts_with("gl") && bytes[2].is_ascii_uppercase() {
        return name.to_string();
    }

    let mut out = String::with_capacity(name.len() + 4);
    let mut prev_upper = false;
    for ch in name.chars() {
        if ch.is_ascii_uppercase() {
            if prev_upper {
                return name.to_string();
            }
            out.push('_');
            out.push(ch.to_ascii_lowercase());
            prev_upper = true;
        } else {
            out.push(ch);
            prev_upper = false;
        }
    }
    out
}
