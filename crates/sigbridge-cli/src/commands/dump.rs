//! `sigbridge dump`: print the parsed signature dictionary.

use serde::Serialize;
use sigbridge_engine::{PropsDict, TypeKey};

use super::PayloadSource;
use crate::output::StyledOutput;

#[derive(Serialize)]
struct Dump<'a> {
    key: &'a TypeKey,
    members: &'a PropsDict,
}

/// Canonical text form: each member name followed by its lines.
pub fn render_text(dict: &PropsDict) -> String {
    let mut out = String::new();
    for (name, member) in dict.iter() {
        out.push_str(name);
        out.push('\n');
        for props in member.signatures() {
            out.push_str("    ");
            out.push_str(&props.to_line());
            out.push('\n');
        }
    }
    out
}

/// JSON document with the key and the member records.
pub fn render_json(key: &TypeKey, dict: &PropsDict) -> serde_json::Result<String> {
    serde_json::to_string_pretty(&Dump { key, members: dict })
}

pub fn execute(source: &PayloadSource<'_>, json: bool, out: &mut StyledOutput) -> anyhow::Result<()> {
    let (key, dict) = source.load()?;
    if json {
        out.plain(&render_json(&key, &dict)?);
        out.newline();
        out.flush();
        return Ok(());
    }

    out.dim(&format!("# {}", key));
    out.newline();
    for (name, member) in dict.iter() {
        out.member(name);
        out.newline();
        for props in member.signatures() {
            out.plain("    ");
            out.plain(&props.to_line());
            out.newline();
        }
    }
    out.flush();
    Ok(())
}
