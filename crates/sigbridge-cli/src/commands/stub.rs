//! `sigbridge stub`: render members as stub declarations.

use sigbridge_engine::{render_member, Layout, PropsDict, Signature};

use super::PayloadSource;
use crate::output::StyledOutput;

/// Stub text for a dictionary. Overload families are ordered and
/// de-duplicated before rendering.
pub fn render_stub(dict: &PropsDict) -> String {
    let mut out = String::new();
    for (_, member) in dict.iter() {
        match render_member(member, Layout::HINTING_STUB) {
            Signature::Single(sig) => {
                out.push_str(&format!("def {}: ...\n", sig));
            }
            Signature::Overloads(sigs) => {
                for sig in sigs {
                    out.push_str("@typing.overload\n");
                    out.push_str(&format!("def {}: ...\n", sig));
                }
            }
        }
    }
    out
}

pub fn execute(source: &PayloadSource<'_>, out: &mut StyledOutput) -> anyhow::Result<()> {
    let (_, dict) = source.load()?;
    out.plain(&render_stub(&dict));
    out.flush();
    Ok(())
}
