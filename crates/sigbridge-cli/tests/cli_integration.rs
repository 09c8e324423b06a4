//! Integration tests for payload loading behind `sigbridge dump` and
//! `sigbridge stub`.

use std::io::Write;
use std::path::Path;

use sigbridge_cli::commands::dump::{render_json, render_text};
use sigbridge_cli::commands::stub::render_stub;
use sigbridge_cli::commands::PayloadSource;
use sigbridge_engine::{compress_lines, TypeKey};
use tempfile::NamedTempFile;

fn text_file(lines: &[&str]) -> NamedTempFile {
    let mut file = NamedTempFile::new().expect("temp file");
    for line in lines {
        writeln!(file, "{}", line).expect("write line");
    }
    file
}

fn source(path: &Path, compressed: bool) -> PayloadSource<'_> {
    PayloadSource {
        file: path,
        compressed,
        module: Some("gui"),
        class: Some("Window"),
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Loading
// ────────────────────────────────────────────────────────────────────────────

#[test]
fn test_load_text_payload() {
    let file = text_file(&[
        "gui.Window.setWindowTitle(self,title:str)",
        "",
        "gui.Window.windowTitle(self)->str",
    ]);
    let (key, dict) = source(file.path(), false).load().expect("load");
    assert_eq!(
        key,
        TypeKey::Class {
            module: "gui".into(),
            qualname: "Window".into(),
        }
    );
    assert!(dict.contains_key("setWindowTitle"));
    assert!(dict.contains_key("set_window_title"));
    assert!(dict.contains_key("window_title"));
}

#[test]
fn test_load_compressed_payload() {
    let payload = compress_lines(&["Window.show(self)", "Window.hide(self)"]).expect("compress");
    let mut file = NamedTempFile::new().expect("temp file");
    file.write_all(&payload).expect("write payload");

    let (_, dict) = source(file.path(), true).load().expect("load");
    let keys: Vec<&str> = dict.keys().collect();
    assert_eq!(keys, vec!["hide", "show"]);
}

#[test]
fn test_corrupt_compressed_payload_fails() {
    let mut file = NamedTempFile::new().expect("temp file");
    file.write_all(&[0x78, 0x9c, 0xff, 0x00, 0x13]).expect("write payload");
    assert!(source(file.path(), true).load().is_err());
}

#[test]
fn test_missing_file_fails() {
    let dir = tempfile::tempdir().expect("temp dir");
    let missing = dir.path().join("absent.sig");
    assert!(source(&missing, false).load().is_err());
}

#[test]
fn test_module_key_from_file_stem() {
    let dir = tempfile::tempdir().expect("temp dir");
    let path = dir.path().join("helpers.sig");
    std::fs::write(&path, "helpers.clamp(v:int,lo:int,hi:int)->int\n").expect("write");
    let src = PayloadSource {
        file: &path,
        compressed: false,
        module: None,
        class: None,
    };
    assert_eq!(src.key(), TypeKey::Module("helpers".into()));
    let (_, dict) = src.load().expect("load");
    assert_eq!(dict.get("clamp").expect("clamp").signatures()[0].arity(), 3);
}

// ────────────────────────────────────────────────────────────────────────────
// Rendering
// ────────────────────────────────────────────────────────────────────────────

#[test]
fn test_dump_text_and_json_agree() {
    let file = text_file(&["gui.Window.resize(self,w:int,h:int)->None"]);
    let (key, dict) = source(file.path(), false).load().expect("load");

    let text = render_text(&dict);
    assert!(text.starts_with("resize\n    gui.Window.resize(self,w:int,h:int)->None\n"));

    let json: serde_json::Value =
        serde_json::from_str(&render_json(&key, &dict).expect("json")).expect("parse");
    assert_eq!(json["key"]["module"], "gui");
    assert_eq!(json["key"]["qualname"], "Window");
    assert_eq!(json["members"]["resize"]["return_type"]["kind"], "named");
    assert_eq!(json["members"]["resize"]["return_type"]["name"], "None");
}

#[test]
fn test_stub_from_payload() {
    let file = text_file(&["gui.Window.setOpacity(self,level:float=1.0)->None"]);
    let (_, dict) = source(file.path(), false).load().expect("load");
    let stub = render_stub(&dict);
    assert!(stub.contains("def setOpacity(self, level: float = ...) -> None: ...\n"));
    assert!(stub.contains("def set_opacity(self, level: float = ...) -> None: ...\n"));
}
