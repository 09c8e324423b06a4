//! Subcommand implementations.

pub mod dump;
pub mod info;
pub mod stub;

use std::path::Path;

use anyhow::Context;
use sigbridge_engine::{PropsDict, SignatureBlob, SignatureStore, TypeKey};

/// Where the payload is read from and which key it is filed under.
#[derive(Debug, Clone)]
pub struct PayloadSource<'a> {
    /// Payload file
    pub file: &'a Path,
    /// Treat the file as a zlib stream instead of text lines
    pub compressed: bool,
    /// Declared module of the class
    pub module: Option<&'a str>,
    /// Qualified class name
    pub class: Option<&'a str>,
}

impl PayloadSource<'_> {
    /// Key the payload is registered under. Without `--class` the file
    /// stem names a module.
    pub fn key(&self) -> TypeKey {
        match self.class {
            Some(class) => TypeKey::Class {
                module: self.module.unwrap_or("__main__").into(),
                qualname: class.into(),
            },
            None => {
                let stem = self
                    .module
                    .map(str::to_string)
                    .or_else(|| {
                        self.file
                            .file_stem()
                            .map(|s| s.to_string_lossy().into_owned())
                    })
                    .unwrap_or_else(|| "__main__".to_string());
                TypeKey::Module(stem.into())
            }
        }
    }

    /// Read the file into a blob.
    pub fn blob(&self) -> anyhow::Result<SignatureBlob> {
        if self.compressed {
            let bytes = std::fs::read(self.file)
                .with_context(|| format!("failed to read {}", self.file.display()))?;
            Ok(SignatureBlob::Compressed(bytes))
        } else {
            let text = std::fs::read_to_string(self.file)
                .with_context(|| format!("failed to read {}", self.file.display()))?;
            let lines: Vec<&str> = text.lines().filter(|l| !l.trim().is_empty()).collect();
            Ok(SignatureBlob::lines(&lines))
        }
    }

    /// Register the payload in a fresh store and build its dictionary.
    pub fn load(&self) -> anyhow::Result<(TypeKey, PropsDict)> {
        let key = self.key();
        let store = SignatureStore::new();
        store.register(key.clone(), self.blob()?);
        let dict = store
            .props_for(&key)
            .with_context(|| format!("failed to build signatures for {}", key))?
            .map(|dict| (*dict).clone())
            .unwrap_or_default();
        log::info!(target: "sigbridge::cli", "{}: {} members", key, dict.len());
        Ok((key, dict))
    }
}
