//! Signature Store
//!
//! Maps a [`TypeKey`] to the signature blob registered for it. The first
//! lookup of a key inflates (if compressed), splits and parses the blob,
//! adds alternate-spelling entries, and replaces the raw entry with the
//! built [`PropsDict`]. The raw entry is replaced only after the build has
//! completed, so readers never see a partial dictionary.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use dashmap::DashMap;

use super::key::TypeKey;
use super::name_index::insert_alternate_variants;
use crate::error::{BridgeError, BridgeResult};
use crate::signature::{build_props, decompress_lines, PropsDict};

/// Signatures as registered by generated code
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SignatureBlob {
    /// One signature line per entry
    Lines(Vec<String>),
    /// zlib stream of newline-separated lines; empty means no signatures
    Compressed(Vec<u8>),
}

impl SignatureBlob {
    /// Blob from string lines
    pub fn lines<S: AsRef<str>>(lines: &[S]) -> Self {
        SignatureBlob::Lines(lines.iter().map(|s| s.as_ref().to_string()).collect())
    }
}

/// Turns signature lines into a `PropsDict`.
///
/// `Ok(None)` means "nothing to report"; the store caches an empty
/// dictionary in that case.
pub trait SignatureParser: Send + Sync {
    /// Parse the lines registered for `key`
    fn parse(&self, key: &TypeKey, lines: &[String]) -> BridgeResult<Option<PropsDict>>;
}

/// Parser for the generator's line grammar
#[derive(Debug, Default, Clone, Copy)]
pub struct GrammarParser;

impl SignatureParser for GrammarParser {
    fn parse(&self, _key: &TypeKey, lines: &[String]) -> BridgeResult<Option<PropsDict>> {
        build_props(lines).map(Some)
    }
}

#[derive(Debug, Clone)]
enum Entry {
    Raw(SignatureBlob),
    Built(Arc<PropsDict>),
}

/// Lazily built signature dictionaries, keyed by type key
pub struct SignatureStore {
    entries: DashMap<TypeKey, Entry>,
    parser: Option<Arc<dyn SignatureParser>>,
    builds: AtomicUsize,
}

impl SignatureStore {
    /// Store using the grammar parser
    pub fn new() -> Self {
        Self::with_parser(Some(Arc::new(GrammarParser)))
    }

    /// Store with a specific parser, or none at all.
    ///
    /// Without a parser every key resolves to an empty dictionary.
    pub fn with_parser(parser: Option<Arc<dyn SignatureParser>>) -> Self {
        Self {
            entries: DashMap::new(),
            parser,
            builds: AtomicUsize::new(0),
        }
    }

    /// Register a blob, replacing any prior entry for the key
    pub fn register(&self, key: TypeKey, blob: SignatureBlob) {
        log::trace!(target: "sigbridge::signature", "registering signatures for {}", key);
        self.entries.insert(key, Entry::Raw(blob));
    }

    /// Check whether a key was registered
    pub fn contains(&self, key: &TypeKey) -> bool {
        self.entries.contains_key(key)
    }

    /// Check whether a key's dictionary has been built
    pub fn is_built(&self, key: &TypeKey) -> bool {
        matches!(
            self.entries.get(key).as_deref(),
            Some(Entry::Built(_))
        )
    }

    /// Number of registered keys
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check for no registered keys
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Number of dictionaries built so far
    pub fn build_count(&self) -> usize {
        self.builds.load(Ordering::Relaxed)
    }

    /// Dictionary for a key, building it on first access.
    ///
    /// Returns `Ok(None)` for keys that were never registered.
    pub fn props_for(&self, key: &TypeKey) -> BridgeResult<Option<Arc<PropsDict>>> {
        let blob = match self.entries.get(key).as_deref() {
            None => return Ok(None),
            Some(Entry::Built(dict)) => return Ok(Some(dict.clone())),
            Some(Entry::Raw(blob)) => blob.clone(),
        };

        let built = Arc::new(self.build(key, &blob)?);

        // Publish unless another caller finished first or the key was
        // re-registered in the meantime.
        let mut entry = self
            .entries
            .entry(key.clone())
            .or_insert_with(|| Entry::Raw(blob.clone()));
        let publish = match entry.value() {
            Entry::Built(existing) => return Ok(Some(existing.clone())),
            Entry::Raw(current) => *current == blob,
        };
        if publish {
            *entry.value_mut() = Entry::Built(built.clone());
        }
        Ok(Some(built))
    }

    fn build(&self, key: &TypeKey, blob: &SignatureBlob) -> BridgeResult<PropsDict> {
        let lines = match blob {
            SignatureBlob::Lines(lines) => lines.clone(),
            SignatureBlob::Compressed(bytes) if bytes.is_empty() => {
                log::trace!(target: "sigbridge::signature", "empty payload for {}", key);
                return Ok(PropsDict::new());
            }
            SignatureBlob::Compressed(bytes) => {
                decompress_lines(bytes).map_err(|reason| BridgeError::Decompression {
                    key: key.to_string(),
                    reason,
                })?
            }
        };

        let Some(parser) = &self.parser else {
            log::warn!(
                target: "sigbridge::signature",
                "no signature parser available, {} resolves to an empty signature set",
                key
            );
            return Ok(PropsDict::new());
        };

        self.builds.fetch_add(1, Ordering::Relaxed);
        let mut dict = match parser.parse(key, &lines)? {
            Some(dict) => dict,
            None => PropsDict::new(),
        };
        insert_alternate_variants(&mut dict);
        log::debug!(
            target: "sigbridge::signature",
            "built {} members for {} from {} lines",
            dict.len(),
            key,
            lines.len()
        );
        Ok(dict)
    }
}

impl Default for SignatureStore {
    fn default() -> Self {
        Self::new()
    }
}
