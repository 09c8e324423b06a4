//! Compressed signature payloads
//!
//! The generator emits one zlib stream per type whose inflated content is
//! the newline-separated signature lines. An empty payload is never run
//! through the decoder: the generator writes zero bytes for types without
//! signatures.

use std::io::{Read, Write};

use flate2::read::ZlibDecoder;
use flate2::write::ZlibEncoder;
use flate2::Compression;

/// Inflate a payload and split it into lines.
///
/// Returns the decoder message on failure.
pub fn decompress_lines(bytes: &[u8]) -> Result<Vec<String>, String> {
    if bytes.is_empty() {
        return Ok(Vec::new());
    }
    let mut decoder = ZlibDecoder::new(bytes);
    let mut text = String::new();
    decoder
        .read_to_string(&mut text)
        .map_err(|e| e.to_string())?;
    Ok(split_lines(&text))
}

/// Split an inflated buffer into signature lines
pub fn split_lines(text: &str) -> Vec<String> {
    text.lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .map(str::to_string)
        .collect()
}

/// Compress lines the way the generator does
pub fn compress_lines<S: AsRef<str>>(lines: &[S]) -> std::io::Result<Vec<u8>> {
    if lines.is_empty() {
        return Ok(Vec::new());
    }
    let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
    for line in lines {
        encoder.write_all(line.as_ref().as_bytes())?;
        encoder.write_all(b"\n")?;
    }
    encoder.finish()
}
