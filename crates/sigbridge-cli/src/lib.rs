//! Offline inspection of signature payloads.
//!
//! The binary wraps these modules; they are exposed as a library so the
//! rendering can be tested without spawning a process.

#![warn(rust_2018_idioms)]

pub mod commands;
pub mod output;
