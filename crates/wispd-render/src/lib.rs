//! rendering pipeline for wispd.
//!
//! this crate is the pure middle of the reconciler: prioritised NetJSON
//! merging and variable substitution ([`netjson`]), translation to OpenWrt
//! UCI files ([`uci`]), and deterministic tar.gz packaging ([`archive`]).
//! no i/o happens here; everything is a function of its inputs.

#![warn(missing_docs)]

pub mod archive;
pub mod netjson;
mod template;
pub mod uci;

pub use archive::build_archive;
pub use netjson::{Source, apply_vars, merge};
pub use uci::{RenderOptions, RenderedFile, render_all};

/// errors from the rendering pipeline.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// archive serialisation failed.
    #[error("archive build failed: {0}")]
    Archive(#[from] std::io::Error),
}
