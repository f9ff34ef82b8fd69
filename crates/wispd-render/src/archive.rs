//! deterministic tar.gz packaging of rendered files.
//!
//! the archive is content-addressed: its sha-256 is the device's
//! configuration checksum, so identical inputs must produce identical
//! bytes. entries are written in canonical order (rendered files sorted by
//! path, then extras sorted by path) with zeroed timestamps and ownership,
//! and the gzip header carries no name, comment or mtime.

use std::collections::BTreeMap;
use std::io::Write;

use flate2::{Compression, GzBuilder};
use sha2::{Digest, Sha256};

use crate::uci::RenderedFile;

/// default mode for entries that do not specify one.
const DEFAULT_MODE: u32 = 0o644;

/// build the archive and return `(bytes, hex sha-256)`.
pub fn build_archive(
    files: &[RenderedFile],
    extra: &BTreeMap<String, Vec<u8>>,
) -> Result<(Vec<u8>, String), crate::Error> {
    let gz = GzBuilder::new().mtime(0).write(Vec::new(), Compression::default());
    let mut builder = tar::Builder::new(gz);

    let mut ordered: Vec<&RenderedFile> = files.iter().collect();
    ordered.sort_by(|a, b| a.path.cmp(&b.path));
    for file in ordered {
        append(&mut builder, &file.path, &file.data, file.mode)?;
    }

    // BTreeMap iteration is already path-ordered
    for (path, data) in extra {
        append(&mut builder, path, data, DEFAULT_MODE)?;
    }

    let gz = builder.into_inner()?;
    let bytes = gz.finish()?;

    let sum = Sha256::digest(&bytes);
    Ok((bytes, hex::encode(sum)))
}

fn append<W: Write>(
    builder: &mut tar::Builder<W>,
    path: &str,
    data: &[u8],
    mode: u32,
) -> std::io::Result<()> {
    let Some(clean) = sanitize_path(path) else {
        return Ok(());
    };

    let mut header = tar::Header::new_gnu();
    header.set_size(data.len() as u64);
    header.set_mode(if mode == 0 { DEFAULT_MODE } else { mode });
    header.set_mtime(0);
    header.set_uid(0);
    header.set_gid(0);
    header.set_cksum();

    builder.append_data(&mut header, clean, data)
}

/// normalise an archive path: forward slashes, no leading slash, no `.`
/// segments, `..` collapsed so entries cannot escape the root. returns
/// `None` for paths that normalise to nothing.
fn sanitize_path(path: &str) -> Option<String> {
    let mut segments: Vec<&str> = Vec::new();
    let normalized = path.replace('\\', "/");
    for segment in normalized.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                segments.pop();
            }
            other => segments.push(other),
        }
    }
    if segments.is_empty() {
        None
    } else {
        Some(segments.join("/"))
    }
}
