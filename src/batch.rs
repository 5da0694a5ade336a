// Copyright (c) 2026 Christoph Gaffga
// SPDX-License-Identifier: GPL-3.0-only
// https://github.com/cgaffga/ptc-core

//! Batch helpers: building many signatures at once and moving signature
//! sets between JSONL files and PTC-bin packs.
//!
//! Everything here is decoded and validated in full before anything is
//! written, so a corrupt input never leaves a partial output behind. If a
//! write fails midway, the files already written by that call are removed
//! again before the error is returned.

use std::fs;
use std::path::{Path, PathBuf};

use num_bigint::BigUint;
use tracing::{info, warn};

#[cfg(feature = "parallel")]
use rayon::prelude::*;

use crate::codec::{decode_text, encode_text, pack, read_pack};
use crate::error::{PtcError, Result};
use crate::signature::Signature;
use crate::tower::{build_signature, StrategyConfig};

/// Extension of signature text files.
pub const JSONL_EXTENSION: &str = "jsonl";

/// Build one signature per input, in input order.
///
/// Each input gets its own selection run and nice-prime cache. With the
/// `parallel` feature the inputs are processed on the rayon pool.
pub fn build_signatures(inputs: &[BigUint], cfg: &StrategyConfig) -> Result<Vec<Signature>> {
    cfg.validate()?;

    #[cfg(feature = "parallel")]
    let sigs: Result<Vec<Signature>> = inputs.par_iter().map(|n| build_signature(n, cfg)).collect();
    #[cfg(not(feature = "parallel"))]
    let sigs: Result<Vec<Signature>> = inputs.iter().map(|n| build_signature(n, cfg)).collect();

    let sigs = sigs?;
    info!(count = sigs.len(), preset = %cfg.preset, "built signatures");
    Ok(sigs)
}

/// Read and decode one JSONL signature file.
pub fn load_signature(path: &Path) -> Result<Signature> {
    let bytes = fs::read(path)?;
    decode_text(&bytes).map_err(|e| {
        warn!(path = %path.display(), error = %e, "rejected signature file");
        PtcError::from(e)
    })
}

/// Pack the given JSONL files, in the order given.
pub fn pack_files<P: AsRef<Path>>(paths: &[P]) -> Result<Vec<u8>> {
    if paths.is_empty() {
        return Err(PtcError::InvalidInput("no signature files to pack".into()));
    }
    let sigs = paths
        .iter()
        .map(|p| load_signature(p.as_ref()))
        .collect::<Result<Vec<_>>>()?;
    Ok(pack(&sigs)?)
}

/// Every `*.jsonl` file under `dir`, recursively, in lexicographic path order.
pub fn jsonl_files(dir: &Path) -> Result<Vec<PathBuf>> {
    fn walk(dir: &Path, out: &mut Vec<PathBuf>) -> Result<()> {
        for entry in fs::read_dir(dir)? {
            let path = entry?.path();
            if path.is_dir() {
                walk(&path, out)?;
            } else if path.extension().is_some_and(|e| e == JSONL_EXTENSION) {
                out.push(path);
            }
        }
        Ok(())
    }

    let mut out = Vec::new();
    walk(dir, &mut out)?;
    out.sort();
    Ok(out)
}

/// Pack every JSONL signature under `dir` into one PTC-bin stream.
pub fn pack_dir(dir: &Path) -> Result<Vec<u8>> {
    let files = jsonl_files(dir)?;
    if files.is_empty() {
        return Err(PtcError::InvalidInput(format!(
            "no .{JSONL_EXTENSION} files under {}",
            dir.display()
        )));
    }
    let bytes = pack_files(&files)?;
    info!(dir = %dir.display(), files = files.len(), bytes = bytes.len(), "packed directory");
    Ok(bytes)
}

/// Unpack a PTC-bin stream into `{prefix}_{i:04}_dict{tower}.jsonl` files
/// under `out_dir` (i counts from 1). Returns the written paths in order.
pub fn unpack_to_dir(bytes: &[u8], out_dir: &Path, prefix: &str) -> Result<Vec<PathBuf>> {
    if prefix.is_empty() || prefix.contains(|c: char| c == '/' || c == '\\') {
        return Err(PtcError::InvalidInput(format!("bad file prefix: {prefix:?}")));
    }
    let pack_file = read_pack(bytes)?;
    let texts = pack_file
        .records
        .iter()
        .map(|r| encode_text(&r.signature).map(|t| (r.tower, t)))
        .collect::<std::result::Result<Vec<_>, _>>()?;

    fs::create_dir_all(out_dir)?;
    let mut written = Vec::with_capacity(texts.len());
    for (i, (tower, text)) in texts.into_iter().enumerate() {
        let path = out_dir.join(format!("{prefix}_{:04}_dict{tower}.{JSONL_EXTENSION}", i + 1));
        if let Err(e) = fs::write(&path, text) {
            warn!(path = %path.display(), error = %e, rolled_back = written.len(), "unpack write failed");
            for done in &written {
                let _ = fs::remove_file(done);
            }
            return Err(e.into());
        }
        written.push(path);
    }
    info!(
        out_dir = %out_dir.display(),
        files = written.len(),
        towers = pack_file.towers.len(),
        "unpacked signatures"
    );
    Ok(written)
}
