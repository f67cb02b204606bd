//! Zip packaging for "download all".

use std::collections::HashSet;
use std::io::{Cursor, Write};

use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

use crate::artifact::Artifact;
use crate::error::RasterError;

/// Package artifacts into one zip, keeping each filename.
///
/// Entries are stored uncompressed (the payloads are already compressed
/// images). Clashing names get a `-2`, `-3`, ... suffix before the extension.
pub fn package_zip(
    artifacts: &[&Artifact],
    filename: impl Into<String>,
) -> Result<Artifact, RasterError> {
    let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Stored);
    let mut used = HashSet::new();

    for artifact in artifacts {
        let name = unique_name(artifact.filename(), &mut used);
        writer
            .start_file(name, options)
            .map_err(|e| RasterError::Archive(e.to_string()))?;
        writer
            .write_all(artifact.bytes())
            .map_err(|e| RasterError::Archive(e.to_string()))?;
    }

    let cursor = writer
        .finish()
        .map_err(|e| RasterError::Archive(e.to_string()))?;
    Ok(Artifact::new(cursor.into_inner(), filename, "application/zip"))
}

fn unique_name(filename: &str, used: &mut HashSet<String>) -> String {
    let filename = if filename.is_empty() { "image" } else { filename };
    if used.insert(filename.to_string()) {
        return filename.to_string();
    }
    let (stem, ext) = match filename.rfind('.') {
        Some(pos) if pos > 0 => (&filename[..pos], &filename[pos..]),
        _ => (filename, ""),
    };
    let mut n = 2;
    loop {
        let candidate = format!("{}-{}{}", stem, n, ext);
        if used.insert(candidate.clone()) {
            return candidate;
        }
        n += 1;
    }
}
