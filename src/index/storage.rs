//! On-disk layout of a saved index.
//!
//! `<key>.vectors` is binary, all integers little-endian:
//!
//! | bytes | field |
//! |---|---|
//! | 4 | magic `DQAV` |
//! | 4 | format version (u32) |
//! | 4 | dimension (u32) |
//! | 8 | vector count (u64) |
//! | 16 | save generation (uuid) |
//! | count × dimension × 4 | f32 matrix, row-major |
//!
//! `<key>.chunks` is JSON lines: a header object, then one JSON string per
//! chunk. Both files of one save carry the same generation.

use serde::{Deserialize, Serialize};
use std::ffi::OsString;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::{QaError, Result};

const VECTORS_MAGIC: [u8; 4] = *b"DQAV";
const CHUNKS_FORMAT: &str = "doc-qa-chunks";
const FORMAT_VERSION: u32 = 1;
const HEADER_LEN: usize = 4 + 4 + 4 + 8 + 16;

#[derive(Debug, Serialize, Deserialize)]
struct ChunksHeader {
    format: String,
    version: u32,
    generation: Uuid,
    count: usize,
}

struct VectorsHeader {
    dimension: usize,
    count: usize,
    generation: Uuid,
}

/// Contents of both artifacts after validation.
#[derive(Debug)]
pub(super) struct StoredIndex {
    pub dimension: usize,
    pub vectors: Vec<f32>,
    pub chunks: Vec<String>,
}

fn artifact_path(key: &Path, extension: &str) -> PathBuf {
    let mut name = OsString::from(key.as_os_str());
    name.push(".");
    name.push(extension);
    PathBuf::from(name)
}

pub(super) fn vectors_path(key: &Path) -> PathBuf {
    artifact_path(key, "vectors")
}

pub(super) fn chunks_path(key: &Path) -> PathBuf {
    artifact_path(key, "chunks")
}

fn corrupt(path: &Path, reason: impl Into<String>) -> QaError {
    QaError::CorruptIndex {
        path: path.to_path_buf(),
        reason: reason.into(),
    }
}

/// Write both artifacts to temporary files, sync them, then rename them
/// over any previous save.
pub(super) fn write(key: &Path, dimension: usize, vectors: &[f32], chunks: &[String]) -> Result<()> {
    let dims = u32::try_from(dimension)
        .map_err(|_| QaError::InvalidArgument(format!("dimension {} is too large", dimension)))?;

    if let Some(parent) = key.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }

    let generation = Uuid::new_v4();
    let suffix = format!("tmp-{}", generation);
    let vectors_final = vectors_path(key);
    let chunks_final = chunks_path(key);
    let vectors_tmp = artifact_path(&vectors_final, &suffix);
    let chunks_tmp = artifact_path(&chunks_final, &suffix);

    let written = write_vectors(&vectors_tmp, dims, chunks.len(), generation, vectors)
        .and_then(|()| write_chunks(&chunks_tmp, generation, chunks));
    if let Err(e) = written {
        warn!("Failed to write index to {}: {}", key.display(), e);
        let _ = fs::remove_file(&vectors_tmp);
        let _ = fs::remove_file(&chunks_tmp);
        return Err(e.into());
    }

    if let Err(e) = fs::rename(&vectors_tmp, &vectors_final) {
        warn!("Failed to replace {}: {}", vectors_final.display(), e);
        let _ = fs::remove_file(&vectors_tmp);
        let _ = fs::remove_file(&chunks_tmp);
        return Err(e.into());
    }
    // a failure here leaves a new vectors file beside old chunks, which load
    // reports as a generation mismatch
    if let Err(e) = fs::rename(&chunks_tmp, &chunks_final) {
        warn!("Failed to replace {}: {}", chunks_final.display(), e);
        let _ = fs::remove_file(&chunks_tmp);
        return Err(e.into());
    }

    debug!(
        "Wrote {} and {} (generation {})",
        vectors_final.display(),
        chunks_final.display(),
        generation
    );
    Ok(())
}

fn write_vectors(
    path: &Path,
    dims: u32,
    count: usize,
    generation: Uuid,
    vectors: &[f32],
) -> std::io::Result<()> {
    let mut writer = BufWriter::new(File::create(path)?);
    writer.write_all(&VECTORS_MAGIC)?;
    writer.write_all(&FORMAT_VERSION.to_le_bytes())?;
    writer.write_all(&dims.to_le_bytes())?;
    writer.write_all(&(count as u64).to_le_bytes())?;
    writer.write_all(generation.as_bytes())?;
    for value in vectors {
        writer.write_all(&value.to_le_bytes())?;
    }
    writer.into_inner()?.sync_all()
}

fn write_chunks(path: &Path, generation: Uuid, chunks: &[String]) -> std::io::Result<()> {
    let header = ChunksHeader {
        format: CHUNKS_FORMAT.to_string(),
        version: FORMAT_VERSION,
        generation,
        count: chunks.len(),
    };

    let mut writer = BufWriter::new(File::create(path)?);
    serde_json::to_writer(&mut writer, &header)?;
    writer.write_all(b"\n")?;
    for chunk in chunks {
        serde_json::to_writer(&mut writer, chunk)?;
        writer.write_all(b"\n")?;
    }
    writer.into_inner()?.sync_all()
}

/// Read and cross-check both artifacts.
pub(super) fn read(key: &Path) -> Result<StoredIndex> {
    let vectors_file = vectors_path(key);
    let chunks_file = chunks_path(key);

    match (vectors_file.exists(), chunks_file.exists()) {
        (false, false) => return Err(QaError::IndexNotFound(key.to_path_buf())),
        (true, false) => return Err(corrupt(&chunks_file, "chunks artifact is missing")),
        (false, true) => return Err(corrupt(&vectors_file, "vectors artifact is missing")),
        (true, true) => {}
    }

    let (header, vectors) = read_vectors(&vectors_file)?;
    let chunks = read_chunks(&chunks_file, &header)?;

    Ok(StoredIndex {
        dimension: header.dimension,
        vectors,
        chunks,
    })
}

fn take<const N: usize>(cursor: &mut &[u8]) -> Option<[u8; N]> {
    let (head, rest) = cursor.split_first_chunk::<N>()?;
    *cursor = rest;
    Some(*head)
}

fn read_vectors(path: &Path) -> Result<(VectorsHeader, Vec<f32>)> {
    let bytes = fs::read(path)?;
    if bytes.len() < HEADER_LEN {
        return Err(corrupt(
            path,
            format!("file is {} bytes, shorter than the header", bytes.len()),
        ));
    }

    let mut cursor = bytes.as_slice();
    let truncated = || corrupt(path, "truncated header");

    let magic = take::<4>(&mut cursor).ok_or_else(truncated)?;
    if magic != VECTORS_MAGIC {
        return Err(corrupt(path, format!("bad magic {:02X?}", magic)));
    }
    let version = u32::from_le_bytes(take(&mut cursor).ok_or_else(truncated)?);
    if version != FORMAT_VERSION {
        return Err(corrupt(path, format!("unsupported format version {}", version)));
    }
    let dims = u32::from_le_bytes(take(&mut cursor).ok_or_else(truncated)?);
    let count = u64::from_le_bytes(take(&mut cursor).ok_or_else(truncated)?);
    let generation = Uuid::from_bytes(take(&mut cursor).ok_or_else(truncated)?);

    let dimension = dims as usize;
    let count = usize::try_from(count)
        .map_err(|_| corrupt(path, format!("vector count {} is too large", count)))?;
    if dimension == 0 && count > 0 {
        return Err(corrupt(path, "zero dimension with stored vectors"));
    }

    let expected = count
        .checked_mul(dimension)
        .and_then(|n| n.checked_mul(4))
        .ok_or_else(|| corrupt(path, "header size overflows"))?;
    if cursor.len() != expected {
        return Err(corrupt(
            path,
            format!(
                "body is {} bytes, header promises {} ({} x {} floats)",
                cursor.len(),
                expected,
                count,
                dimension
            ),
        ));
    }

    let vectors: Vec<f32> = cursor
        .chunks_exact(4)
        .map(|b| f32::from_le_bytes([b[0], b[1], b[2], b[3]]))
        .collect();
    if let Some(position) = vectors.iter().position(|x| !x.is_finite()) {
        return Err(corrupt(
            path,
            format!("non-finite value at position {}", position),
        ));
    }

    Ok((
        VectorsHeader {
            dimension,
            count,
            generation,
        },
        vectors,
    ))
}

/// Parse the chunks artifact against an already validated vectors header.
fn read_chunks(path: &Path, vectors: &VectorsHeader) -> Result<Vec<String>> {
    let bytes = fs::read(path)?;
    let body = bytes.strip_suffix(b"\n").unwrap_or(bytes.as_slice());
    let mut lines = body.split(|&b| b == b'\n');

    let first = lines
        .next()
        .filter(|line| !line.is_empty())
        .ok_or_else(|| corrupt(path, "missing header line"))?;
    let header: ChunksHeader = serde_json::from_slice(first)
        .map_err(|e| corrupt(path, format!("invalid header: {}", e)))?;
    if header.format != CHUNKS_FORMAT || header.version != FORMAT_VERSION {
        return Err(corrupt(
            path,
            format!(
                "unsupported format {} version {}",
                header.format, header.version
            ),
        ));
    }
    if header.generation != vectors.generation {
        return Err(corrupt(
            path,
            format!(
                "chunks generation {} does not match save generation {}",
                header.generation, vectors.generation
            ),
        ));
    }
    if header.count != vectors.count {
        return Err(corrupt(
            path,
            format!(
                "header promises {} chunks for {} stored vectors",
                header.count, vectors.count
            ),
        ));
    }

    // vectors.count is bounded by the size of the vectors file
    let mut chunks = Vec::with_capacity(vectors.count);
    for (line_number, line) in lines.enumerate() {
        let chunk: String = serde_json::from_slice(line).map_err(|e| {
            corrupt(path, format!("invalid chunk on line {}: {}", line_number + 2, e))
        })?;
        chunks.push(chunk);
    }

    if chunks.len() != header.count {
        return Err(corrupt(
            path,
            format!(
                "header promises {} chunks, found {}",
                header.count,
                chunks.len()
            ),
        ));
    }

    Ok(chunks)
}
