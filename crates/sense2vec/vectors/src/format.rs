//! Binary layout of `vectors.bin`.
//!
//! ```text
//! [ magic u32 | version u32 | rows u64 | dim u64 ]   header, 24 bytes
//! [ id u64 ] * rows                                  row -> key id
//! [ f32 ] * rows * dim                               row-major data
//! ```
//!
//! Everything is little-endian.

use std::io::Write as _;

/// Magic bytes for file validation.
const MAGIC: u32 = 0x5656_3253; // "S2VV"
const VERSION: u32 = 1;

/// magic + version + rows + dim
const HEADER_SIZE: usize = 24;

/// Write `vectors` in the binary layout.
pub fn write<W: std::io::Write>(vectors: &crate::Vectors, out: W) -> std::io::Result<()> {
    let mut out = std::io::BufWriter::with_capacity(64 * 1024, out);

    out.write_all(&MAGIC.to_le_bytes())?;
    out.write_all(&VERSION.to_le_bytes())?;
    out.write_all(&(vectors.len() as u64).to_le_bytes())?;
    out.write_all(&(vectors.dim() as u64).to_le_bytes())?;

    for id in vectors.row_ids() {
        out.write_all(&id.0.to_le_bytes())?;
    }
    for &value in vectors.matrix() {
        out.write_all(&value.to_le_bytes())?;
    }

    out.flush()
}

/// Encode `vectors` into a fresh buffer.
#[must_use]
pub fn to_bytes(vectors: &crate::Vectors) -> Vec<u8> {
    let mut buf = Vec::with_capacity(HEADER_SIZE + vectors.len() * (8 + vectors.dim() * 4));
    // Writing into a Vec cannot fail.
    let _ = write(vectors, &mut buf);
    buf
}

/// Decode the binary layout.
pub fn from_bytes(bytes: &[u8]) -> sense2vec_core::Result<crate::Vectors> {
    if bytes.len() < HEADER_SIZE {
        return Err(sense2vec_core::Error::corrupt(format!(
            "vectors file too short for header: {} bytes",
            bytes.len()
        )));
    }

    let magic = u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]);
    let version = u32::from_le_bytes([bytes[4], bytes[5], bytes[6], bytes[7]]);
    let rows = read_u64(&bytes[8..16]);
    let dim = read_u64(&bytes[16..24]);

    if magic != MAGIC {
        return Err(sense2vec_core::Error::corrupt(format!(
            "invalid vectors magic: expected {MAGIC:#x}, got {magic:#x}"
        )));
    }
    if version != VERSION {
        return Err(sense2vec_core::Error::corrupt(format!(
            "unsupported vectors version: expected {VERSION}, got {version}"
        )));
    }

    let rows = usize::try_from(rows).map_err(sense2vec_core::Error::corrupt)?;
    let dim = usize::try_from(dim).map_err(sense2vec_core::Error::corrupt)?;

    let expected = rows
        .checked_mul(8)
        .and_then(|ids| rows.checked_mul(dim)?.checked_mul(4)?.checked_add(ids))
        .and_then(|body| body.checked_add(HEADER_SIZE))
        .ok_or_else(|| sense2vec_core::Error::corrupt("vectors shape overflows"))?;
    if bytes.len() != expected {
        return Err(sense2vec_core::Error::corrupt(format!(
            "vectors data size mismatch: shape ({rows}, {dim}) needs {expected} bytes, got {}",
            bytes.len()
        )));
    }

    let ids_end = HEADER_SIZE + rows * 8;
    let ids = bytes[HEADER_SIZE..ids_end]
        .chunks_exact(8)
        .map(|chunk| sense2vec_core::KeyId(read_u64(chunk)))
        .collect();
    let data = bytes[ids_end..]
        .chunks_exact(4)
        .map(|chunk| f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
        .collect();

    crate::Vectors::from_parts(dim, ids, data)
}

/// Write `vectors.bin` at `path`.
pub fn write_file(vectors: &crate::Vectors, path: &std::path::Path) -> sense2vec_core::Result<()> {
    let file = std::fs::File::create(path).map_err(|e| sense2vec_core::Error::io(path, e))?;
    write(vectors, file).map_err(|e| sense2vec_core::Error::io(path, e))?;
    tracing::debug!(
        path = %path.display(),
        rows = vectors.len(),
        dim = vectors.dim(),
        "wrote vectors"
    );
    Ok(())
}

/// Read `vectors.bin` at `path` through a memory map.
pub fn read_file(path: &std::path::Path) -> sense2vec_core::Result<crate::Vectors> {
    let file = match std::fs::File::open(path) {
        Ok(file) => file,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(sense2vec_core::Error::MissingInputFile(path.to_path_buf()));
        }
        Err(e) => return Err(sense2vec_core::Error::io(path, e)),
    };

    // SAFETY: the map is only read while `file` is open, and decoding copies
    // everything out before it is dropped.
    let mmap =
        unsafe { memmap2::Mmap::map(&file) }.map_err(|e| sense2vec_core::Error::io(path, e))?;

    let vectors = from_bytes(&mmap)?;
    tracing::debug!(
        path = %path.display(),
        rows = vectors.len(),
        dim = vectors.dim(),
        "read vectors"
    );
    Ok(vectors)
}

fn read_u64(buf: &[u8]) -> u64 {
    let mut word = [0u8; 8];
    word.copy_from_slice(&buf[..8]);
    u64::from_le_bytes(word)
}
