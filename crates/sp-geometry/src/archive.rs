//! Minimal zip reader for shapefile bundles.
//!
//! Reads the central directory from the end-of-central-directory record and
//! extracts every file entry into memory.  Supports *stored* (method 0) and
//! *deflate* (method 8) entries, which covers what GIS tools emit.  No
//! zip64, encryption, or multi-disk archives.

use std::collections::BTreeMap;
use std::io::Read;

use flate2::read::DeflateDecoder;

use crate::{GeometryError, GeometryResult};

const EOCD_SIG: u32 = 0x0605_4b50;
const CENTRAL_SIG: u32 = 0x0201_4b50;
const LOCAL_SIG: u32 = 0x0403_4b50;
const EOCD_MIN_LEN: usize = 22;

const METHOD_STORED: u16 = 0;
const METHOD_DEFLATE: u16 = 8;

fn le_u16(buf: &[u8], at: usize) -> GeometryResult<u16> {
    buf.get(at..at + 2)
        .map(|b| u16::from_le_bytes([b[0], b[1]]))
        .ok_or_else(|| GeometryError::Archive(format!("truncated at offset {at}")))
}

fn le_u32(buf: &[u8], at: usize) -> GeometryResult<u32> {
    buf.get(at..at + 4)
        .map(|b| u32::from_le_bytes([b[0], b[1], b[2], b[3]]))
        .ok_or_else(|| GeometryError::Archive(format!("truncated at offset {at}")))
}

/// Extract every non-directory entry of a zip archive, keyed by its path
/// inside the archive.
pub fn read_zip(bytes: &[u8]) -> GeometryResult<BTreeMap<String, Vec<u8>>> {
    let eocd = find_eocd(bytes)?;
    let entries = le_u16(bytes, eocd + 10)? as usize;
    let mut cursor = le_u32(bytes, eocd + 16)? as usize;

    let mut out = BTreeMap::new();
    for _ in 0..entries {
        if le_u32(bytes, cursor)? != CENTRAL_SIG {
            return Err(GeometryError::Archive(format!(
                "bad central directory signature at offset {cursor}"
            )));
        }
        let method = le_u16(bytes, cursor + 10)?;
        let comp_size = le_u32(bytes, cursor + 20)? as usize;
        let uncomp_size = le_u32(bytes, cursor + 24)? as usize;
        let name_len = le_u16(bytes, cursor + 28)? as usize;
        let extra_len = le_u16(bytes, cursor + 30)? as usize;
        let comment_len = le_u16(bytes, cursor + 32)? as usize;
        let local = le_u32(bytes, cursor + 42)? as usize;
        let name_bytes = bytes
            .get(cursor + 46..cursor + 46 + name_len)
            .ok_or_else(|| GeometryError::Archive("truncated entry name".into()))?;
        let name = String::from_utf8_lossy(name_bytes).into_owned();
        cursor += 46 + name_len + extra_len + comment_len;

        if name.ends_with('/') {
            continue;
        }

        let data = entry_data(bytes, local, comp_size)?;
        let content = match method {
            METHOD_STORED => data.to_vec(),
            METHOD_DEFLATE => {
                let mut buf = Vec::with_capacity(uncomp_size);
                DeflateDecoder::new(data).read_to_end(&mut buf)?;
                buf
            }
            other => {
                return Err(GeometryError::Archive(format!(
                    "entry {name:?} uses unsupported compression method {other}"
                )));
            }
        };
        out.insert(name, content);
    }
    Ok(out)
}

fn find_eocd(bytes: &[u8]) -> GeometryResult<usize> {
    if bytes.len() < EOCD_MIN_LEN {
        return Err(GeometryError::Archive("file too short to be a zip archive".into()));
    }
    // The record sits at the very end, followed only by an optional comment.
    (0..=bytes.len() - EOCD_MIN_LEN)
        .rev()
        .find(|&i| le_u32(bytes, i).is_ok_and(|sig| sig == EOCD_SIG))
        .ok_or_else(|| GeometryError::Archive("end of central directory not found".into()))
}

fn entry_data(bytes: &[u8], local: usize, comp_size: usize) -> GeometryResult<&[u8]> {
    if le_u32(bytes, local)? != LOCAL_SIG {
        return Err(GeometryError::Archive(format!(
            "bad local header signature at offset {local}"
        )));
    }
    let name_len = le_u16(bytes, local + 26)? as usize;
    let extra_len = le_u16(bytes, local + 28)? as usize;
    let start = local + 30 + name_len + extra_len;
    bytes
        .get(start..start + comp_size)
        .ok_or_else(|| GeometryError::Archive("entry data runs past end of file".into()))
}
