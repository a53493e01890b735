//! Artifact framing with CRC32 checksums
//!
//! Layout (little endian):
//! `[magic: u32][version: u32][last_modified: i32 days from CE][length: u64][crc: u32][payload]`

use crate::{BlobArtifact, StorageError};
use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use chrono::{Datelike, NaiveDate};
use crc32fast::Hasher;
use std::io::{Cursor, Read};

/// Size of the frame header in bytes
pub const FRAME_HEADER_SIZE: usize = 24;

/// Magic number for artifact files
const FRAME_MAGIC: u32 = 0x534D_4246; // "SMBF"

/// Version of the frame format
const FRAME_VERSION: u32 = 1;

/// CRC32 of a payload, as stored in the frame header
#[must_use]
pub fn checksum(data: &[u8]) -> u32 {
    let mut hasher = Hasher::new();
    hasher.update(data);
    hasher.finalize()
}

/// Wrap `payload` in a frame stamped with `last_modified`
pub fn encode(payload: &[u8], last_modified: NaiveDate) -> Result<Vec<u8>, StorageError> {
    let length = u64::try_from(payload.len()).map_err(|_| {
        std::io::Error::new(std::io::ErrorKind::InvalidInput, "Payload too large")
    })?;

    let mut out = Vec::with_capacity(FRAME_HEADER_SIZE + payload.len());
    out.write_u32::<LittleEndian>(FRAME_MAGIC)?;
    out.write_u32::<LittleEndian>(FRAME_VERSION)?;
    out.write_i32::<LittleEndian>(last_modified.num_days_from_ce())?;
    out.write_u64::<LittleEndian>(length)?;
    out.write_u32::<LittleEndian>(checksum(payload))?;
    out.extend_from_slice(payload);
    Ok(out)
}

/// Verify and unwrap a frame read from the artifact stored under `key`
pub fn decode(key: &str, data: &[u8]) -> Result<BlobArtifact, StorageError> {
    let corrupt = |reason: String| StorageError::Corrupt {
        key: key.to_string(),
        reason,
    };

    if data.len() < FRAME_HEADER_SIZE {
        return Err(corrupt(format!("frame too short: {} bytes", data.len())));
    }

    let mut reader = Cursor::new(data);
    let magic = reader.read_u32::<LittleEndian>()?;
    if magic != FRAME_MAGIC {
        return Err(corrupt(format!("invalid magic: {magic:#x}")));
    }

    let version = reader.read_u32::<LittleEndian>()?;
    if version != FRAME_VERSION {
        return Err(corrupt(format!("unsupported version: {version}")));
    }

    let days = reader.read_i32::<LittleEndian>()?;
    let last_modified = NaiveDate::from_num_days_from_ce_opt(days)
        .ok_or_else(|| corrupt(format!("invalid date stamp: {days}")))?;

    let length = usize::try_from(reader.read_u64::<LittleEndian>()?)
        .map_err(|_| corrupt("length too large".to_string()))?;
    let expected_crc = reader.read_u32::<LittleEndian>()?;

    let remaining = data.len() - FRAME_HEADER_SIZE;
    if remaining != length {
        return Err(corrupt(format!(
            "length mismatch: header says {length}, found {remaining}"
        )));
    }

    let mut bytes = vec![0u8; length];
    reader.read_exact(&mut bytes)?;

    let actual_crc = checksum(&bytes);
    if actual_crc != expected_crc {
        return Err(corrupt(format!(
            "CRC mismatch: expected {expected_crc:#x}, got {actual_crc:#x}"
        )));
    }

    Ok(BlobArtifact {
        bytes,
        last_modified,
    })
}
