//! Table file framing.
//!
//! File layout:
//!   [0..8)   MAGIC "SNAPTBL1"
//!   [8..16)  table id, LE u64 (random, fixed at creation)
//!   then frames, back to back:
//!
//! Frame header, 12 bytes:
//!   [0]      record type (REC_PUT)
//!   [1]      flags (0)
//!   [2..4)   reserved
//!   [4..8)   payload length, LE u32
//!   [8..12)  CRC32C over header[0..8) + payload
//!
//! A frame whose header or payload runs past EOF is a torn tail (crash
//! mid-append): readers stop there, writers truncate it before appending.
//! A header with non-zero flags/reserved bytes or a length above
//! MAX_FRAME_PAYLOAD, and a complete frame with a bad CRC, are corruption
//! and are reported as such, never mistaken for a tail.

use byteorder::{ByteOrder, LittleEndian};
use std::fs::File;
use std::io::{Read, Seek, SeekFrom, Write};

use super::StoreError;

pub const TABLE_MAGIC: &[u8; 8] = b"SNAPTBL1";
pub const TABLE_HDR_SIZE: usize = 16;

pub const FRAME_HDR_SIZE: usize = 12;
const OFF_TYPE: usize = 0;
const OFF_FLAGS: usize = 1;
const OFF_RESERVED: usize = 2;
const OFF_LEN: usize = 4;
const OFF_CRC: usize = 8;

/// One stored item (JSON payload).
pub const REC_PUT: u8 = 1;

/// Largest payload a frame may carry (DynamoDB's item size limit).
pub const MAX_FRAME_PAYLOAD: usize = 400 * 1024;

#[inline]
fn crc_of_parts(head_without_crc: &[u8], payload: &[u8]) -> u32 {
    let c = crc32c::crc32c_append(0, head_without_crc);
    crc32c::crc32c_append(c, payload)
}

pub fn write_table_header(f: &mut File, table_id: u64) -> Result<(), StoreError> {
    let mut hdr = [0u8; TABLE_HDR_SIZE];
    hdr[..8].copy_from_slice(TABLE_MAGIC);
    LittleEndian::write_u64(&mut hdr[8..16], table_id);
    f.seek(SeekFrom::Start(0))?;
    f.write_all(&hdr)?;
    Ok(())
}

/// Validate magic and return the table id.
pub fn read_table_header(f: &mut File) -> Result<u64, StoreError> {
    if f.metadata()?.len() < TABLE_HDR_SIZE as u64 {
        return Err(StoreError::Corrupt("table file shorter than its header".into()));
    }
    let mut hdr = [0u8; TABLE_HDR_SIZE];
    f.seek(SeekFrom::Start(0))?;
    f.read_exact(&mut hdr)?;
    if &hdr[..8] != TABLE_MAGIC {
        return Err(StoreError::Corrupt("bad table magic".into()));
    }
    Ok(LittleEndian::read_u64(&hdr[8..16]))
}

pub fn build_frame_header(rec_type: u8, payload: &[u8]) -> [u8; FRAME_HDR_SIZE] {
    let mut hdr = [0u8; FRAME_HDR_SIZE];
    hdr[OFF_TYPE] = rec_type;
    hdr[OFF_FLAGS] = 0;
    LittleEndian::write_u32(&mut hdr[OFF_LEN..OFF_LEN + 4], payload.len() as u32);
    let crc = crc_of_parts(&hdr[..OFF_CRC], payload);
    LittleEndian::write_u32(&mut hdr[OFF_CRC..OFF_CRC + 4], crc);
    hdr
}

/// Write one frame at the writer's current position.
pub fn write_frame<W: Write>(w: &mut W, rec_type: u8, payload: &[u8]) -> Result<(), StoreError> {
    if payload.len() > MAX_FRAME_PAYLOAD {
        return Err(StoreError::Corrupt(format!(
            "payload too large for a frame: {} bytes",
            payload.len()
        )));
    }
    let hdr = build_frame_header(rec_type, payload);
    // one write so a crash leaves at most one torn frame
    let mut buf = Vec::with_capacity(FRAME_HDR_SIZE + payload.len());
    buf.extend_from_slice(&hdr);
    buf.extend_from_slice(payload);
    w.write_all(&buf)?;
    Ok(())
}

#[derive(Debug)]
pub struct Frame {
    pub rec_type: u8,
    pub payload: Vec<u8>,
}

/// Read the frame at `pos`.
///
/// - Ok(Some((frame, next_pos))): valid frame.
/// - Ok(None): EOF or torn tail.
/// - Err(Corrupt): implausible header, or CRC mismatch on a complete frame.
pub fn read_frame(f: &mut File, pos: u64, file_len: u64) -> Result<Option<(Frame, u64)>, StoreError> {
    if pos + FRAME_HDR_SIZE as u64 > file_len {
        return Ok(None);
    }
    f.seek(SeekFrom::Start(pos))?;
    let mut hdr = [0u8; FRAME_HDR_SIZE];
    f.read_exact(&mut hdr)?;

    if hdr[OFF_FLAGS] != 0 || hdr[OFF_RESERVED..OFF_LEN] != [0, 0] {
        return Err(StoreError::Corrupt(format!(
            "frame header at pos {} has non-zero flags/reserved bytes",
            pos
        )));
    }
    let len = LittleEndian::read_u32(&hdr[OFF_LEN..OFF_LEN + 4]) as u64;
    if len > MAX_FRAME_PAYLOAD as u64 {
        return Err(StoreError::Corrupt(format!(
            "frame at pos {} claims {} payload bytes (max {})",
            pos, len, MAX_FRAME_PAYLOAD
        )));
    }
    let next = pos + FRAME_HDR_SIZE as u64 + len;
    if next > file_len {
        return Ok(None);
    }

    let mut payload = vec![0u8; len as usize];
    f.read_exact(&mut payload)?;

    let stored = LittleEndian::read_u32(&hdr[OFF_CRC..OFF_CRC + 4]);
    let calc = crc_of_parts(&hdr[..OFF_CRC], &payload);
    if stored != calc {
        return Err(StoreError::Corrupt(format!(
            "frame CRC mismatch at pos {} (stored={}, calc={})",
            pos, stored, calc
        )));
    }

    Ok(Some((
        Frame {
            rec_type: hdr[OFF_TYPE],
            payload,
        },
        next,
    )))
}
