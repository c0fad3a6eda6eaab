//! Wire framing for the multiplexed codec (spec §4.2, grounded on RFC 7540
//! §4 and the teacher crate's `h2_codec::H2FrameHeader`/frame constants).
//!
//! This module only knows about the 9-byte frame header and payload
//! stripping (PADDED/PRIORITY); header-block reassembly and event dispatch
//! live in [`super::multiplexed`].

#[allow(dead_code)]
pub mod frame_type {
    pub const DATA: u8 = 0x0;
    pub const HEADERS: u8 = 0x1;
    pub const PRIORITY: u8 = 0x2;
    pub const RST_STREAM: u8 = 0x3;
    pub const SETTINGS: u8 = 0x4;
    pub const PUSH_PROMISE: u8 = 0x5;
    pub const PING: u8 = 0x6;
    pub const GOAWAY: u8 = 0x7;
    pub const WINDOW_UPDATE: u8 = 0x8;
    pub const CONTINUATION: u8 = 0x9;
}

#[allow(dead_code)]
pub mod flag {
    pub const END_STREAM: u8 = 0x1;
    pub const ACK: u8 = 0x1;
    pub const END_HEADERS: u8 = 0x4;
    pub const PADDED: u8 = 0x8;
    pub const PRIORITY: u8 = 0x20;
}

#[allow(dead_code)]
pub mod settings_id {
    pub const HEADER_TABLE_SIZE: u16 = 0x1;
    pub const ENABLE_PUSH: u16 = 0x2;
    pub const MAX_CONCURRENT_STREAMS: u16 = 0x3;
    pub const INITIAL_WINDOW_SIZE: u16 = 0x4;
    pub const MAX_FRAME_SIZE: u16 = 0x5;
    pub const MAX_HEADER_LIST_SIZE: u16 = 0x6;
}

/// Upper bound on accumulated HEADERS+CONTINUATION payload (spec §4.2 edge
/// case: "CONTINUATION frames ... reassembled up to a configured limit").
pub const MAX_HEADER_BLOCK_SIZE: usize = 256 * 1024;

/// A parsed 9-byte frame header (RFC 7540 §4.1).
#[derive(Debug, Clone, Copy)]
pub struct FrameHeader {
    pub length: u32,
    pub frame_type: u8,
    pub flags: u8,
    pub stream_id: u32,
}

impl FrameHeader {
    pub const SIZE: usize = 9;

    pub fn parse(data: &[u8]) -> Option<Self> {
        if data.len() < Self::SIZE {
            return None;
        }
        let length = ((data[0] as u32) << 16) | ((data[1] as u32) << 8) | (data[2] as u32);
        let frame_type = data[3];
        let flags = data[4];
        let stream_id = (((data[5] as u32) << 24)
            | ((data[6] as u32) << 16)
            | ((data[7] as u32) << 8)
            | (data[8] as u32))
            & 0x7FFF_FFFF;
        Some(Self { length, frame_type, flags, stream_id })
    }

    pub fn total_size(&self) -> usize {
        Self::SIZE + self.length as usize
    }

    pub fn is_end_stream(&self) -> bool {
        self.flags & flag::END_STREAM != 0
    }

    pub fn is_end_headers(&self) -> bool {
        self.flags & flag::END_HEADERS != 0
    }

    pub fn is_ack(&self) -> bool {
        self.flags & flag::ACK != 0
    }

    pub fn write(sink: &mut Vec<u8>, length: u32, frame_type: u8, flags: u8, stream_id: u32) {
        sink.push((length >> 16) as u8);
        sink.push((length >> 8) as u8);
        sink.push(length as u8);
        sink.push(frame_type);
        sink.push(flags);
        sink.extend_from_slice(&(stream_id & 0x7FFF_FFFF).to_be_bytes());
    }
}

/// Strips PADDED (and, for HEADERS, PRIORITY) framing from a frame payload,
/// returning the bytes of interest. Mirrors the teacher's
/// `extract_data_payload`/`extract_headers_payload`.
pub fn strip_padding(flags: u8, mut payload: Vec<u8>) -> Result<Vec<u8>, String> {
    if flags & flag::PADDED != 0 {
        if payload.is_empty() {
            return Err("PADDED frame with no payload".to_string());
        }
        let pad_length = payload[0] as usize;
        if pad_length >= payload.len() - 1 {
            return Err("invalid padding length".to_string());
        }
        let end = payload.len() - pad_length;
        payload.truncate(end);
        payload.remove(0);
    }
    Ok(payload)
}

/// Strips PADDED and PRIORITY framing from a HEADERS frame payload.
pub fn strip_headers_framing(flags: u8, mut payload: Vec<u8>) -> Result<Vec<u8>, String> {
    let mut offset = 0;
    let mut end = payload.len();

    if flags & flag::PADDED != 0 {
        if payload.is_empty() {
            return Err("PADDED HEADERS frame with no payload".to_string());
        }
        let pad_length = payload[0] as usize;
        offset = 1;
        if pad_length >= payload.len() - offset {
            return Err("invalid padding length in HEADERS frame".to_string());
        }
        end = payload.len() - pad_length;
    }

    if flags & flag::PRIORITY != 0 {
        if payload.len() - offset < 5 {
            return Err("PRIORITY HEADERS frame with insufficient data".to_string());
        }
        offset += 5;
    }

    if offset == 0 && end == payload.len() {
        return Ok(payload);
    }
    payload.truncate(end);
    if offset > 0 {
        payload.drain(..offset);
    }
    Ok(payload)
}
