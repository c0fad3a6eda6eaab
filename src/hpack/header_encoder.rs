//! HeaderEncoder (spec §4.4, C2): literal-without-indexing HPACK encoding.
//!
//! Grounded on `proxygen/lib/http/codec/compress/HPACKEncodeBuffer.cpp`; the
//! encoder itself is thin — it owns the (message-type, huffman) policy and
//! drives one `EncodeBuffer` per call, matching "EncodeBuffer instances are
//! scoped to a single encode operation" (spec §3).

use crate::encode_buffer::EncodeBuffer;
use crate::headers::HttpHeaders;
use crate::hpack::huffman::MessageType;

/// RFC 7541 §6.2.2: "Literal Header Field without Indexing — New Name" uses
/// a 4-bit prefix with the top nibble `0000` and index `0`.
const WITHOUT_INDEXING_NEW_NAME_PREFIX_BITS: u8 = 4;
const WITHOUT_INDEXING_PREFIX_BYTE: u8 = 0x00;

/// Encodes an ordered list of (name, value) pairs into HPACK-style bytes
/// using only the literal-without-indexing representation — no static or
/// dynamic table lookups. This is the "hard part" the spec calls out; full
/// HPACK (indexing, dynamic table) lives in [`crate::hpack::wrapper`] for
/// wire-compatible codec use.
#[derive(Debug, Clone, Copy)]
pub struct HeaderEncoder {
    msg_type: MessageType,
    huffman: bool,
    growth: usize,
}

impl HeaderEncoder {
    pub fn new(msg_type: MessageType, huffman: bool) -> Self {
        Self {
            msg_type,
            huffman,
            growth: crate::encode_buffer::DEFAULT_GROWTH_SIZE,
        }
    }

    pub fn with_growth(mut self, growth: usize) -> Self {
        self.growth = growth;
        self
    }

    /// Encode `headers`, returning the flattened byte chain. For a fixed
    /// input sequence and flags this is byte-exactly reproducible (spec
    /// §4.4 "Determinism").
    pub fn encode(&self, headers: &HttpHeaders) -> Vec<u8> {
        let mut buf = EncodeBuffer::new(self.growth, self.msg_type, self.huffman);
        self.encode_into(headers, &mut buf);
        buf.take_flat()
    }

    /// Same as [`Self::encode`] but writes into a caller-supplied buffer,
    /// e.g. one that already has frame-header headroom reserved.
    pub fn encode_into(&self, headers: &HttpHeaders, buf: &mut EncodeBuffer) {
        for (name, value) in headers.iter() {
            buf.append_integer(0, WITHOUT_INDEXING_NEW_NAME_PREFIX_BITS, WITHOUT_INDEXING_PREFIX_BYTE);
            buf.append_literal(name.as_bytes());
            buf.append_literal(value.as_bytes());
        }
    }
}
