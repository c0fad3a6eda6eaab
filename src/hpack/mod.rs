//! HPACK-style header compression (spec §4.1, §4.4, C1/C2).

pub mod header_encoder;
pub mod huffman;
pub mod wrapper;

pub use header_encoder::HeaderEncoder;
pub use huffman::MessageType;
pub use wrapper::{Header, HpackDecoder, HpackEncoder};
