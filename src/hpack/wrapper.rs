//! Full HPACK encode/decode (indexing, dynamic table) for wire-compatible
//! codec use. Thin wrapper around `fluke-hpack`, carried over unchanged from
//! the teacher crate's `hpack.rs` — this is the general-purpose path;
//! [`crate::hpack::header_encoder::HeaderEncoder`] is the spec's
//! literal-without-indexing primitive.

/// A decoded header name/value pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Header {
    pub name: String,
    pub value: String,
}

impl Header {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

/// HPACK decoder maintaining per-connection dynamic table state.
pub struct HpackDecoder {
    inner: fluke_hpack::Decoder<'static>,
}

impl std::fmt::Debug for HpackDecoder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HpackDecoder").finish()
    }
}

impl Default for HpackDecoder {
    fn default() -> Self {
        Self::new()
    }
}

impl HpackDecoder {
    pub fn new() -> Self {
        Self {
            inner: fluke_hpack::Decoder::new(),
        }
    }

    pub fn decode(&mut self, data: &[u8]) -> Result<Vec<Header>, crate::error::CodecError> {
        let pairs = self
            .inner
            .decode(data)
            .map_err(|e| crate::error::CodecError::Compression(format!("{:?}", e)))?;
        Ok(pairs
            .into_iter()
            .map(|(name, value)| {
                Header::new(
                    String::from_utf8_lossy(&name).into_owned(),
                    String::from_utf8_lossy(&value).into_owned(),
                )
            })
            .collect())
    }

    /// Applies a SETTINGS_HEADER_TABLE_SIZE update from the peer (spec
    /// Open Question O2).
    pub fn set_max_table_size(&mut self, size: usize) {
        self.inner.set_max_table_size(size);
    }
}

/// HPACK encoder maintaining per-connection dynamic table state.
pub struct HpackEncoder {
    inner: fluke_hpack::Encoder<'static>,
}

impl std::fmt::Debug for HpackEncoder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HpackEncoder").finish()
    }
}

impl Default for HpackEncoder {
    fn default() -> Self {
        Self::new()
    }
}

impl HpackEncoder {
    pub fn new() -> Self {
        Self {
            inner: fluke_hpack::Encoder::new(),
        }
    }

    pub fn encode(&mut self, headers: &[Header]) -> Vec<u8> {
        let pairs: Vec<(&[u8], &[u8])> = headers.iter().map(|h| (h.name.as_bytes(), h.value.as_bytes())).collect();
        self.inner.encode(pairs)
    }
}
