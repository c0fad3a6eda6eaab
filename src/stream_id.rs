//! Stream identifiers (spec §3: StreamID).

/// An unsigned 64-bit identifier scoped to a [`crate::server::Session`].
///
/// Client-initiated and server-initiated IDs occupy disjoint parity classes
/// (odd/even), mirroring RFC 7540 §5.1.1. `StreamId(0)` is reserved for
/// session-level (non-stream) events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct StreamId(pub u64);

impl StreamId {
    /// The reserved session-level pseudo-stream.
    pub const SESSION: StreamId = StreamId(0);

    pub fn is_session(self) -> bool {
        self.0 == 0
    }

    /// Client-initiated stream IDs are odd (RFC 7540 §5.1.1).
    pub fn is_client_initiated(self) -> bool {
        self.0 != 0 && self.0 % 2 == 1
    }

    /// Server-initiated (pushed) stream IDs are even.
    pub fn is_server_initiated(self) -> bool {
        self.0 != 0 && self.0 % 2 == 0
    }
}

impl From<u64> for StreamId {
    fn from(v: u64) -> Self {
        StreamId(v)
    }
}

impl std::fmt::Display for StreamId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Allocates monotonically increasing stream IDs of a fixed parity.
///
/// HTTP/1 codecs use a degenerate allocator that always returns the same
/// (single) stream; multiplexed codecs allocate the next ID of their parity.
#[derive(Debug, Clone, Copy)]
pub struct StreamIdAllocator {
    next: u64,
    step: u64,
}

impl StreamIdAllocator {
    /// `first` is the first ID this side will allocate (1 for client-initiated
    /// streams, 2 for server-initiated/pushed streams).
    pub fn new(first: u64) -> Self {
        Self { next: first, step: 2 }
    }

    pub fn allocate(&mut self) -> StreamId {
        let id = StreamId(self.next);
        self.next += self.step;
        id
    }

    pub fn peek_next(&self) -> StreamId {
        StreamId(self.next)
    }
}
