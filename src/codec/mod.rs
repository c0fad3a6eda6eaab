//! Codec abstraction (spec §4.2, C3): a sans-I/O translator between wire
//! bytes and [`HttpMessage`](crate::headers::HttpMessage) events.
//!
//! A `Codec` never touches a socket. Ingress bytes are pushed in with
//! [`Codec::on_ingress`]; the codec parses as much as it can and invokes the
//! registered [`CodecCallback`] synchronously for each event produced along
//! the way. Egress is the mirror image: callers ask the codec to
//! `generate_*` a frame into a byte sink.

pub mod frame;
pub mod http1;
pub mod multiplexed;
pub mod stream_state;

pub use stream_state::{StreamPhase, StreamState};

use crate::error::{CodecError, ErrorCode, HttpException};
use crate::headers::{HttpHeaders, HttpMessage, Settings};
use crate::stream_id::StreamId;

/// Which wire protocol a `Codec` speaks. Mirrors proxygen's
/// `CodecProtocol` enum (HTTP/1.x vs the multiplexed HTTP/2-family).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CodecProtocol {
    Http1,
    Multiplexed,
}

/// Which side of the connection a `Codec` instance represents.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportDirection {
    Upstream,
    Downstream,
}

/// Sans-I/O HTTP codec. Every egress `generate_*` method appends bytes to
/// `sink` and returns the number of bytes written; `0` means nothing was
/// generated (e.g. the stream is already closed).
pub trait Codec {
    /// Registers (or replaces) the callback that receives parsed events.
    /// Idempotent — safe to call more than once, including before the first
    /// `on_ingress`.
    fn set_callback(&mut self, callback: Box<dyn CodecCallback>);

    /// Feeds ingress bytes to the parser. May invoke the registered callback
    /// synchronously, any number of times, before returning. Returns the
    /// number of bytes consumed — a sans-I/O codec should not assume it was
    /// handed a complete message and may be re-entered with more bytes.
    fn on_ingress(&mut self, bytes: &[u8]) -> Result<usize, CodecError>;

    /// Signals that no more ingress bytes will ever arrive (e.g. the peer
    /// closed their write side).
    fn on_ingress_eof(&mut self);

    /// Pauses or resumes ingress parsing, e.g. for backpressure.
    fn set_parser_paused(&mut self, paused: bool);

    fn generate_header(
        &mut self,
        sink: &mut Vec<u8>,
        stream: StreamId,
        msg: &HttpMessage,
        assoc_stream: Option<StreamId>,
    ) -> usize;
    fn generate_body(&mut self, sink: &mut Vec<u8>, stream: StreamId, data: &[u8], eom: bool) -> usize;
    fn generate_chunk_header(&mut self, sink: &mut Vec<u8>, stream: StreamId, length: usize) -> usize;
    fn generate_chunk_terminator(&mut self, sink: &mut Vec<u8>, stream: StreamId) -> usize;
    fn generate_trailers(&mut self, sink: &mut Vec<u8>, stream: StreamId, trailers: &HttpHeaders) -> usize;
    fn generate_eom(&mut self, sink: &mut Vec<u8>, stream: StreamId) -> usize;
    fn generate_rst_stream(&mut self, sink: &mut Vec<u8>, stream: StreamId, code: ErrorCode) -> usize;
    fn generate_goaway(&mut self, sink: &mut Vec<u8>, last_stream: StreamId, code: ErrorCode) -> usize;
    fn generate_ping_request(&mut self, sink: &mut Vec<u8>) -> usize;
    fn generate_ping_reply(&mut self, sink: &mut Vec<u8>, unique_id: u64) -> usize;
    fn generate_settings(&mut self, sink: &mut Vec<u8>) -> usize;
    fn generate_window_update(&mut self, sink: &mut Vec<u8>, stream: StreamId, delta: u32) -> usize;

    fn protocol(&self) -> CodecProtocol;
    fn direction(&self) -> TransportDirection;
    fn supports_stream_flow_control(&self) -> bool;
    fn supports_session_flow_control(&self) -> bool;
    fn supports_parallel_requests(&self) -> bool;
    fn supports_push_transactions(&self) -> bool;
    fn is_busy(&self) -> bool;
    fn is_reusable(&self) -> bool;
    fn is_waiting_to_drain(&self) -> bool;
    fn close_on_egress_complete(&self) -> bool;
    fn num_incoming_streams(&self) -> u32;
    fn num_outgoing_streams(&self) -> u32;
    fn last_incoming_stream_id(&self) -> StreamId;

    /// Allocates the next stream id this side of the connection may
    /// initiate (odd for clients, even for servers, per §4.2).
    fn create_stream(&mut self) -> StreamId;

    /// Allows a second GOAWAY to be sent after the first, to narrow the
    /// last-processed-stream id once in-flight streams finish draining
    /// (RFC 7540 §6.8 double-GOAWAY pattern).
    fn enable_double_goaway_drain(&mut self);
}

/// Receives events produced by a [`Codec`] while parsing ingress bytes.
/// Every method has a no-op default so implementors only need to override
/// the events they care about.
#[allow(unused_variables)]
pub trait CodecCallback {
    fn on_message_begin(&mut self, stream: StreamId) {}
    fn on_push_message_begin(&mut self, stream: StreamId, assoc_stream: StreamId) {}
    fn on_headers_complete(&mut self, stream: StreamId, msg: HttpMessage) {}
    fn on_body(&mut self, stream: StreamId, chunk: Vec<u8>) {}
    fn on_chunk_header(&mut self, stream: StreamId, length: usize) {}
    fn on_chunk_complete(&mut self, stream: StreamId) {}
    fn on_trailers_complete(&mut self, stream: StreamId, trailers: HttpHeaders) {}
    fn on_message_complete(&mut self, stream: StreamId, upgrade: bool) {}
    fn on_error(&mut self, stream: StreamId, error: HttpException, new_stream: bool) {}
    fn on_abort(&mut self, stream: StreamId, code: ErrorCode) {}
    fn on_goaway(&mut self, last_good_stream: StreamId, code: ErrorCode) {}
    fn on_ping_request(&mut self, unique_id: u64) {}
    fn on_ping_reply(&mut self, unique_id: u64) {}
    fn on_window_update(&mut self, stream: StreamId, delta: i64) {}
    fn on_settings(&mut self, settings: &Settings) {}
    fn on_settings_ack(&mut self) {}
}
