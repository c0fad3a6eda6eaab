//! Filter chain (spec §4.3, C4): composable `Codec` decorators.
//!
//! Grounded on `proxygen/lib/http/codec/HTTPCodecFilter.h`'s
//! `GenericFilter`/`PassThroughHTTPCodecFilter` pair. Where proxygen uses an
//! intrusive doubly-linked list of raw pointers (a filter forwards calls to
//! the codec it wraps, and that codec's registered callback points back out
//! to the filter), this translates directly to Rust ownership: each filter
//! owns the `Codec` it wraps, so the chain is just nested `Box<dyn Codec>`
//! values. `set_callback` travels inward through that same nesting, so a
//! filter that wants to intercept callbacks overrides `set_callback` to
//! wrap the given callback before handing it to its inner codec.

use crate::codec::{Codec, CodecCallback, CodecProtocol, TransportDirection};
use crate::error::{CodecError, ErrorCode};
use crate::headers::{HttpHeaders, HttpMessage};
use crate::stream_id::StreamId;

/// A `Codec` decorator. Every method has a default that forwards unchanged
/// to `inner()`/`inner_mut()`, matching `PassThroughHTTPCodecFilter`'s
/// contract: "subclasses override only the methods of interest."
pub trait Filter: Codec {
    fn inner(&self) -> &dyn Codec;
    fn inner_mut(&mut self) -> &mut dyn Codec;

    /// Whether this filter overrides any downward (call) method. Purely
    /// descriptive — dispatch itself is ordinary method delegation.
    fn intercepts_calls(&self) -> bool {
        true
    }

    /// Whether this filter overrides any upward (callback) method, i.e.
    /// whether its `set_callback` wraps the callback instead of passing it
    /// straight through.
    fn intercepts_callbacks(&self) -> bool {
        true
    }
}

/// A `Filter` that changes nothing: every operation and every callback event
/// passes through to/from `inner` unchanged. Used both as a base to build
/// custom filters from (override only what you need) and, composed alone,
/// as the identity element a filter chain is supposed to reduce to when it
/// contains no real filters.
pub struct PassThroughFilter {
    inner: Box<dyn Codec>,
}

impl PassThroughFilter {
    pub fn new(inner: Box<dyn Codec>) -> Self {
        Self { inner }
    }
}

impl Filter for PassThroughFilter {
    fn inner(&self) -> &dyn Codec {
        self.inner.as_ref()
    }

    fn inner_mut(&mut self) -> &mut dyn Codec {
        self.inner.as_mut()
    }

    fn intercepts_calls(&self) -> bool {
        false
    }

    fn intercepts_callbacks(&self) -> bool {
        false
    }
}

impl Codec for PassThroughFilter {
    fn set_callback(&mut self, callback: Box<dyn CodecCallback>) {
        self.inner.set_callback(callback)
    }

    fn on_ingress(&mut self, bytes: &[u8]) -> Result<usize, CodecError> {
        self.inner.on_ingress(bytes)
    }

    fn on_ingress_eof(&mut self) {
        self.inner.on_ingress_eof()
    }

    fn set_parser_paused(&mut self, paused: bool) {
        self.inner.set_parser_paused(paused)
    }

    fn generate_header(&mut self, sink: &mut Vec<u8>, stream: StreamId, msg: &HttpMessage, assoc_stream: Option<StreamId>) -> usize {
        self.inner.generate_header(sink, stream, msg, assoc_stream)
    }

    fn generate_body(&mut self, sink: &mut Vec<u8>, stream: StreamId, data: &[u8], eom: bool) -> usize {
        self.inner.generate_body(sink, stream, data, eom)
    }

    fn generate_chunk_header(&mut self, sink: &mut Vec<u8>, stream: StreamId, length: usize) -> usize {
        self.inner.generate_chunk_header(sink, stream, length)
    }

    fn generate_chunk_terminator(&mut self, sink: &mut Vec<u8>, stream: StreamId) -> usize {
        self.inner.generate_chunk_terminator(sink, stream)
    }

    fn generate_trailers(&mut self, sink: &mut Vec<u8>, stream: StreamId, trailers: &HttpHeaders) -> usize {
        self.inner.generate_trailers(sink, stream, trailers)
    }

    fn generate_eom(&mut self, sink: &mut Vec<u8>, stream: StreamId) -> usize {
        self.inner.generate_eom(sink, stream)
    }

    fn generate_rst_stream(&mut self, sink: &mut Vec<u8>, stream: StreamId, code: ErrorCode) -> usize {
        self.inner.generate_rst_stream(sink, stream, code)
    }

    fn generate_goaway(&mut self, sink: &mut Vec<u8>, last_stream: StreamId, code: ErrorCode) -> usize {
        self.inner.generate_goaway(sink, last_stream, code)
    }

    fn generate_ping_request(&mut self, sink: &mut Vec<u8>) -> usize {
        self.inner.generate_ping_request(sink)
    }

    fn generate_ping_reply(&mut self, sink: &mut Vec<u8>, unique_id: u64) -> usize {
        self.inner.generate_ping_reply(sink, unique_id)
    }

    fn generate_settings(&mut self, sink: &mut Vec<u8>) -> usize {
        self.inner.generate_settings(sink)
    }

    fn generate_window_update(&mut self, sink: &mut Vec<u8>, stream: StreamId, delta: u32) -> usize {
        self.inner.generate_window_update(sink, stream, delta)
    }

    fn protocol(&self) -> CodecProtocol {
        self.inner.protocol()
    }

    fn direction(&self) -> TransportDirection {
        self.inner.direction()
    }

    fn supports_stream_flow_control(&self) -> bool {
        self.inner.supports_stream_flow_control()
    }

    fn supports_session_flow_control(&self) -> bool {
        self.inner.supports_session_flow_control()
    }

    fn supports_parallel_requests(&self) -> bool {
        self.inner.supports_parallel_requests()
    }

    fn supports_push_transactions(&self) -> bool {
        self.inner.supports_push_transactions()
    }

    fn is_busy(&self) -> bool {
        self.inner.is_busy()
    }

    fn is_reusable(&self) -> bool {
        self.inner.is_reusable()
    }

    fn is_waiting_to_drain(&self) -> bool {
        self.inner.is_waiting_to_drain()
    }

    fn close_on_egress_complete(&self) -> bool {
        self.inner.close_on_egress_complete()
    }

    fn num_incoming_streams(&self) -> u32 {
        self.inner.num_incoming_streams()
    }

    fn num_outgoing_streams(&self) -> u32 {
        self.inner.num_outgoing_streams()
    }

    fn last_incoming_stream_id(&self) -> StreamId {
        self.inner.last_incoming_stream_id()
    }

    fn create_stream(&mut self) -> StreamId {
        self.inner.create_stream()
    }

    fn enable_double_goaway_drain(&mut self) {
        self.inner.enable_double_goaway_drain()
    }
}

/// Builds a stack of filters wrapping a base codec, outermost-last. The
/// chain itself is just the outermost `Box<dyn Codec>` — callers talk to it
/// exactly as they would to the bare codec, seeing no distinction (spec
/// §4.3's composition rule).
pub struct FilterChain {
    head: Option<Box<dyn Codec>>,
}

impl FilterChain {
    pub fn new(base: Box<dyn Codec>) -> Self {
        Self { head: Some(base) }
    }

    /// Wraps the current head with a new filter, which becomes the new
    /// head. `wrap` receives ownership of the current head as the new
    /// filter's inner codec.
    pub fn add_filter<F>(&mut self, wrap: F)
    where
        F: FnOnce(Box<dyn Codec>) -> Box<dyn Codec>,
    {
        let inner = self.head.take().expect("FilterChain head is always present between calls");
        self.head = Some(wrap(inner));
    }

    fn head(&self) -> &dyn Codec {
        self.head.as_deref().expect("FilterChain head is always present between calls")
    }

    fn head_mut(&mut self) -> &mut dyn Codec {
        self.head.as_deref_mut().expect("FilterChain head is always present between calls")
    }

    /// Unwraps the chain back into its outermost `Codec`, e.g. to hand off
    /// to a `Session` that only knows about the `Codec` trait.
    pub fn into_codec(mut self) -> Box<dyn Codec> {
        self.head.take().expect("FilterChain head is always present between calls")
    }
}

impl Codec for FilterChain {
    fn set_callback(&mut self, callback: Box<dyn CodecCallback>) {
        self.head_mut().set_callback(callback)
    }

    fn on_ingress(&mut self, bytes: &[u8]) -> Result<usize, CodecError> {
        self.head_mut().on_ingress(bytes)
    }

    fn on_ingress_eof(&mut self) {
        self.head_mut().on_ingress_eof()
    }

    fn set_parser_paused(&mut self, paused: bool) {
        self.head_mut().set_parser_paused(paused)
    }

    fn generate_header(&mut self, sink: &mut Vec<u8>, stream: StreamId, msg: &HttpMessage, assoc_stream: Option<StreamId>) -> usize {
        self.head_mut().generate_header(sink, stream, msg, assoc_stream)
    }

    fn generate_body(&mut self, sink: &mut Vec<u8>, stream: StreamId, data: &[u8], eom: bool) -> usize {
        self.head_mut().generate_body(sink, stream, data, eom)
    }

    fn generate_chunk_header(&mut self, sink: &mut Vec<u8>, stream: StreamId, length: usize) -> usize {
        self.head_mut().generate_chunk_header(sink, stream, length)
    }

    fn generate_chunk_terminator(&mut self, sink: &mut Vec<u8>, stream: StreamId) -> usize {
        self.head_mut().generate_chunk_terminator(sink, stream)
    }

    fn generate_trailers(&mut self, sink: &mut Vec<u8>, stream: StreamId, trailers: &HttpHeaders) -> usize {
        self.head_mut().generate_trailers(sink, stream, trailers)
    }

    fn generate_eom(&mut self, sink: &mut Vec<u8>, stream: StreamId) -> usize {
        self.head_mut().generate_eom(sink, stream)
    }

    fn generate_rst_stream(&mut self, sink: &mut Vec<u8>, stream: StreamId, code: ErrorCode) -> usize {
        self.head_mut().generate_rst_stream(sink, stream, code)
    }

    fn generate_goaway(&mut self, sink: &mut Vec<u8>, last_stream: StreamId, code: ErrorCode) -> usize {
        self.head_mut().generate_goaway(sink, last_stream, code)
    }

    fn generate_ping_request(&mut self, sink: &mut Vec<u8>) -> usize {
        self.head_mut().generate_ping_request(sink)
    }

    fn generate_ping_reply(&mut self, sink: &mut Vec<u8>, unique_id: u64) -> usize {
        self.head_mut().generate_ping_reply(sink, unique_id)
    }

    fn generate_settings(&mut self, sink: &mut Vec<u8>) -> usize {
        self.head_mut().generate_settings(sink)
    }

    fn generate_window_update(&mut self, sink: &mut Vec<u8>, stream: StreamId, delta: u32) -> usize {
        self.head_mut().generate_window_update(sink, stream, delta)
    }

    fn protocol(&self) -> CodecProtocol {
        self.head().protocol()
    }

    fn direction(&self) -> TransportDirection {
        self.head().direction()
    }

    fn supports_stream_flow_control(&self) -> bool {
        self.head().supports_stream_flow_control()
    }

    fn supports_session_flow_control(&self) -> bool {
        self.head().supports_session_flow_control()
    }

    fn supports_parallel_requests(&self) -> bool {
        self.head().supports_parallel_requests()
    }

    fn supports_push_transactions(&self) -> bool {
        self.head().supports_push_transactions()
    }

    fn is_busy(&self) -> bool {
        self.head().is_busy()
    }

    fn is_reusable(&self) -> bool {
        self.head().is_reusable()
    }

    fn is_waiting_to_drain(&self) -> bool {
        self.head().is_waiting_to_drain()
    }

    fn close_on_egress_complete(&self) -> bool {
        self.head().close_on_egress_complete()
    }

    fn num_incoming_streams(&self) -> u32 {
        self.head().num_incoming_streams()
    }

    fn num_outgoing_streams(&self) -> u32 {
        self.head().num_outgoing_streams()
    }

    fn last_incoming_stream_id(&self) -> StreamId {
        self.head().last_incoming_stream_id()
    }

    fn create_stream(&mut self) -> StreamId {
        self.head_mut().create_stream()
    }

    fn enable_double_goaway_drain(&mut self) {
        self.head_mut().enable_double_goaway_drain()
    }
}
