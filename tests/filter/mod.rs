use std::cell::RefCell;
use std::rc::Rc;

use httpcodec_rt::codec::http1::Http1Codec;
use httpcodec_rt::codec::{Codec, CodecCallback, CodecProtocol, TransportDirection};
use httpcodec_rt::filter::{Filter, FilterChain, PassThroughFilter};
use httpcodec_rt::headers::{HttpHeaders, HttpMessage};
use httpcodec_rt::stream_id::StreamId;
use httpcodec_rt::ErrorCode;

#[derive(Default)]
struct Recorder {
    messages: Vec<(StreamId, HttpMessage)>,
}

impl CodecCallback for Recorder {
    fn on_headers_complete(&mut self, stream: StreamId, msg: HttpMessage) {
        self.messages.push((stream, msg));
    }
}

/// Wraps a callback to tag every header-complete event, so tests can tell
/// whether a filter's `set_callback` override actually ran rather than
/// passing the callback straight through.
struct TaggingCallback {
    inner: Box<dyn CodecCallback>,
    tag_count: Rc<RefCell<u32>>,
}

impl CodecCallback for TaggingCallback {
    fn on_headers_complete(&mut self, stream: StreamId, msg: HttpMessage) {
        *self.tag_count.borrow_mut() += 1;
        self.inner.on_headers_complete(stream, msg);
    }
}

/// A filter whose `set_callback` wraps the given callback in a
/// `TaggingCallback` before forwarding it inward, and whose
/// `generate_header` counts how many times it was called — covering both
/// the downward (call) and upward (callback) interception paths a real
/// filter exercises.
struct TaggingFilter {
    inner: Box<dyn Codec>,
    tag_count: Rc<RefCell<u32>>,
    header_calls: Rc<RefCell<u32>>,
}

impl Filter for TaggingFilter {
    fn inner(&self) -> &dyn Codec {
        self.inner.as_ref()
    }
    fn inner_mut(&mut self) -> &mut dyn Codec {
        self.inner.as_mut()
    }
}

impl Codec for TaggingFilter {
    fn set_callback(&mut self, callback: Box<dyn CodecCallback>) {
        self.inner.set_callback(Box::new(TaggingCallback {
            inner: callback,
            tag_count: Rc::clone(&self.tag_count),
        }));
    }
    fn on_ingress(&mut self, bytes: &[u8]) -> Result<usize, httpcodec_rt::CodecError> {
        self.inner.on_ingress(bytes)
    }
    fn on_ingress_eof(&mut self) {
        self.inner.on_ingress_eof()
    }
    fn set_parser_paused(&mut self, paused: bool) {
        self.inner.set_parser_paused(paused)
    }
    fn generate_header(&mut self, sink: &mut Vec<u8>, stream: StreamId, msg: &HttpMessage, assoc_stream: Option<StreamId>) -> usize {
        *self.header_calls.borrow_mut() += 1;
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

fn recorder() -> (Rc<RefCell<Recorder>>, Box<dyn CodecCallback>) {
    struct Relay(Rc<RefCell<Recorder>>);
    impl CodecCallback for Relay {
        fn on_headers_complete(&mut self, stream: StreamId, msg: HttpMessage) {
            self.0.borrow_mut().on_headers_complete(stream, msg);
        }
    }
    let rc = Rc::new(RefCell::new(Recorder::default()));
    (Rc::clone(&rc), Box::new(Relay(rc)))
}

#[test]
fn passthrough_chain_behaves_identically_to_bare_codec() {
    let mut bare = Http1Codec::new(TransportDirection::Downstream);
    let (bare_events, bare_cb) = recorder();
    bare.set_callback(bare_cb);

    let mut chain = FilterChain::new(Box::new(Http1Codec::new(TransportDirection::Downstream)));
    chain.add_filter(|inner| Box::new(PassThroughFilter::new(inner)));
    let (chain_events, chain_cb) = recorder();
    chain.set_callback(chain_cb);

    let wire = b"GET /ok HTTP/1.1\r\nHost: x\r\n\r\n";
    bare.on_ingress(wire).unwrap();
    chain.on_ingress(wire).unwrap();

    assert_eq!(bare_events.borrow().messages.len(), chain_events.borrow().messages.len());
    assert_eq!(chain_events.borrow().messages[0].1.url, "/ok");
    assert_eq!(chain.protocol(), bare.protocol());
    assert_eq!(chain.supports_parallel_requests(), bare.supports_parallel_requests());
}

#[test]
fn passthrough_filter_reports_that_it_intercepts_nothing() {
    let filter = PassThroughFilter::new(Box::new(Http1Codec::new(TransportDirection::Downstream)));
    assert!(!filter.intercepts_calls());
    assert!(!filter.intercepts_callbacks());
}

#[test]
fn add_filter_wraps_the_current_head_and_forwards_generate_calls() {
    let mut chain = FilterChain::new(Box::new(Http1Codec::new(TransportDirection::Upstream)));
    let header_calls = Rc::new(RefCell::new(0));
    let tag_count = Rc::new(RefCell::new(0));
    chain.add_filter(|inner| {
        Box::new(TaggingFilter {
            inner,
            tag_count: Rc::clone(&tag_count),
            header_calls: Rc::clone(&header_calls),
        })
    });

    let response = HttpMessage::response(200);
    let mut sink = Vec::new();
    chain.generate_header(&mut sink, StreamId(1), &response, None);

    assert_eq!(*header_calls.borrow(), 1);
    assert!(!sink.is_empty());
}

#[test]
fn set_callback_interception_runs_before_the_wrapped_callback() {
    let mut chain = FilterChain::new(Box::new(Http1Codec::new(TransportDirection::Downstream)));
    let header_calls = Rc::new(RefCell::new(0));
    let tag_count = Rc::new(RefCell::new(0));
    chain.add_filter(|inner| {
        Box::new(TaggingFilter {
            inner,
            tag_count: Rc::clone(&tag_count),
            header_calls: Rc::clone(&header_calls),
        })
    });

    let (events, cb) = recorder();
    chain.set_callback(cb);
    chain.on_ingress(b"GET / HTTP/1.1\r\nHost: x\r\n\r\n").unwrap();

    assert_eq!(*tag_count.borrow(), 1);
    assert_eq!(events.borrow().messages.len(), 1);
}

#[test]
fn stacking_two_filters_composes_outermost_last() {
    let mut chain = FilterChain::new(Box::new(Http1Codec::new(TransportDirection::Upstream)));
    let inner_calls = Rc::new(RefCell::new(0));
    let outer_calls = Rc::new(RefCell::new(0));
    let unused_tags = Rc::new(RefCell::new(0));
    chain.add_filter(|inner| {
        Box::new(TaggingFilter {
            inner,
            tag_count: Rc::clone(&unused_tags),
            header_calls: Rc::clone(&inner_calls),
        })
    });
    chain.add_filter(|inner| {
        Box::new(TaggingFilter {
            inner,
            tag_count: Rc::clone(&unused_tags),
            header_calls: Rc::clone(&outer_calls),
        })
    });

    let response = HttpMessage::response(204);
    let mut sink = Vec::new();
    chain.generate_header(&mut sink, StreamId(1), &response, None);

    assert_eq!(*inner_calls.borrow(), 1);
    assert_eq!(*outer_calls.borrow(), 1);
}

#[test]
fn into_codec_unwraps_the_outermost_filter() {
    let mut chain = FilterChain::new(Box::new(Http1Codec::new(TransportDirection::Downstream)));
    chain.add_filter(|inner| Box::new(PassThroughFilter::new(inner)));
    let codec = chain.into_codec();
    assert_eq!(codec.protocol(), CodecProtocol::Http1);
}
