use httpcodec_rt::codec::frame::{flag, frame_type, FrameHeader};
use httpcodec_rt::codec::http1::Http1Codec;
use httpcodec_rt::codec::multiplexed::{MultiplexedCodec, CONNECTION_PREFACE};
use httpcodec_rt::codec::{Codec, CodecCallback, CodecProtocol, TransportDirection};
use httpcodec_rt::headers::HttpMessage;
use httpcodec_rt::hpack::wrapper::{Header, HpackEncoder};
use httpcodec_rt::stream_id::StreamId;

#[derive(Default)]
struct RecordingCallback {
    messages: Vec<(StreamId, HttpMessage)>,
    bodies: Vec<(StreamId, Vec<u8>)>,
    completions: Vec<StreamId>,
}

impl CodecCallback for RecordingCallback {
    fn on_headers_complete(&mut self, stream: StreamId, msg: HttpMessage) {
        self.messages.push((stream, msg));
    }
    fn on_body(&mut self, stream: StreamId, chunk: Vec<u8>) {
        self.bodies.push((stream, chunk));
    }
    fn on_message_complete(&mut self, stream: StreamId, _upgrade: bool) {
        self.completions.push(stream);
    }
}

// `RecordingCallback` lives behind a raw pointer captured by a thin relay so
// tests can inspect it after it's been moved into the codec as a `Box<dyn
// CodecCallback>` — the same problem `server::session::CallbackHandle`
// solves for the real runtime, solved here with `Rc<RefCell<_>>` since tests
// don't need `Send`.
struct Relay(std::rc::Rc<std::cell::RefCell<RecordingCallback>>);

impl CodecCallback for Relay {
    fn on_headers_complete(&mut self, stream: StreamId, msg: HttpMessage) {
        self.0.borrow_mut().on_headers_complete(stream, msg);
    }
    fn on_body(&mut self, stream: StreamId, chunk: Vec<u8>) {
        self.0.borrow_mut().on_body(stream, chunk);
    }
    fn on_message_complete(&mut self, stream: StreamId, upgrade: bool) {
        self.0.borrow_mut().on_message_complete(stream, upgrade);
    }
}

fn recording() -> (std::rc::Rc<std::cell::RefCell<RecordingCallback>>, Box<dyn CodecCallback>) {
    let rc = std::rc::Rc::new(std::cell::RefCell::new(RecordingCallback::default()));
    let relay = Relay(std::rc::Rc::clone(&rc));
    (rc, Box::new(relay))
}

#[test]
fn http1_parses_a_request_with_content_length() {
    let mut codec = Http1Codec::new(TransportDirection::Downstream);
    let (events, cb) = recording();
    codec.set_callback(cb);

    let wire = b"POST /submit HTTP/1.1\r\nHost: example.com\r\nContent-Length: 5\r\n\r\nhello";
    codec.on_ingress(wire).unwrap();

    let events = events.borrow();
    assert_eq!(events.messages.len(), 1);
    let (stream, msg) = &events.messages[0];
    assert_eq!(stream.0, 1);
    assert_eq!(msg.method.as_deref(), Some("POST"));
    assert_eq!(msg.url, "/submit");
    assert_eq!(events.bodies, vec![(*stream, b"hello".to_vec())]);
    assert_eq!(events.completions, vec![*stream]);
}

#[test]
fn http1_splits_a_request_across_several_ingress_calls() {
    let mut codec = Http1Codec::new(TransportDirection::Downstream);
    let (events, cb) = recording();
    codec.set_callback(cb);

    codec.on_ingress(b"GET /a HTTP/1.1\r\n").unwrap();
    assert!(events.borrow().messages.is_empty());
    codec.on_ingress(b"Host: x\r\n\r\n").unwrap();

    assert_eq!(events.borrow().messages.len(), 1);
    assert_eq!(events.borrow().completions.len(), 1);
}

#[test]
fn http1_generates_a_status_line_and_headers() {
    let mut codec = Http1Codec::new(TransportDirection::Upstream);
    let mut response = HttpMessage::response(200);
    response.headers.add("content-length", "2");
    let mut sink = Vec::new();
    codec.generate_header(&mut sink, StreamId(1), &response, None);
    codec.generate_body(&mut sink, StreamId(1), b"ok", true);

    let text = String::from_utf8(sink).unwrap();
    assert!(text.starts_with("HTTP/1.1 200\r\n"));
    assert!(text.contains("content-length: 2\r\n"));
    assert!(text.ends_with("ok"));
}

#[test]
fn http1_has_no_parallel_requests_or_flow_control() {
    let codec = Http1Codec::new(TransportDirection::Downstream);
    assert!(!codec.supports_parallel_requests());
    assert!(!codec.supports_push_transactions());
    assert!(!codec.supports_stream_flow_control());
    assert!(!codec.supports_session_flow_control());
    assert_eq!(codec.protocol(), CodecProtocol::Http1);
}

fn headers_frame(stream_id: u32, pairs: &[(&str, &str)], end_stream: bool) -> Vec<u8> {
    let mut encoder = HpackEncoder::new();
    let headers: Vec<Header> = pairs.iter().map(|(n, v)| Header::new(*n, *v)).collect();
    let block = encoder.encode(&headers);
    let mut out = Vec::new();
    let flags = flag::END_HEADERS | if end_stream { flag::END_STREAM } else { 0 };
    FrameHeader::write(&mut out, block.len() as u32, frame_type::HEADERS, flags, stream_id);
    out.extend_from_slice(&block);
    out
}

#[test]
fn multiplexed_rejects_frames_sent_before_the_connection_preface() {
    let mut codec = MultiplexedCodec::new(TransportDirection::Downstream);
    let (_, cb) = recording();
    codec.set_callback(cb);

    // A path long enough that the encoded frame exceeds the 24-byte preface
    // length, so the mismatch is actually detected rather than the frame
    // just sitting in the buffer waiting for more bytes.
    let frame = headers_frame(1, &[(":method", "GET"), (":path", "/a-path-long-enough-to-force-preface-mismatch-detection"), (":scheme", "https")], true);
    assert!(codec.on_ingress(&frame).is_err());
}

#[test]
fn multiplexed_accepts_frames_once_the_preface_is_seen() {
    let mut codec = MultiplexedCodec::new(TransportDirection::Downstream);
    let (events, cb) = recording();
    codec.set_callback(cb);

    let mut wire = CONNECTION_PREFACE.to_vec();
    wire.extend_from_slice(&headers_frame(1, &[(":method", "GET"), (":path", "/"), (":scheme", "https")], true));
    codec.on_ingress(&wire).unwrap();

    assert_eq!(events.borrow().messages.len(), 1);
}

#[test]
fn multiplexed_extracts_pseudo_headers_into_the_message() {
    let mut codec = MultiplexedCodec::new(TransportDirection::Downstream);
    let (events, cb) = recording();
    codec.set_callback(cb);

    codec.on_ingress(CONNECTION_PREFACE).unwrap();
    let frame = headers_frame(1, &[(":method", "GET"), (":path", "/widgets"), (":scheme", "https"), ("x-trace", "abc")], true);
    codec.on_ingress(&frame).unwrap();

    let events = events.borrow();
    let (stream, msg) = &events.messages[0];
    assert_eq!(stream.0, 1);
    assert_eq!(msg.method.as_deref(), Some("GET"));
    assert_eq!(msg.url, "/widgets");
    assert_eq!(msg.headers.get("x-trace"), Some("abc"));
    assert_eq!(events.completions, vec![*stream]);
}

#[test]
fn multiplexed_reassembles_headers_across_continuation_frames() {
    let mut codec = MultiplexedCodec::new(TransportDirection::Downstream);
    let (events, cb) = recording();
    codec.set_callback(cb);
    codec.on_ingress(CONNECTION_PREFACE).unwrap();

    let mut encoder = HpackEncoder::new();
    let headers = vec![Header::new(":method", "GET"), Header::new(":path", "/x"), Header::new(":scheme", "https")];
    let block = encoder.encode(&headers);
    let (first, second) = block.split_at(block.len() / 2);

    let mut wire = Vec::new();
    FrameHeader::write(&mut wire, first.len() as u32, frame_type::HEADERS, flag::END_STREAM, 1);
    wire.extend_from_slice(first);
    FrameHeader::write(&mut wire, second.len() as u32, frame_type::CONTINUATION, flag::END_HEADERS, 1);
    wire.extend_from_slice(second);

    codec.on_ingress(&wire).unwrap();

    let events = events.borrow();
    assert_eq!(events.messages.len(), 1);
    assert_eq!(events.messages[0].1.url, "/x");
}

#[test]
fn multiplexed_generate_header_then_decode_round_trips() {
    let mut codec = MultiplexedCodec::new(TransportDirection::Downstream);
    let mut response = HttpMessage::response(404);
    response.headers.add("x-reason", "missing");
    let mut sink = Vec::new();
    codec.generate_header(&mut sink, StreamId(1), &response, None);

    let header = FrameHeader::parse(&sink).unwrap();
    assert_eq!(header.frame_type, frame_type::HEADERS);
    assert!(header.is_end_headers());

    let mut decoder = httpcodec_rt::hpack::wrapper::HpackDecoder::new();
    let decoded = decoder.decode(&sink[FrameHeader::SIZE..]).unwrap();
    assert!(decoded.iter().any(|h| h.name == ":status" && h.value == "404"));
    assert!(decoded.iter().any(|h| h.name == "x-reason" && h.value == "missing"));
}

#[test]
fn multiplexed_supports_parallel_requests_and_flow_control() {
    let codec = MultiplexedCodec::new(TransportDirection::Downstream);
    assert!(codec.supports_parallel_requests());
    assert!(codec.supports_stream_flow_control());
    assert!(codec.supports_session_flow_control());
    assert_eq!(codec.protocol(), CodecProtocol::Multiplexed);
}

#[test]
fn multiplexed_create_stream_allocates_correct_parity() {
    let mut server = MultiplexedCodec::new(TransportDirection::Downstream);
    assert_eq!(server.create_stream().0 % 2, 0);
    let mut client = MultiplexedCodec::new(TransportDirection::Upstream);
    assert_eq!(client.create_stream().0 % 2, 1);
}

#[test]
fn multiplexed_responding_to_an_incoming_stream_does_not_count_as_an_outgoing_stream() {
    let mut codec = MultiplexedCodec::new(TransportDirection::Downstream);
    codec.on_ingress(CONNECTION_PREFACE).unwrap();
    let frame = headers_frame(1, &[(":method", "GET"), (":path", "/"), (":scheme", "https")], true);
    codec.on_ingress(&frame).unwrap();
    assert_eq!(codec.num_incoming_streams(), 1);
    assert_eq!(codec.num_outgoing_streams(), 0);

    let mut response = HttpMessage::response(200);
    let mut sink = Vec::new();
    codec.generate_header(&mut sink, StreamId(1), &response, None);
    assert_eq!(codec.num_outgoing_streams(), 0);

    response.status_code = Some(204);
    codec.generate_header(&mut sink, StreamId(1), &response, None);
    assert_eq!(codec.num_outgoing_streams(), 0);

    assert_eq!(codec.create_stream().0, 2);
    assert_eq!(codec.num_outgoing_streams(), 1);
}

#[test]
fn multiplexed_second_goaway_is_suppressed_until_double_drain_enabled() {
    let mut codec = MultiplexedCodec::new(TransportDirection::Downstream);
    let mut sink = Vec::new();
    let first = codec.generate_goaway(&mut sink, StreamId(3), httpcodec_rt::ErrorCode::NoError);
    assert!(first > 0);
    let second = codec.generate_goaway(&mut sink, StreamId(3), httpcodec_rt::ErrorCode::NoError);
    assert_eq!(second, 0);

    codec.enable_double_goaway_drain();
    let third = codec.generate_goaway(&mut sink, StreamId(1), httpcodec_rt::ErrorCode::NoError);
    assert!(third > 0);
}
