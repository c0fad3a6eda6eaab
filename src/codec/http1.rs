//! HTTP/1.x `Codec` (spec §4.2, C3): one stream at a time, no multiplexing.
//!
//! There is no teacher file for HTTP/1 parsing (the teacher only speaks
//! H2), so this is built directly from spec §4.2's capability matrix:
//! `supports_parallel_requests`/`supports_push_transactions`/
//! `supports_*_flow_control` are all `false`, and the codec tracks exactly
//! one in-flight stream, assigning it `StreamId(1)` the way proxygen's
//! HTTP1xCodec uses a single fixed transaction id per connection.

use std::fmt::Write as _;

use crate::codec::{Codec, CodecCallback, CodecProtocol, TransportDirection};
use crate::error::{CodecError, ErrorCode};
use crate::headers::{HttpHeaders, HttpMessage};
use crate::stream_id::StreamId;

/// The one stream id an HTTP/1 connection ever uses.
const SOLE_STREAM: StreamId = StreamId(1);

#[derive(Debug, PartialEq, Eq)]
enum ParseState {
    AwaitingHeaders,
    ReadingBody { remaining: usize },
    Done,
}

pub struct Http1Codec {
    direction: TransportDirection,
    callback: Option<Box<dyn CodecCallback>>,
    ingress_buf: Vec<u8>,
    parser_paused: bool,
    state: ParseState,
    num_messages: u32,
    egress_complete: bool,
}

impl Http1Codec {
    pub fn new(direction: TransportDirection) -> Self {
        Self {
            direction,
            callback: None,
            ingress_buf: Vec::new(),
            parser_paused: false,
            state: ParseState::AwaitingHeaders,
            num_messages: 0,
            egress_complete: false,
        }
    }

    fn parse_headers_block(&mut self) -> Result<bool, CodecError> {
        let boundary = self.ingress_buf.windows(4).position(|w| w == b"\r\n\r\n");
        let Some(pos) = boundary else { return Ok(false) };
        let head = self.ingress_buf[..pos].to_vec();
        let rest = self.ingress_buf.split_off(pos + 4);
        self.ingress_buf = rest;

        let text = String::from_utf8_lossy(&head);
        let mut lines = text.split("\r\n");
        let request_line = lines.next().unwrap_or_default();

        let mut msg = match self.direction {
            TransportDirection::Downstream => {
                let mut parts = request_line.split_whitespace();
                let method = parts.next().unwrap_or("GET").to_string();
                let url = parts.next().unwrap_or("/").to_string();
                HttpMessage::request(method, url)
            }
            TransportDirection::Upstream => {
                let mut parts = request_line.split_whitespace();
                let _version = parts.next();
                let status: u16 = parts.next().and_then(|s| s.parse().ok()).unwrap_or(200);
                HttpMessage::response(status)
            }
        };

        let mut content_length = 0usize;
        for line in lines {
            if let Some((name, value)) = line.split_once(':') {
                let name = name.trim();
                let value = value.trim();
                if name.eq_ignore_ascii_case("content-length") {
                    content_length = value.parse().unwrap_or(0);
                }
                msg.headers.add(name, value);
            }
        }

        self.num_messages += 1;
        if let Some(cb) = &mut self.callback {
            cb.on_message_begin(SOLE_STREAM);
            cb.on_headers_complete(SOLE_STREAM, msg);
        }

        if content_length == 0 {
            self.state = ParseState::Done;
            if let Some(cb) = &mut self.callback {
                cb.on_message_complete(SOLE_STREAM, false);
            }
        } else {
            self.state = ParseState::ReadingBody { remaining: content_length };
        }
        Ok(true)
    }

    fn parse_body(&mut self) -> bool {
        let ParseState::ReadingBody { remaining } = self.state else { return false };
        if self.ingress_buf.is_empty() {
            return false;
        }
        let take = remaining.min(self.ingress_buf.len());
        let chunk: Vec<u8> = self.ingress_buf.drain(..take).collect();
        let remaining = remaining - take;
        if let Some(cb) = &mut self.callback {
            cb.on_body(SOLE_STREAM, chunk);
        }
        if remaining == 0 {
            self.state = ParseState::Done;
            if let Some(cb) = &mut self.callback {
                cb.on_message_complete(SOLE_STREAM, false);
            }
        } else {
            self.state = ParseState::ReadingBody { remaining };
        }
        true
    }
}

impl Codec for Http1Codec {
    fn set_callback(&mut self, callback: Box<dyn CodecCallback>) {
        self.callback = Some(callback);
    }

    fn on_ingress(&mut self, bytes: &[u8]) -> Result<usize, CodecError> {
        self.ingress_buf.extend_from_slice(bytes);
        if self.parser_paused {
            return Ok(bytes.len());
        }
        loop {
            let progressed = match self.state {
                ParseState::AwaitingHeaders => self.parse_headers_block()?,
                ParseState::ReadingBody { .. } => self.parse_body(),
                ParseState::Done => false,
            };
            if !progressed {
                break;
            }
        }
        Ok(bytes.len())
    }

    fn on_ingress_eof(&mut self) {
        if let ParseState::ReadingBody { .. } = self.state {
            self.state = ParseState::Done;
            if let Some(cb) = &mut self.callback {
                cb.on_message_complete(SOLE_STREAM, false);
            }
        }
    }

    fn set_parser_paused(&mut self, paused: bool) {
        self.parser_paused = paused;
    }

    fn generate_header(&mut self, sink: &mut Vec<u8>, _stream: StreamId, msg: &HttpMessage, _assoc_stream: Option<StreamId>) -> usize {
        let start = sink.len();
        let mut head = String::new();
        if msg.is_request() {
            let _ = write!(head, "{} {} HTTP/1.1\r\n", msg.method.as_deref().unwrap_or("GET"), msg.url);
        } else {
            let _ = write!(head, "HTTP/1.1 {}\r\n", msg.status_code.unwrap_or(200));
        }
        for (name, value) in msg.headers.iter() {
            let _ = write!(head, "{name}: {value}\r\n");
        }
        head.push_str("\r\n");
        sink.extend_from_slice(head.as_bytes());
        sink.len() - start
    }

    fn generate_body(&mut self, sink: &mut Vec<u8>, _stream: StreamId, data: &[u8], eom: bool) -> usize {
        sink.extend_from_slice(data);
        if eom {
            self.egress_complete = true;
        }
        data.len()
    }

    fn generate_chunk_header(&mut self, sink: &mut Vec<u8>, _stream: StreamId, length: usize) -> usize {
        let text = format!("{length:X}\r\n");
        sink.extend_from_slice(text.as_bytes());
        text.len()
    }

    fn generate_chunk_terminator(&mut self, sink: &mut Vec<u8>, _stream: StreamId) -> usize {
        sink.extend_from_slice(b"\r\n");
        2
    }

    fn generate_trailers(&mut self, sink: &mut Vec<u8>, _stream: StreamId, trailers: &HttpHeaders) -> usize {
        let start = sink.len();
        let mut text = String::new();
        for (name, value) in trailers.iter() {
            let _ = write!(text, "{name}: {value}\r\n");
        }
        text.push_str("\r\n");
        sink.extend_from_slice(text.as_bytes());
        sink.len() - start
    }

    fn generate_eom(&mut self, sink: &mut Vec<u8>, _stream: StreamId) -> usize {
        self.egress_complete = true;
        sink.extend_from_slice(b"0\r\n\r\n");
        5
    }

    fn generate_rst_stream(&mut self, _sink: &mut Vec<u8>, _stream: StreamId, _code: ErrorCode) -> usize {
        // HTTP/1 has no mid-message reset; aborting a stream means closing
        // the connection, which is the session's job, not the codec's.
        0
    }

    fn generate_goaway(&mut self, _sink: &mut Vec<u8>, _last_stream: StreamId, _code: ErrorCode) -> usize {
        self.egress_complete = true;
        0
    }

    fn generate_ping_request(&mut self, _sink: &mut Vec<u8>) -> usize {
        0
    }

    fn generate_ping_reply(&mut self, _sink: &mut Vec<u8>, _unique_id: u64) -> usize {
        0
    }

    fn generate_settings(&mut self, _sink: &mut Vec<u8>) -> usize {
        0
    }

    fn generate_window_update(&mut self, _sink: &mut Vec<u8>, _stream: StreamId, _delta: u32) -> usize {
        0
    }

    fn protocol(&self) -> CodecProtocol {
        CodecProtocol::Http1
    }

    fn direction(&self) -> TransportDirection {
        self.direction
    }

    fn supports_stream_flow_control(&self) -> bool {
        false
    }

    fn supports_session_flow_control(&self) -> bool {
        false
    }

    fn supports_parallel_requests(&self) -> bool {
        false
    }

    fn supports_push_transactions(&self) -> bool {
        false
    }

    fn is_busy(&self) -> bool {
        self.state != ParseState::Done
    }

    fn is_reusable(&self) -> bool {
        true
    }

    fn is_waiting_to_drain(&self) -> bool {
        false
    }

    fn close_on_egress_complete(&self) -> bool {
        self.egress_complete
    }

    fn num_incoming_streams(&self) -> u32 {
        match self.direction {
            TransportDirection::Downstream => self.num_messages,
            TransportDirection::Upstream => 0,
        }
    }

    fn num_outgoing_streams(&self) -> u32 {
        match self.direction {
            TransportDirection::Upstream => self.num_messages,
            TransportDirection::Downstream => 0,
        }
    }

    fn last_incoming_stream_id(&self) -> StreamId {
        SOLE_STREAM
    }

    fn create_stream(&mut self) -> StreamId {
        SOLE_STREAM
    }

    fn enable_double_goaway_drain(&mut self) {}
}
