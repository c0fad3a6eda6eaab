//! Multiplexed (HTTP/2-style) `Codec` (spec §4.2, C3).
//!
//! Frame parsing and CONTINUATION reassembly are generalized from the
//! teacher crate's `H2Codec`; header blocks are now real wire-format HPACK
//! via [`crate::hpack::wrapper`] rather than opaque bytes, so this codec can
//! produce and consume a full [`HttpMessage`] instead of leaving header
//! decoding to the caller.

use std::collections::HashMap;

use crate::codec::frame::{self, flag, frame_type, settings_id, FrameHeader, MAX_HEADER_BLOCK_SIZE};
use crate::codec::stream_state::StreamState;
use crate::codec::{Codec, CodecCallback, CodecProtocol, TransportDirection};
use crate::error::{CodecError, Direction, ErrorCode, HttpException};
use crate::headers::{HttpHeaders, HttpMessage, Settings};
use crate::hpack::wrapper::{Header, HpackDecoder, HpackEncoder};
use crate::stream_id::{StreamId, StreamIdAllocator};

/// The connection preface a client sends before any frames (RFC 7540 §3.5).
pub const CONNECTION_PREFACE: &[u8] = b"PRI * HTTP/2.0\r\n\r\nSM\r\n\r\n";

pub struct MultiplexedCodec {
    direction: TransportDirection,
    callback: Option<Box<dyn CodecCallback>>,

    ingress_buf: Vec<u8>,
    preface_seen: bool,
    parser_paused: bool,

    streams: HashMap<u32, StreamState>,
    pending_headers_stream: Option<u32>,
    pending_headers_end_stream: bool,
    pending_header_block: Vec<u8>,

    decoder: HpackDecoder,
    encoder: HpackEncoder,
    outgoing_ids: StreamIdAllocator,
    last_incoming_stream_id: u32,
    num_incoming: u32,
    num_outgoing: u32,

    goaway_sent: bool,
    double_goaway_drain: bool,
}

impl MultiplexedCodec {
    pub fn new(direction: TransportDirection) -> Self {
        let first_outgoing = match direction {
            TransportDirection::Downstream => 2,
            TransportDirection::Upstream => 1,
        };
        Self {
            direction,
            callback: None,
            ingress_buf: Vec::new(),
            // A downstream (server) codec expects to read the preface; an
            // upstream (client) codec never receives one.
            preface_seen: matches!(direction, TransportDirection::Upstream),
            parser_paused: false,
            streams: HashMap::new(),
            pending_headers_stream: None,
            pending_headers_end_stream: false,
            pending_header_block: Vec::new(),
            decoder: HpackDecoder::new(),
            encoder: HpackEncoder::new(),
            outgoing_ids: StreamIdAllocator::new(first_outgoing),
            last_incoming_stream_id: 0,
            num_incoming: 0,
            num_outgoing: 0,
            goaway_sent: false,
            double_goaway_drain: false,
        }
    }

    fn fire_error(&mut self, stream: StreamId, message: impl Into<String>, new_stream: bool) {
        let message = message.into();
        tracing::debug!(%stream, %message, "protocol error");
        let exc = HttpException::new(Direction::Ingress, ErrorCode::ProtocolError, message).with_stream(stream);
        if let Some(cb) = &mut self.callback {
            cb.on_error(stream, exc, new_stream);
        }
    }

    fn decode_headers(&mut self, block: &[u8]) -> Result<HttpMessage, CodecError> {
        let pairs = self.decoder.decode(block)?;
        Ok(message_from_header_pairs(self.direction, pairs))
    }

    fn dispatch_headers(&mut self, stream_id: u32, block: Vec<u8>, end_stream: bool) {
        let stream = StreamId::from(stream_id as u64);
        match self.decode_headers(&block) {
            Ok(msg) => {
                self.streams.entry(stream_id).or_default().mark_headers_complete();
                if let Some(cb) = &mut self.callback {
                    cb.on_message_begin(stream);
                    cb.on_headers_complete(stream, msg);
                }
                if end_stream {
                    self.streams.entry(stream_id).or_default().mark_ingress_complete();
                    if let Some(cb) = &mut self.callback {
                        cb.on_message_complete(stream, false);
                    }
                }
            }
            Err(e) => self.fire_error(stream, format!("header block decode failed: {e}"), true),
        }
    }

    fn parse_one(&mut self) -> Result<bool, CodecError> {
        if !self.preface_seen {
            if self.ingress_buf.len() < CONNECTION_PREFACE.len() {
                return Ok(false);
            }
            if &self.ingress_buf[..CONNECTION_PREFACE.len()] != CONNECTION_PREFACE {
                return Err(CodecError::MalformedFrame("missing connection preface".into()));
            }
            self.ingress_buf.drain(..CONNECTION_PREFACE.len());
            self.preface_seen = true;
        }

        if self.ingress_buf.len() < FrameHeader::SIZE {
            return Ok(false);
        }
        let header = FrameHeader::parse(&self.ingress_buf).ok_or_else(|| CodecError::MalformedFrame("short frame header".into()))?;
        if header.total_size() > self.ingress_buf.len() {
            return Ok(false);
        }

        let remainder = self.ingress_buf.split_off(header.total_size());
        let mut frame_bytes = std::mem::replace(&mut self.ingress_buf, remainder);
        let payload = frame_bytes.split_off(FrameHeader::SIZE.min(frame_bytes.len()));

        self.handle_frame(&header, payload)?;
        Ok(true)
    }

    fn handle_frame(&mut self, header: &FrameHeader, payload: Vec<u8>) -> Result<(), CodecError> {
        let stream = StreamId::from(header.stream_id as u64);
        match header.frame_type {
            frame_type::DATA => {
                let data = frame::strip_padding(header.flags, payload).map_err(CodecError::MalformedFrame)?;
                if header.is_end_stream() {
                    self.streams.entry(header.stream_id).or_default().mark_ingress_complete();
                }
                if let Some(cb) = &mut self.callback {
                    cb.on_body(stream, data);
                    if header.is_end_stream() {
                        cb.on_message_complete(stream, false);
                    }
                }
            }
            frame_type::HEADERS => {
                let block = frame::strip_headers_framing(header.flags, payload).map_err(CodecError::MalformedFrame)?;
                if header.stream_id > self.last_incoming_stream_id {
                    self.last_incoming_stream_id = header.stream_id;
                    self.num_incoming += 1;
                }
                if header.is_end_headers() {
                    self.dispatch_headers(header.stream_id, block, header.is_end_stream());
                } else {
                    if block.len() > MAX_HEADER_BLOCK_SIZE {
                        return Err(CodecError::HeaderBlockTooLarge { size: block.len(), max: MAX_HEADER_BLOCK_SIZE });
                    }
                    self.pending_headers_stream = Some(header.stream_id);
                    self.pending_headers_end_stream = header.is_end_stream();
                    self.pending_header_block = block;
                }
            }
            frame_type::CONTINUATION => match self.pending_headers_stream {
                Some(pending) if pending == header.stream_id => {
                    let new_size = self.pending_header_block.len() + payload.len();
                    if new_size > MAX_HEADER_BLOCK_SIZE {
                        self.pending_headers_stream = None;
                        self.pending_header_block.clear();
                        return Err(CodecError::HeaderBlockTooLarge { size: new_size, max: MAX_HEADER_BLOCK_SIZE });
                    }
                    self.pending_header_block.extend_from_slice(&payload);
                    if header.is_end_headers() {
                        let block = std::mem::take(&mut self.pending_header_block);
                        let end_stream = self.pending_headers_end_stream;
                        self.pending_headers_stream = None;
                        self.dispatch_headers(header.stream_id, block, end_stream);
                    }
                }
                _ => {
                    return Err(CodecError::IllegalState {
                        stream,
                        message: "unexpected CONTINUATION frame".into(),
                    });
                }
            },
            frame_type::RST_STREAM => {
                if payload.len() < 4 {
                    return Err(CodecError::MalformedFrame("short RST_STREAM payload".into()));
                }
                let code = ErrorCode::from_u32(u32::from_be_bytes([payload[0], payload[1], payload[2], payload[3]]));
                self.streams.remove(&header.stream_id);
                if let Some(cb) = &mut self.callback {
                    cb.on_abort(stream, code);
                }
            }
            frame_type::SETTINGS => {
                if header.is_ack() {
                    if let Some(cb) = &mut self.callback {
                        cb.on_settings_ack();
                    }
                } else {
                    let mut settings: Settings = Vec::new();
                    let mut pos = 0;
                    while pos + 6 <= payload.len() {
                        let id = u16::from_be_bytes([payload[pos], payload[pos + 1]]);
                        let value = u32::from_be_bytes([payload[pos + 2], payload[pos + 3], payload[pos + 4], payload[pos + 5]]);
                        if id == settings_id::HEADER_TABLE_SIZE {
                            self.decoder.set_max_table_size(value as usize);
                        }
                        settings.push((id, value));
                        pos += 6;
                    }
                    if let Some(cb) = &mut self.callback {
                        cb.on_settings(&settings);
                    }
                }
            }
            frame_type::GOAWAY => {
                if payload.len() < 8 {
                    return Err(CodecError::MalformedFrame("short GOAWAY payload".into()));
                }
                let last_stream_id = u32::from_be_bytes([payload[0], payload[1], payload[2], payload[3]]) & 0x7FFF_FFFF;
                let code = ErrorCode::from_u32(u32::from_be_bytes([payload[4], payload[5], payload[6], payload[7]]));
                if let Some(cb) = &mut self.callback {
                    cb.on_goaway(StreamId::from(last_stream_id as u64), code);
                }
            }
            frame_type::WINDOW_UPDATE => {
                if payload.len() < 4 {
                    return Err(CodecError::MalformedFrame("short WINDOW_UPDATE payload".into()));
                }
                let delta = u32::from_be_bytes([payload[0], payload[1], payload[2], payload[3]]) & 0x7FFF_FFFF;
                if let Some(cb) = &mut self.callback {
                    cb.on_window_update(stream, delta as i64);
                }
            }
            frame_type::PING => {
                if payload.len() < 8 {
                    return Err(CodecError::MalformedFrame("short PING payload".into()));
                }
                let mut data = [0u8; 8];
                data.copy_from_slice(&payload[..8]);
                let id = u64::from_be_bytes(data);
                if let Some(cb) = &mut self.callback {
                    if header.is_ack() {
                        cb.on_ping_reply(id);
                    } else {
                        cb.on_ping_request(id);
                    }
                }
            }
            frame_type::PRIORITY | frame_type::PUSH_PROMISE => {}
            _ => {}
        }
        Ok(())
    }
}

/// Splits pseudo-headers (`:method`, `:path`, `:status`, ...) out of a
/// decoded header block into an [`HttpMessage`]'s structured fields,
/// leaving ordinary headers in [`HttpHeaders`] (RFC 7540 §8.1.2.3).
fn message_from_header_pairs(direction: TransportDirection, pairs: Vec<Header>) -> HttpMessage {
    let is_request = matches!(direction, TransportDirection::Downstream);
    let mut msg = if is_request {
        HttpMessage::request(String::new(), String::new())
    } else {
        HttpMessage::response(0)
    };
    msg.version = (2, 0);
    let mut path = String::new();
    let mut authority = String::new();
    for Header { name, value } in pairs {
        match name.as_str() {
            ":method" => msg.method = Some(value),
            ":path" => path = value,
            ":authority" => authority = value,
            ":status" => msg.status_code = value.parse().ok(),
            ":scheme" => {}
            _ => msg.headers.add(name, value),
        }
    }
    if is_request {
        msg.url = if authority.is_empty() { path } else { format!("{authority}{path}") };
    }
    msg
}

impl Codec for MultiplexedCodec {
    fn set_callback(&mut self, callback: Box<dyn CodecCallback>) {
        self.callback = Some(callback);
    }

    fn on_ingress(&mut self, bytes: &[u8]) -> Result<usize, CodecError> {
        self.ingress_buf.extend_from_slice(bytes);
        if self.parser_paused {
            return Ok(bytes.len());
        }
        while self.parse_one()? {}
        Ok(bytes.len())
    }

    fn on_ingress_eof(&mut self) {}

    fn set_parser_paused(&mut self, paused: bool) {
        self.parser_paused = paused;
    }

    fn generate_header(&mut self, sink: &mut Vec<u8>, stream: StreamId, msg: &HttpMessage, _assoc_stream: Option<StreamId>) -> usize {
        let mut pairs = Vec::new();
        if msg.is_request() {
            pairs.push(Header::new(":method", msg.method.clone().unwrap_or_default()));
            pairs.push(Header::new(":path", msg.url.clone()));
            pairs.push(Header::new(":scheme", "https"));
        } else {
            pairs.push(Header::new(":status", msg.status_code.unwrap_or(200).to_string()));
        }
        for (name, value) in msg.headers.iter() {
            pairs.push(Header::new(name.clone(), value.clone()));
        }
        let block = self.encoder.encode(&pairs);
        let start = sink.len();
        FrameHeader::write(sink, block.len() as u32, frame_type::HEADERS, flag::END_HEADERS, stream.0 as u32);
        sink.extend_from_slice(&block);
        sink.len() - start
    }

    fn generate_body(&mut self, sink: &mut Vec<u8>, stream: StreamId, data: &[u8], eom: bool) -> usize {
        let start = sink.len();
        let flags = if eom { flag::END_STREAM } else { 0 };
        FrameHeader::write(sink, data.len() as u32, frame_type::DATA, flags, stream.0 as u32);
        sink.extend_from_slice(data);
        if eom {
            self.streams.entry(stream.0 as u32).or_default().mark_egress_complete();
        }
        sink.len() - start
    }

    fn generate_chunk_header(&mut self, _sink: &mut Vec<u8>, _stream: StreamId, _length: usize) -> usize {
        // Chunked transfer-encoding is an HTTP/1-only wire concept; the
        // multiplexed codec has no equivalent framing.
        0
    }

    fn generate_chunk_terminator(&mut self, _sink: &mut Vec<u8>, _stream: StreamId) -> usize {
        0
    }

    fn generate_trailers(&mut self, sink: &mut Vec<u8>, stream: StreamId, trailers: &HttpHeaders) -> usize {
        let pairs: Vec<Header> = trailers.iter().map(|(n, v)| Header::new(n.clone(), v.clone())).collect();
        let block = self.encoder.encode(&pairs);
        let start = sink.len();
        FrameHeader::write(sink, block.len() as u32, frame_type::HEADERS, flag::END_HEADERS, stream.0 as u32);
        sink.extend_from_slice(&block);
        sink.len() - start
    }

    fn generate_eom(&mut self, sink: &mut Vec<u8>, stream: StreamId) -> usize {
        let start = sink.len();
        FrameHeader::write(sink, 0, frame_type::DATA, flag::END_STREAM, stream.0 as u32);
        self.streams.entry(stream.0 as u32).or_default().mark_egress_complete();
        sink.len() - start
    }

    fn generate_rst_stream(&mut self, sink: &mut Vec<u8>, stream: StreamId, code: ErrorCode) -> usize {
        if self.streams.get(&(stream.0 as u32)).map(|s| s.rst_sent).unwrap_or(false) {
            return 0;
        }
        let start = sink.len();
        FrameHeader::write(sink, 4, frame_type::RST_STREAM, 0, stream.0 as u32);
        sink.extend_from_slice(&code.as_u32().to_be_bytes());
        self.streams.entry(stream.0 as u32).or_default().rst_sent = true;
        sink.len() - start
    }

    fn generate_goaway(&mut self, sink: &mut Vec<u8>, last_stream: StreamId, code: ErrorCode) -> usize {
        if self.goaway_sent && !self.double_goaway_drain {
            return 0;
        }
        let start = sink.len();
        FrameHeader::write(sink, 8, frame_type::GOAWAY, 0, 0);
        sink.extend_from_slice(&(last_stream.0 as u32).to_be_bytes());
        sink.extend_from_slice(&code.as_u32().to_be_bytes());
        self.goaway_sent = true;
        sink.len() - start
    }

    fn generate_ping_request(&mut self, sink: &mut Vec<u8>) -> usize {
        let start = sink.len();
        FrameHeader::write(sink, 8, frame_type::PING, 0, 0);
        sink.extend_from_slice(&[0u8; 8]);
        sink.len() - start
    }

    fn generate_ping_reply(&mut self, sink: &mut Vec<u8>, unique_id: u64) -> usize {
        let start = sink.len();
        FrameHeader::write(sink, 8, frame_type::PING, flag::ACK, 0);
        sink.extend_from_slice(&unique_id.to_be_bytes());
        sink.len() - start
    }

    fn generate_settings(&mut self, sink: &mut Vec<u8>) -> usize {
        let start = sink.len();
        FrameHeader::write(sink, 0, frame_type::SETTINGS, 0, 0);
        sink.len() - start
    }

    fn generate_window_update(&mut self, sink: &mut Vec<u8>, stream: StreamId, delta: u32) -> usize {
        let start = sink.len();
        FrameHeader::write(sink, 4, frame_type::WINDOW_UPDATE, 0, stream.0 as u32);
        sink.extend_from_slice(&(delta & 0x7FFF_FFFF).to_be_bytes());
        sink.len() - start
    }

    fn protocol(&self) -> CodecProtocol {
        CodecProtocol::Multiplexed
    }

    fn direction(&self) -> TransportDirection {
        self.direction
    }

    fn supports_stream_flow_control(&self) -> bool {
        true
    }

    fn supports_session_flow_control(&self) -> bool {
        true
    }

    fn supports_parallel_requests(&self) -> bool {
        true
    }

    fn supports_push_transactions(&self) -> bool {
        matches!(self.direction, TransportDirection::Downstream)
    }

    fn is_busy(&self) -> bool {
        self.streams.values().any(|s| !s.is_closed())
    }

    fn is_reusable(&self) -> bool {
        !self.goaway_sent
    }

    fn is_waiting_to_drain(&self) -> bool {
        self.goaway_sent && self.is_busy()
    }

    fn close_on_egress_complete(&self) -> bool {
        self.goaway_sent && !self.is_busy()
    }

    fn num_incoming_streams(&self) -> u32 {
        self.num_incoming
    }

    fn num_outgoing_streams(&self) -> u32 {
        self.num_outgoing
    }

    fn last_incoming_stream_id(&self) -> StreamId {
        StreamId::from(self.last_incoming_stream_id as u64)
    }

    fn create_stream(&mut self) -> StreamId {
        self.num_outgoing += 1;
        self.outgoing_ids.allocate()
    }

    fn enable_double_goaway_drain(&mut self) {
        self.double_goaway_drain = true;
        self.goaway_sent = false;
    }
}
