//! Error kinds (spec §3: ErrorCode, HTTPException; spec §7: error handling design).

use crate::stream_id::StreamId;
use std::fmt;

/// Protocol error codes shared by GOAWAY/RST_STREAM frames and `on_error`
/// callbacks. Numeric values follow RFC 7540 §7 so a multiplexed codec can
/// write them directly onto the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum ErrorCode {
    NoError,
    ProtocolError,
    InternalError,
    FlowControlError,
    SettingsTimeout,
    StreamClosed,
    FrameSizeError,
    RefusedStream,
    Cancel,
    CompressionError,
    ConnectError,
    EnhanceYourCalm,
    InadequateSecurity,
    Http11Required,
}

impl ErrorCode {
    pub fn as_u32(self) -> u32 {
        match self {
            ErrorCode::NoError => 0x0,
            ErrorCode::ProtocolError => 0x1,
            ErrorCode::InternalError => 0x2,
            ErrorCode::FlowControlError => 0x3,
            ErrorCode::SettingsTimeout => 0x4,
            ErrorCode::StreamClosed => 0x5,
            ErrorCode::FrameSizeError => 0x6,
            ErrorCode::RefusedStream => 0x7,
            ErrorCode::Cancel => 0x8,
            ErrorCode::CompressionError => 0x9,
            ErrorCode::ConnectError => 0xa,
            ErrorCode::EnhanceYourCalm => 0xb,
            ErrorCode::InadequateSecurity => 0xc,
            ErrorCode::Http11Required => 0xd,
        }
    }

    pub fn from_u32(v: u32) -> ErrorCode {
        match v {
            0x0 => ErrorCode::NoError,
            0x1 => ErrorCode::ProtocolError,
            0x2 => ErrorCode::InternalError,
            0x3 => ErrorCode::FlowControlError,
            0x4 => ErrorCode::SettingsTimeout,
            0x5 => ErrorCode::StreamClosed,
            0x6 => ErrorCode::FrameSizeError,
            0x7 => ErrorCode::RefusedStream,
            0x8 => ErrorCode::Cancel,
            0x9 => ErrorCode::CompressionError,
            0xa => ErrorCode::ConnectError,
            0xb => ErrorCode::EnhanceYourCalm,
            0xc => ErrorCode::InadequateSecurity,
            0xd => ErrorCode::Http11Required,
            _ => ErrorCode::ProtocolError,
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}

/// Which direction an [`HTTPException`] was observed on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Ingress,
    Egress,
}

/// Carries a protocol error across the `Codec` callback boundary (spec §3,
/// §7). Codecs never throw/panic across this boundary; they translate
/// failures into one of these and deliver it via `on_error`.
#[derive(Debug, Clone, thiserror::Error)]
#[error("{direction:?} error on stream {stream:?}: {code}: {message}")]
pub struct HttpException {
    pub direction: Direction,
    pub code: ErrorCode,
    pub message: String,
    pub stream: Option<StreamId>,
}

impl HttpException {
    pub fn new(direction: Direction, code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            direction,
            code,
            message: message.into(),
            stream: None,
        }
    }

    pub fn with_stream(mut self, stream: StreamId) -> Self {
        self.stream = Some(stream);
        self
    }
}

/// Errors a `Codec` implementation can produce while parsing ingress bytes.
/// These never escape `on_ingress` as panics; the caller is expected to
/// translate them into an `HttpException` delivered via the callback, which
/// is what [`crate::codec::Codec::on_ingress`]'s default plumbing does.
#[derive(Debug, Clone, thiserror::Error)]
pub enum CodecError {
    #[error("malformed frame: {0}")]
    MalformedFrame(String),
    #[error("illegal state transition on stream {stream:?}: {message}")]
    IllegalState { stream: StreamId, message: String },
    #[error("header compression failure: {0}")]
    Compression(String),
    #[error("header block too large ({size} bytes, max {max})")]
    HeaderBlockTooLarge { size: usize, max: usize },
    #[error("session-fatal framing desync: {0}")]
    SessionFatal(String),
}

/// Errors surfaced by [`crate::server::Acceptor::bind`] / `start` (spec §7
/// kind 4: configuration errors).
#[derive(Debug, thiserror::Error)]
pub enum AcceptorError {
    #[error("failed to bind {addr}: {source}")]
    Bind {
        addr: std::net::SocketAddr,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to register listener with event loop: {0}")]
    Registration(#[source] std::io::Error),
    #[error("worker thread {index} failed to start: {message}")]
    WorkerStartup { index: usize, message: String },
}

/// Fatal [`crate::encode_buffer::EncodeBuffer`] allocation failure (spec
/// §4.1: "allocation failure is fatal to the encode").
#[derive(Debug, thiserror::Error)]
#[error("encode buffer allocation failed: {0}")]
pub struct EncodeError(pub String);
