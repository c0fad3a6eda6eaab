//! HTTP/1.x and SPDY-style multiplexed codec, HPACK-style header encoder,
//! and the acceptor/session runtime that drives them.
//!
//! The crate is organized around a sans-I/O [`codec::Codec`] trait: parsing
//! and frame generation never touch a socket directly, which is what makes
//! [`filter::FilterChain`] composition and the [`server`] module's
//! synchronous handler-driven dispatch possible without threading I/O
//! through every layer.

pub mod codec;
pub mod encode_buffer;
pub mod error;
pub mod filter;
pub mod headers;
pub mod hpack;
pub mod server;
pub mod stream_id;
pub mod transport_info;

pub use codec::{Codec, CodecCallback, CodecProtocol, TransportDirection};
pub use error::{AcceptorError, CodecError, ErrorCode, HttpException};
pub use filter::{Filter, FilterChain, PassThroughFilter};
pub use headers::{HttpHeaders, HttpMessage, Settings};
pub use stream_id::{StreamId, StreamIdAllocator};
