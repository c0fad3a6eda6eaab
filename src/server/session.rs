//! Session and Transaction (spec §5, C6): the per-connection and
//! per-stream objects a worker drives.
//!
//! A `Session` owns the `Codec` (wrapped in a `FilterChain`) for one
//! accepted connection and the `Transaction` for every stream currently
//! open on it. `Transaction` is deliberately a plain data holder rather
//! than something that reaches back into its `Session` — the worker drives
//! both sides explicitly, avoiding the self-referential-struct problem a
//! back-pointer would introduce.

use std::cell::RefCell;
use std::collections::HashMap;
use std::net::SocketAddr;
use std::rc::Rc;
use std::sync::Arc;

use crate::codec::{Codec, CodecCallback};
use crate::error::{ErrorCode, HttpException};
use crate::filter::FilterChain;
use crate::headers::{HttpHeaders, HttpMessage};
use crate::server::{HandlerFactory, RequestHandler};
use crate::stream_id::StreamId;
use crate::transport_info::TransportInfo;

/// One stream's worth of state: its handler and half-close flags.
pub struct Transaction {
    pub id: StreamId,
    pub handler: Box<dyn RequestHandler>,
    pub ingress_complete: bool,
    pub egress_complete: bool,
}

impl Transaction {
    pub fn new(id: StreamId, handler: Box<dyn RequestHandler>) -> Self {
        Self { id, handler, ingress_complete: false, egress_complete: false }
    }

    pub fn is_complete(&self) -> bool {
        self.ingress_complete && self.egress_complete
    }
}

/// One accepted connection: its codec, open transactions, and addressing
/// info. Lives entirely on the worker thread that accepted it (spec §5:
/// "a session never migrates between worker threads").
pub struct Session {
    pub peer_address: SocketAddr,
    pub local_address: SocketAddr,
    pub transport_info: TransportInfo,
    codec: FilterChain,
    callback: Rc<RefCell<SessionCallback>>,
    transactions: HashMap<StreamId, Transaction>,
    draining: bool,
}

impl Session {
    /// Builds a session around `codec`, wiring up a [`SessionCallback`] that
    /// stays reachable from the worker through the returned `Session` rather
    /// than through the opaque `Box<dyn CodecCallback>` the codec holds —
    /// see [`CallbackHandle`] for why that indirection is needed.
    pub fn new(
        mut codec: Box<dyn Codec>,
        peer_address: SocketAddr,
        local_address: SocketAddr,
        handler_factories: Arc<Vec<Arc<dyn HandlerFactory>>>,
    ) -> Self {
        let callback = Rc::new(RefCell::new(SessionCallback::new(handler_factories)));
        codec.set_callback(Box::new(CallbackHandle(Rc::clone(&callback))));
        Self {
            peer_address,
            local_address,
            transport_info: TransportInfo::invalid(),
            codec: FilterChain::new(codec),
            callback,
            transactions: HashMap::new(),
            draining: false,
        }
    }

    pub fn codec_mut(&mut self) -> &mut dyn Codec {
        &mut self.codec
    }

    /// Takes every event the codec has produced since the last drain,
    /// leaving the callback's queues empty.
    pub fn take_events(&self) -> DrainedEvents {
        let mut cb = self.callback.borrow_mut();
        DrainedEvents {
            handler_factories: Arc::clone(&cb.handler_factories),
            new_transactions: std::mem::take(&mut cb.new_transactions),
            bodies: std::mem::take(&mut cb.bodies),
            completions: std::mem::take(&mut cb.completions),
            errors: std::mem::take(&mut cb.errors),
            aborts: std::mem::take(&mut cb.aborts),
        }
    }

    pub fn is_busy(&self) -> bool {
        self.codec.is_busy() || !self.transactions.is_empty()
    }

    pub fn begin_drain(&mut self) {
        self.draining = true;
    }

    pub fn is_draining(&self) -> bool {
        self.draining
    }

    pub fn transaction(&self, id: StreamId) -> Option<&Transaction> {
        self.transactions.get(&id)
    }

    pub fn transaction_mut(&mut self, id: StreamId) -> Option<&mut Transaction> {
        self.transactions.get_mut(&id)
    }

    pub fn insert_transaction(&mut self, txn: Transaction) {
        self.transactions.insert(txn.id, txn);
    }

    pub fn remove_completed(&mut self) {
        self.transactions.retain(|_, txn| !txn.is_complete());
    }
}

/// Bridges `Codec` callback events into the `Session`'s transaction table,
/// constructing a fresh handler chain (via the owning `Acceptor`) on each
/// new stream. This is the piece proxygen splits across
/// `HTTPSession`/`HTTPTransaction`; kept as a single callback object here
/// since the worker drives everything single-threaded per session.
pub struct SessionCallback {
    pub handler_factories: Arc<Vec<Arc<dyn HandlerFactory>>>,
    pub new_transactions: Vec<(StreamId, HttpMessage)>,
    pub bodies: Vec<(StreamId, Vec<u8>)>,
    pub completions: Vec<StreamId>,
    pub errors: Vec<(StreamId, HttpException)>,
    pub aborts: Vec<(StreamId, ErrorCode)>,
}

impl SessionCallback {
    pub fn new(handler_factories: Arc<Vec<Arc<dyn HandlerFactory>>>) -> Self {
        Self {
            handler_factories,
            new_transactions: Vec::new(),
            bodies: Vec::new(),
            completions: Vec::new(),
            errors: Vec::new(),
            aborts: Vec::new(),
        }
    }
}

impl CodecCallback for SessionCallback {
    fn on_headers_complete(&mut self, stream: StreamId, msg: HttpMessage) {
        self.new_transactions.push((stream, msg));
    }

    fn on_body(&mut self, stream: StreamId, chunk: Vec<u8>) {
        self.bodies.push((stream, chunk));
    }

    fn on_message_complete(&mut self, stream: StreamId, _upgrade: bool) {
        self.completions.push(stream);
    }

    fn on_error(&mut self, stream: StreamId, error: HttpException, _new_stream: bool) {
        self.errors.push((stream, error));
    }

    fn on_abort(&mut self, stream: StreamId, code: ErrorCode) {
        self.aborts.push((stream, code));
    }

    fn on_trailers_complete(&mut self, _stream: StreamId, _trailers: HttpHeaders) {}
}

/// Everything a `SessionCallback` accumulated since the last
/// [`Session::take_events`] call, moved out so the worker can act on it
/// without holding the `RefCell` borrow open.
pub struct DrainedEvents {
    pub handler_factories: Arc<Vec<Arc<dyn HandlerFactory>>>,
    pub new_transactions: Vec<(StreamId, HttpMessage)>,
    pub bodies: Vec<(StreamId, Vec<u8>)>,
    pub completions: Vec<StreamId>,
    pub errors: Vec<(StreamId, HttpException)>,
    pub aborts: Vec<(StreamId, ErrorCode)>,
}

/// Forwards `Codec` callback events into a `SessionCallback` reachable from
/// outside the codec. `Codec::set_callback` takes ownership of a `Box<dyn
/// CodecCallback>`, so once a `SessionCallback` is boxed into a codec there
/// is no way back out — no downcasting path exists on the trait, and adding
/// one would mean every codec implementation carrying `dyn Any` machinery
/// it has no other use for. Sharing the callback via `Rc<RefCell<_>>`
/// instead, with this thin handle as the boxed value, keeps `Session` able
/// to read what the codec produced after each `on_ingress` call. `Rc`
/// rather than `Arc` is enough: a `Session` never leaves the worker thread
/// that accepted it.
struct CallbackHandle(Rc<RefCell<SessionCallback>>);

impl CodecCallback for CallbackHandle {
    fn on_message_begin(&mut self, stream: StreamId) {
        self.0.borrow_mut().on_message_begin(stream);
    }

    fn on_push_message_begin(&mut self, stream: StreamId, assoc_stream: StreamId) {
        self.0.borrow_mut().on_push_message_begin(stream, assoc_stream);
    }

    fn on_headers_complete(&mut self, stream: StreamId, msg: HttpMessage) {
        self.0.borrow_mut().on_headers_complete(stream, msg);
    }

    fn on_body(&mut self, stream: StreamId, chunk: Vec<u8>) {
        self.0.borrow_mut().on_body(stream, chunk);
    }

    fn on_chunk_header(&mut self, stream: StreamId, length: usize) {
        self.0.borrow_mut().on_chunk_header(stream, length);
    }

    fn on_chunk_complete(&mut self, stream: StreamId) {
        self.0.borrow_mut().on_chunk_complete(stream);
    }

    fn on_trailers_complete(&mut self, stream: StreamId, trailers: HttpHeaders) {
        self.0.borrow_mut().on_trailers_complete(stream, trailers);
    }

    fn on_message_complete(&mut self, stream: StreamId, upgrade: bool) {
        self.0.borrow_mut().on_message_complete(stream, upgrade);
    }

    fn on_error(&mut self, stream: StreamId, error: HttpException, new_stream: bool) {
        self.0.borrow_mut().on_error(stream, error, new_stream);
    }

    fn on_abort(&mut self, stream: StreamId, code: ErrorCode) {
        self.0.borrow_mut().on_abort(stream, code);
    }

    fn on_goaway(&mut self, last_good_stream: StreamId, code: ErrorCode) {
        self.0.borrow_mut().on_goaway(last_good_stream, code);
    }

    fn on_ping_request(&mut self, unique_id: u64) {
        self.0.borrow_mut().on_ping_request(unique_id);
    }

    fn on_ping_reply(&mut self, unique_id: u64) {
        self.0.borrow_mut().on_ping_reply(unique_id);
    }

    fn on_window_update(&mut self, stream: StreamId, delta: i64) {
        self.0.borrow_mut().on_window_update(stream, delta);
    }

    fn on_settings(&mut self, settings: &crate::headers::Settings) {
        self.0.borrow_mut().on_settings(settings);
    }

    fn on_settings_ack(&mut self) {
        self.0.borrow_mut().on_settings_ack();
    }
}
