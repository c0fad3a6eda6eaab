//! Acceptor/Session/Transaction server plumbing (spec §5, C6).
//!
//! Grounded on `proxygen/httpserver/HTTPServerAcceptor.cpp` (the
//! `make`/`makeConfig`/`newHandler`/`onConnectionsDrained` lifecycle, the
//! reversed handler-factory list) and
//! `proxygen/httpserver/tests/HTTPServerTest.cpp` (atomic multi-bind, the
//! `ServerThread`-style ready/error callback start protocol). The event
//! loop itself (C7, non-goal in the distilled spec but required ambient
//! plumbing to have something runnable) is `mio`, one poller per worker
//! thread, grounded on `SleepingPills-bushhammer`'s
//! `neutronium::net::Endpoint`.

pub mod session;
pub mod worker;

pub use session::{Session, Transaction};

use std::collections::HashMap;
use std::net::{SocketAddr, TcpListener};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::JoinHandle;
use std::time::Duration;

use crate::codec::{http1::Http1Codec, multiplexed::MultiplexedCodec, Codec, TransportDirection};
use crate::error::AcceptorError;
use crate::headers::HttpMessage;

/// A handler's complete response to one request: the headers-phase message
/// plus the body to send with it. Handlers are synchronous request/response
/// here (spec §5's minimal ambient handler contract), unlike proxygen's
/// `HTTPTransactionHandler`, which can interleave `sendHeaders`/`sendBody`
/// calls across several callback invocations.
#[derive(Debug, Clone)]
pub struct HttpResponse {
    pub message: HttpMessage,
    pub body: Vec<u8>,
}

impl HttpResponse {
    /// Builds a response with a `Content-Length` header set from `body`'s
    /// length — the codec's `generate_body(..., eom: true)` call alone then
    /// fully terminates the message, with no separate `generate_eom` needed
    /// (that method exists for the chunked-transfer path instead).
    pub fn new(status_code: u16, body: impl Into<Vec<u8>>) -> Self {
        let body = body.into();
        let mut message = HttpMessage::response(status_code);
        message.headers.set("content-length", body.len().to_string());
        Self { message, body }
    }
}

/// Which wire protocol an [`IpConfig`] listener speaks before any codec
/// upgrade negotiation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Protocol {
    Http,
    Spdy,
}

impl Protocol {
    /// The plaintext-upgrade protocol label this listener advertises,
    /// mirroring `HTTPServerAcceptor::makeConfig`'s `"spdy/3.1"` literal
    /// (Open Question O1: label-to-codec-factory resolution).
    fn plaintext_label(self) -> Option<&'static str> {
        match self {
            Protocol::Http => None,
            Protocol::Spdy => Some("spdy/3.1"),
        }
    }
}

/// One address this server should listen on, and the protocol it speaks.
#[derive(Debug, Clone)]
pub struct IpConfig {
    pub address: SocketAddr,
    pub protocol: Protocol,
    pub ssl_configs: Vec<SslContextConfig>,
}

impl IpConfig {
    pub fn new(address: SocketAddr, protocol: Protocol) -> Self {
        Self { address, protocol, ssl_configs: Vec::new() }
    }

    pub fn spdy(address: SocketAddr) -> Self {
        Self::new(address, Protocol::Spdy)
    }
}

/// Placeholder TLS identity for a listener. Certificate loading and the TLS
/// handshake itself are out of scope (spec Non-goals) — this only carries
/// enough to round-trip through `AcceptorConfiguration`.
#[derive(Debug, Clone)]
pub struct SslContextConfig {
    pub cert_path: String,
    pub key_path: String,
}

/// Per-listener configuration derived from an [`IpConfig`] and the server's
/// [`HTTPServerOptions`] — mirrors `HTTPServerAcceptor::makeConfig`.
#[derive(Debug, Clone)]
pub struct AcceptorConfiguration {
    pub bind_address: SocketAddr,
    pub connection_idle_timeout: Duration,
    pub transaction_idle_timeout: Duration,
    pub plaintext_protocol: Option<String>,
    pub ssl_context_configs: Vec<SslContextConfig>,
}

impl AcceptorConfiguration {
    pub fn make(ip_config: &IpConfig, opts: &HTTPServerOptions) -> Self {
        Self {
            bind_address: ip_config.address,
            connection_idle_timeout: opts.idle_timeout,
            transaction_idle_timeout: opts.idle_timeout,
            plaintext_protocol: ip_config.protocol.plaintext_label().map(str::to_string),
            ssl_context_configs: ip_config.ssl_configs.clone(),
        }
    }
}

/// Builds a fresh [`Codec`] for a newly accepted connection, given the
/// negotiated plaintext protocol label (`None` for the default HTTP/1
/// fallback).
pub type CodecFactory = Arc<dyn Fn(TransportDirection) -> Box<dyn Codec> + Send + Sync>;

/// Handles one parsed request, optionally wrapping another handler beneath
/// it (spec §5: filter-style request handler chain).
pub trait RequestHandler: Send {
    fn on_request(&mut self, msg: &HttpMessage) {
        let _ = msg;
    }
    fn on_body(&mut self, chunk: &[u8]) {
        let _ = chunk;
    }
    /// The stream's request body is fully received. Returns the response to
    /// send back, if this handler owns producing one.
    fn on_eom(&mut self) -> Option<HttpResponse> {
        None
    }
    fn on_error(&mut self, message: &str) {
        let _ = message;
    }
}

/// Constructs a [`RequestHandler`] for an incoming request, optionally
/// wrapping the handler produced by the next factory in the chain. Factories
/// are invoked outermost-first against a chain built innermost-first (spec
/// §5, grounded on `HTTPServerAcceptor::newHandler`'s `factory->onRequest(h,
/// msg)` loop over a reversed factory list).
pub trait HandlerFactory: Send + Sync {
    fn on_request(&self, next: Option<Box<dyn RequestHandler>>, msg: &HttpMessage) -> Box<dyn RequestHandler>;
}

/// Server-wide configuration: thread count, idle timeouts, the handler
/// factory chain, and the plaintext-protocol-label → codec factory table
/// (Open Question O1).
pub struct HTTPServerOptions {
    pub threads: usize,
    pub idle_timeout: Duration,
    pub handler_factories: Vec<Arc<dyn HandlerFactory>>,
    pub codec_factories: HashMap<String, CodecFactory>,
}

impl Default for HTTPServerOptions {
    fn default() -> Self {
        Self {
            threads: 1,
            idle_timeout: Duration::from_secs(60),
            handler_factories: Vec::new(),
            codec_factories: HashMap::new(),
        }
    }
}

impl HTTPServerOptions {
    /// Resolves a negotiated plaintext-protocol label to a codec factory,
    /// falling back to HTTP/1 when the label is unset or unrecognized
    /// (Open Question O1's resolution).
    pub fn codec_factory_for(&self, label: Option<&str>) -> CodecFactory {
        if let Some(label) = label {
            if let Some(f) = self.codec_factories.get(label) {
                return Arc::clone(f);
            }
        }
        Arc::new(|direction| Box::new(Http1Codec::new(direction)))
    }
}

/// Convenience used by servers that enable SPDY/multiplexed listeners: a
/// [`CodecFactory`] entry ready to insert into
/// `HTTPServerOptions::codec_factories` under the `"spdy/3.1"` label.
pub fn multiplexed_codec_factory() -> CodecFactory {
    Arc::new(|direction| Box::new(MultiplexedCodec::new(direction)))
}

/// Drives accept loops across a fixed pool of worker threads. Owns zero or
/// more bound listeners (one per [`IpConfig`]), a reversed handler-factory
/// chain, and the shared [`HTTPServerOptions`].
pub struct Acceptor {
    options: Arc<HTTPServerOptions>,
    reversed_factories: Arc<Vec<Arc<dyn HandlerFactory>>>,
    configs: Vec<AcceptorConfiguration>,
    listeners: Vec<TcpListener>,
    workers: Mutex<Vec<JoinHandle<()>>>,
    draining: Arc<AtomicBool>,
    drain_complete: Arc<AtomicBool>,
}

impl Acceptor {
    /// Builds an `Acceptor` for `ip_configs`, without binding any sockets
    /// yet. Precomputes the reversed handler-factory list once, matching
    /// `HTTPServerAcceptor::make`'s one-time `std::reverse`.
    pub fn make(ip_configs: &[IpConfig], options: HTTPServerOptions) -> Self {
        let mut reversed: Vec<Arc<dyn HandlerFactory>> = options.handler_factories.clone();
        reversed.reverse();
        let configs = ip_configs.iter().map(|ip| AcceptorConfiguration::make(ip, &options)).collect();
        Self {
            options: Arc::new(options),
            reversed_factories: Arc::new(reversed),
            configs,
            listeners: Vec::new(),
            workers: Mutex::new(Vec::new()),
            draining: Arc::new(AtomicBool::new(false)),
            drain_complete: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn handler_factories(&self) -> Arc<Vec<Arc<dyn HandlerFactory>>> {
        Arc::clone(&self.reversed_factories)
    }

    /// Binds every configured listener, atomically: if any bind fails, all
    /// listeners bound so far in this call are dropped (closing their
    /// sockets) before returning the error, matching the `MultiBind`
    /// testable property.
    pub fn bind(&mut self) -> Result<Vec<SocketAddr>, AcceptorError> {
        let mut bound = Vec::with_capacity(self.configs.len());
        for conf in &self.configs {
            match TcpListener::bind(conf.bind_address) {
                Ok(listener) => bound.push(listener),
                Err(source) => {
                    tracing::warn!(addr = %conf.bind_address, error = %source, "bind failed, rolling back prior listeners");
                    // Atomic: drop every listener bound in this attempt.
                    drop(bound);
                    return Err(AcceptorError::Bind { addr: conf.bind_address, source });
                }
            }
        }
        let addresses: Vec<SocketAddr> = bound.iter().filter_map(|l| l.local_addr().ok()).collect();
        tracing::debug!(count = addresses.len(), "bound listeners");
        self.listeners = bound;
        Ok(addresses)
    }

    pub fn addresses(&self) -> Vec<SocketAddr> {
        self.listeners.iter().filter_map(|l| l.local_addr().ok()).collect()
    }

    /// Starts `options.threads` worker threads, each running its own
    /// non-blocking accept/poll loop over every bound listener. Calls
    /// `on_ready` once every worker has registered its listeners, or
    /// `on_error` (and returns without calling `on_ready`) if a worker
    /// fails to start.
    pub fn start(&mut self, on_ready: impl FnOnce(), on_error: impl FnOnce(AcceptorError)) {
        if self.listeners.is_empty() {
            on_error(AcceptorError::WorkerStartup { index: 0, message: "start called before bind".into() });
            return;
        }

        let mut handles = Vec::with_capacity(self.options.threads.max(1));
        for index in 0..self.options.threads.max(1) {
            let listeners: std::io::Result<Vec<TcpListener>> = self
                .listeners
                .iter()
                .map(|l| l.try_clone())
                .collect();
            let listeners = match listeners {
                Ok(l) => l,
                Err(e) => {
                    on_error(AcceptorError::WorkerStartup { index, message: e.to_string() });
                    return;
                }
            };
            let options = Arc::clone(&self.options);
            let factories = Arc::clone(&self.reversed_factories);
            let draining = Arc::clone(&self.draining);
            let builder = std::thread::Builder::new().name(format!("httpcodec-worker-{index}"));
            match builder.spawn(move || worker::run(listeners, options, factories, draining)) {
                Ok(handle) => handles.push(handle),
                Err(e) => {
                    tracing::warn!(index, error = %e, "worker thread failed to start");
                    on_error(AcceptorError::WorkerStartup { index, message: e.to_string() });
                    return;
                }
            }
        }
        tracing::debug!(threads = handles.len(), "workers started");
        *self.workers.lock().expect("worker list mutex poisoned") = handles;
        on_ready();
    }

    /// Signals every worker to drain (stop accepting, finish in-flight
    /// sessions) and blocks until they exit. Safe to call more than once —
    /// only the first call joins the threads; later calls are a no-op,
    /// matching "the completion callback fires exactly once" (spec §5).
    pub fn stop(&self) {
        if self.draining.swap(true, Ordering::SeqCst) {
            return;
        }
        tracing::debug!("draining workers");
        let mut workers = self.workers.lock().expect("worker list mutex poisoned");
        for handle in workers.drain(..) {
            let _ = handle.join();
        }
        self.drain_complete.store(true, Ordering::SeqCst);
        tracing::debug!("drain complete");
    }

    pub fn is_drained(&self) -> bool {
        self.drain_complete.load(Ordering::SeqCst)
    }
}

struct NullHandler;
impl RequestHandler for NullHandler {}

/// Runs `factories` (already reversed — outermost first) against `msg`,
/// each wrapping the handler built by the rest of the chain so far.
pub fn build_handler_chain(factories: &[Arc<dyn HandlerFactory>], msg: &HttpMessage) -> Box<dyn RequestHandler> {
    let mut handler: Option<Box<dyn RequestHandler>> = None;
    for factory in factories {
        handler = Some(factory.on_request(handler, msg));
    }
    handler.unwrap_or_else(|| Box::new(NullHandler))
}
