//! One worker thread's accept/poll loop (spec §5, ambient C7).
//!
//! Grounded on `SleepingPills-bushhammer`'s `neutronium::net::Endpoint` for
//! the general shape (one `mio::Poll`, a token-keyed table of live
//! connections), updated to the stable `mio` 0.8 `Interest`/`Registry` API.
//! Each worker owns its listeners outright (cloned file descriptors) and
//! its own `HashMap<Token, Connection>` — sessions never cross threads.

use std::collections::HashMap;
use std::io::{Read, Write};
use std::net::TcpListener as StdTcpListener;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use mio::net::{TcpListener, TcpStream};
use mio::{Events, Interest, Poll, Token};

use crate::codec::TransportDirection;
use crate::server::{build_handler_chain, HTTPServerOptions, Session, Transaction};
use crate::transport_info::TransportInfo;

const LISTENER_TOKEN_BASE: usize = 0;
const CONNECTION_TOKEN_BASE: usize = 1 << 20;
const POLL_TIMEOUT: Duration = Duration::from_millis(250);
const READ_BUF_SIZE: usize = 16 * 1024;

struct Connection {
    stream: TcpStream,
    session: Session,
}

/// Entry point spawned onto each worker thread by
/// [`crate::server::Acceptor::start`].
pub fn run(
    std_listeners: Vec<StdTcpListener>,
    options: Arc<HTTPServerOptions>,
    reversed_factories: Arc<Vec<Arc<dyn crate::server::HandlerFactory>>>,
    draining: Arc<AtomicBool>,
) {
    let mut poll = match Poll::new() {
        Ok(p) => p,
        Err(_) => return,
    };
    let mut events = Events::with_capacity(1024);

    let mut listeners = Vec::with_capacity(std_listeners.len());
    for (index, std_listener) in std_listeners.into_iter().enumerate() {
        if std_listener.set_nonblocking(true).is_err() {
            continue;
        }
        let mut listener = TcpListener::from_std(std_listener);
        let token = Token(LISTENER_TOKEN_BASE + index);
        if poll.registry().register(&mut listener, token, Interest::READABLE).is_err() {
            continue;
        }
        listeners.push((token, listener));
    }

    let mut connections: HashMap<Token, Connection> = HashMap::new();
    let mut next_connection_id = CONNECTION_TOKEN_BASE;

    while !draining.load(Ordering::Relaxed) {
        if poll.poll(&mut events, Some(POLL_TIMEOUT)).is_err() {
            continue;
        }

        for event in events.iter() {
            let token = event.token();

            if let Some((_, listener)) = listeners.iter_mut().find(|(t, _)| *t == token) {
                accept_all(listener, &mut poll, &mut connections, &mut next_connection_id, &options, &reversed_factories);
                continue;
            }

            if let Some(conn) = connections.get_mut(&token) {
                if !service_connection(conn) {
                    let mut conn = connections.remove(&token).expect("token was just looked up");
                    let _ = poll.registry().deregister(&mut conn.stream);
                }
            }
        }
    }
}

#[allow(clippy::too_many_arguments)]
fn accept_all(
    listener: &mut TcpListener,
    poll: &mut Poll,
    connections: &mut HashMap<Token, Connection>,
    next_connection_id: &mut usize,
    options: &Arc<HTTPServerOptions>,
    reversed_factories: &Arc<Vec<Arc<dyn crate::server::HandlerFactory>>>,
) {
    loop {
        let (std_stream, peer_addr) = match listener.accept() {
            Ok(pair) => pair,
            Err(e) if e.kind() == std::io::ErrorKind::WouldBlock => return,
            Err(_) => return,
        };
        let local_addr = std_stream.local_addr().unwrap_or(peer_addr);
        let _ = std_stream.set_nodelay(true);

        let mut stream = std_stream;
        let token = Token(*next_connection_id);
        *next_connection_id += 1;
        if poll.registry().register(&mut stream, token, Interest::READABLE).is_err() {
            continue;
        }

        let codec_factory = options.codec_factory_for(None);
        let codec = codec_factory(TransportDirection::Downstream);
        let mut session = Session::new(codec, peer_addr, local_addr, Arc::clone(reversed_factories));
        session.transport_info = sample_transport_info(&stream);

        connections.insert(token, Connection { stream, session });
    }
}

#[cfg(unix)]
fn sample_transport_info(stream: &TcpStream) -> TransportInfo {
    use std::os::unix::io::AsRawFd;
    TransportInfo::sample(stream.as_raw_fd())
}

#[cfg(not(unix))]
fn sample_transport_info(_stream: &TcpStream) -> TransportInfo {
    TransportInfo::invalid()
}

/// Reads what's available, feeds it to the codec, and drives any handlers
/// whose messages just completed. Returns `false` when the connection
/// should be torn down.
fn service_connection(conn: &mut Connection) -> bool {
    let mut buf = [0u8; READ_BUF_SIZE];
    loop {
        match conn.stream.read(&mut buf) {
            Ok(0) => {
                conn.session.codec_mut().on_ingress_eof();
                break;
            }
            Ok(n) => {
                if conn.session.codec_mut().on_ingress(&buf[..n]).is_err() {
                    return false;
                }
            }
            Err(e) if e.kind() == std::io::ErrorKind::WouldBlock => break,
            Err(_) => return false,
        }
    }

    let outbound = drain_events_and_respond(&mut conn.session);
    if !outbound.is_empty() && conn.stream.write_all(&outbound).is_err() {
        return false;
    }

    conn.session.remove_completed();
    !(conn.session.codec_mut().close_on_egress_complete() && !conn.session.is_busy())
}

/// Drains every event the codec produced since the last pass, drives the
/// matching `RequestHandler`s, and renders whatever responses they hand
/// back through the codec's `generate_*` methods into one byte buffer.
pub fn drain_events_and_respond(session: &mut Session) -> Vec<u8> {
    let events = session.take_events();
    let mut outbound = Vec::new();

    for (stream, mut msg) in events.new_transactions {
        msg.set_client_address(session.peer_address);
        msg.set_dst_address(session.local_address);
        let mut handler = build_handler_chain(&events.handler_factories, &msg);
        handler.on_request(&msg);
        session.insert_transaction(Transaction::new(stream, handler));
    }

    for (stream, chunk) in events.bodies {
        if let Some(txn) = session.transaction_mut(stream) {
            txn.handler.on_body(&chunk);
        }
    }

    for stream in events.completions {
        let response = match session.transaction_mut(stream) {
            Some(txn) => {
                txn.ingress_complete = true;
                txn.handler.on_eom()
            }
            None => None,
        };
        if let Some(response) = response {
            // `Content-Length` is already set (see `HttpResponse::new`), so
            // the `eom: true` body call alone terminates the message —
            // `generate_eom` is the chunked-transfer path, not needed here.
            session.codec_mut().generate_header(&mut outbound, stream, &response.message, None);
            session.codec_mut().generate_body(&mut outbound, stream, &response.body, true);
        }
        if let Some(txn) = session.transaction_mut(stream) {
            txn.egress_complete = true;
        }
    }

    for (stream, error) in events.errors {
        tracing::debug!(%stream, %error, "stream error");
        if let Some(txn) = session.transaction_mut(stream) {
            txn.handler.on_error(&error.to_string());
        }
    }

    for (stream, code) in events.aborts {
        tracing::debug!(%stream, ?code, "stream aborted");
        if let Some(txn) = session.transaction_mut(stream) {
            txn.ingress_complete = true;
            txn.egress_complete = true;
        }
    }

    outbound
}
