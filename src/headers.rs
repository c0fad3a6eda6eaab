//! HTTPHeaders / HTTPMessage / Settings (spec §3).

use std::net::SocketAddr;

/// Ordered multimap of (name, value). Duplicates are allowed; iteration
/// order is insertion order. Name comparisons are case-insensitive, matching
/// HTTP's field-name semantics.
///
/// A `HashMap<String, Vec<String>>` would satisfy "duplicates allowed" but
/// loses the relative order *between different names*, which RFC 7230
/// doesn't require but HTTP/1 wire compatibility (and HPACK's
/// literal-without-indexing path, which re-emits headers in the order
/// handed to it) does care about. A plain `Vec` preserves it exactly.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HttpHeaders {
    entries: Vec<(String, String)>,
}

impl HttpHeaders {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.entries.push((name.into(), value.into()));
    }

    /// Replaces all existing values for `name` with the single given value.
    pub fn set(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        self.entries.retain(|(n, _)| !n.eq_ignore_ascii_case(&name));
        self.entries.push((name, value.into()));
    }

    pub fn remove(&mut self, name: &str) {
        self.entries.retain(|(n, _)| !n.eq_ignore_ascii_case(name));
    }

    /// First value for `name`, case-insensitively.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// All values for `name`, in insertion order.
    pub fn get_all<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a str> + 'a {
        self.entries
            .iter()
            .filter(move |(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.iter().any(|(n, _)| n.eq_ignore_ascii_case(name))
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(n, v)| (n.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl FromIterator<(String, String)> for HttpHeaders {
    fn from_iter<T: IntoIterator<Item = (String, String)>>(iter: T) -> Self {
        Self {
            entries: iter.into_iter().collect(),
        }
    }
}

/// An ordered list of (identifier, value) pairs, exposed separately per
/// direction on a `Codec` (egress settings the local side wants to send,
/// ingress settings the local side has been told by the peer).
pub type Settings = Vec<(u16, u32)>;

/// HTTP method/status, URL/path, version, headers, and socket endpoints for
/// one headers-phase message. Shared between requests and responses — which
/// fields are meaningful depends on `HttpMessage::is_request()`.
#[derive(Debug, Clone)]
pub struct HttpMessage {
    pub method: Option<String>,
    pub status_code: Option<u16>,
    pub url: String,
    pub version: (u8, u8),
    pub headers: HttpHeaders,
    pub trailers: Option<HttpHeaders>,
    client_address: Option<SocketAddr>,
    dst_address: Option<SocketAddr>,
}

impl HttpMessage {
    pub fn request(method: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            method: Some(method.into()),
            status_code: None,
            url: url.into(),
            version: (1, 1),
            headers: HttpHeaders::new(),
            trailers: None,
            client_address: None,
            dst_address: None,
        }
    }

    pub fn response(status_code: u16) -> Self {
        Self {
            method: None,
            status_code: Some(status_code),
            url: String::new(),
            version: (1, 1),
            headers: HttpHeaders::new(),
            trailers: None,
            client_address: None,
            dst_address: None,
        }
    }

    pub fn is_request(&self) -> bool {
        self.method.is_some()
    }

    pub fn client_address(&self) -> Option<SocketAddr> {
        self.client_address
    }

    pub fn set_client_address(&mut self, addr: SocketAddr) {
        self.client_address = Some(addr);
    }

    pub fn dst_address(&self) -> Option<SocketAddr> {
        self.dst_address
    }

    pub fn set_dst_address(&mut self, addr: SocketAddr) {
        self.dst_address = Some(addr);
    }
}
