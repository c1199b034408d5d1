//! The slice of an inbound HTTP request the interception layer reads.
//!
//! torii does not own the request — the hosting framework does. Hooks only
//! need the method, the URI, the headers (for client-address resolution),
//! and the transport-level peer address, so that is all [`RequestInfo`]
//! carries. Build one per request in your framework adapter and pass it to
//! every hook for that request.

use std::net::SocketAddr;

use http::{Method, Uri};

/// Read-only request facts for one handler invocation.
pub struct RequestInfo {
    method: Method,
    uri: Uri,
    headers: Vec<(String, String)>,
    peer: Option<SocketAddr>,
}

impl RequestInfo {
    pub fn new(
        method: Method,
        uri: Uri,
        headers: Vec<(String, String)>,
        peer: Option<SocketAddr>,
    ) -> Self {
        Self { method, uri, headers, peer }
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    pub fn uri(&self) -> &Uri {
        &self.uri
    }

    /// Transport-level peer address, if the host knows it.
    pub fn peer(&self) -> Option<SocketAddr> {
        self.peer
    }

    /// Case-insensitive header lookup.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn header_lookup_is_case_insensitive() {
        let req = RequestInfo::new(
            Method::GET,
            "/users".parse().unwrap(),
            vec![("X-Forwarded-For".to_owned(), "10.0.0.1".to_owned())],
            None,
        );
        assert_eq!(req.header("x-forwarded-for"), Some("10.0.0.1"));
        assert_eq!(req.header("X-FORWARDED-FOR"), Some("10.0.0.1"));
        assert_eq!(req.header("accept"), None);
    }
}
