//! HTTP/1.1 request construction and serialization.

use bytes::{Bytes, BytesMut};

/// HTTP protocol version.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Version {
    /// HTTP/1.0 — connections close after one exchange unless negotiated.
    Http10,
    /// HTTP/1.1 — connections are persistent unless `Connection: close`.
    #[default]
    Http11,
}

impl Version {
    /// Wire representation of the version token.
    pub fn as_str(&self) -> &'static str {
        match self {
            Version::Http10 => "HTTP/1.0",
            Version::Http11 => "HTTP/1.1",
        }
    }
}

/// An HTTP request to be serialized onto a connection.
///
/// Header values are emitted verbatim — no escaping or validation is
/// performed at this layer.
#[derive(Debug, Clone)]
pub struct Request {
    method: String,
    path: String,
    version: Version,
    host: Option<String>,
    headers: Vec<(String, String)>,
    body: Option<Bytes>,
}

impl Request {
    /// Create a request with the given method and path.
    pub fn new(method: &str, path: &str) -> Self {
        Self {
            method: method.to_string(),
            path: path.to_string(),
            version: Version::Http11,
            host: None,
            headers: Vec::new(),
            body: None,
        }
    }

    /// Create a GET request.
    pub fn get(path: &str) -> Self {
        Self::new("GET", path)
    }

    /// Create a POST request.
    pub fn post(path: &str) -> Self {
        Self::new("POST", path)
    }

    /// Set the `Host` header value.
    pub fn host(mut self, host: &str) -> Self {
        self.host = Some(host.to_string());
        self
    }

    /// Add a header. Duplicates are kept in insertion order.
    pub fn header(mut self, name: &str, value: &str) -> Self {
        self.headers.push((name.to_string(), value.to_string()));
        self
    }

    /// Set the request body. `Content-Length` is emitted automatically.
    pub fn body(mut self, body: impl Into<Bytes>) -> Self {
        let body = body.into();
        self.body = if body.is_empty() { None } else { Some(body) };
        self
    }

    /// The request method.
    pub fn method(&self) -> &str {
        &self.method
    }

    /// The request path.
    pub fn path(&self) -> &str {
        &self.path
    }

    /// User headers in insertion order.
    pub fn headers(&self) -> &[(String, String)] {
        &self.headers
    }

    /// Serialize the request head (and body, if any) into `dst`.
    ///
    /// Layout: request line, `Host` when present, a forced
    /// `Connection: keep-alive`, user headers, `Content-Length` when a
    /// body is present, blank line, body bytes.
    pub fn encode(&self, dst: &mut BytesMut) {
        dst.extend_from_slice(self.method.as_bytes());
        dst.extend_from_slice(b" ");
        dst.extend_from_slice(self.path.as_bytes());
        dst.extend_from_slice(b" ");
        dst.extend_from_slice(self.version.as_str().as_bytes());
        dst.extend_from_slice(b"\r\n");

        if let Some(host) = &self.host {
            dst.extend_from_slice(b"Host: ");
            dst.extend_from_slice(host.as_bytes());
            dst.extend_from_slice(b"\r\n");
        }

        dst.extend_from_slice(b"Connection: keep-alive\r\n");

        for (name, value) in &self.headers {
            dst.extend_from_slice(name.as_bytes());
            dst.extend_from_slice(b": ");
            dst.extend_from_slice(value.as_bytes());
            dst.extend_from_slice(b"\r\n");
        }

        if let Some(body) = &self.body {
            dst.extend_from_slice(b"Content-Length: ");
            dst.extend_from_slice(body.len().to_string().as_bytes());
            dst.extend_from_slice(b"\r\n");
        }

        dst.extend_from_slice(b"\r\n");

        if let Some(body) = &self.body {
            dst.extend_from_slice(body);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encode_get_minimal() {
        let mut buf = BytesMut::new();
        Request::get("/a").host("host").encode(&mut buf);
        assert_eq!(
            &buf[..],
            b"GET /a HTTP/1.1\r\nHost: host\r\nConnection: keep-alive\r\n\r\n".as_slice()
        );
    }

    #[test]
    fn encode_with_headers() {
        let mut buf = BytesMut::new();
        Request::get("/v1/data")
            .host("api.example.com")
            .header("Accept", "application/json")
            .header("Authorization", "Bearer tok")
            .encode(&mut buf);
        let text = std::str::from_utf8(&buf).unwrap();
        assert!(text.starts_with("GET /v1/data HTTP/1.1\r\n"));
        assert!(text.contains("Host: api.example.com\r\n"));
        assert!(text.contains("Connection: keep-alive\r\n"));
        assert!(text.contains("Accept: application/json\r\n"));
        assert!(text.contains("Authorization: Bearer tok\r\n"));
        assert!(text.ends_with("\r\n\r\n"));
    }

    #[test]
    fn encode_post_with_body() {
        let mut buf = BytesMut::new();
        Request::post("/submit")
            .host("h")
            .body(&b"payload"[..])
            .encode(&mut buf);
        let text = std::str::from_utf8(&buf).unwrap();
        assert!(text.contains("Content-Length: 7\r\n"));
        assert!(text.ends_with("\r\n\r\npayload"));
    }

    #[test]
    fn encode_without_host() {
        let mut buf = BytesMut::new();
        Request::get("/").encode(&mut buf);
        assert_eq!(
            &buf[..],
            b"GET / HTTP/1.1\r\nConnection: keep-alive\r\n\r\n".as_slice()
        );
    }

    #[test]
    fn duplicate_headers_kept_in_order() {
        let mut buf = BytesMut::new();
        Request::get("/")
            .header("X-Tag", "one")
            .header("X-Tag", "two")
            .encode(&mut buf);
        let text = std::str::from_utf8(&buf).unwrap();
        let first = text.find("X-Tag: one").unwrap();
        let second = text.find("X-Tag: two").unwrap();
        assert!(first < second);
    }
}
