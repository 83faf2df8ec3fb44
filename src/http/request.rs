use std::collections::HashMap;

use percent_encoding::percent_decode_str;
use url::Url;

/// Stand-in authority used to run origin-form targets through URL parsing.
const ORIGIN_BASE: &str = "http://origin.invalid";

/// HTTP request methods.
///
/// Represents the HTTP method/verb of a request. The vanity server only
/// answers GET. Other methods are parsed so they can be refused with
/// 405 Method Not Allowed instead of a protocol error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Method {
    /// GET - Retrieve a resource
    GET,
    /// POST - Create or submit data
    POST,
    /// PUT - Replace a resource
    PUT,
    /// DELETE - Delete a resource
    DELETE,
    /// HEAD - Like GET but without the response body
    HEAD,
    /// OPTIONS - Describe communication options
    OPTIONS,
    /// PATCH - Partial modification of a resource
    PATCH,
    /// TRACE - Message loop-back test
    TRACE,
    /// CONNECT - Establish a tunnel
    CONNECT,
}

/// Represents a parsed HTTP request from a client.
///
/// Contains all information extracted from the HTTP request line and headers.
/// `path` holds the raw request target, which is usually origin-form
/// (`/gist?go-get=1`) but may be absolute-form (`https://kkn.fi/gist`).
#[derive(Debug, Clone)]
pub struct Request {
    /// The HTTP method (GET, POST, etc.)
    pub method: Method,
    /// The raw request target (e.g., "/gist?go-get=1")
    pub path: String,
    /// HTTP version (typically "HTTP/1.1")
    pub version: String,
    /// Request headers as key-value pairs
    pub headers: HashMap<String, String>,
    /// Request body for POST/PUT requests
    pub body: Vec<u8>,
}

/// The request target split into the pieces the resolver routes on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Target {
    /// Scheme given in an absolute-form target, lowercased.
    pub scheme: Option<String>,
    /// Authority given in an absolute-form target.
    pub host: Option<String>,
    /// Path component, always starting with `/`.
    pub path: String,
    /// Raw query string without the leading `?`.
    pub query: Option<String>,
}

/// Builder for constructing Request objects.
pub struct RequestBuilder {
    method: Option<Method>,
    path: Option<String>,
    version: Option<String>,
    headers: HashMap<String, String>,
    body: Vec<u8>,
}

impl Method {
    /// Parses an HTTP method from a string.
    ///
    /// # Arguments
    ///
    /// * `s` - String representation of the method (case-sensitive, typically uppercase)
    ///
    /// # Returns
    ///
    /// `Some(Method)` if the string matches a known method, `None` otherwise.
    ///
    /// # Example
    ///
    /// ```
    /// # use vanity::http::request::Method;
    /// assert_eq!(Method::from_str("GET"), Some(Method::GET));
    /// assert_eq!(Method::from_str("get"), None);
    /// ```
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "GET" => Some(Method::GET),
            "POST" => Some(Method::POST),
            "PUT" => Some(Method::PUT),
            "DELETE" => Some(Method::DELETE),
            "HEAD" => Some(Method::HEAD),
            "OPTIONS" => Some(Method::OPTIONS),
            "PATCH" => Some(Method::PATCH),
            "TRACE" => Some(Method::TRACE),
            "CONNECT" => Some(Method::CONNECT),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Method::GET => "GET",
            Method::POST => "POST",
            Method::PUT => "PUT",
            Method::DELETE => "DELETE",
            Method::HEAD => "HEAD",
            Method::OPTIONS => "OPTIONS",
            Method::PATCH => "PATCH",
            Method::TRACE => "TRACE",
            Method::CONNECT => "CONNECT",
        }
    }
}

impl Default for RequestBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl RequestBuilder {
    pub fn new() -> Self {
        Self {
            method: None,
            path: None,
            version: None,
            headers: HashMap::new(),
            body: Vec::new(),
        }
    }

    pub fn method(mut self, method: Method) -> Self {
        self.method = Some(method);
        self
    }

    pub fn path(mut self, path: impl Into<String>) -> Self {
        self.path = Some(path.into());
        self
    }

    pub fn version(mut self, version: impl Into<String>) -> Self {
        self.version = Some(version.into());
        self
    }

    pub fn header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(key.into(), value.into());
        self
    }

    pub fn body(mut self, body: Vec<u8>) -> Self {
        self.body = body;
        self
    }

    pub fn build(self) -> Result<Request, &'static str> {
        Ok(Request {
            method: self.method.ok_or("method missing")?,
            path: self.path.ok_or("path missing")?,
            version: self.version.unwrap_or_else(|| "HTTP/1.1".to_string()),
            headers: self.headers,
            body: self.body,
        })
    }
}

impl Request {
    /// Retrieves a header value by name, ignoring ASCII case.
    ///
    /// # Arguments
    ///
    /// * `key` - Header name to look up
    ///
    /// # Returns
    ///
    /// `Some(&str)` with the header value if present, `None` otherwise.
    pub fn header(&self, key: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(key))
            .map(|(_, v)| v.as_str())
    }

    /// Determines whether the connection should remain open after the response.
    ///
    /// Checks the Connection header. For HTTP/1.1, the default is `true` (keep-alive).
    /// For HTTP/1.0 or if Connection: close is specified, returns `false`.
    pub fn keep_alive(&self) -> bool {
        match self.header("Connection") {
            Some(v) => v.eq_ignore_ascii_case("keep-alive"),
            None => self.version != "HTTP/1.0",
        }
    }

    /// Splits the request target into scheme, host, path and query.
    ///
    /// Both target forms go through the same URL normalization and the
    /// path is percent-decoded, so `/caf%C3%A9` and
    /// `https://kkn.fi/caf%C3%A9` yield the same path.
    pub fn target(&self) -> Target {
        let lowered = self.path.to_ascii_lowercase();
        if lowered.starts_with("http://") || lowered.starts_with("https://") {
            if let Ok(url) = Url::parse(&self.path) {
                let host = url.host_str().map(|h| match url.port() {
                    Some(port) => format!("{}:{}", h, port),
                    None => h.to_string(),
                });
                return Target {
                    scheme: Some(url.scheme().to_string()),
                    host,
                    path: decode_path(url.path()),
                    query: url.query().map(str::to_string),
                };
            }
        }

        let origin = if self.path.starts_with('/') {
            format!("{}{}", ORIGIN_BASE, self.path)
        } else {
            format!("{}/{}", ORIGIN_BASE, self.path)
        };
        match Url::parse(&origin) {
            Ok(url) => Target {
                scheme: None,
                host: None,
                path: decode_path(url.path()),
                query: url.query().map(str::to_string),
            },
            Err(_) => {
                let (path, query) = match self.path.split_once('?') {
                    Some((p, q)) => (p, Some(q.to_string())),
                    None => (self.path.as_str(), None),
                };
                Target {
                    scheme: None,
                    host: None,
                    path: decode_path(&format!("/{}", path.trim_start_matches('/'))),
                    query,
                }
            }
        }
    }

    /// The scheme the client used to reach us.
    ///
    /// Taken from an absolute-form target, else from `X-Forwarded-Proto`
    /// set by the TLS-terminating proxy in front of the server.
    pub fn scheme(&self) -> Option<String> {
        self.target().scheme.or_else(|| {
            self.header("X-Forwarded-Proto")
                .map(|v| v.split(',').next().unwrap_or(v).trim().to_ascii_lowercase())
        })
    }

    /// Host the request was addressed to.
    pub fn host(&self) -> String {
        self.target()
            .host
            .or_else(|| self.header("Host").map(str::to_string))
            .unwrap_or_default()
    }

    /// First value of a query parameter, form-decoded.
    pub fn query_param(&self, name: &str) -> Option<String> {
        let query = self.target().query?;
        url::form_urlencoded::parse(query.as_bytes())
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.into_owned())
    }
}

fn decode_path(path: &str) -> String {
    percent_decode_str(path).decode_utf8_lossy().into_owned()
}
