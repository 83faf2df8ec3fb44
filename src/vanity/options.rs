//! Resolver construction.
//!
//! All settings are validated in [`ResolverBuilder::build`]; a resolver that
//! exists is known to be servable.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use url::Url;

use crate::http::request::Request;
use crate::http::response::Response;
use crate::static_files::{StaticDir, StaticDirError};
use crate::vanity::log::{ErrorLog, TracingLog};
use crate::vanity::packages::Packages;
use crate::vanity::paths::{ModuleServer, with_trailing_slash};
use crate::vanity::resolver::Resolver;

pub const DEFAULT_VCS: &str = "git";
pub const DEFAULT_VCS_URL: &str = "https://github.com/";
pub const DEFAULT_MODULE_SERVER_URL: &str = "https://pkg.go.dev/";

/// Served at `/robots.txt` when no body is configured.
pub const DEFAULT_ROBOTS_TXT: &str = "User-agent: *\nAllow: /\n";

/// Answers requests for the site root.
pub trait IndexPage: Send + Sync {
    fn respond(&self, req: &Request) -> Response;
}

/// Index page with a fixed HTML body.
#[derive(Debug, Clone)]
pub struct StaticIndexPage {
    body: Vec<u8>,
}

impl StaticIndexPage {
    pub fn new(body: impl Into<Vec<u8>>) -> Self {
        Self { body: body.into() }
    }
}

impl IndexPage for StaticIndexPage {
    fn respond(&self, _req: &Request) -> Response {
        Response::html(self.body.clone())
    }
}

/// Index page read from an HTML file once, at build time.
#[derive(Debug, Clone)]
pub struct FileIndexPage {
    page: StaticIndexPage,
}

impl FileIndexPage {
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ResolverError> {
        let path = path.as_ref();
        let body = std::fs::read(path).map_err(|source| ResolverError::IndexPage {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(Self {
            page: StaticIndexPage::new(body),
        })
    }
}

impl IndexPage for FileIndexPage {
    fn respond(&self, req: &Request) -> Response {
        self.page.respond(req)
    }
}

/// Configuration rejected while building a resolver.
#[derive(Debug)]
pub enum ResolverError {
    InvalidUrl {
        field: &'static str,
        url: String,
        reason: String,
    },
    StaticDir(StaticDirError),
    IndexPage {
        path: PathBuf,
        source: std::io::Error,
    },
}

impl std::fmt::Display for ResolverError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ResolverError::InvalidUrl { field, url, reason } => {
                write!(f, "invalid {} {:?}: {}", field, url, reason)
            }
            ResolverError::StaticDir(e) => write!(f, "{}", e),
            ResolverError::IndexPage { path, source } => {
                write!(f, "index page {}: {}", path.display(), source)
            }
        }
    }
}

impl std::error::Error for ResolverError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ResolverError::StaticDir(e) => Some(e),
            ResolverError::IndexPage { source, .. } => Some(source),
            ResolverError::InvalidUrl { .. } => None,
        }
    }
}

impl From<StaticDirError> for ResolverError {
    fn from(e: StaticDirError) -> Self {
        ResolverError::StaticDir(e)
    }
}

enum IndexSource {
    Responder(Arc<dyn IndexPage>),
    File(PathBuf),
}

/// Collects resolver settings. Setting a field twice keeps the last value.
///
/// ```
/// use vanity::vanity::ResolverBuilder;
///
/// let resolver = ResolverBuilder::new()
///     .vcs("git")
///     .vcs_url("https://github.com/kare")
///     .host("kkn.fi")
///     .build()
///     .unwrap();
/// assert_eq!(resolver.vcs_url(), "https://github.com/kare/");
/// ```
pub struct ResolverBuilder {
    vcs: String,
    vcs_url: String,
    module_server_url: String,
    host: Option<String>,
    static_dir: Option<(PathBuf, String)>,
    index_page: Option<IndexSource>,
    robots_txt: Option<String>,
    packages: Packages,
    log: Arc<dyn ErrorLog>,
}

impl Default for ResolverBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl ResolverBuilder {
    pub fn new() -> Self {
        Self {
            vcs: DEFAULT_VCS.to_string(),
            vcs_url: DEFAULT_VCS_URL.to_string(),
            module_server_url: DEFAULT_MODULE_SERVER_URL.to_string(),
            host: None,
            static_dir: None,
            index_page: None,
            robots_txt: None,
            packages: Packages::default(),
            log: Arc::new(TracingLog),
        }
    }

    /// Version control system announced to the go tool, e.g. `git` or `hg`.
    pub fn vcs(mut self, vcs: impl Into<String>) -> Self {
        self.vcs = vcs.into();
        self
    }

    /// Base URL repositories live under, e.g. `https://github.com/kare`.
    pub fn vcs_url(mut self, url: impl Into<String>) -> Self {
        self.vcs_url = url.into();
        self
    }

    /// Where browsers are redirected.
    pub fn module_server_url(mut self, url: impl Into<String>) -> Self {
        self.module_server_url = url.into();
        self
    }

    /// Fixed vanity host used instead of the request's `Host` header.
    pub fn host(mut self, host: impl Into<String>) -> Self {
        let host = host.into();
        self.host = (!host.is_empty()).then_some(host);
        self
    }

    /// Serves the local directory `path` under the URL prefix `prefix`.
    pub fn static_dir(mut self, path: impl Into<PathBuf>, prefix: impl Into<String>) -> Self {
        self.static_dir = Some((path.into(), prefix.into()));
        self
    }

    pub fn index_page(mut self, page: impl IndexPage + 'static) -> Self {
        self.index_page = Some(IndexSource::Responder(Arc::new(page)));
        self
    }

    /// Index page loaded from an HTML file during `build`.
    pub fn index_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.index_page = Some(IndexSource::File(path.into()));
        self
    }

    pub fn robots_txt(mut self, body: impl Into<String>) -> Self {
        self.robots_txt = Some(body.into());
        self
    }

    pub fn packages(mut self, packages: Packages) -> Self {
        self.packages = packages;
        self
    }

    pub fn log(mut self, log: Arc<dyn ErrorLog>) -> Self {
        self.log = log;
        self
    }

    pub fn build(self) -> Result<Resolver, ResolverError> {
        let vcs_url = if self.vcs_url.is_empty() {
            DEFAULT_VCS_URL.to_string()
        } else {
            self.vcs_url
        };
        let vcs_url = validate_base_url("vcs_url", &vcs_url)?.0;

        let module_server_url = if self.module_server_url.is_empty() {
            DEFAULT_MODULE_SERVER_URL.to_string()
        } else {
            self.module_server_url
        };
        let (base, host) = validate_base_url("module_server_url", &module_server_url)?;
        let module_server = ModuleServer::classify(base, &host);

        let static_dir = match self.static_dir {
            Some((path, prefix)) => Some(StaticDir::new(path, &prefix)?),
            None => None,
        };

        let index_page: Option<Arc<dyn IndexPage>> = match self.index_page {
            Some(IndexSource::Responder(page)) => Some(page),
            Some(IndexSource::File(path)) => Some(Arc::new(FileIndexPage::load(path)?)),
            None => None,
        };

        let robots_txt = self
            .robots_txt
            .filter(|body| !body.is_empty())
            .unwrap_or_else(|| DEFAULT_ROBOTS_TXT.to_string());

        let vcs = if self.vcs.is_empty() {
            DEFAULT_VCS.to_string()
        } else {
            self.vcs
        };

        Ok(Resolver {
            vcs,
            vcs_url,
            module_server,
            host: self.host,
            static_dir,
            index_page,
            robots_txt,
            packages: self.packages,
            log: self.log,
        })
    }
}

/// Checks that `raw` is an absolute http(s) URL with a host and returns it
/// with exactly one trailing slash, together with its host.
fn validate_base_url(field: &'static str, raw: &str) -> Result<(String, String), ResolverError> {
    let invalid = |reason: String| ResolverError::InvalidUrl {
        field,
        url: raw.to_string(),
        reason,
    };
    let url = Url::parse(raw).map_err(|e| invalid(e.to_string()))?;
    if url.scheme() != "https" && url.scheme() != "http" {
        return Err(invalid(format!("unsupported scheme {}", url.scheme())));
    }
    let host = url
        .host_str()
        .ok_or_else(|| invalid("missing host".to_string()))?
        .to_ascii_lowercase();
    if url.query().is_some() || url.fragment().is_some() {
        return Err(invalid("query and fragment are not allowed".to_string()));
    }
    Ok((with_trailing_slash(raw), host))
}
