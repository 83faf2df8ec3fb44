//! The request decision engine.
//!
//! Every request is answered by exactly one of, in order:
//!
//! 1. permanent redirect to `https` when the client came over `http`
//! 2. `405` for anything but GET
//! 3. the static file mount, when the path is under its prefix
//! 4. the index page (or `404`) for `/`
//! 5. `robots.txt`
//! 6. the `go-import` meta tag when `go-get=1` is set, otherwise a
//!    temporary redirect to the module server

use std::sync::Arc;

use url::Url;

use crate::http::request::{Method, Request, Target};
use crate::http::response::{HTML_CONTENT_TYPE, Response, ResponseBuilder, StatusCode};
use crate::static_files::StaticDir;
use crate::vanity::log::ErrorLog;
use crate::vanity::options::{IndexPage, ResolverBuilder};
use crate::vanity::packages::Packages;
use crate::vanity::paths::{self, ModuleServer};

const ROBOTS_PATH: &str = "/robots.txt";
const TOOL_CACHE_CONTROL: &str = "public, max-age=300";

/// What an import path resolves to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackageRef {
    pub import_root: String,
    pub vcs: String,
    pub vcs_root: String,
}

/// Immutable after construction, shared across connections behind an `Arc`.
pub struct Resolver {
    pub(crate) vcs: String,
    pub(crate) vcs_url: String,
    pub(crate) module_server: ModuleServer,
    pub(crate) host: Option<String>,
    pub(crate) static_dir: Option<StaticDir>,
    pub(crate) index_page: Option<Arc<dyn IndexPage>>,
    pub(crate) robots_txt: String,
    pub(crate) packages: Packages,
    pub(crate) log: Arc<dyn ErrorLog>,
}

impl std::fmt::Debug for Resolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Resolver")
            .field("vcs", &self.vcs)
            .field("vcs_url", &self.vcs_url)
            .field("module_server", &self.module_server)
            .field("host", &self.host)
            .field("static_dir", &self.static_dir)
            .field("index_page", &self.index_page.is_some())
            .field("packages", &self.packages.len())
            .finish()
    }
}

impl Resolver {
    pub fn builder() -> ResolverBuilder {
        ResolverBuilder::new()
    }

    pub fn vcs(&self) -> &str {
        &self.vcs
    }

    pub fn vcs_url(&self) -> &str {
        &self.vcs_url
    }

    pub fn module_server(&self) -> &ModuleServer {
        &self.module_server
    }

    pub fn host(&self) -> Option<&str> {
        self.host.as_deref()
    }

    pub fn static_dir(&self) -> Option<&StaticDir> {
        self.static_dir.as_ref()
    }

    pub fn robots_txt(&self) -> &str {
        &self.robots_txt
    }

    pub fn packages(&self) -> &Packages {
        &self.packages
    }

    /// Reports an error through the injected sink.
    pub fn log_error(&self, message: &str) {
        self.log.log(message);
    }

    /// Produces the single response for `req`.
    pub async fn handle(&self, req: &Request) -> Response {
        let target = req.target();
        let request_host = req.host();

        if req.scheme().as_deref() == Some("http") {
            return self.upgrade_scheme(&request_host, &target);
        }

        if req.method != Method::GET {
            tracing::debug!(method = req.method.as_str(), path = %target.path, "method not allowed");
            return Response::method_not_allowed();
        }

        if let Some(static_dir) = &self.static_dir {
            if let Some(relative) = static_dir.strip(&target.path) {
                tracing::debug!(path = %target.path, "serving static file");
                return static_dir.serve(relative).await;
            }
        }

        if target.path == "/" || target.path.is_empty() {
            return match (&self.index_page, &self.static_dir) {
                (Some(page), _) => page.respond(req),
                (None, Some(static_dir)) => static_dir.index().await,
                (None, None) => Response::not_found(),
            };
        }

        if target.path == ROBOTS_PATH {
            return ResponseBuilder::new(StatusCode::Ok)
                .header("Content-Type", "text/plain; charset=utf-8")
                .body(self.robots_txt.clone().into_bytes())
                .build();
        }

        let host = self.effective_host(&request_host);
        if host.is_empty() {
            tracing::debug!(path = %target.path, "request without host");
            return Response::bad_request();
        }

        if req.query_param("go-get").as_deref() == Some("1") {
            let package = self.resolve(host, &target.path);
            tracing::debug!(
                import_root = %package.import_root,
                vcs_root = %package.vcs_root,
                "go-import"
            );
            let body = paths::import_document(&package.import_root, &package.vcs, &package.vcs_root);
            return ResponseBuilder::new(StatusCode::Ok)
                .header("Content-Type", HTML_CONTENT_TYPE)
                .header("Cache-Control", TOOL_CACHE_CONTROL)
                .body(body.into_bytes())
                .build();
        }

        let location = self.module_server.target(host, &target.path);
        tracing::debug!(path = %target.path, location = %location, "browser redirect");
        Response::redirect(StatusCode::TemporaryRedirect, &location)
    }

    /// Resolves the import path `host` + `path` to its repository.
    ///
    /// A registered package for the repository segment overrides the
    /// base URL and VCS.
    pub fn resolve(&self, host: &str, path: &str) -> PackageRef {
        let import_root = paths::import_root(host, path);
        let registered = paths::repository_segment(path).and_then(|s| self.packages.lookup(s));
        match registered {
            Some(package) => PackageRef {
                import_root,
                vcs: package.vcs.clone(),
                vcs_root: package.url.clone(),
            },
            None => PackageRef {
                import_root,
                vcs: self.vcs.clone(),
                vcs_root: paths::vcs_root(&self.vcs_url, path),
            },
        }
    }

    fn effective_host<'a>(&'a self, request_host: &'a str) -> &'a str {
        self.host.as_deref().unwrap_or(request_host)
    }

    fn upgrade_scheme(&self, host: &str, target: &Target) -> Response {
        let mut url = match Url::parse(&format!("https://{}", host)) {
            Ok(url) if !host.is_empty() => url,
            _ => return Response::bad_request(),
        };
        url.set_path(&target.path);
        url.set_query(target.query.as_deref());
        Response::redirect(StatusCode::MovedPermanently, url.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::request::RequestBuilder;
    use crate::vanity::log::DiscardLog;
    use crate::vanity::packages::Package;

    fn get(target: &str) -> Request {
        RequestBuilder::new()
            .method(Method::GET)
            .path(target)
            .header("Host", "kkn.fi")
            .build()
            .unwrap()
    }

    fn resolver() -> Resolver {
        Resolver::builder()
            .vcs_url("https://github.com/kare")
            .log(Arc::new(DiscardLog))
            .build()
            .unwrap()
    }

    #[test]
    fn resolve_folds_deep_paths() {
        let r = resolver();
        let a = r.resolve("kkn.fi", "/pkgabc/sub/foo");
        let b = r.resolve("kkn.fi", "/pkgabc/sub");
        assert_eq!(a.vcs_root, "https://github.com/kare/pkgabc");
        assert_eq!(a.vcs_root, b.vcs_root);
        assert_eq!(a.import_root, "kkn.fi/pkgabc/sub/foo");
    }

    #[test]
    fn registered_package_overrides_base() {
        let r = Resolver::builder()
            .vcs_url("https://github.com/kare")
            .packages(Packages::new(vec![
                Package::new("/set", "hg", "https://bitbucket.org/kare/set"),
                Package::new("/cmd/tool", "hg", "https://hg.example/tool"),
            ]))
            .build()
            .unwrap();
        let p = r.resolve("kkn.fi", "/set/sub");
        assert_eq!(p.vcs, "hg");
        assert_eq!(p.vcs_root, "https://bitbucket.org/kare/set");
        assert_eq!(r.resolve("kkn.fi", "/gist").vcs, "git");

        let p = r.resolve("kkn.fi", "/cmd/tool/sub");
        assert_eq!(p.vcs, "hg");
        assert_eq!(p.vcs_root, "https://hg.example/tool");
        assert_eq!(p.import_root, "kkn.fi/cmd/tool/sub");
    }

    #[tokio::test]
    async fn go_get_flag_must_be_one() {
        let r = resolver();
        for (target, status) in [
            ("/gist?go-get=1", StatusCode::Ok),
            ("/gist?x=y&go-get=1", StatusCode::Ok),
            ("/gist?go-get=0", StatusCode::TemporaryRedirect),
            ("/gist", StatusCode::TemporaryRedirect),
        ] {
            assert_eq!(r.handle(&get(target)).await.status, status, "{}", target);
        }
    }

    #[tokio::test]
    async fn request_without_host_is_bad_request() {
        let req = RequestBuilder::new()
            .method(Method::GET)
            .path("/gist?go-get=1")
            .build()
            .unwrap();
        assert_eq!(resolver().handle(&req).await.status, StatusCode::BadRequest);
    }
}
