//! Path arithmetic for vanity imports.
//!
//! Everything here is a pure function of the request path and the resolver
//! settings. Base URLs passed in are expected to end in exactly one `/`.

use crate::http::response::escape_html;

/// Command packages live below this segment and fold to their own repository.
pub const COMMAND_PREFIX: &str = "/cmd/";

/// Hosts whose URLs are browsed as repositories rather than documentation.
const REPOSITORY_HOSTS: &[&str] = &["github.com", "gitlab.com", "bitbucket.org", "codeberg.org"];

/// Where browsers are sent when the request is not from the go tool.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModuleServer {
    /// Documentation index addressed by full import path, e.g. `https://pkg.go.dev/`.
    Documentation(String),
    /// Source hosting account addressed by leaf package name, e.g. `https://github.com/kare/`.
    Repository(String),
}

impl ModuleServer {
    /// Classifies a normalized base URL by its host.
    pub fn classify(base: String, host: &str) -> Self {
        let host = host.trim_start_matches("www.");
        if REPOSITORY_HOSTS.contains(&host) {
            ModuleServer::Repository(base)
        } else {
            ModuleServer::Documentation(base)
        }
    }

    pub fn base(&self) -> &str {
        match self {
            ModuleServer::Documentation(base) | ModuleServer::Repository(base) => base,
        }
    }

    /// Browser redirect target for `path` requested on `host`.
    pub fn target(&self, host: &str, path: &str) -> String {
        match self {
            ModuleServer::Documentation(base) => {
                format!("{}{}{}", base, host, path)
            }
            ModuleServer::Repository(base) => match last_segment(path) {
                Some(leaf) => format!("{}{}", base, leaf),
                None => base.clone(),
            },
        }
    }
}

/// Ensures `url` ends with exactly one `/`.
pub fn with_trailing_slash(url: &str) -> String {
    format!("{}/", url.trim_end_matches('/'))
}

/// Import path announced to the go tool: host plus path, no trailing slash.
pub fn import_root(host: &str, path: &str) -> String {
    format!("{}{}", host, path).trim_end_matches('/').to_string()
}

/// Segment that names the repository a path belongs to.
///
/// `/cmd/` is dropped first so `/cmd/tool/sub` resolves to `tool`; after
/// that the first non-empty segment wins and deeper ones are sub-packages.
pub fn repository_segment(path: &str) -> Option<&str> {
    let path = if path.starts_with(COMMAND_PREFIX) {
        &path[COMMAND_PREFIX.len() - 1..]
    } else {
        path
    };
    path.split('/').find(|s| !s.is_empty())
}

/// Repository URL for `path` under `base`.
pub fn vcs_root(base: &str, path: &str) -> String {
    match repository_segment(path) {
        Some(segment) => format!("{}{}", base, segment),
        None => base.to_string(),
    }
}

fn last_segment(path: &str) -> Option<&str> {
    path.rsplit('/').find(|s| !s.is_empty())
}

/// The `go-import` meta tag.
pub fn meta_tag(import_root: &str, vcs: &str, vcs_root: &str) -> String {
    format!(
        "<meta name=\"go-import\" content=\"{} {} {}\">",
        escape_html(import_root),
        escape_html(vcs),
        escape_html(vcs_root)
    )
}

/// HTML document wrapping the `go-import` meta tag.
pub fn import_document(import_root: &str, vcs: &str, vcs_root: &str) -> String {
    format!(
        "<!DOCTYPE html>\n<html>\n<head>\n<meta http-equiv=\"Content-Type\" content=\"text/html; charset=utf-8\"/>\n{}\n</head>\n</html>\n",
        meta_tag(import_root, vcs, vcs_root)
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    const BASE: &str = "https://github.com/kare/";

    #[test]
    fn folds_sub_packages_to_first_segment() {
        assert_eq!(vcs_root(BASE, "/pkgabc/sub/foo"), "https://github.com/kare/pkgabc");
        assert_eq!(vcs_root(BASE, "/pkgabc/sub"), "https://github.com/kare/pkgabc");
        assert_eq!(vcs_root(BASE, "//pkgabc//sub/"), "https://github.com/kare/pkgabc");
    }

    #[test]
    fn strips_command_prefix() {
        assert_eq!(vcs_root(BASE, "/cmd/tool/"), "https://github.com/kare/tool");
        assert_eq!(vcs_root(BASE, "/cmd/tool/internal/x"), "https://github.com/kare/tool");
        assert_eq!(vcs_root(BASE, "/cmd"), "https://github.com/kare/cmd");
        assert_eq!(vcs_root(BASE, "/command/x"), "https://github.com/kare/command");
    }

    #[test]
    fn empty_path_keeps_base() {
        assert_eq!(vcs_root(BASE, "/"), BASE);
        assert_eq!(vcs_root(BASE, "/cmd/"), BASE);
    }

    #[test]
    fn import_root_drops_trailing_slash() {
        assert_eq!(import_root("kkn.fi", "/set/"), "kkn.fi/set");
        assert_eq!(import_root("kkn.fi", "/cmd/vanity"), "kkn.fi/cmd/vanity");
    }

    #[test]
    fn trailing_slash_normalized() {
        assert_eq!(with_trailing_slash("https://pkg.go.dev"), "https://pkg.go.dev/");
        assert_eq!(with_trailing_slash("https://pkg.go.dev//"), "https://pkg.go.dev/");
    }

    #[test]
    fn documentation_target_keeps_full_path() {
        let server = ModuleServer::classify("https://pkg.go.dev/".into(), "pkg.go.dev");
        assert_eq!(server.target("kkn.fi", "/gist"), "https://pkg.go.dev/kkn.fi/gist");
        assert_eq!(
            server.target("kkn.fi", "/pkgabc/sub/foo"),
            "https://pkg.go.dev/kkn.fi/pkgabc/sub/foo"
        );
    }

    #[test]
    fn repository_target_uses_leaf() {
        let server = ModuleServer::classify(BASE.into(), "github.com");
        assert!(matches!(server, ModuleServer::Repository(_)));
        assert_eq!(server.target("kkn.fi", "/cmd/healthcheck"), "https://github.com/kare/healthcheck");
        assert_eq!(server.target("kkn.fi", "/vanity/"), "https://github.com/kare/vanity");
    }

    #[test]
    fn meta_tag_escapes_attribute() {
        assert_eq!(
            meta_tag("kkn.fi/a\"b", "git", "https://github.com/kare/a"),
            "<meta name=\"go-import\" content=\"kkn.fi/a&#34;b git https://github.com/kare/a\">"
        );
    }
}
