//! Static file tree mounted under a URL prefix.
//!
//! The directory is validated once when the mount is created; requests
//! afterwards only touch the filesystem to read what they ask for.

use std::fmt::Write;
use std::path::{Path, PathBuf};

use crate::http::response::{HTML_CONTENT_TYPE, Response, ResponseBuilder, StatusCode, escape_html};

/// Why a static directory was refused.
#[derive(Debug)]
pub enum StaticDirError {
    EmptyPath,
    RootPrefix,
    NotFound(PathBuf),
    NotADirectory(PathBuf),
    Permission(PathBuf),
    Io(PathBuf, std::io::Error),
}

impl std::fmt::Display for StaticDirError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StaticDirError::EmptyPath => write!(f, "static directory path is empty"),
            StaticDirError::RootPrefix => {
                write!(f, "static directory cannot be mounted at the site root")
            }
            StaticDirError::NotFound(p) => {
                write!(f, "static directory {} does not exist", p.display())
            }
            StaticDirError::NotADirectory(p) => {
                write!(f, "static directory {} is not a directory", p.display())
            }
            StaticDirError::Permission(p) => write!(
                f,
                "static directory {} must be readable and searchable by its owner",
                p.display()
            ),
            StaticDirError::Io(p, e) => write!(f, "static directory {}: {}", p.display(), e),
        }
    }
}

impl std::error::Error for StaticDirError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            StaticDirError::Io(_, e) => Some(e),
            _ => None,
        }
    }
}

/// A local directory served below a URL mount prefix.
#[derive(Debug, Clone)]
pub struct StaticDir {
    root: PathBuf,
    prefix: String,
}

impl StaticDir {
    /// Validates `path` and normalizes `prefix` to `/name/`.
    ///
    /// An empty or `/` prefix is refused: a mount at the root would answer
    /// every import path.
    pub fn new(path: impl AsRef<Path>, prefix: &str) -> Result<Self, StaticDirError> {
        let root = path.as_ref();
        if root.as_os_str().is_empty() {
            return Err(StaticDirError::EmptyPath);
        }
        let prefix = normalize_prefix(prefix);
        if prefix == "/" {
            return Err(StaticDirError::RootPrefix);
        }
        let meta = match std::fs::metadata(root) {
            Ok(meta) => meta,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(StaticDirError::NotFound(root.to_path_buf()));
            }
            Err(e) => return Err(StaticDirError::Io(root.to_path_buf(), e)),
        };
        if !meta.is_dir() {
            return Err(StaticDirError::NotADirectory(root.to_path_buf()));
        }
        check_permissions(root, &meta)?;

        Ok(Self {
            root: root.to_path_buf(),
            prefix,
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Mount prefix, always with leading and trailing `/`.
    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Request path relative to the mount, if the path is under it.
    pub fn strip<'a>(&self, path: &'a str) -> Option<&'a str> {
        path.strip_prefix(&self.prefix)
    }

    /// The directory's own `index.html`, served as the site home page.
    pub async fn index(&self) -> Response {
        read_file(&self.root.join("index.html")).await
    }

    /// Serves `relative` (the decoded request path with the prefix removed).
    pub async fn serve(&self, relative: &str) -> Response {
        if relative.split('/').any(|segment| segment == "..") {
            return Response::not_found();
        }

        let relative = relative.trim_start_matches('/');
        let full_path = self.root.join(relative);

        let meta = match tokio::fs::metadata(&full_path).await {
            Ok(meta) => meta,
            Err(_) => return Response::not_found(),
        };

        if meta.is_dir() {
            let index = full_path.join("index.html");
            if tokio::fs::metadata(&index).await.is_ok_and(|m| m.is_file()) {
                return read_file(&index).await;
            }
            let request_path = format!("{}{}", self.prefix, relative);
            return directory_listing(&full_path, &request_path).await;
        }

        read_file(&full_path).await
    }
}

fn normalize_prefix(prefix: &str) -> String {
    let inner = prefix.trim_matches('/');
    if inner.is_empty() {
        "/".to_string()
    } else {
        format!("/{}/", inner)
    }
}

#[cfg(unix)]
fn check_permissions(root: &Path, meta: &std::fs::Metadata) -> Result<(), StaticDirError> {
    use std::os::unix::fs::PermissionsExt;

    if meta.permissions().mode() & 0o500 != 0o500 {
        return Err(StaticDirError::Permission(root.to_path_buf()));
    }
    Ok(())
}

#[cfg(not(unix))]
fn check_permissions(root: &Path, _meta: &std::fs::Metadata) -> Result<(), StaticDirError> {
    std::fs::read_dir(root)
        .map(|_| ())
        .map_err(|_| StaticDirError::Permission(root.to_path_buf()))
}

fn content_type(path: &Path) -> String {
    let mime = mime_guess::from_path(path).first_or_octet_stream();
    if mime.type_() == mime_guess::mime::TEXT {
        format!("{}; charset=utf-8", mime.essence_str())
    } else {
        mime.essence_str().to_string()
    }
}

async fn read_file(path: &Path) -> Response {
    match tokio::fs::read(path).await {
        Ok(body) => ResponseBuilder::new(StatusCode::Ok)
            .header("Content-Type", content_type(path))
            .body(body)
            .build(),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Response::not_found(),
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "static file unreadable");
            Response::internal_error()
        }
    }
}

async fn directory_listing(path: &Path, request_path: &str) -> Response {
    let mut entries = match tokio::fs::read_dir(path).await {
        Ok(entries) => entries,
        Err(_) => return Response::not_found(),
    };

    let mut items = Vec::new();
    while let Ok(Some(entry)) = entries.next_entry().await {
        if let Ok(name) = entry.file_name().into_string() {
            let is_dir = entry.file_type().await.map(|t| t.is_dir()).unwrap_or(false);
            items.push((name, is_dir));
        }
    }
    items.sort();

    let base = if request_path.ends_with('/') {
        request_path.to_string()
    } else {
        format!("{}/", request_path)
    };
    let title = escape_html(&base);
    let mut html = format!(
        "<html><head><title>Index of {}</title></head><body><h1>Index of {}</h1><ul>",
        title, title
    );
    for (name, is_dir) in items {
        let display_name = if is_dir { format!("{}/", name) } else { name };
        let _ = write!(
            html,
            "<li><a href=\"{}{}\">{}</a></li>",
            escape_html(&base),
            escape_html(&display_name),
            escape_html(&display_name)
        );
    }
    html.push_str("</ul></body></html>");

    ResponseBuilder::new(StatusCode::Ok)
        .header("Content-Type", HTML_CONTENT_TYPE)
        .body(html.into_bytes())
        .build()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prefix_is_normalized() {
        assert_eq!(normalize_prefix("dir"), "/dir/");
        assert_eq!(normalize_prefix("/.static/"), "/.static/");
        assert_eq!(normalize_prefix("/files"), "/files/");
    }

    #[test]
    fn content_type_follows_extension() {
        assert_eq!(content_type(Path::new("a/style.css")), "text/css; charset=utf-8");
        assert_eq!(content_type(Path::new("data.csv")), "text/csv; charset=utf-8");
        assert_eq!(content_type(Path::new("clip.mp4")), "video/mp4");
        assert_eq!(content_type(Path::new("logo.svg")), "image/svg+xml");
        assert_eq!(content_type(Path::new("blob")), "application/octet-stream");
    }

    #[test]
    fn rejects_root_mount() {
        let dir = tempfile::tempdir().unwrap();
        for prefix in ["", "/", "//"] {
            assert!(
                matches!(StaticDir::new(dir.path(), prefix), Err(StaticDirError::RootPrefix)),
                "prefix {:?} accepted",
                prefix
            );
        }
        assert!(StaticDir::new(dir.path(), "files").is_ok());
    }

    #[test]
    fn rejects_missing_and_file_paths() {
        assert!(matches!(StaticDir::new("", "/files/"), Err(StaticDirError::EmptyPath)));
        assert!(matches!(
            StaticDir::new("/not/found/anywhere", "/files/"),
            Err(StaticDirError::NotFound(_))
        ));
        let file = tempfile::NamedTempFile::new().unwrap();
        assert!(matches!(
            StaticDir::new(file.path(), "/files/"),
            Err(StaticDirError::NotADirectory(_))
        ));
    }

    #[cfg(unix)]
    #[test]
    fn rejects_directory_without_owner_access() {
        use std::os::unix::fs::PermissionsExt;

        for mode in [0o000, 0o111, 0o222, 0o444, 0o004, 0o040, 0o400] {
            let dir = tempfile::tempdir().unwrap();
            std::fs::set_permissions(dir.path(), std::fs::Permissions::from_mode(mode)).unwrap();
            let result = StaticDir::new(dir.path(), "/files/");
            std::fs::set_permissions(dir.path(), std::fs::Permissions::from_mode(0o700)).unwrap();
            assert!(
                matches!(result, Err(StaticDirError::Permission(_))),
                "mode {:o} accepted",
                mode
            );
        }
    }

    #[tokio::test]
    async fn serves_files_and_listings() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("hello.txt"), "hi\n").unwrap();
        std::fs::create_dir(dir.path().join("sub")).unwrap();
        let mount = StaticDir::new(dir.path(), "/.static/").unwrap();

        let res = mount.serve("hello.txt").await;
        assert_eq!(res.status, StatusCode::Ok);
        assert_eq!(res.body, b"hi\n".to_vec());
        assert_eq!(res.header("Content-Type"), Some("text/plain; charset=utf-8"));

        let res = mount.serve("").await;
        let body = String::from_utf8(res.body).unwrap();
        assert!(body.contains("<a href=\"/.static/hello.txt\">hello.txt</a>"));
        assert!(body.contains("<a href=\"/.static/sub/\">sub/</a>"));

        assert_eq!(mount.serve("missing.txt").await.status, StatusCode::NotFound);
    }

    #[tokio::test]
    async fn parent_segments_are_not_found() {
        let outer = tempfile::tempdir().unwrap();
        std::fs::write(outer.path().join("secret.txt"), "secret\n").unwrap();
        let inner = outer.path().join("public");
        std::fs::create_dir(&inner).unwrap();
        let mount = StaticDir::new(&inner, "/.static/").unwrap();

        for relative in ["../secret.txt", "sub/../../secret.txt", ".."] {
            let res = mount.serve(relative).await;
            assert_eq!(res.status, StatusCode::NotFound, "{}", relative);
            assert!(!res.body.starts_with(b"secret"));
        }
    }

    #[tokio::test]
    async fn index_reads_root_index_html() {
        let dir = tempfile::tempdir().unwrap();
        let mount = StaticDir::new(dir.path(), "dir").unwrap();
        assert_eq!(mount.index().await.status, StatusCode::NotFound);

        std::fs::write(dir.path().join("index.html"), "<html>homepage</html>\n").unwrap();
        let res = mount.index().await;
        assert_eq!(res.status, StatusCode::Ok);
        assert_eq!(res.header("Content-Type"), Some("text/html; charset=utf-8"));
        assert_eq!(res.body, b"<html>homepage</html>\n".to_vec());
    }
}
