//! Line-oriented package registry.
//!
//! Each non-blank line holds three whitespace-separated fields:
//!
//! ```text
//! /gist           git  https://github.com/kare/gist
//! /vanity/cmd     git  https://github.com/kare/vanity
//! ```
//!
//! Registered paths are folded the same way request paths are, so the second
//! line above registers `vanity` and `/cmd/tool` registers `tool`.

use std::io::BufRead;

use crate::config::ConfigError;
use crate::vanity::paths::repository_segment;

/// A package with an explicitly registered repository.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Package {
    /// Path as registered, e.g. `/vanity/cmd/vanity`.
    pub path: String,
    /// Repository segment the path folds to, e.g. `vanity`.
    pub segment: String,
    /// Version control system, usually `git` or `hg`.
    pub vcs: String,
    /// Repository URL.
    pub url: String,
}

impl Package {
    pub fn new(path: &str, vcs: impl Into<String>, url: impl Into<String>) -> Self {
        let path = format!("/{}", path.trim_start_matches('/'));
        Self {
            segment: repository_segment(&path).unwrap_or_default().to_string(),
            path,
            vcs: vcs.into(),
            url: url.into(),
        }
    }
}

/// Registered packages. Later records win over earlier ones for the same path.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Packages {
    entries: Vec<Package>,
}

impl Packages {
    pub fn new(entries: Vec<Package>) -> Self {
        Self { entries }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Package registered for a repository segment (without slashes).
    pub fn lookup(&self, segment: &str) -> Option<&Package> {
        self.entries
            .iter()
            .rev()
            .find(|p| !p.segment.is_empty() && p.segment == segment)
    }
}

/// Reads package records. Blank lines are skipped; any line without exactly
/// three fields fails with the offending line number.
pub fn read_packages<R: BufRead>(reader: R) -> Result<Packages, ConfigError> {
    let mut entries = Vec::new();
    for (index, line) in reader.lines().enumerate() {
        let line = line.map_err(ConfigError::Io)?;
        let fields: Vec<&str> = line.split_whitespace().collect();
        match fields.as_slice() {
            [] => continue,
            [path, vcs, url] => entries.push(Package::new(path, *vcs, *url)),
            _ => {
                return Err(ConfigError::Package {
                    line: index + 1,
                    text: line.clone(),
                });
            }
        }
    }
    Ok(Packages::new(entries))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_records_and_skips_blank_lines() {
        let config = "/gist\tgit\thttps://github.com/kare/gist\n\n/vanity git https://github.com/kare/vanity\n";
        let packages = read_packages(config.as_bytes()).unwrap();
        assert_eq!(packages.len(), 2);
        assert_eq!(
            packages.lookup("gist"),
            Some(&Package::new("/gist", "git", "https://github.com/kare/gist"))
        );
    }

    #[test]
    fn nested_paths_register_first_segment() {
        let config = "/vanity/cmd/vanity git https://github.com/kare/vanity";
        let packages = read_packages(config.as_bytes()).unwrap();
        let pkg = packages.lookup("vanity").unwrap();
        assert_eq!(pkg.path, "/vanity/cmd/vanity");
        assert_eq!(pkg.segment, "vanity");
    }

    #[test]
    fn command_paths_register_command_segment() {
        let config = "/cmd/tool hg https://hg.example/tool";
        let packages = read_packages(config.as_bytes()).unwrap();
        assert_eq!(packages.lookup("tool").unwrap().url, "https://hg.example/tool");
        assert!(packages.lookup("cmd").is_none());
    }

    #[test]
    fn broken_record_reports_line() {
        let config = "/gist git https://github.com/kare/gist\n/set git";
        match read_packages(config.as_bytes()) {
            Err(ConfigError::Package { line, text }) => {
                assert_eq!(line, 2);
                assert_eq!(text, "/set git");
            }
            other => panic!("expected package error, got {:?}", other),
        }
    }

    #[test]
    fn later_record_wins() {
        let config = "/gist git https://a/gist\n/gist hg https://b/gist\n";
        let packages = read_packages(config.as_bytes()).unwrap();
        assert_eq!(packages.lookup("gist").unwrap().vcs, "hg");
    }
}
