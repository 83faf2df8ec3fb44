//! Process configuration.
//!
//! Settings come from an optional YAML file named by `VANITY_CONFIG`; the
//! `LISTEN` environment variable overrides the listen address.
//!
//! ```yaml
//! listen: 0.0.0.0:8080
//! vcs: git
//! vcs_url: https://github.com/kare
//! module_server_url: https://pkg.go.dev
//! host: kkn.fi
//! static_dir:
//!   path: ./static
//!   prefix: /.static/
//! index_page: ./static/index.html
//! packages: ./vanity.conf
//! ```

use std::fs;
use std::fs::File;
use std::io::BufReader;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::vanity::{ResolverBuilder, read_packages};

pub const DEFAULT_LISTEN_ADDR: &str = "127.0.0.1:8080";

/// Error type for configuration loading.
#[derive(Debug)]
pub enum ConfigError {
    Io(std::io::Error),
    Parse(serde_yaml::Error),
    /// A package record without exactly three fields.
    Package { line: usize, text: String },
    ListenAddr(String),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::Io(e) => write!(f, "IO error: {}", e),
            ConfigError::Parse(e) => write!(f, "Parse error: {}", e),
            ConfigError::Package { line, text } => {
                write!(f, "configuration error on line {}: {:?}", line, text)
            }
            ConfigError::ListenAddr(addr) => write!(f, "invalid listen address {:?}", addr),
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::Io(e) => Some(e),
            ConfigError::Parse(e) => Some(e),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StaticDirSettings {
    pub path: PathBuf,
    pub prefix: String,
}

/// Contents of the YAML file. Every key is optional.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Settings {
    pub listen: Option<String>,
    pub vcs: Option<String>,
    pub vcs_url: Option<String>,
    pub module_server_url: Option<String>,
    pub host: Option<String>,
    pub static_dir: Option<StaticDirSettings>,
    pub index_page: Option<PathBuf>,
    pub robots_txt: Option<String>,
    pub packages: Option<PathBuf>,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub listen_addr: String,
    pub settings: Settings,
}

impl Config {
    /// Loads from `VANITY_CONFIG` and `LISTEN`.
    pub fn load() -> Result<Self, ConfigError> {
        let path = std::env::var_os("VANITY_CONFIG").map(PathBuf::from);
        let listen = std::env::var("LISTEN").ok();
        Self::load_from(path.as_deref(), listen)
    }

    /// Loads from an optional YAML file with an optional listen override.
    pub fn load_from(path: Option<&Path>, listen: Option<String>) -> Result<Self, ConfigError> {
        let settings = match path {
            Some(path) => {
                let content = fs::read_to_string(path).map_err(ConfigError::Io)?;
                parse_settings(&content)?
            }
            None => Settings::default(),
        };
        Self::from_settings(settings, listen)
    }

    /// Parses an in-memory YAML document.
    pub fn from_yaml_str(yaml: &str) -> Result<Self, ConfigError> {
        Self::from_settings(parse_settings(yaml)?, None)
    }

    fn from_settings(settings: Settings, listen: Option<String>) -> Result<Self, ConfigError> {
        let listen_addr = listen
            .filter(|l| !l.is_empty())
            .or_else(|| settings.listen.clone())
            .unwrap_or_else(|| DEFAULT_LISTEN_ADDR.to_string());
        if listen_addr.parse::<SocketAddr>().is_err() {
            return Err(ConfigError::ListenAddr(listen_addr));
        }
        Ok(Self {
            listen_addr,
            settings,
        })
    }

    /// Resolver settings from the file, with the package registry read.
    ///
    /// URL and directory checks happen in [`ResolverBuilder::build`].
    pub fn resolver_builder(&self) -> Result<ResolverBuilder, ConfigError> {
        let s = &self.settings;
        let mut builder = ResolverBuilder::new();
        if let Some(vcs) = &s.vcs {
            builder = builder.vcs(vcs.clone());
        }
        if let Some(url) = &s.vcs_url {
            builder = builder.vcs_url(url.clone());
        }
        if let Some(url) = &s.module_server_url {
            builder = builder.module_server_url(url.clone());
        }
        if let Some(host) = &s.host {
            builder = builder.host(host.clone());
        }
        if let Some(dir) = &s.static_dir {
            builder = builder.static_dir(dir.path.clone(), dir.prefix.clone());
        }
        if let Some(index) = &s.index_page {
            builder = builder.index_file(index.clone());
        }
        if let Some(robots) = &s.robots_txt {
            builder = builder.robots_txt(robots.clone());
        }
        if let Some(path) = &s.packages {
            let file = File::open(path).map_err(ConfigError::Io)?;
            builder = builder.packages(read_packages(BufReader::new(file))?);
        }
        Ok(builder)
    }
}

fn parse_settings(yaml: &str) -> Result<Settings, ConfigError> {
    if yaml.trim().is_empty() {
        return Ok(Settings::default());
    }
    serde_yaml::from_str(yaml).map_err(ConfigError::Parse)
}
