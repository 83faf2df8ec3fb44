//! Vanity import resolution.
//!
//! A [`Resolver`] answers requests for paths under a vanity domain: the go
//! tool gets a `go-import` meta tag pointing at the repository, browsers are
//! redirected to a module index.
//!
//! ```
//! use vanity::vanity::Resolver;
//!
//! let resolver = Resolver::builder()
//!     .vcs("git")
//!     .vcs_url("https://github.com/kare")
//!     .host("kkn.fi")
//!     .build()
//!     .unwrap();
//! let package = resolver.resolve("kkn.fi", "/cmd/vanity");
//! assert_eq!(package.vcs_root, "https://github.com/kare/vanity");
//! ```

pub mod log;
pub mod options;
pub mod packages;
pub mod paths;
pub mod resolver;

pub use log::{DiscardLog, ErrorLog, MemoryLog, TracingLog};
pub use options::{
    DEFAULT_ROBOTS_TXT, FileIndexPage, IndexPage, ResolverBuilder, ResolverError, StaticIndexPage,
};
pub use packages::{Package, Packages, read_packages};
pub use resolver::{PackageRef, Resolver};
