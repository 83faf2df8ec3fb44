//! Vanity - Go vanity import server
//!
//! Core library for HTTP handling and vanity import resolution.

pub mod config;
pub mod http;
pub mod server;
pub mod static_files;
pub mod vanity;
