#![forbid(unsafe_code)]
//! Asynchronous Gopher and Gopher+ server library for Rust.
//!
//! This crate provides a tokio-based implementation of the Gopher protocol
//! (RFC 1436) and its backward-compatible Gopher+ extension, serving a directory
//! tree from the local filesystem.
//!
//! # Overview
//!
//! A Gopher exchange is a single request per connection: the client sends a
//! selector line, the server answers with either a directory listing (a
//! "gophermap") or the raw bytes of a file, and closes the connection.
//!
//! Gopher+ clients mark their request by appending `\t+` after the line
//! terminator. They get extended item types, `+<size>\r\n`-prefixed file
//! transfers and structured `--1` error responses.
//!
//! # Getting Started
//!
//! ```no_run
//! use rsgopher::{Config, srv::srv_async};
//!
//! #[tokio::main]
//! async fn main() -> rsgopher::Result<()> {
//!     let mut config = Config::new("/srv/gopher");
//!     config.port = 7070;
//!     srv_async(config).await
//! }
//! ```
//!
//! # Request Flow
//!
//! 1. **Selector**: [`request::read_request`] accumulates the selector under a
//!    byte and time budget and detects Gopher+ clients
//! 2. **Resolution**: [`path::resolve`] maps the selector below the configured root
//! 3. **Listing**: directories become a [`gophermap::Gophermap`] of [`item::Item`]s
//! 4. **Transfer**: files are streamed by [`response::send_file`]
//! 5. **Errors**: any failure is turned into one protocol-correct error response
//!
//! # Error Handling
//!
//! Every failure is an [`Error`]. At the connection boundary it is mapped to
//! an [`error::ErrorCode`] and written with [`response::send_error`]:
//! - `1` - Item not found (also used for selectors escaping the root)
//! - `2` - Temporary failure
//! - `3` - Item moved
//! - `4` - Unknown error (malformed requests, internal errors)
pub mod config;
pub mod error;
pub mod fs;
pub mod gophermap;
pub mod gophertype;
pub mod item;
pub mod path;
pub mod request;
pub mod response;
pub mod serialize;
pub mod srv;
#[macro_use]
pub mod utils;

pub use crate::config::Config;
pub use crate::error::{Error, ErrorCode};
pub use crate::gophermap::Gophermap;
pub use crate::gophertype::ItemType;
pub use crate::item::Item;
pub use crate::request::Request;
pub use crate::utils::Result;
