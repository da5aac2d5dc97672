//! HTTP connection abstraction and middleware toolkit.
//!
//! A [`Conn`] is created by an [`Adapter`] for each request and threaded through a
//! [`Pipeline`] of plugs. Plugs read the request, fetch parameters and cookies, and set or send
//! the response through the adapter.
//!
//! The wire codecs are usable on their own:
//!
//! - [`query`], nested `x-www-form-urlencoded` decoding and encoding,
//! - [`multipart`], incremental `multipart/*` parsing without io,
//! - [`cookie`], `cookie` decoding and `set-cookie` encoding.
#![warn(missing_debug_implementations)]

mod log;
mod matches;

pub mod common;
pub mod headers;
pub mod utils;

pub mod cookie;
pub mod multipart;
pub mod query;

pub mod adapter;
pub mod body;
pub mod conn;
pub mod upload;

pub mod parsers;
pub mod pipeline;
pub mod testing;

pub use adapter::{Adapter, AdapterError};
pub use conn::{Conn, ConnError};
pub use parsers::{Parsers, ParsersOptions};
pub use pipeline::{Pipeline, Plug, from_fn};
