//! `BoxFind` - Streaming nearby-point search over large delimited coordinate files.
//!
//! Open a file with [`controller::open_file`] (or a [`controller::Session`]),
//! then run a [`scan::Scanner`] directly or on a worker thread through
//! [`controller::SearchHandle`].

#![deny(
    missing_debug_implementations,
    missing_docs,
    clippy::all,
    clippy::pedantic,
    clippy::nursery
)]

pub mod alloc;
pub mod cancel;
pub mod controller;
pub mod error;
pub mod history;
pub mod query;
pub mod resolve;
pub mod scan;
pub mod types;
