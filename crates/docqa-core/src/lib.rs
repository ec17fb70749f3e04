//! # docqa core
//!
//! Backend-agnostic logic for docqa: document models, the error taxonomy,
//! the sliding-window chunker, the immutable vector index, prompt
//! assembly, and the [`Embedder`](embedding::Embedder) /
//! [`Generator`](generation::Generator) traits that concrete backends
//! implement.
//!
//! This crate contains no tokio, network, or filesystem code. Loading
//! documents and talking to model servers lives in the `docqa` app crate.

pub mod chunk;
pub mod embedding;
pub mod error;
pub mod generation;
pub mod index;
pub mod models;
pub mod prompt;

pub use error::{Error, ErrorKind, Result};
