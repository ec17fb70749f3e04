//! # docqa
//!
//! Ask questions about a document. docqa loads a PDF or text file, splits
//! it into overlapping chunks, embeds them, and answers each question with
//! a language model that sees only the best-matching chunks.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────┐   ┌─────────┐   ┌──────────┐   ┌─────────────┐
//! │  Loader  │──▶│ Chunker │──▶│ Embedder │──▶│ VectorIndex │   (once per document)
//! └──────────┘   └─────────┘   └──────────┘   └──────┬──────┘
//!                                                    │ top-k
//!   question ──▶ Embedder ──▶ query ─────────────────┘
//!                                  │
//!                                  ▼
//!                          PromptTemplate ──▶ Generator ──▶ answer
//! ```
//!
//! Pure pieces (models, chunker, index, prompt, errors, backend traits)
//! live in `docqa-core`; this crate adds I/O, HTTP backends, and the CLI.
//!
//! ## Quick Start
//!
//! ```bash
//! docqa --document weekly-farm-info.pdf check
//! docqa --document weekly-farm-info.pdf ask "What pest should be inspected in week 28?"
//! docqa --config ./config/docqa.toml chat --transcript chat.json
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing and validation |
//! | [`loader`] | PDF and text loading |
//! | [`embedding`] | Embedding backends, batching, retry |
//! | [`generation`] | Generation backends |
//! | [`pipeline`] | Build the index, answer questions |
//! | [`session`] | Pipeline lifecycle and rebuild on change |
//! | [`transcript`] | Caller-owned chat log |
//! | [`commands`] | CLI command implementations |

pub mod commands;
pub mod config;
pub mod embedding;
pub mod generation;
pub mod http;
pub mod loader;
pub mod pipeline;
pub mod retry;
pub mod session;
pub mod transcript;

pub use docqa_core::{Error, ErrorKind, Result};
