//! Core of the chatline client.
//!
//! - `stream`: folds network fragments into a growing response buffer
//! - `render`: splits a buffer into a markdown document and callout blocks
//! - `conversation`: transcript and the single-stream session controller
//! - `client`: HTTP transport to the chat backend
//!
//! `config`, `logging` and `interrupt` carry the process-wide plumbing.

pub mod callout;
pub mod client;
pub mod config;
pub mod conversation;
pub mod interrupt;
pub mod logging;
pub mod render;
pub mod stream;
