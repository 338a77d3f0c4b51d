//! Compass is a terminal career-guidance chat client for hosted LLM APIs.
//!
//! The crate is organized around a small set of collaborating layers:
//! - [`core`] owns the persisted profile and conversation documents, prompt
//!   assembly, knowledge-base retrieval, the inference client, and the
//!   session controller that ties them together.
//! - [`ui`] renders the terminal interface and runs the interactive event loop
//!   that feeds user input into the session controller.
//! - [`cli`] parses arguments and dispatches the one-shot commands.
//! - [`api`] defines the chat-completions payloads exchanged with the endpoint.
//!
//! Runtime entrypoints live in the binary crate (`src/main.rs`) and route
//! through [`crate::cli::main`].

pub mod api;
pub mod cli;
pub mod core;
pub mod ui;
pub mod utils;
