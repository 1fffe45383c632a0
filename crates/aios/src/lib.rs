//! AIOS library - exposes modules for testing.

pub mod config;
pub mod cpu;
pub mod dispatcher;
pub mod engine;
pub mod error;
pub mod files;
pub mod guard;
pub mod memory;
pub mod ollama;
pub mod parser;
pub mod process;
pub mod prompts;
pub mod router;
pub mod sentinel;
