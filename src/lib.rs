//! `ish`: a small interactive command interpreter.
//!
//! A line is split into words, parsed into a [`types::Pipeline`] and then
//! either handled in-process by a builtin (`cd`, `pwd`, `exit`) or run as a
//! chain of forked processes connected by pipes.

pub mod builtin;
pub mod config;
pub mod error;
pub mod eval;
pub mod global;
pub mod job;
pub mod parser;
pub mod search;
pub mod shell;
pub mod signal;
pub mod tokenizer;
pub mod types;

pub use shell::Shell;
