//! Core domain types
//!
//! The structures here are shared between the engine (which executes and
//! repairs configs), the server (which persists them) and the client.

pub mod config;
pub mod run;
