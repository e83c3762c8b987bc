//! Data Transfer Objects
//!
//! Request and response bodies exchanged between the Splice server and its
//! clients. The engine consumes the input types directly.

pub mod config;
pub mod execute;
