//! Repository Layer
//!
//! Database access for configs and runs. Free functions over a pool or
//! connection; (de)serialization of domain types happens in the store.

pub mod config;
pub mod run;
