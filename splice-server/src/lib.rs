//! Splice server
//!
//! HTTP surface over the splice engine, backed by Postgres.

pub mod api;
pub mod db;
pub mod repository;
pub mod state;
pub mod store;
