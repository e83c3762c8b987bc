//! Splice Core
//!
//! Core types and abstractions for the Splice API-integration engine.
//!
//! This crate contains:
//! - Domain types: configs (API call, extraction, transformation) and run records
//! - DTOs: request and response bodies shared by the server and its clients

pub mod domain;
pub mod dto;
