//! Splice engine
//!
//! Self-healing execution of API-integration configs: a call config fetches
//! data, an extract config selects from it, a transform config reshapes it.
//! Outputs are checked against JSON Schemas and failing configs are repaired
//! by a language model within a bounded retry budget.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use serde_json::json;
//! use splice_core::dto::execute::CallInput;
//! use splice_engine::{Engine, EngineConfig, MemoryStore, SpliceService};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = EngineConfig::from_env()?;
//!     let engine = Arc::new(Engine::from_config(&config)?);
//!     let service = SpliceService::new(engine, Arc::new(MemoryStore::new()));
//!
//!     let run = service
//!         .run_pipeline(vec![], CallInput::from_payload(json!({"city": "Paris"})))
//!         .await?;
//!     println!("run {} finished as {}", run.id, run.status);
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod error;
pub mod executor;
pub mod http;
pub mod oracle;
pub mod pipeline;
pub mod prompts;
pub mod repair;
pub mod schema;
mod schema_gen;
pub mod select;
pub mod service;
pub mod store;
pub mod template;

#[cfg(test)]
mod testing;

pub use config::EngineConfig;
pub use error::{CallFailureKind, EngineError, Result};
pub use executor::{ConfigExecutor, Engine};
pub use oracle::{CompletionOptions, Message, OpenAiOracle, Oracle, OracleError, ResponseFormat};
pub use pipeline::{NoopObserver, Pipeline, RunObserver};
pub use repair::{RepairLoop, RetryPolicy, TemperatureRamp};
pub use schema::{ValidationResult, Violation, validate};
pub use service::SpliceService;
pub use store::{MemoryStore, Store, StoreError};
