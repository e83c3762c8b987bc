//! Splice Lua Infrastructure
//!
//! Sandboxed evaluation of transform mapping expressions.
//! It includes:
//! - Module trait and registry for helper modules exposed to expressions
//! - A restricted sandbox with no I/O, no module loading and no code loading
//! - Built-in `util` and `log` helper modules
//! - Expression evaluation from JSON input to JSON output under time and memory limits

pub mod expression;
pub mod module;
pub mod modules;
pub mod sandbox;

pub use expression::{ExpressionError, Limits, evaluate, evaluate_limited, evaluate_with};
pub use module::{ModuleRegistry, SpliceModule};
pub use modules::{LogModule, UtilModule};
pub use sandbox::create_sandbox;
