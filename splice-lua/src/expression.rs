//! Mapping expression evaluation
//!
//! A mapping expression is Lua source evaluated against the step input, which
//! is bound to the global `input`. Two forms are accepted:
//!
//! - a bare expression, e.g. `{ tempC = (input.temp_f - 32) * 5 / 9 }`
//! - a chunk ending in `return`, for mappings that need locals or loops
//!
//! The returned Lua value is converted back to JSON. Functions, userdata and
//! tables mixing array and map keys cannot be represented and are rejected.
//!
//! Every evaluation runs under [`Limits`]: an instruction hook aborts the
//! expression once its time budget is spent, and the Lua allocator refuses
//! to grow past the memory budget.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use mlua::{HookTriggers, Lua, LuaSerdeExt, Value as LuaValue, VmState};
use serde_json::Value;
use thiserror::Error;

use crate::module::ModuleRegistry;
use crate::sandbox::create_sandbox;

#[derive(Debug, Error)]
pub enum ExpressionError {
    #[error("Mapping expression is empty")]
    Empty,

    #[error("Failed to prepare sandbox: {0}")]
    Sandbox(String),

    #[error("Failed to bind input: {0}")]
    Input(String),

    #[error("Mapping expression does not compile: {0}")]
    Syntax(String),

    #[error("Mapping expression failed: {0}")]
    Runtime(String),

    #[error("Mapping result is not representable as JSON: {0}")]
    Output(String),

    #[error("Mapping expression exceeded its time budget of {0:?}")]
    TimeBudget(Duration),

    #[error("Mapping expression exceeded its memory budget of {0} bytes")]
    MemoryBudget(usize),
}

/// VM instructions between deadline checks
const HOOK_INTERVAL: u32 = 10_000;

/// Resource budget for a single evaluation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Limits {
    /// Wall-clock time the expression may run for
    pub time: Duration,
    /// Bytes the expression may allocate on top of the bound input
    pub memory: usize,
}

impl Default for Limits {
    fn default() -> Self {
        Self {
            time: Duration::from_secs(5),
            memory: 64 * 1024 * 1024,
        }
    }
}

/// Evaluate an expression with the built-in helper modules
///
/// # Example
/// ```
/// use serde_json::json;
///
/// let out = splice_lua::evaluate(
///     "{ tempC = util.round((input.temp_f - 32) * 5 / 9, 1) }",
///     &json!({ "temp_f": 72 }),
/// )?;
/// assert_eq!(out, json!({ "tempC": 22.2 }));
/// # Ok::<(), splice_lua::ExpressionError>(())
/// ```
pub fn evaluate(expression: &str, input: &Value) -> Result<Value, ExpressionError> {
    evaluate_with(&ModuleRegistry::with_builtins(), expression, input)
}

/// Evaluate an expression with a caller-supplied module registry and default limits
pub fn evaluate_with(
    registry: &ModuleRegistry,
    expression: &str,
    input: &Value,
) -> Result<Value, ExpressionError> {
    evaluate_limited(registry, expression, input, Limits::default())
}

/// Evaluate an expression under explicit time and memory limits
pub fn evaluate_limited(
    registry: &ModuleRegistry,
    expression: &str,
    input: &Value,
    limits: Limits,
) -> Result<Value, ExpressionError> {
    let source = expression.trim();
    if source.is_empty() {
        return Err(ExpressionError::Empty);
    }

    let lua = create_sandbox(registry).map_err(|e| ExpressionError::Sandbox(e.to_string()))?;

    let bound = lua
        .to_value(input)
        .map_err(|e| ExpressionError::Input(e.to_string()))?;
    lua.globals()
        .set("input", bound)
        .map_err(|e| ExpressionError::Input(e.to_string()))?;

    let function = compile(&lua, source)?;

    let expired = Arc::new(AtomicBool::new(false));
    arm(&lua, limits, expired.clone())?;

    let result: LuaValue = function.call(()).map_err(|e| {
        if expired.load(Ordering::Relaxed) {
            ExpressionError::TimeBudget(limits.time)
        } else if is_out_of_memory(&e) {
            ExpressionError::MemoryBudget(limits.memory)
        } else {
            ExpressionError::Runtime(e.to_string())
        }
    })?;
    lua.remove_hook();

    lua.from_value(result)
        .map_err(|e| ExpressionError::Output(e.to_string()))
}

/// Installs the deadline hook and caps allocation above what is already in use
fn arm(lua: &Lua, limits: Limits, expired: Arc<AtomicBool>) -> Result<(), ExpressionError> {
    let deadline = Instant::now() + limits.time;
    lua.set_hook(
        HookTriggers::new().every_nth_instruction(HOOK_INTERVAL),
        move |_lua, _debug| {
            if Instant::now() >= deadline {
                expired.store(true, Ordering::Relaxed);
                return Err(mlua::Error::runtime("time budget exhausted"));
            }
            Ok(VmState::Continue)
        },
    )
    .map_err(|e| ExpressionError::Sandbox(e.to_string()))?;

    let ceiling = lua.used_memory().saturating_add(limits.memory);
    lua.set_memory_limit(ceiling)
        .map_err(|e| ExpressionError::Sandbox(e.to_string()))?;
    Ok(())
}

/// Allocator failures surface as `MemoryError`; the auxiliary buffer used by
/// `string.rep` and friends raises a plain runtime error instead
fn is_out_of_memory(error: &mlua::Error) -> bool {
    match error {
        mlua::Error::MemoryError(_) => true,
        mlua::Error::RuntimeError(message) => message.contains("not enough memory"),
        mlua::Error::CallbackError { cause, .. } => is_out_of_memory(cause),
        _ => false,
    }
}

/// Compiles a bare expression as `return <expr>`, falling back to the chunk as written
fn compile(lua: &Lua, source: &str) -> Result<mlua::Function, ExpressionError> {
    if let Ok(function) = lua
        .load(format!("return {}", source))
        .set_name("expression")
        .into_function()
    {
        return Ok(function);
    }

    lua.load(source)
        .set_name("expression")
        .into_function()
        .map_err(|e| ExpressionError::Syntax(e.to_string()))
}
