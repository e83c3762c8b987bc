//! Lua sandbox creation
//!
//! Mapping expressions come from users and from the generation oracle, so
//! they run in a restricted Lua state: only the table, string and math
//! libraries are loaded, and every way of reaching the host (files, modules,
//! dynamic code loading, stdout) is removed before helper modules are added.

use mlua::{Lua, LuaOptions, Result as LuaResult, StdLib};

use crate::module::ModuleRegistry;

/// Globals removed from the base library
const BLOCKED_GLOBALS: &[&str] = &[
    "require",
    "dofile",
    "loadfile",
    "load",
    "print",
    "collectgarbage",
];

/// Create a restricted Lua sandbox with the registry's modules loaded
///
/// # Example
/// ```
/// use splice_lua::{ModuleRegistry, create_sandbox};
///
/// let lua = create_sandbox(&ModuleRegistry::with_builtins())?;
/// let rounded: f64 = lua.load("return util.round(1.26, 1)").eval()?;
/// assert_eq!(rounded, 1.3);
/// # Ok::<(), mlua::Error>(())
/// ```
pub fn create_sandbox(registry: &ModuleRegistry) -> LuaResult<Lua> {
    let lua = Lua::new_with(
        StdLib::TABLE | StdLib::STRING | StdLib::MATH,
        LuaOptions::default(),
    )?;

    let globals = lua.globals();
    for name in BLOCKED_GLOBALS {
        globals.set(*name, mlua::Nil)?;
    }

    registry.register_all(&lua)?;

    Ok(lua)
}
