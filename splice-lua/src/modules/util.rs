//! `util` helpers for mapping expressions
//!
//! Small numeric and table helpers that generated expressions tend to need:
//! rounding, dotted-path lookups and list mapping that keeps array shape
//! when converted back to JSON.

use crate::module::SpliceModule;
use mlua::prelude::*;

pub struct UtilModule;

/// Creates an empty table that serializes as a JSON array
fn empty_array(lua: &Lua) -> LuaResult<LuaTable> {
    match lua.to_value(&serde_json::Value::Array(Vec::new()))? {
        LuaValue::Table(table) => Ok(table),
        other => Err(LuaError::RuntimeError(format!(
            "expected table for empty array, got {}",
            other.type_name()
        ))),
    }
}

fn round(x: f64, digits: Option<i32>) -> f64 {
    let factor = 10f64.powi(digits.unwrap_or(0));
    (x * factor).round() / factor
}

impl SpliceModule for UtilModule {
    fn id(&self) -> &'static str {
        "util"
    }

    fn register(&self, lua: &Lua) -> LuaResult<()> {
        let util = lua.create_table()?;

        util.set(
            "round",
            lua.create_function(|_, (x, digits): (f64, Option<i32>)| Ok(round(x, digits)))?,
        )?;

        // Numeric segments index arrays, 1-based like Lua itself.
        util.set(
            "get",
            lua.create_function(|_, (root, path): (LuaValue, String)| {
                let mut current = root;
                for segment in path.split('.').filter(|s| !s.is_empty()) {
                    let LuaValue::Table(table) = current else {
                        return Ok(LuaValue::Nil);
                    };
                    current = match segment.parse::<i64>() {
                        Ok(index) => table.raw_get(index)?,
                        Err(_) => table.raw_get(segment)?,
                    };
                }
                Ok(current)
            })?,
        )?;

        util.set(
            "map",
            lua.create_function(|lua, (list, f): (LuaTable, LuaFunction)| {
                let out = empty_array(lua)?;
                for (i, item) in list.sequence_values::<LuaValue>().enumerate() {
                    let mapped: LuaValue = f.call(item?)?;
                    out.raw_set(i + 1, mapped)?;
                }
                Ok(out)
            })?,
        )?;

        util.set(
            "filter",
            lua.create_function(|lua, (list, f): (LuaTable, LuaFunction)| {
                let out = empty_array(lua)?;
                let mut next = 1;
                for item in list.sequence_values::<LuaValue>() {
                    let item = item?;
                    let keep: bool = f.call(item.clone())?;
                    if keep {
                        out.raw_set(next, item)?;
                        next += 1;
                    }
                }
                Ok(out)
            })?,
        )?;

        util.set("array", lua.create_function(|lua, ()| empty_array(lua))?)?;

        lua.globals().set(self.id(), util)?;
        Ok(())
    }

    fn describe(&self) -> String {
        [
            "util.round(x, digits?): x rounded to `digits` decimal places (default 0)",
            "util.get(tbl, \"a.b.1\"): value at a dotted path, nil when missing",
            "util.map(list, fn): new list with fn applied to each element",
            "util.filter(list, fn): new list with the elements for which fn returns true",
            "util.array(): empty list that stays a JSON array when empty",
        ]
        .join("\n")
    }
}
