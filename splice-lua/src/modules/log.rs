//! `log` module forwarding expression diagnostics to `tracing`

use crate::module::SpliceModule;
use mlua::prelude::*;
use tracing::{debug, info, warn};

pub struct LogModule;

impl SpliceModule for LogModule {
    fn id(&self) -> &'static str {
        "log"
    }

    fn register(&self, lua: &Lua) -> LuaResult<()> {
        let log = lua.create_table()?;

        log.set(
            "debug",
            lua.create_function(|_, msg: String| {
                debug!(target: "splice_lua::expression", "{}", msg);
                Ok(())
            })?,
        )?;
        log.set(
            "info",
            lua.create_function(|_, msg: String| {
                info!(target: "splice_lua::expression", "{}", msg);
                Ok(())
            })?,
        )?;
        log.set(
            "warn",
            lua.create_function(|_, msg: String| {
                warn!(target: "splice_lua::expression", "{}", msg);
                Ok(())
            })?,
        )?;

        lua.globals().set(self.id(), log)?;
        Ok(())
    }

    fn describe(&self) -> String {
        "log.debug(msg), log.info(msg), log.warn(msg): diagnostics, no effect on the result"
            .to_string()
    }
}
