use mlua::prelude::*;

/// Trait for helper modules available to mapping expressions.
///
/// Each module registers a global table into the sandbox and describes its
/// functions in plain text. The description is handed to the generation
/// oracle so that generated expressions only use helpers that exist.
///
/// # Example
///
/// ```rust
/// use mlua::prelude::*;
/// use splice_lua::SpliceModule;
///
/// struct Answer;
///
/// impl SpliceModule for Answer {
///     fn id(&self) -> &'static str {
///         "answer"
///     }
///
///     fn register(&self, lua: &Lua) -> LuaResult<()> {
///         let table = lua.create_table()?;
///         table.set("value", 42)?;
///         lua.globals().set(self.id(), table)?;
///         Ok(())
///     }
///
///     fn describe(&self) -> String {
///         "answer.value: the number 42".to_string()
///     }
/// }
/// ```
pub trait SpliceModule: Send + Sync {
    /// Global name of the module inside the sandbox.
    ///
    /// Must be a valid Lua identifier and unique within a registry.
    fn id(&self) -> &'static str;

    /// Registers the module's functions into the Lua context.
    fn register(&self, lua: &Lua) -> LuaResult<()>;

    /// One line per function, `name(args): what it returns`.
    fn describe(&self) -> String;
}

/// Registry of helper modules loaded into every sandbox
pub struct ModuleRegistry {
    modules: Vec<Box<dyn SpliceModule>>,
}

impl ModuleRegistry {
    /// Creates a new empty module registry
    pub fn new() -> Self {
        Self {
            modules: Vec::new(),
        }
    }

    /// Registry with the built-in `util` and `log` modules
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        registry.register(crate::modules::UtilModule);
        registry.register(crate::modules::LogModule);
        registry
    }

    /// Registers a module
    ///
    /// # Panics
    /// Panics if a module with the same ID is already registered
    pub fn register<M: SpliceModule + 'static>(&mut self, module: M) {
        let id = module.id();
        if self.modules.iter().any(|m| m.id() == id) {
            panic!("Module with id '{}' is already registered", id);
        }
        self.modules.push(Box::new(module));
    }

    /// Gets a module by its ID
    pub fn get(&self, id: &str) -> Option<&dyn SpliceModule> {
        self.modules
            .iter()
            .find(|m| m.id() == id)
            .map(|m| m.as_ref())
    }

    /// Registers all modules into a Lua context
    pub fn register_all(&self, lua: &Lua) -> LuaResult<()> {
        for module in &self.modules {
            module.register(lua)?;
        }
        Ok(())
    }

    /// Combined description of every registered module
    pub fn describe(&self) -> String {
        self.modules
            .iter()
            .map(|m| m.describe())
            .collect::<Vec<_>>()
            .join("\n")
    }
}

impl Default for ModuleRegistry {
    fn default() -> Self {
        Self::with_builtins()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct TestModule;

    impl SpliceModule for TestModule {
        fn id(&self) -> &'static str {
            "test"
        }

        fn register(&self, lua: &Lua) -> LuaResult<()> {
            let table = lua.create_table()?;
            table.set("value", 42)?;
            lua.globals().set(self.id(), table)?;
            Ok(())
        }

        fn describe(&self) -> String {
            "test.value: 42".to_string()
        }
    }

    #[test]
    fn test_module_registration() {
        let mut registry = ModuleRegistry::new();
        registry.register(TestModule);

        assert!(registry.get("test").is_some());
        assert!(registry.get("nonexistent").is_none());
    }

    #[test]
    #[should_panic(expected = "already registered")]
    fn test_duplicate_registration() {
        let mut registry = ModuleRegistry::new();
        registry.register(TestModule);
        registry.register(TestModule);
    }

    #[test]
    fn test_builtins_are_described() {
        let registry = ModuleRegistry::with_builtins();
        let description = registry.describe();

        assert!(description.contains("util.round"));
        assert!(description.contains("log.info"));
    }
}
