//! Built-in helper modules for mapping expressions

mod log;
mod util;

pub use log::LogModule;
pub use util::UtilModule;
