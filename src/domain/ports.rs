use crate::utils::error::Result;

/// Where program text comes from.
pub trait Storage {
    fn read_source(&self, path: &str) -> Result<String>;
}

/// Settings the engine needs, independent of where they were loaded from.
pub trait ConfigProvider {
    /// Whether `run` type checks the program before evaluating it.
    fn analyze(&self) -> bool;
    fn source_level(&self) -> u32;
}
