//! Command implementations.

pub mod config;
pub mod research;

pub use self::config::execute_config;
pub use self::research::execute_research;
