//! CLI command handlers.

pub mod gen_key;
pub mod serve;
