//! 应用层 - 命令

mod generate_commands;

pub mod handlers;

pub use generate_commands::*;
