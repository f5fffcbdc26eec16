//! Command Handlers 实现

mod generate_handler;

pub use generate_handler::*;
