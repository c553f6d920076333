#![allow(clippy::manual_unwrap_or_default)]
#![allow(clippy::manual_unwrap_or)]

pub mod assembler;
pub mod client;
pub mod constants;
pub mod db;
pub mod dependency;
pub mod health;
pub mod logging;
pub mod main_helper;
pub mod parameter;
pub mod payload;
pub mod server;
pub mod signature;
pub mod store;
pub mod tester;
pub mod tool;
pub mod tool_schema;
pub mod types;
pub mod validation;

pub use types::*;

pub use main_helper::{AppState, Args, Command};
