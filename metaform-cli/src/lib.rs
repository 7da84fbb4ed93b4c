//! Metaform CLI library: command implementations behind the `metaform` binary.

pub mod check;
pub mod cli;
pub mod fields;
pub mod session;
pub mod table;

pub use cli::{Cli, Commands};
