pub mod commands;
pub mod config;
pub mod error;
pub mod fixup;
pub mod git;
pub mod utils;
