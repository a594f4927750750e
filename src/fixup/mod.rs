pub mod attribution;
pub mod hunk_parser;
pub mod planner;
pub mod run;
pub mod transformation;

#[cfg(test)]
pub mod fake_backend;

pub use run::{AutoFixup, RunReport};
