//! Reader module - per-task sampling over split files.

mod sampling;

pub use sampling::*;
