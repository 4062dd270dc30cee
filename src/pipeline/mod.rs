//! Pipeline module - task registry and the multi-task multiplexer.

mod multiplexer;
mod tasks;

pub use multiplexer::*;
pub use tasks::*;
