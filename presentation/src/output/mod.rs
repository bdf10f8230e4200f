//! Output formatting for invocation results

pub mod console;
pub mod formatter;
pub mod report;
