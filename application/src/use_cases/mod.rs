//! Use cases for the application layer

pub mod invoke_tool;
