//! Argument validators

mod basic;

pub use basic::BasicValidator;
