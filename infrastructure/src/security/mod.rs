//! Security adapters

mod basic;

pub use basic::BasicSecurity;
