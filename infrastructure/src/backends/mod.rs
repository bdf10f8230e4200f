//! Backend strategies
//!
//! | Driver | Backend | Target |
//! |--------|---------|--------|
//! | `function` | [`FunctionBackend`] | in-process async functions |
//! | `database` | [`DatabaseBackend`] | table operations via a [`DbStrategy`] engine |
//! | `http` | `HttpBackend` (feature `http`) | REST endpoints via reqwest |

mod database;
mod demo;
mod function;
#[cfg(feature = "http")]
mod http;

pub use database::{
    DATABASE_DRIVER, DatabaseBackend, DbOperation, DbStrategy, InMemoryDbStrategy,
};
pub use demo::{DEMO_FUNCTIONS, demo_tool_specs, register_demo_functions};
pub use function::{FUNCTION_DRIVER, FunctionBackend, ToolFunction};
#[cfg(feature = "http")]
pub use http::{HTTP_DRIVER, HttpBackend};
