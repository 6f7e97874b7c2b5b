//! Tool integration.
//!
//! Launch the external OSINT tools (as processes or HTTP calls) and run the
//! enabled ones concurrently on a bounded worker pool.

#![warn(missing_docs)]

pub mod r#trait;
mod error;
pub mod process;
pub mod launch;
pub mod darksearch;
pub mod registry;
pub mod dispatch;
#[cfg(any(test, feature = "test-util"))]
pub mod scripted;

pub use r#trait::{CommandInput, CommandOutput, CommandRunner, RunContext, ToolCall, ToolRunner};
pub use error::ToolError;
pub use process::ProcessRunner;
pub use launch::ProcessToolRunner;
pub use darksearch::DarkSearchRunner;
pub use registry::ToolRegistry;
pub use dispatch::{DispatchConfig, Dispatcher, OutcomeTx, DEFAULT_WORKERS};
