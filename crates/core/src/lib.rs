//! OSINTMaster core data models.
//!
//! Identifier, run configuration, the fixed tool catalog and the result
//! bundle shared by every other crate in the workspace.

#![warn(missing_docs)]

mod identifier;
pub mod config;
mod tool;
mod bundle;
pub mod layout;

pub use identifier::{Identifier, IdentifierError, IdentifierKind};
pub use config::{ConfigError, ProxyConfig, RunConfig, ToolSettings, DARKSEARCH_API_KEY_ENV};
pub use tool::{ContainerLaunch, Launch, Program, ToolDescriptor, ToolName, CATALOG};
pub use layout::Layout;
pub use bundle::{OutcomeState, ResultBundle, RunMeta, ToolOutcome, ToolStatus};

/// Timestamp type
pub type Time = chrono::DateTime<chrono::Utc>;
