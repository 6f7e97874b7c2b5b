//! Environment provisioning.
//!
//! Prepares directories, the Python virtual environment, system packages and
//! the checkouts of every enabled tool before a run.

#![warn(missing_docs)]

pub mod provisioner;

pub use provisioner::{ProvisionConfig, ProvisionError, ProvisionReport, Provisioner};
