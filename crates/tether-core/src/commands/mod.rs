//! High-level commands for provisioning workflows.
//!
//! This module provides the public API for the join and leave workflows.
//! These commands are designed to be called by CLI frontends; every
//! external system they touch comes in through a trait seam.

pub mod join;
pub mod leave;

pub use join::{JoinCommand, JoinOptions, JoinReport};
pub use leave::{LeaveCommand, LeaveOptions, LeaveReport};
