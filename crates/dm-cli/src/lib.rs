//! desktop-manager: Command-line interface for cluster desktops
//!
//! Provides the `desktop-manager` CLI for listing configurations and
//! launching, watching and deleting desktops through the remote Job API.

pub mod commands;
pub mod context;
pub mod output;
