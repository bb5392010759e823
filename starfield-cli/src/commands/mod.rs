//! CLI command implementations.
//!
//! Each subcommand has its own module with argument definitions and handlers.
//!
//! # Command Modules
//!
//! - [`config`] - Configuration management (path, show, init)
//! - [`project`] - Broadcast projections for an observer
//! - [`waypoints`] - Great-circle waypoints between two points

pub mod common;
pub mod config;
pub mod project;
pub mod waypoints;
