//! icschart: ICS command-structure charts
//!
//! Layered like this:
//! - `domain`: the position tree, layout, viewport and drag state machines
//! - `application`: chart sessions, edit scripts, templates and export
//! - `infrastructure`: filesystem and confirmation seams, service wiring
//! - `cli`: argument parsing and command dispatch

pub mod application;
pub mod cli;
pub mod config;
pub mod domain;
pub mod exitcode;
pub mod infrastructure;
pub mod tree_traits;
pub mod util;
