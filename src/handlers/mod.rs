//! Command handler modules
//!
//! This module contains the command handler functions called from main.rs,
//! organized by functionality area.

pub mod config;
pub mod sync;

pub use config::handle_config_interactive;
pub use sync::{
    choose_target, handle_check, handle_pull, handle_push, handle_startup, handle_watch, report,
};
