// ABOUTME: Command module aggregator for the quall CLI.
// ABOUTME: Re-exports the remote, config and local command handlers.

mod config;
mod local;
mod remote;

pub use config::{init, show_value};
pub use local::free_port;
pub use remote::{cat, exec, get, put};
