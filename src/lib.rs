// ABOUTME: Library root for quall - the functional test harness.
// ABOUTME: The quall binary in main.rs is a thin CLI over these modules.

pub mod config;
pub mod error;
pub mod harness;
pub mod net;
pub mod output;
pub mod process;
pub mod ssh;
pub mod webdriver;

pub use harness::Harness;
