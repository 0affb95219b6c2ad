//! Watches project directories and keeps an informal timesheet: for every minute (or wider
//! window) of the day, which projects had files created, modified or deleted.
//!

pub mod config;
pub mod daemon;
pub mod utils;
