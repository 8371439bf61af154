//! Terminal user interface
//!
//! Chatroom list on the left, the open chatroom's feed on the right, compose
//! box underneath. Built on Ratatui.

mod app;
mod backend;
mod clipboard;
mod compose;
mod debug_log;
mod help;
mod input;
pub mod log_capture;
mod messages;
mod prompt;
mod search;
mod sidebar;
mod ui;

pub use app::run;
