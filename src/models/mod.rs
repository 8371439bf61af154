//! Data models for chatrooms and their messages

mod chatroom;
mod id;
mod message;

pub use chatroom::*;
pub use id::*;
pub use message::*;
