//! Chatroom model

use serde::{Deserialize, Serialize};

/// A named conversation thread.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chatroom {
    pub id: String,
    pub name: String,
}
