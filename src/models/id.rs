//! Monotonic identifiers for messages and chatrooms

use chrono::Utc;

/// Hands out millisecond-timestamp ids that strictly increase.
///
/// Two ids requested within the same millisecond (or after the clock stepped
/// backwards) are bumped past the last one handed out.
#[derive(Debug, Default)]
pub struct IdGenerator {
    last: i64,
}

impl IdGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Next id as a decimal string.
    pub fn next_id(&mut self) -> String {
        let now = Utc::now().timestamp_millis();
        let id = if now > self.last { now } else { self.last + 1 };
        self.last = id;
        id.to_string()
    }

    /// Make sure later ids sort after an id that already exists.
    ///
    /// Only the leading decimal digits are considered, so agent ids such as
    /// `1718000000000_ai` count as well.
    pub fn observe(&mut self, id: &str) {
        let digits: String = id.chars().take_while(|c| c.is_ascii_digit()).collect();
        if let Ok(value) = digits.parse::<i64>() {
            self.last = self.last.max(value);
        }
    }
}
