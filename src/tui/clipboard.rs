//! Copying to the system clipboard.
//!
//! Uses the OSC 52 escape sequence, so it works over SSH as long as the
//! terminal emulator supports it.

use std::io;

use crossterm::{clipboard::CopyToClipboard, execute};

pub trait Clipboard {
    fn copy_text(&mut self, text: &str) -> io::Result<()>;
}

/// Writes the OSC 52 sequence to stdout, where the terminal picks it up.
pub struct Osc52Clipboard;

impl Clipboard for Osc52Clipboard {
    fn copy_text(&mut self, text: &str) -> io::Result<()> {
        execute!(io::stdout(), CopyToClipboard::to_clipboard_from(text))?;
        tracing::debug!("Copied {} bytes to the clipboard", text.len());
        Ok(())
    }
}
