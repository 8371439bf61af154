//! Compose box: message input, or an image path when attaching.

use std::path::PathBuf;

use ratatui::{
    buffer::Buffer,
    layout::Rect,
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, BorderType, Borders, Paragraph, Widget},
    Frame,
};

use super::input::LineInput;

/// What Enter does with the input.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum ComposeMode {
    #[default]
    Message,
    /// The input is a path to an image file.
    Attach,
}

/// What the user submitted.
#[derive(Debug, PartialEq, Eq)]
pub enum Submission {
    Text(String),
    Image(PathBuf),
}

#[derive(Default)]
pub struct ComposeState {
    pub input: LineInput,
    pub mode: ComposeMode,
}

impl ComposeState {
    /// Switch between message and attach mode (Ctrl+P). The typed text is
    /// kept so a half-written message survives a detour.
    pub fn toggle_attach(&mut self) {
        self.mode = match self.mode {
            ComposeMode::Message => ComposeMode::Attach,
            ComposeMode::Attach => ComposeMode::Message,
        };
    }

    /// Take the input (Enter). Empty input submits nothing. Attach mode
    /// returns to message mode after a path is submitted.
    pub fn submit(&mut self) -> Option<Submission> {
        let text = self.input.take_trimmed()?;
        match self.mode {
            ComposeMode::Message => Some(Submission::Text(text)),
            ComposeMode::Attach => {
                self.mode = ComposeMode::Message;
                Some(Submission::Image(PathBuf::from(text)))
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Rendering
// ---------------------------------------------------------------------------

/// Height of the compose box: border + mode line + input + border.
pub const COMPOSE_HEIGHT: u16 = 4;

/// Render the compose box. Takes the `Frame` to place the cursor.
pub fn render(area: Rect, frame: &mut Frame, state: &ComposeState, room_name: &str, focused: bool) {
    let (border_style, border_type) = if focused {
        (Style::default().fg(Color::Yellow), BorderType::Double)
    } else {
        (Style::default().fg(Color::DarkGray), BorderType::Plain)
    };

    let block = Block::default()
        .borders(Borders::ALL)
        .border_type(border_type)
        .border_style(border_style);
    let inner = block.inner(area);
    frame.render_widget(block, area);

    if inner.height == 0 || inner.width == 0 {
        return;
    }

    let mode_area = Rect::new(inner.x, inner.y, inner.width, 1);
    render_mode_line(mode_area, frame.buffer_mut(), state.mode, focused);

    if inner.height < 2 {
        return;
    }
    let input_area = Rect::new(inner.x, inner.y + 1, inner.width, 1);
    // One column of left margin.
    let width = (input_area.width as usize).saturating_sub(2);

    if state.input.is_empty() {
        let placeholder = match state.mode {
            ComposeMode::Message if room_name.is_empty() => " Open a chatroom to start".to_string(),
            ComposeMode::Message => format!(" Message {}...", room_name),
            ComposeMode::Attach => " Path to an image file...".to_string(),
        };
        let truncated: String = placeholder.chars().take(input_area.width as usize).collect();
        Paragraph::new(Line::from(Span::styled(
            truncated,
            Style::default().fg(Color::DarkGray),
        )))
        .render(input_area, frame.buffer_mut());
        if focused {
            frame.set_cursor_position((input_area.x + 1, input_area.y));
        }
        return;
    }

    let (visible, cursor) = state.input.viewport(width);
    Paragraph::new(Line::from(Span::styled(
        format!(" {}", visible),
        Style::default().fg(Color::White),
    )))
    .render(input_area, frame.buffer_mut());

    if focused {
        frame.set_cursor_position((input_area.x + 1 + cursor as u16, input_area.y));
    }
}

fn render_mode_line(area: Rect, buf: &mut Buffer, mode: ComposeMode, focused: bool) {
    let dim = Style::default().fg(Color::DarkGray);
    let active = if focused {
        Style::default()
            .fg(Color::Cyan)
            .add_modifier(Modifier::BOLD)
    } else {
        dim
    };

    let (label, hint) = match mode {
        ComposeMode::Message => (" Message", "Enter: send  Ctrl+P: attach image "),
        ComposeMode::Attach => (" Attach image", "Enter: attach  Ctrl+P: cancel "),
    };

    let hint_w = unicode_width::UnicodeWidthStr::width(hint);
    let label_w = unicode_width::UnicodeWidthStr::width(label);
    let padding = (area.width as usize).saturating_sub(label_w + hint_w);

    let line = Line::from(vec![
        Span::styled(label, active),
        Span::raw(" ".repeat(padding)),
        Span::styled(hint, dim),
    ]);
    Paragraph::new(line).render(area, buf);
}
