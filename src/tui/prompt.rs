//! Modal prompts: naming a new chatroom, confirming a delete.

use crossterm::event::{KeyCode, KeyEvent};
use ratatui::{
    layout::Rect,
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Paragraph, Wrap},
    Frame,
};

use super::help::centered_rect;
use super::input::LineInput;

pub enum Prompt {
    NewRoom(LineInput),
    ConfirmDelete { id: String, name: String },
}

/// What a key press did to the prompt.
#[derive(Debug, PartialEq, Eq)]
pub enum PromptOutcome {
    /// Still open.
    Pending,
    Cancelled,
    Create(String),
    Delete(String),
}

impl Prompt {
    pub fn handle_key(&mut self, key: KeyEvent) -> PromptOutcome {
        if key.code == KeyCode::Esc {
            return PromptOutcome::Cancelled;
        }
        match self {
            Prompt::NewRoom(input) => match key.code {
                // A blank name keeps the prompt open.
                KeyCode::Enter => match input.take_trimmed() {
                    Some(name) => PromptOutcome::Create(name),
                    None => PromptOutcome::Pending,
                },
                _ => {
                    input.handle_key(key);
                    PromptOutcome::Pending
                }
            },
            Prompt::ConfirmDelete { id, .. } => match key.code {
                KeyCode::Char('y') | KeyCode::Char('Y') | KeyCode::Enter => {
                    PromptOutcome::Delete(id.clone())
                }
                KeyCode::Char('n') | KeyCode::Char('N') => PromptOutcome::Cancelled,
                _ => PromptOutcome::Pending,
            },
        }
    }
}

pub fn render(frame: &mut Frame, prompt: &Prompt) {
    let area = frame.area();
    let popup = centered_rect(50.min(area.width.saturating_sub(2)), 5, area);
    frame.render_widget(Clear, popup);

    let title_style = Style::default()
        .fg(Color::Cyan)
        .add_modifier(Modifier::BOLD);
    let hint_style = Style::default().fg(Color::DarkGray);

    match prompt {
        Prompt::NewRoom(input) => {
            let block = Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(Color::Cyan))
                .title(Span::styled(" New chatroom ", title_style))
                .title_bottom(Line::from(Span::styled(" Enter: create  Esc: cancel ", hint_style)));
            let inner = block.inner(popup);
            frame.render_widget(block, popup);
            if inner.height == 0 || inner.width == 0 {
                return;
            }

            let row = Rect::new(inner.x, inner.y + inner.height / 2, inner.width, 1);
            if input.is_empty() {
                frame.render_widget(
                    Paragraph::new(Span::styled(" Chatroom name", hint_style)),
                    row,
                );
                frame.set_cursor_position((row.x + 1, row.y));
            } else {
                let (visible, cursor) = input.viewport((row.width as usize).saturating_sub(2));
                frame.render_widget(Paragraph::new(format!(" {}", visible)), row);
                frame.set_cursor_position((row.x + 1 + cursor as u16, row.y));
            }
        }
        Prompt::ConfirmDelete { name, .. } => {
            let block = Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(Color::Red))
                .title(Span::styled(" Delete chatroom ", title_style.fg(Color::Red)))
                .title_bottom(Line::from(Span::styled(" y: delete  n/Esc: keep ", hint_style)));
            let inner = block.inner(popup);
            frame.render_widget(block, popup);

            frame.render_widget(
                Paragraph::new(format!(" Delete \"{}\"?", name)).wrap(Wrap { trim: true }),
                inner,
            );
        }
    }
}
