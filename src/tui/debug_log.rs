//! Debug log pane: captured tracing output, toggled with Ctrl+D.

use ratatui::{
    buffer::Buffer,
    layout::Rect,
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph, Widget},
};

use super::log_capture::LogBuffer;

/// History kept for scrolling, independent of the capture buffer's size.
const MAX_LINES: usize = 1000;

/// Height of the pane when visible, borders included.
pub const DEBUG_LOG_HEIGHT: u16 = 10;

pub struct DebugLogState {
    source: LogBuffer,
    lines: Vec<String>,
    pub visible: bool,
    /// Lines scrolled back from the newest (0 = follow the tail).
    offset: usize,
}

impl DebugLogState {
    pub fn new(source: LogBuffer) -> Self {
        Self {
            source,
            lines: Vec::new(),
            visible: false,
            offset: 0,
        }
    }

    /// Pull newly captured lines. Called once per loop iteration.
    pub fn refresh(&mut self) {
        self.lines.extend(self.source.drain());
        if self.lines.len() > MAX_LINES {
            let excess = self.lines.len() - MAX_LINES;
            self.lines.drain(..excess);
        }
        self.offset = self.offset.min(self.lines.len().saturating_sub(1));
    }

    pub fn toggle(&mut self) {
        self.visible = !self.visible;
        if self.visible {
            self.offset = 0;
        }
    }

    pub fn scroll_back(&mut self, n: usize) {
        let max = self.lines.len().saturating_sub(1);
        self.offset = (self.offset + n).min(max);
    }

    pub fn scroll_forward(&mut self, n: usize) {
        self.offset = self.offset.saturating_sub(n);
    }
}

pub fn render(area: Rect, buf: &mut Buffer, state: &DebugLogState) {
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::DarkGray))
        .title(Span::styled(
            " Debug Log (PgUp/PgDn) ",
            Style::default()
                .fg(Color::Cyan)
                .add_modifier(Modifier::BOLD),
        ));

    let inner = block.inner(area);
    block.render(area, buf);

    if inner.height == 0 || inner.width == 0 {
        return;
    }

    let end = state.lines.len().saturating_sub(state.offset);
    let start = end.saturating_sub(inner.height as usize);

    let lines: Vec<Line> = state.lines[start..end]
        .iter()
        .map(|line| Line::from(Span::styled(line.clone(), level_style(line))))
        .collect();
    Paragraph::new(lines).render(inner, buf);
}

/// Color a fmt-layer line by its level field.
fn level_style(line: &str) -> Style {
    let color = if line.contains("ERROR") {
        Color::Red
    } else if line.contains(" WARN") {
        Color::Yellow
    } else if line.contains(" INFO") {
        Color::Green
    } else if line.contains("DEBUG") || line.contains("TRACE") {
        Color::DarkGray
    } else {
        Color::White
    };
    Style::default().fg(color)
}
