//! Widgets for the full-screen display

use ratatui::layout::Rect;
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Gauge, List, ListItem, Paragraph};
use ratatui::Frame;
use std::collections::VecDeque;

use super::{Phase, Progress};

/// Activity lines kept for scrollback
const LOG_CAPACITY: usize = 500;

fn panel(title: &str) -> Block<'_> {
    Block::default()
        .borders(Borders::ALL)
        .title(title)
        .border_style(Style::default().fg(Color::Blue))
}

/// Phase, target description and any pending question
pub struct StatusPanel {
    phase: Phase,
    info: String,
    prompt: Option<String>,
}

impl StatusPanel {
    pub fn new() -> Self {
        Self {
            phase: Phase::Connecting,
            info: String::new(),
            prompt: None,
        }
    }

    pub fn set_phase(&mut self, phase: Phase) {
        self.phase = phase;
    }

    pub fn set_info(&mut self, info: impl Into<String>) {
        self.info = info.into();
    }

    pub fn set_prompt(&mut self, prompt: Option<String>) {
        self.prompt = prompt;
    }

    fn phase_style(&self) -> (&'static str, Style) {
        let (marker, color) = match self.phase {
            Phase::Connecting => ("◐", Color::Cyan),
            Phase::Clearing => ("✗", Color::Yellow),
            Phase::Migrating => ("→", Color::Cyan),
            Phase::Aggregating => ("Σ", Color::Magenta),
            Phase::Complete => ("✓", Color::Green),
        };
        (marker, Style::default().fg(color).add_modifier(Modifier::BOLD))
    }

    pub fn render(&self, frame: &mut Frame, area: Rect) {
        let (marker, style) = self.phase_style();
        let mut lines = vec![
            Line::from(Span::styled(format!(" {} {}", marker, self.phase), style)),
            Line::from(Span::styled(
                format!("   {}", self.info),
                Style::default().fg(Color::Gray),
            )),
        ];

        if let Some(prompt) = &self.prompt {
            lines.push(Line::from(""));
            lines.push(Line::from(vec![
                Span::styled(" ? ", Style::default().fg(Color::Black).bg(Color::Yellow)),
                Span::styled(
                    format!(" {}", prompt),
                    Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD),
                ),
            ]));
        }

        frame.render_widget(
            Paragraph::new(lines).block(panel(" Route Data Consolidation ")),
            area,
        );
    }
}

/// Gauge over the selected steps
pub struct ProgressPanel {
    progress: Option<Progress>,
}

impl ProgressPanel {
    pub fn new() -> Self {
        Self { progress: None }
    }

    pub fn set(&mut self, progress: Progress) {
        self.progress = Some(progress);
    }

    pub fn clear(&mut self) {
        self.progress = None;
    }

    pub fn render(&self, frame: &mut Frame, area: Rect) {
        let block = Block::default()
            .borders(Borders::LEFT | Borders::RIGHT)
            .border_style(Style::default().fg(Color::Blue));

        let Some(progress) = &self.progress else {
            frame.render_widget(block, area);
            return;
        };

        let gauge = Gauge::default()
            .block(block)
            .gauge_style(Style::default().fg(Color::Cyan).bg(Color::DarkGray))
            .ratio(progress.ratio())
            .label(format!(
                "step {}/{}: {}",
                progress.current, progress.total, progress.label
            ));
        frame.render_widget(gauge, area);
    }
}

/// Scrolling activity history, newest at the bottom
pub struct LogPanel {
    entries: VecDeque<String>,
}

impl LogPanel {
    pub fn new() -> Self {
        Self {
            entries: VecDeque::with_capacity(LOG_CAPACITY),
        }
    }

    pub fn add(&mut self, message: impl Into<String>) {
        if self.entries.len() == LOG_CAPACITY {
            self.entries.pop_front();
        }
        self.entries.push_back(message.into());
    }

    /// Failures in red, skips in yellow, older lines dimmed
    fn entry_style(entry: &str, newest: bool) -> Style {
        if entry.contains("failed:") || entry.contains("rolled back") {
            Style::default().fg(Color::Red)
        } else if entry.contains("skipped") || entry.contains("Skipped") {
            Style::default().fg(Color::Yellow)
        } else if newest {
            Style::default().fg(Color::White)
        } else {
            Style::default().fg(Color::DarkGray)
        }
    }

    pub fn render(&self, frame: &mut Frame, area: Rect) {
        let visible = area.height.saturating_sub(2) as usize;
        let skip = self.entries.len().saturating_sub(visible);
        let newest = self.entries.len().saturating_sub(1);

        let items: Vec<ListItem> = self
            .entries
            .iter()
            .enumerate()
            .skip(skip)
            .map(|(i, entry)| {
                ListItem::new(Span::styled(
                    format!(" {}", entry),
                    Self::entry_style(entry, i == newest),
                ))
            })
            .collect();

        frame.render_widget(List::new(items).block(panel(" Activity ")), area);
    }
}

/// Footer line naming the keys that do something right now
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyHints {
    Running,
    Question,
    Finished,
}

impl KeyHints {
    fn text(&self) -> &'static str {
        match self {
            KeyHints::Running => " working...",
            KeyHints::Question => " y: yes   n/Esc: no",
            KeyHints::Finished => " any key: exit",
        }
    }

    pub fn render(&self, frame: &mut Frame, area: Rect) {
        let style = match self {
            KeyHints::Question => Style::default().fg(Color::Yellow),
            _ => Style::default().fg(Color::DarkGray),
        };
        frame.render_widget(Paragraph::new(Span::styled(self.text(), style)), area);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_panel_drops_oldest() {
        let mut log = LogPanel::new();
        for i in 0..LOG_CAPACITY + 3 {
            log.add(format!("line {}", i));
        }
        assert_eq!(log.entries.len(), LOG_CAPACITY);
        assert_eq!(log.entries.front().map(String::as_str), Some("line 3"));
    }

    #[test]
    fn test_outcome_lines_are_highlighted() {
        let red = Style::default().fg(Color::Red);
        assert_eq!(LogPanel::entry_style("routes: failed: boom", false), red);
        assert_eq!(
            LogPanel::entry_style("Transaction rolled back (x)", false),
            red
        );
        assert_eq!(
            LogPanel::entry_style("search-index: skipped (no rows)", false),
            Style::default().fg(Color::Yellow)
        );
    }
}
