//! Operator display.
//!
//! The orchestrator reports through [`Ui`]: the run phase, which step is
//! executing, a running activity log, and yes/no questions before
//! destructive work. Step functions never touch it.

mod components;

use anyhow::Result;
use crossterm::event::{self, Event as CrosstermEvent, KeyCode, KeyEvent, KeyEventKind};
use crossterm::terminal::{self, EnterAlternateScreen, LeaveAlternateScreen};
use crossterm::ExecutableCommand;
use ratatui::backend::CrosstermBackend;
use ratatui::layout::{Constraint, Direction, Layout};
use ratatui::Terminal;
use std::fmt;
use std::io::{self, BufRead, Stdout, Write};
use std::time::Duration;

use components::{KeyHints, LogPanel, ProgressPanel, StatusPanel};

/// Where a run currently is
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Connecting,
    Clearing,
    Migrating,
    Aggregating,
    Complete,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Phase::Connecting => "Opening databases",
            Phase::Clearing => "Clearing master tables",
            Phase::Migrating => "Migrating base tables",
            Phase::Aggregating => "Computing derived tables",
            Phase::Complete => "Complete",
        })
    }
}

/// Position within the selected steps
#[derive(Debug, Clone, Default)]
pub struct Progress {
    pub current: u64,
    pub total: u64,
    pub label: String,
}

impl Progress {
    pub fn ratio(&self) -> f64 {
        match self.total {
            0 => 0.0,
            total => (self.current as f64 / total as f64).min(1.0),
        }
    }
}

/// Sink for run state; the orchestrator's only view of the operator
pub trait Ui {
    fn set_phase(&mut self, phase: Phase);
    fn set_info(&mut self, info: impl Into<String>);
    fn set_progress(&mut self, current: u64, total: u64, label: impl Into<String>);
    fn clear_progress(&mut self);
    fn log(&mut self, message: impl Into<String>);
    /// Ask the operator a yes/no question
    fn confirm(&mut self, prompt: &str) -> bool;
}

/// Full-screen terminal display
pub struct UiApp {
    terminal: Terminal<CrosstermBackend<Stdout>>,
    status: StatusPanel,
    progress: ProgressPanel,
    log: LogPanel,
    hints: KeyHints,
    assume_yes: bool,
}

impl UiApp {
    /// Take over the terminal. `assume_yes` answers every prompt without asking
    pub fn new(assume_yes: bool) -> Result<Self> {
        terminal::enable_raw_mode()?;
        let mut stdout = io::stdout();
        stdout.execute(EnterAlternateScreen)?;
        let terminal = Terminal::new(CrosstermBackend::new(stdout))?;

        Ok(Self {
            terminal,
            status: StatusPanel::new(),
            progress: ProgressPanel::new(),
            log: LogPanel::new(),
            hints: KeyHints::Running,
            assume_yes,
        })
    }

    fn draw(&mut self) -> Result<()> {
        let (status, progress, log, hints) = (&self.status, &self.progress, &self.log, self.hints);

        self.terminal.draw(|frame| {
            let chunks = Layout::default()
                .direction(Direction::Vertical)
                .constraints([
                    Constraint::Length(6),
                    Constraint::Length(3),
                    Constraint::Min(5),
                    Constraint::Length(1),
                ])
                .split(frame.area());

            status.render(frame, chunks[0]);
            progress.render(frame, chunks[1]);
            log.render(frame, chunks[2]);
            hints.render(frame, chunks[3]);
        })?;
        Ok(())
    }

    fn redraw(&mut self) {
        // A failed frame is dropped; the next update repaints everything
        self.draw().ok();
    }

    /// Next key press, ignoring releases and repeats
    fn next_key() -> Result<KeyCode> {
        loop {
            if !event::poll(Duration::from_millis(100))? {
                continue;
            }
            if let CrosstermEvent::Key(KeyEvent { code, kind: KeyEventKind::Press, .. }) =
                event::read()?
            {
                return Ok(code);
            }
        }
    }

    fn ask(&mut self, prompt: &str) -> Result<bool> {
        self.status.set_prompt(Some(prompt.to_string()));
        self.hints = KeyHints::Question;
        self.draw()?;

        let answer = loop {
            match Self::next_key()? {
                KeyCode::Char('y') | KeyCode::Char('Y') => break true,
                KeyCode::Char('n') | KeyCode::Char('N') | KeyCode::Esc => break false,
                _ => {}
            }
        };

        self.status.set_prompt(None);
        self.hints = KeyHints::Running;
        Ok(answer)
    }

    /// Show the summary, wait for a key, then give the terminal back
    pub fn finish(mut self, summary: &str) -> Result<()> {
        self.status.set_phase(Phase::Complete);
        self.progress.clear();
        summary.lines().for_each(|line| self.log.add(line));
        self.hints = KeyHints::Finished;
        self.draw()?;

        Self::next_key()?;
        self.restore()
    }

    /// Give the terminal back immediately
    pub fn restore(mut self) -> Result<()> {
        self.leave_screen()
    }

    fn leave_screen(&mut self) -> Result<()> {
        terminal::disable_raw_mode()?;
        self.terminal.backend_mut().execute(LeaveAlternateScreen)?;
        self.terminal.show_cursor()?;
        Ok(())
    }
}

impl Ui for UiApp {
    fn set_phase(&mut self, phase: Phase) {
        self.status.set_phase(phase);
        self.redraw();
    }

    fn set_info(&mut self, info: impl Into<String>) {
        self.status.set_info(info);
        self.redraw();
    }

    fn set_progress(&mut self, current: u64, total: u64, label: impl Into<String>) {
        self.progress.set(Progress {
            current,
            total,
            label: label.into(),
        });
        self.redraw();
    }

    fn clear_progress(&mut self) {
        self.progress.clear();
        self.redraw();
    }

    fn log(&mut self, message: impl Into<String>) {
        self.log.add(message);
        self.redraw();
    }

    fn confirm(&mut self, prompt: &str) -> bool {
        let answer = if self.assume_yes {
            true
        } else {
            self.ask(prompt).unwrap_or(false)
        };
        let how = if self.assume_yes { " (--yes)" } else { "" };
        self.log(format!("{} -> {}{}", prompt, if answer { "yes" } else { "no" }, how));
        answer
    }
}

impl Drop for UiApp {
    fn drop(&mut self) {
        self.leave_screen().ok();
    }
}

/// Line-oriented output for headless runs (pipes, CI, cron)
pub struct ConsoleUi {
    assume_yes: bool,
}

impl ConsoleUi {
    pub fn new(assume_yes: bool) -> Self {
        Self { assume_yes }
    }
}

impl Ui for ConsoleUi {
    fn set_phase(&mut self, phase: Phase) {
        println!("\n== {} ==", phase);
    }

    fn set_info(&mut self, info: impl Into<String>) {
        println!("{}", info.into());
    }

    fn set_progress(&mut self, current: u64, total: u64, label: impl Into<String>) {
        println!("[{}/{}] {}", current, total, label.into());
    }

    fn clear_progress(&mut self) {}

    fn log(&mut self, message: impl Into<String>) {
        println!("  {}", message.into());
    }

    fn confirm(&mut self, prompt: &str) -> bool {
        if self.assume_yes {
            println!("{} (y/n): y", prompt);
            return true;
        }

        print!("{} (y/n): ", prompt);
        io::stdout().flush().ok();
        let mut line = String::new();
        match io::stdin().lock().read_line(&mut line) {
            Ok(_) => line.trim().eq_ignore_ascii_case("y"),
            Err(_) => false,
        }
    }
}

/// Records prompts and answers them from a preset; for tests and embedding
#[derive(Default)]
pub struct SilentUi {
    answer: bool,
    /// Prompts seen by `confirm`, in order
    pub prompts: Vec<String>,
}

impl SilentUi {
    /// Answers yes to every confirmation
    pub fn new() -> Self {
        Self::answering(true)
    }

    pub fn answering(answer: bool) -> Self {
        Self {
            answer,
            prompts: Vec::new(),
        }
    }
}

impl Ui for SilentUi {
    fn set_phase(&mut self, _phase: Phase) {}
    fn set_info(&mut self, _info: impl Into<String>) {}
    fn set_progress(&mut self, _current: u64, _total: u64, _label: impl Into<String>) {}
    fn clear_progress(&mut self) {}
    fn log(&mut self, _message: impl Into<String>) {}

    fn confirm(&mut self, prompt: &str) -> bool {
        self.prompts.push(prompt.to_string());
        self.answer
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_progress_ratio() {
        let p = |current, total| Progress {
            current,
            total,
            label: String::new(),
        };
        assert_eq!(p(0, 0).ratio(), 0.0);
        assert_eq!(p(5, 10).ratio(), 0.5);
        assert_eq!(p(12, 10).ratio(), 1.0);
    }

    #[test]
    fn test_silent_ui_records_prompts() {
        let mut ui = SilentUi::answering(false);
        assert!(!ui.confirm("Clear?"));
        assert!(!ui.confirm("Run step 1?"));
        assert_eq!(ui.prompts, vec!["Clear?", "Run step 1?"]);
        assert!(SilentUi::new().confirm("anything"));
    }
}
