//! Viewer controller.
//!
//! Drives the interactive viewer over one analysed alignment:
//! - Terminal setup in raw mode on the alternate screen, restored on drop
//! - Polling keys and turning them into [`Action`]s
//! - Re-sizing the column window when the terminal changes width

use std::io::{self, Stdout};
use std::time::Duration;

use anyhow::Result;
use crossterm::{
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use log::debug;
use ratatui::{backend::CrosstermBackend, Terminal};

use crate::event::{apply_action, handle_event, poll_event, Action};
use crate::model::AppState;
use crate::ui::{calculate_visible_cols, render};

/// Owns the terminal and the viewer state for one session.
pub struct App {
    terminal: Terminal<CrosstermBackend<Stdout>>,
    state: AppState,
    /// Event poll timeout
    tick_rate: Duration,
}

impl App {
    /// Switches the terminal to raw mode and the alternate screen.
    pub fn new(state: AppState) -> Result<Self> {
        // Setup terminal
        enable_raw_mode()?;
        let mut stdout = io::stdout();
        execute!(stdout, EnterAlternateScreen)?;
        let terminal = Terminal::new(CrosstermBackend::new(stdout))?;

        Ok(Self {
            terminal,
            state,
            tick_rate: Duration::from_millis(50),
        })
    }

    /// Draws and handles keys until the user quits.
    pub fn run(&mut self) -> Result<()> {
        self.update_viewport_size()?;
        debug!(
            "Viewer opened on {} ({} columns, {} substitution(s))",
            self.state.file_name,
            self.state.analysis.alignment_length(),
            self.state.analysis.substitution_count()
        );

        loop {
            self.terminal.draw(|frame| render(frame, &self.state))?;

            let Some(event) = poll_event(self.tick_rate) else {
                continue;
            };
            let action = handle_event(event, &self.state.mode, self.state.show_help);

            // The event only carries the new size; the column window is
            // recomputed from the terminal itself
            if let Action::Resize(_, _) = action {
                self.update_viewport_size()?;
            }

            if !apply_action(&mut self.state, action) {
                break;
            }
        }

        debug!("Viewer closed at column {}", self.state.cursor.col + 1);
        Ok(())
    }

    /// Fits the column window to the width left of the track-name panel.
    fn update_viewport_size(&mut self) -> Result<()> {
        let size = self.terminal.size()?;
        self.state.update_viewport_size(calculate_visible_cols(size.width));
        Ok(())
    }
}

impl Drop for App {
    fn drop(&mut self) {
        // Restore terminal
        let _ = disable_raw_mode();
        let _ = execute!(self.terminal.backend_mut(), LeaveAlternateScreen);
        let _ = self.terminal.show_cursor();
    }
}

/// Opens the viewer on an analysed alignment and blocks until it closes.
pub fn run_app(state: AppState) -> Result<()> {
    let mut app = App::new(state)?;
    app.run()
}
