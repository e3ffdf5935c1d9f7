//! Keyboard event handling.
//!
//! This module manages keyboard input with Vim-style navigation:
//! - `h`/`l`: move left/right
//! - `j`/`k`: move down/up between the tracks and the conservation row
//! - `0` or `Home`: go to first column
//! - `$` or `End`: go to last column
//! - `n`/`N`: next/previous substitution
//! - `]`/`[`: next/previous conserved block
//! - `?`: show help
//! - `:`: enter command mode
//!   - `:q` or `:quit`: quit the application
//!   - `:h` or `:help`: show help
//!   - `:<number>`: go to column

use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyModifiers};
use std::time::Duration;

use crate::model::{AppMode, AppState};

/// Actions that can be triggered by keyboard input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    /// No action (key not recognized)
    None,
    Quit,
    MoveUp,
    MoveDown,
    MoveLeft,
    MoveRight,
    /// Go to first column (0 or Home)
    GotoFirstColumn,
    /// Go to last column ($ or End)
    GotoLastColumn,
    NextSubstitution,
    PreviousSubstitution,
    NextBlock,
    PreviousBlock,
    /// Enter command mode
    EnterCommandMode,
    /// Add character to command buffer
    CommandChar(char),
    ExecuteCommand,
    CancelCommand,
    CommandBackspace,
    ShowHelp,
    /// Dismiss the help overlay
    DismissHelp,
    /// Resize event (terminal resized)
    Resize(u16, u16),
}

/// Polls for keyboard events with a timeout.
///
/// Returns `None` if no event occurred within the timeout.
pub fn poll_event(timeout: Duration) -> Option<Event> {
    if event::poll(timeout).ok()? {
        event::read().ok()
    } else {
        None
    }
}

/// Converts a crossterm event to an Action based on current app mode.
pub fn handle_event(event: Event, mode: &AppMode, show_help: bool) -> Action {
    match event {
        Event::Key(key_event) => handle_key_event(key_event, mode, show_help),
        Event::Resize(width, height) => Action::Resize(width, height),
        _ => Action::None,
    }
}

fn handle_key_event(key: KeyEvent, mode: &AppMode, show_help: bool) -> Action {
    // If help is shown, any key dismisses it
    if show_help {
        return Action::DismissHelp;
    }

    match mode {
        AppMode::Normal => handle_normal_mode(key),
        AppMode::Command(_) => handle_command_mode(key),
    }
}

/// Handles key events in normal mode (Vim-style navigation).
fn handle_normal_mode(key: KeyEvent) -> Action {
    // Ctrl+C for emergency quit
    if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c') {
        return Action::Quit;
    }

    match key.code {
        KeyCode::Char('j') | KeyCode::Down => Action::MoveDown,
        KeyCode::Char('k') | KeyCode::Up => Action::MoveUp,
        KeyCode::Char('l') | KeyCode::Right => Action::MoveRight,
        KeyCode::Char('h') | KeyCode::Left => Action::MoveLeft,

        KeyCode::Char('0') | KeyCode::Home => Action::GotoFirstColumn,
        KeyCode::Char('$') | KeyCode::End => Action::GotoLastColumn,

        KeyCode::Char('n') => Action::NextSubstitution,
        KeyCode::Char('N') => Action::PreviousSubstitution,
        KeyCode::Char(']') => Action::NextBlock,
        KeyCode::Char('[') => Action::PreviousBlock,

        KeyCode::Char('?') => Action::ShowHelp,
        KeyCode::Char(':') => Action::EnterCommandMode,

        _ => Action::None,
    }
}

/// Handles key events in command mode.
fn handle_command_mode(key: KeyEvent) -> Action {
    match key.code {
        KeyCode::Enter => Action::ExecuteCommand,
        KeyCode::Esc => Action::CancelCommand,
        KeyCode::Backspace => Action::CommandBackspace,
        KeyCode::Char(c) => Action::CommandChar(c),
        _ => Action::None,
    }
}

/// Applies an action to the application state.
///
/// Returns `true` if the application should continue, `false` if it should quit.
pub fn apply_action(state: &mut AppState, action: Action) -> bool {
    match action {
        Action::None => {}
        Action::Quit => state.should_quit = true,
        Action::MoveUp => state.move_up(),
        Action::MoveDown => state.move_down(),
        Action::MoveLeft => state.move_left(),
        Action::MoveRight => state.move_right(),
        Action::GotoFirstColumn => state.goto_first_column(),
        Action::GotoLastColumn => state.goto_last_column(),
        Action::NextSubstitution => state.next_substitution(),
        Action::PreviousSubstitution => state.previous_substitution(),
        Action::NextBlock => state.next_block(),
        Action::PreviousBlock => state.previous_block(),
        Action::EnterCommandMode => state.enter_command_mode(),
        Action::CommandChar(c) => state.command_input(c),
        Action::ExecuteCommand => state.execute_command(),
        Action::CancelCommand => state.cancel_command(),
        Action::CommandBackspace => state.command_backspace(),
        Action::ShowHelp => state.show_help(),
        Action::DismissHelp => state.dismiss_help(),
        Action::Resize(_, _) => {
            // Resize is handled in the main loop with actual terminal dimensions
        }
    }

    !state.should_quit
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::VariationParser;
    use crate::model::SequenceType;

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    fn state() -> AppState {
        // Two substitutions (columns 7 and 15) inside one 20-column block
        let content = "CLUSTAL W

ss    ACGTACACGTACGTTCGTAC
rs    ACGTACGCGTACGTACGTAC
rc    ACGTACACGTACGTTCGTAC
      ****** ****** ******
";
        let analysis = VariationParser::default()
            .parse(content, SequenceType::Nucleotide)
            .unwrap();
        let mut state = AppState::new(analysis, "test.aln".to_string());
        state.update_viewport_size(8);
        state
    }

    #[test]
    fn test_normal_mode_navigation() {
        let mode = AppMode::Normal;
        assert_eq!(handle_key_event(key(KeyCode::Char('h')), &mode, false), Action::MoveLeft);
        assert_eq!(handle_key_event(key(KeyCode::Char('j')), &mode, false), Action::MoveDown);
        assert_eq!(handle_key_event(key(KeyCode::Char('k')), &mode, false), Action::MoveUp);
        assert_eq!(handle_key_event(key(KeyCode::Char('l')), &mode, false), Action::MoveRight);
        assert_eq!(handle_key_event(key(KeyCode::End), &mode, false), Action::GotoLastColumn);
    }

    #[test]
    fn test_substitution_and_block_keys() {
        let mode = AppMode::Normal;
        assert_eq!(
            handle_key_event(key(KeyCode::Char('n')), &mode, false),
            Action::NextSubstitution
        );
        assert_eq!(
            handle_key_event(key(KeyCode::Char('N')), &mode, false),
            Action::PreviousSubstitution
        );
        assert_eq!(handle_key_event(key(KeyCode::Char(']')), &mode, false), Action::NextBlock);
        assert_eq!(handle_key_event(key(KeyCode::Char('[')), &mode, false), Action::PreviousBlock);
    }

    #[test]
    fn test_command_mode_input() {
        let mode = AppMode::Command(String::new());
        assert_eq!(
            handle_key_event(key(KeyCode::Char('q')), &mode, false),
            Action::CommandChar('q')
        );
        assert_eq!(handle_key_event(key(KeyCode::Enter), &mode, false), Action::ExecuteCommand);
        assert_eq!(handle_key_event(key(KeyCode::Esc), &mode, false), Action::CancelCommand);
    }

    #[test]
    fn test_ctrl_c_quit() {
        let key = KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL);
        assert_eq!(handle_key_event(key, &AppMode::Normal, false), Action::Quit);
    }

    #[test]
    fn test_dismiss_help() {
        let mode = AppMode::Normal;
        assert_eq!(handle_key_event(key(KeyCode::Char('x')), &mode, true), Action::DismissHelp);
        assert_eq!(handle_key_event(key(KeyCode::Esc), &mode, true), Action::DismissHelp);
    }

    #[test]
    fn test_jump_between_substitutions() {
        let mut state = state();
        assert_eq!(state.analysis.positions(), vec!["7-7-7", "15-15-15"]);

        apply_action(&mut state, Action::NextSubstitution);
        assert_eq!(state.cursor.col, 6);
        apply_action(&mut state, Action::NextSubstitution);
        assert_eq!(state.cursor.col, 14);
        assert!(state.viewport.is_col_visible(14));

        apply_action(&mut state, Action::NextSubstitution);
        assert_eq!(state.cursor.col, 14);
        assert!(state.status_message.is_some());

        apply_action(&mut state, Action::PreviousSubstitution);
        assert_eq!(state.cursor.col, 6);
    }

    #[test]
    fn test_block_navigation() {
        let mut state = state();
        apply_action(&mut state, Action::GotoLastColumn);
        assert_eq!(state.cursor.col, 19);
        apply_action(&mut state, Action::PreviousBlock);
        assert_eq!(state.cursor.col, 0);
        apply_action(&mut state, Action::NextBlock);
        assert_eq!(state.cursor.col, 0);
        assert_eq!(state.current_block().map(|b| (b.start, b.end)), Some((0, 19)));
    }

    #[test]
    fn test_goto_column_command() {
        let mut state = state();
        for action in [
            Action::EnterCommandMode,
            Action::CommandChar('1'),
            Action::CommandChar('5'),
            Action::ExecuteCommand,
        ] {
            apply_action(&mut state, action);
        }
        assert_eq!(state.cursor.col, 14);
        assert_eq!(state.mode, AppMode::Normal);

        for action in [Action::EnterCommandMode, Action::CommandChar('q'), Action::ExecuteCommand] {
            apply_action(&mut state, action);
        }
        assert!(state.should_quit);
    }

    #[test]
    fn test_row_movement_is_bounded() {
        let mut state = state();
        for _ in 0..10 {
            apply_action(&mut state, Action::MoveDown);
        }
        assert_eq!(state.cursor.row, 3);
        apply_action(&mut state, Action::MoveUp);
        assert_eq!(state.cursor.row, 2);
    }
}
