//! TUI rendering module.
//!
//! This module handles all visual rendering using ratatui:
//! - Track names panel on the left
//! - Colored residues with substitution columns highlighted and
//!   conserved-block columns underlined
//! - Conservation row under the three tracks
//! - Status bar with ungapped positions at the cursor
//! - Help overlay

use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Paragraph},
    Frame,
};

use crate::model::{AppMode, AppState, Conservation, SequenceType, TrackRole, ROW_COUNT};

/// Width reserved for track names (including border and padding).
const NAME_PANEL_WIDTH: u16 = 20;
/// Minimum width for the sequence panel.
const MIN_SEQ_PANEL_WIDTH: u16 = 10;
/// Height of the status bar.
const STATUS_BAR_HEIGHT: u16 = 1;
/// Height of the alignment panels: four rows plus borders.
const PANEL_HEIGHT: u16 = ROW_COUNT as u16 + 2;

const HELP_TEXT: &[&str] = &[
    "h/l or Left/Right: move one column",
    "j/k or Down/Up: move between the three tracks and the conservation row",
    "0 or Home, $ or End: first or last column",
    "n / N: next or previous substitution",
    "] / [: next or previous conserved block",
    ":<number>: go to a 1-based column",
    ":q: quit, :h or ?: this help",
    "Substitution columns are highlighted in magenta; block columns are underlined.",
    "Press any key to close.",
];

/// Color scheme for residues.
pub trait ColorScheme {
    fn get_color(&self, c: char) -> Color;
}

/// DNA nucleotide color scheme.
pub struct DnaColorScheme;

impl ColorScheme for DnaColorScheme {
    fn get_color(&self, c: char) -> Color {
        match c.to_ascii_uppercase() {
            'A' => Color::Red,
            'C' => Color::Green,
            'G' => Color::Yellow,
            'T' | 'U' => Color::Blue,
            _ => Color::DarkGray,
        }
    }
}

/// Amino acid color scheme, grouped by physicochemical properties.
pub struct AminoAcidColorScheme;

impl ColorScheme for AminoAcidColorScheme {
    fn get_color(&self, c: char) -> Color {
        match c.to_ascii_uppercase() {
            // Hydrophobic
            'A' | 'V' | 'I' | 'L' | 'M' | 'F' | 'W' | 'P' => Color::Yellow,
            // Polar
            'S' | 'T' | 'N' | 'Q' | 'C' | 'G' | 'Y' => Color::Green,
            // Charged positive
            'K' | 'R' | 'H' => Color::Blue,
            // Charged negative
            'D' | 'E' => Color::Red,
            _ => Color::DarkGray,
        }
    }
}

fn color_scheme(sequence_type: SequenceType) -> &'static dyn ColorScheme {
    match sequence_type {
        SequenceType::Nucleotide => &DnaColorScheme,
        SequenceType::AminoAcid => &AminoAcidColorScheme,
    }
}

/// Renders the complete UI.
pub fn render(frame: &mut Frame, state: &AppState) {
    let area = frame.area();

    let main_layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(PANEL_HEIGHT),
            Constraint::Min(0),
            Constraint::Length(STATUS_BAR_HEIGHT),
        ])
        .split(area);

    let content_layout = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Length(NAME_PANEL_WIDTH),
            Constraint::Min(MIN_SEQ_PANEL_WIDTH),
        ])
        .split(main_layout[0]);

    render_names_panel(frame, state, content_layout[0]);
    render_sequences_panel(frame, state, content_layout[1]);
    render_summary(frame, state, main_layout[1]);
    render_status_bar(frame, state, main_layout[2]);

    if state.show_help {
        render_help(frame, area);
    }
}

/// Renders the track names panel.
fn render_names_panel(frame: &mut Frame, state: &AppState, area: Rect) {
    let tracks = state.analysis.tracks();
    let max_name_len = NAME_PANEL_WIDTH.saturating_sub(7) as usize;

    let mut labels: Vec<String> = TrackRole::ALL
        .iter()
        .map(|&role| {
            let name = tracks.track(role).name();
            let name = if name.chars().count() > max_name_len {
                let truncated: String = name.chars().take(max_name_len - 1).collect();
                format!("{}…", truncated)
            } else {
                name.to_string()
            };
            format!("{} {}", role.label(), name)
        })
        .collect();
    labels.push("conservation".to_string());

    let lines: Vec<Line> = labels
        .into_iter()
        .enumerate()
        .map(|(row, label)| {
            let style = if row == state.cursor.row {
                Style::default()
                    .fg(Color::Black)
                    .bg(Color::White)
                    .add_modifier(Modifier::BOLD)
            } else {
                Style::default().fg(Color::White)
            };
            Line::from(Span::styled(label, style))
        })
        .collect();

    let block = Block::default().borders(Borders::ALL).title("Tracks");
    frame.render_widget(Paragraph::new(lines).block(block), area);
}

/// Renders the three tracks and the conservation row.
fn render_sequences_panel(frame: &mut Frame, state: &AppState, area: Rect) {
    let analysis = &state.analysis;
    let tracks = analysis.tracks();
    let scheme = color_scheme(analysis.sequence_type());

    let columns = state.viewport.col_range(analysis.alignment_length());
    let (start_col, end_col) = (columns.start, columns.end);

    let mut lines: Vec<Line> = Vec::with_capacity(ROW_COUNT);

    for (row, role) in TrackRole::ALL.into_iter().enumerate() {
        let track = tracks.track(role);
        let spans: Vec<Span> = (start_col..end_col)
            .map(|col| {
                let c = track.base_at(col).map(char::from).unwrap_or(' ');
                let mut style = if track.is_mutated(col) {
                    Style::default()
                        .fg(Color::White)
                        .bg(Color::Magenta)
                        .add_modifier(Modifier::BOLD)
                } else {
                    Style::default().fg(Color::Black).bg(scheme.get_color(c))
                };
                if analysis.block_at(col).is_some() {
                    style = style.add_modifier(Modifier::UNDERLINED);
                }
                if row == state.cursor.row && col == state.cursor.col {
                    style = style.add_modifier(Modifier::REVERSED);
                }
                Span::styled(c.to_string(), style)
            })
            .collect();
        lines.push(Line::from(spans));
    }

    let conservation = &tracks.conservation;
    let spans: Vec<Span> = (start_col..end_col)
        .map(|col| {
            let symbol = conservation.get(col).unwrap_or(Conservation::None);
            let mut style = match symbol {
                Conservation::Full => {
                    Style::default().fg(Color::Green).add_modifier(Modifier::BOLD)
                }
                Conservation::Strong => Style::default().fg(Color::Cyan),
                Conservation::Weak => Style::default().fg(Color::Gray),
                Conservation::None => Style::default(),
            };
            if state.cursor.row == ROW_COUNT - 1 && col == state.cursor.col {
                style = style.add_modifier(Modifier::REVERSED);
            }
            Span::styled(symbol.symbol().to_string(), style)
        })
        .collect();
    lines.push(Line::from(spans));

    let title = format!(
        "{} [Site: {} | View: {}-{}/{}]",
        state.file_name,
        state.cursor.col + 1,
        start_col + 1,
        end_col,
        analysis.alignment_length()
    );

    let block = Block::default().borders(Borders::ALL).title(title);
    frame.render_widget(Paragraph::new(lines).block(block), area);
}

/// Renders the block and substitution summary under the alignment.
fn render_summary(frame: &mut Frame, state: &AppState, area: Rect) {
    let analysis = &state.analysis;
    let mut lines = vec![Line::from(Span::styled(
        analysis.title().as_str().to_string(),
        Style::default().add_modifier(Modifier::BOLD),
    ))];

    lines.push(Line::from(format!("Blocks ({}):", analysis.blocks().len())));
    for block in analysis.blocks() {
        lines.push(Line::from(format!("  {}", block)));
    }

    lines.push(Line::from(format!(
        "Substitutions ({}):",
        analysis.substitution_count()
    )));
    for sub in analysis.substitutions() {
        let style = if sub.column == state.cursor.col {
            Style::default().fg(Color::Magenta).add_modifier(Modifier::BOLD)
        } else {
            Style::default()
        };
        lines.push(Line::from(Span::styled(
            format!("  {}  {}", sub.position_string(), sub.context_string()),
            style,
        )));
    }

    let block = Block::default().borders(Borders::ALL).title("Summary");
    frame.render_widget(Paragraph::new(lines).block(block), area);
}

/// Renders the status bar at the bottom.
fn render_status_bar(frame: &mut Frame, state: &AppState, area: Rect) {
    let (mode_str, command_str) = match &state.mode {
        AppMode::Normal => ("NORMAL", String::new()),
        AppMode::Command(cmd) => ("COMMAND", format!(":{}", cmd)),
    };

    let tracks = state.analysis.tracks();
    let positions: Vec<String> = TrackRole::ALL
        .iter()
        .map(|&role| {
            let pos = tracks
                .track(role)
                .ungapped_position(state.cursor.col)
                .map(|p| p.to_string())
                .unwrap_or_else(|_| "-".to_string());
            format!("{}:{}", role.label(), pos)
        })
        .collect();

    let block_info = state
        .current_block()
        .map(|b| format!(" | Block {}..{}", b.start + 1, b.end + 1))
        .unwrap_or_default();

    let position_info = format!(
        "Col {}/{} | {}{} ",
        state.cursor.col + 1,
        state.analysis.alignment_length(),
        positions.join(" "),
        block_info
    );

    let message = state.status_message.as_deref().unwrap_or("");
    let left_content = if command_str.is_empty() {
        format!(" {} | {} ", mode_str, message)
    } else {
        format!(" {} | {} ", mode_str, command_str)
    };

    let left_len = left_content.chars().count();
    let status_line = Line::from(vec![
        Span::styled(left_content, Style::default().fg(Color::Black).bg(Color::Cyan)),
        Span::styled(
            " ".repeat((area.width as usize).saturating_sub(left_len + position_info.len())),
            Style::default().bg(Color::Cyan),
        ),
        Span::styled(
            position_info,
            Style::default()
                .fg(Color::Black)
                .bg(Color::Cyan)
                .add_modifier(Modifier::BOLD),
        ),
    ]);

    frame.render_widget(Paragraph::new(status_line), area);
}

/// Renders the help overlay centered over `area`.
fn render_help(frame: &mut Frame, area: Rect) {
    let popup = centered_rect(area, 70, 14);
    let text_width = popup.width.saturating_sub(4).max(10) as usize;

    let lines: Vec<Line> = help_lines(text_width).into_iter().map(Line::from).collect();

    let block = Block::default().borders(Borders::ALL).title("Help");
    frame.render_widget(Clear, popup);
    frame.render_widget(Paragraph::new(lines).block(block), popup);
}

/// Help text wrapped to `width` columns.
pub fn help_lines(width: usize) -> Vec<String> {
    HELP_TEXT
        .iter()
        .flat_map(|entry| textwrap::wrap(entry, width))
        .map(|line| line.into_owned())
        .collect()
}

/// A rectangle of at most `width` x `height` centered in `area`.
fn centered_rect(area: Rect, width: u16, height: u16) -> Rect {
    let width = width.min(area.width);
    let height = height.min(area.height);
    Rect {
        x: area.x + (area.width - width) / 2,
        y: area.y + (area.height - height) / 2,
        width,
        height,
    }
}

/// Calculates the number of visible alignment columns.
pub fn calculate_visible_cols(terminal_width: u16) -> usize {
    terminal_width.saturating_sub(NAME_PANEL_WIDTH + 2) as usize
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dna_colors() {
        let scheme = DnaColorScheme;
        assert_eq!(scheme.get_color('A'), Color::Red);
        assert_eq!(scheme.get_color('a'), Color::Red); // Case insensitive
        assert_eq!(scheme.get_color('C'), Color::Green);
        assert_eq!(scheme.get_color('G'), Color::Yellow);
        assert_eq!(scheme.get_color('T'), Color::Blue);
        assert_eq!(scheme.get_color('-'), Color::DarkGray);
        assert_eq!(scheme.get_color('N'), Color::DarkGray);
    }

    #[test]
    fn test_amino_acid_colors() {
        let scheme = AminoAcidColorScheme;
        assert_eq!(scheme.get_color('K'), Color::Blue);
        assert_eq!(scheme.get_color('d'), Color::Red);
        assert_eq!(scheme.get_color('X'), Color::DarkGray);
    }

    #[test]
    fn test_visible_cols() {
        // 100 - 20 (name panel) - 2 (borders) = 78 cols
        assert_eq!(calculate_visible_cols(100), 78);
        assert_eq!(calculate_visible_cols(10), 0);
    }

    #[test]
    fn test_help_lines_wrap() {
        let lines = help_lines(30);
        assert!(lines.iter().all(|l| l.chars().count() <= 30));
        assert!(lines.len() > HELP_TEXT.len());
    }

    #[test]
    fn test_centered_rect() {
        let area = Rect::new(0, 0, 100, 40);
        assert_eq!(centered_rect(area, 70, 14), Rect::new(15, 13, 70, 14));
        let small = Rect::new(0, 0, 20, 5);
        assert_eq!(centered_rect(small, 70, 14), small);
    }
}
