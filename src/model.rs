//! Data model for the alignment analysis and viewer.
//!
//! This module contains all data structures for representing:
//! - The three aligned sequence tracks and the conservation track
//! - Sequence types and their unknown-residue symbols
//! - Viewport and application state for the interactive viewer
//!
//! Columns are 0-based indices into the shared alignment coordinate space.
//! Ungapped positions are 1-based and count residues only.

use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use thiserror::Error;

use crate::analysis::{Analysis, Block};
use crate::formats::ParseError;

/// Gap character used by Clustal in aligned sequences.
pub const GAP: u8 = b'-';

/// Number of rows shown by the viewer: three tracks plus conservation.
pub const ROW_COUNT: usize = 4;

/// Kind of residues held by the alignment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SequenceType {
    #[default]
    Nucleotide,
    AminoAcid,
}

impl SequenceType {
    /// Symbol used for an undetermined residue ('N' or 'X').
    pub fn unknown_residue(&self) -> u8 {
        match self {
            SequenceType::Nucleotide => b'N',
            SequenceType::AminoAcid => b'X',
        }
    }

    /// Returns true if `residue` is the undetermined residue, ignoring case.
    pub fn is_unknown(&self, residue: u8) -> bool {
        residue.eq_ignore_ascii_case(&self.unknown_residue())
    }

    /// Short code used as the residue class in markup output.
    pub fn code(&self) -> &'static str {
        match self {
            SequenceType::Nucleotide => "n",
            SequenceType::AminoAcid => "a",
        }
    }
}

impl fmt::Display for SequenceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SequenceType::Nucleotide => write!(f, "nucleotide"),
            SequenceType::AminoAcid => write!(f, "amino acid"),
        }
    }
}

impl FromStr for SequenceType {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "n" | "nt" | "nucleotide" => Ok(SequenceType::Nucleotide),
            "a" | "aa" | "amino_acid" | "amino-acid" | "protein" => Ok(SequenceType::AminoAcid),
            _ => Err(ParseError::InvalidSequenceType(s.to_string())),
        }
    }
}

/// Role of a track, fixed by its order inside each group of lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackRole {
    /// First line of a group ("ss").
    Subject,
    /// Second line of a group ("rs"), the track carrying substitutions.
    Reference,
    /// Third line of a group ("rc").
    Comparison,
}

impl TrackRole {
    pub const ALL: [TrackRole; 3] = [
        TrackRole::Subject,
        TrackRole::Reference,
        TrackRole::Comparison,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            TrackRole::Subject => "ss",
            TrackRole::Reference => "rs",
            TrackRole::Comparison => "rc",
        }
    }
}

/// A column lookup fell outside a track.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("Column {column} is out of range for a track of length {len}")]
pub struct ColumnOutOfRange {
    pub column: usize,
    pub len: usize,
}

/// Errors raised while appending one chunk of a group to a track.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ChunkError {
    #[error("track name '{found}' does not match earlier name '{expected}'")]
    NameMismatch { expected: String, found: String },

    #[error("chunk holds {found} columns, expected {expected}")]
    LengthMismatch { expected: usize, found: usize },

    #[error("unrecognized conservation symbol '{0}'")]
    UnknownSymbol(char),
}

/// One aligned sequence, accumulated chunk by chunk.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SequenceTrack {
    name: String,
    bases: Vec<u8>,
    /// Residue count of each chunk, in input order
    chunk_lengths: Vec<usize>,
    /// Whitespace width between the name and the residues, per chunk
    name_padding: Vec<usize>,
    mutated_columns: BTreeSet<usize>,
}

impl SequenceTrack {
    /// Creates an empty track.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends one chunk of residues.
    ///
    /// The first chunk sets the track name; later chunks must repeat it.
    pub fn append_chunk(
        &mut self,
        name: &str,
        padding: usize,
        residues: &[u8],
    ) -> Result<(), ChunkError> {
        if self.chunk_lengths.is_empty() {
            self.name = name.to_string();
        } else if self.name != name {
            return Err(ChunkError::NameMismatch {
                expected: self.name.clone(),
                found: name.to_string(),
            });
        }

        self.bases.extend_from_slice(residues);
        self.chunk_lengths.push(residues.len());
        self.name_padding.push(padding);
        Ok(())
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the number of alignment columns.
    pub fn len(&self) -> usize {
        self.bases.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bases.is_empty()
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bases
    }

    pub fn chunk_lengths(&self) -> &[usize] {
        &self.chunk_lengths
    }

    /// Whitespace width after the name in chunk `chunk`.
    pub fn name_padding(&self, chunk: usize) -> usize {
        self.name_padding.get(chunk).copied().unwrap_or(1)
    }

    /// Returns the residue at `col`.
    pub fn base_at(&self, col: usize) -> Result<u8, ColumnOutOfRange> {
        self.bases.get(col).copied().ok_or(self.out_of_range(col))
    }

    /// Returns the residues of the inclusive range `start..=end`.
    pub fn bases_in(&self, start: usize, end: usize) -> Result<String, ColumnOutOfRange> {
        if start > end {
            return Err(self.out_of_range(start));
        }
        let slice = self.bases.get(start..=end).ok_or(self.out_of_range(end))?;
        Ok(String::from_utf8_lossy(slice).into_owned())
    }

    /// 1-based position of `col` in the ungapped sequence.
    ///
    /// Counts residues in `0..=col`; a gap column reports the position of the
    /// last residue before it (0 if there is none).
    pub fn ungapped_position(&self, col: usize) -> Result<usize, ColumnOutOfRange> {
        let prefix = self.bases.get(..=col).ok_or(self.out_of_range(col))?;
        Ok(prefix.iter().filter(|&&b| b != GAP).count())
    }

    pub fn is_gap(&self, col: usize) -> bool {
        self.bases.get(col) == Some(&GAP)
    }

    /// Marks `col` as a substitution site. Flagging twice is a no-op.
    pub fn flag_mutation(&mut self, col: usize) {
        self.mutated_columns.insert(col);
    }

    pub fn is_mutated(&self, col: usize) -> bool {
        self.mutated_columns.contains(&col)
    }

    pub fn mutated_columns(&self) -> impl Iterator<Item = usize> + '_ {
        self.mutated_columns.iter().copied()
    }

    fn out_of_range(&self, column: usize) -> ColumnOutOfRange {
        ColumnOutOfRange {
            column,
            len: self.bases.len(),
        }
    }
}

/// Per-column conservation annotation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Conservation {
    /// `*`
    Full,
    /// `:`
    Strong,
    /// `.`
    Weak,
    /// ` `
    None,
}

impl Conservation {
    pub fn from_symbol(c: char) -> Option<Self> {
        match c {
            '*' => Some(Conservation::Full),
            ':' => Some(Conservation::Strong),
            '.' => Some(Conservation::Weak),
            ' ' => Some(Conservation::None),
            _ => None,
        }
    }

    pub fn symbol(&self) -> char {
        match self {
            Conservation::Full => '*',
            Conservation::Strong => ':',
            Conservation::Weak => '.',
            Conservation::None => ' ',
        }
    }
}

/// The conservation row, aligned 1:1 with the sequence tracks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConservationTrack {
    symbols: Vec<Conservation>,
    /// Cumulative column count at each chunk boundary, starting at 0
    line_offsets: Vec<usize>,
    padding: Vec<usize>,
}

impl Default for ConservationTrack {
    fn default() -> Self {
        Self {
            symbols: Vec::new(),
            line_offsets: vec![0],
            padding: Vec::new(),
        }
    }
}

impl ConservationTrack {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends the conservation line of one group.
    ///
    /// The last `expected_len` characters of `line` are the symbols; whatever
    /// precedes them is padding under the sequence names.
    pub fn append_chunk(&mut self, line: &str, expected_len: usize) -> Result<(), ChunkError> {
        let chars: Vec<char> = line.trim_end_matches(['\n', '\r']).chars().collect();
        if chars.len() < expected_len {
            return Err(ChunkError::LengthMismatch {
                expected: expected_len,
                found: chars.len(),
            });
        }

        let padding = chars.len() - expected_len;
        let symbols = chars[padding..]
            .iter()
            .map(|&c| Conservation::from_symbol(c).ok_or(ChunkError::UnknownSymbol(c)))
            .collect::<Result<Vec<_>, _>>()?;

        self.symbols.extend(symbols);
        self.padding.push(padding);
        let last = self.line_offsets.last().copied().unwrap_or(0);
        self.line_offsets.push(last + expected_len);
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.symbols.len()
    }

    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty()
    }

    pub fn symbols(&self) -> &[Conservation] {
        &self.symbols
    }

    pub fn get(&self, col: usize) -> Option<Conservation> {
        self.symbols.get(col).copied()
    }

    pub fn line_offsets(&self) -> &[usize] {
        &self.line_offsets
    }

    /// Leading padding width of chunk `chunk`.
    pub fn padding(&self, chunk: usize) -> usize {
        self.padding.get(chunk).copied().unwrap_or(0)
    }

    /// Number of `*` columns in `start..=end`. Empty or out-of-range spans count 0.
    pub fn star_count(&self, start: usize, end: usize) -> usize {
        self.symbols
            .get(start..=end)
            .map_or(0, |s| s.iter().filter(|&&c| c == Conservation::Full).count())
    }

    /// Fraction of `*` columns in `start..=end`.
    pub fn star_fraction(&self, start: usize, end: usize) -> f64 {
        if start > end {
            return 0.0;
        }
        self.star_count(start, end) as f64 / (end - start + 1) as f64
    }

    /// Checks that a candidate column sits in a well-conserved neighborhood.
    ///
    /// Both `window`-wide flanks must exist. The right flank has to reach the
    /// star ratio before the left flank is looked at; the left flank then
    /// decides.
    pub fn neighbor_conserved(&self, position: usize, window: usize) -> bool {
        if position < window || position + window >= self.symbols.len() {
            return false;
        }

        let threshold = window as f64 * NEIGHBOR_STAR_RATIO;

        let right = self.star_count(position + 1, position + window);
        if (right as f64) < threshold {
            return false;
        }

        let left = self.star_count(position - window, position - 1);
        left as f64 >= threshold
    }
}

/// Share of `*` columns each flank needs in [`ConservationTrack::neighbor_conserved`].
pub const NEIGHBOR_STAR_RATIO: f64 = 0.8;

/// The header line of a Clustal report.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AlignmentTitle(String);

impl AlignmentTitle {
    pub fn new(line: impl Into<String>) -> Self {
        Self(line.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// The three sequence tracks and the conservation track of one alignment.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TrackSet {
    pub subject: SequenceTrack,
    pub reference: SequenceTrack,
    pub comparison: SequenceTrack,
    pub conservation: ConservationTrack,
}

impl TrackSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn track(&self, role: TrackRole) -> &SequenceTrack {
        match role {
            TrackRole::Subject => &self.subject,
            TrackRole::Reference => &self.reference,
            TrackRole::Comparison => &self.comparison,
        }
    }

    pub fn track_mut(&mut self, role: TrackRole) -> &mut SequenceTrack {
        match role {
            TrackRole::Subject => &mut self.subject,
            TrackRole::Reference => &mut self.reference,
            TrackRole::Comparison => &mut self.comparison,
        }
    }

    /// Number of alignment columns.
    pub fn alignment_length(&self) -> usize {
        self.conservation.len()
    }

    /// Number of chunks (groups of lines) read from the input.
    pub fn chunk_count(&self) -> usize {
        self.conservation.line_offsets().len().saturating_sub(1)
    }

    /// Returns true if column `col` has a residue in all three tracks.
    pub fn is_gap_free(&self, col: usize) -> bool {
        TrackRole::ALL.iter().all(|&role| {
            let track = self.track(role);
            col < track.len() && !track.is_gap(col)
        })
    }
}

/// The viewport defines what portion of the alignment is currently visible.
///
/// Rows are fixed (three tracks and the conservation row), only columns scroll.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Viewport {
    /// Index of the first visible column
    pub first_col: usize,
    /// Number of visible columns
    pub visible_cols: usize,
}

impl Viewport {
    pub fn new(visible_cols: usize) -> Self {
        Self {
            first_col: 0,
            visible_cols,
        }
    }

    pub fn resize(&mut self, visible_cols: usize) {
        self.visible_cols = visible_cols;
    }

    /// Returns the range of visible columns, clipped to `len` columns.
    pub fn col_range(&self, len: usize) -> std::ops::Range<usize> {
        let end = (self.first_col + self.visible_cols).min(len);
        self.first_col.min(end)..end
    }

    pub fn is_col_visible(&self, col: usize) -> bool {
        col >= self.first_col && col < self.first_col + self.visible_cols
    }
}

/// The current cursor position in the alignment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Cursor {
    /// Current row (0..ROW_COUNT)
    pub row: usize,
    /// Current column
    pub col: usize,
}

impl Cursor {
    pub fn new() -> Self {
        Self::default()
    }
}

/// Application mode for handling different input states.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum AppMode {
    /// Normal navigation mode
    #[default]
    Normal,
    /// Command input mode (after pressing ':')
    Command(String),
}

/// The complete viewer state.
#[derive(Debug)]
pub struct AppState {
    /// The analysed alignment
    pub analysis: Analysis,
    /// Name of the file being viewed (for the title bar)
    pub file_name: String,
    pub viewport: Viewport,
    pub cursor: Cursor,
    pub mode: AppMode,
    pub should_quit: bool,
    /// Status message to display
    pub status_message: Option<String>,
    pub show_help: bool,
}

impl AppState {
    /// Creates a new viewer state for an analysed alignment.
    pub fn new(analysis: Analysis, file_name: String) -> Self {
        let status_message = Some(format!(
            "{} block(s), {} substitution(s)",
            analysis.blocks().len(),
            analysis.substitution_count()
        ));
        Self {
            analysis,
            file_name,
            viewport: Viewport::new(0),
            cursor: Cursor::new(),
            mode: AppMode::Normal,
            should_quit: false,
            status_message,
            show_help: false,
        }
    }

    fn alignment_length(&self) -> usize {
        self.analysis.alignment_length()
    }

    /// Updates the viewport size based on terminal dimensions.
    pub fn update_viewport_size(&mut self, cols: usize) {
        self.viewport.resize(cols);
        self.ensure_cursor_visible();
    }

    pub fn move_up(&mut self) {
        self.cursor.row = self.cursor.row.saturating_sub(1);
    }

    pub fn move_down(&mut self) {
        if self.cursor.row + 1 < ROW_COUNT {
            self.cursor.row += 1;
        }
    }

    pub fn move_left(&mut self) {
        if self.cursor.col > 0 {
            self.cursor.col -= 1;
            self.ensure_cursor_visible();
        }
    }

    pub fn move_right(&mut self) {
        if self.cursor.col + 1 < self.alignment_length() {
            self.cursor.col += 1;
            self.ensure_cursor_visible();
        }
    }

    pub fn goto_first_column(&mut self) {
        self.goto_column(0);
    }

    pub fn goto_last_column(&mut self) {
        self.goto_column(self.alignment_length().saturating_sub(1));
    }

    /// Moves the cursor to a 0-based column, clamped to the alignment.
    pub fn goto_column(&mut self, col: usize) {
        self.cursor.col = col.min(self.alignment_length().saturating_sub(1));
        self.ensure_cursor_visible();
    }

    /// Jumps to the first substitution right of the cursor.
    pub fn next_substitution(&mut self) {
        let col = self.cursor.col;
        let target = self
            .analysis
            .substitutions()
            .iter()
            .map(|s| s.column)
            .find(|&c| c > col);
        self.jump_or_report(target, "No substitution after this column");
    }

    /// Jumps to the closest substitution left of the cursor.
    pub fn previous_substitution(&mut self) {
        let col = self.cursor.col;
        let target = self
            .analysis
            .substitutions()
            .iter()
            .rev()
            .map(|s| s.column)
            .find(|&c| c < col);
        self.jump_or_report(target, "No substitution before this column");
    }

    /// Jumps to the start of the next accepted block.
    pub fn next_block(&mut self) {
        let col = self.cursor.col;
        let target = self.analysis.blocks().iter().map(|b| b.start).find(|&s| s > col);
        self.jump_or_report(target, "No block after this column");
    }

    /// Jumps to the start of the enclosing block, or of the previous one.
    pub fn previous_block(&mut self) {
        let col = self.cursor.col;
        let target = self
            .analysis
            .blocks()
            .iter()
            .rev()
            .map(|b| b.start)
            .find(|&s| s < col);
        self.jump_or_report(target, "No block before this column");
    }

    fn jump_or_report(&mut self, target: Option<usize>, message: &str) {
        match target {
            Some(col) => {
                self.goto_column(col);
                self.status_message = None;
            }
            None => self.status_message = Some(message.to_string()),
        }
    }

    /// Block containing the cursor column, if any.
    pub fn current_block(&self) -> Option<&Block> {
        self.analysis.block_at(self.cursor.col)
    }

    /// Ensures the cursor is visible, centering it when it leaves the view.
    fn ensure_cursor_visible(&mut self) {
        if !self.viewport.is_col_visible(self.cursor.col) {
            self.center_column();
        }
        self.clamp_viewport();
    }

    fn center_column(&mut self) {
        if self.viewport.visible_cols > 0 {
            let half = self.viewport.visible_cols / 2;
            self.viewport.first_col = self.cursor.col.saturating_sub(half);
        }
    }

    fn clamp_viewport(&mut self) {
        let len = self.alignment_length();
        if self.viewport.first_col + self.viewport.visible_cols > len {
            self.viewport.first_col = len.saturating_sub(self.viewport.visible_cols);
        }
        self.cursor.col = self.cursor.col.min(len.saturating_sub(1));
    }

    pub fn enter_command_mode(&mut self) {
        self.mode = AppMode::Command(String::new());
    }

    pub fn command_input(&mut self, c: char) {
        if let AppMode::Command(ref mut cmd) = self.mode {
            cmd.push(c);
        }
    }

    pub fn command_backspace(&mut self) {
        if let AppMode::Command(ref mut cmd) = self.mode {
            cmd.pop();
            if cmd.is_empty() {
                self.mode = AppMode::Normal;
            }
        }
    }

    /// Executes the current command (`:q`, `:h`, `:<column>`).
    pub fn execute_command(&mut self) {
        if let AppMode::Command(ref cmd) = self.mode.clone() {
            match cmd.as_str() {
                "q" | "quit" => self.should_quit = true,
                "h" | "help" => self.show_help = true,
                _ => {
                    if let Ok(col) = cmd.parse::<usize>() {
                        if col > 0 && col <= self.alignment_length() {
                            // 1-indexed for user
                            self.goto_column(col - 1);
                        } else {
                            self.status_message = Some(format!("Invalid column: {}", col));
                        }
                    } else {
                        self.status_message = Some(format!("Unknown command: {}", cmd));
                    }
                }
            }
        }
        self.mode = AppMode::Normal;
    }

    pub fn cancel_command(&mut self) {
        self.mode = AppMode::Normal;
    }

    pub fn show_help(&mut self) {
        self.show_help = true;
    }

    pub fn dismiss_help(&mut self) {
        self.show_help = false;
    }
}
