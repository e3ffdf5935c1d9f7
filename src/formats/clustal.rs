//! Clustal format reader.
//!
//! Reassembles the interleaved groups of a three-sequence Clustal report
//! into full tracks.
//!
//! ## Clustal Format
//!
//! ```text
//! CLUSTAL 2.1 multiple sequence alignment
//!
//! human      ACGTACGTAC
//! mouse      ACGTACCTAC
//! rat        ACGTACGTAC
//!            ****** ***
//!
//! human      GGCA
//! mouse      GGCA
//! rat        GG-A
//!            ** *
//! ```
//!
//! Every group is exactly three sequence lines, in a fixed track order,
//! followed by one conservation line. Blank lines between groups are
//! skipped. Anything after the residue run of a sequence line (such as a
//! cumulative residue count) is ignored.

use log::debug;

use super::{ParseError, ParseResult};
use crate::model::{AlignmentTitle, ChunkError, TrackRole, TrackSet};

/// Literal that every Clustal header line starts with.
pub const CLUSTAL_MARKER: &str = "CLUSTAL";

/// A sequence line split into its three fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SequenceLine<'a> {
    pub name: &'a str,
    /// Width of the whitespace run between name and residues
    pub padding: usize,
    pub residues: &'a str,
}

/// Splits `<name><whitespace><residues>` into its parts.
///
/// The name must start at the first character of the line. Returns `None`
/// if any of the three fields is missing.
pub fn split_sequence_line(line: &str) -> Option<SequenceLine<'_>> {
    let name_end = line.find(char::is_whitespace)?;
    if name_end == 0 {
        return None;
    }

    let rest = &line[name_end..];
    let residues_start = rest.find(|c: char| !c.is_whitespace())?;
    let padding = rest[..residues_start].chars().count();

    let rest = &rest[residues_start..];
    let residues_end = rest.find(char::is_whitespace).unwrap_or(rest.len());

    Some(SequenceLine {
        name: &line[..name_end],
        padding,
        residues: &rest[..residues_end],
    })
}

/// Reads a Clustal report into its title and tracks.
///
/// Nothing is returned on failure; the partially filled tracks are dropped.
pub fn read_clustal(content: &str) -> ParseResult<(AlignmentTitle, TrackSet)> {
    let mut lines = content
        .lines()
        .enumerate()
        .map(|(idx, line)| (idx + 1, line.strip_suffix('\r').unwrap_or(line)));

    let header = lines.next().map(|(_, line)| line).unwrap_or("");
    if !header.starts_with(CLUSTAL_MARKER) {
        return Err(ParseError::MissingHeader(header.to_string()));
    }
    let title = AlignmentTitle::new(header);

    let mut tracks = TrackSet::new();
    while let Some((line_number, line)) = lines.next() {
        // Blank lines separate groups
        if line.trim().is_empty() {
            continue;
        }

        let mut group_len = None;
        let mut current = (line_number, line);
        for (i, role) in TrackRole::ALL.into_iter().enumerate() {
            if i > 0 {
                current = lines
                    .next()
                    .ok_or(ParseError::TruncatedGroup { line: line_number })?;
            }
            let (number, text) = current;
            let len = append_sequence_line(&mut tracks, role, number, text, group_len)?;
            group_len = Some(len);
        }

        let expected = group_len.unwrap_or(0);
        let (number, text) = lines
            .next()
            .ok_or(ParseError::TruncatedGroup { line: line_number })?;
        tracks
            .conservation
            .append_chunk(text, expected)
            .map_err(|source| ParseError::Chunk { line: number, source })?;

        debug!(
            "Read group at line {} ({} columns, {} total)",
            line_number,
            expected,
            tracks.alignment_length()
        );
    }

    Ok((title, tracks))
}

/// Parses one sequence line into the track for `role`.
///
/// Returns the residue count of the chunk; it must match `expected` when given.
fn append_sequence_line(
    tracks: &mut TrackSet,
    role: TrackRole,
    line_number: usize,
    line: &str,
    expected: Option<usize>,
) -> ParseResult<usize> {
    let parsed = split_sequence_line(line)
        .filter(|parsed| parsed.residues.bytes().all(|b| b.is_ascii_graphic()))
        .ok_or_else(|| ParseError::MalformedSequenceLine {
            line: line_number,
            content: line.to_string(),
        })?;

    let len = parsed.residues.len();
    if let Some(expected) = expected {
        if len != expected {
            return Err(ParseError::Chunk {
                line: line_number,
                source: ChunkError::LengthMismatch { expected, found: len },
            });
        }
    }

    tracks
        .track_mut(role)
        .append_chunk(parsed.name, parsed.padding, parsed.residues.as_bytes())
        .map_err(|source| ParseError::Chunk {
            line: line_number,
            source,
        })?;

    Ok(len)
}
