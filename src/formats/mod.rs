//! Alignment report reading.
//!
//! Clustal is the only supported input format. This module owns the error
//! type shared by the reader and the analysis, and the file entry point.

pub mod clustal;

use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

use thiserror::Error;

use crate::model::{ChunkError, ColumnOutOfRange};

/// Errors that can occur while reading or analysing an alignment.
#[derive(Error, Debug)]
pub enum ParseError {
    #[error("Failed to open file: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Empty file")]
    EmptyFile,

    #[error("Invalid sequence type '{0}': expected 'n' (nucleotide) or 'a' (amino acid)")]
    InvalidSequenceType(String),

    #[error("Invalid analysis setting: {0}")]
    InvalidSetting(String),

    #[error("Need a Clustal file: first line should start with 'CLUSTAL', got '{0}'")]
    MissingHeader(String),

    #[error("Line {line}: expected '<name> <residues>', got '{content}'")]
    MalformedSequenceLine { line: usize, content: String },

    #[error("Line {line}: group is missing lines (expected 3 sequence lines and a conservation line)")]
    TruncatedGroup { line: usize },

    #[error("Line {line}: {source}")]
    Chunk {
        line: usize,
        #[source]
        source: ChunkError,
    },

    #[error(transparent)]
    Column(#[from] ColumnOutOfRange),
}

impl ParseError {
    /// Returns true for errors caused by the shape of the input.
    pub fn is_format_error(&self) -> bool {
        matches!(
            self,
            ParseError::MissingHeader(_)
                | ParseError::MalformedSequenceLine { .. }
                | ParseError::TruncatedGroup { .. }
                | ParseError::Chunk { .. }
        )
    }
}

/// Result type for parsing operations.
pub type ParseResult<T> = Result<T, ParseError>;

/// Reads a whole alignment report into memory.
pub fn read_to_string<P: AsRef<Path>>(path: P) -> ParseResult<String> {
    let file = File::open(&path)?;
    let file_size = file.metadata()?.len() as usize;

    if file_size == 0 {
        return Err(ParseError::EmptyFile);
    }

    let mut reader = BufReader::with_capacity(1024 * 1024, file);
    let mut content = String::with_capacity(file_size);
    reader.read_to_string(&mut content)?;
    Ok(content)
}
