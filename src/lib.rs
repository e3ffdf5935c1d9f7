//! # clustalvar - Conserved blocks and substitutions in Clustal alignments
//!
//! Reads a three-sequence Clustal report, finds gap-free well-conserved
//! blocks, and reports point substitutions on the reference track that are
//! confirmed by the conservation of their neighbors.
//!
//! ## Architecture
//!
//! - `model`: Tracks, conservation row, sequence types, and viewer state
//! - `formats`: Clustal reading and the shared error type
//! - `analysis`: Block extraction, substitution detection, reports
//! - `markup`: HTML rendering of the annotated alignment
//! - `event`: Keyboard event handling (Vim-style navigation)
//! - `ui`: TUI rendering with ratatui
//! - `controller`: Orchestration of the viewer loop
//!
//! ## Example
//!
//! ```
//! use clustalvar::analysis::VariationParser;
//! use clustalvar::model::SequenceType;
//!
//! let report = "CLUSTAL 2.1 multiple sequence alignment\n\n\
//!               ss    ACGTACACGTACG\n\
//!               rs    ACGTACGCGTACG\n\
//!               rc    ACGTACACGTACG\n\
//!               \x20     ****** ******\n";
//! let analysis = VariationParser::default()
//!     .parse(report, SequenceType::Nucleotide)
//!     .unwrap();
//! assert_eq!(analysis.block_descriptors(), vec!["1..13 L=13 SP=0.92"]);
//! assert_eq!(analysis.positions(), vec!["7-7-7"]);
//! ```

pub mod analysis;
pub mod controller;
pub mod event;
pub mod formats;
pub mod markup;
pub mod model;
pub mod ui;
