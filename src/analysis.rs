//! Conserved-block extraction and substitution detection.
//!
//! The pipeline runs once per input:
//! 1. [`read_clustal`] rebuilds the three tracks and the conservation row
//! 2. [`BlockExtractor`] finds maximal gap-free runs and keeps those that are
//!    long and conserved enough
//! 3. [`VariationDetector`] scans the kept blocks for columns where the
//!    subject and comparison tracks agree but the reference track differs,
//!    and confirms them against the neighboring conservation
//!
//! Every call to [`VariationParser::parse`] returns a fresh, owned
//! [`Analysis`]; nothing is shared between runs.

use std::fmt;
use std::path::Path;

use log::{debug, info, trace};

use crate::formats::clustal::read_clustal;
use crate::formats::{read_to_string, ParseError, ParseResult};
use crate::model::{AlignmentTitle, ColumnOutOfRange, SequenceTrack, SequenceType, TrackSet};

/// Columns taken on each side of a substitution for its context string.
pub const CONTEXT_FLANK: usize = 2;

/// Thresholds used by block extraction and substitution confirmation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AnalysisConfig {
    /// Minimum share of `*` columns in a block
    pub block_star: f64,
    /// Minimum block length in columns
    pub block_len: usize,
    /// Width of each flank checked around a substitution
    pub check_num: usize,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            block_star: 0.9,
            block_len: 10,
            check_num: 5,
        }
    }
}

impl AnalysisConfig {
    /// Creates a validated configuration.
    pub fn new(block_star: f64, block_len: usize, check_num: usize) -> ParseResult<Self> {
        if !(0.0..=1.0).contains(&block_star) {
            return Err(ParseError::InvalidSetting(format!(
                "block star fraction must be within 0..1 (got {})",
                block_star
            )));
        }
        if block_len == 0 {
            return Err(ParseError::InvalidSetting("block length must be at least 1".to_string()));
        }
        if check_num == 0 {
            return Err(ParseError::InvalidSetting(
                "neighbor check width must be at least 1".to_string(),
            ));
        }
        Ok(Self {
            block_star,
            block_len,
            check_num,
        })
    }
}

/// A conserved, gap-free column range (0-based, inclusive).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Block {
    pub start: usize,
    pub end: usize,
    pub star_fraction: f64,
}

impl Block {
    pub fn len(&self) -> usize {
        self.end - self.start + 1
    }

    pub fn contains(&self, col: usize) -> bool {
        (self.start..=self.end).contains(&col)
    }
}

impl fmt::Display for Block {
    /// `<start>..<end> L=<length> SP=<star fraction>`, 1-based.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}..{} L={} SP={}",
            self.start + 1,
            self.end + 1,
            self.len(),
            format_fraction(self.star_fraction)
        )
    }
}

/// Rounds to two decimals and drops trailing zeros, keeping one fractional digit.
///
/// `1.0`, `0.9` and `0.92` print as written.
pub fn format_fraction(value: f64) -> String {
    let rounded = format!("{:.2}", (value * 100.0).round() / 100.0);
    let trimmed = rounded.trim_end_matches('0');
    if trimmed.ends_with('.') {
        format!("{}0", trimmed)
    } else {
        trimmed.to_string()
    }
}

/// A confirmed substitution between the reference track and the other two.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Substitution {
    pub column: usize,
    pub subject_base: u8,
    pub reference_base: u8,
    pub comparison_base: u8,
    /// Ungapped 1-based positions in subject, reference and comparison
    pub positions: [usize; 3],
    pub subject_context: String,
    pub reference_context: String,
}

impl Substitution {
    /// `<ss_pos>-<rs_pos>-<rc_pos>`
    pub fn position_string(&self) -> String {
        let [ss, rs, rc] = self.positions;
        format!("{}-{}-{}", ss, rs, rc)
    }

    /// `<ss_ctx>:<rs_ctx>`
    pub fn context_string(&self) -> String {
        format!("{}:{}", self.subject_context, self.reference_context)
    }
}

/// Groups sorted column indices into maximal runs of consecutive values.
///
/// An empty input yields no runs.
pub fn group_continuous<I>(columns: I) -> Vec<(usize, usize)>
where
    I: IntoIterator<Item = usize>,
{
    let mut runs = Vec::new();
    let mut current: Option<(usize, usize)> = None;

    for col in columns {
        current = match current {
            Some((first, last)) if col == last + 1 => Some((first, col)),
            Some(run) => {
                runs.push(run);
                Some((col, col))
            }
            None => Some((col, col)),
        };
    }

    runs.extend(current);
    runs
}

/// Finds conserved gap-free blocks.
#[derive(Debug, Clone, Copy)]
pub struct BlockExtractor {
    block_len: usize,
    block_star: f64,
}

impl BlockExtractor {
    pub fn new(config: &AnalysisConfig) -> Self {
        Self {
            block_len: config.block_len,
            block_star: config.block_star,
        }
    }

    /// Columns where none of the three tracks has a gap.
    pub fn gap_free_columns(tracks: &TrackSet) -> Vec<usize> {
        (0..tracks.alignment_length())
            .filter(|&col| tracks.is_gap_free(col))
            .collect()
    }

    /// Returns accepted blocks in ascending column order.
    ///
    /// Runs failing either threshold are dropped whole.
    pub fn extract(&self, tracks: &TrackSet) -> Vec<Block> {
        group_continuous(Self::gap_free_columns(tracks))
            .into_iter()
            .filter_map(|(start, end)| {
                let block = Block {
                    start,
                    end,
                    star_fraction: tracks.conservation.star_fraction(start, end),
                };
                if block.len() < self.block_len || block.star_fraction < self.block_star {
                    debug!("Rejected run {}", block);
                    None
                } else {
                    debug!("Accepted block {}", block);
                    Some(block)
                }
            })
            .collect()
    }
}

/// Finds substitutions inside accepted blocks.
#[derive(Debug, Clone, Copy)]
pub struct VariationDetector {
    sequence_type: SequenceType,
    check_num: usize,
}

impl VariationDetector {
    pub fn new(sequence_type: SequenceType, config: &AnalysisConfig) -> Self {
        Self {
            sequence_type,
            check_num: config.check_num,
        }
    }

    /// Returns true if `col` is a substitution before the neighbor check.
    ///
    /// Columns with an unknown residue in any track are never candidates.
    pub fn is_candidate(&self, tracks: &TrackSet, col: usize) -> Result<bool, ColumnOutOfRange> {
        let ss = tracks.subject.base_at(col)?;
        let rs = tracks.reference.base_at(col)?;
        let rc = tracks.comparison.base_at(col)?;

        if [ss, rs, rc].iter().any(|&b| self.sequence_type.is_unknown(b)) {
            return Ok(false);
        }
        Ok(ss == rc && ss != rs)
    }

    /// Scans `blocks` left to right, flags confirmed columns on all three
    /// tracks and returns the substitutions in column order.
    pub fn detect(
        &self,
        tracks: &mut TrackSet,
        blocks: &[Block],
    ) -> Result<Vec<Substitution>, ColumnOutOfRange> {
        let mut substitutions = Vec::new();

        for block in blocks {
            for col in block.start..=block.end {
                if !self.is_candidate(tracks, col)? {
                    continue;
                }
                if !tracks.conservation.neighbor_conserved(col, self.check_num) {
                    trace!("Candidate at column {} lacks conserved neighbors", col + 1);
                    continue;
                }

                let substitution = Self::record(tracks, col)?;
                debug!(
                    "Substitution at column {}: {} ({})",
                    col + 1,
                    substitution.position_string(),
                    substitution.context_string()
                );

                tracks.subject.flag_mutation(col);
                tracks.reference.flag_mutation(col);
                tracks.comparison.flag_mutation(col);
                substitutions.push(substitution);
            }
        }

        Ok(substitutions)
    }

    fn record(tracks: &TrackSet, col: usize) -> Result<Substitution, ColumnOutOfRange> {
        Ok(Substitution {
            column: col,
            subject_base: tracks.subject.base_at(col)?,
            reference_base: tracks.reference.base_at(col)?,
            comparison_base: tracks.comparison.base_at(col)?,
            positions: [
                tracks.subject.ungapped_position(col)?,
                tracks.reference.ungapped_position(col)?,
                tracks.comparison.ungapped_position(col)?,
            ],
            subject_context: context(&tracks.subject, col)?,
            reference_context: context(&tracks.reference, col)?,
        })
    }
}

/// Residues within [`CONTEXT_FLANK`] columns of `col`, clamped to the track.
fn context(track: &SequenceTrack, col: usize) -> Result<String, ColumnOutOfRange> {
    let start = col.saturating_sub(CONTEXT_FLANK);
    let end = (col + CONTEXT_FLANK).min(track.len().saturating_sub(1));
    track.bases_in(start, end)
}

/// Result of analysing one alignment report.
#[derive(Debug, Clone)]
pub struct Analysis {
    title: AlignmentTitle,
    sequence_type: SequenceType,
    tracks: TrackSet,
    blocks: Vec<Block>,
    substitutions: Vec<Substitution>,
}

impl Analysis {
    pub fn title(&self) -> &AlignmentTitle {
        &self.title
    }

    pub fn sequence_type(&self) -> SequenceType {
        self.sequence_type
    }

    pub fn tracks(&self) -> &TrackSet {
        &self.tracks
    }

    pub fn alignment_length(&self) -> usize {
        self.tracks.alignment_length()
    }

    /// Accepted blocks, in column order.
    pub fn blocks(&self) -> &[Block] {
        &self.blocks
    }

    /// Confirmed substitutions, in column order.
    pub fn substitutions(&self) -> &[Substitution] {
        &self.substitutions
    }

    pub fn substitution_count(&self) -> usize {
        self.substitutions.len()
    }

    /// Block containing column `col`.
    pub fn block_at(&self, col: usize) -> Option<&Block> {
        self.blocks.iter().find(|block| block.contains(col))
    }

    pub fn block_descriptors(&self) -> Vec<String> {
        self.blocks.iter().map(Block::to_string).collect()
    }

    pub fn positions(&self) -> Vec<String> {
        self.substitutions.iter().map(Substitution::position_string).collect()
    }

    pub fn contexts(&self) -> Vec<String> {
        self.substitutions.iter().map(Substitution::context_string).collect()
    }

    /// Plain-text summary of blocks and substitutions.
    pub fn report(&self) -> String {
        let mut out = String::new();
        out.push_str(&format!("# {}\n", self.title.as_str()));
        out.push_str(&format!(
            "# tracks: ss={} rs={} rc={} ({} columns, {})\n",
            self.tracks.subject.name(),
            self.tracks.reference.name(),
            self.tracks.comparison.name(),
            self.alignment_length(),
            self.sequence_type
        ));
        out.push_str(&format!("blocks\t{}\n", self.blocks.len()));
        for descriptor in self.block_descriptors() {
            out.push_str(&format!("block\t{}\n", descriptor));
        }
        out.push_str(&format!("substitutions\t{}\n", self.substitution_count()));
        for sub in &self.substitutions {
            out.push_str(&format!(
                "substitution\t{}\t{}\n",
                sub.position_string(),
                sub.context_string()
            ));
        }
        out
    }
}

/// Reads an alignment report and runs the block and substitution analysis.
#[derive(Debug, Clone, Copy, Default)]
pub struct VariationParser {
    config: AnalysisConfig,
}

impl VariationParser {
    pub fn new(config: AnalysisConfig) -> Self {
        Self { config }
    }

    /// Parses and analyses a Clustal report held in memory.
    pub fn parse(&self, content: &str, sequence_type: SequenceType) -> ParseResult<Analysis> {
        let (title, mut tracks) = read_clustal(content)?;
        info!(
            "Read {} columns in {} group(s) for tracks {}, {}, {}",
            tracks.alignment_length(),
            tracks.chunk_count(),
            tracks.subject.name(),
            tracks.reference.name(),
            tracks.comparison.name()
        );

        let blocks = BlockExtractor::new(&self.config).extract(&tracks);
        let substitutions =
            VariationDetector::new(sequence_type, &self.config).detect(&mut tracks, &blocks)?;
        info!(
            "Found {} block(s) and {} substitution(s)",
            blocks.len(),
            substitutions.len()
        );

        Ok(Analysis {
            title,
            sequence_type,
            tracks,
            blocks,
            substitutions,
        })
    }

    /// Parses a sequence-type selector (`n` or `a`) and then the report.
    pub fn parse_with_selector(&self, content: &str, sequence_type: &str) -> ParseResult<Analysis> {
        let sequence_type = sequence_type.parse()?;
        self.parse(content, sequence_type)
    }

    /// Reads a Clustal file from disk and analyses it.
    pub fn parse_file<P: AsRef<Path>>(
        &self,
        path: P,
        sequence_type: SequenceType,
    ) -> ParseResult<Analysis> {
        let content = read_to_string(&path)?;
        self.parse(&content, sequence_type)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::TrackRole;

    /// Builds a single-group Clustal report.
    fn clustal(ss: &str, rs: &str, rc: &str, cons: &str) -> String {
        format!(
            "CLUSTAL 2.1 multiple sequence alignment\n\nss    {}\nrs    {}\nrc    {}\n      {}\n",
            ss, rs, rc, cons
        )
    }

    fn parse_default(content: &str) -> Analysis {
        VariationParser::default()
            .parse(content, SequenceType::Nucleotide)
            .unwrap()
    }

    #[test]
    fn test_group_continuous() {
        assert_eq!(group_continuous(vec![1, 2, 3, 5, 6, 9]), vec![(1, 3), (5, 6), (9, 9)]);
        assert_eq!(group_continuous(vec![4]), vec![(4, 4)]);
        assert!(group_continuous(Vec::new()).is_empty());
    }

    #[test]
    fn test_config_validation() {
        assert_eq!(AnalysisConfig::new(0.9, 10, 5).unwrap(), AnalysisConfig::default());
        assert!(matches!(AnalysisConfig::new(1.5, 10, 5), Err(ParseError::InvalidSetting(_))));
        assert!(AnalysisConfig::new(0.9, 0, 5).is_err());
        assert!(AnalysisConfig::new(0.9, 10, 0).is_err());
    }

    #[test]
    fn test_single_block_star_fraction() {
        let seq = "ACGTACGTACGT";
        let analysis = parse_default(&clustal(seq, seq, seq, "*********** "));
        assert_eq!(analysis.block_descriptors(), vec!["1..12 L=12 SP=0.92"]);
        assert_eq!(analysis.substitution_count(), 0);
    }

    #[test]
    fn test_format_fraction() {
        assert_eq!(format_fraction(1.0), "1.0");
        assert_eq!(format_fraction(0.9), "0.9");
        assert_eq!(format_fraction(11.0 / 12.0), "0.92");
        assert_eq!(format_fraction(19.0 / 20.0), "0.95");
        assert_eq!(format_fraction(0.0), "0.0");
    }

    #[test]
    fn test_round_star_fractions_keep_one_decimal() {
        let seq = "ACGTACGTACGT";
        let analysis = parse_default(&clustal(seq, seq, seq, "************"));
        assert_eq!(analysis.block_descriptors(), vec!["1..12 L=12 SP=1.0"]);

        let seq = "ACGTACGTACGTACGTACGT";
        let analysis = parse_default(&clustal(seq, seq, seq, "********* ********.*"));
        assert_eq!(analysis.block_descriptors(), vec!["1..20 L=20 SP=0.9"]);
    }

    #[test]
    fn test_short_run_rejected() {
        let seq = "ACGTACGT";
        let analysis = parse_default(&clustal(seq, seq, seq, "********"));
        assert!(analysis.blocks().is_empty());
    }

    #[test]
    fn test_low_star_fraction_rejected() {
        let seq = "ACGTACGTACGT";
        let analysis = parse_default(&clustal(seq, seq, seq, "*********.. "));
        assert!(analysis.blocks().is_empty());
    }

    #[test]
    fn test_gaps_split_blocks() {
        let ss = "ACGTACGTACGT-ACGTACGTACGT";
        let rs = "ACGTACGTACGTTACGTACGTACGT";
        let cons = "************ ************";
        let analysis = parse_default(&clustal(ss, rs, rs, cons));
        assert_eq!(
            analysis.block_descriptors(),
            vec!["1..12 L=12 SP=1.0", "14..25 L=12 SP=1.0"]
        );
        for block in analysis.blocks() {
            for col in block.start..=block.end {
                assert!(analysis.tracks().is_gap_free(col));
            }
        }
    }

    #[test]
    fn test_all_gap_columns_yield_no_blocks() {
        let analysis = parse_default(&clustal("A-G-", "-C-T", "AC--", "    "));
        assert!(analysis.blocks().is_empty());
    }

    #[test]
    fn test_substitution_detected() {
        let ss = "ACGTACACGTACG";
        let rs = "ACGTACGCGTACG";
        let cons = "****** ******";
        let analysis = parse_default(&clustal(ss, rs, ss, cons));

        assert_eq!(analysis.block_descriptors(), vec!["1..13 L=13 SP=0.92"]);
        assert_eq!(analysis.substitution_count(), 1);
        assert_eq!(analysis.positions(), vec!["7-7-7"]);
        assert_eq!(analysis.contexts(), vec!["ACACG:ACGCG"]);

        let sub = &analysis.substitutions()[0];
        assert_eq!(sub.column, 6);
        assert_eq!((sub.subject_base, sub.reference_base, sub.comparison_base), (b'A', b'G', b'A'));
        for role in TrackRole::ALL {
            assert!(analysis.tracks().track(role).is_mutated(6));
        }
    }

    #[test]
    fn test_ungapped_positions_reported() {
        // Leading gaps in rs and rc shift their ungapped coordinates
        let ss = "AAACGTACACGTACG";
        let rs = "--ACGTACGCGTACG";
        let rc = "A-ACGTACACGTACG";
        let cons = "  ****** ******";
        let analysis = parse_default(&clustal(ss, rs, rc, cons));
        assert_eq!(analysis.block_descriptors(), vec!["3..15 L=13 SP=0.92"]);
        assert_eq!(analysis.positions(), vec!["9-7-8"]);
    }

    #[test]
    fn test_left_flank_below_threshold() {
        // Right flank 5/5, left flank 3/5
        let ss = "ACGTACACGTACG";
        let rs = "ACGTACGCGTACG";
        let cons = "** * * ******";
        let config = AnalysisConfig::new(0.5, 10, 5).unwrap();
        let analysis = VariationParser::new(config)
            .parse(&clustal(ss, rs, ss, cons), SequenceType::Nucleotide)
            .unwrap();
        assert_eq!(analysis.blocks().len(), 1);
        assert_eq!(analysis.substitution_count(), 0);
        assert!(!analysis.tracks().subject.is_mutated(6));
    }

    #[test]
    fn test_candidate_too_close_to_edge() {
        // Candidate at column 3 has no room for a 5-column left flank
        let ss = "ACGAACGTACGTA";
        let rs = "ACGTACGTACGTA";
        let analysis = parse_default(&clustal(ss, rs, ss, "*** *********"));
        assert_eq!(analysis.blocks().len(), 1);
        assert_eq!(analysis.substitution_count(), 0);
    }

    #[test]
    fn test_subject_and_comparison_must_agree() {
        let ss = "ACGTACACGTACG";
        let rs = "ACGTACGCGTACG";
        let rc = "ACGTACTCGTACG";
        let analysis = parse_default(&clustal(ss, rs, rc, "****** ******"));
        assert_eq!(analysis.substitution_count(), 0);
    }

    #[test]
    fn test_unknown_residue_skipped() {
        let ss = "ACGTACNCGTACG";
        let rs = "ACGTACGCGTACG";
        let analysis = parse_default(&clustal(ss, rs, ss, "****** ******"));
        assert_eq!(analysis.substitution_count(), 0);

        // 'N' is an ordinary residue in amino-acid alignments
        let analysis = VariationParser::default()
            .parse(&clustal(ss, rs, ss, "****** ******"), SequenceType::AminoAcid)
            .unwrap();
        assert_eq!(analysis.substitution_count(), 1);
    }

    #[test]
    fn test_context_clamped_at_track_edge() {
        let track = {
            let mut t = SequenceTrack::new();
            t.append_chunk("ss", 1, b"ACGTA").unwrap();
            t
        };
        assert_eq!(context(&track, 0).unwrap(), "ACG");
        assert_eq!(context(&track, 4).unwrap(), "GTA");
        assert_eq!(context(&track, 2).unwrap(), "ACGTA");
    }

    #[test]
    fn test_invalid_selector() {
        let seq = "ACGTACGTACGT";
        let content = clustal(seq, seq, seq, "************");
        let result = VariationParser::default().parse_with_selector(&content, "x");
        assert!(matches!(result, Err(ParseError::InvalidSequenceType(_))));
    }

    #[test]
    fn test_reparse_is_identical() {
        let ss = "ACGTACACGTACG";
        let rs = "ACGTACGCGTACG";
        let content = clustal(ss, rs, ss, "****** ******");
        let parser = VariationParser::default();
        let first = parser.parse(&content, SequenceType::Nucleotide).unwrap();
        let second = parser.parse(&content, SequenceType::Nucleotide).unwrap();
        assert_eq!(first.block_descriptors(), second.block_descriptors());
        assert_eq!(first.substitutions(), second.substitutions());
        assert_eq!(first.tracks(), second.tracks());
    }

    #[test]
    fn test_report_lines() {
        let ss = "ACGTACACGTACG";
        let rs = "ACGTACGCGTACG";
        let analysis = parse_default(&clustal(ss, rs, ss, "****** ******"));
        let report = analysis.report();
        assert!(report.contains("block\t1..13 L=13 SP=0.92\n"));
        assert!(report.contains("substitutions\t1\n"));
        assert!(report.contains("substitution\t7-7-7\tACACG:ACGCG\n"));
    }

    #[test]
    fn test_block_spans_groups() {
        let content = "CLUSTAL W (1.83) multiple sequence alignment

ss    ACGTACGTAC
rs    ACGTACGTAC
rc    ACGTACGTAC
      **********

ss    GTACGTACGT
rs    GTTCGTACGT
rc    GTACGTACGT
      ** *******
";
        let analysis = parse_default(content);
        assert_eq!(analysis.alignment_length(), 20);
        assert_eq!(analysis.block_descriptors(), vec!["1..20 L=20 SP=0.95"]);
        assert_eq!(analysis.positions(), vec!["13-13-13"]);
        assert_eq!(analysis.contexts(), vec!["GTACG:GTTCG"]);
        assert_eq!(analysis.tracks().conservation.line_offsets(), &[0, 10, 20]);
    }

    #[test]
    fn test_parse_file() {
        use std::io::Write;

        let ss = "ACGTACACGTACG";
        let rs = "ACGTACGCGTACG";
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "{}", clustal(ss, rs, ss, "****** ******")).unwrap();
        file.flush().unwrap();

        let analysis = VariationParser::default()
            .parse_file(file.path(), SequenceType::Nucleotide)
            .unwrap();
        assert_eq!(analysis.positions(), vec!["7-7-7"]);
        for sub in analysis.substitutions() {
            assert_eq!(analysis.blocks().iter().filter(|b| b.contains(sub.column)).count(), 1);
        }
    }
}
