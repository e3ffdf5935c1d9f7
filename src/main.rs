//! clustalvar - conserved blocks and substitutions in Clustal alignments
//!
//! ## Usage
//!
//! ```bash
//! clustalvar <alignment.aln>                     # interactive viewer
//! clustalvar -t amino-acid <alignment.aln> -o -  # text report on stdout
//! clustalvar <alignment.aln> -o out.html --html  # markup
//! ```
//!
//! The alignment must hold exactly three sequences, in the order
//! subject, reference, comparison.

// Use jemalloc for better memory management (returns memory to OS)
#[cfg(not(windows))]
#[global_allocator]
static GLOBAL: tikv_jemallocator::Jemalloc = tikv_jemallocator::Jemalloc;

use std::io::{self, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{ArgAction, Parser, ValueEnum};
use env_logger::fmt::Color;
use log::{info, Level, LevelFilter};

use clustalvar::analysis::{Analysis, AnalysisConfig, VariationParser};
use clustalvar::controller::run_app;
use clustalvar::markup::{render_html, MarkupTags};
use clustalvar::model::{AppState, SequenceType};

/// Sequence type selector for the command line
#[derive(Debug, Clone, Copy, ValueEnum)]
enum SeqTypeArg {
    /// DNA or RNA; 'N' marks unknown residues
    Nucleotide,
    /// Protein; 'X' marks unknown residues
    AminoAcid,
}

impl From<SeqTypeArg> for SequenceType {
    fn from(arg: SeqTypeArg) -> Self {
        match arg {
            SeqTypeArg::Nucleotide => SequenceType::Nucleotide,
            SeqTypeArg::AminoAcid => SequenceType::AminoAcid,
        }
    }
}

/// clustalvar - find conserved blocks and point substitutions in a
/// three-sequence Clustal alignment
///
/// When run without -o/--output, opens an interactive viewer.
/// With -o/--output, writes a report to file (or stdout with "-").
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Clustal alignment file (three sequences: subject, reference, comparison)
    file: PathBuf,

    /// Type of the aligned sequences
    #[arg(short = 't', long = "seq-type", value_enum, default_value = "nucleotide")]
    seq_type: SeqTypeArg,

    /// Minimum fraction of '*' columns in a conserved block (0-1)
    #[arg(long = "block-star", default_value_t = 0.9)]
    block_star: f64,

    /// Minimum length of a conserved block, in columns
    #[arg(long = "block-len", default_value_t = 10)]
    block_len: usize,

    /// Columns checked on each side of a substitution
    #[arg(long = "check-num", default_value_t = 5)]
    check_num: usize,

    /// Output file (enables CLI mode). Use "-" for stdout.
    #[arg(short = 'o', long = "output")]
    output: Option<String>,

    /// Write HTML markup instead of the text report (CLI mode only)
    #[arg(long = "html")]
    html: bool,

    /// Specify multiple times to increase verbosity level (e.g., -vv for more verbosity)
    #[arg(short = 'v', long = "verbose", action = ArgAction::Count)]
    verbosity: u8,
}

fn init_verbose(verbosity: u8) {
    let filter_level = match verbosity {
        0 => LevelFilter::Warn,
        1 => LevelFilter::Info,
        _ => LevelFilter::Debug,
    };

    env_logger::Builder::from_default_env()
        .format(|buf, record| {
            let level = record.level();
            let mut style = buf.style();
            match level {
                Level::Error => style.set_color(Color::Red),
                Level::Warn => style.set_color(Color::Yellow),
                Level::Info => style.set_color(Color::Green),
                Level::Debug => style.set_color(Color::Blue),
                Level::Trace => style.set_color(Color::Cyan),
            };

            writeln!(
                buf,
                "{} [{}] - {}",
                chrono::Local::now().format("%Y-%m-%d %H:%M:%S"),
                style.value(level),
                record.args()
            )
        })
        .filter_level(filter_level)
        .init();
}

/// Runs CLI mode: write the report or the markup to `output`.
fn run_cli_mode(analysis: &Analysis, output: &str, html: bool) -> Result<()> {
    let content = if html {
        render_html(analysis, &MarkupTags::default())
    } else {
        analysis.report()
    };

    if output == "-" {
        let stdout = io::stdout();
        let mut handle = stdout.lock();
        handle.write_all(content.as_bytes())?;
        if html {
            writeln!(handle)?;
        }
    } else {
        let mut file = std::fs::File::create(output)
            .with_context(|| format!("Cannot create output file {}", output))?;
        file.write_all(content.as_bytes())?;
        info!("Wrote {} to {}", if html { "markup" } else { "report" }, output);
    }

    Ok(())
}

fn file_label(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_verbose(args.verbosity);

    if args.html && args.output.is_none() {
        anyhow::bail!("--html needs -o/--output (use \"-\" for stdout)");
    }

    let config = AnalysisConfig::new(args.block_star, args.block_len, args.check_num)?;
    let parser = VariationParser::new(config);

    info!(
        "Running {}-{} on {}",
        env!("CARGO_PKG_NAME"),
        env!("CARGO_PKG_VERSION"),
        args.file.display()
    );
    let analysis = parser
        .parse_file(&args.file, args.seq_type.into())
        .with_context(|| format!("Cannot analyse {}", args.file.display()))?;

    if let Some(output) = args.output {
        run_cli_mode(&analysis, &output, args.html)?;
    } else {
        run_app(AppState::new(analysis, file_label(&args.file)))?;
    }

    Ok(())
}
