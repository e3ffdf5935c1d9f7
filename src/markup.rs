//! HTML markup rendering of an analysed alignment.
//!
//! The alignment is written back in its original chunk layout. Every
//! residue and conservation symbol gets its own `<span>`, with class names
//! taken from [`MarkupTags`] so a stylesheet can color residues, gaps,
//! conservation levels and substitution sites.

use crate::analysis::Analysis;
use crate::model::{Conservation, SequenceTrack, TrackRole, GAP};

/// Class names used in the generated markup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MarkupTags {
    pub container: String,
    pub title: String,
    pub subject: String,
    pub reference: String,
    pub comparison: String,
    /// `*` columns
    pub star: String,
    /// `:` columns
    pub colon: String,
    /// `.` columns
    pub dot: String,
    /// Column counter at the end of each conservation row
    pub count: String,
    pub gap: String,
    /// Substitution site on the subject and comparison tracks
    pub origin: String,
    /// Substitution site on the reference track
    pub mutation: String,
}

impl Default for MarkupTags {
    fn default() -> Self {
        Self {
            container: "alignment".to_string(),
            title: "title".to_string(),
            subject: "ss".to_string(),
            reference: "rs".to_string(),
            comparison: "rc".to_string(),
            star: "ast".to_string(),
            colon: "col".to_string(),
            dot: "dot".to_string(),
            count: "count".to_string(),
            gap: "gap".to_string(),
            origin: "o".to_string(),
            mutation: "m".to_string(),
        }
    }
}

impl MarkupTags {
    fn name_class(&self, role: TrackRole) -> &str {
        match role {
            TrackRole::Subject => &self.subject,
            TrackRole::Reference => &self.reference,
            TrackRole::Comparison => &self.comparison,
        }
    }

    fn substitution_class(&self, role: TrackRole) -> &str {
        match role {
            TrackRole::Reference => &self.mutation,
            TrackRole::Subject | TrackRole::Comparison => &self.origin,
        }
    }
}

/// Renders the whole alignment as an HTML fragment.
pub fn render_html(analysis: &Analysis, tags: &MarkupTags) -> String {
    let tracks = analysis.tracks();
    let offsets = tracks.conservation.line_offsets();
    let residue_class = analysis.sequence_type().code();

    let mut html = String::new();
    html.push_str(&format!("<div class=\"{}\">", tags.container));
    html.push_str(&format!(
        "<span class=\"{}\">{}</span></br>",
        tags.title,
        escape(analysis.title().as_str())
    ));
    html.push_str("<br><br>");

    for (chunk, bounds) in offsets.windows(2).enumerate() {
        let (start, end) = (bounds[0], bounds[1]);
        for role in TrackRole::ALL {
            render_track_row(
                &mut html,
                tracks.track(role),
                role,
                chunk,
                start,
                end,
                tags,
                residue_class,
            );
        }
        render_conservation_row(&mut html, analysis, chunk, start, end, tags);
        html.push_str("<br>");
    }

    html.push_str("</div>");
    html
}

#[allow(clippy::too_many_arguments)]
fn render_track_row(
    html: &mut String,
    track: &SequenceTrack,
    role: TrackRole,
    chunk: usize,
    start: usize,
    end: usize,
    tags: &MarkupTags,
    residue_class: &str,
) {
    html.push_str(&format!(
        "<span class=\"{}\">{}</span>",
        tags.name_class(role),
        escape(track.name())
    ));
    html.push_str(&"&nbsp;".repeat(track.name_padding(chunk)));

    for (offset, &base) in track.as_bytes()[start..end].iter().enumerate() {
        let residue = escape(&char::from(base).to_string());
        if track.is_mutated(start + offset) {
            html.push_str(&format!(
                "<span class=\"{} {}\">{}</span>",
                tags.substitution_class(role),
                residue,
                residue
            ));
        } else if base == GAP {
            html.push_str(&format!("<span class=\"{}\">{}</span>", tags.gap, residue));
        } else {
            html.push_str(&format!(
                "<span class=\"{} {}\">{}</span>",
                residue_class, residue, residue
            ));
        }
    }

    html.push_str("<br>");
}

fn render_conservation_row(
    html: &mut String,
    analysis: &Analysis,
    chunk: usize,
    start: usize,
    end: usize,
    tags: &MarkupTags,
) {
    let conservation = &analysis.tracks().conservation;
    html.push_str(&"&nbsp;".repeat(conservation.padding(chunk)));

    for &symbol in &conservation.symbols()[start..end] {
        let class = match symbol {
            Conservation::Full => &tags.star,
            Conservation::Strong => &tags.colon,
            Conservation::Weak => &tags.dot,
            Conservation::None => {
                html.push_str("&nbsp;");
                continue;
            }
        };
        html.push_str(&format!("<span class=\"{}\">{}</span>", class, symbol.symbol()));
    }

    html.push_str(&format!("<span class=\"{}\">{}</span>", tags.count, end));
    html.push_str("<br>");
}

/// Escapes text taken from the input file.
fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            _ => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::VariationParser;
    use crate::model::SequenceType;

    const INPUT: &str = "CLUSTAL W <test>

ss  ACGTACAC
rs  ACGTACGC
rc  ACGTACAC
    ****** *

ss  GTAC-
rs  GTACG
rc  GTACG
    ****.
";

    fn render(sequence_type: SequenceType) -> String {
        let analysis = VariationParser::default().parse(INPUT, sequence_type).unwrap();
        render_html(&analysis, &MarkupTags::default())
    }

    #[test]
    fn test_layout() {
        let html = render(SequenceType::Nucleotide);
        let head = concat!(
            "<div class=\"alignment\">",
            "<span class=\"title\">CLUSTAL W &lt;test&gt;</span></br><br><br>"
        );
        assert!(html.starts_with(head));
        assert!(html.ends_with("<br></div>"));
        assert_eq!(html.matches("<span class=\"ss\">ss</span>&nbsp;&nbsp;").count(), 2);
        assert_eq!(html.matches("<span class=\"count\">").count(), 2);
        assert!(html.contains("<span class=\"count\">8</span><br><br>"));
        assert!(html.contains("<span class=\"count\">13</span><br><br></div>"));
    }

    #[test]
    fn test_substitution_classes() {
        let html = render(SequenceType::Nucleotide);
        assert_eq!(html.matches("<span class=\"o A\">A</span>").count(), 2);
        assert_eq!(html.matches("<span class=\"m G\">G</span>").count(), 1);
    }

    #[test]
    fn test_residue_and_gap_classes() {
        let html = render(SequenceType::AminoAcid);
        assert!(html.contains("<span class=\"a C\">C</span>"));
        assert!(html.contains("<span class=\"gap\">-</span>"));
        assert!(!html.contains("class=\"n "));
    }

    #[test]
    fn test_conservation_symbols() {
        let html = render(SequenceType::Nucleotide);
        assert!(html.contains("<span class=\"ast\">*</span>&nbsp;<span class=\"ast\">*</span>"));
        assert!(html.contains("<span class=\"dot\">.</span><span class=\"count\">13</span>"));
    }

    #[test]
    fn test_custom_tags() {
        let analysis = VariationParser::default()
            .parse(INPUT, SequenceType::Nucleotide)
            .unwrap();
        let tags = MarkupTags {
            container: "msa".to_string(),
            mutation: "variant".to_string(),
            ..MarkupTags::default()
        };
        let html = render_html(&analysis, &tags);
        assert!(html.starts_with("<div class=\"msa\">"));
        assert!(html.contains("<span class=\"variant G\">G</span>"));
    }

    #[test]
    fn test_escape() {
        assert_eq!(escape("a<b>&\"c\""), "a&lt;b&gt;&amp;&quot;c&quot;");
    }
}
