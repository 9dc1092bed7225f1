use crate::styles;
use ratatui::style::Style;
use ratatui::text::{Line, Span};
use unicode_width::UnicodeWidthStr;
use veracity_llm::{AnalysisResult, ClaimStatus, Reliability, Verdict};

pub const DISCLAIMER: &str =
    "Veracity provides AI-based analysis and should not replace critical judgment.";
pub const MIN_WIDTH: usize = 40;

const INDENT: &str = "   ";
const SOURCE_INDENT: &str = "     ";
const BAR_CELLS: usize = 24;
const STATUS_COLUMN: usize = 10;

/// Closed glyph set for explanation icons. Anything the model invents maps
/// to [`Glyph::Info`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Glyph {
    AlertTriangle,
    FileSearch,
    HelpCircle,
    AlertCircle,
    ShieldCheck,
    CheckCircle,
    XCircle,
    Info,
}

impl Glyph {
    pub fn for_icon(icon: &str) -> Self {
        match icon {
            "AlertTriangle" => Glyph::AlertTriangle,
            "Search" | "FileSearch" => Glyph::FileSearch,
            "Info" => Glyph::HelpCircle,
            "ShieldOff" => Glyph::AlertCircle,
            "ShieldCheck" => Glyph::ShieldCheck,
            "CheckCircle" => Glyph::CheckCircle,
            "XCircle" => Glyph::XCircle,
            _ => Glyph::Info,
        }
    }

    pub fn symbol(self) -> &'static str {
        match self {
            Glyph::AlertTriangle => "⚠",
            Glyph::FileSearch => "⌕",
            Glyph::HelpCircle => "?",
            Glyph::AlertCircle => "!",
            Glyph::ShieldCheck => "⛨",
            Glyph::CheckCircle => "✔",
            Glyph::XCircle => "✖",
            Glyph::Info => "ℹ",
        }
    }
}

pub fn verdict_label(verdict: Verdict) -> &'static str {
    match verdict {
        Verdict::Fake => "Likely Fake",
        Verdict::Uncertain => "Uncertain",
        Verdict::Genuine => "Likely Genuine",
    }
}

fn verdict_style(verdict: Verdict) -> Style {
    match verdict {
        Verdict::Fake => styles::fake(),
        Verdict::Uncertain => styles::uncertain(),
        Verdict::Genuine => styles::genuine(),
    }
}

fn verdict_glyph(verdict: Verdict) -> Glyph {
    match verdict {
        Verdict::Fake => Glyph::XCircle,
        Verdict::Uncertain => Glyph::AlertCircle,
        Verdict::Genuine => Glyph::CheckCircle,
    }
}

fn status_style(status: ClaimStatus) -> Style {
    match status {
        ClaimStatus::True => styles::genuine(),
        ClaimStatus::False => styles::fake(),
        ClaimStatus::Misleading => styles::uncertain(),
    }
}

fn reliability_style(reliability: Reliability) -> Style {
    match reliability {
        Reliability::Trusted => styles::trusted(),
        Reliability::Unknown => styles::unknown(),
    }
}

/// `92` renders as `92%`, `87.5` as `87.5%`.
pub fn format_confidence(confidence: f64) -> String {
    if confidence.fract() == 0.0 {
        format!("{confidence:.0}%")
    } else {
        format!("{confidence:.1}%")
    }
}

/// Number of filled cells out of `cells` for a 0..=100 score.
pub fn filled_cells(confidence: f64, cells: usize) -> usize {
    let ratio = (confidence / 100.0).clamp(0.0, 1.0);
    ((ratio * cells as f64).round() as usize).min(cells)
}

fn wrap(text: &str, width: usize) -> Vec<String> {
    textwrap::wrap(text, width.max(1))
        .into_iter()
        .map(|cow| cow.into_owned())
        .collect()
}

fn pad(text: &str, width: usize) -> String {
    let fill = width.saturating_sub(text.width());
    format!("{text}{}", " ".repeat(fill))
}

fn heading(out: &mut Vec<Line<'static>>, title: &'static str) {
    out.push(Line::default());
    out.push(Line::from(Span::styled(format!(" {title}"), styles::heading())));
}

fn paragraph(out: &mut Vec<Line<'static>>, text: &str, indent: &str, width: usize, style: Style) {
    let avail = width.saturating_sub(indent.width());
    for line in wrap(text, avail) {
        out.push(Line::from(vec![
            Span::raw(indent.to_string()),
            Span::styled(line, style),
        ]));
    }
}

/// Lay out the full report for a terminal `width` columns wide.
pub fn render(result: &AnalysisResult, width: usize) -> Vec<Line<'static>> {
    let width = width.max(MIN_WIDTH);
    let mut out = Vec::new();

    banner(&mut out, result, width);
    explanations(&mut out, result, width);
    claims(&mut out, result, width);
    sources(&mut out, result, width);
    risks(&mut out, result, width);

    out.push(Line::default());
    paragraph(&mut out, DISCLAIMER, " ", width, styles::dim());
    out
}

fn banner(out: &mut Vec<Line<'static>>, result: &AnalysisResult, width: usize) {
    let verdict = result.verdict();
    let style = verdict_style(verdict);
    out.push(Line::from(vec![
        Span::styled(format!(" {} ", verdict_glyph(verdict).symbol()), style),
        Span::styled(verdict_label(verdict), style),
    ]));
    out.push(Line::from(vec![
        Span::raw(INDENT),
        Span::styled("Confidence in analysis: ", styles::dim()),
        Span::styled(format_confidence(result.confidence()), styles::value()),
    ]));

    let cells = BAR_CELLS.min(width.saturating_sub(INDENT.len()));
    let filled = filled_cells(result.confidence(), cells);
    out.push(Line::from(vec![
        Span::raw(INDENT),
        Span::styled("█".repeat(filled), style),
        Span::styled("░".repeat(cells - filled), styles::bar_empty()),
    ]));
}

fn explanations(out: &mut Vec<Line<'static>>, result: &AnalysisResult, width: usize) {
    for exp in result.explanations() {
        out.push(Line::default());
        let glyph = Glyph::for_icon(exp.icon()).symbol();
        let title = wrap(exp.title(), width.saturating_sub(INDENT.len()));
        for (i, line) in title.into_iter().enumerate() {
            let lead = if i == 0 { format!(" {glyph} ") } else { INDENT.to_string() };
            out.push(Line::from(vec![
                Span::styled(lead, styles::icon()),
                Span::styled(line, styles::card_title()),
            ]));
        }
        paragraph(out, exp.description(), INDENT, width, styles::value());
    }
}

fn claims(out: &mut Vec<Line<'static>>, result: &AnalysisResult, width: usize) {
    heading(out, "Claim Breakdown");
    if result.claims().is_empty() {
        out.push(Line::from(vec![
            Span::raw(INDENT),
            Span::styled("No checkable claims found.", styles::dim()),
        ]));
        return;
    }

    let text_width = width.saturating_sub(INDENT.len() + 2 + STATUS_COLUMN).max(10);
    out.push(Line::from(vec![
        Span::raw(INDENT),
        Span::styled(pad("CLAIM", text_width), styles::label()),
        Span::raw("  "),
        Span::styled("STATUS", styles::label()),
    ]));

    for claim in result.claims() {
        let status = claim.status();
        for (i, line) in wrap(claim.text(), text_width).into_iter().enumerate() {
            let mut spans = vec![
                Span::raw(INDENT),
                Span::styled(pad(&line, text_width), styles::value()),
            ];
            if i == 0 {
                spans.push(Span::raw("  "));
                spans.push(Span::styled(status.as_str().to_uppercase(), status_style(status)));
            }
            out.push(Line::from(spans));
        }
    }
}

fn sources(out: &mut Vec<Line<'static>>, result: &AnalysisResult, width: usize) {
    heading(out, "Evidence & References");
    if result.sources().is_empty() {
        out.push(Line::from(vec![
            Span::raw(INDENT),
            Span::styled("No references provided.", styles::dim()),
        ]));
        return;
    }

    for source in result.sources() {
        let reliability = source.reliability();
        let tag = format!("[{}]", reliability.as_str().to_uppercase());
        let avail = width.saturating_sub(SOURCE_INDENT.len() + 2 + tag.len());
        for (i, line) in wrap(source.title(), avail).into_iter().enumerate() {
            let mut spans = vec![Span::raw(INDENT)];
            if i == 0 {
                spans.push(Span::styled("↗ ", styles::icon()));
                spans.push(Span::styled(line, styles::card_title()));
                spans.push(Span::raw("  "));
                spans.push(Span::styled(tag.clone(), reliability_style(reliability)));
            } else {
                spans.push(Span::raw("  "));
                spans.push(Span::styled(line, styles::card_title()));
            }
            out.push(Line::from(spans));
        }
        paragraph(out, source.url(), SOURCE_INDENT, width, styles::dim());
    }
}

fn risks(out: &mut Vec<Line<'static>>, result: &AnalysisResult, width: usize) {
    if result.risks().is_empty() {
        return;
    }
    heading(out, "Why messages like this are risky");
    for risk in result.risks() {
        let avail = width.saturating_sub(INDENT.len() + 2);
        for (i, line) in wrap(risk, avail).into_iter().enumerate() {
            let bullet = if i == 0 { "• " } else { "  " };
            out.push(Line::from(vec![
                Span::raw(INDENT),
                Span::styled(bullet, styles::icon()),
                Span::styled(line, styles::value()),
            ]));
        }
    }
}
