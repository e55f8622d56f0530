use crate::backtest::{BacktestResult, BacktestStats};
use crate::pipeline::{AnalysisOutcome, Diagnostics};
use crate::portfolio::{AdmissionReport, Portfolio};
use crate::types::{join_numbers, CandidateKind, Label, ScoredCandidate};
use colored::*;
use std::fmt::Write;

/// One `"{id}, {numbers} {label}"` line per entry; unlabeled entries end after the numbers.
pub fn export_text(portfolio: &Portfolio) -> String {
    let mut out = String::new();
    for e in portfolio.entries() {
        let label = e.label().map(|l| l.to_string()).unwrap_or_default();
        let line = format!("{}, {} {}", e.id(), join_numbers(e.numbers()), label);
        out.push_str(line.trim_end());
        out.push('\n');
    }
    out
}

fn kind_tag(kind: CandidateKind) -> ColoredString {
    match kind {
        CandidateKind::Raw => kind.to_string().normal(),
        CandidateKind::Generated => kind.to_string().cyan(),
        CandidateKind::Evolved => kind.to_string().magenta().bold(),
    }
}

fn label_tag(label: Option<Label>) -> ColoredString {
    match label {
        Some(Label::Gold) => Label::Gold.to_string().yellow().bold(),
        Some(Label::Silver) => Label::Silver.to_string().white().bold(),
        Some(Label::Bronze) => Label::Bronze.to_string().red(),
        None => "".normal(),
    }
}

fn row(out: &mut String, rank: usize, c: &ScoredCandidate) {
    let _ = writeln!(
        out,
        "{:>4}  {:<5} {:<12} {:<28} {:>9.1}  {:>5}  {}  {}",
        rank,
        kind_tag(c.kind),
        c.id(),
        join_numbers(c.numbers()),
        c.score,
        c.coverage_label(),
        c.tiers,
        label_tag(c.label())
    );
}

pub fn render_ranking(outcome: &AnalysisOutcome) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "{}",
        format!(
            "=== Ranking: {} selections ({} evolved), game {} ===",
            outcome.ranked.len(),
            outcome.evolved_count,
            outcome.shape
        )
        .purple()
        .bold()
    );
    let _ = writeln!(
        out,
        "{:>4}  {:<5} {:<12} {:<28} {:>9}  {:>5}  {}",
        "#", "kind", "id", "numbers", "score", "cov", "palmares"
    );
    for (i, c) in outcome.ranked.iter().enumerate() {
        row(&mut out, i + 1, c);
    }
    out.push_str(&render_diagnostics(&outcome.diagnostics));
    out
}

pub fn render_diagnostics(d: &Diagnostics) -> String {
    let line = format!("[Diagnostics] {}", d);
    let styled = if d.total_rejected() > 0 { line.yellow() } else { line.green() };
    format!("{}\n", styled)
}

pub fn render_admission(report: &AdmissionReport) -> String {
    let mut out = format!("{} added", report.added).green().to_string();
    if report.rejected_risk > 0 {
        let _ = write!(out, ", {}", format!("{} over exposure", report.rejected_risk).red());
    }
    if report.skipped_duplicate > 0 {
        let _ = write!(out, ", {} duplicates", report.skipped_duplicate);
    }
    out.push('\n');
    out
}

pub fn render_portfolio(portfolio: &Portfolio, limit: f64) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "{}",
        format!("=== Portfolio: {} selections ===", portfolio.len()).purple().bold()
    );
    for (i, c) in portfolio.entries().iter().enumerate() {
        row(&mut out, i + 1, c);
    }
    let exposure = portfolio.number_exposure();
    if !exposure.is_empty() {
        let _ = write!(out, "Exposure (limit {:.0}%):", limit * 100.0);
        for (n, count, share) in exposure.iter().take(10) {
            let cell = format!(" {}x{} ({:.0}%)", n, count, share * 100.0);
            let _ = write!(out, "{}", if *share > limit { cell.red() } else { cell.normal() });
        }
        out.push('\n');
    }
    out
}

/// Ten numbers per row; hot above 0.8 of the peak count, warm above 0.4.
pub fn render_heatmap(frequencies: &[(u32, usize)]) -> String {
    let peak = frequencies.iter().map(|&(_, c)| c).max().unwrap_or(0).max(1) as f64;
    let mut out = String::new();
    let _ = writeln!(out, "{}", "=== Number heatmap ===".purple().bold());
    for chunk in frequencies.chunks(10) {
        for &(n, count) in chunk {
            let cell = format!("{:>3}:{:<4}", n, count);
            let ratio = count as f64 / peak;
            let cell = if ratio > 0.8 {
                cell.red().bold()
            } else if ratio > 0.4 {
                cell.yellow()
            } else {
                cell.blue()
            };
            let _ = write!(out, "{} ", cell);
        }
        out.push('\n');
    }
    out
}

pub fn render_backtest(stats: &BacktestStats, results: &[BacktestResult]) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{}", "=== Backtest ===".purple().bold());
    let _ = writeln!(
        out,
        "wins {} | 4+: {} | 3: {} | 2: {}",
        stats.total_wins,
        stats.hits4.to_string().yellow().bold(),
        stats.hits3,
        stats.hits2
    );
    for r in results.iter().filter(|r| r.hits > 0) {
        let _ = writeln!(
            out,
            "  {:<12} {:<28} hits {:>3}  {}",
            r.id,
            join_numbers(&r.numbers),
            r.hits,
            label_tag(r.label)
        );
    }
    out
}
