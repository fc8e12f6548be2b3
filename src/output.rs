use crate::models::{Category, OverallRankingEntry, RankingTable};
use crate::pipeline::RankingReport;
use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use std::fmt::{self, Write};

/// Output format options
#[derive(Debug, Clone, ValueEnum, Serialize, Deserialize)]
pub enum OutputFormat {
    Plain,
    Json,
}

/// Print the ranking report in the specified format
pub fn print_report(report: &RankingReport, format: OutputFormat) {
    match format {
        OutputFormat::Plain => print_plain(report),
        OutputFormat::Json => print_json(report),
    }
}

/// Print the report in plain text format
fn print_plain(report: &RankingReport) {
    match render_plain(report) {
        Ok(text) => print!("{}", text),
        Err(e) => eprintln!("Error rendering results: {}", e),
    }
}

/// Render the report as plain text tables
pub fn render_plain(report: &RankingReport) -> Result<String, fmt::Error> {
    let mut out = String::new();
    write_plain(&mut out, report)?;
    Ok(out)
}

fn write_plain(out: &mut impl Write, report: &RankingReport) -> fmt::Result {
    if report.is_empty() && report.excluded.is_empty() {
        return writeln!(out, "No models to rank.");
    }

    section(out, "🏆 OVERALL RANKING")?;
    write_overall(out, &report.overall_ranking)?;

    if !report.category_rankings.is_empty() {
        section(out, "📊 CATEGORY RANKINGS")?;
        for table in &report.category_rankings {
            write_table(out, table)?;
        }
    }

    if !report.metric_rankings.is_empty() {
        section(out, "📏 METRIC RANKINGS")?;
        for table in &report.metric_rankings {
            write_table(out, table)?;
        }
    }

    if !report.excluded.is_empty() {
        section(out, "⚠️  EXCLUDED MODELS")?;
        writeln!(out, "{:<30} {:<8} {:<8} {:<10}", "Model", "Total", "Errors", "Error Rate")?;
        writeln!(out, "{}", "-".repeat(58))?;
        for excluded in &report.excluded {
            let rate = excluded
                .error_rate
                .map(|r| format!("{:.1}%", r * 100.0))
                .unwrap_or_else(|| "n/a".to_string());
            writeln!(
                out,
                "{:<30} {:<8} {:<8} {:<10}",
                excluded.model, excluded.total_responses, excluded.error_responses, rate
            )?;
        }
        writeln!(out)?;
    }

    section(out, "💡 INSIGHTS")?;
    write_insights(out, report)
}

fn section(out: &mut impl Write, title: &str) -> fmt::Result {
    writeln!(out, "{}", title)?;
    writeln!(out, "{}", "-".repeat(title.chars().count()))
}

fn write_overall(out: &mut impl Write, entries: &[OverallRankingEntry]) -> fmt::Result {
    if entries.is_empty() {
        return writeln!(out, "No models passed the reliability filter.\n");
    }

    writeln!(
        out,
        "{:<6} {:<30} {:<8} {:<8} {:<8}",
        "Rank", "Model", "Score", "Base", "Penalty"
    )?;
    writeln!(out, "{}", "-".repeat(64))?;
    for entry in entries {
        writeln!(
            out,
            "{:<6} {:<30} {:<8.3} {:<8.3} {:<8.3}",
            entry.rank, entry.model, entry.score, entry.base_score, entry.penalty_factor
        )?;
    }
    writeln!(out)
}

fn write_table(out: &mut impl Write, table: &RankingTable) -> fmt::Result {
    writeln!(out, "{}", table.name)?;
    for entry in &table.entries {
        writeln!(out, "  {:<4} {:<30} {:<8.3}", entry.rank, entry.model, entry.score)?;
    }
    writeln!(out)
}

fn write_insights(out: &mut impl Write, report: &RankingReport) -> fmt::Result {
    let insights = &report.insights;

    match &insights.recommended {
        Some(model) => writeln!(out, "Recommended model: {}", model)?,
        None => writeln!(out, "Recommended model: none")?,
    }

    for category in Category::ALL {
        if let Some(leader) = report.category_ranking(category).and_then(RankingTable::leader) {
            writeln!(out, "{} leader: {} ({:.3})", category.label(), leader.model, leader.score)?;
        }
    }

    match &insights.correlation {
        Some(correlation) => writeln!(
            out,
            "Academic vs operational correlation: {:.3} ({})",
            correlation.coefficient,
            correlation.strength.describe()
        )?,
        None => writeln!(out, "Academic vs operational correlation: not computable")?,
    }

    for standout in &insights.standouts {
        writeln!(
            out,
            "  • {}: {} ({}: {:.3})",
            standout.title, standout.model, standout.metric, standout.value
        )?;
    }

    if !insights.groups.is_empty() {
        writeln!(out, "Group comparison:")?;
        for group in &insights.groups {
            writeln!(
                out,
                "  • {:<20} {:<8.3} ({} models)",
                group.group,
                group.mean_score,
                group.members.len()
            )?;
        }
    }

    for aggregate in &report.aggregates {
        let consistency = aggregate
            .consistency_rating()
            .map(|r| format!("{:?}", r).to_lowercase())
            .unwrap_or_else(|| "n/a".to_string());
        writeln!(
            out,
            "  {:<30} validity {:<10} consistency {}",
            aggregate.model,
            format!("{:?}", aggregate.validity_status()).to_lowercase(),
            consistency
        )?;
    }

    Ok(())
}

/// Print the report in JSON format
fn print_json(report: &RankingReport) {
    match serde_json::to_string_pretty(report) {
        Ok(json) => println!("{}", json),
        Err(e) => eprintln!("Error serializing results to JSON: {}", e),
    }
}
